//! Opaque Plantos API credential.
//!
//! The gateway never parses or inspects the key. It is passed verbatim in
//! the `X-API-Key` header and masked whenever it is formatted.

use std::fmt;

/// Header carrying the credential on every backend and network request.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// A bearer credential for the Plantos API.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a raw key, kept byte for byte. An empty or all-whitespace key
    /// is `None`.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return None;
        }
        Some(Self(raw))
    }

    /// Parse a header value, accepting an optional `Bearer ` prefix.
    /// Whitespace around the value belongs to the header, not the key.
    pub fn from_header(value: &str) -> Option<Self> {
        let value = value.trim();
        let token = match value.strip_prefix("Bearer") {
            Some(rest) if rest.is_empty() || rest.starts_with(' ') => rest.trim(),
            _ => value,
        };
        Self::new(token)
    }

    /// The raw key, for placing into an outbound header.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Mask for display: first 8 and last 4 chars.
    pub fn masked(&self) -> String {
        let key = &self.0;
        let len = key.chars().count();
        if len <= 12 {
            return "****".to_string();
        }
        let prefix: String = key.chars().take(8).collect();
        let suffix: String = key.chars().skip(len - 4).collect();
        format!("{}...{}", prefix, suffix)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&self.masked()).finish()
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}
