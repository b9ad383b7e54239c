//! `mcpServers` entries for assistant hosts.
//!
//! Hosts that spawn the server as a child process take a [`LocalServerEntry`];
//! hosts that talk to a running HTTP gateway take a [`RemoteServerEntry`].
//! The two shapes are unrelated and each has its own check.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::credential::{Credential, API_KEY_HEADER};

/// Key under `mcpServers` that hosts use for this server.
pub const SERVER_KEY: &str = "plantos";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalServerEntry {
    pub command: String,
    pub args: Vec<String>,
    pub env: LocalEnv,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalEnv {
    #[serde(rename = "PLANTOS_API_KEY")]
    pub api_key: String,
    #[serde(rename = "PLANTOS_API_URL")]
    pub api_url: String,
}

impl LocalServerEntry {
    /// Entry that launches `command serve` with the key in its environment.
    pub fn new(command: &str, credential: &Credential, api_url: &str) -> Self {
        Self {
            command: command.to_string(),
            args: vec!["serve".to_string()],
            env: LocalEnv {
                api_key: credential.expose().to_string(),
                api_url: api_url.to_string(),
            },
        }
    }

    /// Check that `entry` is a usable local-channel configuration.
    pub fn verify(entry: &Value) -> Result<(), String> {
        let parsed: LocalServerEntry = serde_json::from_value(entry.clone())
            .map_err(|e| format!("not a local server entry: {}", e))?;
        if parsed.command.trim().is_empty() {
            return Err("'command' must not be empty".to_string());
        }
        if Credential::new(parsed.env.api_key).is_none() {
            return Err("'env.PLANTOS_API_KEY' must not be empty".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteServerEntry {
    pub url: String,
    pub transport: RemoteTransport,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteTransport {
    #[serde(rename = "type")]
    pub kind: String,
    pub headers: BTreeMap<String, String>,
}

impl RemoteServerEntry {
    pub fn new(url: &str, credential: &Credential) -> Self {
        Self {
            url: url.to_string(),
            transport: RemoteTransport {
                kind: "http".to_string(),
                headers: BTreeMap::from([(
                    API_KEY_HEADER.to_string(),
                    credential.expose().to_string(),
                )]),
            },
        }
    }

    /// Check for `url`, `transport.type == "http"` and the key header.
    pub fn verify(entry: &Value) -> Result<(), String> {
        if entry.get("url").and_then(Value::as_str).is_none() {
            return Err("missing 'url'".to_string());
        }
        let transport = entry
            .get("transport")
            .ok_or_else(|| "missing 'transport'".to_string())?;
        if transport.get("type").and_then(Value::as_str) != Some("http") {
            return Err("'transport.type' must be \"http\"".to_string());
        }
        let has_key = transport
            .get("headers")
            .and_then(|h| h.get(API_KEY_HEADER))
            .and_then(Value::as_str)
            .is_some();
        if !has_key {
            return Err(format!("missing 'transport.headers.{}'", API_KEY_HEADER));
        }
        Ok(())
    }
}

/// Wrap an entry as a complete `{"mcpServers": {"plantos": ...}}` document.
pub fn snippet<T: Serialize>(entry: &T) -> Result<Value, serde_json::Error> {
    Ok(json!({ "mcpServers": { SERVER_KEY: serde_json::to_value(entry)? } }))
}
