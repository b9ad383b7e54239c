//! Failure taxonomy and the messages shown to the host for each kind.

use crate::client::BackendError;

/// Where a plantos.co user gets a key.
pub const BILLING_URL: &str = "https://plantos.co/billing";

/// Every way a tool call or the device flow can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnknownTool,
    InvalidArguments,
    AuthenticationRejected,
    BackendError,
    TransportFailure,
    MalformedResponse,
    FlowExpired,
    FlowTimedOut,
}

/// A classified failure, ready to hand back to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl ToolFailure {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unknown_tool(name: &str) -> Self {
        Self::new(ErrorKind::UnknownTool, format!("Unknown tool: {}", name))
    }

    pub fn invalid_arguments(tool: &str, detail: &str) -> Self {
        Self::new(
            ErrorKind::InvalidArguments,
            format!("Invalid arguments for {}: {}", tool, detail),
        )
    }

    pub fn malformed(detail: &str) -> Self {
        Self::new(
            ErrorKind::MalformedResponse,
            format!("Unexpected response from Plantos API: {}", detail),
        )
    }

    /// No credential was supplied at all.
    pub fn missing_credential() -> Self {
        Self::new(
            ErrorKind::AuthenticationRejected,
            authentication_message("no API key configured"),
        )
    }
}

/// Classify a backend failure.
pub fn classify(err: &BackendError) -> ToolFailure {
    match err {
        BackendError::Status { status, body } if matches!(status, 401 | 403) => ToolFailure::new(
            ErrorKind::AuthenticationRejected,
            authentication_message(body),
        ),
        BackendError::Status { status, body } => ToolFailure::new(
            ErrorKind::BackendError,
            format!("Error calling Plantos API: {}\n{}", status, body),
        ),
        BackendError::Timeout(detail) => ToolFailure::new(
            ErrorKind::TransportFailure,
            format!("Plantos API request timed out: {}", detail),
        ),
        BackendError::Connect(detail) | BackendError::Transport(detail) => ToolFailure::new(
            ErrorKind::TransportFailure,
            format!("Could not reach Plantos API: {}", detail),
        ),
        BackendError::Decode(detail) => ToolFailure::malformed(detail),
    }
}

fn authentication_message(detail: &str) -> String {
    format!(
        "# Authentication Error\n\n\
         Your Plantos API key is invalid or your subscription has expired.\n\n\
         **To use Plantos agricultural intelligence:**\n\
         1. Sign in or create an account at https://plantos.co\n\
         2. Subscribe to a plan at {}\n\
         3. Run `plantos-mcp login` (or copy your API key from your dashboard)\n\
         4. Update your MCP configuration with the new API key\n\n\
         **Error details:** {}",
        BILLING_URL, detail
    )
}
