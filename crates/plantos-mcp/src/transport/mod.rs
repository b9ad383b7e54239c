//! Adapters that carry tool calls to the gateway.
//!
//! - [`stdio`]: one host, newline-delimited JSON-RPC, one credential for the session
//! - [`http`]: many concurrent callers, a credential per request

pub mod http;
pub mod stdio;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },
}
