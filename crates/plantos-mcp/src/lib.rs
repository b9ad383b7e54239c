//! Plantos MCP Server
//!
//! Exposes Plantos agricultural intelligence to AI assistants via the Model
//! Context Protocol, over stdio for locally spawned servers or over HTTP for
//! remote hosts. Also implements the device-authorization flow that issues
//! the Plantos API key.

pub mod catalog;
pub mod classify;
pub mod cli;
pub mod client;
pub mod config;
pub mod credential;
pub mod device_auth;
pub mod format;
pub mod gateway;
pub mod host_config;
pub mod transport;

pub use classify::{ErrorKind, ToolFailure};
pub use client::{Backend, BackendClient, BackendError, BackendRequest};
pub use credential::Credential;
pub use device_auth::{DeviceAuthClient, DeviceAuthError, FlowState, PairingSession};
pub use gateway::{ToolGateway, ToolResult};

/// MCP Protocol version
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Server name
pub const SERVER_NAME: &str = "plantos-agricultural-intelligence";

/// Server version
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
