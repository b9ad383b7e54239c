//! MCP over a local channel: newline-delimited JSON-RPC 2.0.
//!
//! Requests are handled one at a time in arrival order. The credential is
//! fixed for the lifetime of the channel.

use std::sync::Arc;

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::watch;

use super::TransportError;
use crate::catalog::{self, CATALOG};
use crate::client::Backend;
use crate::credential::Credential;
use crate::gateway::ToolGateway;
use crate::{PROTOCOL_VERSION, SERVER_NAME, SERVER_VERSION};

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;

/// JSON-RPC Request
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub jsonrpc: String,
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// JSON-RPC Response
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Value, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// Local-channel MCP server bound to one credential.
pub struct StdioServer<B> {
    gateway: Arc<ToolGateway<B>>,
    credential: Option<Credential>,
}

impl<B: Backend> StdioServer<B> {
    pub fn new(gateway: Arc<ToolGateway<B>>, credential: Option<Credential>) -> Self {
        Self {
            gateway,
            credential,
        }
    }

    fn handle_initialize(&self) -> Value {
        let tools: Vec<String> = CATALOG.iter().map(|d| format!("- {}", d.name)).collect();
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": {}
            },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": SERVER_VERSION
            },
            "instructions": format!(
                "Plantos agricultural intelligence: soil, weather, crop yield, market and \
                 economic analysis for farm locations.\n\nAvailable tools:\n{}",
                tools.join("\n")
            )
        })
    }

    async fn handle_tools_call(&self, id: Value, params: Value) -> JsonRpcResponse {
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return JsonRpcResponse::error(id, INVALID_PARAMS, "Missing tool name");
        };
        let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

        debug!("Calling tool: {} with args: {}", name, arguments);
        let result = self
            .gateway
            .invoke(name, &arguments, self.credential.as_ref())
            .await;
        JsonRpcResponse::success(id, result.to_mcp_json())
    }

    /// Handle a single request. Notifications (no `id`) get no reply.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!("Handling request: {}", request.method);

        let Some(id) = request.id else {
            match request.method.as_str() {
                "initialized" | "notifications/initialized" => {
                    info!("Client initialized");
                }
                other => debug!("Ignoring notification: {}", other),
            }
            return None;
        };

        let response = match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(id, self.handle_initialize()),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(id, catalog::list_tools_json()),
            "tools/call" => self.handle_tools_call(id, request.params).await,
            other => {
                warn!("Unknown method: {}", other);
                JsonRpcResponse::error(id, METHOD_NOT_FOUND, format!("Method not found: {}", other))
            }
        };
        Some(response)
    }

    /// Parse one line and handle it. Malformed input fails this exchange only.
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                return Some(JsonRpcResponse::error(Value::Null, PARSE_ERROR, "Parse error"));
            }
        };
        let id = value.get("id").cloned().unwrap_or(Value::Null);
        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => {
                error!("Invalid request: {}", e);
                Some(JsonRpcResponse::error(id, INVALID_REQUEST, "Invalid Request"))
            }
        }
    }

    /// Serve until `reader` reaches EOF or `shutdown` fires. A shutdown
    /// abandons any request still in flight. A line that is not UTF-8 gets a
    /// parse error and the channel stays open.
    pub async fn serve<R, W>(
        &self,
        mut reader: R,
        mut writer: W,
        mut shutdown: watch::Receiver<()>,
    ) -> Result<(), TransportError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = Vec::new();

        loop {
            buf.clear();
            let read = tokio::select! {
                read = reader.read_until(b'\n', &mut buf) => read?,
                _ = shutdown.changed() => {
                    info!("Shutdown requested, closing local channel");
                    break;
                }
            };
            if read == 0 {
                info!("Local channel closed");
                break;
            }

            let line = match std::str::from_utf8(&buf) {
                Ok(line) => line.trim_end_matches(['\n', '\r']),
                Err(e) => {
                    error!("Received a line that is not UTF-8: {}", e);
                    let response = JsonRpcResponse::error(Value::Null, PARSE_ERROR, "Parse error");
                    write_response(&mut writer, &response).await?;
                    continue;
                }
            };
            if line.trim().is_empty() {
                continue;
            }

            debug!("Received: {}", line);

            let response = tokio::select! {
                response = self.handle_line(line) => response,
                _ = shutdown.changed() => {
                    info!("Shutdown requested, abandoning in-flight request");
                    break;
                }
            };

            if let Some(response) = response {
                write_response(&mut writer, &response).await?;
            }
        }

        Ok(())
    }

    /// Serve on the process's stdin/stdout.
    pub async fn run_stdio(&self, shutdown: watch::Receiver<()>) -> Result<(), TransportError> {
        info!("MCP server ready, listening on stdio...");
        if self.credential.is_none() {
            warn!("PLANTOS_API_KEY is not set; tool calls will be rejected until it is configured");
        }
        let reader = BufReader::new(tokio::io::stdin());
        self.serve(reader, tokio::io::stdout(), shutdown).await
    }
}

async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    response: &JsonRpcResponse,
) -> Result<(), TransportError> {
    let response_json = serde_json::to_string(response)?;
    debug!("Sending: {}", response_json);
    writer.write_all(response_json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}
