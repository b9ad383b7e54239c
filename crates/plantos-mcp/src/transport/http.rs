//! HTTP transport for remote hosts.
//!
//! Every request carries its own credential in `X-API-Key` (or
//! `Authorization: Bearer`). It is passed straight down to the gateway and
//! never stored.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use log::info;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};

use super::TransportError;
use crate::catalog;
use crate::classify::BILLING_URL;
use crate::client::Backend;
use crate::credential::{Credential, API_KEY_HEADER};
use crate::gateway::ToolGateway;
use crate::SERVER_VERSION;

/// Shared state for HTTP handlers
pub struct AppState<B> {
    pub gateway: Arc<ToolGateway<B>>,
}

impl<B> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
        }
    }
}

/// Request rejected before reaching the gateway.
#[derive(Debug)]
pub enum ApiError {
    MissingApiKey,
    MissingName,
    InvalidBody(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::MissingApiKey => (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "detail": {
                        "error": "missing_api_key",
                        "message": "API key required to use Plantos MCP server",
                        "instructions": format!("Get your API key by subscribing at {}", BILLING_URL),
                    }
                })),
            )
                .into_response(),
            ApiError::MissingName => (
                StatusCode::BAD_REQUEST,
                Json(json!({"detail": "Missing 'name' field"})),
            )
                .into_response(),
            ApiError::InvalidBody(reason) => (
                StatusCode::BAD_REQUEST,
                Json(json!({"detail": format!("Invalid JSON body: {}", reason)})),
            )
                .into_response(),
        }
    }
}

/// Credential from `X-API-Key`, falling back to `Authorization: Bearer`.
pub fn request_credential(headers: &HeaderMap) -> Option<Credential> {
    header_str(headers, API_KEY_HEADER)
        .and_then(Credential::from_header)
        .or_else(|| header_str(headers, AUTHORIZATION.as_str()).and_then(Credential::from_header))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn require_credential(headers: &HeaderMap) -> Result<Credential, ApiError> {
    request_credential(headers).ok_or(ApiError::MissingApiKey)
}

/// GET /health
async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "mode": "http",
        "version": SERVER_VERSION,
    }))
}

/// POST /mcp/list-tools
async fn list_tools(headers: HeaderMap) -> Result<Json<Value>, ApiError> {
    require_credential(&headers)?;
    Ok(Json(catalog::list_tools_json()))
}

/// POST /mcp/call-tool
///
/// The body is taken raw so a missing credential is reported before any
/// content-type or JSON problem.
async fn call_tool<B: Backend>(
    State(state): State<AppState<B>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let credential = require_credential(&headers)?;
    let body: Value =
        serde_json::from_slice(&body).map_err(|e| ApiError::InvalidBody(e.to_string()))?;

    let name = body
        .get("name")
        .and_then(Value::as_str)
        .filter(|n| !n.is_empty())
        .ok_or(ApiError::MissingName)?;
    let arguments = body.get("arguments").cloned().unwrap_or(Value::Null);

    let result = state
        .gateway
        .invoke(name, &arguments, Some(&credential))
        .await;
    Ok(Json(result.to_mcp_json()))
}

/// Create the HTTP router
pub fn create_router<B: Backend>(gateway: Arc<ToolGateway<B>>) -> Router {
    let state = AppState { gateway };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/mcp/list-tools", get(list_tools).post(list_tools))
        .route("/mcp/call-tool", post(call_tool::<B>))
        .layer(cors)
        .with_state(state)
}

/// Bind `host:port`.
pub async fn bind(host: &str, port: u16) -> Result<TcpListener, TransportError> {
    TcpListener::bind((host, port))
        .await
        .map_err(|source| TransportError::Bind {
            addr: format!("{}:{}", host, port),
            source,
        })
}

/// Run the HTTP server until `shutdown` fires. In-flight requests finish first.
pub async fn run_http_server<B: Backend>(
    gateway: Arc<ToolGateway<B>>,
    listener: TcpListener,
    mut shutdown: watch::Receiver<()>,
) -> Result<(), TransportError> {
    let app = create_router(gateway);

    info!("HTTP server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.changed().await;
            info!("Shutdown requested, draining HTTP connections");
        })
        .await?;

    Ok(())
}
