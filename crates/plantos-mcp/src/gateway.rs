//! Tool dispatch: validate, call the backend once, render or classify.
//!
//! The gateway holds no per-call state. The credential travels with each
//! invocation, so concurrent calls with different keys cannot observe each
//! other.

use log::{info, warn};
use serde_json::{json, Map, Value};

use crate::catalog::{self, Tool};
use crate::classify::{classify, ErrorKind, ToolFailure};
use crate::client::{Backend, BackendRequest};
use crate::credential::Credential;
use crate::format;

static NULL: Value = Value::Null;

/// Outcome of one tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolResult {
    /// Rendered sections, in display order.
    Content(Vec<String>),
    Failure(ToolFailure),
}

impl ToolResult {
    pub fn is_error(&self) -> bool {
        matches!(self, ToolResult::Failure(_))
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            ToolResult::Content(_) => None,
            ToolResult::Failure(f) => Some(f.kind),
        }
    }

    /// Sections joined by a blank line, or the failure message.
    pub fn text(&self) -> String {
        match self {
            ToolResult::Content(sections) => sections.join("\n\n"),
            ToolResult::Failure(f) => f.message.clone(),
        }
    }

    /// MCP `CallToolResult` body shared by both transports.
    pub fn to_mcp_json(&self) -> Value {
        json!({
            "content": [{
                "type": "text",
                "text": self.text(),
            }],
            "isError": self.is_error(),
        })
    }
}

/// A tool bound to arguments that passed schema validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub tool: Tool,
    pub args: Map<String, Value>,
}

impl ToolCall {
    /// Resolve and validate an invocation. Nothing here touches the network.
    pub fn bind(name: &str, arguments: &Value) -> Result<Self, ToolFailure> {
        let descriptor = catalog::lookup(name).ok_or_else(|| ToolFailure::unknown_tool(name))?;
        let args = descriptor
            .validate(arguments)
            .map_err(|detail| ToolFailure::invalid_arguments(name, &detail))?;
        Ok(Self {
            tool: descriptor.tool,
            args,
        })
    }

    fn arg(&self, key: &str) -> &Value {
        self.args.get(key).unwrap_or(&NULL)
    }

    fn with_optional_location(&self, mut request: BackendRequest) -> BackendRequest {
        for key in ["latitude", "longitude"] {
            if let Some(value) = self.args.get(key) {
                request = request.with_query(key, value);
            }
        }
        request
    }

    /// The single backend request this call maps to.
    pub fn request(&self) -> BackendRequest {
        match self.tool {
            Tool::AnalyzeFarmLocation => BackendRequest::post(
                "/api/v1/analyze-location",
                json!({
                    "latitude": self.arg("latitude"),
                    "longitude": self.arg("longitude"),
                }),
            ),
            Tool::GetSoilData => BackendRequest::get("/api/v1/soil-data")
                .with_query("latitude", self.arg("latitude"))
                .with_query("longitude", self.arg("longitude")),
            Tool::GetWeatherData => BackendRequest::get("/api/v1/weather-data")
                .with_query("latitude", self.arg("latitude"))
                .with_query("longitude", self.arg("longitude")),
            Tool::GetMarketData => self.with_optional_location(
                BackendRequest::get("/api/v1/market-data").with_query("crops", self.arg("crops")),
            ),
            Tool::GetMarketSummary => {
                self.with_optional_location(BackendRequest::get("/api/v1/market-summary"))
            }
            Tool::ChatWithAdvisor => BackendRequest::post(
                "/api/v1/chat",
                json!({
                    "message": self.arg("message"),
                    "context": self.args.get("context").cloned().unwrap_or_else(|| json!({})),
                }),
            ),
            Tool::GetApiHealth => BackendRequest::get("/api/v1/health"),
        }
    }

    /// Render a successful payload for this tool.
    pub fn render(&self, payload: &Value) -> Result<Vec<String>, ToolFailure> {
        let data = payload
            .as_object()
            .ok_or_else(|| ToolFailure::malformed("expected a JSON object"))?;
        let (lat, lon) = (self.arg("latitude"), self.arg("longitude"));

        let sections = match self.tool {
            Tool::AnalyzeFarmLocation => format::location_analysis(lat, lon, data),
            Tool::GetSoilData => format::soil_report(lat, lon, data),
            Tool::GetWeatherData => format::weather_report(lat, lon, data),
            Tool::GetMarketData => format::market_report(data),
            Tool::GetMarketSummary => format::market_summary(data),
            Tool::ChatWithAdvisor => {
                format::advisor_reply(data).map_err(|detail| ToolFailure::malformed(&detail))?
            }
            Tool::GetApiHealth => format::health_report(data),
        };
        Ok(sections)
    }
}

/// Transport-agnostic entry point for tool calls.
#[derive(Debug)]
pub struct ToolGateway<B> {
    backend: B,
}

impl<B: Backend> ToolGateway<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Invoke `name` with `arguments` on behalf of `credential`.
    ///
    /// Unknown tools, invalid arguments and a missing credential are answered
    /// without any network call. Every other path makes exactly one.
    pub async fn invoke(
        &self,
        name: &str,
        arguments: &Value,
        credential: Option<&Credential>,
    ) -> ToolResult {
        let call = match ToolCall::bind(name, arguments) {
            Ok(call) => call,
            Err(failure) => {
                warn!("Rejected tool call {}: {:?}", name, failure.kind);
                return ToolResult::Failure(failure);
            }
        };
        let Some(credential) = credential else {
            warn!("Tool call {} without a credential", name);
            return ToolResult::Failure(ToolFailure::missing_credential());
        };

        info!("Tool called: {}", call.tool.name());
        let outcome = match self.backend.call(call.request(), credential).await {
            Ok(payload) => call.render(&payload),
            Err(err) => {
                warn!("Plantos API call for {} failed: {}", name, err);
                Err(classify(&err))
            }
        };

        match outcome {
            Ok(sections) => ToolResult::Content(sections),
            Err(failure) => ToolResult::Failure(failure),
        }
    }
}
