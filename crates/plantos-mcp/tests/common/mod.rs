//! In-process mock of the Plantos API for integration tests.
//!
//! Tool endpoints answer canned payloads. `/api/v1/health` echoes the
//! caller's key in `status` so tests can tell requests apart. The key
//! `bad-key` gets a 401; keys starting with `slow-` are delayed.
//! The device-flow endpoints replay a script set by the test.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::{json, Value};

pub const GOOD_KEY: &str = "pk_test_0123456789abcdef";
pub const BAD_KEY: &str = "bad-key";

/// How long a [`stall`] reply is held back.
pub const STALL: Duration = Duration::from_millis(300);
const STALLED: u16 = 0;

/// One request as the mock saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub api_key: Option<String>,
    pub body: Option<Value>,
}

#[derive(Default)]
struct MockState {
    requests: Mutex<Vec<Recorded>>,
    code_response: Mutex<Option<(u16, Value)>>,
    check_script: Mutex<VecDeque<(u16, Value)>>,
    check_count: AtomicUsize,
}

pub struct MockApi {
    pub base_url: String,
    state: Arc<MockState>,
}

impl MockApi {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let app = Router::new().fallback(handle).with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    /// Requests received so far, device-flow calls included.
    pub fn requests(&self) -> Vec<Recorded> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Tool calls only, device-flow calls excluded.
    pub fn tool_requests(&self) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| !r.path.starts_with("/api/v1/mcp/"))
            .collect()
    }

    /// Response to `POST /api/v1/mcp/request-code`.
    pub fn set_code_response(&self, status: u16, body: Value) {
        *self.state.code_response.lock().unwrap() = Some((status, body));
    }

    /// Responses to successive `GET /api/v1/mcp/check-code` calls. Once the
    /// script runs out, every check answers `pending`.
    pub fn script_checks(&self, responses: Vec<(u16, Value)>) {
        *self.state.check_script.lock().unwrap() = responses.into();
    }

    pub fn check_count(&self) -> usize {
        self.state.check_count.load(Ordering::SeqCst)
    }
}

/// `{"status": ...}` check-code reply.
pub fn status(s: &str) -> (u16, Value) {
    (200, json!({ "status": s }))
}

/// A check-code reply that arrives only after [`STALL`].
pub fn stall() -> (u16, Value) {
    (STALLED, Value::Null)
}

pub fn authorized(api_key: &str) -> (u16, Value) {
    (200, json!({ "status": "authorized", "api_key": api_key }))
}

pub fn code(expires_in: u64, interval: Option<u64>) -> Value {
    let mut body = json!({
        "code": "WXYZ-2345",
        "verification_url": "https://plantos.co/mcp/authorize?code=WXYZ-2345",
        "expires_in": expires_in,
    });
    if let Some(interval) = interval {
        body["interval"] = json!(interval);
    }
    body
}

async fn handle(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let api_key = headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let path = uri.path().to_string();
    state.requests.lock().unwrap().push(Recorded {
        method: method.clone(),
        path: path.clone(),
        query: uri.query().map(String::from),
        api_key: api_key.clone(),
        body: serde_json::from_slice(&body).ok(),
    });

    match path.as_str() {
        "/api/v1/mcp/request-code" => {
            let scripted = state.code_response.lock().unwrap().clone();
            let (status, body) = scripted.unwrap_or((200, code(300, Some(1))));
            return reply(status, body);
        }
        "/api/v1/mcp/check-code" => {
            state.check_count.fetch_add(1, Ordering::SeqCst);
            let next = state.check_script.lock().unwrap().pop_front();
            let (status, body) = next.unwrap_or_else(|| self::status("pending"));
            if status == STALLED {
                tokio::time::sleep(STALL).await;
                return reply(200, json!({"status": "pending"}));
            }
            return reply(status, body);
        }
        _ => {}
    }

    let Some(key) = api_key else {
        return reply(401, json!({"detail": "Missing API key"}));
    };
    if key == BAD_KEY {
        return reply(401, json!({"detail": "Invalid API key"}));
    }
    if key.starts_with("slow-") {
        tokio::time::sleep(Duration::from_millis(150)).await;
    }

    match (method, path.as_str()) {
        (Method::GET, "/api/v1/health") => reply(
            200,
            json!({
                "status": format!("ok:{}", key),
                "database_connected": true,
                "timestamp": "2026-05-01T12:00:00Z"
            }),
        ),
        (Method::GET, "/api/v1/soil-data") => reply(
            200,
            json!({
                "soil_texture": "silty clay loam",
                "drainage_class": "well drained",
                "ph_level": 6.4,
                "organic_matter_pct": 3.1
            }),
        ),
        (Method::GET, "/api/v1/weather-data") => reply(
            200,
            json!({
                "source": "NOAA Weather.gov",
                "weather": {"current_temperature": 72, "avg_relative_humidity": 55}
            }),
        ),
        (Method::GET, "/api/v1/market-data") => reply(
            200,
            json!({
                "crops": [{"crop_type": "corn", "current_price": 4.25, "price_trend": "rising"}],
                "last_updated": "2026-05-01"
            }),
        ),
        (Method::GET, "/api/v1/market-summary") => reply(
            200,
            json!({"overview": {"corn_outlook": "stable"}}),
        ),
        (Method::POST, "/api/v1/analyze-location") => reply(
            200,
            json!({
                "soil_properties": {"soil_texture": "loam"},
                "recommendations": ["Plant corn"],
                "analysis_timestamp": "2026-05-01T12:00:00Z"
            }),
        ),
        (Method::POST, "/api/v1/chat") => reply(
            200,
            json!({
                "response": "Rotate corn with soybeans.",
                "sources": ["Iowa State Extension"],
                "confidence": 0.82
            }),
        ),
        _ => reply(404, json!({"detail": "Not Found"})),
    }
}

fn reply(status: u16, body: Value) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(body)).into_response()
}
