//! HTTP transport end to end: reqwest client -> axum gateway -> mock API.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{MockApi, BAD_KEY, GOOD_KEY};
use plantos_mcp::transport::http::{bind, run_http_server};
use plantos_mcp::{BackendClient, ToolGateway};
use serde_json::{json, Value};
use tokio::sync::watch;

struct Gateway {
    url: String,
    client: reqwest::Client,
    shutdown: watch::Sender<()>,
    task: tokio::task::JoinHandle<()>,
}

async fn start(api: &MockApi) -> Gateway {
    let backend = BackendClient::new(&api.base_url, Duration::from_secs(5), None).unwrap();
    let listener = bind("127.0.0.1", 0).await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let (shutdown, shutdown_rx) = watch::channel(());

    let task = tokio::spawn(async move {
        run_http_server(Arc::new(ToolGateway::new(backend)), listener, shutdown_rx)
            .await
            .unwrap();
    });

    Gateway {
        url,
        client: reqwest::Client::new(),
        shutdown,
        task,
    }
}

impl Gateway {
    async fn call_tool(&self, key: Option<&str>, body: Value) -> (u16, Value) {
        let mut request = self
            .client
            .post(format!("{}/mcp/call-tool", self.url))
            .json(&body);
        if let Some(key) = key {
            request = request.header("X-API-Key", key);
        }
        let response = request.send().await.unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }
}

#[tokio::test]
async fn test_health_needs_no_key() {
    let api = MockApi::start().await;
    let gw = start(&api).await;

    let body: Value = gw
        .client
        .get(format!("{}/health", gw.url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["mode"], "http");
}

#[tokio::test]
async fn test_list_tools_requires_key() {
    let api = MockApi::start().await;
    let gw = start(&api).await;

    let response = gw
        .client
        .post(format!("{}/mcp/list-tools", gw.url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["detail"]["error"], "missing_api_key");

    let body: Value = gw
        .client
        .get(format!("{}/mcp/list-tools", gw.url))
        .header("X-API-Key", GOOD_KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["tools"].as_array().unwrap().len(), 7);
}

#[tokio::test]
async fn test_missing_key_rejected_before_gateway() {
    let api = MockApi::start().await;
    let gw = start(&api).await;

    let (status, body) = gw
        .call_tool(None, json!({"name": "get_api_health", "arguments": {}}))
        .await;
    assert_eq!(status, 401);
    assert_eq!(body["detail"]["error"], "missing_api_key");
    assert!(api.requests().is_empty());
}

#[tokio::test]
async fn test_missing_key_checked_before_body() {
    let api = MockApi::start().await;
    let gw = start(&api).await;

    // No content-type and a body that is not JSON.
    let response = gw
        .client
        .post(format!("{}/mcp/call-tool", gw.url))
        .body("{oops")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["detail"]["error"], "missing_api_key");

    let response = gw
        .client
        .post(format!("{}/mcp/call-tool", gw.url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);
    assert!(api.requests().is_empty());
}

#[tokio::test]
async fn test_malformed_body_with_key_is_400() {
    let api = MockApi::start().await;
    let gw = start(&api).await;

    let response = gw
        .client
        .post(format!("{}/mcp/call-tool", gw.url))
        .header("X-API-Key", GOOD_KEY)
        .body("{oops")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["detail"]
        .as_str()
        .unwrap()
        .starts_with("Invalid JSON body"));
    assert!(api.requests().is_empty());
}

#[tokio::test]
async fn test_missing_name_is_400() {
    let api = MockApi::start().await;
    let gw = start(&api).await;

    let (status, body) = gw.call_tool(Some(GOOD_KEY), json!({"arguments": {}})).await;
    assert_eq!(status, 400);
    assert_eq!(body["detail"], "Missing 'name' field");
}

#[tokio::test]
async fn test_call_tool_success_and_failure_shapes() {
    let api = MockApi::start().await;
    let gw = start(&api).await;

    let (status, body) = gw
        .call_tool(
            Some(GOOD_KEY),
            json!({"name": "get_market_summary", "arguments": {}}),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["isError"], false);
    assert_eq!(body["content"][0]["type"], "text");
    assert!(body["content"][0]["text"]
        .as_str()
        .unwrap()
        .contains("**Corn Outlook:** stable"));

    let (status, body) = gw
        .call_tool(
            Some(BAD_KEY),
            json!({"name": "get_api_health", "arguments": {}}),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["isError"], true);
    assert!(body["content"][0]["text"]
        .as_str()
        .unwrap()
        .starts_with("# Authentication Error"));
}

#[tokio::test]
async fn test_bearer_header_accepted() {
    let api = MockApi::start().await;
    let gw = start(&api).await;

    let body: Value = gw
        .client
        .post(format!("{}/mcp/call-tool", gw.url))
        .header("Authorization", format!("Bearer {}", GOOD_KEY))
        .json(&json!({"name": "get_api_health"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["isError"], false);
    assert_eq!(api.requests()[0].api_key.as_deref(), Some(GOOD_KEY));
}

#[tokio::test]
async fn test_concurrent_requests_keep_their_own_key() {
    let api = MockApi::start().await;
    let gw = Arc::new(start(&api).await);

    let mut handles = Vec::new();
    for i in 0..8 {
        let gw = Arc::clone(&gw);
        // Alternate slow and fast keys so responses complete out of order.
        let key = if i % 2 == 0 {
            format!("slow-tenant-{:04}", i)
        } else {
            format!("tenant-{:04}", i)
        };
        handles.push(tokio::spawn(async move {
            let (_, body) = gw
                .call_tool(Some(&key), json!({"name": "get_api_health", "arguments": {}}))
                .await;
            (key, body)
        }));
    }

    for handle in handles {
        let (key, body) = handle.await.unwrap();
        let text = body["content"][0]["text"].as_str().unwrap().to_string();
        assert!(
            text.contains(&format!("**Status:** ok:{}", key)),
            "response for {} was {}",
            key,
            text
        );
    }
    assert_eq!(api.requests().len(), 8);
}

#[tokio::test]
async fn test_graceful_shutdown() {
    let api = MockApi::start().await;
    let gw = start(&api).await;

    gw.shutdown.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), gw.task)
        .await
        .expect("server did not shut down")
        .unwrap();
}
