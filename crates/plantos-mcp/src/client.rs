//! Plantos API client.
//!
//! Issues one authenticated HTTP call per request and never retries.
//! Non-2xx responses come back as [`BackendError::Status`] with the raw body
//! attached; interpreting them is the classifier's job.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use log::debug;
use reqwest::Method;
use serde_json::Value;

use crate::credential::{Credential, API_KEY_HEADER};

/// Default per-call timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Failures surfaced by a backend call.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid response body: {0}")]
    Decode(String),
}

impl BackendError {
    /// Map a reqwest error onto the transport taxonomy.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BackendError::Timeout(err.to_string())
        } else if err.is_connect() {
            BackendError::Connect(err.to_string())
        } else if err.is_decode() {
            BackendError::Decode(err.to_string())
        } else {
            BackendError::Transport(err.to_string())
        }
    }
}

/// Errors building a client.
#[derive(Debug, thiserror::Error)]
pub enum ClientBuildError {
    #[error("cannot read CA bundle {path}: {source}")]
    CaBundleRead {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid CA bundle {path}: {source}")]
    CaBundleParse {
        path: String,
        source: reqwest::Error,
    },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Build the shared `reqwest` client.
///
/// The bundled webpki roots are always loaded; `ca_bundle` only adds to
/// them. Certificate verification cannot be turned off.
pub fn http_client(
    timeout: Duration,
    ca_bundle: Option<&Path>,
) -> Result<reqwest::Client, ClientBuildError> {
    let mut builder = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("plantos-mcp/", env!("CARGO_PKG_VERSION")));

    if let Some(path) = ca_bundle {
        let pem = std::fs::read(path).map_err(|source| ClientBuildError::CaBundleRead {
            path: path.display().to_string(),
            source,
        })?;
        let certs = reqwest::Certificate::from_pem_bundle(&pem).map_err(|source| {
            ClientBuildError::CaBundleParse {
                path: path.display().to_string(),
                source,
            }
        })?;
        for cert in certs {
            builder = builder.add_root_certificate(cert);
        }
    }

    Ok(builder.build()?)
}

/// A single backend call: method, path, and either query or body.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendRequest {
    pub method: Method,
    pub path: &'static str,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl BackendRequest {
    pub fn get(path: &'static str) -> Self {
        Self {
            method: Method::GET,
            path,
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(path: &'static str, body: Value) -> Self {
        Self {
            method: Method::POST,
            path,
            query: Vec::new(),
            body: Some(body),
        }
    }

    /// Append a query parameter, rendering JSON scalars without quotes.
    pub fn with_query(mut self, key: &str, value: &Value) -> Self {
        let rendered = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        self.query.push((key.to_string(), rendered));
        self
    }
}

/// Abstraction over the Plantos HTTP API.
///
/// The gateway calls this trait instead of `reqwest` directly, which keeps it
/// testable with an in-memory implementation.
pub trait Backend: Send + Sync + 'static {
    fn call(
        &self,
        request: BackendRequest,
        credential: &Credential,
    ) -> impl Future<Output = Result<Value, BackendError>> + Send;
}

/// Real backend over HTTPS.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    /// Build a client for `base_url` with the given timeout and optional extra trust root.
    pub fn new(
        base_url: &str,
        timeout: Duration,
        ca_bundle: Option<&Path>,
    ) -> Result<Self, ClientBuildError> {
        Ok(Self {
            http: http_client(timeout, ca_bundle)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Backend for BackendClient {
    async fn call(
        &self,
        request: BackendRequest,
        credential: &Credential,
    ) -> Result<Value, BackendError> {
        let url = format!("{}{}", self.base_url, request.path);
        debug!("{} {}", request.method, url);

        let mut builder = self
            .http
            .request(request.method, &url)
            .header(API_KEY_HEADER, credential.expose())
            .header("content-type", "application/json");
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(BackendError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await.map_err(BackendError::from_reqwest)?;
        serde_json::from_slice(&bytes).map_err(|e| BackendError::Decode(e.to_string()))
    }
}
