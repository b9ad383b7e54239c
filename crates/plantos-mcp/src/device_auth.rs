//! Device-authorization flow for obtaining a Plantos API key.
//!
//! 1. Request a pairing code (`POST /api/v1/mcp/request-code`)
//! 2. The user approves it in a browser at the verification URL
//! 3. Poll `GET /api/v1/mcp/check-code` until approved, expired or out of time
//!
//! The wall-clock deadline derived from `expires_in` is the authoritative
//! bound. The attempt cap, `floor(expires_in / poll_interval)`, only guards
//! against a clock that never seems to advance.

use std::path::Path;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use reqwest::StatusCode;
use serde::Deserialize;

use crate::classify::ErrorKind;
use crate::client::{http_client, ClientBuildError};
use crate::credential::Credential;

/// Poll interval used when the server does not send one.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Code lifetime assumed when the server omits `expires_in`.
pub const DEFAULT_EXPIRES_IN: u64 = 300;

/// Per-request timeout for the flow's own HTTP calls.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// States of the flow. `Requesting` is initial; the last four are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Requesting,
    Polling,
    Authorized,
    Expired,
    TimedOut,
    Failed,
}

/// Terminal failures of the flow.
#[derive(Debug, thiserror::Error)]
pub enum DeviceAuthError {
    #[error("could not obtain an authorization code: {0}")]
    Request(String),

    #[error("authorization code not found or expired")]
    Expired,

    #[error("authorization timed out after {0:?}")]
    TimedOut(Duration),

    #[error("authorization succeeded but no API key was received")]
    MissingCredential,
}

impl DeviceAuthError {
    /// Terminal state this error represents.
    pub fn state(&self) -> FlowState {
        match self {
            DeviceAuthError::Expired => FlowState::Expired,
            DeviceAuthError::TimedOut(_) => FlowState::TimedOut,
            DeviceAuthError::Request(_) | DeviceAuthError::MissingCredential => FlowState::Failed,
        }
    }

    /// Classification for the device-flow specific kinds.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            DeviceAuthError::Expired => Some(ErrorKind::FlowExpired),
            DeviceAuthError::TimedOut(_) => Some(ErrorKind::FlowTimedOut),
            _ => None,
        }
    }
}

/// A pairing code awaiting user approval.
#[derive(Debug, Clone)]
pub struct PairingSession {
    pub code: String,
    pub verification_url: String,
    pub expires_in: Duration,
    pub expires_at: Instant,
    pub poll_interval: Duration,
}

impl PairingSession {
    /// Upper bound on status checks: `floor(expires_in / poll_interval)`, at least one.
    pub fn max_attempts(&self) -> u32 {
        let interval = self.poll_interval.as_millis().max(1);
        let attempts = self.expires_in.as_millis() / interval;
        u32::try_from(attempts).unwrap_or(u32::MAX).max(1)
    }
}

#[derive(Debug, Deserialize)]
struct CodeResponse {
    code: Option<String>,
    verification_url: Option<String>,
    expires_in: Option<u64>,
    interval: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct CheckResponse {
    status: Option<String>,
    api_key: Option<String>,
}

/// Result of a single status check.
#[derive(Debug)]
enum PollStatus {
    Pending,
    Authorized(Option<Credential>),
    Expired,
    /// Network or server hiccup; keep polling.
    Transient(String),
}

/// Client for the pairing-code flow.
#[derive(Debug, Clone)]
pub struct DeviceAuthClient {
    http: reqwest::Client,
    base_url: String,
    poll_interval: Duration,
    request_timeout: Duration,
}

impl DeviceAuthClient {
    pub fn new(base_url: &str, ca_bundle: Option<&Path>) -> Result<Self, ClientBuildError> {
        Ok(Self {
            http: http_client(REQUEST_TIMEOUT, ca_bundle)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: REQUEST_TIMEOUT,
        })
    }

    /// Interval used when the server does not specify one.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Timeout for each request-code and check-code call. A check that runs
    /// over is retried like any other transport error.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Run the whole flow. `on_code` receives the session once the code is
    /// issued, before polling begins (display it, open a browser, ...).
    pub async fn authorize(
        &self,
        on_code: impl FnOnce(&PairingSession),
    ) -> Result<Credential, DeviceAuthError> {
        let session = self.start().await?;
        on_code(&session);
        self.poll(&session).await
    }

    /// `Requesting`: obtain a pairing code.
    pub async fn start(&self) -> Result<PairingSession, DeviceAuthError> {
        let started = Instant::now();
        let url = format!("{}/api/v1/mcp/request-code", self.base_url);
        debug!("device flow: {:?}", FlowState::Requesting);

        let response = self
            .http
            .post(&url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| DeviceAuthError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DeviceAuthError::Request(format!(
                "server returned {}",
                response.status().as_u16()
            )));
        }

        let body: CodeResponse = response
            .json()
            .await
            .map_err(|e| DeviceAuthError::Request(format!("invalid response from server: {}", e)))?;

        let code = body.code.filter(|c| !c.trim().is_empty());
        let verification_url = body.verification_url.filter(|u| !u.trim().is_empty());
        let (Some(code), Some(verification_url)) = (code, verification_url) else {
            return Err(DeviceAuthError::Request(
                "invalid response from server: missing code or verification_url".to_string(),
            ));
        };

        let expires_in = Duration::from_secs(body.expires_in.unwrap_or(DEFAULT_EXPIRES_IN));
        let poll_interval = body
            .interval
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
            .unwrap_or(self.poll_interval);

        info!(
            "Authorization code {} issued, expires in {}s",
            code,
            expires_in.as_secs()
        );
        debug!("device flow: {:?}", FlowState::Polling);

        Ok(PairingSession {
            code,
            verification_url,
            expires_in,
            expires_at: started + expires_in,
            poll_interval,
        })
    }

    /// `Polling`: wait for approval until the session deadline.
    pub async fn poll(&self, session: &PairingSession) -> Result<Credential, DeviceAuthError> {
        let max_attempts = session.max_attempts();
        let timed_out = || {
            debug!("device flow: {:?}", FlowState::TimedOut);
            DeviceAuthError::TimedOut(session.expires_in)
        };

        for attempt in 1..=max_attempts {
            let remaining = session.expires_at.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(timed_out());
            }

            let status = match tokio::time::timeout(remaining, self.check(&session.code)).await {
                Ok(status) => status,
                Err(_) => return Err(timed_out()),
            };

            match status {
                PollStatus::Authorized(Some(credential)) => {
                    info!("Authorization successful after {} poll(s)", attempt);
                    debug!("device flow: {:?}", FlowState::Authorized);
                    return Ok(credential);
                }
                PollStatus::Authorized(None) => {
                    debug!("device flow: {:?}", FlowState::Failed);
                    return Err(DeviceAuthError::MissingCredential);
                }
                PollStatus::Expired => {
                    debug!("device flow: {:?}", FlowState::Expired);
                    return Err(DeviceAuthError::Expired);
                }
                PollStatus::Pending => {
                    debug!("Authorization pending (attempt {}/{})", attempt, max_attempts);
                }
                PollStatus::Transient(reason) => {
                    warn!("Error checking authorization status, retrying: {}", reason);
                }
            }

            if attempt == max_attempts {
                break;
            }
            let remaining = session.expires_at.saturating_duration_since(Instant::now());
            tokio::time::sleep(session.poll_interval.min(remaining)).await;
        }

        Err(timed_out())
    }

    async fn check(&self, code: &str) -> PollStatus {
        let url = format!("{}/api/v1/mcp/check-code", self.base_url);
        let request = self
            .http
            .get(&url)
            .query(&[("code", code)])
            .timeout(self.request_timeout);
        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => return PollStatus::Transient(e.to_string()),
        };

        if response.status() == StatusCode::NOT_FOUND {
            return PollStatus::Expired;
        }
        if !response.status().is_success() {
            return PollStatus::Transient(format!("server returned {}", response.status().as_u16()));
        }

        let body: CheckResponse = match response.json().await {
            Ok(b) => b,
            Err(e) => return PollStatus::Transient(format!("invalid status payload: {}", e)),
        };

        match body.status.as_deref() {
            Some("authorized") => PollStatus::Authorized(body.api_key.and_then(Credential::new)),
            Some("expired") => PollStatus::Expired,
            Some("pending") => PollStatus::Pending,
            other => PollStatus::Transient(format!("unexpected status {:?}", other)),
        }
    }
}
