//! `plantos-mcp login`: obtain an API key through the device flow and print
//! a ready-to-paste host configuration.
//!
//! Progress goes to stderr so stdout carries only the JSON snippet. Nothing
//! is written to disk.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::client::ClientBuildError;
use crate::config::{ConfigError, ServerConfig};
use crate::credential::Credential;
use crate::device_auth::{DeviceAuthClient, DeviceAuthError};
use crate::host_config::{self, LocalServerEntry, RemoteServerEntry};

#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Client(#[from] ClientBuildError),

    #[error(transparent)]
    Auth(#[from] DeviceAuthError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("--server-url is required for the remote format")]
    MissingServerUrl,

    #[error("generated configuration is invalid: {0}")]
    InvalidSnippet(String),
}

/// Which host configuration to print.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SnippetFormat {
    /// Host spawns `plantos-mcp serve` over stdio.
    #[default]
    Local,
    /// Host connects to a running HTTP gateway.
    Remote,
}

impl FromStr for SnippetFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(SnippetFormat::Local),
            "remote" => Ok(SnippetFormat::Remote),
            other => Err(format!("expected 'local' or 'remote', got '{}'", other)),
        }
    }
}

impl fmt::Display for SnippetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnippetFormat::Local => f.write_str("local"),
            SnippetFormat::Remote => f.write_str("remote"),
        }
    }
}

/// Sign in to Plantos in the browser and print an MCP configuration
#[derive(argh::FromArgs, Debug)]
#[argh(subcommand, name = "login")]
pub struct LoginCommand {
    /// plantos API base URL (default: https://api.plantos.co, or PLANTOS_API_URL)
    #[argh(option)]
    pub api_url: Option<String>,

    /// do not try to open a browser
    #[argh(switch)]
    pub no_browser: bool,

    /// snippet format: local or remote (default: local)
    #[argh(option, short = 'f', default = "SnippetFormat::Local")]
    pub format: SnippetFormat,

    /// URL of the HTTP gateway, for the remote format
    #[argh(option)]
    pub server_url: Option<String>,

    /// command hosts should launch, for the local format (default: plantos-mcp)
    #[argh(option, default = "String::from(\"plantos-mcp\")")]
    pub command: String,
}

impl LoginCommand {
    pub async fn run(&self) -> Result<(), LoginError> {
        if self.format == SnippetFormat::Remote && self.server_url.is_none() {
            return Err(LoginError::MissingServerUrl);
        }

        let mut config = ServerConfig::resolve(None)?;
        if let Some(url) = &self.api_url {
            config.api_url = url.clone();
        }
        config.validate()?;

        eprintln!("\n  Plantos Login\n");

        let client = DeviceAuthClient::new(&config.api_url, config.ca_bundle.as_deref())?;
        let credential = client
            .authorize(|session| {
                eprintln!("  1. Visit {}", session.verification_url);
                eprintln!("     Code: {}", session.code);
                if !self.no_browser && open::that(&session.verification_url).is_err() {
                    eprintln!("     (Could not open browser, copy the URL above)");
                }
                eprintln!(
                    "\n  2. Approve the request in your browser. Waiting up to {}s...",
                    session.expires_in.as_secs()
                );
            })
            .await?;

        eprintln!("\n  Authorized. API key: {}\n", credential);
        eprintln!("  Add this to your assistant's MCP configuration:\n");

        let snippet = self.snippet(&credential, &config.api_url)?;
        println!("{}", serde_json::to_string_pretty(&snippet)?);
        Ok(())
    }

    /// Build and check the snippet for the selected format.
    pub fn snippet(&self, credential: &Credential, api_url: &str) -> Result<Value, LoginError> {
        let doc = match (self.format, &self.server_url) {
            (SnippetFormat::Local, _) => {
                host_config::snippet(&LocalServerEntry::new(&self.command, credential, api_url))?
            }
            (SnippetFormat::Remote, Some(url)) => {
                host_config::snippet(&RemoteServerEntry::new(url, credential))?
            }
            (SnippetFormat::Remote, None) => return Err(LoginError::MissingServerUrl),
        };

        let entry = &doc["mcpServers"][host_config::SERVER_KEY];
        let verified = match self.format {
            SnippetFormat::Local => LocalServerEntry::verify(entry),
            SnippetFormat::Remote => RemoteServerEntry::verify(entry),
        };
        verified.map_err(LoginError::InvalidSnippet)?;
        Ok(doc)
    }
}
