//! `plantos-mcp serve`: run a transport adapter.

use std::path::PathBuf;
use std::sync::Arc;

use log::info;
use tokio::sync::watch;

use crate::client::{BackendClient, ClientBuildError};
use crate::config::{ConfigError, ServerConfig, Transport};
use crate::gateway::ToolGateway;
use crate::transport::{http, stdio::StdioServer, TransportError};

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Client(#[from] ClientBuildError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Run the MCP server (stdio or HTTP)
#[derive(argh::FromArgs, Debug, Default)]
#[argh(subcommand, name = "serve")]
pub struct ServeCommand {
    /// transport: stdio or http (default: stdio, or MCP_TRANSPORT)
    #[argh(option, short = 't')]
    pub transport: Option<Transport>,

    /// HTTP bind address (default: 0.0.0.0, or HOST)
    #[argh(option)]
    pub host: Option<String>,

    /// HTTP port (default: 8080, or PORT)
    #[argh(option, short = 'p')]
    pub port: Option<u16>,

    /// plantos API base URL (default: https://api.plantos.co, or PLANTOS_API_URL)
    #[argh(option)]
    pub api_url: Option<String>,

    /// YAML config file
    #[argh(option, short = 'c')]
    pub config: Option<PathBuf>,
}

impl ServeCommand {
    /// Resolve the effective configuration: file, environment, then flags.
    pub fn resolve_config(&self) -> Result<ServerConfig, ConfigError> {
        let mut config = ServerConfig::resolve(self.config.as_deref())?;
        if let Some(transport) = self.transport {
            config.transport = transport;
        }
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(url) = &self.api_url {
            config.api_url = url.clone();
        }
        config.validate()?;
        Ok(config)
    }

    pub async fn run(&self, shutdown: watch::Receiver<()>) -> Result<(), ServeError> {
        let config = self.resolve_config()?;
        let backend =
            BackendClient::new(&config.api_url, config.timeout(), config.ca_bundle.as_deref())?;
        let gateway = Arc::new(ToolGateway::new(backend));

        info!(
            "Starting Plantos MCP server ({} transport, API {})",
            config.transport, config.api_url
        );

        match config.transport {
            Transport::Stdio => {
                if let Some(key) = &config.api_key {
                    info!("Using API key {}", key);
                }
                StdioServer::new(gateway, config.api_key)
                    .run_stdio(shutdown)
                    .await?;
            }
            Transport::Http => {
                let listener = http::bind(&config.host, config.port).await?;
                http::run_http_server(gateway, listener, shutdown).await?;
            }
        }

        info!("Plantos MCP server stopped");
        Ok(())
    }
}
