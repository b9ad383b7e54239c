//! Server configuration: defaults, then an optional YAML file, then the
//! environment. CLI flags are applied last by the `serve` command.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::credential::Credential;

pub const DEFAULT_API_URL: &str = "https://api.plantos.co";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Which adapter `serve` runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    #[default]
    Stdio,
    Http,
}

impl FromStr for Transport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stdio" => Ok(Transport::Stdio),
            "http" => Ok(Transport::Http),
            other => Err(format!("expected 'stdio' or 'http', got '{}'", other)),
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Stdio => f.write_str("stdio"),
            Transport::Http => f.write_str("http"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Base URL of the Plantos API.
    pub api_url: String,

    /// Credential used by the local channel. Ignored by the HTTP transport,
    /// where every request brings its own.
    #[serde(deserialize_with = "credential_opt")]
    pub api_key: Option<Credential>,

    pub transport: Transport,
    pub host: String,
    pub port: u16,

    /// Per-call timeout for backend requests.
    pub timeout_secs: u64,

    /// Extra PEM bundle added to the built-in trust roots.
    pub ca_bundle: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            transport: Transport::Stdio,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            ca_bundle: None,
        }
    }
}

fn credential_opt<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Credential>, D::Error> {
    Ok(Option::<String>::deserialize(d)?.and_then(Credential::new))
}

impl ServerConfig {
    /// Load a YAML file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Defaults, overlaid with `path` if given, overlaid with the process environment.
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Overlay values from an environment lookup. Empty variables are ignored.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = var("PLANTOS_API_URL") {
            self.api_url = url;
        }
        if let Some(key) = var("PLANTOS_API_KEY") {
            self.api_key = Credential::new(key);
        }
        if let Some(transport) = var("MCP_TRANSPORT") {
            self.transport = transport
                .parse()
                .map_err(|reason: String| ConfigError::invalid("MCP_TRANSPORT", reason))?;
        }
        if let Some(host) = var("HOST") {
            self.host = host;
        }
        if let Some(port) = var("PORT") {
            self.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid("PORT", format!("'{}' is not a port", port)))?;
        }
        if let Some(secs) = var("PLANTOS_TIMEOUT_SECS") {
            self.timeout_secs = secs.trim().parse().map_err(|_| {
                ConfigError::invalid(
                    "PLANTOS_TIMEOUT_SECS",
                    format!("'{}' is not a number of seconds", secs),
                )
            })?;
        }
        if let Some(bundle) = var("PLANTOS_CA_BUNDLE") {
            self.ca_bundle = Some(PathBuf::from(bundle));
        }
        Ok(())
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.api_url.starts_with("https://") || self.api_url.starts_with("http://")) {
            return Err(ConfigError::invalid(
                "api_url",
                format!("'{}' must start with http:// or https://", self.api_url),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::invalid("timeout_secs", "must be greater than zero"));
        }
        if self.host.trim().is_empty() {
            return Err(ConfigError::invalid("host", "must not be empty"));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
