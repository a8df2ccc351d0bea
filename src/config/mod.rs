//! # Configuration Management
//!
//! Loads server configuration from environment variables (after `.env` has
//! been applied by the binary). Credentials are not part of [`Config`]:
//! HTTP requests carry their own, and the stdio transport reads them once
//! through [`crate::cycloid::Credentials::from_env`].

mod settings;

pub use settings::{
    CliSettings, HttpServerConfig, ObservabilityConfig, RetrySettings, TransportKind,
};

use validator::Validate;

use crate::{Error, Result};

/// Complete server configuration
#[derive(Debug, Clone, Default, Validate)]
pub struct Config {
    pub transport: TransportKind,

    #[validate(nested)]
    pub cli: CliSettings,

    #[validate(nested)]
    pub http: HttpServerConfig,

    #[validate(nested)]
    pub retry: RetrySettings,
}

impl Config {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::load(None, |key| std::env::var(key).ok())
    }

    /// Create configuration from environment variables, forcing a transport
    pub fn from_env_with_transport(transport: TransportKind) -> Result<Self> {
        Self::load(Some(transport), |key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// `CY_HTTP_*` variables take precedence over their plain `CY_*`
    /// counterparts when serving HTTP.
    pub fn load<F>(transport: Option<TransportKind>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let transport = match transport {
            Some(transport) => transport,
            None => var("TRANSPORT")
                .map(|t| t.parse::<TransportKind>())
                .transpose()?
                .unwrap_or_default(),
        };

        let mut cli = CliSettings::defaults_for(transport);
        let (cli_path, api_url) = match transport {
            TransportKind::Stdio => (var("CY_CLI_PATH"), var("CY_API_URL")),
            TransportKind::Http => (
                var("CY_HTTP_CLI_PATH").or_else(|| var("CY_CLI_PATH")),
                var("CY_HTTP_API_URL").or_else(|| var("CY_API_URL")),
            ),
        };
        if let Some(path) = cli_path {
            cli.cli_path = path;
        }
        if let Some(url) = api_url {
            cli.api_url = url;
        }
        if let Some(timeout) = var("CY_CLI_TIMEOUT_SECS") {
            cli.timeout_seconds = timeout
                .parse()
                .map_err(|e| Error::config(format!("Invalid CY_CLI_TIMEOUT_SECS: {}", e)))?;
        }

        let mut http = HttpServerConfig::default();
        if let Some(host) = var("CY_HTTP_HOST") {
            http.host = host;
        }
        if let Some(port) = var("CY_HTTP_PORT") {
            http.port =
                port.parse().map_err(|e| Error::config(format!("Invalid CY_HTTP_PORT: {}", e)))?;
        }

        let mut retry = RetrySettings::default();
        if let Some(attempts) = var("CY_RETRY_MAX_ATTEMPTS") {
            retry.max_attempts = attempts
                .parse()
                .map_err(|e| Error::config(format!("Invalid CY_RETRY_MAX_ATTEMPTS: {}", e)))?;
        }
        if let Some(delay) = var("CY_RETRY_BASE_DELAY_MS") {
            retry.base_delay_ms = delay
                .parse()
                .map_err(|e| Error::config(format!("Invalid CY_RETRY_BASE_DELAY_MS: {}", e)))?;
        }

        let config = Self { transport, cli, http, retry };
        config.validate()?;
        Ok(config)
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(Error::from)
    }
}
