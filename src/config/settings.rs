//! # Configuration Settings
//!
//! Defines the configuration structures for the Cycloid MCP server.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::{Error, RetryPolicy};

/// Which MCP transport the process serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Stdio,
    Http,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stdio => "stdio",
            Self::Http => "http",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stdio" => Ok(Self::Stdio),
            "http" => Ok(Self::Http),
            other => Err(Error::config(format!(
                "Invalid transport '{other}'. Must be 'stdio' or 'http'"
            ))),
        }
    }
}

/// How to invoke the wrapped Cycloid CLI
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CliSettings {
    /// Path or name of the `cy` binary
    #[validate(length(min = 1, message = "CLI path cannot be empty"))]
    pub cli_path: String,

    /// Cycloid API base URL passed to the CLI as `CY_API_URL`
    #[validate(length(min = 1, message = "API URL cannot be empty"))]
    pub api_url: String,

    /// Per-invocation timeout
    #[validate(range(
        min = 1,
        max = 3600,
        message = "CLI timeout must be between 1 and 3600 seconds"
    ))]
    pub timeout_seconds: u64,
}

impl CliSettings {
    pub const STDIO_CLI_PATH: &'static str = "cy";
    pub const HTTP_CLI_PATH: &'static str = "/usr/local/bin/cy";
    pub const STDIO_API_URL: &'static str = "https://api.cycloid.io";
    pub const HTTP_API_URL: &'static str = "https://http-api.cycloid.io";
    pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Defaults for a transport before any environment overrides.
    pub fn defaults_for(transport: TransportKind) -> Self {
        let (cli_path, api_url) = match transport {
            TransportKind::Stdio => (Self::STDIO_CLI_PATH, Self::STDIO_API_URL),
            TransportKind::Http => (Self::HTTP_CLI_PATH, Self::HTTP_API_URL),
        };
        Self {
            cli_path: cli_path.to_string(),
            api_url: api_url.to_string(),
            timeout_seconds: Self::DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

impl Default for CliSettings {
    fn default() -> Self {
        Self::defaults_for(TransportKind::Stdio)
    }
}

/// HTTP transport listener configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct HttpServerConfig {
    #[validate(length(min = 1, message = "Host cannot be empty"))]
    pub host: String,

    #[validate(range(min = 1, message = "HTTP port must be between 1 and 65535"))]
    pub port: u16,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 8000 }
    }
}

impl HttpServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Retry behaviour for resource snapshots
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RetrySettings {
    #[validate(range(min = 1, max = 10, message = "Retry attempts must be between 1 and 10"))]
    pub max_attempts: u32,

    pub base_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay_ms: 1000 }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ObservabilityConfig {
    /// Service name attached to startup logs
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service_name: String,

    /// Log level (trace, debug, info, warn, error), used when `RUST_LOG` is unset
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logging: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: crate::APP_NAME.to_string(),
            log_level: "info".to_string(),
            json_logging: false,
        }
    }
}

impl ObservabilityConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(level) = std::env::var("CY_LOG_LEVEL") {
            if !level.trim().is_empty() {
                config.log_level = level.trim().to_lowercase();
            }
        }
        if let Ok(json) = std::env::var("CY_LOG_JSON") {
            config.json_logging = parse_bool(&json);
        }
        config
    }
}

pub(crate) fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_kind_parsing() {
        assert_eq!("stdio".parse::<TransportKind>().unwrap(), TransportKind::Stdio);
        assert_eq!(" HTTP ".parse::<TransportKind>().unwrap(), TransportKind::Http);
        assert!("sse".parse::<TransportKind>().is_err());
        assert_eq!(TransportKind::Http.to_string(), "http");
    }

    #[test]
    fn test_cli_settings_defaults_per_transport() {
        let stdio = CliSettings::defaults_for(TransportKind::Stdio);
        assert_eq!(stdio.cli_path, "cy");
        assert_eq!(stdio.api_url, "https://api.cycloid.io");
        assert_eq!(stdio.timeout(), Duration::from_secs(30));

        let http = CliSettings::defaults_for(TransportKind::Http);
        assert_eq!(http.cli_path, "/usr/local/bin/cy");
        assert_eq!(http.api_url, "https://http-api.cycloid.io");
    }

    #[test]
    fn test_cli_settings_validation() {
        let mut settings = CliSettings::default();
        assert!(settings.validate().is_ok());

        settings.timeout_seconds = 0;
        assert!(settings.validate().is_err());

        let settings = CliSettings { cli_path: String::new(), ..Default::default() };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_http_server_config_bind_address() {
        let config = HttpServerConfig { host: "127.0.0.1".to_string(), port: 8080 };
        assert_eq!(config.bind_address(), "127.0.0.1:8080");
        assert!(config.validate().is_ok());

        let config = HttpServerConfig { port: 0, ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retry_settings_policy() {
        let policy = RetrySettings { max_attempts: 2, base_delay_ms: 250 }.policy();
        assert_eq!(policy.max_attempts, 2);
        assert_eq!(policy.base_delay, Duration::from_millis(250));

        assert!(RetrySettings { max_attempts: 0, base_delay_ms: 0 }.validate().is_err());
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("true"));
        assert!(parse_bool(" 1 "));
        assert!(parse_bool("YES"));
        assert!(!parse_bool("false"));
        assert!(!parse_bool(""));
    }
}
