//! # Error Formatting
//!
//! Renders failures as the markdown diagnostics handed back to MCP clients,
//! and decides which failures are worth an automatic retry.

use std::fmt;
use std::time::Duration;

use super::cli::CliError;

pub const ERROR_EMOJI: &str = "❌";

/// Broad class of a failure, used to pick default remediation hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Authentication,
    Network,
    Configuration,
    Validation,
    Resource,
    RateLimit,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::Network => "network",
            Self::Configuration => "configuration",
            Self::Validation => "validation",
            Self::Resource => "resource",
            Self::RateLimit => "rate_limit",
        }
    }

    /// Default suggestions shown when a handler supplies none of its own.
    pub fn suggestions(&self) -> &'static [&'static str] {
        match self {
            Self::Authentication => &[
                "Verify your API credentials are correct",
                "Check if your API key has expired",
                "Ensure you have the necessary permissions",
            ],
            Self::Network => &[
                "Check your internet connection",
                "Verify the API endpoint is accessible",
                "Try again in a few moments",
            ],
            Self::Configuration => &[
                "Check your configuration settings",
                "Verify environment variables are set correctly",
                "Review the configuration file format",
            ],
            Self::Validation => &[
                "Check the input format and syntax",
                "Verify all required fields are present",
                "Ensure proper data types and values",
            ],
            Self::Resource => &[
                "Verify the resource exists",
                "Check if you have access to the resource",
                "Ensure the resource identifier is correct",
            ],
            Self::RateLimit => &[
                "Wait before retrying the request",
                "Consider reducing request frequency",
                "Check if you have exceeded API limits",
            ],
        }
    }

    /// Classify a CLI failure.
    ///
    /// The CLI exits with status 1 for rejected credentials, so that case is
    /// treated as an authentication problem.
    pub fn of(error: &CliError) -> Self {
        match error {
            CliError::Execution { exit_code: 1, .. } => Self::Authentication,
            CliError::Execution { stderr, .. } if mentions_transient_failure(stderr) => {
                Self::Network
            }
            CliError::Execution { .. } => Self::Configuration,
            CliError::Timeout { .. } => Self::Network,
            CliError::Validation { .. } => Self::Validation,
            CliError::JsonParse { .. } | CliError::Spawn { .. } => Self::Configuration,
        }
    }

    /// Classify a free-form error message.
    pub fn of_message(message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("validation") || lower.contains("invalid") {
            Self::Validation
        } else if lower.contains("not found") || lower.contains("missing") {
            Self::Resource
        } else {
            Self::Configuration
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn mentions_transient_failure(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("timeout") || lower.contains("timed out") || lower.contains("connection")
}

/// Render the standard failure message.
///
/// ```text
/// ❌ **Failed to <action>**
///
/// **Error:** <message>
///
/// **Correlation ID:** `<id>`
///
/// **Suggestions:**
/// - ...
/// ```
pub fn format_error(
    action: &str,
    message: &str,
    suggestions: &[&str],
    correlation_id: Option<&str>,
) -> String {
    let mut parts = vec![format!("{ERROR_EMOJI} **Failed to {action}**"), String::new()];
    parts.push(format!("**Error:** {message}"));

    if let Some(id) = correlation_id {
        parts.push(String::new());
        parts.push(format!("**Correlation ID:** `{id}`"));
    }

    if !suggestions.is_empty() {
        parts.push(String::new());
        parts.push("**Suggestions:**".to_string());
        parts.extend(suggestions.iter().map(|s| format!("- {s}")));
    }

    parts.join("\n")
}

/// Render a CLI failure.
///
/// Non-zero exits are reported against the command that failed, with the
/// category's default suggestions. Every other variant is reported against
/// `action`, preferring the caller's `suggestions` when given.
pub fn format_cli_error(
    action: &str,
    error: &CliError,
    suggestions: &[&str],
    correlation_id: Option<&str>,
) -> String {
    let category = ErrorCategory::of(error);
    match error {
        CliError::Execution { command, exit_code, stderr } => format_error(
            &format!("execute CLI command: {command}"),
            &format!("Exit code {exit_code}: {}", stderr.trim()),
            category.suggestions(),
            correlation_id,
        ),
        other => {
            let suggestions =
                if suggestions.is_empty() { category.suggestions() } else { suggestions };
            format_error(action, &other.to_string(), suggestions, correlation_id)
        }
    }
}

/// Opt-in retry policy for transient CLI failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay: Duration::from_secs(1) }
    }
}

impl RetryPolicy {
    /// Policy that never retries.
    pub fn none() -> Self {
        Self { max_attempts: 1, base_delay: Duration::ZERO }
    }

    /// Whether `attempt` (1-based) may be followed by another one.
    pub fn should_retry(&self, error: &CliError, attempt: u32) -> bool {
        if attempt >= self.max_attempts {
            return false;
        }
        match error {
            CliError::Timeout { .. } => true,
            CliError::Execution { stderr, .. } => mentions_transient_failure(stderr),
            _ => false,
        }
    }

    /// Exponential backoff: `base * 2^(attempt - 1)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }
}
