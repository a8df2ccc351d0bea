//! Typed failures of a single Cycloid CLI invocation.

use std::time::Duration;

use thiserror::Error;

/// Number of characters of unparseable output kept in [`CliError::JsonParse`].
pub const PARSE_PREVIEW_CHARS: usize = 100;

#[derive(Error, Debug)]
pub enum CliError {
    /// The binary ran and exited with a non-zero status.
    #[error("CLI command failed with exit code {exit_code}: {stderr}")]
    Execution { command: String, exit_code: i32, stderr: String },

    /// Exit status was zero but stdout was not structured output.
    #[error("Failed to parse JSON output of `{command}`: {preview}")]
    JsonParse { command: String, preview: String },

    #[error("CLI command timed out after {}s: {command}", .timeout.as_secs())]
    Timeout { command: String, timeout: Duration },

    /// A required input (credential header, environment variable) was absent.
    #[error("Missing required value: {field}")]
    Validation { field: String },

    /// The binary could not be launched at all.
    #[error("Failed to launch CLI command `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

impl CliError {
    pub fn validation(field: impl Into<String>) -> Self {
        Self::Validation { field: field.into() }
    }

    /// Build a parse error, keeping only a bounded preview of the output.
    pub fn json_parse(command: impl Into<String>, output: &str) -> Self {
        let preview: String = output.chars().take(PARSE_PREVIEW_CHARS).collect();
        Self::JsonParse { command: command.into(), preview }
    }

    /// Rendered command the error refers to, when there is one.
    pub fn command(&self) -> Option<&str> {
        match self {
            Self::Execution { command, .. }
            | Self::JsonParse { command, .. }
            | Self::Timeout { command, .. }
            | Self::Spawn { command, .. } => Some(command),
            Self::Validation { .. } => None,
        }
    }

    /// Short stable label used for logs, metrics and the error monitor.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Execution { .. } => "cli_execution",
            Self::JsonParse { .. } => "json_parse",
            Self::Timeout { .. } => "timeout",
            Self::Validation { .. } => "validation",
            Self::Spawn { .. } => "spawn",
        }
    }
}
