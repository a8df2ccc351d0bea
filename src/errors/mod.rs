//! # Error Handling
//!
//! Error types for the Cycloid MCP server, built on `thiserror`.
//!
//! - [`Error`] covers process-level failures (configuration, transport, I/O).
//! - [`CliError`] is the typed failure of a single Cycloid CLI invocation.
//! - [`formatter`] turns either into the markdown diagnostics returned to
//!   MCP clients, and holds the opt-in retry policy.

pub mod cli;
pub mod formatter;

pub use cli::CliError;
pub use formatter::{format_cli_error, format_error, ErrorCategory, RetryPolicy};

/// Custom result type for server operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the server process
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network transport errors (stdio, HTTP)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Failures of the wrapped CLI that escape a request boundary
    #[error(transparent)]
    Cli(#[from] CliError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new transport error
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport(message.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Config(errors.to_string())
    }
}
