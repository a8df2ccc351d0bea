//! # Cycloid MCP
//!
//! A Model Context Protocol server that exposes the Cycloid CLI (`cy`) to
//! LLM clients as tools and resources.
//!
//! ## Architecture
//!
//! ```text
//! MCP client ──stdio/HTTP──▶ McpHandler ──▶ tools / resources ──▶ CycloidCli ──▶ cy
//!                               ▲                    │
//!                               └──── elicitation ◀──┘
//! ```
//!
//! ## Core Components
//!
//! - **Transports**: line-delimited JSON-RPC on stdio, stateless JSON-RPC over
//!   HTTP with per-request credential headers
//! - **Tools**: catalog, event, pipeline and blueprint listings, interactive
//!   stack creation, StackForms validation
//! - **Resources**: JSON snapshots under `cycloid://`
//! - **CLI wrapper**: argv construction, timeouts, output parsing and typed
//!   failures
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use cycloid_mcp::cycloid::{Credentials, CycloidCli};
//! use cycloid_mcp::mcp::{McpHandler, McpStdioServer};
//! use cycloid_mcp::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let cli = Arc::new(CycloidCli::new(config.cli.clone()));
//!     let handler = Arc::new(McpHandler::new(cli, config.retry.policy()));
//!     McpStdioServer::new(handler, Credentials::from_env()?).run().await
//! }
//! ```

pub mod cli;
pub mod config;
pub mod cycloid;
pub mod errors;
pub mod mcp;
pub mod observability;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

// Re-export commonly used types and traits
pub use config::Config;
pub use errors::{Error, Result};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
