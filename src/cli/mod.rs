//! # Command Line Interface
//!
//! Flags of the `cycloid-mcp` binary. Every flag overrides the matching
//! environment variable.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use crate::config::{Config, ObservabilityConfig, TransportKind};
use crate::cycloid::{Credentials, CycloidCli};
use crate::mcp::http::{self, AppState};
use crate::mcp::{McpHandler, McpStdioServer};
use crate::observability::{init_logging, log_config_info};
use crate::{APP_NAME, VERSION};

#[derive(Debug, Parser)]
#[command(name = "cycloid-mcp")]
#[command(about = "MCP server for the Cycloid CLI")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Transport to serve (stdio or http), overrides TRANSPORT
    #[arg(long)]
    pub transport: Option<TransportKind>,

    /// HTTP bind host, overrides CY_HTTP_HOST
    #[arg(long)]
    pub host: Option<String>,

    /// HTTP port, overrides CY_HTTP_PORT
    #[arg(long)]
    pub port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Load configuration from the environment and apply the flags on top.
    pub fn load_config(&self) -> crate::Result<Config> {
        let mut config = match self.transport {
            Some(transport) => Config::from_env_with_transport(transport)?,
            None => Config::from_env()?,
        };
        if let Some(host) = &self.host {
            config.http.host = host.clone();
        }
        if let Some(port) = self.port {
            config.http.port = port;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn observability(&self) -> ObservabilityConfig {
        let mut observability = ObservabilityConfig::from_env();
        if self.verbose {
            observability.log_level = "debug".to_string();
        }
        observability
    }
}

/// Run the server selected by the command line and environment
pub async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // A missing .env file is fine; anything else is worth a warning
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Error loading .env file: {}", e);
        }
    }

    init_logging(&cli.observability());
    info!(app_name = APP_NAME, version = VERSION, "Starting Cycloid MCP server");

    let config = cli.load_config()?;
    log_config_info(&config);

    let cycloid = Arc::new(CycloidCli::new(config.cli.clone()));
    let handler = Arc::new(McpHandler::new(cycloid, config.retry.policy()));

    match config.transport {
        TransportKind::Stdio => {
            let credentials = Credentials::from_env()
                .context("The stdio transport requires CY_ORG and CY_API_KEY")?;
            McpStdioServer::new(handler, credentials).run().await
        }
        TransportKind::Http => {
            http::serve(&config.http, AppState::new(handler)).await?;
            Ok(())
        }
    }
}
