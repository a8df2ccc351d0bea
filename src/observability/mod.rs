//! # Observability Infrastructure
//!
//! Structured logging, metrics and CLI error monitoring for the server.
//!
//! All log output goes to stderr. On the stdio transport stdout carries the
//! JSON-RPC stream and must stay clean.

pub mod error_monitor;
pub mod logging;
pub mod metrics;

pub use error_monitor::{ErrorMonitor, ErrorSummary};
pub use logging::log_config_info;
pub use metrics::MetricsRecorder;

use crate::config::ObservabilityConfig;
use ::tracing::info;
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber.
///
/// The filter comes from `RUST_LOG` when set, otherwise from
/// `config.log_level`. Returns `false` when a subscriber was already
/// installed, which is not an error.
pub fn init_logging(config: &ObservabilityConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    let installed = if config.json_logging {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    };

    if installed {
        info!(
            service_name = %config.service_name,
            log_level = %config.log_level,
            json_logging = config.json_logging,
            "Logging initialized"
        );
    }
    installed
}
