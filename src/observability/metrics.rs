//! # Metrics Collection
//!
//! Counters and histograms for CLI invocations and MCP traffic, emitted
//! through the `metrics` facade. No exporter is installed here; embedders
//! may install one.

use metrics::{counter, histogram};

/// Records application metrics through the global `metrics` recorder.
#[derive(Debug, Clone, Default)]
pub struct MetricsRecorder;

impl MetricsRecorder {
    pub fn new() -> Self {
        Self
    }

    /// Record one finished (or failed to launch) CLI invocation
    pub fn record_cli_invocation(&self, subcommand: &str, success: bool, duration: f64) {
        let status = if success { "success" } else { "error" };
        let labels = [("subcommand", subcommand.to_string()), ("status", status.to_string())];
        counter!("cycloid_cli_invocations_total", &labels).increment(1);

        let duration_labels = [("subcommand", subcommand.to_string())];
        histogram!("cycloid_cli_duration_seconds", &duration_labels).record(duration);
    }

    /// Record an MCP tool call outcome
    pub fn record_tool_call(&self, tool: &str, is_error: bool, duration: f64) {
        let status = if is_error { "error" } else { "success" };
        let labels = [("tool", tool.to_string()), ("status", status.to_string())];
        counter!("mcp_tool_calls_total", &labels).increment(1);

        let duration_labels = [("tool", tool.to_string())];
        histogram!("mcp_tool_call_duration_seconds", &duration_labels).record(duration);
    }

    /// Record a resource read
    pub fn record_resource_read(&self, uri: &str, success: bool) {
        let status = if success { "success" } else { "error" };
        let labels = [("uri", uri.to_string()), ("status", status.to_string())];
        counter!("mcp_resource_reads_total", &labels).increment(1);
    }

    /// Record an elicitation round-trip and the client's action
    pub fn record_elicitation(&self, action: &str) {
        let labels = [("action", action.to_string())];
        counter!("mcp_elicitations_total", &labels).increment(1);
    }
}
