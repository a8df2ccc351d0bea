//! # Structured Logging
//!
//! The tool call span macro and the startup configuration log line.
//!
//! Every span carries a `correlation_id`. Tool failures echo the same id
//! back to the client, so a user-visible error can be matched with the
//! server logs.

/// Create a tracing span for an MCP tool call.
///
/// ```rust,ignore
/// let span = tool_span!("CYCLOID_EVENT_LIST", correlation_id);
/// let span = tool_span!("CYCLOID_EVENT_LIST", correlation_id, org = "acme");
/// ```
#[macro_export]
macro_rules! tool_span {
    ($tool:expr, $correlation_id:expr) => {
        tracing::info_span!(
            "mcp_tool_call",
            tool = %$tool,
            correlation_id = %$correlation_id,
            org = tracing::field::Empty
        )
    };
    ($tool:expr, $correlation_id:expr, $($field:tt)*) => {
        tracing::info_span!(
            "mcp_tool_call",
            tool = %$tool,
            correlation_id = %$correlation_id,
            $($field)*
        )
    };
}

/// Log configuration at startup. Credentials are never part of [`Config`].
///
/// [`Config`]: crate::config::Config
pub fn log_config_info(config: &crate::config::Config) {
    tracing::info!(
        transport = %config.transport,
        cli_path = %config.cli.cli_path,
        api_url = %config.cli.api_url,
        cli_timeout_secs = config.cli.timeout_seconds,
        http_address = %config.http.bind_address(),
        retry_max_attempts = config.retry.max_attempts,
        "Cycloid MCP server configuration"
    );
}
