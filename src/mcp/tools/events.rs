//! MCP Tool for Organization Events
//!
//! Wraps `cy event list` with optional time, severity and type filters.

use futures::future::BoxFuture;
use serde_json::{json, Value};
use tracing::instrument;

use super::{json_result, list_format, string_arg, string_list_arg, ListFormat, ToolContext};
use crate::cycloid::{process_list, Invocation};
use crate::mcp::display_hints::{event_hints, event_table};
use crate::mcp::protocol::{Tool, ToolCallResult};

pub const NAME: &str = "CYCLOID_EVENT_LIST";

const ACTION: &str = "fetch organization events";

const SUGGESTIONS: &[&str] = &[
    "Check your Cycloid CLI configuration",
    "Verify API credentials and organization settings",
    "Adjust filters like severity or type if too restrictive",
];

pub fn cycloid_event_list_tool() -> Tool {
    Tool::new(
        NAME,
        "List organization events with optional filters (begin, end, severity, type). \
         DISPLAY GUIDANCE: Present as a markdown table. Key fields: title (Title), \
         severity (Severity), type (Type), timestamp (Timestamp). \
         Full JSON details available on request.",
        json!({
            "type": "object",
            "properties": {
                "format": {
                    "type": "string",
                    "enum": ["json", "table"],
                    "description": "Output format (default: json)",
                    "default": "json"
                },
                "begin": {
                    "type": "string",
                    "description": "Unix timestamp of the start date"
                },
                "end": {
                    "type": "string",
                    "description": "Unix timestamp of the end date"
                },
                "severity": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Severities to include (e.g. info, warn, err, crit)"
                },
                "type": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Event types to include (e.g. Cycloid, AWS, Monitoring, Custom)"
                }
            }
        }),
    )
}

/// Event filters; absent or empty filters are not passed to the CLI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilters {
    pub begin: Option<String>,
    pub end: Option<String>,
    pub severity: Vec<String>,
    pub event_type: Vec<String>,
}

impl EventFilters {
    pub fn from_args(args: &Value) -> Self {
        Self {
            begin: string_arg(args, "begin"),
            end: string_arg(args, "end"),
            severity: string_list_arg(args, "severity"),
            event_type: string_list_arg(args, "type"),
        }
    }

    /// `cy event list [--begin B] [--end E] [--severity a,b] [--type x,y]`
    pub fn invocation(&self) -> Invocation {
        let joined = |values: &[String]| (!values.is_empty()).then(|| values.join(","));
        Invocation::new("event")
            .arg("list")
            .flag_opt("begin", self.begin.as_deref())
            .flag_opt("end", self.end.as_deref())
            .flag_opt("severity", joined(&self.severity))
            .flag_opt("type", joined(&self.event_type))
    }
}

#[instrument(skip(ctx, args), fields(correlation_id = %ctx.correlation_id), name = "mcp_execute_list_events")]
pub async fn execute_list_events(ctx: &ToolContext, args: Value) -> ToolCallResult {
    let format = match list_format(&args, &[ListFormat::Table]) {
        Ok(format) => format,
        Err(message) => return ctx.invalid_arguments("list events", &message),
    };
    let filters = EventFilters::from_args(&args);

    tracing::debug!(filters = ?filters, "Listing events");

    let data = match ctx.cli.execute_json(&ctx.credentials, &filters.invocation()).await {
        Ok(data) => data,
        Err(e) => return ctx.cli_failure(ACTION, &e, SUGGESTIONS),
    };
    let events = process_list(&data, None);

    match format {
        ListFormat::Table => ToolCallResult::text(event_table(&events)),
        _ => json_result(&json!({
            "count": events.len(),
            "events": events,
            "_display_hints": event_hints().to_json(),
        })),
    }
}

pub fn call(ctx: &ToolContext, args: Value) -> BoxFuture<'_, ToolCallResult> {
    Box::pin(execute_list_events(ctx, args))
}
