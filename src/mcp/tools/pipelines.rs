//! MCP Tool for Pipelines

use futures::future::BoxFuture;
use serde_json::{json, Value};
use tracing::instrument;

use super::{json_result, list_format, ListFormat, ToolContext};
use crate::cycloid::{process_list, Invocation};
use crate::mcp::display_hints::{pipeline_hints, pipeline_summary};
use crate::mcp::protocol::{Tool, ToolCallResult};

pub const NAME: &str = "CYCLOID_PIPELINE_LIST";

const ACTION: &str = "list pipelines";

const SUGGESTIONS: &[&str] = &[
    "Check your Cycloid CLI configuration",
    "Verify API credentials and organization settings",
];

pub fn cycloid_pipeline_list_tool() -> Tool {
    Tool::new(
        NAME,
        "List all pipelines from Cycloid. \
         DISPLAY GUIDANCE: Present as a markdown table. Key fields: name (Pipeline), \
         status (Status), project name from component.project.name (Project), \
         environment name from component.environment.name (Environment). \
         Full JSON details available on request.",
        json!({
            "type": "object",
            "properties": {
                "format": {
                    "type": "string",
                    "enum": ["json", "summary"],
                    "description": "Output format (default: json)",
                    "default": "json"
                }
            }
        }),
    )
}

pub fn list_invocation() -> Invocation {
    Invocation::new("pipeline").arg("list")
}

#[instrument(skip(ctx, args), fields(correlation_id = %ctx.correlation_id), name = "mcp_execute_list_pipelines")]
pub async fn execute_list_pipelines(ctx: &ToolContext, args: Value) -> ToolCallResult {
    let format = match list_format(&args, &[ListFormat::Summary]) {
        Ok(format) => format,
        Err(message) => return ctx.invalid_arguments(ACTION, &message),
    };

    let pipelines = match ctx.cli.execute_json(&ctx.credentials, &list_invocation()).await {
        Ok(data) => process_list(&data, None),
        Err(e) => return ctx.cli_failure(ACTION, &e, SUGGESTIONS),
    };

    match format {
        ListFormat::Summary => ToolCallResult::text(pipeline_summary(&pipelines)),
        _ => json_result(&json!({
            "count": pipelines.len(),
            "pipelines": pipelines,
            "_display_hints": pipeline_hints().to_json(),
        })),
    }
}

pub fn call(ctx: &ToolContext, args: Value) -> BoxFuture<'_, ToolCallResult> {
    Box::pin(execute_list_pipelines(ctx, args))
}
