//! MCP Tool for Blueprints
//!
//! Blueprints are listed with `cy stacks list --blueprint`; the CLI wraps
//! them in a `service_catalogs` array.

use futures::future::BoxFuture;
use serde_json::{json, Value};
use tracing::instrument;

use super::{json_result, list_format, ListFormat, ToolContext};
use crate::cycloid::{process_list, Credentials, CycloidCli, Invocation};
use crate::errors::CliError;
use crate::mcp::display_hints::{blueprint_hints, blueprint_table};
use crate::mcp::protocol::{Tool, ToolCallResult};

pub const NAME: &str = "CYCLOID_BLUEPRINT_LIST";

/// Key of the blueprint array in the CLI response
pub const LIST_KEY: &str = "service_catalogs";

pub(crate) const ACTION: &str = "fetch blueprints";

pub(crate) const SUGGESTIONS: &[&str] = &[
    "Check your Cycloid CLI configuration",
    "Verify API credentials and organization settings",
    "Ensure you have access to service catalogs",
];

pub fn cycloid_blueprint_list_tool() -> Tool {
    Tool::new(
        NAME,
        "List all available blueprints with their details. \
         The LLM can filter the results based on user requirements. \
         DISPLAY GUIDANCE: Present as a markdown table. Key fields: name (Name), \
         ref (Reference), description (Description), use_cases (Use Cases). \
         Full JSON details available on request.",
        json!({
            "type": "object",
            "properties": {
                "format": {
                    "type": "string",
                    "enum": ["json", "table"],
                    "description": "Output format (default: json)",
                    "default": "json"
                }
            }
        }),
    )
}

/// `cy stacks list --blueprint`
pub fn list_invocation() -> Invocation {
    Invocation::new("stacks").args(["list", "--blueprint"])
}

/// Fetch every blueprint visible to the organization.
pub async fn fetch_blueprints(
    cli: &CycloidCli,
    credentials: &Credentials,
) -> Result<Vec<Value>, CliError> {
    let data = cli.execute_json(credentials, &list_invocation()).await?;
    Ok(process_list(&data, Some(LIST_KEY)))
}

/// The blueprint whose `ref` equals `reference`.
pub fn find_blueprint<'a>(blueprints: &'a [Value], reference: &str) -> Option<&'a Value> {
    blueprints.iter().find(|bp| bp.get("ref").and_then(Value::as_str) == Some(reference))
}

#[instrument(skip(ctx, args), fields(correlation_id = %ctx.correlation_id), name = "mcp_execute_list_blueprints")]
pub async fn execute_list_blueprints(ctx: &ToolContext, args: Value) -> ToolCallResult {
    let format = match list_format(&args, &[ListFormat::Table]) {
        Ok(format) => format,
        Err(message) => return ctx.invalid_arguments("list blueprints", &message),
    };

    let blueprints = match fetch_blueprints(&ctx.cli, &ctx.credentials).await {
        Ok(blueprints) => blueprints,
        Err(e) => return ctx.cli_failure(ACTION, &e, SUGGESTIONS),
    };

    match format {
        ListFormat::Table => ToolCallResult::text(blueprint_table(&blueprints)),
        _ => json_result(&json!({
            "count": blueprints.len(),
            "blueprints": blueprints,
            "_display_hints": blueprint_hints().to_json(),
        })),
    }
}

pub fn call(ctx: &ToolContext, args: Value) -> BoxFuture<'_, ToolCallResult> {
    Box::pin(execute_list_blueprints(ctx, args))
}
