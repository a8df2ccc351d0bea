//! MCP Tool for Service Catalog Repositories
//!
//! Wraps `cy catalog-repository list`.

use futures::future::BoxFuture;
use serde_json::{json, Value};
use tracing::instrument;

use super::{json_result, list_format, ListFormat, ToolContext};
use crate::cycloid::{process_list, Invocation};
use crate::mcp::display_hints::{catalog_hints, catalog_table};
use crate::mcp::protocol::{Tool, ToolCallResult};

pub const NAME: &str = "CYCLOID_CATALOG_REPO_LIST";

const ACTION: &str = "fetch catalog repositories";

const SUGGESTIONS: &[&str] = &[
    "Check your Cycloid CLI configuration",
    "Verify API credentials and organization settings",
    "Ensure you have access to catalog repositories",
];

pub fn cycloid_catalog_repo_list_tool() -> Tool {
    Tool::new(
        NAME,
        "List all available service catalog repositories with their details. \
         The LLM can filter the results based on user requirements. \
         DISPLAY GUIDANCE: Present as a markdown table. Key fields: canonical (Name), \
         url (URL), branch (Branch), stack_count (Stacks). \
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

/// `cy catalog-repository list`
pub fn list_invocation() -> Invocation {
    Invocation::new("catalog-repository").arg("list")
}

#[instrument(skip(ctx, args), fields(correlation_id = %ctx.correlation_id), name = "mcp_execute_list_catalog_repositories")]
pub async fn execute_list_catalog_repositories(ctx: &ToolContext, args: Value) -> ToolCallResult {
    let format = match list_format(&args, &[ListFormat::Table]) {
        Ok(format) => format,
        Err(message) => return ctx.invalid_arguments("list catalog repositories", &message),
    };

    let data = match ctx.cli.execute_json(&ctx.credentials, &list_invocation()).await {
        Ok(data) => data,
        Err(e) => return ctx.cli_failure(ACTION, &e, SUGGESTIONS),
    };
    let repositories = process_list(&data, None);

    tracing::info!(count = repositories.len(), "Listed catalog repositories");

    match format {
        ListFormat::Table => ToolCallResult::text(catalog_table(&repositories)),
        _ => json_result(&json!({
            "count": repositories.len(),
            "repositories": repositories,
            "_display_hints": catalog_hints().to_json(),
        })),
    }
}

pub fn call(ctx: &ToolContext, args: Value) -> BoxFuture<'_, ToolCallResult> {
    Box::pin(execute_list_catalog_repositories(ctx, args))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{tool_context, MockRunner};
    use std::sync::Arc;

    fn payload() -> Value {
        json!([{"canonical": "test-repo", "branch": "main", "url": "https://x", "stack_count": 5}])
    }

    #[tokio::test]
    async fn test_lists_repositories_as_json() {
        let runner = Arc::new(MockRunner::new().respond_json(payload()));
        let ctx = tool_context(runner.clone());

        let result = execute_list_catalog_repositories(&ctx, json!({})).await;
        assert!(!result.is_error());

        let body: Value = serde_json::from_str(&result.text_content()).unwrap();
        assert_eq!(body["count"], 1);
        assert_eq!(body["repositories"], payload());
        assert_eq!(body["_display_hints"]["sort_by"], "canonical");

        let argv = &runner.calls()[0].argv;
        assert_eq!(&argv[1..], ["catalog-repository", "list", "--output", "json"]);
    }

    #[tokio::test]
    async fn test_table_format() {
        let runner = Arc::new(MockRunner::new().respond_json(payload()));
        let ctx = tool_context(runner);

        let result = execute_list_catalog_repositories(&ctx, json!({"format": "table"})).await;
        let text = result.text_content();
        assert!(text.contains("| test-repo | main | https://x | 5 |"));
    }

    #[tokio::test]
    async fn test_cli_failure_is_a_diagnostic() {
        let runner = Arc::new(MockRunner::new().respond(1, "", "unauthorized"));
        let ctx = tool_context(runner);

        let result = execute_list_catalog_repositories(&ctx, json!({})).await;
        assert!(result.is_error());
        let text = result.text_content();
        assert!(text.starts_with("❌ **Failed to execute CLI command:"));
        assert!(text.contains("Exit code 1: unauthorized"));
        assert!(text.contains(&format!("**Correlation ID:** `{}`", ctx.correlation_id)));
    }

    #[tokio::test]
    async fn test_invalid_format_does_not_run_cli() {
        let runner = Arc::new(MockRunner::new());
        let ctx = tool_context(runner.clone());

        let result = execute_list_catalog_repositories(&ctx, json!({"format": "xml"})).await;
        assert!(result.is_error());
        assert!(runner.calls().is_empty());
    }
}
