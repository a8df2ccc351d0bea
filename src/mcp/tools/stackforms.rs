//! MCP Tool for StackForms validation
//!
//! The submitted `.forms.yml` content is written to a temporary file that
//! lives for the duration of `cy stacks forms validate <path>`.

use std::io::Write;

use futures::future::BoxFuture;
use serde_json::{json, Value};
use tempfile::NamedTempFile;
use tracing::{error, info, instrument};

use super::ToolContext;
use crate::cycloid::{Invocation, InvocationResult};
use crate::mcp::protocol::{Tool, ToolCallResult};

pub const NAME: &str = "CYCLOID_STACKFORMS_VALIDATE";

const VALIDATION_SUGGESTIONS: &[&str] = &[
    "Check YAML syntax",
    "Verify widget configurations",
    "Ensure proper technology injection",
    "Validate variable naming conventions",
];

pub fn cycloid_stackforms_validate_tool() -> Tool {
    Tool::new(
        NAME,
        "Validate a StackForms (.forms.yml) file using the Cycloid CLI. \
         This tool can validate StackForms configuration and provide detailed \
         feedback for fixing issues.",
        json!({
            "type": "object",
            "properties": {
                "forms_content": {
                    "type": "string",
                    "description": "The content of the .forms.yml file to validate"
                }
            },
            "required": ["forms_content"]
        }),
    )
}

/// `cy stacks forms validate <path>`
pub fn validate_invocation(path: &str) -> Invocation {
    Invocation::new("stacks").args(["forms", "validate", path])
}

fn write_forms_file(content: &str) -> std::io::Result<NamedTempFile> {
    let mut file = tempfile::Builder::new().prefix("stackforms-").suffix(".yml").tempfile()?;
    file.write_all(content.as_bytes())?;
    file.flush()?;
    Ok(file)
}

fn render_outcome(result: &InvocationResult) -> ToolCallResult {
    if result.success() {
        let body = if result.stdout.trim().is_empty() {
            "The StackForms file is valid and follows Cycloid best practices."
        } else {
            result.stdout.as_str()
        };
        return ToolCallResult::text(format!("✅ **StackForms Validation Successful**\n\n{body}"));
    }

    let suggestions =
        VALIDATION_SUGGESTIONS.iter().map(|s| format!("- {s}")).collect::<Vec<_>>().join("\n");
    ToolCallResult::error(format!(
        "❌ **StackForms Validation Failed**\n\n\
         Exit code: {}\n\n\
         **Error output:**\n{}\n\n\
         **Suggestions:**\n{suggestions}",
        result.exit_code, result.stderr
    ))
}

#[instrument(skip(ctx, args), fields(correlation_id = %ctx.correlation_id), name = "mcp_execute_validate_stackforms")]
pub async fn execute_validate_stackforms(ctx: &ToolContext, args: Value) -> ToolCallResult {
    let Some(content) = args.get("forms_content").and_then(Value::as_str) else {
        return ctx.invalid_arguments(
            "validate StackForms",
            "Missing required parameter 'forms_content'",
        );
    };

    let file = match write_forms_file(content) {
        Ok(file) => file,
        Err(e) => {
            error!(error = %e, "Failed to write StackForms file");
            return ToolCallResult::error(format!(
                "❌ **Unexpected Error**\n\nFailed to validate StackForms file: {e}"
            ));
        }
    };
    let path = file.path().to_string_lossy().into_owned();
    info!(path = %path, bytes = content.len(), "Validating StackForms file");

    // `file` is dropped, and the path removed, after the CLI returns.
    let outcome = ctx.cli.execute(&ctx.credentials, &validate_invocation(&path)).await;
    drop(file);

    match outcome {
        Ok(result) => render_outcome(&result),
        Err(e) => ToolCallResult::error(format!("❌ **Validation Error**\n\n{e}")),
    }
}

pub fn call(ctx: &ToolContext, args: Value) -> BoxFuture<'_, ToolCallResult> {
    Box::pin(execute_validate_stackforms(ctx, args))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{tool_context, MockRunner};
    use std::path::Path;
    use std::sync::Arc;

    const FORMS: &str = "version: \"2\"\nuse_cases:\n  - name: default\n";

    #[tokio::test]
    async fn test_valid_forms() {
        let runner = Arc::new(MockRunner::new().respond(0, "all good", ""));
        let ctx = tool_context(runner.clone());

        let result = execute_validate_stackforms(&ctx, json!({"forms_content": FORMS})).await;
        assert!(!result.is_error());
        assert_eq!(result.text_content(), "✅ **StackForms Validation Successful**\n\nall good");

        let argv = &runner.calls()[0].argv;
        assert_eq!(&argv[1..4], ["stacks", "forms", "validate"]);
        let path = &argv[4];
        assert!(path.ends_with(".yml"));
        assert!(!Path::new(path).exists(), "temporary file must be removed");
    }

    #[tokio::test]
    async fn test_empty_stdout_uses_default_message() {
        let runner = Arc::new(MockRunner::new().respond(0, "  \n", ""));
        let ctx = tool_context(runner);

        let result = execute_validate_stackforms(&ctx, json!({"forms_content": FORMS})).await;
        assert!(result.text_content().ends_with("follows Cycloid best practices."));
    }

    #[tokio::test]
    async fn test_failed_validation() {
        let runner = Arc::new(MockRunner::new().respond(1, "", "auth failed"));
        let ctx = tool_context(runner);

        let result = execute_validate_stackforms(&ctx, json!({"forms_content": FORMS})).await;
        assert!(result.is_error());
        let text = result.text_content();
        assert!(text.starts_with("❌ **StackForms Validation Failed**\n\nExit code: 1"));
        assert!(text.contains("**Error output:**\nauth failed"));
        assert!(text.ends_with("- Validate variable naming conventions"));
    }

    #[tokio::test]
    async fn test_timeout() {
        let runner = Arc::new(MockRunner::new().respond_timeout());
        let ctx = tool_context(runner);

        let result = execute_validate_stackforms(&ctx, json!({"forms_content": FORMS})).await;
        assert!(result.is_error());
        assert!(result.text_content().starts_with("❌ **Validation Error**\n\nCLI command timed out"));
    }

    #[tokio::test]
    async fn test_missing_content() {
        let runner = Arc::new(MockRunner::new());
        let ctx = tool_context(runner.clone());

        let result = execute_validate_stackforms(&ctx, json!({})).await;
        assert!(result.is_error());
        assert!(runner.calls().is_empty());
    }
}
