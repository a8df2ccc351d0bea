//! MCP Tools Module
//!
//! One module per Cycloid CLI verb. Each module exposes a `*_tool()`
//! definition, an `execute_*` function and a `call` adapter used by the
//! static registry in [`crate::mcp::registry`].
//!
//! Executors never return transport errors. CLI failures become markdown
//! diagnostics in a [`ToolCallResult`] with `isError: true`.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::cycloid::{Credentials, CycloidCli};
use crate::errors::{format_cli_error, format_error, CliError, ErrorCategory};
use crate::mcp::elicitation::Elicitor;
use crate::mcp::protocol::ToolCallResult;

pub mod blueprints;
pub mod catalogs;
pub mod events;
pub mod pipelines;
pub mod stackforms;
pub mod stacks;

pub use blueprints::{cycloid_blueprint_list_tool, execute_list_blueprints};
pub use catalogs::{cycloid_catalog_repo_list_tool, execute_list_catalog_repositories};
pub use events::{cycloid_event_list_tool, execute_list_events};
pub use pipelines::{cycloid_pipeline_list_tool, execute_list_pipelines};
pub use stackforms::{cycloid_stackforms_validate_tool, execute_validate_stackforms};
pub use stacks::{cycloid_blueprint_stack_create_tool, execute_create_stack, stack_slug};

/// Everything a tool call needs, scoped to one request.
#[derive(Clone)]
pub struct ToolContext {
    pub cli: Arc<CycloidCli>,
    pub credentials: Credentials,
    pub elicitor: Arc<dyn Elicitor>,
    /// Minted per call; echoed in diagnostics and logs
    pub correlation_id: String,
}

impl ToolContext {
    pub fn new(cli: Arc<CycloidCli>, credentials: Credentials, elicitor: Arc<dyn Elicitor>) -> Self {
        Self { cli, credentials, elicitor, correlation_id: uuid::Uuid::new_v4().to_string() }
    }

    /// Diagnostic result for a failed CLI call.
    pub fn cli_failure(&self, action: &str, error: &CliError, suggestions: &[&str]) -> ToolCallResult {
        warn!(
            correlation_id = %self.correlation_id,
            action,
            kind = error.kind(),
            error = %error,
            "Tool CLI call failed"
        );
        ToolCallResult::error(format_cli_error(
            action,
            error,
            suggestions,
            Some(&self.correlation_id),
        ))
    }

    /// Diagnostic result for bad tool arguments.
    pub fn invalid_arguments(&self, action: &str, message: &str) -> ToolCallResult {
        ToolCallResult::error(format_error(
            action,
            message,
            ErrorCategory::Validation.suggestions(),
            Some(&self.correlation_id),
        ))
    }
}

impl fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolContext")
            .field("credentials", &self.credentials)
            .field("elicitation", &self.elicitor.is_supported())
            .field("correlation_id", &self.correlation_id)
            .finish()
    }
}

/// Rendering requested by a list tool's `format` argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListFormat {
    Json,
    Table,
    Summary,
}

impl FromStr for ListFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "table" => Ok(Self::Table),
            "summary" => Ok(Self::Summary),
            other => Err(other.to_string()),
        }
    }
}

/// Read `format` from the arguments, accepting only `allowed` values.
pub fn list_format(args: &Value, allowed: &[ListFormat]) -> Result<ListFormat, String> {
    let requested = match args.get("format") {
        None | Some(Value::Null) => return Ok(ListFormat::Json),
        Some(Value::String(s)) => s.as_str(),
        Some(other) => return Err(format!("Invalid format {other}")),
    };

    match requested.parse::<ListFormat>() {
        Ok(format) if format == ListFormat::Json || allowed.contains(&format) => Ok(format),
        _ => {
            let options = std::iter::once("json")
                .chain(allowed.iter().map(|f| match f {
                    ListFormat::Json => "json",
                    ListFormat::Table => "table",
                    ListFormat::Summary => "summary",
                }))
                .collect::<Vec<_>>()
                .join("', '");
            Err(format!("Invalid format '{requested}'. Must be one of '{options}'"))
        }
    }
}

/// Non-empty trimmed string argument. Numbers are accepted as their text.
pub fn string_arg(args: &Value, key: &str) -> Option<String> {
    match args.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// List argument given either as an array of strings or a comma-separated
/// string. Empty entries are dropped.
pub fn string_list_arg(args: &Value, key: &str) -> Vec<String> {
    let raw: Vec<String> = match args.get(key) {
        Some(Value::Array(items)) => {
            items.iter().filter_map(Value::as_str).map(str::to_string).collect()
        }
        Some(Value::String(s)) => s.split(',').map(str::to_string).collect(),
        _ => Vec::new(),
    };
    raw.into_iter().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
}

/// Pretty-printed JSON in a single text block.
pub fn json_result(value: &Value) -> ToolCallResult {
    match serde_json::to_string_pretty(value) {
        Ok(text) => ToolCallResult::text(text),
        Err(e) => ToolCallResult::error(format_error(
            "serialize tool result",
            &e.to_string(),
            &[],
            None,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_list_format() {
        let allowed = [ListFormat::Table];
        assert_eq!(list_format(&json!({}), &allowed).unwrap(), ListFormat::Json);
        assert_eq!(list_format(&json!({"format": "TABLE"}), &allowed).unwrap(), ListFormat::Table);
        let err = list_format(&json!({"format": "summary"}), &allowed).unwrap_err();
        assert_eq!(err, "Invalid format 'summary'. Must be one of 'json', 'table'");
        assert!(list_format(&json!({"format": 3}), &allowed).is_err());
    }

    #[test]
    fn test_string_arg() {
        let args = json!({"name": "  web ", "blank": "  ", "begin": 1700000000});
        assert_eq!(string_arg(&args, "name").as_deref(), Some("web"));
        assert_eq!(string_arg(&args, "blank"), None);
        assert_eq!(string_arg(&args, "begin").as_deref(), Some("1700000000"));
        assert_eq!(string_arg(&args, "missing"), None);
    }

    #[test]
    fn test_string_list_arg() {
        let args = json!({"severity": ["info", " crit ", ""], "type": "Cycloid, AWS"});
        assert_eq!(string_list_arg(&args, "severity"), vec!["info", "crit"]);
        assert_eq!(string_list_arg(&args, "type"), vec!["Cycloid", "AWS"]);
        assert!(string_list_arg(&args, "missing").is_empty());
    }

    #[test]
    fn test_json_result_is_pretty() {
        let result = json_result(&json!({"count": 0}));
        assert_eq!(result.text_content(), "{\n  \"count\": 0\n}");
        assert!(!result.is_error());
    }
}
