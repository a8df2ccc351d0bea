//! CLI Process Tests
//!
//! Runs the real subprocess runner against shell scripts standing in for
//! `cy`, end to end through the MCP handler.

#![cfg(unix)]

mod common;

use common::*;
use cycloid_mcp::config::CliSettings;
use cycloid_mcp::cycloid::{Credentials, CycloidCli, Invocation};
use cycloid_mcp::errors::CliError;
use cycloid_mcp::mcp::RequestContext;
use cycloid_mcp::mcp::protocol::JsonRpcRequest;
use serde_json::{json, Value};

const FAKE_CY: &str = r#"
if [ "$CY_ORG" != "acme" ] || [ "$CY_API_KEY" != "secret" ]; then
  echo "missing credentials" >&2
  exit 1
fi
case "$1" in
  catalog-repository)
    echo '[{"canonical":"test-repo","branch":"main","url":"https://x","stack_count":5}]'
    ;;
  stacks)
    echo "auth failed" >&2
    exit 1
    ;;
  echo-args)
    printf '%s\n' "$@"
    ;;
  sleep)
    sleep 10
    ;;
  *)
    echo "unknown command: $1" >&2
    exit 2
    ;;
esac
"#;

fn cli(dir: &tempfile::TempDir, timeout_seconds: u64) -> CycloidCli {
    CycloidCli::new(CliSettings {
        cli_path: fake_cli(dir, FAKE_CY),
        api_url: "https://api.example.test".to_string(),
        timeout_seconds,
    })
}

fn context() -> RequestContext {
    RequestContext::without_elicitation(Credentials::new("acme", "secret"))
}

async fn call(cli: CycloidCli, id: i64, name: &str, arguments: Value) -> Value {
    let request: JsonRpcRequest = serde_json::from_value(tool_call(id, name, arguments)).unwrap();
    let response = handler_for(cli).handle_request(request, &context()).await.unwrap();
    serde_json::to_value(response).unwrap()
}

#[tokio::test]
async fn test_catalog_list_through_real_process() {
    let dir = tempfile::tempdir().unwrap();
    let response = call(cli(&dir, 5), 1, "CYCLOID_CATALOG_REPO_LIST", json!({})).await;

    let body: Value = serde_json::from_str(&tool_text(&response)).unwrap();
    assert_eq!(body["count"], 1);
    assert_eq!(body["repositories"][0]["canonical"], "test-repo");
}

#[tokio::test]
async fn test_form_validation_failure_is_a_tool_result() {
    let dir = tempfile::tempdir().unwrap();
    let response = call(
        cli(&dir, 5),
        2,
        "CYCLOID_STACKFORMS_VALIDATE",
        json!({"forms_content": "version: \"2\"\nuse_cases: []\n"}),
    )
    .await;

    assert!(response.get("error").is_none());
    assert!(tool_text(&response).contains("auth failed"));
}

#[tokio::test]
async fn test_argv_ends_with_output_format() {
    let dir = tempfile::tempdir().unwrap();
    let cli = cli(&dir, 5);
    let invocation = Invocation::new("echo-args").flag("dry-run", true).flag("page", "2");

    let result = cli.execute(&Credentials::new("acme", "secret"), &invocation).await.unwrap();
    let args: Vec<&str> = result.stdout.lines().collect();
    assert_eq!(args, ["echo-args", "--dry-run", "--page", "2", "--output", "json"]);
}

#[tokio::test]
async fn test_slow_cli_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let cli = cli(&dir, 1);

    let err = cli
        .execute_json(&Credentials::new("acme", "secret"), &Invocation::new("sleep"))
        .await
        .unwrap_err();
    assert!(matches!(err, CliError::Timeout { .. }));
    assert_eq!(cli.monitor().summary().by_kind.get("timeout"), Some(&1));
}
