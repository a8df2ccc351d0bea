//! HTTP Transport Tests
//!
//! Exercises the axum router with `tower::ServiceExt::oneshot`:
//! - Credential headers, in any case
//! - Tool calls and resource reads with per-request credentials
//! - Stack creation without elicitation

mod common;

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use common::*;
use cycloid_mcp::mcp::http::{router, AppState};
use cycloid_mcp::testing::MockRunner;
use serde_json::{json, Value};
use tower::ServiceExt;

fn app(runner: Arc<MockRunner>) -> Router {
    router(AppState::new(handler(runner)))
}

async fn post(app: Router, headers: &[(&str, &str)], body: Value) -> (StatusCode, Option<Value>) {
    let mut builder =
        Request::builder().uri("/mcp").method("POST").header("content-type", "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let response = app.oneshot(builder.body(Body::from(body.to_string())).unwrap()).await.unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = (!bytes.is_empty()).then(|| serde_json::from_slice(&bytes).unwrap());
    (status, json)
}

const CREDENTIALS: &[(&str, &str)] = &[("X-CY-ORG", "acme"), ("X-CY-API-KEY", "secret")];

#[tokio::test]
async fn test_credential_headers_are_case_insensitive() {
    let variants = [
        [("X-CY-ORG", "acme"), ("X-CY-API-KEY", "secret")],
        [("x-cy-org", "acme"), ("x-cy-api-key", "secret")],
        [("X-Cy-Org", "acme"), ("X-Cy-Api-Key", "secret")],
    ];

    for headers in variants {
        let runner = Arc::new(MockRunner::new().respond_json(json!([
            {"canonical": "test-repo", "branch": "main", "url": "https://x", "stack_count": 5}
        ])));
        let (status, reply) = post(
            app(runner.clone()),
            &headers,
            tool_call(1, "CYCLOID_CATALOG_REPO_LIST", json!({})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_str(&tool_text(&reply.unwrap())).unwrap();
        assert_eq!(body["count"], 1);
        assert_eq!(body["repositories"][0]["canonical"], "test-repo");
        assert_eq!(runner.calls()[0].env_var("CY_ORG"), Some("acme"));
    }
}

#[tokio::test]
async fn test_missing_api_key_fails_fast() {
    let runner = Arc::new(MockRunner::new());
    let (status, reply) = post(
        app(runner.clone()),
        &[("X-CY-ORG", "acme")],
        tool_call(4, "CYCLOID_EVENT_LIST", json!({})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let reply = reply.unwrap();
    assert_eq!(reply["id"], 4);
    assert_eq!(reply["error"]["code"], -32600);
    assert_eq!(reply["error"]["message"], "Missing required value: X-CY-API-KEY");
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn test_initialize_and_notification() {
    let app = app(Arc::new(MockRunner::new()));

    let (_, reply) = post(app.clone(), CREDENTIALS, initialize(1, false)).await;
    let result = &reply.unwrap()["result"];
    assert_eq!(result["serverInfo"]["name"], "cycloid-mcp-server");
    assert_eq!(result["capabilities"]["resources"]["subscribe"], false);

    let (status, reply) = post(
        app,
        CREDENTIALS,
        json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(reply.is_none());
}

#[tokio::test]
async fn test_resource_read_failure_is_still_json() {
    let runner = Arc::new(MockRunner::new().respond(2, "", "service unavailable"));
    let (_, reply) = post(
        app(runner),
        CREDENTIALS,
        request(5, "resources/read", json!({"uri": "cycloid://service-catalogs-repositories"})),
    )
    .await;

    let reply = reply.unwrap();
    assert!(reply.get("error").is_none());
    let text = reply["result"]["contents"][0]["text"].as_str().unwrap();
    let snapshot: Value = serde_json::from_str(text).unwrap();
    assert_eq!(snapshot["count"], 0);
    assert_eq!(snapshot["repositories"], json!([]));
    assert!(snapshot["error"].as_str().unwrap().contains("service unavailable"));
}

#[tokio::test]
async fn test_stack_creation_needs_direct_mode() {
    let runner = Arc::new(MockRunner::new().respond_json(blueprints_fixture()));
    let (_, reply) = post(
        app(runner.clone()),
        CREDENTIALS,
        tool_call(6, "CYCLOID_BLUEPRINT_STACK_CREATE", json!({"ref": "cycloid:ec2"})),
    )
    .await;
    assert!(tool_text(&reply.unwrap()).contains("requires interactive elicitation support"));
    assert_eq!(runner.calls().len(), 1);

    let runner = Arc::new(
        MockRunner::new()
            .respond_json(blueprints_fixture())
            .respond_json(catalogs_fixture())
            .respond(0, "created", ""),
    );
    let (_, reply) = post(
        app(runner.clone()),
        CREDENTIALS,
        tool_call(
            7,
            "CYCLOID_BLUEPRINT_STACK_CREATE",
            json!({
                "ref": "cycloid:ec2",
                "name": "Edge Proxy",
                "use_case": "default",
                "service_catalog_source_canonical": "main-catalog"
            }),
        ),
    )
    .await;

    assert_eq!(tool_text(&reply.unwrap()), "✅ Stack 'Edge Proxy' created successfully!\ncreated");
    let create = &runner.calls()[2];
    assert!(create.argv.windows(2).any(|w| w == ["--stack", "edge-proxy"]));
    assert_eq!(create.env_var("CY_API_KEY"), Some("secret"));
}

#[tokio::test]
async fn test_info_reports_cli_errors() {
    let runner = Arc::new(MockRunner::new().respond(1, "", "auth failed"));
    let app = app(runner);

    post(app.clone(), CREDENTIALS, tool_call(1, "CYCLOID_PIPELINE_LIST", json!({}))).await;

    let response = app
        .oneshot(Request::builder().uri("/info").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let info: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(info["errors"]["total"], 1);
    assert_eq!(info["errors"]["by_kind"]["cli_execution"], 1);
    assert_eq!(info["errors"]["recent_by_kind"]["cli_execution"], 1);
}
