//! MCP Request Handler
//!
//! Routes incoming JSON-RPC requests to the appropriate method handlers.
//! One handler is shared by every request of a transport; per-request state
//! (credentials, the elicitation channel, what the client declared in
//! `initialize`) arrives in a [`RequestContext`].

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, Instrument};

use crate::cycloid::{Credentials, CycloidCli};
use crate::errors::RetryPolicy;
use crate::mcp::elicitation::{Elicitor, UnsupportedElicitor};
use crate::mcp::error::McpError;
use crate::mcp::protocol::*;
use crate::mcp::registry;
use crate::mcp::resources;
use crate::mcp::tools::ToolContext;
use crate::observability::MetricsRecorder;
use crate::tool_span;

/// Name announced in `initialize`
pub const SERVER_NAME: &str = "cycloid-mcp-server";

const INSTRUCTIONS: &str = "Tools and resources backed by the Cycloid CLI. \
    List tools return JSON with display hints; stack creation asks for its \
    parameters interactively unless they are all provided.";

// Zero means the client has not initialized yet
const ELICITATION_SUPPORTED: u8 = 1;
const ELICITATION_UNSUPPORTED: u8 = 2;

/// Capabilities one client connection declared in `initialize`.
///
/// Owned by the connection, never by the shared handler.
#[derive(Debug, Default)]
pub struct ClientCapabilities {
    elicitation: AtomicU8,
}

impl ClientCapabilities {
    fn declare_elicitation(&self, supported: bool) {
        let value = if supported { ELICITATION_SUPPORTED } else { ELICITATION_UNSUPPORTED };
        self.elicitation.store(value, Ordering::Relaxed);
    }

    /// `None` until the client has initialized.
    pub fn elicitation(&self) -> Option<bool> {
        match self.elicitation.load(Ordering::Relaxed) {
            ELICITATION_SUPPORTED => Some(true),
            ELICITATION_UNSUPPORTED => Some(false),
            _ => None,
        }
    }
}

/// Per-request inputs supplied by the transport
///
/// Clones share the same [`ClientCapabilities`], so a transport that keeps
/// one context per connection sees its client's `initialize`.
#[derive(Clone)]
pub struct RequestContext {
    pub credentials: Credentials,
    pub elicitor: Arc<dyn Elicitor>,
    client: Arc<ClientCapabilities>,
}

impl RequestContext {
    pub fn new(credentials: Credentials, elicitor: Arc<dyn Elicitor>) -> Self {
        Self { credentials, elicitor, client: Arc::new(ClientCapabilities::default()) }
    }

    /// Context for transports that cannot ask the client anything
    pub fn without_elicitation(credentials: Credentials) -> Self {
        Self::new(credentials, Arc::new(UnsupportedElicitor))
    }

    pub fn client(&self) -> &ClientCapabilities {
        &self.client
    }
}

pub struct McpHandler {
    cli: Arc<CycloidCli>,
    retry: RetryPolicy,
    metrics: MetricsRecorder,
}

impl McpHandler {
    pub fn new(cli: Arc<CycloidCli>, retry: RetryPolicy) -> Self {
        Self { cli, retry, metrics: MetricsRecorder::new() }
    }

    pub fn cli(&self) -> &Arc<CycloidCli> {
        &self.cli
    }

    /// Handle an incoming JSON-RPC request.
    ///
    /// Returns `None` for notifications, which never get a response.
    pub async fn handle_request(
        &self,
        request: JsonRpcRequest,
        ctx: &RequestContext,
    ) -> Option<JsonRpcResponse> {
        let method = request.method.clone();
        let id = request.id.clone();

        if request.is_notification() {
            debug!(method = %method, "Received notification");
            return None;
        }

        debug!(method = %method, id = ?id, "Handling MCP request");

        let response = match method.as_str() {
            "initialize" => self.handle_initialize(id, request.params, ctx),
            "ping" => self.handle_ping(id),
            "tools/list" => self.handle_tools_list(id),
            "tools/call" => self.handle_tools_call(id, request.params, ctx).await,
            "resources/list" => self.handle_resources_list(id),
            "resources/read" => self.handle_resources_read(id, request.params, ctx).await,
            _ => self.method_not_found(id, &method),
        };

        debug!(
            method = %method,
            id = ?response.id,
            has_error = response.error.is_some(),
            "Completed MCP request"
        );

        Some(response)
    }

    fn handle_initialize(
        &self,
        id: Option<JsonRpcId>,
        params: Value,
        ctx: &RequestContext,
    ) -> JsonRpcResponse {
        let params: InitializeParams = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => {
                error!(error = %e, "Failed to parse initialize params");
                return self.error_response(
                    id,
                    McpError::InvalidParams(format!("Failed to parse initialize params: {}", e)),
                );
            }
        };

        let negotiated = negotiate_version(&params.protocol_version);
        let elicitation = params.capabilities.elicitation.is_some();
        ctx.client.declare_elicitation(elicitation);

        info!(
            client_name = params.client_info.as_ref().map(|c| c.name.as_str()).unwrap_or("unknown"),
            client_version = %params.protocol_version,
            negotiated_version = %negotiated,
            elicitation,
            "Client initialized"
        );

        let result = InitializeResult {
            protocol_version: negotiated.to_string(),
            capabilities: Capabilities {
                tools: Some(ListChangedCapability { list_changed: Some(false) }),
                resources: Some(ResourceCapabilities {
                    subscribe: Some(false),
                    list_changed: Some(false),
                }),
                elicitation: None,
            },
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: crate::VERSION.to_string(),
            },
            instructions: Some(INSTRUCTIONS.to_string()),
        };

        self.success(id, &result)
    }

    fn handle_ping(&self, id: Option<JsonRpcId>) -> JsonRpcResponse {
        JsonRpcResponse::success(id, serde_json::json!({}))
    }

    fn handle_tools_list(&self, id: Option<JsonRpcId>) -> JsonRpcResponse {
        let result = ToolsListResult { tools: registry::list_tools(), next_cursor: None };
        self.success(id, &result)
    }

    async fn handle_tools_call(
        &self,
        id: Option<JsonRpcId>,
        params: Value,
        ctx: &RequestContext,
    ) -> JsonRpcResponse {
        let params: ToolCallParams = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => {
                error!(error = %e, "Failed to parse tool call params");
                return self.error_response(
                    id,
                    McpError::InvalidParams(format!("Failed to parse tool call params: {}", e)),
                );
            }
        };

        let Some(entry) = registry::find_tool(&params.name) else {
            return self.error_response(id, McpError::ToolNotFound(params.name));
        };

        let tool_ctx =
            ToolContext::new(self.cli.clone(), ctx.credentials.clone(), self.elicitor_for(ctx));
        let span =
            tool_span!(entry.name, tool_ctx.correlation_id, org = %ctx.credentials.organization());
        let args = params.arguments.unwrap_or_else(|| serde_json::json!({}));

        let started = Instant::now();
        let result = (entry.execute)(&tool_ctx, args).instrument(span).await;
        let elapsed = started.elapsed().as_secs_f64();

        self.metrics.record_tool_call(entry.name, result.is_error(), elapsed);
        info!(
            tool = entry.name,
            correlation_id = %tool_ctx.correlation_id,
            is_error = result.is_error(),
            elapsed_secs = elapsed,
            "Tool call finished"
        );

        self.success(id, &result)
    }

    fn handle_resources_list(&self, id: Option<JsonRpcId>) -> JsonRpcResponse {
        self.success(id, &resources::list_resources())
    }

    async fn handle_resources_read(
        &self,
        id: Option<JsonRpcId>,
        params: Value,
        ctx: &RequestContext,
    ) -> JsonRpcResponse {
        let params: ResourceReadParams = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => {
                error!(error = %e, "Failed to parse resource read params");
                return self.error_response(
                    id,
                    McpError::InvalidParams(format!("Failed to parse resource read params: {}", e)),
                );
            }
        };

        match resources::read_resource(&self.cli, &ctx.credentials, &self.retry, &params.uri).await
        {
            Ok(content) => self.success(id, &ResourceReadResult { contents: vec![content] }),
            Err(e) => self.error_response(id, e),
        }
    }

    /// The request's elicitor, unless its client said it cannot elicit.
    fn elicitor_for(&self, ctx: &RequestContext) -> Arc<dyn Elicitor> {
        if ctx.client.elicitation() == Some(false) {
            Arc::new(UnsupportedElicitor)
        } else {
            ctx.elicitor.clone()
        }
    }

    fn success<T: Serialize>(&self, id: Option<JsonRpcId>, result: &T) -> JsonRpcResponse {
        match serde_json::to_value(result) {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => self.error_response(id, McpError::SerializationError(e)),
        }
    }

    fn method_not_found(&self, id: Option<JsonRpcId>, method: &str) -> JsonRpcResponse {
        error!(method = %method, "Method not found");
        self.error_response(id, McpError::MethodNotFound(method.to_string()))
    }

    fn error_response(&self, id: Option<JsonRpcId>, error: McpError) -> JsonRpcResponse {
        error!(error = %error, "MCP error");
        JsonRpcResponse::failure(id, error.to_json_rpc_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::elicitation::ElicitResponse;
    use crate::testing::{cli_with, credentials, MockRunner, ScriptedElicitor};
    use serde_json::json;

    fn create_test_handler(runner: Arc<MockRunner>) -> McpHandler {
        McpHandler::new(cli_with(runner), RetryPolicy::none())
    }

    fn request(id: i64, method: &str, params: Value) -> JsonRpcRequest {
        JsonRpcRequest::new(Some(JsonRpcId::Number(id)), method, params)
    }

    fn context() -> RequestContext {
        RequestContext::without_elicitation(credentials())
    }

    #[tokio::test]
    async fn test_initialize() {
        let handler = create_test_handler(Arc::new(MockRunner::new()));
        let params = json!({
            "protocolVersion": "2025-03-26",
            "capabilities": {"elicitation": {}},
            "clientInfo": {"name": "test-client", "version": "1.0.0"}
        });

        let ctx = context();
        assert_eq!(ctx.client().elicitation(), None);
        let response = handler.handle_request(request(1, "initialize", params), &ctx).await.unwrap();

        assert!(response.error.is_none());
        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], "2025-03-26");
        assert_eq!(result["serverInfo"]["name"], SERVER_NAME);
        assert_eq!(result["capabilities"]["tools"]["listChanged"], false);
        assert_eq!(ctx.client().elicitation(), Some(true));
    }

    #[tokio::test]
    async fn test_unknown_version_gets_latest() {
        let handler = create_test_handler(Arc::new(MockRunner::new()));
        let params = json!({"protocolVersion": "1999-01-01", "capabilities": {}});

        let ctx = context();
        let response = handler.handle_request(request(1, "initialize", params), &ctx).await.unwrap();
        assert_eq!(response.result.unwrap()["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(ctx.client().elicitation(), Some(false));
    }

    #[tokio::test]
    async fn test_method_not_found() {
        let handler = create_test_handler(Arc::new(MockRunner::new()));
        let response = handler
            .handle_request(request(7, "prompts/list", json!({})), &context())
            .await
            .unwrap();

        assert!(response.result.is_none());
        assert_eq!(response.error.unwrap().code, error_codes::METHOD_NOT_FOUND);
        assert_eq!(response.id, Some(JsonRpcId::Number(7)));
    }

    #[tokio::test]
    async fn test_notifications_get_no_response() {
        let handler = create_test_handler(Arc::new(MockRunner::new()));
        let notification = JsonRpcRequest::new(None, "notifications/initialized", json!({}));
        assert!(handler.handle_request(notification, &context()).await.is_none());
    }

    #[tokio::test]
    async fn test_tools_list() {
        let handler = create_test_handler(Arc::new(MockRunner::new()));
        let response =
            handler.handle_request(request(2, "tools/list", json!({})), &context()).await.unwrap();

        let tools = response.result.unwrap()["tools"].as_array().unwrap().clone();
        assert_eq!(tools.len(), 6);
        assert!(tools.iter().all(|t| t["inputSchema"]["type"] == "object"));
    }

    #[tokio::test]
    async fn test_tools_call_catalog_list() {
        let runner = Arc::new(MockRunner::new().respond_json(json!([
            {"canonical": "test-repo", "branch": "main", "url": "https://x", "stack_count": 5}
        ])));
        let handler = create_test_handler(runner);
        let params = json!({"name": "CYCLOID_CATALOG_REPO_LIST", "arguments": {}});

        let response =
            handler.handle_request(request(3, "tools/call", params), &context()).await.unwrap();

        let result = response.result.unwrap();
        assert!(result.get("isError").is_none());
        let body: Value = serde_json::from_str(result["content"][0]["text"].as_str().unwrap()).unwrap();
        assert_eq!(body["count"], 1);
        assert_eq!(body["repositories"][0]["canonical"], "test-repo");
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let handler = create_test_handler(Arc::new(MockRunner::new()));
        let params = json!({"name": "CYCLOID_NOPE"});
        let response =
            handler.handle_request(request(4, "tools/call", params), &context()).await.unwrap();

        let error = response.error.unwrap();
        assert_eq!(error.code, error_codes::METHOD_NOT_FOUND);
        assert_eq!(error.message, "Tool not found: CYCLOID_NOPE");
    }

    #[tokio::test]
    async fn test_declared_lack_of_elicitation_wins() {
        let runner = Arc::new(MockRunner::new().respond_json(json!({
            "service_catalogs": [{"ref": "cycloid:a", "use_cases": ["default"]}]
        })));
        let handler = create_test_handler(runner);
        let elicitor = Arc::new(ScriptedElicitor::new().answer(ElicitResponse::accept("web")));
        let ctx = RequestContext::new(credentials(), elicitor.clone());

        let init = json!({"protocolVersion": "2025-06-18", "capabilities": {}});
        handler.handle_request(request(1, "initialize", init), &ctx.clone()).await;

        let params = json!({"name": "CYCLOID_BLUEPRINT_STACK_CREATE", "arguments": {"ref": "cycloid:a"}});
        let response = handler.handle_request(request(2, "tools/call", params), &ctx).await.unwrap();

        let text = response.result.unwrap()["content"][0]["text"].as_str().unwrap().to_string();
        assert!(text.contains("requires interactive elicitation support"));
        assert!(elicitor.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_capabilities_do_not_leak_between_connections() {
        let runner = Arc::new(
            MockRunner::new()
                .respond_json(json!({"service_catalogs": [{"ref": "cycloid:a", "use_cases": ["default"]}]})),
        );
        let handler = create_test_handler(runner);

        // Another client declares no elicitation on its own connection
        let other = context();
        let init = json!({"protocolVersion": "2025-06-18", "capabilities": {}});
        handler.handle_request(request(1, "initialize", init), &other).await;
        assert_eq!(other.client().elicitation(), Some(false));

        let elicitor = Arc::new(ScriptedElicitor::new().answer(ElicitResponse::decline()));
        let ctx = RequestContext::new(credentials(), elicitor.clone());
        let init = json!({"protocolVersion": "2025-06-18", "capabilities": {"elicitation": {}}});
        handler.handle_request(request(2, "initialize", init), &ctx).await;

        let params = json!({"name": "CYCLOID_BLUEPRINT_STACK_CREATE", "arguments": {"ref": "cycloid:a"}});
        let response = handler.handle_request(request(3, "tools/call", params), &ctx).await.unwrap();

        let text = response.result.unwrap()["content"][0]["text"].as_str().unwrap().to_string();
        assert_eq!(text, "Stack creation cancelled - no stack name provided.");
        assert_eq!(elicitor.prompts().len(), 1);
        assert_eq!(other.client().elicitation(), Some(false));
    }

    #[tokio::test]
    async fn test_resources() {
        let runner = Arc::new(MockRunner::new().respond_json(json!([{"id": 1}])));
        let handler = create_test_handler(runner);

        let response =
            handler.handle_request(request(5, "resources/list", json!({})), &context()).await.unwrap();
        assert_eq!(response.result.unwrap()["resources"].as_array().unwrap().len(), 4);

        let params = json!({"uri": "cycloid://events"});
        let response =
            handler.handle_request(request(6, "resources/read", params), &context()).await.unwrap();
        let contents = &response.result.unwrap()["contents"][0];
        assert_eq!(contents["uri"], "cycloid://events");
        assert_eq!(contents["mimeType"], "application/json");

        let params = json!({"uri": "cycloid://unknown"});
        let response =
            handler.handle_request(request(7, "resources/read", params), &context()).await.unwrap();
        assert!(response.error.unwrap().message.contains("cycloid://unknown"));
    }
}
