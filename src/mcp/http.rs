//! MCP HTTP Transport
//!
//! Stateless JSON-RPC over `POST /mcp`, plus `/health` and `/info`.
//!
//! Every request carries its own Cycloid credentials in the `X-CY-ORG` and
//! `X-CY-API-KEY` headers. There is no session and no server-to-client
//! channel, so tools that would elicit fall back to their direct mode.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};

use crate::config::HttpServerConfig;
use crate::cycloid::Credentials;
use crate::errors::Error;
use crate::mcp::error::{require_credentials, McpError};
use crate::mcp::handler::{McpHandler, RequestContext, SERVER_NAME};
use crate::mcp::protocol::{IncomingMessage, JsonRpcId, JsonRpcResponse};
use crate::mcp::registry;
use crate::mcp::resources::CycloidResource;

const DESCRIPTION: &str = "MCP server exposing the Cycloid CLI as tools and resources";

/// State shared by all HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub handler: Arc<McpHandler>,
}

impl AppState {
    pub fn new(handler: Arc<McpHandler>) -> Self {
        Self { handler }
    }
}

/// Build the HTTP router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/info", get(info_handler))
        .route("/mcp", post(mcp_http_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind `config.bind_address()` and serve until Ctrl-C.
pub async fn serve(config: &HttpServerConfig, state: AppState) -> crate::Result<()> {
    let address = config.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|e| Error::transport(format!("Failed to bind MCP HTTP server: {}", e)))?;

    info!(address = %address, "Starting MCP HTTP server");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "MCP HTTP server shutdown listener failed");
            }
        })
        .await
        .map_err(|e| Error::transport(format!("MCP HTTP server error: {}", e)))?;

    info!("MCP HTTP server shutdown completed");
    Ok(())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

async fn info_handler(State(state): State<AppState>) -> Json<Value> {
    let tools: Vec<&str> = registry::entries().iter().map(|entry| entry.name).collect();
    let resources: Vec<&str> = CycloidResource::ALL.iter().map(CycloidResource::uri).collect();

    Json(json!({
        "name": SERVER_NAME,
        "version": crate::VERSION,
        "description": DESCRIPTION,
        "transport": "http",
        "tools": tools,
        "resources": resources,
        "errors": state.handler.cli().monitor().summary(),
    }))
}

/// `POST /mcp`
///
/// Parse failures and missing credentials are answered with a JSON-RPC
/// error. Notifications and stray responses get `202 Accepted`.
pub async fn mcp_http_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = match std::str::from_utf8(&body)
        .map_err(|e| e.to_string())
        .and_then(|text| IncomingMessage::parse(text).map_err(|e| e.to_string()))
    {
        Ok(IncomingMessage::Request(request)) => request,
        Ok(IncomingMessage::Response(_)) => {
            debug!("Ignoring JSON-RPC response posted without a pending request");
            return StatusCode::ACCEPTED.into_response();
        }
        Err(e) => {
            warn!(error = %e, "Failed to parse MCP HTTP body");
            return json_rpc_error(None, McpError::ParseError(e));
        }
    };

    let credentials = match require_credentials(Credentials::from_headers(&headers)) {
        Ok(credentials) => credentials,
        Err(e) => {
            warn!(method = %request.method, error = %e, "Rejecting MCP request without credentials");
            return json_rpc_error(request.id, e);
        }
    };

    let ctx = RequestContext::without_elicitation(credentials);
    match state.handler.handle_request(request, &ctx).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

fn json_rpc_error(id: Option<JsonRpcId>, error: McpError) -> Response {
    Json(JsonRpcResponse::failure(id, error.to_json_rpc_error())).into_response()
}
