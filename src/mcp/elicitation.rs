//! Server-initiated elicitation.
//!
//! A tool asks the connected client for a value through [`Elicitor`]. On the
//! stdio transport [`ChannelElicitor`] writes an `elicitation/create` request
//! to the outbound stream and waits for the matching response, which the
//! reader loop routes back through [`PendingRequests`]. Transports that
//! cannot carry server-to-client requests use [`UnsupportedElicitor`].

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::mcp::protocol::{
    ElicitRequestParams, ElicitResult, JsonRpcError, JsonRpcId, JsonRpcRequest, JsonRpcResponse,
    ELICITATION_METHOD,
};

/// Shape of the value requested from the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElicitSchema {
    /// Free-form text
    Text,
    /// One of the listed options
    Choice(Vec<String>),
}

impl ElicitSchema {
    /// JSON Schema sent as `requestedSchema`, a single `value` property.
    pub fn to_json(&self) -> Value {
        let property = match self {
            Self::Text => json!({"type": "string"}),
            Self::Choice(options) => json!({"type": "string", "enum": options}),
        };
        json!({
            "type": "object",
            "properties": {"value": property},
            "required": ["value"],
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElicitAction {
    Accept,
    Decline,
    Cancel,
}

impl ElicitAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::Decline => "decline",
            Self::Cancel => "cancel",
        }
    }
}

/// The client's answer to one elicitation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElicitResponse {
    pub action: ElicitAction,
    pub value: Option<String>,
}

impl ElicitResponse {
    pub fn accept(value: impl Into<String>) -> Self {
        Self { action: ElicitAction::Accept, value: Some(value.into()) }
    }

    pub fn decline() -> Self {
        Self { action: ElicitAction::Decline, value: None }
    }

    pub fn cancel() -> Self {
        Self { action: ElicitAction::Cancel, value: None }
    }

    /// The trimmed value, only for an accepted response.
    pub fn accepted_value(&self) -> Option<&str> {
        match self.action {
            ElicitAction::Accept => self.value.as_deref().map(str::trim),
            _ => None,
        }
    }

    fn from_result(result: ElicitResult) -> Result<Self, ElicitationError> {
        let action = match result.action.as_str() {
            "accept" => ElicitAction::Accept,
            "decline" | "reject" => ElicitAction::Decline,
            "cancel" => ElicitAction::Cancel,
            other => {
                return Err(ElicitationError::InvalidResponse(format!("unknown action '{other}'")))
            }
        };
        let value = result.content.as_ref().and_then(extract_value);
        Ok(Self { action, value })
    }
}

fn extract_value(content: &Value) -> Option<String> {
    let map = content.as_object()?;
    let value = match map.get("value") {
        Some(value) => value,
        None if map.len() == 1 => map.values().next()?,
        None => return None,
    };
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

#[derive(Debug, Error)]
pub enum ElicitationError {
    #[error("Client does not support elicitation")]
    Unsupported,

    #[error("Transport closed before the client answered")]
    Closed,

    #[error("Invalid elicitation response: {0}")]
    InvalidResponse(String),

    #[error("Client returned error {code}: {message}")]
    Client { code: i32, message: String },
}

/// Asks the connected client for a single value.
#[async_trait]
pub trait Elicitor: Send + Sync {
    /// Whether elicitation can reach the client at all.
    fn is_supported(&self) -> bool {
        true
    }

    async fn elicit(
        &self,
        message: &str,
        schema: ElicitSchema,
    ) -> Result<ElicitResponse, ElicitationError>;
}

/// Elicitor for clients or transports without elicitation.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedElicitor;

#[async_trait]
impl Elicitor for UnsupportedElicitor {
    fn is_supported(&self) -> bool {
        false
    }

    async fn elicit(
        &self,
        _message: &str,
        _schema: ElicitSchema,
    ) -> Result<ElicitResponse, ElicitationError> {
        Err(ElicitationError::Unsupported)
    }
}

type PendingSender = oneshot::Sender<Result<Value, JsonRpcError>>;

/// Server-issued requests waiting for a client response, keyed by id.
#[derive(Debug, Default)]
pub struct PendingRequests {
    next_id: AtomicU64,
    waiting: DashMap<String, PendingSender>,
    closed: AtomicBool,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an id and the receiver its response will arrive on.
    pub fn register(&self) -> (String, oneshot::Receiver<Result<Value, JsonRpcError>>) {
        let id = format!("elicit-{}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let (tx, rx) = oneshot::channel();
        self.waiting.insert(id.clone(), tx);
        // Registered after close_all: drop the sender so the waiter resolves at once.
        if self.closed.load(Ordering::Acquire) {
            self.waiting.remove(&id);
        }
        (id, rx)
    }

    pub fn forget(&self, id: &str) {
        self.waiting.remove(id);
    }

    /// Route a client response to its waiter. Returns `false` for unknown ids.
    pub fn complete(&self, response: JsonRpcResponse) -> bool {
        let Some(id) = response.id.as_ref().map(JsonRpcId::key) else {
            warn!("Dropping client response without id");
            return false;
        };
        let Some((_, sender)) = self.waiting.remove(&id) else {
            warn!(id = %id, "Dropping client response for unknown request");
            return false;
        };

        let outcome = match (response.error, response.result) {
            (Some(error), _) => Err(error),
            (None, result) => Ok(result.unwrap_or(Value::Null)),
        };
        // The waiter may have given up already.
        let _ = sender.send(outcome);
        true
    }

    /// Drop every waiter; each resolves as [`ElicitationError::Closed`].
    pub fn close_all(&self) {
        self.closed.store(true, Ordering::Release);
        let pending = self.waiting.len();
        self.waiting.clear();
        if pending > 0 {
            debug!(pending, "Closed pending client requests");
        }
    }

    pub fn len(&self) -> usize {
        self.waiting.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }
}

/// Elicitor that speaks JSON-RPC over the stdio transport's outbound queue.
#[derive(Debug, Clone)]
pub struct ChannelElicitor {
    outbound: mpsc::Sender<String>,
    pending: Arc<PendingRequests>,
}

impl ChannelElicitor {
    pub fn new(outbound: mpsc::Sender<String>, pending: Arc<PendingRequests>) -> Self {
        Self { outbound, pending }
    }
}

#[async_trait]
impl Elicitor for ChannelElicitor {
    async fn elicit(
        &self,
        message: &str,
        schema: ElicitSchema,
    ) -> Result<ElicitResponse, ElicitationError> {
        let (id, receiver) = self.pending.register();
        let params = ElicitRequestParams {
            message: message.to_string(),
            requested_schema: schema.to_json(),
        };
        let request = JsonRpcRequest::new(
            Some(JsonRpcId::String(id.clone())),
            ELICITATION_METHOD,
            serde_json::to_value(params)
                .map_err(|e| ElicitationError::InvalidResponse(e.to_string()))?,
        );
        let line = serde_json::to_string(&request)
            .map_err(|e| ElicitationError::InvalidResponse(e.to_string()))?;

        debug!(id = %id, "Sending elicitation request");
        if self.outbound.send(line).await.is_err() {
            self.pending.forget(&id);
            return Err(ElicitationError::Closed);
        }

        match receiver.await {
            Ok(Ok(result)) => {
                let result: ElicitResult = serde_json::from_value(result)
                    .map_err(|e| ElicitationError::InvalidResponse(e.to_string()))?;
                ElicitResponse::from_result(result)
            }
            Ok(Err(error)) => {
                Err(ElicitationError::Client { code: error.code, message: error.message })
            }
            Err(_) => Err(ElicitationError::Closed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_choice_schema() {
        let schema = ElicitSchema::Choice(vec!["prod".to_string(), "dev".to_string()]).to_json();
        assert_eq!(schema["properties"]["value"]["enum"], json!(["prod", "dev"]));
        assert_eq!(schema["required"], json!(["value"]));
        assert!(ElicitSchema::Text.to_json()["properties"]["value"].get("enum").is_none());
    }

    #[test]
    fn test_response_parsing() {
        let accepted = ElicitResponse::from_result(ElicitResult {
            action: "accept".to_string(),
            content: Some(json!({"value": "  my-stack "})),
        })
        .unwrap();
        assert_eq!(accepted.accepted_value(), Some("my-stack"));

        let declined = ElicitResponse::from_result(ElicitResult {
            action: "decline".to_string(),
            content: Some(json!({"value": "ignored"})),
        })
        .unwrap();
        assert_eq!(declined.accepted_value(), None);

        assert!(ElicitResponse::from_result(ElicitResult {
            action: "shrug".to_string(),
            content: None
        })
        .is_err());
    }

    #[test]
    fn test_single_field_content_is_accepted() {
        assert_eq!(extract_value(&json!({"name": "web"})), Some("web".to_string()));
        assert_eq!(extract_value(&json!({"a": "1", "b": "2"})), None);
    }

    #[tokio::test]
    async fn test_unsupported_elicitor() {
        let err = UnsupportedElicitor.elicit("name?", ElicitSchema::Text).await.unwrap_err();
        assert!(matches!(err, ElicitationError::Unsupported));
        assert!(!UnsupportedElicitor.is_supported());
    }

    #[tokio::test]
    async fn test_channel_round_trip() {
        let (tx, mut rx) = mpsc::channel(4);
        let pending = Arc::new(PendingRequests::new());
        let elicitor = ChannelElicitor::new(tx, pending.clone());

        let client = tokio::spawn({
            let pending = pending.clone();
            async move {
                let line = rx.recv().await.unwrap();
                let request: JsonRpcRequest = serde_json::from_str(&line).unwrap();
                assert_eq!(request.method, ELICITATION_METHOD);
                assert_eq!(request.params["message"], "Stack name?");
                pending.complete(JsonRpcResponse::success(
                    request.id,
                    json!({"action": "accept", "content": {"value": "web"}}),
                ))
            }
        });

        let response = elicitor.elicit("Stack name?", ElicitSchema::Text).await.unwrap();
        assert_eq!(response, ElicitResponse::accept("web"));
        assert!(client.await.unwrap());
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn test_close_all_resolves_waiters() {
        let (tx, mut rx) = mpsc::channel(4);
        let pending = Arc::new(PendingRequests::new());
        let elicitor = ChannelElicitor::new(tx, pending.clone());

        let waiter = tokio::spawn(async move { elicitor.elicit("?", ElicitSchema::Text).await });
        rx.recv().await.unwrap();
        pending.close_all();

        let result = waiter.await.unwrap();
        assert!(matches!(result, Err(ElicitationError::Closed)));
    }

    #[tokio::test]
    async fn test_register_after_close_resolves_immediately() {
        let pending = PendingRequests::new();
        pending.close_all();

        let (_, receiver) = pending.register();
        assert!(receiver.await.is_err());
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn test_client_error_is_reported() {
        let (tx, mut rx) = mpsc::channel(4);
        let pending = Arc::new(PendingRequests::new());
        let elicitor = ChannelElicitor::new(tx, pending.clone());

        let waiter = tokio::spawn(async move { elicitor.elicit("?", ElicitSchema::Text).await });
        let line = rx.recv().await.unwrap();
        let request: JsonRpcRequest = serde_json::from_str(&line).unwrap();
        pending.complete(JsonRpcResponse::failure(
            request.id,
            JsonRpcError { code: -32601, message: "Method not found".to_string(), data: None },
        ));

        let result = waiter.await.unwrap();
        assert!(matches!(result, Err(ElicitationError::Client { code: -32601, .. })));
    }

    #[test]
    fn test_unknown_response_is_dropped() {
        let pending = PendingRequests::new();
        assert!(!pending.complete(JsonRpcResponse::success(
            Some(JsonRpcId::String("elicit-99".to_string())),
            json!({})
        )));
    }
}
