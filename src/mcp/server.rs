//! MCP Stdio Server
//!
//! Implements the stdio transport for MCP: reads JSON-RPC messages from stdin
//! and writes responses to stdout.
//!
//! Every request runs in its own task so that a tool waiting on an
//! elicitation does not block the reader, which must deliver the client's
//! answer. All output goes through a single writer task fed by a channel.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::cycloid::Credentials;
use crate::mcp::elicitation::{ChannelElicitor, PendingRequests};
use crate::mcp::error::McpError;
use crate::mcp::handler::{McpHandler, RequestContext};
use crate::mcp::protocol::{IncomingMessage, JsonRpcResponse};

/// Capacity of the outbound line queue
const OUTBOUND_CAPACITY: usize = 64;

pub struct McpStdioServer {
    handler: Arc<McpHandler>,
    credentials: Credentials,
}

impl McpStdioServer {
    /// Create a new MCP stdio server
    ///
    /// # Arguments
    /// * `handler` - Shared request handler
    /// * `credentials` - Credentials read once from the environment at startup
    pub fn new(handler: Arc<McpHandler>, credentials: Credentials) -> Self {
        Self { handler, credentials }
    }

    /// Run the stdio server until stdin reaches EOF.
    pub async fn run(&self) -> anyhow::Result<()> {
        info!("Starting MCP stdio server");
        let reader = BufReader::new(tokio::io::stdin());
        self.run_with_io(reader, tokio::io::stdout()).await
    }

    /// Serve line-delimited JSON-RPC from `reader`, answering on `writer`.
    ///
    /// On EOF pending elicitations resolve as closed and in-flight requests
    /// are drained before returning.
    pub async fn run_with_io<R, W>(&self, reader: R, writer: W) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (outbound, queue) = mpsc::channel::<String>(OUTBOUND_CAPACITY);
        let writer_task = tokio::spawn(write_loop(writer, queue));

        let pending = Arc::new(PendingRequests::new());
        let ctx = RequestContext::new(
            self.credentials.clone(),
            Arc::new(ChannelElicitor::new(outbound.clone(), pending.clone())),
        );
        let mut tasks = JoinSet::new();
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            debug!(line = %line, "Received input line");

            match IncomingMessage::parse(&line) {
                Ok(IncomingMessage::Request(request)) => {
                    let handler = self.handler.clone();
                    let ctx = ctx.clone();
                    let outbound = outbound.clone();
                    tasks.spawn(async move {
                        if let Some(response) = handler.handle_request(request, &ctx).await {
                            send_response(&outbound, &response).await;
                        }
                    });
                }
                Ok(IncomingMessage::Response(response)) => {
                    pending.complete(response);
                }
                Err(e) => {
                    warn!(error = %e, line = %line, "Failed to parse JSON-RPC message");
                    let error = McpError::ParseError(e.to_string()).to_json_rpc_error();
                    send_response(&outbound, &JsonRpcResponse::failure(None, error)).await;
                }
            }

            while let Some(finished) = tasks.try_join_next() {
                log_task_outcome(finished);
            }
        }

        info!(in_flight = tasks.len(), "MCP stdio server shutting down (EOF received)");
        pending.close_all();
        while let Some(finished) = tasks.join_next().await {
            log_task_outcome(finished);
        }

        drop(ctx);
        drop(outbound);
        writer_task.await??;
        Ok(())
    }
}

async fn send_response(outbound: &mpsc::Sender<String>, response: &JsonRpcResponse) {
    match serde_json::to_string(response) {
        Ok(line) => {
            if outbound.send(line).await.is_err() {
                warn!("Output closed; dropping response");
            }
        }
        Err(e) => error!(error = %e, "Failed to serialize response"),
    }
}

async fn write_loop<W>(mut writer: W, mut queue: mpsc::Receiver<String>) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = queue.recv().await {
        debug!(response = %line, "Writing message");
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    Ok(())
}

fn log_task_outcome(outcome: Result<(), tokio::task::JoinError>) {
    if let Err(e) = outcome {
        error!(error = %e, "Request task failed");
    }
}
