//! Common test utilities for all integration tests.
//!
//! Provides handler construction over a scripted CLI, an in-memory stdio
//! client and fake `cy` scripts for process-level tests.

#![allow(dead_code)]
#![allow(clippy::duplicate_mod)]

use std::sync::Arc;
use std::time::Duration;

use cycloid_mcp::cycloid::CycloidCli;
use cycloid_mcp::errors::RetryPolicy;
use cycloid_mcp::mcp::{McpHandler, McpStdioServer};
use cycloid_mcp::testing::{cli_with, credentials, MockRunner};
use serde_json::{json, Value};
use tokio::io::{duplex, AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines};
use tokio::task::JoinHandle;

const IO_TIMEOUT: Duration = Duration::from_secs(5);

pub fn handler(runner: Arc<MockRunner>) -> Arc<McpHandler> {
    Arc::new(McpHandler::new(cli_with(runner), RetryPolicy::none()))
}

pub fn handler_for(cli: CycloidCli) -> Arc<McpHandler> {
    Arc::new(McpHandler::new(Arc::new(cli), RetryPolicy::none()))
}

pub fn request(id: i64, method: &str, params: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params})
}

pub fn tool_call(id: i64, name: &str, arguments: Value) -> Value {
    request(id, "tools/call", json!({"name": name, "arguments": arguments}))
}

pub fn initialize(id: i64, elicitation: bool) -> Value {
    let capabilities = if elicitation { json!({"elicitation": {}}) } else { json!({}) };
    request(
        id,
        "initialize",
        json!({
            "protocolVersion": "2025-06-18",
            "capabilities": capabilities,
            "clientInfo": {"name": "integration-test", "version": "1.0.0"}
        }),
    )
}

/// Text of the first content block of a `tools/call` response
pub fn tool_text(response: &Value) -> String {
    response["result"]["content"][0]["text"].as_str().unwrap_or_default().to_string()
}

pub fn blueprints_fixture() -> Value {
    json!({
        "service_catalogs": [
            {"name": "EC2", "ref": "cycloid:ec2", "use_cases": ["default", "ha"]}
        ]
    })
}

pub fn catalogs_fixture() -> Value {
    json!({"catalog_repositories": [{"canonical": "main-catalog"}]})
}

/// Client end of an in-memory stdio session.
pub struct StdioClient {
    writer: Option<DuplexStream>,
    lines: Lines<BufReader<DuplexStream>>,
    server: JoinHandle<anyhow::Result<()>>,
}

impl StdioClient {
    pub fn start(handler: Arc<McpHandler>) -> Self {
        let server = McpStdioServer::new(handler, credentials());
        let (client_tx, server_rx) = duplex(64 * 1024);
        let (server_tx, client_rx) = duplex(64 * 1024);

        let server = tokio::spawn(async move {
            server.run_with_io(BufReader::new(server_rx), server_tx).await
        });

        Self { writer: Some(client_tx), lines: BufReader::new(client_rx).lines(), server }
    }

    pub async fn send(&mut self, message: Value) {
        let writer = self.writer.as_mut().expect("client input already closed");
        let mut line = message.to_string();
        line.push('\n');
        writer.write_all(line.as_bytes()).await.expect("write to server");
    }

    pub async fn send_raw(&mut self, line: &str) {
        let writer = self.writer.as_mut().expect("client input already closed");
        writer.write_all(line.as_bytes()).await.expect("write to server");
        writer.write_all(b"\n").await.expect("write to server");
    }

    /// Next message from the server
    pub async fn recv(&mut self) -> Value {
        let line = tokio::time::timeout(IO_TIMEOUT, self.lines.next_line())
            .await
            .expect("server answered in time")
            .expect("read from server")
            .expect("server output still open");
        serde_json::from_str(&line).expect("server wrote valid JSON")
    }

    /// Close stdin, collect everything still written and wait for the server.
    pub async fn finish(mut self) -> Vec<Value> {
        self.writer.take();
        let mut remaining = Vec::new();
        while let Some(line) = tokio::time::timeout(IO_TIMEOUT, self.lines.next_line())
            .await
            .expect("server finished in time")
            .expect("read from server")
        {
            remaining.push(serde_json::from_str(&line).expect("server wrote valid JSON"));
        }
        self.server.await.expect("server task").expect("server result");
        remaining
    }
}

/// Write an executable shell script standing in for `cy`.
#[cfg(unix)]
pub fn fake_cli(dir: &tempfile::TempDir, body: &str) -> String {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.path().join("cy");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write fake cy");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("make fake cy executable");
    path.to_string_lossy().into_owned()
}
