//! Test doubles for the CLI runner and the elicitation channel.
//!
//! Built for unit tests, and for the integration tests under `tests/`
//! through the `test-support` feature. Not part of release builds.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::CliSettings;
use crate::cycloid::{CommandRunner, Credentials, CycloidCli, ProcessOutput};
use crate::errors::CliError;
use crate::mcp::elicitation::{ElicitResponse, ElicitSchema, ElicitationError, Elicitor};
use crate::mcp::elicitation::UnsupportedElicitor;
use crate::mcp::tools::ToolContext;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One recorded [`CommandRunner::run`] call
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub argv: Vec<String>,
    pub env: Vec<(String, String)>,
    pub timeout: Duration,
}

impl RecordedCall {
    pub fn env_var(&self, name: &str) -> Option<&str> {
        self.env.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
    }
}

#[derive(Debug)]
enum Scripted {
    Exit { code: i32, stdout: String, stderr: String },
    Timeout,
    SpawnFailure,
}

/// [`CommandRunner`] that replays queued outcomes in order.
///
/// Once the queue is empty every call exits 0 with `[]`.
#[derive(Debug, Default)]
pub struct MockRunner {
    script: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, code: i32, stdout: &str, stderr: &str) -> Self {
        lock(&self.script).push_back(Scripted::Exit {
            code,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        });
        self
    }

    pub fn respond_json(self, value: Value) -> Self {
        let stdout = value.to_string();
        self.respond(0, &stdout, "")
    }

    pub fn respond_timeout(self) -> Self {
        lock(&self.script).push_back(Scripted::Timeout);
        self
    }

    pub fn respond_spawn_failure(self) -> Self {
        lock(&self.script).push_back(Scripted::SpawnFailure);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn run(
        &self,
        argv: &[String],
        env: &[(String, String)],
        timeout: Duration,
    ) -> Result<ProcessOutput, CliError> {
        lock(&self.calls).push(RecordedCall { argv: argv.to_vec(), env: env.to_vec(), timeout });

        let command = argv.join(" ");
        match lock(&self.script).pop_front() {
            Some(Scripted::Exit { code, stdout, stderr }) => Ok(ProcessOutput {
                stdout: stdout.into_bytes(),
                stderr: stderr.into_bytes(),
                exit_code: code,
            }),
            Some(Scripted::Timeout) => Err(CliError::Timeout { command, timeout }),
            Some(Scripted::SpawnFailure) => Err(CliError::Spawn {
                command,
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "No such file"),
            }),
            None => Ok(ProcessOutput { stdout: b"[]".to_vec(), stderr: Vec::new(), exit_code: 0 }),
        }
    }
}

/// [`Elicitor`] that replays queued answers and records the prompts.
///
/// Running out of answers behaves like a closed transport.
#[derive(Debug)]
pub struct ScriptedElicitor {
    supported: bool,
    answers: Mutex<VecDeque<ElicitResponse>>,
    prompts: Mutex<Vec<(String, ElicitSchema)>>,
}

impl Default for ScriptedElicitor {
    fn default() -> Self {
        Self { supported: true, answers: Mutex::default(), prompts: Mutex::default() }
    }
}

impl ScriptedElicitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unsupported() -> Self {
        Self { supported: false, ..Self::default() }
    }

    pub fn answer(self, response: ElicitResponse) -> Self {
        lock(&self.answers).push_back(response);
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).iter().map(|(message, _)| message.clone()).collect()
    }

    pub fn schemas(&self) -> Vec<ElicitSchema> {
        lock(&self.prompts).iter().map(|(_, schema)| schema.clone()).collect()
    }
}

#[async_trait]
impl Elicitor for ScriptedElicitor {
    fn is_supported(&self) -> bool {
        self.supported
    }

    async fn elicit(
        &self,
        message: &str,
        schema: ElicitSchema,
    ) -> Result<ElicitResponse, ElicitationError> {
        if !self.supported {
            return Err(ElicitationError::Unsupported);
        }
        lock(&self.prompts).push((message.to_string(), schema));
        lock(&self.answers).pop_front().ok_or(ElicitationError::Closed)
    }
}

pub fn credentials() -> Credentials {
    Credentials::new("test-org", "test-key")
}

/// Settings pointing at a `cy` that is never actually launched
pub fn settings() -> CliSettings {
    CliSettings {
        cli_path: "cy".to_string(),
        api_url: "https://api.cycloid.io".to_string(),
        timeout_seconds: 30,
    }
}

pub fn cli_with(runner: Arc<MockRunner>) -> Arc<CycloidCli> {
    Arc::new(CycloidCli::with_runner(settings(), runner))
}

/// Tool context on a client without elicitation support
pub fn tool_context(runner: Arc<MockRunner>) -> ToolContext {
    ToolContext::new(cli_with(runner), credentials(), Arc::new(UnsupportedElicitor))
}

pub fn tool_context_with_elicitor(
    runner: Arc<MockRunner>,
    elicitor: Arc<ScriptedElicitor>,
) -> ToolContext {
    ToolContext::new(cli_with(runner), credentials(), elicitor)
}
