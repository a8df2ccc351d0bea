//! # Cycloid CLI Wrapper
//!
//! Everything needed to run one `cy` command on behalf of one request:
//!
//! - [`Credentials`] extraction from headers or environment
//! - [`Invocation`] argv building
//! - [`CommandRunner`] subprocess execution with a deadline
//! - [`map_result`] mapping of exit status and stdout to values or [`CliError`]
//!
//! [`CycloidCli`] composes the four. It holds only read-only settings and
//! shared observers; credentials are passed to every call.

pub mod command;
pub mod credentials;
pub mod output;
pub mod runner;

pub use command::{FlagValue, Invocation, OutputFormat};
pub use credentials::Credentials;
pub use output::{map_result, parse_structured, process_list, CliOutput, InvocationResult};
pub use runner::{CommandRunner, ProcessOutput, ProcessRunner};

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::config::CliSettings;
use crate::errors::{CliError, RetryPolicy};
use crate::observability::{ErrorMonitor, MetricsRecorder};

/// Executes Cycloid CLI commands for MCP handlers.
pub struct CycloidCli {
    settings: CliSettings,
    runner: Arc<dyn CommandRunner>,
    monitor: Arc<ErrorMonitor>,
    metrics: MetricsRecorder,
}

impl CycloidCli {
    /// Wrapper that launches real subprocesses.
    pub fn new(settings: CliSettings) -> Self {
        Self::with_runner(settings, Arc::new(ProcessRunner))
    }

    pub fn with_runner(settings: CliSettings, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            settings,
            runner,
            monitor: Arc::new(ErrorMonitor::default()),
            metrics: MetricsRecorder::new(),
        }
    }

    pub fn with_monitor(mut self, monitor: Arc<ErrorMonitor>) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn settings(&self) -> &CliSettings {
        &self.settings
    }

    pub fn monitor(&self) -> &Arc<ErrorMonitor> {
        &self.monitor
    }

    /// Variables layered over the inherited environment of the child.
    pub fn environment(&self, credentials: &Credentials) -> Vec<(String, String)> {
        vec![
            (credentials::ORG_ENV.to_string(), credentials.organization().to_string()),
            (credentials::API_KEY_ENV.to_string(), credentials.api_key().to_string()),
            (credentials::API_URL_ENV.to_string(), self.settings.api_url.clone()),
        ]
    }

    /// Run an invocation and return its raw result, whatever the exit code.
    ///
    /// Only launch failures and timeouts are errors here. Every outcome,
    /// non-zero exits included, is reported to the error monitor.
    #[instrument(
        skip(self, credentials, invocation),
        fields(subcommand = %invocation.subcommand(), org = %credentials.organization()),
        name = "cycloid_cli_execute"
    )]
    pub async fn execute(
        &self,
        credentials: &Credentials,
        invocation: &Invocation,
    ) -> Result<InvocationResult, CliError> {
        let argv = invocation.argv(&self.settings.cli_path);
        let command = argv.join(" ");
        let timeout = invocation.timeout_override().unwrap_or_else(|| self.settings.timeout());
        let env = self.environment(credentials);

        debug!(command = %command, timeout_secs = timeout.as_secs(), "Executing CLI command");
        let started = Instant::now();

        let outcome = self.runner.run(&argv, &env, timeout).await;
        let elapsed = started.elapsed().as_secs_f64();

        match outcome {
            Ok(output) => {
                let result = InvocationResult {
                    command,
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    exit_code: output.exit_code,
                };
                self.metrics.record_cli_invocation(
                    invocation.subcommand(),
                    result.success(),
                    elapsed,
                );
                debug!(exit_code = result.exit_code, elapsed_secs = elapsed, "CLI command finished");
                if result.success() {
                    self.monitor.record_success();
                } else {
                    self.record_failure(&CliError::Execution {
                        command: result.command.clone(),
                        exit_code: result.exit_code,
                        stderr: result.stderr.clone(),
                    });
                }
                Ok(result)
            }
            Err(error) => {
                self.metrics.record_cli_invocation(invocation.subcommand(), false, elapsed);
                self.record_failure(&error);
                Err(error)
            }
        }
    }

    /// Run an invocation and map it through [`map_result`].
    pub async fn execute_output(
        &self,
        credentials: &Credentials,
        invocation: &Invocation,
    ) -> Result<CliOutput, CliError> {
        let result = self.execute(credentials, invocation).await?;
        map_result(&result, invocation.output_format()).inspect_err(|error| {
            // Non-zero exits were already counted by `execute`
            if !matches!(error, CliError::Execution { .. }) {
                self.record_failure(error);
            }
        })
    }

    /// Run an invocation that must produce structured output.
    pub async fn execute_json(
        &self,
        credentials: &Credentials,
        invocation: &Invocation,
    ) -> Result<Value, CliError> {
        let invocation = invocation.clone().output(OutputFormat::Json);
        self.execute_output(credentials, &invocation).await.map(CliOutput::into_value)
    }

    /// [`CycloidCli::execute_json`] with retries of transient failures.
    pub async fn execute_json_with_retry(
        &self,
        credentials: &Credentials,
        invocation: &Invocation,
        policy: &RetryPolicy,
    ) -> Result<Value, CliError> {
        let mut attempt = 1;
        loop {
            match self.execute_json(credentials, invocation).await {
                Ok(value) => return Ok(value),
                Err(error) if policy.should_retry(&error, attempt) => {
                    let delay = policy.delay_for(attempt);
                    warn!(
                        subcommand = %invocation.subcommand(),
                        attempt,
                        max_attempts = policy.max_attempts,
                        retry_delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Retrying CLI command"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }

    fn record_failure(&self, error: &CliError) {
        warn!(
            kind = error.kind(),
            command = error.command().unwrap_or_default(),
            error = %error,
            "CLI command failed"
        );
        self.monitor.record(error.kind(), error.command().unwrap_or_default());
    }
}
