//! Subprocess execution of the Cycloid CLI.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::errors::CliError;

/// Raw outcome of a finished subprocess.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: i32,
}

/// Launches argv with extra environment variables and a deadline.
///
/// [`ProcessRunner`] is the real implementation; tests substitute a scripted
/// runner through this trait.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(
        &self,
        argv: &[String],
        env: &[(String, String)],
        timeout: Duration,
    ) -> Result<ProcessOutput, CliError>;
}

/// Runs the binary as a child process, without a shell.
///
/// The child inherits the server's environment, with `env` layered on top.
/// When the deadline passes the child is killed and [`CliError::Timeout`]
/// is returned.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(
        &self,
        argv: &[String],
        env: &[(String, String)],
        timeout: Duration,
    ) -> Result<ProcessOutput, CliError> {
        let command_line = argv.join(" ");
        let (program, args) = argv.split_first().ok_or_else(|| CliError::Spawn {
            command: command_line.clone(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty argv"),
        })?;

        let child = Command::new(program)
            .args(args)
            .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CliError::Spawn { command: command_line.clone(), source })?;

        debug!(command = %command_line, pid = ?child.id(), "Spawned CLI process");

        // Dropping the `wait_with_output` future on timeout drops the child,
        // and `kill_on_drop` terminates it.
        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(ProcessOutput {
                stdout: output.stdout,
                stderr: output.stderr,
                exit_code: output.status.code().unwrap_or(-1),
            }),
            Ok(Err(source)) => Err(CliError::Spawn { command: command_line, source }),
            Err(_) => {
                warn!(
                    command = %command_line,
                    timeout_secs = timeout.as_secs_f64(),
                    "CLI process exceeded timeout"
                );
                Err(CliError::Timeout { command: command_line, timeout })
            }
        }
    }
}
