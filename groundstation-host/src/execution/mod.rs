//! Command execution for the ground station host
//!
//! Runs external programs on behalf of the kernel:
//! - Shell command lines (`sh -c`) inside a chosen working directory
//! - Direct program invocations for collaborator tools (battery CLI, sensor helper)
//! - Hard wall-clock timeout; the child is killed when it expires

use anyhow::{anyhow, Result};
use serde::Serialize;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command as AsyncCommand;
use tracing::debug;

/// Command execution result
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub execution_time_ms: u128,
}

impl ExecutionResult {
    /// Output and failure text merged, the way an operator terminal shows it
    pub fn transcript(&self) -> String {
        match &self.error {
            None => self.output.clone(),
            Some(error) if self.output.is_empty() => error.clone(),
            Some(error) => format!("{}\n{}", self.output.trim_end(), error),
        }
    }
}

/// Process runner with timeout
pub struct CommandExecutor;

impl CommandExecutor {
    /// Execute a shell command line in `cwd`
    pub async fn execute_shell_command(command: &str, cwd: &Path, timeout: Duration) -> ExecutionResult {
        let mut cmd = AsyncCommand::new("sh");
        cmd.arg("-c").arg(command).current_dir(cwd);
        Self::run(cmd, command, timeout).await
    }

    /// Execute a program directly, without a shell
    pub async fn execute_program(program: &str, args: &[&str], timeout: Duration) -> ExecutionResult {
        let mut cmd = AsyncCommand::new(program);
        cmd.args(args);
        Self::run(cmd, program, timeout).await
    }

    /// Run a program and return its stdout, failing on any unsuccessful outcome
    pub async fn check_output(program: &str, args: &[&str], timeout: Duration) -> Result<String> {
        let result = Self::execute_program(program, args, timeout).await;
        if result.success {
            Ok(result.output)
        } else {
            Err(anyhow!(result
                .error
                .unwrap_or_else(|| format!("{} failed", program))))
        }
    }

    async fn run(mut cmd: AsyncCommand, label: &str, timeout: Duration) -> ExecutionResult {
        let start_time = Instant::now();
        debug!("Executing: {} (timeout: {}s)", label, timeout.as_secs());

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let outcome = tokio::time::timeout(timeout, cmd.output()).await;
        let execution_time_ms = start_time.elapsed().as_millis();

        match outcome {
            Err(_) => ExecutionResult {
                success: false,
                output: String::new(),
                error: Some(format!(
                    "Command '{}' timed out after {} seconds",
                    label,
                    timeout.as_secs()
                )),
                exit_code: None,
                timed_out: true,
                execution_time_ms,
            },
            Ok(Err(e)) => ExecutionResult {
                success: false,
                output: String::new(),
                error: Some(format!("Failed to execute '{}': {}", label, e)),
                exit_code: None,
                timed_out: false,
                execution_time_ms,
            },
            Ok(Ok(output)) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let stderr = String::from_utf8_lossy(&output.stderr);
                let combined_output = if stderr.is_empty() {
                    stdout.to_string()
                } else {
                    format!("{}\nSTDERR:\n{}", stdout, stderr)
                };

                let exit_code = output.status.code();
                let success = output.status.success();
                let error = if success {
                    None
                } else {
                    Some(match exit_code {
                        Some(code) => format!("Command '{}' returned non-zero exit status {}", label, code),
                        None => format!("Command '{}' was terminated by a signal", label),
                    })
                };

                ExecutionResult {
                    success,
                    output: combined_output,
                    error,
                    exit_code,
                    timed_out: false,
                    execution_time_ms,
                }
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_shell_command_execution() {
        let dir = tempfile::tempdir().unwrap();
        let result = CommandExecutor::execute_shell_command("echo 'Hello World'", dir.path(), Duration::from_secs(5)).await;

        assert!(result.success);
        assert!(result.output.contains("Hello World"));
        assert!(result.execution_time_ms < 5000);
    }

    #[tokio::test]
    async fn test_shell_runs_in_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "x").unwrap();

        let result = CommandExecutor::execute_shell_command("ls", dir.path(), Duration::from_secs(5)).await;
        assert!(result.success);
        assert!(result.output.contains("marker.txt"));
    }

    #[tokio::test]
    async fn test_command_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let result = CommandExecutor::execute_shell_command("sleep 10", dir.path(), Duration::from_secs(1)).await;

        assert!(!result.success);
        assert!(result.timed_out);
        assert!(result.error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let result = CommandExecutor::execute_shell_command("echo oops >&2; exit 3", dir.path(), Duration::from_secs(5)).await;

        assert!(!result.success);
        assert_eq!(result.exit_code, Some(3));
        assert!(result.output.contains("STDERR:"));
        assert!(result.transcript().contains("non-zero exit status 3"));
    }

    #[tokio::test]
    async fn test_check_output_missing_program() {
        let err = CommandExecutor::check_output("definitely-not-a-real-tool-xyz", &[], Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to execute"));
    }
}
