//! Captured execution of external Slurm commands.
//!
//! Commands are always built as argument vectors; nothing here ever
//! goes through a shell. Exit codes are forwarded uninterpreted —
//! classification of failures belongs to the caller (see
//! [`crate::stderr`]).

use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::process::Command;

/// Error executing an external command. A non-zero exit is *not* an
/// error at this layer; only failure to run the command at all is.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("failed to execute {command}: {error}")]
    Spawn { command: String, error: String },
    #[error("{command} timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },
}

/// Captured result of one external command invocation.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code; None when terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// Wall-clock duration of the invocation.
    pub duration: Duration,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Run a command with captured stdout/stderr.
///
/// `timeout` bounds the wall-clock run time; hitting it kills the
/// child and surfaces [`CommandError::Timeout`].
pub async fn run_captured(
    program: &str,
    args: &[String],
    timeout: Duration,
) -> Result<CommandOutput, CommandError> {
    let started = Instant::now();
    let mut cmd = Command::new(program);
    cmd.args(args).kill_on_drop(true);

    let output = tokio::time::timeout(timeout, cmd.output())
        .await
        .map_err(|_| CommandError::Timeout {
            command: program.to_string(),
            timeout,
        })?
        .map_err(|e| CommandError::Spawn {
            command: program.to_string(),
            error: e.to_string(),
        })?;

    Ok(CommandOutput {
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        duration: started.elapsed(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_captured_success() {
        let out = run_captured("echo", &["hello".to_string()], Duration::from_secs(5))
            .await
            .unwrap();
        assert!(out.success());
        assert_eq!(out.stdout.trim(), "hello");
        assert!(out.stderr.is_empty());
    }

    #[tokio::test]
    async fn test_run_captured_forwards_nonzero_exit() {
        let out = run_captured("false", &[], Duration::from_secs(5))
            .await
            .unwrap();
        assert!(!out.success());
        assert_eq!(out.code, Some(1));
    }

    #[tokio::test]
    async fn test_run_captured_missing_binary() {
        let result = run_captured("nonexistent_command_12345", &[], Duration::from_secs(5)).await;
        assert!(matches!(result, Err(CommandError::Spawn { .. })));
    }
}
