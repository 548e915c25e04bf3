//! The command gateway: one operation per Slurm command family.
//!
//! Every operation takes already-validated, structured arguments and
//! builds an argument vector — parameters are never concatenated into
//! a shell string. Job ids are re-validated immediately before use
//! even when validated upstream.

use crate::command::{run_captured, CommandError, CommandOutput};
use crate::detail::parse_job_detail;
use crate::nodes::parse_nodes_output;
use crate::sacct::{parse_sacct_output, SACCT_FORMAT};
use crate::sinfo::{parse_sinfo_output, SINFO_FORMAT};
use crate::squeue::{parse_squeue_output, SQUEUE_FORMAT};
use crate::sstat::{parse_sstat_output, SSTAT_FORMAT};
use crate::stderr::{FailureKind, StderrPatterns};
use crate::types::{
    CommandFamily, HistoryRecord, Job, JobDetail, LiveStats, Node, ParseWarning, Partition,
};
use async_trait::async_trait;
use camino::Utf8Path;
use std::collections::BTreeMap;
use std::time::Duration;
use sterm_parsers::{
    validate_filter, validate_job_id, validate_param_key, validate_param_value, ValidateError,
};
use thiserror::Error;

/// Gateway failure. Exit codes are forwarded, not interpreted; the
/// `kind` comes from the configurable stderr pattern table and falls
/// back to [`FailureKind::Other`] with the raw stderr attached.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error(transparent)]
    Exec(#[from] CommandError),
    #[error("{family} command failed (exit {code:?}): {stderr}")]
    Failed {
        family: CommandFamily,
        kind: FailureKind,
        code: Option<i32>,
        stderr: String,
    },
    #[error("unexpected {family} output: {output:?}")]
    UnexpectedOutput {
        family: CommandFamily,
        output: String,
    },
    #[error(transparent)]
    Invalid(#[from] ValidateError),
}

/// Entities plus the non-fatal warnings accumulated while parsing them.
#[derive(Debug, Clone)]
pub struct Parsed<T> {
    pub items: Vec<T>,
    pub warnings: Vec<ParseWarning>,
}

/// Optional queue filters; values are validated before argv assembly.
#[derive(Debug, Clone, Default)]
pub struct QueueFilter {
    /// Restrict to one user (-u).
    pub user: Option<String>,
    /// Comma-separated state list (-t), e.g. "PENDING,RUNNING".
    pub states: Option<String>,
}

/// Job-control actions. A closed enum, never an interpolated string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobAction {
    Cancel,
    Hold,
    Release,
}

/// The external-command boundary: six logical operations against the
/// workload manager. The real implementation shells out to Slurm;
/// tests substitute their own.
#[async_trait]
pub trait ClusterBackend: Send + Sync {
    async fn list_queue(&self, filter: &QueueFilter) -> Result<Parsed<Job>, GatewayError>;
    async fn list_history(&self, since: &str) -> Result<Parsed<HistoryRecord>, GatewayError>;
    async fn list_partitions(&self) -> Result<Parsed<Partition>, GatewayError>;
    async fn list_nodes(&self) -> Result<Parsed<Node>, GatewayError>;
    /// Full detail for one job, including resolved stdout/stderr paths.
    async fn job_detail(&self, job_id: &str) -> Result<JobDetail, GatewayError>;
    /// Live usage for a running job; None when the accounting plugin
    /// has no data (yet).
    async fn live_stats(&self, job_id: &str) -> Result<Option<LiveStats>, GatewayError>;
    async fn control_job(&self, job_id: &str, action: JobAction) -> Result<(), GatewayError>;
    async fn submit_batch(
        &self,
        script: &Utf8Path,
        params: &BTreeMap<String, String>,
    ) -> Result<String, GatewayError>;
    /// Hands the foreground to srun; the caller must suspend polling
    /// around this. Returns the session's exit code.
    async fn submit_interactive(
        &self,
        params: &BTreeMap<String, String>,
        command: &[String],
    ) -> Result<i32, GatewayError>;
}

/// Gateway to a real Slurm installation.
pub struct SlurmGateway {
    patterns: StderrPatterns,
    timeout: Duration,
}

impl SlurmGateway {
    pub fn new(patterns: StderrPatterns, timeout: Duration) -> Self {
        Self { patterns, timeout }
    }

    /// Probe for the Slurm toolchain. An absent toolchain is the one
    /// fatal startup condition.
    pub async fn probe(&self) -> Result<(), GatewayError> {
        let out = self.run(CommandFamily::Queue, "squeue", &["--version".to_string()])
            .await?;
        self.check(CommandFamily::Queue, out).map(|_| ())
    }

    async fn run(
        &self,
        family: CommandFamily,
        program: &str,
        args: &[String],
    ) -> Result<CommandOutput, GatewayError> {
        let out = run_captured(program, args, self.timeout).await?;
        tracing::debug!(
            family = family.as_str(),
            program,
            code = ?out.code,
            duration_ms = out.duration.as_millis() as u64,
            "command finished"
        );
        Ok(out)
    }

    /// Map a non-zero exit to a classified failure, forwarding the raw
    /// stderr.
    fn check(
        &self,
        family: CommandFamily,
        out: CommandOutput,
    ) -> Result<CommandOutput, GatewayError> {
        if out.success() {
            Ok(out)
        } else {
            Err(GatewayError::Failed {
                family,
                kind: self.patterns.classify(&out.stderr),
                code: out.code,
                stderr: out.stderr.trim().to_string(),
            })
        }
    }

    /// Serialize a validated parameter map into `--key=value` argv
    /// elements, one per parameter. Keys and values are re-validated
    /// here as defense in depth.
    fn param_args(params: &BTreeMap<String, String>) -> Result<Vec<String>, GatewayError> {
        let mut args = Vec::with_capacity(params.len());
        for (key, value) in params {
            let key = validate_param_key(key)?;
            let value = validate_param_value(value)?;
            if value.is_empty() {
                args.push(format!("--{key}"));
            } else {
                args.push(format!("--{key}={value}"));
            }
        }
        Ok(args)
    }

    /// Extract the new job id from sbatch stdout ("Submitted batch job
    /// 12345"). The last token must actually be a job id; a trailing
    /// warning line must not be mistaken for one.
    fn parse_sbatch_stdout(stdout: &str) -> Result<String, GatewayError> {
        stdout
            .split_whitespace()
            .last()
            .and_then(|token| validate_job_id(token).ok())
            .ok_or_else(|| GatewayError::UnexpectedOutput {
                family: CommandFamily::SubmitBatch,
                output: stdout.to_string(),
            })
    }
}

impl Default for SlurmGateway {
    fn default() -> Self {
        Self::new(StderrPatterns::defaults(), Duration::from_secs(30))
    }
}

#[async_trait]
impl ClusterBackend for SlurmGateway {
    async fn list_queue(&self, filter: &QueueFilter) -> Result<Parsed<Job>, GatewayError> {
        let mut args = vec!["-h".to_string(), "-o".to_string(), SQUEUE_FORMAT.to_string()];
        if let Some(user) = &filter.user {
            args.push("-u".to_string());
            args.push(validate_filter(user)?);
        }
        if let Some(states) = &filter.states {
            args.push("-t".to_string());
            args.push(validate_filter(states)?);
        }
        let out = self.run(CommandFamily::Queue, "squeue", &args).await?;
        let out = self.check(CommandFamily::Queue, out)?;
        let (items, warnings) = parse_squeue_output(&out.stdout);
        Ok(Parsed { items, warnings })
    }

    async fn list_history(&self, since: &str) -> Result<Parsed<HistoryRecord>, GatewayError> {
        let args = vec![
            "-n".to_string(),
            "-P".to_string(),
            "-X".to_string(),
            format!("--format={SACCT_FORMAT}"),
            "-S".to_string(),
            validate_filter(since)?,
        ];
        let out = self.run(CommandFamily::History, "sacct", &args).await?;
        let out = self.check(CommandFamily::History, out)?;
        let (items, warnings) = parse_sacct_output(&out.stdout);
        Ok(Parsed { items, warnings })
    }

    async fn list_partitions(&self) -> Result<Parsed<Partition>, GatewayError> {
        let args = vec!["-h".to_string(), "-o".to_string(), SINFO_FORMAT.to_string()];
        let out = self.run(CommandFamily::Hardware, "sinfo", &args).await?;
        let out = self.check(CommandFamily::Hardware, out)?;
        let (items, warnings) = parse_sinfo_output(&out.stdout);
        Ok(Parsed { items, warnings })
    }

    async fn list_nodes(&self) -> Result<Parsed<Node>, GatewayError> {
        // -o emits one record per line; the parser accepts the block
        // form too
        let args = vec!["-o".to_string(), "show".to_string(), "nodes".to_string()];
        let out = self.run(CommandFamily::Hardware, "scontrol", &args).await?;
        let out = self.check(CommandFamily::Hardware, out)?;
        let (items, warnings) = parse_nodes_output(&out.stdout);
        Ok(Parsed { items, warnings })
    }

    async fn job_detail(&self, job_id: &str) -> Result<JobDetail, GatewayError> {
        let job_id = validate_job_id(job_id)?;
        let args = vec!["show".to_string(), "job".to_string(), job_id];
        let out = self.run(CommandFamily::Queue, "scontrol", &args).await?;
        let out = self.check(CommandFamily::Queue, out)?;
        parse_job_detail(&out.stdout).map_err(|_| GatewayError::UnexpectedOutput {
            family: CommandFamily::Queue,
            output: out.stdout.clone(),
        })
    }

    async fn live_stats(&self, job_id: &str) -> Result<Option<LiveStats>, GatewayError> {
        let job_id = validate_job_id(job_id)?;
        // Most Slurm versions report a batch job only under its .batch
        // step, so that suffix is retried when the bare id is empty
        for suffix in ["", ".batch"] {
            let args = vec![
                "-n".to_string(),
                "-P".to_string(),
                format!("--format={SSTAT_FORMAT}"),
                "-j".to_string(),
                format!("{job_id}{suffix}"),
            ];
            let out = self.run(CommandFamily::History, "sstat", &args).await?;
            if !out.success() {
                continue;
            }
            if let Some(stats) = parse_sstat_output(&out.stdout) {
                return Ok(Some(stats));
            }
        }
        Ok(None)
    }

    async fn control_job(&self, job_id: &str, action: JobAction) -> Result<(), GatewayError> {
        // Re-validate even if validated upstream; stale or forged state
        // must not reach the argv.
        let job_id = validate_job_id(job_id)?;
        let (program, args) = match action {
            JobAction::Cancel => ("scancel", vec![job_id]),
            JobAction::Hold => ("scontrol", vec!["hold".to_string(), job_id]),
            JobAction::Release => ("scontrol", vec!["release".to_string(), job_id]),
        };
        let out = self.run(CommandFamily::JobControl, program, &args).await?;
        self.check(CommandFamily::JobControl, out)?;
        Ok(())
    }

    async fn submit_batch(
        &self,
        script: &Utf8Path,
        params: &BTreeMap<String, String>,
    ) -> Result<String, GatewayError> {
        let mut args = Self::param_args(params)?;
        // Prevent the script path from being read as a flag
        let script = if script.as_str().starts_with('-') {
            format!("./{script}")
        } else {
            script.to_string()
        };
        args.push(script);

        let out = self.run(CommandFamily::SubmitBatch, "sbatch", &args).await?;
        let out = self.check(CommandFamily::SubmitBatch, out)?;
        Self::parse_sbatch_stdout(&out.stdout)
    }

    async fn submit_interactive(
        &self,
        params: &BTreeMap<String, String>,
        command: &[String],
    ) -> Result<i32, GatewayError> {
        let mut args = Self::param_args(params)?;
        for arg in command {
            args.push(validate_param_value(arg)?);
        }

        // The session owns the terminal until it exits; stdio is
        // inherited rather than captured.
        let status = tokio::process::Command::new("srun")
            .args(&args)
            .status()
            .await
            .map_err(|e| CommandError::Spawn {
                command: "srun".to_string(),
                error: e.to_string(),
            })?;

        Ok(status.code().unwrap_or(-1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_args_one_flag_per_parameter() {
        let mut params = BTreeMap::new();
        params.insert("time".to_string(), "01:00:00".to_string());
        params.insert("mem".to_string(), "4G".to_string());
        params.insert("exclusive".to_string(), String::new());
        let args = SlurmGateway::param_args(&params).unwrap();
        assert_eq!(args, vec!["--exclusive", "--mem=4G", "--time=01:00:00"]);
    }

    #[test]
    fn test_param_args_rejects_unsafe_keys() {
        let mut params = BTreeMap::new();
        params.insert("mem; rm -rf /".to_string(), "4G".to_string());
        assert!(matches!(
            SlurmGateway::param_args(&params),
            Err(GatewayError::Invalid(_))
        ));
    }

    #[test]
    fn test_param_args_rejects_newline_values() {
        let mut params = BTreeMap::new();
        params.insert("comment".to_string(), "a\nb".to_string());
        assert!(SlurmGateway::param_args(&params).is_err());
    }

    #[test]
    fn test_parse_sbatch_stdout() {
        assert_eq!(
            SlurmGateway::parse_sbatch_stdout("Submitted batch job 12345\n").unwrap(),
            "12345"
        );
        // A trailing warning line must not pass as the job id
        assert!(matches!(
            SlurmGateway::parse_sbatch_stdout(
                "Submitted batch job 12345\nsbatch: Warning: quota nearly exceeded\n"
            ),
            Err(GatewayError::UnexpectedOutput { .. })
        ));
        assert!(SlurmGateway::parse_sbatch_stdout("").is_err());
    }

    #[tokio::test]
    async fn test_control_job_revalidates_id() {
        let gateway = SlurmGateway::default();
        let result = gateway.control_job("123; reboot", JobAction::Cancel).await;
        assert!(matches!(result, Err(GatewayError::Invalid(_))));
    }
}
