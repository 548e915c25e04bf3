//! Typed entities parsed from Slurm command output.

use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use std::time::Duration;
use sterm_parsers::ExitStatus;

/// Slurm job state as reported by squeue/sacct.
///
/// Unrecognized tokens map to `Unknown` so a future Slurm version
/// cannot invalidate a whole snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running,
    Suspended,
    Completing,
    Completed,
    Cancelled,
    Failed,
    Timeout,
    NodeFail,
    OutOfMemory,
    Unknown(String),
}

impl JobState {
    /// Parse a squeue/sacct state token (extended or compact form).
    ///
    /// sacct may append context ("CANCELLED by 1000"); only the first
    /// word is significant.
    pub fn parse(s: &str) -> Self {
        let base = s.split_whitespace().next().unwrap_or(s);
        match base.to_uppercase().as_str() {
            "PENDING" | "PD" => Self::Pending,
            "RUNNING" | "R" => Self::Running,
            "SUSPENDED" | "S" => Self::Suspended,
            "COMPLETING" | "CG" => Self::Completing,
            "COMPLETED" | "CD" => Self::Completed,
            "CANCELLED" | "CA" => Self::Cancelled,
            "FAILED" | "F" => Self::Failed,
            "TIMEOUT" | "TO" => Self::Timeout,
            "NODE_FAIL" | "NF" => Self::NodeFail,
            "OUT_OF_MEMORY" | "OOM" => Self::OutOfMemory,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Stable token used for change detection between snapshots.
    pub fn token(&self) -> &str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Suspended => "SUSPENDED",
            Self::Completing => "COMPLETING",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
            Self::Failed => "FAILED",
            Self::Timeout => "TIMEOUT",
            Self::NodeFail => "NODE_FAIL",
            Self::OutOfMemory => "OUT_OF_MEMORY",
            Self::Unknown(raw) => raw,
        }
    }
}

/// An active job from the queue.
#[derive(Debug, Clone)]
pub struct Job {
    /// Job id, numeric with an optional array suffix ("12345_7").
    /// Immutable once assigned.
    pub job_id: String,
    pub name: String,
    pub state: JobState,
    pub partition: Option<String>,
    pub user: Option<String>,
    pub submit_time: Option<DateTime<Utc>>,
    /// None until the job is scheduled.
    pub start_time: Option<DateTime<Utc>>,
    pub work_dir: Option<Utf8PathBuf>,
    pub node_count: u32,
    pub cpus: u32,
    pub mem_mb: Option<u64>,
    pub gres: Option<String>,
    /// Empty while the job is pending.
    pub nodelist: Option<String>,
    pub reason: Option<String>,
    /// stdout path template; %j/%x/%u/%A/%a placeholders are resolved
    /// per-job by the log tailer.
    pub stdout_template: String,
    pub stderr_template: String,
}

impl Job {
    /// Default Slurm output template for this job id.
    ///
    /// Array tasks write slurm-%A_%a.out, everything else slurm-%j.out.
    /// By default stderr shares the stdout file.
    pub fn default_output_template(job_id: &str) -> &'static str {
        if job_id.contains('_') {
            "slurm-%A_%a.out"
        } else {
            "slurm-%j.out"
        }
    }
}

/// Node state from scontrol show nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeState {
    Idle,
    Allocated,
    Mixed,
    Down,
    Drained,
    Draining,
    Other(String),
}

impl NodeState {
    /// Parse a node state token. Suffix flags ("IDLE+DRAIN", "MIXED*")
    /// are stripped before matching.
    pub fn parse(s: &str) -> Self {
        let base = s
            .trim_end_matches(['*', '~', '#', '$', '@'])
            .split('+')
            .next()
            .unwrap_or(s);
        match base.to_uppercase().as_str() {
            "IDLE" => Self::Idle,
            "ALLOCATED" | "ALLOC" => Self::Allocated,
            "MIXED" | "MIX" => Self::Mixed,
            "DOWN" => Self::Down,
            "DRAINED" | "DRAIN" => Self::Drained,
            "DRAINING" | "DRNG" => Self::Draining,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn token(&self) -> &str {
        match self {
            Self::Idle => "IDLE",
            Self::Allocated => "ALLOCATED",
            Self::Mixed => "MIXED",
            Self::Down => "DOWN",
            Self::Drained => "DRAINED",
            Self::Draining => "DRAINING",
            Self::Other(raw) => raw,
        }
    }
}

/// A compute node.
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub state: NodeState,
    pub cpus: u32,
    pub memory_mb: Option<u64>,
    pub free_mem_mb: Option<u64>,
    pub gres: Option<String>,
    pub load: Option<f64>,
    /// A node can belong to several partitions.
    pub partitions: Vec<String>,
}

/// A partition summary row from sinfo.
#[derive(Debug, Clone)]
pub struct Partition {
    pub name: String,
    /// True when the name carried the trailing '*' default marker.
    pub is_default: bool,
    pub avail: bool,
    /// None means UNLIMITED.
    pub time_limit: Option<Duration>,
    pub node_count: u32,
    pub cpus: u32,
    pub memory_mb: Option<u64>,
    pub gres: Option<String>,
}

/// Detailed view of one job from `scontrol show job`, including the
/// resolved stdout/stderr paths the queue listing cannot provide.
#[derive(Debug, Clone)]
pub struct JobDetail {
    pub job_id: String,
    pub name: String,
    pub state: JobState,
    pub user: Option<String>,
    pub partition: Option<String>,
    pub reason: Option<String>,
    pub run_time: Option<Duration>,
    pub time_limit: Option<Duration>,
    pub submit_time: Option<DateTime<Utc>>,
    pub start_time: Option<DateTime<Utc>>,
    pub node_count: Option<u32>,
    pub cpus: Option<u32>,
    pub mem_mb: Option<u64>,
    pub nodelist: Option<String>,
    pub command: Option<String>,
    pub work_dir: Option<Utf8PathBuf>,
    pub stdout_path: Option<Utf8PathBuf>,
    pub stderr_path: Option<Utf8PathBuf>,
    pub exit: ExitStatus,
}

/// Live resource usage of a running job, from sstat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveStats {
    pub ave_cpu: Option<Duration>,
    pub max_rss_mb: Option<u64>,
    pub max_vmsize_mb: Option<u64>,
}

/// A completed-job accounting record from sacct. Immutable once
/// retrieved; the workload manager is the system of record.
#[derive(Debug, Clone)]
pub struct HistoryRecord {
    pub job_id: String,
    pub name: String,
    pub partition: Option<String>,
    pub state: JobState,
    pub elapsed: Option<Duration>,
    pub cpu_time: Option<Duration>,
    pub max_rss_mb: Option<u64>,
    pub exit: ExitStatus,
}

/// The six external command families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandFamily {
    Queue,
    JobControl,
    SubmitBatch,
    SubmitInteractive,
    History,
    Hardware,
}

impl CommandFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queue => "queue",
            Self::JobControl => "job-control",
            Self::SubmitBatch => "submit-batch",
            Self::SubmitInteractive => "submit-interactive",
            Self::History => "history",
            Self::Hardware => "hardware",
        }
    }
}

impl std::fmt::Display for CommandFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-fatal record-level parse failure. The offending record is
/// dropped; the rest of the snapshot survives.
#[derive(Debug, Clone)]
pub struct ParseWarning {
    pub family: CommandFamily,
    pub line: String,
    pub reason: String,
}

impl ParseWarning {
    pub fn new(family: CommandFamily, line: &str, reason: impl Into<String>) -> Self {
        Self {
            family,
            line: line.to_string(),
            reason: reason.into(),
        }
    }
}
