//! Slurm integration for sterm.
//!
//! The [`gateway::SlurmGateway`] builds argument vectors for the six
//! Slurm command families and executes them; the per-family parser
//! modules turn the raw output into typed entities.

pub mod command;
pub mod detail;
pub mod gateway;
pub mod nodes;
pub mod sacct;
pub mod sinfo;
pub mod squeue;
pub mod sstat;
pub mod stderr;
pub mod types;

pub use command::{run_captured, CommandError, CommandOutput};
pub use gateway::{ClusterBackend, GatewayError, JobAction, Parsed, QueueFilter, SlurmGateway};
pub use stderr::{FailureKind, StderrPatterns};
pub use types::{
    CommandFamily, HistoryRecord, Job, JobDetail, JobState, LiveStats, Node, NodeState,
    ParseWarning, Partition,
};
