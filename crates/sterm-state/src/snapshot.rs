//! Immutable, versioned point-in-time views of one entity collection.

use chrono::{DateTime, Utc};
use std::time::Duration;
use sterm_slurm::{HistoryRecord, Job, Node, Partition};

/// Entities that can be diffed between snapshots: a stable identifier
/// plus a fingerprint that changes when the entity's observable state
/// changes.
pub trait Keyed {
    fn key(&self) -> &str;
    fn fingerprint(&self) -> String;
}

impl Keyed for Job {
    fn key(&self) -> &str {
        &self.job_id
    }
    fn fingerprint(&self) -> String {
        self.state.token().to_string()
    }
}

impl Keyed for Node {
    fn key(&self) -> &str {
        &self.name
    }
    fn fingerprint(&self) -> String {
        self.state.token().to_string()
    }
}

impl Keyed for Partition {
    fn key(&self) -> &str {
        &self.name
    }
    fn fingerprint(&self) -> String {
        format!("{}:{}", self.avail, self.node_count)
    }
}

impl Keyed for HistoryRecord {
    fn key(&self) -> &str {
        &self.job_id
    }
    fn fingerprint(&self) -> String {
        self.state.token().to_string()
    }
}

/// An immutable, versioned aggregate of one entity collection.
#[derive(Debug, Clone)]
pub struct Snapshot<T> {
    pub items: Vec<T>,
    pub taken_at: DateTime<Utc>,
    /// Monotonically increasing per collection, starting at 1.
    pub version: u64,
    /// Records dropped while parsing this snapshot.
    pub warning_count: usize,
    /// Wall-clock duration of the poll that produced this snapshot.
    pub poll_duration: Duration,
}

/// Identifiers newly present, removed, or state-changed since the
/// previous snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub changed: Vec<String>,
}

impl SnapshotDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }

    /// Compute the diff between two snapshots of the same collection.
    pub fn between<T: Keyed>(previous: &Snapshot<T>, current: &Snapshot<T>) -> Self {
        let mut diff = SnapshotDiff::default();
        for item in &current.items {
            match previous.items.iter().find(|p| p.key() == item.key()) {
                None => diff.added.push(item.key().to_string()),
                Some(prev) if prev.fingerprint() != item.fingerprint() => {
                    diff.changed.push(item.key().to_string())
                }
                Some(_) => {}
            }
        }
        for prev in &previous.items {
            if !current.items.iter().any(|c| c.key() == prev.key()) {
                diff.removed.push(prev.key().to_string());
            }
        }
        diff
    }
}
