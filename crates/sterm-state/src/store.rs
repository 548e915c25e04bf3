//! The process-lifetime state store.

use crate::snapshot::{Keyed, Snapshot, SnapshotDiff};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use sterm_slurm::{HistoryRecord, Job, Node, Partition};
use tokio::sync::Mutex;

struct Slot<T> {
    current: Option<Arc<Snapshot<T>>>,
    previous: Option<Arc<Snapshot<T>>>,
    next_version: u64,
    last_error: Option<String>,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self {
            current: None,
            previous: None,
            next_version: 1,
            last_error: None,
        }
    }
}

/// One entity collection: the latest snapshot, the previous one for
/// diffing, and the last poll error.
pub struct Collection<T> {
    slot: Mutex<Slot<T>>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            slot: Mutex::new(Slot::default()),
        }
    }
}

impl<T: Keyed + Clone> Collection<T> {
    /// Atomically replace the current snapshot. The version counter
    /// advances even when the items are unchanged. Clears any recorded
    /// error.
    pub async fn publish(&self, items: Vec<T>, warning_count: usize, poll_duration: Duration) {
        let mut slot = self.slot.lock().await;
        let snapshot = Arc::new(Snapshot {
            items,
            taken_at: Utc::now(),
            version: slot.next_version,
            warning_count,
            poll_duration,
        });
        slot.next_version += 1;
        slot.previous = slot.current.take();
        slot.current = Some(snapshot);
        slot.last_error = None;
    }

    /// The latest snapshot, or None before the first successful poll.
    pub async fn current(&self) -> Option<Arc<Snapshot<T>>> {
        self.slot.lock().await.current.clone()
    }

    /// Which identifiers are newly present, removed, or state-changed
    /// since the previous snapshot. None before two snapshots exist.
    pub async fn diff(&self) -> Option<SnapshotDiff> {
        let slot = self.slot.lock().await;
        match (&slot.previous, &slot.current) {
            (Some(prev), Some(cur)) => Some(SnapshotDiff::between(prev, cur)),
            _ => None,
        }
    }

    /// Record a poll failure. The previous snapshot remains current.
    pub async fn record_error(&self, error: impl Into<String>) {
        self.slot.lock().await.last_error = Some(error.into());
    }

    pub async fn last_error(&self) -> Option<String> {
        self.slot.lock().await.last_error.clone()
    }
}

/// The single shared state store, constructed once at startup and
/// passed to the refresh scheduler and to read-only consumers.
#[derive(Default)]
pub struct StateStore {
    pub jobs: Collection<Job>,
    pub nodes: Collection<Node>,
    pub partitions: Collection<Partition>,
    pub history: Collection<HistoryRecord>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }
}
