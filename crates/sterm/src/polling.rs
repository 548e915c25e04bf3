//! Background refresh scheduler.
//!
//! Each collection (queue, hardware, history) has its own interval and
//! its own overlap guard: a tick that arrives while that collection is
//! mid-poll is dropped, not queued. A poll failure keeps the previous
//! snapshot, records the error, and leaves the schedule running.
//! While an interactive session owns the foreground the scheduler is
//! suspended; resuming triggers an immediate refresh of everything.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use sterm_slurm::{ClusterBackend, QueueFilter};
use sterm_state::StateStore;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, MissedTickBehavior};

/// One pollable collection. Hardware covers both partitions and nodes
/// since they refresh together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    Queue,
    Hardware,
    History,
}

/// Observable scheduler state for one collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerPhase {
    Idle,
    Polling,
    Suspended,
}

/// A manual refresh request.
#[derive(Debug, Clone, Copy)]
pub enum Refresh {
    One(CollectionKind),
    All,
}

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct PollingConfig {
    pub queue_interval: Duration,
    pub hardware_interval: Duration,
    pub history_interval: Duration,
    /// Trailing window passed to the accounting query.
    pub history_window: String,
    pub filter: QueueFilter,
    /// Poll everything once at startup instead of waiting a full
    /// interval.
    pub poll_on_start: bool,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            queue_interval: Duration::from_secs(3),
            hardware_interval: Duration::from_secs(30),
            history_interval: Duration::from_secs(60),
            history_window: "now-7days".to_string(),
            filter: QueueFilter::default(),
            poll_on_start: true,
        }
    }
}

#[derive(Default)]
struct InFlight {
    queue: AtomicBool,
    hardware: AtomicBool,
    history: AtomicBool,
}

impl InFlight {
    fn flag(&self, kind: CollectionKind) -> &AtomicBool {
        match kind {
            CollectionKind::Queue => &self.queue,
            CollectionKind::Hardware => &self.hardware,
            CollectionKind::History => &self.history,
        }
    }
}

/// Handle for the presentation layer and the interactive-session path:
/// manual refreshes, suspension, and phase observation.
#[derive(Clone)]
pub struct PollingHandle {
    refresh_tx: mpsc::Sender<Refresh>,
    suspend_tx: Arc<watch::Sender<bool>>,
    in_flight: Arc<InFlight>,
}

impl PollingHandle {
    /// Request an on-demand refresh. Dropped if the scheduler has shut
    /// down.
    pub async fn refresh(&self, request: Refresh) {
        let _ = self.refresh_tx.send(request).await;
    }

    /// Suspend polling while a foreground process owns the terminal.
    pub fn suspend(&self) {
        let _ = self.suspend_tx.send(true);
    }

    /// Resume polling; the scheduler immediately refreshes everything.
    pub fn resume(&self) {
        let _ = self.suspend_tx.send(false);
    }

    pub fn phase(&self, kind: CollectionKind) -> SchedulerPhase {
        if *self.suspend_tx.borrow() {
            SchedulerPhase::Suspended
        } else if self.in_flight.flag(kind).load(Ordering::SeqCst) {
            SchedulerPhase::Polling
        } else {
            SchedulerPhase::Idle
        }
    }
}

/// The polling service. Construct with [`PollingService::new`], then
/// [`start`](PollingService::start) it on the runtime.
pub struct PollingService {
    backend: Arc<dyn ClusterBackend>,
    store: Arc<StateStore>,
    config: PollingConfig,
    in_flight: Arc<InFlight>,
    refresh_rx: mpsc::Receiver<Refresh>,
    suspend_rx: watch::Receiver<bool>,
}

impl PollingService {
    pub fn new(
        backend: Arc<dyn ClusterBackend>,
        store: Arc<StateStore>,
        config: PollingConfig,
    ) -> (Self, PollingHandle) {
        let (refresh_tx, refresh_rx) = mpsc::channel(16);
        let (suspend_tx, suspend_rx) = watch::channel(false);
        let in_flight = Arc::new(InFlight::default());

        let handle = PollingHandle {
            refresh_tx,
            suspend_tx: Arc::new(suspend_tx),
            in_flight: in_flight.clone(),
        };
        let service = Self {
            backend,
            store,
            config,
            in_flight,
            refresh_rx,
            suspend_rx,
        };
        (service, handle)
    }

    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        let start = tokio::time::Instant::now();
        let mut queue_tick = interval_at(start + self.config.queue_interval, self.config.queue_interval);
        let mut hardware_tick = interval_at(
            start + self.config.hardware_interval,
            self.config.hardware_interval,
        );
        let mut history_tick = interval_at(
            start + self.config.history_interval,
            self.config.history_interval,
        );
        for tick in [&mut queue_tick, &mut hardware_tick, &mut history_tick] {
            tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        }

        if self.config.poll_on_start {
            self.spawn_all();
        }

        loop {
            tokio::select! {
                _ = queue_tick.tick() => self.spawn_poll(CollectionKind::Queue),
                _ = hardware_tick.tick() => self.spawn_poll(CollectionKind::Hardware),
                _ = history_tick.tick() => self.spawn_poll(CollectionKind::History),
                request = self.refresh_rx.recv() => match request {
                    Some(Refresh::One(kind)) => self.spawn_poll(kind),
                    Some(Refresh::All) => self.spawn_all(),
                    // All handles dropped: shut down
                    None => return,
                },
                changed = self.suspend_rx.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    if !*self.suspend_rx.borrow_and_update() {
                        tracing::info!("resumed from foreground session, refreshing");
                        self.spawn_all();
                    }
                }
            }
        }
    }

    fn spawn_all(&self) {
        self.spawn_poll(CollectionKind::Queue);
        self.spawn_poll(CollectionKind::Hardware);
        self.spawn_poll(CollectionKind::History);
    }

    /// Start one poll unless suspended or already in flight.
    fn spawn_poll(&self, kind: CollectionKind) {
        if *self.suspend_rx.borrow() {
            tracing::debug!(?kind, "suspended, dropping poll tick");
            return;
        }
        let flag = self.in_flight.flag(kind);
        if flag.swap(true, Ordering::SeqCst) {
            tracing::debug!(?kind, "poll already in flight, dropping tick");
            return;
        }

        let backend = self.backend.clone();
        let store = self.store.clone();
        let config = self.config.clone();
        let in_flight = self.in_flight.clone();
        tokio::spawn(async move {
            poll_once(&*backend, &store, &config, kind).await;
            in_flight.flag(kind).store(false, Ordering::SeqCst);
        });
    }
}

/// Run one poll of a collection, publishing on success and recording
/// the error on failure.
async fn poll_once(
    backend: &dyn ClusterBackend,
    store: &StateStore,
    config: &PollingConfig,
    kind: CollectionKind,
) {
    let started = Instant::now();
    match kind {
        CollectionKind::Queue => match backend.list_queue(&config.filter).await {
            Ok(parsed) => {
                warn_on_drops("queue", parsed.warnings.len());
                store
                    .jobs
                    .publish(parsed.items, parsed.warnings.len(), started.elapsed())
                    .await;
            }
            Err(e) => {
                tracing::error!(error = %e, "queue poll failed");
                store.jobs.record_error(e.to_string()).await;
            }
        },
        CollectionKind::History => match backend.list_history(&config.history_window).await {
            Ok(parsed) => {
                warn_on_drops("history", parsed.warnings.len());
                store
                    .history
                    .publish(parsed.items, parsed.warnings.len(), started.elapsed())
                    .await;
            }
            Err(e) => {
                tracing::error!(error = %e, "history poll failed");
                store.history.record_error(e.to_string()).await;
            }
        },
        CollectionKind::Hardware => {
            match backend.list_partitions().await {
                Ok(parsed) => {
                    warn_on_drops("partitions", parsed.warnings.len());
                    store
                        .partitions
                        .publish(parsed.items, parsed.warnings.len(), started.elapsed())
                        .await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "partition poll failed");
                    store.partitions.record_error(e.to_string()).await;
                }
            }
            match backend.list_nodes().await {
                Ok(parsed) => {
                    warn_on_drops("nodes", parsed.warnings.len());
                    store
                        .nodes
                        .publish(parsed.items, parsed.warnings.len(), started.elapsed())
                        .await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "node poll failed");
                    store.nodes.record_error(e.to_string()).await;
                }
            }
        }
    }
}

fn warn_on_drops(what: &str, dropped: usize) {
    if dropped > 0 {
        tracing::warn!(what, dropped, "records dropped while parsing");
    }
}
