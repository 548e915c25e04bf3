//! sterm - terminal dashboard core for a Slurm cluster.

mod config;
mod polling;

use clap::Parser;
use config::{load_config, templates_dir, Config};
use miette::{IntoDiagnostic, Result, WrapErr};
use polling::{CollectionKind, PollingConfig, PollingHandle, PollingService, Refresh};
use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use sterm_cli::Args;
use sterm_logs::{LogTailer, StreamKind};
use sterm_parsers::validate_job_id;
use sterm_slurm::{ClusterBackend, Job, QueueFilter, SlurmGateway, StderrPatterns};
use sterm_state::StateStore;
use sterm_templates::TemplateStore;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    let config = apply_overrides(load_config(args.config.as_deref()), &args);
    let patterns =
        StderrPatterns::with_extra(&config.stderr_not_found, &config.stderr_permission)
            .into_diagnostic()
            .wrap_err("invalid stderr pattern in config")?;

    let gateway = Arc::new(SlurmGateway::new(patterns, config.subprocess_timeout()));
    gateway
        .probe()
        .await
        .into_diagnostic()
        .wrap_err("Slurm tools not found; is this a cluster login node?")?;

    seed_templates();

    let filter = QueueFilter {
        user: args.user.clone().or_else(|| std::env::var("USER").ok()),
        states: None,
    };
    let store = Arc::new(StateStore::new());
    let (service, handle) = PollingService::new(
        gateway.clone(),
        store.clone(),
        PollingConfig {
            queue_interval: config.queue_interval(),
            hardware_interval: config.hardware_interval(),
            history_interval: config.history_interval(),
            history_window: config.history_window.clone(),
            filter,
            poll_on_start: true,
        },
    );
    service.start();

    if args.interactive {
        run_interactive(gateway.as_ref(), &handle).await
    } else if let Some(job_id) = args.follow.as_deref() {
        follow_job(&store, &handle, gateway.as_ref(), job_id).await
    } else {
        monitor(&store).await
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("sterm=info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn apply_overrides(mut config: Config, args: &Args) -> Config {
    if let Some(secs) = args.queue_interval {
        config.queue_poll_secs = secs;
    }
    if let Some(secs) = args.hardware_interval {
        config.hardware_poll_secs = secs;
    }
    if let Some(secs) = args.history_interval {
        config.history_poll_secs = secs;
    }
    if let Some(window) = &args.history_window {
        config.history_window = window.clone();
    }
    config
}

/// Seed the built-in submission templates on first run. Failure is
/// logged and ignored; templates are not required for monitoring.
fn seed_templates() {
    let Some(dir) = templates_dir() else {
        return;
    };
    let templates = TemplateStore::new(dir);
    if let Err(e) = templates.ensure_defaults() {
        tracing::warn!(error = %e, "could not seed default templates");
    }
}

/// Headless monitor loop: log queue changes as they land, until
/// ctrl-c.
async fn monitor(store: &StateStore) -> Result<()> {
    let mut tick = tokio::time::interval(Duration::from_secs(1));
    let mut last_version = 0;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                return Ok(());
            }
            _ = tick.tick() => {
                let Some(snapshot) = store.jobs.current().await else {
                    continue;
                };
                if snapshot.version == last_version {
                    continue;
                }
                last_version = snapshot.version;
                tracing::info!(
                    jobs = snapshot.items.len(),
                    version = snapshot.version,
                    poll_ms = snapshot.poll_duration.as_millis() as u64,
                    "queue updated"
                );
                if let Some(diff) = store.jobs.diff().await {
                    if !diff.is_empty() {
                        tracing::info!(
                            added = diff.added.len(),
                            removed = diff.removed.len(),
                            changed = diff.changed.len(),
                            "queue changes"
                        );
                    }
                }
            }
        }
    }
}

/// Stream a job's stdout to our stdout until the job leaves the queue.
///
/// The queue listing only knows the default output template; the real
/// path comes from the job's detail record, fetched once on first
/// sight.
async fn follow_job(
    store: &StateStore,
    handle: &PollingHandle,
    gateway: &dyn ClusterBackend,
    job_id: &str,
) -> Result<()> {
    validate_job_id(job_id).into_diagnostic()?;

    let mut tailer = LogTailer::new();
    let mut last_seen: Option<Job> = None;
    let mut stdout_path: Option<String> = None;
    let mut stdout = std::io::stdout();
    let mut tick = tokio::time::interval(Duration::from_secs(2));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => return Ok(()),
            _ = tick.tick() => {}
        }
        handle.refresh(Refresh::One(CollectionKind::Queue)).await;

        let job = match store.jobs.current().await {
            Some(snapshot) => snapshot.items.iter().find(|j| j.job_id == job_id).cloned(),
            None => continue,
        };
        match (job, &last_seen) {
            (Some(mut job), _) => {
                if last_seen.is_none() {
                    match gateway.job_detail(job_id).await {
                        Ok(detail) => stdout_path = detail.stdout_path.map(|p| p.to_string()),
                        Err(e) => tracing::debug!(error = %e, "job detail unavailable"),
                    }
                }
                if let Some(path) = &stdout_path {
                    job.stdout_template = path.clone();
                }
                drain(&mut tailer, &job, &mut stdout)?;
                match gateway.live_stats(job_id).await {
                    Ok(Some(stats)) => tracing::debug!(?stats, "live usage"),
                    Ok(None) => {}
                    Err(e) => tracing::debug!(error = %e, "live usage unavailable"),
                }
                last_seen = Some(job);
            }
            (None, Some(job)) => {
                // One final read catches output flushed at exit
                drain(&mut tailer, job, &mut stdout)?;
                tracing::info!(job_id, "job left the queue");
                return Ok(());
            }
            (None, None) => {}
        }
    }
}

fn drain(tailer: &mut LogTailer, job: &Job, out: &mut impl Write) -> Result<()> {
    let bytes = tailer.tail(job, StreamKind::Stdout).into_diagnostic()?;
    if !bytes.is_empty() {
        out.write_all(&bytes).into_diagnostic()?;
        out.flush().into_diagnostic()?;
    }
    Ok(())
}

/// Hand the terminal to an interactive srun shell, pausing all polling
/// while it runs.
async fn run_interactive(gateway: &dyn ClusterBackend, handle: &PollingHandle) -> Result<()> {
    handle.suspend();
    let mut params = BTreeMap::new();
    params.insert("pty".to_string(), String::new());
    let result = gateway
        .submit_interactive(&params, &["bash".to_string(), "-l".to_string()])
        .await;
    handle.resume();

    let code = result.into_diagnostic().wrap_err("interactive session failed")?;
    tracing::info!(code, "interactive session ended");
    Ok(())
}
