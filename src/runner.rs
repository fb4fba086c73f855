//! Execution modes: a one-shot sync, or a continuous loop that interleaves
//! sync cycles with scheduled database maintenance.

use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::{Config, ExecutionMode};
use crate::notify::{sanitize_error, PushoverNotifier};
use crate::remote::client::RemoteClient;
use crate::sync::{SyncEngine, SyncError, SyncStats};
use crate::tracker::{DeletionTracker, TrackerError};

const MAINTENANCE_CHECK_INTERVAL: Duration = Duration::from_secs(60);
const MAINTENANCE_ERROR_BACKOFF: Duration = Duration::from_secs(300);

/// Runs the configured execution mode to completion. Returns whether the
/// run finished cleanly; per-photo failures count into stats, not here.
pub async fn run_execution_mode(
    config: Arc<Config>,
    client: Arc<dyn RemoteClient>,
    tracker: Arc<dyn DeletionTracker>,
    shutdown: CancellationToken,
) -> bool {
    let notifier = PushoverNotifier::from_config(&config);
    match config.execution_mode {
        ExecutionMode::Single => {
            info!("Running in single execution mode");
            run_single(&config, &client, &tracker, &shutdown, notifier.as_ref()).await
        }
        ExecutionMode::Continuous => {
            run_continuous(&config, &client, &tracker, &shutdown, notifier.as_ref()).await
        }
    }
}

async fn run_single(
    config: &Arc<Config>,
    client: &Arc<dyn RemoteClient>,
    tracker: &Arc<dyn DeletionTracker>,
    shutdown: &CancellationToken,
    notifier: Option<&PushoverNotifier>,
) -> bool {
    match run_pass(config, client, tracker, shutdown).await {
        Ok(stats) => {
            info!("Sync finished with {} new downloads", stats.new_downloads);
            true
        }
        Err(e) => {
            error!("Sync failed: {e}");
            notify_error(notifier, &e.to_string()).await;
            false
        }
    }
}

async fn run_continuous(
    config: &Arc<Config>,
    client: &Arc<dyn RemoteClient>,
    tracker: &Arc<dyn DeletionTracker>,
    shutdown: &CancellationToken,
    notifier: Option<&PushoverNotifier>,
) -> bool {
    info!(
        "Running in continuous mode: sync every {} minutes, maintenance every {} hours",
        config.sync_interval_minutes, config.maintenance_interval_hours
    );

    // Sync cycles and maintenance exclude each other through this gate.
    let maintenance_gate = Arc::new(Mutex::new(()));
    let worker = tokio::spawn(maintenance_worker(
        Arc::clone(tracker),
        Arc::clone(&maintenance_gate),
        Duration::from_secs(config.maintenance_interval_hours.saturating_mul(3600)),
        shutdown.child_token(),
    ));

    while !shutdown.is_cancelled() {
        {
            let gate = match maintenance_gate.try_lock() {
                Ok(gate) => gate,
                Err(_) => {
                    info!("Waiting for database maintenance to complete before starting sync...");
                    maintenance_gate.lock().await
                }
            };
            info!(
                "Starting sync cycle at {}",
                Local::now().format("%Y-%m-%d %H:%M:%S")
            );
            let started = std::time::Instant::now();
            match run_pass(config, client, tracker, shutdown).await {
                Ok(stats) => info!(
                    "Sync cycle completed in {:.1} seconds ({} new downloads)",
                    started.elapsed().as_secs_f64(),
                    stats.new_downloads
                ),
                Err(e) => {
                    error!("Sync cycle failed: {e}");
                    notify_error(notifier, &e.to_string()).await;
                }
            }
            drop(gate);
        }

        if shutdown.is_cancelled() {
            break;
        }
        info!(
            "Waiting {} minutes until next sync...",
            config.sync_interval_minutes
        );
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(config.sync_interval_minutes.saturating_mul(60))) => {}
            _ = shutdown.cancelled() => break,
        }
    }

    let _ = worker.await;
    info!("Continuous sync stopped");
    true
}

/// One engine pass, prompting for a second factor once when the session
/// needs it and a terminal is available.
async fn run_pass(
    config: &Arc<Config>,
    client: &Arc<dyn RemoteClient>,
    tracker: &Arc<dyn DeletionTracker>,
    shutdown: &CancellationToken,
) -> Result<SyncStats, SyncError> {
    let engine = SyncEngine::new(
        Arc::clone(config),
        Arc::clone(client),
        Arc::clone(tracker),
        shutdown.child_token(),
    );
    match engine.run().await {
        Err(SyncError::SecondFactorRequired) => {
            complete_second_factor(client.as_ref()).await?;
            engine.run().await
        }
        other => other,
    }
}

async fn complete_second_factor(client: &dyn RemoteClient) -> Result<(), SyncError> {
    if !std::io::stdin().is_terminal() {
        error!("Two-factor authentication is required but no terminal is attached");
        error!("Run once interactively to establish a trusted session");
        return Err(SyncError::SecondFactorRequired);
    }
    let code = tokio::task::spawn_blocking(read_code_from_stdin)
        .await
        .map_err(std::io::Error::other)??;
    client.submit_second_factor(code.trim()).await?;
    Ok(())
}

fn read_code_from_stdin() -> std::io::Result<String> {
    use std::io::Write;
    print!("Enter the verification code: ");
    std::io::stdout().flush()?;
    let mut code = String::new();
    std::io::stdin().read_line(&mut code)?;
    Ok(code)
}

async fn maintenance_worker(
    tracker: Arc<dyn DeletionTracker>,
    gate: Arc<Mutex<()>>,
    interval: Duration,
    shutdown: CancellationToken,
) {
    info!("Database maintenance worker started");
    let mut last_run = tokio::time::Instant::now();
    loop {
        tokio::select! {
            _ = tokio::time::sleep(MAINTENANCE_CHECK_INTERVAL) => {}
            _ = shutdown.cancelled() => break,
        }
        if last_run.elapsed() < interval {
            continue;
        }

        let gate = gate.lock().await;
        info!("Starting scheduled database maintenance");
        match perform_maintenance(tracker.as_ref()).await {
            Ok(()) => {
                last_run = tokio::time::Instant::now();
                info!("Database maintenance completed");
            }
            Err(e) => {
                error!("Database maintenance failed: {e}");
                drop(gate);
                tokio::select! {
                    _ = tokio::time::sleep(MAINTENANCE_ERROR_BACKOFF) => {}
                    _ = shutdown.cancelled() => break,
                }
            }
        }
    }
    info!("Database maintenance worker stopped");
}

/// Integrity check, recovery when it fails, then a fresh backup.
pub(crate) async fn perform_maintenance(
    tracker: &dyn DeletionTracker,
) -> Result<(), TrackerError> {
    if tracker.integrity_check().await? {
        info!("Database integrity check passed");
    } else {
        warn!("Database integrity check failed, attempting recovery");
        if tracker.restore_from_backup().await? {
            info!("Database recovered from backup");
        } else {
            error!("Database recovery failed: no usable backup");
        }
    }
    tracker.create_backup().await?;
    let stats = tracker.stats().await?;
    info!(
        "Database backup created ({} downloaded, {} deleted photos tracked)",
        stats.downloaded, stats.deleted
    );
    Ok(())
}

async fn notify_error(notifier: Option<&PushoverNotifier>, message: &str) {
    let Some(notifier) = notifier else { return };
    let body = sanitize_error(message);
    if let Err(e) = notifier.send("Photo sync failure", &body).await {
        warn!("Failed to send error notification: {e}");
    }
}
