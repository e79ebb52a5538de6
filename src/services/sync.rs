//! Drains the offline scan queue into the remote API.
//!
//! One drain runs at a time. Records go out oldest first, one request at a
//! time; a success deletes the record and any failure parks it as `failed`
//! with its retry count bumped. Failed records wait for an operator retry.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::watch;

use crate::models::scan::{QueueCounts, QueuedScan, ScanStatus};
use crate::services::connectivity::{ConnectivityEvent, ConnectivityMonitor, ConnectivityProbe};
use crate::services::queue_store::{QueueError, QueueStore};
use crate::services::submitter::{ScanSubmitter, SubmitError};

/// Default bound on a single submission.
pub const DEFAULT_SUBMIT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncTrigger {
    Reconnect,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Offline,
    /// Another drain is running; it will make one more pass when done.
    AlreadyDraining,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrainReport {
    pub passes: u32,
    pub submitted: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Connectivity dropped before every pending record was attempted.
    pub interrupted: bool,
}

/// Drains finished since start-up, and the most recent report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrainHistory {
    pub completed: u64,
    pub last: Option<DrainReport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncOutcome {
    Completed(DrainReport),
    Skipped { reason: SkipReason },
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] QueueError),

    #[error("Scan {id} is {status}, only failed scans can be retried")]
    NotRetryable { id: String, status: ScanStatus },
}

/// Clears the draining flag however the drain ends.
struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct SyncCoordinator {
    store: Arc<dyn QueueStore>,
    submitter: Arc<dyn ScanSubmitter>,
    online: watch::Receiver<bool>,
    submit_timeout: Duration,
    draining: AtomicBool,
    rerun: AtomicBool,
    counts: watch::Sender<QueueCounts>,
    history: watch::Sender<DrainHistory>,
}

impl SyncCoordinator {
    pub fn new(
        store: Arc<dyn QueueStore>,
        submitter: Arc<dyn ScanSubmitter>,
        online: watch::Receiver<bool>,
        submit_timeout: Duration,
    ) -> Self {
        let (counts, _) = watch::channel(QueueCounts::default());
        let (history, _) = watch::channel(DrainHistory::default());
        Self {
            store,
            submitter,
            online,
            submit_timeout,
            draining: AtomicBool::new(false),
            rerun: AtomicBool::new(false),
            counts,
            history,
        }
    }

    pub fn store(&self) -> &Arc<dyn QueueStore> {
        &self.store
    }

    pub fn is_online(&self) -> bool {
        *self.online.borrow()
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::SeqCst)
    }

    /// Latest published counts; updated after every drain and queue mutation.
    pub fn subscribe_counts(&self) -> watch::Receiver<QueueCounts> {
        self.counts.subscribe()
    }

    pub fn drain_history(&self) -> DrainHistory {
        *self.history.borrow()
    }

    /// Run a drain now, unless offline or one is already running.
    pub async fn sync(&self, trigger: SyncTrigger) -> Result<SyncOutcome, SyncError> {
        if !self.is_online() {
            tracing::info!(trigger = ?trigger, "Sync skipped, offline");
            return Ok(SyncOutcome::Skipped {
                reason: SkipReason::Offline,
            });
        }

        // Raised before trying the flag, so a drain that is just releasing
        // it still sees the request.
        self.rerun.store(true, Ordering::SeqCst);
        if !self.try_begin_drain() {
            tracing::info!(trigger = ?trigger, "Sync already running, queued one more pass");
            return Ok(SyncOutcome::Skipped {
                reason: SkipReason::AlreadyDraining,
            });
        }

        tracing::info!(trigger = ?trigger, "Starting queue drain");
        let start = Instant::now();
        let mut report = DrainReport::default();

        let result = loop {
            let guard = DrainGuard(&self.draining);
            let result = self.drain_while_requested(&mut report).await;
            drop(guard);

            // A trigger that landed while the flag was going down.
            if result.is_err()
                || report.interrupted
                || !self.rerun.load(Ordering::SeqCst)
                || !self.try_begin_drain()
            {
                break result;
            }
            tracing::debug!("Picking up a trigger raised at the end of the drain");
        };

        metrics::histogram!("scan_sync_drain_seconds").record(start.elapsed().as_secs_f64());
        if result.is_err() {
            if let Err(e) = self.publish_counts().await {
                tracing::warn!(error = %e, "Failed to refresh queue counts after drain");
            }
        }

        match result {
            Ok(()) => {
                self.history.send_modify(|history| {
                    history.completed += 1;
                    history.last = Some(report);
                });
                tracing::info!(
                    trigger = ?trigger,
                    passes = report.passes,
                    submitted = report.submitted,
                    succeeded = report.succeeded,
                    failed = report.failed,
                    interrupted = report.interrupted,
                    duration_ms = start.elapsed().as_millis(),
                    "Queue drain finished"
                );
                Ok(SyncOutcome::Completed(report))
            }
            Err(e) => {
                tracing::error!(trigger = ?trigger, error = %e, "Queue drain aborted");
                Err(e)
            }
        }
    }

    fn try_begin_drain(&self) -> bool {
        self.draining
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Run passes until no trigger arrived during the last one. Counts are
    /// published after each pass while the drain flag is still held.
    async fn drain_while_requested(&self, report: &mut DrainReport) -> Result<(), SyncError> {
        loop {
            self.rerun.store(false, Ordering::SeqCst);
            self.drain_pass(report).await?;
            if let Err(e) = self.publish_counts().await {
                tracing::warn!(error = %e, "Failed to refresh queue counts after drain pass");
            }
            if report.interrupted || !self.rerun.load(Ordering::SeqCst) {
                return Ok(());
            }
            tracing::debug!("Running queued drain pass");
        }
    }

    /// Records in `status` that decode. Corrupt ones are logged and skipped.
    async fn drainable(&self, status: ScanStatus) -> Result<Vec<QueuedScan>, SyncError> {
        let mut scans = Vec::new();
        for listed in self.store.list_each_by_status(status).await? {
            match listed {
                Ok(scan) => scans.push(scan),
                Err(QueueError::Corrupt { id, reason }) => {
                    metrics::counter!("scan_queue_corrupt_total").increment(1);
                    tracing::error!(scan_id = %id, reason = %reason, "Skipping corrupt queue record");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(scans)
    }

    async fn drain_pass(&self, report: &mut DrainReport) -> Result<(), SyncError> {
        report.passes += 1;

        // Scans left mid-flight by a crash or aborted pass go back in line.
        for stranded in self.drainable(ScanStatus::Syncing).await? {
            tracing::warn!(scan_id = %stranded.id, "Resetting stranded syncing scan");
            ignore_missing(
                self.store
                    .update_status(&stranded.id, ScanStatus::Pending, None)
                    .await,
            )?;
        }

        let pending = self.drainable(ScanStatus::Pending).await?;
        tracing::debug!(pending = pending.len(), "Drain pass selected scans");

        for scan in pending {
            if !self.is_online() {
                report.interrupted = true;
                tracing::warn!(scan_id = %scan.id, "Connectivity lost, stopping drain");
                break;
            }

            let Some(scan) = ignore_missing(
                self.store
                    .update_status(&scan.id, ScanStatus::Syncing, None)
                    .await,
            )?
            else {
                continue;
            };
            report.submitted += 1;

            match self.submit(&scan).await {
                Ok(()) => {
                    ignore_missing(self.store.remove(&scan.id).await)?;
                    report.succeeded += 1;
                    metrics::counter!("scan_sync_succeeded_total").increment(1);
                    tracing::info!(scan_id = %scan.id, "Scan synced");
                }
                Err(e) => {
                    let retry_count = scan.retry_count.saturating_add(1);
                    ignore_missing(
                        self.store
                            .update_status(&scan.id, ScanStatus::Failed, Some(retry_count))
                            .await,
                    )?;
                    report.failed += 1;
                    metrics::counter!("scan_sync_failed_total").increment(1);
                    tracing::warn!(
                        scan_id = %scan.id,
                        retry_count = retry_count,
                        retryable = e.is_retryable(),
                        error = %e,
                        "Scan submission failed"
                    );
                }
            }
        }

        Ok(())
    }

    async fn submit(&self, scan: &QueuedScan) -> Result<(), SubmitError> {
        match tokio::time::timeout(self.submit_timeout, self.submitter.submit(scan)).await {
            Ok(result) => result,
            Err(_) => Err(SubmitError::Timeout(self.submit_timeout)),
        }
    }

    /// Put a failed scan back in line, optionally zeroing its retry count.
    pub async fn retry(&self, id: &str, reset_count: bool) -> Result<QueuedScan, SyncError> {
        let scan = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| QueueError::NotFound(id.to_string()))?;
        if scan.status != ScanStatus::Failed {
            return Err(SyncError::NotRetryable {
                id: scan.id,
                status: scan.status,
            });
        }

        let scan = self
            .store
            .update_status(id, ScanStatus::Pending, reset_count.then_some(0))
            .await?;
        tracing::info!(scan_id = %scan.id, retry_count = scan.retry_count, "Scan queued for retry");
        self.publish_counts().await?;
        Ok(scan)
    }

    /// Move every failed scan back to pending. Returns how many moved.
    pub async fn retry_all_failed(&self) -> Result<u64, SyncError> {
        let mut moved = 0;
        for scan in self.store.list_by_status(ScanStatus::Failed).await? {
            if ignore_missing(
                self.store
                    .update_status(&scan.id, ScanStatus::Pending, None)
                    .await,
            )?
            .is_some()
            {
                moved += 1;
            }
        }
        if moved > 0 {
            tracing::info!(count = moved, "Failed scans queued for retry");
        }
        self.publish_counts().await?;
        Ok(moved)
    }

    /// Recount the store and push the result to subscribers and gauges.
    pub async fn publish_counts(&self) -> Result<QueueCounts, QueueError> {
        let counts = self.store.counts().await?;
        metrics::gauge!("scan_queue_pending").set(counts.pending as f64);
        metrics::gauge!("scan_queue_syncing").set(counts.syncing as f64);
        metrics::gauge!("scan_queue_failed").set(counts.failed as f64);
        self.counts.send_replace(counts);
        Ok(counts)
    }
}

/// A record that disappeared mid-drain is simply skipped.
fn ignore_missing<T>(result: Result<T, QueueError>) -> Result<Option<T>, QueueError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(QueueError::NotFound(id)) => {
            tracing::debug!(scan_id = %id, "Scan vanished during drain");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Background loop: probe connectivity, publish the online flag and start
/// a drain on every stable reconnect. Returns when `shutdown` flips to true.
pub async fn run_sync_agent(
    coordinator: Arc<SyncCoordinator>,
    probe: Arc<dyn ConnectivityProbe>,
    mut monitor: ConnectivityMonitor,
    online_tx: watch::Sender<bool>,
    probe_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(probe_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    tracing::info!(probe_interval_ms = probe_interval.as_millis(), "Sync agent started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
        }

        let reachable = probe.is_reachable().await;
        online_tx.send_replace(reachable);

        match monitor.observe(reachable) {
            Some(ConnectivityEvent::WentOnline) => tracing::info!("Remote API reachable"),
            Some(ConnectivityEvent::WentOffline) => tracing::warn!("Remote API unreachable"),
            _ => {}
        }

        if monitor.poll() == Some(ConnectivityEvent::StableReconnect) {
            tracing::info!("Connection stable, draining queue");
            // The probe loop keeps observing while the drain runs.
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                if let Err(e) = coordinator.sync(SyncTrigger::Reconnect).await {
                    tracing::error!(error = %e, "Reconnect drain failed");
                }
            });
        }
    }

    tracing::info!("Sync agent stopped");
}
