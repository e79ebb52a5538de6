//! Shared test doubles and harness builders.
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use aid_desk::app_state::AppState;
use aid_desk::clock::ManualClock;
use aid_desk::models::scan::{QueueCounts, QueuedScan, ScanStatus};
use aid_desk::routes;
use aid_desk::services::connectivity::ConnectivityProbe;
use aid_desk::services::queue_store::{InMemoryQueueStore, QueueError, QueueStore};
use aid_desk::services::submitter::{ScanSubmitter, SubmitError};
use aid_desk::services::sync::{SyncCoordinator, DEFAULT_SUBMIT_TIMEOUT};
use async_trait::async_trait;
use tokio::sync::{watch, Notify, Semaphore};

use crate::fixtures;

/// Records every submission in order. Payloads marked with [`fail`] are
/// refused with a retryable error.
///
/// [`fail`]: RecordingSubmitter::fail
pub struct RecordingSubmitter {
    calls: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
    gate: Option<Arc<Semaphore>>,
    started: Arc<Notify>,
    drop_link_after: Mutex<Option<(String, Arc<watch::Sender<bool>>)>>,
    delay: Option<Duration>,
}

impl RecordingSubmitter {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            gate: None,
            started: Arc::new(Notify::new()),
            drop_link_after: Mutex::new(None),
            delay: None,
        }
    }

    /// Every submission waits for a permit from `gate`.
    pub fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new()
        }
    }

    /// Every submission sleeps for `delay` before answering.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new()
        }
    }

    pub fn fail(&self, payload: &str) {
        self.failing.lock().unwrap().insert(payload.to_string());
    }

    pub fn succeed(&self, payload: &str) {
        self.failing.lock().unwrap().remove(payload);
    }

    /// Flip the link offline right after `payload` has been submitted.
    pub fn go_offline_after(&self, payload: &str, online: Arc<watch::Sender<bool>>) {
        *self.drop_link_after.lock().unwrap() = Some((payload.to_string(), online));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Notified each time a submission starts.
    pub fn started(&self) -> Arc<Notify> {
        self.started.clone()
    }
}

#[async_trait]
impl ScanSubmitter for RecordingSubmitter {
    async fn submit(&self, scan: &QueuedScan) -> Result<(), SubmitError> {
        self.started.notify_one();
        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.calls.lock().unwrap().push(scan.payload.clone());

        if let Some((payload, online)) = self.drop_link_after.lock().unwrap().as_ref() {
            if *payload == scan.payload {
                online.send_replace(false);
            }
        }

        if self.failing.lock().unwrap().contains(&scan.payload) {
            Err(SubmitError::Retryable("HTTP 503: try later".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Probe whose answer the test controls.
pub struct SwitchProbe(pub AtomicBool);

impl SwitchProbe {
    pub fn new(reachable: bool) -> Self {
        Self(AtomicBool::new(reachable))
    }

    pub fn set(&self, reachable: bool) {
        self.0.store(reachable, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConnectivityProbe for SwitchProbe {
    async fn is_reachable(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Wraps a store and fails every read while `broken` is set.
pub struct BrokenStore {
    pub inner: Arc<dyn QueueStore>,
    pub broken: AtomicBool,
}

impl BrokenStore {
    fn check(&self) -> Result<(), QueueError> {
        if self.broken.load(Ordering::SeqCst) {
            Err(QueueError::StorageUnavailable(sqlx::Error::PoolClosed))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl QueueStore for BrokenStore {
    async fn enqueue(
        &self,
        payload: &str,
        metadata: serde_json::Value,
    ) -> Result<QueuedScan, QueueError> {
        self.check()?;
        self.inner.enqueue(payload, metadata).await
    }

    async fn get(&self, id: &str) -> Result<Option<QueuedScan>, QueueError> {
        self.check()?;
        self.inner.get(id).await
    }

    async fn list(&self) -> Result<Vec<QueuedScan>, QueueError> {
        self.check()?;
        self.inner.list().await
    }

    async fn list_by_status(&self, status: ScanStatus) -> Result<Vec<QueuedScan>, QueueError> {
        self.check()?;
        self.inner.list_by_status(status).await
    }

    async fn counts(&self) -> Result<QueueCounts, QueueError> {
        self.check()?;
        self.inner.counts().await
    }

    async fn update_status(
        &self,
        id: &str,
        status: ScanStatus,
        retry_count: Option<u32>,
    ) -> Result<QueuedScan, QueueError> {
        self.check()?;
        self.inner.update_status(id, status, retry_count).await
    }

    async fn remove(&self, id: &str) -> Result<(), QueueError> {
        self.check()?;
        self.inner.remove(id).await
    }

    async fn clear(&self) -> Result<u64, QueueError> {
        self.check()?;
        self.inner.clear().await
    }
}

/// Wraps a store so a test can park the next `counts()` call, which the
/// coordinator makes at the end of each drain pass.
pub struct HeldCountsStore {
    pub inner: Arc<dyn QueueStore>,
    hold: AtomicBool,
    entered: Notify,
    gate: Semaphore,
}

impl HeldCountsStore {
    pub fn new(inner: Arc<dyn QueueStore>) -> Self {
        Self {
            inner,
            hold: AtomicBool::new(false),
            entered: Notify::new(),
            gate: Semaphore::new(0),
        }
    }

    pub fn hold_next_counts(&self) {
        self.hold.store(true, Ordering::SeqCst);
    }

    /// Resolves once a held `counts()` call is parked.
    pub async fn counts_parked(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.gate.add_permits(1);
    }
}

#[async_trait]
impl QueueStore for HeldCountsStore {
    async fn enqueue(
        &self,
        payload: &str,
        metadata: serde_json::Value,
    ) -> Result<QueuedScan, QueueError> {
        self.inner.enqueue(payload, metadata).await
    }

    async fn get(&self, id: &str) -> Result<Option<QueuedScan>, QueueError> {
        self.inner.get(id).await
    }

    async fn list(&self) -> Result<Vec<QueuedScan>, QueueError> {
        self.inner.list().await
    }

    async fn list_by_status(&self, status: ScanStatus) -> Result<Vec<QueuedScan>, QueueError> {
        self.inner.list_by_status(status).await
    }

    async fn counts(&self) -> Result<QueueCounts, QueueError> {
        if self.hold.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            if let Ok(permit) = self.gate.acquire().await {
                permit.forget();
            }
        }
        self.inner.counts().await
    }

    async fn update_status(
        &self,
        id: &str,
        status: ScanStatus,
        retry_count: Option<u32>,
    ) -> Result<QueuedScan, QueueError> {
        self.inner.update_status(id, status, retry_count).await
    }

    async fn remove(&self, id: &str) -> Result<(), QueueError> {
        self.inner.remove(id).await
    }

    async fn clear(&self) -> Result<u64, QueueError> {
        self.inner.clear().await
    }
}

/// A coordinator over an in-memory store with a manual clock.
pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub store: Arc<dyn QueueStore>,
    pub submitter: Arc<RecordingSubmitter>,
    pub online: Arc<watch::Sender<bool>>,
    pub coordinator: Arc<SyncCoordinator>,
}

impl Harness {
    pub fn new(online: bool) -> Self {
        Self::with_submitter(online, RecordingSubmitter::new())
    }

    pub fn with_submitter(online: bool, submitter: RecordingSubmitter) -> Self {
        let clock = Arc::new(ManualClock::new(fixtures::t0()));
        let store: Arc<dyn QueueStore> = Arc::new(InMemoryQueueStore::new(clock.clone()));
        Self::assemble(clock, store, submitter, online, DEFAULT_SUBMIT_TIMEOUT)
    }

    pub fn assemble(
        clock: Arc<ManualClock>,
        store: Arc<dyn QueueStore>,
        submitter: RecordingSubmitter,
        online: bool,
        submit_timeout: Duration,
    ) -> Self {
        let submitter = Arc::new(submitter);
        let (online_tx, online_rx) = watch::channel(online);
        let coordinator = Arc::new(SyncCoordinator::new(
            store.clone(),
            submitter.clone(),
            online_rx,
            submit_timeout,
        ));
        Self {
            clock,
            store,
            submitter,
            online: Arc::new(online_tx),
            coordinator,
        }
    }

    /// Enqueue `payload`, then move the clock forward by `gap_ms`.
    pub async fn scan(&self, payload: &str, gap_ms: i64) -> QueuedScan {
        let scan = self
            .store
            .enqueue(payload, serde_json::json!({ "device": "test-terminal" }))
            .await
            .unwrap();
        self.clock.advance(chrono::Duration::milliseconds(gap_ms));
        scan
    }

    pub fn app_state(&self, webhook_secret: Option<&str>) -> AppState {
        AppState::new(
            self.coordinator.clone(),
            webhook_secret.map(str::to_string),
        )
    }
}

/// Serve the API router on an ephemeral port; returns its base URL.
pub async fn spawn_app(state: AppState) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, routes::router(state)).await.unwrap();
    });
    format!("http://{addr}")
}

/// Poll `check` until it holds or `within` elapses.
pub async fn eventually<F, Fut>(within: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + within;
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check().await
}
