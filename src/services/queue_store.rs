//! Durable storage for the offline scan queue.
//!
//! The coordinator and the HTTP layer only see [`QueueStore`]. Two backends
//! exist: [`SqliteQueueStore`] for real deployments and
//! [`InMemoryQueueStore`] for tests and throwaway runs.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use sqlx::SqlitePool;
use tokio::sync::Mutex;

use crate::clock::Clock;
use crate::db::{self, queries, queries::ScanRow};
use crate::models::scan::{QueueCounts, QueuedScan, ScanStatus};

#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Persist a new pending scan stamped with the current time.
    async fn enqueue(
        &self,
        payload: &str,
        metadata: serde_json::Value,
    ) -> Result<QueuedScan, QueueError>;

    async fn get(&self, id: &str) -> Result<Option<QueuedScan>, QueueError>;

    /// All records. Callers must not rely on the order.
    async fn list(&self) -> Result<Vec<QueuedScan>, QueueError>;

    /// Records in one status, oldest scan first.
    async fn list_by_status(&self, status: ScanStatus) -> Result<Vec<QueuedScan>, QueueError>;

    /// Same order as [`list_by_status`](Self::list_by_status), but a record
    /// that cannot be decoded is returned as its own `Err` instead of
    /// failing the whole listing.
    async fn list_each_by_status(
        &self,
        status: ScanStatus,
    ) -> Result<Vec<Result<QueuedScan, QueueError>>, QueueError> {
        Ok(self.list_by_status(status).await?.into_iter().map(Ok).collect())
    }

    async fn count_by_status(&self, status: ScanStatus) -> Result<u64, QueueError> {
        Ok(self.counts().await?.get(status))
    }

    async fn counts(&self) -> Result<QueueCounts, QueueError>;

    /// Set a record's status, and its retry count when one is given.
    async fn update_status(
        &self,
        id: &str,
        status: ScanStatus,
        retry_count: Option<u32>,
    ) -> Result<QueuedScan, QueueError>;

    async fn remove(&self, id: &str) -> Result<(), QueueError>;

    /// Delete every record; returns how many were removed.
    async fn clear(&self) -> Result<u64, QueueError>;

    /// Check the backing storage is reachable (for health checks).
    async fn health_check(&self) -> Result<(), QueueError> {
        self.counts().await.map(|_| ())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Queue storage unavailable: {0}")]
    StorageUnavailable(#[from] sqlx::Error),

    #[error("Queue migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Scan not found: {0}")]
    NotFound(String),

    #[error("Corrupt queue record {id}: {reason}")]
    Corrupt { id: String, reason: String },

    #[error("Scan payload must not be empty")]
    InvalidPayload,
}

fn check_payload(payload: &str) -> Result<(), QueueError> {
    if payload.trim().is_empty() {
        Err(QueueError::InvalidPayload)
    } else {
        Ok(())
    }
}

fn record_enqueued(scan: &QueuedScan) {
    metrics::counter!("scan_queue_enqueued_total").increment(1);
    tracing::debug!(scan_id = %scan.id, scanned_at = %scan.scanned_at, "Scan queued");
}

// ── SQLite ──────────────────────────────────────────────────────────

/// Queue persisted in a local SQLite file; survives restarts.
pub struct SqliteQueueStore {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl SqliteQueueStore {
    /// Open the database at `database_url` and bring its schema up to date.
    pub async fn connect(database_url: &str, clock: Arc<dyn Clock>) -> Result<Self, QueueError> {
        let pool = db::init_pool(database_url).await?;
        db::run_migrations(&pool).await.map_err(|e| match e {
            sqlx::Error::Migrate(inner) => QueueError::Migration(*inner),
            other => QueueError::StorageUnavailable(other),
        })?;
        Ok(Self { pool, clock })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Release the connection pool. Pending writes are flushed first.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl TryFrom<ScanRow> for QueuedScan {
    type Error = QueueError;

    fn try_from(row: ScanRow) -> Result<Self, Self::Error> {
        let corrupt = |reason: String| QueueError::Corrupt {
            id: row.id.clone(),
            reason,
        };

        let status = ScanStatus::from_str(&row.status)
            .map_err(|_| corrupt(format!("unknown status {:?}", row.status)))?;
        let scanned_at = DateTime::from_timestamp_millis(row.scanned_at_ms)
            .ok_or_else(|| corrupt(format!("timestamp {} out of range", row.scanned_at_ms)))?;
        let retry_count = u32::try_from(row.retry_count)
            .map_err(|_| corrupt(format!("retry count {} out of range", row.retry_count)))?;
        let metadata = serde_json::from_str(&row.metadata)
            .map_err(|e| corrupt(format!("metadata is not JSON: {e}")))?;

        Ok(QueuedScan {
            id: row.id,
            payload: row.payload,
            scanned_at,
            status,
            retry_count,
            metadata,
        })
    }
}

impl From<&QueuedScan> for ScanRow {
    fn from(scan: &QueuedScan) -> Self {
        ScanRow {
            id: scan.id.clone(),
            payload: scan.payload.clone(),
            scanned_at_ms: scan.scanned_at.timestamp_millis(),
            status: scan.status.as_ref().to_string(),
            retry_count: i64::from(scan.retry_count),
            metadata: scan.metadata.to_string(),
        }
    }
}

fn decode_all(rows: Vec<ScanRow>) -> Result<Vec<QueuedScan>, QueueError> {
    rows.into_iter().map(QueuedScan::try_from).collect()
}

#[async_trait]
impl QueueStore for SqliteQueueStore {
    async fn enqueue(
        &self,
        payload: &str,
        metadata: serde_json::Value,
    ) -> Result<QueuedScan, QueueError> {
        check_payload(payload)?;
        let scan = QueuedScan::new(payload, metadata, self.clock.now());
        queries::insert_scan(&self.pool, &ScanRow::from(&scan)).await?;
        record_enqueued(&scan);
        Ok(scan)
    }

    async fn get(&self, id: &str) -> Result<Option<QueuedScan>, QueueError> {
        queries::get_scan(&self.pool, id)
            .await?
            .map(QueuedScan::try_from)
            .transpose()
    }

    async fn list(&self) -> Result<Vec<QueuedScan>, QueueError> {
        decode_all(queries::list_scans(&self.pool).await?)
    }

    async fn list_by_status(&self, status: ScanStatus) -> Result<Vec<QueuedScan>, QueueError> {
        decode_all(queries::list_scans_by_status(&self.pool, status.as_ref()).await?)
    }

    async fn list_each_by_status(
        &self,
        status: ScanStatus,
    ) -> Result<Vec<Result<QueuedScan, QueueError>>, QueueError> {
        let rows = queries::list_scans_by_status(&self.pool, status.as_ref()).await?;
        Ok(rows.into_iter().map(QueuedScan::try_from).collect())
    }

    async fn count_by_status(&self, status: ScanStatus) -> Result<u64, QueueError> {
        let n = queries::count_scans_by_status(&self.pool, status.as_ref()).await?;
        Ok(u64::try_from(n).unwrap_or(0))
    }

    async fn counts(&self) -> Result<QueueCounts, QueueError> {
        let mut counts = QueueCounts::default();
        for (status, n) in queries::count_scans_grouped(&self.pool).await? {
            let n = u64::try_from(n).unwrap_or(0);
            match ScanStatus::from_str(&status) {
                Ok(ScanStatus::Pending) => counts.pending = n,
                Ok(ScanStatus::Syncing) => counts.syncing = n,
                Ok(ScanStatus::Failed) => counts.failed = n,
                Err(_) => tracing::warn!(status = %status, rows = n, "Ignoring unknown scan status"),
            }
        }
        Ok(counts)
    }

    async fn update_status(
        &self,
        id: &str,
        status: ScanStatus,
        retry_count: Option<u32>,
    ) -> Result<QueuedScan, QueueError> {
        let row = queries::update_scan_status(
            &self.pool,
            id,
            status.as_ref(),
            retry_count.map(i64::from),
        )
        .await?
        .ok_or_else(|| QueueError::NotFound(id.to_string()))?;
        QueuedScan::try_from(row)
    }

    async fn remove(&self, id: &str) -> Result<(), QueueError> {
        match queries::delete_scan(&self.pool, id).await? {
            0 => Err(QueueError::NotFound(id.to_string())),
            _ => Ok(()),
        }
    }

    async fn clear(&self) -> Result<u64, QueueError> {
        Ok(queries::delete_all_scans(&self.pool).await?)
    }

    async fn health_check(&self) -> Result<(), QueueError> {
        Ok(queries::ping(&self.pool).await?)
    }
}

// ── In memory ───────────────────────────────────────────────────────

/// Non-durable queue. Contents are lost when the process exits.
pub struct InMemoryQueueStore {
    scans: Mutex<HashMap<String, QueuedScan>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryQueueStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            scans: Mutex::new(HashMap::new()),
            clock,
        }
    }
}

#[async_trait]
impl QueueStore for InMemoryQueueStore {
    async fn enqueue(
        &self,
        payload: &str,
        metadata: serde_json::Value,
    ) -> Result<QueuedScan, QueueError> {
        check_payload(payload)?;
        let scan = QueuedScan::new(payload, metadata, self.clock.now());
        self.scans
            .lock()
            .await
            .insert(scan.id.clone(), scan.clone());
        record_enqueued(&scan);
        Ok(scan)
    }

    async fn get(&self, id: &str) -> Result<Option<QueuedScan>, QueueError> {
        Ok(self.scans.lock().await.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<QueuedScan>, QueueError> {
        Ok(self.scans.lock().await.values().cloned().collect())
    }

    async fn list_by_status(&self, status: ScanStatus) -> Result<Vec<QueuedScan>, QueueError> {
        let mut scans: Vec<QueuedScan> = self
            .scans
            .lock()
            .await
            .values()
            .filter(|s| s.status == status)
            .cloned()
            .collect();
        scans.sort_by(QueuedScan::processing_order);
        Ok(scans)
    }

    async fn counts(&self) -> Result<QueueCounts, QueueError> {
        Ok(QueueCounts::from_records(self.scans.lock().await.values()))
    }

    async fn update_status(
        &self,
        id: &str,
        status: ScanStatus,
        retry_count: Option<u32>,
    ) -> Result<QueuedScan, QueueError> {
        let mut scans = self.scans.lock().await;
        let scan = scans
            .get_mut(id)
            .ok_or_else(|| QueueError::NotFound(id.to_string()))?;
        scan.status = status;
        if let Some(count) = retry_count {
            scan.retry_count = count;
        }
        Ok(scan.clone())
    }

    async fn remove(&self, id: &str) -> Result<(), QueueError> {
        self.scans
            .lock()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| QueueError::NotFound(id.to_string()))
    }

    async fn clear(&self) -> Result<u64, QueueError> {
        let mut scans = self.scans.lock().await;
        let removed = scans.len() as u64;
        scans.clear();
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{Duration, TimeZone, Utc};

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
        ))
    }

    async fn sqlite_store(dir: &tempfile::TempDir, clock: Arc<dyn Clock>) -> SqliteQueueStore {
        let url = format!("sqlite://{}", dir.path().join("queue.db").display());
        SqliteQueueStore::connect(&url, clock).await.unwrap()
    }

    /// Behaviour every backend must share.
    async fn exercise_store(store: &dyn QueueStore, clock: &ManualClock) {
        let a = store.enqueue("PB-0001", serde_json::json!({"device": "t1"})).await.unwrap();
        clock.advance(Duration::milliseconds(5));
        let b = store.enqueue("PB-0001", serde_json::Value::Null).await.unwrap();

        assert_ne!(a.id, b.id, "duplicate payloads are separate records");
        assert_eq!(store.list().await.unwrap().len(), 2);
        assert_eq!(store.count_by_status(ScanStatus::Pending).await.unwrap(), 2);

        let failed = store
            .update_status(&a.id, ScanStatus::Failed, Some(1))
            .await
            .unwrap();
        assert_eq!(failed.status, ScanStatus::Failed);
        assert_eq!(failed.retry_count, 1);

        let syncing = store
            .update_status(&b.id, ScanStatus::Syncing, None)
            .await
            .unwrap();
        assert_eq!(syncing.retry_count, 0);

        assert_eq!(
            store.counts().await.unwrap(),
            QueueCounts { pending: 0, syncing: 1, failed: 1 }
        );

        let fetched = store.get(&a.id).await.unwrap().unwrap();
        assert_eq!(fetched.metadata, serde_json::json!({"device": "t1"}));
        assert_eq!(fetched.scanned_at, a.scanned_at);

        store.remove(&b.id).await.unwrap();
        assert!(matches!(
            store.remove(&b.id).await,
            Err(QueueError::NotFound(id)) if id == b.id
        ));
        assert!(matches!(
            store.update_status("missing", ScanStatus::Pending, None).await,
            Err(QueueError::NotFound(_))
        ));

        assert_eq!(store.clear().await.unwrap(), 1);
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_in_memory_store_contract() {
        let clock = clock();
        let store = InMemoryQueueStore::new(clock.clone());
        exercise_store(&store, &clock).await;
    }

    #[tokio::test]
    async fn test_sqlite_store_contract() {
        let dir = tempfile::tempdir().unwrap();
        let clock = clock();
        let store = sqlite_store(&dir, clock.clone()).await;
        exercise_store(&store, &clock).await;
    }

    #[tokio::test]
    async fn test_empty_payload_is_rejected() {
        let store = InMemoryQueueStore::new(clock());
        assert!(matches!(
            store.enqueue("   ", serde_json::json!({})).await,
            Err(QueueError::InvalidPayload)
        ));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_by_status_orders_by_time_then_id() {
        let clock = clock();
        let store = InMemoryQueueStore::new(clock.clone());
        clock.advance(Duration::seconds(10));
        let late = store.enqueue("late", serde_json::json!({})).await.unwrap();
        clock.set(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap());
        let early_1 = store.enqueue("early-1", serde_json::json!({})).await.unwrap();
        let early_2 = store.enqueue("early-2", serde_json::json!({})).await.unwrap();

        let mut same_instant = vec![early_1.id.clone(), early_2.id.clone()];
        same_instant.sort();

        let ids: Vec<String> = store
            .list_by_status(ScanStatus::Pending)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec![same_instant[0].clone(), same_instant[1].clone(), late.id]);
    }

    #[tokio::test]
    async fn test_corrupt_metadata_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = sqlite_store(&dir, clock()).await;
        sqlx::query(
            "INSERT INTO queued_scans (id, payload, scanned_at_ms, status, retry_count, metadata) \
             VALUES ('x', 'p', 0, 'pending', 0, 'not json')",
        )
        .execute(store.pool())
        .await
        .unwrap();

        assert!(matches!(
            store.get("x").await,
            Err(QueueError::Corrupt { id, .. }) if id == "x"
        ));
        assert!(store.list_by_status(ScanStatus::Pending).await.is_err());
    }

    #[tokio::test]
    async fn test_list_each_keeps_good_records_next_to_corrupt_ones() {
        let dir = tempfile::tempdir().unwrap();
        let clock = clock();
        let store = sqlite_store(&dir, clock.clone()).await;
        let good = store.enqueue("KMB-0001", serde_json::json!({})).await.unwrap();
        sqlx::query(
            "INSERT INTO queued_scans (id, payload, scanned_at_ms, status, retry_count, metadata) \
             VALUES ('x', 'p', 0, 'pending', 0, 'not json')",
        )
        .execute(store.pool())
        .await
        .unwrap();

        let listed = store.list_each_by_status(ScanStatus::Pending).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(matches!(&listed[0], Err(QueueError::Corrupt { id, .. }) if id == "x"));
        assert_eq!(listed[1].as_ref().unwrap().id, good.id);
    }
}
