use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

/// Status of a scan waiting in the offline queue.
///
/// A successfully submitted scan is deleted, so there is no "synced" status.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ScanStatus {
    Pending,
    Syncing,
    Failed,
}

/// A scanned code captured while the remote API may be unreachable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedScan {
    pub id: String,
    pub payload: String,
    pub scanned_at: DateTime<Utc>,
    pub status: ScanStatus,
    pub retry_count: u32,
    /// Diagnostic info (device, operator, ...). Never interpreted by the queue.
    pub metadata: serde_json::Value,
}

impl QueuedScan {
    /// Build a fresh pending record. The id is a UUIDv7: a millisecond time
    /// prefix followed by random bits, so equal payloads scanned in the same
    /// instant still get distinct ids.
    pub fn new(payload: impl Into<String>, metadata: serde_json::Value, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            payload: payload.into(),
            scanned_at: truncate_to_millis(now),
            status: ScanStatus::Pending,
            retry_count: 0,
            metadata: normalize_metadata(metadata),
        }
    }

    /// Drain order: oldest scan first, id as tie-breaker.
    pub fn processing_order(a: &QueuedScan, b: &QueuedScan) -> Ordering {
        a.scanned_at
            .cmp(&b.scanned_at)
            .then_with(|| a.id.cmp(&b.id))
    }
}

/// The queue persists timestamps as epoch milliseconds.
pub fn truncate_to_millis(ts: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ts.timestamp_millis()).unwrap_or(ts)
}

fn normalize_metadata(metadata: serde_json::Value) -> serde_json::Value {
    if metadata.is_null() {
        serde_json::json!({})
    } else {
        metadata
    }
}

/// Per-status record counts, used to drive the sync affordances in the UI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueCounts {
    pub pending: u64,
    pub syncing: u64,
    pub failed: u64,
}

impl QueueCounts {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a QueuedScan>) -> Self {
        let mut counts = Self::default();
        for record in records {
            counts.record(record.status);
        }
        counts
    }

    pub fn record(&mut self, status: ScanStatus) {
        match status {
            ScanStatus::Pending => self.pending += 1,
            ScanStatus::Syncing => self.syncing += 1,
            ScanStatus::Failed => self.failed += 1,
        }
    }

    pub fn get(&self, status: ScanStatus) -> u64 {
        match status {
            ScanStatus::Pending => self.pending,
            ScanStatus::Syncing => self.syncing,
            ScanStatus::Failed => self.failed,
        }
    }

    pub fn total(&self) -> u64 {
        self.pending + self.syncing + self.failed
    }

    /// Records a manual sync could still act on.
    pub fn outstanding(&self) -> u64 {
        self.pending + self.failed
    }
}

/// Counts plus connectivity, as shown next to the manual sync button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncAvailability {
    pub online: bool,
    #[serde(flatten)]
    pub counts: QueueCounts,
    pub can_sync: bool,
}

impl SyncAvailability {
    pub fn new(online: bool, counts: QueueCounts) -> Self {
        Self {
            online,
            counts,
            can_sync: online && counts.outstanding() > 0,
        }
    }
}

/// Body of `POST /api/v1/scans`.
#[derive(Debug, Deserialize, Validate)]
pub struct EnqueueScanRequest {
    #[garde(length(min = 1, max = 4096))]
    pub payload: String,

    #[garde(skip)]
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}
