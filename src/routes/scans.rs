use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::ApiError;
use crate::app_state::AppState;
use crate::models::scan::{EnqueueScanRequest, QueuedScan, SyncAvailability};
use crate::services::sync::{SyncOutcome, SyncTrigger};
use crate::services::validation::validate_form;

/// POST /api/v1/scans
pub async fn enqueue_scan(
    State(state): State<AppState>,
    Json(request): Json<EnqueueScanRequest>,
) -> Result<(StatusCode, Json<QueuedScan>), ApiError> {
    validate_form(&request)?;

    let metadata = request.metadata.unwrap_or(Value::Null);
    let scan = state.store.enqueue(&request.payload, metadata).await?;

    tracing::info!(scan_id = %scan.id, "Scan enqueued");
    refresh_counts(&state).await;
    Ok((StatusCode::CREATED, Json(scan)))
}

/// GET /api/v1/scans, oldest first.
pub async fn list_scans(State(state): State<AppState>) -> Result<Json<Vec<QueuedScan>>, ApiError> {
    let mut scans = state.store.list().await?;
    scans.sort_by(QueuedScan::processing_order);
    Ok(Json(scans))
}

/// GET /api/v1/scans/counts
pub async fn scan_counts(State(state): State<AppState>) -> Result<Json<SyncAvailability>, ApiError> {
    let counts = state.store.counts().await?;
    Ok(Json(SyncAvailability::new(
        state.coordinator.is_online(),
        counts,
    )))
}

#[derive(Debug, Default, Deserialize)]
pub struct SyncParams {
    #[serde(default)]
    pub retry_failed: bool,
}

/// POST /api/v1/scans/sync
pub async fn trigger_sync(
    State(state): State<AppState>,
    Query(params): Query<SyncParams>,
) -> Result<Json<SyncOutcome>, ApiError> {
    if params.retry_failed {
        state.coordinator.retry_all_failed().await?;
    }
    let outcome = state.coordinator.sync(SyncTrigger::Manual).await?;
    Ok(Json(outcome))
}

#[derive(Debug, Default, Deserialize)]
pub struct RetryParams {
    #[serde(default)]
    pub reset: bool,
}

/// POST /api/v1/scans/{id}/retry
pub async fn retry_scan(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<RetryParams>,
) -> Result<Json<QueuedScan>, ApiError> {
    let scan = state.coordinator.retry(&id, params.reset).await?;
    Ok(Json(scan))
}

/// DELETE /api/v1/scans/{id}
pub async fn delete_scan(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.store.remove(&id).await?;
    tracing::info!(scan_id = %id, "Scan discarded by operator");
    refresh_counts(&state).await;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/scans
pub async fn clear_scans(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let removed = state.store.clear().await?;
    tracing::warn!(removed = removed, "Scan queue cleared");
    refresh_counts(&state).await;
    Ok(Json(json!({ "removed": removed })))
}

async fn refresh_counts(state: &AppState) {
    if let Err(e) = state.coordinator.publish_counts().await {
        tracing::warn!(error = %e, "Failed to refresh queue counts");
    }
}
