use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use crate::app_state::AppState;
use crate::services::queue_store::QueueError;
use crate::services::sync::SyncError;
use crate::services::validation::FieldErrors;

pub mod forms;
pub mod health;
pub mod metrics;
pub mod scans;
pub mod webhook;

/// Every route that runs on [`AppState`]. `/metrics` is mounted separately
/// because it carries its own state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route(
            "/api/v1/scans",
            get(scans::list_scans)
                .post(scans::enqueue_scan)
                .delete(scans::clear_scans),
        )
        .route("/api/v1/scans/counts", get(scans::scan_counts))
        .route("/api/v1/scans/sync", post(scans::trigger_sync))
        .route("/api/v1/scans/{id}", axum::routing::delete(scans::delete_scan))
        .route("/api/v1/scans/{id}/retry", post(scans::retry_scan))
        .route(
            "/api/v1/forms/{entity}/validate",
            post(forms::validate_entity_form),
        )
        .route(
            "/api/v1/webhooks/pull-requests",
            post(webhook::pull_request_webhook),
        )
        .with_state(state)
}

/// JSON error body with a status code.
///
/// Every handler fails through this type. The body is `{"error": ...}`;
/// input that fails its schema additionally carries `"valid": false` and
/// the field-keyed `"errors"` map.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub fields: Option<FieldErrors>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            fields: None,
        }
    }

    /// 422 with the per-field messages.
    pub fn invalid(fields: FieldErrors) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: "validation failed".to_string(),
            fields: Some(fields),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.fields {
            Some(errors) => json!({ "error": self.message, "valid": false, "errors": errors }),
            None => json!({ "error": self.message }),
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<FieldErrors> for ApiError {
    fn from(fields: FieldErrors) -> Self {
        ApiError::invalid(fields)
    }
}

impl From<QueueError> for ApiError {
    fn from(e: QueueError) -> Self {
        let status = match &e {
            QueueError::NotFound(_) => StatusCode::NOT_FOUND,
            QueueError::InvalidPayload => StatusCode::UNPROCESSABLE_ENTITY,
            QueueError::StorageUnavailable(_) | QueueError::Migration(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            QueueError::Corrupt { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %e, "Queue operation failed");
        }
        ApiError::new(status, e.to_string())
    }
}

impl From<SyncError> for ApiError {
    fn from(e: SyncError) -> Self {
        match e {
            SyncError::Store(inner) => inner.into(),
            not_retryable @ SyncError::NotRetryable { .. } => {
                ApiError::new(StatusCode::CONFLICT, not_retryable.to_string())
            }
        }
    }
}
