use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;

use super::ApiError;
use crate::app_state::AppState;
use crate::services::webhook::{
    handle_delivery, WebhookError, WebhookReply, EVENT_HEADER, SIGNATURE_HEADER,
};

/// POST /api/v1/webhooks/pull-requests
pub async fn pull_request_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookReply>, ApiError> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    let reply = handle_delivery(
        state.webhook_secret.as_deref(),
        header(EVENT_HEADER),
        header(SIGNATURE_HEADER),
        &body,
    )?;
    Ok(Json(reply))
}

impl From<WebhookError> for ApiError {
    fn from(e: WebhookError) -> Self {
        let status = match &e {
            WebhookError::InvalidSignature => StatusCode::UNAUTHORIZED,
            WebhookError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            WebhookError::MissingSecret | WebhookError::InvalidKey(_) => {
                tracing::error!(error = %e, "Webhook relay misconfigured");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        ApiError::new(status, e.to_string())
    }
}
