use std::time::Duration;

use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::StatusCode;
use serde::Serialize;

use crate::models::scan::QueuedScan;

/// Delivers one queued scan to the remote API.
#[async_trait]
pub trait ScanSubmitter: Send + Sync {
    async fn submit(&self, scan: &QueuedScan) -> Result<(), SubmitError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// Transport failure or a server-side status worth trying again.
    #[error("Submission failed, retryable: {0}")]
    Retryable(String),

    /// The server refused the scan itself.
    #[error("Submission rejected with {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Submission timed out after {0:?}")]
    Timeout(Duration),
}

impl SubmitError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, SubmitError::Rejected { .. })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitScanBody<'a> {
    client_scan_id: &'a str,
    code: &'a str,
    scanned_at: String,
    metadata: &'a serde_json::Value,
}

/// `POST`s scans as JSON to the configured endpoint.
pub struct HttpScanSubmitter {
    http: reqwest::Client,
    url: String,
    api_token: Option<String>,
    timeout: Duration,
}

impl HttpScanSubmitter {
    pub fn new(
        http: reqwest::Client,
        url: impl Into<String>,
        api_token: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            url: url.into(),
            api_token,
            timeout,
        }
    }
}

#[async_trait]
impl ScanSubmitter for HttpScanSubmitter {
    async fn submit(&self, scan: &QueuedScan) -> Result<(), SubmitError> {
        let body = SubmitScanBody {
            client_scan_id: &scan.id,
            code: &scan.payload,
            scanned_at: scan.scanned_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            metadata: &scan.metadata,
        };

        let mut request = self.http.post(&self.url).timeout(self.timeout).json(&body);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                SubmitError::Timeout(self.timeout)
            } else {
                SubmitError::Retryable(e.to_string())
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let message = response.text().await.unwrap_or_default();
        Err(classify_status(status, message))
    }
}

/// 408, 429 and 5xx are worth retrying; any other non-success is final.
pub fn classify_status(status: StatusCode, message: String) -> SubmitError {
    if status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
    {
        SubmitError::Retryable(format!("HTTP {status}: {message}"))
    } else {
        SubmitError::Rejected {
            status: status.as_u16(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(classify_status(StatusCode::INTERNAL_SERVER_ERROR, String::new()).is_retryable());
        assert!(classify_status(StatusCode::SERVICE_UNAVAILABLE, String::new()).is_retryable());
        assert!(classify_status(StatusCode::TOO_MANY_REQUESTS, String::new()).is_retryable());
        assert!(classify_status(StatusCode::REQUEST_TIMEOUT, String::new()).is_retryable());

        let rejected = classify_status(StatusCode::UNPROCESSABLE_ENTITY, "unknown box".into());
        assert!(!rejected.is_retryable());
        assert!(rejected.to_string().contains("422"));
    }

    #[test]
    fn test_body_shape() {
        let scan = QueuedScan::new(
            "PB-0042",
            serde_json::json!({"device": "t1"}),
            chrono::DateTime::from_timestamp_millis(1_714_557_600_123).unwrap(),
        );
        let body = SubmitScanBody {
            client_scan_id: &scan.id,
            code: &scan.payload,
            scanned_at: scan.scanned_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            metadata: &scan.metadata,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["clientScanId"], scan.id.as_str());
        assert_eq!(json["code"], "PB-0042");
        assert_eq!(json["scannedAt"], "2024-05-01T10:00:00.123Z");
        assert_eq!(json["metadata"]["device"], "t1");
    }
}
