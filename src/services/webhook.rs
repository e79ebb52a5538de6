//! Signed pull-request webhook relay.
//!
//! Deliveries carry `x-hub-signature-256: sha256=<hex>`, an HMAC-SHA256 of
//! the raw body keyed with the shared secret. Only `pull_request` events with
//! an opened/closed/merged action are acknowledged as tracked.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use strum::{AsRefStr, Display};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";
pub const EVENT_HEADER: &str = "x-github-event";
const SIGNATURE_PREFIX: &str = "sha256=";

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Webhook secret is not configured")]
    MissingSecret,

    #[error("Missing or invalid webhook signature")]
    InvalidSignature,

    #[error("Malformed webhook body: {0}")]
    MalformedBody(#[from] serde_json::Error),

    #[error("Webhook key rejected: {0}")]
    InvalidKey(String),
}

/// `sha256=<hex>` signature for `body`.
pub fn sign(secret: &str, body: &[u8]) -> Result<String, WebhookError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| WebhookError::InvalidKey(e.to_string()))?;
    mac.update(body);
    Ok(format!(
        "{SIGNATURE_PREFIX}{}",
        hex::encode(mac.finalize().into_bytes())
    ))
}

/// Constant-time check of a signature header against `body`.
pub fn verify_signature(
    secret: &str,
    body: &[u8],
    header: Option<&str>,
) -> Result<(), WebhookError> {
    let expected = header
        .and_then(|h| h.trim().strip_prefix(SIGNATURE_PREFIX))
        .and_then(|h| hex::decode(h).ok())
        .ok_or(WebhookError::InvalidSignature)?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| WebhookError::InvalidKey(e.to_string()))?;
    mac.update(body);
    mac.verify_slice(&expected)
        .map_err(|_| WebhookError::InvalidSignature)
}

#[derive(Debug, Deserialize)]
pub struct PullRequestEvent {
    pub action: String,
    pub number: u64,
    #[serde(default)]
    pub pull_request: Option<PullRequest>,
}

#[derive(Debug, Deserialize)]
pub struct PullRequest {
    #[serde(default)]
    pub merged: bool,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, AsRefStr, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TrackedAction {
    Opened,
    Closed,
    Merged,
}

impl PullRequestEvent {
    /// A close of a merged pull request is reported as `merged`.
    pub fn tracked_action(&self) -> Option<TrackedAction> {
        match self.action.as_str() {
            "opened" => Some(TrackedAction::Opened),
            "merged" => Some(TrackedAction::Merged),
            "closed" if self.pull_request.as_ref().is_some_and(|pr| pr.merged) => {
                Some(TrackedAction::Merged)
            }
            "closed" => Some(TrackedAction::Closed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum WebhookReply {
    Tracked {
        received: bool,
        action: TrackedAction,
        number: u64,
    },
    Ignored {
        received: bool,
        message: String,
    },
}

impl WebhookReply {
    fn ignored(message: impl Into<String>) -> Self {
        WebhookReply::Ignored {
            received: true,
            message: message.into(),
        }
    }
}

/// Verify and interpret one delivery.
pub fn handle_delivery(
    secret: Option<&str>,
    event_type: Option<&str>,
    signature: Option<&str>,
    body: &[u8],
) -> Result<WebhookReply, WebhookError> {
    let secret = secret
        .filter(|s| !s.is_empty())
        .ok_or(WebhookError::MissingSecret)?;
    verify_signature(secret, body, signature)?;

    match event_type {
        Some("pull_request") => {}
        other => {
            tracing::debug!(event = ?other, "Ignoring webhook event");
            return Ok(WebhookReply::ignored(format!(
                "event {} ignored",
                other.unwrap_or("unknown")
            )));
        }
    }

    let event: PullRequestEvent = serde_json::from_slice(body)?;
    match event.tracked_action() {
        Some(action) => {
            tracing::info!(action = %action, number = event.number, "Pull request event received");
            Ok(WebhookReply::Tracked {
                received: true,
                action,
                number: event.number,
            })
        }
        None => Ok(WebhookReply::ignored(format!(
            "action {} not tracked",
            event.action
        ))),
    }
}
