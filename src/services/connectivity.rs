//! Online/offline tracking with a quiet period before a reconnect counts.
//!
//! Raw probe results flap on bad networks. [`ConnectivityMonitor`] turns
//! them into at most one [`ConnectivityEvent::StableReconnect`] per online
//! period, once the link has stayed up for the configured interval.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::clock::Clock;

/// Default time the link must stay up before a reconnect triggers a drain.
pub const DEFAULT_QUIET_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityEvent {
    WentOnline,
    WentOffline,
    /// The link has been up for the whole quiet interval.
    StableReconnect,
}

pub struct ConnectivityMonitor {
    clock: Arc<dyn Clock>,
    quiet_interval: chrono::Duration,
    online: bool,
    online_since: Option<DateTime<Utc>>,
    reconnect_fired: bool,
}

impl ConnectivityMonitor {
    /// Starts offline, so the first online observation is a reconnect.
    pub fn new(clock: Arc<dyn Clock>, quiet_interval: Duration) -> Self {
        Self {
            clock,
            quiet_interval: chrono::Duration::from_std(quiet_interval)
                .unwrap_or_else(|_| chrono::Duration::seconds(2)),
            online: false,
            online_since: None,
            reconnect_fired: false,
        }
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    /// Feed one probe result. Returns an event only when the state flips.
    pub fn observe(&mut self, online: bool) -> Option<ConnectivityEvent> {
        if online == self.online {
            return None;
        }
        self.online = online;
        if online {
            self.online_since = Some(self.clock.now());
            self.reconnect_fired = false;
            Some(ConnectivityEvent::WentOnline)
        } else {
            self.online_since = None;
            Some(ConnectivityEvent::WentOffline)
        }
    }

    /// Fires `StableReconnect` once per online period, after the quiet
    /// interval has fully elapsed.
    pub fn poll(&mut self) -> Option<ConnectivityEvent> {
        if !self.online || self.reconnect_fired {
            return None;
        }
        let since = self.online_since?;
        if self.clock.now() - since >= self.quiet_interval {
            self.reconnect_fired = true;
            Some(ConnectivityEvent::StableReconnect)
        } else {
            None
        }
    }
}

/// One reachability check against the remote API.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn is_reachable(&self) -> bool;
}

/// Any HTTP response counts as online; only transport failures and
/// timeouts count as offline.
pub struct HttpConnectivityProbe {
    http: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpConnectivityProbe {
    pub fn new(http: reqwest::Client, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http,
            url: url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl ConnectivityProbe for HttpConnectivityProbe {
    async fn is_reachable(&self) -> bool {
        match self.http.get(&self.url).timeout(self.timeout).send().await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(url = %self.url, error = %e, "Connectivity probe failed");
                false
            }
        }
    }
}
