use serde::Deserialize;
use std::time::Duration;

/// Value of `DATABASE_URL` that selects the non-durable in-memory queue.
pub const MEMORY_DATABASE: &str = "memory";

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000")
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// SQLite connection string for the scan queue, or "memory"
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Remote endpoint that accepts queued scans
    pub submit_url: String,

    /// Bearer token sent with every submission
    #[serde(default)]
    pub submit_api_token: Option<String>,

    #[serde(default = "default_submit_timeout_secs")]
    pub submit_timeout_secs: u64,

    /// URL probed for connectivity; falls back to `submit_url`
    #[serde(default)]
    pub probe_url: Option<String>,

    #[serde(default = "default_probe_interval_ms")]
    pub probe_interval_ms: u64,

    /// How long the link must stay up before a reconnect drains the queue
    #[serde(default = "default_reconnect_debounce_ms")]
    pub reconnect_debounce_ms: u64,

    /// Shared secret for pull-request webhook signatures
    #[serde(default)]
    pub webhook_secret: Option<String>,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_database_url() -> String {
    "sqlite://scan_queue.db".to_string()
}

fn default_submit_timeout_secs() -> u64 {
    10
}

fn default_probe_interval_ms() -> u64 {
    1000
}

fn default_reconnect_debounce_ms() -> u64 {
    2000
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    pub fn submit_timeout(&self) -> Duration {
        Duration::from_secs(self.submit_timeout_secs)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    pub fn reconnect_debounce(&self) -> Duration {
        Duration::from_millis(self.reconnect_debounce_ms)
    }

    pub fn probe_url(&self) -> &str {
        self.probe_url.as_deref().unwrap_or(&self.submit_url)
    }

    pub fn uses_memory_store(&self) -> bool {
        self.database_url == MEMORY_DATABASE
    }
}
