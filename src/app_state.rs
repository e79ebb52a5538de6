use std::sync::Arc;

use crate::services::{queue_store::QueueStore, sync::SyncCoordinator};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn QueueStore>,
    pub coordinator: Arc<SyncCoordinator>,
    pub webhook_secret: Option<Arc<str>>,
}

impl AppState {
    pub fn new(coordinator: Arc<SyncCoordinator>, webhook_secret: Option<String>) -> Self {
        Self {
            store: coordinator.store().clone(),
            coordinator,
            webhook_secret: webhook_secret.map(Arc::from),
        }
    }
}
