use axum::{routing::get, Router};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use aid_desk::{
    app_state::AppState,
    clock::{Clock, SystemClock},
    config::AppConfig,
    routes,
    services::{
        connectivity::{ConnectivityMonitor, HttpConnectivityProbe},
        queue_store::{InMemoryQueueStore, QueueStore, SqliteQueueStore},
        submitter::HttpScanSubmitter,
        sync::{run_sync_agent, SyncCoordinator},
    },
};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing aid-desk server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    // Register application metrics
    metrics::describe_counter!("scan_queue_enqueued_total", "Scans added to the offline queue");
    metrics::describe_counter!(
        "scan_sync_succeeded_total",
        "Scans accepted by the remote API and removed from the queue"
    );
    metrics::describe_counter!(
        "scan_sync_failed_total",
        "Scan submissions that failed and were parked for retry"
    );
    metrics::describe_counter!(
        "scan_queue_corrupt_total",
        "Queue records skipped by a drain because they could not be decoded"
    );
    metrics::describe_gauge!("scan_queue_pending", "Scans waiting for the next drain");
    metrics::describe_gauge!("scan_queue_syncing", "Scans currently being submitted");
    metrics::describe_gauge!("scan_queue_failed", "Scans waiting for an operator retry");
    metrics::describe_histogram!("scan_sync_drain_seconds", "Duration of a queue drain");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // Open the scan queue
    let store: Arc<dyn QueueStore> = if config.uses_memory_store() {
        tracing::warn!("Using in-memory scan queue, scans will not survive a restart");
        Arc::new(InMemoryQueueStore::new(clock.clone()))
    } else {
        tracing::info!(database_url = %config.database_url, "Opening SQLite scan queue");
        Arc::new(
            SqliteQueueStore::connect(&config.database_url, clock.clone())
                .await
                .expect("Failed to open scan queue database"),
        )
    };

    let http = reqwest::Client::builder()
        .user_agent(concat!("aid-desk/", env!("CARGO_PKG_VERSION")))
        .build()
        .expect("Failed to build HTTP client");

    let submitter = Arc::new(HttpScanSubmitter::new(
        http.clone(),
        config.submit_url.clone(),
        config.submit_api_token.clone(),
        config.submit_timeout(),
    ));
    let probe = Arc::new(HttpConnectivityProbe::new(
        http,
        config.probe_url(),
        config.submit_timeout(),
    ));

    // Start offline; the agent's first successful probe counts as a reconnect.
    let (online_tx, online_rx) = watch::channel(false);
    let coordinator = Arc::new(SyncCoordinator::new(
        store,
        submitter,
        online_rx,
        config.submit_timeout(),
    ));
    if let Err(e) = coordinator.publish_counts().await {
        tracing::warn!(error = %e, "Failed to read initial queue counts");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let monitor = ConnectivityMonitor::new(clock, config.reconnect_debounce());
    let agent = tokio::spawn(run_sync_agent(
        coordinator.clone(),
        probe,
        monitor,
        online_tx,
        config.probe_interval(),
        shutdown_rx,
    ));

    let state = AppState::new(coordinator, config.webhook_secret.clone());

    // Build API routes
    let app = routes::router(state)
        // Prometheus metrics endpoint (separate state)
        .merge(
            Router::new()
                .route("/metrics", get(routes::metrics::prometheus_metrics))
                .with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(1024 * 1024)); // 1 MB limit

    tracing::info!("Starting aid-desk on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await
        .expect("Server error");

    let _ = shutdown_tx.send(true);
    if let Err(e) = agent.await {
        tracing::error!(error = %e, "Sync agent task failed");
    }
}
