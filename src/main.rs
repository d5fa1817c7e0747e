use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use whisk_batch::app_state::AppState;
use whisk_batch::config::AppConfig;
use whisk_batch::routes;
use whisk_batch::services::{
    credentials::CredentialStore,
    queue::{self, JobQueue},
    whisk::WhiskClient,
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

    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing whisk-batch server");

    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);
    queue::describe_metrics();

    tracing::info!(path = %config.credentials_path.display(), "Opening credential store");
    let credentials = CredentialStore::open(&config.credentials_path)
        .await
        .expect("Failed to open credential store");

    tracing::info!(base_url = %config.whisk_api_base, "Initializing Whisk client");
    let client = WhiskClient::new(&config.whisk_api_base);
    let job_queue = Arc::new(JobQueue::new(Arc::new(client)));

    let state = AppState::new(job_queue, credentials);

    let app = routes::api_router(state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(10 * 1024 * 1024)); // 10 MB limit

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}
