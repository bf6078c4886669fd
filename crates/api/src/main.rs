//! API server entry point.

use std::sync::Arc;
use std::time::Duration;

use api::{AppState, Backends, Config, InMemorySessions, LogFormat};
use store::PostgresStorage;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const WORKER_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Pick the storage backends
    let backends = match &config.database_url {
        Some(url) => {
            let storage = PostgresStorage::connect(url, config.database_max_connections)
                .await
                .expect("failed to connect to database");
            storage
                .run_migrations()
                .await
                .expect("failed to run migrations");
            Backends::postgres(&storage)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory storage");
            Backends::in_memory()
        }
    };

    // 4. Wire services and start the payment worker
    let (state, worker) = AppState::build(
        backends,
        Arc::new(InMemorySessions::new()),
        config.stock_policy,
        config.payment_queue_capacity,
    );

    // 5. Build the application
    let app = api::create_app(state, metrics_handle);

    // 6. Start server
    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    // The router owned the last payment queue sender; the worker now drains.
    match tokio::time::timeout(WORKER_DRAIN_TIMEOUT, worker).await {
        Ok(Ok(summary)) => tracing::info!(
            processed = summary.processed,
            applied = summary.applied,
            "payment worker drained"
        ),
        Ok(Err(err)) => tracing::error!(error = %err, "payment worker panicked"),
        Err(_) => tracing::warn!("payment worker did not drain in time"),
    }

    tracing::info!("server shut down gracefully");
}
