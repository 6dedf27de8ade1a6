use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use seo_writer_api::background;
use seo_writer_api::config::ServerConfig;
use seo_writer_api::engine::dispatcher::HttpDispatcher;
use seo_writer_api::router::build_app_router;
use seo_writer_api::state::AppState;
use seo_writer_db::memory::{InMemoryJobStore, InMemoryQuotaStore};
use seo_writer_db::repositories::{JobRepo, QuotaRepo};
use seo_writer_db::store::{JobStore, QuotaStore};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seo_writer_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        worker_url = %config.worker.webhook_url,
        staleness_secs = config.jobs.staleness_secs,
        "Loaded server configuration"
    );

    // --- Storage ---
    let quota_limit = config.jobs.monthly_quota_limit;
    let (jobs, quota, pool) = match &config.database_url {
        Some(database_url) => {
            let pool = seo_writer_db::create_pool(database_url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");

            seo_writer_db::health_check(&pool)
                .await
                .expect("Database health check failed");

            seo_writer_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");

            let jobs: Arc<dyn JobStore> = Arc::new(JobRepo::new(pool.clone()));
            let quota: Arc<dyn QuotaStore> = Arc::new(QuotaRepo::new(pool.clone(), quota_limit));
            (jobs, quota, Some(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory storage");
            let jobs: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
            let quota: Arc<dyn QuotaStore> = Arc::new(InMemoryQuotaStore::new(quota_limit));
            (jobs, quota, None)
        }
    };

    // --- Dispatcher ---
    let dispatcher = HttpDispatcher::new(
        config.worker.webhook_url.clone(),
        config.worker.dispatch_timeout(),
    )
    .expect("Failed to build HTTP client for worker dispatch");

    // --- App state ---
    let state = AppState {
        jobs,
        quota,
        dispatcher: Arc::new(dispatcher),
        config: Arc::new(config.clone()),
        pool,
    };

    // --- Timeout reaper ---
    let reaper_cancel = CancellationToken::new();
    let reaper_handle = tokio::spawn(background::timeout_reaper::run(
        state.reaper(),
        config.jobs.reaper_interval(),
        reaper_cancel.clone(),
    ));

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    reaper_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), reaper_handle).await;
    tracing::info!("Timeout reaper stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
