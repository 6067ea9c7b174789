//! QRCS HTTP server.
//!
//! Wires the Postgres stores into the lifecycle service and serves the
//! HTTP API.

use qrcs::{
    config::Config,
    lifecycle::LifecycleService,
    server::{build_router, AppState},
    stores::{
        PostgresDispatchStore, PostgresIncidentStore, PostgresNotificationStore,
        PostgresResourceStore,
    },
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "qrcs=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting QRCS HTTP server");

    // Load configuration
    let config = Config::from_env();
    info!(postgres_url = %config.postgres.url, "Configuration loaded");

    // Connect to Postgres
    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.postgres.max_connections)
        .min_connections(config.postgres.min_connections)
        .acquire_timeout(Duration::from_secs(config.postgres.connect_timeout))
        .idle_timeout(Duration::from_secs(config.postgres.idle_timeout))
        .connect(&config.postgres.url)
        .await?;
    info!("Database connected");

    // Run pending migrations
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Migrations applied");

    // Wire stores into the lifecycle service
    let incidents = Arc::new(PostgresIncidentStore::new(pool.clone()));
    let resources = Arc::new(PostgresResourceStore::new(pool.clone()));
    let dispatcher = Arc::new(PostgresDispatchStore::new(pool.clone()));
    let notifications = Arc::new(PostgresNotificationStore::new(pool.clone()));

    let lifecycle = Arc::new(LifecycleService::new(
        incidents.clone(),
        resources.clone(),
        dispatcher,
        notifications.clone(),
    ));

    let state = AppState::new(lifecycle, incidents, resources, notifications);

    // Build router
    let app = build_router(state, Some(Arc::new(pool)));

    // Create server address
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!(address = %addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on {addr}");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
