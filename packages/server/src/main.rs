// Main entry point for the matching engine API server

mod app;
mod config;
mod error;
mod routes;
mod scheduler;

use std::sync::Arc;

use anyhow::{Context, Result};
use engine_core::store::PgStore;
use engine_core::{Engine, MatchConfig, SystemClock};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,engine_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Sahaya matching engine API");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    // Connect to database
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connected");

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations complete");

    // Build the engine on the Postgres gateway
    let store = Arc::new(PgStore::new(pool));
    let engine = Arc::new(Engine::new(
        store,
        Arc::new(SystemClock),
        MatchConfig::default(),
    ));

    // Start the timeout watcher; keep the scheduler handle alive
    let _scheduler = scheduler::start_expiry_sweeper(engine.clone(), config.expiry_sweep_seconds)
        .await
        .context("Failed to start expiry sweeper")?;

    // Build application
    let app = app::build_app(engine);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
