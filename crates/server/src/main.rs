//! `ots-server`: one-time secret service entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise the telemetry pipeline (tracing + optional OTLP).
//! 3. Open the secret store and apply its schema.
//! 4. Build the [`SecretEngine`].
//! 5. Spawn the expired-secret reaper.
//! 6. Build the Axum router and serve until Ctrl-C.

mod config;
mod crypto;
mod secret;
mod server;
mod store;
mod telemetry;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use config::Config;
use secret::{SecretEngine, SystemClock};
use server::{middleware::RateLimiter, state::AppState};
use store::{MemorySecretStore, SecretStore, SqliteSecretStore};

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(cfg.otel_exporter_otlp_endpoint.as_deref(), &cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = cfg.listen_port,
        "ots-server starting"
    );

    // -----------------------------------------------------------------------
    // 3. Secret store
    // -----------------------------------------------------------------------
    let store: Arc<dyn SecretStore> = if cfg.uses_memory_store() {
        warn!("using in-memory store; secrets will not survive a restart");
        Arc::new(MemorySecretStore::new())
    } else {
        let sqlite = SqliteSecretStore::connect(&cfg.database_url)
            .await
            .context("failed to open secret database")?;
        sqlite
            .migrate()
            .await
            .context("failed to apply secret database schema")?;
        Arc::new(sqlite)
    };

    // -----------------------------------------------------------------------
    // 4. Lifecycle engine
    // -----------------------------------------------------------------------
    let clock = Arc::new(SystemClock);
    let engine = SecretEngine::new(store.clone(), clock.clone(), cfg.public_url.clone());

    // -----------------------------------------------------------------------
    // 5. Background tasks
    // -----------------------------------------------------------------------
    let reaper = store::reaper_task(
        store,
        clock,
        Duration::from_secs(cfg.reaper_interval_secs),
    );

    // -----------------------------------------------------------------------
    // 6. HTTP server
    // -----------------------------------------------------------------------
    let state = AppState::new(engine, RateLimiter::per_minute(cfg.rate_limit_per_minute));
    let router = server::router::build(state);

    let addr: SocketAddr = ([0, 0, 0, 0], cfg.listen_port).into();
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    reaper.abort();
    telemetry::shutdown_telemetry();
    info!("ots-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
