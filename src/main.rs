//! Request Cache admin server
//!
//! Runs the request cache behind an HTTP admin API with a periodic expiry
//! sweep and a persistence flush on shutdown.

use std::net::SocketAddr;

use anyhow::{bail, Context};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use request_cache::{create_router, spawn_sweep_task, AppState, Config};

/// Main entry point for the request cache server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load and validate configuration from environment variables
/// 3. Create the cache, restoring the persisted snapshot
/// 4. Start the background expiry sweep
/// 5. Serve the admin API until SIGINT/SIGTERM
/// 6. Stop the sweep and flush the cache to persistence
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "request_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Request Cache Server");

    let config = Config::from_env();
    if let Some(error_msg) = config.cache.validate() {
        bail!("Invalid cache configuration: {}", error_msg);
    }
    info!(
        "Configuration loaded: max_size={}, default_ttl={}ms, port={}, sweep_interval={}s, persistence={}",
        config.cache.max_size,
        config.cache.default_ttl.as_millis(),
        config.server_port,
        config.cache.sweep_interval.as_secs(),
        config.cache.enable_persistence
    );

    let state = AppState::from_config(&config);
    let cache = state.cache.clone();
    info!("Request cache initialized with {} entries", cache.stats().await.size);

    let sweep_handle = spawn_sweep_task(cache.clone(), config.cache.sweep_interval);
    info!("Background sweep task started");

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    sweep_handle.abort();
    warn!("Sweep task aborted");

    cache.shutdown().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
