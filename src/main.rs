//! # SHL Proxy - Main Entry Point
//!
//! Loads configuration from the environment (and `.env`), wires the cache store,
//! the statistics API client and the request handler together, then serves until
//! SIGINT or SIGTERM.

use anyhow::Context;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

use shl_proxy::caching;
use shl_proxy::formatter::TeamInfoLookup;
use shl_proxy::gateway::{AppState, ProxyServer};
use shl_proxy::handler::{HandlerSettings, RequestHandler};
use shl_proxy::observability::{init_logging, install_recorder};
use shl_proxy::upstream::{ShlClient, ShlClientConfig};
use shl_proxy::ProxyConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the environment may already be populated
    let dotenv = dotenvy::dotenv();

    let config = ProxyConfig::from_env().context("Invalid configuration")?;
    init_logging(config.log_format);

    match dotenv {
        Ok(path) => info!("Loaded environment from {}", path.display()),
        Err(err) if err.not_found() => {}
        Err(err) => warn!(error = %err, "Failed to read .env file"),
    }

    info!("Starting SHL proxy");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(
        season = config.season,
        ttl = ?config.cache.ttl,
        environment = ?config.server.environment,
        "Configuration loaded"
    );

    let metrics = if config.metrics_enabled {
        Some(install_recorder()?)
    } else {
        None
    };

    let cache = caching::connect(&config.cache)
        .await
        .context("Failed to connect to cache store")?;

    let upstream = ShlClient::new(ShlClientConfig::from(&config.upstream))
        .context("Failed to build statistics API client")?;

    let handler = RequestHandler::new(
        Arc::clone(&cache),
        Arc::new(upstream),
        Arc::new(TeamInfoLookup::shl()),
        HandlerSettings::from(&config),
    );

    let state = AppState {
        handler: Arc::new(handler),
        cache,
        metrics,
    };

    let server = ProxyServer::new(state, config.server.clone());
    if let Err(err) = server.start(shutdown_signal()).await {
        error!("Server error: {}", err);
        return Err(err.into());
    }

    info!("SHL proxy shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or, on unix, SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "Failed to listen for Ctrl+C");
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
                error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
