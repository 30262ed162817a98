//! # HTTP Server Module
//!
//! Builds the axum router for the resource endpoints and runs the listeners.
//! Plain HTTP always listens on `PORT`; outside development mode an HTTPS
//! listener on `TLS_PORT` serves the same router.
//!
//! Every response passes through the trace layer, the CORS layer and a fixed set
//! of security headers.

use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::future::{Future, IntoFuture};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, instrument, warn};

use super::tls;
use crate::caching::{CacheStore, ResourceKind};
use crate::core::config::ServerSettings;
use crate::core::error::{ProxyError, ProxyResult};
use crate::core::types::Envelope;
use crate::formatter::{Game, GoalieStats, PlayerStats, Standing, TeamWinStreak};
use crate::handler::RequestHandler;

/// Shared state of every route
#[derive(Clone)]
pub struct AppState {
    pub handler: Arc<RequestHandler>,
    pub cache: Arc<dyn CacheStore>,

    /// Set when the Prometheus recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

/// Build the application router
pub fn router(state: AppState, settings: &ServerSettings) -> Router {
    Router::new()
        .route(ResourceKind::Standings.path(), get(standings))
        .route(ResourceKind::Games.path(), get(games))
        .route(ResourceKind::Goalies.path(), get(goalies))
        .route(ResourceKind::Players.path(), get(players))
        .route(ResourceKind::Winstreaks.path(), get(winstreaks))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_export))
        .with_state(state)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(cors_layer(settings))
        .layer(TraceLayer::new_for_http())
}

/// Any origin in development, otherwise only the configured allow-list
pub fn cors_layer(settings: &ServerSettings) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods([Method::GET, Method::OPTIONS]);

    if settings.is_development() {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = settings
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    info!("CORS enabled with {} allowed origins", origins.len());
    cors.allow_origin(AllowOrigin::list(origins))
}

async fn standings(State(state): State<AppState>) -> ProxyResult<Json<Envelope<Vec<Standing>>>> {
    Ok(Json(state.handler.standings().await?))
}

async fn games(State(state): State<AppState>) -> ProxyResult<Json<Envelope<Vec<Game>>>> {
    Ok(Json(state.handler.games().await?))
}

async fn goalies(State(state): State<AppState>) -> ProxyResult<Json<Envelope<Vec<GoalieStats>>>> {
    Ok(Json(state.handler.goalies().await?))
}

async fn players(State(state): State<AppState>) -> ProxyResult<Json<Envelope<Vec<PlayerStats>>>> {
    Ok(Json(state.handler.players().await?))
}

async fn winstreaks(
    State(state): State<AppState>,
) -> ProxyResult<Json<Envelope<Vec<TeamWinStreak>>>> {
    Ok(Json(state.handler.winstreaks().await?))
}

/// Health check handler
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let cache = match state.cache.health_check().await {
        Ok(healthy) => healthy,
        Err(err) => {
            warn!(error = %err, "Cache health check failed");
            false
        }
    };

    Json(json!({
        "status": "ok",
        "cache": cache,
    }))
}

async fn metrics_export(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// The proxy's HTTP and HTTPS listeners
pub struct ProxyServer {
    app: Router,
    settings: ServerSettings,
}

impl ProxyServer {
    pub fn new(state: AppState, settings: ServerSettings) -> Self {
        let app = router(state, &settings);
        Self { app, settings }
    }

    /// The router, for serving in tests
    pub fn app(&self) -> Router {
        self.app.clone()
    }

    /// Run until a listener fails or `shutdown` resolves
    #[instrument(skip(self, shutdown))]
    pub async fn start<S>(self, shutdown: S) -> ProxyResult<()>
    where
        S: Future<Output = ()> + Send,
    {
        let http_addr = format!("{}:{}", self.settings.bind_address, self.settings.port);
        let http_listener = TcpListener::bind(&http_addr).await.map_err(|e| {
            ProxyError::internal(format!("Failed to bind HTTP server to {}: {}", http_addr, e))
        })?;
        info!("HTTP server listening on {}", http_addr);

        let http_server = axum::serve(http_listener, self.app.clone()).into_future();

        if !self.settings.tls_enabled() {
            tokio::select! {
                result = http_server => {
                    result.map_err(|e| ProxyError::internal(format!("HTTP server error: {}", e)))?;
                }
                _ = shutdown => info!("Shutdown signal received"),
            }
            return Ok(());
        }

        let tls_config =
            tls::load_tls_config(&self.settings.tls_cert_path, &self.settings.tls_key_path)?;
        let tls_addr = format!("{}:{}", self.settings.bind_address, self.settings.tls_port);
        let tls_listener = TcpListener::bind(&tls_addr).await.map_err(|e| {
            ProxyError::internal(format!("Failed to bind HTTPS server to {}: {}", tls_addr, e))
        })?;
        info!("HTTPS server listening on {}", tls_addr);

        tokio::select! {
            result = http_server => {
                result.map_err(|e| ProxyError::internal(format!("HTTP server error: {}", e)))?;
            }
            result = tls::serve_tls(tls_listener, tls_config, self.app) => result?,
            _ = shutdown => info!("Shutdown signal received"),
        }

        Ok(())
    }
}
