// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
};
use herald_config::model::GatewayConfig;
use herald_core::HeraldError;
use herald_dispatch::BroadcastEngine;
use herald_pool::ConnectionPool;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::auth::{TenantTokens, auth_middleware};
use crate::handlers;
use crate::media::{MEDIA_ROUTE, MediaStore};

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub engine: Arc<BroadcastEngine>,
    pub pool: ConnectionPool,
    pub tokens: TenantTokens,
    /// Upload target; `None` when uploads are not configured.
    pub media: Option<MediaStore>,
    /// Process start time for uptime calculation.
    pub start_time: Instant,
}

impl GatewayState {
    pub fn new(engine: Arc<BroadcastEngine>, pool: ConnectionPool, tokens: TenantTokens) -> Self {
        Self {
            engine,
            pool,
            tokens,
            media: None,
            start_time: Instant::now(),
        }
    }

    /// Enables `POST /uploads` and serves stored files under `/media`.
    pub fn with_media(mut self, media: MediaStore) -> Self {
        self.media = Some(media);
        self
    }
}

/// Builds the full route table.
///
/// - GET /health (no auth)
/// - POST, GET /broadcasts
/// - GET /broadcasts/statistics
/// - GET, DELETE /broadcasts/{id}
/// - POST /broadcasts/{id}/send, POST /broadcasts/{id}/cancel
/// - GET /connection/status, POST /connection/connect, DELETE /connection
/// - POST /uploads, and GET /media/{tenant}/{file} (no auth) when media is configured
pub fn router(state: GatewayState) -> Router {
    let mut public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .with_state(state.clone());
    if let Some(media) = &state.media {
        public_routes = public_routes.nest_service(MEDIA_ROUTE, ServeDir::new(media.root()));
    }
    let upload_limit = state
        .media
        .as_ref()
        .map_or(0, MediaStore::max_upload_bytes);

    let api_routes = Router::new()
        .route(
            "/broadcasts",
            post(handlers::create_broadcast).get(handlers::list_broadcasts),
        )
        .route("/broadcasts/statistics", get(handlers::get_statistics))
        .route(
            "/broadcasts/{id}",
            get(handlers::get_broadcast).delete(handlers::delete_broadcast),
        )
        .route("/broadcasts/{id}/send", post(handlers::send_broadcast))
        .route("/broadcasts/{id}/cancel", post(handlers::cancel_broadcast))
        .route("/connection/status", get(handlers::connection_status))
        .route("/connection/connect", post(handlers::connect))
        .route("/connection", axum::routing::delete(handlers::disconnect))
        .route(
            "/uploads",
            post(handlers::upload_media).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.tokens.clone(),
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Binds to the configured host:port and serves until `shutdown` fires.
pub async fn start_server(
    config: &GatewayConfig,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), HeraldError> {
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| HeraldError::Config(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("Gateway server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(|e| HeraldError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("Gateway server stopped");
    Ok(())
}
