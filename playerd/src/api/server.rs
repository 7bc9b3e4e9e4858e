//! HTTP server setup and routing

use crate::playback::PlaybackService;
use axum::{
    routing::{get, post},
    Router,
};
use playerd_common::config::TomlConfig;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub playback: Arc<PlaybackService>,
    /// Bootstrap configuration; supplies open defaults and the playlist
    pub config: Arc<TomlConfig>,
}

impl AppContext {
    pub fn new(playback: Arc<PlaybackService>, config: Arc<TomlConfig>) -> Self {
        Self { playback, config }
    }
}

/// Build the full router; unmatched paths are served from `assets_dir`
pub fn build_router(ctx: AppContext) -> Router {
    let assets = ServeDir::new(&ctx.config.assets_dir);

    Router::new()
        .route("/health", get(super::handlers::health))
        // Player lifecycle and raw engine access
        .route("/api/player/status", get(super::handlers::status))
        .route("/api/player/events", get(super::sse::event_stream))
        .route("/api/player/open", post(super::handlers::open))
        .route("/api/player/close", post(super::handlers::close))
        .route("/api/player/play", post(super::handlers::play))
        .route("/api/player/playlist", post(super::handlers::play_playlist))
        .route("/api/player/command", post(super::handlers::command))
        .route("/api/player/option", post(super::handlers::set_option))
        .route("/api/player/property", post(super::handlers::set_property))
        // Control panel shortcuts
        .route("/play", get(super::handlers::play_configured_playlist))
        .route("/pause", get(super::handlers::pause))
        .route("/resume", get(super::handlers::resume))
        .route("/next", get(super::handlers::next))
        .route("/pre", get(super::handlers::previous))
        .route("/seek/:value", get(super::handlers::seek))
        .route("/osd/:value", get(super::handlers::osd))
        .fallback_service(assets)
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
