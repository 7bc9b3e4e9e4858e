//! HTTP request handlers

use super::error::{ApiError, ApiResult};
use super::server::AppContext;
use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use playerd_common::PlayerStatus;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    fn ok() -> Json<Self> {
        Json(Self {
            status: "ok".to_string(),
        })
    }
}

/// Body of `POST /api/player/open`; missing maps fall back to the config
#[derive(Debug, Default, Deserialize)]
pub struct OpenRequest {
    pub flags: Option<BTreeMap<String, bool>>,
    pub options: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Deserialize)]
pub struct PlayRequest {
    pub video: String,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistRequest {
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    pub args: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct KeyValueRequest {
    pub key: String,
    pub value: String,
}

// ============================================================================
// Health and status
// ============================================================================

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "playerd".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /api/player/status
pub async fn status(State(ctx): State<AppContext>) -> Json<PlayerStatus> {
    Json(ctx.playback.status())
}

// ============================================================================
// Lifecycle
// ============================================================================

/// POST /api/player/open
///
/// The body is optional. Open blocks on engine startup, so it runs on the
/// blocking pool.
pub async fn open(State(ctx): State<AppContext>, body: Bytes) -> ApiResult<Json<StatusResponse>> {
    let request: OpenRequest = if body.is_empty() {
        OpenRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("invalid json: {}", e)))?
    };

    let flags = request.flags.unwrap_or_else(|| ctx.config.engine.flags.clone());
    let options = request.options.unwrap_or_else(|| ctx.config.engine.options.clone());

    let player = Arc::clone(ctx.playback.player());
    tokio::task::spawn_blocking(move || player.open(&flags, &options)).await??;

    info!("Player opened");
    Ok(StatusResponse::ok())
}

/// POST /api/player/close
///
/// Waits for the event loop to exit, so it runs on the blocking pool.
pub async fn close(State(ctx): State<AppContext>) -> ApiResult<Json<StatusResponse>> {
    let player = Arc::clone(ctx.playback.player());
    tokio::task::spawn_blocking(move || player.close()).await??;

    info!("Player closed");
    Ok(StatusResponse::ok())
}

// ============================================================================
// Playback
// ============================================================================

/// POST /api/player/play
pub async fn play(
    State(ctx): State<AppContext>,
    body: Result<Json<PlayRequest>, JsonRejection>,
) -> ApiResult<Json<StatusResponse>> {
    let Json(request) = body?;
    ctx.playback.play_file(&request.video)?;
    Ok(StatusResponse::ok())
}

/// POST /api/player/playlist
pub async fn play_playlist(
    State(ctx): State<AppContext>,
    body: Result<Json<PlaylistRequest>, JsonRejection>,
) -> ApiResult<Json<StatusResponse>> {
    let Json(request) = body?;
    ctx.playback.play_playlist(&request.path)?;
    Ok(StatusResponse::ok())
}

/// GET /play - load the configured playlist
pub async fn play_configured_playlist(
    State(ctx): State<AppContext>,
) -> ApiResult<Json<StatusResponse>> {
    let playlist = ctx
        .config
        .playlist
        .as_ref()
        .ok_or_else(|| ApiError::BadRequest("no playlist configured".to_string()))?;

    ctx.playback.play_playlist(&playlist.to_string_lossy())?;
    Ok(StatusResponse::ok())
}

/// GET /pause
pub async fn pause(State(ctx): State<AppContext>) -> ApiResult<Json<StatusResponse>> {
    ctx.playback.pause()?;
    Ok(StatusResponse::ok())
}

/// GET /resume
pub async fn resume(State(ctx): State<AppContext>) -> ApiResult<Json<StatusResponse>> {
    ctx.playback.resume()?;
    Ok(StatusResponse::ok())
}

/// GET /next
pub async fn next(State(ctx): State<AppContext>) -> ApiResult<Json<StatusResponse>> {
    ctx.playback.next()?;
    Ok(StatusResponse::ok())
}

/// GET /pre
pub async fn previous(State(ctx): State<AppContext>) -> ApiResult<Json<StatusResponse>> {
    ctx.playback.previous()?;
    Ok(StatusResponse::ok())
}

/// GET /seek/:value
pub async fn seek(
    State(ctx): State<AppContext>,
    Path(value): Path<String>,
) -> ApiResult<Json<StatusResponse>> {
    ctx.playback.seek(&value)?;
    Ok(StatusResponse::ok())
}

/// GET /osd/:value
pub async fn osd(
    State(ctx): State<AppContext>,
    Path(value): Path<String>,
) -> ApiResult<Json<StatusResponse>> {
    ctx.playback.osd(&value)?;
    Ok(StatusResponse::ok())
}

// ============================================================================
// Raw engine access
// ============================================================================

/// POST /api/player/command
pub async fn command(
    State(ctx): State<AppContext>,
    body: Result<Json<CommandRequest>, JsonRejection>,
) -> ApiResult<Json<StatusResponse>> {
    let Json(request) = body?;
    ctx.playback.player().set_command(request.args)?;
    Ok(StatusResponse::ok())
}

/// POST /api/player/option
pub async fn set_option(
    State(ctx): State<AppContext>,
    body: Result<Json<KeyValueRequest>, JsonRejection>,
) -> ApiResult<Json<StatusResponse>> {
    let Json(request) = body?;
    ctx.playback.player().set_option(&request.key, &request.value)?;
    Ok(StatusResponse::ok())
}

/// POST /api/player/property
pub async fn set_property(
    State(ctx): State<AppContext>,
    body: Result<Json<KeyValueRequest>, JsonRejection>,
) -> ApiResult<Json<StatusResponse>> {
    let Json(request) = body?;
    ctx.playback.player().set_property(&request.key, &request.value)?;
    Ok(StatusResponse::ok())
}
