//! HTTP API
//!
//! Thin axum surface over [`PlaybackService`](crate::playback::PlaybackService):
//! lifecycle, playback control, raw engine access, an SSE event stream and
//! static assets for the control panel.

pub mod error;
pub mod handlers;
pub mod server;
pub mod sse;

pub use error::{ApiError, ApiResult};
pub use server::{build_router, AppContext};
