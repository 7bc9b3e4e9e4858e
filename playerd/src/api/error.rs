//! HTTP error responses
//!
//! Every failure is answered as `{"err": "<message>"}`. Server-side failures
//! are logged in full and reported to the client as "internal error".

use crate::error::{Error, ErrorKind};
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

/// Message sent in place of any 5xx cause
pub const INTERNAL_ERROR_MESSAGE: &str = "internal error";

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub err: String,
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request body or parameters are unusable (400)
    #[error("{0}")]
    BadRequest(String),

    /// Error from the player core; status depends on its kind
    #[error(transparent)]
    Player(#[from] Error),

    /// Blocking task failed to complete (500)
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("invalid json: {}", rejection.body_text()))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Player(err) => match err.kind() {
                ErrorKind::AlreadyRunning | ErrorKind::NotRunning => StatusCode::CONFLICT,
                ErrorKind::FileNotFound => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = if status.is_server_error() {
            error!("Request failed ({}): {}", status.as_u16(), self);
            INTERNAL_ERROR_MESSAGE.to_string()
        } else {
            warn!("Request rejected ({}): {}", status.as_u16(), self);
            self.to_string()
        };

        (status, Json(ErrorResponse { err: message })).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
