//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use kobo_media::MediaError;
use kobo_twitch::TwitchError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Twitch error: {0}")]
    Twitch(#[from] TwitchError),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Media(e) if e.is_state_conflict() => StatusCode::CONFLICT,
            ApiError::Media(MediaError::NoPlayableStream { .. }) => StatusCode::NOT_FOUND,
            ApiError::Twitch(TwitchError::MissingCredentials) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Twitch(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) | ApiError::Media(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't expose internal error details in production
        let detail = match &self {
            ApiError::Internal(_) if is_production() => "An internal error occurred".to_string(),
            _ => self.to_string(),
        };

        (status, Json(ErrorResponse { detail })).into_response()
    }
}

fn is_production() -> bool {
    std::env::var("ENVIRONMENT").unwrap_or_default() == "production"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_conflicts_map_to_conflict() {
        assert_eq!(
            ApiError::from(MediaError::AlreadyRunning).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(MediaError::NotRunning).status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn missing_credentials_map_to_service_unavailable() {
        assert_eq!(
            ApiError::from(TwitchError::MissingCredentials).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
