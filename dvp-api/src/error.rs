//! Error types for dvp-api

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Credential check failed (401)
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Conflict (409) - e.g., email already registered
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<dvp_common::Error> for ApiError {
    fn from(err: dvp_common::Error) -> Self {
        match err {
            dvp_common::Error::NotFound(msg) => ApiError::NotFound(msg),
            dvp_common::Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            dvp_common::Error::AuthenticationFailed(msg) => ApiError::Unauthorized(msg),
            dvp_common::Error::Conflict(msg) => ApiError::Conflict(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_FAILED", msg),
            ApiError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, "AUTHENTICATION_FAILED", msg)
            }
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Internal(msg) => {
                // Detail goes to the log; callers get a generic message
                tracing::error!("internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "success": false,
            "error": error_code,
            "message": message,
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
