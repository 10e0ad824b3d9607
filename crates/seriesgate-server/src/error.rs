//! API error types with HTTP status code mapping.
//!
//! [`ApiError`] covers request-level failures only. Failures of individual
//! queries are part of a successful `/query` response body and never turn
//! into HTTP errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Structured error detail in API responses.
#[derive(Debug, Clone, Serialize)]
pub struct ApiErrorDetail {
    /// Machine-readable error code (e.g., "BAD_REQUEST").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request envelope could not be decoded (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The remote service is unreachable or credentials are missing (503).
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// Internal server error (500).
    #[error("internal error: {0}")]
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE", msg),
            ApiError::InternalError(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg)
            }
        };

        let body = serde_json::json!({
            "success": false,
            "error": ApiErrorDetail {
                code: code.to_string(),
                message,
            },
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<seriesgate_engine::ConfigError> for ApiError {
    fn from(err: seriesgate_engine::ConfigError) -> Self {
        ApiError::Unavailable(err.to_string())
    }
}

impl From<seriesgate_engine::TransportError> for ApiError {
    fn from(err: seriesgate_engine::TransportError) -> Self {
        match err {
            seriesgate_engine::TransportError::Status { .. }
            | seriesgate_engine::TransportError::Request(_) => {
                ApiError::Unavailable(err.to_string())
            }
            seriesgate_engine::TransportError::Decode(_) => ApiError::InternalError(err.to_string()),
        }
    }
}
