//! Engine error types.
//!
//! [`TransportError`] covers a batch compute or connection-check call failing
//! as a whole. [`ConfigError`] covers engine configuration and credential
//! loading. Neither ever escapes a batch: the engine converts them into
//! per-query [`QueryError`]s attached to the affected refIds.

use seriesgate_core::QueryError;
use thiserror::Error;

/// Longest response body quoted in a [`TransportError::Status`].
const MAX_QUOTED_BODY: usize = 512;

/// A remote call that failed outright.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request could not be sent or the response not read.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("remote returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body was not a valid batch compute response.
    #[error("response decode failed: {0}")]
    Decode(#[from] serde_json::Error),
}

impl TransportError {
    pub fn status(status: u16, body: &str) -> Self {
        let body = match body.char_indices().nth(MAX_QUOTED_BODY) {
            Some((cut, _)) => format!("{}...", &body[..cut]),
            None => body.to_string(),
        };
        TransportError::Status { status, body }
    }
}

/// Configuration or credential loading failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("base URL is not configured")]
    MissingBaseUrl,

    #[error("base URL '{url}' is invalid: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("API key is not configured")]
    MissingApiKey,

    #[error("{var} must be a non-negative integer, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },
}

impl From<ConfigError> for QueryError {
    fn from(err: ConfigError) -> Self {
        QueryError::Credentials {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(2000);
        let err = TransportError::status(502, &body);
        let TransportError::Status { status, body } = err else {
            panic!("expected status error");
        };
        assert_eq!(status, 502);
        assert_eq!(body.len(), MAX_QUOTED_BODY + 3);
        assert!(body.ends_with("..."));
    }

    #[test]
    fn config_error_becomes_credentials_query_error() {
        let err: QueryError = ConfigError::MissingApiKey.into();
        assert_eq!(err.kind(), "CREDENTIALS_UNAVAILABLE");
        assert!(err.to_string().contains("API key"));
    }
}
