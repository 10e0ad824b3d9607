//! Per-query error taxonomy.
//!
//! Every failure the engine can attach to a single refId is a [`QueryError`].
//! Each variant has a stable machine-readable [`QueryError::kind`] so the host
//! runtime (and operators reading logs) can tell, for example, a remote
//! "channel not found" apart from a chunk that never reached the service.

use thiserror::Error;

/// Errors attached to exactly one query in a batch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    /// The query payload could not be decoded.
    #[error("malformed query: {reason}")]
    Malformed { reason: String },

    /// A required field is missing or holds an invalid value.
    #[error("invalid query: {field} {rule}")]
    Validation { field: &'static str, rule: String },

    /// A template variable marker survived interpolation.
    #[error("unresolved template variable in {field}: '{value}' (select a value for the dashboard variable)")]
    UnresolvedVariable { field: &'static str, value: String },

    /// The batch compute call for the query's chunk failed outright.
    #[error("batch compute failed for chunk {chunk}: {reason}")]
    ChunkFailed { chunk: usize, reason: String },

    /// The remote service reported an error for this query's result.
    #[error("compute error {code} ({error_type})")]
    Remote { code: i64, error_type: String },

    /// The chunk response had no entry at this query's position.
    #[error("missing result at position {position} of chunk {chunk} ({received} result(s) for {expected} request(s))")]
    MissingResult {
        chunk: usize,
        position: usize,
        received: usize,
        expected: usize,
    },

    /// The result carried a tag this engine does not understand.
    #[error("unsupported compute result type '{tag}'")]
    UnsupportedResult { tag: String },

    /// The result at this position could not be decoded.
    #[error("malformed compute result: {reason}")]
    MalformedResult { reason: String },

    /// Connection settings could not be loaded for the batch.
    #[error("credentials unavailable: {reason}")]
    Credentials { reason: String },

    /// The batch was cancelled before this query completed.
    #[error("query cancelled before completion")]
    Cancelled,

    /// The batch deadline elapsed before this query completed.
    #[error("query timed out after {budget_ms}ms")]
    TimedOut { budget_ms: u64 },

    /// A connection test query failed.
    #[error("connection test failed: {reason}")]
    ConnectionTest { reason: String },
}

impl QueryError {
    /// Stable identifier of the error class.
    pub fn kind(&self) -> &'static str {
        match self {
            QueryError::Malformed { .. } => "MALFORMED_QUERY",
            QueryError::Validation { .. } => "VALIDATION_FAILED",
            QueryError::UnresolvedVariable { .. } => "UNRESOLVED_VARIABLE",
            QueryError::ChunkFailed { .. } => "BATCH_COMPUTE_FAILED",
            QueryError::Remote { .. } => "REMOTE_ERROR",
            QueryError::MissingResult { .. } => "MISSING_RESULT",
            QueryError::UnsupportedResult { .. } => "UNSUPPORTED_RESULT",
            QueryError::MalformedResult { .. } => "MALFORMED_RESULT",
            QueryError::Credentials { .. } => "CREDENTIALS_UNAVAILABLE",
            QueryError::Cancelled => "CANCELLED",
            QueryError::TimedOut { .. } => "TIMED_OUT",
            QueryError::ConnectionTest { .. } => "CONNECTION_TEST_FAILED",
        }
    }

    pub(crate) fn validation(field: &'static str, rule: impl Into<String>) -> Self {
        QueryError::Validation {
            field,
            rule: rule.into(),
        }
    }
}
