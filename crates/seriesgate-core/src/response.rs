//! Per-query responses returned to the host.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::QueryError;

/// A named series as two parallel, equal-length sequences.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimeSeries {
    pub name: String,
    pub times: Vec<DateTime<Utc>>,
    pub values: Vec<f64>,
}

impl TimeSeries {
    pub fn empty(name: impl Into<String>) -> Self {
        TimeSeries {
            name: name.into(),
            times: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// Structured error shown on the failed panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDetail {
    pub kind: String,
    pub message: String,
}

/// Exactly one of these is produced for every query in a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum QueryResponse {
    Series {
        series: TimeSeries,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        warnings: Vec<String>,
    },
    Error {
        error: ErrorDetail,
    },
}

impl QueryResponse {
    pub fn series(series: TimeSeries) -> Self {
        QueryResponse::Series {
            series,
            warnings: Vec::new(),
        }
    }

    /// Appends warnings to a series response; error responses are unchanged.
    pub fn with_warnings(mut self, extra: Vec<String>) -> Self {
        if let QueryResponse::Series { warnings, .. } = &mut self {
            warnings.extend(extra);
        }
        self
    }

    pub fn is_error(&self) -> bool {
        matches!(self, QueryResponse::Error { .. })
    }

    pub fn as_series(&self) -> Option<&TimeSeries> {
        match self {
            QueryResponse::Series { series, .. } => Some(series),
            QueryResponse::Error { .. } => None,
        }
    }

    pub fn as_error(&self) -> Option<&ErrorDetail> {
        match self {
            QueryResponse::Error { error } => Some(error),
            QueryResponse::Series { .. } => None,
        }
    }
}

impl From<QueryError> for QueryResponse {
    fn from(err: QueryError) -> Self {
        QueryResponse::Error {
            error: ErrorDetail {
                kind: err.kind().to_string(),
                message: err.to_string(),
            },
        }
    }
}

/// Responses of a whole batch keyed by refId.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryDataResponse {
    pub responses: BTreeMap<String, QueryResponse>,
}

impl QueryDataResponse {
    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    pub fn get(&self, ref_id: &str) -> Option<&QueryResponse> {
        self.responses.get(ref_id)
    }

    pub fn error_count(&self) -> usize {
        self.responses.values().filter(|r| r.is_error()).count()
    }
}
