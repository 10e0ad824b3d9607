//! Query classification and validation.
//!
//! [`prepare`] runs the CPU-only front half of the pipeline for one query:
//! decode, interpolate, classify, validate. The result is either a
//! [`ValidatedQuery`] or the [`QueryError`] to report for that refId.

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::QueryError;
use crate::interpolate::{apply_template_variables, has_unresolved_marker};
use crate::model::{DataQuery, Query, QueryKind, TimeRange, CONNECTION_TEST_MARKER};

/// Bucket counts above this are accepted but flagged as a performance risk.
pub const BUCKET_WARNING_THRESHOLD: u64 = 10_000;

/// Validated fields of an asset/channel query.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetChannelTarget {
    pub asset_rid: String,
    pub channel: String,
    pub data_scope_name: Option<String>,
    pub bucket_count: u64,
    pub time_shift_seconds: i64,
    pub template_variables: IndexMap<String, Value>,
}

/// What a validated query resolves to.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryTarget {
    ConnectionTest,
    LegacyConstant { constant: f64 },
    LegacyText { text: String, constant: f64 },
    AssetChannel(AssetChannelTarget),
}

/// A query that passed validation. Immutable from here on.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedQuery {
    pub ref_id: String,
    pub time_range: TimeRange,
    pub target: QueryTarget,
    /// Non-fatal findings attached to the eventual series response.
    pub warnings: Vec<String>,
}

impl ValidatedQuery {
    pub fn kind(&self) -> QueryKind {
        match self.target {
            QueryTarget::ConnectionTest => QueryKind::ConnectionTest,
            QueryTarget::LegacyConstant { .. } => QueryKind::LegacyConstant,
            QueryTarget::LegacyText { .. } => QueryKind::LegacyText,
            QueryTarget::AssetChannel(_) => QueryKind::AssetChannel,
        }
    }
}

/// Determines the kind of an (interpolated) query.
///
/// Rules, in priority order: explicit connection-test marker, asset and
/// channel both present, legacy free text present, non-zero constant.
/// Returns `None` when none apply.
pub fn classify(query: &Query) -> Option<QueryKind> {
    if query.type_marker.as_deref() == Some(CONNECTION_TEST_MARKER) {
        return Some(QueryKind::ConnectionTest);
    }
    if !query.asset_rid.is_empty() && !query.channel.is_empty() {
        return Some(QueryKind::AssetChannel);
    }
    if !query.query_text.is_empty() {
        return Some(QueryKind::LegacyText);
    }
    match query.constant {
        Some(c) if c != 0.0 => Some(QueryKind::LegacyConstant),
        _ => None,
    }
}

/// Classifies and validates an already interpolated query.
pub fn validate(query: Query, bucket_warning_threshold: u64) -> Result<ValidatedQuery, QueryError> {
    let kind = classify(&query).ok_or_else(|| unrecognized_intent(&query))?;

    let target = match kind {
        QueryKind::ConnectionTest => QueryTarget::ConnectionTest,
        QueryKind::LegacyConstant => QueryTarget::LegacyConstant {
            constant: query.constant.unwrap_or_default(),
        },
        QueryKind::LegacyText => QueryTarget::LegacyText {
            text: query.query_text.clone(),
            constant: query.constant.unwrap_or_default(),
        },
        QueryKind::AssetChannel => {
            let (target, warnings) = validate_asset_channel(&query, bucket_warning_threshold)?;
            return Ok(ValidatedQuery {
                ref_id: query.ref_id,
                time_range: query.time_range,
                target: QueryTarget::AssetChannel(target),
                warnings,
            });
        }
    };

    Ok(ValidatedQuery {
        ref_id: query.ref_id,
        time_range: query.time_range,
        target,
        warnings: Vec::new(),
    })
}

/// Decode, interpolate, classify and validate one host query.
pub fn prepare(
    data_query: &DataQuery,
    bucket_warning_threshold: u64,
) -> Result<ValidatedQuery, QueryError> {
    let mut query = Query::decode(data_query)?;
    apply_template_variables(&mut query);
    validate(query, bucket_warning_threshold)
}

fn validate_asset_channel(
    query: &Query,
    bucket_warning_threshold: u64,
) -> Result<(AssetChannelTarget, Vec<String>), QueryError> {
    let asset_rid = query.asset_rid.trim();
    if asset_rid.is_empty() {
        return Err(QueryError::validation("assetRid", "must not be blank"));
    }
    if has_unresolved_marker(asset_rid) {
        return Err(QueryError::UnresolvedVariable {
            field: "assetRid",
            value: asset_rid.to_string(),
        });
    }

    let channel = query.channel.trim();
    if channel.is_empty() {
        return Err(QueryError::validation("channel", "must not be blank"));
    }

    let data_scope_name = match query.data_scope_name.as_deref() {
        Some(scope) if scope.trim().is_empty() => {
            return Err(QueryError::validation(
                "dataScopeName",
                "must not be blank when present",
            ));
        }
        Some(scope) => Some(scope.trim().to_string()),
        None => None,
    };

    let bucket_count = u64::try_from(query.bucket_count).map_err(|_| {
        QueryError::validation(
            "bucketCount",
            format!("must be >= 0 (got {})", query.bucket_count),
        )
    })?;

    let mut warnings = Vec::new();
    if bucket_count > bucket_warning_threshold {
        warnings.push(format!(
            "bucketCount {} exceeds {} and may be slow to compute and render",
            bucket_count, bucket_warning_threshold
        ));
    }

    Ok((
        AssetChannelTarget {
            asset_rid: asset_rid.to_string(),
            channel: channel.to_string(),
            data_scope_name,
            bucket_count,
            time_shift_seconds: query.time_shift_seconds,
            template_variables: query.template_variables.clone(),
        },
        warnings,
    ))
}

fn unrecognized_intent(query: &Query) -> QueryError {
    if !query.asset_rid.trim().is_empty() {
        QueryError::validation("channel", "is required together with assetRid")
    } else if !query.channel.trim().is_empty() {
        QueryError::validation("assetRid", "is required together with channel")
    } else {
        QueryError::validation(
            "query",
            "has no recognizable intent (set assetRid and channel)",
        )
    }
}
