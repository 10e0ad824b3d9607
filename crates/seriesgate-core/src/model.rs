//! Host-facing query model.
//!
//! The host dashboard runtime submits a [`QueryDataRequest`] holding one
//! [`DataQuery`] per panel query. Each `DataQuery` carries its per-query
//! editor model as raw JSON; [`Query::decode`] turns that into a [`Query`],
//! failing only for the one refId whose payload is malformed.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::QueryError;

/// Bucket count used when the query model does not specify one.
pub const DEFAULT_BUCKET_COUNT: i64 = 1000;

/// Type marker that selects a connection test.
pub const CONNECTION_TEST_MARKER: &str = "connectionTest";

/// Inclusive time window of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// Connection settings carried inline with a request, mirroring datasource
/// instance settings configured in the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasourceSettings {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
}

/// A batch of queries submitted together in one evaluation cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryDataRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datasource: Option<DatasourceSettings>,
    pub queries: Vec<DataQuery>,
}

/// One panel query as delivered by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQuery {
    /// Caller-assigned identifier, unique within the batch.
    pub ref_id: String,
    /// Explicit query type marker; takes precedence over the model's `type`.
    #[serde(default)]
    pub query_type: String,
    pub time_range: TimeRange,
    /// Raw editor model.
    #[serde(default)]
    pub json: Value,
}

/// The kind of work a query asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QueryKind {
    ConnectionTest,
    LegacyConstant,
    LegacyText,
    AssetChannel,
}

impl QueryKind {
    /// Whether queries of this kind go through chunked batch compute.
    pub fn is_batchable(self) -> bool {
        matches!(self, QueryKind::AssetChannel)
    }
}

/// Wire shape of the per-query editor model. Every field is optional so that
/// partially filled editors still decode.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryModel {
    #[serde(rename = "type", default)]
    type_marker: Option<String>,
    #[serde(default)]
    asset_rid: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    data_scope_name: Option<String>,
    #[serde(default)]
    bucket_count: Option<i64>,
    #[serde(default)]
    time_shift_seconds: Option<i64>,
    #[serde(default)]
    query_text: Option<String>,
    #[serde(default)]
    constant: Option<f64>,
    #[serde(default)]
    template_variables: Option<IndexMap<String, Value>>,
}

/// A decoded panel query, before interpolation and validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub ref_id: String,
    pub type_marker: Option<String>,
    pub asset_rid: String,
    pub channel: String,
    pub data_scope_name: Option<String>,
    pub bucket_count: i64,
    pub time_shift_seconds: i64,
    pub query_text: String,
    pub constant: Option<f64>,
    pub template_variables: IndexMap<String, Value>,
    pub time_range: TimeRange,
}

impl Query {
    /// Decodes the raw editor model of a [`DataQuery`].
    ///
    /// A `null` model decodes as an empty one; any other shape that does not
    /// match the model is [`QueryError::Malformed`].
    pub fn decode(data_query: &DataQuery) -> Result<Query, QueryError> {
        let model: QueryModel = match &data_query.json {
            Value::Null => QueryModel::default(),
            raw => serde_json::from_value(raw.clone()).map_err(|err| QueryError::Malformed {
                reason: err.to_string(),
            })?,
        };

        let type_marker = if data_query.query_type.is_empty() {
            model.type_marker.filter(|t| !t.is_empty())
        } else {
            Some(data_query.query_type.clone())
        };

        Ok(Query {
            ref_id: data_query.ref_id.clone(),
            type_marker,
            asset_rid: model.asset_rid.unwrap_or_default(),
            channel: model.channel.unwrap_or_default(),
            data_scope_name: model.data_scope_name,
            bucket_count: model.bucket_count.unwrap_or(DEFAULT_BUCKET_COUNT),
            time_shift_seconds: model.time_shift_seconds.unwrap_or(0),
            query_text: model.query_text.unwrap_or_default(),
            constant: model.constant,
            template_variables: model.template_variables.unwrap_or_default(),
            time_range: data_query.time_range,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data_query(query_type: &str, json: Value) -> DataQuery {
        DataQuery {
            ref_id: "A".to_string(),
            query_type: query_type.to_string(),
            time_range: TimeRange {
                from: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
                to: DateTime::from_timestamp(1_700_003_600, 0).unwrap(),
            },
            json,
        }
    }

    #[test]
    fn decodes_asset_channel_model() {
        let query = Query::decode(&data_query(
            "",
            json!({
                "assetRid": "ri.asset.1",
                "channel": "temperature",
                "dataScopeName": "car",
                "bucketCount": 250,
                "templateVariables": {"site": "north"}
            }),
        ))
        .unwrap();

        assert_eq!(query.ref_id, "A");
        assert_eq!(query.asset_rid, "ri.asset.1");
        assert_eq!(query.channel, "temperature");
        assert_eq!(query.data_scope_name.as_deref(), Some("car"));
        assert_eq!(query.bucket_count, 250);
        assert_eq!(query.template_variables["site"], json!("north"));
        assert_eq!(query.type_marker, None);
    }

    #[test]
    fn missing_bucket_count_uses_default() {
        let query = Query::decode(&data_query("", json!({"channel": "x"}))).unwrap();
        assert_eq!(query.bucket_count, DEFAULT_BUCKET_COUNT);
    }

    #[test]
    fn envelope_query_type_wins_over_model_type() {
        let query = Query::decode(&data_query(
            CONNECTION_TEST_MARKER,
            json!({"type": "other"}),
        ))
        .unwrap();
        assert_eq!(query.type_marker.as_deref(), Some(CONNECTION_TEST_MARKER));

        let query = Query::decode(&data_query("", json!({"type": "connectionTest"}))).unwrap();
        assert_eq!(query.type_marker.as_deref(), Some(CONNECTION_TEST_MARKER));
    }

    #[test]
    fn null_model_decodes_empty() {
        let query = Query::decode(&data_query("", Value::Null)).unwrap();
        assert!(query.asset_rid.is_empty());
        assert!(query.template_variables.is_empty());
    }

    #[test]
    fn wrong_field_type_is_malformed() {
        let err = Query::decode(&data_query("", json!({"bucketCount": "lots"}))).unwrap_err();
        assert_eq!(err.kind(), "MALFORMED_QUERY");

        let err = Query::decode(&data_query("", json!([1, 2, 3]))).unwrap_err();
        assert!(matches!(err, QueryError::Malformed { .. }));
    }
}
