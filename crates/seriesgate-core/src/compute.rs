//! Wire types of the remote batch-compute API.
//!
//! Unions on the wire are encoded as `{"type": "<tag>", "<tag>": {...}}`.
//! Request-side types serialize through serde's internally tagged enums.
//! Result-side unions ([`ComputeResult`], [`Plot`]) are decoded by hand so an
//! unknown tag becomes an explicit `Unknown` variant instead of a decode
//! failure; new server-side shapes must never break a whole chunk.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Instant as seconds plus nanoseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp {
    pub seconds: i64,
    #[serde(default)]
    pub nanos: i64,
}

impl Timestamp {
    /// Whole-second timestamp; sub-second precision is dropped.
    pub fn from_datetime_truncated(instant: &DateTime<Utc>) -> Self {
        Timestamp {
            seconds: instant.timestamp(),
            nanos: 0,
        }
    }

    /// Converts to an absolute instant. `None` when out of range.
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        let nanos = u32::try_from(self.nanos).ok()?;
        DateTime::from_timestamp(self.seconds, nanos)
    }
}

/// Duration as seconds plus nanoseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftDuration {
    pub seconds: i64,
    pub nanos: i64,
}

/// A string operand: either an inline literal or a name resolved from the
/// request's variable context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StringReference {
    Literal { literal: String },
    Variable { variable: String },
}

impl StringReference {
    pub fn literal(value: impl Into<String>) -> Self {
        StringReference::Literal {
            literal: value.into(),
        }
    }

    pub fn variable(name: impl Into<String>) -> Self {
        StringReference::Variable {
            variable: name.into(),
        }
    }
}

/// Raw channel data of one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSeries {
    pub asset_rid: StringReference,
    pub channel: StringReference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_scope_name: Option<StringReference>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeShiftSeries {
    pub input: Box<NumericSeries>,
    pub duration: ShiftDuration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummarizeSeries {
    pub input: Box<NumericSeries>,
    pub buckets: u64,
}

/// Numeric series expression tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NumericSeries {
    Channel {
        channel: ChannelSeries,
    },
    TimeShift {
        #[serde(rename = "timeShift")]
        time_shift: TimeShiftSeries,
    },
    Summarize {
        summarize: SummarizeSeries,
    },
}

/// Root of a computation graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ComputableNode {
    Numeric { numeric: NumericSeries },
}

/// A bound variable value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum VariableValue {
    String { string: String },
}

/// Variable bindings resolved by the service when evaluating a node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeContext {
    pub variables: IndexMap<String, VariableValue>,
}

/// One subrequest of a batch compute call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeRequest {
    pub node: ComputableNode,
    pub start: Timestamp,
    pub end: Timestamp,
    pub context: ComputeContext,
}

/// Body of a batch compute call.
#[derive(Debug, Clone, Serialize)]
pub struct BatchComputeRequest<'a> {
    pub requests: &'a [ComputeRequest],
}

/// Body returned by a batch compute call.
///
/// Each element of `results` is decoded on its own; an element that fails to
/// decode becomes [`ComputeResult::Malformed`] at its position.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchComputeResponse {
    #[serde(default, deserialize_with = "decode_each_result")]
    pub results: Vec<ComputeResult>,
}

fn decode_each_result<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<ComputeResult>, D::Error> {
    let raw = Vec::<Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|value| {
            serde_json::from_value(value).unwrap_or_else(|err| ComputeResult::Malformed {
                reason: err.to_string(),
            })
        })
        .collect())
}

/// Remote business error attached to one result.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeErrorResult {
    pub code: i64,
    pub error_type: String,
}

/// Point series.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NumericPlot {
    #[serde(default)]
    pub timestamps: Vec<Timestamp>,
    #[serde(default)]
    pub values: Vec<f64>,
}

/// Summary statistics of one time bucket.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NumericBucket {
    pub mean: f64,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub count: Option<u64>,
}

/// Bucketed series, one bucket per timestamp.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BucketedNumericPlot {
    #[serde(default)]
    pub timestamps: Vec<Timestamp>,
    #[serde(default)]
    pub buckets: Vec<NumericBucket>,
}

/// Payload shape of a successful result.
#[derive(Debug, Clone, PartialEq)]
pub enum Plot {
    Numeric(NumericPlot),
    BucketedNumeric(BucketedNumericPlot),
    /// A shape this engine does not understand yet.
    Unknown { tag: String },
}

/// One element of a batch compute response.
#[derive(Debug, Clone, PartialEq)]
pub enum ComputeResult {
    Success(Plot),
    Error(ComputeErrorResult),
    /// A result tag this engine does not understand.
    Unknown { tag: String },
    /// An element of the response that did not decode.
    Malformed { reason: String },
}

#[derive(Deserialize)]
struct TaggedUnion {
    #[serde(rename = "type")]
    tag: String,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl TaggedUnion {
    fn take<T: DeserializeOwned, E: de::Error>(&mut self) -> Result<T, E> {
        let payload = self.fields.remove(&self.tag).ok_or_else(|| {
            E::custom(format!("union tagged '{}' has no '{}' field", self.tag, self.tag))
        })?;
        serde_json::from_value(payload).map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Plot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut union = TaggedUnion::deserialize(deserializer)?;
        match union.tag.as_str() {
            "numeric" => Ok(Plot::Numeric(union.take()?)),
            "bucketedNumeric" => Ok(Plot::BucketedNumeric(union.take()?)),
            _ => Ok(Plot::Unknown { tag: union.tag }),
        }
    }
}

impl<'de> Deserialize<'de> for ComputeResult {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut union = TaggedUnion::deserialize(deserializer)?;
        match union.tag.as_str() {
            "success" => Ok(ComputeResult::Success(union.take()?)),
            "error" => Ok(ComputeResult::Error(union.take()?)),
            _ => Ok(ComputeResult::Unknown { tag: union.tag }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_success_error_and_unknown_results() {
        let raw = json!({
            "results": [
                {"type": "success", "success": {"type": "numeric", "numeric": {
                    "timestamps": [{"seconds": 10, "nanos": 5}],
                    "values": [1.5]
                }}},
                {"type": "error", "error": {"code": 404, "errorType": "CHANNEL_NOT_FOUND"}},
                {"type": "somethingNew", "somethingNew": {}}
            ]
        });
        let response: BatchComputeResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(response.results.len(), 3);

        match &response.results[0] {
            ComputeResult::Success(Plot::Numeric(plot)) => {
                assert_eq!(plot.timestamps, vec![Timestamp { seconds: 10, nanos: 5 }]);
                assert_eq!(plot.values, vec![1.5]);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            response.results[1],
            ComputeResult::Error(ComputeErrorResult {
                code: 404,
                error_type: "CHANNEL_NOT_FOUND".to_string()
            })
        );
        assert_eq!(
            response.results[2],
            ComputeResult::Unknown {
                tag: "somethingNew".to_string()
            }
        );
    }

    #[test]
    fn unknown_plot_shape_is_not_an_error() {
        let result: ComputeResult = serde_json::from_value(json!({
            "type": "success",
            "success": {"type": "enum", "enum": {"values": ["a"]}}
        }))
        .unwrap();
        assert_eq!(
            result,
            ComputeResult::Success(Plot::Unknown {
                tag: "enum".to_string()
            })
        );
    }

    #[test]
    fn bucketed_plot_decodes_optional_stats() {
        let plot: Plot = serde_json::from_value(json!({
            "type": "bucketedNumeric",
            "bucketedNumeric": {
                "timestamps": [{"seconds": 1}],
                "buckets": [{"mean": 2.0, "min": 1.0, "max": 3.0, "count": 4}]
            }
        }))
        .unwrap();
        match plot {
            Plot::BucketedNumeric(b) => {
                assert_eq!(b.timestamps[0].nanos, 0);
                assert_eq!(b.buckets[0].mean, 2.0);
                assert_eq!(b.buckets[0].count, Some(4));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn undecodable_result_only_affects_its_position() {
        let raw = json!({
            "results": [
                {"type": "success", "success": {"type": "numeric", "numeric": {
                    "timestamps": [{"seconds": 1}], "values": [2.0]
                }}},
                {"type": "success", "success": {"type": "numeric", "numeric": {
                    "timestamps": [{"seconds": 1}], "values": [null]
                }}},
                {"type": "error", "error": {"code": "404", "errorType": "X"}},
                {"success": {}}
            ]
        });
        let response: BatchComputeResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(response.results.len(), 4);
        assert!(matches!(response.results[0], ComputeResult::Success(Plot::Numeric(_))));
        for result in &response.results[1..] {
            assert!(
                matches!(result, ComputeResult::Malformed { .. }),
                "expected malformed, got {:?}",
                result
            );
        }
    }

    #[test]
    fn union_without_payload_is_rejected() {
        let err = serde_json::from_value::<ComputeResult>(json!({"type": "error"})).unwrap_err();
        assert!(err.to_string().contains("no 'error' field"));
    }

    #[test]
    fn timestamp_conversion() {
        let ts = Timestamp {
            seconds: 1_700_000_000,
            nanos: 250_000_000,
        };
        let dt = ts.to_datetime().unwrap();
        assert_eq!(dt.timestamp(), 1_700_000_000);
        assert_eq!(dt.timestamp_subsec_millis(), 250);

        assert!(Timestamp { seconds: 0, nanos: -1 }.to_datetime().is_none());

        let truncated = Timestamp::from_datetime_truncated(&dt);
        assert_eq!(truncated, Timestamp { seconds: 1_700_000_000, nanos: 0 });
    }
}
