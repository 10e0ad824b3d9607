//! Compute request construction for asset/channel queries.
//!
//! The expression tree never embeds the asset RID: the channel node refers
//! to the variable [`ASSET_RID_VARIABLE`] and the concrete RID travels in the
//! request's variable context. Channel and data scope are literals.

use crate::classify::AssetChannelTarget;
use crate::compute::{
    ChannelSeries, ComputableNode, ComputeContext, ComputeRequest, NumericSeries, ShiftDuration,
    StringReference, SummarizeSeries, TimeShiftSeries, Timestamp, VariableValue,
};
use crate::model::TimeRange;

/// Name of the context variable holding the query's asset RID.
pub const ASSET_RID_VARIABLE: &str = "assetRid";

/// Builds the compute request for one validated asset/channel query.
pub fn build_compute_request(target: &AssetChannelTarget, time_range: &TimeRange) -> ComputeRequest {
    let channel = NumericSeries::Channel {
        channel: ChannelSeries {
            asset_rid: StringReference::variable(ASSET_RID_VARIABLE),
            channel: StringReference::literal(target.channel.clone()),
            data_scope_name: target
                .data_scope_name
                .as_ref()
                .map(|scope| StringReference::literal(scope.clone())),
        },
    };

    let shifted = NumericSeries::TimeShift {
        time_shift: TimeShiftSeries {
            input: Box::new(channel),
            duration: ShiftDuration {
                seconds: target.time_shift_seconds,
                nanos: 0,
            },
        },
    };

    let summarized = NumericSeries::Summarize {
        summarize: SummarizeSeries {
            input: Box::new(shifted),
            buckets: target.bucket_count,
        },
    };

    ComputeRequest {
        node: ComputableNode::Numeric {
            numeric: summarized,
        },
        start: Timestamp::from_datetime_truncated(&time_range.from),
        end: Timestamp::from_datetime_truncated(&time_range.to),
        context: build_context(target),
    }
}

/// The asset RID binding plus one binding per string-valued template
/// variable. Non-string values cannot be bound and are skipped. A template
/// variable named like the asset RID variable never overrides the query's
/// own RID.
fn build_context(target: &AssetChannelTarget) -> ComputeContext {
    let mut context = ComputeContext::default();
    context.variables.insert(
        ASSET_RID_VARIABLE.to_string(),
        VariableValue::String {
            string: target.asset_rid.clone(),
        },
    );
    for (name, value) in &target.template_variables {
        if name == ASSET_RID_VARIABLE {
            continue;
        }
        if let Some(s) = value.as_str() {
            context.variables.insert(
                name.clone(),
                VariableValue::String {
                    string: s.to_string(),
                },
            );
        }
    }
    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use indexmap::IndexMap;
    use serde_json::json;

    fn target() -> AssetChannelTarget {
        let mut vars = IndexMap::new();
        vars.insert("site".to_string(), json!("north"));
        vars.insert("limit".to_string(), json!(5));
        vars.insert("assetRid".to_string(), json!("ri.asset.override"));
        AssetChannelTarget {
            asset_rid: "ri.asset.1".to_string(),
            channel: "temperature".to_string(),
            data_scope_name: Some("car".to_string()),
            bucket_count: 500,
            time_shift_seconds: 0,
            template_variables: vars,
        }
    }

    fn range() -> TimeRange {
        let from: DateTime<Utc> = DateTime::from_timestamp(1_700_000_000, 900_000_000).unwrap();
        let to: DateTime<Utc> = DateTime::from_timestamp(1_700_003_600, 123).unwrap();
        TimeRange { from, to }
    }

    #[test]
    fn wire_shape_of_built_request() {
        let request = build_compute_request(&target(), &range());
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "node": {"type": "numeric", "numeric": {
                    "type": "summarize",
                    "summarize": {
                        "buckets": 500,
                        "input": {
                            "type": "timeShift",
                            "timeShift": {
                                "duration": {"seconds": 0, "nanos": 0},
                                "input": {
                                    "type": "channel",
                                    "channel": {
                                        "assetRid": {"type": "variable", "variable": "assetRid"},
                                        "channel": {"type": "literal", "literal": "temperature"},
                                        "dataScopeName": {"type": "literal", "literal": "car"}
                                    }
                                }
                            }
                        }
                    }
                }},
                "start": {"seconds": 1_700_000_000, "nanos": 0},
                "end": {"seconds": 1_700_003_600, "nanos": 0},
                "context": {"variables": {
                    "assetRid": {"type": "string", "string": "ri.asset.1"},
                    "site": {"type": "string", "string": "north"}
                }}
            })
        );
    }

    #[test]
    fn context_skips_non_string_variables() {
        let request = build_compute_request(&target(), &range());
        let names: Vec<&str> = request
            .context
            .variables
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(names, vec!["assetRid", "site"]);
    }

    #[test]
    fn missing_scope_is_omitted_and_shift_is_carried() {
        let mut t = target();
        t.data_scope_name = None;
        t.time_shift_seconds = -3600;
        let request = build_compute_request(&t, &range());

        let ComputableNode::Numeric { numeric } = &request.node;
        let NumericSeries::Summarize { summarize } = numeric else {
            panic!("expected summarize root");
        };
        let NumericSeries::TimeShift { time_shift } = summarize.input.as_ref() else {
            panic!("expected time shift");
        };
        assert_eq!(time_shift.duration.seconds, -3600);
        let NumericSeries::Channel { channel } = time_shift.input.as_ref() else {
            panic!("expected channel");
        };
        assert_eq!(channel.data_scope_name, None);
        assert_eq!(channel.asset_rid, StringReference::variable("assetRid"));
    }
}
