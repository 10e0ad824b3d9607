//! Mapping chunk results back onto the queries that produced them.
//!
//! The remote API has no correlation ids: results are matched to requests
//! by position only. That assumption lives entirely in
//! [`PositionalReconciler`]; an id-correlated protocol would plug in another
//! [`ResultReconciler`] without touching chunking or dispatch.

use seriesgate_core::{plot_to_series, ComputeResult, QueryError, QueryResponse};
use tracing::warn;

use crate::chunk::Chunk;

/// Turns one chunk's result list into one response per chunk query.
pub trait ResultReconciler: Send + Sync {
    /// Must return exactly one `(refId, response)` pair for every query in
    /// `chunk`, whatever `results` contains.
    fn reconcile(&self, chunk: &Chunk, results: Vec<ComputeResult>) -> Vec<(String, QueryResponse)>;
}

/// Index-based reconciliation: result `i` belongs to query `i`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionalReconciler;

impl ResultReconciler for PositionalReconciler {
    fn reconcile(&self, chunk: &Chunk, results: Vec<ComputeResult>) -> Vec<(String, QueryResponse)> {
        let expected = chunk.len();
        let received = results.len();

        if received > expected {
            warn!(
                chunk = chunk.index,
                expected, received, "ignoring surplus compute results"
            );
        }

        chunk
            .queries
            .iter()
            .enumerate()
            .map(|(position, query)| {
                let response: QueryResponse = match results.get(position) {
                    Some(ComputeResult::Success(plot)) => {
                        QueryResponse::series(plot_to_series(&query.series_name, plot))
                            .with_warnings(query.warnings.clone())
                    }
                    Some(ComputeResult::Error(err)) => QueryError::Remote {
                        code: err.code,
                        error_type: err.error_type.clone(),
                    }
                    .into(),
                    Some(ComputeResult::Unknown { tag }) => {
                        QueryError::UnsupportedResult { tag: tag.clone() }.into()
                    }
                    Some(ComputeResult::Malformed { reason }) => {
                        warn!(chunk = chunk.index, position, %reason, "undecodable compute result");
                        QueryError::MalformedResult {
                            reason: reason.clone(),
                        }
                        .into()
                    }
                    None => QueryError::MissingResult {
                        chunk: chunk.index,
                        position,
                        received,
                        expected,
                    }
                    .into(),
                };
                (query.ref_id.clone(), response)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{partition, PendingQuery};
    use seriesgate_core::compute::{
        ComputableNode, ComputeContext, ComputeErrorResult, NumericPlot, NumericSeries,
        StringReference, Timestamp,
    };
    use seriesgate_core::compute::{ChannelSeries, ComputeRequest};
    use seriesgate_core::Plot;

    fn request() -> ComputeRequest {
        ComputeRequest {
            node: ComputableNode::Numeric {
                numeric: NumericSeries::Channel {
                    channel: ChannelSeries {
                        asset_rid: StringReference::variable("assetRid"),
                        channel: StringReference::literal("c"),
                        data_scope_name: None,
                    },
                },
            },
            start: Timestamp { seconds: 0, nanos: 0 },
            end: Timestamp { seconds: 10, nanos: 0 },
            context: ComputeContext::default(),
        }
    }

    fn chunk_of(n: usize) -> Chunk {
        let items = (0..n)
            .map(|i| {
                (
                    PendingQuery {
                        ref_id: format!("Q{}", i),
                        series_name: format!("channel-{}", i),
                        warnings: Vec::new(),
                    },
                    request(),
                )
            })
            .collect();
        partition(items, 300).remove(0)
    }

    fn success(value: f64) -> ComputeResult {
        ComputeResult::Success(Plot::Numeric(NumericPlot {
            timestamps: vec![Timestamp { seconds: 1, nanos: 0 }],
            values: vec![value],
        }))
    }

    #[test]
    fn results_map_by_position() {
        let chunk = chunk_of(3);
        let out = PositionalReconciler.reconcile(&chunk, vec![success(0.0), success(1.0), success(2.0)]);
        for (i, (ref_id, response)) in out.iter().enumerate() {
            assert_eq!(ref_id, &format!("Q{}", i));
            let series = response.as_series().unwrap();
            assert_eq!(series.name, format!("channel-{}", i));
            assert_eq!(series.values, vec![i as f64]);
        }
    }

    #[test]
    fn remote_error_only_affects_its_query() {
        let chunk = chunk_of(3);
        let out = PositionalReconciler.reconcile(
            &chunk,
            vec![
                success(0.0),
                ComputeResult::Error(ComputeErrorResult {
                    code: 404,
                    error_type: "CHANNEL_NOT_FOUND".to_string(),
                }),
                success(2.0),
            ],
        );
        assert!(!out[0].1.is_error());
        let err = out[1].1.as_error().unwrap();
        assert!(err.message.contains("404"));
        assert!(err.message.contains("CHANNEL_NOT_FOUND"));
        assert!(!out[2].1.is_error());
    }

    #[test]
    fn short_response_marks_only_the_tail_missing() {
        let chunk = chunk_of(4);
        let out = PositionalReconciler.reconcile(&chunk, vec![success(0.0), success(1.0)]);
        assert_eq!(out.len(), 4);
        assert!(!out[0].1.is_error());
        assert!(!out[1].1.is_error());
        for (_, response) in &out[2..] {
            assert_eq!(response.as_error().unwrap().kind, "MISSING_RESULT");
        }
    }

    #[test]
    fn surplus_results_are_ignored() {
        let chunk = chunk_of(1);
        let out = PositionalReconciler.reconcile(&chunk, vec![success(5.0), success(6.0)]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].1.as_series().unwrap().values, vec![5.0]);
    }

    #[test]
    fn unknown_result_tag_is_unsupported() {
        let chunk = chunk_of(1);
        let out = PositionalReconciler.reconcile(
            &chunk,
            vec![ComputeResult::Unknown {
                tag: "partial".to_string(),
            }],
        );
        assert_eq!(out[0].1.as_error().unwrap().kind, "UNSUPPORTED_RESULT");
    }

    #[test]
    fn malformed_result_only_fails_its_position() {
        let chunk = chunk_of(3);
        let out = PositionalReconciler.reconcile(
            &chunk,
            vec![
                success(0.0),
                ComputeResult::Malformed {
                    reason: "invalid type: null, expected f64".to_string(),
                },
                success(2.0),
            ],
        );
        assert_eq!(out[0].1.as_series().unwrap().values, vec![0.0]);
        let err = out[1].1.as_error().unwrap();
        assert_eq!(err.kind, "MALFORMED_RESULT");
        assert!(err.message.contains("expected f64"));
        assert_eq!(out[2].1.as_series().unwrap().values, vec![2.0]);
    }

    #[test]
    fn unknown_plot_shape_is_an_empty_success() {
        let chunk = chunk_of(1);
        let out = PositionalReconciler.reconcile(
            &chunk,
            vec![ComputeResult::Success(Plot::Unknown {
                tag: "enum".to_string(),
            })],
        );
        assert!(!out[0].1.is_error());
        let series = out[0].1.as_series().unwrap();
        assert_eq!(series.name, "channel-0");
        assert!(series.is_empty());
    }

    #[test]
    fn empty_numeric_plot_is_an_empty_success() {
        let chunk = chunk_of(1);
        let out = PositionalReconciler.reconcile(
            &chunk,
            vec![ComputeResult::Success(Plot::Numeric(NumericPlot::default()))],
        );
        assert!(!out[0].1.is_error());
        let series = out[0].1.as_series().unwrap();
        assert_eq!(series.name, "channel-0");
        assert!(series.times.is_empty());
        assert!(series.values.is_empty());
    }

    #[test]
    fn warnings_follow_successful_series() {
        let mut chunk = chunk_of(1);
        chunk.queries[0].warnings.push("slow".to_string());
        let out = PositionalReconciler.reconcile(&chunk, vec![success(1.0)]);
        match &out[0].1 {
            QueryResponse::Series { warnings, .. } => assert_eq!(warnings, &vec!["slow".to_string()]),
            other => panic!("unexpected {:?}", other),
        }
    }
}
