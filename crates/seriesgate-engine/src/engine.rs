//! Batch execution.
//!
//! [`QueryEngine::execute`] runs one host batch end to end:
//!
//! 1. load connection settings once (failure fails every query),
//! 2. prepare every query (decode, interpolate, classify, validate),
//! 3. answer immediate queries (legacy constant/text, connection tests),
//! 4. build compute requests for asset/channel queries, chunk and dispatch
//!    them, reconcile each chunk's results.
//!
//! Every refId in the request ends up with exactly one response.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use seriesgate_core::classify::QueryTarget;
use seriesgate_core::{
    build_compute_request, prepare, QueryDataRequest, QueryDataResponse, QueryError,
    QueryResponse, TimeRange, TimeSeries, ValidatedQuery,
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::chunk::{partition, wait_for_deadline, Chunk, Dispatcher, PendingQuery};
use crate::client::ComputeClient;
use crate::config::EngineConfig;
use crate::credentials::{ConnectionSettings, CredentialSource};
use crate::reconcile::{PositionalReconciler, ResultReconciler};

/// Series name of a successful connection test.
pub const CONNECTION_TEST_SERIES: &str = "connectionTest";

/// Series name of a legacy constant query.
pub const CONSTANT_SERIES: &str = "constant";

/// Executes query batches against one shared compute client.
#[derive(Clone)]
pub struct QueryEngine {
    config: EngineConfig,
    client: Arc<dyn ComputeClient>,
    dispatcher: Dispatcher,
}

/// Queries of one batch after preparation, split by how they are answered.
#[derive(Default)]
struct Plan {
    responses: BTreeMap<String, QueryResponse>,
    connection_tests: Vec<String>,
    batchable: Vec<(PendingQuery, seriesgate_core::ComputeRequest)>,
}

impl QueryEngine {
    pub fn new(config: EngineConfig, client: Arc<dyn ComputeClient>) -> Self {
        Self::with_reconciler(config, client, Arc::new(PositionalReconciler))
    }

    pub fn with_reconciler(
        config: EngineConfig,
        client: Arc<dyn ComputeClient>,
        reconciler: Arc<dyn ResultReconciler>,
    ) -> Self {
        let config = config.normalized();
        let dispatcher = Dispatcher::new(client.clone(), reconciler, config.dispatch_concurrency);
        QueryEngine {
            config,
            client,
            dispatcher,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn client(&self) -> &Arc<dyn ComputeClient> {
        &self.client
    }

    /// Runs one batch. Never fails as a whole: every failure is reported on
    /// the narrowest set of affected refIds.
    pub async fn execute(
        &self,
        credentials: &dyn CredentialSource,
        request: &QueryDataRequest,
        cancel: &CancellationToken,
    ) -> QueryDataResponse {
        let batch_id = Uuid::new_v4();
        let span = info_span!("batch", %batch_id, queries = request.queries.len());
        self.execute_inner(credentials, request, cancel)
            .instrument(span)
            .await
    }

    async fn execute_inner(
        &self,
        credentials: &dyn CredentialSource,
        request: &QueryDataRequest,
        cancel: &CancellationToken,
    ) -> QueryDataResponse {
        let deadline = self
            .config
            .batch_timeout
            .map(|budget| (Instant::now() + budget, budget));

        let mut seen = HashSet::new();
        let queries: Vec<_> = request
            .queries
            .iter()
            .filter(|q| {
                let first = seen.insert(q.ref_id.as_str());
                if !first {
                    warn!(ref_id = %q.ref_id, "dropping query with duplicate refId");
                }
                first
            })
            .collect();

        let settings = match credentials.load() {
            Ok(settings) => settings,
            Err(err) => {
                warn!(error = %err, "credentials unavailable, failing whole batch");
                let err = QueryError::from(err);
                return QueryDataResponse {
                    responses: queries
                        .iter()
                        .map(|q| (q.ref_id.clone(), QueryResponse::from(err.clone())))
                        .collect(),
                };
            }
        };

        let mut plan = Plan::default();
        for data_query in &queries {
            match prepare(data_query, self.config.bucket_warning_threshold) {
                Ok(validated) => self.plan_query(&mut plan, validated),
                Err(err) => {
                    plan.responses
                        .insert(data_query.ref_id.clone(), QueryResponse::from(err));
                }
            }
        }

        let chunks = partition(std::mem::take(&mut plan.batchable), self.config.max_subrequests);
        info!(
            immediate = plan.responses.len(),
            connection_tests = plan.connection_tests.len(),
            batchable = chunks.iter().map(Chunk::len).sum::<usize>(),
            chunks = chunks.len(),
            "executing batch"
        );

        let (tests, chunked) = tokio::join!(
            self.run_connection_tests(&settings, &plan.connection_tests, cancel, deadline),
            self.dispatcher.dispatch_all(&settings, &chunks, cancel, deadline),
        );

        let mut responses = plan.responses;
        responses.extend(tests);
        responses.extend(chunked);

        let failed = responses.values().filter(|r| r.is_error()).count();
        info!(responses = responses.len(), failed, "batch complete");
        debug_assert_eq!(responses.len(), queries.len());

        QueryDataResponse { responses }
    }

    fn plan_query(&self, plan: &mut Plan, validated: ValidatedQuery) {
        for warning in &validated.warnings {
            warn!(ref_id = %validated.ref_id, "{}", warning);
        }

        match &validated.target {
            QueryTarget::ConnectionTest => plan.connection_tests.push(validated.ref_id),
            QueryTarget::LegacyConstant { constant } => {
                let series = constant_series(CONSTANT_SERIES, *constant, &validated.time_range);
                plan.responses
                    .insert(validated.ref_id, QueryResponse::series(series));
            }
            QueryTarget::LegacyText { text, constant } => {
                let series = constant_series(text, *constant, &validated.time_range);
                plan.responses
                    .insert(validated.ref_id, QueryResponse::series(series));
            }
            QueryTarget::AssetChannel(target) => {
                let request = build_compute_request(target, &validated.time_range);
                plan.batchable.push((
                    PendingQuery {
                        ref_id: validated.ref_id.clone(),
                        series_name: target.channel.clone(),
                        warnings: validated.warnings.clone(),
                    },
                    request,
                ));
            }
        }
    }

    async fn run_connection_tests(
        &self,
        settings: &ConnectionSettings,
        ref_ids: &[String],
        cancel: &CancellationToken,
        deadline: Option<(Instant, std::time::Duration)>,
    ) -> Vec<(String, QueryResponse)> {
        let mut out = Vec::with_capacity(ref_ids.len());
        for ref_id in ref_ids {
            let response: QueryResponse = tokio::select! {
                biased;
                _ = cancel.cancelled() => QueryError::Cancelled.into(),
                _ = wait_for_deadline(deadline) => QueryError::TimedOut {
                    budget_ms: deadline.map_or(0, |(_, budget)| budget.as_millis() as u64),
                }
                .into(),
                result = self.client.check_connection(settings) => match result {
                    Ok(()) => QueryResponse::series(TimeSeries::empty(CONNECTION_TEST_SERIES)),
                    Err(err) => {
                        warn!(ref_id = %ref_id, error = %err, "connection test failed");
                        QueryError::ConnectionTest { reason: err.to_string() }.into()
                    }
                },
            };
            out.push((ref_id.clone(), response));
        }
        out
    }
}

/// Two-point series holding `value` at both ends of the range.
fn constant_series(name: &str, value: f64, range: &TimeRange) -> TimeSeries {
    TimeSeries {
        name: name.to_string(),
        times: vec![range.from, range.to],
        values: vec![value, value],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    #[test]
    fn constant_series_spans_range() {
        let range = TimeRange {
            from: DateTime::from_timestamp(10, 0).unwrap(),
            to: DateTime::from_timestamp(20, 0).unwrap(),
        };
        let series = constant_series("constant", 42.0, &range);
        assert_eq!(series.values, vec![42.0, 42.0]);
        assert_eq!(series.times, vec![range.from, range.to]);
    }
}
