//! Chunking and dispatch of batchable queries.
//!
//! [`partition`] splits the ordered (query, request) pairs of a batch into
//! chunks of at most `max_subrequests`. [`Dispatcher`] issues one batch
//! compute call per chunk and hands each chunk's outcome to the
//! [`ResultReconciler`]. A chunk is the failure-isolation boundary: a
//! transport failure, cancellation or deadline only ever touches the queries
//! of the chunk it happened to.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use seriesgate_core::{ComputeRequest, ComputeResult, QueryError, QueryResponse};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::client::ComputeClient;
use crate::credentials::ConnectionSettings;
use crate::error::TransportError;
use crate::reconcile::ResultReconciler;

/// The per-query bookkeeping a chunk needs to answer its queries.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingQuery {
    pub ref_id: String,
    /// Name given to the resulting series (the query's channel).
    pub series_name: String,
    /// Validation warnings to attach to a successful series.
    pub warnings: Vec<String>,
}

/// An ordered, non-empty slice of a batch's batchable queries.
///
/// `queries[i]` produced `requests[i]`; both vectors always have the same
/// length.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Position of this chunk within the batch, starting at 0.
    pub index: usize,
    pub queries: Vec<PendingQuery>,
    pub requests: Vec<ComputeRequest>,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// The same error for every query of the chunk.
    pub fn fail_all(&self, err: QueryError) -> Vec<(String, QueryResponse)> {
        self.queries
            .iter()
            .map(|q| (q.ref_id.clone(), QueryResponse::from(err.clone())))
            .collect()
    }
}

/// Splits `items` into order-preserving chunks of at most `max_subrequests`.
///
/// Produces `ceil(len / max_subrequests)` chunks; only the last may be
/// smaller. A zero limit is treated as one.
pub fn partition(items: Vec<(PendingQuery, ComputeRequest)>, max_subrequests: usize) -> Vec<Chunk> {
    let limit = max_subrequests.max(1);
    let mut chunks: Vec<Chunk> = Vec::with_capacity(items.len().div_ceil(limit));

    for (query, request) in items {
        let needs_new = chunks.last().map_or(true, |c| c.len() >= limit);
        if needs_new {
            chunks.push(Chunk {
                index: chunks.len(),
                queries: Vec::with_capacity(limit),
                requests: Vec::with_capacity(limit),
            });
        }
        if let Some(chunk) = chunks.last_mut() {
            chunk.queries.push(query);
            chunk.requests.push(request);
        }
    }
    chunks
}

/// How a single chunk call ended.
#[derive(Debug)]
pub enum ChunkOutcome {
    Results(Vec<ComputeResult>),
    Failed(TransportError),
    Cancelled,
    TimedOut,
}

/// Issues chunk calls and reconciles their outcomes.
#[derive(Clone)]
pub struct Dispatcher {
    client: Arc<dyn ComputeClient>,
    reconciler: Arc<dyn ResultReconciler>,
    concurrency: usize,
}

impl Dispatcher {
    pub fn new(
        client: Arc<dyn ComputeClient>,
        reconciler: Arc<dyn ResultReconciler>,
        concurrency: usize,
    ) -> Self {
        Dispatcher {
            client,
            reconciler,
            concurrency: concurrency.max(1),
        }
    }

    /// Dispatches every chunk, at most `concurrency` at a time, and returns
    /// one response per chunk query.
    ///
    /// With a concurrency of 1 chunk `k + 1` is not started before chunk `k`
    /// completes.
    pub async fn dispatch_all(
        &self,
        settings: &ConnectionSettings,
        chunks: &[Chunk],
        cancel: &CancellationToken,
        deadline: Option<(Instant, Duration)>,
    ) -> Vec<(String, QueryResponse)> {
        let pending: Vec<_> = chunks
            .iter()
            .map(|chunk| self.run_chunk(settings, chunk, cancel, deadline))
            .collect();
        let per_chunk: Vec<Vec<(String, QueryResponse)>> = stream::iter(pending)
            .buffered(self.concurrency)
            .collect()
            .await;
        per_chunk.into_iter().flatten().collect()
    }

    async fn run_chunk(
        &self,
        settings: &ConnectionSettings,
        chunk: &Chunk,
        cancel: &CancellationToken,
        deadline: Option<(Instant, Duration)>,
    ) -> Vec<(String, QueryResponse)> {
        debug!(chunk = chunk.index, size = chunk.len(), "dispatching chunk");

        match self.call(settings, chunk, cancel, deadline).await {
            ChunkOutcome::Results(results) => {
                debug!(
                    chunk = chunk.index,
                    results = results.len(),
                    "chunk completed"
                );
                self.reconciler.reconcile(chunk, results)
            }
            ChunkOutcome::Failed(err) => {
                error!(chunk = chunk.index, size = chunk.len(), error = %err, "batch compute failed");
                chunk.fail_all(QueryError::ChunkFailed {
                    chunk: chunk.index,
                    reason: err.to_string(),
                })
            }
            ChunkOutcome::Cancelled => chunk.fail_all(QueryError::Cancelled),
            ChunkOutcome::TimedOut => chunk.fail_all(QueryError::TimedOut {
                budget_ms: deadline.map_or(0, |(_, budget)| budget.as_millis() as u64),
            }),
        }
    }

    async fn call(
        &self,
        settings: &ConnectionSettings,
        chunk: &Chunk,
        cancel: &CancellationToken,
        deadline: Option<(Instant, Duration)>,
    ) -> ChunkOutcome {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => ChunkOutcome::Cancelled,
            _ = wait_for_deadline(deadline) => ChunkOutcome::TimedOut,
            result = self.client.batch_compute(settings, &chunk.requests) => match result {
                Ok(results) => ChunkOutcome::Results(results),
                Err(err) => ChunkOutcome::Failed(err),
            },
        }
    }
}

/// Resolves at the deadline, or never when there is none.
pub(crate) async fn wait_for_deadline(deadline: Option<(Instant, Duration)>) {
    match deadline {
        Some((at, _)) => tokio::time::sleep_until(at).await,
        None => std::future::pending::<()>().await,
    }
}
