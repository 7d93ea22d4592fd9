//! Deadline-bounded fan-out over a [`Fetcher`].
//!
//! Every target gets its own tokio task; all of them are spawned before the
//! first completion is awaited. The collection loop then takes completions in
//! whatever order they arrive until either every task has reported or the
//! caller's deadline passes. At most one error survives: the first failure the
//! loop sees, or a timeout marker if the deadline is hit first.
//!
//! A timeout and a real failure can arrive at practically the same instant.
//! Which one is reported depends on which the loop observes first; that race
//! is left as is.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::{Id, JoinSet};
use tokio::time::Instant;

use crate::error::{AggregateError, FetchError};
use crate::fetcher::Fetcher;
use crate::types::Target;

/// Documents in completion order plus at most one representative error.
#[derive(Debug)]
pub struct AggregateResult<D> {
    pub documents: Vec<D>,
    pub error: Option<AggregateError>,
    failures: usize,
}

impl<D> AggregateResult<D> {
    fn empty() -> Self {
        Self {
            documents: Vec::new(),
            error: None,
            failures: 0,
        }
    }

    fn record_failure(&mut self, err: AggregateError) {
        self.failures += 1;
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    /// Number of failed outcomes the loop observed (the timeout marker is
    /// not counted).
    pub fn failures(&self) -> usize {
        self.failures
    }

    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_parts(self) -> (Vec<D>, Option<AggregateError>) {
        (self.documents, self.error)
    }
}

pub struct Aggregator<F> {
    fetcher: Arc<F>,
}

impl<F> Clone for Aggregator<F> {
    fn clone(&self) -> Self {
        Self {
            fetcher: Arc::clone(&self.fetcher),
        }
    }
}

impl<F> Aggregator<F>
where
    F: Fetcher + 'static,
{
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
        }
    }

    /// Fetch every target concurrently and collect what finishes by `deadline`.
    ///
    /// Returns promptly once `deadline` passes; tasks still in flight are
    /// aborted and their outcomes ignored. A deadline already in the past
    /// still collects anything that is ready without waiting.
    pub async fn aggregate(
        &self,
        targets: Vec<Target>,
        deadline: Instant,
    ) -> AggregateResult<F::Document> {
        let mut result = AggregateResult::empty();
        let total = targets.len();
        if total == 0 {
            return result;
        }

        tracing::debug!(
            target: "sourcegraph.fanout",
            targets = total,
            budget_ms = deadline.saturating_duration_since(Instant::now()).as_millis() as u64,
            "fanout.start"
        );

        let mut tasks = JoinSet::new();
        let mut owners: HashMap<Id, Target> = HashMap::with_capacity(total);
        for target in targets {
            let fetcher = Arc::clone(&self.fetcher);
            let owned = target.clone();
            let handle = tasks.spawn(async move { fetcher.fetch(&owned).await });
            owners.insert(handle.id(), target);
        }

        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(None) => break,
                Ok(Some(Ok(Ok(doc)))) => result.documents.push(doc),
                Ok(Some(Ok(Err(err)))) => {
                    tracing::debug!(target: "sourcegraph.fanout", error = %err, "fanout.failure");
                    result.record_failure(err.into());
                }
                Ok(Some(Err(join_err))) => {
                    let target = owners
                        .get(&join_err.id())
                        .map(Target::to_string)
                        .unwrap_or_default();
                    result.record_failure(
                        FetchError::Task {
                            target,
                            message: join_err.to_string(),
                        }
                        .into(),
                    );
                }
                Err(_elapsed) => {
                    let collected = result.documents.len() + result.failures;
                    let outstanding = total - collected;
                    tracing::warn!(
                        target: "sourcegraph.fanout",
                        collected,
                        outstanding,
                        "fanout.timeout"
                    );
                    if result.error.is_none() {
                        result.error = Some(AggregateError::Timeout {
                            collected,
                            outstanding,
                        });
                    }
                    tasks.abort_all();
                    break;
                }
            }
        }

        tracing::debug!(
            target: "sourcegraph.fanout",
            targets = total,
            documents = result.documents.len(),
            failures = result.failures,
            error = ?result.error,
            "fanout.done"
        );
        result
    }
}
