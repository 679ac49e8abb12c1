//! Wave dispatcher.
//!
//! Runs every item of a wave concurrently and returns once each item has a
//! terminal result. Per item:
//! - the executor is resolved from the [`ExecutorRegistry`]
//! - each attempt runs under the item's timeout with panics caught
//! - retryable outcomes are retried with backoff until attempts run out
//!
//! A failing, timing out or panicking item never affects its siblings.

mod registry;
mod retry;

pub use registry::ExecutorRegistry;

use crate::analyzer::ExecutionGraph;
use crate::scheduler::Wave;
use futures_util::FutureExt;
use retry::AttemptOutcome;
use std::collections::{BTreeMap, HashMap};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use waverun_core::error::WaverunError;
use waverun_core::plan::RetryPolicy;
use waverun_core::traits::{ExecutionContext, Executor};
use waverun_core::types::{
    CATEGORY_EXECUTOR_NOT_FOUND, ExecutionResult, RunId, SkipReason, WorkItem,
};

/// Dispatches waves onto tokio tasks.
#[derive(Debug)]
pub struct Dispatcher {
    registry: Arc<ExecutorRegistry>,
    retry: Arc<RetryPolicy>,
    type_limits: HashMap<String, Arc<Semaphore>>,
    run_id: RunId,
}

impl Dispatcher {
    /// Create a dispatcher.
    ///
    /// `type_caps` bounds how many items of one type execute at once,
    /// independently of how the scheduler filled the wave.
    pub fn new(
        registry: Arc<ExecutorRegistry>,
        retry: RetryPolicy,
        type_caps: &BTreeMap<String, usize>,
    ) -> Self {
        let type_limits = type_caps
            .iter()
            .map(|(item_type, &cap)| (item_type.clone(), Arc::new(Semaphore::new(cap.max(1)))))
            .collect();

        Self {
            registry,
            retry: Arc::new(retry),
            type_limits,
            run_id: RunId::new(),
        }
    }

    /// Attach the run id handed to executors.
    pub fn with_run_id(mut self, run_id: RunId) -> Self {
        self.run_id = run_id;
        self
    }

    /// The run id handed to executors.
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Execute every item of a wave and wait for all of them.
    ///
    /// Results come back in wave order, tagged with the wave index.
    pub async fn dispatch_wave(
        &self,
        wave: &Wave,
        graph: &ExecutionGraph,
        cancel: &CancellationToken,
    ) -> Vec<ExecutionResult> {
        let started = Instant::now();
        let mut slots: Vec<Option<ExecutionResult>> = vec![None; wave.items.len()];
        let mut tasks: JoinSet<(usize, ExecutionResult)> = JoinSet::new();

        for (pos, id) in wave.items.iter().enumerate() {
            let Some(item) = graph.item(id.as_str()) else {
                tracing::error!(item_id = %id, wave = wave.index, "Wave references unknown item");
                slots[pos] = Some(ExecutionResult::errored(
                    id.clone(),
                    format!("item '{}' is not part of the execution graph", id),
                    "executor",
                ));
                continue;
            };

            let Some(executor) = self.registry.resolve(&item.item_type) else {
                let err = WaverunError::ExecutorNotFound {
                    item_type: item.item_type.clone(),
                };
                tracing::warn!(item_id = %item.id, error = %err, "Item has no executor");
                slots[pos] = Some(ExecutionResult::errored(
                    item.id.clone(),
                    err.to_string(),
                    CATEGORY_EXECUTOR_NOT_FOUND,
                ));
                continue;
            };

            let item = item.clone();
            let ctx = ExecutionContext::new(self.run_id, wave.index, cancel.child_token());
            let retry = Arc::clone(&self.retry);
            let limit = self.type_limits.get(&item.item_type).cloned();

            let span = tracing::info_span!(
                "item_execution",
                item_id = %item.id,
                item_type = %item.item_type,
                wave = wave.index,
                timeout_ms = item.timeout_ms,
                attempt = tracing::field::Empty,
            );

            tasks.spawn(
                async move {
                    // A closed semaphore only drops the type limit.
                    let _permit = match limit {
                        Some(semaphore) => semaphore.acquire_owned().await.ok(),
                        None => None,
                    };
                    let result = run_item(executor, &item, ctx, &retry).await;
                    (pos, result)
                }
                .instrument(span),
            );
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((pos, result)) => slots[pos] = Some(result),
                Err(join_error) => {
                    tracing::error!(
                        wave = wave.index,
                        error = %join_error,
                        "Item task did not complete"
                    );
                }
            }
        }

        let results: Vec<ExecutionResult> = slots
            .into_iter()
            .zip(&wave.items)
            .map(|(slot, id)| {
                slot.unwrap_or_else(|| {
                    let err = WaverunError::ItemExecution {
                        item_id: id.clone(),
                        cause: "item task did not complete".to_string(),
                    };
                    ExecutionResult::errored(id.clone(), err.to_string(), "executor")
                })
                .in_wave(wave.index)
            })
            .collect();

        tracing::debug!(
            wave = wave.index,
            items = results.len(),
            passed = results.iter().filter(|r| r.is_success()).count(),
            failed = results.iter().filter(|r| r.is_failure()).count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Wave dispatched"
        );

        results
    }
}

/// Run one item through all of its attempts.
async fn run_item(
    executor: Arc<dyn Executor>,
    item: &WorkItem,
    ctx: ExecutionContext,
    retry: &RetryPolicy,
) -> ExecutionResult {
    let started = Instant::now();
    let elapsed_ms = |started: Instant| started.elapsed().as_millis() as u64;
    let mut attempt: u32 = 0;

    loop {
        if ctx.is_cancelled() {
            tracing::debug!(attempt, "Run cancelled before attempt");
            return ExecutionResult::skipped(item.id.clone(), SkipReason::Cancelled)
                .with_retry_count(attempt.saturating_sub(1))
                .with_duration_ms(elapsed_ms(started));
        }

        attempt += 1;
        tracing::Span::current().record("attempt", attempt);
        tracing::debug!(executor = executor.name(), "Executing item");

        let outcome = run_attempt(executor.as_ref(), item, ctx.for_attempt(attempt)).await;

        if outcome.is_retryable(retry) && retry.has_attempts_left(attempt) {
            let delay = retry.backoff.delay(attempt);
            tracing::warn!(
                attempt,
                outcome = outcome.label(),
                delay_ms = delay.as_millis() as u64,
                "Retrying item"
            );

            if !delay.is_zero() {
                tokio::select! {
                    _ = ctx.cancellation.cancelled() => {
                        return ExecutionResult::skipped(item.id.clone(), SkipReason::Cancelled)
                            .with_retry_count(attempt - 1)
                            .with_duration_ms(elapsed_ms(started));
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            continue;
        }

        let result = outcome
            .into_result(item)
            .with_retry_count(attempt - 1)
            .with_duration_ms(elapsed_ms(started));

        if result.is_failure() {
            tracing::warn!(
                status = %result.status,
                error = result.error.as_deref().unwrap_or_default(),
                "Item did not pass"
            );
        } else {
            tracing::debug!(status = %result.status, "Item finished");
        }
        return result;
    }
}

/// Run a single attempt under the item timeout, catching panics.
async fn run_attempt(
    executor: &dyn Executor,
    item: &WorkItem,
    ctx: ExecutionContext,
) -> AttemptOutcome {
    // The call happens inside the future so a panic before the first await
    // is caught as well.
    let call = AssertUnwindSafe(async move { executor.execute(item, ctx).await }).catch_unwind();

    match tokio::time::timeout(item.timeout(), call).await {
        Ok(Ok(result)) => AttemptOutcome::from_call(result),
        Ok(Err(payload)) => AttemptOutcome::from_panic(payload),
        Err(_elapsed) => AttemptOutcome::TimedOut,
    }
}
