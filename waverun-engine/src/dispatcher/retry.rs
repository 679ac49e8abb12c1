//! Attempt classification and the retry decision.

use std::any::Any;
use waverun_core::error::WaverunError;
use waverun_core::plan::RetryPolicy;
use waverun_core::traits::{ErrorKind, ExecutionOutcome, ExecutorError, Verdict};
use waverun_core::types::{ExecutionResult, SkipReason, WorkItem};

/// How a single attempt ended.
#[derive(Debug)]
pub(crate) enum AttemptOutcome {
    Passed(ExecutionOutcome),
    Failed(ExecutionOutcome),
    Errored(ExecutorError),
    Panicked(String),
    TimedOut,
}

impl AttemptOutcome {
    pub(crate) fn from_call(result: Result<ExecutionOutcome, ExecutorError>) -> Self {
        match result {
            Ok(outcome) if outcome.verdict == Verdict::Passed => Self::Passed(outcome),
            Ok(outcome) => Self::Failed(outcome),
            Err(err) => Self::Errored(err),
        }
    }

    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        Self::Panicked(message)
    }

    /// Short label for logs.
    pub(crate) fn label(&self) -> &'static str {
        match self {
            Self::Passed(_) => "passed",
            Self::Failed(_) => "failed",
            Self::Errored(_) => "errored",
            Self::Panicked(_) => "panicked",
            Self::TimedOut => "timed_out",
        }
    }

    /// Whether the policy allows retrying this outcome, attempts aside.
    pub(crate) fn is_retryable(&self, policy: &RetryPolicy) -> bool {
        match self {
            Self::Passed(_) => false,
            Self::Failed(_) => policy.retry_on_failure,
            Self::TimedOut => policy.retry_on_timeout,
            Self::Errored(err) => policy.is_retryable_error(err.kind),
            Self::Panicked(_) => policy.is_retryable_error(ErrorKind::Panic),
        }
    }

    /// Convert the final attempt into the item's result.
    pub(crate) fn into_result(self, item: &WorkItem) -> ExecutionResult {
        let id = item.id.clone();
        match self {
            Self::Passed(outcome) => {
                ExecutionResult::passed(id, outcome.output).with_coverage(outcome.coverage)
            }
            Self::Failed(outcome) => {
                let category = outcome.failure_category().to_string();
                let message = outcome
                    .message
                    .unwrap_or_else(|| "executor reported a failed verdict".to_string());
                let mut result = ExecutionResult::failed(id, message, category)
                    .with_coverage(outcome.coverage);
                result.output = outcome.output;
                result
            }
            Self::Errored(err) if err.kind == ErrorKind::Cancelled => {
                ExecutionResult::skipped(id, SkipReason::Cancelled)
            }
            Self::Errored(err) => {
                let category = err.kind.as_str();
                let err = WaverunError::ItemExecution {
                    item_id: id.clone(),
                    cause: err.to_string(),
                };
                ExecutionResult::errored(id, err.to_string(), category)
            }
            Self::Panicked(message) => {
                let err = WaverunError::ItemPanic {
                    item_id: id.clone(),
                    message,
                };
                ExecutionResult::errored(id, err.to_string(), ErrorKind::Panic.as_str())
            }
            Self::TimedOut => ExecutionResult::timed_out(id, item.timeout_ms),
        }
    }
}
