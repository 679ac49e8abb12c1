//! Executor trait and the types crossing the executor boundary.

use crate::types::{CATEGORY_ASSERTION, Coverage, RunId, WorkItem};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Classification of executor errors.
///
/// Retry policies select retryable errors by kind, and the aggregator uses
/// the kind as the failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A flaky dependency (network blip, lock contention).
    Transient,
    /// The environment is not in the required shape.
    Environment,
    /// The executor itself misbehaved.
    Executor,
    /// The executor observed run cancellation and stopped.
    Cancelled,
    /// The executor panicked.
    Panic,
}

impl ErrorKind {
    /// Stable name for logs and reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Transient => "transient",
            Self::Environment => "environment",
            Self::Executor => "executor",
            Self::Cancelled => "cancelled",
            Self::Panic => "panic",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error returned across the executor boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} error: {message}")]
pub struct ExecutorError {
    /// Error classification.
    pub kind: ErrorKind,
    /// Human-readable message.
    pub message: String,
}

impl ExecutorError {
    /// Create an executor error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// A transient error.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transient, message)
    }

    /// An environment error.
    pub fn environment(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Environment, message)
    }

    /// The executor stopped because the run was cancelled.
    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "cancelled")
    }
}

/// The verdict an executor reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// The work item passed.
    Passed,
    /// The work item failed (e.g. an assertion did not hold).
    Failed,
}

/// A successful executor call: the item ran and produced a verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutcome {
    /// Pass or fail.
    pub verdict: Verdict,
    /// Captured output.
    pub output: String,
    /// Failure message when the verdict is `Failed`.
    pub message: Option<String>,
    /// Failure category; defaults to `assertion`.
    pub category: Option<String>,
    /// Coverage figures to pass through to the report.
    pub coverage: Option<Coverage>,
}

impl ExecutionOutcome {
    /// A passing outcome.
    pub fn passed(output: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Passed,
            output: output.into(),
            message: None,
            category: None,
            coverage: None,
        }
    }

    /// A failing outcome.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Failed,
            output: String::new(),
            message: Some(message.into()),
            category: None,
            coverage: None,
        }
    }

    /// Set the captured output.
    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = output.into();
        self
    }

    /// Set the failure category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Attach coverage figures.
    pub fn with_coverage(mut self, coverage: Coverage) -> Self {
        self.coverage = Some(coverage);
        self
    }

    /// The category to cluster this outcome under if it failed.
    pub fn failure_category(&self) -> &str {
        self.category.as_deref().unwrap_or(CATEGORY_ASSERTION)
    }
}

/// Per-attempt context handed to an executor.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// The run this attempt belongs to.
    pub run_id: RunId,
    /// Wave index of the item.
    pub wave: usize,
    /// Attempt number, starting at 1.
    pub attempt: u32,
    /// Cancelled when the run is cancelled. Cooperating executors stop and
    /// return [`ExecutorError::cancelled`].
    pub cancellation: CancellationToken,
}

impl ExecutionContext {
    /// Create a context for the first attempt.
    pub fn new(run_id: RunId, wave: usize, cancellation: CancellationToken) -> Self {
        Self {
            run_id,
            wave,
            attempt: 1,
            cancellation,
        }
    }

    /// Context for a subsequent attempt.
    pub fn for_attempt(&self, attempt: u32) -> Self {
        Self {
            attempt,
            ..self.clone()
        }
    }

    /// Whether the run has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

/// A boxed future for async item execution.
pub type ExecutorFuture<'a> =
    Pin<Box<dyn Future<Output = Result<ExecutionOutcome, ExecutorError>> + Send + 'a>>;

/// The capability that performs a work item's action.
///
/// Executors are registered by item type. A call either yields an
/// [`ExecutionOutcome`] carrying a verdict or an [`ExecutorError`]; panics
/// are caught by the dispatcher and reported as errored results.
///
/// # Example
///
/// ```ignore
/// struct UnitTestExecutor;
///
/// impl Executor for UnitTestExecutor {
///     fn name(&self) -> &str {
///         "unit"
///     }
///
///     fn execute<'a>(&'a self, item: &'a WorkItem, ctx: ExecutionContext) -> ExecutorFuture<'a> {
///         Box::pin(async move {
///             let report = run_test(&item.params).await?;
///             Ok(ExecutionOutcome::passed(report))
///         })
///     }
/// }
/// ```
pub trait Executor: Send + Sync {
    /// Executor name, used in logs.
    fn name(&self) -> &str;

    /// Execute one attempt of a work item.
    fn execute<'a>(&'a self, item: &'a WorkItem, ctx: ExecutionContext) -> ExecutorFuture<'a>;

    /// Called once after the run finishes.
    fn shutdown(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysPass;

    impl Executor for AlwaysPass {
        fn name(&self) -> &str {
            "always_pass"
        }

        fn execute<'a>(&'a self, item: &'a WorkItem, ctx: ExecutionContext) -> ExecutorFuture<'a> {
            Box::pin(async move {
                Ok(ExecutionOutcome::passed(format!(
                    "{} attempt {}",
                    item.id, ctx.attempt
                )))
            })
        }
    }

    #[tokio::test]
    async fn executor_returns_outcome() {
        let item = WorkItem::new("a", "unit");
        let ctx = ExecutionContext::new(RunId::new(), 0, CancellationToken::new()).for_attempt(2);
        let outcome = AlwaysPass.execute(&item, ctx).await.unwrap();
        assert_eq!(outcome.verdict, Verdict::Passed);
        assert_eq!(outcome.output, "a attempt 2");
    }

    #[test]
    fn failure_category_defaults_to_assertion() {
        let outcome = ExecutionOutcome::failed("expected 200, got 500");
        assert_eq!(outcome.failure_category(), CATEGORY_ASSERTION);

        let outcome = outcome.with_category("http");
        assert_eq!(outcome.failure_category(), "http");
    }

    #[test]
    fn executor_error_display() {
        let err = ExecutorError::transient("connection reset");
        assert_eq!(err.to_string(), "transient error: connection reset");
    }
}
