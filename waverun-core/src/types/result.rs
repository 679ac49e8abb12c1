//! Per-item execution results.

use super::ItemId;
use crate::error::WaverunError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Coverage figures reported by an executor, keyed by metric name
/// (for example `line` or `branch`). Passed through untouched.
pub type Coverage = BTreeMap<String, f64>;

/// Error category assigned to a failed verdict with no explicit category.
pub const CATEGORY_ASSERTION: &str = "assertion";
/// Error category assigned to timed out items.
pub const CATEGORY_TIMEOUT: &str = "timeout";
/// Error category assigned to items whose type has no executor.
pub const CATEGORY_EXECUTOR_NOT_FOUND: &str = "executor_not_found";

/// Terminal status of a work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// The executor reported success.
    Passed,
    /// The executor reported a failed verdict.
    Failed,
    /// The executor could not produce a verdict.
    Errored,
    /// The item did not run.
    Skipped,
    /// The item exceeded its timeout.
    TimedOut,
}

impl ExecutionStatus {
    /// Stable name for logs and reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Errored => "errored",
            Self::Skipped => "skipped",
            Self::TimedOut => "timed_out",
        }
    }

    /// Failed, errored or timed out.
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::Failed | Self::Errored | Self::TimedOut)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an item was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// A required predecessor did not pass.
    UpstreamFailed {
        /// The predecessor that blocked this item.
        item: ItemId,
    },
    /// A critical item failed in an earlier wave.
    RunAborted,
    /// The run was cancelled.
    Cancelled,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UpstreamFailed { item } => write!(f, "upstream item '{}' did not pass", item),
            Self::RunAborted => f.write_str("run aborted by a critical failure"),
            Self::Cancelled => f.write_str("run cancelled"),
        }
    }
}

/// The outcome of one work item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// The item this result belongs to.
    pub item_id: ItemId,
    /// Terminal status.
    pub status: ExecutionStatus,
    /// Wall time across all attempts, in milliseconds.
    pub duration_ms: u64,
    /// Executor output of the final attempt.
    #[serde(default)]
    pub output: String,
    /// Error or failure message of the final attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Failure category used for clustering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_category: Option<String>,
    /// Number of retries performed (attempts - 1).
    #[serde(default)]
    pub retry_count: u32,
    /// Set when the item was skipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<SkipReason>,
    /// The item was never dispatched because the run stopped early.
    #[serde(default)]
    pub not_run: bool,
    /// Coverage figures attached by the executor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage: Option<Coverage>,
    /// Wave the item was scheduled in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wave: Option<usize>,
}

impl ExecutionResult {
    fn with_status(item_id: ItemId, status: ExecutionStatus) -> Self {
        Self {
            item_id,
            status,
            duration_ms: 0,
            output: String::new(),
            error: None,
            error_category: None,
            retry_count: 0,
            skip_reason: None,
            not_run: false,
            coverage: None,
            wave: None,
        }
    }

    /// A passing result.
    pub fn passed(item_id: ItemId, output: impl Into<String>) -> Self {
        let mut result = Self::with_status(item_id, ExecutionStatus::Passed);
        result.output = output.into();
        result
    }

    /// A failed verdict.
    pub fn failed(
        item_id: ItemId,
        message: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        let mut result = Self::with_status(item_id, ExecutionStatus::Failed);
        result.error = Some(message.into());
        result.error_category = Some(category.into());
        result
    }

    /// An execution error.
    pub fn errored(
        item_id: ItemId,
        message: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        let mut result = Self::with_status(item_id, ExecutionStatus::Errored);
        result.error = Some(message.into());
        result.error_category = Some(category.into());
        result
    }

    /// A timeout.
    pub fn timed_out(item_id: ItemId, timeout_ms: u64) -> Self {
        let err = WaverunError::ItemTimeout {
            item_id: item_id.clone(),
            timeout_ms,
        };
        let mut result = Self::with_status(item_id, ExecutionStatus::TimedOut);
        result.error = Some(err.to_string());
        result.error_category = Some(CATEGORY_TIMEOUT.to_string());
        result
    }

    /// A skipped item.
    pub fn skipped(item_id: ItemId, reason: SkipReason) -> Self {
        let mut result = Self::with_status(item_id, ExecutionStatus::Skipped);
        result.error = Some(reason.to_string());
        result.skip_reason = Some(reason);
        result
    }

    /// An item that was never dispatched because the run stopped.
    pub fn not_run(item_id: ItemId, reason: SkipReason) -> Self {
        let mut result = Self::skipped(item_id, reason);
        result.not_run = true;
        result
    }

    /// Set the total duration.
    pub fn with_duration_ms(mut self, ms: u64) -> Self {
        self.duration_ms = ms;
        self
    }

    /// Set the retry count.
    pub fn with_retry_count(mut self, retries: u32) -> Self {
        self.retry_count = retries;
        self
    }

    /// Attach coverage figures.
    pub fn with_coverage(mut self, coverage: Option<Coverage>) -> Self {
        self.coverage = coverage;
        self
    }

    /// Record the wave index.
    pub fn in_wave(mut self, wave: usize) -> Self {
        self.wave = Some(wave);
        self
    }

    /// Whether the item passed.
    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Passed
    }

    /// Whether the item failed, errored or timed out.
    pub fn is_failure(&self) -> bool {
        self.status.is_failure()
    }
}
