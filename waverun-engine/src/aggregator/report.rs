//! The aggregate report produced at the end of a run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use waverun_core::error::Result;
use waverun_core::types::{Coverage, ExecutionResult, ExecutionStatus, ItemId, RunId};

/// Overall outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every executed item passed.
    Passed,
    /// Some item failed, errored, timed out or was blocked by one that did.
    Failed,
    /// The run stopped early on a critical failure or cancellation.
    Aborted,
}

impl RunStatus {
    /// Stable name for logs and reports.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run-wide counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Items in the plan.
    pub total: usize,
    /// Items that passed.
    pub passed: usize,
    /// Items with a failed verdict.
    pub failed: usize,
    /// Items that errored.
    pub errored: usize,
    /// Items that were skipped, including those never dispatched.
    pub skipped: usize,
    /// Items that timed out.
    pub timed_out: usize,
    /// Skipped items that were never dispatched.
    pub not_run: usize,
    /// `passed / (total - skipped)`, or 0.0 when nothing executed.
    pub success_rate: f64,
    /// Wall time of the run in milliseconds.
    pub duration_ms: u64,
}

/// Counters for one item type or group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Breakdown {
    /// Items in this bucket.
    pub total: usize,
    /// Items that passed.
    pub passed: usize,
    /// Items with a failed verdict.
    pub failed: usize,
    /// Items that errored.
    pub errored: usize,
    /// Items that were skipped.
    pub skipped: usize,
    /// Items that timed out.
    pub timed_out: usize,
    /// `passed / (total - skipped)`, or 0.0 when nothing executed.
    pub success_rate: f64,
}

impl Breakdown {
    pub(crate) fn count(&mut self, status: ExecutionStatus) {
        self.total += 1;
        match status {
            ExecutionStatus::Passed => self.passed += 1,
            ExecutionStatus::Failed => self.failed += 1,
            ExecutionStatus::Errored => self.errored += 1,
            ExecutionStatus::Skipped => self.skipped += 1,
            ExecutionStatus::TimedOut => self.timed_out += 1,
        }
        self.success_rate = success_rate(self.passed, self.executed());
    }

    /// Items that were dispatched and reached a verdict.
    pub fn executed(&self) -> usize {
        self.total - self.skipped
    }
}

pub(crate) fn success_rate(passed: usize, executed: usize) -> f64 {
    if executed == 0 {
        0.0
    } else {
        passed as f64 / executed as f64
    }
}

/// One failing item inside a cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureEntry {
    /// The failing item.
    pub item_id: ItemId,
    /// Its terminal status.
    pub status: ExecutionStatus,
    /// Error or failure message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Wave the item ran in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wave: Option<usize>,
}

/// Failures sharing an item type and error category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureCluster {
    /// Clustering key, `"{type}:{category}"`.
    pub key: String,
    /// Item type shared by the members.
    pub item_type: String,
    /// Error category shared by the members.
    pub category: String,
    /// Members in declaration order.
    pub items: Vec<FailureEntry>,
}

/// What a recommendation is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    /// A critical failure stopped the run.
    CriticalAbort,
    /// A type or group fell below the success-rate threshold.
    LowSuccessRate,
    /// Several items failed for the same reason.
    FailureCluster,
    /// An item hit its timeout.
    Timeout,
    /// An item only passed after retries.
    FlakyItem,
}

/// A derived follow-up for whoever reads the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Category of the recommendation.
    pub kind: RecommendationKind,
    /// Item id, type, group or cluster key it refers to.
    pub subject: String,
    /// Human-readable text.
    pub message: String,
}

/// Which items a wave held and whether it ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveSummary {
    /// Wave index.
    pub index: usize,
    /// Items scheduled in the wave.
    pub items: Vec<ItemId>,
    /// Whether the wave was dispatched.
    pub executed: bool,
}

/// Why a run stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    /// A critical item failed, errored or timed out.
    CriticalFailure,
    /// The run was cancelled.
    Cancelled,
}

/// Details of an early stop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbortInfo {
    /// Why the run stopped.
    pub reason: AbortReason,
    /// The critical item that caused the stop.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<ItemId>,
    /// The last wave that was dispatched, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wave: Option<usize>,
}

/// The complete outcome of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    /// Run identifier.
    pub run_id: RunId,
    /// Plan name.
    pub plan: String,
    /// Overall status.
    pub status: RunStatus,
    /// Run-wide counters.
    pub summary: Summary,
    /// Counters per item type.
    pub by_type: BTreeMap<String, Breakdown>,
    /// Counters per group, for items that declare one.
    pub by_group: BTreeMap<String, Breakdown>,
    /// Failures clustered by type and category, largest first.
    pub failures: Vec<FailureCluster>,
    /// Coverage reported by executors, keyed by item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage: Option<BTreeMap<ItemId, Coverage>>,
    /// Derived follow-ups.
    pub recommendations: Vec<Recommendation>,
    /// The wave plan and how far the run got.
    pub waves: Vec<WaveSummary>,
    /// Set when the run stopped early.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abort: Option<AbortInfo>,
    /// One result per item, in declaration order.
    pub results: Vec<ExecutionResult>,
}

impl AggregateReport {
    /// Result of a single item.
    pub fn result(&self, id: &str) -> Option<&ExecutionResult> {
        self.results.iter().find(|r| r.item_id.as_str() == id)
    }

    /// Status of a single item.
    pub fn status_of(&self, id: &str) -> Option<ExecutionStatus> {
        self.result(id).map(|r| r.status)
    }

    /// Whether the run passed.
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Passed
    }

    /// Serialize to pretty JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
