//! Result aggregation.
//!
//! Collects per-item results into an [`AggregateReport`]: counters per
//! status, type and group, failure clusters keyed by `"{type}:{category}"`,
//! pass-through coverage, recommendations and the overall run status.
//! A report is produced for partial runs too; items that never ran are
//! recorded as skipped.

mod report;

pub use report::{
    AbortInfo, AbortReason, AggregateReport, Breakdown, FailureCluster, FailureEntry,
    Recommendation, RecommendationKind, RunStatus, Summary, WaveSummary,
};

use report::success_rate;
use std::collections::{BTreeMap, HashMap};
use waverun_core::types::{ExecutionResult, ExecutionStatus, ItemId, RunId, SkipReason, WorkItem};

/// Thresholds for derived recommendations.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatorConfig {
    /// Types and groups below this success rate get a recommendation.
    pub success_rate_threshold: f64,
    /// Recommend a look at items that only passed after retries.
    pub flaky_recommendations: bool,
    /// Minimum cluster size that earns a recommendation.
    pub cluster_recommendation_min: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            success_rate_threshold: 0.8,
            flaky_recommendations: true,
            cluster_recommendation_min: 2,
        }
    }
}

/// Run-level facts the aggregator cannot see in individual results.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Run identifier.
    pub run_id: RunId,
    /// Plan name.
    pub plan: String,
    /// Scheduled waves and whether each was dispatched.
    pub waves: Vec<WaveSummary>,
    /// Set when the run stopped early.
    pub abort: Option<AbortInfo>,
    /// Wall time of the run.
    pub duration_ms: u64,
}

#[derive(Debug)]
struct Record {
    item_type: String,
    group: Option<String>,
    result: ExecutionResult,
}

/// Accumulates item results for one run.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    config: AggregatorConfig,
    records: Vec<Record>,
    index: HashMap<ItemId, usize>,
}

impl ResultAggregator {
    /// Create an aggregator.
    pub fn new(config: AggregatorConfig) -> Self {
        Self {
            config,
            records: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Record the result of an item. Results keep the order they were
    /// first recorded in; recording an item again replaces its result.
    pub fn record(&mut self, item: &WorkItem, result: ExecutionResult) {
        let record = Record {
            item_type: item.item_type.clone(),
            group: item.group.clone(),
            result,
        };
        match self.index.get(&item.id) {
            Some(&pos) => self.records[pos] = record,
            None => {
                self.index.insert(item.id.clone(), self.records.len());
                self.records.push(record);
            }
        }
    }

    /// Number of recorded items.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Build the report.
    pub fn finalize(self, outcome: RunOutcome) -> AggregateReport {
        let summary = self.summary(outcome.duration_ms);
        let by_type = self.breakdown(|record| Some(record.item_type.as_str()));
        let by_group = self.breakdown(|record| record.group.as_deref());
        let failures = self.failure_clusters();
        let status = self.status(outcome.abort.as_ref());

        let coverage: BTreeMap<ItemId, _> = self
            .records
            .iter()
            .filter_map(|record| {
                let coverage = record.result.coverage.clone()?;
                Some((record.result.item_id.clone(), coverage))
            })
            .collect();

        let recommendations = self.recommendations(
            &by_type,
            &by_group,
            &failures,
            outcome.abort.as_ref(),
            summary.not_run,
        );

        tracing::info!(
            run_id = %outcome.run_id,
            status = %status,
            total = summary.total,
            passed = summary.passed,
            failed = summary.failed + summary.errored + summary.timed_out,
            skipped = summary.skipped,
            success_rate = summary.success_rate,
            "Run report finalized"
        );

        AggregateReport {
            run_id: outcome.run_id,
            plan: outcome.plan,
            status,
            summary,
            by_type,
            by_group,
            failures,
            coverage: (!coverage.is_empty()).then_some(coverage),
            recommendations,
            waves: outcome.waves,
            abort: outcome.abort,
            results: self.records.into_iter().map(|record| record.result).collect(),
        }
    }

    fn summary(&self, duration_ms: u64) -> Summary {
        let mut counts = Breakdown::default();
        let mut not_run = 0;
        for record in &self.records {
            counts.count(record.result.status);
            if record.result.not_run {
                not_run += 1;
            }
        }

        Summary {
            total: counts.total,
            passed: counts.passed,
            failed: counts.failed,
            errored: counts.errored,
            skipped: counts.skipped,
            timed_out: counts.timed_out,
            not_run,
            success_rate: success_rate(counts.passed, counts.executed()),
            duration_ms,
        }
    }

    fn breakdown<'a>(
        &'a self,
        key: impl Fn(&'a Record) -> Option<&'a str>,
    ) -> BTreeMap<String, Breakdown> {
        let mut buckets: BTreeMap<String, Breakdown> = BTreeMap::new();
        for record in &self.records {
            if let Some(key) = key(record) {
                buckets
                    .entry(key.to_string())
                    .or_default()
                    .count(record.result.status);
            }
        }
        buckets
    }

    fn failure_clusters(&self) -> Vec<FailureCluster> {
        let mut clusters: BTreeMap<String, FailureCluster> = BTreeMap::new();

        for record in self.records.iter().filter(|r| r.result.is_failure()) {
            let category = record
                .result
                .error_category
                .clone()
                .unwrap_or_else(|| record.result.status.as_str().to_string());
            let key = format!("{}:{}", record.item_type, category);

            clusters
                .entry(key.clone())
                .or_insert_with(|| FailureCluster {
                    key,
                    item_type: record.item_type.clone(),
                    category,
                    items: Vec::new(),
                })
                .items
                .push(FailureEntry {
                    item_id: record.result.item_id.clone(),
                    status: record.result.status,
                    message: record.result.error.clone(),
                    wave: record.result.wave,
                });
        }

        let mut clusters: Vec<FailureCluster> = clusters.into_values().collect();
        // Stable sort keeps key order among equal sizes.
        clusters.sort_by(|a, b| b.items.len().cmp(&a.items.len()));
        clusters
    }

    fn status(&self, abort: Option<&AbortInfo>) -> RunStatus {
        if abort.is_some() {
            return RunStatus::Aborted;
        }

        let any_failed = self.records.iter().any(|record| {
            record.result.is_failure()
                || matches!(
                    record.result.skip_reason,
                    Some(SkipReason::UpstreamFailed { .. })
                )
        });
        if any_failed {
            RunStatus::Failed
        } else {
            RunStatus::Passed
        }
    }

    fn recommendations(
        &self,
        by_type: &BTreeMap<String, Breakdown>,
        by_group: &BTreeMap<String, Breakdown>,
        failures: &[FailureCluster],
        abort: Option<&AbortInfo>,
        not_run: usize,
    ) -> Vec<Recommendation> {
        let mut out = Vec::new();

        if let Some(AbortInfo {
            reason: AbortReason::CriticalFailure,
            item_id: Some(item_id),
            ..
        }) = abort
        {
            out.push(Recommendation {
                kind: RecommendationKind::CriticalAbort,
                subject: item_id.to_string(),
                message: format!(
                    "Critical item '{}' failed and stopped the run; {} item(s) did not run",
                    item_id, not_run
                ),
            });
        }

        let threshold = self.config.success_rate_threshold;
        for (label, buckets) in [("type", by_type), ("group", by_group)] {
            for (name, counts) in buckets {
                if counts.executed() > 0 && counts.success_rate < threshold {
                    out.push(Recommendation {
                        kind: RecommendationKind::LowSuccessRate,
                        subject: name.clone(),
                        message: format!(
                            "{} '{}' passed {:.0}% of executed items, below the {:.0}% threshold",
                            label,
                            name,
                            counts.success_rate * 100.0,
                            threshold * 100.0
                        ),
                    });
                }
            }
        }

        for cluster in failures
            .iter()
            .filter(|c| c.items.len() >= self.config.cluster_recommendation_min)
        {
            out.push(Recommendation {
                kind: RecommendationKind::FailureCluster,
                subject: cluster.key.clone(),
                message: format!(
                    "{} '{}' items failed with '{}'; look for a shared cause",
                    cluster.items.len(),
                    cluster.item_type,
                    cluster.category
                ),
            });
        }

        for result in self.records.iter().map(|r| &r.result) {
            if result.status == ExecutionStatus::TimedOut {
                out.push(Recommendation {
                    kind: RecommendationKind::Timeout,
                    subject: result.item_id.to_string(),
                    message: format!(
                        "Item '{}' timed out; raise its timeout or split it up",
                        result.item_id
                    ),
                });
            }
        }

        if self.config.flaky_recommendations {
            for result in self.records.iter().map(|r| &r.result) {
                if result.is_success() && result.retry_count > 0 {
                    out.push(Recommendation {
                        kind: RecommendationKind::FlakyItem,
                        subject: result.item_id.to_string(),
                        message: format!(
                            "Item '{}' passed only after {} retr{}",
                            result.item_id,
                            result.retry_count,
                            if result.retry_count == 1 { "y" } else { "ies" }
                        ),
                    });
                }
            }
        }

        out
    }
}
