//! The wave engine: analyze, schedule, dispatch and aggregate a plan.
//!
//! # Execution Flow
//!
//! 1. Merge plan settings over the engine configuration
//! 2. Build the execution graph (validation, implicit edges, cycle check)
//! 3. Partition the graph into waves
//! 4. For each wave, in order:
//!    - stop if the run was cancelled
//!    - skip items whose required predecessors did not pass
//!    - dispatch the rest and wait for all of them
//!    - stop if a critical item failed
//! 5. Mark items of undispatched waves as not run and build the report
//!
//! Structural problems in the plan surface as errors before anything runs.
//! Once execution starts, every outcome is reported through the
//! [`AggregateReport`].

use crate::aggregator::{
    AbortInfo, AbortReason, AggregateReport, AggregatorConfig, ResultAggregator, RunOutcome,
    WaveSummary,
};
use crate::analyzer::{DependencyAnalyzer, ExecutionGraph};
use crate::dispatcher::{Dispatcher, ExecutorRegistry};
use crate::scheduler::{Schedule, SchedulerConfig, Wave, WaveScheduler};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use waverun_core::error::{Result, WaverunError};
use waverun_core::plan::{ImplicitOrder, Plan, PlanSettings, RetryPolicy};
use waverun_core::types::{ExecutionResult, ItemId, RunId, SkipReason};

/// Configuration for the wave engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Maximum items per wave.
    pub max_parallel: usize,
    /// Maximum items of a given type per wave.
    pub type_caps: BTreeMap<String, usize>,
    /// Retry policy for every item.
    pub retry: RetryPolicy,
    /// Conflict order for implicit edges.
    pub implicit_order: ImplicitOrder,
    /// Success rate below which a type or group is flagged.
    pub success_rate_threshold: f64,
    /// Minimum failure cluster size that is flagged.
    pub cluster_recommendation_min: usize,
    /// Flag items that only passed after retries.
    pub flaky_recommendations: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let aggregator = AggregatorConfig::default();
        Self {
            max_parallel: 4,
            type_caps: BTreeMap::new(),
            retry: RetryPolicy::default(),
            implicit_order: ImplicitOrder::default(),
            success_rate_threshold: aggregator.success_rate_threshold,
            cluster_recommendation_min: aggregator.cluster_recommendation_min,
            flaky_recommendations: aggregator.flaky_recommendations,
        }
    }
}

impl EngineConfig {
    /// Create configuration from environment variables.
    ///
    /// Reads the following environment variables:
    /// - `WAVERUN_MAX_PARALLEL`: Maximum items per wave
    /// - `WAVERUN_RETRY_MAX_ATTEMPTS`: Total attempts per item
    /// - `WAVERUN_IMPLICIT_ORDER`: `declaration` or `priority`
    /// - `WAVERUN_SUCCESS_THRESHOLD`: Success rate threshold (0.0 - 1.0)
    ///
    /// Unset or unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let max_parallel = std::env::var("WAVERUN_MAX_PARALLEL")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(defaults.max_parallel);

        let max_attempts = std::env::var("WAVERUN_RETRY_MAX_ATTEMPTS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(defaults.retry.max_attempts);

        let implicit_order = std::env::var("WAVERUN_IMPLICIT_ORDER")
            .ok()
            .and_then(|s| s.parse::<ImplicitOrder>().ok())
            .unwrap_or(defaults.implicit_order);

        let success_rate_threshold = std::env::var("WAVERUN_SUCCESS_THRESHOLD")
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
            .unwrap_or(defaults.success_rate_threshold);

        Self {
            max_parallel,
            retry: defaults.retry.with_max_attempts(max_attempts),
            implicit_order,
            success_rate_threshold,
            ..defaults
        }
    }

    /// Set the maximum items per wave.
    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel;
        self
    }

    /// Cap the number of items of one type per wave.
    pub fn with_type_cap(mut self, item_type: impl Into<String>, cap: usize) -> Self {
        self.type_caps.insert(item_type.into(), cap);
        self
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the implicit-edge conflict order.
    pub fn with_implicit_order(mut self, order: ImplicitOrder) -> Self {
        self.implicit_order = order;
        self
    }

    /// Set the success rate threshold.
    pub fn with_success_rate_threshold(mut self, threshold: f64) -> Self {
        self.success_rate_threshold = threshold;
        self
    }

    /// Set the minimum flagged cluster size.
    pub fn with_cluster_recommendation_min(mut self, min: usize) -> Self {
        self.cluster_recommendation_min = min;
        self
    }

    /// Apply per-plan overrides. Type caps merge, plan entries winning.
    pub fn merged_with(&self, settings: &PlanSettings) -> Self {
        let mut merged = self.clone();
        if let Some(max_parallel) = settings.max_parallel {
            merged.max_parallel = max_parallel;
        }
        merged.type_caps.extend(
            settings
                .type_caps
                .iter()
                .map(|(item_type, cap)| (item_type.clone(), *cap)),
        );
        if let Some(retry) = &settings.retry {
            merged.retry = retry.clone();
        }
        if let Some(order) = settings.implicit_order {
            merged.implicit_order = order;
        }
        merged
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        self.scheduler_config().validate()?;
        self.retry.validate()?;
        if !(0.0..=1.0).contains(&self.success_rate_threshold) {
            return Err(WaverunError::InvalidConfig {
                field: "success_rate_threshold".to_string(),
                cause: format!("must be within 0.0..=1.0, got {}", self.success_rate_threshold),
            });
        }
        Ok(())
    }

    /// The scheduler budget.
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            max_parallel: self.max_parallel,
            type_caps: self.type_caps.clone(),
        }
    }

    /// The aggregator thresholds.
    pub fn aggregator_config(&self) -> AggregatorConfig {
        AggregatorConfig {
            success_rate_threshold: self.success_rate_threshold,
            flaky_recommendations: self.flaky_recommendations,
            cluster_recommendation_min: self.cluster_recommendation_min,
        }
    }
}

/// Runs plans wave by wave.
#[derive(Debug, Clone)]
pub struct WaveEngine {
    config: EngineConfig,
    registry: Arc<ExecutorRegistry>,
}

impl WaveEngine {
    /// Create an engine.
    pub fn new(config: EngineConfig, registry: ExecutorRegistry) -> Self {
        Self {
            config,
            registry: Arc::new(registry),
        }
    }

    /// The engine defaults.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The executor registry.
    pub fn registry(&self) -> &ExecutorRegistry {
        &self.registry
    }

    /// Analyze and schedule a plan without executing it.
    pub fn plan_waves(&self, plan: &Plan) -> Result<(ExecutionGraph, Schedule)> {
        let config = self.config.merged_with(&plan.settings);
        config.validate()?;
        Self::build(&config, plan)
    }

    fn build(config: &EngineConfig, plan: &Plan) -> Result<(ExecutionGraph, Schedule)> {
        let graph = DependencyAnalyzer::new(config.implicit_order).analyze_plan(plan)?;
        let schedule = WaveScheduler::new(config.scheduler_config()).schedule(&graph)?;
        Ok((graph, schedule))
    }

    /// Run a plan to completion.
    pub async fn run(&self, plan: &Plan) -> Result<AggregateReport> {
        self.run_with_cancellation(plan, CancellationToken::new())
            .await
    }

    /// Run a plan, stopping early when `cancel` fires.
    ///
    /// Waves not yet started are not dispatched; items in flight finish
    /// unless their executor observes the token.
    pub async fn run_with_cancellation(
        &self,
        plan: &Plan,
        cancel: CancellationToken,
    ) -> Result<AggregateReport> {
        let config = self.config.merged_with(&plan.settings);
        config.validate()?;
        let (graph, schedule) = Self::build(&config, plan)?;

        let run_id = RunId::new();
        let span = tracing::info_span!(
            "run",
            run_id = %run_id,
            plan = %plan.name,
            items = graph.len(),
            waves = schedule.len(),
        );

        let report = self
            .execute(&config, &plan.name, run_id, &graph, &schedule, &cancel)
            .instrument(span)
            .await;
        Ok(report)
    }

    /// Release executor resources.
    pub fn shutdown(&self) {
        self.registry.shutdown_all();
    }

    async fn execute(
        &self,
        config: &EngineConfig,
        plan_name: &str,
        run_id: RunId,
        graph: &ExecutionGraph,
        schedule: &Schedule,
        cancel: &CancellationToken,
    ) -> AggregateReport {
        let started = Instant::now();
        tracing::info!("Starting run");

        let dispatcher = Dispatcher::new(
            Arc::clone(&self.registry),
            config.retry.clone(),
            &config.type_caps,
        )
        .with_run_id(run_id);

        let mut results: HashMap<ItemId, ExecutionResult> = HashMap::with_capacity(graph.len());
        let mut dispatched_waves: usize = 0;
        let mut abort: Option<AbortInfo> = None;

        for wave in schedule.iter() {
            if cancel.is_cancelled() {
                tracing::warn!(wave = wave.index, "Run cancelled; remaining waves not dispatched");
                abort = Some(AbortInfo {
                    reason: AbortReason::Cancelled,
                    item_id: None,
                    wave: dispatched_waves.checked_sub(1),
                });
                break;
            }

            let mut runnable = Vec::with_capacity(wave.len());
            for id in &wave.items {
                match blocking_predecessor(graph, id, &results) {
                    Some(blocker) => {
                        tracing::debug!(item_id = %id, blocked_by = %blocker, "Skipping item");
                        let skipped = ExecutionResult::skipped(
                            id.clone(),
                            SkipReason::UpstreamFailed { item: blocker },
                        )
                        .in_wave(wave.index);
                        results.insert(id.clone(), skipped);
                    }
                    None => runnable.push(id.clone()),
                }
            }

            let wave_span = tracing::info_span!(
                "wave",
                index = wave.index,
                items = wave.len(),
                runnable = runnable.len(),
            );
            let wave_results = if runnable.is_empty() {
                Vec::new()
            } else {
                let runnable = Wave {
                    index: wave.index,
                    items: runnable,
                };
                dispatcher
                    .dispatch_wave(&runnable, graph, cancel)
                    .instrument(wave_span)
                    .await
            };
            dispatched_waves += 1;

            let mut critical_failure = None;
            for result in wave_results {
                let critical = graph
                    .item(result.item_id.as_str())
                    .is_some_and(|item| item.critical);
                if critical && result.is_failure() && critical_failure.is_none() {
                    critical_failure = Some(result.item_id.clone());
                }
                results.insert(result.item_id.clone(), result);
            }

            if let Some(item_id) = critical_failure {
                tracing::error!(
                    item_id = %item_id,
                    wave = wave.index,
                    "Critical item failed; aborting run"
                );
                abort = Some(AbortInfo {
                    reason: AbortReason::CriticalFailure,
                    item_id: Some(item_id),
                    wave: Some(wave.index),
                });
                break;
            }
        }

        if abort.is_none() && cancel.is_cancelled() {
            abort = Some(AbortInfo {
                reason: AbortReason::Cancelled,
                item_id: None,
                wave: dispatched_waves.checked_sub(1),
            });
        }

        let not_run_reason = match abort.as_ref().map(|info| info.reason) {
            Some(AbortReason::Cancelled) => SkipReason::Cancelled,
            _ => SkipReason::RunAborted,
        };

        let mut aggregator = ResultAggregator::new(config.aggregator_config());
        for item in graph.items() {
            let result = results.remove(&item.id).unwrap_or_else(|| {
                let result = ExecutionResult::not_run(item.id.clone(), not_run_reason.clone());
                match schedule.wave_of(item.id.as_str()) {
                    Some(wave) => result.in_wave(wave),
                    None => result,
                }
            });
            aggregator.record(item, result);
        }

        let waves = schedule
            .iter()
            .map(|wave| WaveSummary {
                index: wave.index,
                items: wave.items.clone(),
                executed: wave.index < dispatched_waves,
            })
            .collect();

        aggregator.finalize(RunOutcome {
            run_id,
            plan: plan_name.to_string(),
            waves,
            abort,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }
}

/// The first required predecessor of `id` that did not pass.
fn blocking_predecessor(
    graph: &ExecutionGraph,
    id: &ItemId,
    results: &HashMap<ItemId, ExecutionResult>,
) -> Option<ItemId> {
    graph
        .required_predecessors(id.as_str())
        .into_iter()
        .find(|pred| {
            results
                .get(pred.as_str())
                .is_none_or(|result| !result.is_success())
        })
        .cloned()
}
