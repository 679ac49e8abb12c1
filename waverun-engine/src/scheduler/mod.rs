//! Wave scheduler.
//!
//! Partitions a validated [`ExecutionGraph`] into an ordered sequence of
//! [`Wave`]s. Each iteration collects the items whose predecessors have all
//! been scheduled, orders them by
//! 1. priority, highest first
//! 2. estimated duration, shortest first
//! 3. the iteration in which the item became ready, oldest first
//! 4. declaration order
//!
//! and fills the next wave up to `max_parallel` items while respecting
//! per-type caps. Ready items that do not fit wait for a later wave. The
//! assignment is fully determined by the graph and the budget.

mod wave;

pub use wave::{Schedule, Wave};

use crate::analyzer::ExecutionGraph;
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use waverun_core::error::{Result, WaverunError};
use waverun_core::types::ItemId;

/// Concurrency budget for the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Maximum items per wave.
    pub max_parallel: usize,
    /// Maximum items of a given type per wave.
    pub type_caps: BTreeMap<String, usize>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_parallel: 4,
            type_caps: BTreeMap::new(),
        }
    }
}

impl SchedulerConfig {
    /// Create a config with a global budget and no type caps.
    pub fn new(max_parallel: usize) -> Self {
        Self {
            max_parallel,
            type_caps: BTreeMap::new(),
        }
    }

    /// Cap the number of items of one type per wave.
    pub fn with_type_cap(mut self, item_type: impl Into<String>, cap: usize) -> Self {
        self.type_caps.insert(item_type.into(), cap);
        self
    }

    /// Cap for a type, if any.
    pub fn type_cap(&self, item_type: &str) -> Option<usize> {
        self.type_caps.get(item_type).copied()
    }

    /// Reject budgets that could never place an item.
    pub fn validate(&self) -> Result<()> {
        if self.max_parallel == 0 {
            return Err(WaverunError::InvalidConfig {
                field: "max_parallel".to_string(),
                cause: "must be at least 1".to_string(),
            });
        }
        if let Some((item_type, _)) = self.type_caps.iter().find(|&(_, cap)| *cap == 0) {
            return Err(WaverunError::InvalidConfig {
                field: format!("type_caps.{}", item_type),
                cause: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// A ready item waiting for a wave slot.
#[derive(Debug, Clone, Copy)]
struct ReadyEntry {
    idx: usize,
    ready_since: usize,
}

/// Computes wave sequences.
#[derive(Debug, Clone, Default)]
pub struct WaveScheduler {
    config: SchedulerConfig,
}

impl WaveScheduler {
    /// Create a scheduler.
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    /// The concurrency budget.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Partition the graph into waves.
    ///
    /// # Errors
    ///
    /// - [`WaverunError::InvalidConfig`] for a zero budget or type cap
    /// - [`WaverunError::UnsatisfiableDependencies`] if no item is ready
    ///   while items remain; this indicates a bug, since analyzed graphs are
    ///   acyclic
    pub fn schedule(&self, graph: &ExecutionGraph) -> Result<Schedule> {
        self.config.validate()?;

        let n = graph.len();
        let mut pending_preds: Vec<usize> = (0..n)
            .map(|idx| graph.predecessor_indices(idx).count())
            .collect();
        let mut scheduled = vec![false; n];
        let mut scheduled_count = 0;

        let mut ready: Vec<ReadyEntry> = (0..n)
            .filter(|&idx| pending_preds[idx] == 0)
            .map(|idx| ReadyEntry {
                idx,
                ready_since: 0,
            })
            .collect();

        let mut waves = Vec::new();

        while scheduled_count < n {
            let iteration = waves.len();

            ready.sort_by_key(|entry| {
                let item = graph.item_at(entry.idx);
                (
                    Reverse(item.priority),
                    item.estimated_duration_ms,
                    entry.ready_since,
                    entry.idx,
                )
            });

            let mut selected: Vec<usize> = Vec::new();
            let mut per_type: HashMap<&str, usize> = HashMap::new();
            let mut waiting = Vec::new();

            for entry in ready.drain(..) {
                let item_type = graph.item_at(entry.idx).item_type.as_str();
                let type_count = per_type.get(item_type).copied().unwrap_or(0);
                let under_cap = self
                    .config
                    .type_cap(item_type)
                    .is_none_or(|cap| type_count < cap);

                if selected.len() < self.config.max_parallel && under_cap {
                    selected.push(entry.idx);
                    *per_type.entry(item_type).or_default() += 1;
                } else {
                    waiting.push(entry);
                }
            }
            ready = waiting;

            if selected.is_empty() {
                let remaining: Vec<ItemId> = (0..n)
                    .filter(|&idx| !scheduled[idx])
                    .map(|idx| graph.item_at(idx).id.clone())
                    .collect();
                tracing::error!(
                    remaining = remaining.len(),
                    waves = waves.len(),
                    "Scheduler stalled on an acyclic graph"
                );
                return Err(WaverunError::UnsatisfiableDependencies { remaining });
            }

            for &idx in &selected {
                scheduled[idx] = true;
                scheduled_count += 1;
                for succ in graph.successor_indices(idx) {
                    pending_preds[succ] -= 1;
                    if pending_preds[succ] == 0 {
                        ready.push(ReadyEntry {
                            idx: succ,
                            ready_since: iteration + 1,
                        });
                    }
                }
            }

            let wave = Wave {
                index: iteration,
                items: selected
                    .iter()
                    .map(|&idx| graph.item_at(idx).id.clone())
                    .collect(),
            };
            tracing::trace!(
                wave = wave.index,
                size = wave.len(),
                waiting = ready.len(),
                "Wave scheduled"
            );
            waves.push(wave);
        }

        tracing::debug!(
            items = n,
            waves = waves.len(),
            max_parallel = self.config.max_parallel,
            "Schedule computed"
        );

        Ok(Schedule::new(waves))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::DependencyAnalyzer;
    use waverun_core::types::{DependencyEdge, WorkItem};

    fn example_a() -> ExecutionGraph {
        DependencyAnalyzer::default()
            .analyze(
                vec![
                    WorkItem::new("A", "unit"),
                    WorkItem::new("B", "unit"),
                    WorkItem::new("C", "unit"),
                    WorkItem::new("D", "unit"),
                ],
                &[DependencyEdge::new("A", "B"), DependencyEdge::new("B", "D")],
            )
            .unwrap()
    }

    #[test]
    fn example_a_two_parallel() {
        let schedule = WaveScheduler::new(SchedulerConfig::new(2))
            .schedule(&example_a())
            .unwrap();
        assert_eq!(
            schedule.as_id_lists(),
            vec![vec!["A", "C"], vec!["B"], vec!["D"]]
        );
    }

    #[test]
    fn example_a_sequential() {
        let schedule = WaveScheduler::new(SchedulerConfig::new(1))
            .schedule(&example_a())
            .unwrap();
        assert_eq!(
            schedule.as_id_lists(),
            vec![vec!["A"], vec!["C"], vec!["B"], vec!["D"]]
        );
        assert_eq!(schedule.wave_of("B"), Some(2));
    }

    #[test]
    fn priority_then_duration_ordering() {
        let graph = DependencyAnalyzer::default()
            .analyze(
                vec![
                    WorkItem::new("slow", "unit").with_estimated_duration_ms(900),
                    WorkItem::new("fast", "unit").with_estimated_duration_ms(10),
                    WorkItem::new("urgent", "unit")
                        .with_priority(5)
                        .with_estimated_duration_ms(5_000),
                ],
                &[],
            )
            .unwrap();

        let schedule = WaveScheduler::new(SchedulerConfig::new(1))
            .schedule(&graph)
            .unwrap();
        assert_eq!(
            schedule.as_id_lists(),
            vec![vec!["urgent"], vec!["fast"], vec!["slow"]]
        );
    }

    #[test]
    fn type_cap_defers_extra_items() {
        let graph = DependencyAnalyzer::default()
            .analyze(
                vec![
                    WorkItem::new("e1", "e2e"),
                    WorkItem::new("e2", "e2e"),
                    WorkItem::new("u1", "unit"),
                    WorkItem::new("u2", "unit"),
                ],
                &[],
            )
            .unwrap();

        let schedule = WaveScheduler::new(SchedulerConfig::new(3).with_type_cap("e2e", 1))
            .schedule(&graph)
            .unwrap();
        assert_eq!(
            schedule.as_id_lists(),
            vec![vec!["e1", "u1", "u2"], vec!["e2"]]
        );
    }

    #[test]
    fn zero_budget_rejected() {
        let err = WaveScheduler::new(SchedulerConfig::new(0))
            .schedule(&example_a())
            .unwrap_err();
        assert_eq!(err.code(), "E105");

        let err = WaveScheduler::new(SchedulerConfig::new(2).with_type_cap("unit", 0))
            .schedule(&example_a())
            .unwrap_err();
        assert_eq!(err.code(), "E105");
    }

    #[test]
    fn empty_graph_has_no_waves() {
        let graph = DependencyAnalyzer::default().analyze(vec![], &[]).unwrap();
        let schedule = WaveScheduler::default().schedule(&graph).unwrap();
        assert!(schedule.is_empty());
        assert_eq!(schedule.total_items(), 0);
    }
}
