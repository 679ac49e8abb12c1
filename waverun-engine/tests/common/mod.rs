//! Common test utilities for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use waverun_core::prelude::*;
use waverun_engine::prelude::{EngineConfig, ExecutorRegistry, WaveEngine};

/// What a scripted item does when executed.
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Pass immediately.
    Pass,
    /// Return a failed verdict with the given category.
    Fail(&'static str),
    /// Return an executor error of the given kind.
    Error(ErrorKind),
    /// Panic inside the executor.
    Panic,
    /// Sleep, then pass.
    Sleep(u64),
    /// Wait for run cancellation, then report it.
    AwaitCancel,
    /// Pass with coverage figures attached.
    Coverage(f64),
}

impl Behavior {
    /// Carry out the behavior for one call.
    pub async fn perform(
        self,
        item: &WorkItem,
        ctx: ExecutionContext,
    ) -> std::result::Result<ExecutionOutcome, ExecutorError> {
        match self {
            Behavior::Pass => Ok(ExecutionOutcome::passed(format!("{} ok", item.id))),
            Behavior::Fail(category) => {
                Ok(ExecutionOutcome::failed(format!("{} failed", item.id)).with_category(category))
            }
            Behavior::Error(kind) => Err(ExecutorError::new(kind, "scripted error")),
            Behavior::Panic => panic!("scripted panic in {}", item.id),
            Behavior::Sleep(ms) => {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Ok(ExecutionOutcome::passed("slept"))
            }
            Behavior::AwaitCancel => {
                ctx.cancellation.cancelled().await;
                Err(ExecutorError::cancelled())
            }
            Behavior::Coverage(line) => {
                let mut coverage = Coverage::new();
                coverage.insert("line".to_string(), line);
                Ok(ExecutionOutcome::passed("").with_coverage(coverage))
            }
        }
    }
}

/// An executor driven by a per-item script. Unscripted items pass.
///
/// Records `(item_id, wave)` for every call.
#[derive(Default)]
pub struct ScriptedExecutor {
    behaviors: HashMap<String, Behavior>,
    calls: Mutex<Vec<(String, usize)>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, id: &str, behavior: Behavior) -> Self {
        self.behaviors.insert(id.to_string(), behavior);
        self
    }

    pub fn calls(&self) -> Vec<(String, usize)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn was_called(&self, id: &str) -> bool {
        self.calls().iter().any(|(called, _)| called == id)
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Executor for ScriptedExecutor {
    fn name(&self) -> &str {
        "scripted"
    }

    fn execute<'a>(&'a self, item: &'a WorkItem, ctx: ExecutionContext) -> ExecutorFuture<'a> {
        self.calls
            .lock()
            .unwrap()
            .push((item.id.to_string(), ctx.wave));
        let behavior = self
            .behaviors
            .get(item.id.as_str())
            .cloned()
            .unwrap_or(Behavior::Pass);

        Box::pin(behavior.perform(item, ctx))
    }
}

/// Plays one behavior per call, in order; the last one repeats.
///
/// Records the (virtual) instant of every call.
pub struct SequencedExecutor {
    script: Vec<Behavior>,
    calls: Mutex<Vec<Instant>>,
}

impl SequencedExecutor {
    pub fn new(script: Vec<Behavior>) -> Self {
        assert!(!script.is_empty(), "script needs at least one behavior");
        Self {
            script,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Time elapsed between consecutive calls.
    pub fn gaps(&self) -> Vec<Duration> {
        let calls = self.calls.lock().unwrap();
        calls.windows(2).map(|pair| pair[1] - pair[0]).collect()
    }
}

impl Executor for SequencedExecutor {
    fn name(&self) -> &str {
        "sequenced"
    }

    fn execute<'a>(&'a self, item: &'a WorkItem, ctx: ExecutionContext) -> ExecutorFuture<'a> {
        let behavior = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(Instant::now());
            let turn = (calls.len() - 1).min(self.script.len() - 1);
            self.script[turn].clone()
        };
        Box::pin(behavior.perform(item, ctx))
    }
}

/// Fails with a transient error a fixed number of times, then passes.
pub struct FlakyExecutor {
    failures: u32,
    calls: AtomicU32,
}

impl FlakyExecutor {
    pub fn new(failures: u32) -> Self {
        Self {
            failures,
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Executor for FlakyExecutor {
    fn name(&self) -> &str {
        "flaky"
    }

    fn execute<'a>(&'a self, _item: &'a WorkItem, _ctx: ExecutionContext) -> ExecutorFuture<'a> {
        Box::pin(async move {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures {
                Err(ExecutorError::transient(format!("attempt {} failed", call)))
            } else {
                Ok(ExecutionOutcome::passed("ok"))
            }
        })
    }
}

/// Tracks the maximum number of concurrent executions.
pub struct MaxConcurrencyExecutor {
    current: AtomicUsize,
    max_observed: AtomicUsize,
    hold_ms: u64,
}

impl MaxConcurrencyExecutor {
    pub fn new(hold_ms: u64) -> Self {
        Self {
            current: AtomicUsize::new(0),
            max_observed: AtomicUsize::new(0),
            hold_ms,
        }
    }

    pub fn max_observed(&self) -> usize {
        self.max_observed.load(Ordering::SeqCst)
    }
}

impl Executor for MaxConcurrencyExecutor {
    fn name(&self) -> &str {
        "max_concurrency"
    }

    fn execute<'a>(&'a self, _item: &'a WorkItem, _ctx: ExecutionContext) -> ExecutorFuture<'a> {
        Box::pin(async move {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_observed.fetch_max(now, Ordering::SeqCst);

            tokio::time::sleep(Duration::from_millis(self.hold_ms)).await;

            self.current.fetch_sub(1, Ordering::SeqCst);
            Ok(ExecutionOutcome::passed(""))
        })
    }
}

/// Registry with a single executor as the default for every type.
pub fn registry_with(executor: Arc<dyn Executor>) -> ExecutorRegistry {
    ExecutorRegistry::new().with_default(executor)
}

/// Engine running every type through `executor`.
pub fn engine_with(executor: Arc<dyn Executor>, max_parallel: usize) -> WaveEngine {
    WaveEngine::new(
        EngineConfig::default().with_max_parallel(max_parallel),
        registry_with(executor),
    )
}

/// Items A, B, C, D with A -> B -> D and C independent.
pub fn example_a_plan() -> Plan {
    Plan::new("example-a")
        .with_item(WorkItem::new("A", "unit"))
        .with_item(WorkItem::new("B", "unit"))
        .with_item(WorkItem::new("C", "unit"))
        .with_item(WorkItem::new("D", "unit"))
        .with_edge(DependencyEdge::new("A", "B"))
        .with_edge(DependencyEdge::new("B", "D"))
}

/// A chain of `waves` single-item waves: w0 -> w1 -> ...
pub fn chain_plan(waves: usize) -> Plan {
    let mut plan = Plan::new("chain");
    for i in 0..waves {
        plan = plan.with_item(WorkItem::new(format!("w{}", i), "unit"));
        if i > 0 {
            plan = plan.with_edge(DependencyEdge::new(
                format!("w{}", i - 1),
                format!("w{}", i),
            ));
        }
    }
    plan
}

/// A layered DAG: `layers` layers of `width` items, each item depending on
/// every item of the previous layer.
pub fn layered_plan(layers: usize, width: usize) -> Plan {
    let mut plan = Plan::new("layered");
    for layer in 0..layers {
        for slot in 0..width {
            plan = plan.with_item(WorkItem::new(format!("l{}_{}", layer, slot), "unit"));
            if layer > 0 {
                for prev in 0..width {
                    plan = plan.with_edge(DependencyEdge::new(
                        format!("l{}_{}", layer - 1, prev),
                        format!("l{}_{}", layer, slot),
                    ));
                }
            }
        }
    }
    plan
}
