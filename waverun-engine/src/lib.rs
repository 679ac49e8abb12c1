//! waverun engine - dependency-aware wave execution.
//!
//! This crate turns a [`Plan`](waverun_core::Plan) into a run:
//! - Dependency analyzer: validation, implicit conflict edges, cycle detection
//! - Wave scheduler: deterministic partition into concurrency-bounded waves
//! - Dispatcher: concurrent execution with timeouts, retries and panic capture
//! - Result aggregator: counters, failure clusters and recommendations
//! - Engine: the wave loop with critical-failure abort and cancellation
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use waverun_engine::prelude::*;
//!
//! let registry = ExecutorRegistry::new().with_executor("unit", Arc::new(UnitRunner));
//! let engine = WaveEngine::new(EngineConfig::from_env(), registry);
//!
//! let plan = Plan::from_path("plan.yaml")?;
//! let report = engine.run(&plan).await?;
//! println!("{}", report.to_json_pretty()?);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod aggregator;
pub mod analyzer;
pub mod dispatcher;
pub mod engine;
pub mod observability;
pub mod scheduler;

pub use engine::{EngineConfig, WaveEngine};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::aggregator::{
        AbortInfo, AbortReason, AggregateReport, AggregatorConfig, Breakdown, FailureCluster,
        FailureEntry, Recommendation, RecommendationKind, ResultAggregator, RunOutcome, RunStatus,
        Summary, WaveSummary,
    };
    pub use crate::analyzer::{DependencyAnalyzer, ExecutionGraph};
    pub use crate::dispatcher::{Dispatcher, ExecutorRegistry};
    pub use crate::engine::{EngineConfig, WaveEngine};
    pub use crate::scheduler::{Schedule, SchedulerConfig, Wave, WaveScheduler};
    pub use waverun_core::prelude::*;
}
