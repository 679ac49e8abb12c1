//! CLI command implementations.

pub mod schedule;
pub mod validate;

use anyhow::{Context, Result};
use std::path::Path;
use waverun_core::Plan;
use waverun_engine::{EngineConfig, WaveEngine};
use waverun_engine::dispatcher::ExecutorRegistry;

/// Load a plan, failing with a readable message.
pub(crate) fn load_plan(file: &str) -> Result<Plan> {
    let path = Path::new(file);
    if !path.exists() {
        anyhow::bail!("Plan file not found: {}", file);
    }
    Plan::from_path(path).with_context(|| format!("Failed to load plan from {}", file))
}

/// An engine for dry runs. No executors are needed to plan waves.
pub(crate) fn planning_engine() -> WaveEngine {
    WaveEngine::new(EngineConfig::from_env(), ExecutorRegistry::new())
}
