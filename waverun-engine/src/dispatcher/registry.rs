//! Executor registry keyed by item type.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use waverun_core::traits::Executor;

/// Maps item types to the executors that run them.
///
/// Built once before a run and handed to the engine. An optional default
/// executor handles every type without an explicit entry.
#[derive(Clone, Default)]
pub struct ExecutorRegistry {
    executors: HashMap<String, Arc<dyn Executor>>,
    default: Option<Arc<dyn Executor>>,
}

impl ExecutorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an executor for a type, returning the one it replaced.
    pub fn register(
        &mut self,
        item_type: impl Into<String>,
        executor: Arc<dyn Executor>,
    ) -> Option<Arc<dyn Executor>> {
        self.executors.insert(item_type.into(), executor)
    }

    /// Builder form of [`register`](Self::register).
    pub fn with_executor(mut self, item_type: impl Into<String>, executor: Arc<dyn Executor>) -> Self {
        self.register(item_type, executor);
        self
    }

    /// Set the fallback executor for unregistered types.
    pub fn with_default(mut self, executor: Arc<dyn Executor>) -> Self {
        self.default = Some(executor);
        self
    }

    /// Find the executor for a type, falling back to the default.
    pub fn resolve(&self, item_type: &str) -> Option<Arc<dyn Executor>> {
        self.executors
            .get(item_type)
            .or(self.default.as_ref())
            .cloned()
    }

    /// Whether a type has an explicit entry.
    pub fn contains(&self, item_type: &str) -> bool {
        self.executors.contains_key(item_type)
    }

    /// Whether a default executor is set.
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// Registered types, sorted.
    pub fn types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.executors.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Number of explicit entries.
    pub fn len(&self) -> usize {
        self.executors.len()
    }

    /// Whether the registry has no entries and no default.
    pub fn is_empty(&self) -> bool {
        self.executors.is_empty() && self.default.is_none()
    }

    /// Call [`Executor::shutdown`] on every registered executor.
    pub fn shutdown_all(&self) {
        for executor in self.executors.values().chain(self.default.iter()) {
            tracing::debug!(executor = executor.name(), "Shutting down executor");
            executor.shutdown();
        }
    }
}

impl fmt::Debug for ExecutorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorRegistry")
            .field("types", &self.types())
            .field("default", &self.default.as_ref().map(|e| e.name().to_string()))
            .finish()
    }
}
