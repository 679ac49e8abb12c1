//! Plan definition: the input handed over by the plan-producing side.

mod settings;

pub use settings::{Backoff, ImplicitOrder, PlanSettings, RetryPolicy};

use crate::error::{Result, WaverunError};
use crate::types::{DependencyEdge, WorkItem};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A complete plan: ordered work items, dependency edges and settings.
///
/// Declaration order of `items` is significant; it is the final
/// tie-breaker for scheduling and the default order for implicit edges.
///
/// # Example
///
/// ```yaml
/// name: nightly
/// items:
///   - id: migrate
///     type: db
///     modifies_shared_state: true
///     critical: true
///   - id: api_smoke
///     type: http
///   - id: checkout
///     type: e2e
///     exclusive_resources: [browser]
/// edges:
///   - from: migrate
///     to: api_smoke
///   - from: api_smoke
///     to: checkout
///     kind: service
/// settings:
///   max_parallel: 4
///   type_caps:
///     e2e: 1
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Plan name.
    #[serde(default)]
    pub name: String,

    /// Work items in declaration order.
    #[serde(default)]
    pub items: Vec<WorkItem>,

    /// Explicit dependency edges.
    #[serde(default)]
    pub edges: Vec<DependencyEdge>,

    /// Scheduling overrides.
    #[serde(default)]
    pub settings: PlanSettings,
}

impl Plan {
    /// Create an empty plan.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Append a work item.
    pub fn with_item(mut self, item: WorkItem) -> Self {
        self.items.push(item);
        self
    }

    /// Append a dependency edge.
    pub fn with_edge(mut self, edge: DependencyEdge) -> Self {
        self.edges.push(edge);
        self
    }

    /// Replace the settings.
    pub fn with_settings(mut self, settings: PlanSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Set the global concurrency budget.
    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.settings.max_parallel = Some(max_parallel);
        self
    }

    /// Parse a plan from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| WaverunError::PlanParse {
            cause: e.to_string(),
        })
    }

    /// Parse a plan from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| WaverunError::PlanParse {
            cause: e.to_string(),
        })
    }

    /// Load a plan from a file. `.json` files are read as JSON, anything
    /// else as YAML.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| WaverunError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            Self::from_json(&content)
        } else {
            Self::from_yaml(&content)
        }
    }
}
