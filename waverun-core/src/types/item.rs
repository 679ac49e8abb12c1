//! Work item definitions.

use super::ItemId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

fn default_timeout_ms() -> u64 {
    60_000
}

/// A unit of schedulable work (for example, one test case).
///
/// Work items are supplied once by the plan and never mutated after the
/// execution graph is built.
///
/// # Example
///
/// ```yaml
/// id: checkout_flow
/// type: e2e
/// priority: 10
/// estimated_duration_ms: 4000
/// timeout_ms: 30000
/// critical: true
/// exclusive_resources: [db-lock]
/// group: payments
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Unique identifier.
    pub id: ItemId,

    /// Item type; selects the executor.
    #[serde(rename = "type")]
    pub item_type: String,

    /// Higher priorities run earlier among ready items.
    #[serde(default)]
    pub priority: i32,

    /// Expected run time, used as a scheduling tie-breaker.
    #[serde(default)]
    pub estimated_duration_ms: u64,

    /// Hard limit for a single attempt.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Failure of a critical item aborts the run.
    #[serde(default)]
    pub critical: bool,

    /// Items that modify shared state never run concurrently with each other.
    #[serde(default)]
    pub modifies_shared_state: bool,

    /// Named resources this item needs exclusive access to.
    #[serde(default)]
    pub exclusive_resources: BTreeSet<String>,

    /// Reporting group (suite, feature area, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    /// Opaque parameters handed to the executor.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub params: serde_json::Value,
}

impl WorkItem {
    /// Create a work item with default scheduling attributes.
    pub fn new(id: impl Into<ItemId>, item_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            item_type: item_type.into(),
            priority: 0,
            estimated_duration_ms: 0,
            timeout_ms: default_timeout_ms(),
            critical: false,
            modifies_shared_state: false,
            exclusive_resources: BTreeSet::new(),
            group: None,
            params: serde_json::Value::Null,
        }
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set the estimated duration in milliseconds.
    pub fn with_estimated_duration_ms(mut self, ms: u64) -> Self {
        self.estimated_duration_ms = ms;
        self
    }

    /// Set the per-attempt timeout in milliseconds.
    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = ms;
        self
    }

    /// Mark the item as critical.
    pub fn critical(mut self) -> Self {
        self.critical = true;
        self
    }

    /// Mark the item as modifying shared state.
    pub fn modifies_shared_state(mut self) -> Self {
        self.modifies_shared_state = true;
        self
    }

    /// Require exclusive access to a named resource.
    pub fn with_exclusive_resource(mut self, resource: impl Into<String>) -> Self {
        self.exclusive_resources.insert(resource.into());
        self
    }

    /// Set the reporting group.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Set executor parameters.
    pub fn with_params(mut self, params: serde_json::Value) -> Self {
        self.params = params;
        self
    }

    /// Per-attempt timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Estimated duration.
    pub fn estimated_duration(&self) -> Duration {
        Duration::from_millis(self.estimated_duration_ms)
    }

    /// Check whether two items conflict on shared state or an exclusive resource.
    pub fn conflicts_with(&self, other: &WorkItem) -> bool {
        (self.modifies_shared_state && other.modifies_shared_state)
            || !self.exclusive_resources.is_disjoint(&other.exclusive_resources)
    }
}
