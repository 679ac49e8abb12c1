//! Error types for waverun.
//!
//! Errors carry the identifiers needed to act on them (item ids, edge
//! endpoints, cycle members). Structural problems with a plan are fatal and
//! surface before any work item runs; execution-family errors describe the
//! outcome of a single item and are folded into its result instead of being
//! propagated out of a run.

use crate::types::ItemId;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for waverun operations.
#[derive(Error, Debug)]
pub enum WaverunError {
    // =========================================================================
    // Plan Validation Errors (E100-E199)
    // =========================================================================
    /// A work item was declared with an empty id.
    #[error("E101: Work item at position {position} has an empty id")]
    EmptyItemId {
        /// Declaration index of the offending item.
        position: usize,
    },

    /// Two work items share the same id.
    #[error("E102: Duplicate work item '{item_id}'")]
    DuplicateItem {
        /// The repeated identifier.
        item_id: ItemId,
    },

    /// An edge references an item that is not part of the plan.
    #[error("E103: Dependency {from} -> {to} references unknown item '{missing}'")]
    DanglingEdge {
        /// Source item of the edge.
        from: ItemId,
        /// Target item of the edge.
        to: ItemId,
        /// The endpoint that does not exist.
        missing: ItemId,
    },

    /// A work item definition is malformed.
    #[error("E104: Invalid work item '{item_id}': {cause}")]
    InvalidItem {
        /// The malformed item.
        item_id: ItemId,
        /// What is wrong with it.
        cause: String,
    },

    /// A scheduling or retry setting is out of range.
    #[error("E105: Invalid configuration value for '{field}': {cause}")]
    InvalidConfig {
        /// The setting name.
        field: String,
        /// Why the value was rejected.
        cause: String,
    },

    // =========================================================================
    // Graph Errors (E200-E299)
    // =========================================================================
    /// The dependency graph contains a cycle.
    #[error("E201: Circular dependency detected involving items: {}", format_ids(cycle))]
    CircularDependency {
        /// Members of the strongly connected component, in declaration order.
        cycle: Vec<ItemId>,
    },

    // =========================================================================
    // Scheduler Errors (E300-E399)
    // =========================================================================
    /// The scheduler found no ready item while items remained.
    ///
    /// This cannot happen for a graph produced by the analyzer and signals a
    /// bug in the analyzer/scheduler contract.
    #[error(
        "E301: Scheduler stalled with {} unscheduled items despite an acyclic graph: {}",
        remaining.len(),
        format_ids(remaining)
    )]
    UnsatisfiableDependencies {
        /// Items that could not be placed in any wave.
        remaining: Vec<ItemId>,
    },

    // =========================================================================
    // Item Execution Errors (E400-E499)
    // =========================================================================
    /// An executor reported an error for an item.
    #[error("E401: Item '{item_id}' execution failed: {cause}")]
    ItemExecution {
        /// The item that failed.
        item_id: ItemId,
        /// Reason for the failure.
        cause: String,
    },

    /// An item exceeded its timeout.
    #[error("E402: Item '{item_id}' timed out after {timeout_ms}ms")]
    ItemTimeout {
        /// The item that timed out.
        item_id: ItemId,
        /// Timeout in milliseconds.
        timeout_ms: u64,
    },

    /// An executor panicked while running an item.
    #[error("E403: Executor panicked while running item '{item_id}': {message}")]
    ItemPanic {
        /// The item being executed.
        item_id: ItemId,
        /// The panic payload, if it was a string.
        message: String,
    },

    /// No executor is registered for an item type and there is no default.
    #[error("E404: No executor registered for item type '{item_type}'")]
    ExecutorNotFound {
        /// The unresolved item type.
        item_type: String,
    },

    // =========================================================================
    // Parse Errors (E800-E899)
    // =========================================================================
    /// The plan document could not be parsed.
    #[error("E801: Failed to parse plan: {cause}")]
    PlanParse {
        /// Parser error message.
        cause: String,
    },

    /// JSON serialization failed.
    #[error("E802: Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // =========================================================================
    // I/O Errors (E900-E999)
    // =========================================================================
    /// Reading a plan file failed.
    #[error("E901: I/O error on {path}: {source}")]
    Io {
        /// The file being accessed.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

fn format_ids(ids: &[ItemId]) -> String {
    ids.iter()
        .map(ItemId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

impl WaverunError {
    /// Get the error code (e.g., "E201").
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyItemId { .. } => "E101",
            Self::DuplicateItem { .. } => "E102",
            Self::DanglingEdge { .. } => "E103",
            Self::InvalidItem { .. } => "E104",
            Self::InvalidConfig { .. } => "E105",
            Self::CircularDependency { .. } => "E201",
            Self::UnsatisfiableDependencies { .. } => "E301",
            Self::ItemExecution { .. } => "E401",
            Self::ItemTimeout { .. } => "E402",
            Self::ItemPanic { .. } => "E403",
            Self::ExecutorNotFound { .. } => "E404",
            Self::PlanParse { .. } => "E801",
            Self::Serialization(_) => "E802",
            Self::Io { .. } => "E901",
        }
    }

    /// Check if this error describes a malformed plan.
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyItemId { .. }
                | Self::DuplicateItem { .. }
                | Self::DanglingEdge { .. }
                | Self::InvalidItem { .. }
                | Self::InvalidConfig { .. }
        )
    }

    /// Check if this error prevents a run from producing a report.
    ///
    /// Execution-family errors are recovered into item results and are the
    /// only non-fatal variants.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::ItemExecution { .. }
                | Self::ItemTimeout { .. }
                | Self::ItemPanic { .. }
                | Self::ExecutorNotFound { .. }
        )
    }

    /// Check if this error is an internal invariant violation (a bug).
    #[must_use]
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::UnsatisfiableDependencies { .. })
    }
}

/// Result type alias using `WaverunError`.
pub type Result<T> = std::result::Result<T, WaverunError>;
