//! Core data model: identifiers, work items, dependency edges and results.

mod edge;
mod ids;
mod item;
mod result;

pub use edge::{DependencyEdge, DependencyKind};
pub use ids::{ItemId, RunId};
pub use item::WorkItem;
pub use result::{
    CATEGORY_ASSERTION, CATEGORY_EXECUTOR_NOT_FOUND, CATEGORY_TIMEOUT, Coverage, ExecutionResult,
    ExecutionStatus, SkipReason,
};
