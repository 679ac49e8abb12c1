//! waverun core library
//!
//! Foundational types for the waverun wave scheduler: the plan data model,
//! the error type, and the executor boundary.
//!
//! # Key Components
//!
//! - **Types**: work items, dependency edges, execution results
//! - **Plan**: the input document and its scheduling/retry settings
//! - **Traits**: the [`Executor`] capability that performs a work item
//!
//! # Example
//!
//! ```
//! use waverun_core::prelude::*;
//!
//! let plan = Plan::new("smoke")
//!     .with_item(WorkItem::new("setup", "db").critical())
//!     .with_item(WorkItem::new("login", "http"))
//!     .with_edge(DependencyEdge::new("setup", "login"))
//!     .with_max_parallel(2);
//!
//! assert_eq!(plan.items.len(), 2);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod plan;
pub mod prelude;
pub mod traits;
pub mod types;

pub use error::{Result, WaverunError};
pub use plan::{Backoff, ImplicitOrder, Plan, PlanSettings, RetryPolicy};
pub use traits::{ErrorKind, ExecutionContext, ExecutionOutcome, Executor, ExecutorError};
pub use types::{
    DependencyEdge, DependencyKind, ExecutionResult, ExecutionStatus, ItemId, RunId, WorkItem,
};
