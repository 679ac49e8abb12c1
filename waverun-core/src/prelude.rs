//! Prelude for convenient imports.
//!
//! ```
//! use waverun_core::prelude::*;
//! ```

// Core types
pub use crate::types::{
    Coverage, DependencyEdge, DependencyKind, ExecutionResult, ExecutionStatus, ItemId, RunId,
    SkipReason, WorkItem,
};

// Error handling
pub use crate::error::{Result, WaverunError};

// Plan
pub use crate::plan::{Backoff, ImplicitOrder, Plan, PlanSettings, RetryPolicy};

// Executor boundary
pub use crate::traits::{
    ErrorKind, ExecutionContext, ExecutionOutcome, Executor, ExecutorError, ExecutorFuture,
    Verdict,
};
