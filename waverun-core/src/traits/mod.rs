//! Core abstractions at the executor boundary.

mod executor;

pub use executor::{
    ErrorKind, ExecutionContext, ExecutionOutcome, Executor, ExecutorError, ExecutorFuture,
    Verdict,
};
