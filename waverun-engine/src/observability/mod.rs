//! Structured logging setup.
//!
//! The engine emits `tracing` spans and events throughout: a `run` span per
//! run, a `wave` span per dispatched wave and an `item_execution` span per
//! item. This module installs a subscriber for binaries.
//!
//! # Configuration
//!
//! Output format is controlled via `WAVERUN_LOG_FORMAT`:
//! - `json` - one JSON object per event
//! - `pretty` - multi-line human-readable output
//! - `compact` - single-line output (default on a terminal)
//!
//! The filter comes from `WAVERUN_LOG_LEVEL`, then `RUST_LOG`.
//!
//! # Example
//!
//! ```ignore
//! use waverun_engine::observability::{LogFormat, TracingConfig, init_tracing};
//!
//! let config = TracingConfig::builder()
//!     .log_format(LogFormat::Json)
//!     .log_filter("waverun_engine=debug")
//!     .build();
//! init_tracing(&config)?;
//! ```

mod config;
mod tracing_setup;

pub use config::{LogFormat, TracingConfig, TracingConfigBuilder};
pub use tracing_setup::init_tracing;
