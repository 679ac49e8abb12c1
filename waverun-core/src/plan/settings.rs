//! Scheduling and retry settings.

use crate::error::{Result, WaverunError};
use crate::traits::ErrorKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;
use std::time::Duration;

/// Delay between retry attempts.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Backoff {
    /// Retry immediately.
    #[default]
    None,
    /// Wait the same delay before every retry.
    Fixed {
        /// Delay in milliseconds.
        delay_ms: u64,
    },
    /// Multiply the delay after every retry, up to a ceiling.
    Exponential {
        /// Delay before the first retry, in milliseconds.
        initial_ms: u64,
        /// Growth factor per retry.
        multiplier: f64,
        /// Upper bound on a single delay, in milliseconds.
        max_ms: u64,
    },
}

impl Backoff {
    /// Delay before retry number `retry` (1 for the first retry).
    pub fn delay(&self, retry: u32) -> Duration {
        match self {
            Self::None => Duration::ZERO,
            Self::Fixed { delay_ms } => Duration::from_millis(*delay_ms),
            Self::Exponential {
                initial_ms,
                multiplier,
                max_ms,
            } => {
                let exponent = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
                let raw = *initial_ms as f64 * multiplier.powi(exponent);
                let capped = if raw.is_finite() {
                    raw.min(*max_ms as f64)
                } else {
                    *max_ms as f64
                };
                Duration::from_millis(capped as u64)
            }
        }
    }
}

/// Retry policy applied to every item of a run.
///
/// The default performs a single attempt. Retry counts and backoff are
/// deployment decisions, so nothing beyond that is assumed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts per item, including the first one.
    pub max_attempts: u32,
    /// Delay between attempts.
    pub backoff: Backoff,
    /// Retry items whose executor returned a failed verdict.
    pub retry_on_failure: bool,
    /// Retry items that timed out.
    pub retry_on_timeout: bool,
    /// Executor error kinds that are worth retrying.
    pub retryable_errors: BTreeSet<ErrorKind>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            backoff: Backoff::None,
            retry_on_failure: false,
            retry_on_timeout: false,
            retryable_errors: BTreeSet::new(),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self::default()
    }

    /// Set the total number of attempts.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the backoff.
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Retry failed verdicts.
    pub fn retry_failures(mut self) -> Self {
        self.retry_on_failure = true;
        self
    }

    /// Retry timeouts.
    pub fn retry_timeouts(mut self) -> Self {
        self.retry_on_timeout = true;
        self
    }

    /// Retry executor errors of the given kind.
    pub fn retry_error(mut self, kind: ErrorKind) -> Self {
        self.retryable_errors.insert(kind);
        self
    }

    /// Whether an executor error of this kind may be retried.
    ///
    /// Cancellation is never retried.
    pub fn is_retryable_error(&self, kind: ErrorKind) -> bool {
        kind != ErrorKind::Cancelled && self.retryable_errors.contains(&kind)
    }

    /// Whether another attempt is allowed after `attempts` attempts.
    pub fn has_attempts_left(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }

    /// Validate the policy.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(WaverunError::InvalidConfig {
                field: "retry.max_attempts".to_string(),
                cause: "must be at least 1".to_string(),
            });
        }
        if let Backoff::Exponential { multiplier, .. } = self.backoff {
            if !multiplier.is_finite() || multiplier < 1.0 {
                return Err(WaverunError::InvalidConfig {
                    field: "retry.backoff.multiplier".to_string(),
                    cause: format!("must be a finite value >= 1.0, got {}", multiplier),
                });
            }
        }
        Ok(())
    }
}

/// Order in which conflicting items are serialized by implicit edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImplicitOrder {
    /// Earlier-declared items run first.
    #[default]
    Declaration,
    /// Higher-priority items run first; ties keep declaration order.
    Priority,
}

impl FromStr for ImplicitOrder {
    type Err = WaverunError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "declaration" => Ok(Self::Declaration),
            "priority" => Ok(Self::Priority),
            other => Err(WaverunError::InvalidConfig {
                field: "implicit_order".to_string(),
                cause: format!("expected 'declaration' or 'priority', got '{}'", other),
            }),
        }
    }
}

/// Per-plan overrides of the engine configuration.
///
/// Unset fields fall back to the engine defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanSettings {
    /// Global concurrency budget per wave.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_parallel: Option<usize>,

    /// Per-type concurrency caps.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub type_caps: BTreeMap<String, usize>,

    /// Retry policy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryPolicy>,

    /// Conflict order for implicit edges.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implicit_order: Option<ImplicitOrder>,
}
