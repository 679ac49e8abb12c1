//! Logging configuration.

use std::env;
use std::str::FromStr;
use waverun_core::error::WaverunError;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per event, for log shippers.
    Json,
    /// Multi-line human-readable output.
    Pretty,
    /// Single-line human-readable output.
    #[default]
    Compact,
}

impl FromStr for LogFormat {
    type Err = WaverunError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => Err(WaverunError::InvalidConfig {
                field: "log_format".to_string(),
                cause: format!("expected 'json', 'pretty' or 'compact', got '{}'", other),
            }),
        }
    }
}

/// Configuration for the tracing subscriber.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    log_format: LogFormat,
    /// Filter directives, e.g. `info` or `warn,waverun_engine=debug`.
    log_filter: String,
    include_location: bool,
    include_target: bool,
    include_thread_ids: bool,
    /// Emit an event when a span closes (run, wave, item timings).
    span_close_events: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::default(),
            log_filter: "info".to_string(),
            include_location: false,
            include_target: true,
            include_thread_ids: false,
            span_close_events: false,
        }
    }
}

impl TracingConfig {
    /// Create a new builder.
    pub fn builder() -> TracingConfigBuilder {
        TracingConfigBuilder::default()
    }

    /// Create configuration from environment variables.
    ///
    /// - `WAVERUN_LOG_FORMAT`: `json`, `pretty` or `compact`; when unset,
    ///   compact on a terminal and JSON otherwise
    /// - `WAVERUN_LOG_LEVEL` or `RUST_LOG`: filter directives
    /// - `WAVERUN_LOG_LOCATION`: `true` to include file and line
    /// - `WAVERUN_LOG_SPANS`: `true` to log span close events
    pub fn from_env() -> Self {
        let log_format = env::var("WAVERUN_LOG_FORMAT")
            .ok()
            .and_then(|s| s.parse::<LogFormat>().ok())
            .unwrap_or_else(|| {
                if std::io::IsTerminal::is_terminal(&std::io::stderr()) {
                    LogFormat::Compact
                } else {
                    LogFormat::Json
                }
            });

        let log_filter = env::var("WAVERUN_LOG_LEVEL")
            .or_else(|_| env::var("RUST_LOG"))
            .unwrap_or_else(|_| "info".to_string());

        Self {
            log_format,
            log_filter,
            include_location: env_flag("WAVERUN_LOG_LOCATION"),
            include_target: true,
            include_thread_ids: false,
            span_close_events: env_flag("WAVERUN_LOG_SPANS"),
        }
    }

    /// Replace the filter directives.
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// Get the log format.
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Get the filter directives.
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Whether file and line are included.
    pub fn include_location(&self) -> bool {
        self.include_location
    }

    /// Whether the event target is included.
    pub fn include_target(&self) -> bool {
        self.include_target
    }

    /// Whether thread ids are included.
    pub fn include_thread_ids(&self) -> bool {
        self.include_thread_ids
    }

    /// Whether span close events are logged.
    pub fn span_close_events(&self) -> bool {
        self.span_close_events
    }
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|s| s.eq_ignore_ascii_case("true") || s == "1")
        .unwrap_or(false)
}

/// Builder for [`TracingConfig`].
#[derive(Debug, Clone, Default)]
pub struct TracingConfigBuilder {
    log_format: Option<LogFormat>,
    log_filter: Option<String>,
    include_location: Option<bool>,
    include_target: Option<bool>,
    include_thread_ids: Option<bool>,
    span_close_events: Option<bool>,
}

impl TracingConfigBuilder {
    /// Set the log format.
    pub fn log_format(mut self, format: LogFormat) -> Self {
        self.log_format = Some(format);
        self
    }

    /// Set the filter directives.
    pub fn log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = Some(filter.into());
        self
    }

    /// Include file and line.
    pub fn include_location(mut self, include: bool) -> Self {
        self.include_location = Some(include);
        self
    }

    /// Include the event target.
    pub fn include_target(mut self, include: bool) -> Self {
        self.include_target = Some(include);
        self
    }

    /// Include thread ids.
    pub fn include_thread_ids(mut self, include: bool) -> Self {
        self.include_thread_ids = Some(include);
        self
    }

    /// Log span close events.
    pub fn span_close_events(mut self, enable: bool) -> Self {
        self.span_close_events = Some(enable);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> TracingConfig {
        let defaults = TracingConfig::default();
        TracingConfig {
            log_format: self.log_format.unwrap_or(defaults.log_format),
            log_filter: self.log_filter.unwrap_or(defaults.log_filter),
            include_location: self.include_location.unwrap_or(defaults.include_location),
            include_target: self.include_target.unwrap_or(defaults.include_target),
            include_thread_ids: self
                .include_thread_ids
                .unwrap_or(defaults.include_thread_ids),
            span_close_events: self
                .span_close_events
                .unwrap_or(defaults.span_close_events),
        }
    }
}
