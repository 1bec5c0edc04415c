//! # Structured Logging
//!
//! Blocks emit `tracing` events (construction parameters at `info`, state
//! changes at `debug`, look-ahead and tag anomalies at `warn`). This module
//! installs a `tracing-subscriber` for them with:
//!
//! - Multiple output formats (JSON, Pretty, Compact)
//! - Log level filtering, overridable with `RUST_LOG`
//! - Per-module filter directives
//!
//! ## Example
//!
//! ```rust,ignore
//! use streamblocks_core::observe::{init_logging, LogConfig, LogFormat, LogLevel};
//!
//! let config = LogConfig {
//!     level: LogLevel::Debug,
//!     format: LogFormat::Json,
//!     ..Default::default()
//! };
//!
//! init_logging(&config);
//!
//! tracing::info!(items = 1024, "window processed");
//! ```

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer, Registry};

/// Log level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format (machine-readable)
    Json,
    /// Pretty format (human-readable, colored)
    Pretty,
    /// Compact format (minimal, one line per event)
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        LogFormat::Compact
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    /// Include timestamps
    pub timestamps: bool,
    /// Include source location (file:line)
    pub source_location: bool,
    pub thread_ids: bool,
    pub thread_names: bool,
    /// Module filter (e.g., "streamblocks_core::peak_detector=trace")
    pub filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            timestamps: true,
            source_location: false,
            thread_ids: false,
            thread_names: false,
            filter: None,
        }
    }
}

impl LogConfig {
    /// Verbose, pretty output for working on block internals.
    pub fn development() -> Self {
        Self {
            level: LogLevel::Debug,
            format: LogFormat::Pretty,
            source_location: true,
            thread_names: true,
            ..Default::default()
        }
    }

    /// JSON output at info level.
    pub fn production() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Json,
            timestamps: true,
            thread_ids: true,
            ..Default::default()
        }
    }

    /// Errors only.
    pub fn quiet() -> Self {
        Self {
            level: LogLevel::Error,
            format: LogFormat::Compact,
            timestamps: false,
            ..Default::default()
        }
    }

    /// Filter directive used when `RUST_LOG` is unset.
    ///
    /// The configured level applies globally and the custom filter, if any,
    /// is appended so its per-module directives take precedence.
    pub fn filter_directive(&self) -> String {
        match self.filter.as_deref().map(str::trim) {
            Some(custom) if !custom.is_empty() => format!("{},{}", self.level, custom),
            _ => self.level.to_string(),
        }
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn fmt_layer(config: &LogConfig) -> BoxedLayer {
    let layer = fmt::layer()
        .with_file(config.source_location)
        .with_line_number(config.source_location)
        .with_thread_ids(config.thread_ids)
        .with_thread_names(config.thread_names);

    match (config.format, config.timestamps) {
        (LogFormat::Json, true) => layer.json().boxed(),
        (LogFormat::Json, false) => layer.json().without_time().boxed(),
        (LogFormat::Pretty, true) => layer.pretty().boxed(),
        (LogFormat::Pretty, false) => layer.pretty().without_time().boxed(),
        (LogFormat::Compact, true) => layer.compact().boxed(),
        (LogFormat::Compact, false) => layer.compact().without_time().boxed(),
    }
}

/// Initialize the global logging subscriber.
///
/// `RUST_LOG` overrides the configured level and filter. Only the first call
/// installs a subscriber; later calls return `false`.
pub fn init_logging(config: &LogConfig) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::try_new(config.filter_directive())
            .unwrap_or_else(|_| EnvFilter::new(config.level.to_string()))
    });

    let subscriber = tracing_subscriber::registry()
        .with(fmt_layer(config))
        .with(filter);

    tracing::subscriber::set_global_default(subscriber).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_display() {
        assert_eq!(format!("{}", LogLevel::Trace), "trace");
        assert_eq!(format!("{}", LogLevel::Debug), "debug");
        assert_eq!(format!("{}", LogLevel::Warn), "warn");
    }

    #[test]
    fn test_config_presets() {
        let dev = LogConfig::development();
        assert_eq!(dev.level, LogLevel::Debug);
        assert_eq!(dev.format, LogFormat::Pretty);
        assert!(dev.source_location);

        let prod = LogConfig::production();
        assert_eq!(prod.format, LogFormat::Json);
        assert!(prod.thread_ids);

        let quiet = LogConfig::quiet();
        assert_eq!(quiet.level, LogLevel::Error);
        assert!(!quiet.timestamps);
    }

    #[test]
    fn test_filter_directive() {
        let mut config = LogConfig::default();
        assert_eq!(config.filter_directive(), "info");

        config.filter = Some("streamblocks_core::time_keeper=trace".to_string());
        assert_eq!(
            config.filter_directive(),
            "info,streamblocks_core::time_keeper=trace"
        );

        config.filter = Some("  ".to_string());
        assert_eq!(config.filter_directive(), "info");
    }

    #[test]
    fn test_partial_deserialize() {
        let config: LogConfig = serde_yaml::from_str("level: warn").unwrap();
        assert_eq!(config.level, LogLevel::Warn);
        assert_eq!(config.format, LogFormat::Compact);
        assert!(config.timestamps);
    }

    #[test]
    fn test_init_logging_once() {
        init_logging(&LogConfig::quiet());
        // Whatever the first call did, a second install must be refused.
        assert!(!init_logging(&LogConfig::quiet()));
    }
}
