//! # Configuration System
//!
//! YAML configuration for the stream blocks:
//!
//! - Logging (level, format, filters)
//! - Depuncturer pattern
//! - Peak detector parameters
//! - Time keeper stream parameters
//!
//! ## Configuration Search Path
//!
//! Configuration is loaded from the first file found:
//! 1. Path specified via `STREAMBLOCKS_CONFIG` environment variable
//! 2. `./streamblocks.yaml` (current directory)
//! 3. `~/.config/streamblocks/config.yaml` (user config)
//! 4. `/etc/streamblocks/config.yaml` (system config)
//!
//! ## Example Configuration
//!
//! ```yaml
//! depuncture:
//!   pattern: [1, 1, 0, 1]
//!
//! peak_detector:
//!   min_len: 2
//!   lockout: 16
//!   alpha: 0.25
//!   look_ahead: 4
//!
//! time_keeper:
//!   item_size: 8
//!   sample_rate: 1.0e6
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::depuncture::{flags_to_pattern, validate_pattern, PuncturePattern};
use crate::observe::logging::LogConfig;

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV: &str = "STREAMBLOCKS_CONFIG";

/// Error type for configuration operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("config not found: {0}")]
    NotFound(String),
    #[error("failed to read config: {0}")]
    Read(String),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Validation(String),
}

/// Depuncturer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepunctureConfig {
    /// Keep flags, nonzero = symbol was transmitted
    pub pattern: Vec<i32>,
}

impl Default for DepunctureConfig {
    fn default() -> Self {
        Self {
            pattern: PuncturePattern::Rate2_3.flags().to_vec(),
        }
    }
}

/// Peak detector configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeakDetectorConfig {
    /// Minimum ratio of the sample closing a run to its first sample,
    /// 0 disables the check
    pub min_diff: f32,
    /// Minimum run length before a peak may be accepted
    pub min_len: usize,
    /// Samples suppressed after a confirmed peak
    pub lockout: usize,
    /// Fraction of the moving average the threshold is relaxed by,
    /// threshold = avg - avg * drop
    pub drop: f32,
    /// EMA coefficient in (0, 1], 1.0 = no smoothing
    pub alpha: f32,
    /// Samples a tentative peak must survive before confirmation
    pub look_ahead: usize,
}

impl Default for PeakDetectorConfig {
    fn default() -> Self {
        Self {
            min_diff: 0.0,
            min_len: 1,
            lockout: 0,
            drop: 0.0,
            alpha: 1.0,
            look_ahead: 0,
        }
    }
}

/// Time keeper configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeKeeperConfig {
    /// Bytes per stream item
    pub item_size: usize,
    /// Items per second
    pub sample_rate: f64,
}

impl Default for TimeKeeperConfig {
    fn default() -> Self {
        Self {
            item_size: 8, // complex float
            sample_rate: 1_000_000.0,
        }
    }
}

/// Complete stream block configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamblocksConfig {
    /// Configuration version
    pub version: String,
    pub logging: LogConfig,
    pub depuncture: DepunctureConfig,
    pub peak_detector: PeakDetectorConfig,
    pub time_keeper: TimeKeeperConfig,
}

impl Default for StreamblocksConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            logging: LogConfig::default(),
            depuncture: DepunctureConfig::default(),
            peak_detector: PeakDetectorConfig::default(),
            time_keeper: TimeKeeperConfig::default(),
        }
    }
}

impl StreamblocksConfig {
    /// Load configuration from the default search path.
    ///
    /// Returns the default config if no file is found.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let path = Path::new(&path);
            if !path.exists() {
                return Err(ConfigError::NotFound(format!(
                    "{CONFIG_ENV}={}",
                    path.display()
                )));
            }
            return Self::load_from(path);
        }

        for path in &Self::config_search_paths() {
            if path.exists() {
                return Self::load_from(path);
            }
        }

        tracing::debug!("no configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(format!("{}: {}", path.display(), e)))?;

        let config = Self::parse(&content)?;
        tracing::info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Parse and validate configuration from a YAML string.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content =
            serde_yaml::to_string(self).map_err(|e| ConfigError::Parse(e.to_string()))?;

        std::fs::write(path, content)
            .map_err(|e| ConfigError::Read(format!("{}: {}", path.display(), e)))
    }

    /// Configuration search paths, in priority order.
    pub fn config_search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("./streamblocks.yaml")];

        if let Some(dirs) = directories::ProjectDirs::from("", "", "streamblocks") {
            paths.push(dirs.config_dir().join("config.yaml"));
        }

        paths.push(PathBuf::from("/etc/streamblocks/config.yaml"));
        paths
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let pattern = &self.depuncture.pattern;
        if !pattern.is_empty() && !validate_pattern(&flags_to_pattern(pattern)) {
            return Err(ConfigError::Validation(
                "depuncture.pattern has no kept symbols".to_string(),
            ));
        }

        let pd = &self.peak_detector;
        if !(pd.alpha > 0.0 && pd.alpha <= 1.0) {
            return Err(ConfigError::Validation(format!(
                "peak_detector.alpha must be in (0, 1], got {}",
                pd.alpha
            )));
        }
        if pd.min_diff < 0.0 || pd.drop < 0.0 {
            return Err(ConfigError::Validation(
                "peak_detector.min_diff and peak_detector.drop must be >= 0".to_string(),
            ));
        }

        let tk = &self.time_keeper;
        if tk.item_size == 0 {
            return Err(ConfigError::Validation(
                "time_keeper.item_size must be > 0".to_string(),
            ));
        }
        if !(tk.sample_rate.is_finite() && tk.sample_rate > 0.0) {
            return Err(ConfigError::Validation(
                "time_keeper.sample_rate must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Generate example configuration YAML.
    pub fn example_yaml() -> String {
        let config = Self {
            depuncture: DepunctureConfig {
                pattern: PuncturePattern::Rate3_4.flags().to_vec(),
            },
            peak_detector: PeakDetectorConfig {
                min_len: 2,
                lockout: 16,
                alpha: 0.25,
                look_ahead: 4,
                ..Default::default()
            },
            ..Default::default()
        };

        serde_yaml::to_string(&config).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observe::logging::{LogFormat, LogLevel};

    #[test]
    fn test_default_config() {
        let config = StreamblocksConfig::default();
        assert_eq!(config.depuncture.pattern, vec![1, 1, 0, 1]);
        assert_eq!(config.peak_detector.min_len, 1);
        assert_eq!(config.peak_detector.alpha, 1.0);
        assert_eq!(config.time_keeper.item_size, 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
logging:
  level: debug
  format: json

depuncture:
  pattern: [1, 0, 1]

peak_detector:
  min_diff: 0.5
  min_len: 3
  lockout: 20
  drop: 0.25
  alpha: 0.5
  look_ahead: 2

time_keeper:
  item_size: 4
  sample_rate: 2.4e6
"#;

        let config = StreamblocksConfig::parse(yaml).unwrap();
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.depuncture.pattern, vec![1, 0, 1]);
        assert_eq!(config.peak_detector.min_diff, 0.5);
        assert_eq!(config.peak_detector.min_len, 3);
        assert_eq!(config.peak_detector.lockout, 20);
        assert_eq!(config.peak_detector.drop, 0.25);
        assert_eq!(config.peak_detector.alpha, 0.5);
        assert_eq!(config.peak_detector.look_ahead, 2);
        assert_eq!(config.time_keeper.item_size, 4);
        assert_eq!(config.time_keeper.sample_rate, 2_400_000.0);
    }

    #[test]
    fn test_parse_partial_yaml() {
        let yaml = r#"
peak_detector:
  lockout: 7
"#;

        let config = StreamblocksConfig::parse(yaml).unwrap();
        assert_eq!(config.peak_detector.lockout, 7);
        // Defaults should be applied
        assert_eq!(config.peak_detector.alpha, 1.0);
        assert_eq!(config.time_keeper.sample_rate, 1_000_000.0);
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn test_parse_rejects_invalid_values() {
        let err = StreamblocksConfig::parse("depuncture:\n  pattern: [0, 0]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));

        let err = StreamblocksConfig::parse("peak_detector:\n  alpha: 0.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));

        let err = StreamblocksConfig::parse("peak_detector: [1, 2").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validation() {
        let mut config = StreamblocksConfig::default();
        assert!(config.validate().is_ok());

        config.depuncture.pattern.clear();
        assert!(config.validate().is_ok());

        config.time_keeper.sample_rate = -1.0;
        assert!(config.validate().is_err());

        config.time_keeper.sample_rate = 1e6;
        config.time_keeper.item_size = 0;
        assert!(config.validate().is_err());

        config.time_keeper.item_size = 8;
        config.peak_detector.drop = -0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_example_yaml() {
        let yaml = StreamblocksConfig::example_yaml();
        assert!(yaml.contains("depuncture:"));
        assert!(yaml.contains("peak_detector:"));
        assert!(yaml.contains("time_keeper:"));
        let parsed = StreamblocksConfig::parse(&yaml).unwrap();
        assert_eq!(parsed.peak_detector.lockout, 16);
    }

    #[test]
    fn test_save_and_load_from() {
        let path = std::env::temp_dir().join(format!(
            "streamblocks-config-test-{}.yaml",
            std::process::id()
        ));
        let mut config = StreamblocksConfig::default();
        config.peak_detector.look_ahead = 9;
        config.save(&path).unwrap();

        let loaded = StreamblocksConfig::load_from(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded.peak_detector, config.peak_detector);
        assert_eq!(loaded.depuncture, config.depuncture);
    }

    #[test]
    fn test_load_from_missing_file() {
        let err = StreamblocksConfig::load_from(Path::new("/nonexistent/streamblocks.yaml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Read(_)));
    }

    #[test]
    fn test_config_search_paths() {
        let paths = StreamblocksConfig::config_search_paths();
        assert!(paths.len() >= 2);
        assert!(paths[0].ends_with("streamblocks.yaml"));
        assert_eq!(
            paths.last().map(PathBuf::as_path),
            Some(Path::new("/etc/streamblocks/config.yaml"))
        );
    }
}
