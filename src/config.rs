//! Configuration for the telemetry viewport.

use crate::core::cursor::{ViewportPolicy, DEFAULT_WINDOW_SIZE};
use crate::core::stats::StdDevConvention;
use crate::error::InvalidConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Number of samples shown in the viewport
    pub window_size: usize,

    /// Time between refresh ticks
    #[serde(with = "duration_serde")]
    pub refresh_interval: Duration,

    /// Upper bound on a single source fetch
    #[serde(with = "duration_serde")]
    pub fetch_timeout: Duration,

    /// Maximum retained samples (None = unbounded)
    pub capacity: Option<usize>,

    /// Standard deviation convention for summaries
    pub stddev: StdDevConvention,

    /// How the viewport reacts to new data
    pub viewport_policy: ViewportPolicy,

    /// Where samples come from
    pub source: SourceConfig,

    /// Path for storing the activity log
    pub data_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("telemetry-viewport");

        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            refresh_interval: Duration::from_secs(10),
            fetch_timeout: Duration::from_secs(5),
            capacity: None,
            stddev: StdDevConvention::Population,
            viewport_policy: ViewportPolicy::FollowUnlessPaging,
            source: SourceConfig::default(),
            data_path: data_dir,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from a specific file, falling back to defaults
    /// when it does not exist.
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("telemetry-viewport")
            .join("config.json")
    }

    /// Path of the persisted activity log.
    pub fn activity_path(&self) -> PathBuf {
        self.data_path.join("activity.json")
    }

    /// Check every value the core relies on.
    pub fn validate(&self) -> Result<(), InvalidConfigError> {
        if self.window_size == 0 {
            return Err(InvalidConfigError::NonPositiveSize);
        }
        if self.capacity == Some(0) {
            return Err(InvalidConfigError::ZeroCapacity);
        }
        if self.refresh_interval.is_zero() {
            return Err(InvalidConfigError::ZeroDuration("refresh interval"));
        }
        if self.fetch_timeout.is_zero() {
            return Err(InvalidConfigError::ZeroDuration("fetch timeout"));
        }
        self.source.validate()
    }
}

/// Which ingestion source feeds the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Normally distributed noise
    #[default]
    Simulated,
    /// Rows replayed from a CSV file
    Csv,
}

impl SourceKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "simulated" | "sim" => Some(Self::Simulated),
            "csv" | "file" => Some(Self::Csv),
            _ => None,
        }
    }
}

/// Source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// CSV file to replay (required for `csv`)
    pub csv_path: Option<PathBuf>,
    /// Samples produced by the first simulated fetch
    pub initial_batch: usize,
    /// Samples produced per tick afterwards
    pub batch_size: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Simulated,
            csv_path: None,
            initial_batch: 100,
            batch_size: 10,
        }
    }
}

impl SourceConfig {
    pub fn validate(&self) -> Result<(), InvalidConfigError> {
        if self.batch_size == 0 {
            return Err(InvalidConfigError::ZeroBatch);
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] InvalidConfigError),
}

/// Serde support for Duration as fractional seconds.
mod duration_serde {
    use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.window_size, 100);
        assert_eq!(config.refresh_interval, Duration::from_secs(10));
        assert_eq!(config.capacity, None);
        assert_eq!(config.stddev, StdDevConvention::Population);
        assert_eq!(config.source.kind, SourceKind::Simulated);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = Config {
            window_size: 0,
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(InvalidConfigError::NonPositiveSize));

        let config = Config {
            capacity: Some(0),
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(InvalidConfigError::ZeroCapacity));

        let config = Config {
            refresh_interval: Duration::ZERO,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(InvalidConfigError::ZeroDuration(_))
        ));
    }

    #[test]
    fn test_round_trip_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config {
            window_size: 50,
            refresh_interval: Duration::from_millis(2500),
            capacity: Some(1000),
            viewport_policy: ViewportPolicy::Preserve,
            ..Config::default()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.window_size, 50);
        assert_eq!(loaded.refresh_interval, Duration::from_millis(2500));
        assert_eq!(loaded.capacity, Some(1000));
        assert_eq!(loaded.viewport_policy, ViewportPolicy::Preserve);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Config::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(loaded.window_size, 100);
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ \"window_size\": ").unwrap();
        assert!(matches!(Config::load_from(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_source_kind_parsing() {
        assert_eq!(SourceKind::parse("csv"), Some(SourceKind::Csv));
        assert_eq!(SourceKind::parse(" Simulated "), Some(SourceKind::Simulated));
        assert_eq!(SourceKind::parse("serial"), None);
    }
}
