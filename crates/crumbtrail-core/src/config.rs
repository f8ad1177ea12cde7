//! Application configuration management.
//!
//! Handles loading, saving, and validating crumbtrail configuration:
//! - Position update cadence and accuracy preference
//! - Trail database location
//! - Map recentering behavior
//! - Optional sample filtering
//! - Parameters of the simulated position source used by the server

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use utoipa::ToSchema;

/// Environment variable overriding the configuration file location.
pub const CONFIG_PATH_ENV: &str = "CRUMBTRAIL_CONFIG";

/// Default update interval: one fix per second while debugging, every 20 s otherwise.
pub const DEFAULT_UPDATE_INTERVAL_MS: u64 = if cfg!(debug_assertions) { 1_000 } else { 20_000 };

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    /// The configuration file could not be read.
    #[error("Failed to read {path}: {source}")]
    ReadError {
        /// File path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration file could not be written.
    #[error("Failed to write {path}: {source}")]
    WriteError {
        /// File path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema.
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] toml::de::Error),

    /// The configuration could not be serialized.
    #[error("Failed to serialize configuration: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// A field holds an invalid value.
    #[error("Invalid value for '{field}': {message}")]
    ValidationError {
        /// Dotted field path.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// Several fields hold invalid values.
    #[error("{} configuration errors", .0.len())]
    MultipleValidationErrors(Vec<ConfigError>),
}

/// Result alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Accuracy preference passed to the position source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AccuracyTier {
    /// Most precise fixes available, highest power draw.
    HighAccuracy,
    /// Roughly block-level precision at lower power.
    #[default]
    BalancedPower,
}

/// Cadence and accuracy of position updates.
///
/// Fixed for the lifetime of a recorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Desired interval between updates, in milliseconds.
    pub update_interval_ms: u64,

    /// Fastest interval the recorder accepts updates at, in milliseconds.
    pub fastest_interval_ms: u64,

    /// Accuracy preference.
    pub accuracy: AccuracyTier,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            update_interval_ms: DEFAULT_UPDATE_INTERVAL_MS,
            fastest_interval_ms: DEFAULT_UPDATE_INTERVAL_MS / 2,
            accuracy: AccuracyTier::default(),
        }
    }
}

impl TrackingConfig {
    /// Build a validated tracking configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if the intervals are inconsistent.
    pub fn new(
        update_interval_ms: u64,
        fastest_interval_ms: u64,
        accuracy: AccuracyTier,
    ) -> ConfigResult<Self> {
        let config = Self {
            update_interval_ms,
            fastest_interval_ms,
            accuracy,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check interval constraints.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.update_interval_ms == 0 {
            return Err(ConfigError::ValidationError {
                field: "tracking.update_interval_ms".into(),
                message: "must be greater than zero".into(),
            });
        }
        if self.fastest_interval_ms > self.update_interval_ms {
            return Err(ConfigError::ValidationError {
                field: "tracking.fastest_interval_ms".into(),
                message: format!(
                    "must not exceed update_interval_ms ({} > {})",
                    self.fastest_interval_ms, self.update_interval_ms
                ),
            });
        }
        Ok(())
    }
}

/// When the map view is recentered on an accepted sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecenterPolicy {
    /// On the first accepted sample after each successful connect.
    #[default]
    FirstFix,
    /// On every accepted sample.
    EveryFix,
    /// Never.
    Never,
}

/// Trail database settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file. Defaults to the platform data directory.
    pub database_path: Option<PathBuf>,
}

impl StorageConfig {
    /// The configured database path, or the platform default.
    ///
    /// # Errors
    ///
    /// Returns an error if no path is configured and the platform data
    /// directory cannot be determined.
    pub fn resolved_path(&self) -> ConfigResult<PathBuf> {
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => default_database_path(),
        }
    }
}

/// Rendering-related settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Recentering behavior.
    pub recenter: RecenterPolicy,
}

/// Optional sample filtering applied before persistence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Drop fixes closer than this many meters to the previous accepted fix.
    /// Unset accepts every delivered fix.
    pub min_distance_m: Option<f64>,
}

/// Simulated position source settings (server only).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Starting latitude.
    pub origin_latitude: f64,
    /// Starting longitude.
    pub origin_longitude: f64,
    /// Degrees moved per update on each axis.
    pub step_degrees: f64,
    /// Delay before the simulated connection succeeds, in milliseconds.
    pub connect_delay_ms: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            origin_latitude: 52.520_008,
            origin_longitude: 13.404_954,
            step_degrees: 0.000_1,
            connect_delay_ms: 250,
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Update cadence and accuracy.
    pub tracking: TrackingConfig,
    /// Trail database.
    pub storage: StorageConfig,
    /// Map behavior.
    pub display: DisplayConfig,
    /// Sample filtering.
    pub filter: FilterConfig,
    /// Simulated source.
    pub simulator: SimulatorConfig,
}

impl Config {
    /// Load configuration from `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unreadable, malformed or invalid.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Load configuration from `path`, falling back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed or validated.
    pub fn load_or_default(path: impl AsRef<Path>) -> ConfigResult<Self> {
        match Self::load(path) {
            Err(ConfigError::NotFound(path)) => {
                debug!(%path, "No configuration file, using defaults");
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Save configuration to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written.
    pub fn save(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();
        let write_error = |source| ConfigError::WriteError {
            path: path.display().to_string(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(write_error)?;
        Ok(())
    }

    /// Validate all sections, collecting every error.
    ///
    /// # Errors
    ///
    /// Returns a single error, or [`ConfigError::MultipleValidationErrors`].
    pub fn validate(&self) -> ConfigResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = self.tracking.validate() {
            errors.push(e);
        }
        if let Some(meters) = self.filter.min_distance_m {
            if !meters.is_finite() || meters < 0.0 {
                errors.push(ConfigError::ValidationError {
                    field: "filter.min_distance_m".into(),
                    message: format!("must be a non-negative number, got {meters}"),
                });
            }
        }
        let origin = crate::types::Coordinate::new(
            self.simulator.origin_latitude,
            self.simulator.origin_longitude,
        );
        if !origin.is_valid() {
            errors.push(ConfigError::ValidationError {
                field: "simulator.origin".into(),
                message: format!("{origin} is not a valid coordinate"),
            });
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ConfigError::MultipleValidationErrors(errors)),
        }
    }

    /// Configuration file path: `$CRUMBTRAIL_CONFIG` or the platform config directory.
    ///
    /// # Errors
    ///
    /// Returns an error if neither is available.
    pub fn default_path() -> ConfigResult<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }
        project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

/// Default trail database location in the platform data directory.
///
/// # Errors
///
/// Returns an error if the data directory cannot be determined.
pub fn default_database_path() -> ConfigResult<PathBuf> {
    project_dirs().map(|dirs| dirs.data_dir().join("trail.db"))
}

fn project_dirs() -> ConfigResult<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", "crumbtrail").ok_or_else(|| {
        ConfigError::NotFound("Cannot determine platform directories".into())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tracking_config_is_valid() {
        let config = TrackingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.fastest_interval_ms, config.update_interval_ms / 2);
        assert_eq!(config.accuracy, AccuracyTier::BalancedPower);
    }

    #[test]
    fn test_fastest_interval_must_not_exceed_update_interval() {
        let err = TrackingConfig::new(1_000, 2_000, AccuracyTier::HighAccuracy).unwrap_err();
        let ConfigError::ValidationError { field, .. } = err else {
            panic!("expected a validation error, got {err:?}");
        };
        assert_eq!(field, "tracking.fastest_interval_ms");
        assert!(TrackingConfig::new(1_000, 1_000, AccuracyTier::HighAccuracy).is_ok());
        assert!(TrackingConfig::new(0, 0, AccuracyTier::HighAccuracy).is_err());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [tracking]
            update_interval_ms = 5000
            fastest_interval_ms = 2500
            accuracy = "high_accuracy"

            [display]
            recenter = "every_fix"
            "#,
        )
        .unwrap();
        assert_eq!(config.tracking.update_interval_ms, 5_000);
        assert_eq!(config.tracking.accuracy, AccuracyTier::HighAccuracy);
        assert_eq!(config.display.recenter, RecenterPolicy::EveryFix);
        assert_eq!(config.filter.min_distance_m, None);
        assert!(config.storage.database_path.is_none());
    }

    #[test]
    fn test_validate_collects_multiple_errors() {
        let mut config = Config::default();
        config.tracking.fastest_interval_ms = config.tracking.update_interval_ms + 1;
        config.filter.min_distance_m = Some(-1.0);
        match config.validate() {
            Err(ConfigError::MultipleValidationErrors(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("expected multiple errors, got {other:?}"),
        }
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("config.toml");

        let mut config = Config::default();
        config.storage.database_path = Some(dir.path().join("trail.db"));
        config.filter.min_distance_m = Some(3.5);
        config.save(&path).unwrap();

        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_or_default_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert!(matches!(
            Config::load(dir.path().join("absent.toml")),
            Err(ConfigError::NotFound(_))
        ));
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[tracking]\nupdate_interval_ms = 100\nfastest_interval_ms = 500\n",
        )
        .unwrap();
        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::ValidationError { .. })
        ));
    }
}
