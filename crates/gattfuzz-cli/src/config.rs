//! gattfuzz CLI configuration management
//!
//! Configuration is layered with figment, lowest priority first:
//! - Built-in defaults
//! - `gattfuzz.toml` in the working directory
//! - Environment variables (`GATTFUZZ_FUZZ__WRITE_TIMES=10`)
//! - The file passed with `--config`
//! - Command line flags

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use gattfuzz_ble::BleConfig;
use gattfuzz_core::FuzzConfig;

const DEFAULT_CONFIG_FILE: &str = "gattfuzz.toml";
const ENV_PREFIX: &str = "GATTFUZZ_";

// ----------------------------------------------------------------------------
// CLI Application Configuration
// ----------------------------------------------------------------------------

/// Complete configuration for the gattfuzz binary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliAppConfig {
    /// Engine tunables
    pub fuzz: FuzzConfig,

    /// Scan and connection timeouts
    pub ble: BleConfig,

    /// Run log location
    pub log: LogConfig,
}

/// Where run logs are written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub dir: PathBuf,
    pub file_prefix: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            file_prefix: "ble_fuzz".to_string(),
        }
    }
}

/// Values given on the command line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub write_times: Option<u32>,
    pub read_times: Option<u32>,
    pub notify_time_secs: Option<u64>,
    pub reconnect_attempts: Option<u32>,
    pub write_delay_secs: Option<f64>,
    pub seed: Option<u64>,
    pub log_dir: Option<PathBuf>,
}

impl Overrides {
    fn merge_into(&self, mut figment: Figment) -> Figment {
        if let Some(n) = self.write_times {
            figment = figment.merge(("fuzz.write_times", n));
        }
        if let Some(n) = self.read_times {
            figment = figment.merge(("fuzz.read_times", n));
        }
        if let Some(secs) = self.notify_time_secs {
            figment = figment.merge(("fuzz.notify_time_secs", secs));
        }
        if let Some(n) = self.reconnect_attempts {
            figment = figment.merge(("fuzz.reconnect_attempts", n));
        }
        if let Some(secs) = self.write_delay_secs {
            figment = figment.merge(("fuzz.write_delay_secs", secs));
        }
        if let Some(seed) = self.seed {
            figment = figment.merge(("fuzz.seed", seed));
        }
        if let Some(dir) = &self.log_dir {
            figment = figment.merge(("log.dir", dir));
        }
        figment
    }
}

// ----------------------------------------------------------------------------
// Configuration Loading Logic
// ----------------------------------------------------------------------------

impl CliAppConfig {
    /// Load every layer and apply `overrides` on top
    pub fn load_with_overrides(
        config_file: Option<&Path>,
        overrides: &Overrides,
    ) -> Result<Self, ConfigError> {
        let mut figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(DEFAULT_CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        if let Some(path) = config_file {
            if !path.exists() {
                return Err(ConfigError::FileSystem(format!(
                    "Configuration file not found: {}",
                    path.display()
                )));
            }
            figment = figment.merge(Toml::file(path));
        }

        Self::extract(overrides.merge_into(figment))
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: CliAppConfig = figment
            .extract()
            .map_err(|e| ConfigError::Loading(format!("Failed to load configuration: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration for consistency and correctness
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.fuzz
            .validate()
            .map_err(|e| ConfigError::Validation(e.to_string()))?;

        if !self.ble.is_valid() {
            return Err(ConfigError::Validation(
                "BLE timeouts must be positive".to_string(),
            ));
        }

        if self.log.file_prefix.is_empty() {
            return Err(ConfigError::Validation(
                "Log file prefix must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialization(format!("Failed to serialize config: {}", e)))
    }
}

// ----------------------------------------------------------------------------
// Error Types
// ----------------------------------------------------------------------------

/// Configuration-related errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration loading error: {0}")]
    Loading(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("File system error: {0}")]
    FileSystem(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn layered(toml: &str) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(CliAppConfig::default()))
            .merge(Toml::string(toml))
    }

    #[test]
    fn test_default_config_creation() {
        let config = CliAppConfig::default();
        assert_eq!(config.fuzz.write_times, 5);
        assert_eq!(config.fuzz.read_times, 3);
        assert_eq!(config.log.file_prefix, "ble_fuzz");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_file_values_override_defaults() {
        let config = CliAppConfig::extract(layered(
            r#"
            [fuzz]
            write_times = 12
            seed = 99

            [ble]
            scan_timeout_secs = 2.5
            "#,
        ))
        .unwrap();

        assert_eq!(config.fuzz.write_times, 12);
        assert_eq!(config.fuzz.seed, Some(99));
        assert_eq!(config.fuzz.read_times, 3);
        assert_eq!(config.ble.scan_timeout_secs, 2.5);
    }

    #[test]
    fn test_flags_override_file() {
        let overrides = Overrides {
            write_times: Some(1),
            write_delay_secs: Some(0.25),
            log_dir: Some(PathBuf::from("/tmp/runs")),
            ..Overrides::default()
        };
        let figment = overrides.merge_into(layered("[fuzz]\nwrite_times = 12\n"));

        let config = CliAppConfig::extract(figment).unwrap();

        assert_eq!(config.fuzz.write_times, 1);
        assert_eq!(config.fuzz.write_delay_secs, 0.25);
        assert_eq!(config.log.dir, PathBuf::from("/tmp/runs"));
    }

    #[test]
    fn test_config_validation() {
        let result = CliAppConfig::extract(layered("[fuzz]\nreconnect_attempts = 0\n"));
        assert!(matches!(result, Err(ConfigError::Validation(_))));

        let mut config = CliAppConfig::default();
        config.ble.connection_timeout_secs = 0.0;
        assert!(config.validate().is_err());

        let mut config = CliAppConfig::default();
        config.log.file_prefix.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_config_file_is_reported() {
        let result = CliAppConfig::load_with_overrides(
            Some(Path::new("/nonexistent/gattfuzz.toml")),
            &Overrides::default(),
        );
        assert!(matches!(result, Err(ConfigError::FileSystem(_))));
    }

    #[test]
    fn test_toml_rendering() {
        let rendered = CliAppConfig::default().to_toml().unwrap();
        assert!(rendered.contains("[fuzz]"));
        assert!(rendered.contains("[ble]"));
        assert!(rendered.contains("file_prefix = \"ble_fuzz\""));
    }
}
