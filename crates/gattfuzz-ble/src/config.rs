//! BLE backend configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ----------------------------------------------------------------------------
// Configuration
// ----------------------------------------------------------------------------

/// Configuration for scanning and connecting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BleConfig {
    /// How long a discovery scan runs, in seconds
    pub scan_timeout_secs: f64,
    /// Maximum time to wait for a connection, in seconds
    pub connection_timeout_secs: f64,
}

impl Default for BleConfig {
    fn default() -> Self {
        Self {
            scan_timeout_secs: 5.0,
            connection_timeout_secs: 10.0,
        }
    }
}

impl BleConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set scan timeout
    pub fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout_secs = timeout.as_secs_f64();
        self
    }

    /// Set connection timeout
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout_secs = timeout.as_secs_f64();
        self
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.scan_timeout_secs).unwrap_or_default()
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.connection_timeout_secs).unwrap_or_default()
    }

    /// Both timeouts must be positive and finite
    pub fn is_valid(&self) -> bool {
        [self.scan_timeout_secs, self.connection_timeout_secs]
            .iter()
            .all(|secs| secs.is_finite() && *secs > 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BleConfig::default();
        assert_eq!(config.scan_timeout(), Duration::from_secs(5));
        assert_eq!(config.connection_timeout(), Duration::from_secs(10));
        assert!(config.is_valid());
    }

    #[test]
    fn test_invalid_timeouts() {
        let mut config = BleConfig::new().with_scan_timeout(Duration::ZERO);
        assert!(!config.is_valid());

        config.scan_timeout_secs = -3.0;
        assert_eq!(config.scan_timeout(), Duration::ZERO);
    }
}
