//! Fuzzing session configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FuzzError, Result};

// ----------------------------------------------------------------------------
// Configuration
// ----------------------------------------------------------------------------

/// Tunables for one fuzzing session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuzzConfig {
    /// Writes per write-capable characteristic
    pub write_times: u32,
    /// Reads per readable characteristic
    pub read_times: u32,
    /// Idle window while subscribed to notifications, in seconds
    pub notify_time_secs: u64,
    /// Transport connect attempts per `connect()` call
    pub reconnect_attempts: u32,
    /// Wait between connect attempts, in seconds
    pub reconnect_backoff_secs: f64,
    /// Pause after every read or write, in seconds
    pub write_delay_secs: f64,
    /// Capacity of the notification channel
    pub notify_buffer: usize,
    /// Seed for payload selection; entropy when unset
    pub seed: Option<u64>,
}

impl Default for FuzzConfig {
    fn default() -> Self {
        Self {
            write_times: 5,
            read_times: 3,
            notify_time_secs: 10,
            reconnect_attempts: 3,
            reconnect_backoff_secs: 2.0,
            write_delay_secs: 1.0,
            notify_buffer: 64,
            seed: None,
        }
    }
}

impl FuzzConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_write_times(mut self, times: u32) -> Self {
        self.write_times = times;
        self
    }

    pub fn with_read_times(mut self, times: u32) -> Self {
        self.read_times = times;
        self
    }

    pub fn with_notify_time(mut self, duration: Duration) -> Self {
        self.notify_time_secs = duration.as_secs();
        self
    }

    pub fn with_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.reconnect_attempts = attempts;
        self
    }

    pub fn with_reconnect_backoff(mut self, backoff: Duration) -> Self {
        self.reconnect_backoff_secs = backoff.as_secs_f64();
        self
    }

    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay_secs = delay.as_secs_f64();
        self
    }

    pub fn with_notify_buffer(mut self, capacity: usize) -> Self {
        self.notify_buffer = capacity;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn notify_time(&self) -> Duration {
        Duration::from_secs(self.notify_time_secs)
    }

    pub fn reconnect_backoff(&self) -> Duration {
        Duration::try_from_secs_f64(self.reconnect_backoff_secs).unwrap_or_default()
    }

    pub fn write_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.write_delay_secs).unwrap_or_default()
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.reconnect_attempts == 0 {
            return Err(FuzzError::InvalidConfig(
                "reconnect_attempts must be at least 1".to_string(),
            ));
        }
        if self.notify_buffer == 0 {
            return Err(FuzzError::InvalidConfig(
                "notify_buffer must be at least 1".to_string(),
            ));
        }
        for (name, secs) in [
            ("reconnect_backoff_secs", self.reconnect_backoff_secs),
            ("write_delay_secs", self.write_delay_secs),
        ] {
            if Duration::try_from_secs_f64(secs).is_err() {
                return Err(FuzzError::InvalidConfig(format!(
                    "{} must be a representable non-negative number of seconds, got {}",
                    name, secs
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FuzzConfig::default();
        assert_eq!(config.write_times, 5);
        assert_eq!(config.read_times, 3);
        assert_eq!(config.notify_time(), Duration::from_secs(10));
        assert_eq!(config.reconnect_attempts, 3);
        assert_eq!(config.reconnect_backoff(), Duration::from_secs(2));
        assert_eq!(config.write_delay(), Duration::from_secs(1));
        assert!(config.seed.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = FuzzConfig::new()
            .with_write_times(10)
            .with_read_times(5)
            .with_write_delay(Duration::from_millis(250))
            .with_seed(7);
        assert_eq!(config.write_times, 10);
        assert_eq!(config.read_times, 5);
        assert_eq!(config.write_delay(), Duration::from_millis(250));
        assert_eq!(config.seed, Some(7));
    }

    #[test]
    fn test_validation() {
        assert!(FuzzConfig::new().with_reconnect_attempts(0).validate().is_err());
        assert!(FuzzConfig::new().with_notify_buffer(0).validate().is_err());

        let mut config = FuzzConfig::new();
        config.write_delay_secs = -1.0;
        assert!(config.validate().is_err());

        config.write_delay_secs = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overflowing_delays_are_rejected() {
        let mut config = FuzzConfig::new();
        config.write_delay_secs = 1e30;
        assert!(matches!(config.validate(), Err(FuzzError::InvalidConfig(_))));
        assert_eq!(config.write_delay(), Duration::ZERO);

        let mut config = FuzzConfig::new();
        config.reconnect_backoff_secs = 1e30;
        assert!(config.validate().is_err());
        assert_eq!(config.reconnect_backoff(), Duration::ZERO);

        let mut config = FuzzConfig::new();
        config.write_delay_secs = f64::INFINITY;
        assert!(config.validate().is_err());
    }
}
