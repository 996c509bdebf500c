//! Error handling for the gattfuzz CLI

use thiserror::Error;

use crate::config::ConfigError;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Fuzzing engine error: {0}")]
    Fuzz(#[from] gattfuzz_core::FuzzError),

    #[error("BLE error: {0}")]
    Ble(#[from] gattfuzz_ble::BleError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
