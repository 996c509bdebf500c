//! Error types for the fuzzing engine
//!
//! [`TransportError`] is what a BLE backend reports through
//! [`GattTransport`](crate::transport::GattTransport); [`FuzzError`] is what the
//! engine itself reports to its callers.

use thiserror::Error;
use uuid::Uuid;

// ----------------------------------------------------------------------------
// Transport Errors
// ----------------------------------------------------------------------------

/// Failures reported by the underlying BLE stack
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Failed to connect to {address}: {reason}")]
    ConnectionFailed { address: String, reason: String },

    #[error("Connection timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    #[error("Device not found: {address}")]
    DeviceNotFound { address: String },

    #[error("Not connected")]
    NotConnected,

    #[error("Failed to discover services: {0}")]
    DiscoveryFailed(String),

    #[error("Characteristic not found: {uuid}")]
    CharacteristicNotFound { uuid: Uuid },

    #[error("Failed to read characteristic: {0}")]
    ReadFailed(String),

    #[error("Failed to write to characteristic: {0}")]
    WriteFailed(String),

    #[error("Failed to subscribe to notifications: {0}")]
    SubscriptionFailed(String),

    #[error("Failed to disconnect: {0}")]
    DisconnectFailed(String),

    #[error("BLE adapter not available")]
    AdapterNotAvailable,

    #[error("BLE backend error: {0}")]
    Backend(String),
}

// ----------------------------------------------------------------------------
// Engine Errors
// ----------------------------------------------------------------------------

/// Errors surfaced by the fuzzing engine
#[derive(Error, Debug)]
pub enum FuzzError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Gave up connecting to {address} after {attempts} attempts")]
    RetriesExhausted { address: String, attempts: u32 },

    #[error("Characteristic {uuid} disappeared after reconnect")]
    CharacteristicVanished { uuid: Uuid },

    #[error("Not connected")]
    NotConnected,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Result sink error: {0}")]
    Sink(#[from] std::io::Error),

    #[error("Session panicked: {0}")]
    Panicked(String),

    #[error("Session interrupted")]
    Interrupted,
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, FuzzError>;
