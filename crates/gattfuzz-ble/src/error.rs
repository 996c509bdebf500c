//! Error types for the BLE backend

use gattfuzz_core::TransportError;
use thiserror::Error;
use uuid::Uuid;

// ----------------------------------------------------------------------------
// Error Types
// ----------------------------------------------------------------------------

/// Errors specific to the btleplug backend
#[derive(Error, Debug)]
pub enum BleError {
    #[error("BLE adapter not available")]
    AdapterNotAvailable,

    #[error("BLE adapter not initialized")]
    AdapterNotInitialized,

    #[error("Device not found: {address}")]
    DeviceNotFound { address: String },

    #[error("Device not connected")]
    NotConnected,

    #[error("Connection timeout after {duration_ms}ms")]
    ConnectionTimeout { duration_ms: u64 },

    #[error("Characteristic not found: {uuid}")]
    CharacteristicNotFound { uuid: Uuid },

    #[error("Failed to connect to {address}: {reason}")]
    ConnectionFailed { address: String, reason: String },

    #[error("Failed to discover services: {0}")]
    ServiceDiscoveryFailed(String),

    #[error("Failed to read characteristic: {0}")]
    ReadFailed(String),

    #[error("Failed to write to characteristic: {0}")]
    WriteFailed(String),

    #[error("Failed to subscribe to notifications: {0}")]
    SubscriptionFailed(String),

    #[error("Failed to get notifications stream: {0}")]
    NotificationStreamFailed(String),

    #[error("Scan failed: {0}")]
    ScanFailed(String),

    #[error("btleplug error: {0}")]
    Btleplug(#[from] btleplug::Error),
}

impl From<BleError> for TransportError {
    fn from(err: BleError) -> Self {
        match err {
            BleError::AdapterNotAvailable | BleError::AdapterNotInitialized => {
                TransportError::AdapterNotAvailable
            }
            BleError::DeviceNotFound { address } => TransportError::DeviceNotFound { address },
            BleError::NotConnected => TransportError::NotConnected,
            BleError::ConnectionFailed { address, reason } => {
                TransportError::ConnectionFailed { address, reason }
            }
            BleError::ConnectionTimeout { duration_ms } => TransportError::Timeout { duration_ms },
            BleError::CharacteristicNotFound { uuid } => {
                TransportError::CharacteristicNotFound { uuid }
            }
            BleError::ServiceDiscoveryFailed(reason) => TransportError::DiscoveryFailed(reason),
            BleError::ReadFailed(reason) => TransportError::ReadFailed(reason),
            BleError::WriteFailed(reason) => TransportError::WriteFailed(reason),
            BleError::SubscriptionFailed(reason) | BleError::NotificationStreamFailed(reason) => {
                TransportError::SubscriptionFailed(reason)
            }
            other => TransportError::Backend(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_keeps_category() {
        let uuid = Uuid::from_u128(7);
        assert_eq!(
            TransportError::from(BleError::CharacteristicNotFound { uuid }),
            TransportError::CharacteristicNotFound { uuid }
        );
        assert_eq!(
            TransportError::from(BleError::ConnectionTimeout { duration_ms: 10_000 }),
            TransportError::Timeout { duration_ms: 10_000 }
        );
        assert_eq!(
            TransportError::from(BleError::ConnectionFailed {
                address: "EE:36:44:E4:E6:E9".into(),
                reason: "le-connection-abort-by-local".into(),
            }),
            TransportError::ConnectionFailed {
                address: "EE:36:44:E4:E6:E9".into(),
                reason: "le-connection-abort-by-local".into(),
            }
        );
        assert!(matches!(
            TransportError::from(BleError::ScanFailed("busy".into())),
            TransportError::Backend(msg) if msg.contains("busy")
        ));
    }
}
