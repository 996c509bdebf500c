//! The BLE capability the engine drives
//!
//! The engine never speaks ATT or GATT itself. A backend (btleplug in
//! `gattfuzz-ble`, a scripted mock in tests) implements [`GattTransport`] and the
//! [`ConnectionManager`](crate::connection::ConnectionManager) is the only
//! caller.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::capability::Capabilities;
use crate::error::TransportError;

/// Result type for transport operations
pub type TransportResult<T> = std::result::Result<T, TransportError>;

// ----------------------------------------------------------------------------
// GATT Model
// ----------------------------------------------------------------------------

/// A discovered characteristic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Characteristic {
    pub uuid: Uuid,
    pub service_uuid: Uuid,
    pub capabilities: Capabilities,
    pub description: String,
}

/// A discovered primary service and its characteristics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub uuid: Uuid,
    pub description: String,
    pub characteristics: Vec<Characteristic>,
}

/// Whether a write waits for the peripheral's acknowledgement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    WithResponse,
    WithoutResponse,
}

impl WriteMode {
    /// Acknowledged writes when the characteristic supports them
    pub fn for_capabilities(capabilities: Capabilities) -> Self {
        if capabilities.contains(Capabilities::WRITE) {
            WriteMode::WithResponse
        } else {
            WriteMode::WithoutResponse
        }
    }
}

/// An inbound notification pushed by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub uuid: Uuid,
    pub value: Vec<u8>,
}

// ----------------------------------------------------------------------------
// Transport Trait
// ----------------------------------------------------------------------------

/// Connection-oriented access to one peripheral's GATT server
#[async_trait]
pub trait GattTransport: Send + Sync {
    /// Address of the peripheral this transport talks to
    fn address(&self) -> &str;

    async fn connect(&self) -> TransportResult<()>;

    async fn disconnect(&self) -> TransportResult<()>;

    async fn is_connected(&self) -> bool;

    /// Enumerate services on the connected peripheral
    async fn discover_services(&self) -> TransportResult<Vec<Service>>;

    async fn read(&self, uuid: &Uuid) -> TransportResult<Vec<u8>>;

    async fn write(&self, uuid: &Uuid, data: &[u8], mode: WriteMode) -> TransportResult<()>;

    /// Enable notifications and forward each one into `sink`
    ///
    /// Delivery may happen on any task; the backend must stop forwarding once
    /// `unsubscribe` returns or the receiver is dropped.
    async fn subscribe(&self, uuid: &Uuid, sink: mpsc::Sender<Notification>)
        -> TransportResult<()>;

    async fn unsubscribe(&self, uuid: &Uuid) -> TransportResult<()>;
}
