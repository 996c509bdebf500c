//! btleplug implementation of [`GattTransport`]

use std::collections::HashMap;

use async_trait::async_trait;
use btleplug::api::{CharPropFlags, Central, Peripheral as _, WriteType};
use btleplug::platform::{Adapter, Peripheral};
use futures::stream::StreamExt;
use gattfuzz_core::{
    Capabilities, Characteristic, GattTransport, Notification, Service, TransportError,
    TransportResult, WriteMode,
};
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::assigned;
use crate::config::BleConfig;
use crate::error::BleError;
use crate::scanner::scan_for;

// ----------------------------------------------------------------------------
// Property Mapping
// ----------------------------------------------------------------------------

/// Map btleplug property flags onto engine capabilities
///
/// Indications are exercised the same way as notifications.
pub fn capabilities_from_properties(properties: CharPropFlags) -> Capabilities {
    let mut capabilities = Capabilities::NONE;
    if properties.contains(CharPropFlags::READ) {
        capabilities.insert(Capabilities::READ);
    }
    if properties.contains(CharPropFlags::WRITE) {
        capabilities.insert(Capabilities::WRITE);
    }
    if properties.contains(CharPropFlags::WRITE_WITHOUT_RESPONSE) {
        capabilities.insert(Capabilities::WRITE_WITHOUT_RESPONSE);
    }
    if properties.intersects(CharPropFlags::NOTIFY | CharPropFlags::INDICATE) {
        capabilities.insert(Capabilities::NOTIFY);
    }
    capabilities
}

fn write_type(mode: WriteMode) -> WriteType {
    match mode {
        WriteMode::WithResponse => WriteType::WithResponse,
        WriteMode::WithoutResponse => WriteType::WithoutResponse,
    }
}

// ----------------------------------------------------------------------------
// Transport
// ----------------------------------------------------------------------------

/// GATT access to one peripheral through a btleplug adapter
pub struct BleGattTransport {
    adapter: Adapter,
    address: String,
    config: BleConfig,
    peripheral: RwLock<Option<Peripheral>>,
    subscriptions: Mutex<HashMap<Uuid, JoinHandle<()>>>,
}

impl BleGattTransport {
    pub fn new(adapter: Adapter, address: impl Into<String>, config: BleConfig) -> Self {
        Self {
            adapter,
            address: address.into(),
            config,
            peripheral: RwLock::new(None),
            subscriptions: Mutex::new(HashMap::new()),
        }
    }

    async fn find_peripheral(&self) -> Result<Option<Peripheral>, BleError> {
        Ok(self
            .adapter
            .peripherals()
            .await?
            .into_iter()
            .find(|p| p.address().to_string().eq_ignore_ascii_case(&self.address)))
    }

    /// Known peripheral for our address, scanning once if the adapter has not seen it
    async fn lookup(&self) -> Result<Peripheral, BleError> {
        if let Some(peripheral) = self.find_peripheral().await? {
            return Ok(peripheral);
        }

        debug!("{} not cached by adapter, scanning", self.address);
        scan_for(&self.adapter, &self.config).await?;
        self.find_peripheral()
            .await?
            .ok_or_else(|| BleError::DeviceNotFound {
                address: self.address.clone(),
            })
    }

    async fn connected_peripheral(&self) -> Result<Peripheral, BleError> {
        self.peripheral
            .read()
            .await
            .clone()
            .ok_or(BleError::NotConnected)
    }

    async fn find_characteristic(
        &self,
        uuid: &Uuid,
    ) -> Result<(Peripheral, btleplug::api::Characteristic), BleError> {
        let peripheral = self.connected_peripheral().await?;
        let characteristic = peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == *uuid)
            .ok_or(BleError::CharacteristicNotFound { uuid: *uuid })?;
        Ok((peripheral, characteristic))
    }

    async fn stop_forwarding(&self, uuid: &Uuid) {
        if let Some(handle) = self.subscriptions.lock().await.remove(uuid) {
            handle.abort();
        }
    }
}

#[async_trait]
impl GattTransport for BleGattTransport {
    fn address(&self) -> &str {
        &self.address
    }

    async fn connect(&self) -> TransportResult<()> {
        let peripheral = self.lookup().await?;
        let connection_timeout = self.config.connection_timeout();

        match timeout(connection_timeout, peripheral.connect()).await {
            Ok(Ok(())) => {
                info!("Connected to {}", self.address);
                *self.peripheral.write().await = Some(peripheral);
                Ok(())
            }
            Ok(Err(e)) => Err(BleError::ConnectionFailed {
                address: self.address.clone(),
                reason: e.to_string(),
            }
            .into()),
            Err(_) => Err(BleError::ConnectionTimeout {
                duration_ms: connection_timeout.as_millis() as u64,
            }
            .into()),
        }
    }

    async fn disconnect(&self) -> TransportResult<()> {
        let handles: Vec<_> = self.subscriptions.lock().await.drain().collect();
        for (_, handle) in handles {
            handle.abort();
        }

        let Some(peripheral) = self.peripheral.read().await.clone() else {
            return Ok(());
        };
        peripheral
            .disconnect()
            .await
            .map_err(|e| TransportError::DisconnectFailed(e.to_string()))?;
        info!("Disconnected from {}", self.address);
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        match self.peripheral.read().await.as_ref() {
            Some(peripheral) => peripheral.is_connected().await.unwrap_or(false),
            None => false,
        }
    }

    async fn discover_services(&self) -> TransportResult<Vec<Service>> {
        let peripheral = self.connected_peripheral().await?;
        peripheral
            .discover_services()
            .await
            .map_err(|e| BleError::ServiceDiscoveryFailed(e.to_string()))?;

        let services = peripheral
            .services()
            .into_iter()
            .map(|service| Service {
                uuid: service.uuid,
                description: assigned::describe(&service.uuid),
                characteristics: service
                    .characteristics
                    .into_iter()
                    .map(|c| Characteristic {
                        uuid: c.uuid,
                        service_uuid: c.service_uuid,
                        capabilities: capabilities_from_properties(c.properties),
                        description: assigned::describe(&c.uuid),
                    })
                    .collect(),
            })
            .collect();

        Ok(services)
    }

    async fn read(&self, uuid: &Uuid) -> TransportResult<Vec<u8>> {
        let (peripheral, characteristic) = self.find_characteristic(uuid).await?;
        let value = peripheral
            .read(&characteristic)
            .await
            .map_err(|e| BleError::ReadFailed(e.to_string()))?;
        Ok(value)
    }

    async fn write(&self, uuid: &Uuid, data: &[u8], mode: WriteMode) -> TransportResult<()> {
        let (peripheral, characteristic) = self.find_characteristic(uuid).await?;
        peripheral
            .write(&characteristic, data, write_type(mode))
            .await
            .map_err(|e| BleError::WriteFailed(e.to_string()))?;
        Ok(())
    }

    async fn subscribe(
        &self,
        uuid: &Uuid,
        sink: mpsc::Sender<Notification>,
    ) -> TransportResult<()> {
        let (peripheral, characteristic) = self.find_characteristic(uuid).await?;

        // Open the stream first so nothing sent right after the CCCD write is missed
        let mut notifications = peripheral
            .notifications()
            .await
            .map_err(|e| BleError::NotificationStreamFailed(e.to_string()))?;
        peripheral
            .subscribe(&characteristic)
            .await
            .map_err(|e| BleError::SubscriptionFailed(e.to_string()))?;

        let target = *uuid;
        let handle = tokio::spawn(async move {
            while let Some(data) = notifications.next().await {
                if data.uuid != target {
                    continue;
                }
                let notification = Notification {
                    uuid: data.uuid,
                    value: data.value,
                };
                if sink.send(notification).await.is_err() {
                    break;
                }
            }
            debug!("Notification forwarder for {} ended", target);
        });

        if let Some(previous) = self.subscriptions.lock().await.insert(*uuid, handle) {
            previous.abort();
        }
        Ok(())
    }

    async fn unsubscribe(&self, uuid: &Uuid) -> TransportResult<()> {
        self.stop_forwarding(uuid).await;

        let (peripheral, characteristic) = self.find_characteristic(uuid).await?;
        if let Err(e) = peripheral.unsubscribe(&characteristic).await {
            warn!("Failed to unsubscribe from {}: {}", uuid, e);
            return Err(BleError::SubscriptionFailed(e.to_string()).into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_mapping() {
        let caps = capabilities_from_properties(CharPropFlags::READ | CharPropFlags::WRITE);
        assert_eq!(caps, Capabilities::READ | Capabilities::WRITE);

        let caps = capabilities_from_properties(CharPropFlags::WRITE_WITHOUT_RESPONSE);
        assert!(caps.is_writable());
        assert!(!caps.contains(Capabilities::WRITE));
    }

    #[test]
    fn test_indicate_counts_as_notify() {
        let caps = capabilities_from_properties(CharPropFlags::INDICATE);
        assert_eq!(caps, Capabilities::NOTIFY);

        let caps = capabilities_from_properties(CharPropFlags::BROADCAST);
        assert!(caps.is_empty());
    }

    #[test]
    fn test_write_type_mapping() {
        assert_eq!(write_type(WriteMode::WithResponse), WriteType::WithResponse);
        assert_eq!(write_type(WriteMode::WithoutResponse), WriteType::WithoutResponse);
    }
}
