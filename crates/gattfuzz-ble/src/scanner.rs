//! BLE adapter setup and device scanning

use std::fmt;

use btleplug::api::{Central, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager};
use tracing::{debug, info};

use crate::config::BleConfig;
use crate::error::BleError;
use crate::transport::BleGattTransport;

// ----------------------------------------------------------------------------
// Discovered Devices
// ----------------------------------------------------------------------------

/// A device seen during a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDevice {
    pub address: String,
    pub name: Option<String>,
    pub rssi: Option<i16>,
}

impl fmt::Display for DiscoveredDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name.as_deref().unwrap_or("(unknown)"), self.address)?;
        match self.rssi {
            Some(rssi) => write!(f, " RSSI: {}", rssi),
            None => write!(f, " RSSI: n/a"),
        }
    }
}

// ----------------------------------------------------------------------------
// Scanner
// ----------------------------------------------------------------------------

/// Owns the BLE adapter and runs timeout-bounded scans
pub struct BleScanner {
    config: BleConfig,
    adapter: Option<Adapter>,
}

impl BleScanner {
    /// Create a new scanner; call [`initialize_adapter`](Self::initialize_adapter) before use
    pub fn new(config: BleConfig) -> Self {
        Self {
            config,
            adapter: None,
        }
    }

    /// Pick the first available adapter
    pub async fn initialize_adapter(&mut self) -> Result<(), BleError> {
        let manager = Manager::new().await?;
        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or(BleError::AdapterNotAvailable)?;

        self.adapter = Some(adapter);
        info!("BLE adapter initialized");
        Ok(())
    }

    fn adapter(&self) -> Result<&Adapter, BleError> {
        self.adapter.as_ref().ok_or(BleError::AdapterNotInitialized)
    }

    /// Scan for `scan_timeout` and list everything seen, in discovery order
    pub async fn scan(&self) -> Result<Vec<DiscoveredDevice>, BleError> {
        let adapter = self.adapter()?;
        info!("Scanning for {:?}...", self.config.scan_timeout());
        scan_for(adapter, &self.config).await?;

        let mut devices = Vec::new();
        for peripheral in adapter.peripherals().await? {
            let properties = match peripheral.properties().await {
                Ok(Some(properties)) => properties,
                Ok(None) => continue,
                Err(e) => {
                    debug!("Skipping peripheral without properties: {}", e);
                    continue;
                }
            };
            devices.push(DiscoveredDevice {
                address: properties.address.to_string(),
                name: properties.local_name,
                rssi: properties.rssi,
            });
        }

        Ok(devices)
    }

    /// Transport for the device at `address` on this scanner's adapter
    pub fn transport_for(&self, address: &str) -> Result<BleGattTransport, BleError> {
        Ok(BleGattTransport::new(
            self.adapter()?.clone(),
            address,
            self.config.clone(),
        ))
    }
}

/// Run one scan window on `adapter`
pub(crate) async fn scan_for(adapter: &Adapter, config: &BleConfig) -> Result<(), BleError> {
    adapter
        .start_scan(ScanFilter::default())
        .await
        .map_err(|e| BleError::ScanFailed(e.to_string()))?;
    tokio::time::sleep(config.scan_timeout()).await;
    adapter
        .stop_scan()
        .await
        .map_err(|e| BleError::ScanFailed(e.to_string()))?;
    Ok(())
}
