//! Bluetooth Low Energy backend for the gattfuzz engine
//!
//! Implements [`GattTransport`](gattfuzz_core::GattTransport) on top of
//! btleplug so a [`FuzzSession`](gattfuzz_core::FuzzSession) can drive a real
//! peripheral.
//!
//! ## Architecture
//!
//! - [`config`] - Scan and connection timeouts
//! - [`error`] - Error types specific to the BLE backend
//! - [`scanner`] - Adapter setup and device scanning
//! - [`transport`] - The btleplug transport
//! - [`assigned`] - Names for Bluetooth SIG assigned UUIDs
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use gattfuzz_ble::{BleConfig, BleScanner};
//! use gattfuzz_core::{FuzzConfig, FuzzSession, TracingSink};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut scanner = BleScanner::new(BleConfig::default());
//! scanner.initialize_adapter().await?;
//!
//! let transport = Arc::new(scanner.transport_for("EE:36:44:E4:E6:E9")?);
//! let mut session = FuzzSession::new(transport, FuzzConfig::default(), Arc::new(TracingSink))?;
//! session.run().await?;
//! # Ok(())
//! # }
//! ```

pub mod assigned;
pub mod config;
pub mod error;
pub mod scanner;
pub mod transport;

// Public API exports
pub use config::BleConfig;
pub use error::BleError;
pub use scanner::{BleScanner, DiscoveredDevice};
pub use transport::{capabilities_from_properties, BleGattTransport};
