//! Command handlers for the gattfuzz CLI

use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{info, warn};

use gattfuzz_ble::{BleScanner, DiscoveredDevice};
use gattfuzz_core::{FuzzError, FuzzEvent, FuzzSession, LogFileSink, ResultSink};

use crate::cli::{Cli, Commands, FuzzArgs};
use crate::config::CliAppConfig;
use crate::error::Result;

/// Command dispatcher for handling CLI commands
pub struct CommandDispatcher;

impl CommandDispatcher {
    /// Execute a CLI command
    pub async fn execute(cli: Cli, config: CliAppConfig) -> Result<()> {
        match cli.command {
            Commands::Scan => Self::handle_scan_command(&config).await,
            Commands::Fuzz(args) => Self::handle_fuzz_command(&config, args).await,
            Commands::Config => Self::handle_config_command(&config),
        }
    }

    /// List nearby devices
    async fn handle_scan_command(config: &CliAppConfig) -> Result<()> {
        let mut scanner = BleScanner::new(config.ble.clone());
        scanner.initialize_adapter().await?;

        let devices = scanner.scan().await?;
        if devices.is_empty() {
            info!("No BLE devices found");
            return Ok(());
        }

        for (index, device) in devices.iter().enumerate() {
            println!("{}: {}", index, device);
        }
        Ok(())
    }

    /// Fuzz one device until finished or Ctrl-C
    async fn handle_fuzz_command(config: &CliAppConfig, args: FuzzArgs) -> Result<()> {
        let sink = Arc::new(LogFileSink::create(&config.log.dir, &config.log.file_prefix)?);
        info!("Writing results to {}", sink.path().display());

        let mut scanner = BleScanner::new(config.ble.clone());
        scanner.initialize_adapter().await?;

        let address = match args.address {
            Some(address) => address,
            None => {
                let devices = scanner.scan().await?;
                match select_target(sink.as_ref(), &devices) {
                    Some(address) => address,
                    None => return Ok(()),
                }
            }
        };

        let transport = Arc::new(scanner.transport_for(&address)?);
        let mut session = FuzzSession::new(transport, config.fuzz.clone(), sink)?;

        let shutdown = shutdown_signal();
        match session.run_until(shutdown).await {
            Ok(()) => {
                info!("Fuzzing of {} complete", address);
                Ok(())
            }
            Err(FuzzError::Interrupted) => {
                warn!("Interrupted, disconnected from {}", address);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn handle_config_command(config: &CliAppConfig) -> Result<()> {
        print!("{}", config.to_toml()?);
        Ok(())
    }
}

/// Record every scanned device and pick the first one
fn select_target(sink: &dyn ResultSink, devices: &[DiscoveredDevice]) -> Option<String> {
    for (index, device) in devices.iter().enumerate() {
        sink.info(FuzzEvent::DeviceFound {
            index,
            name: device.name.clone(),
            address: device.address.clone(),
            rssi: device.rssi,
        });
    }

    match devices.first() {
        Some(device) => {
            sink.info(FuzzEvent::TargetSelected {
                address: device.address.clone(),
            });
            Some(device.address.clone())
        }
        None => {
            sink.warn(FuzzEvent::NoDevicesFound);
            None
        }
    }
}

/// Install the Ctrl-C handler now; the returned future resolves on the signal
///
/// `tokio::signal::ctrl_c` only registers its handler when first polled, so
/// it is polled once here, before any connection work starts.
fn shutdown_signal() -> impl Future<Output = ()> {
    let mut ctrl_c = Box::pin(tokio::signal::ctrl_c());
    let early = (&mut ctrl_c).now_or_never();

    async move {
        let result = match early {
            Some(result) => result,
            None => ctrl_c.await,
        };
        if let Err(e) = result {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gattfuzz_core::MemorySink;

    fn device(address: &str, rssi: i16) -> DiscoveredDevice {
        DiscoveredDevice {
            address: address.to_string(),
            name: None,
            rssi: Some(rssi),
        }
    }

    #[test]
    fn test_select_target_logs_every_device_and_takes_first() {
        let sink = MemorySink::new();
        let devices = vec![device("AA:AA:AA:AA:AA:AA", -90), device("BB:BB:BB:BB:BB:BB", -40)];

        let target = select_target(&sink, &devices);

        assert_eq!(target.as_deref(), Some("AA:AA:AA:AA:AA:AA"));
        let lines: Vec<String> = sink.events().iter().map(|e| e.to_string()).collect();
        assert_eq!(
            lines,
            vec![
                "0: (unknown) [AA:AA:AA:AA:AA:AA] RSSI: -90",
                "1: (unknown) [BB:BB:BB:BB:BB:BB] RSSI: -40",
                "Target device: AA:AA:AA:AA:AA:AA",
            ]
        );
    }

    #[test]
    fn test_select_target_with_no_devices() {
        let sink = MemorySink::new();
        assert!(select_target(&sink, &[]).is_none());
        assert_eq!(sink.events(), vec![FuzzEvent::NoDevicesFound]);
    }
}
