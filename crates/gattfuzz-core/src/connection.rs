//! Connection lifecycle for a single fuzzing session
//!
//! [`ConnectionManager`] owns the link to the peripheral. Exercisers ask it for
//! liveness and recovery and route every GATT operation through it; nothing
//! else touches the transport.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::FuzzConfig;
use crate::error::{FuzzError, Result};
use crate::sink::{FuzzEvent, ResultSink};
use crate::transport::{
    Characteristic, GattTransport, Notification, Service, TransportResult, WriteMode,
};

// ----------------------------------------------------------------------------
// Link State
// ----------------------------------------------------------------------------

/// Connection state of the session's link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

/// What `ensure_live_or_reconnect` had to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// Link was already up
    Live,
    /// Link was down and has been re-established
    Reconnected,
}

// ----------------------------------------------------------------------------
// Connection Manager
// ----------------------------------------------------------------------------

/// Connect-with-retry, liveness and reconnection for one peripheral
pub struct ConnectionManager<T: GattTransport> {
    transport: Arc<T>,
    sink: Arc<dyn ResultSink>,
    clock: Arc<dyn Clock>,
    attempts: u32,
    backoff: std::time::Duration,
    state: LinkState,
    services: Vec<Service>,
}

impl<T: GattTransport> ConnectionManager<T> {
    pub fn new(
        transport: Arc<T>,
        config: &FuzzConfig,
        sink: Arc<dyn ResultSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            transport,
            sink,
            clock,
            attempts: config.reconnect_attempts,
            backoff: config.reconnect_backoff(),
            state: LinkState::Disconnected,
            services: Vec::new(),
        }
    }

    pub fn address(&self) -> &str {
        self.transport.address()
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn sink(&self) -> &dyn ResultSink {
        self.sink.as_ref()
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Service table from the most recent discovery
    pub fn services(&self) -> &[Service] {
        &self.services
    }

    /// Look a characteristic up in the current service table
    pub fn characteristic(&self, uuid: &Uuid) -> Option<&Characteristic> {
        self.services
            .iter()
            .flat_map(|s| s.characteristics.iter())
            .find(|c| c.uuid == *uuid)
    }

    /// Connect and discover, retrying up to the configured budget
    pub async fn connect(&mut self) -> Result<()> {
        let address = self.address().to_string();

        for attempt in 1..=self.attempts {
            self.state = LinkState::Connecting;

            match self.try_connect().await {
                Ok(()) => {
                    self.state = LinkState::Connected;
                    self.sink.info(FuzzEvent::Connected {
                        address,
                        attempt,
                        attempts: self.attempts,
                    });
                    return Ok(());
                }
                Err(e) => {
                    self.state = LinkState::Failed;
                    self.sink.error(FuzzEvent::ConnectFailed {
                        address: address.clone(),
                        attempt,
                        error: e.to_string(),
                    });
                    if attempt < self.attempts {
                        self.clock.sleep(self.backoff).await;
                    }
                }
            }
        }

        Err(FuzzError::RetriesExhausted {
            address,
            attempts: self.attempts,
        })
    }

    /// One transport connect followed by discovery
    async fn try_connect(&mut self) -> TransportResult<()> {
        self.transport.connect().await?;

        match self.transport.discover_services().await {
            Ok(services) => {
                debug!("Discovered {} services on {}", services.len(), self.address());
                self.services = services;
                Ok(())
            }
            Err(e) => {
                // Half-open link: drop it so the next attempt starts clean
                if let Err(drop_err) = self.transport.disconnect().await {
                    debug!("Dropping half-open link failed: {}", drop_err);
                }
                Err(e)
            }
        }
    }

    /// Tear the link down if it is up; safe to call repeatedly
    pub async fn disconnect(&mut self) {
        if !self.transport.is_connected().await {
            self.state = LinkState::Disconnected;
            return;
        }

        if let Err(e) = self.transport.disconnect().await {
            debug!("Transport disconnect reported: {}", e);
        }
        self.state = LinkState::Disconnected;
        self.sink.info(FuzzEvent::Disconnected {
            address: self.address().to_string(),
        });
    }

    /// Cheap liveness check
    pub async fn is_live(&mut self) -> bool {
        if self.state != LinkState::Connected {
            return false;
        }
        if self.transport.is_connected().await {
            return true;
        }
        self.state = LinkState::Disconnected;
        false
    }

    /// Reconnect (with the full retry budget) only when the link is down
    pub async fn ensure_live_or_reconnect(&mut self) -> Result<Liveness> {
        if self.is_live().await {
            return Ok(Liveness::Live);
        }

        self.sink.warn(FuzzEvent::Reconnecting {
            address: self.address().to_string(),
        });
        self.connect().await?;
        Ok(Liveness::Reconnected)
    }

    /// Liveness plus the re-discovery check for `uuid`
    pub async fn ensure_characteristic(&mut self, uuid: &Uuid) -> Result<()> {
        if self.ensure_live_or_reconnect().await? == Liveness::Reconnected
            && self.characteristic(uuid).is_none()
        {
            return Err(FuzzError::CharacteristicVanished { uuid: *uuid });
        }
        Ok(())
    }

    pub async fn read(&self, uuid: &Uuid) -> TransportResult<Vec<u8>> {
        self.transport.read(uuid).await
    }

    pub async fn write(&self, uuid: &Uuid, data: &[u8], mode: WriteMode) -> TransportResult<()> {
        self.transport.write(uuid, data, mode).await
    }

    pub async fn subscribe(
        &self,
        uuid: &Uuid,
        sink: mpsc::Sender<Notification>,
    ) -> TransportResult<()> {
        self.transport.subscribe(uuid, sink).await
    }

    pub async fn unsubscribe(&self, uuid: &Uuid) -> TransportResult<()> {
        self.transport.unsubscribe(uuid).await
    }
}
