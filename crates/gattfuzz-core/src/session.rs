//! Session orchestrator
//!
//! Drives one run: connect, list the service table, exercise every
//! characteristic according to its capabilities, and always close.
//! [`FuzzSession::run_until`] reaches `Closing` however the run ended, whether
//! it finished, panicked or was interrupted while still connecting.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use rand_chacha::ChaCha8Rng;
use tracing::debug;
use uuid::Uuid;

use crate::capability::{plan_exercises, ExerciseKind};
use crate::clock::{Clock, TokioClock};
use crate::config::FuzzConfig;
use crate::connection::ConnectionManager;
use crate::corpus::payload_rng;
use crate::error::{FuzzError, Result};
use crate::exercise::{notify_subscribe, read_fuzz, write_fuzz, ExerciseOutcome};
use crate::notification::NotificationRecord;
use crate::sink::{FuzzEvent, ResultSink};
use crate::transport::{Characteristic, GattTransport, Service};

// ----------------------------------------------------------------------------
// Session State
// ----------------------------------------------------------------------------

/// Orchestrator lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Discovering,
    Exercising { characteristic: Uuid },
    Closing,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "Idle"),
            SessionState::Connecting => write!(f, "Connecting"),
            SessionState::Discovering => write!(f, "Discovering"),
            SessionState::Exercising { characteristic } => {
                write!(f, "Exercising({})", characteristic)
            }
            SessionState::Closing => write!(f, "Closing"),
            SessionState::Closed => write!(f, "Closed"),
        }
    }
}

// ----------------------------------------------------------------------------
// Session
// ----------------------------------------------------------------------------

/// One fuzzing run against one peripheral
pub struct FuzzSession<T: GattTransport> {
    config: FuzzConfig,
    connection: ConnectionManager<T>,
    sink: Arc<dyn ResultSink>,
    rng: ChaCha8Rng,
    notifications: NotificationRecord,
    state: SessionState,
}

impl<T: GattTransport> FuzzSession<T> {
    /// Session on the wall clock
    pub fn new(transport: Arc<T>, config: FuzzConfig, sink: Arc<dyn ResultSink>) -> Result<Self> {
        Self::with_clock(transport, config, sink, Arc::new(TokioClock))
    }

    /// Session with an explicit time source
    pub fn with_clock(
        transport: Arc<T>,
        config: FuzzConfig,
        sink: Arc<dyn ResultSink>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let connection = ConnectionManager::new(transport, &config, sink.clone(), clock);
        let rng = payload_rng(config.seed);

        Ok(Self {
            config,
            connection,
            sink,
            rng,
            notifications: NotificationRecord::new(),
            state: SessionState::Idle,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &FuzzConfig {
        &self.config
    }

    pub fn notifications(&self) -> &NotificationRecord {
        &self.notifications
    }

    pub fn connection(&self) -> &ConnectionManager<T> {
        &self.connection
    }

    fn transition(&mut self, next: SessionState) {
        debug!("Session {} -> {}", self.state, next);
        self.state = next;
    }

    /// Run to completion
    pub async fn run(&mut self) -> Result<()> {
        self.run_until(futures::future::pending::<()>()).await
    }

    /// Run until done or until `shutdown` resolves, then disconnect
    ///
    /// `shutdown` races the whole run, connecting and discovery included. The
    /// link is closed on every exit path, whenever the transport reports it up.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let outcome = {
            let run = AssertUnwindSafe(self.connect_and_exercise()).catch_unwind();
            tokio::select! {
                biased;
                result = run => result.unwrap_or_else(|panic| {
                    Err(FuzzError::Panicked(panic_message(panic.as_ref())))
                }),
                _ = shutdown => Err(FuzzError::Interrupted),
            }
        };

        if let Err(e) = &outcome {
            self.sink.error(FuzzEvent::SessionFault {
                error: e.to_string(),
            });
        }

        self.transition(SessionState::Closing);
        self.connection.disconnect().await;
        self.transition(SessionState::Closed);

        outcome
    }

    async fn connect_and_exercise(&mut self) -> Result<()> {
        self.transition(SessionState::Connecting);
        self.connection.connect().await?;

        self.transition(SessionState::Discovering);
        let services = self.connection.services().to_vec();
        self.report_services(&services);

        self.exercise_all(&services).await
    }

    fn report_services(&self, services: &[Service]) {
        self.sink.info(FuzzEvent::ServicesDiscovered {
            count: services.len(),
        });
        for service in services {
            self.sink.info(FuzzEvent::ServiceFound {
                uuid: service.uuid,
                description: service.description.clone(),
            });
            for characteristic in &service.characteristics {
                self.sink.info(FuzzEvent::CharacteristicFound {
                    uuid: characteristic.uuid,
                    capabilities: characteristic.capabilities,
                });
            }
        }
    }

    async fn exercise_all(&mut self, services: &[Service]) -> Result<()> {
        for characteristic in services.iter().flat_map(|s| s.characteristics.iter()) {
            self.transition(SessionState::Exercising {
                characteristic: characteristic.uuid,
            });
            for kind in plan_exercises(characteristic.capabilities) {
                let outcome = self.exercise(kind, characteristic).await;
                debug!("{} on {} finished: {:?}", kind, characteristic.uuid, outcome);
            }
        }
        Ok(())
    }

    async fn exercise(
        &mut self,
        kind: ExerciseKind,
        characteristic: &Characteristic,
    ) -> ExerciseOutcome {
        match kind {
            ExerciseKind::Write => {
                write_fuzz(&mut self.connection, characteristic, &self.config, &mut self.rng).await
            }
            ExerciseKind::Read => read_fuzz(&mut self.connection, characteristic, &self.config).await,
            ExerciseKind::Notify => {
                notify_subscribe(
                    &mut self.connection,
                    characteristic,
                    &self.config,
                    &mut self.notifications,
                )
                .await
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic type".to_string()
    }
}
