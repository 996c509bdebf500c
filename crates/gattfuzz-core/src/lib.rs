//! BLE GATT fuzzing engine
//!
//! Connects to one peripheral, walks its service table and exercises each
//! characteristic with adversarial writes, repeated reads and notification
//! subscriptions, recovering from dropped links along the way.
//!
//! ## Architecture
//!
//! - [`corpus`] - Adversarial payload corpus
//! - [`capability`] - Capability flags and exerciser dispatch
//! - [`transport`] - The [`GattTransport`] trait a BLE backend implements
//! - [`connection`] - Connect-with-retry, liveness and reconnection
//! - [`exercise`] - Write-fuzz, read-fuzz and notify-subscribe strategies
//! - [`session`] - The orchestrator state machine
//! - [`sink`] - Timestamped result stream
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use gattfuzz_core::{FuzzConfig, FuzzSession, GattTransport, TracingSink};
//!
//! # async fn example<T: GattTransport>(transport: Arc<T>) -> gattfuzz_core::Result<()> {
//! let config = FuzzConfig::new().with_write_times(10).with_seed(1);
//! let mut session = FuzzSession::new(transport, config, Arc::new(TracingSink))?;
//!
//! // Disconnects on the way out, whatever happens while exercising
//! session.run().await?;
//! # Ok(())
//! # }
//! ```

pub mod capability;
pub mod clock;
pub mod config;
pub mod connection;
pub mod corpus;
pub mod error;
pub mod exercise;
pub mod notification;
pub mod session;
pub mod sink;
pub mod transport;

// Public API exports
pub use capability::{plan_exercises, Capabilities, ExerciseKind, ExercisePlan};
pub use clock::{Clock, TokioClock};
pub use config::FuzzConfig;
pub use connection::{ConnectionManager, LinkState, Liveness};
pub use corpus::{generate_payloads, payload_rng, Corpus, Payload, PayloadClass};
pub use error::{FuzzError, Result, TransportError};
pub use exercise::ExerciseOutcome;
pub use notification::NotificationRecord;
pub use session::{FuzzSession, SessionState};
pub use sink::{hex_preview, FuzzEvent, LogFileSink, MemorySink, Record, ResultSink, Severity, TracingSink};
pub use transport::{
    Characteristic, GattTransport, Notification, Service, TransportResult, WriteMode,
};
