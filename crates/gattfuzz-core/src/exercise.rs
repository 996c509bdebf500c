//! Per-characteristic exercise strategies
//!
//! Each strategy runs a bounded number of operations against one
//! characteristic. Operation failures are recorded and the loop carries on; only
//! a failed reconnect (or a characteristic that vanished across one) cuts the
//! strategy short, and even that never ends the session.

use futures::FutureExt;
use rand::Rng;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::capability::ExerciseKind;
use crate::config::FuzzConfig;
use crate::connection::ConnectionManager;
use crate::corpus::generate_payloads;
use crate::error::FuzzError;
use crate::notification::NotificationRecord;
use crate::sink::{hex_preview, FuzzEvent, ResultSink};
use crate::transport::{Characteristic, GattTransport, Notification, WriteMode};

/// How a strategy finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExerciseOutcome {
    /// Ran its full budget; for notify, `iterations` is the delivery count
    Completed { iterations: u32 },
    /// Stopped early after `completed` operations
    Aborted { completed: u32, reason: String },
}

impl ExerciseOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ExerciseOutcome::Completed { .. })
    }
}

fn abort(
    sink: &dyn ResultSink,
    kind: ExerciseKind,
    uuid: Uuid,
    completed: u32,
    error: &FuzzError,
) -> ExerciseOutcome {
    let reason = error.to_string();
    sink.error(FuzzEvent::ExerciseAborted {
        kind,
        uuid,
        reason: reason.clone(),
    });
    ExerciseOutcome::Aborted { completed, reason }
}

// ----------------------------------------------------------------------------
// Write Fuzz
// ----------------------------------------------------------------------------

/// Write `write_times` randomly chosen corpus payloads
pub async fn write_fuzz<T, R>(
    conn: &mut ConnectionManager<T>,
    characteristic: &Characteristic,
    config: &FuzzConfig,
    rng: &mut R,
) -> ExerciseOutcome
where
    T: GattTransport,
    R: Rng + Send + ?Sized,
{
    let uuid = characteristic.uuid;
    let mode = WriteMode::for_capabilities(characteristic.capabilities);
    let corpus = generate_payloads(rng);

    conn.sink().info(FuzzEvent::ExerciseStarted {
        kind: ExerciseKind::Write,
        uuid,
        budget: u64::from(config.write_times),
    });

    for iteration in 0..config.write_times {
        if let Err(e) = conn.ensure_characteristic(&uuid).await {
            return abort(conn.sink(), ExerciseKind::Write, uuid, iteration, &e);
        }

        let Some(payload) = corpus.choose(rng) else {
            break;
        };

        match conn.write(&uuid, payload.bytes(), mode).await {
            Ok(()) => conn.sink().info(FuzzEvent::WriteOk {
                uuid,
                len: payload.len(),
                preview: hex_preview(payload.bytes()),
            }),
            Err(e) => conn.sink().error(FuzzEvent::WriteFailed {
                uuid,
                len: payload.len(),
                error: e.to_string(),
            }),
        }

        conn.clock().sleep(config.write_delay()).await;
    }

    ExerciseOutcome::Completed {
        iterations: config.write_times,
    }
}

// ----------------------------------------------------------------------------
// Read Fuzz
// ----------------------------------------------------------------------------

/// Read the characteristic `read_times` times
pub async fn read_fuzz<T: GattTransport>(
    conn: &mut ConnectionManager<T>,
    characteristic: &Characteristic,
    config: &FuzzConfig,
) -> ExerciseOutcome {
    let uuid = characteristic.uuid;

    conn.sink().info(FuzzEvent::ExerciseStarted {
        kind: ExerciseKind::Read,
        uuid,
        budget: u64::from(config.read_times),
    });

    for iteration in 0..config.read_times {
        if let Err(e) = conn.ensure_characteristic(&uuid).await {
            return abort(conn.sink(), ExerciseKind::Read, uuid, iteration, &e);
        }

        match conn.read(&uuid).await {
            Ok(data) => conn.sink().info(FuzzEvent::ReadOk {
                uuid,
                len: data.len(),
                preview: hex_preview(&data),
            }),
            Err(e) => conn.sink().error(FuzzEvent::ReadFailed {
                uuid,
                error: e.to_string(),
            }),
        }

        conn.clock().sleep(config.write_delay()).await;
    }

    ExerciseOutcome::Completed {
        iterations: config.read_times,
    }
}

// ----------------------------------------------------------------------------
// Notify Subscribe
// ----------------------------------------------------------------------------

fn log_delivery(sink: &dyn ResultSink, record: &mut NotificationRecord, notification: Notification) {
    sink.info(FuzzEvent::NotificationReceived {
        uuid: notification.uuid,
        len: notification.value.len(),
        preview: hex_preview(&notification.value),
    });
    record.record(notification.uuid, notification.value);
}

/// Subscribe, collect deliveries for `notify_time`, unsubscribe
pub async fn notify_subscribe<T: GattTransport>(
    conn: &mut ConnectionManager<T>,
    characteristic: &Characteristic,
    config: &FuzzConfig,
    record: &mut NotificationRecord,
) -> ExerciseOutcome {
    let uuid = characteristic.uuid;

    conn.sink().info(FuzzEvent::ExerciseStarted {
        kind: ExerciseKind::Notify,
        uuid,
        budget: config.notify_time_secs,
    });

    if let Err(e) = conn.ensure_characteristic(&uuid).await {
        return abort(conn.sink(), ExerciseKind::Notify, uuid, 0, &e);
    }

    let (tx, mut rx) = mpsc::channel(config.notify_buffer);
    if let Err(e) = conn.subscribe(&uuid, tx).await {
        let reason = e.to_string();
        conn.sink().error(FuzzEvent::SubscribeFailed {
            uuid,
            error: reason.clone(),
        });
        return ExerciseOutcome::Aborted {
            completed: 0,
            reason,
        };
    }
    conn.sink().info(FuzzEvent::Subscribed { uuid });

    let mut received = 0u32;
    let mut channel_open = true;
    let mut idle = conn.clock().sleep(config.notify_time());
    // Polling once starts the window here instead of at the first loop turn
    let mut expired = (&mut idle).now_or_never().is_some();
    while !expired {
        tokio::select! {
            // The deadline is checked before every delivery
            biased;
            _ = &mut idle => expired = true,
            delivery = rx.recv(), if channel_open => match delivery {
                Some(notification) => {
                    log_delivery(conn.sink(), record, notification);
                    received += 1;
                }
                None => channel_open = false,
            },
        }
    }
    drop(idle);

    // Deliveries already queued when the window closed
    for _ in 0..config.notify_buffer {
        match rx.try_recv() {
            Ok(notification) => {
                log_delivery(conn.sink(), record, notification);
                received += 1;
            }
            Err(_) => break,
        }
    }

    if let Err(e) = conn.unsubscribe(&uuid).await {
        let reason = e.to_string();
        conn.sink().error(FuzzEvent::UnsubscribeFailed {
            uuid,
            error: reason.clone(),
        });
        return ExerciseOutcome::Aborted {
            completed: received,
            reason,
        };
    }
    conn.sink().info(FuzzEvent::Unsubscribed { uuid });

    ExerciseOutcome::Completed {
        iterations: received,
    }
}
