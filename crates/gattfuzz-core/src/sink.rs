//! Result sink: the append-only record of a fuzzing run
//!
//! The engine never logs outcomes through a global logger. Every component
//! that reports something holds an `Arc<dyn ResultSink>` handed down by the
//! session, so tests can swap in a [`MemorySink`].

use std::fmt;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use uuid::Uuid;

use crate::capability::{Capabilities, ExerciseKind};

/// Bytes of a payload shown in previews
pub const PREVIEW_BYTES: usize = 30;

/// Hex of the first [`PREVIEW_BYTES`] bytes, `...` appended when truncated
pub fn hex_preview(data: &[u8]) -> String {
    let shown = &data[..data.len().min(PREVIEW_BYTES)];
    let mut preview = hex::encode(shown);
    if data.len() > PREVIEW_BYTES {
        preview.push_str("...");
    }
    preview
}

// ----------------------------------------------------------------------------
// Events
// ----------------------------------------------------------------------------

/// Event severity, used for formatting only
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warn => write!(f, "WARNING"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Everything a session reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FuzzEvent {
    DeviceFound {
        index: usize,
        name: Option<String>,
        address: String,
        rssi: Option<i16>,
    },
    NoDevicesFound,
    TargetSelected {
        address: String,
    },
    Connected {
        address: String,
        attempt: u32,
        attempts: u32,
    },
    ConnectFailed {
        address: String,
        attempt: u32,
        error: String,
    },
    Disconnected {
        address: String,
    },
    Reconnecting {
        address: String,
    },
    ServicesDiscovered {
        count: usize,
    },
    ServiceFound {
        uuid: Uuid,
        description: String,
    },
    CharacteristicFound {
        uuid: Uuid,
        capabilities: Capabilities,
    },
    /// `budget` is iterations for read/write, seconds for notify
    ExerciseStarted {
        kind: ExerciseKind,
        uuid: Uuid,
        budget: u64,
    },
    ExerciseAborted {
        kind: ExerciseKind,
        uuid: Uuid,
        reason: String,
    },
    WriteOk {
        uuid: Uuid,
        len: usize,
        preview: String,
    },
    WriteFailed {
        uuid: Uuid,
        len: usize,
        error: String,
    },
    ReadOk {
        uuid: Uuid,
        len: usize,
        preview: String,
    },
    ReadFailed {
        uuid: Uuid,
        error: String,
    },
    Subscribed {
        uuid: Uuid,
    },
    SubscribeFailed {
        uuid: Uuid,
        error: String,
    },
    NotificationReceived {
        uuid: Uuid,
        len: usize,
        preview: String,
    },
    Unsubscribed {
        uuid: Uuid,
    },
    UnsubscribeFailed {
        uuid: Uuid,
        error: String,
    },
    SessionFault {
        error: String,
    },
}

impl fmt::Display for FuzzEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FuzzEvent::DeviceFound { index, name, address, rssi } => {
                let name = name.as_deref().unwrap_or("(unknown)");
                match rssi {
                    Some(rssi) => write!(f, "{}: {} [{}] RSSI: {}", index, name, address, rssi),
                    None => write!(f, "{}: {} [{}] RSSI: n/a", index, name, address),
                }
            }
            FuzzEvent::NoDevicesFound => write!(f, "No BLE devices found"),
            FuzzEvent::TargetSelected { address } => write!(f, "Target device: {}", address),
            FuzzEvent::Connected { address, attempt, attempts } => {
                write!(f, "Connected to {} (attempt {}/{})", address, attempt, attempts)
            }
            FuzzEvent::ConnectFailed { address, attempt, error } => {
                write!(f, "Connection to {} failed (attempt {}): {}", address, attempt, error)
            }
            FuzzEvent::Disconnected { address } => write!(f, "Disconnected from {}", address),
            FuzzEvent::Reconnecting { address } => {
                write!(f, "Connection to {} lost, reconnecting...", address)
            }
            FuzzEvent::ServicesDiscovered { count } => write!(f, "Discovered {} services", count),
            FuzzEvent::ServiceFound { uuid, description } => {
                write!(f, "[Service] {} - {}", uuid, description)
            }
            FuzzEvent::CharacteristicFound { uuid, capabilities } => {
                write!(f, "  [Characteristic] {} ({})", uuid, capabilities)
            }
            FuzzEvent::ExerciseStarted { kind, uuid, budget } => match kind {
                ExerciseKind::Notify => write!(f, "Starting {} on {} for {}s", kind, uuid, budget),
                _ => write!(f, "Starting {} on {}, {} iterations", kind, uuid, budget),
            },
            FuzzEvent::ExerciseAborted { kind, uuid, reason } => {
                write!(f, "Aborted {} on {}: {}", kind, uuid, reason)
            }
            FuzzEvent::WriteOk { uuid, len, preview } => {
                write!(f, "  Write to {} ok ({} bytes): {}", uuid, len, preview)
            }
            FuzzEvent::WriteFailed { uuid, len, error } => {
                write!(f, "  Write to {} failed ({} bytes): {}", uuid, len, error)
            }
            FuzzEvent::ReadOk { uuid, len, preview } => {
                write!(f, "  Read from {} ok ({} bytes): {}", uuid, len, preview)
            }
            FuzzEvent::ReadFailed { uuid, error } => {
                write!(f, "  Read from {} failed: {}", uuid, error)
            }
            FuzzEvent::Subscribed { uuid } => write!(f, "Subscribed to notifications: {}", uuid),
            FuzzEvent::SubscribeFailed { uuid, error } => {
                write!(f, "Notification subscription on {} failed: {}", uuid, error)
            }
            FuzzEvent::NotificationReceived { uuid, len, preview } => {
                write!(f, "  Notification from {} ({} bytes): {}", uuid, len, preview)
            }
            FuzzEvent::Unsubscribed { uuid } => {
                write!(f, "Unsubscribed from notifications: {}", uuid)
            }
            FuzzEvent::UnsubscribeFailed { uuid, error } => {
                write!(f, "Notification unsubscribe on {} failed: {}", uuid, error)
            }
            FuzzEvent::SessionFault { error } => write!(f, "Session fault: {}", error),
        }
    }
}

/// A recorded event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub severity: Severity,
    pub event: FuzzEvent,
}

// ----------------------------------------------------------------------------
// Sink Trait
// ----------------------------------------------------------------------------

/// Destination for session events, in issue order
pub trait ResultSink: Send + Sync {
    fn record(&self, severity: Severity, event: FuzzEvent);

    fn info(&self, event: FuzzEvent) {
        self.record(Severity::Info, event);
    }

    fn warn(&self, event: FuzzEvent) {
        self.record(Severity::Warn, event);
    }

    fn error(&self, event: FuzzEvent) {
        self.record(Severity::Error, event);
    }
}

fn emit_console(severity: Severity, event: &FuzzEvent) {
    match severity {
        Severity::Info => tracing::info!("{}", event),
        Severity::Warn => tracing::warn!("{}", event),
        Severity::Error => tracing::error!("{}", event),
    }
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

/// Console-only sink routed through `tracing`
#[derive(Debug, Default)]
pub struct TracingSink;

impl ResultSink for TracingSink {
    fn record(&self, severity: Severity, event: FuzzEvent) {
        emit_console(severity, &event);
    }
}

/// Timestamped log file plus console mirror
#[derive(Debug)]
pub struct LogFileSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl LogFileSink {
    /// Create `<dir>/<prefix>_<YYYYmmdd_HHMMSS>.log`
    pub fn create(dir: impl AsRef<Path>, prefix: &str) -> io::Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        Self::open(dir.join(format!("{}_{}.log", prefix, stamp)))
    }

    /// Append to an explicit path
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append_line(&self, severity: Severity, event: &FuzzEvent) -> io::Result<()> {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let mut file = self
            .file
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log file lock poisoned"))?;
        writeln!(file, "{} [{}] {}", timestamp, severity, event)?;
        file.flush()
    }
}

impl ResultSink for LogFileSink {
    fn record(&self, severity: Severity, event: FuzzEvent) {
        emit_console(severity, &event);
        if let Err(e) = self.append_line(severity, &event) {
            tracing::error!("Failed to append to {}: {}", self.path.display(), e);
        }
    }
}

/// In-memory sink
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<Record>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far
    pub fn records(&self) -> Vec<Record> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn events(&self) -> Vec<FuzzEvent> {
        self.records().into_iter().map(|r| r.event).collect()
    }

    /// Number of records matching `predicate`
    pub fn count(&self, predicate: impl Fn(&FuzzEvent) -> bool) -> usize {
        self.records().iter().filter(|r| predicate(&r.event)).count()
    }
}

impl ResultSink for MemorySink {
    fn record(&self, severity: Severity, event: FuzzEvent) {
        if let Ok(mut records) = self.records.lock() {
            records.push(Record { severity, event });
        }
    }
}
