//! Characteristic capability flags and exerciser dispatch

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;

// ----------------------------------------------------------------------------
// Capability Set
// ----------------------------------------------------------------------------

/// Fixed set of GATT properties the engine cares about
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Capabilities(u8);

bitflags::bitflags! {
    impl Capabilities: u8 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        const WRITE_WITHOUT_RESPONSE = 1 << 2;
        const NOTIFY = 1 << 3;
    }
}

impl Capabilities {
    pub const NONE: Self = Self::empty();

    const NAMED: [(Self, &'static str); 4] = [
        (Self::READ, "read"),
        (Self::WRITE, "write"),
        (Self::WRITE_WITHOUT_RESPONSE, "write-without-response"),
        (Self::NOTIFY, "notify"),
    ];

    /// Can receive write-fuzz with either write flavour
    pub const fn is_writable(self) -> bool {
        self.intersects(Self::WRITE.union(Self::WRITE_WITHOUT_RESPONSE))
    }

    /// Property names in GATT order, e.g. `["read", "notify"]`
    pub fn names(self) -> Vec<&'static str> {
        Self::NAMED
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect()
    }

    /// Parse a single property name as the BLE stacks spell them
    pub fn from_name(name: &str) -> Option<Self> {
        Self::NAMED
            .iter()
            .find(|(_, n)| n.eq_ignore_ascii_case(name))
            .map(|(flag, _)| *flag)
    }
}

impl Serialize for Capabilities {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        bitflags::serde::serialize(self, serializer)
    }
}

impl<'de> Deserialize<'de> for Capabilities {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        bitflags::serde::deserialize(deserializer)
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.names().join(","))
    }
}

// ----------------------------------------------------------------------------
// Dispatch
// ----------------------------------------------------------------------------

/// The exercise strategies the engine knows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExerciseKind {
    Write,
    Read,
    Notify,
}

impl fmt::Display for ExerciseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExerciseKind::Write => write!(f, "write-fuzz"),
            ExerciseKind::Read => write!(f, "read-fuzz"),
            ExerciseKind::Notify => write!(f, "notify-subscribe"),
        }
    }
}

/// Ordered exercisers applicable to a characteristic
pub type ExercisePlan = SmallVec<[ExerciseKind; 3]>;

/// Map a capability set to the exercisers that run against it, in order
pub fn plan_exercises(capabilities: Capabilities) -> ExercisePlan {
    let mut plan = ExercisePlan::new();
    if capabilities.is_writable() {
        plan.push(ExerciseKind::Write);
    }
    if capabilities.contains(Capabilities::READ) {
        plan.push(ExerciseKind::Read);
    }
    if capabilities.contains(Capabilities::NOTIFY) {
        plan.push(ExerciseKind::Notify);
    }
    plan
}
