//! Write versions.
//!
//! Every client write is stamped once, by the node that accepts it, with a
//! hybrid logical clock reading. Copies of a key carry that stamp wherever
//! they travel, and a store only ever replaces a copy with a later one. A
//! reconciliation push that races with a newer write therefore cannot bring
//! the old value back.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// Hybrid logical clock reading: wall time in milliseconds plus a counter
/// for stamps taken within the same millisecond.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Version {
    pub wall_time: u64,
    pub counter: u32,
}

impl Version {
    pub fn new(wall_time: u64, counter: u32) -> Self {
        Self { wall_time, counter }
    }

    fn next(self) -> Self {
        match self.counter.checked_add(1) {
            Some(counter) => Self::new(self.wall_time, counter),
            None => Self::new(self.wall_time + 1, 0),
        }
    }
}

/// Wire form: `<wall_time>.<counter>`.
impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.wall_time, self.counter)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid version {0:?}")]
pub struct ParseVersionError(String);

impl FromStr for Version {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseVersionError(s.to_string());
        let (wall_time, counter) = s.trim().split_once('.').ok_or_else(invalid)?;
        Ok(Self::new(
            wall_time.parse().map_err(|_| invalid())?,
            counter.parse().map_err(|_| invalid())?,
        ))
    }
}

/// A value and the version of the write that produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Versioned {
    pub value: String,
    pub version: Version,
}

impl Versioned {
    pub fn new(value: impl Into<String>, version: Version) -> Self {
        Self {
            value: value.into(),
            version,
        }
    }

    /// Whether `self` should replace `other`. Later versions win; equal
    /// versions from different nodes fall back to comparing values so every
    /// node picks the same copy.
    pub fn supersedes(&self, other: &Versioned) -> bool {
        (self.version, &self.value) > (other.version, &other.value)
    }
}

/// Per-node clock handing out strictly increasing versions.
///
/// Versions seen on incoming copies are folded in, so a write accepted here
/// always orders after every copy this node already stores.
#[derive(Debug, Default)]
pub struct HybridClock {
    last: Mutex<Version>,
}

impl HybridClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamps a new write.
    pub fn now(&self) -> Version {
        let wall_time = physical_millis();
        let mut last = self.last.lock();
        let next = if wall_time > last.wall_time {
            Version::new(wall_time, 0)
        } else {
            last.next()
        };
        *last = next;
        next
    }

    /// Records a version produced elsewhere.
    pub fn observe(&self, seen: Version) {
        let mut last = self.last.lock();
        if seen > *last {
            *last = seen;
        }
    }
}

fn physical_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
