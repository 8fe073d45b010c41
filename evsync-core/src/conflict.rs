//! Last-writer-wins conflict resolution.

use serde::{Deserialize, Serialize};

/// Which side of a linked pair holds the authoritative copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    Local,
    Remote,
    /// The timestamps are within the skew tolerance of each other.
    Equal,
}

/// Compares last-modified timestamps with a skew tolerance, so a record we
/// just pushed and immediately re-fetched is not mistaken for a remote edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConflictPolicy {
    tolerance_ms: i64,
}

impl Default for ConflictPolicy {
    fn default() -> Self {
        ConflictPolicy { tolerance_ms: 1000 }
    }
}

impl ConflictPolicy {
    pub fn new(tolerance_ms: i64) -> Self {
        ConflictPolicy {
            tolerance_ms: tolerance_ms.max(0),
        }
    }

    pub fn tolerance_ms(&self) -> i64 {
        self.tolerance_ms
    }

    pub fn decide(&self, local_ms: i64, remote_ms: i64) -> Resolution {
        decide(local_ms, remote_ms, self.tolerance_ms)
    }
}

/// Pure decision function; a difference of exactly `tolerance_ms` is equal.
pub fn decide(local_ms: i64, remote_ms: i64, tolerance_ms: i64) -> Resolution {
    let diff = i128::from(local_ms) - i128::from(remote_ms);
    let tolerance = i128::from(tolerance_ms.max(0));

    if diff > tolerance {
        Resolution::Local
    } else if -diff > tolerance {
        Resolution::Remote
    } else {
        Resolution::Equal
    }
}
