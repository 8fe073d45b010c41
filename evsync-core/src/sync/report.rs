//! Counts reported after a sync pass.

use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Remote events created locally.
    pub imported: usize,
    /// Local events overwritten with a newer remote copy.
    pub pulled: usize,
    pub inserted: usize,
    pub updated_remote: usize,
    /// Local events dropped because the remote copy was cancelled.
    pub deleted_local: usize,
    pub tombstones_flushed: usize,
    pub failed: usize,
    /// Local events left alone because their remote copy could not be decoded.
    pub skipped: usize,
}

impl SyncReport {
    /// Number of records changed on either side.
    pub fn changes(&self) -> usize {
        self.imported
            + self.pulled
            + self.inserted
            + self.updated_remote
            + self.deleted_local
            + self.tombstones_flushed
    }

    pub fn is_empty(&self) -> bool {
        self.changes() == 0 && self.failed == 0 && self.skipped == 0
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "already in sync");
        }

        write!(
            f,
            "imported {}, pulled {}, inserted {}, updated {}, deleted {}, tombstones flushed {}",
            self.imported,
            self.pulled,
            self.inserted,
            self.updated_remote,
            self.deleted_local,
            self.tombstones_flushed
        )?;

        if self.failed > 0 {
            write!(f, ", {} failed", self.failed)?;
        }
        if self.skipped > 0 {
            write!(f, ", {} skipped", self.skipped)?;
        }

        Ok(())
    }
}
