//! Time window bounding one sync pass.

use chrono::{DateTime, Duration, Utc};

/// Half-open range `[from, to)` fetched from the remote side per pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl SyncWindow {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        SyncWindow { from, to }
    }

    /// `past_days` before `now` through `future_days` after it.
    ///
    /// Negative day counts are treated as zero; bounds past the
    /// representable range saturate.
    pub fn around(now: DateTime<Utc>, past_days: i64, future_days: i64) -> Self {
        SyncWindow {
            from: now
                .checked_sub_signed(days(past_days))
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            to: now
                .checked_add_signed(days(future_days))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// Whether the half-open interval `[start, end)` overlaps the window.
    ///
    /// Zero-length intervals count when their instant lies inside.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        if end <= start {
            return start >= self.from && start < self.to;
        }
        start < self.to && end > self.from
    }

    /// `from` as RFC3339, the format the remote API takes.
    pub fn from_rfc3339(&self) -> String {
        self.from.to_rfc3339()
    }

    /// `to` as RFC3339, the format the remote API takes.
    pub fn to_rfc3339(&self) -> String {
        self.to.to_rfc3339()
    }
}

fn days(n: i64) -> Duration {
    Duration::try_days(n.max(0)).unwrap_or(Duration::MAX)
}
