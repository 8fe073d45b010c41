//! Local event types.
//!
//! `LocalEvent` is the record owned by the local store. The UI layer creates
//! and edits it; the sync engine only links it to a remote counterpart, pulls
//! remote edits into it, and encodes it for the gateway.

use chrono::{DateTime, Days, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::remote::RemoteEvent;

/// Current wall-clock time in milliseconds, the unit of `last_modified`.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// A scheduled event in the local store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalEvent {
    pub id: String,
    pub uid: String,
    #[serde(default, alias = "googleId")]
    pub remote_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub color: Option<String>,
    pub is_all_day: bool,
    /// For all-day events: local midnight of the first day.
    pub start: DateTime<Utc>,
    /// For all-day events: local midnight of the last day (inclusive).
    pub end: DateTime<Utc>,
    pub last_modified: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder: Option<serde_json::Value>,
}

impl LocalEvent {
    /// Create a fresh, unlinked event stamped with the current time.
    pub fn new(title: &str, span: &EventSpan, tz: Tz) -> Self {
        let id = Uuid::new_v4().to_string();
        let (start, end) = span.to_instants(tz);

        LocalEvent {
            uid: format!("{}@evsync", id),
            id,
            remote_id: None,
            title: title.to_string(),
            description: String::new(),
            color: None,
            is_all_day: span.is_all_day(),
            start,
            end,
            last_modified: now_millis(),
            reminder: None,
        }
    }

    /// Build a new local record from a remote event that has no local
    /// counterpart. Returns `None` for cancelled stubs that carry no times.
    pub fn import(remote: &RemoteEvent, tz: Tz, default_color: &str) -> Option<Self> {
        let span = remote.span.as_ref()?;
        let (start, end) = span.to_instants(tz);

        Some(LocalEvent {
            id: Uuid::new_v4().to_string(),
            uid: remote.uid.clone(),
            remote_id: Some(remote.remote_id.clone()),
            title: remote.summary.clone(),
            description: remote.description.clone(),
            color: Some(
                remote
                    .color
                    .clone()
                    .unwrap_or_else(|| default_color.to_string()),
            ),
            is_all_day: span.is_all_day(),
            start,
            end,
            last_modified: remote.updated.timestamp_millis(),
            reminder: None,
        })
    }

    /// Overwrite the descriptive fields with the remote copy (pull).
    ///
    /// `uid`, `id` and `reminder` are never touched; `color` only when the
    /// remote side carries one.
    pub fn pull_from(&mut self, remote: &RemoteEvent, tz: Tz) {
        self.title = remote.summary.clone();
        self.description = remote.description.clone();
        self.remote_id = Some(remote.remote_id.clone());

        if let Some(color) = &remote.color {
            self.color = Some(color.clone());
        }

        if let Some(span) = &remote.span {
            let (start, end) = span.to_instants(tz);
            self.is_all_day = span.is_all_day();
            self.start = start;
            self.end = end;
        }

        self.last_modified = remote.updated.timestamp_millis();
    }

    /// Record a local edit.
    pub fn touch(&mut self) {
        self.last_modified = now_millis();
    }

    /// The event's time range with the all-day flag folded into the variant.
    pub fn span(&self, tz: Tz) -> EventSpan {
        if self.is_all_day {
            let first = self.start.with_timezone(&tz).date_naive();
            let last = self.end.with_timezone(&tz).date_naive().max(first);
            EventSpan::AllDay { first, last }
        } else {
            EventSpan::Timed {
                start: self.start,
                end: self.end,
            }
        }
    }

    /// Half-open instant range the event occupies. An all-day event covers
    /// its last day entirely.
    pub fn occupied(&self, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
        match self.span(tz) {
            EventSpan::AllDay { first, last } => {
                let after_last = last.checked_add_days(Days::new(1)).unwrap_or(last);
                (local_midnight(first, tz), local_midnight(after_last, tz))
            }
            EventSpan::Timed { start, end } => (start, end),
        }
    }
}

/// A pending remote deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tombstone {
    pub uid: String,
    #[serde(default, alias = "googleId")]
    pub remote_id: Option<String>,
}

impl From<&LocalEvent> for Tombstone {
    fn from(event: &LocalEvent) -> Self {
        Tombstone {
            uid: event.uid.clone(),
            remote_id: event.remote_id.clone(),
        }
    }
}

/// When an event happens.
///
/// All-day ranges are inclusive on both ends, in local calendar dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSpan {
    AllDay { first: NaiveDate, last: NaiveDate },
    Timed { start: DateTime<Utc>, end: DateTime<Utc> },
}

impl EventSpan {
    pub fn is_all_day(&self) -> bool {
        matches!(self, EventSpan::AllDay { .. })
    }

    /// Convert to the instants stored on a `LocalEvent`.
    pub fn to_instants(&self, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
        match self {
            EventSpan::AllDay { first, last } => {
                (local_midnight(*first, tz), local_midnight(*last, tz))
            }
            EventSpan::Timed { start, end } => (*start, *end),
        }
    }
}

/// Midnight of `date` in `tz`, as a UTC instant.
pub fn local_midnight(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{RemoteStatus, UidSource};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn remote_all_day(first: NaiveDate, last: NaiveDate) -> RemoteEvent {
        RemoteEvent {
            remote_id: "g-1".to_string(),
            status: RemoteStatus::Active,
            updated: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
            uid: "abc@evsync".to_string(),
            uid_source: UidSource::Extension,
            summary: "Trip".to_string(),
            description: "Pack bags".to_string(),
            color: None,
            span: Some(EventSpan::AllDay { first, last }),
        }
    }

    #[test]
    fn test_all_day_span_survives_local_time_zone() {
        let tz: Tz = "Asia/Seoul".parse().unwrap();
        let span = EventSpan::AllDay {
            first: date(2025, 12, 31),
            last: date(2026, 1, 2),
        };

        let event = LocalEvent::new("New year", &span, tz);

        assert!(event.is_all_day);
        assert_eq!(event.span(tz), span);
        // Midnight in Seoul is the previous day in UTC
        assert_eq!(event.start, Utc.with_ymd_and_hms(2025, 12, 30, 15, 0, 0).unwrap());
    }

    #[test]
    fn test_occupied_covers_whole_last_day() {
        let tz = Tz::UTC;
        let span = EventSpan::AllDay {
            first: date(2025, 2, 28),
            last: date(2025, 2, 28),
        };
        let event = LocalEvent::new("Deadline", &span, tz);

        let (from, to) = event.occupied(tz);
        assert_eq!(from, Utc.with_ymd_and_hms(2025, 2, 28, 0, 0, 0).unwrap());
        assert_eq!(to, Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_import_uses_default_color_and_remote_timestamp() {
        let remote = remote_all_day(date(2025, 4, 1), date(2025, 4, 3));

        let event = LocalEvent::import(&remote, Tz::UTC, "#3b82f6").unwrap();

        assert_eq!(event.uid, "abc@evsync");
        assert_eq!(event.remote_id.as_deref(), Some("g-1"));
        assert_eq!(event.color.as_deref(), Some("#3b82f6"));
        assert_eq!(event.last_modified, remote.updated.timestamp_millis());
        assert_eq!(
            event.span(Tz::UTC),
            EventSpan::AllDay {
                first: date(2025, 4, 1),
                last: date(2025, 4, 3)
            }
        );
    }

    #[test]
    fn test_import_skips_cancelled_stub() {
        let mut remote = remote_all_day(date(2025, 4, 1), date(2025, 4, 1));
        remote.status = RemoteStatus::Cancelled;
        remote.span = None;

        assert!(LocalEvent::import(&remote, Tz::UTC, "#3b82f6").is_none());
    }

    #[test]
    fn test_pull_keeps_identity_reminder_and_color_when_remote_has_none() {
        let tz = Tz::UTC;
        let mut local = LocalEvent::new(
            "Old title",
            &EventSpan::AllDay {
                first: date(2025, 4, 1),
                last: date(2025, 4, 1),
            },
            tz,
        );
        local.color = Some("#ff0000".to_string());
        local.reminder = Some(serde_json::json!({ "minutes": 10 }));
        let id = local.id.clone();
        let uid = local.uid.clone();

        let remote = remote_all_day(date(2025, 4, 2), date(2025, 4, 5));
        local.pull_from(&remote, tz);

        assert_eq!(local.id, id);
        assert_eq!(local.uid, uid);
        assert_eq!(local.title, "Trip");
        assert_eq!(local.color.as_deref(), Some("#ff0000"));
        assert_eq!(local.reminder, Some(serde_json::json!({ "minutes": 10 })));
        assert_eq!(local.last_modified, remote.updated.timestamp_millis());
        assert_eq!(local.remote_id.as_deref(), Some("g-1"));
    }

    #[test]
    fn test_tombstone_from_event_carries_uid_and_remote_id() {
        let mut event = LocalEvent::new(
            "Lunch",
            &EventSpan::Timed {
                start: Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap(),
                end: Utc.with_ymd_and_hms(2025, 5, 1, 13, 0, 0).unwrap(),
            },
            Tz::UTC,
        );
        event.remote_id = Some("g-9".to_string());

        let tombstone = Tombstone::from(&event);
        assert_eq!(tombstone.uid, event.uid);
        assert_eq!(tombstone.remote_id.as_deref(), Some("g-9"));
    }
}
