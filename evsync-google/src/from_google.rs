use chrono::{DateTime, Days, NaiveDate, Utc};
use evsync_core::error::{EvSyncError, EvSyncResult};
use evsync_core::event::EventSpan;
use evsync_core::remote::{RemoteEvent, RemoteStatus, UidSource, synthesized_uid};

use crate::to_google::UID_MARKER;
use crate::wire::{EventDateTime, GoogleEvent};

/// Summary prefix written by an earlier version of the app.
const LEGACY_SUMMARY_PREFIX: &str = "[AI] ";

pub trait FromGoogle {
    fn from_google(event: GoogleEvent) -> EvSyncResult<Self>
    where
        Self: Sized;
}

impl FromGoogle for RemoteEvent {
    fn from_google(event: GoogleEvent) -> EvSyncResult<Self> {
        let remote_id = event
            .id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| malformed("<unknown>", "missing id"))?;

        let status = match event.status.as_deref() {
            Some("cancelled") => RemoteStatus::Cancelled,
            _ => RemoteStatus::Active,
        };

        let updated = event
            .updated
            .as_deref()
            .ok_or_else(|| malformed(&remote_id, "missing updated"))
            .and_then(|s| parse_instant(s).ok_or_else(|| malformed(&remote_id, "bad updated")))?;

        // Cancelled events may come back as stubs with nothing but id,
        // status and updated.
        let span = match decode_span(&event) {
            Ok(span) => Some(span),
            Err(_) if status == RemoteStatus::Cancelled => None,
            Err(reason) => return Err(malformed(&remote_id, reason)),
        };

        let summary = match event.summary {
            Some(summary) => strip_legacy_prefix(summary),
            None if status == RemoteStatus::Cancelled => String::new(),
            None => return Err(malformed(&remote_id, "missing summary")),
        };

        let (description, marker_uid) = split_uid_marker(event.description.as_deref().unwrap_or(""));

        let private = event.extended_properties.and_then(|p| p.private);
        let extension_uid = private
            .as_ref()
            .and_then(|p| p.uid.clone())
            .filter(|uid| !uid.is_empty());
        let color = private.and_then(|p| p.color).filter(|c| !c.is_empty());

        let (uid, uid_source) = match (extension_uid, marker_uid) {
            (Some(uid), _) => (uid, UidSource::Extension),
            (None, Some(uid)) => (uid, UidSource::Description),
            (None, None) => (synthesized_uid(), UidSource::Synthesized),
        };

        Ok(RemoteEvent {
            remote_id,
            status,
            updated,
            uid,
            uid_source,
            summary,
            description,
            color,
            span,
        })
    }
}

fn malformed(id: &str, reason: &str) -> EvSyncError {
    EvSyncError::MalformedRemote {
        id: id.to_string(),
        reason: reason.to_string(),
    }
}

fn decode_span(event: &GoogleEvent) -> Result<EventSpan, &'static str> {
    let start = event.start.as_ref().ok_or("missing start")?;
    let end = event.end.as_ref().ok_or("missing end")?;

    match (parse_time(start)?, parse_time(end)?) {
        (Time::Date(first), Time::Date(end)) => {
            // Google's end date is exclusive
            let last = end.checked_sub_days(Days::new(1)).unwrap_or(end).max(first);
            Ok(EventSpan::AllDay { first, last })
        }
        (Time::Instant(start), Time::Instant(end)) => Ok(EventSpan::Timed { start, end }),
        _ => Err("start and end disagree on all-day"),
    }
}

enum Time {
    Date(NaiveDate),
    Instant(DateTime<Utc>),
}

fn parse_time(time: &EventDateTime) -> Result<Time, &'static str> {
    if let Some(date_time) = &time.date_time {
        return parse_instant(date_time)
            .map(Time::Instant)
            .ok_or("bad dateTime");
    }
    if let Some(date) = &time.date {
        return NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map(Time::Date)
            .map_err(|_| "bad date");
    }
    Err("neither date nor dateTime")
}

fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn strip_legacy_prefix(summary: String) -> String {
    match summary.strip_prefix(LEGACY_SUMMARY_PREFIX) {
        Some(rest) => rest.to_string(),
        None => summary,
    }
}

/// Split the user's text from the trailing `UID:` marker.
fn split_uid_marker(description: &str) -> (String, Option<String>) {
    let (text, marker) = if let Some(pos) = description.find(UID_MARKER) {
        (&description[..pos], &description[pos + UID_MARKER.len()..])
    } else if let Some(rest) = description.strip_prefix(UID_MARKER.trim_start()) {
        ("", rest)
    } else {
        return (description.to_string(), None);
    };

    let uid = marker
        .split_whitespace()
        .next()
        .filter(|uid| !uid.is_empty())
        .map(String::from);

    (text.to_string(), uid)
}
