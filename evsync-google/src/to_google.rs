use chrono::Days;
use chrono_tz::Tz;
use evsync_core::event::{EventSpan, LocalEvent};

use crate::wire::{EventDateTime, ExtendedProperties, GoogleEvent, PrivateProperties};

/// Appended to every description we write, so the uid survives clients that
/// drop extended properties.
pub(crate) const UID_MARKER: &str = "\n\nUID:";

pub trait ToGoogle {
    fn to_google(&self, tz: Tz) -> GoogleEvent;
}

impl ToGoogle for LocalEvent {
    fn to_google(&self, tz: Tz) -> GoogleEvent {
        let (start, end) = span_to_google(&self.span(tz));

        GoogleEvent {
            summary: Some(self.title.clone()),
            description: Some(format!("{}{}{}", self.description, UID_MARKER, self.uid)),
            start: Some(start),
            end: Some(end),
            extended_properties: Some(ExtendedProperties {
                private: Some(PrivateProperties {
                    uid: Some(self.uid.clone()),
                    color: self.color.clone(),
                }),
            }),
            ..Default::default()
        }
    }
}

/// All-day ranges go out with Google's exclusive end date: one calendar day
/// after the last local day.
fn span_to_google(span: &EventSpan) -> (EventDateTime, EventDateTime) {
    match span {
        EventSpan::AllDay { first, last } => {
            let end = last.checked_add_days(Days::new(1)).unwrap_or(*last);
            (date(first.format("%Y-%m-%d").to_string()), date(end.format("%Y-%m-%d").to_string()))
        }
        EventSpan::Timed { start, end } => (date_time(start.to_rfc3339()), date_time(end.to_rfc3339())),
    }
}

fn date(value: String) -> EventDateTime {
    EventDateTime {
        date: Some(value),
        ..Default::default()
    }
}

fn date_time(value: String) -> EventDateTime {
    EventDateTime {
        date_time: Some(value),
        ..Default::default()
    }
}
