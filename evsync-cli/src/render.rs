//! Colored terminal rendering for evsync types.

use chrono_tz::Tz;
use evsync_core::event::{EventSpan, LocalEvent, Tombstone};
use evsync_core::sync::SyncReport;
use owo_colors::OwoColorize;

pub trait Render {
    fn render(&self) -> String;
}

/// Rendering that depends on the display time zone.
pub trait RenderIn {
    fn render_in(&self, tz: Tz) -> String;
}

impl RenderIn for LocalEvent {
    fn render_in(&self, tz: Tz) -> String {
        let marker = if self.remote_id.is_some() {
            "●".green().to_string()
        } else {
            "○".yellow().to_string()
        };

        format!(
            "{} {} {} {}",
            marker,
            self.title,
            format_span(&self.span(tz), tz).dimmed(),
            self.id.dimmed()
        )
    }
}

impl Render for Tombstone {
    fn render(&self) -> String {
        match &self.remote_id {
            Some(remote_id) => format!("{} {} {}", "-".red(), self.uid, remote_id.dimmed()),
            None => format!("{} {}", "-".red(), self.uid),
        }
    }
}

impl Render for SyncReport {
    fn render(&self) -> String {
        if self.is_empty() {
            return "Already in sync".dimmed().to_string();
        }

        let mut lines = Vec::new();

        let pulled = [
            (self.imported, "imported"),
            (self.pulled, "updated"),
            (self.deleted_local, "deleted"),
        ];
        let pushed = [
            (self.inserted, "created"),
            (self.updated_remote, "updated"),
            (self.tombstones_flushed, "deleted"),
        ];

        if let Some(line) = count_line(&pulled) {
            lines.push(format!("{} {}", "Pulled:".bold(), line));
        }
        if let Some(line) = count_line(&pushed) {
            lines.push(format!("{} {}", "Pushed:".bold(), line));
        }
        if self.failed > 0 {
            lines.push(format!("{} {}", self.failed, pluralize("failure", self.failed)).red().to_string());
        }
        if self.skipped > 0 {
            let line = format!("{} skipped (remote copy unreadable)", self.skipped);
            lines.push(line.yellow().to_string());
        }

        lines.join("\n")
    }
}

fn count_line(counts: &[(usize, &str)]) -> Option<String> {
    if counts.iter().all(|(n, _)| *n == 0) {
        return None;
    }

    Some(
        counts
            .iter()
            .map(|(n, label)| format!("{} {}", n, label))
            .collect::<Vec<_>>()
            .join(", "),
    )
}

fn pluralize(word: &str, count: usize) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{}s", word)
    }
}

/// Human-readable time range in the display zone.
pub fn format_span(span: &EventSpan, tz: Tz) -> String {
    match span {
        EventSpan::AllDay { first, last } if first == last => first.format("%Y-%m-%d").to_string(),
        EventSpan::AllDay { first, last } => {
            format!("{} – {}", first.format("%Y-%m-%d"), last.format("%Y-%m-%d"))
        }
        EventSpan::Timed { start, end } => {
            let start = start.with_timezone(&tz);
            let end = end.with_timezone(&tz);
            if start.date_naive() == end.date_naive() {
                format!("{} – {}", start.format("%Y-%m-%d %H:%M"), end.format("%H:%M"))
            } else {
                format!("{} – {}", start.format("%Y-%m-%d %H:%M"), end.format("%Y-%m-%d %H:%M"))
            }
        }
    }
}
