//! The local event store.
//!
//! `LocalStore` is the only writer of local persisted state. `JsonStore`
//! keeps everything in memory and writes one JSON document on `persist`:
//!
//! ```json
//! { "events": [ ... ], "tombstones": [ { "uid": "...", "remoteId": "..." } ] }
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{EvSyncError, EvSyncResult};
use crate::event::{LocalEvent, Tombstone, now_millis};

pub trait LocalStore {
    /// Snapshot of all events in store order.
    fn list(&self) -> Vec<LocalEvent>;

    fn get(&self, id: &str) -> Option<LocalEvent>;

    /// Insert or replace by `id`. Fails if another event already holds the
    /// same `uid` or `remote_id`.
    fn upsert(&mut self, event: LocalEvent) -> EvSyncResult<()>;

    /// Delete an event on behalf of the user, queueing its remote deletion.
    fn remove(&mut self, id: &str) -> EvSyncResult<Tombstone>;

    /// Delete an event without a tombstone; the remote side already
    /// reflects the deletion.
    fn discard(&mut self, id: &str) -> EvSyncResult<LocalEvent>;

    fn tombstones(&self) -> Vec<Tombstone>;

    fn add_tombstone(&mut self, tombstone: Tombstone);

    /// Replace the pending tombstone list with `remaining`.
    fn clear_tombstones(&mut self, remaining: Vec<Tombstone>);

    fn persist(&mut self) -> EvSyncResult<()>;
}

/// A `LocalStore` backed by a single JSON file.
#[derive(Debug, Default)]
pub struct JsonStore {
    path: Option<PathBuf>,
    events: Vec<LocalEvent>,
    tombstones: Vec<Tombstone>,
}

#[derive(Serialize)]
struct DocumentRef<'a> {
    events: &'a [LocalEvent],
    tombstones: &'a [Tombstone],
}

#[derive(Deserialize, Default)]
struct StoredDocument {
    #[serde(default)]
    events: Vec<StoredEvent>,
    #[serde(default, alias = "deletedEvents")]
    tombstones: Vec<Tombstone>,
}

/// An event as it may appear on disk, including records written before
/// `uid`, `isAllDay` and `lastModified` existed.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredEvent {
    id: String,
    #[serde(default)]
    uid: Option<String>,
    #[serde(default, alias = "googleId")]
    remote_id: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    is_all_day: Option<bool>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    #[serde(default)]
    last_modified: Option<i64>,
    #[serde(default)]
    reminder: Option<serde_json::Value>,
}

impl StoredEvent {
    fn migrate(self, tz: Tz, now: i64) -> LocalEvent {
        let is_all_day = self
            .is_all_day
            .unwrap_or_else(|| looks_all_day(self.start, tz));

        LocalEvent {
            uid: self
                .uid
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| legacy_uid(&self.id)),
            id: self.id,
            remote_id: self.remote_id.filter(|r| !r.is_empty()),
            title: self.title,
            description: self.description.unwrap_or_default(),
            color: self.color,
            is_all_day,
            start: self.start,
            end: self.end,
            last_modified: self.last_modified.filter(|t| *t > 0).unwrap_or(now),
            reminder: self.reminder,
        }
    }
}

fn legacy_uid(id: &str) -> String {
    format!("{}@evsync", id)
}

/// Old records have no all-day flag. Starts at 00:00, 09:00 or 12:00 local
/// time were written by date-only inputs.
fn looks_all_day(start: DateTime<Utc>, tz: Tz) -> bool {
    let local = start.with_timezone(&tz);
    local.minute() == 0 && matches!(local.hour(), 0 | 9 | 12)
}

impl JsonStore {
    /// A store that is never written to disk.
    pub fn in_memory() -> Self {
        JsonStore::default()
    }

    /// Load the store at `path`, migrating old records. A missing file is an
    /// empty store.
    pub fn open(path: impl Into<PathBuf>, tz: Tz) -> EvSyncResult<Self> {
        let path = path.into();

        let document: StoredDocument = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            StoredDocument::default()
        };

        let now = now_millis();
        let mut seen_uids = HashSet::new();
        let mut seen_remote_ids = HashSet::new();
        let mut events = Vec::with_capacity(document.events.len());

        for stored in document.events {
            let mut event = stored.migrate(tz, now);

            if !seen_uids.insert(event.uid.clone()) {
                warn!(id = %event.id, uid = %event.uid, "duplicate uid on load, assigning a new one");
                event.uid = legacy_uid(&event.id);
                seen_uids.insert(event.uid.clone());
            }

            let shared_remote_id = event
                .remote_id
                .as_ref()
                .is_some_and(|r| !seen_remote_ids.insert(r.clone()));
            if shared_remote_id {
                warn!(id = %event.id, remote_id = ?event.remote_id, "duplicate remote id on load, unlinking");
                event.remote_id = None;
            }

            events.push(event);
        }

        debug!(
            path = %path.display(),
            events = events.len(),
            tombstones = document.tombstones.len(),
            "loaded local store"
        );

        Ok(JsonStore {
            path: Some(path),
            events,
            tombstones: document.tombstones,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.events.iter().position(|e| e.id == id)
    }
}

impl LocalStore for JsonStore {
    fn list(&self) -> Vec<LocalEvent> {
        self.events.clone()
    }

    fn get(&self, id: &str) -> Option<LocalEvent> {
        self.events.iter().find(|e| e.id == id).cloned()
    }

    fn upsert(&mut self, event: LocalEvent) -> EvSyncResult<()> {
        for other in self.events.iter().filter(|e| e.id != event.id) {
            if other.uid == event.uid {
                return Err(EvSyncError::DuplicateUid(event.uid));
            }
            if event.remote_id.is_some() && other.remote_id == event.remote_id {
                return Err(EvSyncError::DuplicateRemoteId(
                    event.remote_id.unwrap_or_default(),
                ));
            }
        }

        match self.position(&event.id) {
            Some(i) => self.events[i] = event,
            None => self.events.push(event),
        }
        Ok(())
    }

    fn remove(&mut self, id: &str) -> EvSyncResult<Tombstone> {
        let i = self
            .position(id)
            .ok_or_else(|| EvSyncError::EventNotFound(id.to_string()))?;

        let tombstone = Tombstone::from(&self.events[i]);
        self.tombstones.push(tombstone.clone());
        self.events.remove(i);

        Ok(tombstone)
    }

    fn discard(&mut self, id: &str) -> EvSyncResult<LocalEvent> {
        let i = self
            .position(id)
            .ok_or_else(|| EvSyncError::EventNotFound(id.to_string()))?;

        Ok(self.events.remove(i))
    }

    fn tombstones(&self) -> Vec<Tombstone> {
        self.tombstones.clone()
    }

    fn add_tombstone(&mut self, tombstone: Tombstone) {
        self.tombstones.push(tombstone);
    }

    fn clear_tombstones(&mut self, remaining: Vec<Tombstone>) {
        self.tombstones = remaining;
    }

    fn persist(&mut self) -> EvSyncResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(&DocumentRef {
            events: &self.events,
            tombstones: &self.tombstones,
        })?;

        // Write-then-rename so readers never see a half-written document
        let mut temp = path.clone().into_os_string();
        temp.push(".tmp");
        let temp = PathBuf::from(temp);

        std::fs::write(&temp, content)?;
        std::fs::rename(&temp, path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventSpan;
    use chrono::TimeZone;

    fn timed(title: &str, hour: u32) -> LocalEvent {
        LocalEvent::new(
            title,
            &EventSpan::Timed {
                start: Utc.with_ymd_and_hms(2025, 9, 1, hour, 0, 0).unwrap(),
                end: Utc.with_ymd_and_hms(2025, 9, 1, hour + 1, 0, 0).unwrap(),
            },
            Tz::UTC,
        )
    }

    #[test]
    fn test_remove_queues_tombstone_with_remote_id() {
        let mut store = JsonStore::in_memory();
        let mut event = timed("Dentist", 9);
        event.remote_id = Some("g-1".to_string());
        store.upsert(event.clone()).unwrap();

        let tombstone = store.remove(&event.id).unwrap();

        assert_eq!(tombstone.uid, event.uid);
        assert_eq!(tombstone.remote_id.as_deref(), Some("g-1"));
        assert!(store.list().is_empty());
        assert_eq!(store.tombstones(), vec![tombstone]);
    }

    #[test]
    fn test_discard_leaves_no_tombstone() {
        let mut store = JsonStore::in_memory();
        let event = timed("Gym", 7);
        store.upsert(event.clone()).unwrap();

        store.discard(&event.id).unwrap();

        assert!(store.list().is_empty());
        assert!(store.tombstones().is_empty());
    }

    #[test]
    fn test_remove_unknown_id_fails() {
        let mut store = JsonStore::in_memory();
        assert!(matches!(
            store.remove("nope"),
            Err(EvSyncError::EventNotFound(_))
        ));
    }

    #[test]
    fn test_upsert_rejects_shared_remote_id() {
        let mut store = JsonStore::in_memory();
        let mut a = timed("A", 8);
        let mut b = timed("B", 10);
        a.remote_id = Some("g-1".to_string());
        b.remote_id = Some("g-1".to_string());

        store.upsert(a).unwrap();
        assert!(matches!(
            store.upsert(b),
            Err(EvSyncError::DuplicateRemoteId(id)) if id == "g-1"
        ));
    }

    #[test]
    fn test_upsert_rejects_shared_uid() {
        let mut store = JsonStore::in_memory();
        let a = timed("A", 8);
        let mut b = timed("B", 10);
        b.uid = a.uid.clone();

        store.upsert(a).unwrap();
        assert!(matches!(store.upsert(b), Err(EvSyncError::DuplicateUid(_))));
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let mut store = JsonStore::in_memory();
        let first = timed("First", 8);
        let second = timed("Second", 10);
        store.upsert(first.clone()).unwrap();
        store.upsert(second.clone()).unwrap();

        let mut edited = first.clone();
        edited.title = "First (moved)".to_string();
        store.upsert(edited).unwrap();

        let titles: Vec<_> = store.list().into_iter().map(|e| e.title).collect();
        assert_eq!(titles, vec!["First (moved)", "Second"]);
    }

    #[test]
    fn test_persist_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("events.json");

        let mut store = JsonStore::open(&path, Tz::UTC).unwrap();
        let mut event = timed("Standup", 9);
        event.reminder = Some(serde_json::json!({ "minutes": 5 }));
        store.upsert(event.clone()).unwrap();
        store.add_tombstone(Tombstone {
            uid: "gone@evsync".to_string(),
            remote_id: Some("g-7".to_string()),
        });
        store.persist().unwrap();

        let reopened = JsonStore::open(&path, Tz::UTC).unwrap();
        assert_eq!(reopened.list(), vec![event]);
        assert_eq!(reopened.tombstones().len(), 1);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_open_migrates_legacy_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.json");
        std::fs::write(
            &path,
            r#"{
                "events": [
                    { "id": "1700000000000", "title": "Old all-day",
                      "start": "2024-01-05T09:00:00.000Z", "end": "2024-01-05T09:00:00.000Z",
                      "googleId": "g-old", "description": null },
                    { "id": "1700000000001", "title": "Old timed",
                      "start": "2024-01-05T14:30:00.000Z", "end": "2024-01-05T15:30:00.000Z",
                      "lastModified": 0 }
                ],
                "deletedEvents": [ { "uid": "x@evsync", "googleId": "g-x" } ]
            }"#,
        )
        .unwrap();

        let store = JsonStore::open(&path, Tz::UTC).unwrap();
        let events = store.list();

        assert_eq!(events[0].uid, "1700000000000@evsync");
        assert!(events[0].is_all_day);
        assert_eq!(events[0].remote_id.as_deref(), Some("g-old"));
        assert_eq!(events[0].description, "");
        assert!(!events[1].is_all_day);
        assert!(events[1].last_modified > 0);
        assert_eq!(store.tombstones()[0].remote_id.as_deref(), Some("g-x"));
    }

    #[test]
    fn test_open_unlinks_duplicate_remote_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.json");
        std::fs::write(
            &path,
            r#"{ "events": [
                { "id": "a", "uid": "same", "remoteId": "g-1", "title": "A", "isAllDay": false,
                  "start": "2024-01-05T14:30:00Z", "end": "2024-01-05T15:30:00Z", "lastModified": 1 },
                { "id": "b", "uid": "same", "remoteId": "g-1", "title": "B", "isAllDay": false,
                  "start": "2024-01-05T14:30:00Z", "end": "2024-01-05T15:30:00Z", "lastModified": 1 }
            ] }"#,
        )
        .unwrap();

        let events = JsonStore::open(&path, Tz::UTC).unwrap().list();

        assert_eq!(events[0].remote_id.as_deref(), Some("g-1"));
        assert_eq!(events[1].remote_id, None);
        assert_eq!(events[1].uid, "b@evsync");
    }

    #[test]
    fn test_missing_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::open(dir.path().join("none.json"), Tz::UTC).unwrap();
        assert!(store.list().is_empty());
        assert!(store.tombstones().is_empty());
    }
}
