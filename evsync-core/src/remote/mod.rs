//! The remote calendar service as seen by the sync engine.

mod index;

pub use index::RemoteIndex;

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EvSyncResult;
use crate::event::{EventSpan, LocalEvent};
use crate::window::SyncWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteStatus {
    Active,
    Cancelled,
}

/// Where a remote event's uid came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UidSource {
    /// The structured extension property written by us.
    Extension,
    /// The `UID:` marker embedded in the description.
    Description,
    /// Neither was present; the uid was generated while decoding.
    Synthesized,
}

/// A remote event, decoded once at the gateway boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteEvent {
    pub remote_id: String,
    pub status: RemoteStatus,
    pub updated: DateTime<Utc>,
    pub uid: String,
    pub uid_source: UidSource,
    pub summary: String,
    pub description: String,
    pub color: Option<String>,
    /// `None` only for cancelled events, which the service may return as
    /// bare stubs.
    pub span: Option<EventSpan>,
}

impl RemoteEvent {
    pub fn is_cancelled(&self) -> bool {
        self.status == RemoteStatus::Cancelled
    }
}

/// A fresh uid for a remote event that carries none of its own.
pub fn synthesized_uid() -> String {
    format!("{}@google", Uuid::new_v4())
}

/// Result of listing a sync window.
#[derive(Debug, Clone, Default)]
pub struct RemoteBatch {
    pub events: Vec<RemoteEvent>,
    /// Remote ids of records that were returned but could not be decoded.
    pub malformed: HashSet<String>,
}

/// What the service reports back after a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAck {
    pub remote_id: String,
    pub updated: DateTime<Utc>,
}

/// The minimal contract the engine needs from a calendar service.
///
/// Implementations own the wire encoding: they receive `LocalEvent`s and
/// hand back decoded `RemoteEvent`s.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// All events overlapping `window`, cancelled ones included.
    async fn list(&self, window: &SyncWindow) -> EvSyncResult<RemoteBatch>;

    async fn insert(&self, event: &LocalEvent) -> EvSyncResult<RemoteAck>;

    async fn update(&self, remote_id: &str, event: &LocalEvent) -> EvSyncResult<RemoteAck>;

    /// Must succeed when the event is already gone.
    async fn delete(&self, remote_id: &str) -> EvSyncResult<()>;
}
