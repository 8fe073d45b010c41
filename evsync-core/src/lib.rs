//! Core of evsync: an offline-first event store kept in sync with a remote
//! calendar.
//!
//! - `store` owns local events and pending deletions (tombstones)
//! - `remote` is the contract a calendar service implements
//! - `sync` runs a reconciliation pass between the two

pub mod conflict;
pub mod error;
pub mod event;
pub mod remote;
pub mod store;
pub mod sync;
pub mod sync_config;
pub mod window;

pub use conflict::{ConflictPolicy, Resolution};
pub use error::{EvSyncError, EvSyncResult};
pub use event::{EventSpan, LocalEvent, Tombstone};
pub use remote::{RemoteAck, RemoteBatch, RemoteEvent, RemoteGateway, RemoteStatus, UidSource};
pub use store::{JsonStore, LocalStore};
pub use sync::{SyncOrchestrator, SyncReport};
pub use sync_config::SyncConfig;
pub use window::SyncWindow;
