//! One synchronization pass between the local store and the remote calendar.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::{debug, info, warn};

use crate::conflict::{ConflictPolicy, Resolution};
use crate::error::{EvSyncError, EvSyncResult};
use crate::event::LocalEvent;
use crate::remote::{RemoteAck, RemoteBatch, RemoteEvent, RemoteGateway, RemoteIndex, synthesized_uid};
use crate::store::LocalStore;
use crate::sync::SyncReport;
use crate::sync_config::{DEFAULT_COLOR, SyncConfig};
use crate::window::SyncWindow;

/// Drives sync passes over a store and a gateway.
///
/// A pass borrows the orchestrator mutably, so two passes can never run
/// over the same store at once.
pub struct SyncOrchestrator<S, G> {
    store: S,
    gateway: G,
    policy: ConflictPolicy,
    tz: Tz,
    window_past_days: i64,
    window_future_days: i64,
    default_color: String,
}

impl<S: LocalStore, G: RemoteGateway> SyncOrchestrator<S, G> {
    pub fn new(store: S, gateway: G) -> Self {
        SyncOrchestrator {
            store,
            gateway,
            policy: ConflictPolicy::default(),
            tz: Tz::UTC,
            window_past_days: 30,
            window_future_days: 365,
            default_color: DEFAULT_COLOR.to_string(),
        }
    }

    pub fn from_config(store: S, gateway: G, config: &SyncConfig) -> EvSyncResult<Self> {
        Ok(SyncOrchestrator {
            policy: config.conflict_policy(),
            tz: config.time_zone()?,
            window_past_days: config.window_past_days,
            window_future_days: config.window_future_days,
            default_color: config.default_color.clone(),
            ..SyncOrchestrator::new(store, gateway)
        })
    }

    pub fn with_policy(mut self, policy: ConflictPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_time_zone(mut self, tz: Tz) -> Self {
        self.tz = tz;
        self
    }

    pub fn with_window_days(mut self, past: i64, future: i64) -> Self {
        self.window_past_days = past;
        self.window_future_days = future;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub async fn sync(&mut self) -> EvSyncResult<SyncReport> {
        self.sync_at(Utc::now()).await
    }

    /// Run one pass with the window centred on `now`.
    ///
    /// Per-event failures are counted in the report. A failed fetch or an
    /// authorization failure aborts the pass with an error; whatever was
    /// already applied stays applied.
    pub async fn sync_at(&mut self, now: DateTime<Utc>) -> EvSyncResult<SyncReport> {
        let mut report = SyncReport::default();

        self.flush_tombstones(&mut report).await?;

        let window = SyncWindow::around(now, self.window_past_days, self.window_future_days);
        let RemoteBatch { events, malformed } = self.gateway.list(&window).await?;
        debug!(
            events = events.len(),
            malformed = malformed.len(),
            from = %window.from,
            to = %window.to,
            "fetched remote window"
        );

        let tombstones = self.store.tombstones();
        let pending_uids: HashSet<String> = tombstones.iter().map(|t| t.uid.clone()).collect();
        let pending_remote_ids: HashSet<String> =
            tombstones.into_iter().filter_map(|t| t.remote_id).collect();

        let mut index = RemoteIndex::new(events);

        for local in self.store.list() {
            let (start, end) = local.occupied(self.tz);
            if !window.overlaps(start, end) {
                continue;
            }

            if let Some(remote_id) = local
                .remote_id
                .as_deref()
                .filter(|id| malformed.contains(*id))
            {
                warn!(id = %local.id, remote_id, "remote copy could not be decoded, skipping");
                report.skipped += 1;
                continue;
            }

            let id = local.id.clone();
            let result = match index.resolve(&local) {
                None if pending_uids.contains(&local.uid) => {
                    debug!(id = %local.id, uid = %local.uid, "deletion pending, not inserting");
                    Ok(())
                }
                None => self.insert(local, &mut report).await,
                Some(remote) if remote.is_cancelled() => {
                    self.merge_cancelled(local, remote, &mut report).await
                }
                Some(remote) => self.merge_active(local, remote, &mut report).await,
            };

            if let Err(error) = result {
                self.record_failure(error, &id, &mut report)?;
            }
        }

        self.import(index.into_unclaimed(), &pending_uids, &pending_remote_ids, &mut report);

        self.store.persist()?;
        info!(%report, "sync pass complete");

        Ok(report)
    }

    /// Retry pending remote deletions and persist whatever is left.
    async fn flush_tombstones(&mut self, report: &mut SyncReport) -> EvSyncResult<()> {
        let mut remaining = Vec::new();
        let mut fatal = None;

        for tombstone in self.store.tombstones() {
            if fatal.is_some() {
                remaining.push(tombstone);
                continue;
            }

            // Never linked, nothing to delete remotely
            let Some(remote_id) = tombstone.remote_id.clone() else {
                debug!(uid = %tombstone.uid, "dropping unlinked tombstone");
                continue;
            };

            match self.gateway.delete(&remote_id).await {
                Ok(()) | Err(EvSyncError::NotFound(_)) => {
                    debug!(uid = %tombstone.uid, remote_id = %remote_id, "deleted remotely");
                    report.tombstones_flushed += 1;
                }
                Err(error) if error.is_fatal() => {
                    remaining.push(tombstone);
                    fatal = Some(error);
                }
                Err(error) => {
                    warn!(uid = %tombstone.uid, remote_id = %remote_id, %error, "remote delete failed, will retry");
                    report.failed += 1;
                    remaining.push(tombstone);
                }
            }
        }

        self.store.clear_tombstones(remaining);
        self.store.persist()?;

        match fatal {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn insert(&mut self, mut local: LocalEvent, report: &mut SyncReport) -> EvSyncResult<()> {
        let ack = self.gateway.insert(&local).await?;
        debug!(id = %local.id, remote_id = %ack.remote_id, "inserted remotely");

        stamp(&mut local, ack);
        self.store.upsert(local)?;
        report.inserted += 1;
        Ok(())
    }

    async fn merge_cancelled(
        &mut self,
        mut local: LocalEvent,
        remote: RemoteEvent,
        report: &mut SyncReport,
    ) -> EvSyncResult<()> {
        match self
            .policy
            .decide(local.last_modified, remote.updated.timestamp_millis())
        {
            Resolution::Remote => {
                debug!(id = %local.id, remote_id = %remote.remote_id, "deleted remotely, discarding");
                self.store.discard(&local.id)?;
                report.deleted_local += 1;
                Ok(())
            }
            // Only a clearly newer deletion removes the local copy
            Resolution::Local | Resolution::Equal => {
                debug!(id = %local.id, remote_id = %remote.remote_id, "edited after remote deletion, re-creating");
                local.remote_id = None;
                self.store.upsert(local.clone())?;
                self.insert(local, report).await
            }
        }
    }

    async fn merge_active(
        &mut self,
        mut local: LocalEvent,
        remote: RemoteEvent,
        report: &mut SyncReport,
    ) -> EvSyncResult<()> {
        match self
            .policy
            .decide(local.last_modified, remote.updated.timestamp_millis())
        {
            Resolution::Local => {
                let ack = self.gateway.update(&remote.remote_id, &local).await?;
                debug!(id = %local.id, remote_id = %ack.remote_id, "updated remotely");
                stamp(&mut local, ack);
                self.store.upsert(local)?;
                report.updated_remote += 1;
            }
            Resolution::Remote => {
                debug!(id = %local.id, remote_id = %remote.remote_id, "pulling remote edit");
                local.pull_from(&remote, self.tz);
                self.store.upsert(local)?;
                report.pulled += 1;
            }
            Resolution::Equal => {
                // Matched by uid: remember the remote id for next time
                if local.remote_id.as_deref() != Some(remote.remote_id.as_str()) {
                    local.remote_id = Some(remote.remote_id);
                    self.store.upsert(local)?;
                }
            }
        }
        Ok(())
    }

    /// Create local records for remote events nothing matched.
    fn import(
        &mut self,
        unclaimed: Vec<RemoteEvent>,
        pending_uids: &HashSet<String>,
        pending_remote_ids: &HashSet<String>,
        report: &mut SyncReport,
    ) {
        let existing = self.store.list();
        let linked: HashSet<String> = existing.iter().filter_map(|e| e.remote_id.clone()).collect();
        let mut uids: HashSet<String> = existing.into_iter().map(|e| e.uid).collect();

        for remote in unclaimed {
            if remote.is_cancelled()
                || linked.contains(&remote.remote_id)
                || pending_remote_ids.contains(&remote.remote_id)
                || pending_uids.contains(&remote.uid)
            {
                continue;
            }

            let Some(mut event) = LocalEvent::import(&remote, self.tz, &self.default_color) else {
                continue;
            };

            if uids.contains(&event.uid) {
                warn!(remote_id = %remote.remote_id, uid = %event.uid, "uid already used locally, assigning a new one");
                event.uid = synthesized_uid();
            }
            uids.insert(event.uid.clone());

            match self.store.upsert(event) {
                Ok(()) => {
                    debug!(remote_id = %remote.remote_id, "imported");
                    report.imported += 1;
                }
                Err(error) => {
                    warn!(remote_id = %remote.remote_id, %error, "import failed");
                    report.failed += 1;
                }
            }
        }
    }

    /// Count a per-event failure, or persist and abort if it is fatal.
    fn record_failure(
        &mut self,
        error: EvSyncError,
        id: &str,
        report: &mut SyncReport,
    ) -> EvSyncResult<()> {
        if error.is_fatal() {
            self.store.persist()?;
            return Err(error);
        }

        warn!(id, %error, "failed to sync event");
        report.failed += 1;
        Ok(())
    }
}

/// Link `local` to the record the service just wrote and adopt its
/// timestamp, so re-fetching that record compares as equal.
fn stamp(local: &mut LocalEvent, ack: RemoteAck) {
    local.last_modified = ack.updated.timestamp_millis();
    local.remote_id = Some(ack.remote_id);
}
