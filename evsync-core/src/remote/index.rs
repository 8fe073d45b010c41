//! Matching local events to remote events.

use std::collections::HashMap;

use crate::event::LocalEvent;
use crate::remote::{RemoteEvent, UidSource};

/// Remote events of one sync window, indexed by remote id and by uid.
///
/// Every successful `resolve` claims the match: it is removed from both
/// maps, so whatever is left afterwards has no local counterpart.
#[derive(Debug, Default)]
pub struct RemoteIndex {
    by_id: HashMap<String, RemoteEvent>,
    by_uid: HashMap<String, String>,
    // Insertion order, so the residual import is deterministic
    order: Vec<String>,
}

impl RemoteIndex {
    pub fn new(events: Vec<RemoteEvent>) -> Self {
        let mut index = RemoteIndex::default();

        for event in events {
            // Synthesized uids are fresh on every decode and can never match
            if event.uid_source != UidSource::Synthesized {
                let replaces = match index.by_uid.get(&event.uid) {
                    Some(current) => index
                        .by_id
                        .get(current)
                        .is_none_or(|current| outranks(&event, current)),
                    None => true,
                };
                if replaces {
                    index
                        .by_uid
                        .insert(event.uid.clone(), event.remote_id.clone());
                }
            }
            index.order.push(event.remote_id.clone());
            index.by_id.insert(event.remote_id.clone(), event);
        }

        index
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Find and claim the remote counterpart of `local`.
    ///
    /// The stored `remote_id` is tried first; the uid is the fallback when
    /// the id is missing or no longer listed. A cancelled copy found by id
    /// gives way to an active copy carrying the same uid.
    pub fn resolve(&mut self, local: &LocalEvent) -> Option<RemoteEvent> {
        let by_uid = self.by_uid.get(&local.uid).cloned();
        let by_remote_id = local
            .remote_id
            .as_ref()
            .and_then(|id| self.by_id.get(id.as_str()))
            .filter(|event| {
                !event.is_cancelled() || !by_uid.as_ref().is_some_and(|id| self.is_active(id))
            })
            .map(|event| event.remote_id.clone());

        let remote_id = by_remote_id.or(by_uid)?;

        self.claim(&remote_id)
    }

    fn claim(&mut self, remote_id: &str) -> Option<RemoteEvent> {
        let event = self.by_id.remove(remote_id)?;

        if self.by_uid.get(&event.uid).is_some_and(|id| id == remote_id) {
            self.by_uid.remove(&event.uid);
        }

        Some(event)
    }

    fn is_active(&self, remote_id: &str) -> bool {
        self.by_id.get(remote_id).is_some_and(|e| !e.is_cancelled())
    }

    /// The remote events nobody claimed, in listing order.
    pub fn into_unclaimed(mut self) -> Vec<RemoteEvent> {
        self.order
            .iter()
            .filter_map(|id| self.by_id.remove(id))
            .collect()
    }
}

/// Which of two listed copies sharing a uid stands for it: an active copy
/// over a cancelled one, then the most recently updated.
fn outranks(candidate: &RemoteEvent, current: &RemoteEvent) -> bool {
    (!candidate.is_cancelled(), candidate.updated) > (!current.is_cancelled(), current.updated)
}
