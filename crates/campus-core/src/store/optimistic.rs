// ── Optimistic writes ──
//
// Speculative edits applied to cached data ahead of a server response,
// with a snapshot of exactly what they replaced.

use std::sync::Arc;

use campus_api::ResourceKind;

use super::cache_store::CacheStore;
use super::entry::{CacheEntry, Payload};
use crate::key::{CacheKey, Query, QueryOptions};

/// Entries as they were before an optimistic write.
#[derive(Debug, Clone, Default)]
pub struct OptimisticSnapshot {
    entries: Vec<Arc<CacheEntry>>,
}

impl OptimisticSnapshot {
    pub fn entries(&self) -> &[Arc<CacheEntry>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outcome of rolling back an optimistic write.
#[derive(Debug, Default)]
pub struct Restoration {
    pub restored: Vec<CacheKey>,
    /// Subscribed entries left needing a fetch: still invalidated, or a
    /// fetch for them was superseded by the optimistic write or the rollback.
    pub refetch: Vec<(Query, QueryOptions)>,
}

impl CacheStore {
    /// Apply `update` to every cached entry of `resource` that holds data.
    ///
    /// `update` returns the replacement payload, or `None` to leave the
    /// entry alone. Touched entries supersede any fetch in flight for them.
    pub fn apply_optimistic(
        &self,
        resource: ResourceKind,
        mut update: impl FnMut(&Query, &Payload) -> Option<Payload>,
    ) -> OptimisticSnapshot {
        let mut snapshot = OptimisticSnapshot::default();
        for mut slot in self.slots.iter_mut() {
            if slot.key().resource != resource {
                continue;
            }
            let prior = slot.entry.borrow().clone();
            let Some(data) = prior.data.as_deref() else {
                continue;
            };
            let Some(next) = update(&slot.query, data) else {
                continue;
            };
            let seq = slot.next_seq();
            slot.update(|entry| {
                entry.data = Some(Arc::new(next));
                entry.is_fetching = false;
                entry.seq = seq;
            });
            snapshot.entries.push(prior);
        }
        snapshot
    }

    /// Put back every entry captured in `snapshot`; evicted ones are
    /// skipped. Restoring supersedes any fetch in flight for the key.
    pub fn restore(&self, snapshot: &OptimisticSnapshot) -> Restoration {
        let mut outcome = Restoration::default();
        for prior in &snapshot.entries {
            let Some(mut slot) = self.slots.get_mut(&prior.key) else {
                continue;
            };
            let superseded = prior.is_fetching || slot.entry.borrow().is_fetching;
            slot.next_seq();
            let subscribers = slot.subscribers;
            slot.update(|entry| {
                *entry = CacheEntry {
                    subscriber_count: subscribers,
                    is_fetching: false,
                    ..(**prior).clone()
                };
            });
            outcome.restored.push(prior.key.clone());
            if subscribers > 0 && (superseded || prior.is_invalidated) {
                outcome.refetch.push((slot.query.clone(), slot.options));
            }
        }
        outcome
    }
}
