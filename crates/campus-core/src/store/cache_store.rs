// ── Shared cache store ──
//
// One slot per cache key. Each slot owns a `watch` channel whose value is
// the current `CacheEntry`, plus the bookkeeping readers never see: the
// newest fetch sequence number issued, the query needed to refetch, and
// the subscriber count.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::one::RefMut;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::debug;

use super::entry::{CacheEntry, Payload, QueryStatus};
use super::subscription::{SubscriberGuard, Subscription};
use crate::error::CoreError;
use crate::key::{CacheKey, Query, QueryOptions};

pub(super) struct Slot {
    pub(super) query: Query,
    pub(super) options: QueryOptions,
    pub(super) entry: watch::Sender<Arc<CacheEntry>>,
    /// Newest sequence number issued for this key. Only a completion
    /// carrying this number may write.
    pub(super) latest_seq: u64,
    pub(super) subscribers: usize,
    pub(super) idle_since: Option<Instant>,
    /// Distinguishes this slot from earlier ones for the same key, so a
    /// subscription that outlived a removed slot cannot release this one.
    generation: u64,
}

impl Slot {
    fn new(query: &Query, key: CacheKey, generation: u64) -> Self {
        let (entry, _) = watch::channel(Arc::new(CacheEntry::idle(key)));
        Self {
            query: query.clone(),
            options: QueryOptions::default(),
            entry,
            latest_seq: 0,
            subscribers: 0,
            idle_since: Some(Instant::now()),
            generation,
        }
    }

    /// Mutate the entry and notify subscribers.
    pub(super) fn update(&self, f: impl FnOnce(&mut CacheEntry)) {
        // `send_modify` updates unconditionally, even with zero receivers.
        self.entry.send_modify(|entry| f(Arc::make_mut(entry)));
    }

    /// Mutate the entry without waking subscribers.
    fn update_silently(&self, f: impl FnOnce(&mut CacheEntry)) {
        self.entry.send_if_modified(|entry| {
            f(Arc::make_mut(entry));
            false
        });
    }

    /// Issue the next sequence number, superseding anything in flight.
    pub(super) fn next_seq(&mut self) -> u64 {
        self.latest_seq += 1;
        self.latest_seq
    }
}

/// Keys whose entries were marked stale by one `invalidate` call.
#[derive(Debug, Default)]
pub struct Invalidation {
    pub invalidated: Vec<CacheKey>,
    /// Subscribed entries that need an immediate refetch.
    pub refetch: Vec<(Query, QueryOptions)>,
}

/// Process-wide store of cached reads.
///
/// Lock-free for readers: entries are `Arc` snapshots published through
/// `watch` channels. Writers take fine-grained per-shard locks within
/// `DashMap` and never hold them across an await.
pub struct CacheStore {
    pub(super) slots: DashMap<CacheKey, Slot>,
    generations: AtomicU64,
    gc_time: Duration,
}

impl CacheStore {
    pub fn new(gc_time: Duration) -> Self {
        Self {
            slots: DashMap::new(),
            generations: AtomicU64::new(0),
            gc_time,
        }
    }

    fn slot_or_insert(&self, query: &Query) -> RefMut<'_, CacheKey, Slot> {
        let key = query.cache_key();
        self.slots
            .entry(key.clone())
            .or_insert_with(|| {
                let generation = self.generations.fetch_add(1, Ordering::Relaxed);
                Slot::new(query, key, generation)
            })
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn get(&self, key: &CacheKey) -> Option<Arc<CacheEntry>> {
        self.slots.get(key).map(|slot| slot.entry.borrow().clone())
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.slots.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn keys(&self) -> Vec<CacheKey> {
        self.slots.iter().map(|r| r.key().clone()).collect()
    }

    /// Snapshot of every entry, sorted by key.
    pub fn entries(&self) -> Vec<Arc<CacheEntry>> {
        let mut entries: Vec<_> = self
            .slots
            .iter()
            .map(|r| r.entry.borrow().clone())
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        entries
    }

    pub(crate) fn latest_seq(&self, key: &CacheKey) -> Option<u64> {
        self.slots.get(key).map(|slot| slot.latest_seq)
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Replace the entry for `query` wholesale.
    ///
    /// Counts as the newest write for the key: any fetch still in flight
    /// is superseded. The subscriber count is kept.
    pub fn set(&self, query: &Query, entry: CacheEntry) {
        let mut slot = self.slot_or_insert(query);
        let seq = slot.next_seq();
        let subscribers = slot.subscribers;
        let key = slot.key().clone();
        slot.update(|current| {
            *current = CacheEntry {
                key,
                subscriber_count: subscribers,
                is_fetching: false,
                seq,
                ..entry
            };
        });
    }

    /// Seed an entry with data, fresh for `stale_time`.
    pub fn set_data(&self, query: &Query, data: Payload, stale_time: Duration) {
        let entry = CacheEntry {
            data: Some(Arc::new(data)),
            status: QueryStatus::Success,
            fetched_at: Some(Utc::now()),
            stale_after: Some(Instant::now() + stale_time),
            ..CacheEntry::idle(query.cache_key())
        };
        self.set(query, entry);
    }

    /// Mark every entry whose key matches as stale and notify its
    /// subscribers. A fetch in flight for a matched key is superseded,
    /// so its pre-invalidation result can never be applied.
    pub fn invalidate(&self, predicate: impl Fn(&CacheKey) -> bool) -> Invalidation {
        let mut outcome = Invalidation::default();
        for mut slot in self.slots.iter_mut() {
            if !predicate(slot.key()) {
                continue;
            }
            let superseded = slot.entry.borrow().is_fetching;
            if superseded {
                slot.next_seq();
            }
            slot.update(|entry| {
                entry.is_invalidated = true;
                entry.is_fetching = false;
            });
            outcome.invalidated.push(slot.key().clone());
            if slot.subscribers > 0 {
                outcome.refetch.push((slot.query.clone(), slot.options));
            }
        }
        debug!(
            invalidated = outcome.invalidated.len(),
            refetch = outcome.refetch.len(),
            "cache entries invalidated"
        );
        outcome
    }

    pub fn remove(&self, key: &CacheKey) -> Option<Arc<CacheEntry>> {
        self.slots
            .remove(key)
            .map(|(_, slot)| slot.entry.borrow().clone())
    }

    /// Remove all entries. Live subscriptions see their channel close.
    pub fn clear(&self) {
        self.slots.clear();
    }

    // ── Fetch bookkeeping ────────────────────────────────────────────

    /// Options to reuse when an invalidation refetches this key.
    pub(crate) fn remember_options(&self, key: &CacheKey, options: QueryOptions) {
        if let Some(mut slot) = self.slots.get_mut(key) {
            slot.options = options;
        }
    }

    /// Record the start of a fetch and return its sequence number.
    pub(crate) fn begin_fetch(&self, query: &Query, options: QueryOptions) -> u64 {
        let mut slot = self.slot_or_insert(query);
        slot.options = options;
        let seq = slot.next_seq();
        slot.update(|entry| {
            entry.is_fetching = true;
            if entry.data.is_none() {
                entry.status = QueryStatus::Loading;
            }
        });
        seq
    }

    /// Apply a fetch result if `seq` is still the newest sequence number
    /// issued for `key`; otherwise leave the entry untouched and report
    /// the superseded fetch.
    pub(crate) fn complete_fetch(
        &self,
        key: &CacheKey,
        seq: u64,
        result: Result<Payload, CoreError>,
        stale_time: Duration,
    ) -> Result<Arc<CacheEntry>, CoreError> {
        let Some(slot) = self.slots.get(key) else {
            return Err(CoreError::CacheConsistency {
                key: key.to_string(),
                seq,
                latest: 0,
            });
        };
        if seq != slot.latest_seq {
            return Err(CoreError::CacheConsistency {
                key: key.to_string(),
                seq,
                latest: slot.latest_seq,
            });
        }

        slot.update(|entry| {
            entry.is_fetching = false;
            match result {
                Ok(data) => {
                    entry.data = Some(Arc::new(data));
                    entry.status = QueryStatus::Success;
                    entry.error = None;
                    entry.fetched_at = Some(Utc::now());
                    entry.stale_after = Some(Instant::now() + stale_time);
                    entry.is_invalidated = false;
                    entry.seq = seq;
                }
                Err(err) => {
                    entry.status = QueryStatus::Error;
                    entry.error = Some(err);
                }
            }
        });
        Ok(slot.entry.borrow().clone())
    }

    // ── Subscriptions ────────────────────────────────────────────────

    /// Subscribe to the entry for `query`, creating an idle entry if needed.
    /// Dropping the subscription unsubscribes.
    pub fn subscribe(self: &Arc<Self>, query: &Query) -> Subscription {
        let mut slot = self.slot_or_insert(query);
        slot.subscribers += 1;
        slot.idle_since = None;
        let count = slot.subscribers;
        slot.update_silently(|entry| entry.subscriber_count = count);
        let receiver = slot.entry.subscribe();
        let key = slot.key().clone();
        let generation = slot.generation;
        drop(slot);

        Subscription::new(
            receiver,
            SubscriberGuard::new(key, generation, Arc::downgrade(self)),
        )
    }

    /// Drop one subscriber from the slot `generation` names. A no-op once
    /// that slot has been removed, even if the key was cached again.
    pub(super) fn release(&self, key: &CacheKey, generation: u64) {
        let Some(mut slot) = self.slots.get_mut(key) else {
            return;
        };
        if slot.generation != generation {
            return;
        }
        slot.subscribers = slot.subscribers.saturating_sub(1);
        if slot.subscribers == 0 {
            slot.idle_since = Some(Instant::now());
        }
        let count = slot.subscribers;
        slot.update_silently(|entry| entry.subscriber_count = count);
    }

    // ── Garbage collection ───────────────────────────────────────────

    /// Evict entries that have had no subscribers for longer than the
    /// retention window and have no fetch in flight. Returns the number
    /// of evicted entries.
    pub fn collect_garbage(&self, now: Instant) -> usize {
        let gc_time = self.gc_time;
        let mut evicted = 0;
        self.slots.retain(|key, slot| {
            let idle_expired = slot
                .idle_since
                .is_some_and(|since| now.saturating_duration_since(since) >= gc_time);
            let keep = slot.subscribers > 0 || slot.entry.borrow().is_fetching || !idle_expired;
            if !keep {
                debug!(%key, "evicting idle cache entry");
                evicted += 1;
            }
            keep
        });
        evicted
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use campus_api::{Filters, Page, ResourceKind};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn store() -> Arc<CacheStore> {
        Arc::new(CacheStore::new(Duration::from_secs(300)))
    }

    fn students() -> Query {
        Query::list(ResourceKind::Students, Filters::new())
    }

    fn page(names: &[&str]) -> Payload {
        Payload::List(Page::new(
            names.iter().map(|n| json!({ "id": n, "firstName": n })).collect(),
        ))
    }

    const STALE: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn begin_fetch_moves_idle_to_loading() {
        let store = store();
        let seq = store.begin_fetch(&students(), QueryOptions::default());
        let entry = store.get(&students().cache_key()).unwrap();
        assert_eq!(seq, 1);
        assert_eq!(entry.status, QueryStatus::Loading);
        assert!(entry.is_fetching);
    }

    #[tokio::test]
    async fn complete_fetch_applies_newest_sequence() {
        let store = store();
        let key = students().cache_key();
        let seq = store.begin_fetch(&students(), QueryOptions::default());

        let entry = store
            .complete_fetch(&key, seq, Ok(page(&["Ann"])), STALE)
            .unwrap();

        assert_eq!(entry.status, QueryStatus::Success);
        assert_eq!(entry.data.as_deref(), Some(&page(&["Ann"])));
        assert!(entry.is_fresh(Instant::now()));
        assert!(!entry.is_fetching);
    }

    #[tokio::test]
    async fn older_completion_never_overwrites_newer() {
        let store = store();
        let key = students().cache_key();
        let s1 = store.begin_fetch(&students(), QueryOptions::default());
        let s2 = store.begin_fetch(&students(), QueryOptions::default());
        assert!(s1 < s2);

        store
            .complete_fetch(&key, s2, Ok(page(&["Ann", "Bo"])), STALE)
            .unwrap();
        let late = store.complete_fetch(&key, s1, Ok(page(&["Ann"])), STALE);

        assert!(matches!(
            late,
            Err(CoreError::CacheConsistency { seq: 1, latest: 2, .. })
        ));
        let entry = store.get(&key).unwrap();
        assert_eq!(entry.data.as_deref(), Some(&page(&["Ann", "Bo"])));
        assert_eq!(entry.seq, s2);
    }

    #[tokio::test]
    async fn older_completion_arriving_first_is_dropped_too() {
        let store = store();
        let key = students().cache_key();
        let s1 = store.begin_fetch(&students(), QueryOptions::default());
        let _s2 = store.begin_fetch(&students(), QueryOptions::default());

        assert!(store.complete_fetch(&key, s1, Ok(page(&["old"])), STALE).is_err());
        assert!(store.get(&key).unwrap().data.is_none());
    }

    #[tokio::test]
    async fn error_keeps_previous_data() {
        let store = store();
        let key = students().cache_key();
        store.set_data(&students(), page(&["Ann"]), STALE);

        let seq = store.begin_fetch(&students(), QueryOptions::default());
        let err = CoreError::Server {
            status: 503,
            message: "unavailable".into(),
        };
        let entry = store.complete_fetch(&key, seq, Err(err.clone()), STALE).unwrap();

        assert_eq!(entry.status, QueryStatus::Error);
        assert_eq!(entry.error, Some(err));
        assert_eq!(entry.data.as_deref(), Some(&page(&["Ann"])));
    }

    #[tokio::test]
    async fn one_entry_per_key() {
        let store = store();
        let a = Query::list(
            ResourceKind::Attendance,
            Filters::new().with("date", "2024-01-01").with("classId", 3),
        );
        let b = Query::list(
            ResourceKind::Attendance,
            Filters::new().with("classId", 3).with("date", "2024-01-01"),
        );
        store.begin_fetch(&a, QueryOptions::default());
        store.begin_fetch(&b, QueryOptions::default());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn invalidate_marks_matching_and_notifies() {
        let store = store();
        let fees = Query::list(ResourceKind::FeePayments, Filters::new());
        store.set_data(&students(), page(&["Ann"]), STALE);
        store.set_data(&fees, page(&["p1"]), STALE);

        let mut sub = store.subscribe(&students());
        let outcome = store.invalidate(|k| k.resource == ResourceKind::Students);

        assert_eq!(outcome.invalidated, vec![students().cache_key()]);
        assert_eq!(outcome.refetch.len(), 1);
        let changed = sub.changed().await.unwrap();
        assert!(changed.is_invalidated);
        assert!(!store.get(&fees.cache_key()).unwrap().is_invalidated);
    }

    #[tokio::test]
    async fn invalidate_supersedes_in_flight_fetch() {
        let store = store();
        let key = students().cache_key();
        let seq = store.begin_fetch(&students(), QueryOptions::default());

        store.invalidate(|k| k.resource == ResourceKind::Students);

        assert!(store.complete_fetch(&key, seq, Ok(page(&["stale"])), STALE).is_err());
        let entry = store.get(&key).unwrap();
        assert!(entry.is_invalidated);
        assert!(!entry.is_fetching);
    }

    #[tokio::test]
    async fn unsubscribed_entries_are_not_refetched() {
        let store = store();
        store.set_data(&students(), page(&["Ann"]), STALE);
        let outcome = store.invalidate(|_| true);
        assert_eq!(outcome.invalidated.len(), 1);
        assert!(outcome.refetch.is_empty());
    }

    #[tokio::test]
    async fn subscriber_count_tracks_drops() {
        let store = store();
        let key = students().cache_key();
        let a = store.subscribe(&students());
        let b = store.subscribe(&students());
        assert_eq!(store.get(&key).unwrap().subscriber_count, 2);

        drop(a);
        assert_eq!(store.get(&key).unwrap().subscriber_count, 1);
        drop(b);
        assert_eq!(store.get(&key).unwrap().subscriber_count, 0);
    }

    #[tokio::test]
    async fn subscription_outliving_its_slot_leaves_the_new_one_alone() {
        let store = store();
        let key = students().cache_key();
        let old = store.subscribe(&students());
        store.remove(&key);

        let live = store.subscribe(&students());
        drop(old);
        assert_eq!(store.get(&key).unwrap().subscriber_count, 1);

        store.clear();
        let fresh = store.subscribe(&students());
        drop(live);
        assert_eq!(store.get(&key).unwrap().subscriber_count, 1);
        drop(fresh);
        assert_eq!(store.get(&key).unwrap().subscriber_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn gc_keeps_entry_whose_stale_subscription_was_dropped() {
        let store = store();
        let key = students().cache_key();
        let old = store.subscribe(&students());
        store.remove(&key);
        let _live = store.subscribe(&students());
        drop(old);

        tokio::time::advance(Duration::from_secs(301)).await;
        assert_eq!(store.collect_garbage(Instant::now()), 0);
        assert!(store.contains(&key));
    }

    #[tokio::test(start_paused = true)]
    async fn gc_evicts_only_idle_entries_past_retention() {
        let store = store();
        let fees = Query::list(ResourceKind::FeePayments, Filters::new());
        store.set_data(&students(), page(&["Ann"]), STALE);
        store.set_data(&fees, page(&["p1"]), STALE);
        let _sub = store.subscribe(&fees);

        assert_eq!(store.collect_garbage(Instant::now()), 0);

        tokio::time::advance(Duration::from_secs(301)).await;
        assert_eq!(store.collect_garbage(Instant::now()), 1);
        assert!(!store.contains(&students().cache_key()));
        assert!(store.contains(&fees.cache_key()));
    }

    #[tokio::test(start_paused = true)]
    async fn retention_restarts_when_last_subscriber_leaves() {
        let store = store();
        let sub = store.subscribe(&students());
        tokio::time::advance(Duration::from_secs(600)).await;
        drop(sub);

        tokio::time::advance(Duration::from_secs(200)).await;
        assert_eq!(store.collect_garbage(Instant::now()), 0);
        tokio::time::advance(Duration::from_secs(100)).await;
        assert_eq!(store.collect_garbage(Instant::now()), 1);
    }

    #[tokio::test]
    async fn set_keeps_subscriber_count_and_supersedes_fetch() {
        let store = store();
        let key = students().cache_key();
        let _sub = store.subscribe(&students());
        let seq = store.begin_fetch(&students(), QueryOptions::default());

        store.set_data(&students(), page(&["seeded"]), STALE);

        let entry = store.get(&key).unwrap();
        assert_eq!(entry.subscriber_count, 1);
        assert!(store.complete_fetch(&key, seq, Ok(page(&["late"])), STALE).is_err());
        assert_eq!(store.get(&key).unwrap().data.as_deref(), Some(&page(&["seeded"])));
    }
}
