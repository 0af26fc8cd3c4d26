// ── Query coordination ──
//
// Reads through the cache: freshness checks, one shared fetch per key,
// sequence-tagged completion, retries, and stale-while-revalidate.

mod handle;

use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::client::{ClientInner, QueryClient};
use crate::error::CoreError;
use crate::key::{CacheKey, Query, QueryOptions, QueryTarget};
use crate::source::ResourceSource;
use crate::store::{CacheEntry, CacheStore, Invalidation, Payload, QueryStatus};

pub use handle::{QueryHandle, QueryState, QueryStream};

type SharedFetch = Shared<BoxFuture<'static, FetchOutcome>>;

/// How a fetch ended, as seen by every caller attached to it.
#[derive(Debug, Clone)]
pub(crate) enum FetchOutcome {
    /// Result written to the cache (success or error).
    Applied(Arc<CacheEntry>),
    /// A newer write for the key superseded this fetch.
    Superseded,
}

/// A fetch in progress for one key.
pub(crate) struct InFlight {
    seq: u64,
    future: SharedFetch,
}

/// A caller's claim on a shared fetch. Dropping it leaves the fetch running.
pub(crate) struct FetchTicket(SharedFetch);

impl FetchTicket {
    pub(crate) async fn outcome(self) -> FetchOutcome {
        self.0.await
    }
}

impl QueryClient {
    // ── Reads ────────────────────────────────────────────────────────

    /// Subscribe to `query`, fetching if the cached entry is missing or stale.
    ///
    /// Must be called within a tokio runtime: fetches run as spawned tasks
    /// so they complete even if every handle is dropped.
    pub fn watch(&self, query: Query, options: QueryOptions) -> QueryHandle {
        let subscription = self.inner.store.subscribe(&query);
        self.inner.store.remember_options(subscription.key(), options);
        if !subscription.current().is_fresh(Instant::now()) {
            self.ensure_fetch(&query, options);
        }
        QueryHandle::new(self.clone(), query, options, subscription)
    }

    /// One-shot read.
    ///
    /// Fresh data is returned without a call. Stale data is returned at
    /// once while a background refetch runs. Otherwise waits for the
    /// (possibly shared) fetch.
    pub async fn fetch(
        &self,
        query: &Query,
        options: QueryOptions,
    ) -> Result<Arc<Payload>, CoreError> {
        let key = query.cache_key();
        loop {
            if let Some(entry) = self.inner.store.get(&key) {
                if let Some(data) = entry.data.clone() {
                    if !entry.is_fresh(Instant::now()) {
                        debug!(%key, "serving stale data, revalidating");
                        self.ensure_fetch(query, options);
                    }
                    return Ok(data);
                }
            }

            match self.ensure_fetch(query, options).outcome().await {
                FetchOutcome::Applied(entry) => return settle(&entry),
                FetchOutcome::Superseded => {
                    debug!(%key, "fetch superseded, following newer state");
                }
            }
        }
    }

    /// Force a fetch for `query` regardless of freshness, joining one
    /// already in flight.
    pub async fn refetch(
        &self,
        query: &Query,
        options: QueryOptions,
    ) -> Result<Arc<Payload>, CoreError> {
        loop {
            match self.ensure_fetch(query, options).outcome().await {
                FetchOutcome::Applied(entry) => return settle(&entry),
                FetchOutcome::Superseded => {
                    if let Some(entry) = self.inner.store.get(&query.cache_key()) {
                        if !entry.is_fetching && entry.data.is_some() {
                            return settle(&entry);
                        }
                    }
                }
            }
        }
    }

    /// Warm the cache for `query` without subscribing. Failures are logged.
    pub async fn prefetch(&self, query: &Query, options: QueryOptions) {
        if let Err(e) = self.fetch(query, options).await {
            warn!(key = %query.cache_key(), error = %e, "prefetch failed");
        }
    }

    /// Seed the entry for `query` directly, fresh for the default stale time.
    /// Supersedes any fetch in flight for the key.
    pub fn set_query_data(&self, query: &Query, data: Payload) {
        self.inner
            .store
            .set_data(query, data, self.inner.config.stale_time);
    }

    /// Cached data for `query`, fresh or not.
    pub fn get_query_data(&self, query: &Query) -> Option<Arc<Payload>> {
        self.inner.store.get(&query.cache_key())?.data.clone()
    }

    // ── Invalidation ─────────────────────────────────────────────────

    /// Mark every cached read of `kind` stale; subscribed ones refetch.
    pub fn invalidate_resource(&self, kind: campus_api::ResourceKind) -> Invalidation {
        self.invalidate_where(|key| key.resource == kind)
    }

    pub fn invalidate_key(&self, target: &CacheKey) -> Invalidation {
        self.invalidate_where(|key| key == target)
    }

    pub(crate) fn invalidate_where(&self, predicate: impl Fn(&CacheKey) -> bool) -> Invalidation {
        let invalidation = self.inner.store.invalidate(predicate);
        for (query, options) in &invalidation.refetch {
            self.ensure_fetch(query, *options);
        }
        invalidation
    }

    // ── Fetching ─────────────────────────────────────────────────────

    /// The fetch for `query`'s key: the in-flight one if it is still the
    /// newest, else a newly started one.
    pub(crate) fn ensure_fetch(&self, query: &Query, options: QueryOptions) -> FetchTicket {
        let key = query.cache_key();
        match self.inner.in_flight.entry(key) {
            Entry::Occupied(mut slot) => {
                let current = self.inner.store.latest_seq(slot.key());
                if current == Some(slot.get().seq) {
                    debug!(key = %slot.key(), seq = slot.get().seq, "joining in-flight fetch");
                    return FetchTicket(slot.get().future.clone());
                }
                let started = self.start_fetch(query, options);
                let future = started.future.clone();
                slot.insert(started);
                FetchTicket(future)
            }
            Entry::Vacant(slot) => {
                let started = self.start_fetch(query, options);
                let future = started.future.clone();
                slot.insert(started);
                FetchTicket(future)
            }
        }
    }

    fn start_fetch(&self, query: &Query, options: QueryOptions) -> InFlight {
        let config = &self.inner.config;
        let seq = self.inner.store.begin_fetch(query, options);
        let task = FetchTask {
            store: Arc::clone(&self.inner.store),
            source: self.source(query.resource),
            client: Arc::downgrade(&self.inner),
            query: query.clone(),
            seq,
            retry: options.retry.unwrap_or(config.retry),
            retry_delay: config.retry_delay,
            timeout: config.request_timeout,
            stale_time: options.stale_time.unwrap_or(config.stale_time),
        };
        debug!(key = %query.cache_key(), seq, "fetch started");

        let future = task.run().boxed().shared();
        // Detached driver: the fetch completes even if every caller goes away.
        tokio::spawn(future.clone());
        InFlight { seq, future }
    }
}

/// Turn an applied entry into the caller-facing result.
fn settle(entry: &CacheEntry) -> Result<Arc<Payload>, CoreError> {
    match (entry.status, &entry.error, &entry.data) {
        (QueryStatus::Error, Some(err), _) => Err(err.clone()),
        (_, _, Some(data)) => Ok(Arc::clone(data)),
        _ => Err(CoreError::Internal(format!(
            "fetch for {} finished without data",
            entry.key
        ))),
    }
}

// ── Fetch task ───────────────────────────────────────────────────────

struct FetchTask {
    store: Arc<CacheStore>,
    source: Result<Arc<dyn ResourceSource>, CoreError>,
    client: Weak<ClientInner>,
    query: Query,
    seq: u64,
    retry: u32,
    retry_delay: Duration,
    timeout: Duration,
    stale_time: Duration,
}

impl FetchTask {
    async fn run(self) -> FetchOutcome {
        let key = self.query.cache_key();
        let result = match &self.source {
            Ok(source) => self.load_with_retry(source.as_ref(), &key).await,
            Err(e) => Err(e.clone()),
        };
        let failed = result.is_err();

        let outcome = match self
            .store
            .complete_fetch(&key, self.seq, result, self.stale_time)
        {
            Ok(entry) => {
                if failed {
                    warn!(%key, seq = self.seq, error = ?entry.error, "fetch failed");
                } else {
                    debug!(%key, seq = self.seq, "fetch complete");
                }
                FetchOutcome::Applied(entry)
            }
            Err(e) => {
                debug!(error = %e, "dropping superseded fetch result");
                FetchOutcome::Superseded
            }
        };

        if let Some(inner) = self.client.upgrade() {
            inner.in_flight.remove_if(&key, |_, f| f.seq == self.seq);
        }
        outcome
    }

    async fn load_with_retry(
        &self,
        source: &dyn ResourceSource,
        key: &CacheKey,
    ) -> Result<Payload, CoreError> {
        let mut attempt = 0;
        loop {
            match self.load(source).await {
                Ok(data) => return Ok(data),
                Err(e) if attempt < self.retry && e.is_retryable() => {
                    attempt += 1;
                    debug!(%key, attempt, error = %e, "fetch failed, retrying");
                    tokio::time::sleep(self.retry_delay).await;
                    if self.store.latest_seq(key) != Some(self.seq) {
                        return Err(e);
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn load(&self, source: &dyn ResourceSource) -> Result<Payload, CoreError> {
        let call = async {
            match &self.query.target {
                QueryTarget::List(filters) => source.list(filters).await.map(Payload::List),
                QueryTarget::Item(id) => source.get(id).await.map(Payload::Item),
            }
        };
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| CoreError::timeout(self.timeout))?
    }
}
