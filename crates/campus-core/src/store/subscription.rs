// ── Entry subscriptions ──

use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use super::cache_store::CacheStore;
use super::entry::CacheEntry;
use crate::key::CacheKey;

/// Counts one subscriber against a cache entry for as long as it lives.
pub(crate) struct SubscriberGuard {
    key: CacheKey,
    generation: u64,
    store: Weak<CacheStore>,
}

impl SubscriberGuard {
    pub(super) fn new(key: CacheKey, generation: u64, store: Weak<CacheStore>) -> Self {
        Self {
            key,
            generation,
            store,
        }
    }
}

impl Drop for SubscriberGuard {
    fn drop(&mut self) {
        if let Some(store) = self.store.upgrade() {
            store.release(&self.key, self.generation);
        }
    }
}

/// A live view of one cache entry.
///
/// Dropping it unsubscribes; once an entry has no subscribers its
/// retention window starts.
pub struct Subscription {
    receiver: watch::Receiver<Arc<CacheEntry>>,
    guard: SubscriberGuard,
}

impl Subscription {
    pub(super) fn new(receiver: watch::Receiver<Arc<CacheEntry>>, guard: SubscriberGuard) -> Self {
        Self { receiver, guard }
    }

    pub fn key(&self) -> &CacheKey {
        &self.guard.key
    }

    /// The entry as it is now.
    pub fn current(&self) -> Arc<CacheEntry> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change. Returns `None` once the entry is removed
    /// from the store.
    pub async fn changed(&mut self) -> Option<Arc<CacheEntry>> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// Convert into a `Stream` that yields the current entry, then every change.
    pub fn into_stream(self) -> EntryStream {
        EntryStream {
            inner: WatchStream::new(self.receiver),
            _guard: self.guard,
        }
    }
}

/// `Stream` adapter over a cache entry; keeps its subscription alive.
pub struct EntryStream {
    inner: WatchStream<Arc<CacheEntry>>,
    _guard: SubscriberGuard,
}

impl Stream for EntryStream {
    type Item = Arc<CacheEntry>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
