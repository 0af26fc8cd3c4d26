// ── Query handles ──

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use chrono::{DateTime, Utc};
use futures_core::Stream;
use tokio::time::Instant;

use crate::client::QueryClient;
use crate::error::CoreError;
use crate::key::{CacheKey, Query, QueryOptions};
use crate::store::{CacheEntry, EntryStream, Payload, QueryStatus, Subscription};

/// What a consumer renders from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryState {
    pub data: Option<Arc<Payload>>,
    pub status: QueryStatus,
    pub error: Option<CoreError>,
    /// First fetch in flight, nothing to show yet.
    pub is_loading: bool,
    /// Any fetch in flight, including background refetches.
    pub is_fetching: bool,
    pub is_stale: bool,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl From<&CacheEntry> for QueryState {
    fn from(entry: &CacheEntry) -> Self {
        Self {
            data: entry.data.clone(),
            status: entry.status,
            error: entry.error.clone(),
            is_loading: entry.status == QueryStatus::Loading,
            is_fetching: entry.is_fetching,
            is_stale: entry.is_stale(Instant::now()),
            fetched_at: entry.fetched_at,
        }
    }
}

/// A subscribed read. Dropping it unsubscribes without cancelling any
/// fetch in flight.
pub struct QueryHandle {
    client: QueryClient,
    query: Query,
    options: QueryOptions,
    subscription: Subscription,
}

impl QueryHandle {
    pub(crate) fn new(
        client: QueryClient,
        query: Query,
        options: QueryOptions,
        subscription: Subscription,
    ) -> Self {
        Self {
            client,
            query,
            options,
            subscription,
        }
    }

    pub fn key(&self) -> &CacheKey {
        self.subscription.key()
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn state(&self) -> QueryState {
        QueryState::from(self.subscription.current().as_ref())
    }

    /// Wait for the next state change. `None` once the entry is gone
    /// (client shut down or cache cleared).
    pub async fn changed(&mut self) -> Option<QueryState> {
        let entry = self.subscription.changed().await?;
        Some(QueryState::from(entry.as_ref()))
    }

    /// Wait until no fetch is in flight and return that state.
    pub async fn settled(&mut self) -> Option<QueryState> {
        let mut state = self.state();
        while state.is_fetching {
            state = self.changed().await?;
        }
        Some(state)
    }

    /// Fetch again now, whatever the freshness.
    pub async fn refetch(&self) -> Result<Arc<Payload>, CoreError> {
        self.client.refetch(&self.query, self.options).await
    }

    /// Stream of states: the current one, then every change.
    pub fn into_stream(self) -> QueryStream {
        QueryStream {
            inner: self.subscription.into_stream(),
        }
    }
}

/// `Stream` of `QueryState`s for one subscribed read.
pub struct QueryStream {
    inner: EntryStream,
}

impl Stream for QueryStream {
    type Item = QueryState;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner)
            .poll_next(cx)
            .map(|entry| entry.map(|e| QueryState::from(e.as_ref())))
    }
}
