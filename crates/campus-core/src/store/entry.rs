// ── Cache entries ──

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;

use campus_api::Page;

use crate::error::CoreError;
use crate::key::CacheKey;

/// Cached result of a read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Payload {
    List(Page),
    Item(Value),
}

impl Payload {
    pub fn as_list(&self) -> Option<&Page> {
        match self {
            Self::List(page) => Some(page),
            Self::Item(_) => None,
        }
    }

    pub fn as_item(&self) -> Option<&Value> {
        match self {
            Self::Item(value) => Some(value),
            Self::List(_) => None,
        }
    }

    /// The bare JSON view: the item itself, or the list items as an array.
    pub fn to_json(&self) -> Value {
        match self {
            Self::List(page) => Value::Array(page.items.clone()),
            Self::Item(value) => value.clone(),
        }
    }
}

/// Fetch lifecycle of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum QueryStatus {
    /// Created by a subscription, never fetched.
    Idle,
    /// First fetch in flight, no data yet.
    Loading,
    Success,
    Error,
}

/// One slot of the cache store, as seen by readers.
///
/// Handed out behind `Arc`; readers never mutate it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub data: Option<Arc<Payload>>,
    pub status: QueryStatus,
    pub error: Option<CoreError>,
    /// Wall-clock time of the last successful fetch.
    pub fetched_at: Option<DateTime<Utc>>,
    /// Monotonic deadline after which the data is stale.
    pub stale_after: Option<Instant>,
    pub subscriber_count: usize,
    /// A fetch for this key is in flight.
    pub is_fetching: bool,
    /// Marked stale by an invalidation since the last successful fetch.
    pub is_invalidated: bool,
    /// Sequence number of the fetch (or write) that produced `data`.
    pub seq: u64,
}

impl CacheEntry {
    pub(crate) fn idle(key: CacheKey) -> Self {
        Self {
            key,
            data: None,
            status: QueryStatus::Idle,
            error: None,
            fetched_at: None,
            stale_after: None,
            subscriber_count: 0,
            is_fetching: false,
            is_invalidated: false,
            seq: 0,
        }
    }

    /// Successful, not invalidated, and within its staleness window.
    pub fn is_fresh(&self, now: Instant) -> bool {
        self.status == QueryStatus::Success
            && self.data.is_some()
            && !self.is_invalidated
            && self.stale_after.is_some_and(|deadline| now < deadline)
    }

    pub fn is_stale(&self, now: Instant) -> bool {
        !self.is_fresh(now)
    }
}
