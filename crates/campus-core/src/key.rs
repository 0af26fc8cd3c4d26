// ── Cache keys and queries ──
//
// A `Query` says what to fetch; its `CacheKey` says where the result lives.

use std::fmt;
use std::time::Duration;

use campus_api::{Filters, ResourceKind};

/// Identifier of a cached read: resource type plus filter signature.
///
/// List signatures are canonical JSON objects (`{"date":"2024-01-01"}`);
/// item signatures are `id:<id>`, so the two can never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub resource: ResourceKind,
    pub signature: String,
}

impl CacheKey {
    pub fn list(resource: ResourceKind, filters: &Filters) -> Self {
        Self {
            resource,
            signature: filters.signature(),
        }
    }

    pub fn item(resource: ResourceKind, id: &str) -> Self {
        Self {
            resource,
            signature: format!("id:{id}"),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource, self.signature)
    }
}

/// What a read targets within a resource type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryTarget {
    List(Filters),
    Item(String),
}

/// A read request: resource type + target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub resource: ResourceKind,
    pub target: QueryTarget,
}

impl Query {
    pub fn list(resource: ResourceKind, filters: Filters) -> Self {
        Self {
            resource,
            target: QueryTarget::List(filters),
        }
    }

    pub fn item(resource: ResourceKind, id: impl Into<String>) -> Self {
        Self {
            resource,
            target: QueryTarget::Item(id.into()),
        }
    }

    pub fn cache_key(&self) -> CacheKey {
        match &self.target {
            QueryTarget::List(filters) => CacheKey::list(self.resource, filters),
            QueryTarget::Item(id) => CacheKey::item(self.resource, id),
        }
    }

    /// Filters of a list query; `None` for item reads.
    pub fn filters(&self) -> Option<&Filters> {
        match &self.target {
            QueryTarget::List(filters) => Some(filters),
            QueryTarget::Item(_) => None,
        }
    }
}

/// Per-query overrides of the client-wide `CacheConfig`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOptions {
    pub stale_time: Option<Duration>,
    pub retry: Option<u32>,
}

impl QueryOptions {
    #[must_use]
    pub fn stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = Some(stale_time);
        self
    }

    #[must_use]
    pub fn retry(mut self, retry: u32) -> Self {
        self.retry = Some(retry);
        self
    }
}
