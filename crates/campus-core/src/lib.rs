//! Client-side resource cache and mutation synchronization between
//! `campus-api` and its consumers (the `campus` CLI, dashboards, ...).
//!
//! - **[`QueryClient`]** — The shared cache object. Cheaply cloneable;
//!   create one at start-up with [`QueryClient::from_config`] or
//!   [`QueryClient::builder`], [`start()`](QueryClient::start) the idle-entry
//!   sweeper, and [`shutdown()`](QueryClient::shutdown) at exit.
//!
//! - **[`CacheStore`]** — Keyed entries (`DashMap` + `tokio::sync::watch`)
//!   with per-key fetch sequence numbers, so a slow, older response can
//!   never overwrite a newer one.
//!
//! - **Reads** — [`QueryClient::watch`] returns a [`QueryHandle`] that
//!   follows one cache entry; [`QueryClient::fetch`] is the one-shot form.
//!   Concurrent reads of one key share a single request. Stale entries are
//!   served while a background refetch runs.
//!
//! - **Writes** — [`Mutation`] handles run create/update/delete calls,
//!   apply and roll back [`OptimisticUpdate`]s, and invalidate related
//!   reads through the [`InvalidationRules`] table.
//!
//! - **[`ResourceCache`]** — The same operations bound to one
//!   [`ResourceKind`].

pub mod client;
pub mod config;
pub mod error;
pub mod invalidation;
pub mod key;
pub mod mutation;
pub mod query;
pub mod resource;
pub mod source;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use client::{QueryClient, QueryClientBuilder};
pub use config::{CacheConfig, ClientConfig, ServiceEndpoints, TlsVerification};
pub use error::CoreError;
pub use invalidation::InvalidationRules;
pub use key::{CacheKey, Query, QueryOptions, QueryTarget};
pub use mutation::{
    Mutation, MutationKind, MutationOp, MutationOptions, MutationStatus, OptimisticUpdate,
    PendingMutation,
};
pub use query::{QueryHandle, QueryState, QueryStream};
pub use resource::ResourceCache;
pub use source::ResourceSource;
pub use store::{
    CacheEntry, CacheStore, EntryStream, Invalidation, OptimisticSnapshot, Payload, QueryStatus,
    Restoration, Subscription,
};

// Re-export the wire-level types consumers need alongside the cache.
pub use campus_api::{ErrorKind, Filters, Page, ResourceKind, Service, item_id};
