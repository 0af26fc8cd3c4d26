// ── Per-resource facade ──
//
// One generic cache facade, parameterized by `ResourceKind`, in place of a
// hand-written module per resource type.

use std::sync::Arc;

use serde_json::Value;

use campus_api::{Filters, ResourceKind};

use crate::client::QueryClient;
use crate::error::CoreError;
use crate::key::{Query, QueryOptions};
use crate::mutation::{Mutation, MutationOp, MutationOptions};
use crate::query::QueryHandle;
use crate::store::{Invalidation, Payload};

/// Reads and writes for one resource type through a shared `QueryClient`.
#[derive(Clone)]
pub struct ResourceCache {
    client: QueryClient,
    kind: ResourceKind,
}

impl QueryClient {
    pub fn resource(&self, kind: ResourceKind) -> ResourceCache {
        ResourceCache {
            client: self.clone(),
            kind,
        }
    }
}

impl ResourceCache {
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn list_query(&self, filters: Filters) -> Query {
        Query::list(self.kind, filters)
    }

    pub fn item_query(&self, id: impl Into<String>) -> Query {
        Query::item(self.kind, id)
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn watch_list(&self, filters: Filters, options: QueryOptions) -> QueryHandle {
        self.client.watch(self.list_query(filters), options)
    }

    pub fn watch_item(&self, id: impl Into<String>, options: QueryOptions) -> QueryHandle {
        self.client.watch(self.item_query(id), options)
    }

    pub async fn list(&self, filters: Filters) -> Result<Arc<Payload>, CoreError> {
        self.client
            .fetch(&self.list_query(filters), QueryOptions::default())
            .await
    }

    pub async fn get(&self, id: &str) -> Result<Arc<Payload>, CoreError> {
        self.client
            .fetch(&self.item_query(id), QueryOptions::default())
            .await
    }

    // ── Writes ───────────────────────────────────────────────────────

    pub fn mutation(&self, options: MutationOptions) -> Mutation {
        self.client.mutation(self.kind, options)
    }

    pub async fn create(&self, payload: Value) -> Result<Option<Value>, CoreError> {
        self.mutation(MutationOptions::default())
            .mutate_async(MutationOp::create(payload))
            .await
    }

    pub async fn update(&self, id: &str, payload: Value) -> Result<Option<Value>, CoreError> {
        self.mutation(MutationOptions::default())
            .mutate_async(MutationOp::update(id, payload))
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<(), CoreError> {
        self.mutation(MutationOptions::default())
            .mutate_async(MutationOp::delete(id))
            .await
            .map(|_| ())
    }

    /// Mark every cached read of this type stale.
    pub fn invalidate(&self) -> Invalidation {
        self.client.invalidate_resource(self.kind)
    }
}
