// ── Resource sources ──
//
// The uniform resource-access interface the coordinators call. The HTTP
// `ResourceClient` is one implementation; anything that can list, get,
// create, update and delete JSON resources can stand in for it.

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde_json::Value;

use campus_api::{Filters, Page, ResourceClient};

use crate::error::CoreError;

/// List/get/create/update/delete for one resource type.
///
/// Futures are boxed so sources can be stored as `Arc<dyn ResourceSource>`.
pub trait ResourceSource: Send + Sync + 'static {
    fn list<'a>(&'a self, filters: &'a Filters) -> BoxFuture<'a, Result<Page, CoreError>>;

    fn get<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Value, CoreError>>;

    fn create<'a>(&'a self, payload: &'a Value) -> BoxFuture<'a, Result<Value, CoreError>>;

    fn update<'a>(
        &'a self,
        id: &'a str,
        payload: &'a Value,
    ) -> BoxFuture<'a, Result<Value, CoreError>>;

    fn delete<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<(), CoreError>>;
}

impl ResourceSource for ResourceClient {
    fn list<'a>(&'a self, filters: &'a Filters) -> BoxFuture<'a, Result<Page, CoreError>> {
        async move { Ok(ResourceClient::list(self, filters).await?) }.boxed()
    }

    fn get<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Value, CoreError>> {
        async move { Ok(ResourceClient::get(self, id).await?) }.boxed()
    }

    fn create<'a>(&'a self, payload: &'a Value) -> BoxFuture<'a, Result<Value, CoreError>> {
        async move { Ok(ResourceClient::create(self, payload).await?) }.boxed()
    }

    fn update<'a>(
        &'a self,
        id: &'a str,
        payload: &'a Value,
    ) -> BoxFuture<'a, Result<Value, CoreError>> {
        async move { Ok(ResourceClient::update(self, id, payload).await?) }.boxed()
    }

    fn delete<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<(), CoreError>> {
        async move { Ok(ResourceClient::delete(self, id).await?) }.boxed()
    }
}
