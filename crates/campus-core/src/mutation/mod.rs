// ── Mutation coordination ──
//
// Writes go straight to the resource source. On success, every cached read
// the invalidation table links to the resource type goes stale (subscribed
// ones refetch at once). On failure, optimistic edits are rolled back
// before the error is surfaced.

mod optimistic;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use campus_api::ResourceKind;

use crate::client::QueryClient;
use crate::error::CoreError;
use crate::source::ResourceSource;
use crate::store::OptimisticSnapshot;

pub use optimistic::OptimisticUpdate;

// ── Operations ───────────────────────────────────────────────────────

/// A write against one resource type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum MutationOp {
    Create { payload: Value },
    Update { id: String, payload: Value },
    Delete { id: String },
}

impl MutationOp {
    pub fn create(payload: Value) -> Self {
        Self::Create { payload }
    }

    pub fn update(id: impl Into<String>, payload: Value) -> Self {
        Self::Update {
            id: id.into(),
            payload,
        }
    }

    pub fn delete(id: impl Into<String>) -> Self {
        Self::Delete { id: id.into() }
    }

    pub fn kind(&self) -> MutationKind {
        match self {
            Self::Create { .. } => MutationKind::Create,
            Self::Update { .. } => MutationKind::Update,
            Self::Delete { .. } => MutationKind::Delete,
        }
    }

    /// Target id; `None` for creates.
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Create { .. } => None,
            Self::Update { id, .. } | Self::Delete { id } => Some(id),
        }
    }

    pub fn payload(&self) -> Option<&Value> {
        match self {
            Self::Create { payload } | Self::Update { payload, .. } => Some(payload),
            Self::Delete { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MutationKind {
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MutationStatus {
    Idle,
    Pending,
    Success,
    Error,
}

/// The latest `mutate` call on a `Mutation` handle.
#[derive(Debug, Clone)]
pub struct PendingMutation {
    pub id: Uuid,
    pub resource: ResourceKind,
    pub op: MutationOp,
    pub status: MutationStatus,
    /// Entries as they were before the optimistic edit, if one was applied.
    pub optimistic_snapshot: Option<OptimisticSnapshot>,
    /// Server response; `None` for deletes and unfinished calls.
    pub response: Option<Value>,
    pub error: Option<CoreError>,
    pub started_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

impl PendingMutation {
    pub fn operation(&self) -> MutationKind {
        self.op.kind()
    }
}

/// Per-handle mutation behaviour.
#[derive(Debug, Clone, Default)]
pub struct MutationOptions {
    pub optimistic: Option<OptimisticUpdate>,
    /// Resource types to invalidate on success beyond the table's.
    pub also_invalidate: Vec<ResourceKind>,
}

impl MutationOptions {
    #[must_use]
    pub fn optimistic(mut self, update: OptimisticUpdate) -> Self {
        self.optimistic = Some(update);
        self
    }

    #[must_use]
    pub fn also_invalidate(mut self, kinds: impl IntoIterator<Item = ResourceKind>) -> Self {
        self.also_invalidate.extend(kinds);
        self
    }
}

// ── Mutation handle ──────────────────────────────────────────────────

/// Issues writes for one resource type and tracks the latest one.
///
/// Cheaply cloneable; clones share state.
#[derive(Clone)]
pub struct Mutation {
    client: QueryClient,
    resource: ResourceKind,
    options: Arc<MutationOptions>,
    state: Arc<watch::Sender<Option<Arc<PendingMutation>>>>,
}

impl QueryClient {
    /// A mutation handle for `resource`.
    pub fn mutation(&self, resource: ResourceKind, options: MutationOptions) -> Mutation {
        let (state, _) = watch::channel(None);
        Mutation {
            client: self.clone(),
            resource,
            options: Arc::new(options),
            state: Arc::new(state),
        }
    }
}

impl Mutation {
    pub fn resource(&self) -> ResourceKind {
        self.resource
    }

    /// Start `op` in the background. The handle reports `pending` on
    /// return; follow it through [`state()`](Self::state) or
    /// [`subscribe()`](Self::subscribe).
    pub fn mutate(&self, op: MutationOp) -> Uuid {
        let pending = self.begin(op);
        let id = pending.id;
        let this = self.clone();
        tokio::spawn(async move {
            let _ = this.finish(pending).await;
        });
        id
    }

    /// Run `op` and wait for it. Returns the server's response body
    /// (`None` for deletes).
    pub async fn mutate_async(&self, op: MutationOp) -> Result<Option<Value>, CoreError> {
        let pending = self.begin(op);
        self.finish(pending).await
    }

    pub fn state(&self) -> Option<Arc<PendingMutation>> {
        self.state.borrow().clone()
    }

    pub fn status(&self) -> MutationStatus {
        self.state
            .borrow()
            .as_ref()
            .map_or(MutationStatus::Idle, |m| m.status)
    }

    pub fn error(&self) -> Option<CoreError> {
        self.state.borrow().as_ref().and_then(|m| m.error.clone())
    }

    pub fn is_pending(&self) -> bool {
        self.status() == MutationStatus::Pending
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<PendingMutation>>> {
        self.state.subscribe()
    }

    /// Apply the optimistic edit, if any, and publish the pending state.
    fn begin(&self, op: MutationOp) -> PendingMutation {
        let snapshot = self.options.optimistic.as_ref().map(|update| {
            self.client
                .store()
                .apply_optimistic(self.resource, |query, data| update.apply(&op, query, data))
        });
        if let Some(snapshot) = &snapshot {
            debug!(resource = %self.resource, entries = snapshot.len(), "optimistic update applied");
        }

        let pending = PendingMutation {
            id: Uuid::new_v4(),
            resource: self.resource,
            op,
            status: MutationStatus::Pending,
            optimistic_snapshot: snapshot,
            response: None,
            error: None,
            started_at: Utc::now(),
            settled_at: None,
        };
        self.state.send_replace(Some(Arc::new(pending.clone())));
        pending
    }

    async fn finish(&self, mut pending: PendingMutation) -> Result<Option<Value>, CoreError> {
        let op = pending.op.clone();
        let result = match self.client.source(self.resource) {
            Ok(source) => self.call(source.as_ref(), &op).await,
            Err(e) => Err(e),
        };
        pending.settled_at = Some(Utc::now());

        match result {
            Ok(response) => {
                let targets = self.invalidation_targets();
                let invalidation = self
                    .client
                    .invalidate_where(|key| targets.contains(&key.resource));
                info!(
                    resource = %self.resource,
                    op = %op.kind(),
                    invalidated = invalidation.invalidated.len(),
                    refetching = invalidation.refetch.len(),
                    "mutation succeeded"
                );
                pending.status = MutationStatus::Success;
                pending.response.clone_from(&response);
                self.settle(pending);
                Ok(response)
            }
            Err(err) => {
                if let Some(snapshot) = &pending.optimistic_snapshot {
                    let restoration = self.client.store().restore(snapshot);
                    for (query, options) in &restoration.refetch {
                        self.client.ensure_fetch(query, *options);
                    }
                    debug!(
                        resource = %self.resource,
                        restored = restoration.restored.len(),
                        refetching = restoration.refetch.len(),
                        "optimistic update rolled back"
                    );
                }
                warn!(resource = %self.resource, op = %op.kind(), error = %err, "mutation failed");
                pending.status = MutationStatus::Error;
                pending.error = Some(err.clone());
                self.settle(pending);
                Err(err)
            }
        }
    }

    async fn call(
        &self,
        source: &dyn ResourceSource,
        op: &MutationOp,
    ) -> Result<Option<Value>, CoreError> {
        let timeout = self.client.config().request_timeout;
        let call = async {
            match op {
                MutationOp::Create { payload } => source.create(payload).await.map(Some),
                MutationOp::Update { id, payload } => source.update(id, payload).await.map(Some),
                MutationOp::Delete { id } => source.delete(id).await.map(|()| None),
            }
        };
        tokio::time::timeout(timeout, call)
            .await
            .map_err(|_| CoreError::timeout(timeout))?
    }

    fn invalidation_targets(&self) -> IndexSet<ResourceKind> {
        let mut targets = self.client.rules().targets(self.resource);
        targets.extend(self.options.also_invalidate.iter().copied());
        targets
    }

    /// Publish a terminal state unless a newer `mutate` call replaced this one.
    fn settle(&self, pending: PendingMutation) {
        self.state.send_if_modified(|current| {
            let is_current = current.as_ref().is_some_and(|m| m.id == pending.id);
            if is_current {
                *current = Some(Arc::new(pending));
            }
            is_current
        });
    }
}
