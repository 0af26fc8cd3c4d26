// ── Optimistic update recipes ──

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use campus_api::{Filters, item_id};

use super::MutationOp;
use crate::key::Query;
use crate::store::Payload;

type CustomFn = dyn Fn(&MutationOp, &Query, &Payload) -> Option<Payload> + Send + Sync;

/// How a mutation edits cached data before the server answers.
///
/// Applied to every cached entry of the mutated resource type; an entry
/// the recipe does not apply to is left untouched.
#[derive(Clone)]
pub enum OptimisticUpdate {
    /// Drop the item with the operation's id from cached lists.
    RemoveItem,
    /// Merge an update into cached copies of the item; append a create to
    /// every cached list whose filters the new item satisfies.
    UpsertItem,
    Custom(Arc<CustomFn>),
}

impl OptimisticUpdate {
    pub fn remove_item() -> Self {
        Self::RemoveItem
    }

    pub fn upsert_item() -> Self {
        Self::UpsertItem
    }

    pub fn custom(
        f: impl Fn(&MutationOp, &Query, &Payload) -> Option<Payload> + Send + Sync + 'static,
    ) -> Self {
        Self::Custom(Arc::new(f))
    }

    pub(crate) fn apply(&self, op: &MutationOp, query: &Query, data: &Payload) -> Option<Payload> {
        match self {
            Self::RemoveItem => remove_item(op, data),
            Self::UpsertItem => upsert_item(op, query, data),
            Self::Custom(f) => f(op, query, data),
        }
    }
}

impl fmt::Debug for OptimisticUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RemoveItem => f.write_str("RemoveItem"),
            Self::UpsertItem => f.write_str("UpsertItem"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

fn remove_item(op: &MutationOp, data: &Payload) -> Option<Payload> {
    let id = op.id()?;
    let mut page = data.as_list()?.clone();
    page.remove(id)?;
    Some(Payload::List(page))
}

fn upsert_item(op: &MutationOp, query: &Query, data: &Payload) -> Option<Payload> {
    match (op, data) {
        (MutationOp::Update { id, payload }, Payload::List(page)) => {
            let mut page = page.clone();
            let idx = page.position(id)?;
            merge(page.items.get_mut(idx)?, payload);
            Some(Payload::List(page))
        }
        (MutationOp::Update { id, payload }, Payload::Item(item)) => {
            if item_id(item).as_deref() != Some(id.as_str()) {
                return None;
            }
            let mut item = item.clone();
            merge(&mut item, payload);
            Some(Payload::Item(item))
        }
        (MutationOp::Create { payload }, Payload::List(page)) => {
            if !satisfies(payload, query.filters()?) {
                return None;
            }
            let mut item = payload.clone();
            if item_id(&item).is_none() {
                if let Value::Object(map) = &mut item {
                    map.insert(
                        "id".into(),
                        Value::String(format!("optimistic-{}", Uuid::new_v4())),
                    );
                }
            }
            let mut page = page.clone();
            page.upsert(item);
            Some(Payload::List(page))
        }
        _ => None,
    }
}

/// Shallow merge for objects; anything else is replaced.
fn merge(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (k, v) in patch {
                target.insert(k.clone(), v.clone());
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}

/// Whether `item` carries every filter field with an equal value.
/// `"7"` and `7` compare equal, as query strings do on the wire.
fn satisfies(item: &Value, filters: &Filters) -> bool {
    filters.iter().all(|(field, expected)| {
        item.get(field)
            .is_some_and(|actual| actual == expected || as_text(actual) == as_text(expected))
    })
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
