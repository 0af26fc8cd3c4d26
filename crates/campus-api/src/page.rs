// ── List pages ──
//
// The uniform list envelope `{ <plural>: [T], total }` unwrapped into
// items + total, plus the id-based edits optimistic updates need.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

/// One page of a list response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub items: Vec<Value>,
    pub total: u64,
}

impl Page {
    pub fn new(items: Vec<Value>) -> Self {
        let total = count(&items);
        Self { items, total }
    }

    /// Unwrap a list envelope. A missing `total` falls back to the item count.
    pub fn from_envelope(body: Value, field: &str) -> Result<Self, Error> {
        let Value::Object(mut map) = body else {
            return Err(Error::Deserialization {
                message: format!("expected an object with a `{field}` array"),
                body: body.to_string(),
            });
        };

        let items = match map.remove(field) {
            Some(Value::Array(items)) => items,
            other => {
                let found = other.map_or("nothing", |v| json_type(&v));
                return Err(Error::Deserialization {
                    message: format!("expected `{field}` to be an array, found {found}"),
                    body: Value::Object(map).to_string(),
                });
            }
        };

        let total = map
            .get("total")
            .and_then(Value::as_u64)
            .unwrap_or_else(|| count(&items));

        Ok(Self { items, total })
    }

    /// Position of the item whose id matches.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item_id(item).as_deref() == Some(id))
    }

    pub fn find(&self, id: &str) -> Option<&Value> {
        self.position(id).and_then(|i| self.items.get(i))
    }

    /// Remove the item with `id`, decrementing `total`.
    pub fn remove(&mut self, id: &str) -> Option<Value> {
        let idx = self.position(id)?;
        self.total = self.total.saturating_sub(1);
        Some(self.items.remove(idx))
    }

    /// Replace the item with the same id, or append it (incrementing `total`).
    pub fn upsert(&mut self, item: Value) {
        let existing = item_id(&item).and_then(|id| self.position(&id));
        match existing.and_then(|i| self.items.get_mut(i)) {
            Some(slot) => *slot = item,
            None => {
                self.items.push(item);
                self.total = self.total.saturating_add(1);
            }
        }
    }
}

/// Identifier of a resource item: `id`, falling back to `_id`.
/// Numeric ids are rendered as decimal strings.
pub fn item_id(item: &Value) -> Option<String> {
    let raw = item.get("id").or_else(|| item.get("_id"))?;
    match raw {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn count(items: &[Value]) -> u64 {
    u64::try_from(items.len()).unwrap_or(u64::MAX)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
