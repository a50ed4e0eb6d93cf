//! In-memory implementation of `Collection` for testing and development

use crate::core::collection::Collection;
use crate::core::error::{StorageError, StorageResult};
use crate::core::query::FindOptions;
use async_trait::async_trait;
use chrono::Utc;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::sync::{Arc, RwLock};

#[derive(Debug)]
struct State {
    records: IndexMap<String, Value>,
    next_id: u64,
}

/// In-memory collection
///
/// Records are kept in insertion order and keyed by their `id` field.
/// Records saved without an id get an auto-incremented numeric one,
/// starting at 1. Uses RwLock for thread-safe access.
#[derive(Debug, Clone)]
pub struct InMemoryCollection {
    name: String,
    state: Arc<RwLock<State>>,
}

impl InMemoryCollection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(RwLock::new(State {
                records: IndexMap::new(),
                next_id: 1,
            })),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of stored records
    pub fn len(&self) -> StorageResult<usize> {
        let state = self
            .state
            .read()
            .map_err(|_| StorageError::LockPoisoned("read"))?;
        Ok(state.records.len())
    }

    pub fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.len()? == 0)
    }
}

impl Default for InMemoryCollection {
    fn default() -> Self {
        Self::new("default")
    }
}

#[async_trait]
impl Collection for InMemoryCollection {
    async fn find_by_id(&self, id: &Value) -> StorageResult<Option<Value>> {
        let Some(key) = id_key(id) else {
            return Ok(None);
        };
        let state = self
            .state
            .read()
            .map_err(|_| StorageError::LockPoisoned("read"))?;

        Ok(state.records.get(&key).cloned())
    }

    async fn find_by_ids(&self, ids: &[Value]) -> StorageResult<Vec<Value>> {
        let keys: Vec<String> = ids.iter().filter_map(id_key).collect();
        let state = self
            .state
            .read()
            .map_err(|_| StorageError::LockPoisoned("read"))?;

        Ok(state
            .records
            .iter()
            .filter(|(key, _)| keys.contains(key))
            .map(|(_, record)| record.clone())
            .collect())
    }

    async fn find(&self, filter: &Value, options: FindOptions) -> StorageResult<Vec<Value>> {
        let filter = as_filter(filter, &self.name)?;
        let state = self
            .state
            .read()
            .map_err(|_| StorageError::LockPoisoned("read"))?;

        let matching = state
            .records
            .values()
            .filter(|record| matches_filter(record, filter))
            .cloned()
            .collect();

        Ok(options.apply(matching))
    }

    async fn save(&self, entity: Value) -> StorageResult<Value> {
        let Value::Object(mut record) = entity else {
            return Err(StorageError::IntegrityError {
                message: format!("{}: only objects can be saved", self.name),
            });
        };

        let mut state = self
            .state
            .write()
            .map_err(|_| StorageError::LockPoisoned("write"))?;

        let key = match record.get("id").and_then(id_key) {
            Some(key) => {
                if let Ok(numeric) = key.parse::<u64>() {
                    state.next_id = state.next_id.max(numeric.saturating_add(1));
                }
                key
            }
            None => {
                let id = state.next_id;
                state.next_id += 1;
                record.insert("id".to_string(), Value::from(id));
                id.to_string()
            }
        };

        let now = Value::String(Utc::now().to_rfc3339());
        let created_at = state
            .records
            .get(&key)
            .and_then(|existing| existing.get("createdAt").cloned())
            .unwrap_or_else(|| now.clone());
        record.insert("createdAt".to_string(), created_at);
        record.insert("updatedAt".to_string(), now);

        let record = Value::Object(record);
        state.records.insert(key, record.clone());
        Ok(record)
    }

    async fn remove(&self, filter: &Value) -> StorageResult<usize> {
        let filter = as_filter(filter, &self.name)?;
        let mut state = self
            .state
            .write()
            .map_err(|_| StorageError::LockPoisoned("write"))?;

        let before = state.records.len();
        state.records.retain(|_, record| !matches_filter(record, filter));
        Ok(before - state.records.len())
    }
}

/// Canonical key of a scalar id; `1` and `"1"` share a key
fn id_key(id: &Value) -> Option<String> {
    match id {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn as_filter<'a>(filter: &'a Value, backend: &str) -> StorageResult<Option<&'a Map<String, Value>>> {
    match filter {
        Value::Null => Ok(None),
        Value::Object(map) => Ok(Some(map)),
        other => Err(StorageError::QueryError {
            backend: backend.to_string(),
            message: format!("filter must be an object, got {}", other),
        }),
    }
}

/// Every filter field must match; an array field matches on membership
fn matches_filter(record: &Value, filter: Option<&Map<String, Value>>) -> bool {
    let Some(filter) = filter else {
        return true;
    };
    filter.iter().all(|(field, expected)| {
        let actual = record.get(field).unwrap_or(&Value::Null);
        match (actual, expected) {
            (Value::Array(items), expected) if !expected.is_array() => {
                items.iter().any(|item| scalar_eq(item, expected))
            }
            (actual, expected) => scalar_eq(actual, expected),
        }
    })
}

fn scalar_eq(a: &Value, b: &Value) -> bool {
    a == b || matches!((id_key(a), id_key(b)), (Some(x), Some(y)) if x == y)
}
