//! Storage collaborator trait
//!
//! A service is bound to at most one [`Collection`]. The framework is agnostic
//! to the storage engine behind it: entities cross this boundary as plain
//! JSON records.

use crate::core::error::StorageResult;
use crate::core::query::FindOptions;
use async_trait::async_trait;
use serde_json::Value;

/// Asynchronous access to one collection of entities
///
/// Every method may suspend on I/O and may fail. Retries, timeouts and
/// cancellation are the implementation's business.
#[async_trait]
pub trait Collection: Send + Sync {
    /// Point lookup by id
    async fn find_by_id(&self, id: &Value) -> StorageResult<Option<Value>>;

    /// Bulk lookup by membership in `ids`
    async fn find_by_ids(&self, ids: &[Value]) -> StorageResult<Vec<Value>>;

    /// Find records matching `filter`, paged and sorted by `options`
    async fn find(&self, filter: &Value, options: FindOptions) -> StorageResult<Vec<Value>>;

    /// Insert a new record or replace an existing one, returning what was stored
    async fn save(&self, entity: Value) -> StorageResult<Value>;

    /// Remove every record matching `filter`, returning how many were removed
    async fn remove(&self, filter: &Value) -> StorageResult<usize>;
}
