//! Paging and sorting for collection queries
//!
//! Request parameters drive paging and sorting:
//!
//! ```text
//! GET /api/posts?offset=20&limit=10&sort=-votes,createdAt
//! ```
//!
//! [`Context::apply_page_sort`](crate::core::context::Context::apply_page_sort)
//! reads `limit`, `offset` and `sort` and feeds them to any [`PagedQuery`]
//! builder. [`FindOptions`] is the builder the storage collaborator consumes.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

/// Sort direction for one field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// One field of a sort expression
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }
}

/// Parse a comma-separated sort expression
///
/// Each field may be prefixed with `-` for descending order.
/// Blank segments are ignored.
///
/// # Example
/// ```
/// use svcrest::core::query::{parse_sort, SortKey};
///
/// assert_eq!(
///     parse_sort("-votes, createdAt"),
///     vec![SortKey::desc("votes"), SortKey::asc("createdAt")]
/// );
/// ```
pub fn parse_sort(expr: &str) -> Vec<SortKey> {
    expr.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty() && *part != "-")
        .map(|part| match part.strip_prefix('-') {
            Some(field) => SortKey::desc(field.trim()),
            None => SortKey::asc(part),
        })
        .collect()
}

/// A query builder that accepts paging and sorting
///
/// Storage adapters implement this for whatever query object they build,
/// so handlers can pass it through `Context::apply_page_sort`.
pub trait PagedQuery: Sized {
    /// Limit the number of returned records
    fn limit(self, limit: usize) -> Self;

    /// Skip the first `skip` records
    fn skip(self, skip: usize) -> Self;

    /// Order records by the given keys
    fn sort(self, keys: Vec<SortKey>) -> Self;
}

/// Options accepted by [`Collection::find`](crate::core::collection::Collection::find)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindOptions {
    pub limit: Option<usize>,
    pub skip: Option<usize>,
    #[serde(default)]
    pub sort: Vec<SortKey>,
}

impl PagedQuery for FindOptions {
    fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn skip(mut self, skip: usize) -> Self {
        self.skip = Some(skip);
        self
    }

    fn sort(mut self, keys: Vec<SortKey>) -> Self {
        self.sort = keys;
        self
    }
}

impl FindOptions {
    /// Apply sort, skip and limit (in that order) to an in-memory record list
    pub fn apply(&self, mut records: Vec<Value>) -> Vec<Value> {
        if !self.sort.is_empty() {
            records.sort_by(|a, b| compare_by_keys(a, b, &self.sort));
        }

        records
            .into_iter()
            .skip(self.skip.unwrap_or(0))
            .take(self.limit.unwrap_or(usize::MAX))
            .collect()
    }
}

/// Parse a paging parameter
///
/// Accepts non-negative integers and integer strings; anything else is
/// treated as absent.
pub fn parse_count(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<usize>().ok(),
        _ => None,
    }
}

fn compare_by_keys(a: &Value, b: &Value, keys: &[SortKey]) -> Ordering {
    for key in keys {
        let ordering = compare_values(
            a.get(&key.field).unwrap_or(&Value::Null),
            b.get(&key.field).unwrap_or(&Value::Null),
        );
        let ordering = match key.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Total order over JSON scalars: null < bool < number < string < other
fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}
