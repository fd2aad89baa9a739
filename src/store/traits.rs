use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::model::{iso_millis, Id};

/// Raw record as held by a document store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: Id,
    /// Schema version the document was last written with
    pub schema_version: String,
    pub body: Map<String, Value>,
}

impl StoredDocument {
    pub fn new(id: impl Into<Id>, schema_version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            schema_version: schema_version.into(),
            body: Map::new(),
        }
    }

    /// `createdAt` of the body, when present and well-formed.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.body
            .get("createdAt")
            .and_then(Value::as_str)
            .and_then(|raw| iso_millis::parse(raw).ok())
    }

    pub fn field_str(&self, field: &str) -> Option<&str> {
        self.body.get(field).and_then(Value::as_str)
    }
}

/// Resume point of a `(createdAt desc, id desc)` ordered scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeysetPosition {
    pub created_at: DateTime<Utc>,
    pub id: Id,
}

impl KeysetPosition {
    /// True when `(created_at, id)` sorts strictly after this position in
    /// descending order.
    pub fn precedes(&self, created_at: DateTime<Utc>, id: &str) -> bool {
        created_at < self.created_at || (created_at == self.created_at && id < self.id.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryFilter {
    /// Body fields that must equal the given string
    pub field_equals: Vec<(String, String)>,
    /// Restrict to these ids
    pub ids: Option<Vec<Id>>,
    /// Only rows strictly older than this position
    pub older_than: Option<KeysetPosition>,
}

impl QueryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field_equals(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.field_equals.push((field.into(), value.into()));
        self
    }

    pub fn ids(mut self, ids: Vec<Id>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn older_than(mut self, position: KeysetPosition) -> Self {
        self.older_than = Some(position);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    CreatedAt,
    Id,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortKey {
    pub const fn desc(field: SortField) -> Self {
        Self {
            field,
            direction: SortDirection::Descending,
        }
    }

    pub const fn asc(field: SortField) -> Self {
        Self {
            field,
            direction: SortDirection::Ascending,
        }
    }
}

/// The three primitives the persistence layer needs from a document database,
/// plus deletion.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<StoredDocument>>;
    /// Insert or fully replace the document stored under `document.id`.
    async fn upsert_by_id(&self, collection: &str, document: StoredDocument) -> Result<()>;
    /// Filtered, sorted, optionally limited scan. Sorting is the store's job.
    async fn query(
        &self,
        collection: &str,
        filter: &QueryFilter,
        sort: &[SortKey],
        limit: Option<usize>,
    ) -> Result<Vec<StoredDocument>>;
    async fn delete_by_id(&self, collection: &str, id: &str) -> Result<bool>;
}
