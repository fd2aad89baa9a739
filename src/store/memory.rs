use anyhow::Result;
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::model::Id;
use crate::store::traits::{DocumentStore, QueryFilter, SortDirection, SortField, SortKey, StoredDocument};

/// In-process document store keyed by collection and id.
///
/// Holds the same contract as the Postgres store: single-document writes are
/// atomic, nothing spans documents.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, HashMap<Id, StoredDocument>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a document verbatim, bypassing any repository. Used to seed
    /// legacy shapes.
    pub fn insert_raw(&self, collection: &str, document: StoredDocument) {
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .insert(document.id.clone(), document);
    }

    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map(HashMap::len)
            .unwrap_or(0)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }
}

fn matches_filter(document: &StoredDocument, filter: &QueryFilter) -> bool {
    if let Some(ids) = &filter.ids {
        if !ids.contains(&document.id) {
            return false;
        }
    }

    let fields_match = filter
        .field_equals
        .iter()
        .all(|(field, value)| document.field_str(field) == Some(value.as_str()));
    if !fields_match {
        return false;
    }

    match &filter.older_than {
        // rows without a timestamp never follow a keyset position
        Some(position) => document
            .created_at()
            .map(|created_at| position.precedes(created_at, &document.id))
            .unwrap_or(false),
        None => true,
    }
}

fn compare(a: &StoredDocument, b: &StoredDocument, sort: &[SortKey]) -> Ordering {
    sort.iter().fold(Ordering::Equal, |ordering, key| {
        ordering.then_with(|| {
            let natural = match key.field {
                SortField::CreatedAt => a.created_at().cmp(&b.created_at()),
                SortField::Id => a.id.cmp(&b.id),
            };
            match key.direction {
                SortDirection::Ascending => natural,
                SortDirection::Descending => natural.reverse(),
            }
        })
    })
}

#[async_trait::async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<StoredDocument>> {
        Ok(self
            .collections
            .read()
            .get(collection)
            .and_then(|documents| documents.get(id))
            .cloned())
    }

    async fn upsert_by_id(&self, collection: &str, document: StoredDocument) -> Result<()> {
        self.insert_raw(collection, document);
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        filter: &QueryFilter,
        sort: &[SortKey],
        limit: Option<usize>,
    ) -> Result<Vec<StoredDocument>> {
        let collections = self.collections.read();
        let Some(documents) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut found: Vec<StoredDocument> = documents
            .values()
            .filter(|document| matches_filter(document, filter))
            .cloned()
            .collect();
        found.sort_by(|a, b| compare(a, b, sort));

        if let Some(limit) = limit {
            found.truncate(limit);
        }
        Ok(found)
    }

    async fn delete_by_id(&self, collection: &str, id: &str) -> Result<bool> {
        Ok(self
            .collections
            .write()
            .get_mut(collection)
            .map(|documents| documents.remove(id).is_some())
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::traits::KeysetPosition;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn doc(id: &str, owner: &str, created_at: &str) -> StoredDocument {
        StoredDocument {
            id: id.to_string(),
            schema_version: "1.0.0".to_string(),
            body: json!({"organizationId": owner, "createdAt": created_at})
                .as_object()
                .cloned()
                .unwrap(),
        }
    }

    fn seeded() -> MemoryDocumentStore {
        let store = MemoryDocumentStore::new();
        // inserted out of order on purpose
        store.insert_raw("passports", doc("c", "org-1", "2022-03-01T00:00:00.000Z"));
        store.insert_raw("passports", doc("a", "org-1", "2022-01-01T00:00:00.000Z"));
        store.insert_raw("passports", doc("x", "org-2", "2022-02-01T00:00:00.000Z"));
        store.insert_raw("passports", doc("d", "org-1", "2022-03-01T00:00:00.000Z"));
        store
    }

    #[tokio::test]
    async fn test_query_sorts_descending_with_id_tiebreak() {
        let store = seeded();
        let filter = QueryFilter::new().field_equals("organizationId", "org-1");
        let sort = [SortKey::desc(SortField::CreatedAt), SortKey::desc(SortField::Id)];

        let found = store.query("passports", &filter, &sort, None).await.unwrap();
        let ids: Vec<&str> = found.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["d", "c", "a"]);
    }

    #[tokio::test]
    async fn test_query_respects_keyset_and_limit() {
        let store = seeded();
        let filter = QueryFilter::new()
            .field_equals("organizationId", "org-1")
            .older_than(KeysetPosition {
                created_at: Utc.with_ymd_and_hms(2022, 3, 1, 0, 0, 0).unwrap(),
                id: "d".to_string(),
            });
        let sort = [SortKey::desc(SortField::CreatedAt), SortKey::desc(SortField::Id)];

        let found = store.query("passports", &filter, &sort, Some(1)).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "c");
    }

    #[tokio::test]
    async fn test_query_by_ids_skips_missing() {
        let store = seeded();
        let filter = QueryFilter::new().ids(vec!["a".to_string(), "missing".to_string()]);
        let found = store.query("passports", &filter, &[], None).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "a");
    }

    #[tokio::test]
    async fn test_upsert_find_delete() {
        let store = MemoryDocumentStore::new();
        assert!(store.find_by_id("passports", "a").await.unwrap().is_none());

        store
            .upsert_by_id("passports", doc("a", "org-1", "2022-01-01T00:00:00.000Z"))
            .await
            .unwrap();
        assert!(store.find_by_id("passports", "a").await.unwrap().is_some());
        assert_eq!(store.len("passports"), 1);

        assert!(store.delete_by_id("passports", "a").await.unwrap());
        assert!(!store.delete_by_id("passports", "a").await.unwrap());
        assert!(store.is_empty("passports"));
    }
}
