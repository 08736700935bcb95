use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::database::document::Patch;
use crate::database::manager::DatabaseError;
use crate::database::store::DocumentStore;
use crate::filter::filter_order::FilterOrder;
use crate::filter::{Filter, FindOptions, ID_FIELD};

type Rows = Arc<RwLock<Vec<Map<String, Value>>>>;

/// In-process backend. Each collection is a vector in insertion order behind its own lock;
/// every operation holds that lock for its whole duration.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Rows>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn rows(&self, collection: &str) -> Rows {
        // Fast path: try read lock
        {
            let collections = self.collections.read().await;
            if let Some(rows) = collections.get(collection) {
                return rows.clone();
            }
        }

        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_insert_with(|| {
                tracing::debug!("Created in-memory collection: {}", collection);
                Arc::new(RwLock::new(Vec::new()))
            })
            .clone()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn insert(&self, collection: &str, doc: Map<String, Value>) -> Result<(), DatabaseError> {
        let rows = self.rows(collection).await;
        let mut rows = rows.write().await;
        let id = doc.get(ID_FIELD).cloned().unwrap_or(Value::Null);
        if rows.iter().any(|existing| existing.get(ID_FIELD) == Some(&id)) {
            return Err(DatabaseError::DuplicateId(id.to_string(), collection.to_string()));
        }
        rows.push(doc);
        Ok(())
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
        limit: Option<usize>,
    ) -> Result<Vec<Map<String, Value>>, DatabaseError> {
        let rows = self.rows(collection).await;
        let rows = rows.read().await;
        let mut found: Vec<Map<String, Value>> = rows.iter().filter(|doc| filter.matches(doc)).cloned().collect();
        if let Some(sort) = &options.sort {
            FilterOrder::sort(&mut found, sort);
        }
        if let Some(limit) = limit {
            found.truncate(limit);
        }
        Ok(found)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        patch: &Patch,
    ) -> Result<Option<Map<String, Value>>, DatabaseError> {
        let rows = self.rows(collection).await;
        let mut rows = rows.write().await;
        match rows.iter_mut().find(|doc| filter.matches(doc)) {
            Some(doc) => {
                patch.apply(doc);
                Ok(Some(doc.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, collection: &str, filter: &Filter, many: bool) -> Result<u64, DatabaseError> {
        let rows = self.rows(collection).await;
        let mut rows = rows.write().await;
        if many {
            let before = rows.len();
            rows.retain(|doc| !filter.matches(doc));
            return Ok((before - rows.len()) as u64);
        }
        match rows.iter().position(|doc| filter.matches(doc)) {
            Some(idx) => {
                rows.remove(idx);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, DatabaseError> {
        let rows = self.rows(collection).await;
        let rows = rows.read().await;
        Ok(rows.iter().filter(|doc| filter.matches(doc)).count() as u64)
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn rejects_duplicate_identity() {
        let store = MemoryStore::new();
        store.insert("c", doc(json!({"_id": "1"}))).await.unwrap();
        let err = store.insert("c", doc(json!({"_id": "1"}))).await.unwrap_err();
        assert!(matches!(err, DatabaseError::DuplicateId(_, _)));
        // Same identity in another collection is fine
        store.insert("d", doc(json!({"_id": "1"}))).await.unwrap();
    }

    #[tokio::test]
    async fn find_keeps_insertion_order() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store.insert("c", doc(json!({"_id": i.to_string(), "even": i % 2 == 0}))).await.unwrap();
        }
        let found = store
            .find("c", &Filter::new().eq("even", true), &FindOptions::default(), None)
            .await
            .unwrap();
        let ids: Vec<&str> = found.iter().map(|d| d["_id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["0", "2", "4"]);

        let first = store.find("c", &Filter::new(), &FindOptions::default(), Some(1)).await.unwrap();
        assert_eq!(first[0]["_id"], json!("0"));
    }

    #[tokio::test]
    async fn delete_one_removes_first_match_only() {
        let store = MemoryStore::new();
        store.insert("c", doc(json!({"_id": "1", "k": "x"}))).await.unwrap();
        store.insert("c", doc(json!({"_id": "2", "k": "x"}))).await.unwrap();
        assert_eq!(store.delete("c", &Filter::new().eq("k", "x"), false).await.unwrap(), 1);
        assert_eq!(store.count("c", &Filter::new()).await.unwrap(), 1);
        assert_eq!(store.delete("c", &Filter::new().eq("k", "x"), true).await.unwrap(), 1);
        assert_eq!(store.delete("c", &Filter::new().eq("k", "x"), false).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn update_of_missing_document_returns_none() {
        let store = MemoryStore::new();
        let updated = store
            .update_one("c", &Filter::new().eq("_id", "nope"), &Patch::new().set("a", 1))
            .await
            .unwrap();
        assert!(updated.is_none());
    }
}
