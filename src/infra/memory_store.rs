//! An in-process [`DocumentStore`].

use super::database::{
    Document, DocumentStore, FieldUpdate, Fields, Precondition, StoreError, StoreResult,
};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use tracing::instrument;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct DocumentKey {
    collection: String,
    id: String,
}

impl DocumentKey {
    fn new(collection: &str, id: &str) -> Self {
        Self {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }
}

#[derive(Clone, Debug)]
struct StoredDocument {
    version: u64,
    fields: Fields,
}

/// A document store kept in memory.
///
/// Updates to one document hold its shard lock for their whole duration,
/// so increments and appends never lose writes.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: DashMap<DocumentKey, StoredDocument>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn apply(fields: &mut Fields, update: FieldUpdate) {
    match update {
        FieldUpdate::Set(field, value) => {
            fields.insert(field, value);
        }
        FieldUpdate::Increment(field, delta) => {
            let current = fields.get(&field).and_then(Value::as_i64).unwrap_or(0);
            fields.insert(field, Value::from(current.saturating_add(delta)));
        }
        FieldUpdate::ArrayAppend(field, value) => match fields.get_mut(&field) {
            Some(Value::Array(values)) => values.push(value),
            _ => {
                fields.insert(field, Value::Array(vec![value]));
            }
        },
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    #[instrument(skip(self, fields))]
    async fn create(&self, collection: &str, fields: Fields) -> StoreResult<String> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let document = StoredDocument { version: 1, fields };
        self.documents
            .insert(DocumentKey::new(collection, &id), document);
        tracing::debug!("Stored document {}", id);
        Ok(id)
    }

    #[instrument(skip(self))]
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let document = self
            .documents
            .get(&DocumentKey::new(collection, id))
            .map(|stored| Document {
                id: id.to_string(),
                version: stored.version,
                fields: stored.fields.clone(),
            });
        Ok(document)
    }

    #[instrument(skip(self))]
    async fn get_all(&self, collection: &str) -> StoreResult<Vec<Document>> {
        let documents = self
            .documents
            .iter()
            .filter(|entry| entry.key().collection == collection)
            .map(|entry| Document {
                id: entry.key().id.clone(),
                version: entry.value().version,
                fields: entry.value().fields.clone(),
            })
            .collect();
        Ok(documents)
    }

    #[instrument(skip(self, updates))]
    async fn update(
        &self,
        collection: &str,
        id: &str,
        updates: Vec<FieldUpdate>,
        precondition: Precondition,
    ) -> StoreResult<()> {
        let Some(mut stored) = self.documents.get_mut(&DocumentKey::new(collection, id)) else {
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        };
        if let Precondition::Version(expected) = precondition {
            if stored.version != expected {
                return Err(StoreError::VersionMismatch {
                    expected,
                    actual: stored.version,
                });
            }
        }
        for update in updates {
            apply(&mut stored.fields, update);
        }
        stored.version += 1;
        tracing::debug!("Document {} now at version {}", id, stored.version);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[tokio::test]
    async fn created_documents_get_distinct_ids() {
        let store = MemoryStore::new();
        let a = store.create("items", Fields::new()).await.unwrap();
        let b = store.create("items", Fields::new()).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(1, store.get("items", &a).await.unwrap().unwrap().version);
    }

    #[tokio::test]
    async fn get_all_only_returns_the_requested_collection() {
        let store = MemoryStore::new();
        store.create("items", Fields::new()).await.unwrap();
        store.create("items", Fields::new()).await.unwrap();
        store.create("other", Fields::new()).await.unwrap();
        assert_eq!(2, store.get_all("items").await.unwrap().len());
        assert!(store.get_all("empty").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_never_creates_documents() {
        let store = MemoryStore::new();
        let result = store
            .update(
                "items",
                "missing",
                vec![FieldUpdate::Increment("likes".to_string(), 1)],
                Precondition::MustExist,
            )
            .await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
        assert!(store.get("items", "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_merges_fields() {
        let store = MemoryStore::new();
        let id = store
            .create("items", fields(json!({ "name": "a", "subtitle": "old" })))
            .await
            .unwrap();
        store
            .update(
                "items",
                &id,
                vec![FieldUpdate::Set("subtitle".to_string(), json!("new"))],
                Precondition::MustExist,
            )
            .await
            .unwrap();
        let document = store.get("items", &id).await.unwrap().unwrap();
        assert_eq!(json!({ "name": "a", "subtitle": "new" }), Value::Object(document.fields));
        assert_eq!(2, document.version);
    }

    #[tokio::test]
    async fn increment_initialises_absent_field() {
        let store = MemoryStore::new();
        let id = store.create("items", Fields::new()).await.unwrap();
        let increment = || vec![FieldUpdate::Increment("likes".to_string(), 1)];
        store
            .update("items", &id, increment(), Precondition::MustExist)
            .await
            .unwrap();
        store
            .update("items", &id, increment(), Precondition::MustExist)
            .await
            .unwrap();
        let document = store.get("items", &id).await.unwrap().unwrap();
        assert_eq!(Some(&json!(2)), document.fields.get("likes"));
    }

    #[tokio::test]
    async fn array_append_keeps_duplicates() {
        let store = MemoryStore::new();
        let id = store.create("items", Fields::new()).await.unwrap();
        for comment in ["a", "b", "a"] {
            store
                .update(
                    "items",
                    &id,
                    vec![FieldUpdate::ArrayAppend("comments".to_string(), json!(comment))],
                    Precondition::MustExist,
                )
                .await
                .unwrap();
        }
        let document = store.get("items", &id).await.unwrap().unwrap();
        assert_eq!(Some(&json!(["a", "b", "a"])), document.fields.get("comments"));
    }

    #[tokio::test]
    async fn stale_version_is_rejected() {
        let store = MemoryStore::new();
        let id = store.create("items", Fields::new()).await.unwrap();
        let set = || vec![FieldUpdate::Set("name".to_string(), json!("x"))];
        store
            .update("items", &id, set(), Precondition::Version(1))
            .await
            .unwrap();
        let result = store
            .update("items", &id, set(), Precondition::Version(1))
            .await;
        assert_eq!(
            Err(StoreError::VersionMismatch {
                expected: 1,
                actual: 2
            }),
            result
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_increments_are_not_lost() {
        let store = Arc::new(MemoryStore::new());
        let id = store.create("items", Fields::new()).await.unwrap();
        let tasks: Vec<_> = (0..200)
            .map(|_| {
                let store = store.clone();
                let id = id.clone();
                tokio::spawn(async move {
                    store
                        .update(
                            "items",
                            &id,
                            vec![FieldUpdate::Increment("likes".to_string(), 1)],
                            Precondition::MustExist,
                        )
                        .await
                })
            })
            .collect();
        for task in futures::future::join_all(tasks).await {
            task.unwrap().unwrap();
        }
        let document = store.get("items", &id).await.unwrap().unwrap();
        assert_eq!(Some(&json!(200)), document.fields.get("likes"));
        assert_eq!(201, document.version);
    }
}
