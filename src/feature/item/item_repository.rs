//! Types and functions for storing and loading items from the document store.

use crate::infra::{
    database::{
        Document, DocumentDb, FieldUpdate, Fields, Precondition, StoreError, StoreResult,
    },
    error::ApiResult,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{fmt, future::Future, time::Duration};
use tracing::{instrument, Instrument};
use utoipa::ToSchema;
use validator::Validate;

const COMMENTS: &str = "comments";
const LIKES: &str = "likes";
const CREATED_AT: &str = "createdAt";
const UPDATED_AT: &str = "updatedAt";

/// The client supplied fields of an item.
///
/// Used both for creating and updating. Absent fields are left alone,
/// unknown fields are ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ItemFields {
    /// The item's name.
    #[schema(example = "Sunset")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// A link to the item's image.
    #[schema(example = "https://example.com/sunset.png")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// The item's description.
    #[schema(example = "A very orange sunset")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Replaces all comments of the item.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<String>>,
    /// The item's subtitle.
    #[schema(example = "Taken in June")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
}

impl ItemFields {
    /// The supplied fields as document fields.
    fn into_document_fields(self) -> ApiResult<Fields> {
        match serde_json::to_value(self)? {
            Value::Object(fields) => Ok(fields),
            _ => Ok(Fields::new()),
        }
    }
}

/// A comment to add to an item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema, Validate)]
pub struct NewComment {
    /// The comment text. Identical comments are kept.
    #[schema(example = "Beautiful!")]
    #[validate(length(min = 1))]
    pub comment: String,
}

/// An existing item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// The item's id.
    pub id: String,
    /// The item's name.
    #[schema(example = "Sunset")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// A link to the item's image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// The item's description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The item's subtitle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    /// Comments in the order they were added.
    #[serde(default)]
    pub comments: Vec<String>,
    /// How many times the item was liked.
    #[serde(default)]
    pub likes: u64,
    /// When the item was created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// When the item was last updated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<Document> for Item {
    type Error = serde_json::Error;

    fn try_from(document: Document) -> Result<Self, Self::Error> {
        let mut fields = document.fields;
        fields.insert("id".to_string(), Value::String(document.id));
        serde_json::from_value(Value::Object(fields))
    }
}

/// An item together with the document version it was read at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionedItem {
    /// The item.
    pub item: Item,
    /// The version of the underlying document.
    pub version: u64,
}

fn timestamp(now: DateTime<Utc>) -> ApiResult<Value> {
    Ok(serde_json::to_value(now)?)
}

/// An item repository.
///
/// Every store call is bounded by `timeout`.
#[derive(Clone)]
pub struct ItemRepository {
    db: DocumentDb,
    collection: String,
    timeout: Duration,
}

impl fmt::Debug for ItemRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemRepository")
            .field("collection", &self.collection)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ItemRepository {
    /// Creates a new repository.
    pub fn new(db: DocumentDb, collection: String, timeout: Duration) -> Self {
        Self {
            db,
            collection,
            timeout,
        }
    }

    async fn bounded<T>(&self, call: impl Future<Output = StoreResult<T>>) -> StoreResult<T> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| StoreError::Timeout(self.timeout))?
    }

    /// Creates a new item and returns its id.
    #[instrument(skip(self))]
    pub async fn create_item(&self, new_item: ItemFields, now: DateTime<Utc>) -> ApiResult<String> {
        tracing::info!("Creating item {:?}", new_item);
        let mut fields = new_item.into_document_fields()?;
        fields.insert(CREATED_AT.to_string(), timestamp(now)?);
        let id = self
            .bounded(self.db.create(&self.collection, fields))
            .await?;
        tracing::info!("Created item {}", id);
        Ok(id)
    }

    /// Reads an item along with its version.
    #[instrument(skip(self))]
    pub async fn fetch_item(&self, id: &str) -> ApiResult<Option<VersionedItem>> {
        tracing::info!("Reading item");
        let document = self
            .bounded(self.db.get(&self.collection, id))
            .instrument(tracing::info_span!("get"))
            .await?;
        let item = match document {
            Some(document) => {
                let version = document.version;
                let item = Item::try_from(document)?;
                Some(VersionedItem { item, version })
            }
            None => None,
        };
        tracing::info!("Found item: {:?}", item);
        Ok(item)
    }

    /// Lists all items.
    #[instrument(skip(self))]
    pub async fn list_items(&self) -> ApiResult<Vec<Item>> {
        tracing::info!("Listing items");
        let items = self
            .bounded(self.db.get_all(&self.collection))
            .instrument(tracing::info_span!("get_all"))
            .await?
            .into_iter()
            .map(Item::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        tracing::info!("Listed {} items", items.len());
        Ok(items)
    }

    /// Overwrites the supplied fields of an existing item.
    #[instrument(skip(self))]
    pub async fn merge_item(
        &self,
        id: &str,
        fields: ItemFields,
        now: DateTime<Utc>,
    ) -> ApiResult<()> {
        tracing::info!("Updating item {:?}", fields);
        let mut updates: Vec<FieldUpdate> = fields
            .into_document_fields()?
            .into_iter()
            .map(|(field, value)| FieldUpdate::Set(field, value))
            .collect();
        updates.push(FieldUpdate::Set(UPDATED_AT.to_string(), timestamp(now)?));
        self.update(id, updates, Precondition::MustExist).await?;
        tracing::info!("Updated item");
        Ok(())
    }

    /// Atomically adds one like.
    #[instrument(skip(self))]
    pub async fn increment_likes(&self, id: &str) -> ApiResult<()> {
        let updates = vec![FieldUpdate::Increment(LIKES.to_string(), 1)];
        self.update(id, updates, Precondition::MustExist).await?;
        tracing::info!("Liked item");
        Ok(())
    }

    /// Atomically appends a comment.
    #[instrument(skip(self))]
    pub async fn append_comment(&self, id: &str, comment: String) -> ApiResult<()> {
        let updates = vec![FieldUpdate::ArrayAppend(
            COMMENTS.to_string(),
            Value::String(comment),
        )];
        self.update(id, updates, Precondition::MustExist).await?;
        tracing::info!("Commented on item");
        Ok(())
    }

    /// Replaces all comments, provided the item is still at `version`.
    #[instrument(skip(self))]
    pub async fn replace_comments(
        &self,
        id: &str,
        comments: Vec<String>,
        version: u64,
    ) -> ApiResult<()> {
        let updates = vec![FieldUpdate::Set(COMMENTS.to_string(), comments.into())];
        self.update(id, updates, Precondition::Version(version))
            .await?;
        tracing::info!("Replaced comments");
        Ok(())
    }

    async fn update(
        &self,
        id: &str,
        updates: Vec<FieldUpdate>,
        precondition: Precondition,
    ) -> StoreResult<()> {
        let result = self
            .bounded(self.db.update(&self.collection, id, updates, precondition))
            .instrument(tracing::info_span!("update"))
            .await;
        if let Err(StoreError::NotFound { .. }) = &result {
            tracing::warn!("Item not found");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absent_fields_are_not_written() {
        let fields = ItemFields {
            name: Some("Foo".to_string()),
            ..Default::default()
        };
        let fields = fields.into_document_fields().unwrap();
        assert_eq!(json!({ "name": "Foo" }), Value::Object(fields));
    }

    #[test]
    fn unknown_request_fields_are_dropped() {
        let fields: ItemFields =
            serde_json::from_str(r#"{ "name": "Foo", "likes": 1000, "id": "forged" }"#).unwrap();
        assert_eq!(
            ItemFields {
                name: Some("Foo".to_string()),
                ..Default::default()
            },
            fields
        );
    }

    #[test]
    fn document_without_comments_or_likes_is_an_empty_item() {
        let document = Document {
            id: "abc".to_string(),
            version: 1,
            fields: Fields::new(),
        };
        let item = Item::try_from(document).unwrap();
        assert_eq!("abc", item.id);
        assert!(item.comments.is_empty());
        assert_eq!(0, item.likes);
        assert_eq!(None, item.created_at);
    }

    #[test]
    fn malformed_document_is_rejected() {
        let mut fields = Fields::new();
        fields.insert(COMMENTS.to_string(), json!("not a list"));
        let document = Document {
            id: "abc".to_string(),
            version: 1,
            fields,
        };
        assert!(Item::try_from(document).is_err());
    }

    #[test]
    fn items_serialize_with_camel_case_timestamps() {
        let now = Utc::now();
        let item = Item {
            id: "abc".to_string(),
            name: None,
            image: None,
            description: None,
            subtitle: None,
            comments: vec![],
            likes: 0,
            created_at: Some(now),
            updated_at: None,
        };
        let value = serde_json::to_value(&item).unwrap();
        assert!(value.get("createdAt").is_some());
        assert!(value.get("updatedAt").is_none());
        assert!(value.get("name").is_none());
    }
}
