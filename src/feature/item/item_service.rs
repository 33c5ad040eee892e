//! A service for interacting with items.

use super::item_repository::{Item, ItemFields, ItemRepository, NewComment, VersionedItem};
use crate::infra::{
    error::{ApiResult, ClientError},
    validation::Valid,
};
use chrono::Utc;
use tracing::instrument;

/// Reads and mutates items.
///
/// Likes and comments are added with atomic store primitives. Deleting a
/// comment reads the item first and writes back only if nobody changed it
/// in between.
#[derive(Clone, Debug)]
pub struct ItemService {
    repository: ItemRepository,
}

/// Parses a comment index given as text.
fn parse_comment_index(raw: &str) -> ApiResult<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| ClientError::BadRequest(format!("Invalid comment index: {raw}")).into())
}

impl ItemService {
    /// Creates a new service.
    pub fn new(repository: ItemRepository) -> Self {
        Self { repository }
    }

    /// Creates a new item and returns its id.
    #[instrument(skip(self))]
    pub async fn create_item(&self, new_item: ItemFields) -> ApiResult<String> {
        self.repository.create_item(new_item, Utc::now()).await
    }

    /// Lists all items.
    #[instrument(skip(self))]
    pub async fn list_items(&self) -> ApiResult<Vec<Item>> {
        self.repository.list_items().await
    }

    /// Reads an item.
    #[instrument(skip(self))]
    pub async fn read_item(&self, id: &str) -> ApiResult<Item> {
        let VersionedItem { item, .. } = self
            .repository
            .fetch_item(id)
            .await?
            .ok_or(ClientError::NotFound)?;
        Ok(item)
    }

    /// Overwrites the supplied fields of an item.
    #[instrument(skip(self))]
    pub async fn update_item(&self, id: &str, fields: ItemFields) -> ApiResult<()> {
        self.repository.merge_item(id, fields, Utc::now()).await
    }

    /// Adds one like to an item.
    #[instrument(skip(self))]
    pub async fn like_item(&self, id: &str) -> ApiResult<()> {
        self.repository.increment_likes(id).await
    }

    /// Appends a comment to an item.
    #[instrument(skip(self))]
    pub async fn add_comment(&self, id: &str, comment: Valid<NewComment>) -> ApiResult<()> {
        let NewComment { comment } = comment.into_inner();
        self.repository.append_comment(id, comment).await
    }

    /// Removes the comment at `comment_index`, keeping the order of the rest.
    #[instrument(skip(self))]
    pub async fn delete_comment(&self, id: &str, comment_index: &str) -> ApiResult<()> {
        let index = parse_comment_index(comment_index)?;
        let VersionedItem { item, version } = self
            .repository
            .fetch_item(id)
            .await?
            .ok_or(ClientError::NotFound)?;
        let mut comments = item.comments;
        let position = usize::try_from(index)
            .ok()
            .filter(|&position| position < comments.len())
            .ok_or_else(|| {
                tracing::warn!("Comment index {} out of bounds", index);
                ClientError::BadRequest(format!(
                    "Invalid comment index: {index} (item has {} comments)",
                    comments.len()
                ))
            })?;
        comments.remove(position);
        self.repository
            .replace_comments(id, comments, version)
            .await
    }
}
