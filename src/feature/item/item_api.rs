//! The item API implementation.

use crate::{
    feature::item::{
        item_repository::{Item, ItemFields, NewComment},
        item_service::ItemService,
    },
    infra::{
        error::{ApiResult, ClientError, ErrorBody},
        extract::Json,
        state::AppState,
        validation::Valid,
    },
};
use axum::{extract::State, Router};
use axum_extra::routing::{RouterExt, TypedPath};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;

/// The item API endpoints.
pub fn routes() -> Router<AppState> {
    Router::new()
        .typed_post(create_item)
        .typed_get(list_items)
        .typed_get(get_item)
        .typed_put(update_item)
        .typed_put(like_item)
        .typed_put(add_comment)
        .typed_delete(delete_comment)
}

#[derive(Deserialize, TypedPath)]
#[typed_path("/items", rejection(ClientError))]
pub struct Items;

#[derive(Deserialize, TypedPath)]
#[typed_path("/items/:id", rejection(ClientError))]
pub struct ItemsId(String);

#[derive(Deserialize, TypedPath)]
#[typed_path("/items/:id/like", rejection(ClientError))]
pub struct ItemsIdLike(String);

#[derive(Deserialize, TypedPath)]
#[typed_path("/items/:id/comment", rejection(ClientError))]
pub struct ItemsIdComment(String);

#[derive(Deserialize, TypedPath)]
#[typed_path("/items/:id/comments/:comment_index", rejection(ClientError))]
pub struct ItemsIdCommentsIndex {
    id: String,
    comment_index: String,
}

/// The response to creating an item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CreatedItem {
    /// The new item's id.
    pub id: String,
    /// A human readable confirmation.
    #[schema(example = "Item added successfully")]
    pub message: String,
}

/// A human readable confirmation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Message {
    /// The confirmation text.
    pub message: String,
}

impl Message {
    fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// Signals that an operation went through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Success {
    /// Always `true`.
    pub success: bool,
}

const SUCCESS: Success = Success { success: true };

/// Creates a new item.
#[utoipa::path(
    post,
    path = "/items",
    request_body = ItemFields,
    responses(
        (status = 201, description = "Created", body = CreatedItem),
        (status = 500, description = "Internal Server Error", body = ErrorBody),
    )
)]
#[instrument(skip_all)]
pub async fn create_item(
    Items: Items,
    State(items): State<ItemService>,
    Json(new_item): Json<ItemFields>,
) -> ApiResult<(StatusCode, Json<CreatedItem>)> {
    let id = items.create_item(new_item).await?;
    let created = CreatedItem {
        id,
        message: "Item added successfully".to_string(),
    };
    Ok((StatusCode::CREATED, Json(created)))
}

/// Lists all items.
#[utoipa::path(
    get,
    path = "/items",
    responses(
        (status = 200, description = "Success", body = [Item]),
        (status = 500, description = "Internal error", body = ErrorBody),
    )
)]
#[instrument(skip_all)]
pub async fn list_items(Items: Items, State(items): State<ItemService>) -> ApiResult<Json<Vec<Item>>> {
    Ok(Json(items.list_items().await?))
}

/// Gets an item.
#[utoipa::path(
    get,
    path = "/items/{id}",
    params(("id" = String, Path, description = "The item's id")),
    responses(
        (status = 200, description = "Ok", body = Item),
        (status = 404, description = "Not Found", body = ErrorBody),
        (status = 500, description = "Internal Server Error", body = ErrorBody),
    )
)]
#[instrument(skip(items))]
pub async fn get_item(
    ItemsId(id): ItemsId,
    State(items): State<ItemService>,
) -> ApiResult<Json<Item>> {
    Ok(Json(items.read_item(&id).await?))
}

/// Updates the supplied fields of an item.
#[utoipa::path(
    put,
    path = "/items/{id}",
    params(("id" = String, Path, description = "The item's id")),
    request_body = ItemFields,
    responses(
        (status = 200, description = "Ok", body = Message),
        (status = 404, description = "Not Found", body = ErrorBody),
        (status = 500, description = "Internal Server Error", body = ErrorBody),
    )
)]
#[instrument(skip(items))]
pub async fn update_item(
    ItemsId(id): ItemsId,
    State(items): State<ItemService>,
    Json(fields): Json<ItemFields>,
) -> ApiResult<Json<Message>> {
    items.update_item(&id, fields).await?;
    Ok(Json(Message::new("Item updated successfully")))
}

/// Likes an item.
#[utoipa::path(
    put,
    path = "/items/{id}/like",
    params(("id" = String, Path, description = "The item's id")),
    responses(
        (status = 200, description = "Ok", body = Success),
        (status = 404, description = "Not Found", body = ErrorBody),
        (status = 500, description = "Internal Server Error", body = ErrorBody),
    )
)]
#[instrument(skip(items))]
pub async fn like_item(
    ItemsIdLike(id): ItemsIdLike,
    State(items): State<ItemService>,
) -> ApiResult<Json<Success>> {
    items.like_item(&id).await?;
    Ok(Json(SUCCESS))
}

/// Comments on an item.
#[utoipa::path(
    put,
    path = "/items/{id}/comment",
    params(("id" = String, Path, description = "The item's id")),
    request_body = NewComment,
    responses(
        (status = 200, description = "Ok", body = Success),
        (status = 404, description = "Not Found", body = ErrorBody),
        (status = 422, description = "Empty comment", body = ErrorBody),
        (status = 500, description = "Internal Server Error", body = ErrorBody),
    )
)]
#[instrument(skip(items))]
pub async fn add_comment(
    ItemsIdComment(id): ItemsIdComment,
    State(items): State<ItemService>,
    Json(new_comment): Json<NewComment>,
) -> ApiResult<Json<Success>> {
    let new_comment = Valid::new(new_comment)?;
    items.add_comment(&id, new_comment).await?;
    Ok(Json(SUCCESS))
}

/// Deletes the comment at a position.
#[utoipa::path(
    delete,
    path = "/items/{id}/comments/{comment_index}",
    params(
        ("id" = String, Path, description = "The item's id"),
        ("comment_index" = i64, Path, description = "Zero-based position of the comment"),
    ),
    responses(
        (status = 200, description = "Ok", body = Message),
        (status = 400, description = "Invalid comment index", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody),
        (status = 409, description = "The item changed concurrently", body = ErrorBody),
        (status = 500, description = "Internal Server Error", body = ErrorBody),
    )
)]
#[instrument(skip_all, fields(id = %path.id, comment_index = %path.comment_index))]
pub async fn delete_comment(
    path: ItemsIdCommentsIndex,
    State(items): State<ItemService>,
) -> ApiResult<Json<Message>> {
    items.delete_comment(&path.id, &path.comment_index).await?;
    Ok(Json(Message::new("Comment deleted successfully")))
}
