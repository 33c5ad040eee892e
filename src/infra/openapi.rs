//! OpenAPI configuration.

use crate::feature::health::health_api;
use crate::feature::item::{item_api, item_repository};
use utoipa::OpenApi;

/// OpenApi configuration.
#[derive(OpenApi)]
#[openapi(
    paths(
        health_api::health,
        health_api::info,
        item_api::create_item,
        item_api::list_items,
        item_api::get_item,
        item_api::update_item,
        item_api::like_item,
        item_api::add_comment,
        item_api::delete_comment,
    ),
    components(
        schemas(
            health_api::AppInfo,
            item_repository::Item,
            item_repository::ItemFields,
            item_repository::NewComment,
            item_api::CreatedItem,
            item_api::Message,
            item_api::Success,
            crate::infra::error::ErrorBody
        )
    )
)]
#[derive(Clone, Copy, Debug)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_item_route_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/",
            "/info",
            "/items",
            "/items/{id}",
            "/items/{id}/like",
            "/items/{id}/comment",
            "/items/{id}/comments/{comment_index}",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{path} is missing");
        }
    }
}
