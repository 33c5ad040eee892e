//! Global application state.
//!
//! Used for access to common resources such as the document store.

use super::{config::Config, database::DocumentDb};
use crate::feature::item::{item_repository::ItemRepository, item_service::ItemService};
use axum::extract::FromRef;

/// Global application state.
#[derive(Clone, FromRef)]
pub struct AppState {
    items: ItemService,
}

impl AppState {
    /// Constructs a new [`AppState`].
    pub fn new(db: DocumentDb, config: &Config) -> Self {
        let repository = ItemRepository::new(
            db,
            config.database.collection.clone(),
            config.database.timeout,
        );
        Self {
            items: ItemService::new(repository),
        }
    }

    /// Returns the item service.
    pub fn items(&self) -> &ItemService {
        &self.items
    }
}
