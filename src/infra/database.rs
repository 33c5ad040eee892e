//! For interacting with the document store.
//!
//! The store is addressed by collection and document id. Documents are
//! loosely typed JSON objects; typed views are built on top of them by the
//! feature modules.

use super::{config::DatabaseConfig, memory_store::MemoryStore};
use async_trait::async_trait;
use std::{sync::Arc, time::Duration};

/// The fields of a document.
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// A common document store handle.
/// Cheap to clone and safe to share between requests.
pub type DocumentDb = Arc<dyn DocumentStore>;

/// The result of calling the document store.
pub type StoreResult<T> = Result<T, StoreError>;

/// A document as returned by the store.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    /// Assigned by the store on creation.
    pub id: String,
    /// Starts at 1 and increases with every update.
    pub version: u64,
    /// The document contents.
    pub fields: Fields,
}

/// A single mutation applied as part of an update.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldUpdate {
    /// Overwrites the field.
    Set(String, serde_json::Value),
    /// Adds `delta` to a numeric field without reading it first.
    /// An absent or non-numeric field becomes `delta`.
    Increment(String, i64),
    /// Appends to an array field, keeping duplicates.
    /// An absent or non-array field becomes a single element array.
    ArrayAppend(String, serde_json::Value),
}

/// What must hold for an update to be applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Precondition {
    /// The document must exist. Updates never create documents.
    MustExist,
    /// The document must exist and still be at this version.
    Version(u64),
}

/// Errors reported by a [`DocumentStore`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The document does not exist.
    #[error("document {collection}/{id} not found")]
    NotFound {
        /// The collection that was searched.
        collection: String,
        /// The missing id.
        id: String,
    },
    /// A [`Precondition::Version`] did not match.
    #[error("document changed concurrently (expected version {expected}, found {actual})")]
    VersionMismatch {
        /// The version the caller read.
        expected: u64,
        /// The version currently stored.
        actual: u64,
    },
    /// The store did not answer in time.
    #[error("document store timed out after {0:?}")]
    Timeout(Duration),
    /// The store failed to perform the operation.
    #[error("document store unavailable: {0}")]
    Unavailable(String),
}

/// Anything that can store documents.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Creates a new document and returns its id.
    async fn create(&self, collection: &str, fields: Fields) -> StoreResult<String>;

    /// Fetches a single document.
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    /// Fetches every document in a collection, in no particular order.
    async fn get_all(&self, collection: &str) -> StoreResult<Vec<Document>>;

    /// Atomically applies `updates` to one document.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        updates: Vec<FieldUpdate>,
        precondition: Precondition,
    ) -> StoreResult<()>;
}

/// Connects to the document store based on some configuration.
#[tracing::instrument]
pub fn init_db(config: &DatabaseConfig) -> DocumentDb {
    tracing::info!("Using in-memory document store");
    Arc::new(MemoryStore::default())
}
