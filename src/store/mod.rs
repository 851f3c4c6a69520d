//!
//! Document store seam
//! -------------------
//! The portal persists everything in a hosted, schema-less document database addressed by
//! collection name and key. This module defines the narrow surface the portal core consumes
//! (`DocumentStore`) and an in-process implementation (`MemoryStore`) used by the CLI and tests.
//!
//! Calls return boxed futures so the store can live behind `Arc<dyn DocumentStore>` and be
//! shared by the session resolver, moderation and directory helpers.

mod memory;

pub use memory::MemoryStore;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::AppResult;

/// A single document within a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub key: String,
    pub data: serde_json::Value,
}

pub trait DocumentStore: Send + Sync {
    /// Point lookup. `Ok(None)` when no document exists under `key`.
    fn get_by_key<'a>(&'a self, collection: &'a str, key: &'a str) -> BoxFuture<'a, AppResult<Option<Document>>>;
    /// All documents in a collection, ordered by key.
    fn list<'a>(&'a self, collection: &'a str) -> BoxFuture<'a, AppResult<Vec<Document>>>;
    fn put<'a>(&'a self, collection: &'a str, key: &'a str, data: serde_json::Value) -> BoxFuture<'a, AppResult<()>>;
    /// Returns whether a document was removed.
    fn delete<'a>(&'a self, collection: &'a str, key: &'a str) -> BoxFuture<'a, AppResult<bool>>;
}

pub type SharedDocumentStore = Arc<dyn DocumentStore>;

/// Existence probe used by role resolution.
pub async fn exists(store: &dyn DocumentStore, collection: &str, key: &str) -> AppResult<bool> {
    Ok(store.get_by_key(collection, key).await?.is_some())
}
