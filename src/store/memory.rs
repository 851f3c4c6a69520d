use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use futures_util::future::{self, BoxFuture, FutureExt};
use parking_lot::RwLock;
use tracing::debug;

use super::{Document, DocumentStore};
use crate::error::{AppError, AppResult};

type Collection = BTreeMap<String, serde_json::Value>;

/// In-process document store. Collections are created on first write.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
    // collections that reject every call, to model an unreachable or locked-down backend
    failing: RwLock<HashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    /// Seed from `{ "<collection>": { "<key>": { ... } } }`.
    pub fn from_json(seed: &serde_json::Value) -> AppResult<Self> {
        let Some(obj) = seed.as_object() else {
            return Err(AppError::user("invalid_seed", "seed must be a JSON object of collections"));
        };
        let store = Self::new();
        {
            let mut cols = store.collections.write();
            for (name, docs) in obj {
                let Some(docs) = docs.as_object() else {
                    return Err(AppError::user("invalid_seed".to_string(), format!("collection '{}' must be an object keyed by document id", name)));
                };
                let col = cols.entry(name.clone()).or_default();
                for (key, data) in docs {
                    col.insert(key.clone(), data.clone());
                }
            }
        }
        Ok(store)
    }

    pub fn from_json_file(path: &Path) -> AppResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let seed: serde_json::Value = serde_json::from_str(&text)?;
        let store = Self::from_json(&seed)?;
        debug!(target: "alumni_portal::store", "seeded memory store from '{}' collections={}", path.display(), store.collections.read().len());
        Ok(store)
    }

    pub fn insert(&self, collection: &str, key: &str, data: serde_json::Value) {
        self.collections.write().entry(collection.to_string()).or_default().insert(key.to_string(), data);
    }

    /// Make every call against `collection` fail until `recover` is called.
    pub fn fail_collection(&self, collection: &str) {
        self.failing.write().insert(collection.to_string());
    }

    pub fn recover(&self, collection: &str) {
        self.failing.write().remove(collection);
    }

    fn check(&self, collection: &str) -> AppResult<()> {
        if self.failing.read().contains(collection) {
            return Err(AppError::store("unavailable".to_string(), format!("collection '{}' is unavailable", collection)));
        }
        Ok(())
    }

    fn get_sync(&self, collection: &str, key: &str) -> AppResult<Option<Document>> {
        self.check(collection)?;
        let cols = self.collections.read();
        Ok(cols
            .get(collection)
            .and_then(|c| c.get(key))
            .map(|data| Document { key: key.to_string(), data: data.clone() }))
    }

    fn list_sync(&self, collection: &str) -> AppResult<Vec<Document>> {
        self.check(collection)?;
        let cols = self.collections.read();
        Ok(cols
            .get(collection)
            .map(|c| c.iter().map(|(k, v)| Document { key: k.clone(), data: v.clone() }).collect())
            .unwrap_or_default())
    }

    fn put_sync(&self, collection: &str, key: &str, data: serde_json::Value) -> AppResult<()> {
        self.check(collection)?;
        self.insert(collection, key, data);
        Ok(())
    }

    fn delete_sync(&self, collection: &str, key: &str) -> AppResult<bool> {
        self.check(collection)?;
        let mut cols = self.collections.write();
        Ok(cols.get_mut(collection).map(|c| c.remove(key).is_some()).unwrap_or(false))
    }
}

impl DocumentStore for MemoryStore {
    fn get_by_key<'a>(&'a self, collection: &'a str, key: &'a str) -> BoxFuture<'a, AppResult<Option<Document>>> {
        future::ready(self.get_sync(collection, key)).boxed()
    }

    fn list<'a>(&'a self, collection: &'a str) -> BoxFuture<'a, AppResult<Vec<Document>>> {
        future::ready(self.list_sync(collection)).boxed()
    }

    fn put<'a>(&'a self, collection: &'a str, key: &'a str, data: serde_json::Value) -> BoxFuture<'a, AppResult<()>> {
        future::ready(self.put_sync(collection, key, data)).boxed()
    }

    fn delete<'a>(&'a self, collection: &'a str, key: &'a str) -> BoxFuture<'a, AppResult<bool>> {
        future::ready(self.delete_sync(collection, key)).boxed()
    }
}
