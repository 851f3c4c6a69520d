//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::Notify;

use alumni_portal::identity::{ErrorReporter, Identity};
use alumni_portal::store::{Document, DocumentStore, MemoryStore};
use alumni_portal::{AppError, AppResult};

pub fn ident(id: &str) -> Identity {
    Identity::new(id.to_string(), format!("{}@alumni.example", id), id.to_uppercase())
}

/// Parks a single point lookup until the test releases it.
#[derive(Default)]
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

/// MemoryStore wrapper whose gated lookups complete only when released,
/// letting tests control completion order across resolution attempts.
pub struct GatedStore {
    pub inner: MemoryStore,
    gates: Mutex<HashMap<(String, String), Arc<Gate>>>,
}

impl GatedStore {
    pub fn new(inner: MemoryStore) -> Self { Self { inner, gates: Mutex::new(HashMap::new()) } }

    pub fn gate(&self, collection: &str, key: &str) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        self.gates.lock().insert((collection.to_string(), key.to_string()), gate.clone());
        gate
    }
}

impl DocumentStore for GatedStore {
    fn get_by_key<'a>(&'a self, collection: &'a str, key: &'a str) -> BoxFuture<'a, AppResult<Option<Document>>> {
        Box::pin(async move {
            let gate = self.gates.lock().remove(&(collection.to_string(), key.to_string()));
            if let Some(gate) = gate {
                gate.entered.notify_one();
                gate.release.notified().await;
            }
            self.inner.get_by_key(collection, key).await
        })
    }

    fn list<'a>(&'a self, collection: &'a str) -> BoxFuture<'a, AppResult<Vec<Document>>> {
        self.inner.list(collection)
    }

    fn put<'a>(&'a self, collection: &'a str, key: &'a str, data: serde_json::Value) -> BoxFuture<'a, AppResult<()>> {
        self.inner.put(collection, key, data)
    }

    fn delete<'a>(&'a self, collection: &'a str, key: &'a str) -> BoxFuture<'a, AppResult<bool>> {
        self.inner.delete(collection, key)
    }
}

#[derive(Default)]
pub struct CountingReporter {
    pub count: AtomicUsize,
    pub last: Mutex<Option<AppError>>,
}

impl CountingReporter {
    pub fn count(&self) -> usize { self.count.load(Ordering::SeqCst) }
}

impl ErrorReporter for CountingReporter {
    fn report(&self, _context: &str, err: &AppError) {
        self.count.fetch_add(1, Ordering::SeqCst);
        *self.last.lock() = Some(err.clone());
    }
}
