//! In-process store for tests and dry runs.

use super::DocumentStore;
use crate::data::{append, DataFrame};
use crate::errors::{Result, SensorflowError};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Keeps collections in memory.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    collections: RwLock<HashMap<(String, String), DataFrame>>,
    closed: AtomicBool,
}

impl InMemoryDocumentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a collection.
    #[must_use]
    pub fn with_collection(self, database: &str, collection: &str, frame: DataFrame) -> Self {
        self.collections
            .write()
            .insert((database.to_string(), collection.to_string()), frame);
        self
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SensorflowError::store("store handle is closed"));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn export_records(&self, database: &str, collection: &str) -> Result<DataFrame> {
        self.ensure_open()?;
        self.collections
            .read()
            .get(&(database.to_string(), collection.to_string()))
            .cloned()
            .ok_or_else(|| SensorflowError::store(format!("collection '{database}.{collection}' not found")))
    }

    async fn import_records(&self, database: &str, collection: &str, records: DataFrame) -> Result<usize> {
        self.ensure_open()?;
        let inserted = records.height();
        let mut collections = self.collections.write();
        let existing = collections
            .entry((database.to_string(), collection.to_string()))
            .or_default();
        append(existing, &records)?;
        Ok(inserted)
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
