//! Store backed by a directory of CSV files.

use super::DocumentStore;
use crate::data::{append, read_csv, write_csv, DataFrame};
use crate::errors::{Result, SensorflowError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// Keeps each collection in `<root>/<database>/<collection>.csv`.
#[derive(Debug)]
pub struct CsvDocumentStore {
    root: PathBuf,
    closed: AtomicBool,
}

impl CsvDocumentStore {
    /// Opens a store rooted at `root`. The directory is created lazily.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            closed: AtomicBool::new(false),
        }
    }

    /// Store root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File holding a collection.
    #[must_use]
    pub fn collection_path(&self, database: &str, collection: &str) -> PathBuf {
        self.root.join(database).join(format!("{collection}.csv"))
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SensorflowError::store("store handle is closed"));
        }
        Ok(())
    }
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| SensorflowError::store(format!("store task failed: {e}")))?
}

#[async_trait]
impl DocumentStore for CsvDocumentStore {
    async fn export_records(&self, database: &str, collection: &str) -> Result<DataFrame> {
        self.ensure_open()?;
        let path = self.collection_path(database, collection);
        if !path.is_file() {
            return Err(SensorflowError::store(format!(
                "collection '{database}.{collection}' not found at '{}'",
                path.display()
            )));
        }
        debug!(path = %path.display(), "exporting collection");
        let frame = blocking(move || read_csv(&path)).await?;
        info!(
            database,
            collection,
            rows = frame.height(),
            columns = frame.width(),
            "exported collection"
        );
        Ok(frame)
    }

    async fn import_records(&self, database: &str, collection: &str, records: DataFrame) -> Result<usize> {
        self.ensure_open()?;
        let path = self.collection_path(database, collection);
        let inserted = records.height();
        blocking(move || {
            let mut merged = if path.is_file() {
                read_csv(&path)?
            } else {
                DataFrame::default()
            };
            append(&mut merged, &records)?;
            write_csv(&mut merged, &path)
        })
        .await?;
        info!(database, collection, inserted, "imported records");
        Ok(inserted)
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
