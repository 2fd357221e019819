//! Document store access.
//!
//! The pipeline never opens a store on its own. A handle implementing
//! [`DocumentStore`] is built once by the binary and passed to ingestion.

mod csv_store;
mod memory;

pub use csv_store::CsvDocumentStore;
pub use memory::InMemoryDocumentStore;

use crate::data::DataFrame;
use crate::errors::Result;
use async_trait::async_trait;

/// A collection-oriented record store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Exports every record of a collection as a frame.
    ///
    /// Missing readings are returned as nulls.
    async fn export_records(&self, database: &str, collection: &str) -> Result<DataFrame>;

    /// Appends records to a collection, creating it if needed.
    /// Returns the number of records inserted.
    async fn import_records(&self, database: &str, collection: &str, records: DataFrame) -> Result<usize>;

    /// Releases the handle. Further calls fail.
    async fn close(&self) -> Result<()>;
}
