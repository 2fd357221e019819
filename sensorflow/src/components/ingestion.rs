//! Data ingestion: export from the document store and split.

use crate::config::DataIngestionConfig;
use crate::core::DataIngestionArtifact;
use crate::data::{train_test_split, write_csv};
use crate::errors::{Result, SensorflowError};
use crate::stages::Stage;
use crate::store::DocumentStore;
use crate::utils::fs::ensure_dir;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::{info, instrument};

/// Exports the sensor collection and writes the train/test split.
pub struct DataIngestion {
    config: DataIngestionConfig,
    store: Arc<dyn DocumentStore>,
}

impl fmt::Debug for DataIngestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataIngestion")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DataIngestion {
    /// Creates the stage around an open store handle.
    #[must_use]
    pub fn new(config: DataIngestionConfig, store: Arc<dyn DocumentStore>) -> Self {
        Self { config, store }
    }

    /// Runs ingestion.
    #[instrument(skip(self), fields(database = %self.config.database_name, collection = %self.config.collection_name))]
    pub async fn initiate(&self) -> Result<DataIngestionArtifact> {
        let frame = self
            .store
            .export_records(&self.config.database_name, &self.config.collection_name)
            .await?;
        if frame.height() == 0 {
            return Err(SensorflowError::store(format!(
                "collection '{}.{}' is empty",
                self.config.database_name, self.config.collection_name
            )));
        }

        let missing: usize = frame.get_columns().iter().map(|s| s.null_count()).sum();
        info!(rows = frame.height(), columns = frame.width(), missing, "exported collection");

        let (mut train, mut test) = train_test_split(&frame, self.config.test_size, self.config.seed)?;

        ensure_dir(&self.config.dataset_dir)?;
        write_csv(&mut train, &self.config.train_file_path)?;
        write_csv(&mut test, &self.config.test_file_path)?;
        info!(train_rows = train.height(), test_rows = test.height(), "wrote train and test splits");

        Ok(DataIngestionArtifact {
            train_file_path: self.config.train_file_path.clone(),
            test_file_path: self.config.test_file_path.clone(),
        })
    }
}

#[async_trait]
impl Stage for DataIngestion {
    type Input = ();
    type Output = DataIngestionArtifact;

    async fn execute(&self, _input: ()) -> Result<DataIngestionArtifact> {
        self.initiate().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{missing_percentage, read_csv, read_csv_bytes, NA_SENTINEL};
    use crate::store::{InMemoryDocumentStore, MockDocumentStore};
    use crate::testing::SensorFrameBuilder;
    use std::path::Path;
    use tempfile::TempDir;

    fn config(root: &Path) -> DataIngestionConfig {
        let dataset_dir = root.join("data_ingestion").join("dataset");
        DataIngestionConfig {
            train_file_path: dataset_dir.join("train.csv"),
            test_file_path: dataset_dir.join("test.csv"),
            dataset_dir,
            database_name: "sensor".to_string(),
            collection_name: "readings".to_string(),
            test_size: 0.2,
            seed: 42,
        }
    }

    #[tokio::test]
    async fn test_ingestion_splits_and_keeps_missing_readings() {
        let tmp = TempDir::new().unwrap();
        let frame = SensorFrameBuilder::new()
            .rows(50)
            .missing_rate(0.1)
            .empty_column("cd_000")
            .build()
            .unwrap();
        let store = Arc::new(InMemoryDocumentStore::new().with_collection("sensor", "readings", frame));

        let artifact = DataIngestion::new(config(tmp.path()), store).initiate().await.unwrap();

        let train = read_csv(&artifact.train_file_path).unwrap();
        let test = read_csv(&artifact.test_file_path).unwrap();
        assert_eq!(train.height(), 40);
        assert_eq!(test.height(), 10);
        assert_eq!(missing_percentage(&train, "class"), Some(0.0));
        assert!(missing_percentage(&train, "cd_000").unwrap() >= 99.9);

        let raw = std::fs::read_to_string(&artifact.train_file_path).unwrap();
        assert!(raw.contains(NA_SENTINEL));
    }

    #[tokio::test]
    async fn test_empty_export_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let mut store = MockDocumentStore::new();
        store
            .expect_export_records()
            .times(1)
            .returning(|_, _| Ok(read_csv_bytes("class,aa_000\n").unwrap()));

        let err = DataIngestion::new(config(tmp.path()), Arc::new(store))
            .initiate()
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::Store);
        assert!(!tmp.path().join("data_ingestion").exists());
    }

    #[tokio::test]
    async fn test_store_error_propagates() {
        let tmp = TempDir::new().unwrap();
        let mut store = MockDocumentStore::new();
        store
            .expect_export_records()
            .returning(|_, _| Err(SensorflowError::store("connection refused")));

        let err = DataIngestion::new(config(tmp.path()), Arc::new(store))
            .execute(())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_single_row_cannot_split() {
        let tmp = TempDir::new().unwrap();
        let frame = SensorFrameBuilder::new().rows(1).build().unwrap();
        let store = Arc::new(InMemoryDocumentStore::new().with_collection("sensor", "readings", frame));

        assert!(DataIngestion::new(config(tmp.path()), store).initiate().await.is_err());
    }
}
