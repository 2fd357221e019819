//! # Sensorflow
//!
//! Training and batch-prediction pipeline for sensor fault classification.
//!
//! Sensorflow exports sensor readings from a document store and runs them
//! through six stages:
//!
//! - **Data ingestion**: export the collection and split train/test
//! - **Data validation**: drop sparse columns, check the schema, report drift
//! - **Data transformation**: robust scaling and label encoding
//! - **Model trainer**: fit a classifier and apply quality gates
//! - **Model evaluation**: compare against the deployed model
//! - **Model pusher**: publish an accepted model as a new numbered version
//!
//! Batch prediction picks up CSV files from an inbox and scores them with
//! the latest deployed version.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sensorflow::prelude::*;
//! use std::sync::Arc;
//!
//! let settings = Settings::load(None)?;
//! let schema = Schema::from_file(&settings.paths.schema_file)?;
//! let store = Arc::new(CsvDocumentStore::new(&settings.store.uri));
//!
//! let summary = TrainingPipeline::new(settings, schema, store).start().await?;
//! println!("pushed: {:?}", summary.pushed_version);
//! ```

#![deny(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::cast_precision_loss
)]

pub mod components;
pub mod config;
pub mod context;
pub mod core;
pub mod data;
pub mod errors;
pub mod events;
pub mod ml;
pub mod observability;
pub mod pipeline;
pub mod prediction;
pub mod registry;
pub mod stages;
pub mod store;
pub mod sync;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{BatchPredictionConfig, Schema, Settings, TrainingPipelineConfig};
    pub use crate::context::RunIdentity;
    pub use crate::core::{
        Artifact, ArtifactLedger, DataIngestionArtifact, DataTransformationArtifact,
        DataValidationArtifact, ModelEvaluationArtifact, ModelPusherArtifact, ModelTrainerArtifact,
        StageEvent, StageName, StageStatus,
    };
    pub use crate::data::DataFrame;
    pub use crate::errors::{ErrorKind, Result, SensorflowError};
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::observability::init_logging;
    pub use crate::pipeline::{RunSummary, TrainingPipeline};
    pub use crate::prediction::{BatchPrediction, BatchPredictionReport, FailureMode};
    pub use crate::registry::{ModelResolver, ModelVersion};
    pub use crate::stages::Stage;
    pub use crate::store::{CsvDocumentStore, DocumentStore};
    pub use crate::sync::RemoteSync;
    pub use crate::utils::{iso_timestamp, Timestamp};
}
