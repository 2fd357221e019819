//! Core domain model types for sensorflow.
//!
//! This module contains the fundamental types used throughout the pipeline:
//! - Stage names and status
//! - Typed stage artifacts and their on-disk envelopes
//! - Lifecycle events

mod artifact;
mod event;
mod status;

pub use artifact::{
    Artifact, ArtifactEnvelope, ArtifactLedger, DataIngestionArtifact, DataTransformationArtifact,
    DataValidationArtifact, ModelEvaluationArtifact, ModelPusherArtifact, ModelTrainerArtifact,
    ARTIFACT_SCHEMA_VERSION,
};
pub use event::StageEvent;
pub use status::{StageName, StageStatus};
