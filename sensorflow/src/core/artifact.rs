//! Typed artifacts produced by each pipeline stage.
//!
//! Artifacts only carry paths and metrics. The files they point to are the
//! durable source of truth; the [`ArtifactLedger`] persists each artifact as
//! a versioned JSON envelope so a stage can be run as a separate process
//! from nothing but its inbound envelopes.

use super::StageName;
use crate::errors::{IoResultExt, Result, SensorflowError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};

/// Current envelope format version.
pub const ARTIFACT_SCHEMA_VERSION: u32 = 1;

/// A stage output record.
pub trait Artifact: Serialize + DeserializeOwned + Debug + Clone + Send + Sync + 'static {
    /// Stage that produces this artifact.
    const STAGE: StageName;
}

/// Output of data ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataIngestionArtifact {
    /// Raw train split.
    pub train_file_path: PathBuf,
    /// Raw test split.
    pub test_file_path: PathBuf,
}

impl Artifact for DataIngestionArtifact {
    const STAGE: StageName = StageName::DataIngestion;
}

/// Output of data validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataValidationArtifact {
    /// YAML report with dropped columns and drift results.
    pub report_file_path: PathBuf,
    /// Validated train frame.
    pub train_file_path: PathBuf,
    /// Validated test frame.
    pub test_file_path: PathBuf,
    /// True iff every fatal gate passed.
    pub status: bool,
}

impl Artifact for DataValidationArtifact {
    const STAGE: StageName = StageName::DataValidation;
}

/// Output of data transformation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataTransformationArtifact {
    /// Fitted feature transformer.
    pub transform_object_path: PathBuf,
    /// Transformed train array, label in the last column.
    pub transformed_train_path: PathBuf,
    /// Transformed test array, label in the last column.
    pub transformed_test_path: PathBuf,
    /// Fitted target encoder.
    pub target_encoder_path: PathBuf,
}

impl Artifact for DataTransformationArtifact {
    const STAGE: StageName = StageName::DataTransformation;
}

/// Output of the model trainer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelTrainerArtifact {
    /// Fitted model.
    pub model_path: PathBuf,
    /// F1 on the train split, in `[0, 1]`.
    pub f1_train_score: f64,
    /// F1 on the test split, in `[0, 1]`.
    pub f1_test_score: f64,
}

impl Artifact for ModelTrainerArtifact {
    const STAGE: StageName = StageName::ModelTrainer;
}

/// Output of model evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEvaluationArtifact {
    /// Whether the new model may be pushed.
    pub is_model_accepted: bool,
    /// New score minus deployed score. `None` when nothing was deployed.
    pub improved_accuracy: Option<f64>,
}

impl Artifact for ModelEvaluationArtifact {
    const STAGE: StageName = StageName::ModelEvaluation;
}

/// Output of the model pusher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelPusherArtifact {
    /// Deployment root holding every version.
    pub saved_model_dir: PathBuf,
    /// Version number assigned to this push.
    pub version: u64,
    /// Pushed model.
    pub model_path: PathBuf,
    /// Pushed transformer.
    pub transformer_path: PathBuf,
    /// Pushed target encoder.
    pub target_encoder_path: PathBuf,
}

impl Artifact for ModelPusherArtifact {
    const STAGE: StageName = StageName::ModelPusher;
}

/// Versioned on-disk form of an artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactEnvelope<T> {
    /// Envelope format version.
    pub schema_version: u32,
    /// Producing stage.
    pub kind: StageName,
    /// Run that produced the artifact.
    pub run_id: String,
    /// When the artifact was recorded (ISO 8601).
    pub created_at: String,
    /// The artifact itself.
    pub payload: T,
}

impl<T: Artifact> ArtifactEnvelope<T> {
    /// Wraps an artifact.
    #[must_use]
    pub fn new(run_id: impl Into<String>, payload: T) -> Self {
        Self {
            schema_version: ARTIFACT_SCHEMA_VERSION,
            kind: T::STAGE,
            run_id: run_id.into(),
            created_at: crate::utils::iso_timestamp(),
            payload,
        }
    }

    fn check(&self) -> Result<()> {
        if self.schema_version != ARTIFACT_SCHEMA_VERSION {
            return Err(SensorflowError::serialization(format!(
                "unsupported artifact schema version {} (expected {})",
                self.schema_version, ARTIFACT_SCHEMA_VERSION
            )));
        }
        if self.kind != T::STAGE {
            return Err(SensorflowError::pipeline(format!(
                "artifact envelope holds '{}' but '{}' was requested",
                self.kind,
                T::STAGE
            )));
        }
        Ok(())
    }
}

/// Reads and writes artifact envelopes under `<run_root>/artifacts`.
#[derive(Debug, Clone)]
pub struct ArtifactLedger {
    dir: PathBuf,
    run_id: String,
}

impl ArtifactLedger {
    /// Creates a ledger rooted at `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, run_id: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            run_id: run_id.into(),
        }
    }

    /// Returns the ledger directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the envelope path for a stage.
    #[must_use]
    pub fn path_for(&self, stage: StageName) -> PathBuf {
        self.dir.join(format!("{}.json", stage.as_str()))
    }

    /// Persists an artifact. Envelopes of later stages are removed, since
    /// they were derived from the artifact being replaced.
    pub fn record<T: Artifact>(&self, artifact: &T) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir).at_path(&self.dir)?;
        for later in T::STAGE.downstream() {
            let stale = self.path_for(later);
            if stale.is_file() {
                fs::remove_file(&stale).at_path(&stale)?;
            }
        }
        let path = self.path_for(T::STAGE);
        let envelope = ArtifactEnvelope::new(self.run_id.clone(), artifact.clone());
        let json = serde_json::to_string_pretty(&envelope)?;
        fs::write(&path, json).at_path(&path)?;
        Ok(path)
    }

    /// Loads a previously recorded artifact.
    pub fn load<T: Artifact>(&self) -> Result<T> {
        let path = self.path_for(T::STAGE);
        let raw = fs::read_to_string(&path).at_path(&path)?;
        let envelope: ArtifactEnvelope<T> = serde_json::from_str(&raw)?;
        envelope.check()?;
        Ok(envelope.payload)
    }

    /// Returns true if an artifact for `stage` exists.
    #[must_use]
    pub fn contains(&self, stage: StageName) -> bool {
        self.path_for(stage).is_file()
    }
}
