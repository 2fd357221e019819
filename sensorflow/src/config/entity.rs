//! Per-run and per-stage configuration records.
//!
//! Every path a stage touches is derived here from the run directory, so two
//! runs never share output locations.

use super::Settings;
use crate::context::RunIdentity;
use crate::core::{ArtifactLedger, StageName};
use crate::errors::{IoResultExt, Result, SensorflowError};
use crate::ml::ClassifierParams;
use crate::prediction::FailureMode;
use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Raw and validated train split file name.
pub const TRAIN_FILE_NAME: &str = "train.csv";
/// Raw and validated test split file name.
pub const TEST_FILE_NAME: &str = "test.csv";
/// Transformed train array file name.
pub const TRANSFORMED_TRAIN_FILE_NAME: &str = "train.bin";
/// Transformed test array file name.
pub const TRANSFORMED_TEST_FILE_NAME: &str = "test.bin";
/// Fitted feature transformer file name.
pub const TRANSFORMER_OBJECT_FILE_NAME: &str = "transformer.bin";
/// Fitted target encoder file name.
pub const TARGET_ENCODER_OBJECT_FILE_NAME: &str = "target_encoder.bin";
/// Fitted model file name.
pub const MODEL_FILE_NAME: &str = "model.bin";
/// Validation report file name.
pub const REPORT_FILE_NAME: &str = "report.yaml";
/// Run identity file written into every run directory.
pub const RUN_IDENTITY_FILE_NAME: &str = "run.json";

const MAX_CLAIM_ATTEMPTS: u32 = 1000;

/// Root of one training run.
#[derive(Debug, Clone)]
pub struct TrainingPipelineConfig {
    identity: RunIdentity,
    artifact_dir: PathBuf,
}

impl TrainingPipelineConfig {
    /// Claims a fresh run directory under `artifact_root`.
    ///
    /// The directory is created exclusively. If the timestamped name is taken
    /// a numeric suffix is appended.
    pub fn claim(artifact_root: &Path, identity: RunIdentity) -> Result<Self> {
        fs::create_dir_all(artifact_root).at_path(artifact_root)?;
        let base = identity.dir_name();

        for attempt in 0..MAX_CLAIM_ATTEMPTS {
            let name = if attempt == 0 {
                base.clone()
            } else {
                format!("{base}_{attempt}")
            };
            let candidate = artifact_root.join(name);
            match fs::create_dir(&candidate) {
                Ok(()) => {
                    debug!(artifact_dir = %candidate.display(), "claimed run directory");
                    let config = Self {
                        identity,
                        artifact_dir: candidate,
                    };
                    config.write_identity()?;
                    return Ok(config);
                }
                Err(e) if e.kind() == IoErrorKind::AlreadyExists => {}
                Err(e) => return Err(SensorflowError::io(&candidate, e)),
            }
        }

        Err(SensorflowError::pipeline(format!(
            "could not claim a run directory for '{base}' under '{}'",
            artifact_root.display()
        )))
    }

    /// Reopens an existing run directory.
    pub fn resume(artifact_dir: &Path) -> Result<Self> {
        let path = artifact_dir.join(RUN_IDENTITY_FILE_NAME);
        let raw = fs::read_to_string(&path).at_path(&path)?;
        let identity: RunIdentity = serde_json::from_str(&raw)?;
        Ok(Self {
            identity,
            artifact_dir: artifact_dir.to_path_buf(),
        })
    }

    fn write_identity(&self) -> Result<()> {
        let path = self.artifact_dir.join(RUN_IDENTITY_FILE_NAME);
        let json = serde_json::to_string_pretty(&self.identity)?;
        fs::write(&path, json).at_path(&path)
    }

    /// Run identity.
    #[must_use]
    pub const fn identity(&self) -> &RunIdentity {
        &self.identity
    }

    /// Run directory.
    #[must_use]
    pub fn artifact_dir(&self) -> &Path {
        &self.artifact_dir
    }

    /// Working directory of a stage.
    #[must_use]
    pub fn stage_dir(&self, stage: StageName) -> PathBuf {
        self.artifact_dir.join(stage.as_str())
    }

    /// Artifact ledger of this run.
    #[must_use]
    pub fn ledger(&self) -> ArtifactLedger {
        ArtifactLedger::new(self.artifact_dir.join("artifacts"), self.identity.id_str())
    }
}

/// Data ingestion paths and split parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct DataIngestionConfig {
    /// Directory holding the split files.
    pub dataset_dir: PathBuf,
    /// Raw train split.
    pub train_file_path: PathBuf,
    /// Raw test split.
    pub test_file_path: PathBuf,
    /// Store database.
    pub database_name: String,
    /// Store collection.
    pub collection_name: String,
    /// Test fraction.
    pub test_size: f64,
    /// Shuffle seed.
    pub seed: u64,
}

impl DataIngestionConfig {
    /// Derives the config for a run.
    #[must_use]
    pub fn new(pipeline: &TrainingPipelineConfig, settings: &Settings) -> Self {
        let dataset_dir = pipeline.stage_dir(StageName::DataIngestion).join("dataset");
        Self {
            train_file_path: dataset_dir.join(TRAIN_FILE_NAME),
            test_file_path: dataset_dir.join(TEST_FILE_NAME),
            dataset_dir,
            database_name: settings.store.database.clone(),
            collection_name: settings.store.collection.clone(),
            test_size: settings.ingestion.test_size,
            seed: settings.ingestion.seed,
        }
    }
}

/// Data validation paths and thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct DataValidationConfig {
    /// YAML report.
    pub report_file_path: PathBuf,
    /// Cleaned train frame when validation passes.
    pub valid_train_file_path: PathBuf,
    /// Cleaned test frame when validation passes.
    pub valid_test_file_path: PathBuf,
    /// Cleaned train frame when validation fails.
    pub invalid_train_file_path: PathBuf,
    /// Cleaned test frame when validation fails.
    pub invalid_test_file_path: PathBuf,
    /// Missing-value percentage above which a column is dropped.
    pub missing_threshold: f64,
    /// Drift p-value cut-off.
    pub drift_p_value: f64,
}

impl DataValidationConfig {
    /// Derives the config for a run.
    #[must_use]
    pub fn new(pipeline: &TrainingPipelineConfig, settings: &Settings) -> Self {
        let dir = pipeline.stage_dir(StageName::DataValidation);
        let valid = dir.join("valid");
        let invalid = dir.join("invalid");
        Self {
            report_file_path: dir.join("report").join(REPORT_FILE_NAME),
            valid_train_file_path: valid.join(TRAIN_FILE_NAME),
            valid_test_file_path: valid.join(TEST_FILE_NAME),
            invalid_train_file_path: invalid.join(TRAIN_FILE_NAME),
            invalid_test_file_path: invalid.join(TEST_FILE_NAME),
            missing_threshold: settings.validation.missing_threshold,
            drift_p_value: settings.validation.drift_p_value,
        }
    }
}

/// Data transformation output paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataTransformationConfig {
    /// Fitted feature transformer.
    pub transform_object_path: PathBuf,
    /// Transformed train array.
    pub transformed_train_path: PathBuf,
    /// Transformed test array.
    pub transformed_test_path: PathBuf,
    /// Fitted target encoder.
    pub target_encoder_path: PathBuf,
}

impl DataTransformationConfig {
    /// Derives the config for a run.
    #[must_use]
    pub fn new(pipeline: &TrainingPipelineConfig) -> Self {
        let dir = pipeline.stage_dir(StageName::DataTransformation);
        Self {
            transform_object_path: dir.join("transformer").join(TRANSFORMER_OBJECT_FILE_NAME),
            transformed_train_path: dir.join("transformed").join(TRANSFORMED_TRAIN_FILE_NAME),
            transformed_test_path: dir.join("transformed").join(TRANSFORMED_TEST_FILE_NAME),
            target_encoder_path: dir.join("target_encoder").join(TARGET_ENCODER_OBJECT_FILE_NAME),
        }
    }
}

/// Model trainer output path and quality gates.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelTrainerConfig {
    /// Fitted model.
    pub model_path: PathBuf,
    /// Minimum test F1.
    pub expected_score: f64,
    /// Maximum train/test F1 gap.
    pub overfitting_threshold: f64,
    /// Classifier hyper-parameters.
    pub classifier: ClassifierParams,
}

impl ModelTrainerConfig {
    /// Derives the config for a run.
    #[must_use]
    pub fn new(pipeline: &TrainingPipelineConfig, settings: &Settings) -> Self {
        Self {
            model_path: pipeline
                .stage_dir(StageName::ModelTrainer)
                .join("model")
                .join(MODEL_FILE_NAME),
            expected_score: settings.trainer.expected_score,
            overfitting_threshold: settings.trainer.overfitting_threshold,
            classifier: settings.trainer.classifier.clone(),
        }
    }
}

/// Model evaluation threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelEvaluationConfig {
    /// Minimum improvement for acceptance.
    pub change_threshold: f64,
}

impl ModelEvaluationConfig {
    /// Derives the config for a run.
    #[must_use]
    pub const fn new(settings: &Settings) -> Self {
        Self {
            change_threshold: settings.evaluation.change_threshold,
        }
    }
}

/// Model pusher destinations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPusherConfig {
    /// Deployment root.
    pub saved_model_dir: PathBuf,
    /// Run-scoped copy of the pushed files.
    pub pusher_model_dir: PathBuf,
}

impl ModelPusherConfig {
    /// Derives the config for a run.
    #[must_use]
    pub fn new(pipeline: &TrainingPipelineConfig, settings: &Settings) -> Self {
        Self {
            saved_model_dir: settings.paths.saved_models_root.clone(),
            pusher_model_dir: pipeline.stage_dir(StageName::ModelPusher).join("saved_models"),
        }
    }
}

/// Batch prediction directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPredictionConfig {
    /// Files waiting for prediction.
    pub inbox_dir: PathBuf,
    /// Prediction outputs.
    pub outbox_dir: PathBuf,
    /// Processed inputs.
    pub archive_dir: PathBuf,
    /// Deployment root to load the model from.
    pub saved_model_dir: PathBuf,
    /// Per-file failure handling.
    pub failure_mode: FailureMode,
}

impl BatchPredictionConfig {
    /// Derives the config from settings.
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        Self {
            inbox_dir: settings.prediction.inbox_dir.clone(),
            outbox_dir: settings.prediction.outbox_dir.clone(),
            archive_dir: settings.prediction.archive_dir.clone(),
            saved_model_dir: settings.paths.saved_models_root.clone(),
            failure_mode: settings.prediction.failure_mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn fixed_identity() -> RunIdentity {
        RunIdentity::at(Utc.with_ymd_and_hms(2026, 10, 19, 14, 3, 59).unwrap())
    }

    #[test]
    fn test_claim_uses_timestamp_name() {
        let tmp = TempDir::new().unwrap();
        let config = TrainingPipelineConfig::claim(tmp.path(), fixed_identity()).unwrap();

        assert_eq!(config.artifact_dir(), tmp.path().join("10_19_2026_14_03_59"));
        assert!(config.artifact_dir().join(RUN_IDENTITY_FILE_NAME).is_file());
    }

    #[test]
    fn test_claim_never_shares_a_directory() {
        let tmp = TempDir::new().unwrap();
        let a = TrainingPipelineConfig::claim(tmp.path(), fixed_identity()).unwrap();
        let b = TrainingPipelineConfig::claim(tmp.path(), fixed_identity()).unwrap();
        let c = TrainingPipelineConfig::claim(tmp.path(), fixed_identity()).unwrap();

        assert_ne!(a.artifact_dir(), b.artifact_dir());
        assert_eq!(b.artifact_dir(), tmp.path().join("10_19_2026_14_03_59_1"));
        assert_eq!(c.artifact_dir(), tmp.path().join("10_19_2026_14_03_59_2"));
    }

    #[test]
    fn test_resume_restores_identity() {
        let tmp = TempDir::new().unwrap();
        let claimed = TrainingPipelineConfig::claim(tmp.path(), fixed_identity()).unwrap();
        let resumed = TrainingPipelineConfig::resume(claimed.artifact_dir()).unwrap();

        assert_eq!(resumed.identity(), claimed.identity());
        assert_eq!(resumed.ledger().dir(), claimed.ledger().dir());
    }

    #[test]
    fn test_stage_paths_live_under_run_dir() {
        let tmp = TempDir::new().unwrap();
        let pipeline = TrainingPipelineConfig::claim(tmp.path(), fixed_identity()).unwrap();
        let settings = Settings::default();

        let ingestion = DataIngestionConfig::new(&pipeline, &settings);
        assert!(ingestion
            .train_file_path
            .ends_with("data_ingestion/dataset/train.csv"));
        assert_eq!(ingestion.test_size, 0.2);

        let validation = DataValidationConfig::new(&pipeline, &settings);
        assert!(validation
            .report_file_path
            .ends_with("data_validation/report/report.yaml"));
        assert!(validation
            .invalid_test_file_path
            .ends_with("data_validation/invalid/test.csv"));

        let trainer = ModelTrainerConfig::new(&pipeline, &settings);
        assert!(trainer.model_path.starts_with(pipeline.artifact_dir()));

        let pusher = ModelPusherConfig::new(&pipeline, &settings);
        assert_eq!(pusher.saved_model_dir, PathBuf::from("saved_models"));
        assert!(pusher
            .pusher_model_dir
            .ends_with("model_pusher/saved_models"));
    }
}
