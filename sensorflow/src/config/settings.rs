//! Process-wide settings loaded from YAML and the environment.

use crate::errors::{IoResultExt, Result, SensorflowError};
use crate::ml::ClassifierParams;
use crate::observability::LogFormat;
use crate::prediction::FailureMode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Prefix of the environment variables that override settings.
pub const ENV_PREFIX: &str = "SENSORFLOW_";

/// Top-level settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// File-system roots.
    #[serde(default)]
    pub paths: PathSettings,
    /// Document store location.
    #[serde(default)]
    pub store: StoreSettings,
    /// Ingestion tunables.
    #[serde(default)]
    pub ingestion: IngestionSettings,
    /// Validation tunables.
    #[serde(default)]
    pub validation: ValidationSettings,
    /// Trainer tunables.
    #[serde(default)]
    pub trainer: TrainerSettings,
    /// Evaluation tunables.
    #[serde(default)]
    pub evaluation: EvaluationSettings,
    /// Batch prediction directories.
    #[serde(default)]
    pub prediction: PredictionSettings,
    /// Remote mirror.
    #[serde(default)]
    pub sync: SyncSettings,
    /// Logging output.
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// File-system roots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathSettings {
    /// Parent of every run directory.
    #[serde(default = "default_artifact_root")]
    pub artifact_root: PathBuf,
    /// Deployment root holding versioned models.
    #[serde(default = "default_saved_models_root")]
    pub saved_models_root: PathBuf,
    /// Schema YAML file.
    #[serde(default = "default_schema_file")]
    pub schema_file: PathBuf,
}

fn default_artifact_root() -> PathBuf {
    PathBuf::from("artifact")
}

fn default_saved_models_root() -> PathBuf {
    PathBuf::from("saved_models")
}

fn default_schema_file() -> PathBuf {
    PathBuf::from("schema.yaml")
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            artifact_root: default_artifact_root(),
            saved_models_root: default_saved_models_root(),
            schema_file: default_schema_file(),
        }
    }
}

/// Document store location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Store location; for the CSV store, its root directory.
    #[serde(default = "default_store_uri")]
    pub uri: String,
    /// Database name.
    #[serde(default = "default_database")]
    pub database: String,
    /// Collection name.
    #[serde(default = "default_collection")]
    pub collection: String,
}

fn default_store_uri() -> String {
    "data/store".to_string()
}

fn default_database() -> String {
    "sensor".to_string()
}

fn default_collection() -> String {
    "sensor_readings".to_string()
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            uri: default_store_uri(),
            database: default_database(),
            collection: default_collection(),
        }
    }
}

/// Ingestion tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionSettings {
    /// Fraction of rows held out as the test split.
    #[serde(default = "default_test_size")]
    pub test_size: f64,
    /// Shuffle seed.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_test_size() -> f64 {
    0.2
}

fn default_seed() -> u64 {
    42
}

impl Default for IngestionSettings {
    fn default() -> Self {
        Self {
            test_size: default_test_size(),
            seed: default_seed(),
        }
    }
}

/// Validation tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationSettings {
    /// Columns with a higher percentage (0–100) of missing values are dropped.
    #[serde(default = "default_missing_threshold")]
    pub missing_threshold: f64,
    /// p-values above this mean "same distribution".
    #[serde(default = "default_drift_p_value")]
    pub drift_p_value: f64,
}

fn default_missing_threshold() -> f64 {
    70.0
}

fn default_drift_p_value() -> f64 {
    0.05
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            missing_threshold: default_missing_threshold(),
            drift_p_value: default_drift_p_value(),
        }
    }
}

/// Trainer tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerSettings {
    /// Minimum acceptable test F1.
    #[serde(default = "default_expected_score")]
    pub expected_score: f64,
    /// Maximum tolerated |train F1 − test F1|.
    #[serde(default = "default_overfitting_threshold")]
    pub overfitting_threshold: f64,
    /// Classifier hyper-parameters.
    #[serde(default)]
    pub classifier: ClassifierParams,
}

fn default_expected_score() -> f64 {
    0.7
}

fn default_overfitting_threshold() -> f64 {
    0.1
}

impl Default for TrainerSettings {
    fn default() -> Self {
        Self {
            expected_score: default_expected_score(),
            overfitting_threshold: default_overfitting_threshold(),
            classifier: ClassifierParams::default(),
        }
    }
}

/// Evaluation tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSettings {
    /// Minimum improvement over the deployed model.
    #[serde(default = "default_change_threshold")]
    pub change_threshold: f64,
}

fn default_change_threshold() -> f64 {
    0.01
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            change_threshold: default_change_threshold(),
        }
    }
}

/// Batch prediction directories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionSettings {
    /// Files waiting for prediction.
    #[serde(default = "default_inbox_dir")]
    pub inbox_dir: PathBuf,
    /// Prediction outputs.
    #[serde(default = "default_outbox_dir")]
    pub outbox_dir: PathBuf,
    /// Processed inputs.
    #[serde(default = "default_archive_dir")]
    pub archive_dir: PathBuf,
    /// What a bad input file does to the rest of the batch.
    #[serde(default)]
    pub failure_mode: FailureMode,
}

fn default_inbox_dir() -> PathBuf {
    PathBuf::from("data/inbox")
}

fn default_outbox_dir() -> PathBuf {
    PathBuf::from("data/outbox")
}

fn default_archive_dir() -> PathBuf {
    PathBuf::from("data/archive")
}

impl Default for PredictionSettings {
    fn default() -> Self {
        Self {
            inbox_dir: default_inbox_dir(),
            outbox_dir: default_outbox_dir(),
            archive_dir: default_archive_dir(),
            failure_mode: FailureMode::default(),
        }
    }
}

/// Remote mirror settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Mirror root; sync is disabled when unset.
    #[serde(default)]
    pub mirror_root: Option<PathBuf>,
}

/// Logging output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Text or JSON lines.
    #[serde(default)]
    pub format: LogFormat,
    /// Directory for per-process log files; stderr only when unset.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            log_dir: None,
        }
    }
}

impl Settings {
    /// Loads settings from an optional YAML file, then applies environment
    /// overrides and validates the result.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => {
                let raw = fs::read_to_string(path).at_path(path)?;
                Self::from_yaml_str(&raw)?
            }
            None => Self::default(),
        };
        settings.apply_env_overrides(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parses settings from YAML. Missing sections take their defaults.
    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw).map_err(|e| SensorflowError::config(e.to_string()))
    }

    /// Applies `SENSORFLOW_*` overrides read through `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(v) = var("STORE_URI") {
            self.store.uri = v;
        }
        if let Some(v) = var("DATABASE") {
            self.store.database = v;
        }
        if let Some(v) = var("COLLECTION") {
            self.store.collection = v;
        }
        if let Some(v) = var("ARTIFACT_ROOT") {
            self.paths.artifact_root = PathBuf::from(v);
        }
        if let Some(v) = var("SAVED_MODELS_ROOT") {
            self.paths.saved_models_root = PathBuf::from(v);
        }
        if let Some(v) = var("SCHEMA_FILE") {
            self.paths.schema_file = PathBuf::from(v);
        }
        if let Some(v) = var("SYNC_ROOT") {
            self.sync.mirror_root = Some(PathBuf::from(v));
        }
        if let Some(v) = var("LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = var("TEST_SIZE") {
            self.ingestion.test_size = v
                .parse()
                .map_err(|_| SensorflowError::config(format!("{ENV_PREFIX}TEST_SIZE is not a number: {v}")))?;
        }
        Ok(())
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<()> {
        let ingestion = &self.ingestion;
        if !(ingestion.test_size > 0.0 && ingestion.test_size < 1.0) {
            return Err(SensorflowError::config(format!(
                "ingestion.test_size must be in (0, 1), got {}",
                ingestion.test_size
            )));
        }
        if !(0.0..=100.0).contains(&self.validation.missing_threshold) {
            return Err(SensorflowError::config(format!(
                "validation.missing_threshold must be a percentage, got {}",
                self.validation.missing_threshold
            )));
        }
        if !(self.validation.drift_p_value > 0.0 && self.validation.drift_p_value < 1.0) {
            return Err(SensorflowError::config(format!(
                "validation.drift_p_value must be in (0, 1), got {}",
                self.validation.drift_p_value
            )));
        }
        if !(0.0..=1.0).contains(&self.trainer.expected_score) {
            return Err(SensorflowError::config(format!(
                "trainer.expected_score must be in [0, 1], got {}",
                self.trainer.expected_score
            )));
        }
        if !(self.trainer.overfitting_threshold >= 0.0) {
            return Err(SensorflowError::config(format!(
                "trainer.overfitting_threshold must be non-negative, got {}",
                self.trainer.overfitting_threshold
            )));
        }
        if !self.evaluation.change_threshold.is_finite() {
            return Err(SensorflowError::config("evaluation.change_threshold must be finite"));
        }
        self.trainer.classifier.validate()?;
        if self.store.database.is_empty() || self.store.collection.is_empty() {
            return Err(SensorflowError::config("store.database and store.collection are required"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_match_pipeline_thresholds() {
        let settings = Settings::default();
        assert_eq!(settings.ingestion.test_size, 0.2);
        assert_eq!(settings.validation.missing_threshold, 70.0);
        assert_eq!(settings.trainer.expected_score, 0.7);
        assert_eq!(settings.trainer.overfitting_threshold, 0.1);
        assert_eq!(settings.evaluation.change_threshold, 0.01);
        assert_eq!(settings.prediction.failure_mode, FailureMode::ContinueOnFailure);
        settings.validate().unwrap();
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let settings = Settings::from_yaml_str(
            "trainer:\n  expected_score: 0.8\nstore:\n  database: plant\n",
        )
        .unwrap();

        assert_eq!(settings.trainer.expected_score, 0.8);
        assert_eq!(settings.trainer.overfitting_threshold, 0.1);
        assert_eq!(settings.store.database, "plant");
        assert_eq!(settings.store.collection, "sensor_readings");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("SENSORFLOW_STORE_URI", "/srv/store"),
            ("SENSORFLOW_SYNC_ROOT", "/mnt/mirror"),
            ("SENSORFLOW_TEST_SIZE", "0.25"),
        ]
        .into_iter()
        .collect();
        let mut settings = Settings::default();
        settings
            .apply_env_overrides(|key| env.get(key).map(|v| (*v).to_string()))
            .unwrap();

        assert_eq!(settings.store.uri, "/srv/store");
        assert_eq!(settings.sync.mirror_root, Some(PathBuf::from("/mnt/mirror")));
        assert_eq!(settings.ingestion.test_size, 0.25);
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let mut settings = Settings::default();
        settings.validation.missing_threshold = 170.0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.ingestion.test_size = 1.0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_bad_env_number_is_config_error() {
        let mut settings = Settings::default();
        let err = settings
            .apply_env_overrides(|key| (key == "SENSORFLOW_TEST_SIZE").then(|| "lots".to_string()))
            .unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::Config);
    }
}
