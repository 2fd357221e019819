//! Error types for the sensorflow pipeline.
//!
//! Every fatal condition maps to an [`ErrorKind`]. Errors raised inside a
//! stage are wrapped with the originating [`StageName`] by the orchestrator
//! before they reach the caller, so an operator always sees which stage
//! failed and why.

use crate::core::StageName;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = SensorflowError> = std::result::Result<T, E>;

/// Coarse classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The data does not satisfy the schema.
    Schema,
    /// The model does not reach the expected score.
    Underfitting,
    /// The train/test score gap is too large.
    Overfitting,
    /// Reading or writing a file failed.
    Io,
    /// Encoding or decoding a persisted object failed.
    Serialization,
    /// The document store failed.
    Store,
    /// Fitting, applying or loading a model failed.
    Model,
    /// The configuration is invalid.
    Config,
    /// A batch prediction input could not be processed.
    Prediction,
    /// The stage sequence was violated.
    Pipeline,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Schema => "schema",
            Self::Underfitting => "underfitting",
            Self::Overfitting => "overfitting",
            Self::Io => "io",
            Self::Serialization => "serialization",
            Self::Store => "store",
            Self::Model => "model",
            Self::Config => "config",
            Self::Prediction => "prediction",
            Self::Pipeline => "pipeline",
        };
        f.write_str(name)
    }
}

/// The main error type for sensorflow operations.
#[derive(Debug, Error)]
pub enum SensorflowError {
    /// A schema gate failed during data validation.
    #[error("{0}")]
    Schema(#[from] SchemaViolation),

    /// The model does not meet the minimum test score.
    #[error(
        "Model is not good as it is not able to give expected score {expected}: model actual score {actual}"
    )]
    Underfitting {
        /// The configured minimum score.
        expected: f64,
        /// The test score achieved.
        actual: f64,
    },

    /// The generalization gap is larger than tolerated.
    #[error("Train and test score diff {gap} is more than overfitting threshold {threshold}")]
    Overfitting {
        /// Absolute train/test score difference.
        gap: f64,
        /// The configured tolerance.
        threshold: f64,
    },

    /// An IO error tied to a path.
    #[error("IO error at '{}': {source}", path.display())]
    Io {
        /// The path being accessed.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Document store error.
    #[error("Document store error: {0}")]
    Store(String),

    /// Model fitting, loading or inference error.
    #[error("Model error: {0}")]
    Model(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A prediction input is unusable.
    #[error("Prediction error: {0}")]
    Prediction(String),

    /// Stage ordering or artifact contract error.
    #[error("Pipeline error: {0}")]
    Pipeline(String),

    /// An error raised inside a named stage.
    #[error("Stage '{stage}' failed: {source}")]
    Stage {
        /// The stage that raised the error.
        stage: StageName,
        /// The underlying error.
        #[source]
        source: Box<SensorflowError>,
    },
}

impl SensorflowError {
    /// Creates an IO error for a path.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Creates a model error.
    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model(msg.into())
    }

    /// Creates a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a store error.
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Creates a prediction error.
    pub fn prediction(msg: impl Into<String>) -> Self {
        Self::Prediction(msg.into())
    }

    /// Creates a pipeline error.
    pub fn pipeline(msg: impl Into<String>) -> Self {
        Self::Pipeline(msg.into())
    }

    /// Creates a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Attaches the originating stage. An error that already carries a stage
    /// keeps its original one.
    #[must_use]
    pub fn in_stage(self, stage: StageName) -> Self {
        match self {
            Self::Stage { .. } => self,
            other => Self::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// Returns the error kind, looking through stage wrappers.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Schema(_) => ErrorKind::Schema,
            Self::Underfitting { .. } => ErrorKind::Underfitting,
            Self::Overfitting { .. } => ErrorKind::Overfitting,
            Self::Io { .. } => ErrorKind::Io,
            Self::Serialization(_) => ErrorKind::Serialization,
            Self::Store(_) => ErrorKind::Store,
            Self::Model(_) => ErrorKind::Model,
            Self::Config(_) => ErrorKind::Config,
            Self::Prediction(_) => ErrorKind::Prediction,
            Self::Pipeline(_) => ErrorKind::Pipeline,
            Self::Stage { source, .. } => source.kind(),
        }
    }

    /// Returns the originating stage, if known.
    #[must_use]
    pub fn stage(&self) -> Option<StageName> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Returns the innermost error.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Stage { source, .. } => source.root(),
            other => other,
        }
    }

    /// Converts to a dictionary representation for event payloads.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("kind".to_string(), serde_json::json!(self.kind().to_string()));
        map.insert("message".to_string(), serde_json::json!(self.root().to_string()));
        if let Some(stage) = self.stage() {
            map.insert("stage".to_string(), serde_json::json!(stage.as_str()));
        }
        if let Self::Schema(violation) = self.root() {
            map.insert("frame".to_string(), serde_json::json!(violation.frame()));
        }
        map
    }
}

impl From<serde_json::Error> for SensorflowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for SensorflowError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<bincode::Error> for SensorflowError {
    fn from(err: bincode::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<polars::prelude::PolarsError> for SensorflowError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        Self::Serialization(format!("polars: {err}"))
    }
}

/// A fatal data-validation gate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaViolation {
    /// Every column was dropped for missing values.
    #[error("No column left in {frame} frame hence stopping this pipeline")]
    NoColumnsLeft {
        /// Which frame ("train" or "test").
        frame: String,
    },

    /// Schema-required columns are absent.
    #[error("Required columns are not available in {frame} frame: {}", missing.join(", "))]
    MissingRequiredColumns {
        /// Which frame ("train" or "test").
        frame: String,
        /// The missing column names.
        missing: Vec<String>,
    },

    /// Train and test frames disagree on column count.
    #[error("Train and test frames do not have equal columns: train has {train}, test has {test}")]
    ColumnCountMismatch {
        /// Train column count.
        train: usize,
        /// Test column count.
        test: usize,
    },
}

impl SchemaViolation {
    /// Returns the frame the violation refers to.
    #[must_use]
    pub fn frame(&self) -> &str {
        match self {
            Self::NoColumnsLeft { frame } | Self::MissingRequiredColumns { frame, .. } => frame,
            Self::ColumnCountMismatch { .. } => "train/test",
        }
    }
}

/// Extension for attaching stage context to results.
pub trait StageResultExt<T> {
    /// Wraps the error, if any, with the originating stage.
    fn in_stage(self, stage: StageName) -> Result<T>;
}

impl<T> StageResultExt<T> for Result<T> {
    fn in_stage(self, stage: StageName) -> Result<T> {
        self.map_err(|err| err.in_stage(stage))
    }
}

/// Extension for attaching a path to IO results.
pub trait IoResultExt<T> {
    /// Converts an IO error into [`SensorflowError::Io`] for `path`.
    fn at_path(self, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn at_path(self, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|err| SensorflowError::io(path, err))
    }
}
