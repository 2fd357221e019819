//! Stage names and execution status.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The stages of the training pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    /// Pull records from the document store and split them.
    DataIngestion,
    /// Schema conformance, missing-value pruning and drift report.
    DataValidation,
    /// Fit and apply the feature transformer and target encoder.
    DataTransformation,
    /// Fit the classifier and enforce quality gates.
    ModelTrainer,
    /// Compare against the latest deployed model.
    ModelEvaluation,
    /// Publish an accepted model.
    ModelPusher,
}

impl StageName {
    /// All stages in execution order.
    pub const ALL: [Self; 6] = [
        Self::DataIngestion,
        Self::DataValidation,
        Self::DataTransformation,
        Self::ModelTrainer,
        Self::ModelEvaluation,
        Self::ModelPusher,
    ];

    /// Returns the snake_case name, also used for artifact directories.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DataIngestion => "data_ingestion",
            Self::DataValidation => "data_validation",
            Self::DataTransformation => "data_transformation",
            Self::ModelTrainer => "model_trainer",
            Self::ModelEvaluation => "model_evaluation",
            Self::ModelPusher => "model_pusher",
        }
    }

    /// Returns the stages whose artifacts this stage consumes.
    #[must_use]
    pub const fn dependencies(&self) -> &'static [Self] {
        match self {
            Self::DataIngestion => &[],
            Self::DataValidation => &[Self::DataIngestion],
            Self::DataTransformation => &[Self::DataValidation],
            Self::ModelTrainer => &[Self::DataTransformation],
            Self::ModelEvaluation => &[
                Self::DataValidation,
                Self::DataTransformation,
                Self::ModelTrainer,
            ],
            Self::ModelPusher => &[
                Self::DataTransformation,
                Self::ModelTrainer,
                Self::ModelEvaluation,
            ],
        }
    }

    /// Stages that run after this one, in order.
    pub fn downstream(self) -> impl Iterator<Item = Self> {
        Self::ALL.into_iter().skip_while(move |stage| *stage != self).skip(1)
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('-', "_").to_lowercase();
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str() == normalized)
            .ok_or_else(|| format!("unknown stage '{s}'"))
    }
}

/// The execution status of a stage within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Stage has not started.
    #[default]
    Pending,
    /// Stage is running.
    Running,
    /// Stage returned its artifact.
    Completed,
    /// Stage failed and aborted the run.
    Failed,
    /// Stage was not needed (e.g. pusher after a rejection).
    Skipped,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

impl StageStatus {
    /// Returns true if the status represents a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Skipped)
    }

    /// Returns true if the status indicates success.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Completed | Self::Skipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_matches_dependencies() {
        for (idx, stage) in StageName::ALL.iter().enumerate() {
            for dep in stage.dependencies() {
                let dep_idx = StageName::ALL.iter().position(|s| s == dep).unwrap();
                assert!(dep_idx < idx, "{dep} must run before {stage}");
            }
        }
    }

    #[test]
    fn test_downstream_stages() {
        let after: Vec<_> = StageName::ModelTrainer.downstream().collect();
        assert_eq!(after, vec![StageName::ModelEvaluation, StageName::ModelPusher]);
        assert_eq!(StageName::ModelPusher.downstream().count(), 0);
        assert!(StageName::ModelPusher.dependencies().contains(&StageName::ModelEvaluation));
    }

    #[test]
    fn test_stage_name_parse() {
        assert_eq!("data-validation".parse::<StageName>().unwrap(), StageName::DataValidation);
        assert_eq!("MODEL_PUSHER".parse::<StageName>().unwrap(), StageName::ModelPusher);
        assert!("feature_store".parse::<StageName>().is_err());
    }

    #[test]
    fn test_stage_status_terminal() {
        assert!(StageStatus::Completed.is_terminal());
        assert!(StageStatus::Skipped.is_success());
        assert!(!StageStatus::Failed.is_success());
        assert!(!StageStatus::Running.is_terminal());
    }

    #[test]
    fn test_stage_name_serialize() {
        let json = serde_json::to_string(&StageName::ModelEvaluation).unwrap();
        assert_eq!(json, r#""model_evaluation""#);
    }
}
