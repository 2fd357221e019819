//! Model evaluation: compare the candidate against the deployed model.

use crate::config::ModelEvaluationConfig;
use crate::core::{
    DataTransformationArtifact, DataValidationArtifact, ModelEvaluationArtifact, ModelTrainerArtifact,
};
use crate::data::{label_column, read_csv, DataFrame};
use crate::errors::Result;
use crate::ml::{f1_score, load_object, Classifier, FeatureTransformer, LogisticRegression, TargetEncoder};
use crate::registry::{DeployedModel, ModelResolver};
use crate::stages::Stage;
use async_trait::async_trait;
use tracing::{info, instrument};

/// Artifacts evaluation reads.
#[derive(Debug, Clone)]
pub struct EvaluationInputs {
    /// Validated frames.
    pub validation: DataValidationArtifact,
    /// Candidate preprocessing objects.
    pub transformation: DataTransformationArtifact,
    /// Candidate model.
    pub trainer: ModelTrainerArtifact,
}

/// F1 of `model` on `frame`, each model scored through its own preprocessing.
pub fn score_model(
    model: &LogisticRegression,
    transformer: &FeatureTransformer,
    encoder: &TargetEncoder,
    frame: &DataFrame,
    target_column: &str,
) -> Result<f64> {
    let y_true = encoder.transform(&label_column(frame, target_column)?)?;
    let x = transformer.transform(frame)?;
    let y_pred = model.predict(&x)?;
    Ok(f1_score(&y_true, &y_pred.to_vec()))
}

/// Accepts the candidate iff it beats the deployed model by more than the
/// configured margin.
#[derive(Debug)]
pub struct ModelEvaluation {
    config: ModelEvaluationConfig,
    resolver: ModelResolver,
    target_column: String,
}

impl ModelEvaluation {
    /// Creates the stage.
    #[must_use]
    pub fn new(config: ModelEvaluationConfig, resolver: ModelResolver, target_column: impl Into<String>) -> Self {
        Self {
            config,
            resolver,
            target_column: target_column.into(),
        }
    }

    /// Runs the comparison.
    #[instrument(skip_all, fields(root = %self.resolver.root().display()))]
    pub fn initiate(&self, inputs: &EvaluationInputs) -> Result<ModelEvaluationArtifact> {
        let Some(resolved) = self.resolver.latest()? else {
            info!("no deployed model, accepting candidate");
            return Ok(ModelEvaluationArtifact {
                is_model_accepted: true,
                improved_accuracy: None,
            });
        };

        let deployed = DeployedModel::load(&resolved)?;
        let test = read_csv(&inputs.validation.test_file_path)?;

        let deployed_score = score_model(
            &deployed.model,
            &deployed.transformer,
            &deployed.target_encoder,
            &test,
            &self.target_column,
        )?;

        let model: LogisticRegression = load_object(&inputs.trainer.model_path)?;
        let transformer: FeatureTransformer = load_object(&inputs.transformation.transform_object_path)?;
        let encoder: TargetEncoder = load_object(&inputs.transformation.target_encoder_path)?;
        let candidate_score = score_model(&model, &transformer, &encoder, &test, &self.target_column)?;

        let improved_accuracy = candidate_score - deployed_score;
        let is_model_accepted = improved_accuracy > self.config.change_threshold;
        info!(
            deployed_version = %deployed.version,
            deployed_score,
            candidate_score,
            improved_accuracy,
            is_model_accepted,
            "compared against deployed model"
        );

        Ok(ModelEvaluationArtifact {
            is_model_accepted,
            improved_accuracy: Some(improved_accuracy),
        })
    }
}

#[async_trait]
impl Stage for ModelEvaluation {
    type Input = EvaluationInputs;
    type Output = ModelEvaluationArtifact;

    async fn execute(&self, input: EvaluationInputs) -> Result<ModelEvaluationArtifact> {
        self.initiate(&input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MODEL_FILE_NAME, TARGET_ENCODER_OBJECT_FILE_NAME, TRANSFORMER_OBJECT_FILE_NAME};
    use crate::data::write_csv;
    use crate::ml::save_object;
    use crate::registry::VersionCounter;
    use crate::testing::fixtures::{deploy_trained_model, SensorFrameBuilder, TARGET_COLUMN};
    use ndarray::Array1;
    use std::path::Path;
    use tempfile::TempDir;

    /// Fits a candidate on `frame` and writes every object under `root`.
    fn candidate(root: &Path, frame: &DataFrame, features: &[String]) -> EvaluationInputs {
        let labels = label_column(frame, TARGET_COLUMN).unwrap();
        let transformer = FeatureTransformer::fit(frame, features).unwrap();
        let encoder = TargetEncoder::fit(&labels).unwrap();
        let x = transformer.transform(frame).unwrap();
        let y = Array1::from(encoder.transform(&labels).unwrap());
        let mut model = LogisticRegression::default();
        model.fit(&x, &y).unwrap();

        let inputs = EvaluationInputs {
            validation: DataValidationArtifact {
                report_file_path: root.join("report.yaml"),
                train_file_path: root.join("train.csv"),
                test_file_path: root.join("test.csv"),
                status: true,
            },
            transformation: DataTransformationArtifact {
                transform_object_path: root.join(TRANSFORMER_OBJECT_FILE_NAME),
                transformed_train_path: root.join("train.bin"),
                transformed_test_path: root.join("test.bin"),
                target_encoder_path: root.join(TARGET_ENCODER_OBJECT_FILE_NAME),
            },
            trainer: ModelTrainerArtifact {
                model_path: root.join(MODEL_FILE_NAME),
                f1_train_score: 1.0,
                f1_test_score: 1.0,
            },
        };
        write_csv(&mut frame.clone(), &inputs.validation.test_file_path).unwrap();
        save_object(&inputs.transformation.transform_object_path, &transformer).unwrap();
        save_object(&inputs.transformation.target_encoder_path, &encoder).unwrap();
        save_object(&inputs.trainer.model_path, &model).unwrap();
        inputs
    }

    fn stage(saved_models: &Path) -> ModelEvaluation {
        ModelEvaluation::new(
            ModelEvaluationConfig { change_threshold: 0.01 },
            ModelResolver::new(saved_models),
            TARGET_COLUMN,
        )
    }

    #[tokio::test]
    async fn test_first_model_is_accepted() {
        let tmp = TempDir::new().unwrap();
        let builder = SensorFrameBuilder::new();
        let frame = builder.build().unwrap();
        let inputs = candidate(tmp.path(), &frame, &builder.feature_names());

        let out = stage(&tmp.path().join("saved_models")).execute(inputs).await.unwrap();
        assert!(out.is_model_accepted);
        assert_eq!(out.improved_accuracy, None);
    }

    #[tokio::test]
    async fn test_identical_model_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let saved = tmp.path().join("saved_models");
        deploy_trained_model(&saved).unwrap();
        let builder = SensorFrameBuilder::new();
        let frame = builder.build().unwrap();
        let inputs = candidate(tmp.path(), &frame, &builder.feature_names());

        let out = stage(&saved).execute(inputs).await.unwrap();
        assert!(!out.is_model_accepted);
        let improved = out.improved_accuracy.unwrap();
        assert!(improved.abs() < 1e-12, "improvement was {improved}");
    }

    #[tokio::test]
    async fn test_better_candidate_is_accepted() {
        let tmp = TempDir::new().unwrap();
        let saved = tmp.path().join("saved_models");
        let builder = SensorFrameBuilder::new().seed(11);
        let frame = builder.build().unwrap();
        let features = builder.feature_names();

        // Deployed model is fitted on inverted labels, so it scores zero.
        let labels = label_column(&frame, TARGET_COLUMN).unwrap();
        let transformer = FeatureTransformer::fit(&frame, &features).unwrap();
        let encoder = TargetEncoder::fit(&labels).unwrap();
        let x = transformer.transform(&frame).unwrap();
        let y = Array1::from(encoder.transform(&labels).unwrap());
        let mut weak = LogisticRegression::default();
        weak.fit(&x, &y.mapv(|v| 1.0 - v)).unwrap();
        let dir = saved.join("1");
        save_object(&dir.join(MODEL_FILE_NAME), &weak).unwrap();
        save_object(&dir.join(TRANSFORMER_OBJECT_FILE_NAME), &transformer).unwrap();
        save_object(&dir.join(TARGET_ENCODER_OBJECT_FILE_NAME), &encoder).unwrap();
        VersionCounter::new(&saved).write(crate::registry::ModelVersion::new(1)).unwrap();

        let inputs = candidate(tmp.path(), &frame, &features);
        let out = stage(&saved).execute(inputs).await.unwrap();

        assert!(out.is_model_accepted);
        assert!(out.improved_accuracy.unwrap() > 0.01);
    }

    #[test]
    fn test_repeated_evaluation_gives_same_verdict() {
        let tmp = TempDir::new().unwrap();
        let saved = tmp.path().join("saved_models");
        deploy_trained_model(&saved).unwrap();
        let builder = SensorFrameBuilder::new().seed(23).missing_rate(0.05);
        let frame = builder.build().unwrap();
        let inputs = candidate(tmp.path(), &frame, &builder.feature_names());
        let evaluation = stage(&saved);

        let first = evaluation.initiate(&inputs).unwrap();
        let second = evaluation.initiate(&inputs).unwrap();

        assert_eq!(first.is_model_accepted, second.is_model_accepted);
        let (a, b) = (first.improved_accuracy.unwrap(), second.improved_accuracy.unwrap());
        assert!((a - b).abs() < 1e-12, "{a} != {b}");
    }

    #[tokio::test]
    async fn test_deployed_transformer_missing_columns_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let saved = tmp.path().join("saved_models");
        deploy_trained_model(&saved).unwrap();
        // Candidate frame lacks the last deployed feature.
        let builder = SensorFrameBuilder::new().features(3);
        let frame = builder.build().unwrap();
        let inputs = candidate(tmp.path(), &frame, &builder.feature_names());

        assert!(stage(&saved).execute(inputs).await.is_err());
    }
}
