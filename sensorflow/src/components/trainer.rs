//! Model trainer: fit, score and gate the classifier.

use crate::config::ModelTrainerConfig;
use crate::core::{DataTransformationArtifact, ModelTrainerArtifact};
use crate::errors::{Result, SensorflowError};
use crate::ml::{f1_score, load_object, save_object, Classifier, LogisticRegression};
use crate::stages::Stage;
use async_trait::async_trait;
use ndarray::{s, Array1, Array2};
use tracing::{info, instrument};

/// Splits a transformed array into features and the label (last column).
pub fn split_features_and_target(arr: &Array2<f64>) -> Result<(Array2<f64>, Array1<f64>)> {
    if arr.ncols() < 2 {
        return Err(SensorflowError::model(format!(
            "transformed array needs at least one feature and a label, got {} columns",
            arr.ncols()
        )));
    }
    let last = arr.ncols() - 1;
    Ok((arr.slice(s![.., ..last]).to_owned(), arr.column(last).to_owned()))
}

/// Applies the underfitting and overfitting gates.
///
/// # Errors
///
/// [`SensorflowError::Underfitting`] if `test_score < expected_score`,
/// [`SensorflowError::Overfitting`] if `|train_score - test_score|` exceeds
/// `overfitting_threshold`.
pub fn check_model_quality(
    train_score: f64,
    test_score: f64,
    expected_score: f64,
    overfitting_threshold: f64,
) -> Result<()> {
    if test_score < expected_score {
        return Err(SensorflowError::Underfitting {
            expected: expected_score,
            actual: test_score,
        });
    }
    let gap = (train_score - test_score).abs();
    if gap > overfitting_threshold {
        return Err(SensorflowError::Overfitting {
            gap,
            threshold: overfitting_threshold,
        });
    }
    Ok(())
}

/// Fits the classifier on the transformed train array.
#[derive(Debug)]
pub struct ModelTrainer {
    config: ModelTrainerConfig,
}

impl ModelTrainer {
    /// Creates the stage.
    #[must_use]
    pub const fn new(config: ModelTrainerConfig) -> Self {
        Self { config }
    }

    /// Runs training.
    #[instrument(skip_all)]
    pub fn initiate(&self, transformation: &DataTransformationArtifact) -> Result<ModelTrainerArtifact> {
        let train: Array2<f64> = load_object(&transformation.transformed_train_path)?;
        let test: Array2<f64> = load_object(&transformation.transformed_test_path)?;
        let (x_train, y_train) = split_features_and_target(&train)?;
        let (x_test, y_test) = split_features_and_target(&test)?;

        let mut model = LogisticRegression::new(self.config.classifier.clone());
        model.fit(&x_train, &y_train)?;
        info!(iterations = model.iterations(), rows = x_train.nrows(), "fitted classifier");

        let f1_train_score = f1_score(&y_train.to_vec(), &model.predict(&x_train)?.to_vec());
        let f1_test_score = f1_score(&y_test.to_vec(), &model.predict(&x_test)?.to_vec());
        info!(f1_train_score, f1_test_score, "scored classifier");

        check_model_quality(
            f1_train_score,
            f1_test_score,
            self.config.expected_score,
            self.config.overfitting_threshold,
        )?;

        save_object(&self.config.model_path, &model)?;
        Ok(ModelTrainerArtifact {
            model_path: self.config.model_path.clone(),
            f1_train_score,
            f1_test_score,
        })
    }
}

#[async_trait]
impl Stage for ModelTrainer {
    type Input = DataTransformationArtifact;
    type Output = ModelTrainerArtifact;

    async fn execute(&self, input: DataTransformationArtifact) -> Result<ModelTrainerArtifact> {
        self.initiate(&input)
    }
}
