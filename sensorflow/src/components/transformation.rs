//! Data transformation: fit preprocessing on train and encode both splits.

use crate::config::DataTransformationConfig;
use crate::core::{DataTransformationArtifact, DataValidationArtifact};
use crate::data::{column_names, has_column, label_column, read_csv, DataFrame};
use crate::errors::{Result, SchemaViolation, SensorflowError};
use crate::ml::{save_object, FeatureTransformer, TargetEncoder};
use crate::stages::Stage;
use async_trait::async_trait;
use ndarray::{concatenate, Array2, Axis};
use tracing::{info, instrument};

/// Fits the feature transformer and target encoder and writes numeric arrays.
#[derive(Debug)]
pub struct DataTransformation {
    config: DataTransformationConfig,
    target_column: String,
}

impl DataTransformation {
    /// Creates the stage for the given label column.
    #[must_use]
    pub fn new(config: DataTransformationConfig, target_column: impl Into<String>) -> Self {
        Self {
            config,
            target_column: target_column.into(),
        }
    }

    /// Runs the transformation.
    #[instrument(skip_all, fields(target = %self.target_column))]
    pub fn initiate(&self, validation: &DataValidationArtifact) -> Result<DataTransformationArtifact> {
        let train = read_csv(&validation.train_file_path)?;
        let test = read_csv(&validation.test_file_path)?;

        for (frame, label) in [(&train, "train"), (&test, "test")] {
            if !has_column(frame, &self.target_column) {
                return Err(SchemaViolation::MissingRequiredColumns {
                    frame: label.to_string(),
                    missing: vec![self.target_column.clone()],
                }
                .into());
            }
        }

        let features: Vec<String> = column_names(&train)
            .into_iter()
            .filter(|name| *name != self.target_column)
            .collect();
        let transformer = FeatureTransformer::fit(&train, &features)?;
        let encoder = TargetEncoder::fit(&label_column(&train, &self.target_column)?)?;
        info!(features = features.len(), classes = ?encoder.classes(), "fitted preprocessing");

        let train_arr = encode_frame(&transformer, &encoder, &train, &self.target_column)?;
        let test_arr = encode_frame(&transformer, &encoder, &test, &self.target_column)?;

        save_object(&self.config.transformed_train_path, &train_arr)?;
        save_object(&self.config.transformed_test_path, &test_arr)?;
        save_object(&self.config.transform_object_path, &transformer)?;
        save_object(&self.config.target_encoder_path, &encoder)?;
        info!(
            train_shape = ?train_arr.shape(),
            test_shape = ?test_arr.shape(),
            "wrote transformed arrays"
        );

        Ok(DataTransformationArtifact {
            transform_object_path: self.config.transform_object_path.clone(),
            transformed_train_path: self.config.transformed_train_path.clone(),
            transformed_test_path: self.config.transformed_test_path.clone(),
            target_encoder_path: self.config.target_encoder_path.clone(),
        })
    }
}

/// Transforms features and appends the encoded label as the last column.
pub fn encode_frame(
    transformer: &FeatureTransformer,
    encoder: &TargetEncoder,
    frame: &DataFrame,
    target_column: &str,
) -> Result<Array2<f64>> {
    let features = transformer.transform(frame)?;
    let labels = label_column(frame, target_column)?;
    let encoded = encoder.transform(&labels)?;
    let label_col = Array2::from_shape_vec((encoded.len(), 1), encoded)
        .map_err(|e| SensorflowError::model(e.to_string()))?;
    concatenate(Axis(1), &[features.view(), label_col.view()]).map_err(|e| SensorflowError::model(e.to_string()))
}

#[async_trait]
impl Stage for DataTransformation {
    type Input = DataValidationArtifact;
    type Output = DataTransformationArtifact;

    async fn execute(&self, input: DataValidationArtifact) -> Result<DataTransformationArtifact> {
        self.initiate(&input)
    }
}
