//! Configuration.
//!
//! [`Settings`] holds process-wide tunables; [`TrainingPipelineConfig`] claims
//! a run directory and the per-stage records derive every path from it.

mod entity;
mod schema;
mod settings;

pub use entity::{
    BatchPredictionConfig, DataIngestionConfig, DataTransformationConfig, DataValidationConfig,
    ModelEvaluationConfig, ModelPusherConfig, ModelTrainerConfig, TrainingPipelineConfig,
    MODEL_FILE_NAME, REPORT_FILE_NAME, RUN_IDENTITY_FILE_NAME, TARGET_ENCODER_OBJECT_FILE_NAME,
    TEST_FILE_NAME, TRAIN_FILE_NAME, TRANSFORMED_TEST_FILE_NAME, TRANSFORMED_TRAIN_FILE_NAME,
    TRANSFORMER_OBJECT_FILE_NAME,
};
pub use schema::Schema;
pub use settings::{
    EvaluationSettings, IngestionSettings, LoggingSettings, PathSettings, PredictionSettings,
    Settings, StoreSettings, SyncSettings, TrainerSettings, ValidationSettings, ENV_PREFIX,
};
