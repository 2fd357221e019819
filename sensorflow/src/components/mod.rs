//! The six training stages.
//!
//! Each component pairs a derived config with the [`Stage`](crate::stages::Stage)
//! implementation that turns its inbound artifacts into its own.

mod evaluation;
mod ingestion;
mod pusher;
mod trainer;
mod transformation;
pub mod validation;

pub use evaluation::{score_model, EvaluationInputs, ModelEvaluation};
pub use ingestion::DataIngestion;
pub use pusher::{ModelPusher, PusherInputs};
pub use trainer::{check_model_quality, split_features_and_target, ModelTrainer};
pub use transformation::{encode_frame, DataTransformation};
pub use validation::{DataValidation, ValidationOutcome, ValidationReport};
