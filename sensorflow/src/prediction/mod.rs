//! Batch prediction with the currently deployed model.

mod batch;
mod failure;

pub use batch::{BatchPrediction, BatchPredictionReport, PredictedFile, CATEGORY_COLUMN, PREDICTION_COLUMN};
pub use failure::{FailureCollector, FailureMode, FailureRecord};
