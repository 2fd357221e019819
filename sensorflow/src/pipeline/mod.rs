//! Training pipeline orchestration.
//!
//! This module provides:
//! - [`StageRunner`], which wraps each stage with a span, lifecycle events,
//!   timing and artifact recording
//! - [`TrainingPipeline`], which runs the six stages in order or one stage at
//!   a time from a run directory

mod integration_tests;
mod runner;
mod training;

pub use runner::{RunSummary, StageRunner};
pub use training::{TrainingPipeline, MODEL_REJECTED_REASON};
