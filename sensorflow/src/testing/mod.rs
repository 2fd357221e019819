//! Testing utilities for sensorflow pipelines.
//!
//! This module provides:
//! - Synthetic sensor frames and pre-deployed models
//! - Settings rooted in a scratch directory
//! - Assertions over errors, events and the model registry

mod assertions;
pub mod fixtures;

pub use assertions::{
    assert_event_sequence, assert_latest_version, assert_stage_failed, assert_stages_completed,
};
pub use fixtures::{deploy_trained_model, schema_for, test_settings, SensorFrameBuilder};
