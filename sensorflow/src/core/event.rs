//! Lifecycle events emitted while a run progresses.

use super::StageName;
use crate::errors::SensorflowError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An event emitted by the orchestrator or batch prediction.
///
/// Events are consumed by [`EventSink`](crate::events::EventSink)
/// implementations for logging, monitoring, or tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageEvent {
    /// The event type (e.g., "stage.started", "stage.completed").
    #[serde(rename = "type")]
    pub event_type: String,

    /// When the event occurred (ISO 8601).
    pub timestamp: String,

    /// The event payload data.
    #[serde(default)]
    pub data: HashMap<String, serde_json::Value>,
}

impl StageEvent {
    /// Creates a new event.
    #[must_use]
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            timestamp: crate::utils::iso_timestamp(),
            data: HashMap::new(),
        }
    }

    /// Adds a data field to the event.
    #[must_use]
    pub fn add_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Returns a data field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    /// Creates a "stage.started" event.
    #[must_use]
    pub fn started(stage: StageName) -> Self {
        Self::new("stage.started").add_data("stage", serde_json::json!(stage.as_str()))
    }

    /// Creates a "stage.completed" event.
    #[must_use]
    pub fn completed(stage: StageName, duration_ms: f64) -> Self {
        Self::new("stage.completed")
            .add_data("stage", serde_json::json!(stage.as_str()))
            .add_data("duration_ms", serde_json::json!(duration_ms))
    }

    /// Creates a "stage.failed" event.
    #[must_use]
    pub fn failed(stage: StageName, error: &SensorflowError, duration_ms: f64) -> Self {
        let mut event = Self::new("stage.failed")
            .add_data("stage", serde_json::json!(stage.as_str()))
            .add_data("duration_ms", serde_json::json!(duration_ms));
        for (key, value) in error.to_dict() {
            event.data.entry(key).or_insert(value);
        }
        event
    }

    /// Creates a "stage.skipped" event.
    #[must_use]
    pub fn skipped(stage: StageName, reason: &str) -> Self {
        Self::new("stage.skipped")
            .add_data("stage", serde_json::json!(stage.as_str()))
            .add_data("reason", serde_json::json!(reason))
    }

    /// Creates a "run.started" event.
    #[must_use]
    pub fn run_started(run_id: &str, artifact_dir: &str) -> Self {
        Self::new("run.started")
            .add_data("run_id", serde_json::json!(run_id))
            .add_data("artifact_dir", serde_json::json!(artifact_dir))
    }

    /// Creates a "run.completed" event.
    #[must_use]
    pub fn run_completed(run_id: &str, model_accepted: bool) -> Self {
        Self::new("run.completed")
            .add_data("run_id", serde_json::json!(run_id))
            .add_data("model_accepted", serde_json::json!(model_accepted))
    }

    /// Creates a "prediction.file_failed" event.
    #[must_use]
    pub fn prediction_failed(file: &str, error: &SensorflowError) -> Self {
        Self::new("prediction.file_failed")
            .add_data("file", serde_json::json!(file))
            .add_data("error", serde_json::json!(error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completed_event() {
        let event = StageEvent::completed(StageName::ModelTrainer, 12.5);
        assert_eq!(event.event_type, "stage.completed");
        assert_eq!(event.get("stage"), Some(&serde_json::json!("model_trainer")));
        assert_eq!(event.get("duration_ms"), Some(&serde_json::json!(12.5)));
    }

    #[test]
    fn test_failed_event_carries_error_kind() {
        let err = SensorflowError::Overfitting {
            gap: 0.3,
            threshold: 0.1,
        }
        .in_stage(StageName::ModelTrainer);
        let event = StageEvent::failed(StageName::ModelTrainer, &err, 1.0);

        assert_eq!(event.get("kind"), Some(&serde_json::json!("overfitting")));
        assert_eq!(event.get("stage"), Some(&serde_json::json!("model_trainer")));
    }

    #[test]
    fn test_event_serialization() {
        let event = StageEvent::skipped(StageName::ModelPusher, "model rejected");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "stage.skipped");
        assert_eq!(json["data"]["reason"], "model rejected");
    }
}
