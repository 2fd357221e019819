//! Test assertions for pipeline outcomes.

use crate::core::StageName;
use crate::errors::{ErrorKind, SensorflowError};
use crate::events::CollectingEventSink;
use crate::registry::{ModelResolver, ModelVersion};
use std::path::Path;

/// Asserts that an error came from `stage` with the given kind.
pub fn assert_stage_failed(err: &SensorflowError, stage: StageName, kind: ErrorKind) {
    assert_eq!(
        err.stage(),
        Some(stage),
        "Expected failure in stage {stage}, got {:?}: {err}",
        err.stage()
    );
    assert_eq!(err.kind(), kind, "Expected {kind} error, got {}: {err}", err.kind());
}

/// Asserts that the sink saw exactly these event types, in order.
pub fn assert_event_sequence(sink: &CollectingEventSink, expected: &[&str]) {
    let actual = sink.event_types();
    assert_eq!(
        actual, expected,
        "Expected events {expected:?}, got {actual:?}"
    );
}

/// Asserts that the stages completed, in order, according to the sink.
pub fn assert_stages_completed(sink: &CollectingEventSink, expected: &[StageName]) {
    let completed: Vec<String> = sink
        .events_of_type("stage.completed")
        .iter()
        .filter_map(|e| e.get("stage").and_then(|v| v.as_str()).map(str::to_string))
        .collect();
    let expected: Vec<&str> = expected.iter().map(StageName::as_str).collect();
    assert_eq!(
        completed, expected,
        "Expected completed stages {expected:?}, got {completed:?}"
    );
}

/// Asserts the latest deployed version under `root`.
pub fn assert_latest_version(root: &Path, expected: Option<u64>) {
    let latest = ModelResolver::new(root)
        .latest()
        .unwrap_or_else(|e| panic!("resolver failed for '{}': {e}", root.display()))
        .map(|r| r.version);
    assert_eq!(
        latest,
        expected.map(ModelVersion::new),
        "Unexpected latest version under '{}'",
        root.display()
    );
}
