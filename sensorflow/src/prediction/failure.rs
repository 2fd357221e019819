//! Per-file failure handling for batch prediction.

use crate::errors::{ErrorKind, SensorflowError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How a failing input file affects the rest of the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    /// Stop the batch on the first failing file.
    FailFast,
    /// Record the failure, leave the file in the inbox, go on.
    #[default]
    ContinueOnFailure,
}

/// Record of a file that could not be predicted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Input file.
    pub file: PathBuf,
    /// Error message.
    pub error: String,
    /// Error kind.
    pub kind: ErrorKind,
    /// When the failure happened (ISO 8601).
    pub timestamp: String,
}

impl FailureRecord {
    /// Creates a record for `file`.
    #[must_use]
    pub fn new(file: &Path, error: &SensorflowError) -> Self {
        Self {
            file: file.to_path_buf(),
            error: error.to_string(),
            kind: error.kind(),
            timestamp: crate::utils::iso_timestamp(),
        }
    }
}

/// Collects failures during one batch.
#[derive(Debug)]
pub struct FailureCollector {
    mode: FailureMode,
    failures: Vec<FailureRecord>,
}

impl FailureCollector {
    /// Creates an empty collector.
    #[must_use]
    pub const fn new(mode: FailureMode) -> Self {
        Self {
            mode,
            failures: Vec::new(),
        }
    }

    /// Records a failure.
    pub fn record_failure(&mut self, record: FailureRecord) {
        self.failures.push(record);
    }

    /// Returns true if the batch should stop.
    #[must_use]
    pub fn should_stop(&self) -> bool {
        match self.mode {
            FailureMode::FailFast => !self.failures.is_empty(),
            FailureMode::ContinueOnFailure => false,
        }
    }

    /// Returns all failures.
    #[must_use]
    pub fn failures(&self) -> &[FailureRecord] {
        &self.failures
    }

    /// Consumes the collector.
    #[must_use]
    pub fn into_failures(self) -> Vec<FailureRecord> {
        self.failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> FailureRecord {
        FailureRecord::new(Path::new("inbox/a.csv"), &SensorflowError::prediction("bad columns"))
    }

    #[test]
    fn test_default_mode_continues() {
        assert_eq!(FailureMode::default(), FailureMode::ContinueOnFailure);

        let mut collector = FailureCollector::new(FailureMode::default());
        collector.record_failure(record());
        assert!(!collector.should_stop());
        assert_eq!(collector.failures().len(), 1);
    }

    #[test]
    fn test_fail_fast_stops() {
        let mut collector = FailureCollector::new(FailureMode::FailFast);
        assert!(!collector.should_stop());

        collector.record_failure(record());
        assert!(collector.should_stop());
    }

    #[test]
    fn test_record_keeps_kind() {
        let rec = record();
        assert_eq!(rec.kind, ErrorKind::Prediction);
        assert!(rec.error.contains("bad columns"));
    }

    #[test]
    fn test_mode_serialization() {
        let yaml = serde_yaml::to_string(&FailureMode::FailFast).unwrap();
        assert_eq!(yaml.trim(), "fail_fast");
    }
}
