//! Per-stage execution records.

use crate::core::{StageName, StageStatus};
use crate::utils::Timestamp;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Outcome of one stage within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
    /// Stage name.
    pub name: StageName,
    /// Final status.
    pub status: StageStatus,
    /// When the stage started.
    pub started_at: Timestamp,
    /// When the stage ended.
    pub ended_at: Timestamp,
    /// Error message if failed, or the reason if skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl StageRecord {
    /// Creates a completed record.
    #[must_use]
    pub fn completed(name: StageName, started_at: Timestamp) -> Self {
        Self {
            name,
            status: StageStatus::Completed,
            started_at,
            ended_at: Utc::now(),
            detail: None,
        }
    }

    /// Creates a failed record.
    #[must_use]
    pub fn failed(name: StageName, started_at: Timestamp, error: impl Into<String>) -> Self {
        Self {
            name,
            status: StageStatus::Failed,
            started_at,
            ended_at: Utc::now(),
            detail: Some(error.into()),
        }
    }

    /// Creates a skipped record.
    #[must_use]
    pub fn skipped(name: StageName, reason: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name,
            status: StageStatus::Skipped,
            started_at: now,
            ended_at: now,
            detail: Some(reason.into()),
        }
    }

    /// Returns the duration in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> f64 {
        (self.ended_at - self.started_at).num_milliseconds() as f64
    }

    /// Returns true if the stage succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completed_record() {
        let record = StageRecord::completed(StageName::DataIngestion, Utc::now());
        assert!(record.is_success());
        assert!(record.detail.is_none());
    }

    #[test]
    fn test_failed_record() {
        let record = StageRecord::failed(StageName::ModelTrainer, Utc::now(), "underfit");
        assert!(!record.is_success());
        assert_eq!(record.detail.as_deref(), Some("underfit"));
    }

    #[test]
    fn test_duration() {
        let started = Utc::now();
        std::thread::sleep(std::time::Duration::from_millis(10));
        let record = StageRecord::completed(StageName::ModelPusher, started);
        assert!(record.duration_ms() >= 10.0);
    }

    #[test]
    fn test_skipped_serialization() {
        let record = StageRecord::skipped(StageName::ModelPusher, "model rejected");
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["name"], "model_pusher");
        assert_eq!(value["status"], "skipped");
    }
}
