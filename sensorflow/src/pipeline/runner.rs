//! Executes one stage at a time with events, timing and artifact recording.

use crate::core::{ArtifactLedger, StageEvent, StageName};
use crate::errors::{Result, SensorflowError, StageResultExt};
use crate::events::EventSink;
use crate::observability::{stage_span, SpanTimer};
use crate::stages::{Stage, StageRecord};
use crate::utils::now_utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, Instrument};

/// Outcome of a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Run id.
    pub run_id: String,
    /// Run directory.
    pub artifact_dir: PathBuf,
    /// One record per stage that ran or was skipped, in order.
    pub stages: Vec<StageRecord>,
    /// Evaluation verdict, when evaluation ran.
    pub model_accepted: Option<bool>,
    /// Version pushed by this run.
    pub pushed_version: Option<u64>,
}

impl RunSummary {
    /// Record of a stage, if it ran.
    #[must_use]
    pub fn stage(&self, name: StageName) -> Option<&StageRecord> {
        self.stages.iter().find(|r| r.name == name)
    }

    /// Total wall time of the recorded stages in milliseconds.
    #[must_use]
    pub fn total_duration_ms(&self) -> f64 {
        self.stages.iter().map(StageRecord::duration_ms).sum()
    }
}

/// Wraps stage execution.
pub struct StageRunner {
    run_id: String,
    ledger: ArtifactLedger,
    events: Arc<dyn EventSink>,
    records: Vec<StageRecord>,
}

impl fmt::Debug for StageRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageRunner")
            .field("run_id", &self.run_id)
            .field("ledger", &self.ledger)
            .field("records", &self.records)
            .finish_non_exhaustive()
    }
}

impl StageRunner {
    /// Creates a runner for a run.
    #[must_use]
    pub fn new(run_id: impl Into<String>, ledger: ArtifactLedger, events: Arc<dyn EventSink>) -> Self {
        Self {
            run_id: run_id.into(),
            ledger,
            events,
            records: Vec::new(),
        }
    }

    /// Run id.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Ledger the runner records into.
    #[must_use]
    pub const fn ledger(&self) -> &ArtifactLedger {
        &self.ledger
    }

    /// Records so far.
    #[must_use]
    pub fn records(&self) -> &[StageRecord] {
        &self.records
    }

    /// Consumes the runner.
    #[must_use]
    pub fn into_records(self) -> Vec<StageRecord> {
        self.records
    }

    /// Runs `stage` and records its artifact.
    ///
    /// # Errors
    ///
    /// The stage's error, or a ledger error, wrapped with the stage name.
    pub async fn run<S: Stage>(&mut self, stage: &S, input: S::Input) -> Result<S::Output> {
        let name = stage.name();
        let started_at = now_utc();
        let timer = SpanTimer::start(name.as_str());
        self.events.emit(&StageEvent::started(name)).await;

        let outcome = async {
            let artifact = stage.execute(input).await?;
            self.ledger.record(&artifact)?;
            Ok::<_, SensorflowError>(artifact)
        }
        .instrument(stage_span(&self.run_id, name))
        .await
        .in_stage(name);
        let duration_ms = timer.finish();

        match outcome {
            Ok(artifact) => {
                info!(stage = %name, duration_ms, "stage completed");
                self.records.push(StageRecord::completed(name, started_at));
                self.events.emit(&StageEvent::completed(name, duration_ms)).await;
                Ok(artifact)
            }
            Err(err) => {
                warn!(stage = %name, duration_ms, error = %err, "stage failed");
                self.records.push(StageRecord::failed(name, started_at, err.to_string()));
                self.events.emit(&StageEvent::failed(name, &err, duration_ms)).await;
                Err(err)
            }
        }
    }

    /// Records a stage as skipped.
    pub async fn skip(&mut self, name: StageName, reason: &str) {
        info!(stage = %name, reason, "stage skipped");
        self.records.push(StageRecord::skipped(name, reason));
        self.events.emit(&StageEvent::skipped(name, reason)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DataIngestionArtifact, StageStatus};
    use crate::errors::ErrorKind;
    use crate::events::CollectingEventSink;
    use crate::testing::assert_event_sequence;
    use async_trait::async_trait;
    use tempfile::TempDir;

    #[derive(Debug)]
    struct FixedIngestion {
        fail: bool,
    }

    #[async_trait]
    impl Stage for FixedIngestion {
        type Input = ();
        type Output = DataIngestionArtifact;

        async fn execute(&self, _input: ()) -> Result<DataIngestionArtifact> {
            if self.fail {
                return Err(SensorflowError::store("collection is empty"));
            }
            Ok(DataIngestionArtifact {
                train_file_path: PathBuf::from("train.csv"),
                test_file_path: PathBuf::from("test.csv"),
            })
        }
    }

    fn runner(tmp: &TempDir, sink: Arc<CollectingEventSink>) -> StageRunner {
        StageRunner::new("run-1", ArtifactLedger::new(tmp.path().join("artifacts"), "run-1"), sink)
    }

    #[tokio::test]
    async fn test_success_records_artifact_and_events() {
        let tmp = TempDir::new().unwrap();
        let sink = Arc::new(CollectingEventSink::new());
        let mut runner = runner(&tmp, sink.clone());

        runner.run(&FixedIngestion { fail: false }, ()).await.unwrap();

        assert!(runner.ledger().contains(StageName::DataIngestion));
        let loaded: DataIngestionArtifact = runner.ledger().load().unwrap();
        assert_eq!(loaded.train_file_path, PathBuf::from("train.csv"));
        assert_event_sequence(&sink, &["stage.started", "stage.completed"]);
        assert_eq!(runner.records()[0].status, StageStatus::Completed);
    }

    #[tokio::test]
    async fn test_failure_is_wrapped_with_stage() {
        let tmp = TempDir::new().unwrap();
        let sink = Arc::new(CollectingEventSink::new());
        let mut runner = runner(&tmp, sink.clone());

        let err = runner.run(&FixedIngestion { fail: true }, ()).await.unwrap_err();

        assert_eq!(err.stage(), Some(StageName::DataIngestion));
        assert_eq!(err.kind(), ErrorKind::Store);
        assert!(!runner.ledger().contains(StageName::DataIngestion));
        assert_event_sequence(&sink, &["stage.started", "stage.failed"]);
        let failed = sink.events_of_type("stage.failed").remove(0);
        assert_eq!(failed.get("stage"), Some(&serde_json::json!("data_ingestion")));
    }

    #[tokio::test]
    async fn test_skip_is_recorded() {
        let tmp = TempDir::new().unwrap();
        let sink = Arc::new(CollectingEventSink::new());
        let mut runner = runner(&tmp, sink.clone());

        runner.skip(StageName::ModelPusher, "model rejected").await;

        let records = runner.into_records();
        assert_eq!(records[0].status, StageStatus::Skipped);
        assert_event_sequence(&sink, &["stage.skipped"]);
    }
}
