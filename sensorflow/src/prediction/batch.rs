//! Applies the deployed model to files waiting in the inbox.

use super::failure::{FailureCollector, FailureRecord};
use crate::config::BatchPredictionConfig;
use crate::core::StageEvent;
use crate::data::{missing_columns, read_csv, write_csv_to, DataFrame};
use crate::errors::{IoResultExt, Result, SensorflowError};
use crate::events::{EventSink, NoOpEventSink};
use crate::ml::Classifier;
use crate::registry::{DeployedModel, ModelResolver, ModelVersion};
use crate::utils::fs::{create_new, ensure_dir, list_files_with_extension};
use crate::utils::{file_stamp, now_utc};
use polars::prelude::{NamedFrom, Series};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Numeric prediction column appended to each output.
pub const PREDICTION_COLUMN: &str = "prediction";
/// Decoded label column appended to each output.
pub const CATEGORY_COLUMN: &str = "cat_pred";

/// One successfully processed input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictedFile {
    /// Original inbox file, now removed.
    pub input: PathBuf,
    /// Prediction output.
    pub output: PathBuf,
    /// Archived copy of the input.
    pub archived: PathBuf,
    /// Rows predicted.
    pub rows: usize,
}

/// Outcome of one batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchPredictionReport {
    /// Version used, if any file was waiting.
    pub model_version: Option<ModelVersion>,
    /// Files predicted, in processing order.
    pub predicted: Vec<PredictedFile>,
    /// Files left in the inbox.
    pub failures: Vec<FailureRecord>,
}

impl BatchPredictionReport {
    /// True when no file failed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Output paths, in processing order.
    #[must_use]
    pub fn outputs(&self) -> Vec<&Path> {
        self.predicted.iter().map(|p| p.output.as_path()).collect()
    }
}

/// Batch prediction over an inbox directory.
pub struct BatchPrediction {
    config: BatchPredictionConfig,
    events: Arc<dyn EventSink>,
}

impl BatchPrediction {
    /// Creates a batch predictor without an event sink.
    #[must_use]
    pub fn new(config: BatchPredictionConfig) -> Self {
        Self {
            config,
            events: Arc::new(NoOpEventSink),
        }
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Config in use.
    #[must_use]
    pub const fn config(&self) -> &BatchPredictionConfig {
        &self.config
    }

    /// Predicts every `*.csv` file in the inbox, in name order.
    ///
    /// An empty or absent inbox is a no-op. Otherwise a deployed model is
    /// required. A file is removed from the inbox only after its output and
    /// its archive copy were both written.
    #[instrument(skip(self), fields(inbox = %self.config.inbox_dir.display()))]
    pub async fn run(&self) -> Result<BatchPredictionReport> {
        let files = list_files_with_extension(&self.config.inbox_dir, "csv")?;
        if files.is_empty() {
            info!("no input files waiting for prediction");
            return Ok(BatchPredictionReport::default());
        }

        let resolved = ModelResolver::new(&self.config.saved_model_dir).require_latest()?;
        let deployed = DeployedModel::load(&resolved)?;
        info!(version = %deployed.version, files = files.len(), "loaded deployed model");

        ensure_dir(&self.config.outbox_dir)?;
        ensure_dir(&self.config.archive_dir)?;

        let mut predicted = Vec::with_capacity(files.len());
        let mut collector = FailureCollector::new(self.config.failure_mode);
        for file in &files {
            match self.predict_file(&deployed, file) {
                Ok(done) => {
                    info!(input = %file.display(), output = %done.output.display(), rows = done.rows, "predicted file");
                    self.events
                        .emit(
                            &StageEvent::new("prediction.file_completed")
                                .add_data("file", serde_json::json!(file.display().to_string()))
                                .add_data("rows", serde_json::json!(done.rows)),
                        )
                        .await;
                    predicted.push(done);
                }
                Err(err) => {
                    warn!(input = %file.display(), error = %err, "prediction failed for file");
                    self.events
                        .emit(&StageEvent::prediction_failed(&file.display().to_string(), &err))
                        .await;
                    collector.record_failure(FailureRecord::new(file, &err));
                    if collector.should_stop() {
                        return Err(err);
                    }
                }
            }
        }

        Ok(BatchPredictionReport {
            model_version: Some(deployed.version),
            predicted,
            failures: collector.into_failures(),
        })
    }

    fn predict_file(&self, deployed: &DeployedModel, input: &Path) -> Result<PredictedFile> {
        let mut frame = read_csv(input)?;
        if frame.height() == 0 {
            return Err(SensorflowError::prediction(format!(
                "'{}' has no rows",
                input.display()
            )));
        }
        let missing = missing_columns(&frame, deployed.transformer.feature_names());
        if !missing.is_empty() {
            return Err(SensorflowError::prediction(format!(
                "'{}' lacks feature columns: {}",
                input.display(),
                missing.join(", ")
            )));
        }

        let features = deployed.transformer.transform(&frame)?;
        let codes = deployed.model.predict(&features)?.to_vec();
        let labels = deployed.target_encoder.inverse_transform(&codes)?;

        frame.with_column(Series::new(PREDICTION_COLUMN, codes))?;
        frame.with_column(Series::new(CATEGORY_COLUMN, labels))?;

        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| SensorflowError::prediction(format!("'{}' has no usable file name", input.display())))?;
        let base = format!("{stem}_{}", file_stamp(&now_utc()));
        let (output, output_file, archived, archive_file) = self.claim_names(&base)?;

        let written = write_output(&mut frame, output_file, &output)
            .and_then(|()| copy_into(input, archive_file, &archived));
        if let Err(err) = written {
            remove_quietly(&output);
            remove_quietly(&archived);
            return Err(err);
        }
        fs::remove_file(input).at_path(input)?;

        Ok(PredictedFile {
            input: input.to_path_buf(),
            output,
            archived,
            rows: frame.height(),
        })
    }

    /// Reserves a file name free in both the outbox and the archive:
    /// `<base>.csv`, then `<base>_1.csv`, `<base>_2.csv` and so on.
    fn claim_names(&self, base: &str) -> Result<(PathBuf, File, PathBuf, File)> {
        for n in 0..MAX_NAME_ATTEMPTS {
            let name = if n == 0 {
                format!("{base}.csv")
            } else {
                format!("{base}_{n}.csv")
            };
            let output = self.config.outbox_dir.join(&name);
            let Some(output_file) = create_new(&output)? else {
                continue;
            };
            let archived = self.config.archive_dir.join(&name);
            match create_new(&archived) {
                Ok(Some(archive_file)) => return Ok((output, output_file, archived, archive_file)),
                Ok(None) => remove_quietly(&output),
                Err(err) => {
                    remove_quietly(&output);
                    return Err(err);
                }
            }
        }
        Err(SensorflowError::prediction(format!(
            "no free output name for '{base}' after {MAX_NAME_ATTEMPTS} attempts"
        )))
    }
}

const MAX_NAME_ATTEMPTS: usize = 1000;

fn write_output(frame: &mut DataFrame, file: File, path: &Path) -> Result<()> {
    let mut writer = BufWriter::new(file);
    write_csv_to(frame, &mut writer)?;
    writer.flush().at_path(path)
}

fn copy_into(src: &Path, mut dst: File, dst_path: &Path) -> Result<()> {
    let mut reader = File::open(src).at_path(src)?;
    io::copy(&mut reader, &mut dst).at_path(dst_path)?;
    dst.sync_all().at_path(dst_path)
}

fn remove_quietly(path: &Path) {
    if let Err(err) = fs::remove_file(path) {
        warn!(path = %path.display(), error = %err, "could not remove partial output");
    }
}
