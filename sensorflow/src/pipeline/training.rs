//! The training orchestrator.

use super::runner::{RunSummary, StageRunner};
use crate::components::{
    DataIngestion, DataTransformation, DataValidation, EvaluationInputs, ModelEvaluation, ModelPusher,
    ModelTrainer, PusherInputs,
};
use crate::config::{
    DataIngestionConfig, DataTransformationConfig, DataValidationConfig, ModelEvaluationConfig,
    ModelPusherConfig, ModelTrainerConfig, Schema, Settings, TrainingPipelineConfig,
};
use crate::context::RunIdentity;
use crate::core::{
    ArtifactLedger, DataIngestionArtifact, DataTransformationArtifact, DataValidationArtifact,
    ModelEvaluationArtifact, ModelPusherArtifact, ModelTrainerArtifact, StageEvent, StageName,
};
use crate::errors::{Result, SensorflowError, StageResultExt};
use crate::events::{EventSink, NoOpEventSink};
use crate::observability::{emit_run_wide_events, run_span};
use crate::registry::ModelResolver;
use crate::store::DocumentStore;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn, Instrument};

/// Skip reason recorded for the pusher when evaluation rejects the model.
pub const MODEL_REJECTED_REASON: &str = "trained model is not better than the deployed model";

/// Runs ingestion through push as one sequential flow.
pub struct TrainingPipeline {
    settings: Settings,
    schema: Schema,
    store: Arc<dyn DocumentStore>,
    events: Arc<dyn EventSink>,
}

impl fmt::Debug for TrainingPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrainingPipeline")
            .field("settings", &self.settings)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl TrainingPipeline {
    /// Creates the pipeline. Events are discarded until a sink is set.
    #[must_use]
    pub fn new(settings: Settings, schema: Schema, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            settings,
            schema,
            store,
            events: Arc::new(NoOpEventSink),
        }
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Settings in use.
    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Runs every stage in a freshly claimed run directory.
    ///
    /// The pusher is skipped when evaluation rejects the model. The first
    /// failing stage aborts the run and its error carries the stage name.
    pub async fn start(&self) -> Result<RunSummary> {
        let config = TrainingPipelineConfig::claim(&self.settings.paths.artifact_root, RunIdentity::new())?;
        let run_id = config.identity().id_str();
        self.execute(&config).instrument(run_span(&run_id)).await
    }

    async fn execute(&self, config: &TrainingPipelineConfig) -> Result<RunSummary> {
        let run_id = config.identity().id_str();
        let artifact_dir = config.artifact_dir().to_path_buf();
        info!(artifact_dir = %artifact_dir.display(), "training run started");
        self.events
            .emit(&StageEvent::run_started(&run_id, &artifact_dir.display().to_string()))
            .await;

        let mut runner = StageRunner::new(&run_id, config.ledger(), Arc::clone(&self.events));
        let outcome = self.run_all(config, &mut runner).await;
        let stages = runner.into_records();

        match outcome {
            Ok((model_accepted, pushed_version)) => {
                emit_run_wide_events(
                    self.events.as_ref(),
                    &run_id,
                    &stages,
                    Some(model_accepted),
                    pushed_version,
                );
                self.events
                    .emit(&StageEvent::run_completed(&run_id, model_accepted))
                    .await;
                info!(model_accepted, ?pushed_version, "training run completed");
                Ok(RunSummary {
                    run_id,
                    artifact_dir,
                    stages,
                    model_accepted: Some(model_accepted),
                    pushed_version,
                })
            }
            Err(err) => {
                emit_run_wide_events(self.events.as_ref(), &run_id, &stages, None, None);
                warn!(error = %err, "training run failed");
                Err(err)
            }
        }
    }

    async fn run_all(
        &self,
        config: &TrainingPipelineConfig,
        runner: &mut StageRunner,
    ) -> Result<(bool, Option<u64>)> {
        let ingestion = self.start_data_ingestion(config, runner).await?;
        let validation = self.start_data_validation(config, runner, ingestion).await?;
        let transformation = self
            .start_data_transformation(config, runner, validation.clone())
            .await?;
        let trainer = self
            .start_model_trainer(config, runner, transformation.clone())
            .await?;
        let evaluation = self
            .start_model_evaluation(
                runner,
                EvaluationInputs {
                    validation,
                    transformation: transformation.clone(),
                    trainer: trainer.clone(),
                },
            )
            .await?;

        if !evaluation.is_model_accepted {
            runner.skip(StageName::ModelPusher, MODEL_REJECTED_REASON).await;
            return Ok((false, None));
        }
        let pushed = self
            .start_model_pusher(config, runner, PusherInputs { transformation, trainer })
            .await?;
        Ok((true, Some(pushed.version)))
    }

    /// Runs data ingestion.
    pub async fn start_data_ingestion(
        &self,
        config: &TrainingPipelineConfig,
        runner: &mut StageRunner,
    ) -> Result<DataIngestionArtifact> {
        let stage = DataIngestion::new(DataIngestionConfig::new(config, &self.settings), Arc::clone(&self.store));
        runner.run(&stage, ()).await
    }

    /// Runs data validation.
    pub async fn start_data_validation(
        &self,
        config: &TrainingPipelineConfig,
        runner: &mut StageRunner,
        ingestion: DataIngestionArtifact,
    ) -> Result<DataValidationArtifact> {
        let stage = DataValidation::new(
            DataValidationConfig::new(config, &self.settings),
            self.schema.clone(),
        );
        runner.run(&stage, ingestion).await
    }

    /// Runs data transformation.
    pub async fn start_data_transformation(
        &self,
        config: &TrainingPipelineConfig,
        runner: &mut StageRunner,
        validation: DataValidationArtifact,
    ) -> Result<DataTransformationArtifact> {
        let stage = DataTransformation::new(
            DataTransformationConfig::new(config),
            self.schema.target_column.clone(),
        );
        runner.run(&stage, validation).await
    }

    /// Runs the model trainer.
    pub async fn start_model_trainer(
        &self,
        config: &TrainingPipelineConfig,
        runner: &mut StageRunner,
        transformation: DataTransformationArtifact,
    ) -> Result<ModelTrainerArtifact> {
        let stage = ModelTrainer::new(ModelTrainerConfig::new(config, &self.settings));
        runner.run(&stage, transformation).await
    }

    /// Runs model evaluation against the deployed model.
    pub async fn start_model_evaluation(
        &self,
        runner: &mut StageRunner,
        inputs: EvaluationInputs,
    ) -> Result<ModelEvaluationArtifact> {
        let stage = ModelEvaluation::new(
            ModelEvaluationConfig::new(&self.settings),
            ModelResolver::new(&self.settings.paths.saved_models_root),
            self.schema.target_column.clone(),
        );
        runner.run(&stage, inputs).await
    }

    /// Runs the model pusher.
    pub async fn start_model_pusher(
        &self,
        config: &TrainingPipelineConfig,
        runner: &mut StageRunner,
        inputs: PusherInputs,
    ) -> Result<ModelPusherArtifact> {
        let stage = ModelPusher::new(ModelPusherConfig::new(config, &self.settings), config.identity().id_str());
        runner.run(&stage, inputs).await
    }

    /// Runs a single stage inside an existing run directory, loading its
    /// inbound artifacts from the run's ledger.
    ///
    /// The pusher needs an evaluation recorded in the same run. It is skipped
    /// when that evaluation rejected the model, and refused when the run has
    /// already pushed.
    pub async fn run_stage(&self, run_dir: &Path, stage: StageName) -> Result<RunSummary> {
        let config = TrainingPipelineConfig::resume(run_dir)?;
        let run_id = config.identity().id_str();
        let ledger = config.ledger();
        check_dependencies(&ledger, stage)?;

        let mut runner = StageRunner::new(&run_id, config.ledger(), Arc::clone(&self.events));
        let mut model_accepted = None;
        let mut pushed_version = None;

        match stage {
            StageName::DataIngestion => {
                self.start_data_ingestion(&config, &mut runner).await?;
            }
            StageName::DataValidation => {
                let ingestion = ledger.load().in_stage(stage)?;
                self.start_data_validation(&config, &mut runner, ingestion).await?;
            }
            StageName::DataTransformation => {
                let validation = ledger.load().in_stage(stage)?;
                self.start_data_transformation(&config, &mut runner, validation).await?;
            }
            StageName::ModelTrainer => {
                let transformation = ledger.load().in_stage(stage)?;
                self.start_model_trainer(&config, &mut runner, transformation).await?;
            }
            StageName::ModelEvaluation => {
                let inputs = EvaluationInputs {
                    validation: ledger.load().in_stage(stage)?,
                    transformation: ledger.load().in_stage(stage)?,
                    trainer: ledger.load().in_stage(stage)?,
                };
                let evaluation = self.start_model_evaluation(&mut runner, inputs).await?;
                model_accepted = Some(evaluation.is_model_accepted);
            }
            StageName::ModelPusher => {
                if ledger.contains(StageName::ModelPusher) {
                    return Err(SensorflowError::pipeline(format!(
                        "run '{run_id}' already pushed its model"
                    ))
                    .in_stage(stage));
                }
                let evaluation: ModelEvaluationArtifact = ledger.load().in_stage(stage)?;
                if !evaluation.is_model_accepted {
                    runner.skip(stage, MODEL_REJECTED_REASON).await;
                    model_accepted = Some(false);
                } else {
                    let inputs = PusherInputs {
                        transformation: ledger.load().in_stage(stage)?,
                        trainer: ledger.load().in_stage(stage)?,
                    };
                    let pushed = self.start_model_pusher(&config, &mut runner, inputs).await?;
                    pushed_version = Some(pushed.version);
                }
            }
        }

        Ok(RunSummary {
            run_id,
            artifact_dir: config.artifact_dir().to_path_buf(),
            stages: runner.into_records(),
            model_accepted,
            pushed_version,
        })
    }
}

fn check_dependencies(ledger: &ArtifactLedger, stage: StageName) -> Result<()> {
    let missing: Vec<&str> = stage
        .dependencies()
        .iter()
        .filter(|dep| !ledger.contains(**dep))
        .map(StageName::as_str)
        .collect();
    if missing.is_empty() {
        return Ok(());
    }
    Err(SensorflowError::pipeline(format!(
        "missing inbound artifacts in '{}': {}",
        ledger.dir().display(),
        missing.join(", ")
    ))
    .in_stage(stage))
}
