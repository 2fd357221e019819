//! End-to-end tests for training runs.

#[cfg(test)]
mod tests {
    use crate::config::{
        BatchPredictionConfig, Schema, Settings, TrainingPipelineConfig, REPORT_FILE_NAME,
    };
    use crate::context::RunIdentity;
    use crate::core::{StageName, StageStatus};
    use crate::data::{drop_columns, write_csv};
    use crate::errors::ErrorKind;
    use crate::events::CollectingEventSink;
    use crate::observability::{RUN_WIDE_EVENT, STAGE_WIDE_EVENT};
    use crate::pipeline::{TrainingPipeline, MODEL_REJECTED_REASON};
    use crate::prediction::BatchPrediction;
    use crate::registry::ModelVersion;
    use crate::store::InMemoryDocumentStore;
    use crate::testing::{
        assert_latest_version, assert_stage_failed, assert_stages_completed, schema_for, test_settings,
        SensorFrameBuilder,
    };
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn pipeline(settings: &Settings, schema: Schema, builder: &SensorFrameBuilder) -> TrainingPipeline {
        let frame = builder.build().unwrap();
        let store = InMemoryDocumentStore::new().with_collection(
            &settings.store.database,
            &settings.store.collection,
            frame,
        );
        TrainingPipeline::new(settings.clone(), schema, Arc::new(store))
    }

    #[tokio::test]
    async fn test_first_run_pushes_version_one() {
        let tmp = TempDir::new().unwrap();
        let settings = test_settings(tmp.path());
        let builder = SensorFrameBuilder::new().with_id();
        let sink = Arc::new(CollectingEventSink::new());

        let summary = pipeline(&settings, schema_for(&builder), &builder)
            .with_event_sink(sink.clone())
            .start()
            .await
            .unwrap();

        assert_eq!(summary.model_accepted, Some(true));
        assert_eq!(summary.pushed_version, Some(1));
        assert_eq!(summary.stages.len(), 6);
        assert!(summary.stages.iter().all(|r| r.status == StageStatus::Completed));
        assert_stages_completed(&sink, &StageName::ALL);
        assert_latest_version(&settings.paths.saved_models_root, Some(1));

        for stage in StageName::ALL {
            assert!(summary.artifact_dir.join("artifacts").join(format!("{stage}.json")).is_file());
        }
        assert!(summary
            .artifact_dir
            .join("data_validation")
            .join("report")
            .join(REPORT_FILE_NAME)
            .is_file());

        let types = sink.event_types();
        assert_eq!(types.first().map(String::as_str), Some("run.started"));
        assert_eq!(types.last().map(String::as_str), Some("run.completed"));
        assert_eq!(sink.events_of_type(STAGE_WIDE_EVENT).len(), 6);
        assert_eq!(sink.events_of_type(RUN_WIDE_EVENT).len(), 1);
    }

    #[tokio::test]
    async fn test_identical_second_run_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let settings = test_settings(tmp.path());
        let builder = SensorFrameBuilder::new();

        let first = pipeline(&settings, schema_for(&builder), &builder).start().await.unwrap();
        let second = pipeline(&settings, schema_for(&builder), &builder).start().await.unwrap();

        assert_ne!(first.artifact_dir, second.artifact_dir);
        assert_eq!(second.model_accepted, Some(false));
        assert_eq!(second.pushed_version, None);
        let pusher = second.stage(StageName::ModelPusher).unwrap();
        assert_eq!(pusher.status, StageStatus::Skipped);
        assert_eq!(pusher.detail.as_deref(), Some(MODEL_REJECTED_REASON));
        assert_latest_version(&settings.paths.saved_models_root, Some(1));
    }

    #[tokio::test]
    async fn test_indistinguishable_classes_underfit() {
        let tmp = TempDir::new().unwrap();
        let settings = test_settings(tmp.path());
        let builder = SensorFrameBuilder::new().separation(0.0);

        let err = pipeline(&settings, schema_for(&builder), &builder)
            .start()
            .await
            .unwrap_err();

        assert_stage_failed(&err, StageName::ModelTrainer, ErrorKind::Underfitting);
        assert_latest_version(&settings.paths.saved_models_root, None);
    }

    #[tokio::test]
    async fn test_missing_required_column_fails_validation() {
        let tmp = TempDir::new().unwrap();
        let settings = test_settings(tmp.path());
        let builder = SensorFrameBuilder::new();
        let mut schema = schema_for(&builder);
        schema.required_columns.push("zz_999".to_string());
        let sink = Arc::new(CollectingEventSink::new());

        let err = pipeline(&settings, schema, &builder)
            .with_event_sink(sink.clone())
            .start()
            .await
            .unwrap_err();

        assert_stage_failed(&err, StageName::DataValidation, ErrorKind::Schema);
        assert!(err.to_string().contains("zz_999"));
        assert_stages_completed(&sink, &[StageName::DataIngestion]);
        assert_eq!(sink.events_of_type("run.completed").len(), 0);
    }

    #[tokio::test]
    async fn test_stages_run_one_at_a_time_from_ledger() {
        let tmp = TempDir::new().unwrap();
        let settings = test_settings(tmp.path());
        let builder = SensorFrameBuilder::new();
        let pipeline = pipeline(&settings, schema_for(&builder), &builder);
        let config = TrainingPipelineConfig::claim(&settings.paths.artifact_root, RunIdentity::new()).unwrap();
        let run_dir = config.artifact_dir();

        let err = pipeline.run_stage(run_dir, StageName::ModelTrainer).await.unwrap_err();
        assert_stage_failed(&err, StageName::ModelTrainer, ErrorKind::Pipeline);

        let mut last = None;
        for stage in StageName::ALL {
            last = Some(pipeline.run_stage(run_dir, stage).await.unwrap());
        }
        let last = last.unwrap();
        assert_eq!(last.pushed_version, Some(1));
        assert_eq!(last.run_id, config.identity().id_str());
        assert_latest_version(&settings.paths.saved_models_root, Some(1));
    }

    #[tokio::test]
    async fn test_pusher_requires_evaluation_from_same_run() {
        let tmp = TempDir::new().unwrap();
        let settings = test_settings(tmp.path());
        let builder = SensorFrameBuilder::new();
        let pipeline = pipeline(&settings, schema_for(&builder), &builder);
        pipeline.start().await.unwrap();

        let config = TrainingPipelineConfig::claim(&settings.paths.artifact_root, RunIdentity::new()).unwrap();
        let run_dir = config.artifact_dir();
        for stage in &StageName::ALL[..4] {
            pipeline.run_stage(run_dir, *stage).await.unwrap();
        }

        let err = pipeline.run_stage(run_dir, StageName::ModelPusher).await.unwrap_err();
        assert_stage_failed(&err, StageName::ModelPusher, ErrorKind::Pipeline);
        assert!(err.to_string().contains("model_evaluation"));
        assert_latest_version(&settings.paths.saved_models_root, Some(1));
    }

    #[tokio::test]
    async fn test_retraining_invalidates_recorded_evaluation() {
        let tmp = TempDir::new().unwrap();
        let settings = test_settings(tmp.path());
        let builder = SensorFrameBuilder::new();
        let pipeline = pipeline(&settings, schema_for(&builder), &builder);
        let config = TrainingPipelineConfig::claim(&settings.paths.artifact_root, RunIdentity::new()).unwrap();
        let run_dir = config.artifact_dir();
        for stage in &StageName::ALL[..5] {
            pipeline.run_stage(run_dir, *stage).await.unwrap();
        }

        pipeline.run_stage(run_dir, StageName::ModelTrainer).await.unwrap();

        let err = pipeline.run_stage(run_dir, StageName::ModelPusher).await.unwrap_err();
        assert_stage_failed(&err, StageName::ModelPusher, ErrorKind::Pipeline);
        assert_latest_version(&settings.paths.saved_models_root, None);
    }

    #[tokio::test]
    async fn test_run_cannot_push_twice() {
        let tmp = TempDir::new().unwrap();
        let settings = test_settings(tmp.path());
        let builder = SensorFrameBuilder::new();
        let pipeline = pipeline(&settings, schema_for(&builder), &builder);
        let config = TrainingPipelineConfig::claim(&settings.paths.artifact_root, RunIdentity::new()).unwrap();
        let run_dir = config.artifact_dir();
        for stage in StageName::ALL {
            pipeline.run_stage(run_dir, stage).await.unwrap();
        }

        let err = pipeline.run_stage(run_dir, StageName::ModelPusher).await.unwrap_err();
        assert_stage_failed(&err, StageName::ModelPusher, ErrorKind::Pipeline);
        assert!(err.to_string().contains("already pushed"));
        assert_latest_version(&settings.paths.saved_models_root, Some(1));
    }

    #[tokio::test]
    async fn test_trained_model_serves_batch_prediction() {
        let tmp = TempDir::new().unwrap();
        let settings = test_settings(tmp.path());
        let builder = SensorFrameBuilder::new();
        pipeline(&settings, schema_for(&builder), &builder).start().await.unwrap();

        let labelled = SensorFrameBuilder::new().rows(30).seed(99).build().unwrap();
        let (mut batch, _) = drop_columns(&labelled, &["class".to_string()]);
        fs::create_dir_all(&settings.prediction.inbox_dir).unwrap();
        write_csv(&mut batch, &settings.prediction.inbox_dir.join("readings.csv")).unwrap();

        let report = BatchPrediction::new(BatchPredictionConfig::new(&settings))
            .run()
            .await
            .unwrap();

        assert!(report.is_clean());
        assert_eq!(report.model_version, Some(ModelVersion::new(1)));
        assert_eq!(report.predicted[0].rows, 30);
    }
}
