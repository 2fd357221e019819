//! Model pusher: publish an accepted model as a new version.

use crate::config::{
    ModelPusherConfig, MODEL_FILE_NAME, TARGET_ENCODER_OBJECT_FILE_NAME, TRANSFORMER_OBJECT_FILE_NAME,
};
use crate::core::{DataTransformationArtifact, ModelPusherArtifact, ModelTrainerArtifact};
use crate::errors::{Result, SensorflowError};
use crate::registry::{ModelManifest, ModelResolver, VersionCounter, MANIFEST_FILE_NAME};
use crate::stages::Stage;
use crate::utils::fs::{copy_file, ensure_dir};
use async_trait::async_trait;
use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::Path;
use tracing::{info, instrument, warn};

/// Artifacts the pusher publishes.
#[derive(Debug, Clone)]
pub struct PusherInputs {
    /// Fitted preprocessing objects.
    pub transformation: DataTransformationArtifact,
    /// Fitted model.
    pub trainer: ModelTrainerArtifact,
}

/// Copies the fitted objects into `saved_models/<N>/`.
#[derive(Debug)]
pub struct ModelPusher {
    config: ModelPusherConfig,
    run_id: String,
}

impl ModelPusher {
    /// Creates the stage for a run.
    #[must_use]
    pub fn new(config: ModelPusherConfig, run_id: impl Into<String>) -> Self {
        Self {
            config,
            run_id: run_id.into(),
        }
    }

    /// Publishes the model.
    ///
    /// The counter is written last, so an interrupted push leaves an
    /// incomplete directory that resolvers skip.
    #[instrument(skip_all, fields(run_id = %self.run_id))]
    pub fn initiate(&self, inputs: &PusherInputs) -> Result<ModelPusherArtifact> {
        let resolver = ModelResolver::new(&self.config.saved_model_dir);
        let version = resolver.next_version()?;
        let dir = resolver.version_dir(version);

        ensure_dir(&self.config.saved_model_dir)?;
        match fs::create_dir(&dir) {
            Ok(()) => {}
            Err(e) if e.kind() == IoErrorKind::AlreadyExists => {
                return Err(SensorflowError::store(format!(
                    "model version {version} already exists at '{}'",
                    dir.display()
                )));
            }
            Err(e) => return Err(SensorflowError::io(&dir, e)),
        }

        let files = [
            (&inputs.trainer.model_path, MODEL_FILE_NAME),
            (&inputs.transformation.transform_object_path, TRANSFORMER_OBJECT_FILE_NAME),
            (&inputs.transformation.target_encoder_path, TARGET_ENCODER_OBJECT_FILE_NAME),
        ];
        for (src, name) in files {
            copy_file(src, &dir.join(name))?;
        }
        let names = files.map(|(_, name)| name);
        ModelManifest::build(&dir, version, &self.run_id, &names)?.write(&dir)?;
        VersionCounter::new(&self.config.saved_model_dir).write(version)?;
        info!(%version, dir = %dir.display(), "pushed model");

        if let Err(err) = self.mirror_into_run(&dir, &names) {
            warn!(%version, error = %err, "model is live but its copy in the run directory failed");
        }

        Ok(ModelPusherArtifact {
            saved_model_dir: self.config.saved_model_dir.clone(),
            version: version.get(),
            model_path: dir.join(MODEL_FILE_NAME),
            transformer_path: dir.join(TRANSFORMER_OBJECT_FILE_NAME),
            target_encoder_path: dir.join(TARGET_ENCODER_OBJECT_FILE_NAME),
        })
    }

    fn mirror_into_run(&self, version_dir: &Path, names: &[&str]) -> Result<()> {
        for name in names.iter().copied().chain([MANIFEST_FILE_NAME]) {
            copy_file(&version_dir.join(name), &self.config.pusher_model_dir.join(name))?;
        }
        Ok(())
    }
}

#[async_trait]
impl Stage for ModelPusher {
    type Input = PusherInputs;
    type Output = ModelPusherArtifact;

    async fn execute(&self, input: PusherInputs) -> Result<ModelPusherArtifact> {
        self.initiate(&input)
    }
}
