//! Locates deployed model versions.
//!
//! The deployment root holds one integer-named directory per pushed version
//! plus the `VERSION` counter. "Latest" is the numerically largest complete
//! version; names that are not integers are ignored.

use super::{ModelManifest, VersionCounter};
use crate::config::{MODEL_FILE_NAME, TARGET_ENCODER_OBJECT_FILE_NAME, TRANSFORMER_OBJECT_FILE_NAME};
use crate::errors::{IoResultExt, Result, SensorflowError};
use crate::ml::{load_object, FeatureTransformer, LogisticRegression, TargetEncoder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A deployed model version number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelVersion(u64);

impl ModelVersion {
    /// Wraps a raw version number.
    #[must_use]
    pub const fn new(version: u64) -> Self {
        Self(version)
    }

    /// Raw version number.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// The following version.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Parses a version directory name. Only plain decimal digits qualify.
    #[must_use]
    pub fn parse_dir_name(name: &str) -> Option<Self> {
        if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        name.parse().ok().map(Self)
    }
}

impl fmt::Display for ModelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// File locations of one deployed version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModel {
    /// Version number.
    pub version: ModelVersion,
    /// Version directory.
    pub dir: PathBuf,
    /// Fitted model.
    pub model_path: PathBuf,
    /// Fitted feature transformer.
    pub transformer_path: PathBuf,
    /// Fitted target encoder.
    pub target_encoder_path: PathBuf,
}

impl ResolvedModel {
    fn at(dir: PathBuf, version: ModelVersion) -> Self {
        Self {
            version,
            model_path: dir.join(MODEL_FILE_NAME),
            transformer_path: dir.join(TRANSFORMER_OBJECT_FILE_NAME),
            target_encoder_path: dir.join(TARGET_ENCODER_OBJECT_FILE_NAME),
            dir,
        }
    }

    /// Returns true when all three files are present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.model_path.is_file() && self.transformer_path.is_file() && self.target_encoder_path.is_file()
    }
}

/// A deployed version loaded into memory.
#[derive(Debug, Clone)]
pub struct DeployedModel {
    /// Version number.
    pub version: ModelVersion,
    /// Fitted model.
    pub model: LogisticRegression,
    /// Fitted feature transformer.
    pub transformer: FeatureTransformer,
    /// Fitted target encoder.
    pub target_encoder: TargetEncoder,
}

impl DeployedModel {
    /// Loads every object of a resolved version, checking the manifest when
    /// one is present.
    pub fn load(resolved: &ResolvedModel) -> Result<Self> {
        if let Some(manifest) = ModelManifest::read(&resolved.dir)? {
            manifest.verify(&resolved.dir)?;
        }
        Ok(Self {
            version: resolved.version,
            model: load_object(&resolved.model_path)?,
            transformer: load_object(&resolved.transformer_path)?,
            target_encoder: load_object(&resolved.target_encoder_path)?,
        })
    }
}

/// Looks up versions under a deployment root.
#[derive(Debug, Clone)]
pub struct ModelResolver {
    root: PathBuf,
}

impl ModelResolver {
    /// Resolver for `root`. The directory need not exist.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Deployment root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of a version.
    #[must_use]
    pub fn version_dir(&self, version: ModelVersion) -> PathBuf {
        self.root.join(version.to_string())
    }

    /// All integer-named version directories, ascending.
    pub fn versions(&self) -> Result<Vec<ModelVersion>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let mut versions = Vec::new();
        for entry in fs::read_dir(&self.root).at_path(&self.root)? {
            let entry = entry.at_path(&self.root)?;
            if !entry.path().is_dir() {
                continue;
            }
            match entry.file_name().to_str().and_then(ModelVersion::parse_dir_name) {
                Some(version) => versions.push(version),
                None => debug!(entry = ?entry.file_name(), "ignoring non-version entry"),
            }
        }
        versions.sort_unstable();
        Ok(versions)
    }

    /// Latest complete version, or `None` when nothing is deployed.
    pub fn latest(&self) -> Result<Option<ResolvedModel>> {
        for version in self.versions()?.into_iter().rev() {
            let resolved = ResolvedModel::at(self.version_dir(version), version);
            if resolved.is_complete() {
                return Ok(Some(resolved));
            }
            warn!(%version, "skipping incomplete model version");
        }
        Ok(None)
    }

    /// Latest version, failing when nothing is deployed.
    pub fn require_latest(&self) -> Result<ResolvedModel> {
        self.latest()?.ok_or_else(|| {
            SensorflowError::prediction(format!(
                "no deployed model found under '{}'",
                self.root.display()
            ))
        })
    }

    /// Version the next push should use.
    ///
    /// One more than the larger of the counter and the highest version
    /// directory. Numbers are never reused.
    pub fn next_version(&self) -> Result<ModelVersion> {
        let counted = VersionCounter::new(&self.root).read()?;
        let listed = self.versions()?.last().copied();
        let last = counted.max(listed);
        Ok(last.map_or(ModelVersion::new(1), ModelVersion::next))
    }
}
