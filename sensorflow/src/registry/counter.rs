//! Persistent counter of the last assigned model version.

use super::ModelVersion;
use crate::errors::{IoResultExt, Result, SensorflowError};
use crate::utils::fs::write_atomic;
use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

/// Counter file name at the deployment root.
pub const VERSION_FILE_NAME: &str = "VERSION";

/// The `VERSION` file at the deployment root.
#[derive(Debug, Clone)]
pub struct VersionCounter {
    path: PathBuf,
}

impl VersionCounter {
    /// Counter for a deployment root.
    #[must_use]
    pub fn new(root: &Path) -> Self {
        Self {
            path: root.join(VERSION_FILE_NAME),
        }
    }

    /// Counter file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last assigned version, if any was recorded.
    pub fn read(&self) -> Result<Option<ModelVersion>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => {
                let trimmed = raw.trim();
                trimmed
                    .parse::<u64>()
                    .map(|v| Some(ModelVersion::new(v)))
                    .map_err(|_| {
                        SensorflowError::store(format!(
                            "corrupt version counter '{}': {trimmed:?}",
                            self.path.display()
                        ))
                    })
            }
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(None),
            Err(e) => Err(SensorflowError::io(&self.path, e)),
        }
    }

    /// Records `version` as the last assigned one.
    pub fn write(&self, version: ModelVersion) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).at_path(parent)?;
        }
        write_atomic(&self.path, format!("{}\n", version.get()).as_bytes())
    }
}
