//! Checksum manifest stored next to each pushed model.

use super::ModelVersion;
use crate::errors::{IoResultExt, Result, SensorflowError};
use crate::utils::fs::{sha256_file, write_atomic};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Manifest file name inside a version directory.
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// What was pushed, by which run, with SHA-256 checksums.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelManifest {
    /// Version directory this manifest describes.
    pub version: ModelVersion,
    /// Run that pushed the model.
    pub run_id: String,
    /// When the push happened (ISO 8601).
    pub created_at: String,
    /// File name to hex SHA-256.
    pub files: BTreeMap<String, String>,
}

impl ModelManifest {
    /// Builds a manifest by hashing `file_names` inside `dir`.
    pub fn build(dir: &Path, version: ModelVersion, run_id: &str, file_names: &[&str]) -> Result<Self> {
        let mut files = BTreeMap::new();
        for name in file_names {
            files.insert((*name).to_string(), sha256_file(&dir.join(name))?);
        }
        Ok(Self {
            version,
            run_id: run_id.to_string(),
            created_at: crate::utils::iso_timestamp(),
            files,
        })
    }

    /// Writes the manifest into `dir`.
    pub fn write(&self, dir: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        write_atomic(&dir.join(MANIFEST_FILE_NAME), &json)
    }

    /// Reads the manifest of `dir`, if present.
    pub fn read(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(MANIFEST_FILE_NAME);
        if !path.is_file() {
            return Ok(None);
        }
        let raw = fs::read(&path).at_path(&path)?;
        Ok(Some(serde_json::from_slice(&raw)?))
    }

    /// Re-hashes the files in `dir` and compares them with the manifest.
    pub fn verify(&self, dir: &Path) -> Result<()> {
        for (name, expected) in &self.files {
            let actual = sha256_file(&dir.join(name))?;
            if &actual != expected {
                return Err(SensorflowError::store(format!(
                    "checksum mismatch for '{}' in version {}",
                    name, self.version
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_write_read_verify() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("model.bin"), b"weights").unwrap();

        let manifest = ModelManifest::build(tmp.path(), ModelVersion::new(3), "run-1", &["model.bin"]).unwrap();
        manifest.write(tmp.path()).unwrap();

        let back = ModelManifest::read(tmp.path()).unwrap().unwrap();
        assert_eq!(back, manifest);
        back.verify(tmp.path()).unwrap();

        fs::write(tmp.path().join("model.bin"), b"tampered").unwrap();
        assert!(back.verify(tmp.path()).is_err());
    }

    #[test]
    fn test_missing_manifest_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(ModelManifest::read(tmp.path()).unwrap().is_none());
    }
}
