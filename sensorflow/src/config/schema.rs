//! Dataset schema loaded from YAML.

use crate::errors::{IoResultExt, Result, SensorflowError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Column contract for the sensor dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Columns that must survive cleaning in both frames.
    #[serde(default)]
    pub required_columns: Vec<String>,
    /// Columns removed before any other check.
    #[serde(default)]
    pub drop_columns: Vec<String>,
    /// Label column.
    #[serde(default = "default_target_column")]
    pub target_column: String,
}

fn default_target_column() -> String {
    "class".to_string()
}

impl Default for Schema {
    fn default() -> Self {
        Self {
            required_columns: Vec::new(),
            drop_columns: Vec::new(),
            target_column: default_target_column(),
        }
    }
}

impl Schema {
    /// Reads a schema file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).at_path(path)?;
        Self::from_yaml_str(&raw)
    }

    /// Parses a schema document.
    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let schema: Self =
            serde_yaml::from_str(raw).map_err(|e| SensorflowError::config(format!("invalid schema: {e}")))?;
        if schema.target_column.trim().is_empty() {
            return Err(SensorflowError::config("schema target_column must not be empty"));
        }
        if schema.drop_columns.contains(&schema.target_column) {
            return Err(SensorflowError::config(format!(
                "schema drops its own target column '{}'",
                schema.target_column
            )));
        }
        Ok(schema)
    }

    /// Writes the schema as YAML.
    pub fn write(&self, path: &Path) -> Result<()> {
        crate::utils::fs::ensure_parent(path)?;
        let raw = serde_yaml::to_string(self)?;
        fs::write(path, raw).at_path(path)
    }
}
