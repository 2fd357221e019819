//! Binary persistence for fitted objects and arrays.

use crate::errors::{IoResultExt, Result};
use crate::utils::fs::{ensure_parent, write_atomic};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Writes `value` with bincode, creating parent directories.
pub fn save_object<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent(path)?;
    let bytes = bincode::serialize(value)?;
    write_atomic(path, &bytes)?;
    debug!(path = %path.display(), bytes = bytes.len(), "saved object");
    Ok(())
}

/// Reads a value written by [`save_object`].
pub fn load_object<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path).at_path(path)?;
    Ok(bincode::deserialize(&bytes)?)
}
