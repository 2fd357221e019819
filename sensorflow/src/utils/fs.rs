//! File-system helpers shared by the pusher, batch prediction and sync.

use crate::errors::{IoResultExt, Result, SensorflowError};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Creates `path` and its parents.
pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).at_path(path)
}

/// Creates the parent directory of `path`, if it has one.
pub fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_dir(parent),
        _ => Ok(()),
    }
}

/// Copies a file, creating the destination's parent directory.
pub fn copy_file(src: &Path, dst: &Path) -> Result<u64> {
    ensure_parent(dst)?;
    fs::copy(src, dst).at_path(src)
}

/// Creates `path` only if nothing exists there yet. Returns `None` when the
/// path is already taken.
pub fn create_new(path: &Path) -> Result<Option<fs::File>> {
    match fs::OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => Ok(Some(file)),
        Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => Ok(None),
        Err(err) => Err(SensorflowError::io(path, err)),
    }
}

/// Writes `contents` to a sibling temp file and renames it over `path`.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    ensure_parent(path)?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, contents).at_path(&tmp)?;
    fs::rename(&tmp, path).at_path(path)
}

/// Returns the hex SHA-256 digest of a file.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = fs::File::open(path).at_path(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf).at_path(path)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Recursively copies `src` into `dst`, returning the number of files copied.
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<usize> {
    ensure_dir(dst)?;
    let mut copied = 0;
    for entry in fs::read_dir(src).at_path(src)? {
        let entry = entry.at_path(src)?;
        let path = entry.path();
        let target = dst.join(entry.file_name());
        if path.is_dir() {
            copied += copy_dir_recursive(&path, &target)?;
        } else {
            fs::copy(&path, &target).at_path(&path)?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Lists files in `dir` with the given extension, sorted by name. A missing
/// directory yields an empty list.
pub fn list_files_with_extension(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).at_path(dir)? {
        let path = entry.at_path(dir)?.path();
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
        if path.is_file() && matches {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
