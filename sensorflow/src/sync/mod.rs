//! Mirroring of local directories to remote storage.
//!
//! The CLI pushes the artifact and deployment roots after training and
//! pulls the inbox before prediction. Sync failures are logged by the
//! caller and never fail the run.

use crate::config::SyncSettings;
use crate::errors::{Result, SensorflowError};
use crate::utils::fs::copy_dir_recursive;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Remote storage the pipeline mirrors directories into.
#[async_trait]
pub trait RemoteSync: Send + Sync + std::fmt::Debug {
    /// Copies `local` to `remote_prefix`. Returns the number of files copied.
    async fn push_dir(&self, local: &Path, remote_prefix: &str) -> Result<usize>;

    /// Copies `remote_prefix` into `local`. Returns the number of files copied.
    async fn pull_dir(&self, remote_prefix: &str, local: &Path) -> Result<usize>;
}

/// Sync that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpSync;

#[async_trait]
impl RemoteSync for NoOpSync {
    async fn push_dir(&self, _local: &Path, _remote_prefix: &str) -> Result<usize> {
        Ok(0)
    }

    async fn pull_dir(&self, _remote_prefix: &str, _local: &Path) -> Result<usize> {
        Ok(0)
    }
}

/// Mirrors directory trees under a local root, e.g. a mounted bucket.
#[derive(Debug, Clone)]
pub struct LocalMirrorSync {
    root: PathBuf,
}

impl LocalMirrorSync {
    /// Mirror rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Mirror location of a prefix. Leading slashes are ignored.
    #[must_use]
    pub fn remote_path(&self, remote_prefix: &str) -> PathBuf {
        self.root.join(remote_prefix.trim_start_matches('/'))
    }
}

async fn copy_tree(src: PathBuf, dst: PathBuf) -> Result<usize> {
    tokio::task::spawn_blocking(move || {
        if !src.is_dir() {
            return Err(SensorflowError::store(format!(
                "sync source '{}' is not a directory",
                src.display()
            )));
        }
        copy_dir_recursive(&src, &dst)
    })
    .await
    .map_err(|e| SensorflowError::store(format!("sync task failed: {e}")))?
}

#[async_trait]
impl RemoteSync for LocalMirrorSync {
    async fn push_dir(&self, local: &Path, remote_prefix: &str) -> Result<usize> {
        let copied = copy_tree(local.to_path_buf(), self.remote_path(remote_prefix)).await?;
        info!(local = %local.display(), remote_prefix, copied, "pushed directory");
        Ok(copied)
    }

    async fn pull_dir(&self, remote_prefix: &str, local: &Path) -> Result<usize> {
        let copied = copy_tree(self.remote_path(remote_prefix), local.to_path_buf()).await?;
        info!(local = %local.display(), remote_prefix, copied, "pulled directory");
        Ok(copied)
    }
}

/// Builds the sync backend the settings describe.
#[must_use]
pub fn from_settings(settings: &SyncSettings) -> Arc<dyn RemoteSync> {
    match &settings.mirror_root {
        Some(root) => Arc::new(LocalMirrorSync::new(root)),
        None => Arc::new(NoOpSync),
    }
}

/// Pushes a directory, logging instead of failing.
pub async fn push_logged(sync: &dyn RemoteSync, local: &Path, remote_prefix: &str) {
    if let Err(e) = sync.push_dir(local, remote_prefix).await {
        warn!(local = %local.display(), remote_prefix, error = %e, "sync push failed");
    }
}

/// Pulls a directory, logging instead of failing.
pub async fn pull_logged(sync: &dyn RemoteSync, remote_prefix: &str, local: &Path) {
    if let Err(e) = sync.pull_dir(remote_prefix, local).await {
        warn!(local = %local.display(), remote_prefix, error = %e, "sync pull failed");
    }
}
