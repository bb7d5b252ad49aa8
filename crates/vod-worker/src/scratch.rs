//! Per-job scratch areas.

use std::path::{Path, PathBuf};

use tracing::warn;

use vod_models::JobId;

use crate::error::WorkerResult;

/// A worker-local temporary directory namespaced by job ID.
///
/// Concurrent jobs never share a path. Cleanup is explicit on both the
/// success and failure paths; the Drop impl is a last-resort sweep for
/// panics and early returns that skipped it.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    /// Create the scratch directory for a job.
    pub async fn create(work_dir: impl AsRef<Path>, job_id: &JobId) -> WorkerResult<Self> {
        let path = work_dir.as_ref().join(job_id.as_str());
        tokio::fs::create_dir_all(&path).await?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Join a file name under the scratch area.
    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.path.join(name)
    }

    /// Remove the scratch area. Best effort; failure is logged, not fatal.
    pub async fn cleanup(self) {
        if let Err(e) = tokio::fs::remove_dir_all(&self.path).await {
            warn!("Failed to clean scratch dir {}: {}", self.path.display(), e);
        }
        // Cleanup already happened; don't let Drop try again.
        std::mem::forget(self);
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if self.path.exists() {
            let _ = std::fs::remove_dir_all(&self.path);
        }
    }
}
