use std::io;
use std::path::{Path, PathBuf};

use dubbing_domain::JobPaths;

/// Owns a job's private directory and removes it when released.
///
/// `cleanup` is the normal path; `Drop` covers early returns, panics and
/// cancelled futures.
#[derive(Debug)]
pub struct JobWorkspace {
    paths: JobPaths,
    released: bool,
}

impl JobWorkspace {
    /// Creates `<base_dir>/<job_id>`. Fails if the directory already exists,
    /// so two live jobs never share files.
    pub async fn create(base_dir: &Path, job_id: &str) -> io::Result<Self> {
        tokio::fs::create_dir_all(base_dir).await?;
        let root = base_dir.join(job_id);
        tokio::fs::create_dir(&root).await?;
        let workspace = Self::claim(root);
        workspace.prepare().await?;
        Ok(workspace)
    }

    /// Takes ownership of an existing `root`; it is removed on drop from here on.
    fn claim(root: PathBuf) -> Self {
        Self {
            paths: JobPaths::new(root),
            released: false,
        }
    }

    async fn prepare(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.paths.scratch_dir).await
    }

    pub fn paths(&self) -> &JobPaths {
        &self.paths
    }

    pub fn root(&self) -> &Path {
        self.paths.root()
    }

    pub async fn cleanup(mut self) {
        self.released = true;
        let root: PathBuf = self.paths.root.clone();
        if let Err(err) = tokio::fs::remove_dir_all(&root).await {
            if err.kind() != io::ErrorKind::NotFound {
                tracing::warn!(path = %root.display(), error = %err, "failed to remove job workspace");
            }
        }
    }
}

impl Drop for JobWorkspace {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(err) = std::fs::remove_dir_all(&self.paths.root) {
            if err.kind() != io::ErrorKind::NotFound {
                tracing::warn!(
                    path = %self.paths.root.display(),
                    error = %err,
                    "failed to remove job workspace on drop"
                );
            }
        }
    }
}
