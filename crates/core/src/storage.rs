//! Job storage backend.
//!
//! Job files are addressed by slash-separated keys (`{job_id}/input.css`).
//! The compiler runs against real files, so every backend must also be able
//! to say where a key lives on the local filesystem.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Write-by-key storage for job workspaces.
#[async_trait]
pub trait WorkspaceStorage: Send + Sync {
    /// Absolute local path backing `key`.
    fn locate(&self, key: &str) -> PathBuf;

    /// Write `contents` at `key`, creating intermediate directories.
    async fn write(&self, key: &str, contents: &[u8]) -> Result<(), StorageError>;
}

/// Storage on the local filesystem under a fixed root directory.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    /// Open (creating if needed) the storage root and resolve it to an
    /// absolute path.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        let root = root.as_ref();
        let io_err = |source| StorageError::Io {
            path: root.to_path_buf(),
            source,
        };
        tokio::fs::create_dir_all(root).await.map_err(io_err)?;
        let root = tokio::fs::canonicalize(root).await.map_err(io_err)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl WorkspaceStorage for LocalStorage {
    fn locate(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    async fn write(&self, key: &str, contents: &[u8]) -> Result<(), StorageError> {
        let path = self.locate(key);
        let io_err = |source| StorageError::Io {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        tokio::fs::write(&path, contents).await.map_err(io_err)
    }
}
