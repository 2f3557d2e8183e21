//! Filesystem-backed blob store rooted at a public directory.

use super::BlobStore;
use crate::{Error, Result};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

/// Stores blobs under a root directory, typically the web server's public disk.
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a store path under the root, refusing anything that could escape it.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if path.is_empty() || escapes {
            return Err(Error::Storage(format!("Invalid storage path: {:?}", path)));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, path: &str, data: &[u8]) -> Result<()> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Storage(format!("Failed to create {}: {}", parent.display(), e)))?;
        }
        tokio::fs::write(&target, data)
            .await
            .map_err(|e| Error::Storage(format!("Failed to write {}: {}", target.display(), e)))
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let target = self.resolve(path)?;
        tokio::fs::try_exists(&target)
            .await
            .map_err(|e| Error::Storage(format!("Failed to check {}: {}", target.display(), e)))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let target = self.resolve(path)?;
        tokio::fs::remove_file(&target)
            .await
            .map_err(|e| Error::Storage(format!("Failed to delete {}: {}", target.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_local_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = LocalBlobStore::new(dir.path());

        store.put("images/a_medium.jpg", b"data").await.unwrap();
        assert!(dir.path().join("images/a_medium.jpg").exists());
        assert!(store.exists("images/a_medium.jpg").await.unwrap());

        store.delete("images/a_medium.jpg").await.unwrap();
        assert!(!store.exists("images/a_medium.jpg").await.unwrap());
    }

    #[tokio::test]
    async fn test_local_delete_missing_is_storage_error() {
        let dir = TempDir::new().unwrap();
        let store = LocalBlobStore::new(dir.path());

        let err = store.delete("images/missing.jpg").await.unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
    }

    #[tokio::test]
    async fn test_local_rejects_escaping_paths() {
        let dir = TempDir::new().unwrap();
        let store = LocalBlobStore::new(dir.path());

        for path in ["../outside.jpg", "/etc/passwd", "images/../../x.jpg", ""] {
            assert!(
                matches!(store.put(path, b"x").await, Err(Error::Storage(_))),
                "{} should be rejected",
                path
            );
        }
    }
}
