//! Filesystem blob store

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::domain::avatar::{BlobStore, ContentHash};
use crate::domain::DomainError;

const TEMP_SUFFIX: &str = "tmp";

/// Blob store keeping one file per content hash under a root directory
///
/// Writes go to a uniquely named temporary file in the same directory, are
/// flushed to disk, then renamed over the final name. A crash mid-write leaves
/// at most a stray `*.tmp` file, never partial content under a hash.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Final location of a blob
    pub fn blob_path(&self, hash: &ContentHash) -> PathBuf {
        self.root.join(hash.as_str())
    }

    fn temp_path(&self, hash: &ContentHash) -> PathBuf {
        self.root
            .join(format!("{}.{}.{}", hash, uuid::Uuid::new_v4().simple(), TEMP_SUFFIX))
    }

    /// Remove temporary files left behind by interrupted writes
    pub async fn remove_stale_temp_files(&self) -> Result<usize, DomainError> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(io_error("list", &self.root, e)),
        };

        let mut removed = 0;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_error("list", &self.root, e))?
        {
            let path = entry.path();

            if path.extension().is_some_and(|ext| ext == TEMP_SUFFIX) {
                fs::remove_file(&path)
                    .await
                    .map_err(|e| io_error("remove", &path, e))?;
                removed += 1;
            }
        }

        Ok(removed)
    }

    async fn write_temp(&self, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        let mut file = fs::File::create(path).await?;
        file.write_all(bytes).await?;
        file.sync_all().await
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn read(&self, hash: &ContentHash) -> Result<Option<Bytes>, DomainError> {
        let path = self.blob_path(hash);

        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(Bytes::from(bytes))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error("read", &path, e)),
        }
    }

    async fn exists(&self, hash: &ContentHash) -> Result<bool, DomainError> {
        let path = self.blob_path(hash);

        fs::try_exists(&path)
            .await
            .map_err(|e| io_error("stat", &path, e))
    }

    async fn write(&self, hash: &ContentHash, bytes: &[u8]) -> Result<bool, DomainError> {
        if self.exists(hash).await? {
            return Ok(false);
        }

        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| io_error("create directory", &self.root, e))?;

        let final_path = self.blob_path(hash);
        let temp_path = self.temp_path(hash);

        if let Err(e) = self.write_temp(&temp_path, bytes).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(io_error("write", &temp_path, e));
        }

        if let Err(e) = fs::rename(&temp_path, &final_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(DomainError::storage(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                final_path.display(),
                e
            )));
        }

        debug!(hash = %hash, size = bytes.len(), "Blob written");

        Ok(true)
    }

    async fn delete(&self, hash: &ContentHash) -> Result<bool, DomainError> {
        let path = self.blob_path(hash);

        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error("delete", &path, e)),
        }
    }
}

fn io_error(action: &str, path: &Path, e: std::io::Error) -> DomainError {
    DomainError::storage(format!("Failed to {} {}: {}", action, path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, FsBlobStore) {
        let dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(dir.path().join("avatars"));
        (dir, store)
    }

    fn hash(value: &str) -> ContentHash {
        ContentHash::new(value).unwrap()
    }

    #[tokio::test]
    async fn test_write_then_read_round_trip() {
        let (_dir, store) = store();
        let bytes: Vec<u8> = (0u8..50).collect();

        assert!(store.write(&hash("ab"), &bytes).await.unwrap());

        let read = store.read(&hash("ab")).await.unwrap().unwrap();
        assert_eq!(read.as_ref(), bytes.as_slice());
    }

    #[tokio::test]
    async fn test_write_is_idempotent() {
        let (_dir, store) = store();

        assert!(store.write(&hash("ab"), b"first").await.unwrap());
        assert!(!store.write(&hash("ab"), b"first").await.unwrap());
    }

    #[tokio::test]
    async fn test_write_leaves_no_temp_files() {
        let (_dir, store) = store();

        store.write(&hash("ab"), b"content").await.unwrap();

        let mut entries = std::fs::read_dir(store.root()).unwrap();
        let only = entries.next().unwrap().unwrap();
        assert_eq!(only.file_name(), "ab");
        assert!(entries.next().is_none());
    }

    #[tokio::test]
    async fn test_read_missing_returns_none() {
        let (_dir, store) = store();
        assert!(store.read(&hash("cd")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let (_dir, store) = store();
        store.write(&hash("ab"), b"content").await.unwrap();

        assert!(store.delete(&hash("ab")).await.unwrap());
        assert!(!store.exists(&hash("ab")).await.unwrap());
        assert!(!store.delete(&hash("ab")).await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_stale_temp_files() {
        let (_dir, store) = store();
        store.write(&hash("ab"), b"content").await.unwrap();
        std::fs::write(store.root().join("ab.deadbeef.tmp"), b"partial").unwrap();

        assert_eq!(store.remove_stale_temp_files().await.unwrap(), 1);
        assert!(store.exists(&hash("ab")).await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_stale_temp_files_without_root() {
        let (_dir, store) = store();
        assert_eq!(store.remove_stale_temp_files().await.unwrap(), 0);
    }
}
