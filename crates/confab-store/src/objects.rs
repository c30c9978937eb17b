//! Filesystem-backed object store for media attachments.
//!
//! Objects are filed as `<root>/<folder>/<name>` and addressed externally
//! by `<base_url>/<folder>/<name>`. Names are caller-supplied random
//! tokens, so distinct users can never collide on an original filename.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};

/// Verify that a resolved path stays within the storage root.
/// Prevents path traversal through folder or object names.
fn ensure_within(base: &Path, target: &Path) -> Result<PathBuf> {
    let canonical_base = base.canonicalize().unwrap_or_else(|_| base.to_path_buf());
    let mut resolved = canonical_base.clone();
    for component in target
        .strip_prefix(&canonical_base)
        .unwrap_or(target)
        .components()
    {
        match component {
            std::path::Component::Normal(c) => resolved.push(c),
            std::path::Component::ParentDir => {
                return Err(StoreError::InvalidObjectPath(
                    target.display().to_string(),
                ));
            }
            _ => {} // RootDir, CurDir, Prefix: skip
        }
    }
    if !resolved.starts_with(&canonical_base) {
        return Err(StoreError::InvalidObjectPath(
            target.display().to_string(),
        ));
    }
    Ok(resolved)
}

#[derive(Debug, Clone)]
pub struct ObjectStore {
    root: PathBuf,
    base_url: String,
    max_size: usize,
}

impl ObjectStore {
    pub async fn open(config: &StoreConfig) -> Result<Self> {
        fs::create_dir_all(&config.media_root).await?;

        info!(root = %config.media_root.display(), "object store opened");

        Ok(Self {
            root: config.media_root.clone(),
            base_url: config.media_base_url.trim_end_matches('/').to_string(),
            max_size: config.max_media_size,
        })
    }

    /// The retrievable URL of an object, whether or not it exists yet.
    pub fn url(&self, folder: &str, name: &str) -> String {
        format!("{}/{}/{}", self.base_url, folder, name)
    }

    /// Store bytes under `<folder>/<name>` and return the retrievable URL.
    pub async fn put(&self, folder: &str, name: &str, data: &[u8]) -> Result<String> {
        if data.is_empty() {
            return Err(StoreError::EmptyObject);
        }
        if data.len() > self.max_size {
            return Err(StoreError::ObjectTooLarge {
                size: data.len(),
                max: self.max_size,
            });
        }

        let path = self.safe_path(folder, name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, data).await?;

        debug!(folder, name, size = data.len(), "object stored");
        Ok(self.url(folder, name))
    }

    /// Read an object back.
    pub async fn get(&self, folder: &str, name: &str) -> Result<Vec<u8>> {
        let path = self.safe_path(folder, name)?;
        if !path.exists() {
            return Err(StoreError::ObjectNotFound(format!("{folder}/{name}")));
        }
        Ok(fs::read(&path).await?)
    }

    /// List object names directly under a folder.
    pub async fn list(&self, folder: &str) -> Result<Vec<String>> {
        let dir = self.safe_folder(folder)?;
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        Ok(names)
    }

    /// Delete a single object.
    pub async fn delete(&self, folder: &str, name: &str) -> Result<()> {
        let path = self.safe_path(folder, name)?;
        if !path.exists() {
            return Err(StoreError::ObjectNotFound(format!("{folder}/{name}")));
        }
        fs::remove_file(&path).await?;
        debug!(folder, name, "object deleted");
        Ok(())
    }

    /// Recursively delete a folder and everything under it. Missing folders
    /// are a no-op; used by the account-deletion cleanup flow.
    pub async fn delete_folder(&self, folder: &str) -> Result<()> {
        let dir = self.safe_folder(folder)?;
        if dir.exists() {
            fs::remove_dir_all(&dir).await?;
            info!(folder, "folder deleted recursively");
        }
        Ok(())
    }

    fn safe_folder(&self, folder: &str) -> Result<PathBuf> {
        if folder.contains("..") || folder.contains('\\') || folder.starts_with('/') {
            return Err(StoreError::InvalidObjectPath(folder.to_string()));
        }
        ensure_within(&self.root, &self.root.join(folder))
    }

    fn safe_path(&self, folder: &str, name: &str) -> Result<PathBuf> {
        if name.contains('/') || name.contains('\\') || name.contains("..") {
            return Err(StoreError::InvalidObjectPath(name.to_string()));
        }
        let dir = self.safe_folder(folder)?;
        ensure_within(&self.root, &dir.join(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn test_store() -> (ObjectStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let config = StoreConfig {
            media_root: dir.path().to_path_buf(),
            media_base_url: "confab://media".to_string(),
            max_media_size: 1024,
        };
        let store = ObjectStore::open(&config).await.unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn put_and_get() {
        let (store, _dir) = test_store().await;

        let url = store.put("images", "tok-1", b"jpeg-bytes").await.unwrap();
        assert_eq!(url, "confab://media/images/tok-1");

        let data = store.get("images", "tok-1").await.unwrap();
        assert_eq!(data, b"jpeg-bytes");
    }

    #[tokio::test]
    async fn nested_folders_allowed() {
        let (store, _dir) = test_store().await;
        let url = store.put("uploads/audios", "tok", b"ogg").await.unwrap();
        assert_eq!(url, "confab://media/uploads/audios/tok");
        assert_eq!(store.list("uploads/audios").await.unwrap(), vec!["tok"]);
    }

    #[tokio::test]
    async fn empty_object_rejected() {
        let (store, _dir) = test_store().await;
        assert!(matches!(
            store.put("images", "tok", b"").await,
            Err(StoreError::EmptyObject)
        ));
    }

    #[tokio::test]
    async fn oversized_object_rejected() {
        let (store, _dir) = test_store().await;
        let big = vec![0u8; 2048];
        assert!(matches!(
            store.put("videos", "tok", &big).await,
            Err(StoreError::ObjectTooLarge { .. })
        ));
    }

    #[tokio::test]
    async fn traversal_rejected() {
        let (store, _dir) = test_store().await;
        assert!(store.put("../escape", "tok", b"x").await.is_err());
        assert!(store.put("images", "../tok", b"x").await.is_err());
        assert!(store.get("images", "..").await.is_err());
    }

    #[tokio::test]
    async fn delete_and_list() {
        let (store, _dir) = test_store().await;
        store.put("audios", "a", b"1").await.unwrap();
        store.put("audios", "b", b"2").await.unwrap();

        let mut names = store.list("audios").await.unwrap();
        names.sort();
        assert_eq!(names, vec!["a", "b"]);

        store.delete("audios", "a").await.unwrap();
        assert!(store.get("audios", "a").await.is_err());
    }

    #[tokio::test]
    async fn delete_folder_recursive() {
        let (store, _dir) = test_store().await;
        store.put("user-1/images", "a", b"1").await.unwrap();
        store.put("user-1/videos", "b", b"2").await.unwrap();

        store.delete_folder("user-1").await.unwrap();
        assert!(store.list("user-1/images").await.unwrap().is_empty());

        // Deleting a missing folder is a no-op.
        store.delete_folder("user-1").await.unwrap();
    }
}
