//! Media upload pipeline: local bytes in, durable retrievable URL out.
//!
//! Uploads complete (or fail) before any message referencing them is
//! constructed, so other participants never observe a message with pending
//! media.

use bytes::Bytes;
use tracing::info;
use uuid::Uuid;

use confab_shared::MediaKind;
use confab_store::ObjectStore;

use crate::error::Result;

/// Folder for chat attachments, subdivided by kind.
const UPLOAD_FOLDER: &str = "uploads";
/// Folder for group avatar images.
const GROUP_AVATAR_FOLDER: &str = "group_images";

#[derive(Debug, Clone)]
pub struct MediaUploader {
    objects: ObjectStore,
}

impl MediaUploader {
    pub fn new(objects: ObjectStore) -> Self {
        Self { objects }
    }

    /// Upload an attachment and return its retrievable URL.
    ///
    /// The object name is a random token, independent of any original
    /// filename, so concurrent users sharing the storage bucket cannot
    /// collide. On failure nothing is retained and the caller may retry
    /// with the same bytes.
    pub async fn upload(&self, bytes: &Bytes, kind: MediaKind) -> Result<String> {
        let token = Uuid::new_v4().to_string();
        let folder = format!("{UPLOAD_FOLDER}/{}", kind.folder());

        let url = self.objects.put(&folder, &token, bytes).await?;
        info!(%kind, token = %token, size = bytes.len(), "media uploaded");
        Ok(url)
    }

    /// Upload a group avatar image and return its retrievable URL.
    pub async fn upload_group_avatar(&self, bytes: &Bytes) -> Result<String> {
        let token = Uuid::new_v4().to_string();
        let url = self.objects.put(GROUP_AVATAR_FOLDER, &token, bytes).await?;
        info!(token = %token, size = bytes.len(), "group avatar uploaded");
        Ok(url)
    }

    /// Recursively drop every stored media object. Interface for the
    /// account-deletion flow; conversations are untouched.
    pub async fn purge_all(&self) -> Result<()> {
        self.objects.delete_folder(UPLOAD_FOLDER).await?;
        self.objects.delete_folder(GROUP_AVATAR_FOLDER).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use confab_store::{StoreConfig, StoreError};
    use tempfile::TempDir;

    async fn test_uploader() -> (MediaUploader, ObjectStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let config = StoreConfig {
            media_root: dir.path().to_path_buf(),
            media_base_url: "confab://media".to_string(),
            max_media_size: 1024,
        };
        let objects = ObjectStore::open(&config).await.unwrap();
        (MediaUploader::new(objects.clone()), objects, dir)
    }

    #[tokio::test]
    async fn upload_files_by_kind() {
        let (uploader, objects, _dir) = test_uploader().await;

        let url = uploader
            .upload(&Bytes::from_static(b"jpeg"), MediaKind::Image)
            .await
            .unwrap();
        assert!(url.starts_with("confab://media/uploads/images/"));

        let name = url.rsplit('/').next().unwrap();
        let stored = objects.get("uploads/images", name).await.unwrap();
        assert_eq!(stored, b"jpeg");
    }

    #[tokio::test]
    async fn distinct_uploads_get_distinct_names() {
        let (uploader, _objects, _dir) = test_uploader().await;
        let payload = Bytes::from_static(b"same bytes");

        let first = uploader.upload(&payload, MediaKind::Audio).await.unwrap();
        let second = uploader.upload(&payload, MediaKind::Audio).await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn failed_upload_stores_nothing() {
        let (uploader, objects, _dir) = test_uploader().await;

        let oversized = Bytes::from(vec![0u8; 4096]);
        let outcome = uploader.upload(&oversized, MediaKind::Video).await;
        assert!(matches!(
            outcome,
            Err(crate::EngineError::Store(StoreError::ObjectTooLarge { .. }))
        ));
        assert!(objects.list("uploads/videos").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn purge_all_clears_media() {
        let (uploader, objects, _dir) = test_uploader().await;
        uploader
            .upload(&Bytes::from_static(b"img"), MediaKind::Image)
            .await
            .unwrap();
        uploader
            .upload_group_avatar(&Bytes::from_static(b"avatar"))
            .await
            .unwrap();

        uploader.purge_all().await.unwrap();
        assert!(objects.list("uploads/images").await.unwrap().is_empty());
        assert!(objects.list("group_images").await.unwrap().is_empty());
    }
}
