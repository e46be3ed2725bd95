use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use uuid::Uuid;

use crate::error::{AppError, Result};

/// Location of an uploaded poster: the public URL and the key used to
/// delete it later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub url: String,
    pub key: String,
}

/// Object storage for event posters. Not transactional: callers compensate
/// by deleting uploads whose database write failed.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn upload(&self, data: Bytes, content_type: &str) -> Result<StoredImage>;
    async fn delete(&self, key: &str) -> Result<()>;
}

pub const ALLOWED_IMAGE_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
    ("image/gif", "gif"),
];

pub fn extension_for(content_type: &str) -> Option<&'static str> {
    ALLOWED_IMAGE_TYPES
        .iter()
        .find(|(mime, _)| *mime == content_type)
        .map(|(_, ext)| *ext)
}

/// Stores posters on the local filesystem, served under `/uploads`.
#[derive(Debug, Clone)]
pub struct LocalImageStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalImageStore {
    pub async fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .map_err(|e| AppError::Storage(format!("cannot create {}: {}", root.display(), e)))?;

        Ok(Self {
            root,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        // Keys are generated here; anything with a separator is not ours.
        if key.is_empty() || key.contains('/') || key.contains('\\') || key.contains("..") {
            return Err(AppError::Storage(format!("invalid image key: {key}")));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn upload(&self, data: Bytes, content_type: &str) -> Result<StoredImage> {
        let ext = extension_for(content_type)
            .ok_or_else(|| AppError::Validation(format!("Unsupported image type: {content_type}")))?;

        let key = format!("event-{}.{}", Uuid::new_v4(), ext);
        let path = self.path_for(&key)?;

        fs::write(&path, &data)
            .await
            .map_err(|e| AppError::Storage(format!("write {}: {}", path.display(), e)))?;

        tracing::debug!(key = %key, bytes = data.len(), "image stored");

        Ok(StoredImage {
            url: format!("{}/uploads/{}", self.public_base_url, key),
            key,
        })
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Storage(format!("delete {}: {}", path.display(), e))),
        }
    }
}
