use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tokio::fs as async_fs;
use uuid::Uuid;

use crate::models::errors::AppError;

/// URL prefix under which the local backend's objects are served.
pub const LOCAL_BLOB_ROUTE: &str = "/blobs";

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredBlob {
    pub locator: String,
    pub name: String,
    pub size: u64,
}

/// One object as reported by a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct BlobEntry {
    pub locator: String,
    pub name: String,
    pub size: u64,
    pub uploaded_at: DateTime<Utc>,
}

/// Object storage holding the shared bytes. Objects are public-read and
/// addressed by the locator (a URL) returned from `put`.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload bytes under `name`
    async fn put(&self, name: &str, data: Bytes, content_type: &str) -> Result<StoredBlob, AppError>;

    /// Enumerate every stored object
    async fn list(&self) -> Result<Vec<BlobEntry>, AppError>;

    /// Delete an object. Deleting an absent object is not an error.
    async fn delete(&self, locator: &str) -> Result<(), AppError>;

    /// Get the storage backend name
    fn backend_name(&self) -> &'static str;
}

/// Filesystem-backed store. The application serves `root` at
/// [`LOCAL_BLOB_ROUTE`], which makes the locators publicly readable.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Get the directory objects are written to
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn locator_for(&self, name: &str) -> String {
        format!("{}{}/{}", self.public_base_url, LOCAL_BLOB_ROUTE, name)
    }

    fn path_for_locator(&self, locator: &str) -> Result<PathBuf, AppError> {
        let prefix = format!("{}{}/", self.public_base_url, LOCAL_BLOB_ROUTE);
        let name = locator
            .strip_prefix(&prefix)
            .ok_or_else(|| AppError::storage_failed(format!("Foreign blob locator: {}", locator)))?;
        self.path_for_name(name)
    }

    fn path_for_name(&self, name: &str) -> Result<PathBuf, AppError> {
        if !is_safe_name(name) {
            return Err(AppError::storage_failed(format!("Invalid blob name: {}", name)));
        }
        Ok(self.root.join(name))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, name: &str, data: Bytes, _content_type: &str) -> Result<StoredBlob, AppError> {
        let path = self.path_for_name(name)?;

        async_fs::create_dir_all(&self.root)
            .await
            .map_err(|e| AppError::storage_failed(format!("Failed to create blob directory: {}", e)))?;

        let tmp_path = self.root.join(format!(".{}.tmp", Uuid::new_v4().simple()));
        async_fs::write(&tmp_path, &data)
            .await
            .map_err(|e| AppError::storage_failed(format!("Failed to write blob: {}", e)))?;

        if let Err(e) = async_fs::rename(&tmp_path, &path).await {
            let _ = async_fs::remove_file(&tmp_path).await;
            return Err(AppError::storage_failed(format!("Failed to store blob {}: {}", name, e)));
        }

        tracing::debug!("Stored blob {} ({} bytes)", name, data.len());
        Ok(StoredBlob {
            locator: self.locator_for(name),
            name: name.to_string(),
            size: data.len() as u64,
        })
    }

    async fn list(&self) -> Result<Vec<BlobEntry>, AppError> {
        let mut entries = match async_fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(AppError::storage_failed(format!("Failed to read blob directory: {}", e)))
            }
        };

        let mut blobs = Vec::new();

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AppError::storage_failed(format!("Failed to read directory entry: {}", e)))?
        {
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if !is_safe_name(&name) {
                continue;
            }

            let metadata = match entry.metadata().await {
                Ok(metadata) if metadata.is_file() => metadata,
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!("Failed to read metadata for blob {}: {}", name, e);
                    continue;
                }
            };

            let uploaded_at = metadata
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());

            blobs.push(BlobEntry {
                locator: self.locator_for(&name),
                size: metadata.len(),
                name,
                uploaded_at,
            });
        }

        Ok(blobs)
    }

    async fn delete(&self, locator: &str) -> Result<(), AppError> {
        let path = self.path_for_locator(locator)?;

        match async_fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!("Deleted blob {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::storage_failed(format!("Failed to delete blob: {}", e))),
        }
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}

/// A single visible path component without traversal.
fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\'])
}
