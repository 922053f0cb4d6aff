use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tokio::fs as async_fs;
use uuid::Uuid;

use crate::models::errors::AppError;
use crate::models::file_record::FileRecord;
use crate::services::sharing_code;

/// Flat-file metadata store: one `<code>.json` document per sharing code.
///
/// There is no locking. `put` and `delete` are atomic per key (write to a
/// temporary file, then rename), but `update` is a read-modify-write and two
/// concurrent updates of the same code can lose one of the writes.
/// Result of walking the metadata directory.
#[derive(Debug, Default)]
pub struct RecordScan {
    pub records: Vec<FileRecord>,
    /// Record files that exist but failed to read
    pub unreadable: usize,
}

#[derive(Debug, Clone)]
pub struct MetadataStore {
    metadata_dir: PathBuf,
}

impl MetadataStore {
    pub fn new(metadata_dir: impl Into<PathBuf>) -> Self {
        Self {
            metadata_dir: metadata_dir.into(),
        }
    }

    /// Create the metadata directory if it doesn't exist
    pub async fn init(&self) -> Result<(), AppError> {
        async_fs::create_dir_all(&self.metadata_dir)
            .await
            .map_err(|e| {
                AppError::persistence_failed(format!(
                    "Failed to create metadata directory {}: {}",
                    self.metadata_dir.display(),
                    e
                ))
            })?;

        tracing::debug!("Metadata directory ready: {}", self.metadata_dir.display());
        Ok(())
    }

    /// Persist or overwrite the record keyed by its code
    pub async fn put(&self, record: &FileRecord) -> Result<(), AppError> {
        let path = self.record_path(&record.code).ok_or_else(|| {
            AppError::validation_failed(format!("Invalid sharing code: {}", record.code))
        })?;

        self.init().await?;

        let json = serde_json::to_vec_pretty(record).map_err(|e| {
            AppError::persistence_failed(format!("Failed to serialize metadata: {}", e))
        })?;

        let tmp_path = self
            .metadata_dir
            .join(format!(".{}.{}.tmp", record.code, Uuid::new_v4().simple()));

        async_fs::write(&tmp_path, &json).await.map_err(|e| {
            AppError::persistence_failed(format!(
                "Failed to write metadata file {}: {}",
                tmp_path.display(),
                e
            ))
        })?;

        if let Err(e) = async_fs::rename(&tmp_path, &path).await {
            let _ = async_fs::remove_file(&tmp_path).await;
            return Err(AppError::persistence_failed(format!(
                "Failed to move metadata file into place at {}: {}",
                path.display(),
                e
            )));
        }

        tracing::debug!("Saved metadata for code {} at {}", record.code, path.display());
        Ok(())
    }

    /// Look up a record by exact code. Absent, malformed and unparsable
    /// records all come back as `None`.
    pub async fn get(&self, code: &str) -> Result<Option<FileRecord>, AppError> {
        let Some(path) = self.record_path(code) else {
            return Ok(None);
        };

        let data = match async_fs::read(&path).await {
            Ok(data) => data,
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
                return Ok(None)
            }
            Err(e) => {
                return Err(AppError::persistence_failed(format!(
                    "Failed to read metadata file {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        match serde_json::from_slice::<FileRecord>(&data) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                tracing::warn!("Ignoring unparsable metadata file {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    /// Read the record, apply `apply` to it and write it back.
    pub async fn update<F>(&self, code: &str, apply: F) -> Result<FileRecord, AppError>
    where
        F: FnOnce(&mut FileRecord),
    {
        let mut record = self
            .get(code)
            .await?
            .ok_or_else(|| AppError::not_found(format!("No file found for code {}", code)))?;

        apply(&mut record);
        // The key is fixed; a patch can't move a record to another code.
        record.code = code.to_string();

        self.put(&record).await?;
        Ok(record)
    }

    /// Every record currently on disk, in no particular order
    pub async fn list_all(&self) -> Result<Vec<FileRecord>, AppError> {
        Ok(self.scan().await?.records)
    }

    /// Like `list_all`, but also counts records that exist and could not be
    /// read, so callers can tell a complete listing from a partial one.
    pub async fn scan(&self) -> Result<RecordScan, AppError> {
        let mut entries = match async_fs::read_dir(&self.metadata_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(RecordScan::default()),
            Err(e) => {
                return Err(AppError::persistence_failed(format!(
                    "Failed to read metadata directory: {}",
                    e
                )))
            }
        };

        let mut scan = RecordScan::default();

        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            AppError::persistence_failed(format!("Failed to read directory entry: {}", e))
        })? {
            let path = entry.path();
            let Some(code) = code_from_path(&path) else {
                continue;
            };

            match self.get(&code).await {
                Ok(Some(record)) => scan.records.push(record),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("Skipping metadata file {}: {}", path.display(), e);
                    scan.unreadable += 1;
                }
            }
        }

        Ok(scan)
    }

    /// Remove the record. Deleting an absent record is not an error.
    pub async fn delete(&self, code: &str) -> Result<(), AppError> {
        let Some(path) = self.record_path(code) else {
            return Ok(());
        };

        match async_fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!("Deleted metadata for code {}", code);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::persistence_failed(format!(
                "Failed to delete metadata file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Remove the record under `expected.code` only while it still describes
    /// the same upload. Returns false when the code is gone or now belongs to
    /// a newer upload, which is then left alone.
    pub async fn delete_if_unchanged(&self, expected: &FileRecord) -> Result<bool, AppError> {
        match self.get(&expected.code).await? {
            Some(current)
                if current.id == expected.id
                    && current.storage_locator == expected.storage_locator =>
            {
                self.delete(&expected.code).await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Get the metadata directory path
    pub fn metadata_dir(&self) -> &Path {
        &self.metadata_dir
    }

    fn record_path(&self, code: &str) -> Option<PathBuf> {
        sharing_code::is_valid(code).then(|| self.metadata_dir.join(format!("{}.json", code)))
    }
}

fn code_from_path(path: &Path) -> Option<String> {
    if path.extension()?.to_str()? != "json" {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    sharing_code::is_valid(stem).then(|| stem.to_string())
}
