use bytes::Bytes;
use chrono::Utc;
use rand::{distr::Alphanumeric, Rng};
use std::{path::Path, sync::Arc, time::Duration};
use uuid::Uuid;

use crate::models::errors::AppError;
use crate::models::file_record::FileRecord;
use crate::services::blob_store::BlobStore;
use crate::services::metadata_store::MetadataStore;
use crate::services::sharing_code;

const MAX_CODE_ATTEMPTS: usize = 8;
const MAX_EXTENSION_LEN: usize = 16;

/// A file received from a client, not yet stored anywhere.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub data: Bytes,
    pub original_name: String,
    pub mime_type: Option<String>,
    pub code: Option<String>,
}

/// Metadata for a blob the client already put into the object store itself.
#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub url: String,
    pub code: String,
    pub original_name: String,
    pub mime_type: Option<String>,
    pub size: u64,
}

#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub record: FileRecord,
    /// False when the record write failed and the failure was tolerated.
    pub metadata_saved: bool,
}

/// Stores uploaded bytes and records who can fetch them under which code.
pub struct UploadService {
    metadata: Arc<MetadataStore>,
    blobs: Arc<dyn BlobStore>,
    retention: Duration,
    max_file_size: usize,
    tolerate_metadata_failures: bool,
}

impl UploadService {
    pub fn new(
        metadata: Arc<MetadataStore>,
        blobs: Arc<dyn BlobStore>,
        retention: Duration,
        max_file_size: usize,
        tolerate_metadata_failures: bool,
    ) -> Self {
        Self {
            metadata,
            blobs,
            retention,
            max_file_size,
            tolerate_metadata_failures,
        }
    }

    /// Validate, store the bytes, then persist the record.
    ///
    /// A blob upload failure aborts before any metadata is written. A record
    /// write failure after the blob is stored is either tolerated (the outcome
    /// reports `metadata_saved: false`) or undoes the blob and fails.
    pub async fn upload(&self, request: UploadRequest) -> Result<UploadOutcome, AppError> {
        if request.data.is_empty() {
            return Err(AppError::validation_failed("No file received."));
        }
        let code = match request.code.as_deref() {
            Some(raw) => sharing_code::parse(raw)?,
            None => return Err(AppError::validation_failed("No sharing code provided.")),
        };
        if request.data.len() > self.max_file_size {
            return Err(AppError::too_large(request.data.len(), self.max_file_size));
        }

        self.claim_code(&code).await?;

        let mime_type = request
            .mime_type
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string());
        let size_bytes = request.data.len() as u64;
        let storage_name = storage_name_for(&request.original_name);

        tracing::info!(
            "Uploading {} ({} bytes, {}) to {} blob store",
            request.original_name,
            size_bytes,
            mime_type,
            self.blobs.backend_name()
        );

        let stored = self.blobs.put(&storage_name, request.data, &mime_type).await?;

        let record = FileRecord {
            id: Uuid::new_v4().simple().to_string(),
            stored_name: stored.name,
            original_name: request.original_name,
            mime_type,
            size_bytes,
            uploaded_at: Utc::now(),
            storage_locator: stored.locator,
            code,
            download_count: 0,
        };

        let metadata_saved = match self.metadata.put(&record).await {
            Ok(()) => true,
            Err(e) if self.tolerate_metadata_failures => {
                tracing::error!(
                    "Failed to save metadata for code {}, continuing: {}",
                    record.code,
                    e
                );
                false
            }
            Err(e) => {
                if let Err(cleanup) = self.blobs.delete(&record.storage_locator).await {
                    tracing::warn!(
                        "Failed to remove blob {} after metadata failure: {}",
                        record.storage_locator,
                        cleanup
                    );
                }
                return Err(e);
            }
        };

        tracing::info!("File {} shared under code {}", record.id, record.code);
        Ok(UploadOutcome { record, metadata_saved })
    }

    /// Record a blob uploaded directly to the object store by the client.
    pub async fn register(&self, request: RegisterRequest) -> Result<FileRecord, AppError> {
        let url = request.url.trim();
        if url.is_empty() {
            return Err(AppError::validation_failed("No blob URL provided."));
        }
        let code = sharing_code::parse(&request.code)?;

        self.claim_code(&code).await?;

        let stored_name = url
            .split('?')
            .next()
            .and_then(|path| path.rsplit('/').next())
            .unwrap_or_default()
            .to_string();

        let record = FileRecord {
            id: Uuid::new_v4().simple().to_string(),
            stored_name,
            original_name: request.original_name,
            mime_type: request
                .mime_type
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string()),
            size_bytes: request.size,
            uploaded_at: Utc::now(),
            storage_locator: url.to_string(),
            code,
            download_count: 0,
        };

        self.metadata.put(&record).await?;
        tracing::info!("Registered client upload {} under code {}", record.id, record.code);
        Ok(record)
    }

    /// A fresh random code that no live record currently holds.
    pub async fn generate_available_code(&self) -> Result<String, AppError> {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = sharing_code::generate();
            if self.live_record(&code).await?.is_none() {
                return Ok(code);
            }
        }
        Err(AppError::internal_error("Could not find an unused sharing code"))
    }

    /// Fail if a live record holds `code`; reclaim it if the holder has expired.
    async fn claim_code(&self, code: &str) -> Result<(), AppError> {
        let existing = match self.metadata.get(code).await {
            Ok(existing) => existing,
            Err(e) if self.tolerate_metadata_failures => {
                tracing::error!("Failed to check code {} before upload, continuing: {}", code, e);
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        let Some(existing) = existing else {
            return Ok(());
        };

        if !existing.is_expired(self.retention, Utc::now()) {
            return Err(AppError::conflict(format!(
                "Sharing code {} is already in use.",
                code
            )));
        }

        tracing::debug!("Reclaiming expired code {}", code);
        self.blobs.delete(&existing.storage_locator).await?;
        self.metadata.delete(code).await
    }

    async fn live_record(&self, code: &str) -> Result<Option<FileRecord>, AppError> {
        let now = Utc::now();
        Ok(self
            .metadata
            .get(code)
            .await?
            .filter(|record| !record.is_expired(self.retention, now)))
    }
}

/// `<unix millis>-<random suffix>[.<ext>]`; the original name only contributes its extension.
pub fn storage_name_for(original_name: &str) -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(|c| (c as char).to_ascii_lowercase())
        .collect();

    let extension = Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(|ext| ext.to_ascii_lowercase());

    let stem = format!("{}-{}", Utc::now().timestamp_millis(), suffix);
    match extension {
        Some(ext) => format!("{}.{}", stem, ext),
        None => stem,
    }
}
