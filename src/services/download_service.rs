use chrono::Utc;
use std::{sync::Arc, time::Duration};

use crate::models::errors::AppError;
use crate::services::metadata_store::MetadataStore;
use crate::services::sharing_code;

/// Where to send the client for a resolved code.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadTicket {
    pub storage_locator: String,
    pub original_name: String,
    pub download_count: u64,
}

impl DownloadTicket {
    /// `Content-Disposition` value that makes the browser save under the original name
    pub fn content_disposition(&self) -> String {
        content_disposition(&self.original_name)
    }
}

/// Resolves sharing codes. Bytes are never streamed through here; callers
/// redirect to the storage locator.
pub struct DownloadService {
    metadata: Arc<MetadataStore>,
    retention: Duration,
}

impl DownloadService {
    pub fn new(metadata: Arc<MetadataStore>, retention: Duration) -> Self {
        Self { metadata, retention }
    }

    /// Look up `code`, refuse it once past the retention window, and count
    /// the download.
    ///
    /// Expiry is decided here at read time; the blob may still exist until
    /// the next sweep.
    pub async fn resolve(&self, code: &str) -> Result<DownloadTicket, AppError> {
        let code = sharing_code::normalize(code);
        if !sharing_code::is_valid(&code) {
            return Err(not_found());
        }

        let record = self
            .metadata
            .get(&code)
            .await
            .map_err(|e| AppError::internal_error(format!("Metadata lookup failed: {}", e)))?
            .ok_or_else(not_found)?;

        if record.is_expired(self.retention, Utc::now()) {
            tracing::debug!("Refusing expired code {}", code);
            return Err(AppError::expired("File has expired"));
        }

        let updated = self
            .metadata
            .update(&code, |r| r.download_count += 1)
            .await
            .map_err(|e| match e {
                // Swept between the read and the write.
                AppError::NotFoundError { .. } => not_found(),
                other => AppError::internal_error(format!("Failed to count download: {}", other)),
            })?;

        tracing::info!(
            "Serving {} for code {} (download #{})",
            updated.original_name,
            code,
            updated.download_count
        );

        Ok(DownloadTicket {
            storage_locator: updated.storage_locator,
            original_name: updated.original_name,
            download_count: updated.download_count,
        })
    }
}

fn not_found() -> AppError {
    AppError::not_found("Invalid code or file has expired")
}

/// Quoted ASCII fallback plus an RFC 5987 `filename*` for non-ASCII names.
pub fn content_disposition(original_name: &str) -> String {
    let fallback: String = original_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();

    if fallback == original_name {
        format!("attachment; filename=\"{}\"", fallback)
    } else {
        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            fallback,
            urlencoding::encode(original_name)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::file_record::FileRecord;
    use chrono::Duration as ChronoDuration;
    use tempfile::TempDir;

    const DAY: Duration = Duration::from_secs(86_400);

    async fn setup(uploaded_hours_ago: i64) -> (TempDir, Arc<MetadataStore>, DownloadService) {
        let temp_dir = TempDir::new().unwrap();
        let metadata = Arc::new(MetadataStore::new(temp_dir.path()));
        metadata
            .put(&FileRecord {
                id: "f00d".to_string(),
                stored_name: "1700000000000-abc.txt".to_string(),
                original_name: "a.txt".to_string(),
                mime_type: "text/plain".to_string(),
                size_bytes: 10,
                uploaded_at: Utc::now() - ChronoDuration::hours(uploaded_hours_ago),
                storage_locator: "http://localhost:3000/blobs/1700000000000-abc.txt".to_string(),
                code: "ABC123".to_string(),
                download_count: 0,
            })
            .await
            .unwrap();
        let service = DownloadService::new(metadata.clone(), DAY);
        (temp_dir, metadata, service)
    }

    #[tokio::test]
    async fn test_resolve_counts_each_download() {
        let (_dir, metadata, service) = setup(0).await;

        for expected in 1..=3 {
            let ticket = service.resolve("ABC123").await.unwrap();
            assert_eq!(ticket.download_count, expected);
            assert_eq!(ticket.original_name, "a.txt");
        }

        let record = metadata.get("ABC123").await.unwrap().unwrap();
        assert_eq!(record.download_count, 3);
    }

    #[tokio::test]
    async fn test_resolve_is_case_insensitive() {
        let (_dir, _metadata, service) = setup(0).await;
        assert!(service.resolve(" abc123 ").await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_codes_are_not_found() {
        let (_dir, _metadata, service) = setup(0).await;
        assert!(matches!(service.resolve("ABCXYZ").await, Err(AppError::NotFoundError { .. })));
        assert!(matches!(service.resolve("../x").await, Err(AppError::NotFoundError { .. })));
    }

    #[tokio::test]
    async fn test_expired_record_is_refused_without_counting() {
        let (_dir, metadata, service) = setup(25).await;

        assert!(matches!(service.resolve("ABC123").await, Err(AppError::ExpiredError { .. })));
        let record = metadata.get("ABC123").await.unwrap().unwrap();
        assert_eq!(record.download_count, 0);
    }

    #[test]
    fn test_content_disposition() {
        assert_eq!(content_disposition("a.txt"), "attachment; filename=\"a.txt\"");
        assert_eq!(
            content_disposition("say \"hi\".txt"),
            "attachment; filename=\"say _hi_.txt\"; filename*=UTF-8''say%20%22hi%22.txt"
        );
        assert!(content_disposition("résumé.pdf").contains("filename*=UTF-8''r%C3%A9sum%C3%A9.pdf"));
    }
}
