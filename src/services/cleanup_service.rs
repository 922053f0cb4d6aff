use chrono::Utc;
use serde::Serialize;
use std::{collections::HashSet, sync::Arc, time::Duration};

use crate::models::errors::AppError;
use crate::services::blob_store::BlobStore;
use crate::services::metadata_store::MetadataStore;

/// Outcome of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    /// Expired records removed together with their blob
    pub deleted: usize,
    /// Expired blobs that no record referenced
    pub orphaned_blobs: usize,
    /// Items left in place because a delete failed; the next sweep retries them
    pub failed: usize,
}

/// Best-effort garbage collection of expired shares.
///
/// Nothing spans more than one item, so a sweep that fails halfway leaves
/// every item either fully present or fully gone. Overlapping sweeps are
/// safe because deleting something already deleted is a no-op.
pub struct CleanupService {
    metadata: Arc<MetadataStore>,
    blobs: Arc<dyn BlobStore>,
    retention: Duration,
}

impl CleanupService {
    pub fn new(metadata: Arc<MetadataStore>, blobs: Arc<dyn BlobStore>, retention: Duration) -> Self {
        Self {
            metadata,
            blobs,
            retention,
        }
    }

    pub async fn sweep(&self) -> Result<SweepReport, AppError> {
        let now = Utc::now();
        let mut report = SweepReport::default();
        let mut referenced = HashSet::new();

        let scan = self.metadata.scan().await?;

        for record in scan.records {
            if !record.is_expired(self.retention, now) {
                referenced.insert(record.storage_locator);
                continue;
            }

            // Blob first; the record is only dropped once its bytes are gone.
            if let Err(e) = self.blobs.delete(&record.storage_locator).await {
                tracing::warn!("Failed to delete blob for expired code {}: {}", record.code, e);
                referenced.insert(record.storage_locator);
                report.failed += 1;
                continue;
            }

            // An upload may have reclaimed the code while the blob was deleted.
            match self.metadata.delete_if_unchanged(&record).await {
                Ok(true) => {
                    tracing::debug!("Swept expired code {}", record.code);
                    report.deleted += 1;
                }
                Ok(false) => {
                    tracing::debug!("Code {} was reclaimed during the sweep", record.code);
                }
                Err(e) => {
                    tracing::warn!("Failed to delete metadata for code {}: {}", record.code, e);
                    report.failed += 1;
                }
            }
        }

        if scan.unreadable > 0 {
            tracing::warn!(
                "Skipping orphan sweep, {} metadata records could not be read",
                scan.unreadable
            );
        } else {
            self.sweep_orphans(&referenced, &mut report).await;
        }

        if report.deleted > 0 || report.orphaned_blobs > 0 || report.failed > 0 {
            tracing::info!(
                "Sweep finished: {} expired, {} orphaned blobs, {} failures",
                report.deleted,
                report.orphaned_blobs,
                report.failed
            );
        }

        Ok(report)
    }

    /// Blobs whose record was never written (or was lost) are reclaimed once
    /// they are older than the retention window.
    async fn sweep_orphans(&self, referenced: &HashSet<String>, report: &mut SweepReport) {
        let blobs = match self.blobs.list().await {
            Ok(blobs) => blobs,
            Err(e) => {
                tracing::warn!("Skipping orphan sweep, blob listing failed: {}", e);
                return;
            }
        };

        let now = Utc::now();
        for blob in blobs {
            let age = (now - blob.uploaded_at).to_std().unwrap_or(Duration::ZERO);
            if age <= self.retention || referenced.contains(&blob.locator) {
                continue;
            }

            match self.blobs.delete(&blob.locator).await {
                Ok(()) => {
                    tracing::debug!("Deleted orphaned blob {}", blob.name);
                    report.orphaned_blobs += 1;
                }
                Err(e) => {
                    tracing::warn!("Failed to delete orphaned blob {}: {}", blob.name, e);
                    report.failed += 1;
                }
            }
        }
    }
}
