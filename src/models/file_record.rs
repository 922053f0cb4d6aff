use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Metadata for one shared file, persisted as one JSON document per code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: String,
    pub stored_name: String,
    pub original_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub uploaded_at: DateTime<Utc>,
    pub storage_locator: String,
    pub code: String,
    pub download_count: u64,
}

impl FileRecord {
    /// Time elapsed since upload. A timestamp in the future counts as zero.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.uploaded_at).to_std().unwrap_or(Duration::ZERO)
    }

    /// True once the record is strictly older than the retention window.
    pub fn is_expired(&self, retention: Duration, now: DateTime<Utc>) -> bool {
        self.age(now) > retention
    }
}
