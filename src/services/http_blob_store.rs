use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::models::errors::AppError;
use crate::services::blob_store::{BlobEntry, BlobStore, StoredBlob};

const CONNECT_TIMEOUT_SECS: u64 = 10;
const TOTAL_TIMEOUT_SECS: u64 = 120;
const API_VERSION: &str = "7";
const LIST_PAGE_SIZE: u32 = 1000;

/// Remote object store speaking a Vercel-Blob-style REST API.
///
/// Writes, listings and deletes are authorised with a bearer token; uploaded
/// objects are public and their URL is the locator.
pub struct HttpBlobStore {
    client: Client,
    api_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct PutResponse {
    url: String,
    pathname: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListedBlob {
    url: String,
    pathname: String,
    size: u64,
    uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    blobs: Vec<ListedBlob>,
    cursor: Option<String>,
    #[serde(default)]
    has_more: bool,
}

impl HttpBlobStore {
    pub fn new(api_url: impl Into<String>, token: impl Into<String>) -> Result<Self, AppError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(TOTAL_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::storage_failed(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }

    async fn check(response: reqwest::Response, action: &str) -> Result<reqwest::Response, AppError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(AppError::storage_failed(format!(
            "Blob {} failed with HTTP {}: {}",
            action, status, body
        )))
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn put(&self, name: &str, data: Bytes, content_type: &str) -> Result<StoredBlob, AppError> {
        let size = data.len() as u64;
        let response = self
            .client
            .put(format!("{}/{}", self.api_url, name))
            .header("authorization", self.bearer())
            .header("x-api-version", API_VERSION)
            .header("x-content-type", content_type)
            .header("x-add-random-suffix", "0")
            .body(data)
            .send()
            .await
            .map_err(|e| AppError::storage_failed(format!("Blob upload request failed: {}", e)))?;

        let stored: PutResponse = Self::check(response, "upload")
            .await?
            .json()
            .await
            .map_err(|e| AppError::storage_failed(format!("Invalid blob upload response: {}", e)))?;

        tracing::debug!("Uploaded blob {} to remote store", stored.pathname);
        Ok(StoredBlob {
            locator: stored.url,
            name: stored.pathname,
            size,
        })
    }

    async fn list(&self) -> Result<Vec<BlobEntry>, AppError> {
        let mut blobs = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(&self.api_url)
                .header("authorization", self.bearer())
                .header("x-api-version", API_VERSION)
                .query(&[("limit", LIST_PAGE_SIZE.to_string())]);
            if let Some(cursor) = &cursor {
                request = request.query(&[("cursor", cursor)]);
            }

            let response = request
                .send()
                .await
                .map_err(|e| AppError::storage_failed(format!("Blob list request failed: {}", e)))?;

            let page: ListResponse = Self::check(response, "list")
                .await?
                .json()
                .await
                .map_err(|e| AppError::storage_failed(format!("Invalid blob list response: {}", e)))?;

            blobs.extend(page.blobs.into_iter().map(|blob| BlobEntry {
                locator: blob.url,
                name: blob.pathname,
                size: blob.size,
                uploaded_at: blob.uploaded_at,
            }));

            match page.cursor {
                Some(next) if page.has_more => cursor = Some(next),
                _ => break,
            }
        }

        Ok(blobs)
    }

    async fn delete(&self, locator: &str) -> Result<(), AppError> {
        let response = self
            .client
            .post(format!("{}/delete", self.api_url))
            .header("authorization", self.bearer())
            .header("x-api-version", API_VERSION)
            .json(&json!({ "urls": [locator] }))
            .send()
            .await
            .map_err(|e| AppError::storage_failed(format!("Blob delete request failed: {}", e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::check(response, "delete").await?;

        tracing::debug!("Deleted remote blob {}", locator);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "http"
    }
}
