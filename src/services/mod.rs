// Business logic services module
// Metadata bookkeeping, blob storage backends and the upload/download/cleanup flows

pub mod blob_store;
pub mod cleanup_service;
pub mod download_service;
pub mod http_blob_store;
pub mod metadata_store;
pub mod sharing_code;
pub mod upload_service;
