// Library exports for testing and external use

pub mod handlers;
pub mod models;
pub mod services;
pub mod utils;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::services::ServeDir;

use models::errors::AppError;
use services::{
    blob_store::{BlobStore, LocalBlobStore, LOCAL_BLOB_ROUTE},
    cleanup_service::CleanupService,
    download_service::DownloadService,
    http_blob_store::HttpBlobStore,
    metadata_store::MetadataStore,
    upload_service::UploadService,
};
use utils::config::AppConfig;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub metadata: Arc<MetadataStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub uploads: Arc<UploadService>,
    pub downloads: Arc<DownloadService>,
    pub cleanup: Arc<CleanupService>,
}

impl AppState {
    /// Build every service from the configuration, picking the blob backend
    /// the configuration asks for.
    pub fn from_config(config: AppConfig) -> Result<Self, AppError> {
        let blobs: Arc<dyn BlobStore> = match (&config.blob_api_url, &config.blob_token) {
            (Some(api_url), Some(token)) => Arc::new(HttpBlobStore::new(api_url, token)?),
            _ => Arc::new(LocalBlobStore::new(
                &config.blob_dir,
                config.public_base_url.clone(),
            )),
        };
        Ok(Self::with_blob_store(config, blobs))
    }

    pub fn with_blob_store(config: AppConfig, blobs: Arc<dyn BlobStore>) -> Self {
        let metadata = Arc::new(MetadataStore::new(&config.metadata_dir));

        let uploads = Arc::new(UploadService::new(
            metadata.clone(),
            blobs.clone(),
            config.retention,
            config.max_file_size,
            config.tolerates_metadata_failures(),
        ));
        let downloads = Arc::new(DownloadService::new(metadata.clone(), config.retention));
        let cleanup = Arc::new(CleanupService::new(
            metadata.clone(),
            blobs.clone(),
            config.retention,
        ));

        Self {
            config: Arc::new(config),
            metadata,
            blobs,
            uploads,
            downloads,
            cleanup,
        }
    }
}

/// All application routes, without the transport middleware added in `main`
pub fn build_router(app_state: AppState) -> Router {
    let mut router = Router::new()
        // Health check endpoint
        .route("/health", get(handlers::health::health_check))
        .route("/api/health", get(handlers::health::health_check))
        // Sharing flow
        .route("/api/code", get(handlers::upload::new_code))
        .route("/api/upload", post(handlers::upload::upload_file))
        .route("/api/upload-metadata", post(handlers::upload::upload_metadata))
        .route("/api/download/:code", get(handlers::download::download_file))
        .route(
            "/api/cleanup",
            get(handlers::cleanup::run_cleanup).post(handlers::cleanup::run_cleanup),
        )
        .route("/", get(handlers::index::index));

    // The local backend's locators point back at this server.
    if !app_state.config.uses_remote_blob_store() {
        router = router.nest_service(LOCAL_BLOB_ROUTE, ServeDir::new(&app_state.config.blob_dir));
    }

    router.with_state(app_state)
}
