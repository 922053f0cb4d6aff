use crate::models::errors::AppError;
use crate::services::upload_service::{RegisterRequest, UploadRequest};
use crate::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    response::Json,
};
use bytes::{Bytes, BytesMut};
use futures_util::TryStreamExt;
use multer::Multipart;
use serde::Deserialize;
use serde_json::{json, Value};

/// Handle a multipart upload carrying a `file` part and a `code` part
pub async fn upload_file(
    State(app_state): State<AppState>,
    request: Request<Body>,
) -> Result<Json<Value>, AppError> {
    let boundary = request
        .headers()
        .get("content-type")
        .and_then(|ct| ct.to_str().ok())
        .and_then(|ct| multer::parse_boundary(ct).ok())
        .ok_or_else(|| AppError::validation_failed("Missing or invalid multipart boundary"))?;

    tracing::debug!(
        blob_backend = app_state.blobs.backend_name(),
        has_blob_token = app_state.config.blob_token.is_some(),
        "Receiving upload"
    );

    // Convert the request body to a stream
    let stream = request
        .into_body()
        .into_data_stream()
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err));

    let mut multipart = Multipart::new(stream, boundary);
    let max_file_size = app_state.config.max_file_size;

    let mut file: Option<(Bytes, String, Option<String>)> = None;
    let mut code: Option<String> = None;

    while let Some(mut field) = multipart.next_field().await.map_err(|e| {
        tracing::warn!("Failed to read multipart field: {}", e);
        AppError::validation_failed(format!("Failed to parse upload: {}", e))
    })? {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "file" => {
                let filename = field
                    .file_name()
                    .filter(|f| !f.trim().is_empty())
                    .unwrap_or("file")
                    .to_string();
                let content_type = field.content_type().map(|m| m.to_string());

                let mut data = BytesMut::new();
                while let Some(chunk) = field.chunk().await.map_err(|e| {
                    tracing::warn!("Failed to read file data: {}", e);
                    AppError::validation_failed(format!("Failed to read file data: {}", e))
                })? {
                    if data.len() + chunk.len() > max_file_size {
                        return Err(AppError::too_large(data.len() + chunk.len(), max_file_size));
                    }
                    data.extend_from_slice(&chunk);
                }

                tracing::debug!(
                    "Received file part: {} ({} bytes, content_type: {:?})",
                    filename,
                    data.len(),
                    content_type
                );
                file = Some((data.freeze(), filename, content_type));
            }
            "code" => {
                let value = field.text().await.map_err(|e| {
                    AppError::validation_failed(format!("Failed to read sharing code: {}", e))
                })?;
                code = Some(value);
            }
            other => tracing::debug!("Ignoring multipart field: {}", other),
        }
    }

    let Some((data, original_name, mime_type)) = file.filter(|(data, _, _)| !data.is_empty())
    else {
        return Err(AppError::validation_failed("No file received."));
    };

    let outcome = app_state
        .uploads
        .upload(UploadRequest {
            data,
            original_name,
            mime_type,
            code,
        })
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "File uploaded successfully",
        "fileId": outcome.record.id,
        "code": outcome.record.code,
        "url": outcome.record.storage_locator
    })))
}

/// Body of the client-side upload registration
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadMetadataRequest {
    pub url: String,
    pub code: String,
    pub original_name: String,
    pub mimetype: Option<String>,
    #[serde(default)]
    pub size: u64,
}

/// Register metadata for a blob the client uploaded to the object store itself
pub async fn upload_metadata(
    State(app_state): State<AppState>,
    Json(request): Json<UploadMetadataRequest>,
) -> Result<Json<Value>, AppError> {
    let record = app_state
        .uploads
        .register(RegisterRequest {
            url: request.url,
            code: request.code,
            original_name: request.original_name,
            mime_type: request.mimetype,
            size: request.size,
        })
        .await?;

    Ok(Json(json!({
        "success": true,
        "metadata": record
    })))
}

/// Hand out a fresh sharing code for the client to upload with
pub async fn new_code(State(app_state): State<AppState>) -> Result<Json<Value>, AppError> {
    let code = app_state.uploads.generate_available_code().await?;
    Ok(Json(json!({ "code": code })))
}
