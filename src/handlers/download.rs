use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::models::errors::AppError;
use crate::AppState;

/// Resolve a sharing code and redirect to the stored bytes
pub async fn download_file(
    State(app_state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Response, AppError> {
    let ticket = app_state.downloads.resolve(&code).await?;

    Ok((
        StatusCode::TEMPORARY_REDIRECT,
        [
            (header::LOCATION, ticket.storage_locator.clone()),
            (header::CONTENT_DISPOSITION, ticket.content_disposition()),
            (header::CACHE_CONTROL, "no-store".to_string()),
        ],
    )
        .into_response())
}
