use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::Json,
};

use crate::models::errors::AppError;
use crate::services::cleanup_service::SweepReport;
use crate::AppState;

/// Run one sweep. When a cleanup secret is configured the caller must send
/// `Authorization: Bearer <secret>`.
pub async fn run_cleanup(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SweepReport>, AppError> {
    if let Some(secret) = app_state.config.cleanup_secret.as_deref() {
        let provided = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));

        if !provided.is_some_and(|token| constant_time_eq(token.as_bytes(), secret.as_bytes())) {
            tracing::warn!("Rejected cleanup trigger with missing or wrong token");
            return Err(AppError::unauthorized("Unauthorized"));
        }
    }

    let report = app_state.cleanup.sweep().await?;
    Ok(Json(report))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
