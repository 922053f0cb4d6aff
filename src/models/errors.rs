use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Not found: {message}")]
    NotFoundError { message: String },

    #[error("Expired: {message}")]
    ExpiredError { message: String },

    #[error("Conflict: {message}")]
    ConflictError { message: String },

    #[error("Payload too large: {size} bytes exceeds maximum of {max_size} bytes")]
    PayloadTooLarge { size: usize, max_size: usize },

    #[error("Unauthorized: {message}")]
    UnauthorizedError { message: String },

    #[error("Storage error: {message}")]
    StorageError { message: String },

    #[error("Persistence error: {message}")]
    PersistenceError { message: String },

    #[error("Internal server error: {message}")]
    InternalError { message: String },
}

/// JSON body returned for every failed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFoundError { .. } => StatusCode::NOT_FOUND,
            AppError::ExpiredError { .. } => StatusCode::GONE,
            AppError::ConflictError { .. } => StatusCode::CONFLICT,
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::UnauthorizedError { .. } => StatusCode::UNAUTHORIZED,
            AppError::StorageError { .. }
            | AppError::PersistenceError { .. }
            | AppError::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the caller. Dependency failures collapse to a
    /// generic message so paths, URLs and tokens never leave the server.
    pub fn public_message(&self) -> String {
        match self {
            AppError::ValidationError { message }
            | AppError::NotFoundError { message }
            | AppError::ExpiredError { message }
            | AppError::ConflictError { message }
            | AppError::UnauthorizedError { message } => message.clone(),
            AppError::PayloadTooLarge { .. } => self.to_string(),
            AppError::StorageError { .. } => "Error saving file".to_string(),
            AppError::PersistenceError { .. } | AppError::InternalError { .. } => {
                "Error processing request".to_string()
            }
        }
    }

    /// Errors caused by an external dependency rather than the caller.
    pub fn is_server_fault(&self) -> bool {
        matches!(
            self,
            AppError::StorageError { .. }
                | AppError::PersistenceError { .. }
                | AppError::InternalError { .. }
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_server_fault() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        let body = Json(ErrorResponse {
            error: self.public_message(),
        });
        (self.status_code(), body).into_response()
    }
}

// Convenience functions for creating specific errors
impl AppError {
    pub fn validation_failed(message: impl Into<String>) -> Self {
        AppError::ValidationError { message: message.into() }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFoundError { message: message.into() }
    }

    pub fn expired(message: impl Into<String>) -> Self {
        AppError::ExpiredError { message: message.into() }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        AppError::ConflictError { message: message.into() }
    }

    pub fn too_large(size: usize, max_size: usize) -> Self {
        AppError::PayloadTooLarge { size, max_size }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        AppError::UnauthorizedError { message: message.into() }
    }

    pub fn storage_failed(message: impl Into<String>) -> Self {
        AppError::StorageError { message: message.into() }
    }

    pub fn persistence_failed(message: impl Into<String>) -> Self {
        AppError::PersistenceError { message: message.into() }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        AppError::InternalError { message: message.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::validation_failed("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::expired("x").status_code(), StatusCode::GONE);
        assert_eq!(AppError::conflict("x").status_code(), StatusCode::CONFLICT);
        assert_eq!(AppError::too_large(2, 1).status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(AppError::unauthorized("x").status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::storage_failed("x").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::persistence_failed("x").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_server_faults_hide_details() {
        let error = AppError::storage_failed("PUT https://blob.example/abc?token=secret failed");
        assert!(!error.public_message().contains("secret"));

        let error = AppError::persistence_failed("/tmp/metadata/ABC123.json: permission denied");
        assert!(!error.public_message().contains("/tmp/metadata"));
    }

    #[test]
    fn test_client_errors_keep_message() {
        let error = AppError::validation_failed("No sharing code provided.");
        assert_eq!(error.public_message(), "No sharing code provided.");
        assert!(!error.is_server_fault());
    }
}
