//! Error types for mlib-server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::catalog::CatalogError;
use crate::services::MetadataError;
use crate::verses::VerseError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409), e.g. a concurrent writer claimed the group name first
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Metadata provider failure (502)
    #[error("Bad gateway: {0}")]
    BadGateway(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::InvalidInput(msg) => ApiError::BadRequest(msg),
            CatalogError::SongNotFound(id) => ApiError::NotFound(format!("song {}", id)),
            err @ CatalogError::Conflict { .. } => {
                warn!("Catalog conflict: {}", err);
                ApiError::Conflict(err.to_string())
            }
            err @ CatalogError::Storage { .. } => {
                error!("Catalog storage failure: {}", err);
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<VerseError> for ApiError {
    fn from(err: VerseError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<MetadataError> for ApiError {
    fn from(err: MetadataError) -> Self {
        match err {
            err @ MetadataError::BadRequest(_) => ApiError::BadRequest(err.to_string()),
            other => ApiError::BadGateway(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", msg),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg,
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
