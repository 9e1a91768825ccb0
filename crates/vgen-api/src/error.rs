//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use vgen_db::DbError;
use vgen_providers::ProviderError;
use vgen_storage::StorageError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Db(DbError),

    #[error("Storage error: {0}")]
    Storage(StorageError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Db(DbError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Db(DbError::Conflict(_)) => StatusCode::CONFLICT,
            ApiError::Storage(StorageError::NotFound(_)) => StatusCode::NOT_FOUND,
            // Quota exhaustion on the synchronous submit path is the one
            // provider error the caller is meant to see
            ApiError::Provider(ProviderError::QuotaExhausted(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_)
            | ApiError::Db(_)
            | ApiError::Storage(_)
            | ApiError::Provider(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        Self::Db(e)
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't expose internal error details in production
        let detail = match &self {
            ApiError::Internal(_)
            | ApiError::Db(_)
            | ApiError::Storage(_)
            | ApiError::Provider(_)
                if status == StatusCode::INTERNAL_SERVER_ERROR
                    && std::env::var("ENVIRONMENT").unwrap_or_default() == "production" =>
            {
                "An internal error occurred".to_string()
            }
            _ => self.to_string(),
        };

        (status, Json(ErrorResponse { detail })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_taxonomy_maps_to_status_codes() {
        assert_eq!(
            ApiError::not_found("task 1").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Conflict("dup".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::validation("bad url").status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::bad_request("too many files").status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_transport_errors_keep_semantics() {
        assert_eq!(
            ApiError::from(DbError::not_found("task 9")).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(DbError::conflict("unique")).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(StorageError::not_found("9")).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(ProviderError::QuotaExhausted("429".into())).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::from(ProviderError::RequestFailed("boom".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
