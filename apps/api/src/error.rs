//! API error type and HTTP mapping.
//!
//! Every handler returns `Result<_, ApiError>`; the `IntoResponse` impl
//! turns the error into a JSON body of the form `{"error": "..."}` with
//! the matching status code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use verde_core::CoreError;
use verde_db::{BatchError, DbError};

/// Unified API error.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Client sent something unusable (bad dates, bad amounts, ...).
    #[error("{0}")]
    BadRequest(String),

    #[error("{0} not found: {1}")]
    NotFound(String, String),

    /// Request conflicts with current state (already invoiced, read-only
    /// row, concurrent batch).
    #[error("{0}")]
    Conflict(String),

    /// The external invoice issuer failed.
    #[error("{0}")]
    Issuance(String),

    #[error("internal error")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_, _) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Issuance(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            // Detail stays in the log; the client sees a generic message.
            if let ApiError::Internal(detail) = &self {
                error!(%detail, "Internal error");
            }
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::NotFound(entity, id),
            DbError::UniqueViolation { .. } => ApiError::Conflict(err.to_string()),
            DbError::ForeignKeyViolation { .. } => ApiError::Conflict(err.to_string()),
            DbError::Conflict(msg) => ApiError::Conflict(msg),
            DbError::InvalidInput(e) => ApiError::BadRequest(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<BatchError> for ApiError {
    fn from(err: BatchError) -> Self {
        match err {
            BatchError::EmptyBatch(_) => ApiError::Conflict(err.to_string()),
            BatchError::ConcurrencyConflict => ApiError::Conflict(err.to_string()),
            BatchError::AlreadyInvoiced(_) => ApiError::Conflict(err.to_string()),
            BatchError::SaleNotFound(id) => ApiError::NotFound("Sale".to_string(), id),
            BatchError::Issuance(e) => ApiError::Issuance(e.to_string()),
            BatchError::Db(db) => ApiError::from(db),
        }
    }
}
