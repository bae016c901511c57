//! Error Types for the termcache API
//!
//! This module defines error handling for the HTTP layer:
//! - ErrorCode enum for categorizing errors
//! - ApiError struct for structured error responses
//! - IntoResponse implementation for Axum HTTP responses
//! - Conversion from `TermcacheError`
//!
//! All errors are serialized as JSON with the matching HTTP status code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use termcache_core::{QueryError, StorageError, TermcacheError};

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Request contains invalid input data
    InvalidInput,

    /// Requested record does not exist
    EntityNotFound,

    /// Operation conflicts with current state (a reload is already running)
    StateConflict,

    /// Internal server error
    InternalError,

    /// Cache store operation failed
    DatabaseError,

    /// Upstream source request failed
    UpstreamError,

    /// Snapshot not ready, or the store is not open
    ServiceUnavailable,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorCode::EntityNotFound => StatusCode::NOT_FOUND,
            ErrorCode::StateConflict => StatusCode::CONFLICT,
            ErrorCode::UpstreamError => StatusCode::BAD_GATEWAY,
            ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::InternalError | ErrorCode::DatabaseError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get a default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::InvalidInput => "Invalid input data",
            ErrorCode::EntityNotFound => "Entity not found",
            ErrorCode::StateConflict => "Operation conflicts with current state",
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Cache store operation failed",
            ErrorCode::UpstreamError => "Upstream request failed",
            ErrorCode::ServiceUnavailable => "Service temporarily unavailable",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error response for API operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Create a new API error with the given code, using the default message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.default_message())
    }

    /// Add additional details to the error.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    // ========================================================================
    // Convenience constructors for common errors
    // ========================================================================

    /// Create an InvalidInput error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Create an EntityNotFound error for a record id.
    pub fn record_not_found(id: &str) -> Self {
        Self::new(ErrorCode::EntityNotFound, "Record not found")
            .with_details(serde_json::json!({ "id": id }))
    }

    /// Create an EntityNotFound error for an empty snapshot.
    pub fn no_records() -> Self {
        Self::new(ErrorCode::EntityNotFound, "No records found")
    }

    /// Create a ServiceUnavailable error.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    /// Create an InternalError error.
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(self)).into_response()
    }
}

// ============================================================================
// CONVERSIONS
// ============================================================================

impl From<TermcacheError> for ApiError {
    fn from(err: TermcacheError) -> Self {
        match &err {
            TermcacheError::Query(QueryError::Unavailable) => {
                ApiError::service_unavailable("Cache is not ready")
            }
            TermcacheError::Query(QueryError::ReloadInProgress) => {
                ApiError::new(ErrorCode::StateConflict, err.to_string())
            }
            TermcacheError::Storage(StorageError::NotOpen)
            | TermcacheError::Storage(StorageError::Unavailable { .. }) => {
                tracing::warn!(error = %err, "Cache store unavailable");
                ApiError::service_unavailable("Cache store unavailable")
            }
            TermcacheError::Storage(_) => {
                tracing::error!(error = %err, "Cache store error");
                ApiError::from_code(ErrorCode::DatabaseError)
            }
            TermcacheError::Upstream(_) => {
                tracing::error!(error = %err, "Upstream error");
                ApiError::new(ErrorCode::UpstreamError, err.to_string())
            }
            TermcacheError::Config(_) => ApiError::invalid_input(err.to_string()),
            TermcacheError::Pipeline(_) => {
                tracing::error!(error = %err, "Pipeline task error");
                ApiError::from_code(ErrorCode::InternalError)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use termcache_core::UpstreamError;

    #[test]
    fn test_error_code_status_mapping() {
        assert_eq!(ErrorCode::InvalidInput.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::EntityNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::StateConflict.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ErrorCode::ServiceUnavailable.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ErrorCode::DatabaseError.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_termcache_error_mapping() {
        let unavailable: ApiError = TermcacheError::from(QueryError::Unavailable).into();
        assert_eq!(unavailable.code, ErrorCode::ServiceUnavailable);

        let busy: ApiError = TermcacheError::from(QueryError::ReloadInProgress).into();
        assert_eq!(busy.status_code(), StatusCode::CONFLICT);

        let not_open: ApiError = TermcacheError::from(StorageError::NotOpen).into();
        assert_eq!(not_open.code, ErrorCode::ServiceUnavailable);

        let txn: ApiError = TermcacheError::from(StorageError::TransactionFailed {
            reason: "MDB_PANIC".to_string(),
        })
        .into();
        assert_eq!(txn.code, ErrorCode::DatabaseError);
        assert!(!txn.message.contains("MDB_PANIC"));

        let upstream: ApiError = TermcacheError::from(UpstreamError::FetchFailed {
            offset: 0,
            reason: "timeout".to_string(),
        })
        .into();
        assert_eq!(upstream.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_api_error_json_shape() {
        let json = serde_json::to_value(ApiError::record_not_found("abc"))
            .expect("error should serialize");
        assert_eq!(json["code"], "ENTITY_NOT_FOUND");
        assert_eq!(json["message"], "Record not found");
        assert_eq!(json["details"]["id"], "abc");

        let json = serde_json::to_value(ApiError::no_records()).expect("error should serialize");
        assert!(json.get("details").is_none());
    }
}
