//! Error Types for TIERBENCH API
//!
//! This module defines error handling for the HTTP layer, including:
//! - ApiError struct for structured error responses
//! - ErrorCode enum for categorizing errors
//! - IntoResponse implementation for Axum HTTP responses
//! - Conversions from adapter errors
//!
//! All errors are serialized as JSON with appropriate HTTP status codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tierbench_core::TierError;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes grouped by the HTTP status they map to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation (400)
    ValidationFailed,
    InvalidInput,
    InvalidFormat,

    // Not found (404)
    EntityNotFound,

    // Conflict (409)
    EntityAlreadyExists,

    // Server (500, 503)
    InternalError,
    DatabaseError,
    ServiceUnavailable,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::ValidationFailed | ErrorCode::InvalidInput | ErrorCode::InvalidFormat => {
                StatusCode::BAD_REQUEST
            }
            ErrorCode::EntityNotFound => StatusCode::NOT_FOUND,
            ErrorCode::EntityAlreadyExists => StatusCode::CONFLICT,
            ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::InternalError | ErrorCode::DatabaseError => StatusCode::INTERNAL_SERVER_ERROR,
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

/// Structured API error returned as the JSON body of every failed request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details (e.g., the offending field)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    pub fn invalid_format(field: &str, expected: &str) -> Self {
        Self::new(
            ErrorCode::InvalidFormat,
            format!("Field '{}' has invalid format, expected {}", field, expected),
        )
        .with_details(serde_json::json!({ "field": field }))
    }

    pub fn entity_not_found(entity_type: &str, id: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::EntityNotFound,
            format!("{} with id {} not found", entity_type, id),
        )
    }

    pub fn entity_already_exists(entity_type: &str, key: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::EntityAlreadyExists,
            format!("{} with {} already exists", entity_type, key),
        )
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn database_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
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
        let body = Json(self);
        (status, body).into_response()
    }
}

// ============================================================================
// CONVERSIONS FROM OTHER ERROR TYPES
// ============================================================================

impl From<TierError> for ApiError {
    fn from(err: TierError) -> Self {
        match err {
            TierError::DuplicateKey { email } => {
                ApiError::entity_already_exists("User", format!("email {}", email))
            }
            TierError::AdapterUnavailable { tier, reason } => {
                tracing::error!(%tier, %reason, "Adapter unavailable");
                ApiError::service_unavailable(format!("{} tier unavailable", tier))
            }
            TierError::QueryFailed { tier, reason } => {
                tracing::error!(%tier, %reason, "Adapter query failed");
                // Do not leak driver messages to clients.
                ApiError::database_error(format!("{} tier operation failed", tier))
            }
            TierError::Serialization { key, reason } => {
                tracing::error!(%key, %reason, "Cache value codec failed");
                ApiError::internal_error("Failed to encode or decode a cached value")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tierbench_core::Tier;

    #[test]
    fn test_error_code_status_mapping() {
        assert_eq!(ErrorCode::ValidationFailed.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::InvalidInput.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::InvalidFormat.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::EntityNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::EntityAlreadyExists.status_code(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::ServiceUnavailable.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            ErrorCode::InternalError.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ErrorCode::DatabaseError.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_tier_error_mapping() {
        let dup: ApiError = TierError::DuplicateKey {
            email: "a@test.com".to_string(),
        }
        .into();
        assert_eq!(dup.code, ErrorCode::EntityAlreadyExists);
        assert!(dup.message.contains("a@test.com"));

        let down: ApiError = TierError::unavailable(Tier::Cache, "connection refused").into();
        assert_eq!(down.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(!down.message.contains("refused"));

        let failed: ApiError = TierError::query_failed(Tier::Durable, "syntax error").into();
        assert_eq!(failed.code, ErrorCode::DatabaseError);

        let codec: ApiError = TierError::serialization("user:1", "eof").into();
        assert_eq!(codec.code, ErrorCode::InternalError);
    }

    #[test]
    fn test_error_serialization() -> Result<(), serde_json::Error> {
        let err = ApiError::invalid_format("email", "an email address");
        let json = serde_json::to_value(&err)?;
        assert_eq!(json["code"], "INVALID_FORMAT");
        assert_eq!(json["details"]["field"], "email");

        let plain = serde_json::to_value(ApiError::service_unavailable("cache tier unavailable"))?;
        assert!(plain.get("details").is_none());
        Ok(())
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::entity_not_found("User", 7);
        assert_eq!(err.to_string(), "EntityNotFound: User with id 7 not found");
    }
}
