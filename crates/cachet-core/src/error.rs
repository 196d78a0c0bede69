//! Unified error types for all Cachet crates.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use thiserror::Error;

/// Unified error type for Cachet.
///
/// Crate-local errors (for example the cache crate's `CacheError`) convert
/// into this type when they cross into the server or HTTP layers.
#[derive(Error, Debug)]
pub enum CachetError {
    /// Resource not found
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound {
        resource_type: &'static str,
        id: String,
    },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Backing store / cache error
    #[error("Cache error: {0}")]
    Cache(String),

    /// Backing store unreachable
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Timeout error
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CachetError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::Validation(_) => 400,
            Self::Unavailable(_) | Self::Timeout(_) => 503,
            Self::Configuration(_) | Self::Cache(_) | Self::Internal(_) | Self::Other(_) => 500,
        }
    }

    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Cache(_) => "CACHE_ERROR",
            Self::Unavailable(_) => "SERVICE_UNAVAILABLE",
            Self::Timeout(_) => "TIMEOUT",
            Self::Internal(_) | Self::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// Creates a not found error for a resource.
    #[must_use]
    pub fn not_found<T: ToString>(resource_type: &'static str, id: T) -> Self {
        Self::NotFound {
            resource_type,
            id: id.to_string(),
        }
    }

    /// Creates a validation error.
    #[must_use]
    pub fn validation<T: Into<String>>(message: T) -> Self {
        Self::Validation(message.into())
    }
}

impl From<serde_json::Error> for CachetError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON serialization error: {}", err))
    }
}

/// Serializable error response for API responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error code
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

impl ErrorResponse {
    /// Creates a new error response from a `CachetError`.
    #[must_use]
    pub fn from_error(error: &CachetError) -> Self {
        Self {
            code: error.error_code().to_string(),
            message: error.to_string(),
        }
    }
}

impl From<&CachetError> for ErrorResponse {
    fn from(error: &CachetError) -> Self {
        Self::from_error(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(CachetError::not_found("CacheKey", "a").status_code(), 404);
        assert_eq!(CachetError::validation("empty tag list").status_code(), 400);
        assert_eq!(CachetError::Unavailable("redis down".to_string()).status_code(), 503);
        assert_eq!(CachetError::Timeout("GET".to_string()).status_code(), 503);
        assert_eq!(CachetError::Configuration("no url".to_string()).status_code(), 500);
        assert_eq!(CachetError::Internal("oops".to_string()).status_code(), 500);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(CachetError::not_found("CacheKey", 1).error_code(), "NOT_FOUND");
        assert_eq!(CachetError::validation("bad").error_code(), "VALIDATION_ERROR");
        assert_eq!(CachetError::Configuration("bad".to_string()).error_code(), "CONFIGURATION_ERROR");
        assert_eq!(CachetError::Cache("x".to_string()).error_code(), "CACHE_ERROR");
        assert_eq!(CachetError::Unavailable("x".to_string()).error_code(), "SERVICE_UNAVAILABLE");
        assert_eq!(CachetError::Internal("err".to_string()).error_code(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_error_response_from_error() {
        let err = CachetError::not_found("EntityRule", "invoice");
        let response = ErrorResponse::from_error(&err);
        assert_eq!(response.code, "NOT_FOUND");
        assert!(response.message.contains("invoice"));
    }

    #[test]
    fn test_error_response_serializes_code_and_message() {
        let err = CachetError::validation("empty tag list");
        let json = serde_json::to_value(ErrorResponse::from(&err)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "code": "VALIDATION_ERROR",
                "message": "Validation error: empty tag list",
            })
        );
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: CachetError = json_err.into();
        assert!(matches!(err, CachetError::Internal(_)));
    }
}
