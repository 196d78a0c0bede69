//! Cache error types.

use cachet_core::CachetError;
use cachet_resilience::TimedOut;
use std::time::Duration;
use thiserror::Error;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache-related errors.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Redis error.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Redis pool error.
    #[error("Redis pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    /// Store command timed out.
    #[error("Store command timed out after {0:?}")]
    Timeout(Duration),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Gzip compression or decompression failed.
    #[error("Compression error: {0}")]
    Compression(std::io::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Store is closed or otherwise unreachable.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl CacheError {
    /// Returns true if the error came from the network path to the store
    /// rather than from the payload.
    pub fn is_transport(&self) -> bool {
        match self {
            CacheError::Redis(e) => {
                e.is_io_error() || e.is_connection_refusal() || e.is_connection_dropped() || e.is_timeout()
            }
            CacheError::Pool(_) | CacheError::Timeout(_) | CacheError::Unavailable(_) => true,
            _ => false,
        }
    }

    /// Returns true if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        // A closed store stays closed.
        self.is_transport() && !matches!(self, CacheError::Unavailable(_))
    }
}

impl From<TimedOut> for CacheError {
    fn from(err: TimedOut) -> Self {
        CacheError::Timeout(err.after)
    }
}

impl From<CacheError> for CachetError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::Timeout(_) => CachetError::Timeout(err.to_string()),
            CacheError::Configuration(msg) => CachetError::Configuration(msg),
            CacheError::Unavailable(_) | CacheError::Pool(_) => CachetError::Unavailable(err.to_string()),
            CacheError::Serialization(_) | CacheError::Compression(_) => CachetError::Internal(err.to_string()),
            CacheError::Redis(_) => CachetError::Cache(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redis::ErrorKind;

    #[test]
    fn test_io_error_is_transport() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err = CacheError::Redis(redis::RedisError::from(io));
        assert!(err.is_transport());
        assert!(err.is_retryable());
    }

    #[test]
    fn test_response_error_is_not_transport() {
        let err = CacheError::Redis(redis::RedisError::from((ErrorKind::TypeError, "WRONGTYPE")));
        assert!(!err.is_transport());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_unavailable_is_not_retried() {
        let err = CacheError::Unavailable("store closed".to_string());
        assert!(err.is_transport());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_timeout_from_timed_out() {
        let err: CacheError = TimedOut { after: Duration::from_secs(2) }.into();
        assert!(matches!(err, CacheError::Timeout(d) if d == Duration::from_secs(2)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_into_cachet_error() {
        let err: CachetError = CacheError::Timeout(Duration::from_millis(5)).into();
        assert!(matches!(err, CachetError::Timeout(_)));

        let err: CachetError = CacheError::Unavailable("closed".to_string()).into();
        assert_eq!(err.status_code(), 503);

        let json = serde_json::from_str::<u8>("x").unwrap_err();
        let err: CachetError = CacheError::Serialization(json).into();
        assert_eq!(err.error_code(), "INTERNAL_ERROR");
    }
}
