//! Timeout wrapper for async operations.

use cachet_core::CachetError;
use std::fmt;
use std::time::Duration;

/// Marker error produced when [`with_timeout`] gives up on an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedOut {
    /// How long the operation was allowed to run.
    pub after: Duration,
}

impl fmt::Display for TimedOut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Operation timed out after {:?}", self.after)
    }
}

impl std::error::Error for TimedOut {}

impl From<TimedOut> for CachetError {
    fn from(err: TimedOut) -> Self {
        CachetError::Timeout(err.to_string())
    }
}

/// Wraps an async operation with a timeout.
///
/// The inner future is dropped when the deadline passes, which aborts any
/// in-flight I/O it owns.
pub async fn with_timeout<F, Fut, T, E>(duration: Duration, f: F) -> Result<T, E>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: From<TimedOut>,
{
    tokio::time::timeout(duration, f())
        .await
        .map_err(|_| E::from(TimedOut { after: duration }))?
}
