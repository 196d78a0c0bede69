//! # Cachet Resilience
//!
//! Bounded retry and per-call timeouts for calls against the backing store.

pub mod retry;
pub mod timeout;

pub use retry::*;
pub use timeout::*;
