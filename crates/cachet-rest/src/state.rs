//! Application state for Axum handlers.

use cachet_cache::{CacheEngine, WarmUpCoordinator};
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<CacheEngine>,
    pub warmup: Arc<WarmUpCoordinator>,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(cache: Arc<CacheEngine>, warmup: Arc<WarmUpCoordinator>) -> Self {
        Self { cache, warmup }
    }
}
