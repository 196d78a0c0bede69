//! # Cachet REST
//!
//! Admin HTTP API using Axum: health probes plus cache statistics,
//! invalidation and warm-up endpoints.

pub mod controllers;
pub mod middleware;
pub mod responses;
pub mod router;
pub mod state;

pub use router::*;
pub use state::*;
