//! # Cachet Server Library
//!
//! Wiring for the Cachet server: store selection, warm-up seeding,
//! telemetry and startup output.

pub mod app;
pub mod seed;
pub mod startup;
pub mod telemetry;
