//! # Cachet Core
//!
//! Error and result types shared by every Cachet crate. Component crates
//! define their own narrower error enums and convert into [`CachetError`]
//! at their boundary.

pub mod error;
pub mod result;

pub use error::*;
pub use result::*;
