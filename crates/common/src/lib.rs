//! Montage Common Utilities
//!
//! Shared infrastructure for all Montage crates:
//! - Error types and result aliases
//! - Engine and logging configuration
//! - Tracing/logging initialization

pub mod config;
pub mod error;
pub mod logging;

pub use config::*;
pub use error::*;
