//! # Core Module
//!
//! Configuration, error types, and shared formatting for the chime
//! reminder core.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

pub mod config;
pub mod errors;
pub mod format;

// Re-export commonly used items
pub use config::Config;
pub use errors::{ParseError, TimerError};
pub use format::{countdown_str, unit_str};
