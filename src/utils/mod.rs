//! Utility functions
//!
//! - [`app_data`] - Configuration file in the application data directory
//! - [`encoding`] - Little-endian fixed-width integer access to byte buffers
//! - [`progress`] - Progress bars, or no-ops without the `progress` feature

pub mod app_data;
pub mod encoding;
pub mod progress;

pub use app_data::*;
pub use encoding::*;
