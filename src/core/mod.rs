//! Configuration and error handling shared by every reporter component.

#![warn(missing_docs)]

pub mod config;
pub mod error;

// Re-export commonly used types
pub use config::{normalise_url, ConfigBuilder, ReporterConfig};
pub use error::{ReporterError, Result};
