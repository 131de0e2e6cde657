//! # Helpdesk Common
//!
//! Shared records, errors, and utilities for the helpdesk reporting pipeline.
//!
//! This crate provides the foundational types used across all other crates
//! in the workspace: raw and enriched conversation records, the error type,
//! and logging setup.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod logging;
pub mod types;
pub mod utils;

#[cfg(any(test, feature = "testing"))]
pub mod test_utils;

// Re-export commonly used types
pub use error::{ReportError, Result};
pub use logging::{init_default_logging, init_dev_logging, init_logging, LoggingConfig};
pub use types::*;
pub use utils::*;
