//! Configuration management for the helpdesk reporting pipeline

pub mod loader;
pub mod settings;
pub mod validation;

pub use loader::{ConfigError, ConfigLoader};
pub use settings::{CacheConfig, Config, DatabaseConfig, ReportsConfig};
