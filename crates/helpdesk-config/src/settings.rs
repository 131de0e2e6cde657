//! Application configuration structures

use helpdesk_common::{LoggingConfig, ReplyTimeUnit};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Config {
    /// Row store connection settings
    #[validate]
    pub database: DatabaseConfig,

    /// Reporting pipeline settings
    #[validate]
    pub reports: ReportsConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL
    #[validate(length(min = 1, message = "Database URL cannot be empty"))]
    pub url: String,

    /// Maximum number of database connections in the pool
    #[validate(range(min = 1, max = 100, message = "Max connections must be between 1 and 100"))]
    pub max_connections: u32,
}

/// Reporting pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ReportsConfig {
    /// Conversations loaded per chunk
    #[validate(range(min = 1, max = 10000, message = "Batch size must be between 1 and 10000"))]
    pub batch_size: usize,

    /// Most recent replies loaded per chunk, across all conversations in it
    #[validate(range(min = 1, max = 100000, message = "Reply limit must be between 1 and 100000"))]
    pub reply_limit: usize,

    /// Agent identities loaded once per report run
    #[validate(range(min = 1, max = 500, message = "Agent limit must be between 1 and 500"))]
    pub agent_limit: usize,

    /// Rows kept in ranked lists (tags, agents)
    #[validate(range(min = 1, max = 500, message = "List limit must be between 1 and 500"))]
    pub list_limit: usize,

    /// Band width for first reply times
    pub first_reply_unit: ReplyTimeUnit,

    /// Timezone used when a request does not name one
    #[validate(custom = "crate::validation::validate_timezone")]
    pub default_timezone: String,

    /// Report cache settings
    #[validate]
    pub cache: CacheConfig,
}

/// Report cache configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether computed reports are cached at all
    pub enabled: bool,

    /// Time-to-live for a cached report, in minutes
    #[validate(range(min = 1, max = 10080, message = "Report cache minutes must be between 1 and 10080"))]
    pub report_minutes: u64,

    /// Maximum number of cached reports
    #[validate(range(min = 1, message = "Max capacity must be at least 1"))]
    pub max_capacity: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://helpdesk.db".to_string(),
            max_connections: 5,
        }
    }
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            reply_limit: 1000,
            agent_limit: 50,
            list_limit: 10,
            first_reply_unit: ReplyTimeUnit::Minutes,
            default_timezone: "UTC".to_string(),
            cache: CacheConfig::default(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            report_minutes: 60,
            max_capacity: 1000,
        }
    }
}

impl CacheConfig {
    /// Report time-to-live as a `Duration`
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.report_minutes * 60)
    }
}

impl Config {
    /// Comprehensive validation of the entire configuration
    pub fn validate_all(&self) -> Result<(), validator::ValidationErrors> {
        self.validate()?;

        let mut errors = validator::ValidationErrors::new();
        if let Err(err) = crate::validation::validate_log_level(&self.logging.level) {
            errors.add("logging_level", err);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
