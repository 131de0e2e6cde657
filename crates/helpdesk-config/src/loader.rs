//! Configuration loading utilities

use crate::Config;
use helpdesk_common::{ReplyTimeUnit, Result as ReportResult};
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error when reading configuration file
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML configuration: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Configuration validation error
    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    /// Environment variable parsing error
    #[error("Failed to parse environment variable '{var}': {source}")]
    EnvParseError {
        var: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl From<ConfigError> for helpdesk_common::ReportError {
    fn from(err: ConfigError) -> Self {
        helpdesk_common::ReportError::config_with_source("Failed to load configuration", err)
    }
}

/// Configuration loader for the application
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a YAML file with environment variable overrides
    pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        info!("Loading configuration from {:?}", path.as_ref());
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::load_str(&content)
    }

    /// Parse configuration from YAML text, then apply overrides and validate
    pub fn load_str(content: &str) -> Result<Config, ConfigError> {
        let mut config: Config = serde_yaml::from_str(content)?;
        Self::apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load configuration from the environment and well-known file locations
    pub fn load() -> ReportResult<Config> {
        let config = if let Ok(config_path) = env::var("HELPDESK_CONFIG_PATH") {
            Self::load_config(&config_path)?
        } else if Path::new("config.yaml").exists() {
            Self::load_config("config.yaml")?
        } else if Path::new("config.yml").exists() {
            Self::load_config("config.yml")?
        } else {
            debug!("No configuration file found, using defaults");
            let mut config = Config::default();
            Self::apply_env_overrides(&mut config)?;
            config.validate_all().map_err(ConfigError::ValidationError)?;
            config
        };

        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> ReportResult<Config> {
        Ok(Self::load_config(path)?)
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(config: &mut Config) -> Result<(), ConfigError> {
        if let Ok(url) = env::var("HELPDESK_DATABASE_URL") {
            config.database.url = url;
        }

        if let Some(value) = parse_env::<u32>("HELPDESK_DATABASE_MAX_CONNECTIONS")? {
            config.database.max_connections = value;
        }

        if let Some(value) = parse_env::<usize>("HELPDESK_REPORT_BATCH_SIZE")? {
            config.reports.batch_size = value;
        }

        if let Some(value) = parse_env::<usize>("HELPDESK_REPORT_REPLY_LIMIT")? {
            config.reports.reply_limit = value;
        }

        if let Some(value) = parse_env::<ReplyTimeUnit>("HELPDESK_REPORT_FIRST_REPLY_UNIT")? {
            config.reports.first_reply_unit = value;
        }

        if let Ok(timezone) = env::var("HELPDESK_REPORT_TIMEZONE") {
            config.reports.default_timezone = timezone;
        }

        if let Some(value) = parse_env::<u64>("HELPDESK_CACHE_REPORT_MINUTES")? {
            config.reports.cache.report_minutes = value;
        }

        if let Some(value) = parse_env::<bool>("HELPDESK_CACHE_ENABLED")? {
            config.reports.cache.enabled = value;
        }

        if let Ok(level) = env::var("HELPDESK_LOG_LEVEL") {
            config.logging.level = level;
        }

        Ok(())
    }
}

fn parse_env<T>(var: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(var) {
        Ok(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| ConfigError::EnvParseError {
            var: var.to_string(),
            source: Box::new(e),
        }),
        Err(_) => Ok(None),
    }
}
