//! Error types and utilities for the reporting pipeline

use thiserror::Error;

/// Result type alias for report operations
pub type Result<T> = std::result::Result<T, ReportError>;

/// Main error type for report operations
#[derive(Error, Debug)]
pub enum ReportError {
    /// Configuration related errors
    #[error("Configuration error: {message}")]
    Config {
        /// Human readable description
        message: String,
        /// Underlying cause
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// I/O related errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Row store failures. A report never survives one of these.
    #[error("Database error: {message}")]
    Database {
        /// Human readable description
        message: String,
        /// Underlying cause
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Validation errors for request parameters
    #[error("Validation error: {message}")]
    Validation {
        /// Human readable description
        message: String,
        /// Name of the offending parameter
        field: Option<String>,
    },

    /// A stored or requested value could not be parsed
    #[error("Parse error: {message} (value: {value:?})")]
    Parse {
        /// Human readable description
        message: String,
        /// The raw value that failed to parse
        value: String,
    },

    /// Generic error with custom message
    #[error("{message}")]
    Generic {
        /// Human readable description
        message: String,
        /// Underlying cause
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ReportError {
    /// Create a new generic error with a custom message
    pub fn new(msg: impl Into<String>) -> Self {
        Self::Generic {
            message: msg.into(),
            source: None,
        }
    }

    /// Create a new generic error with a custom message and source
    pub fn with_source(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Generic {
            message: msg.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
            source: None,
        }
    }

    /// Create a new configuration error with source
    pub fn config_with_source(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: msg.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a new database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database {
            message: msg.into(),
            source: None,
        }
    }

    /// Create a new database error with source
    pub fn database_with_source(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Database {
            message: msg.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a new validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
            field: None,
        }
    }

    /// Create a new validation error with field name
    pub fn validation_field(msg: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
            field: Some(field.into()),
        }
    }

    /// Create a new parse error for the given raw value
    pub fn parse(msg: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
            value: value.into(),
        }
    }

    /// Name of the offending parameter, for validation errors
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation { field, .. } => field.as_deref(),
            _ => None,
        }
    }
}

/// Convert from sqlx::Error to ReportError
impl From<sqlx::Error> for ReportError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::database_with_source("Row not found", err),
            sqlx::Error::ColumnNotFound(ref column) => {
                Self::database(format!("Column not found: {column}"))
            }
            sqlx::Error::PoolTimedOut => Self::database_with_source("Connection pool timed out", err),
            _ => Self::database_with_source("Query failed", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{error::Error, io};

    #[test]
    fn test_error_creation() {
        let error = ReportError::new("test message");
        assert!(error.to_string().contains("test message"));

        let config_error = ReportError::config("config issue");
        assert!(config_error.to_string().contains("Configuration error"));
        assert!(config_error.to_string().contains("config issue"));

        let validation_error = ReportError::validation_field("Invalid date", "startDate");
        assert!(validation_error.to_string().contains("Validation error"));
        assert_eq!(validation_error.field(), Some("startDate"));

        let parse_error = ReportError::parse("Invalid timestamp", "yesterday-ish");
        assert!(parse_error.to_string().contains("yesterday-ish"));
        assert!(parse_error.field().is_none());
    }

    #[test]
    fn test_error_with_source() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let wrapped_error = ReportError::with_source("Failed to read file", io_error);

        assert!(wrapped_error.to_string().contains("Failed to read file"));
        assert!(wrapped_error.source().is_some());

        let db_error = ReportError::database_with_source(
            "Chunk query failed",
            io::Error::new(io::ErrorKind::BrokenPipe, "connection reset"),
        );
        assert_eq!(db_error.to_string(), "Database error: Chunk query failed");
        assert!(db_error.source().is_some());
    }

    #[test]
    fn test_sqlx_error_conversion() {
        let error: ReportError = sqlx::Error::RowNotFound.into();
        assert!(matches!(error, ReportError::Database { .. }));

        let error: ReportError = sqlx::Error::ColumnNotFound("closed_at".to_string()).into();
        assert!(error.to_string().contains("Database error"));
    }

    #[test]
    fn test_serde_error_conversion() {
        let serde_error = serde_json::from_str::<serde_json::Value>(r#"{"bad": json}"#).unwrap_err();
        let error: ReportError = serde_error.into();

        assert!(error.to_string().contains("Serialization error"));
    }

    #[test]
    fn test_error_chain_preservation() {
        let root_error = io::Error::new(io::ErrorKind::NotFound, "Root cause");
        let middle_error = ReportError::config_with_source("Middle layer", root_error);
        let top_error = ReportError::with_source("Top layer", middle_error);

        let mut current_error: &dyn std::error::Error = &top_error;
        let mut error_count = 0;
        while let Some(source) = current_error.source() {
            current_error = source;
            error_count += 1;
        }

        assert_eq!(error_count, 2);
    }
}
