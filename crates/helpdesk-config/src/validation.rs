//! Custom validators used by the configuration structs

use chrono_tz::Tz;
use validator::ValidationError;

/// Validate an IANA timezone name (e.g. "UTC", "Europe/Berlin")
pub fn validate_timezone(timezone: &str) -> Result<(), ValidationError> {
    if timezone.is_empty() {
        return Err(ValidationError::new("empty_timezone"));
    }

    match timezone.parse::<Tz>() {
        Ok(_) => Ok(()),
        Err(_) => Err(ValidationError::new("unknown_timezone")),
    }
}

/// Validate a log filter directive (basic check)
pub fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    if level.trim().is_empty() {
        return Err(ValidationError::new("empty_log_level"));
    }

    // Directives look like "info" or "helpdesk_reports=debug,sqlx=warn"
    let valid = level.split(',').all(|directive| {
        let directive = directive.trim();
        let level = directive.rsplit('=').next().unwrap_or(directive);
        matches!(
            level.to_ascii_lowercase().as_str(),
            "trace" | "debug" | "info" | "warn" | "error" | "off"
        )
    });

    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_log_level"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_timezone() {
        assert!(validate_timezone("UTC").is_ok());
        assert!(validate_timezone("America/New_York").is_ok());
        assert!(validate_timezone("").is_err());
        assert!(validate_timezone("Nowhere/Special").is_err());
    }

    #[test]
    fn test_validate_log_level() {
        assert!(validate_log_level("info").is_ok());
        assert!(validate_log_level("helpdesk_reports=debug,sqlx=warn").is_ok());
        assert!(validate_log_level("verbose").is_err());
        assert!(validate_log_level("  ").is_err());
    }
}
