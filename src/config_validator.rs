use crate::error::PaceError;
use crate::scheduler::MAX_DELAY;
use std::time::Duration;

/// Validates configuration values before any wrapper is built from them
pub struct ConfigValidator;

impl ConfigValidator {
    /// Parses a duration given as humantime (`500ms`, `1s 200ms`) or as bare
    /// signed milliseconds (`500`). Negative values are rejected.
    pub fn parse_duration(name: &str, raw: &str) -> Result<Duration, PaceError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(PaceError::InvalidArgument(format!("{} cannot be empty", name)));
        }

        if let Ok(millis) = raw.parse::<i64>() {
            return Self::duration_from_millis(name, millis);
        }

        if raw.starts_with('-') {
            return Err(PaceError::InvalidArgument(format!(
                "{} must not be negative, got '{}'",
                name, raw
            )));
        }

        humantime::parse_duration(raw).map_err(|e| {
            PaceError::InvalidArgument(format!("Invalid {} '{}': {}", name, raw, e))
        })
    }

    /// Converts signed milliseconds, rejecting negative values.
    pub fn duration_from_millis(name: &str, millis: i64) -> Result<Duration, PaceError> {
        if millis < 0 {
            return Err(PaceError::InvalidArgument(format!(
                "{} must not be negative, got {}ms",
                name, millis
            )));
        }
        Ok(Duration::from_millis(millis as u64))
    }

    /// Validates a delay that will be handed to a scheduler
    pub fn validate_delay(name: &str, delay: Duration) -> Result<(), PaceError> {
        if delay > MAX_DELAY {
            return Err(PaceError::ConfigurationError(format!(
                "{} of {} exceeds the maximum of {}",
                name,
                humantime::format_duration(delay),
                humantime::format_duration(MAX_DELAY)
            )));
        }
        Ok(())
    }

    /// Validates a tick interval
    pub fn validate_tick_interval(interval: Duration) -> Result<(), PaceError> {
        if interval.is_zero() {
            return Err(PaceError::ConfigurationError(
                "Tick interval must be greater than 0".to_string(),
            ));
        }
        Self::validate_delay("tick interval", interval)
    }

    /// Validates a log level name
    pub fn validate_log_level(level: &str) -> Result<(), PaceError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&level.to_lowercase().as_str()) {
            return Err(PaceError::ConfigurationError(format!(
                "Invalid log level '{}'. Must be one of: {:?}",
                level, valid_levels
            )));
        }
        Ok(())
    }
}
