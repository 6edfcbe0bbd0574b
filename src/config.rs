use crate::config_validator::ConfigValidator;
use crate::error::PaceError;
use envconfig::Envconfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_DEBOUNCE_DELAY: &str = "CALLPACE_DEBOUNCE_DELAY";
pub const ENV_THROTTLE_INTERVAL: &str = "CALLPACE_THROTTLE_INTERVAL";
pub const ENV_TICK_INTERVAL: &str = "CALLPACE_TICK_INTERVAL";
pub const ENV_LOG_LEVEL: &str = "CALLPACE_LOG_LEVEL";

/// Duration read from the environment, either humantime (`250ms`, `2s`) or bare milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvDuration(pub Duration);

impl FromStr for EnvDuration {
    type Err = PaceError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        ConfigValidator::parse_duration("duration", raw).map(EnvDuration)
    }
}

/// Raw environment settings, before validation
#[derive(Debug, Envconfig, Clone)]
pub struct EnvConfig {
    /// Quiet period before a debounced call fires
    #[envconfig(from = "CALLPACE_DEBOUNCE_DELAY", default = "500ms")]
    pub debounce_delay: EnvDuration,

    /// Minimum spacing between throttled firings
    #[envconfig(from = "CALLPACE_THROTTLE_INTERVAL", default = "1s")]
    pub throttle_interval: EnvDuration,

    /// Ticker cadence
    #[envconfig(from = "CALLPACE_TICK_INTERVAL", default = "1s")]
    pub tick_interval: EnvDuration,

    #[envconfig(from = "CALLPACE_LOG_LEVEL", default = "info")]
    pub log_level: String,
}

impl From<EnvConfig> for Config {
    fn from(env: EnvConfig) -> Self {
        Self {
            debounce_delay: env.debounce_delay.0,
            throttle_interval: env.throttle_interval.0,
            tick_interval: env.tick_interval.0,
            log_level: env.log_level.trim().to_lowercase(),
        }
    }
}

fn env_error(error: envconfig::Error) -> PaceError {
    match error {
        envconfig::Error::ParseError { name } => {
            PaceError::InvalidArgument(format!("Invalid value for {}", name))
        }
        other => PaceError::ConfigurationError(other.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Quiet period before a debounced call fires
    #[serde(with = "humantime_serde")]
    pub debounce_delay: Duration,

    /// Minimum spacing between throttled firings
    #[serde(with = "humantime_serde")]
    pub throttle_interval: Duration,

    /// Ticker cadence
    #[serde(with = "humantime_serde")]
    pub tick_interval: Duration,

    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debounce_delay: Duration::from_millis(500),
            throttle_interval: Duration::from_secs(1),
            tick_interval: Duration::from_secs(1),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self, PaceError> {
        let config: Config = EnvConfig::init_from_env().map_err(env_error)?.into();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a map of environment-style keys
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self, PaceError> {
        let config: Config = EnvConfig::init_from_hashmap(vars).map_err(env_error)?.into();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON document
    pub fn from_json(json: &str) -> Result<Self, PaceError> {
        let config: Config = serde_json::from_str(json)
            .map_err(|e| PaceError::ConfigurationError(format!("Invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PaceError> {
        ConfigValidator::validate_delay("debounce delay", self.debounce_delay)?;
        ConfigValidator::validate_tick_interval(self.tick_interval)?;
        ConfigValidator::validate_log_level(&self.log_level)?;
        Ok(())
    }
}
