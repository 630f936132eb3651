use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::breaker::CircuitBreakerConfig;
use crate::consumer::ConsumerConfig;
use crate::service::UnstableConfig;

/// Circuit breaker settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakerSettings {
    /// Consecutive failures before the circuit opens
    #[serde(default = "default_error_threshold")]
    pub error_threshold: u32,

    /// Cooldown in milliseconds before a probe is allowed
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
}

fn default_error_threshold() -> u32 {
    3
}

fn default_cooldown_ms() -> u64 {
    5_000
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            error_threshold: default_error_threshold(),
            cooldown_ms: default_cooldown_ms(),
        }
    }
}

impl BreakerSettings {
    pub fn to_breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            error_threshold: self.error_threshold,
            cooldown: Duration::from_millis(self.cooldown_ms),
        }
    }
}

/// Unstable service settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnstableSettings {
    /// Calls answered before the service breaks
    #[serde(default = "default_stop_after")]
    pub stop_after: u32,

    /// How long the service stays broken, in milliseconds
    #[serde(default = "default_stop_during_ms")]
    pub stop_during_ms: u64,
}

fn default_stop_after() -> u32 {
    4
}

fn default_stop_during_ms() -> u64 {
    12_000
}

impl Default for UnstableSettings {
    fn default() -> Self {
        Self {
            stop_after: default_stop_after(),
            stop_during_ms: default_stop_during_ms(),
        }
    }
}

impl UnstableSettings {
    pub fn to_unstable_config(&self) -> UnstableConfig {
        UnstableConfig {
            stop_after: self.stop_after,
            stop_during: Duration::from_millis(self.stop_during_ms),
        }
    }
}

/// Consumer loop settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerSettings {
    /// Number of calls to make
    #[serde(default = "default_call_count")]
    pub call_count: u32,

    /// Pause after each call, in milliseconds
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

fn default_call_count() -> u32 {
    20
}

fn default_interval_ms() -> u64 {
    1_000
}

impl Default for ConsumerSettings {
    fn default() -> Self {
        Self {
            call_count: default_call_count(),
            interval_ms: default_interval_ms(),
        }
    }
}

impl ConsumerSettings {
    pub fn to_consumer_config(&self) -> ConsumerConfig {
        ConsumerConfig {
            call_count: self.call_count,
            interval: Duration::from_millis(self.interval_ms),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub circuit_breaker: BreakerSettings,

    #[serde(default)]
    pub unstable_service: UnstableSettings,

    #[serde(default)]
    pub consumer: ConsumerSettings,
}

impl Config {
    /// Check values that would make the breaker unusable
    pub fn validate(&self) -> Result<()> {
        self.circuit_breaker
            .to_breaker_config()
            .validate()
            .context("Invalid circuit_breaker configuration")?;
        Ok(())
    }

    /// Render the configuration as YAML
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize configuration")
    }
}

/// Load configuration from a YAML file
pub fn load_from_yaml<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path.as_ref())
        .context(format!("Failed to read config file: {:?}", path.as_ref()))?;

    let config: Config = serde_yaml::from_str(&content)
        .context("Failed to parse YAML configuration")?;

    Ok(config)
}

/// Load configuration from environment variables
///
/// Every variable is optional and falls back to the default:
/// - CB_ERROR_THRESHOLD
/// - CB_COOLDOWN_MS
/// - SERVICE_STOP_AFTER
/// - SERVICE_STOP_DURING_MS
/// - CONSUMER_CALL_COUNT
/// - CONSUMER_INTERVAL_MS
pub fn load_from_env() -> Result<Config> {
    // Try to load .env file if it exists (don't fail if it doesn't)
    let _ = dotenvy::dotenv();

    let mut config = Config::default();

    if let Some(val) = env_var("CB_ERROR_THRESHOLD")? {
        config.circuit_breaker.error_threshold = val;
    }
    if let Some(val) = env_var("CB_COOLDOWN_MS")? {
        config.circuit_breaker.cooldown_ms = val;
    }
    if let Some(val) = env_var("SERVICE_STOP_AFTER")? {
        config.unstable_service.stop_after = val;
    }
    if let Some(val) = env_var("SERVICE_STOP_DURING_MS")? {
        config.unstable_service.stop_during_ms = val;
    }
    if let Some(val) = env_var("CONSUMER_CALL_COUNT")? {
        config.consumer.call_count = val;
    }
    if let Some(val) = env_var("CONSUMER_INTERVAL_MS")? {
        config.consumer.interval_ms = val;
    }

    Ok(config)
}

fn env_var<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => {
            let val = raw
                .trim()
                .parse()
                .context(format!("Invalid value for {}: {:?}", key, raw))?;
            Ok(Some(val))
        }
        Err(_) => Ok(None),
    }
}

/// Load configuration from file or environment
///
/// Reads the YAML file when a path is given, the environment otherwise. The
/// result is not validated here: command-line overrides may still replace
/// invalid values, so callers validate the effective configuration.
pub fn load_config(config_path: Option<&str>) -> Result<Config> {
    match config_path {
        Some(path) => load_from_yaml(path),
        None => load_from_env(),
    }
}
