//! Configuration Module
//!
//! Engine options (validated eagerly, unknown names rejected) and the process-level
//! settings loaded from environment variables.

use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cache::{EvictionStrategy, DEFAULT_TTL, MAX_TTL, MIN_TTL};
use crate::error::{CacheError, Result};

// == Cache Config ==
/// Engine options.
///
/// Every field has a default; supplying an unknown option name or a value of the
/// wrong type fails deserialization, and out-of-range values fail [`validate`].
///
/// [`validate`]: CacheConfig::validate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// TTL in seconds for keys without usable access history
    pub default_ttl: u64,
    /// Maximum number of live entries
    pub max_cache_size: usize,
    /// Maximum number of history records kept per learning model
    pub learning_window: usize,
    /// Minimum interval regularity before the interval-derived TTL is trusted
    pub adaptation_threshold: f64,
    /// Victim selection rule under capacity pressure
    pub eviction_strategy: EvictionStrategy,
    /// Variance factor of the early refresh draw (0 disables early refresh)
    pub refresh_beta: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,
            max_cache_size: 1000,
            learning_window: 100,
            adaptation_threshold: 0.3,
            eviction_strategy: EvictionStrategy::UtilityBased,
            refresh_beta: 1.0,
        }
    }
}

impl CacheConfig {
    /// Builds a config from a flat JSON object of named options and validates it.
    ///
    /// ```
    /// use adaptive_cache::config::CacheConfig;
    ///
    /// let config = CacheConfig::from_json(serde_json::json!({
    ///     "max_cache_size": 10,
    ///     "eviction_strategy": "lru"
    /// }))
    /// .unwrap();
    /// assert_eq!(config.max_cache_size, 10);
    /// ```
    pub fn from_json(options: serde_json::Value) -> Result<Self> {
        let config: CacheConfig = serde_json::from_value(options)
            .map_err(|e| CacheError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every option against its allowed range.
    pub fn validate(&self) -> Result<()> {
        if self.default_ttl < MIN_TTL || self.default_ttl > MAX_TTL {
            return Err(CacheError::Configuration(format!(
                "default_ttl must be within [{}, {}] seconds, got {}",
                MIN_TTL, MAX_TTL, self.default_ttl
            )));
        }
        if self.max_cache_size == 0 {
            return Err(CacheError::Configuration(
                "max_cache_size must be greater than 0".to_string(),
            ));
        }
        if self.learning_window == 0 {
            return Err(CacheError::Configuration(
                "learning_window must be greater than 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.adaptation_threshold) {
            return Err(CacheError::Configuration(format!(
                "adaptation_threshold must be within [0, 1], got {}",
                self.adaptation_threshold
            )));
        }
        if !self.refresh_beta.is_finite() || self.refresh_beta < 0.0 {
            return Err(CacheError::Configuration(format!(
                "refresh_beta must be a finite non-negative number, got {}",
                self.refresh_beta
            )));
        }
        Ok(())
    }
}

// == Server Config ==
/// Process configuration: engine options plus server settings.
#[derive(Debug, Clone)]
pub struct Config {
    /// Engine options
    pub cache: CacheConfig,
    /// HTTP server port
    pub server_port: u16,
    /// Background sweep interval in seconds
    pub cleanup_interval: u64,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `DEFAULT_TTL` - Fallback TTL in seconds (default: 3600)
    /// - `MAX_CACHE_SIZE` - Maximum cache entries (default: 1000)
    /// - `LEARNING_WINDOW` - History records per model (default: 100)
    /// - `ADAPTATION_THRESHOLD` - Regularity gate for adaptive TTLs (default: 0.3)
    /// - `EVICTION_STRATEGY` - `lru`, `lru_adaptive` or `utility_based` (default)
    /// - `REFRESH_BETA` - Early refresh variance factor (default: 1.0)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Sweep frequency in seconds (default: 1)
    ///
    /// A variable that is set but cannot be parsed is an error, never a silent default.
    pub fn from_env() -> Result<Self> {
        let defaults = CacheConfig::default();
        let cache = CacheConfig {
            default_ttl: env_or("DEFAULT_TTL", defaults.default_ttl)?,
            max_cache_size: env_or("MAX_CACHE_SIZE", defaults.max_cache_size)?,
            learning_window: env_or("LEARNING_WINDOW", defaults.learning_window)?,
            adaptation_threshold: env_or("ADAPTATION_THRESHOLD", defaults.adaptation_threshold)?,
            eviction_strategy: env_or("EVICTION_STRATEGY", defaults.eviction_strategy)?,
            refresh_beta: env_or("REFRESH_BETA", defaults.refresh_beta)?,
        };
        cache.validate()?;

        let cleanup_interval = env_or("CLEANUP_INTERVAL", 1u64)?;
        if cleanup_interval == 0 {
            return Err(CacheError::Configuration(
                "CLEANUP_INTERVAL must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            cache,
            server_port: env_or("SERVER_PORT", 3000u16)?,
            cleanup_interval,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            server_port: 3000,
            cleanup_interval: 1,
        }
    }
}

/// Parses `name` from the environment, falling back to `default` only when unset.
fn env_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|e| {
            CacheError::Configuration(format!("{}={:?} is invalid: {}", name, raw, e))
        }),
        Err(_) => Ok(default),
    }
}
