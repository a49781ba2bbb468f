//! Security-state configuration.
//!
//! Tuning knobs for the three policy components, organized the way they
//! are deployed: one section per component. All durations deserialize
//! from humantime strings (`"15m"`, `"24h"`).
//!
//! # Example (TOML)
//!
//! ```toml
//! [guard.rate_limit]
//! max_attempts = 5
//! window = "15m"
//! block_duration = "30m"
//!
//! [guard.csrf]
//! token_ttl = "24h"
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the ephemeral security-state layer.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Token blacklist configuration.
    pub blacklist: BlacklistConfig,

    /// CSRF token configuration.
    pub csrf: CsrfConfig,

    /// Login rate-limit configuration.
    pub rate_limit: RateLimitConfig,
}

impl GuardConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid value found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.blacklist.validate()?;
        self.csrf.validate()?;
        self.rate_limit.validate()
    }
}

/// Token blacklist configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BlacklistConfig {
    /// How often the in-process store sweeps expired revocation records.
    /// Ignored when a shared backend with native TTL is configured.
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
}

impl Default for BlacklistConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(3600), // 1 hour
        }
    }
}

impl BlacklistConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.sweep_interval.is_zero() {
            return Err(ConfigError::InvalidValue(
                "blacklist.sweep_interval must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// CSRF token configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CsrfConfig {
    /// Secret key material for token derivation. When absent, a random
    /// secret is generated at startup; tokens then do not survive a
    /// process restart.
    pub secret: Option<String>,

    /// Lifetime of an issued token.
    #[serde(with = "humantime_serde")]
    pub token_ttl: Duration,

    /// How often the in-process store sweeps expired tokens.
    /// Ignored when a shared backend with native TTL is configured.
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            secret: None,
            token_ttl: Duration::from_secs(24 * 3600), // 24 hours
            sweep_interval: Duration::from_secs(3600), // 1 hour
        }
    }
}

impl CsrfConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.token_ttl.is_zero() {
            return Err(ConfigError::InvalidValue(
                "csrf.token_ttl must be non-zero".to_string(),
            ));
        }
        if self.sweep_interval.is_zero() {
            return Err(ConfigError::InvalidValue(
                "csrf.sweep_interval must be non-zero".to_string(),
            ));
        }
        if let Some(secret) = &self.secret
            && secret.len() < 32
        {
            return Err(ConfigError::InvalidValue(
                "csrf.secret must be at least 32 bytes".to_string(),
            ));
        }
        Ok(())
    }
}

/// Login rate-limit configuration.
///
/// A fixed window of `window` admits up to `max_attempts` attempts per
/// identifier; exceeding the threshold installs a block for
/// `block_duration`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Maximum attempts per identifier within one window.
    pub max_attempts: u32,

    /// Length of the counting window.
    #[serde(with = "humantime_serde")]
    pub window: Duration,

    /// How long an identifier stays blocked after exceeding the limit.
    #[serde(with = "humantime_serde")]
    pub block_duration: Duration,

    /// How often the in-process store sweeps stale counters and blocks.
    /// Ignored when a shared backend with native TTL is configured.
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window: Duration::from_secs(15 * 60),         // 15 minutes
            block_duration: Duration::from_secs(30 * 60), // 30 minutes
            sweep_interval: Duration::from_secs(5 * 60),  // 5 minutes
        }
    }
}

impl RateLimitConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidValue(
                "rate_limit.max_attempts must be non-zero".to_string(),
            ));
        }
        if self.window.is_zero() {
            return Err(ConfigError::InvalidValue(
                "rate_limit.window must be non-zero".to_string(),
            ));
        }
        if self.block_duration.is_zero() {
            return Err(ConfigError::InvalidValue(
                "rate_limit.block_duration must be non-zero".to_string(),
            ));
        }
        if self.sweep_interval.is_zero() {
            return Err(ConfigError::InvalidValue(
                "rate_limit.sweep_interval must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A configuration value is out of range or inconsistent.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}
