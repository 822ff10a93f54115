//! Process-level reconciliation timings read from the environment.

use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};

/// Poll loop period variable.
pub const POLL_INTERVAL_ENV: &str = "MEDIABRIDGE_POLL_INTERVAL_SECS";
/// Maintenance loop period variable.
pub const MAINTENANCE_INTERVAL_ENV: &str = "MEDIABRIDGE_MAINTENANCE_INTERVAL_SECS";
/// Sweeper staleness threshold variable.
pub const STALE_AFTER_ENV: &str = "MEDIABRIDGE_STALE_AFTER_SECS";
/// Outbound HTTP timeout variable.
pub const HTTP_TIMEOUT_ENV: &str = "MEDIABRIDGE_HTTP_TIMEOUT_SECS";
/// Configuration cache lifetime variable.
pub const CONFIG_CACHE_TTL_ENV: &str = "MEDIABRIDGE_CONFIG_CACHE_TTL_SECS";

/// Timings that drive the reconciliation loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileSettings {
    /// Period of the queue polling loop.
    pub poll_interval: Duration,
    /// Period of the library snapshot loop.
    pub maintenance_interval: Duration,
    /// Age after which a `downloading` request is force-completed.
    pub stale_after: Duration,
    /// Timeout applied to every outbound HTTP request.
    pub http_timeout: Duration,
    /// How long integration settings are cached.
    pub config_cache_ttl: Duration,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(15),
            maintenance_interval: Duration::from_secs(6 * 60 * 60),
            stale_after: Duration::from_secs(120),
            http_timeout: Duration::from_secs(30),
            config_cache_ttl: Duration::from_secs(60),
        }
    }
}

impl ReconcileSettings {
    /// Read settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error when a variable is set but is not a positive integer.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through `lookup`, defaulting unset variables.
    ///
    /// # Errors
    ///
    /// Returns an error when a variable is set but is not a positive integer.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let defaults = Self::default();
        Ok(Self {
            poll_interval: seconds(&lookup, POLL_INTERVAL_ENV, defaults.poll_interval)?,
            maintenance_interval: seconds(
                &lookup,
                MAINTENANCE_INTERVAL_ENV,
                defaults.maintenance_interval,
            )?,
            stale_after: seconds(&lookup, STALE_AFTER_ENV, defaults.stale_after)?,
            http_timeout: seconds(&lookup, HTTP_TIMEOUT_ENV, defaults.http_timeout)?,
            config_cache_ttl: seconds(&lookup, CONFIG_CACHE_TTL_ENV, defaults.config_cache_ttl)?,
        })
    }
}

fn seconds(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: Duration,
) -> ConfigResult<Duration> {
    let Some(raw) = lookup(name) else {
        return Ok(default);
    };
    let invalid = |reason: &'static str| ConfigError::InvalidValue {
        key: name.to_string(),
        value: raw.clone(),
        reason,
    };
    let secs = raw
        .trim()
        .parse::<u64>()
        .map_err(|_| invalid("not an integer"))?;
    if secs == 0 {
        return Err(invalid("must be positive"));
    }
    Ok(Duration::from_secs(secs))
}
