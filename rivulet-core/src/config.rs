//! Configuration types for the stream operators.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{ConfigError, DurationMs};

/// Default time-to-live for cached values (5 minutes).
pub const DEFAULT_TTL: Duration = Duration::from_millis(300_000);

/// Default top-level storage key holding the cache table.
pub const DEFAULT_TABLE_KEY: &str = "dataCache";

/// Default delay between retry attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(3000);

fn non_negative_millis(field: &str, millis: DurationMs) -> Result<Duration, ConfigError> {
    u64::try_from(millis)
        .map(Duration::from_millis)
        .map_err(|_| ConfigError::InvalidValue {
            field: field.to_string(),
            value: millis.to_string(),
            reason: "must not be negative".to_string(),
        })
}

/// Configuration for the TTL cache operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheLocallyConfig {
    /// How long a stored value stays fresh after it was written.
    pub ttl: Duration,
    /// Storage key under which the whole cache table is kept.
    pub table_key: String,
}

impl Default for CacheLocallyConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            table_key: DEFAULT_TABLE_KEY.to_string(),
        }
    }
}

impl CacheLocallyConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config with a TTL given in milliseconds.
    pub fn from_millis(ttl_ms: DurationMs) -> Result<Self, ConfigError> {
        Ok(Self::default().with_ttl(non_negative_millis("ttl", ttl_ms)?))
    }

    /// Set the TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the storage key for the cache table.
    pub fn with_table_key(mut self, table_key: impl Into<String>) -> Self {
        self.table_key = table_key.into();
        self
    }
}

/// Configuration for the conditional retry operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryUntilConfig {
    /// Fixed wait between a failure and the next resubscription.
    pub delay: Duration,
}

impl Default for RetryUntilConfig {
    fn default() -> Self {
        Self {
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryUntilConfig {
    /// Create a new retry config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config with a delay given in milliseconds.
    pub fn from_millis(delay_ms: DurationMs) -> Result<Self, ConfigError> {
        Ok(Self::default().with_delay(non_negative_millis("delay", delay_ms)?))
    }

    /// Set the retry delay.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_config_defaults() {
        let config = CacheLocallyConfig::default();
        assert_eq!(config.ttl, Duration::from_secs(300));
        assert_eq!(config.table_key, "dataCache");
    }

    #[test]
    fn test_cache_config_builder() {
        let config = CacheLocallyConfig::new()
            .with_ttl(Duration::from_millis(1000))
            .with_table_key("profiles");

        assert_eq!(config.ttl, Duration::from_millis(1000));
        assert_eq!(config.table_key, "profiles");
    }

    #[test]
    fn test_cache_config_from_millis_rejects_negative() {
        let err = CacheLocallyConfig::from_millis(-5).expect_err("negative ttl must fail");
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "ttl"));
        assert_eq!(
            CacheLocallyConfig::from_millis(1000).map(|c| c.ttl),
            Ok(Duration::from_secs(1))
        );
    }

    #[test]
    fn test_retry_config_defaults_and_builder() {
        assert_eq!(RetryUntilConfig::default().delay, Duration::from_millis(3000));
        let config = RetryUntilConfig::new().with_delay(Duration::from_millis(250));
        assert_eq!(config.delay, Duration::from_millis(250));
        assert!(RetryUntilConfig::from_millis(-1).is_err());
    }

    #[test]
    fn test_config_deserializes_with_missing_fields() {
        let config: CacheLocallyConfig =
            serde_json::from_str(r#"{"table_key":"other"}"#).expect("valid config json");
        assert_eq!(config.table_key, "other");
        assert_eq!(config.ttl, DEFAULT_TTL);

        let retry: RetryUntilConfig = serde_json::from_str("{}").expect("valid config json");
        assert_eq!(retry, RetryUntilConfig::default());
    }
}
