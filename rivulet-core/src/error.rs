//! Error types for Rivulet operations

use thiserror::Error;

/// Key-value store errors.
///
/// None of these ever reach a stream consumer: the cache adapter logs them
/// and degrades to a cache miss.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Quota exceeded: write of {requested} bytes exceeds quota of {quota} bytes")]
    QuotaExceeded { requested: usize, quota: usize },

    #[error("Backend error: {reason}")]
    Backend { reason: String },

    #[error("Serialization failed: {reason}")]
    Serialization { reason: String },

    #[error("Store lock poisoned")]
    LockPoisoned,
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization {
            reason: e.to_string(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
