//! Rivulet Core - Shared Types
//!
//! Plain data and small traits shared by every Rivulet crate:
//! - Per-layer error enums
//! - `Clock` for wall-clock reads that tests can control
//! - `Truthy` for coercing condition-stream emissions to `bool`
//! - Operator configuration (`CacheLocallyConfig`, `RetryUntilConfig`)
//!
//! This crate contains no stream logic.

pub mod clock;
pub mod config;
pub mod error;
pub mod truthy;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    CacheLocallyConfig, RetryUntilConfig, DEFAULT_RETRY_DELAY, DEFAULT_TABLE_KEY, DEFAULT_TTL,
};
pub use error::{ConfigError, StoreError};
pub use truthy::Truthy;

use chrono::{DateTime, Utc};

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Duration in milliseconds, as accepted by the `from_millis` constructors.
pub type DurationMs = i64;
