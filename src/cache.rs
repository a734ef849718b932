//! Fetch staleness gating.
//!
//! # Responsibilities
//! - Hold the per-resource max age for fetched configs
//! - Decide whether a fetch may be skipped because the last one is fresh
//!
//! # Design Decisions
//! - Pure decision function over caller-supplied clock values, so tests
//!   never sleep
//! - A max age of zero disables caching entirely
//! - Negative max age is a caller bug, rejected at construction

use crate::error::ConfigError;

/// Default max age for fetched configs: four hours.
const DEFAULT_MAX_AGE_MILLIS: i64 = 4 * 60 * 60 * 1000;

/// How long a fetched config stays fresh before a new remote fetch is allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStrategy {
    max_age_millis: i64,
}

impl CacheStrategy {
    /// Strategy with an explicit max age in milliseconds.
    pub fn with_max_age(max_age_millis: i64) -> Result<Self, ConfigError> {
        if max_age_millis < 0 {
            return Err(ConfigError::NegativeMaxAge(max_age_millis));
        }
        Ok(Self { max_age_millis })
    }

    /// Strategy that never skips a fetch.
    pub fn no_cache() -> Self {
        Self { max_age_millis: 0 }
    }

    pub fn max_age_millis(&self) -> i64 {
        self.max_age_millis
    }

    /// True when a remote fetch is required, false when the last fetched
    /// config is still fresh enough to reuse.
    pub fn should_fetch(&self, now_millis: i64, last_fetched_millis: i64) -> bool {
        if self.max_age_millis == 0 {
            return true;
        }
        now_millis - last_fetched_millis >= self.max_age_millis
    }
}

impl Default for CacheStrategy {
    fn default() -> Self {
        Self {
            max_age_millis: DEFAULT_MAX_AGE_MILLIS,
        }
    }
}
