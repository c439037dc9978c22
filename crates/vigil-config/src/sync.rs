//! Sync engine policy: deadlines, rate limiting, and retry backoff.
//!
//! Earlier iterations of this engine disagreed on the attempt cap (3 vs 5) and
//! the backoff cap (8s vs 15s). The defaults below are the single fixed policy.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const fn default_deadline_ms() -> u64 {
    8_000
}

const fn default_min_spacing_ms() -> u64 {
    250
}

const fn default_retry_base_ms() -> u64 {
    1_000
}

const fn default_retry_cap_ms() -> u64 {
    8_000
}

const fn default_max_attempts() -> u32 {
    3
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SyncConfig {
    /// Deadline applied to each remote call (identity fetch, profile lookup).
    #[serde(default = "default_deadline_ms")]
    pub deadline_ms: u64,

    /// Minimum spacing between the starts of two consecutive loads.
    #[serde(default = "default_min_spacing_ms")]
    pub min_spacing_ms: u64,

    /// Delay before the first automatic retry.
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,

    /// Upper bound for the exponential retry delay.
    #[serde(default = "default_retry_cap_ms")]
    pub retry_cap_ms: u64,

    /// Consecutive failures after which automatic retries stop.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            deadline_ms: default_deadline_ms(),
            min_spacing_ms: default_min_spacing_ms(),
            retry_base_ms: default_retry_base_ms(),
            retry_cap_ms: default_retry_cap_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl SyncConfig {
    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.deadline_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sync.deadline_ms",
                reason: "must be greater than zero".into(),
            });
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sync.max_attempts",
                reason: "must be at least 1".into(),
            });
        }
        if self.retry_base_ms > self.retry_cap_ms {
            return Err(ConfigError::InvalidValue {
                field: "sync.retry_base_ms",
                reason: format!(
                    "{} exceeds sync.retry_cap_ms ({})",
                    self.retry_base_ms, self.retry_cap_ms
                ),
            });
        }
        Ok(())
    }
}
