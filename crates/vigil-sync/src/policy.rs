use std::time::Duration;

use vigil_config::SyncConfig;

/// Timing policy the loader runs with. Built from `[sync]` configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPolicy {
    /// Deadline for each remote call.
    pub deadline: Duration,
    /// Minimum spacing between the starts of two coalescable loads.
    pub min_spacing: Duration,
    pub retry_base: Duration,
    pub retry_cap: Duration,
    /// Consecutive failures at which automatic retries stop.
    pub max_attempts: u32,
}

impl From<&SyncConfig> for SyncPolicy {
    fn from(config: &SyncConfig) -> Self {
        Self {
            deadline: Duration::from_millis(config.deadline_ms),
            min_spacing: Duration::from_millis(config.min_spacing_ms),
            retry_base: Duration::from_millis(config.retry_base_ms),
            retry_cap: Duration::from_millis(config.retry_cap_ms),
            max_attempts: config.max_attempts,
        }
    }
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self::from(&SyncConfig::default())
    }
}
