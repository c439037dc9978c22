use std::fmt;
use std::time::Duration;

use thiserror::Error;
use vigil_core::RemoteError;

/// Which remote call of a load failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Identity,
    Profile,
}

impl Stage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Profile => "profile",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of one load attempt. Never surfaces to consumers; the loader turns
/// it into the signed-out state plus a retry.
#[derive(Debug, Clone, Error)]
pub enum SyncError {
    #[error("{stage} fetch timed out after {}ms", after.as_millis())]
    Timeout { stage: Stage, after: Duration },

    #[error("{stage} fetch failed: {source}")]
    Remote {
        stage: Stage,
        #[source]
        source: RemoteError,
    },
}

/// Coarse classification handed to the retry scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Timeout,
    Remote,
}

impl SyncError {
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Timeout { .. } => FailureKind::Timeout,
            Self::Remote { .. } => FailureKind::Remote,
        }
    }

    #[must_use]
    pub const fn stage(&self) -> Stage {
        match self {
            Self::Timeout { stage, .. } | Self::Remote { stage, .. } => *stage,
        }
    }
}
