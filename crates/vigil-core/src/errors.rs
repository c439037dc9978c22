//! Failure type for calls to external collaborators.
//!
//! Identity providers and profile stores both report through [`RemoteError`];
//! the sync engine wraps it with the stage that failed.

use thiserror::Error;

/// A remote call failed or returned something unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The collaborator could not be reached (connection, DNS, TLS, I/O).
    #[error("remote unavailable: {0}")]
    Unavailable(String),

    /// The collaborator answered but refused the request.
    #[error("remote rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The response could not be decoded.
    #[error("malformed remote response: {0}")]
    Malformed(String),
}

impl RemoteError {
    /// Whether retrying the same call could plausibly succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Unavailable(_) => true,
            Self::Rejected { status, .. } => *status >= 500 || *status == 429,
            Self::Malformed(_) => false,
        }
    }
}
