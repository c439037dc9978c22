//! Seams to the external collaborators.

use async_trait::async_trait;
use tokio::sync::broadcast;
use vigil_core::{Identity, ProfileAttributes, RemoteError, SessionNotice};

/// Source of the current identity and of session-change notifications.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The identity currently signed in, or `None`. May hang or fail.
    async fn current_identity(&self) -> Result<Option<Identity>, RemoteError>;

    /// Subscribe to session-change notifications. Dropping the receiver
    /// unsubscribes.
    fn subscribe(&self) -> broadcast::Receiver<SessionNotice>;
}

/// Point lookup of profile attributes keyed by identity ID.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// `Ok(None)` when no profile row exists. May hang or fail.
    async fn lookup_profile(
        &self,
        identity_id: &str,
    ) -> Result<Option<ProfileAttributes>, RemoteError>;
}
