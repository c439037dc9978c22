//! `IdentityProvider` backed by the stored session token.

use async_trait::async_trait;
use tokio::sync::broadcast;
use vigil_config::AuthConfig;
use vigil_core::{Identity, RemoteError, SessionEventKind, SessionNotice};
use vigil_sync::IdentityProvider;

use crate::claims::SessionClaims;
use crate::error::AuthError;
use crate::token_store::TokenStore;

const NOTICE_CAPACITY: usize = 32;

/// Reads the identity from the stored token and announces sign-in/sign-out
/// performed through it.
#[derive(Debug)]
pub struct TokenIdentityProvider {
    store: TokenStore,
    expiry_buffer_secs: i64,
    notices: broadcast::Sender<SessionNotice>,
}

impl TokenIdentityProvider {
    #[must_use]
    pub fn new(store: TokenStore, expiry_buffer_secs: i64) -> Self {
        Self {
            store,
            expiry_buffer_secs,
            notices: broadcast::channel(NOTICE_CAPACITY).0,
        }
    }

    /// # Errors
    ///
    /// Returns `AuthError::TokenStore` if the credentials path cannot be
    /// resolved.
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        Ok(Self::new(
            TokenStore::from_config(config)?,
            config.expiry_buffer_secs,
        ))
    }

    #[must_use]
    pub const fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Claims of the stored token. `None` if there is no token or it is
    /// expired (or expires within the configured buffer).
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MalformedToken` if the stored token cannot be decoded.
    pub fn current_claims(&self) -> Result<Option<SessionClaims>, AuthError> {
        let Some(jwt) = self.store.load() else {
            return Ok(None);
        };

        let claims = SessionClaims::decode(&jwt)?;
        if claims.is_near_expiry(self.expiry_buffer_secs) {
            tracing::warn!(
                expires_at = %claims.expires_at,
                "session token expires within {}s; treating as signed out",
                self.expiry_buffer_secs,
            );
            return Ok(None);
        }
        Ok(Some(claims))
    }

    /// Store `jwt` and announce it. Emits `TokenRefreshed` when the subject
    /// matches the token it replaces, `SignedIn` otherwise.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MalformedToken` or `AuthError::TokenExpired` for an
    /// unusable token, `AuthError::TokenStore` if it cannot be persisted.
    pub fn sign_in_with_token(&self, jwt: &str) -> Result<SessionClaims, AuthError> {
        let claims = SessionClaims::decode(jwt)?;
        if claims.is_near_expiry(self.expiry_buffer_secs) {
            return Err(AuthError::TokenExpired);
        }

        let previous = self
            .current_claims()
            .ok()
            .flatten()
            .map(|previous| previous.subject);
        self.store.store(&claims.raw_jwt)?;

        let kind = if previous.as_deref() == Some(claims.subject.as_str()) {
            SessionEventKind::TokenRefreshed
        } else {
            SessionEventKind::SignedIn
        };
        tracing::info!(subject = %claims.subject, %kind, "session token stored");
        self.announce(SessionNotice::new(kind, Some(claims.subject.as_str())));
        Ok(claims)
    }

    /// Delete the stored token and announce `SignedOut`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenStore` if the credentials file cannot be removed.
    pub fn sign_out(&self) -> Result<(), AuthError> {
        self.store.delete()?;
        tracing::info!("session token removed");
        self.announce(SessionNotice::new(SessionEventKind::SignedOut, None::<String>));
        Ok(())
    }

    fn announce(&self, notice: SessionNotice) {
        // No subscribers simply means nobody is syncing in this process.
        let _ = self.notices.send(notice);
    }
}

#[async_trait]
impl IdentityProvider for TokenIdentityProvider {
    async fn current_identity(&self) -> Result<Option<Identity>, RemoteError> {
        let claims = self.current_claims()?;
        Ok(claims.map(|claims| claims.to_identity()))
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionNotice> {
        self.notices.subscribe()
    }
}
