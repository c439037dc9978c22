//! # vigil-auth
//!
//! Session-token identity for Vigil.
//!
//! Stores the provider-issued session token (OS keychain via `keyring`, with
//! environment and file fallbacks), decodes its claims, and exposes the
//! result as a [`vigil_sync::IdentityProvider`] that announces sign-in and
//! sign-out to the sync engine.

pub mod claims;
pub mod error;
pub mod provider;
pub mod token_store;

pub use claims::SessionClaims;
pub use error::AuthError;
pub use provider::TokenIdentityProvider;
pub use token_store::{TokenSource, TokenStore};
