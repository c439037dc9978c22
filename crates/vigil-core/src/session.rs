//! The shared session record and the notifications that drive it.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::identity::Identity;
use crate::profile::{ProfileAttributes, Role};

// ---------------------------------------------------------------------------
// SessionSnapshot
// ---------------------------------------------------------------------------

/// Point-in-time view of who is signed in and their profile attributes.
///
/// Only the sync engine writes snapshots; consumers receive clones.
/// `profile` is always cleared when `identity` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub loading: bool,
    pub identity: Option<Identity>,
    pub profile: ProfileAttributes,
}

impl Default for SessionSnapshot {
    /// The state before the first load settles.
    fn default() -> Self {
        Self {
            loading: true,
            identity: None,
            profile: ProfileAttributes::default(),
        }
    }
}

impl SessionSnapshot {
    /// A settled snapshot for `identity` with its profile.
    #[must_use]
    pub const fn signed_in(identity: Identity, profile: ProfileAttributes) -> Self {
        Self {
            loading: false,
            identity: Some(identity),
            profile,
        }
    }

    /// A settled, unauthenticated snapshot. Also the fail-closed state.
    #[must_use]
    pub fn signed_out() -> Self {
        Self {
            loading: false,
            identity: None,
            profile: ProfileAttributes::default(),
        }
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    #[must_use]
    pub const fn role(&self) -> Option<Role> {
        self.profile.role
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.profile.role == Some(Role::Admin)
    }

    #[must_use]
    pub fn is_pharmacy_company(&self) -> bool {
        self.profile.role == Some(Role::PharmacyCompany)
    }

    #[must_use]
    pub fn identity_id(&self) -> Option<&str> {
        self.identity.as_ref().map(|identity| identity.id.as_str())
    }

    /// Flattened record with the derived flags, as consumers read it.
    #[must_use]
    pub fn view(&self) -> SessionView {
        SessionView {
            loading: self.loading,
            is_authenticated: self.is_authenticated(),
            identity: self.identity.clone(),
            role: self.profile.role,
            related_patient_id: self.profile.related_patient_id.clone(),
            related_pharmacy_id: self.profile.related_pharmacy_id.clone(),
            account_type: self.profile.account_type.clone(),
            is_admin: self.is_admin(),
            is_pharmacy_company: self.is_pharmacy_company(),
        }
    }
}

/// Flat consumer-facing record derived from a [`SessionSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SessionView {
    pub loading: bool,
    pub is_authenticated: bool,
    pub identity: Option<Identity>,
    pub role: Option<Role>,
    pub related_patient_id: Option<String>,
    pub related_pharmacy_id: Option<String>,
    pub account_type: Option<String>,
    pub is_admin: bool,
    pub is_pharmacy_company: bool,
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// Kind of session-change notification emitted by an identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SessionEventKind {
    /// First notification after subscribing, describing the existing session.
    InitialSession,
    SignedIn,
    SignedOut,
    /// Routine credential renewal; the identity is not expected to change.
    TokenRefreshed,
    UserUpdated,
    /// Anything the engine does not recognize.
    Other(String),
}

impl SessionEventKind {
    /// Parse a provider event name. Accepts `SIGNED_IN`, `signed_in`, and
    /// `signed-in` spellings.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        let normalized = name.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "initial_session" => Self::InitialSession,
            "signed_in" => Self::SignedIn,
            "signed_out" => Self::SignedOut,
            "token_refreshed" => Self::TokenRefreshed,
            "user_updated" => Self::UserUpdated,
            _ => Self::Other(name.to_string()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::InitialSession => "initial_session",
            Self::SignedIn => "signed_in",
            Self::SignedOut => "signed_out",
            Self::TokenRefreshed => "token_refreshed",
            Self::UserUpdated => "user_updated",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for SessionEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A session-change notification with the identity the provider now holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionNotice {
    pub kind: SessionEventKind,
    pub identity_id: Option<String>,
}

impl SessionNotice {
    #[must_use]
    pub fn new(kind: SessionEventKind, identity_id: Option<impl Into<String>>) -> Self {
        Self {
            kind,
            identity_id: identity_id.map(Into::into),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn profile(role: Role) -> ProfileAttributes {
        ProfileAttributes {
            role: Some(role),
            ..ProfileAttributes::default()
        }
    }

    #[test]
    fn default_snapshot_is_loading_and_unauthenticated() {
        let snapshot = SessionSnapshot::default();
        assert!(snapshot.loading);
        assert!(!snapshot.is_authenticated());
        assert!(snapshot.profile.is_cleared());
    }

    #[test]
    fn derived_flags_follow_role() {
        let admin = SessionSnapshot::signed_in(Identity::new("a"), profile(Role::Admin));
        assert!(admin.is_authenticated());
        assert!(admin.is_admin());
        assert!(!admin.is_pharmacy_company());

        let company =
            SessionSnapshot::signed_in(Identity::new("c"), profile(Role::PharmacyCompany));
        assert!(company.is_pharmacy_company());
        assert!(!company.is_admin());
    }

    #[test]
    fn view_flattens_profile_fields() {
        let snapshot = SessionSnapshot::signed_in(
            Identity::new("u1"),
            ProfileAttributes {
                role: Some(Role::Pharmacy),
                related_pharmacy_id: Some("ph-9".into()),
                account_type: Some("business".into()),
                ..ProfileAttributes::default()
            },
        );
        let view = snapshot.view();
        assert_eq!(
            view,
            SessionView {
                loading: false,
                is_authenticated: true,
                identity: Some(Identity::new("u1")),
                role: Some(Role::Pharmacy),
                related_patient_id: None,
                related_pharmacy_id: Some("ph-9".into()),
                account_type: Some("business".into()),
                is_admin: false,
                is_pharmacy_company: false,
            }
        );
    }

    #[test]
    fn event_kind_parses_provider_spellings() {
        assert_eq!(SessionEventKind::parse("SIGNED_IN"), SessionEventKind::SignedIn);
        assert_eq!(
            SessionEventKind::parse("token-refreshed"),
            SessionEventKind::TokenRefreshed
        );
        assert_eq!(
            SessionEventKind::parse("PASSWORD_RECOVERY"),
            SessionEventKind::Other("PASSWORD_RECOVERY".into())
        );
    }
}
