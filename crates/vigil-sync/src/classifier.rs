//! Decide which provider notifications warrant a reload.
//!
//! Reloading on every notification causes redundant round-trips and
//! flicker; ignoring them leaves stale role data after a re-authentication.

use vigil_core::SessionEventKind;

/// Outcome of the most recent committed load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LastLoad {
    /// Nothing committed yet; the startup load is still running.
    #[default]
    Pending,
    /// The latest load succeeded. `None` means it found nobody signed in.
    Loaded(Option<String>),
    /// The latest load failed. Carries the last identity ID that did load
    /// successfully, if any.
    Failed(Option<String>),
}

impl LastLoad {
    /// The identity ID of the last successful load. `None` for pending,
    /// signed out, or never loaded.
    #[must_use]
    pub fn last_good(&self) -> Option<&str> {
        match self {
            Self::Pending => None,
            Self::Loaded(id) | Self::Failed(id) => id.as_deref(),
        }
    }

    /// True when the latest load succeeded for exactly `candidate`.
    #[must_use]
    pub fn settled_on(&self, candidate: Option<&str>) -> bool {
        matches!(self, Self::Loaded(id) if id.as_deref() == candidate)
    }

    /// The state after a failed load.
    #[must_use]
    pub fn after_failure(&self) -> Self {
        Self::Failed(self.last_good().map(ToString::to_string))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Classification {
    pub reload: bool,
    pub reset_retry: bool,
}

impl Classification {
    const IGNORE: Self = Self {
        reload: false,
        reset_retry: false,
    };
    const RELOAD: Self = Self {
        reload: true,
        reset_retry: true,
    };
}

/// Classify a notification against the last committed load.
#[must_use]
pub fn classify(
    kind: &SessionEventKind,
    candidate: Option<&str>,
    last: &LastLoad,
) -> Classification {
    let reload = match kind {
        SessionEventKind::InitialSession => {
            !matches!(last, LastLoad::Pending) && !last.settled_on(candidate)
        }
        SessionEventKind::SignedIn | SessionEventKind::SignedOut => !last.settled_on(candidate),
        SessionEventKind::UserUpdated => true,
        SessionEventKind::TokenRefreshed => {
            !matches!(last, LastLoad::Pending) && last.last_good() != candidate
        }
        SessionEventKind::Other(_) => false,
    };

    if reload {
        Classification::RELOAD
    } else {
        Classification::IGNORE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn loaded(id: &str) -> LastLoad {
        LastLoad::Loaded(Some(id.to_string()))
    }

    fn failed(id: &str) -> LastLoad {
        LastLoad::Failed(Some(id.to_string()))
    }

    #[rstest]
    #[case::sign_in_new_identity(SessionEventKind::SignedIn, Some("u2"), loaded("u1"), true)]
    #[case::sign_in_duplicate(SessionEventKind::SignedIn, Some("u1"), loaded("u1"), false)]
    #[case::sign_in_after_failure(SessionEventKind::SignedIn, Some("u1"), failed("u1"), true)]
    #[case::sign_in_during_startup(SessionEventKind::SignedIn, Some("u1"), LastLoad::Pending, true)]
    #[case::sign_out_when_signed_in(SessionEventKind::SignedOut, None, loaded("u1"), true)]
    #[case::sign_out_when_signed_out(SessionEventKind::SignedOut, None, LastLoad::Loaded(None), false)]
    #[case::user_updated_same_identity(SessionEventKind::UserUpdated, Some("u1"), loaded("u1"), true)]
    #[case::refresh_unchanged(SessionEventKind::TokenRefreshed, Some("u1"), loaded("u1"), false)]
    #[case::refresh_changed(SessionEventKind::TokenRefreshed, Some("u2"), loaded("u1"), true)]
    #[case::refresh_unchanged_after_failure(SessionEventKind::TokenRefreshed, Some("u1"), failed("u1"), false)]
    #[case::refresh_during_startup(SessionEventKind::TokenRefreshed, Some("u1"), LastLoad::Pending, false)]
    #[case::initial_during_startup(SessionEventKind::InitialSession, Some("u1"), LastLoad::Pending, false)]
    #[case::initial_duplicate(SessionEventKind::InitialSession, Some("u1"), loaded("u1"), false)]
    #[case::initial_different(SessionEventKind::InitialSession, Some("u2"), loaded("u1"), true)]
    #[case::unknown_kind(SessionEventKind::Other("PASSWORD_RECOVERY".into()), Some("u2"), loaded("u1"), false)]
    fn classification(
        #[case] kind: SessionEventKind,
        #[case] candidate: Option<&str>,
        #[case] last: LastLoad,
        #[case] expect_reload: bool,
    ) {
        let decision = classify(&kind, candidate, &last);
        assert_eq!(decision.reload, expect_reload);
        assert_eq!(decision.reset_retry, expect_reload);
    }

    #[test]
    fn failure_keeps_last_good_identity() {
        assert_eq!(loaded("u1").after_failure(), failed("u1"));
        assert_eq!(failed("u1").after_failure(), failed("u1"));
        assert_eq!(LastLoad::Pending.after_failure(), LastLoad::Failed(None));
    }
}
