//! In-process profile store.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use vigil_core::{ProfileAttributes, RemoteError};
use vigil_sync::ProfileStore;

/// Profiles keyed by identity ID.
///
/// A fixture file is a JSON object mapping identity IDs to profile rows:
///
/// ```json
/// { "user_1": { "role": "admin" }, "user_2": { "role": "patient", "related_patient_id": "p_7" } }
/// ```
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    profiles: RwLock<HashMap<String, ProfileAttributes>>,
}

impl MemoryProfileStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    ///
    /// Returns `RemoteError::Malformed` if `json` is not an object of profile rows.
    pub fn from_json(json: &str) -> Result<Self, RemoteError> {
        let profiles: HashMap<String, ProfileAttributes> = serde_json::from_str(json)
            .map_err(|e| RemoteError::Malformed(format!("profile fixture: {e}")))?;
        Ok(Self {
            profiles: RwLock::new(profiles),
        })
    }

    /// # Errors
    ///
    /// Returns `RemoteError::Unavailable` if the file cannot be read and
    /// `RemoteError::Malformed` if it cannot be parsed.
    pub fn from_fixture(path: &Path) -> Result<Self, RemoteError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| RemoteError::Unavailable(format!("read {}: {e}", path.display())))?;
        let store = Self::from_json(&json)?;
        tracing::debug!(path = %path.display(), profiles = store.len(), "loaded profile fixture");
        Ok(store)
    }

    /// Insert or replace a profile, returning the previous one.
    pub fn insert(
        &self,
        identity_id: impl Into<String>,
        profile: ProfileAttributes,
    ) -> Option<ProfileAttributes> {
        self.profiles
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(identity_id.into(), profile)
    }

    pub fn remove(&self, identity_id: &str) -> Option<ProfileAttributes> {
        self.profiles
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(identity_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn lookup_profile(
        &self,
        identity_id: &str,
    ) -> Result<Option<ProfileAttributes>, RemoteError> {
        Ok(self
            .profiles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(identity_id)
            .cloned())
    }
}
