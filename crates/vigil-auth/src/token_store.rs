use std::fs;
use std::path::{Path, PathBuf};

use vigil_config::AuthConfig;

use crate::error::AuthError;

const KEYRING_USER: &str = "session-jwt";
const TOKEN_ENV_VAR: &str = "VIGIL_AUTH__TOKEN";
const CREDENTIALS_DIR: &str = ".vigil";
const CREDENTIALS_FILE_NAME: &str = "credentials";

/// Where a loaded token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Keyring,
    Env,
    File,
}

impl TokenSource {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Keyring => "keyring",
            Self::Env => "env",
            Self::File => "file",
        }
    }
}

impl std::fmt::Display for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session token persistence.
///
/// Load priority: OS keychain → `VIGIL_AUTH__TOKEN` → credentials file
/// (`~/.vigil/credentials` unless `auth.token_file` overrides it). Writes go
/// to the keychain and fall back to the file.
#[derive(Debug, Clone)]
pub struct TokenStore {
    /// `None` disables the keychain and environment tiers.
    keyring_service: Option<String>,
    file: PathBuf,
}

impl TokenStore {
    /// # Errors
    ///
    /// Returns `AuthError::TokenStore` if no `token_file` is configured and
    /// the home directory cannot be resolved.
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        let file = if config.token_file.is_empty() {
            default_credentials_path()?
        } else {
            PathBuf::from(&config.token_file)
        };
        Ok(Self {
            keyring_service: Some(config.keyring_service.clone()),
            file,
        })
    }

    /// Only the given credentials file; no keychain, no environment.
    #[must_use]
    pub fn file_only(path: impl Into<PathBuf>) -> Self {
        Self {
            keyring_service: None,
            file: path.into(),
        }
    }

    #[must_use]
    pub fn credentials_path(&self) -> &Path {
        &self.file
    }

    /// # Errors
    ///
    /// Returns `AuthError::TokenStore` if both keyring and file storage fail.
    pub fn store(&self, jwt: &str) -> Result<(), AuthError> {
        let Some(entry) = self.keyring_entry() else {
            return self.store_file(jwt);
        };
        match entry.and_then(|entry| entry.set_password(jwt)) {
            Ok(()) => Ok(()),
            Err(error) => {
                tracing::warn!(%error, "keyring store failed; falling back to file");
                self.store_file(jwt)
            }
        }
    }

    #[must_use]
    pub fn load(&self) -> Option<String> {
        self.load_with_source().map(|(token, _)| token)
    }

    /// The token together with the tier that supplied it.
    #[must_use]
    pub fn load_with_source(&self) -> Option<(String, TokenSource)> {
        if let Some(Ok(entry)) = self.keyring_entry()
            && let Ok(token) = entry.get_password()
            && !token.trim().is_empty()
        {
            return Some((token, TokenSource::Keyring));
        }

        if self.keyring_service.is_some()
            && let Ok(token) = std::env::var(TOKEN_ENV_VAR)
            && !token.trim().is_empty()
        {
            return Some((token, TokenSource::Env));
        }

        self.load_file().map(|token| (token, TokenSource::File))
    }

    /// Remove the token from the keychain and the credentials file.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenStore` if the credentials file cannot be removed.
    pub fn delete(&self) -> Result<(), AuthError> {
        if let Some(Ok(entry)) = self.keyring_entry() {
            let _ = entry.delete_credential();
        }

        if self.file.exists() {
            fs::remove_file(&self.file).map_err(|e| {
                AuthError::TokenStore(format!("failed to delete {}: {e}", self.file.display()))
            })?;
        }
        Ok(())
    }

    fn keyring_entry(&self) -> Option<keyring::Result<keyring::Entry>> {
        self.keyring_service
            .as_deref()
            .map(|service| keyring::Entry::new(service, KEYRING_USER))
    }

    fn store_file(&self, jwt: &str) -> Result<(), AuthError> {
        if let Some(parent) = self.file.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .map_err(|e| AuthError::TokenStore(format!("mkdir {}: {e}", parent.display())))?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Err(e) = fs::set_permissions(parent, fs::Permissions::from_mode(0o700)) {
                    tracing::warn!("failed to chmod 0700 {}: {e}", parent.display());
                }
            }
        }
        fs::write(&self.file, jwt)
            .map_err(|e| AuthError::TokenStore(format!("write {}: {e}", self.file.display())))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.file, fs::Permissions::from_mode(0o600)).map_err(|e| {
                AuthError::TokenStore(format!("chmod {}: {e}", self.file.display()))
            })?;
        }
        Ok(())
    }

    fn load_file(&self) -> Option<String> {
        fs::read_to_string(&self.file)
            .ok()
            .map(|content| content.trim().to_string())
            .filter(|token| !token.is_empty())
    }
}

fn default_credentials_path() -> Result<PathBuf, AuthError> {
    dirs::home_dir()
        .map(|home| home.join(CREDENTIALS_DIR).join(CREDENTIALS_FILE_NAME))
        .ok_or_else(|| {
            AuthError::TokenStore("home directory not found; set auth.token_file".into())
        })
}
