//! Session token storage configuration.

use serde::{Deserialize, Serialize};

fn default_keyring_service() -> String {
    "vigil-cli".to_string()
}

const fn default_expiry_buffer_secs() -> i64 {
    60
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AuthConfig {
    /// OS keychain service name the session token is stored under.
    #[serde(default = "default_keyring_service")]
    pub keyring_service: String,

    /// Credentials file override. Empty means `~/.vigil/credentials`.
    #[serde(default)]
    pub token_file: String,

    /// Tokens expiring within this many seconds are treated as signed out.
    #[serde(default = "default_expiry_buffer_secs")]
    pub expiry_buffer_secs: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            keyring_service: default_keyring_service(),
            token_file: String::new(),
            expiry_buffer_secs: default_expiry_buffer_secs(),
        }
    }
}
