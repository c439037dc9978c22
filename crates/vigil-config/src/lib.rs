//! # vigil-config
//!
//! Layered configuration loading for Vigil using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`VIGIL_*` prefix, `__` as separator)
//! 2. Project-level `.vigil/config.toml`
//! 3. User-level `~/.config/vigil/config.toml`
//! 4. Built-in defaults
//!
//! `VIGIL_SYNC__MAX_ATTEMPTS` maps to `sync.max_attempts`,
//! `VIGIL_PROFILE_STORE__URL` to `profile_store.url`, and so on.
//!
//! ```no_run
//! use vigil_config::VigilConfig;
//!
//! let config = VigilConfig::load_with_dotenv().expect("config");
//! println!("deadline: {}ms", config.sync.deadline_ms);
//! ```

mod auth;
mod error;
mod profile_store;
mod sync;

pub use auth::AuthConfig;
pub use error::ConfigError;
pub use profile_store::ProfileStoreConfig;
pub use sync::SyncConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct VigilConfig {
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub profile_store: ProfileStoreConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

impl VigilConfig {
    /// Load configuration from TOML files and environment variables, then
    /// validate it.
    ///
    /// Does NOT read `.env`; use [`Self::load_with_dotenv`] for that.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(&Self::figment())
    }

    /// Load `.env` from the working directory (or the nearest ancestor that
    /// has one), then [`Self::load`].
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load()
    }

    /// Extract and validate from an arbitrary figment. Tests build their own
    /// provider chains and pass them here.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.sync.validate()?;
        Ok(config)
    }

    /// Build the provider chain.
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            figment = figment.merge(Toml::file(global_path));
        }

        let local_path = PathBuf::from(".vigil/config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        figment.merge(Env::prefixed("VIGIL_").split("__"))
    }

    /// Fails with `NotConfigured` unless the REST profile store has a URL and key.
    pub fn require_profile_store(&self) -> Result<&ProfileStoreConfig, ConfigError> {
        if self.profile_store.is_configured() {
            Ok(&self.profile_store)
        } else {
            Err(ConfigError::NotConfigured {
                section: "profile_store",
            })
        }
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("vigil").join("config.toml"))
    }
}
