//! Wiring shared by the session commands.

use std::sync::Arc;

use anyhow::Context;
use vigil_auth::TokenIdentityProvider;
use vigil_config::VigilConfig;
use vigil_store::{MemoryProfileStore, RestProfileStore};
use vigil_sync::{ProfileStore, SessionSync, SyncPolicy, TracingObserver};

use crate::cli::GlobalFlags;

pub struct AppContext {
    pub config: VigilConfig,
    pub identity: Arc<TokenIdentityProvider>,
    profiles: Option<Arc<dyn ProfileStore>>,
}

impl AppContext {
    /// Load configuration and build the identity provider. The profile store
    /// is only required by commands that sync.
    pub fn init(flags: &GlobalFlags) -> anyhow::Result<Self> {
        let config = VigilConfig::load_with_dotenv().context("failed to load vigil configuration")?;
        let identity = Arc::new(
            TokenIdentityProvider::from_config(&config.auth)
                .context("failed to set up session token storage")?,
        );

        let profiles: Option<Arc<dyn ProfileStore>> = if let Some(path) = &flags.profiles {
            let store = MemoryProfileStore::from_fixture(path)
                .with_context(|| format!("failed to load profile fixture {}", path.display()))?;
            Some(Arc::new(store))
        } else if let Ok(section) = config.require_profile_store() {
            let tokens = identity.store().clone();
            let store = RestProfileStore::from_config(section)
                .context("failed to build profile store client")?
                .with_bearer(move || tokens.load());
            Some(Arc::new(store))
        } else {
            None
        };

        Ok(Self {
            config,
            identity,
            profiles,
        })
    }

    /// A coordinator over the configured identity provider and profile store.
    pub fn session_sync(&self) -> anyhow::Result<SessionSync> {
        let profiles = self.profiles.clone().context(
            "no profile store configured: pass --profiles <FILE> or set VIGIL_PROFILE_STORE__URL",
        )?;

        Ok(SessionSync::new(
            self.identity.clone(),
            profiles,
            SyncPolicy::from(&self.config.sync),
            Arc::new(TracingObserver),
        ))
    }
}
