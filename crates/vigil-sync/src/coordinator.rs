//! Lifecycle: wire the identity provider's notification stream to the loader.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use vigil_core::SessionNotice;

use crate::loader::{SessionLoader, Trigger};
use crate::observer::{SyncEvent, SyncObserver, TracingObserver};
use crate::policy::SyncPolicy;
use crate::provider::{IdentityProvider, ProfileStore};
use crate::state::SessionHandle;

/// Owns the loader and the notification pump.
///
/// `start()` subscribes to provider notices and kicks off the initial load.
/// `stop()` (or dropping the value) unsubscribes, disarms timers and releases
/// any pending `refresh()` calls.
pub struct SessionSync {
    loader: Arc<SessionLoader>,
    identity: Arc<dyn IdentityProvider>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for SessionSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSync")
            .field("loader", &self.loader)
            .finish_non_exhaustive()
    }
}

impl SessionSync {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        profiles: Arc<dyn ProfileStore>,
        policy: SyncPolicy,
        observer: Arc<dyn SyncObserver>,
    ) -> Self {
        let loader = SessionLoader::new(Arc::clone(&identity), profiles, policy, observer);
        Self {
            loader,
            identity,
            pump: Mutex::new(None),
        }
    }

    /// Default policy, events logged through `tracing`.
    pub fn with_defaults(identity: Arc<dyn IdentityProvider>, profiles: Arc<dyn ProfileStore>) -> Self {
        Self::new(
            identity,
            profiles,
            SyncPolicy::default(),
            Arc::new(TracingObserver),
        )
    }

    /// Subscribe to provider notices and start the initial load. Calling it
    /// again while running only hands out another handle. Must be called
    /// from within a tokio runtime.
    pub fn start(&self) -> SessionHandle {
        let mut pump = self.pump.lock().unwrap_or_else(PoisonError::into_inner);
        if pump.is_none() && !self.loader.is_stopped() {
            let notices = self.identity.subscribe();
            *pump = Some(tokio::spawn(pump_notices(
                Arc::downgrade(&self.loader),
                notices,
            )));
            self.loader.spawn_load(Trigger::Startup);
        }
        self.loader.handle()
    }

    #[must_use]
    pub fn handle(&self) -> SessionHandle {
        self.loader.handle()
    }

    #[must_use]
    pub fn loader(&self) -> &Arc<SessionLoader> {
        &self.loader
    }

    /// Unsubscribe and tear the loader down. Idempotent.
    pub fn stop(&self) {
        if let Some(pump) = self
            .pump
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            pump.abort();
        }
        self.loader.stop();
    }
}

impl Drop for SessionSync {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn pump_notices(loader: Weak<SessionLoader>, mut notices: broadcast::Receiver<SessionNotice>) {
    loop {
        let received = notices.recv().await;
        let Some(loader) = loader.upgrade() else {
            return;
        };
        match received {
            Ok(notice) => loader.on_notice(&notice),
            Err(RecvError::Lagged(skipped)) => {
                loader
                    .observer()
                    .record(&SyncEvent::NoticesLagged { skipped });
                loader.spawn_load(Trigger::Lagged);
            }
            Err(RecvError::Closed) => {
                tracing::debug!("identity provider closed its notification stream");
                return;
            }
        }
    }
}
