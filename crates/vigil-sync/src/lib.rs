//! # vigil-sync
//!
//! Keeps one consistent view of the signed-in identity and its profile
//! attributes while the underlying lookups are slow, flaky remote calls and
//! reload triggers (startup, provider notifications, manual refreshes) fire
//! concurrently.
//!
//! - [`loader::SessionLoader`]: single-flight coordinator with stale-result
//!   suppression and a rate-limit window
//! - [`retry::RetryScheduler`]: bounded exponential backoff, one armed timer
//! - [`classifier`]: which provider notifications warrant a reload
//! - [`timeout::with_deadline`]: per-call deadline
//! - [`coordinator::SessionSync`]: `start()`/`stop()` lifecycle wiring the
//!   provider's notification stream to the loader
//! - [`state::SessionHandle`]: what consumers hold
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use vigil_sync::{IdentityProvider, ProfileStore, SessionSync};
//! # async fn demo(identity: Arc<dyn IdentityProvider>, profiles: Arc<dyn ProfileStore>) {
//! let sync = SessionSync::with_defaults(identity, profiles);
//! let mut session = sync.start();
//! let settled = session.wait_settled().await;
//! if settled.is_admin() {
//!     session.refresh().await;
//! }
//! sync.stop();
//! # }
//! ```

pub mod classifier;
pub mod coordinator;
pub mod error;
pub mod loader;
pub mod observer;
pub mod policy;
pub mod provider;
pub mod retry;
pub mod run_token;
pub mod state;
pub mod timeout;

pub use classifier::{Classification, LastLoad, classify};
pub use coordinator::SessionSync;
pub use error::{FailureKind, Stage, SyncError};
pub use loader::{LoadOutcome, SessionLoader, Trigger};
pub use observer::{RecordingObserver, SyncEvent, SyncObserver, TracingObserver};
pub use policy::SyncPolicy;
pub use provider::{IdentityProvider, ProfileStore};
pub use retry::{RetryDecision, RetryScheduler, RetryStatus};
pub use run_token::{RunTokenGuard, Ticket};
pub use state::SessionHandle;
pub use timeout::with_deadline;
