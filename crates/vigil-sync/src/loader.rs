//! The single-flight session loader.
//!
//! One load runs at a time. Overlapping requests set a pending flag and are
//! answered by exactly one trailing load once the current one finishes.
//! Requests inside the rate-limit window are deferred to its end rather than
//! dropped. Every load carries a [`Ticket`]; after each remote call, and again
//! at commit, a load whose ticket is no longer current gives up without
//! touching shared state, so the most recently *started* load always wins.
//!
//! Bookkeeping lives behind one mutex that is never held across an await.
//! Commits happen under that mutex too, which makes "check ticket, write
//! state" atomic with respect to `begin()`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use vigil_core::{Identity, ProfileAttributes, SessionEventKind, SessionNotice, SessionSnapshot};

use crate::classifier::{LastLoad, classify};
use crate::error::{Stage, SyncError};
use crate::observer::{SyncEvent, SyncObserver};
use crate::policy::SyncPolicy;
use crate::provider::{IdentityProvider, ProfileStore};
use crate::retry::{RetryDecision, RetryScheduler, RetryStatus};
use crate::run_token::{RunTokenGuard, Ticket};
use crate::state::{SessionHandle, SharedState};
use crate::timeout::with_deadline;

/// Why a load was requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    Startup,
    Refresh,
    Retry,
    /// Coalesced follow-up of an earlier request.
    Trailing,
    Notice(SessionEventKind),
    /// The notification stream overflowed.
    Lagged,
}

/// How a call to [`SessionLoader::load`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Folded into an in-flight or already scheduled load.
    Coalesced,
    /// Scheduled for the end of the rate-limit window.
    Deferred,
    Loaded,
    SignedOut,
    /// Failed and left the session signed out.
    Failed,
    /// Superseded by a newer load; nothing was written.
    Stale,
    Stopped,
}

type Fetched = Result<Option<(Identity, ProfileAttributes)>, SyncError>;

enum Fetch {
    Stale(Stage),
    Settled(Fetched),
}

#[derive(Debug, Clone, Copy)]
enum Request {
    /// Coalesce with in-flight work and respect the rate-limit window.
    Queued,
    /// Start now and make the in-flight load stale.
    Superseding { reset_retry: bool },
}

enum Admission {
    Run { ticket: Ticket, covers: u64 },
    Coalesced,
    Deferred(Duration),
    Stopped,
}

#[derive(Debug, Default)]
struct Flight {
    /// Ticket of the load that owns the in-flight slot.
    active: Option<Ticket>,
    /// The active load was admitted by superseding.
    superseding: bool,
    pending: bool,
    last_started: Option<Instant>,
    deferred: Option<JoinHandle<()>>,
    last_load: LastLoad,
    stopped: bool,
}

/// Coordinator for identity + profile loads. Construct with
/// [`SessionLoader::new`]; usually driven through
/// [`crate::coordinator::SessionSync`].
pub struct SessionLoader {
    identity: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileStore>,
    policy: SyncPolicy,
    observer: Arc<dyn SyncObserver>,
    tokens: RunTokenGuard,
    retry: RetryScheduler,
    shared: SharedState,
    flight: Mutex<Flight>,
    this: Weak<Self>,
}

impl std::fmt::Debug for SessionLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLoader")
            .field("policy", &self.policy)
            .field("flight", &self.flight)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl SessionLoader {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        profiles: Arc<dyn ProfileStore>,
        policy: SyncPolicy,
        observer: Arc<dyn SyncObserver>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            identity,
            profiles,
            policy,
            observer,
            tokens: RunTokenGuard::new(),
            retry: RetryScheduler::new(policy.retry_base, policy.retry_cap, policy.max_attempts),
            shared: SharedState::new(),
            flight: Mutex::new(Flight::default()),
            this: this.clone(),
        })
    }

    #[must_use]
    pub fn handle(self: &Arc<Self>) -> SessionHandle {
        SessionHandle::new(Arc::clone(self))
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.shared.current()
    }

    #[must_use]
    pub fn retry_status(&self) -> RetryStatus {
        self.retry.status()
    }

    #[must_use]
    pub fn last_load(&self) -> LastLoad {
        self.lock_flight().last_load.clone()
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.lock_flight().stopped
    }

    pub(crate) fn subscribe_state(&self) -> tokio::sync::watch::Receiver<SessionSnapshot> {
        self.shared.subscribe()
    }

    pub(crate) fn observer(&self) -> &dyn SyncObserver {
        self.observer.as_ref()
    }

    /// Load unless a load is already in flight or one started within the
    /// rate-limit window; in those cases a single trailing load is
    /// guaranteed instead.
    pub async fn load(&self, trigger: Trigger) -> LoadOutcome {
        let admission = self.admit(Request::Queued);
        self.drive(admission, trigger).await
    }

    /// Start a load immediately and reset the retry cycle. Any in-flight
    /// load becomes stale and its result is discarded at its next
    /// checkpoint. If the in-flight load was itself started this way within
    /// the rate-limit window, the request becomes its trailing load instead.
    pub async fn supersede(&self, trigger: Trigger) -> LoadOutcome {
        self.supersede_with(trigger, true).await
    }

    async fn supersede_with(&self, trigger: Trigger, reset_retry: bool) -> LoadOutcome {
        let admission = self.admit(Request::Superseding { reset_retry });
        self.drive(admission, trigger).await
    }

    /// Request a reload and wait until a committed load covers it.
    pub async fn refresh(&self) {
        let generation = self.shared.request();
        self.spawn_load(Trigger::Refresh);
        self.shared.wait_settled(generation).await;
    }

    /// Classify a provider notification and act on it.
    pub fn on_notice(&self, notice: &SessionNotice) {
        let last = self.last_load();
        let decision = classify(&notice.kind, notice.identity_id.as_deref(), &last);

        if !decision.reload {
            self.observer.record(&SyncEvent::NoticeIgnored {
                kind: notice.kind.clone(),
                identity_id: notice.identity_id.clone(),
            });
            return;
        }

        self.observer.record(&SyncEvent::NoticeAccepted {
            kind: notice.kind.clone(),
            identity_id: notice.identity_id.clone(),
        });
        self.spawn_supersede(Trigger::Notice(notice.kind.clone()), decision.reset_retry);
    }

    /// Tear down: invalidate the in-flight load, disarm timers, release
    /// `refresh()` waiters. Later requests are ignored.
    pub fn stop(&self) {
        {
            let mut flight = self.lock_flight();
            if flight.stopped {
                return;
            }
            flight.stopped = true;
            flight.pending = false;
            self.tokens.invalidate();
            if let Some(deferred) = flight.deferred.take() {
                deferred.abort();
            }
            self.retry.disarm();
        }
        self.shared.release_waiters();
        self.observer.record(&SyncEvent::Stopped);
    }

    /// Run [`Self::load`] on its own task.
    pub(crate) fn spawn_load(&self, trigger: Trigger) {
        if let Some(loader) = self.this.upgrade() {
            tokio::spawn(async move {
                loader.load(trigger).await;
            });
        }
    }

    fn spawn_supersede(&self, trigger: Trigger, reset_retry: bool) {
        if let Some(loader) = self.this.upgrade() {
            tokio::spawn(async move {
                loader.supersede_with(trigger, reset_retry).await;
            });
        }
    }

    fn spawn_after(&self, wait: Duration, trigger: Trigger) -> JoinHandle<()> {
        let this = self.this.clone();
        tokio::spawn(async move {
            tokio::time::sleep(wait).await;
            if let Some(loader) = this.upgrade() {
                loader.spawn_load(trigger);
            }
        })
    }

    // -----------------------------------------------------------------------
    // Admission
    // -----------------------------------------------------------------------

    fn admit(&self, request: Request) -> Admission {
        let mut flight = self.lock_flight();
        if flight.stopped {
            return Admission::Stopped;
        }
        self.admit_locked(&mut flight, request)
    }

    fn admit_locked(&self, flight: &mut Flight, request: Request) -> Admission {
        let now = Instant::now();
        let in_window = flight
            .last_started
            .is_some_and(|last| now.saturating_duration_since(last) < self.policy.min_spacing);

        match request {
            Request::Superseding { reset_retry } => {
                // Under the flight lock so a commit cannot interleave.
                if reset_retry && self.retry.reset() {
                    self.observer.record(&SyncEvent::RetryReset);
                }
                if flight.active.is_some() && flight.superseding && in_window {
                    flight.pending = true;
                    return Admission::Coalesced;
                }
            }
            Request::Queued => {
                if flight.active.is_some() {
                    flight.pending = true;
                    return Admission::Coalesced;
                }

                if let Some(last) = flight.last_started.filter(|_| in_window) {
                    let elapsed = now.saturating_duration_since(last);
                    flight.pending = true;
                    if flight
                        .deferred
                        .as_ref()
                        .is_some_and(|timer| !timer.is_finished())
                    {
                        return Admission::Coalesced;
                    }
                    let wait = self.policy.min_spacing - elapsed;
                    flight.deferred = Some(self.spawn_after(wait, Trigger::Trailing));
                    return Admission::Deferred(wait);
                }
            }
        }

        let ticket = self.tokens.begin();
        flight.active = Some(ticket);
        flight.superseding = matches!(request, Request::Superseding { .. });
        flight.pending = false;
        flight.last_started = Some(now);
        if let Some(deferred) = flight.deferred.take() {
            deferred.abort();
        }
        Admission::Run {
            ticket,
            covers: self.shared.requested(),
        }
    }

    async fn drive(&self, admission: Admission, trigger: Trigger) -> LoadOutcome {
        let (mut ticket, mut covers) = match admission {
            Admission::Run { ticket, covers } => (ticket, covers),
            Admission::Coalesced => {
                self.observer.record(&SyncEvent::LoadCoalesced { trigger });
                return LoadOutcome::Coalesced;
            }
            Admission::Deferred(wait) => {
                self.observer.record(&SyncEvent::LoadDeferred { trigger, wait });
                return LoadOutcome::Deferred;
            }
            Admission::Stopped => return LoadOutcome::Stopped,
        };
        let mut trigger = trigger;

        loop {
            let claim = FlightClaim::new(self, ticket);
            let outcome = self.run(ticket, covers, trigger).await;
            match self.finish(claim) {
                Some((next, next_covers)) => {
                    ticket = next;
                    covers = next_covers;
                    trigger = Trigger::Trailing;
                }
                None => return outcome,
            }
        }
    }

    /// Release the in-flight slot held by `claim` and, if requests piled up
    /// meanwhile, admit the trailing load.
    fn finish(&self, mut claim: FlightClaim<'_>) -> Option<(Ticket, u64)> {
        claim.released = true;
        let mut flight = self.lock_flight();
        if flight.active != Some(claim.ticket) {
            return None;
        }
        flight.active = None;
        if flight.stopped || !flight.pending {
            return None;
        }

        match self.admit_locked(&mut flight, Request::Queued) {
            Admission::Run { ticket, covers } => Some((ticket, covers)),
            Admission::Deferred(wait) => {
                self.observer.record(&SyncEvent::LoadDeferred {
                    trigger: Trigger::Trailing,
                    wait,
                });
                None
            }
            Admission::Coalesced | Admission::Stopped => None,
        }
    }

    // -----------------------------------------------------------------------
    // One attempt
    // -----------------------------------------------------------------------

    async fn run(&self, ticket: Ticket, covers: u64, trigger: Trigger) -> LoadOutcome {
        self.observer
            .record(&SyncEvent::LoadStarted { ticket, trigger });
        self.shared.mark_loading();

        match self.fetch(ticket).await {
            Fetch::Stale(stage) => {
                self.observer.record(&SyncEvent::StaleDiscarded {
                    ticket,
                    stage: Some(stage),
                });
                LoadOutcome::Stale
            }
            Fetch::Settled(fetched) => self.commit(ticket, covers, fetched),
        }
    }

    async fn fetch(&self, ticket: Ticket) -> Fetch {
        let identity = with_deadline(
            self.identity.current_identity(),
            self.policy.deadline,
            Stage::Identity,
        )
        .await;
        if !self.tokens.is_current(ticket) {
            return Fetch::Stale(Stage::Identity);
        }

        let identity = match identity {
            Ok(Some(identity)) => identity,
            Ok(None) => return Fetch::Settled(Ok(None)),
            Err(error) => return Fetch::Settled(Err(error)),
        };

        let profile = with_deadline(
            self.profiles.lookup_profile(&identity.id),
            self.policy.deadline,
            Stage::Profile,
        )
        .await;
        if !self.tokens.is_current(ticket) {
            return Fetch::Stale(Stage::Profile);
        }

        Fetch::Settled(profile.map(|profile| Some((identity, profile.unwrap_or_default()))))
    }

    fn commit(&self, ticket: Ticket, covers: u64, fetched: Fetched) -> LoadOutcome {
        let mut flight = self.lock_flight();
        if !self.tokens.is_current(ticket) {
            drop(flight);
            self.observer
                .record(&SyncEvent::StaleDiscarded { ticket, stage: None });
            return LoadOutcome::Stale;
        }

        let outcome = match fetched {
            Ok(Some((identity, profile))) => {
                let identity_id = identity.id.clone();
                flight.last_load = LastLoad::Loaded(Some(identity_id.clone()));
                self.shared
                    .publish(SessionSnapshot::signed_in(identity, profile));
                self.observer.record(&SyncEvent::Loaded {
                    ticket,
                    identity_id,
                });
                self.record_success();
                LoadOutcome::Loaded
            }
            Ok(None) => {
                flight.last_load = LastLoad::Loaded(None);
                self.shared.publish(SessionSnapshot::signed_out());
                self.observer.record(&SyncEvent::SignedOut { ticket });
                self.record_success();
                LoadOutcome::SignedOut
            }
            Err(error) => {
                flight.last_load = flight.last_load.after_failure();
                self.shared.publish(SessionSnapshot::signed_out());
                self.observer.record(&SyncEvent::LoadFailed {
                    ticket,
                    kind: error.kind(),
                    stage: error.stage(),
                    message: error.to_string(),
                });
                self.record_failure(&error);
                LoadOutcome::Failed
            }
        };

        self.shared.settle(covers);
        outcome
    }

    fn record_success(&self) {
        if self.retry.on_success() {
            self.observer.record(&SyncEvent::RetryReset);
        }
    }

    fn record_failure(&self, error: &SyncError) {
        let this = self.this.clone();
        let retry = async move {
            if let Some(loader) = this.upgrade() {
                loader.spawn_load(Trigger::Retry);
            }
        };
        match self.retry.on_failure(error.kind(), retry) {
            RetryDecision::Armed { attempt, delay } => {
                self.observer
                    .record(&SyncEvent::RetryArmed { attempt, delay });
            }
            RetryDecision::Suspended { failures } => {
                self.observer
                    .record(&SyncEvent::RetrySuspended { failures });
            }
        }
    }

    fn lock_flight(&self) -> MutexGuard<'_, Flight> {
        self.flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// In-flight ownership for one ticket. If the driving future is dropped
/// before `finish`, the slot is released here and any pending request gets
/// its trailing load.
struct FlightClaim<'a> {
    loader: &'a SessionLoader,
    ticket: Ticket,
    released: bool,
}

impl<'a> FlightClaim<'a> {
    const fn new(loader: &'a SessionLoader, ticket: Ticket) -> Self {
        Self {
            loader,
            ticket,
            released: false,
        }
    }
}

impl Drop for FlightClaim<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let mut flight = self.loader.lock_flight();
        if flight.active != Some(self.ticket) {
            return;
        }
        flight.active = None;
        let timer_armed = flight
            .deferred
            .as_ref()
            .is_some_and(|timer| !timer.is_finished());
        let runtime_alive = tokio::runtime::Handle::try_current().is_ok();
        if flight.pending && !flight.stopped && !timer_armed && runtime_alive {
            flight.deferred = Some(self.loader.spawn_after(Duration::ZERO, Trigger::Trailing));
        }
    }
}
