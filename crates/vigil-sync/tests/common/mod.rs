//! Scripted collaborators shared by the integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use vigil_core::{Identity, ProfileAttributes, RemoteError, Role, SessionEventKind, SessionNotice};
use vigil_sync::{IdentityProvider, ProfileStore, RecordingObserver, SessionLoader, SyncPolicy};

/// Effectively never answers within any deadline used here.
pub const HANG: u64 = 3_600_000;

type IdentityResult = Result<Option<Identity>, RemoteError>;

#[derive(Clone)]
struct Step {
    delay: Duration,
    result: IdentityResult,
}

/// Identity provider answering from a queue of scripted responses, then from
/// a fallback.
pub struct ScriptedIdentity {
    script: Mutex<VecDeque<Step>>,
    fallback: Mutex<Step>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    notices: broadcast::Sender<SessionNotice>,
}

impl ScriptedIdentity {
    pub fn new() -> Arc<Self> {
        Self::with_capacity(16)
    }

    pub fn with_capacity(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(Step {
                delay: Duration::ZERO,
                result: Ok(None),
            }),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            notices: broadcast::channel(capacity).0,
        })
    }

    /// Queue one response.
    pub fn then(&self, delay_ms: u64, result: IdentityResult) -> &Self {
        self.script.lock().unwrap().push_back(Step {
            delay: Duration::from_millis(delay_ms),
            result,
        });
        self
    }

    /// Response used once the queue is empty.
    pub fn otherwise(&self, delay_ms: u64, result: IdentityResult) -> &Self {
        *self.fallback.lock().unwrap() = Step {
            delay: Duration::from_millis(delay_ms),
            result,
        };
        self
    }

    pub fn notify(&self, kind: SessionEventKind, identity_id: Option<&str>) {
        let _ = self.notices.send(SessionNotice::new(kind, identity_id));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl IdentityProvider for ScriptedIdentity {
    async fn current_identity(&self) -> IdentityResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.lock().unwrap().clone());
        tokio::time::sleep(step.delay).await;
        step.result
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionNotice> {
        self.notices.subscribe()
    }
}

/// Profile store backed by a map, with a fixed latency and an optional
/// forced failure.
pub struct ScriptedProfiles {
    delay: Duration,
    profiles: Mutex<HashMap<String, ProfileAttributes>>,
    failure: Mutex<Option<RemoteError>>,
    calls: AtomicUsize,
}

impl ScriptedProfiles {
    pub fn new(delay_ms: u64) -> Arc<Self> {
        Arc::new(Self {
            delay: Duration::from_millis(delay_ms),
            profiles: Mutex::new(HashMap::new()),
            failure: Mutex::new(None),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn with_role(&self, identity_id: &str, role: Role) -> &Self {
        self.profiles.lock().unwrap().insert(
            identity_id.to_string(),
            ProfileAttributes {
                role: Some(role),
                ..ProfileAttributes::default()
            },
        );
        self
    }

    pub fn fail_with(&self, error: Option<RemoteError>) {
        *self.failure.lock().unwrap() = error;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProfileStore for ScriptedProfiles {
    async fn lookup_profile(
        &self,
        identity_id: &str,
    ) -> Result<Option<ProfileAttributes>, RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        if let Some(error) = self.failure.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(self.profiles.lock().unwrap().get(identity_id).cloned())
    }
}

pub fn user(id: &str) -> IdentityResult {
    Ok(Some(Identity::new(id)))
}

pub fn unavailable() -> IdentityResult {
    Err(RemoteError::Unavailable("connection reset".into()))
}

pub fn loader(
    identity: &Arc<ScriptedIdentity>,
    profiles: &Arc<ScriptedProfiles>,
) -> (Arc<SessionLoader>, Arc<RecordingObserver>) {
    let observer = Arc::new(RecordingObserver::new());
    let loader = SessionLoader::new(
        identity.clone(),
        profiles.clone(),
        SyncPolicy::default(),
        observer.clone(),
    );
    (loader, observer)
}

/// Let spawned tasks and short timers run.
pub async fn settle_for(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

/// Paused-clock timers resolve at millisecond granularity.
#[track_caller]
pub fn assert_elapsed(started: tokio::time::Instant, expected: Duration) {
    let elapsed = started.elapsed();
    assert!(
        elapsed >= expected && elapsed <= expected + Duration::from_millis(5),
        "expected ~{expected:?}, got {elapsed:?}"
    );
}
