//! Publishing the session snapshot and the consumer-side handle.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;
use vigil_core::{SessionSnapshot, SessionView};

use crate::loader::SessionLoader;

/// Write side of the shared session record. Owned by the loader.
///
/// Besides the snapshot it tracks refresh generations: every `refresh()`
/// takes a generation number, each load records the highest generation that
/// existed when it started, and a refresh completes once a committed load
/// covers its generation.
#[derive(Debug)]
pub(crate) struct SharedState {
    snapshot: watch::Sender<SessionSnapshot>,
    requested: AtomicU64,
    settled: watch::Sender<u64>,
}

impl SharedState {
    pub(crate) fn new() -> Self {
        Self {
            snapshot: watch::Sender::new(SessionSnapshot::default()),
            requested: AtomicU64::new(0),
            settled: watch::Sender::new(0),
        }
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.subscribe()
    }

    pub(crate) fn current(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    pub(crate) fn mark_loading(&self) {
        self.snapshot.send_if_modified(|snapshot| {
            if snapshot.loading {
                false
            } else {
                snapshot.loading = true;
                true
            }
        });
    }

    pub(crate) fn publish(&self, next: SessionSnapshot) {
        self.snapshot.send_if_modified(|snapshot| {
            if *snapshot == next {
                false
            } else {
                *snapshot = next;
                true
            }
        });
    }

    /// Take a new refresh generation.
    pub(crate) fn request(&self) -> u64 {
        self.requested.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Highest generation requested so far.
    pub(crate) fn requested(&self) -> u64 {
        self.requested.load(Ordering::SeqCst)
    }

    /// Mark every generation up to `covers` as settled.
    pub(crate) fn settle(&self, covers: u64) {
        self.settled.send_if_modified(|settled| {
            if covers > *settled {
                *settled = covers;
                true
            } else {
                false
            }
        });
    }

    /// Release every current and future waiter (teardown).
    pub(crate) fn release_waiters(&self) {
        self.settle(u64::MAX);
    }

    pub(crate) async fn wait_settled(&self, generation: u64) {
        let mut settled = self.settled.subscribe();
        // The sender lives as long as `self`, so this only errors if the
        // loader is gone, in which case there is nothing left to wait for.
        let _ = settled.wait_for(|value| *value >= generation).await;
    }
}

/// Read-only view of the session for consumers, plus `refresh()`.
///
/// Cheap to clone; every clone observes the same coordinator.
#[derive(Clone)]
pub struct SessionHandle {
    state: watch::Receiver<SessionSnapshot>,
    loader: Arc<SessionLoader>,
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("snapshot", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl SessionHandle {
    pub(crate) fn new(loader: Arc<SessionLoader>) -> Self {
        Self {
            state: loader.subscribe_state(),
            loader,
        }
    }

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    /// Current snapshot flattened with the derived flags.
    #[must_use]
    pub fn view(&self) -> SessionView {
        self.state.borrow().view()
    }

    /// A fresh receiver for callers that want to drive their own loop.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.clone()
    }

    /// Wait for the next published snapshot. `None` once the coordinator is
    /// gone.
    pub async fn changed(&mut self) -> Option<SessionSnapshot> {
        self.state.changed().await.ok()?;
        Some(self.state.borrow_and_update().clone())
    }

    /// Wait until no load is in progress and return that snapshot.
    pub async fn wait_settled(&mut self) -> SessionSnapshot {
        let settled = self
            .state
            .wait_for(|snapshot| !snapshot.loading)
            .await
            .map(|snapshot| snapshot.clone());
        match settled {
            Ok(snapshot) => snapshot,
            Err(_) => self.state.borrow().clone(),
        }
    }

    /// Request a reload and wait until the settled state reflects it (or a
    /// later load that superseded it). Safe to call from any number of
    /// tasks at once; overlapping calls share round-trips.
    pub async fn refresh(&self) {
        self.loader.refresh().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::Identity;

    #[test]
    fn publish_skips_identical_snapshots() {
        let shared = SharedState::new();
        let mut rx = shared.subscribe();
        rx.mark_unchanged();

        shared.publish(SessionSnapshot::signed_out());
        assert!(rx.has_changed().unwrap());
        rx.mark_unchanged();

        shared.publish(SessionSnapshot::signed_out());
        assert!(!rx.has_changed().unwrap());

        shared.publish(SessionSnapshot::signed_in(
            Identity::new("u1"),
            vigil_core::ProfileAttributes::default(),
        ));
        assert!(rx.has_changed().unwrap());
    }

    #[test]
    fn mark_loading_only_notifies_on_transition() {
        let shared = SharedState::new();
        let mut rx = shared.subscribe();
        rx.mark_unchanged();

        shared.mark_loading();
        assert!(!rx.has_changed().unwrap(), "initial snapshot is already loading");

        shared.publish(SessionSnapshot::signed_out());
        rx.mark_unchanged();
        shared.mark_loading();
        assert!(rx.has_changed().unwrap());
        assert!(shared.current().loading);
    }

    #[tokio::test]
    async fn settle_releases_covered_generations() {
        let shared = SharedState::new();
        let first = shared.request();
        let second = shared.request();
        assert_eq!((first, second), (1, 2));

        shared.settle(2);
        shared.wait_settled(first).await;
        shared.wait_settled(second).await;

        shared.settle(1);
        assert_eq!(*shared.settled.borrow(), 2, "settled never moves backwards");
    }

    #[tokio::test]
    async fn release_waiters_unblocks_future_generations() {
        let shared = SharedState::new();
        shared.release_waiters();
        let generation = shared.request();
        shared.wait_settled(generation).await;
    }
}
