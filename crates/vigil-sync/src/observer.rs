//! Structured event sink injected into the loader.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use vigil_core::SessionEventKind;

use crate::error::{FailureKind, Stage};
use crate::loader::Trigger;
use crate::run_token::Ticket;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    LoadStarted {
        ticket: Ticket,
        trigger: Trigger,
    },
    /// Folded into the in-flight load or an already armed trailing load.
    LoadCoalesced {
        trigger: Trigger,
    },
    /// Inside the rate-limit window; a trailing load fires after `wait`.
    LoadDeferred {
        trigger: Trigger,
        wait: Duration,
    },
    /// A superseded load's result was dropped. `stage` is the checkpoint
    /// where it noticed, `None` when caught at commit.
    StaleDiscarded {
        ticket: Ticket,
        stage: Option<Stage>,
    },
    Loaded {
        ticket: Ticket,
        identity_id: String,
    },
    SignedOut {
        ticket: Ticket,
    },
    LoadFailed {
        ticket: Ticket,
        kind: FailureKind,
        stage: Stage,
        message: String,
    },
    RetryArmed {
        attempt: u32,
        delay: Duration,
    },
    /// Failure cap reached; automatic retries stop until a qualifying event.
    RetrySuspended {
        failures: u32,
    },
    RetryReset,
    NoticeAccepted {
        kind: SessionEventKind,
        identity_id: Option<String>,
    },
    NoticeIgnored {
        kind: SessionEventKind,
        identity_id: Option<String>,
    },
    NoticesLagged {
        skipped: u64,
    },
    Stopped,
}

pub trait SyncObserver: Send + Sync {
    fn record(&self, event: &SyncEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl SyncObserver for TracingObserver {
    fn record(&self, event: &SyncEvent) {
        match event {
            SyncEvent::LoadStarted { ticket, trigger } => {
                tracing::debug!(%ticket, ?trigger, "session load started");
            }
            SyncEvent::LoadCoalesced { trigger } => {
                tracing::trace!(?trigger, "session load coalesced");
            }
            SyncEvent::LoadDeferred { trigger, wait } => {
                tracing::trace!(?trigger, ?wait, "session load deferred");
            }
            SyncEvent::StaleDiscarded { ticket, stage } => {
                tracing::debug!(%ticket, ?stage, "discarded superseded session load");
            }
            SyncEvent::Loaded {
                ticket,
                identity_id,
            } => {
                tracing::info!(%ticket, %identity_id, "session loaded");
            }
            SyncEvent::SignedOut { ticket } => {
                tracing::info!(%ticket, "no active session");
            }
            SyncEvent::LoadFailed {
                ticket,
                kind,
                stage,
                message,
            } => match kind {
                FailureKind::Timeout => {
                    tracing::warn!(%ticket, %stage, "session load timed out: {message}");
                }
                FailureKind::Remote => {
                    tracing::warn!(%ticket, %stage, "session load failed: {message}");
                }
            },
            SyncEvent::RetryArmed { attempt, delay } => {
                tracing::info!(attempt, ?delay, "session retry armed");
            }
            SyncEvent::RetrySuspended { failures } => {
                tracing::error!(
                    failures,
                    "session loads keep failing; automatic retries suspended until the next sign-in"
                );
            }
            SyncEvent::RetryReset => tracing::debug!("session retry state reset"),
            SyncEvent::NoticeAccepted { kind, identity_id } => {
                tracing::debug!(%kind, ?identity_id, "session notice triggers reload");
            }
            SyncEvent::NoticeIgnored { kind, identity_id } => {
                tracing::trace!(%kind, ?identity_id, "session notice ignored");
            }
            SyncEvent::NoticesLagged { skipped } => {
                tracing::warn!(skipped, "missed session notices; reloading");
            }
            SyncEvent::Stopped => tracing::debug!("session sync stopped"),
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<SyncEvent>>,
}

impl RecordingObserver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<SyncEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of recorded events matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&SyncEvent) -> bool) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|event| predicate(event))
            .count()
    }
}

impl SyncObserver for RecordingObserver {
    fn record(&self, event: &SyncEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}
