use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Ticket captured at the start of a load attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

impl Ticket {
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Issues monotonically increasing tickets. Only the most recently issued
/// ticket is current; results carried by any older ticket are discarded.
#[derive(Debug, Default)]
pub struct RunTokenGuard {
    current: AtomicU64,
}

impl RunTokenGuard {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            current: AtomicU64::new(0),
        }
    }

    /// Issue a new ticket, making every earlier ticket stale.
    pub fn begin(&self) -> Ticket {
        Ticket(self.current.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// True iff no `begin()` (or `invalidate()`) happened after `ticket` was issued.
    #[must_use]
    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.current.load(Ordering::SeqCst) == ticket.0
    }

    /// Make every issued ticket stale without starting a new attempt.
    pub fn invalidate(&self) {
        self.current.fetch_add(1, Ordering::SeqCst);
    }
}
