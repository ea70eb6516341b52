//! Cancelable delayed callbacks, decoupled from any view layer.
//!
//! The engine never holds closures. It asks a [`Scheduler`] for a
//! [`TimerId`] and the host calls back into the session with that id once
//! the delay has elapsed. A cancelled or superseded id is simply ignored,
//! which is what keeps an auto-advance from firing twice or into a
//! session that has been torn down.

use std::collections::BTreeSet;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(pub u64);

pub trait Scheduler {
    /// Arrange for `id` to be reported back after `delay`.
    fn schedule(&mut self, delay: Duration) -> TimerId;

    /// Drop a pending timer. Unknown or already fired ids are a no-op.
    fn cancel(&mut self, id: TimerId);
}

/// Virtual-time scheduler for headless hosts and tests.
#[derive(Debug, Default)]
pub struct VirtualClock {
    now: Duration,
    next_id: u64,
    /// Keyed by (deadline, id) so equal deadlines fire in scheduling order.
    pending: BTreeSet<(Duration, TimerId)>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Deadline of the earliest pending timer.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.pending.iter().next().map(|(deadline, _)| *deadline)
    }

    /// Move time forward and return every timer that came due, earliest first.
    pub fn advance(&mut self, by: Duration) -> Vec<TimerId> {
        self.now = self.now.saturating_add(by);
        let due: Vec<(Duration, TimerId)> = self
            .pending
            .iter()
            .take_while(|(deadline, _)| *deadline <= self.now)
            .copied()
            .collect();
        for key in &due {
            self.pending.remove(key);
        }
        due.into_iter().map(|(_, id)| id).collect()
    }
}

impl Scheduler for VirtualClock {
    fn schedule(&mut self, delay: Duration) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.pending.insert((self.now.saturating_add(delay), id));
        id
    }

    fn cancel(&mut self, id: TimerId) {
        self.pending.retain(|(_, pending)| *pending != id);
    }
}
