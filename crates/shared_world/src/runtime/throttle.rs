//! Persistence throttle: debounce with a guaranteed trailing fire.

use serde::{Deserialize, Serialize};

use super::types::LogicalTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    /// Persist now.
    FireNow,
    /// A fire is pending and will happen once `at` is reached.
    Deferred { at: LogicalTime },
}

/// At most one fire per `period`. A request inside the period is never
/// dropped: it marks a trailing fire that [`PersistenceThrottle::poll`]
/// releases exactly once at the period boundary, however many requests
/// arrived in between.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistenceThrottle {
    period: LogicalTime,
    last_fire: Option<LogicalTime>,
    pending: bool,
}

impl PersistenceThrottle {
    pub fn new(period: LogicalTime) -> Self {
        Self {
            period,
            last_fire: None,
            pending: false,
        }
    }

    pub fn period(&self) -> LogicalTime {
        self.period
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    fn next_allowed(&self) -> Option<LogicalTime> {
        self.last_fire.map(|last| last.saturating_add(self.period))
    }

    pub fn request(&mut self, now: LogicalTime) -> ThrottleDecision {
        match self.next_allowed() {
            Some(at) if now < at => {
                self.pending = true;
                ThrottleDecision::Deferred { at }
            }
            _ => {
                self.fire(now);
                ThrottleDecision::FireNow
            }
        }
    }

    /// Returns `true` when a deferred request is due; the caller persists.
    pub fn poll(&mut self, now: LogicalTime) -> bool {
        if !self.pending {
            return false;
        }
        match self.next_allowed() {
            Some(at) if now < at => false,
            _ => {
                self.fire(now);
                true
            }
        }
    }

    fn fire(&mut self, now: LogicalTime) {
        self.last_fire = Some(now);
        self.pending = false;
    }
}
