//! Future messages ordered by logical time, then by scheduling order.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

use super::behavior::MethodSelector;
use super::types::{ActorId, LogicalTime};

/// Smallest delay a future message can have; `future(0)` still runs after
/// the current handler, never inside it.
pub const MIN_FUTURE_DELAY_MS: LogicalTime = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FutureMessage {
    pub time: LogicalTime,
    pub serial: u64,
    pub actor: ActorId,
    pub method: MethodSelector,
    #[serde(default)]
    pub payload: JsonValue,
}

/// Serialized form of [`FutureQueue`]: messages in due order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FutureQueueState {
    pub next_serial: u64,
    pub pending: Vec<FutureMessage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "FutureQueueState", into = "FutureQueueState")]
pub struct FutureQueue {
    next_serial: u64,
    pending: BTreeMap<(LogicalTime, u64), FutureMessage>,
}

impl FutureQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(
        &mut self,
        now: LogicalTime,
        delay: LogicalTime,
        actor: ActorId,
        method: MethodSelector,
        payload: JsonValue,
    ) -> u64 {
        let serial = self.next_serial;
        self.next_serial += 1;
        let time = now.saturating_add(delay.max(MIN_FUTURE_DELAY_MS));
        self.pending.insert(
            (time, serial),
            FutureMessage {
                time,
                serial,
                actor,
                method,
                payload,
            },
        );
        serial
    }

    /// Removes and returns the earliest message due at or before `until`.
    pub fn pop_due(&mut self, until: LogicalTime) -> Option<FutureMessage> {
        let (&key, _) = self.pending.first_key_value()?;
        if key.0 > until {
            return None;
        }
        self.pending.remove(&key)
    }

    pub fn next_due(&self) -> Option<LogicalTime> {
        self.pending.keys().next().map(|(time, _)| *time)
    }

    pub fn cancel_actor(&mut self, actor: ActorId) -> usize {
        let before = self.pending.len();
        self.pending.retain(|_, message| message.actor != actor);
        before - self.pending.len()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn pending(&self) -> impl Iterator<Item = &FutureMessage> {
        self.pending.values()
    }
}

impl From<FutureQueueState> for FutureQueue {
    fn from(state: FutureQueueState) -> Self {
        Self {
            next_serial: state.next_serial,
            pending: state
                .pending
                .into_iter()
                .map(|message| ((message.time, message.serial), message))
                .collect(),
        }
    }
}

impl From<FutureQueue> for FutureQueueState {
    fn from(queue: FutureQueue) -> Self {
        Self {
            next_serial: queue.next_serial,
            pending: queue.pending.into_values().collect(),
        }
    }
}
