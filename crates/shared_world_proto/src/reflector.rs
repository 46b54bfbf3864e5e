//! Envelopes produced by the reflector and the messages they carry.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

pub type ClientId = String;
pub type SeqNo = u64;
/// Logical milliseconds since the session started.
pub type LogicalTime = u64;

pub const SESSION_SCOPE_PREFIX: &str = "session";
pub const VIEW_JOIN_EVENT: &str = "view-join";
pub const VIEW_EXIT_EVENT: &str = "view-exit";

/// Scope used for session-wide system events of the given session.
pub fn session_scope(session_id: &str) -> String {
    format!("{SESSION_SCOPE_PREFIX}.{session_id}")
}

/// Message submitted by a client and totally ordered by the reflector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ReflectedMessage {
    Publish {
        scope: String,
        event: String,
        payload: JsonValue,
    },
    ViewJoin {
        view_id: ClientId,
    },
    ViewExit {
        view_id: ClientId,
    },
    /// Heartbeat that only advances logical time.
    Tick,
}

impl ReflectedMessage {
    pub fn publish(
        scope: impl Into<String>,
        event: impl Into<String>,
        payload: JsonValue,
    ) -> Self {
        ReflectedMessage::Publish {
            scope: scope.into(),
            event: event.into(),
            payload,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ReflectedMessage::Publish { .. } => "publish",
            ReflectedMessage::ViewJoin { .. } => "view_join",
            ReflectedMessage::ViewExit { .. } => "view_exit",
            ReflectedMessage::Tick => "tick",
        }
    }
}

/// A message stamped with its position in the global order.
///
/// `seq` is dense and starts at 1; `time` never decreases from one envelope
/// to the next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReflectorEnvelope {
    pub seq: SeqNo,
    pub time: LogicalTime,
    pub sender: ClientId,
    pub message: ReflectedMessage,
}
