//! Shared identifier and time types.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

pub use shared_world_proto::{ClientId, LogicalTime, SeqNo};

pub type ActorId = u64;

/// Scope every actor owns; `say` publishes here and pawns listen here.
pub fn actor_scope(actor: ActorId) -> String {
    format!("actor.{actor}")
}

/// Inverse of [`actor_scope`].
pub fn scope_actor(scope: &str) -> Option<ActorId> {
    scope.strip_prefix("actor.")?.parse().ok()
}

/// Something the model published during a step, handed to every view after
/// the step completes. Views never feed these back into the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewNotification {
    pub scope: String,
    pub event: String,
    pub payload: JsonValue,
    /// Actor whose handler published it; `None` for system events.
    pub source: Option<ActorId>,
}
