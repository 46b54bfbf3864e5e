//! Error types for the document engine.

use thiserror::Error;

use crate::doc::UserId;
use crate::event::Timezone;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocError {
    /// The event predates the retained window; the sender has to reload a
    /// full snapshot instead of being reconciled.
    #[error("edit event at timezone {timezone} is older than the retained window (oldest {oldest})")]
    StaleEvent { timezone: Timezone, oldest: Timezone },
    #[error("edit event claims timezone {timezone} but the document is at {current}")]
    FutureTimezone { timezone: Timezone, current: Timezone },
    #[error("no undoable edit with an anchoring snapshot for user {user}")]
    UndoUnavailable { user: UserId },
    #[error("serde error: {0}")]
    Serde(String),
}

impl From<serde_json::Error> for DocError {
    fn from(error: serde_json::Error) -> Self {
        DocError::Serde(error.to_string())
    }
}
