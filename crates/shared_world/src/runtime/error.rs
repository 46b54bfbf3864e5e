//! Error types for the session runtime.

use std::io;

use shared_world_proto::ProtoError;
use shared_world_text::DocError;
use thiserror::Error;

use super::types::{ActorId, SeqNo};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("envelope sequence gap: expected {expected}, found {found}")]
    SequenceGap { expected: SeqNo, found: SeqNo },
    /// Deterministic code failed; this replica can no longer be trusted.
    #[error("model diverged at seq {seq}: {reason}")]
    Diverged { seq: SeqNo, reason: String },
    #[error("model halted after divergence; reload from a snapshot")]
    Halted,
    #[error("actor not found: {actor}")]
    ActorNotFound { actor: ActorId },
    #[error("behavior not installed: {name}")]
    BehaviorNotFound { name: String },
    #[error("behavior {name} version mismatch: snapshot {expected}, installed {found}")]
    BehaviorVersionMismatch {
        name: String,
        expected: u32,
        found: u32,
    },
    #[error("behavior failed during bootstrap: {0}")]
    Bootstrap(String),
    #[error("ordering channel: {0}")]
    Channel(String),
    #[error("persistence: {0}")]
    Persistence(String),
    #[error(transparent)]
    Proto(#[from] ProtoError),
    #[error(transparent)]
    Doc(#[from] DocError),
    #[error("io error: {0}")]
    Io(String),
    #[error("serde error: {0}")]
    Serde(String),
}

impl SessionError {
    /// Errors after which the client has to reload from a snapshot.
    pub fn requires_resync(&self) -> bool {
        matches!(
            self,
            SessionError::SequenceGap { .. } | SessionError::Diverged { .. } | SessionError::Halted
        )
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(error: serde_json::Error) -> Self {
        SessionError::Serde(error.to_string())
    }
}

impl From<serde_cbor::Error> for SessionError {
    fn from(error: serde_cbor::Error) -> Self {
        SessionError::Serde(error.to_string())
    }
}

impl From<io::Error> for SessionError {
    fn from(error: io::Error) -> Self {
        SessionError::Io(error.to_string())
    }
}

/// Returned by behavior handlers.
///
/// A recoverable failure is logged and confined to the handler that raised
/// it. A fatal one halts the model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BehaviorError {
    #[error("recoverable: {0}")]
    Recoverable(String),
    #[error("fatal: {0}")]
    Fatal(String),
}

impl BehaviorError {
    pub fn recoverable(message: impl Into<String>) -> Self {
        BehaviorError::Recoverable(message.into())
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        BehaviorError::Fatal(message.into())
    }
}

impl From<serde_json::Error> for BehaviorError {
    fn from(error: serde_json::Error) -> Self {
        BehaviorError::Recoverable(format!("payload: {error}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("read config file failed ({path}): {message}")]
    ReadConfigFile { path: String, message: String },
    #[error("parse config file failed ({path}): {message}")]
    ParseConfigFile { path: String, message: String },
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}
