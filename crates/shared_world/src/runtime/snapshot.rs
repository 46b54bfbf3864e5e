//! Session snapshot and envelope journal.

use serde::{Deserialize, Serialize};
use std::path::Path;

use shared_world_proto::ReflectorEnvelope;

use super::behavior::BehaviorDescriptor;
use super::error::SessionError;
use super::model::ModelState;
use super::types::SeqNo;
use super::util::{hash_json, read_json_from_path, write_json_to_path};

pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Complete replicated state at `state.seq`, plus the behaviors that must be
/// installed to keep running it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub format_version: u32,
    pub behaviors: Vec<BehaviorDescriptor>,
    pub state: ModelState,
}

impl SessionSnapshot {
    pub fn seq(&self) -> SeqNo {
        self.state.seq
    }

    pub fn hash(&self) -> Result<String, SessionError> {
        hash_json(&self.state)
    }

    pub fn to_json(&self) -> Result<String, SessionError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(input: &str) -> Result<Self, SessionError> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        write_json_to_path(self, path.as_ref())
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        read_json_from_path(path.as_ref())
    }
}

/// Envelopes applied after some snapshot, in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionJournal {
    pub envelopes: Vec<ReflectorEnvelope>,
}

impl SessionJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.envelopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.envelopes.is_empty()
    }

    pub fn push(&mut self, envelope: ReflectorEnvelope) {
        self.envelopes.push(envelope);
    }

    /// Envelopes with `seq` strictly greater than `seq`.
    pub fn since(&self, seq: SeqNo) -> impl Iterator<Item = &ReflectorEnvelope> {
        self.envelopes
            .iter()
            .filter(move |envelope| envelope.seq > seq)
    }

    /// Drops everything a snapshot at `seq` already contains.
    pub fn truncate_through(&mut self, seq: SeqNo) {
        self.envelopes.retain(|envelope| envelope.seq > seq);
    }

    pub fn to_json(&self) -> Result<String, SessionError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        write_json_to_path(self, path.as_ref())
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        read_json_from_path(path.as_ref())
    }
}
