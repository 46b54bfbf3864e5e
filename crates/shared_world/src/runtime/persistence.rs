//! Durable encoding of session snapshots.

use log::info;
use std::fs;
use std::path::{Path, PathBuf};

use shared_world_proto::{decode_cbor, decode_json, encode_cbor, encode_json};

use super::behavior::BehaviorRegistry;
use super::config::{CodecKind, SessionConfig};
use super::error::SessionError;
use super::model::Model;
use super::snapshot::{SessionJournal, SessionSnapshot};

/// `parse(save(x))` must rebuild a snapshot that, driven by the same
/// envelopes, reaches the same state as `x`.
pub trait PersistenceCodec: Send + Sync {
    fn kind(&self) -> CodecKind;

    fn save(&self, snapshot: &SessionSnapshot) -> Result<Vec<u8>, SessionError>;

    fn parse(&self, blob: &[u8]) -> Result<SessionSnapshot, SessionError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl PersistenceCodec for JsonCodec {
    fn kind(&self) -> CodecKind {
        CodecKind::Json
    }

    fn save(&self, snapshot: &SessionSnapshot) -> Result<Vec<u8>, SessionError> {
        Ok(encode_json(snapshot)?)
    }

    fn parse(&self, blob: &[u8]) -> Result<SessionSnapshot, SessionError> {
        Ok(decode_json(blob)?)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CborCodec;

impl PersistenceCodec for CborCodec {
    fn kind(&self) -> CodecKind {
        CodecKind::Cbor
    }

    fn save(&self, snapshot: &SessionSnapshot) -> Result<Vec<u8>, SessionError> {
        Ok(encode_cbor(snapshot)?)
    }

    fn parse(&self, blob: &[u8]) -> Result<SessionSnapshot, SessionError> {
        Ok(decode_cbor(blob)?)
    }
}

pub fn codec_for(kind: CodecKind) -> Box<dyn PersistenceCodec> {
    match kind {
        CodecKind::Json => Box::new(JsonCodec),
        CodecKind::Cbor => Box::new(CborCodec),
    }
}

const JOURNAL_FILE: &str = "journal.json";
const SNAPSHOT_FILE_STEM: &str = "snapshot";

/// A directory holding one encoded snapshot and the JSON journal of
/// envelopes applied after it.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
    codec: CodecKind,
}

impl SessionStore {
    pub fn new(dir: impl AsRef<Path>, codec: CodecKind) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            codec,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn snapshot_path(&self) -> PathBuf {
        let extension = match self.codec {
            CodecKind::Json => "json",
            CodecKind::Cbor => "cbor",
        };
        self.dir.join(format!("{SNAPSHOT_FILE_STEM}.{extension}"))
    }

    fn journal_path(&self) -> PathBuf {
        self.dir.join(JOURNAL_FILE)
    }

    pub fn save(
        &self,
        snapshot: &SessionSnapshot,
        journal: &SessionJournal,
    ) -> Result<(), SessionError> {
        fs::create_dir_all(&self.dir)?;
        let blob = codec_for(self.codec).save(snapshot)?;
        fs::write(self.snapshot_path(), blob)?;
        journal.save_json(self.journal_path())?;
        info!(
            "saved snapshot at seq {} and {} journal envelopes to {}",
            snapshot.seq(),
            journal.len(),
            self.dir.display()
        );
        Ok(())
    }

    /// A missing journal loads as empty; a missing snapshot is an error.
    pub fn load(&self) -> Result<(SessionSnapshot, SessionJournal), SessionError> {
        let path = self.snapshot_path();
        let blob = fs::read(&path).map_err(|err| {
            SessionError::Persistence(format!("read {}: {err}", path.display()))
        })?;
        let snapshot = codec_for(self.codec).parse(&blob)?;
        let journal_path = self.journal_path();
        let journal = if journal_path.exists() {
            SessionJournal::load_json(journal_path)?
        } else {
            SessionJournal::new()
        };
        Ok((snapshot, journal))
    }

    /// Loads the snapshot and replays the journal on top of it.
    pub fn restore(
        &self,
        config: SessionConfig,
        registry: BehaviorRegistry,
    ) -> Result<Model, SessionError> {
        let (snapshot, journal) = self.load()?;
        let base = snapshot.seq();
        let mut model = Model::from_snapshot(config, registry, snapshot)?;
        for envelope in journal.since(base) {
            model.apply(envelope)?;
        }
        Ok(model)
    }
}
