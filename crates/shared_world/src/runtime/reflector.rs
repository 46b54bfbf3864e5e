//! The ordering channel between clients.

use log::{debug, info};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use shared_world_proto::{ClientId, LogicalTime, ReflectedMessage, ReflectorEnvelope, SeqNo};

use super::config::CodecKind;
use super::error::SessionError;

pub const REFLECTOR_SENDER: &str = "reflector";

/// An encoded snapshot some client uploaded, with the seq it was taken at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedSnapshot {
    pub seq: SeqNo,
    pub codec: CodecKind,
    pub blob: Vec<u8>,
}

/// What a joining client starts from: the latest snapshot, if any, with the
/// channel positioned right after it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JoinTicket {
    pub snapshot: Option<UploadedSnapshot>,
}

/// Total order over every client's messages. Every client drains the same
/// envelopes in the same order.
pub trait OrderingChannel {
    /// Registers `client` and orders a view-join message for it.
    fn join(&self, client: &str) -> Result<JoinTicket, SessionError>;

    /// Repositions an existing client after the latest snapshot without
    /// announcing a new view.
    fn rewind(&self, client: &str) -> Result<JoinTicket, SessionError>;

    fn leave(&self, client: &str) -> Result<SeqNo, SessionError>;

    fn send(&self, sender: &str, message: ReflectedMessage) -> Result<SeqNo, SessionError>;

    /// Envelopes ordered since the client's last drain.
    fn drain(&self, client: &str) -> Result<Vec<ReflectorEnvelope>, SessionError>;

    fn upload_snapshot(&self, snapshot: UploadedSnapshot) -> Result<(), SessionError>;
}

#[derive(Debug, Default)]
struct ReflectorState {
    time: LogicalTime,
    log: Vec<ReflectorEnvelope>,
    cursors: BTreeMap<ClientId, usize>,
    snapshot: Option<UploadedSnapshot>,
}

impl ReflectorState {
    fn append(&mut self, sender: &str, message: ReflectedMessage) -> SeqNo {
        let seq = self.log.len() as SeqNo + 1;
        debug!("reflector orders seq {seq} ({}) from {sender}", message.kind());
        self.log.push(ReflectorEnvelope {
            seq,
            time: self.time,
            sender: sender.to_string(),
            message,
        });
        seq
    }

    fn ticket(&self) -> (JoinTicket, usize) {
        let start = self
            .snapshot
            .as_ref()
            .map(|snapshot| snapshot.seq as usize)
            .unwrap_or(0);
        (
            JoinTicket {
                snapshot: self.snapshot.clone(),
            },
            start,
        )
    }
}

/// In-process reflector. Clones share the same channel; logical time only
/// moves when [`InMemoryReflector::tick`] is called.
#[derive(Debug, Clone, Default)]
pub struct InMemoryReflector {
    state: Arc<Mutex<ReflectorState>>,
}

impl InMemoryReflector {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, ReflectorState>, SessionError> {
        self.state
            .lock()
            .map_err(|_| SessionError::Channel("reflector lock poisoned".to_string()))
    }

    /// Advances logical time and orders a heartbeat carrying it.
    pub fn tick(&self, ms: LogicalTime) -> Result<SeqNo, SessionError> {
        let mut state = self.lock()?;
        state.time = state.time.saturating_add(ms);
        Ok(state.append(REFLECTOR_SENDER, ReflectedMessage::Tick))
    }

    pub fn time(&self) -> Result<LogicalTime, SessionError> {
        Ok(self.lock()?.time)
    }

    pub fn last_seq(&self) -> Result<SeqNo, SessionError> {
        Ok(self.lock()?.log.len() as SeqNo)
    }

    pub fn latest_snapshot(&self) -> Result<Option<UploadedSnapshot>, SessionError> {
        Ok(self.lock()?.snapshot.clone())
    }

    /// Every envelope ordered so far.
    pub fn history(&self) -> Result<Vec<ReflectorEnvelope>, SessionError> {
        Ok(self.lock()?.log.clone())
    }
}

impl OrderingChannel for InMemoryReflector {
    fn join(&self, client: &str) -> Result<JoinTicket, SessionError> {
        let mut state = self.lock()?;
        let (ticket, start) = state.ticket();
        state.cursors.insert(client.to_string(), start);
        state.append(
            client,
            ReflectedMessage::ViewJoin {
                view_id: client.to_string(),
            },
        );
        info!(
            "client {client} joined at seq {start} ({})",
            if ticket.snapshot.is_some() {
                "from snapshot"
            } else {
                "from start"
            }
        );
        Ok(ticket)
    }

    fn rewind(&self, client: &str) -> Result<JoinTicket, SessionError> {
        let mut state = self.lock()?;
        let (ticket, start) = state.ticket();
        state.cursors.insert(client.to_string(), start);
        Ok(ticket)
    }

    fn leave(&self, client: &str) -> Result<SeqNo, SessionError> {
        let mut state = self.lock()?;
        state.cursors.remove(client);
        Ok(state.append(
            client,
            ReflectedMessage::ViewExit {
                view_id: client.to_string(),
            },
        ))
    }

    fn send(&self, sender: &str, message: ReflectedMessage) -> Result<SeqNo, SessionError> {
        let mut state = self.lock()?;
        if !state.cursors.contains_key(sender) {
            return Err(SessionError::Channel(format!(
                "client {sender} has not joined"
            )));
        }
        Ok(state.append(sender, message))
    }

    fn drain(&self, client: &str) -> Result<Vec<ReflectorEnvelope>, SessionError> {
        let mut state = self.lock()?;
        let end = state.log.len();
        let cursor = state
            .cursors
            .get_mut(client)
            .ok_or_else(|| SessionError::Channel(format!("client {client} has not joined")))?;
        let start = (*cursor).min(end);
        *cursor = end;
        Ok(state.log[start..end].to_vec())
    }

    /// Keeps only the newest snapshot.
    fn upload_snapshot(&self, snapshot: UploadedSnapshot) -> Result<(), SessionError> {
        let mut state = self.lock()?;
        let newer = state
            .snapshot
            .as_ref()
            .map(|current| snapshot.seq > current.seq)
            .unwrap_or(true);
        if newer && snapshot.seq <= state.log.len() as SeqNo {
            debug!("reflector stores snapshot at seq {}", snapshot.seq);
            state.snapshot = Some(snapshot);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn every_client_sees_the_same_dense_order() {
        let reflector = InMemoryReflector::new();
        reflector.join("a").expect("join a");
        reflector.join("b").expect("join b");
        reflector
            .send("a", ReflectedMessage::publish("s", "e", json!(1)))
            .expect("send");
        reflector.tick(100).expect("tick");
        reflector
            .send("b", ReflectedMessage::publish("s", "e", json!(2)))
            .expect("send");

        let a = reflector.drain("a").expect("drain a");
        let b = reflector.drain("b").expect("drain b");
        assert_eq!(a, b);
        let seqs: Vec<_> = a.iter().map(|envelope| envelope.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3, 4, 5]);
        assert_eq!(a[4].time, 100);
        assert!(reflector.drain("a").expect("drain again").is_empty());
    }

    #[test]
    fn unjoined_sender_is_rejected() {
        let reflector = InMemoryReflector::new();
        let err = reflector
            .send("ghost", ReflectedMessage::Tick)
            .expect_err("not joined");
        assert!(matches!(err, SessionError::Channel(_)));
    }

    #[test]
    fn late_joiner_starts_after_latest_snapshot() {
        let reflector = InMemoryReflector::new();
        reflector.join("a").expect("join");
        reflector.tick(10).expect("tick");
        reflector
            .upload_snapshot(UploadedSnapshot {
                seq: 2,
                codec: CodecKind::Json,
                blob: b"{}".to_vec(),
            })
            .expect("upload");
        reflector.tick(10).expect("tick");

        let ticket = reflector.join("b").expect("join b");
        assert_eq!(ticket.snapshot.map(|snapshot| snapshot.seq), Some(2));
        let seqs: Vec<_> = reflector
            .drain("b")
            .expect("drain")
            .iter()
            .map(|envelope| envelope.seq)
            .collect();
        assert_eq!(seqs, vec![3, 4]);
    }

    #[test]
    fn older_or_future_snapshots_are_ignored() {
        let reflector = InMemoryReflector::new();
        reflector.join("a").expect("join");
        reflector.tick(1).expect("tick");
        let upload = |seq| UploadedSnapshot {
            seq,
            codec: CodecKind::Cbor,
            blob: Vec::new(),
        };
        reflector.upload_snapshot(upload(2)).expect("upload");
        reflector.upload_snapshot(upload(1)).expect("upload");
        reflector.upload_snapshot(upload(9)).expect("upload");
        let latest = reflector.latest_snapshot().expect("latest");
        assert_eq!(latest.map(|snapshot| snapshot.seq), Some(2));
    }
}
