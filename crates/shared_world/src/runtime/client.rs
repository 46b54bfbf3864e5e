//! One participant: a model replica, its view and the persistence
//! schedule, driven by envelopes from an [`OrderingChannel`].

use log::{error, info, warn};
use serde_json::Value as JsonValue;

use shared_world_text::{EditEvent, EditKind};

use super::behavior::BehaviorRegistry;
use super::builtin_behaviors::{SessionRootBehavior, DOCUMENT_EDIT_EVENT};
use super::config::{CodecKind, SessionConfig};
use super::error::SessionError;
use super::model::Model;
use super::persistence::{codec_for, SessionStore};
use super::reflector::{JoinTicket, OrderingChannel, UploadedSnapshot};
use super::snapshot::{SessionJournal, SessionSnapshot};
use super::throttle::{PersistenceThrottle, ThrottleDecision};
use super::types::{actor_scope, ActorId, ClientId, SeqNo};
use super::view::{PawnFactory, View};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientStatus {
    Connected,
    /// The replica can no longer be trusted or fell behind the document
    /// window; [`Client::reload`] recovers it.
    MustResync { reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PumpReport {
    pub applied: usize,
    /// Envelopes already contained in the snapshot the client started from.
    pub skipped: usize,
    pub recoverable_errors: usize,
    pub snapshot_uploaded: Option<SeqNo>,
}

pub struct Client {
    id: ClientId,
    model: Model,
    view: View,
    pawns: PawnFactory,
    throttle: PersistenceThrottle,
    codec: CodecKind,
    status: ClientStatus,
    base: SessionSnapshot,
    journal: SessionJournal,
    /// Stale-edit rejections at or below this seq were already answered by
    /// a reload and are not reported again while replaying.
    resynced_through: SeqNo,
}

fn model_from_ticket(
    config: SessionConfig,
    registry: BehaviorRegistry,
    ticket: JoinTicket,
) -> Result<Model, SessionError> {
    match ticket.snapshot {
        Some(uploaded) => {
            let snapshot = codec_for(uploaded.codec).parse(&uploaded.blob)?;
            Model::from_snapshot(config, registry, snapshot)
        }
        None => {
            let mut model = Model::new(config, registry);
            model.bootstrap()?;
            Ok(model)
        }
    }
}

impl Client {
    /// Joins the session, starting from the channel's latest snapshot or
    /// from a fresh bootstrap when nobody has uploaded one yet.
    pub fn join(
        id: impl Into<ClientId>,
        config: SessionConfig,
        registry: BehaviorRegistry,
        pawns: PawnFactory,
        channel: &dyn OrderingChannel,
    ) -> Result<Self, SessionError> {
        let id = id.into();
        let ticket = channel.join(&id)?;
        let model = model_from_ticket(config, registry, ticket)?;
        Ok(Self::assemble(id, model, pawns))
    }

    /// Joins from a snapshot blob obtained out of band. The blob must be at
    /// least as recent as the position the channel starts this client at.
    pub fn join_late(
        id: impl Into<ClientId>,
        config: SessionConfig,
        registry: BehaviorRegistry,
        pawns: PawnFactory,
        channel: &dyn OrderingChannel,
        codec: CodecKind,
        blob: &[u8],
    ) -> Result<Self, SessionError> {
        let id = id.into();
        let snapshot = codec_for(codec).parse(blob)?;
        let ticket = channel.join(&id)?;
        let start = ticket.snapshot.as_ref().map(|s| s.seq).unwrap_or(0);
        if snapshot.seq() < start {
            return Err(SessionError::Channel(format!(
                "snapshot at seq {} predates channel position {start}",
                snapshot.seq()
            )));
        }
        let model = Model::from_snapshot(config, registry, snapshot)?;
        Ok(Self::assemble(id, model, pawns))
    }

    fn assemble(id: ClientId, model: Model, pawns: PawnFactory) -> Self {
        let mut view = View::new(id.clone(), pawns.clone());
        view.sync(&model);
        info!(
            "client {id} joined session {} at seq {}",
            model.state().session_id,
            model.seq()
        );
        Self {
            throttle: PersistenceThrottle::new(model.config().persist_period_ms),
            codec: model.config().codec,
            status: ClientStatus::Connected,
            base: model.snapshot(),
            journal: SessionJournal::new(),
            resynced_through: 0,
            id,
            model,
            view,
            pawns,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn status(&self) -> &ClientStatus {
        &self.status
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn journal(&self) -> &SessionJournal {
        &self.journal
    }

    pub fn state_hash(&self) -> Result<String, SessionError> {
        self.model.state_hash()
    }

    /// Applies everything the channel has ordered since the last pump and
    /// hands the resulting notifications to the view.
    pub fn pump(&mut self, channel: &dyn OrderingChannel) -> Result<PumpReport, SessionError> {
        let mut report = PumpReport::default();
        if self.status != ClientStatus::Connected {
            return Ok(report);
        }

        for envelope in channel.drain(&self.id)? {
            if envelope.seq <= self.model.seq() {
                report.skipped += 1;
                continue;
            }
            match self.model.apply(&envelope) {
                Ok(step) => {
                    report.applied += 1;
                    report.recoverable_errors += step.recoverable_errors.len();
                    self.view.deliver(&step.notifications, &self.model);
                    let seq = envelope.seq;
                    self.journal.push(envelope);
                    if self.view.take_resync() && seq > self.resynced_through {
                        warn!("client {} had a stale edit rejected at seq {seq}", self.id);
                        self.resynced_through = seq;
                        self.status = ClientStatus::MustResync {
                            reason: format!("document rejected a stale edit at seq {seq}"),
                        };
                        return Ok(report);
                    }
                }
                Err(err) if err.requires_resync() => {
                    error!("client {} must resync: {err}", self.id);
                    self.status = ClientStatus::MustResync {
                        reason: err.to_string(),
                    };
                    return Ok(report);
                }
                Err(err) => return Err(err),
            }
        }

        let now = self.model.time();
        let mut fire =
            report.applied > 0 && self.throttle.request(now) == ThrottleDecision::FireNow;
        if !fire {
            fire = self.throttle.poll(now);
        }
        if fire {
            report.snapshot_uploaded = Some(self.upload_snapshot(channel)?);
        }
        Ok(report)
    }

    /// Asks for a snapshot upload outside the regular schedule. Returns
    /// `true` if it happened now; otherwise it is deferred to the end of
    /// the throttle period.
    pub fn request_snapshot(
        &mut self,
        channel: &dyn OrderingChannel,
    ) -> Result<bool, SessionError> {
        match self.throttle.request(self.model.time()) {
            ThrottleDecision::FireNow => {
                self.upload_snapshot(channel)?;
                Ok(true)
            }
            ThrottleDecision::Deferred { .. } => Ok(false),
        }
    }

    fn upload_snapshot(&mut self, channel: &dyn OrderingChannel) -> Result<SeqNo, SessionError> {
        let snapshot = self.model.snapshot();
        let seq = snapshot.seq();
        let blob = codec_for(self.codec).save(&snapshot)?;
        channel.upload_snapshot(UploadedSnapshot {
            seq,
            codec: self.codec,
            blob,
        })?;
        self.journal.truncate_through(seq);
        self.base = snapshot;
        info!("client {} uploaded snapshot at seq {seq}", self.id);
        Ok(seq)
    }

    /// Sends user input through the view to the ordering channel. Nothing
    /// changes locally until the message comes back ordered.
    pub fn publish(
        &self,
        channel: &dyn OrderingChannel,
        scope: &str,
        event: &str,
        payload: JsonValue,
    ) -> Result<SeqNo, SessionError> {
        let message = self.view.publish(scope, event, payload);
        channel.send(&self.id, message)
    }

    /// Actor id of the session's shared document.
    pub fn document_actor(&self) -> Result<ActorId, SessionError> {
        let root = self
            .model
            .root()
            .and_then(|root| self.model.actor(root))
            .ok_or_else(|| SessionError::Bootstrap("session has no root actor".to_string()))?;
        SessionRootBehavior::document(&root).ok_or(SessionError::ActorNotFound {
            actor: root.id(),
        })
    }

    /// Publishes an edit of the shared document stamped with the document
    /// timezone this replica currently sees.
    pub fn edit_document(
        &self,
        channel: &dyn OrderingChannel,
        kind: EditKind,
    ) -> Result<SeqNo, SessionError> {
        let document = self.document_actor()?;
        let timezone = self
            .model
            .actor(document)
            .and_then(|actor| actor.document().map(|doc| doc.timezone()))
            .ok_or(SessionError::ActorNotFound { actor: document })?;
        let event = EditEvent::new(self.id.clone(), timezone, kind);
        self.publish(
            channel,
            &actor_scope(document),
            DOCUMENT_EDIT_EVENT,
            serde_json::to_value(event)?,
        )
    }

    pub fn leave(&mut self, channel: &dyn OrderingChannel) -> Result<SeqNo, SessionError> {
        let seq = channel.leave(&self.id)?;
        self.view.teardown();
        info!("client {} left at seq {seq}", self.id);
        Ok(seq)
    }

    /// Throws the replica away and rebuilds it from the channel's latest
    /// snapshot, or from scratch when there is none.
    pub fn reload(&mut self, channel: &dyn OrderingChannel) -> Result<(), SessionError> {
        let ticket = channel.rewind(&self.id)?;
        let model = model_from_ticket(
            self.model.config().clone(),
            self.model.registry().clone(),
            ticket,
        )?;
        self.view.teardown();
        let mut view = View::new(self.id.clone(), self.pawns.clone());
        view.sync(&model);
        info!("client {} reloaded at seq {}", self.id, model.seq());
        self.base = model.snapshot();
        self.journal = SessionJournal::new();
        self.model = model;
        self.view = view;
        self.status = ClientStatus::Connected;
        Ok(())
    }

    /// Writes the last uploaded snapshot and the envelopes applied since.
    pub fn save_to(&self, store: &SessionStore) -> Result<(), SessionError> {
        store.save(&self.base, &self.journal)
    }
}
