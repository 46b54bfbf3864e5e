use log::debug;
use serde_json::json;

use shared_world_proto::{
    session_scope, ReflectedMessage, ReflectorEnvelope, VIEW_EXIT_EVENT, VIEW_JOIN_EVENT,
};

use super::super::error::SessionError;
use super::super::types::{LogicalTime, SeqNo, ViewNotification};
use super::{Model, Publication};

/// What one envelope did to the model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepReport {
    pub seq: SeqNo,
    pub time: LogicalTime,
    pub futures_run: usize,
    pub handlers_run: usize,
    pub publications_delivered: usize,
    pub dropped_publications: usize,
    pub recoverable_errors: Vec<String>,
    pub notifications: Vec<ViewNotification>,
}

impl StepReport {
    pub fn new(seq: SeqNo, time: LogicalTime) -> Self {
        Self {
            seq,
            time,
            ..Self::default()
        }
    }
}

impl Model {
    // ---------------------------------------------------------------------
    // Envelope processing
    // ---------------------------------------------------------------------

    /// Advances the model by one ordered envelope: future messages due up to
    /// the envelope's time run first, then the message itself, then the
    /// cascade of publications both produced.
    pub fn apply(&mut self, envelope: &ReflectorEnvelope) -> Result<StepReport, SessionError> {
        if self.halted.is_some() {
            return Err(SessionError::Halted);
        }
        let expected = self.state.seq + 1;
        if envelope.seq != expected {
            return Err(SessionError::SequenceGap {
                expected,
                found: envelope.seq,
            });
        }

        let time = envelope.time.max(self.state.time);
        self.state.seq = envelope.seq;
        let mut report = StepReport::new(envelope.seq, time);
        self.run_futures(time, &mut report)?;
        self.state.time = time;

        debug!(
            "seq {} at {time}: {} from {}",
            envelope.seq,
            envelope.message.kind(),
            envelope.sender
        );
        match &envelope.message {
            ReflectedMessage::Publish {
                scope,
                event,
                payload,
            } => {
                let publication = Publication {
                    scope: scope.clone(),
                    event: event.clone(),
                    payload: payload.clone(),
                    source: None,
                };
                self.outbox.emit(publication, false);
            }
            ReflectedMessage::ViewJoin { view_id } => {
                self.state.views.insert(view_id.clone());
                self.emit_system(VIEW_JOIN_EVENT, view_id);
            }
            ReflectedMessage::ViewExit { view_id } => {
                self.state.views.remove(view_id);
                self.emit_system(VIEW_EXIT_EVENT, view_id);
            }
            ReflectedMessage::Tick => {}
        }
        self.drain_cascade(&mut report)?;
        report.notifications = std::mem::take(&mut self.outbox.notifications);
        Ok(report)
    }

    fn emit_system(&mut self, event: &str, view_id: &str) {
        let publication = Publication {
            scope: session_scope(&self.state.session_id),
            event: event.to_string(),
            payload: json!({ "view_id": view_id }),
            source: None,
        };
        self.outbox.emit(publication, true);
    }
}
