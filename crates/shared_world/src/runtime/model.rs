//! The model root: replicated state plus the code that advances it.

mod dispatch;
mod step;

use log::{error, info};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::panic::{self, AssertUnwindSafe};

use super::actor::{spawn, ActorRecord, ActorView};
use super::behavior::BehaviorRegistry;
use super::bus::EventBus;
use super::config::SessionConfig;
use super::error::SessionError;
use super::rng::SessionRng;
use super::scheduler::FutureQueue;
use super::snapshot::{SessionSnapshot, SNAPSHOT_FORMAT_VERSION};
use super::types::{ActorId, ClientId, LogicalTime, SeqNo, ViewNotification};
use super::util::hash_json;

pub use step::StepReport;

/// Everything every replica must agree on. Only ordered maps and sets, so
/// serialization and iteration order are the same everywhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelState {
    pub session_id: String,
    pub seq: SeqNo,
    pub time: LogicalTime,
    pub root: Option<ActorId>,
    pub next_actor_id: ActorId,
    pub actors: BTreeMap<ActorId, ActorRecord>,
    pub bus: EventBus,
    pub futures: FutureQueue,
    pub rng: SessionRng,
    #[serde(default)]
    pub views: BTreeSet<ClientId>,
}

impl ModelState {
    pub fn new(session_id: &str, rng_seed: u64) -> Self {
        Self {
            session_id: session_id.to_string(),
            seq: 0,
            time: 0,
            root: None,
            next_actor_id: 1,
            actors: BTreeMap::new(),
            bus: EventBus::new(),
            futures: FutureQueue::new(),
            rng: SessionRng::new(rng_seed),
            views: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Publication {
    pub scope: String,
    pub event: String,
    pub payload: JsonValue,
    pub source: Option<ActorId>,
}

/// Work produced by handlers during one step: publications still to be
/// delivered inside the model and notifications for the views.
#[derive(Debug, Default)]
pub(crate) struct Outbox {
    pub cascade: VecDeque<Publication>,
    pub notifications: Vec<ViewNotification>,
}

impl Outbox {
    pub fn emit(&mut self, publication: Publication, notify_views: bool) {
        if notify_views {
            self.notifications.push(ViewNotification {
                scope: publication.scope.clone(),
                event: publication.event.clone(),
                payload: publication.payload.clone(),
                source: publication.source,
            });
        }
        self.cascade.push_back(publication);
    }

    fn clear(&mut self) {
        self.cascade.clear();
        self.notifications.clear();
    }
}

#[derive(Debug)]
pub struct Model {
    config: SessionConfig,
    registry: BehaviorRegistry,
    state: ModelState,
    outbox: Outbox,
    halted: Option<String>,
}

impl Model {
    pub fn new(config: SessionConfig, registry: BehaviorRegistry) -> Self {
        let state = ModelState::new(&config.session_id, config.rng_seed);
        Self {
            config,
            registry,
            state,
            outbox: Outbox::default(),
            halted: None,
        }
    }

    /// Creates the root actor from `config.root_behaviors`. Every replica
    /// that does not start from a snapshot runs this exactly once, before
    /// the first envelope.
    pub fn bootstrap(&mut self) -> Result<ActorId, SessionError> {
        if let Some(root) = self.state.root {
            return Ok(root);
        }
        let owned = self.config.root_behaviors.clone();
        let names: Vec<&str> = owned.iter().map(String::as_str).collect();
        if let Some(missing) = names.iter().find(|name| !self.registry.contains(name)) {
            return Err(SessionError::BehaviorNotFound {
                name: missing.to_string(),
            });
        }

        let Self {
            config,
            registry,
            state,
            outbox,
            ..
        } = self;
        let created = panic::catch_unwind(AssertUnwindSafe(|| {
            spawn(state, registry, config, outbox, None, &names, &json!({}))
        }));
        let root = match created {
            Ok(Ok(root)) => root,
            Ok(Err(err)) => return Err(SessionError::Bootstrap(err.to_string())),
            Err(panic) => return Err(SessionError::Bootstrap(dispatch::panic_message(&panic))),
        };
        self.state.root = Some(root);

        let mut report = StepReport::new(0, self.state.time);
        self.drain_cascade(&mut report)?;
        self.outbox.notifications.clear();
        info!(
            "session {} bootstrapped with root actor {root}",
            self.state.session_id
        );
        Ok(root)
    }

    pub fn from_snapshot(
        config: SessionConfig,
        registry: BehaviorRegistry,
        snapshot: SessionSnapshot,
    ) -> Result<Self, SessionError> {
        if snapshot.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(SessionError::Persistence(format!(
                "unsupported snapshot format {}",
                snapshot.format_version
            )));
        }
        for descriptor in &snapshot.behaviors {
            let behavior =
                registry
                    .get(&descriptor.name)
                    .ok_or_else(|| SessionError::BehaviorNotFound {
                        name: descriptor.name.clone(),
                    })?;
            if behavior.version() != descriptor.version {
                return Err(SessionError::BehaviorVersionMismatch {
                    name: descriptor.name.clone(),
                    expected: descriptor.version,
                    found: behavior.version(),
                });
            }
        }
        info!(
            "session {} restored at seq {} with {} actors",
            snapshot.state.session_id,
            snapshot.state.seq,
            snapshot.state.actors.len()
        );
        Ok(Self {
            config,
            registry,
            state: snapshot.state,
            outbox: Outbox::default(),
            halted: None,
        })
    }

    /// Full copy of replicated state plus the behaviors it was produced
    /// with.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            format_version: SNAPSHOT_FORMAT_VERSION,
            behaviors: self.registry.descriptors(),
            state: self.state.clone(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn registry(&self) -> &BehaviorRegistry {
        &self.registry
    }

    pub fn state(&self) -> &ModelState {
        &self.state
    }

    pub fn seq(&self) -> SeqNo {
        self.state.seq
    }

    pub fn time(&self) -> LogicalTime {
        self.state.time
    }

    pub fn root(&self) -> Option<ActorId> {
        self.state.root
    }

    pub fn actor(&self, id: ActorId) -> Option<ActorView<'_>> {
        self.state.actors.get(&id).map(ActorView::new)
    }

    pub fn actors(&self) -> impl Iterator<Item = ActorView<'_>> {
        self.state.actors.values().map(ActorView::new)
    }

    pub fn views(&self) -> &BTreeSet<ClientId> {
        &self.state.views
    }

    pub fn is_halted(&self) -> bool {
        self.halted.is_some()
    }

    pub fn halt_reason(&self) -> Option<&str> {
        self.halted.as_deref()
    }

    /// SHA-256 over the canonical JSON of the replicated state.
    pub fn state_hash(&self) -> Result<String, SessionError> {
        hash_json(&self.state)
    }

    fn halt(&mut self, reason: String) -> SessionError {
        error!("model diverged at seq {}: {reason}", self.state.seq);
        self.outbox.clear();
        self.halted = Some(reason.clone());
        SessionError::Diverged {
            seq: self.state.seq,
            reason,
        }
    }
}
