//! Actor records and the two ways code reaches them.
//!
//! [`ActorView`] is the read path handed to views and to other actors.
//! [`ActorContext`] is the write path, available only while a behavior
//! handler runs inside the model.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, BTreeSet};

use shared_world_text::DocumentModel;

use super::behavior::{BehaviorRegistry, MethodSelector};
use super::config::SessionConfig;
use super::error::BehaviorError;
use super::model::{ModelState, Outbox, Publication};
use super::types::{actor_scope, ActorId, LogicalTime, SeqNo};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorRecord {
    pub id: ActorId,
    pub behaviors: Vec<String>,
    #[serde(default)]
    pub parent: Option<ActorId>,
    #[serde(default)]
    pub children: BTreeSet<ActorId>,
    #[serde(default)]
    pub fields: BTreeMap<String, JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<DocumentModel>,
}

impl ActorRecord {
    fn new(id: ActorId, parent: Option<ActorId>, behaviors: &[&str]) -> Self {
        Self {
            id,
            behaviors: behaviors.iter().map(|name| name.to_string()).collect(),
            parent,
            children: BTreeSet::new(),
            fields: BTreeMap::new(),
            document: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ActorView<'a> {
    record: &'a ActorRecord,
}

impl<'a> ActorView<'a> {
    pub(crate) fn new(record: &'a ActorRecord) -> Self {
        Self { record }
    }

    pub fn id(&self) -> ActorId {
        self.record.id
    }

    pub fn parent(&self) -> Option<ActorId> {
        self.record.parent
    }

    pub fn children(&self) -> impl Iterator<Item = ActorId> + 'a {
        self.record.children.iter().copied()
    }

    pub fn behaviors(&self) -> &'a [String] {
        &self.record.behaviors
    }

    pub fn has_behavior(&self, name: &str) -> bool {
        self.record.behaviors.iter().any(|behavior| behavior == name)
    }

    pub fn get(&self, key: &str) -> Option<&'a JsonValue> {
        self.record.fields.get(key)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(JsonValue::as_f64)
    }

    pub fn get_str(&self, key: &str) -> Option<&'a str> {
        self.get(key).and_then(JsonValue::as_str)
    }

    pub fn fields(&self) -> &'a BTreeMap<String, JsonValue> {
        &self.record.fields
    }

    pub fn document(&self) -> Option<&'a DocumentModel> {
        self.record.document.as_ref()
    }
}

pub struct ActorContext<'a> {
    actor: ActorId,
    state: &'a mut ModelState,
    registry: &'a BehaviorRegistry,
    config: &'a SessionConfig,
    outbox: &'a mut Outbox,
}

impl<'a> ActorContext<'a> {
    pub(crate) fn new(
        actor: ActorId,
        state: &'a mut ModelState,
        registry: &'a BehaviorRegistry,
        config: &'a SessionConfig,
        outbox: &'a mut Outbox,
    ) -> Self {
        Self {
            actor,
            state,
            registry,
            config,
            outbox,
        }
    }

    pub fn id(&self) -> ActorId {
        self.actor
    }

    pub fn now(&self) -> LogicalTime {
        self.state.time
    }

    pub fn seq(&self) -> SeqNo {
        self.state.seq
    }

    pub fn session_id(&self) -> &str {
        &self.state.session_id
    }

    pub fn config(&self) -> &SessionConfig {
        self.config
    }

    pub fn parent(&self) -> Option<ActorId> {
        self.record().and_then(|record| record.parent)
    }

    fn record(&self) -> Option<&ActorRecord> {
        self.state.actors.get(&self.actor)
    }

    fn record_mut(&mut self) -> Option<&mut ActorRecord> {
        self.state.actors.get_mut(&self.actor)
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.record().and_then(|record| record.fields.get(key))
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(JsonValue::as_f64)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(JsonValue::as_str)
    }

    pub fn set(&mut self, key: &str, value: impl Into<JsonValue>) {
        let actor = self.actor;
        match self.record_mut() {
            Some(record) => {
                record.fields.insert(key.to_string(), value.into());
            }
            None => debug!("set {key} on destroyed actor {actor} ignored"),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<JsonValue> {
        self.record_mut()
            .and_then(|record| record.fields.remove(key))
    }

    /// Subscribes this actor's `handler` to `event` in `scope`. Subscribing
    /// the same handler twice has no effect.
    pub fn subscribe(&mut self, scope: &str, event: &str, handler: &str) -> bool {
        self.state
            .bus
            .subscribe(scope, event, self.actor, MethodSelector::parse(handler))
    }

    pub fn unsubscribe(&mut self, scope: &str, event: &str) -> usize {
        self.state.bus.unsubscribe(scope, event, self.actor)
    }

    /// Queues an event for model subscribers, delivered after the current
    /// handler returns, and for every view once the step completes.
    pub fn publish(&mut self, scope: &str, event: &str, payload: JsonValue) {
        let publication = Publication {
            scope: scope.to_string(),
            event: event.to_string(),
            payload,
            source: Some(self.actor),
        };
        self.outbox.emit(publication, true);
    }

    /// Publishes on this actor's own scope.
    pub fn say(&mut self, event: &str, payload: JsonValue) {
        let scope = actor_scope(self.actor);
        self.publish(&scope, event, payload);
    }

    /// Schedules `method` on this actor `delay` milliseconds of logical time
    /// from now. A zero delay runs on the next tick.
    pub fn future(&mut self, delay: LogicalTime, method: &str, payload: JsonValue) -> u64 {
        let now = self.state.time;
        self.state.futures.schedule(
            now,
            delay,
            self.actor,
            MethodSelector::parse(method),
            payload,
        )
    }

    pub fn random(&mut self) -> f64 {
        self.state.rng.next_f64()
    }

    pub fn random_range(&mut self, lo: u64, hi: u64) -> u64 {
        self.state.rng.range(lo, hi)
    }

    /// Creates a child of this actor and runs each behavior's `init`.
    pub fn create_actor(
        &mut self,
        behaviors: &[&str],
        options: JsonValue,
    ) -> Result<ActorId, BehaviorError> {
        spawn(
            self.state,
            self.registry,
            self.config,
            self.outbox,
            Some(self.actor),
            behaviors,
            &options,
        )
    }

    /// Destroys `actor` and all of its descendants.
    pub fn destroy(&mut self, actor: ActorId) -> Result<(), BehaviorError> {
        despawn(self.state, self.registry, self.config, self.outbox, actor)
    }

    pub fn destroy_self(&mut self) -> Result<(), BehaviorError> {
        self.destroy(self.actor)
    }

    pub fn read_actor(&self, actor: ActorId) -> Option<ActorView<'_>> {
        self.state.actors.get(&actor).map(ActorView::new)
    }

    pub fn document(&self) -> Option<&DocumentModel> {
        self.record().and_then(|record| record.document.as_ref())
    }

    /// The actor's document, created with the session's document settings
    /// on first use.
    pub fn document_mut(&mut self) -> Result<&mut DocumentModel, BehaviorError> {
        let doc_config = self.config.doc_config();
        let actor = self.actor;
        let record = self
            .record_mut()
            .ok_or_else(|| BehaviorError::recoverable(format!("actor {actor} is gone")))?;
        Ok(record
            .document
            .get_or_insert_with(|| DocumentModel::new(doc_config)))
    }
}

pub(crate) fn spawn(
    state: &mut ModelState,
    registry: &BehaviorRegistry,
    config: &SessionConfig,
    outbox: &mut Outbox,
    parent: Option<ActorId>,
    behaviors: &[&str],
    options: &JsonValue,
) -> Result<ActorId, BehaviorError> {
    if let Some(missing) = behaviors.iter().find(|name| !registry.contains(name)) {
        return Err(BehaviorError::recoverable(format!(
            "unknown behavior {missing}"
        )));
    }
    let id = state.next_actor_id;
    state.next_actor_id += 1;
    state.actors.insert(id, ActorRecord::new(id, parent, behaviors));
    if let Some(parent) = parent.and_then(|parent| state.actors.get_mut(&parent)) {
        parent.children.insert(id);
    }
    info!("actor {id} created with behaviors {behaviors:?}");

    for name in behaviors {
        let Some(behavior) = registry.get(name) else {
            continue;
        };
        let mut ctx = ActorContext::new(id, &mut *state, registry, config, &mut *outbox);
        if let Err(err) = behavior.init(&mut ctx, options) {
            warn!("init of {name} on actor {id} failed: {err}");
            despawn(state, registry, config, outbox, id)?;
            return Err(err);
        }
    }
    Ok(id)
}

pub(crate) fn despawn(
    state: &mut ModelState,
    registry: &BehaviorRegistry,
    config: &SessionConfig,
    outbox: &mut Outbox,
    actor: ActorId,
) -> Result<(), BehaviorError> {
    let Some(record) = state.actors.get(&actor) else {
        return Ok(());
    };
    let children: Vec<ActorId> = record.children.iter().copied().collect();
    let behaviors = record.behaviors.clone();

    let mut fatal = None;
    for child in children {
        if let Err(err) = despawn(state, registry, config, outbox, child) {
            fatal.get_or_insert(err);
        }
    }
    for name in behaviors.iter().rev() {
        let Some(behavior) = registry.get(name) else {
            continue;
        };
        let mut ctx = ActorContext::new(actor, &mut *state, registry, config, &mut *outbox);
        match behavior.teardown(&mut ctx) {
            Ok(()) => {}
            Err(BehaviorError::Recoverable(message)) => {
                warn!("teardown of {name} on actor {actor} failed: {message}");
            }
            Err(err) => {
                fatal.get_or_insert(err);
            }
        }
    }

    state.bus.unsubscribe_all(actor);
    state.futures.cancel_actor(actor);
    if let Some(record) = state.actors.remove(&actor) {
        if let Some(parent) = record.parent.and_then(|parent| state.actors.get_mut(&parent)) {
            parent.children.remove(&actor);
        }
    }
    if state.root == Some(actor) {
        state.root = None;
    }
    info!("actor {actor} destroyed");
    fatal.map_or(Ok(()), Err)
}
