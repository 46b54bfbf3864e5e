//! Client-local presentation of the model.
//!
//! A [`View`] never writes to the model. It reads actors through
//! [`ActorView`] and turns user input into messages for the ordering
//! channel; pawns may keep any local, non-replicated state they like.

use log::debug;
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, HashMap};

use shared_world_proto::ReflectedMessage;

use super::actor::ActorView;
use super::model::Model;
use super::types::{scope_actor, ActorId, ClientId, ViewNotification};

/// View-side counterpart of an actor.
pub trait Pawn: Send {
    fn actor(&self) -> ActorId;

    /// A notification published on the actor's scope.
    fn handle(
        &mut self,
        _notification: &ViewNotification,
        _actor: &ActorView<'_>,
        _smoothing: &mut SmoothingCache,
    ) {
    }

    /// Called after every delivered batch with the actor's current state.
    fn update(&mut self, _actor: &ActorView<'_>, _smoothing: &mut SmoothingCache) {}

    fn teardown(&mut self, smoothing: &mut SmoothingCache) {
        smoothing.remove(self.actor());
    }

    /// Reports, once, that the model rejected this view's input as stale.
    fn take_resync(&mut self) -> bool {
        false
    }

    /// Local state exposed for inspection.
    fn summary(&self) -> JsonValue {
        JsonValue::Null
    }
}

pub type PawnConstructor = fn(&ActorView<'_>, &str) -> Box<dyn Pawn>;

/// Pawn constructors keyed by behavior name.
#[derive(Clone, Default)]
pub struct PawnFactory {
    constructors: BTreeMap<String, PawnConstructor>,
}

impl PawnFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, behavior: &str, constructor: PawnConstructor) -> &mut Self {
        self.constructors.insert(behavior.to_string(), constructor);
        self
    }

    pub fn behaviors(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    /// Builds a pawn from the first of the actor's behaviors that has one.
    pub fn build(&self, actor: &ActorView<'_>, view_id: &str) -> Option<Box<dyn Pawn>> {
        actor
            .behaviors()
            .iter()
            .find_map(|behavior| self.constructors.get(behavior))
            .map(|constructor| constructor(actor, view_id))
    }
}

/// Per-actor interpolation state. Entries are dropped with their pawn.
#[derive(Debug, Clone, Default)]
pub struct SmoothingCache {
    positions: HashMap<ActorId, [f64; 3]>,
}

impl SmoothingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the cached position `factor` of the way towards `target`; the
    /// first sample snaps.
    pub fn smooth(&mut self, actor: ActorId, target: [f64; 3], factor: f64) -> [f64; 3] {
        let entry = self.positions.entry(actor).or_insert(target);
        for axis in 0..3 {
            entry[axis] += (target[axis] - entry[axis]) * factor;
        }
        *entry
    }

    pub fn get(&self, actor: ActorId) -> Option<[f64; 3]> {
        self.positions.get(&actor).copied()
    }

    pub fn remove(&mut self, actor: ActorId) -> bool {
        self.positions.remove(&actor).is_some()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

pub struct View {
    id: ClientId,
    factory: PawnFactory,
    pawns: BTreeMap<ActorId, Box<dyn Pawn>>,
    smoothing: SmoothingCache,
}

impl View {
    pub fn new(id: impl Into<ClientId>, factory: PawnFactory) -> Self {
        Self {
            id: id.into(),
            factory,
            pawns: BTreeMap::new(),
            smoothing: SmoothingCache::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Creates pawns for new actors, tears down pawns whose actor is gone,
    /// then lets every pawn read its actor.
    pub fn sync(&mut self, model: &Model) {
        let gone: Vec<ActorId> = self
            .pawns
            .keys()
            .copied()
            .filter(|id| model.actor(*id).is_none())
            .collect();
        for id in gone {
            if let Some(mut pawn) = self.pawns.remove(&id) {
                pawn.teardown(&mut self.smoothing);
                self.smoothing.remove(id);
                debug!("view {} dropped pawn for actor {id}", self.id);
            }
        }

        for actor in model.actors() {
            if !self.pawns.contains_key(&actor.id()) {
                if let Some(pawn) = self.factory.build(&actor, &self.id) {
                    debug!("view {} built pawn for actor {}", self.id, actor.id());
                    self.pawns.insert(actor.id(), pawn);
                }
            }
        }

        for (id, pawn) in self.pawns.iter_mut() {
            if let Some(actor) = model.actor(*id) {
                pawn.update(&actor, &mut self.smoothing);
            }
        }
    }

    /// Routes notifications from one step to the pawns of their actors.
    pub fn deliver(&mut self, notifications: &[ViewNotification], model: &Model) {
        self.sync(model);
        for notification in notifications {
            let Some(id) = scope_actor(&notification.scope) else {
                continue;
            };
            let (Some(pawn), Some(actor)) = (self.pawns.get_mut(&id), model.actor(id)) else {
                continue;
            };
            pawn.handle(notification, &actor, &mut self.smoothing);
        }
    }

    /// User input leaves the view only as a message for the ordering
    /// channel.
    pub fn publish(&self, scope: &str, event: &str, payload: JsonValue) -> ReflectedMessage {
        ReflectedMessage::publish(scope, event, payload)
    }

    pub fn pawn(&self, actor: ActorId) -> Option<&dyn Pawn> {
        self.pawns.get(&actor).map(|pawn| pawn.as_ref())
    }

    /// Collects and clears the resync requests of every pawn.
    pub fn take_resync(&mut self) -> bool {
        self.pawns
            .values_mut()
            .fold(false, |requested, pawn| pawn.take_resync() || requested)
    }

    pub fn pawn_count(&self) -> usize {
        self.pawns.len()
    }

    pub fn smoothing(&self) -> &SmoothingCache {
        &self.smoothing
    }

    /// Tears every pawn down at session end.
    pub fn teardown(&mut self) {
        for (_, mut pawn) in std::mem::take(&mut self.pawns) {
            pawn.teardown(&mut self.smoothing);
        }
        self.smoothing = SmoothingCache::new();
    }
}
