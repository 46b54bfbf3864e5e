//! Model-side publish/subscribe routing table.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::behavior::MethodSelector;
use super::types::ActorId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub actor: ActorId,
    pub handler: MethodSelector,
}

/// Subscribers keyed by scope, then event, in registration order. Ordered
/// maps keep delivery order identical on every replica.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventBus {
    scopes: BTreeMap<String, BTreeMap<String, Vec<Subscription>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the same actor already subscribed the same handler.
    pub fn subscribe(
        &mut self,
        scope: &str,
        event: &str,
        actor: ActorId,
        handler: MethodSelector,
    ) -> bool {
        let subscribers = self
            .scopes
            .entry(scope.to_string())
            .or_default()
            .entry(event.to_string())
            .or_default();
        if subscribers
            .iter()
            .any(|sub| sub.actor == actor && sub.handler == handler)
        {
            return false;
        }
        subscribers.push(Subscription { actor, handler });
        true
    }

    /// Removes every handler `actor` registered for `scope`/`event`.
    pub fn unsubscribe(&mut self, scope: &str, event: &str, actor: ActorId) -> usize {
        let Some(events) = self.scopes.get_mut(scope) else {
            return 0;
        };
        let Some(subscribers) = events.get_mut(event) else {
            return 0;
        };
        let before = subscribers.len();
        subscribers.retain(|sub| sub.actor != actor);
        let removed = before - subscribers.len();
        if subscribers.is_empty() {
            events.remove(event);
        }
        if events.is_empty() {
            self.scopes.remove(scope);
        }
        removed
    }

    pub fn unsubscribe_all(&mut self, actor: ActorId) -> usize {
        let mut removed = 0;
        for events in self.scopes.values_mut() {
            for subscribers in events.values_mut() {
                let before = subscribers.len();
                subscribers.retain(|sub| sub.actor != actor);
                removed += before - subscribers.len();
            }
            events.retain(|_, subscribers| !subscribers.is_empty());
        }
        self.scopes.retain(|_, events| !events.is_empty());
        removed
    }

    pub fn subscribers(&self, scope: &str, event: &str) -> &[Subscription] {
        self.scopes
            .get(scope)
            .and_then(|events| events.get(event))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.scopes
            .values()
            .flat_map(BTreeMap::values)
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}
