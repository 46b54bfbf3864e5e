//! Behaviors are statically compiled plugins selected by name.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::actor::ActorContext;
use super::error::BehaviorError;

/// Names a handler: `"avatar.move"` targets one behavior, a bare `"move"`
/// goes to the first behavior on the actor that handles it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct MethodSelector {
    pub behavior: Option<String>,
    pub method: String,
}

impl MethodSelector {
    pub fn parse(text: &str) -> Self {
        match text.rsplit_once('.') {
            Some((behavior, method)) if !behavior.is_empty() && !method.is_empty() => Self {
                behavior: Some(behavior.to_string()),
                method: method.to_string(),
            },
            _ => Self {
                behavior: None,
                method: text.to_string(),
            },
        }
    }

    pub fn qualified(behavior: &str, method: &str) -> Self {
        Self {
            behavior: Some(behavior.to_string()),
            method: method.to_string(),
        }
    }
}

impl From<&str> for MethodSelector {
    fn from(text: &str) -> Self {
        Self::parse(text)
    }
}

impl From<String> for MethodSelector {
    fn from(text: String) -> Self {
        Self::parse(&text)
    }
}

impl From<MethodSelector> for String {
    fn from(selector: MethodSelector) -> Self {
        selector.to_string()
    }
}

impl fmt::Display for MethodSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.behavior {
            Some(behavior) => write!(f, "{behavior}.{}", self.method),
            None => f.write_str(&self.method),
        }
    }
}

/// Model-side code attached to actors.
///
/// Implementations must be deterministic: all state lives in the actor's
/// fields, randomness comes from [`ActorContext::random`] and time from
/// [`ActorContext::now`].
pub trait ActorBehavior: Send + Sync {
    fn name(&self) -> &str;

    /// Bumped whenever the behavior's handling of existing state changes.
    fn version(&self) -> u32 {
        1
    }

    fn handles(&self, method: &str) -> bool;

    fn init(&self, _ctx: &mut ActorContext<'_>, _options: &JsonValue) -> Result<(), BehaviorError> {
        Ok(())
    }

    fn handle(
        &self,
        ctx: &mut ActorContext<'_>,
        method: &str,
        payload: &JsonValue,
    ) -> Result<(), BehaviorError>;

    fn teardown(&self, _ctx: &mut ActorContext<'_>) -> Result<(), BehaviorError> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BehaviorDescriptor {
    pub name: String,
    pub version: u32,
}

#[derive(Clone, Default)]
pub struct BehaviorRegistry {
    behaviors: BTreeMap<String, Arc<dyn ActorBehavior>>,
}

impl fmt::Debug for BehaviorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BehaviorRegistry")
            .field("behaviors", &self.behaviors.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl BehaviorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `behavior`, replacing any behavior with the same name.
    pub fn install(&mut self, behavior: impl ActorBehavior + 'static) -> &mut Self {
        self.behaviors
            .insert(behavior.name().to_string(), Arc::new(behavior));
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ActorBehavior>> {
        self.behaviors.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.behaviors.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.behaviors.keys().map(String::as_str)
    }

    pub fn descriptors(&self) -> Vec<BehaviorDescriptor> {
        self.behaviors
            .values()
            .map(|behavior| BehaviorDescriptor {
                name: behavior.name().to_string(),
                version: behavior.version(),
            })
            .collect()
    }

    /// Picks the behavior that runs `selector` on an actor carrying
    /// `installed`, in installation order.
    pub fn resolve(
        &self,
        installed: &[String],
        selector: &MethodSelector,
    ) -> Option<Arc<dyn ActorBehavior>> {
        match &selector.behavior {
            Some(name) => installed
                .iter()
                .any(|candidate| candidate == name)
                .then(|| self.get(name))
                .flatten(),
            None => installed
                .iter()
                .filter_map(|name| self.get(name))
                .find(|behavior| behavior.handles(&selector.method)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str, &'static [&'static str], u32);

    impl ActorBehavior for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn version(&self) -> u32 {
            self.2
        }

        fn handles(&self, method: &str) -> bool {
            self.1.contains(&method)
        }

        fn handle(
            &self,
            _ctx: &mut ActorContext<'_>,
            _method: &str,
            _payload: &JsonValue,
        ) -> Result<(), BehaviorError> {
            Ok(())
        }
    }

    #[test]
    fn selector_parses_qualified_and_bare_names() {
        let qualified = MethodSelector::parse("avatar.move");
        assert_eq!(qualified.behavior.as_deref(), Some("avatar"));
        assert_eq!(qualified.method, "move");
        assert_eq!(qualified.to_string(), "avatar.move");

        let bare = MethodSelector::parse("move");
        assert_eq!(bare.behavior, None);
        assert_eq!(MethodSelector::parse(".move").behavior, None);

        let json = serde_json::to_string(&qualified).expect("serialize");
        assert_eq!(json, "\"avatar.move\"");
    }

    #[test]
    fn install_replaces_same_name() {
        let mut registry = BehaviorRegistry::new();
        registry.install(Named("a", &["x"], 1));
        registry.install(Named("a", &["x"], 2));
        assert_eq!(
            registry.descriptors(),
            vec![BehaviorDescriptor {
                name: "a".to_string(),
                version: 2
            }]
        );
    }

    #[test]
    fn resolve_prefers_installation_order() {
        let mut registry = BehaviorRegistry::new();
        registry
            .install(Named("first", &["shared"], 1))
            .install(Named("second", &["shared", "only"], 1));
        let installed = vec!["second".to_string(), "first".to_string()];

        let picked = registry
            .resolve(&installed, &MethodSelector::parse("shared"))
            .expect("resolved");
        assert_eq!(picked.name(), "second");

        let picked = registry
            .resolve(&installed, &MethodSelector::parse("first.shared"))
            .expect("resolved");
        assert_eq!(picked.name(), "first");

        assert!(registry
            .resolve(&["first".to_string()], &MethodSelector::parse("second.only"))
            .is_none());
        assert!(registry
            .resolve(&installed, &MethodSelector::parse("missing"))
            .is_none());
    }
}
