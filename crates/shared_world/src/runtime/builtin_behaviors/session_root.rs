use log::info;
use serde_json::{json, Map, Value as JsonValue};

use shared_world_proto::{session_scope, VIEW_EXIT_EVENT, VIEW_JOIN_EVENT};

use super::super::actor::{ActorContext, ActorView};
use super::super::behavior::ActorBehavior;
use super::super::error::BehaviorError;
use super::super::types::{actor_scope, ActorId};
use super::{
    AVATAR_BEHAVIOR, AVATAR_KILLED_EVENT, SESSION_ROOT_BEHAVIOR, SPAWN_SPREAD,
    TEXT_DOCUMENT_BEHAVIOR,
};

const AVATARS_FIELD: &str = "avatars";
const DOCUMENT_FIELD: &str = "document";

/// Root of the actor tree. Owns the shared document and one avatar per
/// joined view.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionRootBehavior;

impl SessionRootBehavior {
    /// Actor id of the session's text document.
    pub fn document(root: &ActorView<'_>) -> Option<ActorId> {
        root.get(DOCUMENT_FIELD).and_then(JsonValue::as_u64)
    }

    /// Actor id of the avatar spawned for `view_id`.
    pub fn avatar_of(root: &ActorView<'_>, view_id: &str) -> Option<ActorId> {
        root.get(AVATARS_FIELD)
            .and_then(|avatars| avatars.get(view_id))
            .and_then(JsonValue::as_u64)
    }

    fn avatars(ctx: &ActorContext<'_>) -> Map<String, JsonValue> {
        ctx.get(AVATARS_FIELD)
            .and_then(JsonValue::as_object)
            .cloned()
            .unwrap_or_default()
    }

    fn spawn_avatar(ctx: &mut ActorContext<'_>, view_id: &str) -> Result<(), BehaviorError> {
        let spread = SPAWN_SPREAD * 2;
        let x = ctx.random_range(0, spread) as f64 - SPAWN_SPREAD as f64;
        let avatar = ctx.create_actor(
            &[AVATAR_BEHAVIOR],
            json!({ "view_id": view_id, "x": x, "y": 0.0, "z": 0.0 }),
        )?;
        let mut avatars = Self::avatars(ctx);
        avatars.insert(view_id.to_string(), json!(avatar));
        ctx.set(AVATARS_FIELD, JsonValue::Object(avatars));
        info!("avatar {avatar} spawned for view {view_id}");
        Ok(())
    }
}

fn view_id(payload: &JsonValue) -> Result<&str, BehaviorError> {
    payload
        .get("view_id")
        .and_then(JsonValue::as_str)
        .ok_or_else(|| BehaviorError::recoverable("payload has no view_id"))
}

impl ActorBehavior for SessionRootBehavior {
    fn name(&self) -> &str {
        SESSION_ROOT_BEHAVIOR
    }

    fn handles(&self, method: &str) -> bool {
        matches!(method, "view_joined" | "view_exited" | "avatar_killed")
    }

    fn init(&self, ctx: &mut ActorContext<'_>, _options: &JsonValue) -> Result<(), BehaviorError> {
        let session = session_scope(ctx.session_id());
        ctx.subscribe(&session, VIEW_JOIN_EVENT, "session-root.view_joined");
        ctx.subscribe(&session, VIEW_EXIT_EVENT, "session-root.view_exited");
        let own = actor_scope(ctx.id());
        ctx.subscribe(&own, AVATAR_KILLED_EVENT, "session-root.avatar_killed");

        let document = ctx.create_actor(&[TEXT_DOCUMENT_BEHAVIOR], JsonValue::Null)?;
        ctx.set(DOCUMENT_FIELD, document);
        ctx.set(AVATARS_FIELD, JsonValue::Object(Map::new()));
        Ok(())
    }

    fn handle(
        &self,
        ctx: &mut ActorContext<'_>,
        method: &str,
        payload: &JsonValue,
    ) -> Result<(), BehaviorError> {
        let view_id = view_id(payload)?;
        match method {
            "view_joined" => {
                if Self::avatars(ctx).contains_key(view_id) {
                    return Ok(());
                }
                Self::spawn_avatar(ctx, view_id)
            }
            "view_exited" => {
                let mut avatars = Self::avatars(ctx);
                let Some(avatar) = avatars.remove(view_id).and_then(|id| id.as_u64()) else {
                    return Ok(());
                };
                ctx.set(AVATARS_FIELD, JsonValue::Object(avatars));
                ctx.destroy(avatar)?;
                info!("avatar {avatar} removed with view {view_id}");
                Ok(())
            }
            "avatar_killed" => {
                let mut avatars = Self::avatars(ctx);
                avatars.remove(view_id);
                ctx.set(AVATARS_FIELD, JsonValue::Object(avatars));
                Self::spawn_avatar(ctx, view_id)
            }
            other => Err(BehaviorError::recoverable(format!(
                "session-root has no method {other}"
            ))),
        }
    }
}
