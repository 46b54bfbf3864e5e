use serde_json::{json, Value as JsonValue};

use super::super::actor::ActorContext;
use super::super::behavior::ActorBehavior;
use super::super::error::BehaviorError;
use super::super::types::actor_scope;
use super::{
    AVATAR_BEHAVIOR, AVATAR_DEATH_EVENT, AVATAR_FALL_PERIOD_MS, AVATAR_KILLED_EVENT,
    AVATAR_MOVED_EVENT, AVATAR_MOVE_EVENT, GRAVITY, PLATFORM_HALF_EXTENT,
};

/// A participant's body: moves on request and falls off the platform edge.
#[derive(Debug, Clone, Copy, Default)]
pub struct AvatarBehavior;

fn number(payload: &JsonValue, key: &str) -> f64 {
    payload.get(key).and_then(JsonValue::as_f64).unwrap_or(0.0)
}

fn on_platform(x: f64, z: f64) -> bool {
    x.abs() <= PLATFORM_HALF_EXTENT && z.abs() <= PLATFORM_HALF_EXTENT
}

impl AvatarBehavior {
    fn position(ctx: &ActorContext<'_>) -> (f64, f64, f64) {
        (
            ctx.get_f64("x").unwrap_or(0.0),
            ctx.get_f64("y").unwrap_or(0.0),
            ctx.get_f64("z").unwrap_or(0.0),
        )
    }

    fn announce(ctx: &mut ActorContext<'_>) {
        let (x, y, z) = Self::position(ctx);
        ctx.say(AVATAR_MOVED_EVENT, json!({ "x": x, "y": y, "z": z }));
    }

    /// One gravity step. Grounded avatars stay put; anything airborne
    /// accelerates, lands when it crosses the platform top, or dies below
    /// the kill plane.
    fn fall(ctx: &mut ActorContext<'_>) -> Result<(), BehaviorError> {
        let (x, y, z) = Self::position(ctx);
        let vy = ctx.get_f64("vy").unwrap_or(0.0);
        let supported = on_platform(x, z);
        if !(supported && y == 0.0 && vy <= 0.0) {
            let dt = AVATAR_FALL_PERIOD_MS as f64 / 1000.0;
            let mut next_vy = vy + GRAVITY * dt;
            let mut next_y = y + next_vy * dt;
            if supported && y >= 0.0 && next_y <= 0.0 {
                next_y = 0.0;
                next_vy = 0.0;
            }
            ctx.set("y", next_y);
            ctx.set("vy", next_vy);
            if next_y < ctx.config().kill_plane_y {
                return Self::die(ctx);
            }
            Self::announce(ctx);
        }
        ctx.future(AVATAR_FALL_PERIOD_MS, "avatar.fall", JsonValue::Null);
        Ok(())
    }

    fn die(ctx: &mut ActorContext<'_>) -> Result<(), BehaviorError> {
        let id = ctx.id();
        let view_id = ctx.get_str("view_id").unwrap_or_default().to_string();
        ctx.say(AVATAR_DEATH_EVENT, json!({ "view_id": view_id }));
        if let Some(parent) = ctx.parent() {
            ctx.publish(
                &actor_scope(parent),
                AVATAR_KILLED_EVENT,
                json!({ "view_id": view_id, "actor": id }),
            );
        }
        ctx.destroy_self()
    }
}

impl ActorBehavior for AvatarBehavior {
    fn name(&self) -> &str {
        AVATAR_BEHAVIOR
    }

    fn handles(&self, method: &str) -> bool {
        matches!(method, "move" | "fall")
    }

    fn init(&self, ctx: &mut ActorContext<'_>, options: &JsonValue) -> Result<(), BehaviorError> {
        ctx.set("x", number(options, "x"));
        ctx.set("y", number(options, "y"));
        ctx.set("z", number(options, "z"));
        ctx.set("vy", 0.0);
        if let Some(view_id) = options.get("view_id").and_then(JsonValue::as_str) {
            ctx.set("view_id", view_id);
        }
        let own = actor_scope(ctx.id());
        ctx.subscribe(&own, AVATAR_MOVE_EVENT, "avatar.move");
        ctx.future(AVATAR_FALL_PERIOD_MS, "avatar.fall", JsonValue::Null);
        Ok(())
    }

    fn handle(
        &self,
        ctx: &mut ActorContext<'_>,
        method: &str,
        payload: &JsonValue,
    ) -> Result<(), BehaviorError> {
        match method {
            "move" => {
                let (x, y, z) = Self::position(ctx);
                let (dx, dz) = (number(payload, "dx"), number(payload, "dz"));
                if !dx.is_finite() || !dz.is_finite() {
                    return Err(BehaviorError::recoverable("move offsets must be finite"));
                }
                ctx.set("x", x + dx);
                ctx.set("z", z + dz);
                if let Some(jump) = payload.get("jump").and_then(JsonValue::as_f64) {
                    if y == 0.0 && jump.is_finite() && jump > 0.0 {
                        ctx.set("vy", jump);
                    }
                }
                Self::announce(ctx);
                Ok(())
            }
            "fall" => Self::fall(ctx),
            other => Err(BehaviorError::recoverable(format!(
                "avatar has no method {other}"
            ))),
        }
    }
}
