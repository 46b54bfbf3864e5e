//! Tests for the runtime module.

use serde_json::{json, Value as JsonValue};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use shared_world_proto::{ReflectedMessage, ReflectorEnvelope};

use super::*;

pub(super) const TEST_SCOPE: &str = "test";
const RECORDER: &str = "recorder";
const RECORDER_METHODS: [&str; 10] = [
    "record", "later", "loop", "fail", "fatal", "panic", "spawn", "destroy", "roll", "ping",
];

/// Test behavior driven by events named after its methods. The root listens
/// on [`TEST_SCOPE`]; children it spawns listen on their own actor scope.
pub(super) struct Recorder;

impl Recorder {
    fn append(ctx: &mut ActorContext<'_>, field: &str, value: JsonValue) {
        let mut items = ctx
            .get(field)
            .and_then(JsonValue::as_array)
            .cloned()
            .unwrap_or_default();
        items.push(value);
        ctx.set(field, JsonValue::Array(items));
    }
}

impl ActorBehavior for Recorder {
    fn name(&self) -> &str {
        RECORDER
    }

    fn handles(&self, method: &str) -> bool {
        RECORDER_METHODS.contains(&method)
    }

    fn init(&self, ctx: &mut ActorContext<'_>, options: &JsonValue) -> Result<(), BehaviorError> {
        let listen = options.get("listen").and_then(JsonValue::as_bool).unwrap_or(true);
        let scope = if listen {
            TEST_SCOPE.to_string()
        } else {
            actor_scope(ctx.id())
        };
        for method in RECORDER_METHODS {
            let handler = if method == "ping" { "record" } else { method };
            ctx.subscribe(&scope, method, &format!("{RECORDER}.{handler}"));
        }
        Ok(())
    }

    fn handle(
        &self,
        ctx: &mut ActorContext<'_>,
        method: &str,
        payload: &JsonValue,
    ) -> Result<(), BehaviorError> {
        match method {
            "record" => {
                let tag = payload.get("tag").cloned().unwrap_or(JsonValue::Null);
                Self::append(ctx, "log", tag);
            }
            "later" => {
                let delay = payload.get("delay").and_then(JsonValue::as_u64).unwrap_or(0);
                let tag = payload.get("tag").cloned().unwrap_or(JsonValue::Null);
                ctx.future(delay, "recorder.record", json!({ "tag": tag }));
            }
            "loop" => {
                let loops = ctx.get("loops").and_then(JsonValue::as_u64).unwrap_or(0);
                ctx.set("loops", loops + 1);
                ctx.publish(TEST_SCOPE, "loop", payload.clone());
            }
            "fail" => return Err(BehaviorError::recoverable("asked to fail")),
            "fatal" => return Err(BehaviorError::fatal("asked to stop")),
            "panic" => panic!("asked to panic"),
            "spawn" => {
                let child = ctx.create_actor(&[RECORDER], json!({ "listen": false }))?;
                Self::append(ctx, "spawned", json!(child));
            }
            "destroy" => {
                let actor = payload
                    .get("actor")
                    .and_then(JsonValue::as_u64)
                    .ok_or_else(|| BehaviorError::recoverable("missing actor"))?;
                ctx.destroy(actor)?;
            }
            "roll" => {
                let roll = ctx.random_range(0, 1_000);
                Self::append(ctx, "rolls", json!(roll));
            }
            other => {
                return Err(BehaviorError::recoverable(format!("unexpected {other}")));
            }
        }
        Ok(())
    }

    fn teardown(&self, ctx: &mut ActorContext<'_>) -> Result<(), BehaviorError> {
        let id = ctx.id();
        ctx.publish(TEST_SCOPE, "torn", json!({ "actor": id }));
        Ok(())
    }
}

pub(super) fn recorder_registry() -> BehaviorRegistry {
    let mut registry = BehaviorRegistry::new();
    registry.install(Recorder);
    registry
}

pub(super) fn recorder_config() -> SessionConfig {
    SessionConfig {
        root_behaviors: vec![RECORDER.to_string()],
        ..SessionConfig::default()
    }
}

pub(super) fn recorder_model(config: SessionConfig) -> Model {
    let mut model = Model::new(config, recorder_registry());
    model.bootstrap().expect("bootstrap recorder root");
    model
}

pub(super) fn envelope(
    seq: SeqNo,
    time: LogicalTime,
    message: ReflectedMessage,
) -> ReflectorEnvelope {
    ReflectorEnvelope {
        seq,
        time,
        sender: "tester".to_string(),
        message,
    }
}

/// An envelope publishing `event` on the test scope.
pub(super) fn test_event(
    seq: SeqNo,
    time: LogicalTime,
    event: &str,
    payload: JsonValue,
) -> ReflectorEnvelope {
    envelope(seq, time, ReflectedMessage::publish(TEST_SCOPE, event, payload))
}

pub(super) fn tick(seq: SeqNo, time: LogicalTime) -> ReflectorEnvelope {
    envelope(seq, time, ReflectedMessage::Tick)
}

pub(super) fn field_list(model: &Model, actor: ActorId, field: &str) -> Vec<JsonValue> {
    model
        .actor(actor)
        .and_then(|actor| actor.get(field))
        .and_then(JsonValue::as_array)
        .cloned()
        .unwrap_or_default()
}

pub(super) fn builtin_model(config: SessionConfig) -> Model {
    let mut model = Model::new(config, builtin_behaviors());
    model.bootstrap().expect("bootstrap session root");
    model
}

pub(super) fn view_join(seq: SeqNo, time: LogicalTime, view_id: &str) -> ReflectorEnvelope {
    envelope(
        seq,
        time,
        ReflectedMessage::ViewJoin {
            view_id: view_id.to_string(),
        },
    )
}

pub(super) fn view_exit(seq: SeqNo, time: LogicalTime, view_id: &str) -> ReflectorEnvelope {
    envelope(
        seq,
        time,
        ReflectedMessage::ViewExit {
            view_id: view_id.to_string(),
        },
    )
}

pub(super) fn temp_dir(prefix: &str) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("duration")
        .as_nanos();
    std::env::temp_dir().join(format!("shared-world-{prefix}-{unique}"))
}

mod model;
