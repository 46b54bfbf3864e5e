//! Runtime module - the replicated session engine.
//!
//! This module contains the [`Model`] and all supporting types for:
//! - Actor state, behaviors and the event bus
//! - Logical-time future messages
//! - Client views and pawns
//! - The ordering channel and late-join catch-up
//! - Snapshots, persistence and its throttle

mod actor;
mod behavior;
mod builtin_behaviors;
mod bus;
mod client;
mod config;
mod error;
mod model;
mod pawns;
mod persistence;
mod reflector;
mod rng;
mod scheduler;
mod snapshot;
mod throttle;
mod types;
mod util;
mod view;

#[cfg(test)]
mod tests;

// Types
pub use types::{actor_scope, scope_actor, ActorId, ClientId, LogicalTime, SeqNo, ViewNotification};

// Actors and behaviors
pub use actor::{ActorContext, ActorRecord, ActorView};
pub use behavior::{ActorBehavior, BehaviorDescriptor, BehaviorRegistry, MethodSelector};
pub use builtin_behaviors::{
    builtin_behaviors, AvatarBehavior, SessionRootBehavior, TextDocumentBehavior,
    AVATAR_BEHAVIOR, AVATAR_DEATH_EVENT, AVATAR_FALL_PERIOD_MS, AVATAR_KILLED_EVENT,
    AVATAR_MOVED_EVENT, AVATAR_MOVE_EVENT, DOCUMENT_CHANGED_EVENT, DOCUMENT_EDIT_EVENT,
    DOCUMENT_RESYNC_EVENT, GRAVITY, PLATFORM_HALF_EXTENT, SESSION_ROOT_BEHAVIOR, SPAWN_SPREAD,
    TEXT_DOCUMENT_BEHAVIOR,
};

// Bus and scheduling
pub use bus::{EventBus, Subscription};
pub use rng::SessionRng;
pub use scheduler::{FutureMessage, FutureQueue, FutureQueueState, MIN_FUTURE_DELAY_MS};

// Model
pub use model::{Model, ModelState, StepReport};

// View
pub use pawns::{builtin_pawns, AvatarPawn, TextPawn, AVATAR_SMOOTHING, DEFAULT_TEXT_WIDTH};
pub use view::{Pawn, PawnConstructor, PawnFactory, SmoothingCache, View};

// Ordering channel and clients
pub use client::{Client, ClientStatus, PumpReport};
pub use reflector::{
    InMemoryReflector, JoinTicket, OrderingChannel, UploadedSnapshot, REFLECTOR_SENDER,
};

// Snapshots and persistence
pub use persistence::{codec_for, CborCodec, JsonCodec, PersistenceCodec, SessionStore};
pub use snapshot::{SessionJournal, SessionSnapshot, SNAPSHOT_FORMAT_VERSION};
pub use throttle::{PersistenceThrottle, ThrottleDecision};

// Config
pub use config::{
    CodecKind, SessionConfig, DEFAULT_CONFIG_FILE_NAME, DEFAULT_KILL_PLANE_Y,
    DEFAULT_MAX_CASCADE_EVENTS, DEFAULT_PERSIST_PERIOD_MS, DEFAULT_RNG_SEED,
    DEFAULT_ROOT_BEHAVIOR, DEFAULT_SESSION_ID, ENV_CODEC, ENV_DOC_CUTOFF_TICKS,
    ENV_DOC_SNAPSHOT_EVERY, ENV_KILL_PLANE_Y, ENV_MAX_CASCADE_EVENTS, ENV_PERSIST_PERIOD_MS,
    ENV_RNG_SEED, ENV_ROOT_BEHAVIORS, ENV_SESSION_ID,
};

// Error
pub use error::{BehaviorError, ConfigError, SessionError};

// Util
pub use util::{hash_json, sha256_hex};
