//! Behaviors every session ships with.

mod avatar;
mod session_root;
mod text_document;

pub use avatar::AvatarBehavior;
pub use session_root::SessionRootBehavior;
pub use text_document::TextDocumentBehavior;

use super::behavior::BehaviorRegistry;

pub const SESSION_ROOT_BEHAVIOR: &str = "session-root";
pub const AVATAR_BEHAVIOR: &str = "avatar";
pub const TEXT_DOCUMENT_BEHAVIOR: &str = "text-document";

pub const AVATAR_KILLED_EVENT: &str = "avatar-killed";
pub const AVATAR_MOVE_EVENT: &str = "move";
pub const AVATAR_MOVED_EVENT: &str = "moved";
pub const AVATAR_DEATH_EVENT: &str = "killed";
pub const DOCUMENT_EDIT_EVENT: &str = "edit";
pub const DOCUMENT_CHANGED_EVENT: &str = "changed";
pub const DOCUMENT_RESYNC_EVENT: &str = "resync";

/// Logical milliseconds between gravity steps.
pub const AVATAR_FALL_PERIOD_MS: u64 = 50;
pub const GRAVITY: f64 = -9.8;
/// Half extent of the square platform centered on the origin at `y = 0`.
pub const PLATFORM_HALF_EXTENT: f64 = 10.0;
/// Avatars spawn at a random `x` in `[-SPAWN_SPREAD, SPAWN_SPREAD)`.
pub const SPAWN_SPREAD: u64 = 5;

pub fn builtin_behaviors() -> BehaviorRegistry {
    let mut registry = BehaviorRegistry::new();
    registry
        .install(SessionRootBehavior)
        .install(AvatarBehavior)
        .install(TextDocumentBehavior);
    registry
}
