//! Pawns for the built-in behaviors.

use log::info;
use serde_json::{json, Value as JsonValue};

use shared_world_text::{wrap, MetricsCache, MonospaceMeasurer, WrapLayout};

use super::actor::ActorView;
use super::builtin_behaviors::{
    AVATAR_BEHAVIOR, AVATAR_MOVED_EVENT, DOCUMENT_CHANGED_EVENT, DOCUMENT_RESYNC_EVENT,
    TEXT_DOCUMENT_BEHAVIOR,
};
use super::types::{ActorId, ClientId, ViewNotification};
use super::view::{Pawn, PawnFactory, SmoothingCache};

pub const AVATAR_SMOOTHING: f64 = 0.5;
pub const DEFAULT_TEXT_WIDTH: f64 = 40.0;

pub fn builtin_pawns() -> PawnFactory {
    let mut factory = PawnFactory::new();
    factory
        .register(AVATAR_BEHAVIOR, AvatarPawn::construct)
        .register(TEXT_DOCUMENT_BEHAVIOR, TextPawn::construct);
    factory
}

fn position_of(actor: &ActorView<'_>) -> [f64; 3] {
    [
        actor.get_f64("x").unwrap_or(0.0),
        actor.get_f64("y").unwrap_or(0.0),
        actor.get_f64("z").unwrap_or(0.0),
    ]
}

/// Renders an avatar at a position eased towards the replicated one.
#[derive(Debug, Clone, PartialEq)]
pub struct AvatarPawn {
    actor: ActorId,
    local: bool,
    position: [f64; 3],
    moves_seen: u64,
}

impl AvatarPawn {
    pub fn construct(actor: &ActorView<'_>, view_id: &str) -> Box<dyn Pawn> {
        Box::new(Self::new(actor, view_id))
    }

    pub fn new(actor: &ActorView<'_>, view_id: &str) -> Self {
        Self {
            actor: actor.id(),
            local: actor.get_str("view_id") == Some(view_id),
            position: position_of(actor),
            moves_seen: 0,
        }
    }

    /// Whether this avatar belongs to the view that owns the pawn.
    pub fn is_local(&self) -> bool {
        self.local
    }

    pub fn position(&self) -> [f64; 3] {
        self.position
    }

    pub fn moves_seen(&self) -> u64 {
        self.moves_seen
    }
}

impl Pawn for AvatarPawn {
    fn actor(&self) -> ActorId {
        self.actor
    }

    fn handle(
        &mut self,
        notification: &ViewNotification,
        _actor: &ActorView<'_>,
        _smoothing: &mut SmoothingCache,
    ) {
        if notification.event == AVATAR_MOVED_EVENT {
            self.moves_seen += 1;
        }
    }

    fn update(&mut self, actor: &ActorView<'_>, smoothing: &mut SmoothingCache) {
        self.position = smoothing.smooth(self.actor, position_of(actor), AVATAR_SMOOTHING);
    }

    fn summary(&self) -> JsonValue {
        json!({
            "actor": self.actor,
            "local": self.local,
            "position": self.position,
            "moves_seen": self.moves_seen,
        })
    }
}

/// Keeps a wrapped layout of a text document, recomputed when the
/// document announces a change.
#[derive(Debug)]
pub struct TextPawn {
    actor: ActorId,
    view_id: ClientId,
    width: f64,
    measurer: MonospaceMeasurer,
    metrics: MetricsCache,
    layout: WrapLayout,
    text: String,
    relayouts: u64,
    /// Set when the document rejected one of this view's edits as stale.
    needs_resync: bool,
}

impl TextPawn {
    pub fn construct(actor: &ActorView<'_>, view_id: &str) -> Box<dyn Pawn> {
        Box::new(Self::new(actor, view_id, DEFAULT_TEXT_WIDTH))
    }

    pub fn new(actor: &ActorView<'_>, view_id: &str, width: f64) -> Self {
        let mut pawn = Self {
            actor: actor.id(),
            view_id: view_id.to_string(),
            width,
            measurer: MonospaceMeasurer::default(),
            metrics: MetricsCache::default(),
            layout: WrapLayout::default(),
            text: String::new(),
            relayouts: 0,
            needs_resync: false,
        };
        pawn.relayout(actor);
        pawn
    }

    fn relayout(&mut self, actor: &ActorView<'_>) {
        let Some(document) = actor.document() else {
            return;
        };
        self.layout = wrap(
            document.doc().runs(),
            self.width,
            &self.measurer,
            &mut self.metrics,
        );
        self.text = document.plain_text();
        self.relayouts += 1;
    }

    pub fn layout(&self) -> &WrapLayout {
        &self.layout
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn relayouts(&self) -> u64 {
        self.relayouts
    }

    pub fn metrics(&self) -> &MetricsCache {
        &self.metrics
    }
}

impl Pawn for TextPawn {
    fn actor(&self) -> ActorId {
        self.actor
    }

    fn handle(
        &mut self,
        notification: &ViewNotification,
        actor: &ActorView<'_>,
        _smoothing: &mut SmoothingCache,
    ) {
        match notification.event.as_str() {
            DOCUMENT_CHANGED_EVENT => self.relayout(actor),
            DOCUMENT_RESYNC_EVENT => {
                let user = notification.payload.get("user").and_then(JsonValue::as_str);
                if user == Some(self.view_id.as_str()) {
                    info!(
                        "view {} must resync document actor {}",
                        self.view_id, self.actor
                    );
                    self.needs_resync = true;
                }
            }
            _ => {}
        }
    }

    fn take_resync(&mut self) -> bool {
        std::mem::take(&mut self.needs_resync)
    }

    fn summary(&self) -> JsonValue {
        json!({
            "actor": self.actor,
            "text": self.text,
            "lines": self.layout.lines.len(),
            "relayouts": self.relayouts,
            "needs_resync": self.needs_resync,
        })
    }
}
