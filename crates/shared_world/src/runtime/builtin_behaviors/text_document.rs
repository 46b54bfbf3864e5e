use log::{debug, warn};
use serde_json::{json, Value as JsonValue};

use shared_world_text::{DocError, EditEvent};

use super::super::actor::ActorContext;
use super::super::behavior::ActorBehavior;
use super::super::error::BehaviorError;
use super::super::types::actor_scope;
use super::{
    DOCUMENT_CHANGED_EVENT, DOCUMENT_EDIT_EVENT, DOCUMENT_RESYNC_EVENT, TEXT_DOCUMENT_BEHAVIOR,
};

/// Hosts a synchronized document. Views publish [`EditEvent`]s as `edit`
/// on the actor's scope.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextDocumentBehavior;

impl ActorBehavior for TextDocumentBehavior {
    fn name(&self) -> &str {
        TEXT_DOCUMENT_BEHAVIOR
    }

    fn handles(&self, method: &str) -> bool {
        method == "edit"
    }

    fn init(&self, ctx: &mut ActorContext<'_>, _options: &JsonValue) -> Result<(), BehaviorError> {
        ctx.document_mut()?;
        let own = actor_scope(ctx.id());
        ctx.subscribe(&own, DOCUMENT_EDIT_EVENT, "text-document.edit");
        Ok(())
    }

    fn handle(
        &self,
        ctx: &mut ActorContext<'_>,
        method: &str,
        payload: &JsonValue,
    ) -> Result<(), BehaviorError> {
        if method != "edit" {
            return Err(BehaviorError::recoverable(format!(
                "text-document has no method {method}"
            )));
        }
        let event: EditEvent = serde_json::from_value(payload.clone())?;
        let user = event.user.clone();
        let kind = event.kind.name();
        let received = ctx.document_mut()?.receive(event);
        match received {
            Ok(outcome) => {
                debug!(
                    "document {} applied {kind} from {user} at timezone {}",
                    ctx.id(),
                    outcome.timezone
                );
                ctx.say(
                    DOCUMENT_CHANGED_EVENT,
                    json!({
                        "user": user,
                        "kind": kind,
                        "timezone": outcome.timezone,
                        "reconciled": outcome.reconciled,
                    }),
                );
                Ok(())
            }
            Err(DocError::StaleEvent { timezone, oldest }) => {
                warn!(
                    "document {} rejected stale {kind} from {user}: timezone {timezone} < {oldest}",
                    ctx.id()
                );
                ctx.say(
                    DOCUMENT_RESYNC_EVENT,
                    json!({ "user": user, "timezone": timezone, "oldest": oldest }),
                );
                Ok(())
            }
            Err(err) => Err(BehaviorError::recoverable(err.to_string())),
        }
    }
}
