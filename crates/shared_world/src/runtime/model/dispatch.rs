use log::{debug, warn};
use serde_json::Value as JsonValue;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use super::super::actor::ActorContext;
use super::super::behavior::MethodSelector;
use super::super::error::{BehaviorError, SessionError};
use super::super::types::ActorId;
use super::{Model, Publication, StepReport};

pub(super) fn panic_message(panic: &Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

impl Model {
    // ---------------------------------------------------------------------
    // Handler dispatch
    // ---------------------------------------------------------------------

    /// Runs one handler. Recoverable failures stay inside the handler;
    /// fatal failures and panics halt the model.
    pub(super) fn invoke(
        &mut self,
        actor: ActorId,
        selector: &MethodSelector,
        payload: &JsonValue,
        report: &mut StepReport,
    ) -> Result<(), SessionError> {
        let Some(record) = self.state.actors.get(&actor) else {
            debug!("{selector} for destroyed actor {actor} skipped");
            return Ok(());
        };
        let Some(behavior) = self.registry.resolve(&record.behaviors, selector) else {
            let message = format!("actor {actor} has no handler for {selector}");
            warn!("{message}");
            report.recoverable_errors.push(message);
            return Ok(());
        };

        let label = format!("{}.{} on actor {actor}", behavior.name(), selector.method);
        let mut ctx = ActorContext::new(
            actor,
            &mut self.state,
            &self.registry,
            &self.config,
            &mut self.outbox,
        );
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            behavior.handle(&mut ctx, &selector.method, payload)
        }));
        report.handlers_run += 1;

        match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(BehaviorError::Recoverable(message))) => {
                warn!("{label} failed: {message}");
                report.recoverable_errors.push(format!("{label}: {message}"));
                Ok(())
            }
            Ok(Err(BehaviorError::Fatal(message))) => Err(self.halt(format!("{label}: {message}"))),
            Err(panic) => Err(self.halt(format!("{label} panicked: {}", panic_message(&panic)))),
        }
    }

    /// Delivers queued publications in FIFO order until the queue is empty
    /// or the per-step budget is spent. Anything left is dropped and
    /// reported as a recoverable error.
    pub(super) fn drain_cascade(&mut self, report: &mut StepReport) -> Result<(), SessionError> {
        let limit = self.config.max_cascade_events;
        let mut delivered = 0usize;
        while let Some(publication) = self.outbox.cascade.pop_front() {
            if delivered >= limit {
                let dropped = self.outbox.cascade.len() + 1;
                let message = format!(
                    "cascade limit {limit} reached at seq {}; dropped {dropped} publications \
                     starting with {}/{}",
                    self.state.seq, publication.scope, publication.event
                );
                warn!("{message}");
                self.outbox.cascade.clear();
                report.dropped_publications += dropped;
                report.recoverable_errors.push(message);
                break;
            }
            delivered += 1;
            self.deliver(&publication, report)?;
        }
        report.publications_delivered += delivered;
        Ok(())
    }

    fn deliver(
        &mut self,
        publication: &Publication,
        report: &mut StepReport,
    ) -> Result<(), SessionError> {
        let subscribers = self
            .state
            .bus
            .subscribers(&publication.scope, &publication.event)
            .to_vec();
        debug!(
            "{}/{} -> {} subscribers",
            publication.scope,
            publication.event,
            subscribers.len()
        );
        for subscription in subscribers {
            self.invoke(
                subscription.actor,
                &subscription.handler,
                &publication.payload,
                report,
            )?;
        }
        Ok(())
    }

    /// Runs every future message due at or before `until`, each followed by
    /// the cascade it started.
    pub(super) fn run_futures(
        &mut self,
        until: u64,
        report: &mut StepReport,
    ) -> Result<(), SessionError> {
        while let Some(message) = self.state.futures.pop_due(until) {
            self.state.time = self.state.time.max(message.time);
            self.invoke(message.actor, &message.method, &message.payload, report)?;
            report.futures_run += 1;
            self.drain_cascade(report)?;
        }
        Ok(())
    }
}
