//! Ordered application of edit events with reconciliation and undo.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::doc::{Doc, DocSnapshot, Selection};
use crate::error::DocError;
use crate::event::{EditEvent, EditFootprint, EditKind, Timezone};
use crate::queue::{EventQueue, QueueEntry};
use crate::style::TextStyle;

pub const DEFAULT_CUTOFF: Timezone = 60;
pub const DEFAULT_SNAPSHOT_EVERY: Timezone = DEFAULT_CUTOFF / 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocConfig {
    /// Events stamped more than this many edits behind are rejected.
    pub cutoff: Timezone,
    pub snapshot_every: Timezone,
}

impl Default for DocConfig {
    fn default() -> Self {
        Self {
            cutoff: DEFAULT_CUTOFF,
            snapshot_every: DEFAULT_SNAPSHOT_EVERY,
        }
    }
}

impl DocConfig {
    /// Window of `cutoff` edits with a snapshot every `cutoff / 6`.
    pub fn with_cutoff(cutoff: Timezone) -> Self {
        Self {
            cutoff,
            snapshot_every: (cutoff / 6).max(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// Timezone the event was applied at.
    pub timezone: Timezone,
    pub footprint: EditFootprint,
    /// Positions in the event were moved to account for unseen edits.
    pub reconciled: bool,
    pub snapshot_taken: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentModel {
    config: DocConfig,
    doc: Doc,
    queue: EventQueue,
    timezone: Timezone,
}

impl Default for DocumentModel {
    fn default() -> Self {
        Self::new(DocConfig::default())
    }
}

impl DocumentModel {
    pub fn new(config: DocConfig) -> Self {
        Self::from_snapshot(config, Doc::new().snapshot(0))
    }

    /// Starts a model from a full snapshot, e.g. when a lagging client has to
    /// resynchronize.
    pub fn from_snapshot(config: DocConfig, snapshot: DocSnapshot) -> Self {
        let doc = Doc::restore(&snapshot);
        let timezone = snapshot.timezone;
        Self {
            config,
            doc,
            queue: EventQueue::new(snapshot),
            timezone,
        }
    }

    pub fn config(&self) -> DocConfig {
        self.config
    }

    pub fn doc(&self) -> &Doc {
        &self.doc
    }

    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    pub fn timezone(&self) -> Timezone {
        self.timezone
    }

    pub fn plain_text(&self) -> String {
        self.doc.plain_text(None, None)
    }

    pub fn style_at(&self, index: usize) -> Option<TextStyle> {
        self.doc.style_at(index)
    }

    pub fn resync_snapshot(&self) -> DocSnapshot {
        self.doc.snapshot(self.timezone)
    }

    /// Applies one ordered event. Every replica calling this with the same
    /// sequence ends in the same state.
    pub fn receive(&mut self, event: EditEvent) -> Result<ApplyOutcome, DocError> {
        if event.timezone > self.timezone {
            return Err(DocError::FutureTimezone {
                timezone: event.timezone,
                current: self.timezone,
            });
        }
        if self.timezone - event.timezone > self.config.cutoff {
            return Err(DocError::StaleEvent {
                timezone: event.timezone,
                oldest: self.timezone - self.config.cutoff,
            });
        }

        let (event, reconciled) = self.reconcile(event);
        let footprint = match &event.kind {
            EditKind::Undo => {
                self.undo(&event.user)?;
                EditFootprint::reset()
            }
            kind => apply_kind(&mut self.doc, &event.user, kind),
        };
        debug!(
            "doc event {} from {} applied at timezone {}",
            event.kind.name(),
            event.user,
            self.timezone
        );

        let applied_at = self.timezone;
        self.queue.push_event(applied_at, event, footprint.clone());
        self.timezone += 1;

        let snapshot_every = self.config.snapshot_every.max(1);
        let snapshot_taken = self.timezone % snapshot_every == 0;
        if snapshot_taken {
            self.queue.push_snapshot(self.doc.snapshot(self.timezone));
        }
        self.queue.prune(self.timezone, self.config.cutoff);

        Ok(ApplyOutcome {
            timezone: applied_at,
            footprint,
            reconciled,
            snapshot_taken,
        })
    }

    /// Moves the positions a lagging event carries over every edit it could
    /// not have seen. Edits that rewrote history leave positions as sent.
    fn reconcile(&self, event: EditEvent) -> (EditEvent, bool) {
        let (start, end, bol) = match event.kind {
            EditKind::Select { start, end, bol } => (start, end, bol),
            _ => return (event, false),
        };
        let initial = Selection::range(start.min(end), start.max(end));
        let moved = self
            .queue
            .footprints_since(event.timezone)
            .filter(|footprint| !footprint.reset)
            .fold(initial.clone(), |selection, footprint| {
                footprint.transform(&selection)
            });
        let reconciled = moved != initial;
        (
            EditEvent {
                kind: EditKind::Select {
                    start: moved.start,
                    end: moved.end,
                    bol,
                },
                ..event
            },
            reconciled,
        )
    }

    /// Reverts the user's last undoable edit by reloading the snapshot before
    /// it and replaying everything after it except undone entries.
    fn undo(&mut self, user: &str) -> Result<(), DocError> {
        let target = self
            .queue
            .last_undoable(user)
            .ok_or_else(|| DocError::UndoUnavailable {
                user: user.to_string(),
            })?;
        let (anchor, snapshot) = self
            .queue
            .anchor_before(target)
            .ok_or_else(|| DocError::UndoUnavailable {
                user: user.to_string(),
            })?;
        let mut doc = Doc::restore(snapshot);
        self.queue.mark_undone(target);

        for entry in self.queue.entries_mut().skip(anchor + 1) {
            match entry {
                QueueEntry::Snapshot(snapshot) => {
                    *snapshot = doc.snapshot(snapshot.timezone);
                }
                QueueEntry::Event(applied) => {
                    if applied.undone || matches!(applied.event.kind, EditKind::Undo) {
                        continue;
                    }
                    applied.footprint =
                        apply_kind(&mut doc, &applied.event.user, &applied.event.kind);
                }
            }
        }
        self.doc = doc;
        info!("undo for {user} replayed from queue entry {anchor}");
        Ok(())
    }
}

fn apply_kind(doc: &mut Doc, user: &str, kind: &EditKind) -> EditFootprint {
    match kind {
        EditKind::Insert { runs } => doc.insert(user, runs),
        EditKind::Delete { backspace } => doc.delete(user, *backspace),
        EditKind::Select { start, end, bol } => doc.select(user, *start, *end, *bol),
        EditKind::SetStyle { style, merge } => doc.set_style(user, style, *merge),
        EditKind::Undo => EditFootprint::reset(),
    }
}
