//! Retained history of applied edits, interleaved with document snapshots.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::doc::DocSnapshot;
use crate::event::{EditEvent, EditFootprint, Timezone};

/// An event as it was applied: positions already reconciled, stamped with the
/// document timezone it was applied at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedEvent {
    pub serial: u64,
    pub timezone: Timezone,
    pub event: EditEvent,
    #[serde(default)]
    pub footprint: EditFootprint,
    #[serde(default)]
    pub undone: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "entry", rename_all = "snake_case")]
pub enum QueueEntry {
    Event(AppliedEvent),
    Snapshot(DocSnapshot),
}

impl QueueEntry {
    pub fn timezone(&self) -> Timezone {
        match self {
            QueueEntry::Event(applied) => applied.timezone,
            QueueEntry::Snapshot(snapshot) => snapshot.timezone,
        }
    }

    pub fn as_event(&self) -> Option<&AppliedEvent> {
        match self {
            QueueEntry::Event(applied) => Some(applied),
            QueueEntry::Snapshot(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventQueue {
    entries: VecDeque<QueueEntry>,
    next_serial: u64,
}

impl EventQueue {
    /// A queue always begins with a snapshot so every retained event has an
    /// anchor to replay from.
    pub fn new(initial: DocSnapshot) -> Self {
        let mut entries = VecDeque::new();
        entries.push_back(QueueEntry::Snapshot(initial));
        Self {
            entries,
            next_serial: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &QueueEntry> {
        self.entries.iter()
    }

    pub(crate) fn entries_mut(&mut self) -> impl Iterator<Item = &mut QueueEntry> {
        self.entries.iter_mut()
    }

    pub fn events(&self) -> impl Iterator<Item = &AppliedEvent> {
        self.entries.iter().filter_map(QueueEntry::as_event)
    }

    pub fn snapshot_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| matches!(entry, QueueEntry::Snapshot(_)))
            .count()
    }

    pub fn push_event(
        &mut self,
        timezone: Timezone,
        event: EditEvent,
        footprint: EditFootprint,
    ) -> u64 {
        let serial = self.next_serial;
        self.next_serial += 1;
        self.entries.push_back(QueueEntry::Event(AppliedEvent {
            serial,
            timezone,
            event,
            footprint,
            undone: false,
        }));
        serial
    }

    pub fn push_snapshot(&mut self, snapshot: DocSnapshot) {
        self.entries.push_back(QueueEntry::Snapshot(snapshot));
    }

    /// Footprints of every event applied at or after `timezone`, oldest
    /// first. The sender's own edits count too: a replica stamps an edit
    /// before its earlier edits come back in order.
    pub fn footprints_since(
        &self,
        timezone: Timezone,
    ) -> impl Iterator<Item = &EditFootprint> + '_ {
        self.events()
            .filter(move |applied| applied.timezone >= timezone)
            .map(|applied| &applied.footprint)
    }

    /// Position of the user's most recent undoable, not yet undone event.
    pub fn last_undoable(&self, user: &str) -> Option<usize> {
        self.entries.iter().rposition(|entry| match entry {
            QueueEntry::Event(applied) => {
                !applied.undone && applied.event.user == user && applied.event.kind.is_undoable()
            }
            QueueEntry::Snapshot(_) => false,
        })
    }

    /// Position and contents of the nearest snapshot strictly before `index`.
    pub fn anchor_before(&self, index: usize) -> Option<(usize, &DocSnapshot)> {
        self.entries
            .iter()
            .take(index)
            .enumerate()
            .rev()
            .find_map(|(position, entry)| match entry {
                QueueEntry::Snapshot(snapshot) => Some((position, snapshot)),
                QueueEntry::Event(_) => None,
            })
    }

    pub fn mark_undone(&mut self, index: usize) -> bool {
        match self.entries.get_mut(index) {
            Some(QueueEntry::Event(applied)) if !applied.undone => {
                applied.undone = true;
                true
            }
            _ => false,
        }
    }

    /// Drops entries older than `now - cutoff`, keeping the last snapshot at
    /// or before that boundary so the oldest retained event stays anchored.
    /// Returns the number of entries removed.
    pub fn prune(&mut self, now: Timezone, cutoff: Timezone) -> usize {
        let oldest = now.saturating_sub(cutoff);
        let anchor = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| {
                matches!(entry, QueueEntry::Snapshot(snapshot) if snapshot.timezone <= oldest)
            })
            .map(|(position, _)| position)
            .last();
        let Some(anchor) = anchor else {
            return 0;
        };
        self.entries.drain(..anchor).count()
    }

    /// Oldest timezone still covered by a retained event or snapshot.
    pub fn oldest_timezone(&self) -> Option<Timezone> {
        self.entries.front().map(QueueEntry::timezone)
    }
}
