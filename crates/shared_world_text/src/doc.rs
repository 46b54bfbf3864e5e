//! The run-list document and per-user selections.
//!
//! Every mutating method restores the canonical form (see
//! [`canonicalize`]) and transforms every other user's selection before it
//! returns.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::event::{EditFootprint, PositionEdit, Timezone};
use crate::interval::IntervalIndex;
use crate::run::{canonicalize, slice_runs, text_len, Run};
use crate::style::{normalize_style, TextStyle};
use crate::transform::{transform_delete, transform_insert};

pub type UserId = String;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
    /// Caret is drawn at the beginning of the next visual line.
    #[serde(default)]
    pub bol: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Selection {
    pub fn caret(pos: usize) -> Self {
        Self::range(pos, pos)
    }

    pub fn range(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            bol: false,
            color: None,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    fn clamped(mut self, max: usize) -> Self {
        self.end = self.end.min(max);
        self.start = self.start.min(self.end);
        self
    }
}

/// Serializable document state, also the unit the event queue snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocSnapshot {
    #[serde(default)]
    pub timezone: Timezone,
    pub runs: Vec<Run>,
    #[serde(default)]
    pub selections: BTreeMap<UserId, Selection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "DocSnapshot", into = "DocSnapshot")]
pub struct Doc {
    runs: Vec<Run>,
    index: IntervalIndex,
    selections: BTreeMap<UserId, Selection>,
}

impl Default for Doc {
    fn default() -> Self {
        Self::new()
    }
}

impl Doc {
    pub fn new() -> Self {
        Self::from_runs(&[])
    }

    pub fn from_runs(runs: &[Run]) -> Self {
        let runs = canonicalize(runs);
        let index = IntervalIndex::build(&runs);
        Self {
            runs,
            index,
            selections: BTreeMap::new(),
        }
    }

    pub fn restore(snapshot: &DocSnapshot) -> Self {
        let mut doc = Self::from_runs(&snapshot.runs);
        let len = doc.len();
        doc.selections = snapshot
            .selections
            .iter()
            .map(|(user, selection)| (user.clone(), selection.clone().clamped(len)))
            .collect();
        doc
    }

    pub fn snapshot(&self, timezone: Timezone) -> DocSnapshot {
        DocSnapshot {
            timezone,
            runs: self.runs.clone(),
            selections: self.selections.clone(),
        }
    }

    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    pub fn intervals(&self) -> &IntervalIndex {
        &self.index
    }

    /// Character count, sentinel excluded.
    pub fn len(&self) -> usize {
        self.index.span().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn selections(&self) -> &BTreeMap<UserId, Selection> {
        &self.selections
    }

    pub fn selection(&self, user: &str) -> Selection {
        self.selections.get(user).cloned().unwrap_or_default()
    }

    pub fn plain_text(&self, start: Option<usize>, end: Option<usize>) -> String {
        let len = self.len();
        let end = end.unwrap_or(len).min(len);
        let start = start.unwrap_or(0).min(end);
        slice_runs(&self.runs, start, end)
            .into_iter()
            .map(|run| run.text)
            .collect()
    }

    /// Style of the character at `index`. At the sentinel the style of the
    /// preceding character applies, so typing at the end continues it.
    pub fn style_at(&self, index: usize) -> Option<TextStyle> {
        let len = self.len();
        let probe = if index >= len {
            len.checked_sub(1)?
        } else {
            index
        };
        let (run, _) = self.index.locate(probe)?;
        self.runs.get(run).and_then(|run| run.style.clone())
    }

    /// Replaces the user's selection with `runs` and leaves a caret after
    /// the inserted text.
    pub fn insert(&mut self, user: &str, runs: &[Run]) -> EditFootprint {
        let selection = self.selection(user);
        let mut footprint = EditFootprint::default();
        if !selection.is_collapsed() {
            self.delete_range(selection.start, selection.end);
            footprint.edits.push(PositionEdit::Delete {
                start: selection.start,
                end: selection.end,
            });
        }

        let at = selection.start.min(self.len());
        let inserted = canonicalize(runs);
        let len = text_len(&inserted);
        if len > 0 {
            let total = self.len();
            let mut body = slice_runs(&self.runs, 0, at);
            body.extend(inserted.into_iter().filter(|run| !run.is_eof()));
            body.extend(slice_runs(&self.runs, at, total));
            self.replace_body(&body);
            for (id, other) in self.selections.iter_mut() {
                if id != user {
                    *other = transform_insert(other, at, len);
                }
            }
            footprint.edits.push(PositionEdit::Insert { at, len });
        }

        self.selections.insert(
            user.to_string(),
            Selection {
                start: at + len,
                end: at + len,
                bol: false,
                color: selection.color,
            },
        );
        footprint
    }

    /// Deletes the selection, or one character before (backspace) or after
    /// the caret. The sentinel is never removed.
    pub fn delete(&mut self, user: &str, backspace: bool) -> EditFootprint {
        let selection = self.selection(user).clamped(self.len());
        let range = if !selection.is_collapsed() {
            Some((selection.start, selection.end))
        } else if backspace {
            selection
                .start
                .checked_sub(1)
                .map(|start| (start, selection.start))
        } else if selection.start < self.len() {
            Some((selection.start, selection.start + 1))
        } else {
            None
        };

        let mut footprint = EditFootprint::default();
        if let Some((start, end)) = range {
            self.delete_range(start, end);
            footprint.edits.push(PositionEdit::Delete { start, end });
        }
        if let Some(own) = self.selections.get_mut(user) {
            own.bol = false;
        }
        footprint
    }

    pub fn select(&mut self, user: &str, start: usize, end: usize, bol: bool) -> EditFootprint {
        let len = self.len();
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        let color = self.selections.get(user).and_then(|s| s.color.clone());
        self.selections.insert(
            user.to_string(),
            Selection {
                start: start.min(len),
                end: end.min(len),
                bol,
                color,
            },
        );
        EditFootprint::default()
    }

    pub fn set_selection_color(&mut self, user: &str, color: Option<String>) {
        let entry = self.selections.entry(user.to_string()).or_default();
        entry.color = color;
    }

    pub fn remove_selection(&mut self, user: &str) {
        self.selections.remove(user);
    }

    /// Applies `style` to the user's selection; `merge` overlays it on the
    /// existing styles instead of replacing them.
    pub fn set_style(&mut self, user: &str, style: &TextStyle, merge: bool) -> EditFootprint {
        let selection = self.selection(user).clamped(self.len());
        if selection.is_collapsed() {
            return EditFootprint::default();
        }
        let total = self.len();
        let mut body = slice_runs(&self.runs, 0, selection.start);
        body.extend(
            slice_runs(&self.runs, selection.start, selection.end)
                .into_iter()
                .map(|run| {
                    let style = if merge {
                        run.style.unwrap_or_default().merged(style)
                    } else {
                        style.clone()
                    };
                    Run {
                        text: run.text,
                        style: normalize_style(Some(style)),
                    }
                }),
        );
        body.extend(slice_runs(&self.runs, selection.end, total));
        self.replace_body(&body);
        EditFootprint::default()
    }

    /// True when the run list is in canonical form and the interval index
    /// partitions `[0, len + 1)`.
    pub fn is_canonical(&self) -> bool {
        canonicalize(&self.runs) == self.runs
            && self.index.is_partition()
            && self.runs.iter().filter(|run| run.is_eof()).count() == 1
            && self.runs.last().map(Run::is_eof).unwrap_or(false)
    }

    fn delete_range(&mut self, start: usize, end: usize) {
        let total = self.len();
        let end = end.min(total);
        if start >= end {
            return;
        }
        let mut body = slice_runs(&self.runs, 0, start);
        body.extend(slice_runs(&self.runs, end, total));
        self.replace_body(&body);
        let len = self.len();
        for selection in self.selections.values_mut() {
            *selection = transform_delete(selection, start, end).clamped(len);
        }
    }

    fn replace_body(&mut self, body: &[Run]) {
        self.runs = canonicalize(body);
        self.index = IntervalIndex::build(&self.runs);
    }
}

impl From<DocSnapshot> for Doc {
    fn from(snapshot: DocSnapshot) -> Self {
        Doc::restore(&snapshot)
    }
}

impl From<Doc> for DocSnapshot {
    fn from(doc: Doc) -> Self {
        DocSnapshot {
            timezone: 0,
            runs: doc.runs,
            selections: doc.selections,
        }
    }
}
