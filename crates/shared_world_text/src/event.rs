//! Edit events and the positional footprint they leave behind.

use serde::{Deserialize, Serialize};

use crate::doc::{Selection, UserId};
use crate::run::Run;
use crate::style::TextStyle;
use crate::transform::{transform_delete, transform_insert};

/// Per-document edit counter. A client stamps each event with the timezone
/// it last observed; every applied event advances it by one.
pub type Timezone = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EditKind {
    Insert {
        runs: Vec<Run>,
    },
    Delete {
        #[serde(default)]
        backspace: bool,
    },
    Select {
        start: usize,
        end: usize,
        #[serde(default)]
        bol: bool,
    },
    SetStyle {
        style: TextStyle,
        #[serde(default)]
        merge: bool,
    },
    Undo,
}

impl EditKind {
    pub fn name(&self) -> &'static str {
        match self {
            EditKind::Insert { .. } => "insert",
            EditKind::Delete { .. } => "delete",
            EditKind::Select { .. } => "select",
            EditKind::SetStyle { .. } => "setStyle",
            EditKind::Undo => "undo",
        }
    }

    /// Only content-changing edits are undo targets.
    pub fn is_undoable(&self) -> bool {
        matches!(
            self,
            EditKind::Insert { .. } | EditKind::Delete { .. } | EditKind::SetStyle { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditEvent {
    pub user: UserId,
    pub timezone: Timezone,
    #[serde(flatten)]
    pub kind: EditKind,
}

impl EditEvent {
    pub fn new(user: impl Into<UserId>, timezone: Timezone, kind: EditKind) -> Self {
        Self {
            user: user.into(),
            timezone,
            kind,
        }
    }

    pub fn insert(user: impl Into<UserId>, timezone: Timezone, runs: Vec<Run>) -> Self {
        Self::new(user, timezone, EditKind::Insert { runs })
    }

    pub fn insert_text(user: impl Into<UserId>, timezone: Timezone, text: &str) -> Self {
        Self::insert(user, timezone, vec![Run::new(text)])
    }

    pub fn delete(user: impl Into<UserId>, timezone: Timezone, backspace: bool) -> Self {
        Self::new(user, timezone, EditKind::Delete { backspace })
    }

    pub fn select(
        user: impl Into<UserId>,
        timezone: Timezone,
        start: usize,
        end: usize,
        bol: bool,
    ) -> Self {
        Self::new(user, timezone, EditKind::Select { start, end, bol })
    }

    pub fn set_style(
        user: impl Into<UserId>,
        timezone: Timezone,
        style: TextStyle,
        merge: bool,
    ) -> Self {
        Self::new(user, timezone, EditKind::SetStyle { style, merge })
    }

    pub fn undo(user: impl Into<UserId>, timezone: Timezone) -> Self {
        Self::new(user, timezone, EditKind::Undo)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PositionEdit {
    Insert { at: usize, len: usize },
    Delete { start: usize, end: usize },
}

/// The positional changes one applied event made, in application order.
///
/// `reset` marks history rewrites (undo) whose effect on offsets cannot be
/// expressed as a list of inserts and deletes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditFootprint {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edits: Vec<PositionEdit>,
    #[serde(default)]
    pub reset: bool,
}

impl EditFootprint {
    pub fn reset() -> Self {
        Self {
            edits: Vec::new(),
            reset: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty() && !self.reset
    }

    pub fn transform(&self, selection: &Selection) -> Selection {
        self.edits
            .iter()
            .fold(selection.clone(), |current, edit| match *edit {
                PositionEdit::Insert { at, len } => transform_insert(&current, at, len),
                PositionEdit::Delete { start, end } => transform_delete(&current, start, end),
            })
    }
}
