//! Selection transforms applied when another user's edit lands.
//!
//! Both functions are total over `start <= end` selections and never move a
//! bound below zero. Deletions are classified first so each case has one
//! closed-form rule.

use crate::doc::Selection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// The deletion ends exactly where the selection starts.
    Start,
    /// The deletion starts exactly where the selection ends.
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOverlap {
    /// Nothing was removed.
    Empty,
    /// `de < s`: both bounds shift left by the deleted length.
    Before,
    /// `ds > e`: untouched.
    After,
    /// Deletion abuts the selection without entering it.
    Touch(Boundary),
    /// `ds <= s` and `de >= e`: collapses to `[ds, ds]`.
    Covers,
    /// `ds < s < de < e`: becomes `[ds, e - len]`.
    Head,
    /// `s < ds < e < de`: becomes `[s, ds]`.
    Tail,
    /// `s <= ds`, `de <= e`, not covering: becomes `[s, e - len]`.
    Within,
}

pub fn classify_delete(selection: &Selection, start: usize, end: usize) -> DeleteOverlap {
    let (s, e) = (selection.start, selection.end);
    if start >= end {
        return DeleteOverlap::Empty;
    }
    if end == s {
        return DeleteOverlap::Touch(Boundary::Start);
    }
    if start == e {
        return DeleteOverlap::Touch(Boundary::End);
    }
    if end < s {
        return DeleteOverlap::Before;
    }
    if start > e {
        return DeleteOverlap::After;
    }
    if start <= s && end >= e {
        return DeleteOverlap::Covers;
    }
    if start < s {
        // end is inside (s, e)
        return DeleteOverlap::Head;
    }
    if end > e {
        // start is inside (s, e)
        return DeleteOverlap::Tail;
    }
    DeleteOverlap::Within
}

/// Moves `selection` to account for `[start, end)` being removed.
pub fn transform_delete(selection: &Selection, start: usize, end: usize) -> Selection {
    let len = end.saturating_sub(start);
    let (s, e) = (selection.start, selection.end);
    let (new_start, new_end) = match classify_delete(selection, start, end) {
        DeleteOverlap::Empty | DeleteOverlap::After | DeleteOverlap::Touch(Boundary::End) => {
            (s, e)
        }
        DeleteOverlap::Before | DeleteOverlap::Touch(Boundary::Start) => (s - len, e - len),
        DeleteOverlap::Covers => (start, start),
        DeleteOverlap::Head => (start, e - len),
        DeleteOverlap::Tail => (s, start),
        DeleteOverlap::Within => (s, e - len),
    };
    Selection {
        start: new_start,
        end: new_end,
        ..selection.clone()
    }
}

/// Moves `selection` to account for `len` characters inserted at `at`.
///
/// An insertion strictly before the selection shifts it, one strictly inside
/// grows it, and one at or after its end (or exactly at the start of a
/// non-empty selection) leaves it alone.
pub fn transform_insert(selection: &Selection, at: usize, len: usize) -> Selection {
    let (s, e) = (selection.start, selection.end);
    let (new_start, new_end) = if len == 0 {
        (s, e)
    } else if at < s {
        (s + len, e + len)
    } else if s < at && at < e {
        (s, e + len)
    } else {
        (s, e)
    };
    Selection {
        start: new_start,
        end: new_end,
        ..selection.clone()
    }
}

#[cfg(test)]
mod tests;
