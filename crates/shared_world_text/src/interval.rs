//! Offset-to-run index derived from a canonical run list.

use serde::{Deserialize, Serialize};

use crate::run::Run;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub start: usize,
    pub end: usize,
}

impl Interval {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }
}

/// One interval per run. For a canonical list the intervals partition
/// `[0, len + 1)` and the last one is the unit interval of the sentinel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntervalIndex {
    intervals: Vec<Interval>,
}

impl IntervalIndex {
    pub fn build(runs: &[Run]) -> Self {
        let mut intervals = Vec::with_capacity(runs.len());
        let mut pos = 0;
        for run in runs {
            let len = run.char_len();
            intervals.push(Interval {
                start: pos,
                end: pos + len,
            });
            pos += len;
        }
        Self { intervals }
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    /// Total span covered, sentinel included.
    pub fn span(&self) -> usize {
        self.intervals.last().map(|interval| interval.end).unwrap_or(0)
    }

    /// Returns `(run_index, offset_within_run)` for an absolute offset.
    pub fn locate(&self, offset: usize) -> Option<(usize, usize)> {
        let index = self
            .intervals
            .partition_point(|interval| interval.end <= offset);
        let interval = self.intervals.get(index)?;
        interval
            .contains(offset)
            .then(|| (index, offset - interval.start))
    }

    /// Checks that the intervals tile `[0, span)` without gaps or empties.
    pub fn is_partition(&self) -> bool {
        let mut expected = 0;
        for interval in &self.intervals {
            if interval.start != expected || interval.is_empty() {
                return false;
            }
            expected = interval.end;
        }
        true
    }
}
