//! Styled runs and the canonical form every mutation must restore.

use serde::{Deserialize, Serialize};

use crate::style::{normalize_style, TextStyle};

/// Sentinel character carried by the terminating run. It occupies exactly one
/// offset so a caret can sit after the last real character.
pub const EOF_CHAR: char = '\u{3}';

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<TextStyle>,
}

impl Run {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: None,
        }
    }

    pub fn styled(text: impl Into<String>, style: TextStyle) -> Self {
        Self {
            text: text.into(),
            style: normalize_style(Some(style)),
        }
    }

    pub fn eof() -> Self {
        Self {
            text: EOF_CHAR.to_string(),
            style: None,
        }
    }

    pub fn is_eof(&self) -> bool {
        self.text.len() == EOF_CHAR.len_utf8() && self.text.starts_with(EOF_CHAR)
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Drops empty runs, strips stray sentinels, merges neighbours with equal
/// style and terminates the list with exactly one EOF run.
pub fn canonicalize(runs: &[Run]) -> Vec<Run> {
    let mut out: Vec<Run> = Vec::with_capacity(runs.len() + 1);
    for run in runs {
        let text: String = run.text.chars().filter(|ch| *ch != EOF_CHAR).collect();
        if text.is_empty() {
            continue;
        }
        let style = normalize_style(run.style.clone());
        match out.last_mut() {
            Some(last) if last.style == style => last.text.push_str(&text),
            _ => out.push(Run { text, style }),
        }
    }
    out.push(Run::eof());
    out
}

/// Number of characters, not counting the sentinel.
pub fn text_len(runs: &[Run]) -> usize {
    runs.iter()
        .filter(|run| !run.is_eof())
        .map(Run::char_len)
        .sum()
}

/// Copies the characters in `[start, end)` of the non-sentinel text,
/// preserving styles.
pub(crate) fn slice_runs(runs: &[Run], start: usize, end: usize) -> Vec<Run> {
    let mut out = Vec::new();
    if start >= end {
        return out;
    }
    let mut pos = 0;
    for run in runs.iter().filter(|run| !run.is_eof()) {
        let len = run.char_len();
        let run_end = pos + len;
        let from = start.max(pos);
        let to = end.min(run_end);
        if from < to {
            let text: String = run
                .text
                .chars()
                .skip(from - pos)
                .take(to - from)
                .collect();
            out.push(Run {
                text,
                style: run.style.clone(),
            });
        }
        pos = run_end;
        if pos >= end {
            break;
        }
    }
    out
}
