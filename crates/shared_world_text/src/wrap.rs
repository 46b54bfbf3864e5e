//! Word wrap over styled runs.
//!
//! [`wrap`] is a pure function of its inputs; the only state it touches is
//! the caller-owned [`MetricsCache`], which memoizes per-word measurements.

use std::collections::{HashMap, VecDeque};

use crate::run::Run;
use crate::style::TextStyle;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WordMetrics {
    pub width: f64,
    pub height: f64,
    pub ascent: f64,
}

pub trait Measurer {
    fn measure(&self, text: &str, style: Option<&TextStyle>) -> WordMetrics;
}

/// Fixed advance per character, scaled by the style's size relative to
/// `base_size`. Headless clients and tests use it in place of font metrics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonospaceMeasurer {
    pub advance: f64,
    pub base_size: u32,
}

impl Default for MonospaceMeasurer {
    fn default() -> Self {
        Self {
            advance: 1.0,
            base_size: 16,
        }
    }
}

impl Measurer for MonospaceMeasurer {
    fn measure(&self, text: &str, style: Option<&TextStyle>) -> WordMetrics {
        let size = style
            .and_then(|style| style.size)
            .unwrap_or(self.base_size)
            .max(1);
        let scale = f64::from(size) / f64::from(self.base_size.max(1));
        WordMetrics {
            width: text.chars().count() as f64 * self.advance * scale,
            height: f64::from(size) * 1.25,
            ascent: f64::from(size),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricsKey {
    pub text: String,
    pub font: Option<String>,
    pub size: Option<u32>,
    pub bold: bool,
    pub italic: bool,
}

impl MetricsKey {
    pub fn new(text: &str, style: Option<&TextStyle>) -> Self {
        Self {
            text: text.to_string(),
            font: style.and_then(|style| style.font.clone()),
            size: style.and_then(|style| style.size),
            bold: style.and_then(|style| style.bold).unwrap_or(false),
            italic: style.and_then(|style| style.italic).unwrap_or(false),
        }
    }
}

/// Bounded memo of word metrics. Entries go into the newest shard; when it
/// fills a fresh shard is opened and, past `max_shards`, the oldest shard is
/// dropped whole.
#[derive(Debug, Clone)]
pub struct MetricsCache {
    shards: VecDeque<HashMap<MetricsKey, WordMetrics>>,
    shard_capacity: usize,
    max_shards: usize,
    hits: u64,
    misses: u64,
}

impl Default for MetricsCache {
    fn default() -> Self {
        Self::new(256, 8)
    }
}

impl MetricsCache {
    pub fn new(shard_capacity: usize, max_shards: usize) -> Self {
        let mut shards = VecDeque::new();
        shards.push_back(HashMap::new());
        Self {
            shards,
            shard_capacity: shard_capacity.max(1),
            max_shards: max_shards.max(1),
            hits: 0,
            misses: 0,
        }
    }

    pub fn get(&self, key: &MetricsKey) -> Option<WordMetrics> {
        self.shards
            .iter()
            .rev()
            .find_map(|shard| shard.get(key).copied())
    }

    pub fn contains(&self, key: &MetricsKey) -> bool {
        self.get(key).is_some()
    }

    pub fn get_or_insert_with(
        &mut self,
        key: MetricsKey,
        measure: impl FnOnce() -> WordMetrics,
    ) -> WordMetrics {
        if let Some(metrics) = self.get(&key) {
            self.hits += 1;
            return metrics;
        }
        self.misses += 1;
        let metrics = measure();
        self.insert(key, metrics);
        metrics
    }

    fn insert(&mut self, key: MetricsKey, metrics: WordMetrics) {
        let full = self
            .shards
            .back()
            .map(|shard| shard.len() >= self.shard_capacity)
            .unwrap_or(true);
        if full {
            self.shards.push_back(HashMap::new());
            while self.shards.len() > self.max_shards {
                self.shards.pop_front();
            }
        }
        if let Some(shard) = self.shards.back_mut() {
            shard.insert(key, metrics);
        }
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WrappedWord {
    /// Character offsets `[start, end)` in the document.
    pub start: usize,
    pub end: usize,
    pub text: String,
    pub style: Option<TextStyle>,
    pub line: usize,
    pub left: f64,
    pub top: f64,
    pub metrics: WordMetrics,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WrappedLine {
    pub start: usize,
    pub end: usize,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub ascent: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WrapLayout {
    pub lines: Vec<WrappedLine>,
    pub words: Vec<WrappedWord>,
}

impl WrapLayout {
    pub fn height(&self) -> f64 {
        self.lines
            .last()
            .map(|line| line.top + line.height)
            .unwrap_or(0.0)
    }

    /// Line holding the character at `offset`; offsets past the end map to
    /// the last line.
    pub fn line_of(&self, offset: usize) -> Option<usize> {
        let index = self.lines.partition_point(|line| line.end <= offset);
        if self.lines.is_empty() {
            None
        } else {
            Some(index.min(self.lines.len() - 1))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PieceKind {
    Word,
    Space,
    Newline,
    Eof,
}

struct Piece {
    kind: PieceKind,
    start: usize,
    end: usize,
    text: String,
    style: Option<TextStyle>,
}

fn classify(ch: char) -> PieceKind {
    if ch == '\n' {
        PieceKind::Newline
    } else if ch.is_whitespace() {
        PieceKind::Space
    } else {
        PieceKind::Word
    }
}

/// Splits runs into same-class pieces that never cross a run boundary and
/// appends a zero-width piece for the sentinel.
fn pieces(runs: &[Run]) -> Vec<Piece> {
    let mut out: Vec<Piece> = Vec::new();
    let mut pos = 0;
    let mut last_style = None;
    for run in runs.iter().filter(|run| !run.is_eof()) {
        let mut fresh_run = true;
        for ch in run.text.chars() {
            let kind = classify(ch);
            match out.last_mut() {
                Some(piece)
                    if !fresh_run && piece.kind == kind && kind != PieceKind::Newline =>
                {
                    piece.text.push(ch);
                    piece.end += 1;
                }
                _ => out.push(Piece {
                    kind,
                    start: pos,
                    end: pos + 1,
                    text: ch.to_string(),
                    style: run.style.clone(),
                }),
            }
            fresh_run = false;
            pos += 1;
        }
        last_style = run.style.clone();
    }
    out.push(Piece {
        kind: PieceKind::Eof,
        start: pos,
        end: pos + 1,
        text: String::new(),
        style: last_style,
    });
    out
}

struct LineBuilder {
    layout: WrapLayout,
    line_words: usize,
    x: f64,
    top: f64,
}

impl LineBuilder {
    fn place(&mut self, piece: Piece, metrics: WordMetrics) {
        let line = self.layout.lines.len();
        self.layout.words.push(WrappedWord {
            start: piece.start,
            end: piece.end,
            text: piece.text,
            style: piece.style,
            line,
            left: self.x,
            top: self.top,
            metrics,
        });
        self.x += metrics.width;
        self.line_words += 1;
    }

    fn finish_line(&mut self) {
        if self.line_words == 0 {
            return;
        }
        let words = &self.layout.words[self.layout.words.len() - self.line_words..];
        let height = words
            .iter()
            .map(|word| word.metrics.height)
            .fold(0.0, f64::max);
        let ascent = words
            .iter()
            .map(|word| word.metrics.ascent)
            .fold(0.0, f64::max);
        let start = words.first().map(|word| word.start).unwrap_or(0);
        let end = words.last().map(|word| word.end).unwrap_or(start);
        self.layout.lines.push(WrappedLine {
            start,
            end,
            top: self.top,
            width: self.x,
            height,
            ascent,
        });
        self.top += height;
        self.x = 0.0;
        self.line_words = 0;
    }
}

/// Lays `runs` out into lines no wider than `width` where possible.
///
/// Spaces hang past the right edge, a newline always ends its line, and a
/// word wider than `width` is placed alone on its own line.
pub fn wrap(
    runs: &[Run],
    width: f64,
    measurer: &dyn Measurer,
    cache: &mut MetricsCache,
) -> WrapLayout {
    let mut measured: Vec<(Piece, WordMetrics)> = pieces(runs)
        .into_iter()
        .map(|piece| {
            let metrics = match piece.kind {
                PieceKind::Word | PieceKind::Space => {
                    let key = MetricsKey::new(&piece.text, piece.style.as_ref());
                    cache.get_or_insert_with(key, || {
                        measurer.measure(&piece.text, piece.style.as_ref())
                    })
                }
                PieceKind::Newline | PieceKind::Eof => WordMetrics {
                    width: 0.0,
                    ..measurer.measure("", piece.style.as_ref())
                },
            };
            (piece, metrics)
        })
        .collect();
    measured.reverse();

    let mut builder = LineBuilder {
        layout: WrapLayout::default(),
        line_words: 0,
        x: 0.0,
        top: 0.0,
    };
    while let Some((piece, metrics)) = measured.pop() {
        match piece.kind {
            PieceKind::Space | PieceKind::Eof => builder.place(piece, metrics),
            PieceKind::Newline => {
                builder.place(piece, metrics);
                builder.finish_line();
            }
            PieceKind::Word => {
                // a word continues across style changes until a break piece
                let mut group = vec![(piece, metrics)];
                while let Some((next, _)) = measured.last() {
                    if next.kind != PieceKind::Word {
                        break;
                    }
                    if let Some(item) = measured.pop() {
                        group.push(item);
                    }
                }
                let group_width: f64 = group.iter().map(|(_, metrics)| metrics.width).sum();
                if builder.line_words > 0 && builder.x + group_width > width {
                    builder.finish_line();
                }
                for (piece, metrics) in group {
                    builder.place(piece, metrics);
                }
            }
        }
    }
    builder.finish_line();
    builder.layout
}
