use crate::highlights::{HighlightColor, HighlightId, HighlightInterval};
use crate::tokenizer::{self, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    Plain,
    Highlighted {
        id: HighlightId,
        color: HighlightColor,
    },
}

/// A contiguous slice of segment content, covering chars `start..end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayRun {
    pub kind: RunKind,
    pub text: String,
    pub start: usize,
    pub end: usize,
}

impl DisplayRun {
    pub fn is_highlighted(&self) -> bool {
        matches!(self.kind, RunKind::Highlighted { .. })
    }

    pub fn highlight_id(&self) -> Option<HighlightId> {
        match self.kind {
            RunKind::Highlighted { id, .. } => Some(id),
            RunKind::Plain => None,
        }
    }

    pub fn tokens(&self) -> Vec<Token<'_>> {
        tokenizer::tokenize(&self.text)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overlay {
    pub runs: Vec<DisplayRun>,
    /// Intervals left out of rendering: out of range, empty, or overlapping
    /// an earlier interval. They stay in the store untouched.
    pub excluded: Vec<HighlightId>,
}

impl Overlay {
    pub fn plain_text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

/// Char index to byte index table for `content`, with a trailing entry for
/// the end of the string.
struct CharBounds<'a> {
    content: &'a str,
    bounds: Vec<usize>,
}

impl<'a> CharBounds<'a> {
    fn new(content: &'a str) -> Self {
        let bounds = content
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(content.len()))
            .collect();
        Self { content, bounds }
    }

    fn char_len(&self) -> usize {
        self.bounds.len() - 1
    }

    fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.content[self.bounds[start]..self.bounds[end]]
    }
}

/// Lays `intervals` over `content`. Intervals are applied in start order (ties
/// keep their given order); the first interval to claim a char wins and any
/// later interval starting inside a claimed range is excluded.
pub fn render_overlay(content: &str, intervals: &[HighlightInterval]) -> Overlay {
    let chars = CharBounds::new(content);
    let len = chars.char_len();

    let mut sorted: Vec<&HighlightInterval> = intervals.iter().collect();
    sorted.sort_by_key(|h| h.start_offset);

    let mut overlay = Overlay::default();
    let mut cursor = 0;

    for interval in sorted {
        let start = interval.start_offset;
        let end = interval.end_offset.min(len);

        if start > len || start < cursor || end <= start {
            log::trace!(
                "Excluding highlight {} ({}..{}) at cursor {cursor}, content length {len}",
                interval.id,
                interval.start_offset,
                interval.end_offset
            );
            overlay.excluded.push(interval.id);
            continue;
        }

        if start > cursor {
            overlay.runs.push(DisplayRun {
                kind: RunKind::Plain,
                text: chars.slice(cursor, start).to_string(),
                start: cursor,
                end: start,
            });
        }

        overlay.runs.push(DisplayRun {
            kind: RunKind::Highlighted {
                id: interval.id,
                color: interval.color,
            },
            text: chars.slice(start, end).to_string(),
            start,
            end,
        });
        cursor = end;
    }

    if cursor < len {
        overlay.runs.push(DisplayRun {
            kind: RunKind::Plain,
            text: chars.slice(cursor, len).to_string(),
            start: cursor,
            end: len,
        });
    }

    overlay
}

pub fn render_runs(content: &str, intervals: &[HighlightInterval]) -> Vec<DisplayRun> {
    render_overlay(content, intervals).runs
}
