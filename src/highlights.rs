use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::notes::{NewNote, NoteFilter, NoteId, WordNote};
use crate::segments::{Segment, SegmentId, TextId};

pub const DEFAULT_LIST_LIMIT: usize = 100;
pub const MAX_LIST_LIMIT: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HighlightId(pub u64);

impl fmt::Display for HighlightId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightColor {
    #[default]
    Yellow,
    Green,
    Blue,
    Pink,
}

impl HighlightColor {
    pub fn all() -> &'static [HighlightColor] {
        &[
            HighlightColor::Yellow,
            HighlightColor::Green,
            HighlightColor::Blue,
            HighlightColor::Pink,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HighlightColor::Yellow => "yellow",
            HighlightColor::Green => "green",
            HighlightColor::Blue => "blue",
            HighlightColor::Pink => "pink",
        }
    }
}

impl fmt::Display for HighlightColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for HighlightColor {
    type Err = HighlightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HighlightColor::all()
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| HighlightError::UnknownColor(s.to_string()))
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HighlightError {
    #[error("empty range {start}..{end}")]
    EmptyRange { start: usize, end: usize },

    #[error("range {start}..{end} exceeds segment length {len}")]
    OutOfBounds { start: usize, end: usize, len: usize },

    #[error("unknown highlight color '{0}'")]
    UnknownColor(String),
}

/// A persisted highlight over `[start_offset, end_offset)` chars of one segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightInterval {
    pub id: HighlightId,
    pub text_id: TextId,
    pub segment_id: SegmentId,
    pub start_offset: usize,
    pub end_offset: usize,
    pub selected_text: String,
    #[serde(default)]
    pub color: HighlightColor,
    pub created_at: DateTime<Utc>,
}

/// A highlight that has been validated against its segment but not yet stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHighlight {
    pub text_id: TextId,
    pub segment_id: SegmentId,
    pub start_offset: usize,
    pub end_offset: usize,
    pub selected_text: String,
    pub color: HighlightColor,
}

impl NewHighlight {
    /// Builds a highlight over `segment.content[start..end]`, taking the
    /// selected text from the content itself.
    pub fn for_range(
        text_id: TextId,
        segment: &Segment,
        start: usize,
        end: usize,
        color: HighlightColor,
    ) -> Result<Self, HighlightError> {
        if start >= end {
            return Err(HighlightError::EmptyRange { start, end });
        }
        let len = segment.char_len();
        if end > len {
            return Err(HighlightError::OutOfBounds { start, end, len });
        }

        let selected_text = segment.content.chars().skip(start).take(end - start).collect();
        Ok(Self {
            text_id,
            segment_id: segment.id,
            start_offset: start,
            end_offset: end,
            selected_text,
            color,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightFilter {
    pub text_id: Option<TextId>,
    pub segment_id: Option<SegmentId>,
    pub word: Option<String>,
    pub skip: usize,
    pub limit: usize,
}

impl Default for HighlightFilter {
    fn default() -> Self {
        Self {
            text_id: None,
            segment_id: None,
            word: None,
            skip: 0,
            limit: DEFAULT_LIST_LIMIT,
        }
    }
}

impl HighlightFilter {
    pub fn for_text(text_id: TextId) -> Self {
        Self {
            text_id: Some(text_id),
            limit: MAX_LIST_LIMIT,
            ..Self::default()
        }
    }

    pub fn matches(&self, highlight: &HighlightInterval) -> bool {
        self.text_id.is_none_or(|id| highlight.text_id == id)
            && self.segment_id.is_none_or(|id| highlight.segment_id == id)
            && self
                .word
                .as_deref()
                .is_none_or(|w| highlight.selected_text == w)
    }

    pub fn effective_limit(&self) -> usize {
        self.limit.clamp(1, MAX_LIST_LIMIT)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HighlightSummary {
    pub text_id: TextId,
    pub total: usize,
    /// Most highlighted selections with their counts, most frequent first.
    pub most_highlighted: Vec<(String, usize)>,
}

/// Persistence boundary for highlights and word notes. Callers refresh their
/// interval set from `list_highlights` after every successful write.
pub trait AnnotationStore {
    fn create_highlight(&mut self, highlight: NewHighlight) -> Result<HighlightInterval>;

    fn delete_highlight(&mut self, id: HighlightId) -> Result<()>;

    fn list_highlights(&self, filter: &HighlightFilter) -> Result<Vec<HighlightInterval>>;

    fn create_note(&mut self, note: NewNote) -> Result<WordNote>;

    /// Replaces the text of note `id` and stamps `updated_at`.
    fn update_note(&mut self, id: NoteId, note: String) -> Result<WordNote>;

    fn delete_note(&mut self, id: NoteId) -> Result<()>;

    /// Matching notes, most recently created first.
    fn list_notes(&self, filter: &NoteFilter) -> Result<Vec<WordNote>>;
}

/// The confirmed intervals of one text, grouped per segment in store order.
#[derive(Debug, Clone, Default)]
pub struct HighlightSet {
    by_segment: HashMap<SegmentId, Vec<HighlightInterval>>,
}

impl HighlightSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_intervals(intervals: Vec<HighlightInterval>) -> Self {
        let mut set = Self::new();
        set.replace_all(intervals);
        set
    }

    pub fn replace_all(&mut self, intervals: Vec<HighlightInterval>) {
        self.by_segment.clear();
        for interval in intervals {
            self.by_segment
                .entry(interval.segment_id)
                .or_default()
                .push(interval);
        }
    }

    pub fn for_segment(&self, segment_id: SegmentId) -> &[HighlightInterval] {
        self.by_segment
            .get(&segment_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn get(&self, id: HighlightId) -> Option<&HighlightInterval> {
        self.by_segment.values().flatten().find(|h| h.id == id)
    }

    pub fn len(&self) -> usize {
        self.by_segment.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
