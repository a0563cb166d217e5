//! Personal notes attached to a word of a segment.
//!
//! Notes live next to highlights in the annotation store but never touch a
//! highlight interval: a highlight is immutable once stored, a note's text
//! can be edited.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::highlights::{DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
use crate::segments::{Segment, SegmentId, TextId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(pub u64);

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NoteError {
    #[error("a note needs a word")]
    EmptyWord,

    #[error("note text is empty")]
    EmptyNote,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordNote {
    pub id: NoteId,
    pub text_id: TextId,
    pub segment_id: SegmentId,
    pub word: String,
    pub note: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A note checked for content but not yet stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNote {
    pub text_id: TextId,
    pub segment_id: SegmentId,
    pub word: String,
    pub note: String,
}

impl NewNote {
    pub fn new(
        text_id: TextId,
        segment: &Segment,
        word: &str,
        note: &str,
    ) -> Result<Self, NoteError> {
        let word = word.trim();
        if word.is_empty() {
            return Err(NoteError::EmptyWord);
        }
        Ok(Self {
            text_id,
            segment_id: segment.id,
            word: word.to_string(),
            note: validate_note(note)?,
        })
    }
}

/// Trims `note` and rejects it when nothing is left.
pub fn validate_note(note: &str) -> Result<String, NoteError> {
    let note = note.trim();
    if note.is_empty() {
        return Err(NoteError::EmptyNote);
    }
    Ok(note.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteFilter {
    pub text_id: Option<TextId>,
    pub segment_id: Option<SegmentId>,
    pub word: Option<String>,
    pub skip: usize,
    pub limit: usize,
}

impl Default for NoteFilter {
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

impl NoteFilter {
    pub fn for_word(text_id: TextId, word: &str) -> Self {
        Self {
            text_id: Some(text_id),
            word: Some(word.to_string()),
            limit: MAX_LIST_LIMIT,
            ..Self::default()
        }
    }

    pub fn matches(&self, note: &WordNote) -> bool {
        self.text_id.is_none_or(|id| note.text_id == id)
            && self.segment_id.is_none_or(|id| note.segment_id == id)
            && self.word.as_deref().is_none_or(|w| note.word == w)
    }

    pub fn effective_limit(&self) -> usize {
        self.limit.clamp(1, MAX_LIST_LIMIT)
    }
}
