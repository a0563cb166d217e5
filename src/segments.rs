use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentId(pub u64);

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TextId(pub u64);

impl fmt::Display for TextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One addressable unit of source text (a line or paragraph) with its citation label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub id: SegmentId,
    pub reference: String,
    pub content: String,
    pub sequence: u32,
}

impl Segment {
    /// Content length in chars, the unit every offset is expressed in.
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextInfo {
    pub id: TextId,
    pub urn: String,
    pub title: String,
    #[serde(default)]
    pub author: String,
    pub language: String,
}

/// Read-only access to the segments of the loaded text.
pub trait SegmentSource {
    fn segment(&self, id: SegmentId) -> Option<&Segment>;

    /// Segments in reading order.
    fn segments(&self) -> &[Segment];
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TextFile {
    text: TextInfo,
    segments: Vec<Segment>,
}

#[derive(Debug, Clone)]
pub struct SegmentList {
    text: TextInfo,
    segments: Vec<Segment>,
}

impl SegmentList {
    pub fn new(text: TextInfo, mut segments: Vec<Segment>) -> Self {
        segments.sort_by_key(|s| s.sequence);
        Self { text, segments }
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read text file {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Failed to parse text file {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let file: TextFile = serde_json::from_str(json)?;
        log::debug!(
            "Loaded text {} with {} segments",
            file.text.urn,
            file.segments.len()
        );
        Ok(Self::new(file.text, file.segments))
    }

    pub fn text(&self) -> &TextInfo {
        &self.text
    }
}

impl SegmentSource for SegmentList {
    fn segment(&self, id: SegmentId) -> Option<&Segment> {
        self.segments.iter().find(|s| s.id == id)
    }

    fn segments(&self) -> &[Segment] {
        &self.segments
    }
}
