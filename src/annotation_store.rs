use anyhow::{Context, Result, bail};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::highlights::{
    AnnotationStore, HighlightFilter, HighlightId, HighlightInterval, HighlightSummary,
    NewHighlight,
};
use crate::notes::{NewNote, NoteFilter, NoteId, WordNote};
use crate::segments::{TextId, TextInfo};

pub const ANNOTATIONS_DIR_ENV: &str = "LECTIO_ANNOTATIONS_DIR";

const SUMMARY_TOP_WORDS: usize = 10;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredAnnotations {
    #[serde(default)]
    next_id: u64,
    #[serde(default)]
    highlights: Vec<HighlightInterval>,
    #[serde(default)]
    next_note_id: u64,
    #[serde(default)]
    notes: Vec<WordNote>,
}

/// Highlights and word notes of a single text kept in a YAML file on disk.
///
/// The file is rewritten after every change; a failed write leaves the
/// in-memory list as it was before the call.
pub struct LocalAnnotationStore {
    pub file_path: PathBuf,
    text_id: TextId,
    data: StoredAnnotations,
}

impl LocalAnnotationStore {
    pub fn new(text: &TextInfo, annotations_dir: &Path) -> Result<Self> {
        if !annotations_dir.exists() {
            fs::create_dir_all(annotations_dir)
                .context("Failed to create annotations directory")?;
        }
        let text_hash = Self::compute_text_hash(&text.urn);
        let file_path = annotations_dir.join(format!("text_{text_hash}.yaml"));
        Self::new_with_path(file_path, text.id)
    }

    fn new_with_path(file_path: PathBuf, text_id: TextId) -> Result<Self> {
        let mut data = if file_path.exists() {
            Self::load_from_file(&file_path)?
        } else {
            StoredAnnotations::default()
        };

        // Files edited by hand may carry ids beyond the stored counter
        let max_id = data.highlights.iter().map(|h| h.id.0).max().unwrap_or(0);
        data.next_id = data.next_id.max(max_id + 1);
        let max_note_id = data.notes.iter().map(|n| n.id.0).max().unwrap_or(0);
        data.next_note_id = data.next_note_id.max(max_note_id + 1);

        Ok(Self {
            file_path,
            text_id,
            data,
        })
    }

    /// Directory for annotation files: `LECTIO_ANNOTATIONS_DIR`, then the
    /// configured directory, then the user's data directory.
    pub fn resolve_dir(configured: Option<&Path>) -> Result<PathBuf> {
        if let Ok(custom_dir) = std::env::var(ANNOTATIONS_DIR_ENV) {
            if !custom_dir.trim().is_empty() {
                return Ok(PathBuf::from(custom_dir));
            }
        }
        if let Some(dir) = configured {
            return Ok(dir.to_path_buf());
        }
        match dirs::data_dir() {
            Some(data_dir) => Ok(data_dir.join("lectio").join("annotations")),
            None => Ok(std::env::current_dir()
                .context("Could not determine current directory")?
                .join(".lectio_annotations")),
        }
    }

    pub fn text_id(&self) -> TextId {
        self.text_id
    }

    pub fn summarize(&self) -> HighlightSummary {
        // Counts in order of first appearance; the stable sort keeps that
        // order between selections with the same count.
        let mut positions: HashMap<&str, usize> = HashMap::new();
        let mut most_highlighted: Vec<(String, usize)> = Vec::new();
        for highlight in &self.data.highlights {
            let text = highlight.selected_text.as_str();
            match positions.get(text) {
                Some(&idx) => most_highlighted[idx].1 += 1,
                None => {
                    positions.insert(text, most_highlighted.len());
                    most_highlighted.push((text.to_string(), 1));
                }
            }
        }
        most_highlighted.sort_by(|a, b| b.1.cmp(&a.1));
        most_highlighted.truncate(SUMMARY_TOP_WORDS);

        HighlightSummary {
            text_id: self.text_id,
            total: self.data.highlights.len(),
            most_highlighted,
        }
    }

    fn compute_text_hash(urn: &str) -> String {
        let digest = md5::compute(urn.as_bytes());
        format!("{digest:x}")
    }

    fn load_from_file(file_path: &Path) -> Result<StoredAnnotations> {
        let content = fs::read_to_string(file_path).context("Failed to read annotations file")?;

        if content.trim().is_empty() {
            return Ok(StoredAnnotations::default());
        }

        serde_yaml::from_str(&content).context("Failed to parse annotations YAML")
    }

    fn save_to_disk(&self) -> Result<()> {
        let yaml = serde_yaml::to_string(&self.data).context("Failed to serialize annotations")?;

        fs::write(&self.file_path, yaml).context("Failed to write annotations file")?;

        Ok(())
    }
}

impl AnnotationStore for LocalAnnotationStore {
    fn create_highlight(&mut self, highlight: NewHighlight) -> Result<HighlightInterval> {
        if highlight.text_id != self.text_id {
            bail!(
                "Highlight for text {} does not belong to text {}",
                highlight.text_id,
                self.text_id
            );
        }
        if highlight.start_offset >= highlight.end_offset {
            bail!(
                "Empty highlight range {}..{}",
                highlight.start_offset,
                highlight.end_offset
            );
        }

        let interval = HighlightInterval {
            id: HighlightId(self.data.next_id),
            text_id: highlight.text_id,
            segment_id: highlight.segment_id,
            start_offset: highlight.start_offset,
            end_offset: highlight.end_offset,
            selected_text: highlight.selected_text,
            color: highlight.color,
            created_at: Utc::now(),
        };

        self.data.highlights.push(interval.clone());
        self.data.next_id += 1;
        if let Err(e) = self.save_to_disk() {
            self.data.highlights.pop();
            self.data.next_id -= 1;
            return Err(e);
        }

        log::debug!(
            "Stored highlight {} on segment {} ({}..{})",
            interval.id,
            interval.segment_id,
            interval.start_offset,
            interval.end_offset
        );
        Ok(interval)
    }

    fn delete_highlight(&mut self, id: HighlightId) -> Result<()> {
        let idx = self
            .data
            .highlights
            .iter()
            .position(|h| h.id == id)
            .context("Highlight not found")?;

        let removed = self.data.highlights.remove(idx);
        if let Err(e) = self.save_to_disk() {
            self.data.highlights.insert(idx, removed);
            return Err(e);
        }

        log::debug!("Deleted highlight {id}");
        Ok(())
    }

    fn list_highlights(&self, filter: &HighlightFilter) -> Result<Vec<HighlightInterval>> {
        Ok(self
            .data
            .highlights
            .iter()
            .filter(|h| filter.matches(h))
            .skip(filter.skip)
            .take(filter.effective_limit())
            .cloned()
            .collect())
    }

    fn create_note(&mut self, note: NewNote) -> Result<WordNote> {
        if note.text_id != self.text_id {
            bail!(
                "Note for text {} does not belong to text {}",
                note.text_id,
                self.text_id
            );
        }

        let stored = WordNote {
            id: NoteId(self.data.next_note_id),
            text_id: note.text_id,
            segment_id: note.segment_id,
            word: note.word,
            note: note.note,
            created_at: Utc::now(),
            updated_at: None,
        };

        self.data.notes.push(stored.clone());
        self.data.next_note_id += 1;
        if let Err(e) = self.save_to_disk() {
            self.data.notes.pop();
            self.data.next_note_id -= 1;
            return Err(e);
        }

        log::debug!("Stored note {} on '{}'", stored.id, stored.word);
        Ok(stored)
    }

    fn update_note(&mut self, id: NoteId, note: String) -> Result<WordNote> {
        let idx = self
            .data
            .notes
            .iter()
            .position(|n| n.id == id)
            .context("Note not found")?;

        let previous = self.data.notes[idx].clone();
        self.data.notes[idx].note = note;
        self.data.notes[idx].updated_at = Some(Utc::now());
        if let Err(e) = self.save_to_disk() {
            self.data.notes[idx] = previous;
            return Err(e);
        }

        Ok(self.data.notes[idx].clone())
    }

    fn delete_note(&mut self, id: NoteId) -> Result<()> {
        let idx = self
            .data
            .notes
            .iter()
            .position(|n| n.id == id)
            .context("Note not found")?;

        let removed = self.data.notes.remove(idx);
        if let Err(e) = self.save_to_disk() {
            self.data.notes.insert(idx, removed);
            return Err(e);
        }

        log::debug!("Deleted note {id}");
        Ok(())
    }

    fn list_notes(&self, filter: &NoteFilter) -> Result<Vec<WordNote>> {
        // Stored in creation order; newest first means walking backwards
        Ok(self
            .data
            .notes
            .iter()
            .rev()
            .filter(|n| filter.matches(n))
            .skip(filter.skip)
            .take(filter.effective_limit())
            .cloned()
            .collect())
    }
}
