//! The reading view of one text: confirmed highlights, the selection flow,
//! the word panel and highlight deletion, wired to an annotation store.

use anyhow::{Context, Result, bail};
use log::{debug, info, warn};
use serde_json::{Map, Value};

use crate::controller::{AskOptions, ClearReason, SelectionController, SelectionOutcome};
use crate::highlights::{
    AnnotationStore, HighlightColor, HighlightFilter, HighlightId, HighlightInterval,
    HighlightSet, MAX_LIST_LIMIT, NewHighlight,
};
use crate::notes::{self, NewNote, NoteFilter, NoteId, WordNote};
use crate::overlay::{DisplayRun, Overlay, render_overlay};
use crate::segments::{SegmentId, SegmentList, SegmentSource, TextInfo};
use crate::surface::{ClickTarget, NodeId, RenderTree, SelectionSurface};
use crate::tokenizer::{self, Token};
use crate::tutor_worker::{TutorDispatch, TutorResponse};
use crate::word_panel::WordPanel;

pub struct Reader {
    segments: SegmentList,
    highlights: HighlightSet,
    store: Box<dyn AnnotationStore>,
    controller: SelectionController,
    word_panel: WordPanel,
    pending_deletion: Option<HighlightId>,
    language: String,
}

impl Reader {
    /// Opens `segments` for reading and loads the text's highlights from
    /// `store`.
    pub fn open(
        segments: SegmentList,
        store: Box<dyn AnnotationStore>,
        tutor_enabled: bool,
        language: impl Into<String>,
    ) -> Result<Self> {
        let mut reader = Self {
            segments,
            highlights: HighlightSet::new(),
            store,
            controller: SelectionController::new(tutor_enabled),
            word_panel: WordPanel::new(),
            pending_deletion: None,
            language: language.into(),
        };
        reader.refresh_highlights()?;
        info!(
            "Opened {} ({} segments, {} highlights)",
            reader.text().urn,
            reader.segments.segments().len(),
            reader.highlights.len()
        );
        Ok(reader)
    }

    pub fn text(&self) -> &TextInfo {
        self.segments.text()
    }

    pub fn segments(&self) -> &SegmentList {
        &self.segments
    }

    pub fn highlights(&self) -> &HighlightSet {
        &self.highlights
    }

    pub fn controller(&self) -> &SelectionController {
        &self.controller
    }

    pub fn word_panel(&self) -> &WordPanel {
        &self.word_panel
    }

    pub fn word_panel_mut(&mut self) -> &mut WordPanel {
        &mut self.word_panel
    }

    pub fn pending_deletion(&self) -> Option<&HighlightInterval> {
        self.pending_deletion.and_then(|id| self.highlights.get(id))
    }

    pub fn overlay(&self, segment_id: SegmentId) -> Option<Overlay> {
        let segment = self.segments.segment(segment_id)?;
        Some(render_overlay(
            &segment.content,
            self.highlights.for_segment(segment_id),
        ))
    }

    pub fn runs(&self, segment_id: SegmentId) -> Vec<DisplayRun> {
        self.overlay(segment_id)
            .map(|overlay| overlay.runs)
            .unwrap_or_default()
    }

    /// Builds the render tree for every segment in reading order.
    pub fn render(&self) -> RenderTree {
        let mut tree = RenderTree::new();
        for segment in self.segments.segments() {
            tree.push_segment(segment, &self.runs(segment.id));
        }
        tree
    }

    pub fn on_selection(&mut self, surface: &dyn SelectionSurface) -> SelectionOutcome {
        self.controller.on_selection(surface, &self.segments)
    }

    pub fn on_scroll(&mut self, surface: &mut dyn SelectionSurface) -> bool {
        self.controller.clear(surface, ClearReason::Scrolled)
    }

    pub fn on_navigate(&mut self, surface: &mut dyn SelectionSurface) -> bool {
        self.pending_deletion = None;
        self.controller.clear(surface, ClearReason::Navigated)
    }

    pub fn close_selection(&mut self, surface: &mut dyn SelectionSurface) -> bool {
        self.controller.clear(surface, ClearReason::Closed)
    }

    pub fn set_tutor_enabled(&mut self, enabled: bool, surface: &mut dyn SelectionSurface) {
        self.controller.set_enabled(enabled, surface);
    }

    pub fn ask_tutor(
        &mut self,
        metadata: Map<String, Value>,
        translation_draft: Option<String>,
    ) -> Option<TutorDispatch> {
        let text_id = self.text().id;
        let language = self.language.clone();
        self.controller.ask(
            text_id,
            &language,
            AskOptions {
                language: None,
                translation_draft,
                metadata,
            },
        )
    }

    pub fn apply_tutor_response(&mut self, response: TutorResponse) -> bool {
        self.controller.apply_response(response)
    }

    /// Reports a click on a rendered token. Returns the word shown in the word
    /// panel, if the token carried one.
    pub fn on_word_click(&mut self, token: &Token<'_>) -> Option<String> {
        let mut clicked = None;
        tokenizer::report_word_click(token, |word| clicked = Some(word.to_string()));
        if let Some(word) = &clicked {
            self.word_panel.select_word(word.as_str());
        }
        clicked
    }

    /// Dispatches a click on `node` of `tree`. A click on a word opens the
    /// word panel; a click on a highlight run outside its words asks to
    /// delete that highlight.
    pub fn on_click(&mut self, tree: &RenderTree, node: NodeId) -> Option<String> {
        match tree.click_target(node)? {
            ClickTarget::Word(text) => {
                let word = tokenizer::clicked_word(&text)?;
                self.word_panel.select_word(word);
                Some(word.to_string())
            }
            ClickTarget::Highlight(id) => {
                self.request_deletion(id);
                None
            }
        }
    }

    /// Stores the current selection as a highlight. The interval set is only
    /// updated from the store after the write succeeds.
    pub fn save_selection(
        &mut self,
        color: HighlightColor,
        surface: &mut dyn SelectionSurface,
    ) -> Result<HighlightInterval> {
        let Some(context) = self.controller.context() else {
            bail!("No selection to save");
        };
        let segment = self
            .segments
            .segment(context.segment_id)
            .with_context(|| format!("Segment {} is not loaded", context.segment_id))?;
        let new_highlight = NewHighlight::for_range(
            self.text().id,
            segment,
            context.start_offset,
            context.end_offset,
            color,
        )?;

        let stored = self
            .store
            .create_highlight(new_highlight)
            .context("Failed to save highlight")?;
        // The write is confirmed, so the selection must not be saved twice
        self.controller.clear(surface, ClearReason::Saved);
        if let Err(e) = self.refresh_highlights() {
            warn!("Saved highlight {} but could not reload highlights: {e:#}", stored.id);
        }
        Ok(stored)
    }

    /// Asks for confirmation before deleting `id`. Returns false for an id
    /// that is not among the current highlights.
    pub fn request_deletion(&mut self, id: HighlightId) -> bool {
        if self.highlights.get(id).is_none() {
            debug!("Ignoring deletion request for unknown highlight {id}");
            return false;
        }
        self.pending_deletion = Some(id);
        true
    }

    pub fn cancel_deletion(&mut self) -> bool {
        self.pending_deletion.take().is_some()
    }

    /// Deletes the highlight awaiting confirmation, if any.
    pub fn confirm_deletion(&mut self) -> Result<Option<HighlightId>> {
        let Some(id) = self.pending_deletion.take() else {
            return Ok(None);
        };
        if let Err(e) = self.store.delete_highlight(id) {
            warn!("Failed to delete highlight {id}: {e:#}");
            return Err(e.context(format!("Failed to delete highlight {id}")));
        }
        self.refresh_highlights()?;
        Ok(Some(id))
    }

    /// Attaches a note to `word` of segment `segment_id`.
    pub fn add_note(
        &mut self,
        segment_id: SegmentId,
        word: &str,
        note: &str,
    ) -> Result<WordNote> {
        let segment = self
            .segments
            .segment(segment_id)
            .with_context(|| format!("Segment {segment_id} is not loaded"))?;
        let new_note = NewNote::new(self.text().id, segment, word, note)?;
        self.store.create_note(new_note).context("Failed to save note")
    }

    pub fn update_note(&mut self, id: NoteId, note: &str) -> Result<WordNote> {
        let note = notes::validate_note(note)?;
        self.store
            .update_note(id, note)
            .with_context(|| format!("Failed to update note {id}"))
    }

    pub fn delete_note(&mut self, id: NoteId) -> Result<()> {
        self.store
            .delete_note(id)
            .with_context(|| format!("Failed to delete note {id}"))
    }

    /// Notes on the word shown in the word panel, newest first.
    pub fn notes_for_panel_word(&self) -> Result<Vec<WordNote>> {
        let Some(word) = self.word_panel.word() else {
            return Ok(Vec::new());
        };
        self.store
            .list_notes(&NoteFilter::for_word(self.text().id, word))
            .context("Failed to load notes")
    }

    /// Replaces the interval set with the store's current list for this text.
    pub fn refresh_highlights(&mut self) -> Result<()> {
        let mut intervals = Vec::new();
        let mut filter = HighlightFilter::for_text(self.text().id);
        loop {
            let page = self
                .store
                .list_highlights(&filter)
                .context("Failed to load highlights")?;
            let count = page.len();
            intervals.extend(page);
            if count < MAX_LIST_LIMIT {
                break;
            }
            filter.skip += count;
        }
        debug!("Loaded {} highlights for text {}", intervals.len(), self.text().id);
        self.highlights.replace_all(intervals);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::SelectionState;
    use crate::overlay::RunKind;
    use crate::segments::{Segment, TextId};
    use crate::surface::TreeSurface;
    use crate::tutor::TutorSuggestion;
    use anyhow::anyhow;
    use chrono::Utc;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct MemoryStoreState {
        highlights: Vec<HighlightInterval>,
        notes: Vec<WordNote>,
        next_id: u64,
        fail_writes: bool,
        fail_lists: bool,
        list_calls: usize,
    }

    /// In-memory store whose state the test keeps a handle to.
    #[derive(Clone, Default)]
    struct MemoryStore(Rc<RefCell<MemoryStoreState>>);

    impl AnnotationStore for MemoryStore {
        fn create_highlight(&mut self, highlight: NewHighlight) -> Result<HighlightInterval> {
            let mut state = self.0.borrow_mut();
            if state.fail_writes {
                return Err(anyhow!("disk full"));
            }
            state.next_id += 1;
            let interval = HighlightInterval {
                id: HighlightId(state.next_id),
                text_id: highlight.text_id,
                segment_id: highlight.segment_id,
                start_offset: highlight.start_offset,
                end_offset: highlight.end_offset,
                selected_text: highlight.selected_text,
                color: highlight.color,
                created_at: Utc::now(),
            };
            state.highlights.push(interval.clone());
            Ok(interval)
        }

        fn delete_highlight(&mut self, id: HighlightId) -> Result<()> {
            let mut state = self.0.borrow_mut();
            if state.fail_writes {
                return Err(anyhow!("disk full"));
            }
            let before = state.highlights.len();
            state.highlights.retain(|h| h.id != id);
            if state.highlights.len() == before {
                return Err(anyhow!("Highlight not found"));
            }
            Ok(())
        }

        fn list_highlights(&self, filter: &HighlightFilter) -> Result<Vec<HighlightInterval>> {
            let mut state = self.0.borrow_mut();
            state.list_calls += 1;
            if state.fail_lists {
                return Err(anyhow!("connection reset"));
            }
            Ok(state
                .highlights
                .iter()
                .filter(|h| filter.matches(h))
                .skip(filter.skip)
                .take(filter.effective_limit())
                .cloned()
                .collect())
        }

        fn create_note(&mut self, note: NewNote) -> Result<WordNote> {
            let mut state = self.0.borrow_mut();
            if state.fail_writes {
                return Err(anyhow!("disk full"));
            }
            let stored = WordNote {
                id: NoteId(state.notes.len() as u64 + 1),
                text_id: note.text_id,
                segment_id: note.segment_id,
                word: note.word,
                note: note.note,
                created_at: Utc::now(),
                updated_at: None,
            };
            state.notes.push(stored.clone());
            Ok(stored)
        }

        fn update_note(&mut self, id: NoteId, note: String) -> Result<WordNote> {
            let mut state = self.0.borrow_mut();
            let stored = state
                .notes
                .iter_mut()
                .find(|n| n.id == id)
                .ok_or_else(|| anyhow!("Note not found"))?;
            stored.note = note;
            stored.updated_at = Some(Utc::now());
            Ok(stored.clone())
        }

        fn delete_note(&mut self, id: NoteId) -> Result<()> {
            let mut state = self.0.borrow_mut();
            let before = state.notes.len();
            state.notes.retain(|n| n.id != id);
            if state.notes.len() == before {
                return Err(anyhow!("Note not found"));
            }
            Ok(())
        }

        fn list_notes(&self, filter: &NoteFilter) -> Result<Vec<WordNote>> {
            let state = self.0.borrow();
            Ok(state
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

    fn segments() -> SegmentList {
        SegmentList::new(
            TextInfo {
                id: TextId(1),
                urn: "urn:cts:greekLit:tlg0012.tlg001".to_string(),
                title: "Iliad".to_string(),
                author: "Homer".to_string(),
                language: "grc".to_string(),
            },
            vec![
                Segment {
                    id: SegmentId(10),
                    reference: "1.1".to_string(),
                    content: "μῆνιν ἄειδε θεὰ".to_string(),
                    sequence: 1,
                },
                Segment {
                    id: SegmentId(11),
                    reference: "1.2".to_string(),
                    content: "οὐλομένην, ἣ μυρί᾽ Ἀχαιοῖς ἄλγε᾽ ἔθηκε,".to_string(),
                    sequence: 2,
                },
            ],
        )
    }

    fn open(store: &MemoryStore) -> (Reader, TreeSurface) {
        let reader = Reader::open(segments(), Box::new(store.clone()), true, "grc").unwrap();
        let surface = TreeSurface::new(reader.render());
        (reader, surface)
    }

    fn select(reader: &mut Reader, surface: &mut TreeSurface, start: usize, end: usize) {
        assert!(surface.select_content(SegmentId(10), start, end));
        assert_eq!(reader.on_selection(surface), SelectionOutcome::Selected);
    }

    #[test]
    fn test_save_selection_refreshes_from_store_and_clears() {
        let store = MemoryStore::default();
        let (mut reader, mut surface) = open(&store);
        select(&mut reader, &mut surface, 0, 5);

        let saved = reader
            .save_selection(HighlightColor::Green, &mut surface)
            .unwrap();
        assert_eq!(saved.selected_text, "μῆνιν");
        assert_eq!(reader.highlights().len(), 1);
        assert!(reader.controller().state().is_idle());
        assert!(!surface.has_selection());

        let runs = reader.runs(SegmentId(10));
        assert_eq!(runs.len(), 2);
        assert_eq!(
            runs[0].kind,
            RunKind::Highlighted {
                id: saved.id,
                color: HighlightColor::Green
            }
        );
        assert_eq!(runs[1].text, " ἄειδε θεὰ");
    }

    #[test]
    fn test_failed_write_leaves_intervals_untouched() {
        let store = MemoryStore::default();
        let (mut reader, mut surface) = open(&store);
        select(&mut reader, &mut surface, 0, 5);
        reader.save_selection(HighlightColor::Yellow, &mut surface).unwrap();

        select(&mut reader, &mut surface, 6, 11);
        store.0.borrow_mut().fail_writes = true;
        let list_calls = store.0.borrow().list_calls;

        let err = reader
            .save_selection(HighlightColor::Yellow, &mut surface)
            .unwrap_err();
        assert!(format!("{err:#}").contains("disk full"));
        assert_eq!(reader.highlights().len(), 1);
        assert_eq!(store.0.borrow().list_calls, list_calls);
        // The selection stays so the user can try again
        assert_eq!(reader.controller().state().name(), "awaiting-action");
    }

    #[test]
    fn test_confirmed_save_clears_selection_even_if_reload_fails() {
        let store = MemoryStore::default();
        let (mut reader, mut surface) = open(&store);
        select(&mut reader, &mut surface, 0, 5);
        store.0.borrow_mut().fail_lists = true;

        let saved = reader
            .save_selection(HighlightColor::Blue, &mut surface)
            .unwrap();
        assert_eq!(saved.selected_text, "μῆνιν");
        assert!(reader.controller().state().is_idle());
        assert!(!surface.has_selection());

        // Nothing left to save twice
        assert!(reader.save_selection(HighlightColor::Blue, &mut surface).is_err());
        assert_eq!(store.0.borrow().highlights.len(), 1);
    }

    #[test]
    fn test_save_without_selection_fails() {
        let store = MemoryStore::default();
        let (mut reader, mut surface) = open(&store);
        assert!(reader.save_selection(HighlightColor::Yellow, &mut surface).is_err());
        assert!(store.0.borrow().highlights.is_empty());
    }

    #[test]
    fn test_deletion_requires_confirmation() {
        let store = MemoryStore::default();
        let (mut reader, mut surface) = open(&store);
        select(&mut reader, &mut surface, 0, 5);
        let saved = reader.save_selection(HighlightColor::Yellow, &mut surface).unwrap();

        assert!(reader.request_deletion(saved.id));
        assert_eq!(reader.pending_deletion().map(|h| h.id), Some(saved.id));
        assert!(reader.cancel_deletion());
        assert_eq!(store.0.borrow().highlights.len(), 1);
        assert_eq!(reader.confirm_deletion().unwrap(), None);

        assert!(reader.request_deletion(saved.id));
        assert_eq!(reader.confirm_deletion().unwrap(), Some(saved.id));
        assert!(reader.highlights().is_empty());
        assert!(store.0.borrow().highlights.is_empty());
    }

    #[test]
    fn test_failed_delete_keeps_highlight() {
        let store = MemoryStore::default();
        let (mut reader, mut surface) = open(&store);
        select(&mut reader, &mut surface, 0, 5);
        let saved = reader.save_selection(HighlightColor::Yellow, &mut surface).unwrap();

        store.0.borrow_mut().fail_writes = true;
        reader.request_deletion(saved.id);
        assert!(reader.confirm_deletion().is_err());
        assert_eq!(reader.highlights().len(), 1);
    }

    #[test]
    fn test_request_deletion_of_unknown_id() {
        let store = MemoryStore::default();
        let (mut reader, _surface) = open(&store);
        assert!(!reader.request_deletion(HighlightId(99)));
        assert!(reader.pending_deletion().is_none());
    }

    #[test]
    fn test_word_click_inside_highlight_does_not_request_deletion() {
        let store = MemoryStore::default();
        let (mut reader, mut surface) = open(&store);
        select(&mut reader, &mut surface, 0, 5);
        let saved = reader.save_selection(HighlightColor::Yellow, &mut surface).unwrap();

        let tree = reader.render();
        let content = tree.content_node(SegmentId(10)).unwrap();
        let first_word = tree.text_nodes(content)[0];
        assert_eq!(reader.on_click(&tree, first_word), Some("μῆνιν".to_string()));
        assert_eq!(reader.word_panel().word(), Some("μῆνιν"));
        assert!(reader.pending_deletion().is_none());

        // The run element itself takes the deletion click
        let run = tree.children(content)[0];
        assert_eq!(reader.on_click(&tree, run), None);
        assert_eq!(reader.pending_deletion().map(|h| h.id), Some(saved.id));
    }

    #[test]
    fn test_click_on_space_inside_highlight_requests_deletion() {
        let store = MemoryStore::default();
        let (mut reader, mut surface) = open(&store);
        select(&mut reader, &mut surface, 0, 11);
        let saved = reader.save_selection(HighlightColor::Yellow, &mut surface).unwrap();

        let tree = reader.render();
        let content = tree.content_node(SegmentId(10)).unwrap();
        // μῆνιν, " ", ἄειδε inside the highlight
        let space = tree.text_nodes(content)[1];
        assert_eq!(reader.on_click(&tree, space), None);
        assert_eq!(reader.pending_deletion().map(|h| h.id), Some(saved.id));
        assert!(reader.word_panel().word().is_none());
    }

    #[test]
    fn test_word_click_strips_punctuation_and_resets_panel() {
        let store = MemoryStore::default();
        let (mut reader, _surface) = open(&store);
        reader
            .word_panel_mut()
            .switch_tab(crate::word_panel::PanelTab::Notes);

        let runs = reader.runs(SegmentId(11));
        let tokens = runs[0].tokens();
        assert_eq!(tokens[0].text, "οὐλομένην,");
        assert_eq!(reader.on_word_click(&tokens[0]), Some("οὐλομένην".to_string()));
        assert_eq!(reader.word_panel().tab(), crate::word_panel::PanelTab::Analysis);
        assert!(reader.word_panel().is_expanded());

        assert_eq!(reader.on_word_click(&tokens[1]), None);
        assert_eq!(reader.word_panel().word(), Some("οὐλομένην"));
    }

    #[test]
    fn test_notes_follow_the_panel_word() {
        let store = MemoryStore::default();
        let (mut reader, _surface) = open(&store);
        assert!(reader.notes_for_panel_word().unwrap().is_empty());

        reader.add_note(SegmentId(10), "μῆνιν", "wrath").unwrap();
        reader.add_note(SegmentId(10), "θεὰ", "goddess").unwrap();
        let later = reader.add_note(SegmentId(11), "μῆνιν", "cf. 1.1").unwrap();

        let runs = reader.runs(SegmentId(10));
        let tokens = runs[0].tokens();
        reader.on_word_click(&tokens[0]);
        let notes: Vec<String> = reader
            .notes_for_panel_word()
            .unwrap()
            .into_iter()
            .map(|n| n.note)
            .collect();
        assert_eq!(notes, vec!["cf. 1.1", "wrath"]);

        let edited = reader.update_note(later.id, " see 1.1 ").unwrap();
        assert_eq!(edited.note, "see 1.1");
        assert!(reader.update_note(later.id, "   ").is_err());
        reader.delete_note(later.id).unwrap();
        assert_eq!(reader.notes_for_panel_word().unwrap().len(), 1);
        // Highlights are untouched by notes
        assert!(reader.highlights().is_empty());
    }

    #[test]
    fn test_add_note_checks_segment_and_text() {
        let store = MemoryStore::default();
        let (mut reader, _surface) = open(&store);
        assert!(reader.add_note(SegmentId(99), "μῆνιν", "wrath").is_err());
        assert!(reader.add_note(SegmentId(10), "μῆνιν", "").is_err());
        assert!(store.0.borrow().notes.is_empty());
    }

    #[test]
    fn test_ask_tutor_uses_text_and_language() {
        let store = MemoryStore::default();
        let (mut reader, mut surface) = open(&store);
        select(&mut reader, &mut surface, 6, 15);

        let dispatch = reader
            .ask_tutor(Map::new(), Some("sing, goddess".to_string()))
            .unwrap();
        assert_eq!(dispatch.request.text_id, TextId(1));
        assert_eq!(dispatch.request.selection, "ἄειδε θεὰ");
        assert_eq!(dispatch.request.language.as_deref(), Some("grc"));

        assert!(reader.apply_tutor_response(TutorResponse {
            id: dispatch.id,
            result: Ok(TutorSuggestion {
                translation: "sing, goddess".to_string(),
                literal_gloss: None,
                rationale: "imperative".to_string(),
                confidence: 0.7,
                source_language: Some("grc".to_string()),
            }),
        }));
        assert!(matches!(
            reader.controller().state(),
            SelectionState::Resolved { .. }
        ));
    }

    #[test]
    fn test_scroll_and_navigation_clear() {
        let store = MemoryStore::default();
        let (mut reader, mut surface) = open(&store);
        select(&mut reader, &mut surface, 0, 5);
        assert!(reader.on_scroll(&mut surface));
        assert!(!reader.on_scroll(&mut surface));

        select(&mut reader, &mut surface, 0, 5);
        assert!(reader.on_navigate(&mut surface));
        assert!(reader.controller().state().is_idle());

        select(&mut reader, &mut surface, 0, 5);
        assert!(reader.close_selection(&mut surface));
    }

    #[test]
    fn test_disabled_tutor_ignores_selection() {
        let store = MemoryStore::default();
        let (mut reader, mut surface) = open(&store);
        reader.set_tutor_enabled(false, &mut surface);
        assert!(surface.select_content(SegmentId(10), 6, 15));
        assert_eq!(reader.on_selection(&surface), SelectionOutcome::Disabled);
        assert!(reader.ask_tutor(Map::new(), None).is_none());
    }

    #[test]
    fn test_refresh_pages_through_large_stores() {
        let store = MemoryStore::default();
        {
            let mut state = store.0.borrow_mut();
            for i in 0..(MAX_LIST_LIMIT as u64 + 20) {
                state.highlights.push(HighlightInterval {
                    id: HighlightId(i + 1),
                    text_id: TextId(1),
                    segment_id: SegmentId(10),
                    start_offset: 0,
                    end_offset: 5,
                    selected_text: "μῆνιν".to_string(),
                    color: HighlightColor::Yellow,
                    created_at: Utc::now(),
                });
            }
            state.next_id = MAX_LIST_LIMIT as u64 + 20;
        }
        let (reader, _surface) = open(&store);
        assert_eq!(reader.highlights().len(), MAX_LIST_LIMIT + 20);
        // Overlapping duplicates: only the first one renders
        let overlay = reader.overlay(SegmentId(10)).unwrap();
        assert_eq!(overlay.excluded.len(), MAX_LIST_LIMIT + 19);
    }

    #[test]
    fn test_render_covers_all_segments_in_order() {
        let store = MemoryStore::default();
        let (reader, _surface) = open(&store);
        let tree = reader.render();
        let root = tree.root();
        assert_eq!(tree.children(root).len(), 2);
        assert_eq!(tree.segment_node(SegmentId(10)), Some(tree.children(root)[0]));
        assert!(reader.runs(SegmentId(99)).is_empty());
    }
}
