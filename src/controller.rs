use log::debug;
use serde_json::{Map, Value};

use crate::offset_mapper::{self, MappingError};
use crate::segments::{SegmentId, SegmentSource, TextId};
use crate::surface::{AnchorPosition, SelectionSurface};
use crate::tutor::{TutorRequest, TutorSuggestion};
use crate::tutor_worker::{RequestId, TutorDispatch, TutorResponse};

/// The pending selection behind the popover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionContext {
    pub segment_id: SegmentId,
    pub reference: String,
    pub raw_text: String,
    pub start_offset: usize,
    pub end_offset: usize,
    pub anchor_position: Option<AnchorPosition>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectionState {
    Idle,
    AwaitingAction {
        context: SelectionContext,
    },
    Requesting {
        context: SelectionContext,
        request: RequestId,
    },
    Resolved {
        context: SelectionContext,
        suggestion: TutorSuggestion,
    },
    Failed {
        context: SelectionContext,
        detail: String,
    },
}

impl SelectionState {
    pub fn context(&self) -> Option<&SelectionContext> {
        match self {
            SelectionState::Idle => None,
            SelectionState::AwaitingAction { context }
            | SelectionState::Requesting { context, .. }
            | SelectionState::Resolved { context, .. }
            | SelectionState::Failed { context, .. } => Some(context),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SelectionState::Idle => "idle",
            SelectionState::AwaitingAction { .. } => "awaiting-action",
            SelectionState::Requesting { .. } => "requesting",
            SelectionState::Resolved { .. } => "resolved",
            SelectionState::Failed { .. } => "failed",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, SelectionState::Idle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearReason {
    Closed,
    Scrolled,
    Navigated,
    FeatureDisabled,
    Saved,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionOutcome {
    /// Tutor suggestions are switched off; the selection was not examined.
    Disabled,
    /// The selection could not be mapped. Nothing changed.
    Ignored(MappingError),
    Selected,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AskOptions {
    pub language: Option<String>,
    pub translation_draft: Option<String>,
    pub metadata: Map<String, Value>,
}

/// Owns the selection → suggestion flow:
/// `Idle → AwaitingAction → Requesting → Resolved | Failed → Idle`.
///
/// Mapping happens synchronously inside [`SelectionController::on_selection`].
/// Tutor responses are matched against the id of the request currently
/// awaited; anything else is a stale answer and is dropped.
#[derive(Debug)]
pub struct SelectionController {
    enabled: bool,
    state: SelectionState,
    next_request_id: u64,
}

impl SelectionController {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            state: SelectionState::Idle,
            next_request_id: 1,
        }
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn context(&self) -> Option<&SelectionContext> {
        self.state.context()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_popover_visible(&self) -> bool {
        !self.state.is_idle()
    }

    pub fn on_selection(
        &mut self,
        surface: &dyn SelectionSurface,
        segments: &dyn SegmentSource,
    ) -> SelectionOutcome {
        if !self.enabled {
            return SelectionOutcome::Disabled;
        }

        let mapped = match offset_mapper::map_selection(surface, segments) {
            Ok(mapped) => mapped,
            Err(e) => {
                debug!("Selection ignored: {e}");
                return SelectionOutcome::Ignored(e);
            }
        };

        // The new selection supersedes whatever was pending, including an
        // in-flight request. The surface keeps its live selection: it is the
        // one being shown.
        if !self.state.is_idle() {
            debug!("Selection superseded in state {}", self.state.name());
        }

        debug!(
            "Selected {}..{} in segment {} ({})",
            mapped.start, mapped.end, mapped.segment_id, mapped.reference
        );
        self.state = SelectionState::AwaitingAction {
            context: SelectionContext {
                segment_id: mapped.segment_id,
                reference: mapped.reference,
                raw_text: mapped.text,
                start_offset: mapped.start,
                end_offset: mapped.end,
                anchor_position: surface.anchor_position(),
            },
        };
        SelectionOutcome::Selected
    }

    /// Explicit "ask" action. Valid while awaiting an action, and from a
    /// failed request as a retry. Returns the request to send.
    pub fn ask(
        &mut self,
        text_id: TextId,
        default_language: &str,
        options: AskOptions,
    ) -> Option<TutorDispatch> {
        let context = match &self.state {
            SelectionState::AwaitingAction { context } | SelectionState::Failed { context, .. } => {
                context.clone()
            }
            _ => return None,
        };

        let id = RequestId::new(self.next_request_id);
        self.next_request_id += 1;

        let mut metadata = options.metadata;
        metadata
            .entry("reference")
            .or_insert_with(|| Value::from(context.reference.clone()));

        let request = TutorRequest {
            text_id,
            segment_id: context.segment_id,
            selection: context.raw_text.clone(),
            translation_draft: options.translation_draft,
            language: Some(
                options
                    .language
                    .unwrap_or_else(|| default_language.to_string()),
            ),
            metadata,
        };

        debug!(
            "Requesting tutor suggestion {} for segment {}",
            id.0, context.segment_id
        );
        self.state = SelectionState::Requesting {
            context,
            request: id,
        };
        Some(TutorDispatch { id, request })
    }

    /// Re-sends the request for a failed selection.
    pub fn retry(
        &mut self,
        text_id: TextId,
        default_language: &str,
        options: AskOptions,
    ) -> Option<TutorDispatch> {
        if !matches!(self.state, SelectionState::Failed { .. }) {
            return None;
        }
        self.ask(text_id, default_language, options)
    }

    /// Applies a tutor response. Returns false, changing nothing, when the
    /// response is not for the request currently awaited.
    pub fn apply_response(&mut self, response: TutorResponse) -> bool {
        let context = match &self.state {
            SelectionState::Requesting { context, request } if *request == response.id => {
                context.clone()
            }
            _ => {
                debug!(
                    "Discarding stale tutor response {} in state {}",
                    response.id.0,
                    self.state.name()
                );
                return false;
            }
        };

        self.state = match response.result {
            Ok(suggestion) => SelectionState::Resolved {
                context,
                suggestion,
            },
            Err(e) => SelectionState::Failed {
                context,
                detail: e.to_string(),
            },
        };
        true
    }

    /// Returns to `Idle` and collapses the surface selection. Clearing an
    /// idle controller does nothing.
    pub fn clear(&mut self, surface: &mut dyn SelectionSurface, reason: ClearReason) -> bool {
        if self.state.is_idle() {
            return false;
        }
        debug!(
            "Clearing selection in state {} ({reason:?})",
            self.state.name()
        );
        self.state = SelectionState::Idle;
        surface.collapse();
        true
    }

    pub fn set_enabled(&mut self, enabled: bool, surface: &mut dyn SelectionSurface) {
        let was_enabled = self.enabled;
        self.enabled = enabled;
        if was_enabled && !enabled {
            self.clear(surface, ClearReason::FeatureDisabled);
        }
    }
}
