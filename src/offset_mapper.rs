use crate::segments::{SegmentId, SegmentSource};
use crate::surface::SelectionSurface;

/// A selection resolved to chars `start..end` of one segment's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedSelection {
    pub segment_id: SegmentId,
    pub reference: String,
    pub start: usize,
    pub end: usize,
    pub text: String,
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum MappingError {
    #[error("nothing is selected")]
    NoSelection,

    #[error("selection is not inside a segment")]
    NoEnclosingSegment,

    #[error("selection spans more than one segment")]
    SpansSegments,

    #[error("selection is outside the content of segment {0}")]
    OutsideContent(SegmentId),

    #[error("segment {0} is not loaded")]
    UnknownSegment(SegmentId),

    #[error("selection {start}..{end} exceeds segment length {len}")]
    OutOfBounds { start: usize, end: usize, len: usize },
}

/// Maps the live selection of `surface` back to content offsets.
///
/// Offsets count only visible chars from the start of the segment's content,
/// so the result does not depend on which highlights happen to be rendered.
pub fn map_selection(
    surface: &dyn SelectionSurface,
    segments: &dyn SegmentSource,
) -> Result<MappedSelection, MappingError> {
    let (anchor, focus) = surface.selection_points().ok_or(MappingError::NoSelection)?;
    if anchor == focus {
        return Err(MappingError::NoSelection);
    }
    let text = surface.selection_text();
    if text.trim().is_empty() {
        return Err(MappingError::NoSelection);
    }

    let anchor_segment = surface.enclosing_segment(anchor.node);
    let focus_segment = surface.enclosing_segment(focus.node);
    let segment_id = anchor_segment
        .or(focus_segment)
        .ok_or(MappingError::NoEnclosingSegment)?;
    if anchor_segment != focus_segment {
        return Err(MappingError::SpansSegments);
    }

    let anchor_offset = surface.content_offset(segment_id, anchor);
    let focus_offset = surface.content_offset(segment_id, focus);
    let (Some(anchor_offset), Some(focus_offset)) = (anchor_offset, focus_offset) else {
        return Err(MappingError::OutsideContent(segment_id));
    };

    let start = anchor_offset.min(focus_offset);
    let end = start + text.chars().count();

    let segment = segments
        .segment(segment_id)
        .ok_or(MappingError::UnknownSegment(segment_id))?;
    let len = segment.char_len();
    if end > len {
        return Err(MappingError::OutOfBounds { start, end, len });
    }

    Ok(MappedSelection {
        segment_id,
        reference: segment.reference.clone(),
        start,
        end,
        text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlights::{HighlightColor, HighlightId, HighlightInterval};
    use crate::overlay::render_runs;
    use crate::segments::{Segment, SegmentList, TextId, TextInfo};
    use crate::surface::{DomPoint, RenderTree, TreeSurface};
    use chrono::Utc;

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
                    content: "μῆνιν ἄειδε θεὰ Πηληϊάδεω Ἀχιλῆος".to_string(),
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

    fn highlight(id: u64, segment: u64, start: usize, end: usize) -> HighlightInterval {
        HighlightInterval {
            id: HighlightId(id),
            text_id: TextId(1),
            segment_id: SegmentId(segment),
            start_offset: start,
            end_offset: end,
            selected_text: String::new(),
            color: HighlightColor::Yellow,
            created_at: Utc::now(),
        }
    }

    fn surface(list: &SegmentList, intervals: &[HighlightInterval]) -> TreeSurface {
        let mut tree = RenderTree::new();
        for seg in list.segments() {
            let own: Vec<HighlightInterval> = intervals
                .iter()
                .filter(|h| h.segment_id == seg.id)
                .cloned()
                .collect();
            tree.push_segment(seg, &render_runs(&seg.content, &own));
        }
        TreeSurface::new(tree)
    }

    #[test]
    fn test_maps_plain_selection() {
        let list = segments();
        let mut surface = surface(&list, &[]);
        surface.select_content(SegmentId(10), 6, 15);
        let mapped = map_selection(&surface, &list).unwrap();
        assert_eq!(
            mapped,
            MappedSelection {
                segment_id: SegmentId(10),
                reference: "1.1".to_string(),
                start: 6,
                end: 15,
                text: "ἄειδε θεὰ".to_string(),
            }
        );
    }

    #[test]
    fn test_backwards_drag_normalizes() {
        let list = segments();
        let mut surface = surface(&list, &[]);
        surface.select_content(SegmentId(10), 15, 6);
        let mapped = map_selection(&surface, &list).unwrap();
        assert_eq!((mapped.start, mapped.end), (6, 15));
    }

    #[test]
    fn test_offsets_stable_across_highlight_sets() {
        let list = segments();
        let sets: Vec<Vec<HighlightInterval>> = vec![
            vec![],
            vec![highlight(1, 10, 0, 5)],
            vec![highlight(1, 10, 3, 9), highlight(2, 10, 12, 20)],
            vec![highlight(3, 10, 0, 33)],
        ];
        for set in sets {
            let mut surface = surface(&list, &set);
            surface.select_content(SegmentId(10), 7, 25);
            let mapped = map_selection(&surface, &list).unwrap();
            assert_eq!((mapped.start, mapped.end), (7, 25));
            assert_eq!(mapped.text, "ειδε θεὰ Πηληϊάδεω");
        }
    }

    #[test]
    fn test_collapsed_selection_is_no_selection() {
        let list = segments();
        let mut surface = surface(&list, &[]);
        surface.select_content(SegmentId(10), 4, 4);
        assert_eq!(map_selection(&surface, &list), Err(MappingError::NoSelection));
    }

    #[test]
    fn test_whitespace_only_selection_is_no_selection() {
        let list = segments();
        let mut surface = surface(&list, &[]);
        surface.select_content(SegmentId(10), 5, 6);
        assert_eq!(map_selection(&surface, &list), Err(MappingError::NoSelection));
    }

    #[test]
    fn test_no_selection_at_all() {
        let list = segments();
        let surface = surface(&list, &[]);
        assert_eq!(map_selection(&surface, &list), Err(MappingError::NoSelection));
    }

    // Multi-segment selections are unsupported and fail silently for the user.
    #[test]
    fn test_cross_segment_selection_fails() {
        let list = segments();
        let mut surface = surface(&list, &[]);
        let tree = surface.tree().clone();
        let anchor = tree.content_point(SegmentId(10), 20).unwrap();
        let focus = tree.content_point(SegmentId(11), 5).unwrap();
        surface.select(anchor, focus);
        assert_eq!(map_selection(&surface, &list), Err(MappingError::SpansSegments));
    }

    #[test]
    fn test_selection_starting_in_reference_label_fails() {
        let list = segments();
        let mut surface = surface(&list, &[]);
        let tree = surface.tree().clone();
        let boundary = tree.segment_node(SegmentId(10)).unwrap();
        let label = tree.text_nodes(boundary)[0];
        let focus = tree.content_point(SegmentId(10), 5).unwrap();
        surface.select(DomPoint::new(label, 0), focus);
        assert_eq!(
            map_selection(&surface, &list),
            Err(MappingError::OutsideContent(SegmentId(10)))
        );
    }

    #[test]
    fn test_selection_on_root_has_no_segment() {
        let list = segments();
        let mut surface = surface(&list, &[]);
        let root = surface.tree().root();
        surface.select(DomPoint::new(root, 0), DomPoint::new(root, 1));
        assert_eq!(
            map_selection(&surface, &list),
            Err(MappingError::NoEnclosingSegment)
        );
    }

    #[test]
    fn test_unloaded_segment() {
        let list = segments();
        let mut surface = surface(&list, &[]);
        let empty = SegmentList::new(list.text().clone(), Vec::new());
        surface.select_content(SegmentId(10), 0, 5);
        assert_eq!(
            map_selection(&surface, &empty),
            Err(MappingError::UnknownSegment(SegmentId(10)))
        );
    }
}
