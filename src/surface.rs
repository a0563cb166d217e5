//! Rendering surface model.
//!
//! A rendered text is a small node tree: one `Segment` boundary per segment,
//! holding a `Reference` label and the `Content` built from display runs.
//! Highlighted runs and clickable words add wrapper elements around text
//! nodes; wrappers never carry text of their own, so the visible text of a
//! `Content` node is always exactly the segment content.

use crate::highlights::{HighlightColor, HighlightId};
use crate::overlay::{DisplayRun, RunKind};
use crate::segments::{Segment, SegmentId};
use crate::tokenizer::TokenKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    Segment(SegmentId),
    Reference,
    Content,
    Highlight {
        id: HighlightId,
        color: HighlightColor,
    },
    Word,
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A position in the tree. Inside a text node `offset` counts chars; inside
/// an element it is a child index, the point sitting before that child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomPoint {
    pub node: NodeId,
    pub offset: usize,
}

impl DomPoint {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// What a click on a node means to the reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickTarget {
    Word(String),
    Highlight(HighlightId),
}

#[derive(Debug, Clone)]
pub struct RenderTree {
    nodes: Vec<Node>,
}

impl Default for RenderTree {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Root,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn add(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Appends one segment rendered from `runs`. Whitespace tokens become bare
    /// text nodes; word tokens are wrapped in a `Word` element.
    pub fn push_segment(&mut self, segment: &Segment, runs: &[DisplayRun]) -> NodeId {
        let root = self.root();
        let boundary = self.add(root, NodeKind::Segment(segment.id));
        let label = self.add(boundary, NodeKind::Reference);
        self.add(label, NodeKind::Text(segment.reference.clone()));

        let content = self.add(boundary, NodeKind::Content);
        for run in runs {
            let parent = match run.kind {
                RunKind::Plain => content,
                RunKind::Highlighted { id, color } => {
                    self.add(content, NodeKind::Highlight { id, color })
                }
            };
            for token in run.tokens() {
                match token.kind {
                    TokenKind::Whitespace => {
                        self.add(parent, NodeKind::Text(token.text.to_string()));
                    }
                    TokenKind::Word => {
                        let word = self.add(parent, NodeKind::Word);
                        self.add(word, NodeKind::Text(token.text.to_string()));
                    }
                }
            }
        }
        boundary
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id.0).map(|n| &n.kind)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.0)
            .map(|n| n.children.as_slice())
            .unwrap_or_default()
    }

    /// `id` followed by its ancestors up to the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let start = self.nodes.get(id.0).map(|_| id);
        std::iter::successors(start, move |n| self.parent(*n))
    }

    pub fn is_inclusive_descendant(&self, node: NodeId, ancestor: NodeId) -> bool {
        self.ancestors(node).any(|n| n == ancestor)
    }

    /// Nearest segment boundary at or above `node`.
    pub fn enclosing_segment(&self, node: NodeId) -> Option<(SegmentId, NodeId)> {
        self.ancestors(node).find_map(|n| match self.kind(n) {
            Some(NodeKind::Segment(id)) => Some((*id, n)),
            _ => None,
        })
    }

    pub fn segment_node(&self, segment_id: SegmentId) -> Option<NodeId> {
        self.children(self.root())
            .iter()
            .copied()
            .find(|n| self.kind(*n) == Some(&NodeKind::Segment(segment_id)))
    }

    pub fn content_node(&self, segment_id: SegmentId) -> Option<NodeId> {
        let boundary = self.segment_node(segment_id)?;
        self.children(boundary)
            .iter()
            .copied()
            .find(|n| self.kind(*n) == Some(&NodeKind::Content))
    }

    /// `id` and all of its descendants in document order.
    fn preorder(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.children(n).iter().rev().copied());
        }
        out
    }

    fn text_len(&self, id: NodeId) -> usize {
        match self.kind(id) {
            Some(NodeKind::Text(text)) => text.chars().count(),
            _ => 0,
        }
    }

    fn subtree_len(&self, id: NodeId) -> usize {
        self.preorder(id).into_iter().map(|n| self.text_len(n)).sum()
    }

    /// Visible text under `id`, wrappers contributing nothing.
    pub fn text_content(&self, id: NodeId) -> String {
        self.preorder(id)
            .into_iter()
            .filter_map(|n| match self.kind(n) {
                Some(NodeKind::Text(text)) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Visible chars from the start of the document up to `point`.
    pub fn document_position(&self, point: DomPoint) -> Option<usize> {
        self.kind(point.node)?;

        let mut before = 0;
        for n in self.preorder(self.root()) {
            if n == point.node {
                break;
            }
            before += self.text_len(n);
        }

        let within = match self.kind(point.node) {
            Some(NodeKind::Text(_)) => point.offset.min(self.text_len(point.node)),
            _ => {
                let children = self.children(point.node);
                let upto = point.offset.min(children.len());
                children[..upto].iter().map(|c| self.subtree_len(*c)).sum()
            }
        };
        Some(before + within)
    }

    /// Visible chars between the start of `container` and `point`, or `None`
    /// when the point lies outside `container`.
    pub fn offset_within(&self, container: NodeId, point: DomPoint) -> Option<usize> {
        if !self.is_inclusive_descendant(point.node, container) {
            return None;
        }
        let origin = self.document_position(DomPoint::new(container, 0))?;
        let position = self.document_position(point)?;
        Some(position - origin)
    }

    /// Visible text between two points, in either order.
    pub fn text_between(&self, a: DomPoint, b: DomPoint) -> String {
        let (Some(pa), Some(pb)) = (self.document_position(a), self.document_position(b)) else {
            return String::new();
        };
        let (start, end) = if pa <= pb { (pa, pb) } else { (pb, pa) };
        self.text_content(self.root())
            .chars()
            .skip(start)
            .take(end - start)
            .collect()
    }

    /// A point `offset` visible chars into the content of `segment_id`.
    /// Positions on a boundary between two text nodes resolve to the start
    /// of the later node.
    pub fn content_point(&self, segment_id: SegmentId, offset: usize) -> Option<DomPoint> {
        let content = self.content_node(segment_id)?;
        let mut remaining = offset;
        let mut last_text = None;
        for n in self.preorder(content) {
            if !matches!(self.kind(n), Some(NodeKind::Text(_))) {
                continue;
            }
            let len = self.text_len(n);
            if remaining < len {
                return Some(DomPoint::new(n, remaining));
            }
            remaining -= len;
            last_text = Some(n);
        }
        if remaining == 0 {
            return Some(match last_text {
                Some(n) => DomPoint::new(n, self.text_len(n)),
                None => DomPoint::new(content, 0),
            });
        }
        None
    }

    /// The innermost click handler at or above `node`. A word consumes the
    /// click; the highlight run only sees clicks that land outside any word.
    pub fn click_target(&self, node: NodeId) -> Option<ClickTarget> {
        self.ancestors(node).find_map(|n| match self.kind(n) {
            Some(NodeKind::Word) => Some(ClickTarget::Word(self.text_content(n))),
            Some(NodeKind::Highlight { id, .. }) => Some(ClickTarget::Highlight(*id)),
            _ => None,
        })
    }

    pub fn text_nodes(&self, id: NodeId) -> Vec<NodeId> {
        self.preorder(id)
            .into_iter()
            .filter(|n| matches!(self.kind(*n), Some(NodeKind::Text(_))))
            .collect()
    }
}

/// Where the selection popover should be anchored, in terminal cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorPosition {
    pub column: u16,
    pub row: u16,
}

/// The live selection of a rendering surface, reduced to what the offset
/// mapper and the selection controller need.
pub trait SelectionSurface {
    /// Anchor and focus of the current selection, in drag order.
    fn selection_points(&self) -> Option<(DomPoint, DomPoint)>;

    fn selection_text(&self) -> String;

    /// Drops the live selection so nothing stays visually selected.
    fn collapse(&mut self);

    fn enclosing_segment(&self, node: NodeId) -> Option<SegmentId>;

    /// Visible chars from the start of the segment's content to `point`, or
    /// `None` if the point is not inside that content.
    fn content_offset(&self, segment_id: SegmentId, point: DomPoint) -> Option<usize>;

    fn anchor_position(&self) -> Option<AnchorPosition> {
        None
    }
}

/// Selection state over a [`RenderTree`].
#[derive(Debug, Clone, Default)]
pub struct TreeSurface {
    tree: RenderTree,
    selection: Option<(DomPoint, DomPoint)>,
    anchor_position: Option<AnchorPosition>,
}

impl TreeSurface {
    pub fn new(tree: RenderTree) -> Self {
        Self {
            tree,
            selection: None,
            anchor_position: None,
        }
    }

    pub fn tree(&self) -> &RenderTree {
        &self.tree
    }

    /// Swaps in a fresh render. Node ids of the old tree are meaningless in
    /// the new one, so any live selection is dropped.
    pub fn replace_tree(&mut self, tree: RenderTree) {
        self.tree = tree;
        self.collapse();
    }

    pub fn select(&mut self, anchor: DomPoint, focus: DomPoint) {
        self.selection = Some((anchor, focus));
    }

    /// Selects content chars `anchor..focus` of one segment; `focus` may be
    /// smaller than `anchor` for a backwards drag.
    pub fn select_content(&mut self, segment_id: SegmentId, anchor: usize, focus: usize) -> bool {
        match (
            self.tree.content_point(segment_id, anchor),
            self.tree.content_point(segment_id, focus),
        ) {
            (Some(a), Some(f)) => {
                self.select(a, f);
                true
            }
            _ => false,
        }
    }

    pub fn set_anchor_position(&mut self, position: Option<AnchorPosition>) {
        self.anchor_position = position;
    }

    pub fn has_selection(&self) -> bool {
        self.selection.is_some()
    }
}

impl SelectionSurface for TreeSurface {
    fn selection_points(&self) -> Option<(DomPoint, DomPoint)> {
        self.selection
    }

    fn selection_text(&self) -> String {
        match self.selection {
            Some((anchor, focus)) => self.tree.text_between(anchor, focus),
            None => String::new(),
        }
    }

    fn collapse(&mut self) {
        self.selection = None;
        self.anchor_position = None;
    }

    fn enclosing_segment(&self, node: NodeId) -> Option<SegmentId> {
        self.tree.enclosing_segment(node).map(|(id, _)| id)
    }

    fn content_offset(&self, segment_id: SegmentId, point: DomPoint) -> Option<usize> {
        let content = self.tree.content_node(segment_id)?;
        self.tree.offset_within(content, point)
    }

    fn anchor_position(&self) -> Option<AnchorPosition> {
        self.anchor_position
    }
}
