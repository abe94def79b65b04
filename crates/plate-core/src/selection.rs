use serde::{Deserialize, Serialize};

use crate::node::{ElementKind, ElementNode, Node, Path};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub path: Path,
    pub offset: usize,
}

impl Point {
    pub fn new(path: Path, offset: usize) -> Self {
        Self { path, offset }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: Point,
    pub focus: Point,
}

impl Selection {
    pub fn new(anchor: Point, focus: Point) -> Self {
        Self { anchor, focus }
    }

    pub fn collapsed(point: Point) -> Self {
        Self {
            anchor: point.clone(),
            focus: point,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }
}

/// A selection expressed as character offsets into the flattened text of the
/// document. Survives any rewrite that preserves that text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SelectionOffset {
    pub start: usize,
    pub end: usize,
}

impl SelectionOffset {
    pub fn new(a: usize, b: usize) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    pub fn collapsed(at: usize) -> Self {
        Self { start: at, end: at }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.is_collapsed()
    }
}

/// A text run with its position in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSpan {
    pub path: Path,
    pub start: usize,
    pub len: usize,
}

impl RunSpan {
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    pub fn overlaps(&self, range: SelectionOffset) -> bool {
        if self.len == 0 {
            return range.start < self.start && self.start < range.end;
        }
        self.start < range.end && range.start < self.end()
    }
}

/// Every text run under `root`, in pre-order.
pub fn text_runs(root: &ElementNode) -> Vec<RunSpan> {
    let mut runs = Vec::new();
    let mut path = Vec::new();
    let mut pos = 0usize;
    collect_runs(&root.children, &mut path, &mut pos, &mut runs);
    runs
}

fn collect_runs(nodes: &[Node], path: &mut Path, pos: &mut usize, runs: &mut Vec<RunSpan>) {
    for (ix, node) in nodes.iter().enumerate() {
        path.push(ix);
        match node {
            Node::Text(run) => {
                let len = run.len();
                runs.push(RunSpan {
                    path: path.clone(),
                    start: *pos,
                    len,
                });
                *pos += len;
            }
            Node::Element(el) => collect_runs(&el.children, path, pos, runs),
        }
        path.pop();
    }
}

pub struct SelectionTracker;

impl SelectionTracker {
    /// Converts a live selection into flattened-text offsets.
    pub fn save(root: &ElementNode, selection: &Selection) -> Option<SelectionOffset> {
        let anchor = Self::offset_of(root, &selection.anchor)?;
        let focus = Self::offset_of(root, &selection.focus)?;
        Some(SelectionOffset::new(anchor, focus))
    }

    /// Maps offsets back onto text runs. When an offset falls exactly on the
    /// boundary between two runs, the earlier run wins. Returns `None` when the
    /// document is shorter than the saved offsets.
    pub fn restore(root: &ElementNode, offset: SelectionOffset) -> Option<Selection> {
        let total = root.text_len();
        if offset.end > total {
            tracing::debug!(
                start = offset.start,
                end = offset.end,
                total,
                "selection offsets exceed document length"
            );
            return None;
        }
        let start = Self::point_at(root, offset.start)?;
        let end = Self::point_at(root, offset.end)?;
        Some(Selection::new(start, end))
    }

    pub fn offset_of(root: &ElementNode, point: &Point) -> Option<usize> {
        let run = root.text_run(&point.path)?;
        Some(root.offset_before(&point.path) + point.offset.min(run.len()))
    }

    pub fn point_at(root: &ElementNode, offset: usize) -> Option<Point> {
        text_runs(root)
            .into_iter()
            .find(|run| run.start <= offset && offset <= run.end())
            .map(|run| Point::new(run.path, offset - run.start))
    }

    pub fn end_of_document(root: &ElementNode) -> Option<Point> {
        text_runs(root)
            .into_iter()
            .last()
            .map(|run| Point::new(run.path, run.len))
    }
}

/// First text position at or below `path`.
pub(crate) fn first_point_in(root: &ElementNode, path: &[usize]) -> Option<Point> {
    text_runs(root)
        .into_iter()
        .find(|run| run.path.starts_with(path))
        .map(|run| Point::new(run.path, 0))
}

/// A resolved selection with its endpoints ordered by document position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Cursor {
    pub range: SelectionOffset,
    pub anchor: Point,
    pub start: Point,
    pub end: Point,
}

impl Cursor {
    pub fn resolve(root: &ElementNode, selection: &Selection) -> Option<Self> {
        let anchor = SelectionTracker::offset_of(root, &selection.anchor)?;
        let focus = SelectionTracker::offset_of(root, &selection.focus)?;
        let (start, end) = if anchor <= focus {
            (selection.anchor.clone(), selection.focus.clone())
        } else {
            (selection.focus.clone(), selection.anchor.clone())
        };
        Some(Self {
            range: SelectionOffset::new(anchor, focus),
            anchor: selection.anchor.clone(),
            start,
            end,
        })
    }

    pub fn is_collapsed(&self) -> bool {
        self.range.is_collapsed()
    }
}

/// Where the caret goes once a command has rewritten the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Placement {
    Keep,
    Offsets(SelectionOffset),
    /// Collapsed at `at`, taking the later run on a boundary but never
    /// leaving the block at `block`.
    After { block: Path, at: usize },
    /// Inside the placeholder run that starts at this offset.
    Placeholder(usize),
    StartOf(Path),
}

impl Placement {
    /// Caret right after content inserted at `point`, with `at` the offset
    /// just past it.
    pub fn after(root: &ElementNode, point: &Point, at: usize) -> Self {
        let block = root
            .nearest_ancestor(&point.path, ElementKind::is_block)
            .unwrap_or_default();
        Placement::After { block, at }
    }

    pub fn resolve(&self, root: &ElementNode) -> Option<Selection> {
        match self {
            Placement::Keep => None,
            Placement::Offsets(offset) => SelectionTracker::restore(root, *offset),
            Placement::After { block, at } => text_runs(root)
                .into_iter()
                .rev()
                .filter(|run| run.path.starts_with(block))
                .find(|run| run.start <= *at && *at <= run.end())
                .map(|run| Selection::collapsed(Point::new(run.path, at - run.start)))
                .or_else(|| SelectionTracker::restore(root, SelectionOffset::collapsed(*at))),
            Placement::Placeholder(at) => {
                let runs = text_runs(root);
                let found = runs.into_iter().find(|span| {
                    span.start == *at
                        && root
                            .text_run(&span.path)
                            .is_some_and(|run| run.has_placeholder())
                });
                match found {
                    Some(span) => Some(Selection::collapsed(Point::new(span.path, 0))),
                    None => SelectionTracker::restore(root, SelectionOffset::collapsed(*at)),
                }
            }
            Placement::StartOf(path) => first_point_in(root, path).map(Selection::collapsed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_runs() -> ElementNode {
        ElementNode::root(vec![Node::element(
            ElementKind::paragraph(),
            vec![
                Node::text("AB"),
                Node::element(ElementKind::Bold, vec![Node::text("CDE")]),
            ],
        )])
    }

    #[test]
    fn restore_maps_offset_into_second_run() {
        let root = two_runs();
        let selection = SelectionTracker::restore(&root, SelectionOffset::collapsed(3)).unwrap();
        assert_eq!(selection.anchor, Point::new(vec![0, 1, 0], 1));
    }

    #[test]
    fn restore_prefers_earlier_run_on_boundary() {
        let root = two_runs();
        let selection = SelectionTracker::restore(&root, SelectionOffset::collapsed(2)).unwrap();
        assert_eq!(selection.anchor, Point::new(vec![0, 0], 2));
    }

    #[test]
    fn restore_fails_past_end_of_document() {
        let root = two_runs();
        assert!(SelectionTracker::restore(&root, SelectionOffset::new(1, 6)).is_none());
    }

    #[test]
    fn save_orders_backward_selection() {
        let root = two_runs();
        let selection = Selection::new(Point::new(vec![0, 1, 0], 2), Point::new(vec![0, 0], 1));
        assert_eq!(
            SelectionTracker::save(&root, &selection),
            Some(SelectionOffset::new(1, 4))
        );
    }

    #[test]
    fn after_stays_in_the_block_it_was_given() {
        let root = ElementNode::root(vec![Node::paragraph("ab"), Node::paragraph("")]);
        let placement = Placement::after(&root, &Point::new(vec![0, 0], 2), 2);
        assert_eq!(
            placement.resolve(&root),
            Some(Selection::collapsed(Point::new(vec![0, 0], 2)))
        );
    }

    #[test]
    fn len_of_a_hand_built_backward_offset_is_zero() {
        let offset = SelectionOffset { start: 5, end: 2 };
        assert_eq!(offset.len(), 0);
    }

    #[test]
    fn save_rejects_points_that_are_not_text() {
        let root = two_runs();
        let selection = Selection::collapsed(Point::new(vec![0, 1], 0));
        assert_eq!(SelectionTracker::save(&root, &selection), None);
    }
}
