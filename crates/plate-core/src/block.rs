use serde::{Deserialize, Serialize};

use crate::inline::{Bias, split_nodes};
use crate::node::{ElementKind, ElementNode, Node, Path, TextAlign};
use crate::selection::{Cursor, Placement, Point, text_runs};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockFormat {
    Blockquote,
    CodeBlock,
}

impl BlockFormat {
    pub fn kind(self) -> ElementKind {
        match self {
            Self::Blockquote => ElementKind::Blockquote,
            Self::CodeBlock => ElementKind::CodeBlock,
        }
    }
}

/// The sibling blocks covering `start..=end`, as `(parent, first, last)`.
/// Ranges inside list structure are lifted to the outermost list.
pub(crate) fn block_range(
    root: &ElementNode,
    start: &[usize],
    end: &[usize],
) -> Option<(Path, usize, usize)> {
    let a = root.nearest_ancestor(start, ElementKind::is_block)?;
    let b = root
        .nearest_ancestor(end, ElementKind::is_block)
        .unwrap_or_else(|| a.clone());

    let mut depth = a.iter().zip(&b).take_while(|(x, y)| x == y).count();
    if depth == a.len() || depth == b.len() {
        depth -= 1;
    }
    let mut parent = a[..depth].to_vec();
    let mut first = a[depth];
    let mut last = b[depth];

    while !parent.is_empty() {
        let Some(el) = root.element(&parent) else {
            break;
        };
        if !el.kind.is_list() && el.kind != ElementKind::ListItem {
            break;
        }
        if let Some(ix) = parent.pop() {
            first = ix;
            last = ix;
        }
    }

    Some((parent, first.min(last), first.max(last)))
}

/// Splits the block holding `point` at `at` and inserts `blocks` between the
/// halves. Halves left without content are dropped. Returns the parent path,
/// the index of the first inserted block, and whether content follows them.
pub(crate) fn insert_blocks_at(
    root: &mut ElementNode,
    point: &Point,
    at: usize,
    blocks: Vec<Node>,
) -> Option<(Path, usize, bool)> {
    let (parent, ix, _) = block_range(root, &point.path, &point.path)?;
    let mut node_path = parent.clone();
    node_path.push(ix);
    let node_start = root.offset_before(&node_path);

    let container = root.element_mut(&parent)?;
    if ix >= container.children.len() {
        return None;
    }
    let node = container.children.remove(ix);
    let (left, right) = split_nodes(vec![node], at.saturating_sub(node_start), Bias::Left);
    let keep = |node: &Node| node.has_content() || node.has_placeholder();
    let left: Vec<Node> = left.into_iter().filter(keep).collect();
    let right: Vec<Node> = right.into_iter().filter(keep).collect();

    let first = ix + left.len();
    let trailing = !right.is_empty();
    let replacement: Vec<Node> = left.into_iter().chain(blocks).chain(right).collect();
    container.children.splice(ix..ix, replacement);
    Some((parent, first, trailing))
}

pub(crate) fn format_block(root: &mut ElementNode, cursor: &Cursor, format: BlockFormat) -> Placement {
    let kind = format.kind();

    if let Some(path) = root.nearest_ancestor(&cursor.anchor.path, |candidate| *candidate == kind) {
        unwrap_block(root, &path);
        return Placement::Offsets(cursor.range);
    }

    if cursor.is_collapsed() {
        let block = Node::element(kind, vec![Node::text("")]);
        return match insert_blocks_at(root, &cursor.start, cursor.range.start, vec![block]) {
            Some((mut parent, ix, _)) => {
                parent.push(ix);
                Placement::StartOf(parent)
            }
            None => Placement::Keep,
        };
    }

    let Some((parent, first, last)) = block_range(root, &cursor.start.path, &cursor.end.path) else {
        return Placement::Keep;
    };
    let Some(container) = root.element_mut(&parent) else {
        return Placement::Keep;
    };
    let wrapped: Vec<Node> = container.children.drain(first..=last).collect();
    container
        .children
        .insert(first, Node::element(kind, wrapped));
    Placement::Offsets(cursor.range)
}

/// Replaces the block at `path` with its children, or drops it when it has
/// nothing left to show.
fn unwrap_block(root: &mut ElementNode, path: &[usize]) {
    let Some((index, parent)) = path.split_last() else {
        return;
    };
    let Some(container) = root.element_mut(parent) else {
        return;
    };
    if *index >= container.children.len() {
        return;
    }
    let node = container.children.remove(*index);
    if !node.has_content() && !node.has_placeholder() {
        return;
    }
    if let Node::Element(block) = node {
        container.children.splice(*index..*index, block.children);
    }
}

pub(crate) fn set_alignment(root: &mut ElementNode, cursor: &Cursor, align: TextAlign) -> Placement {
    let mut targets: Vec<Path> = Vec::new();
    let run_paths: Vec<Path> = if cursor.is_collapsed() {
        vec![cursor.anchor.path.clone()]
    } else {
        text_runs(root)
            .into_iter()
            .filter(|run| run.overlaps(cursor.range))
            .map(|run| run.path)
            .collect()
    };

    for path in run_paths {
        if let Some(block) = root.nearest_ancestor(&path, ElementKind::is_text_block) {
            if !targets.contains(&block) {
                targets.push(block);
            }
        }
    }

    if targets.is_empty() {
        tracing::debug!("no paragraph or div to align");
        return Placement::Keep;
    }

    for path in &targets {
        if let Some(block) = root.element_mut(path) {
            match &mut block.kind {
                ElementKind::Paragraph { align: current } | ElementKind::Div { align: current } => {
                    *current = Some(align);
                }
                _ => {}
            }
        }
    }
    Placement::Offsets(cursor.range)
}
