use crate::node::{ElementKind, ElementNode, Node, Path, TextRun};
use crate::selection::{Cursor, Placement, Point, SelectionOffset, text_runs};

/// Which side receives zero-length nodes sitting exactly on a split offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Bias {
    Left,
    Right,
}

/// Splits `nodes` at text offset `at`, cloning any element that straddles it.
pub(crate) fn split_nodes(nodes: Vec<Node>, at: usize, bias: Bias) -> (Vec<Node>, Vec<Node>) {
    let mut left = Vec::new();
    let mut right = Vec::new();
    let mut pos = 0usize;

    for node in nodes {
        let len = node.text_len();
        let goes_left = if len == 0 {
            pos < at || (pos == at && bias == Bias::Left)
        } else {
            pos + len <= at
        };

        if right.is_empty() && goes_left {
            left.push(node);
        } else if pos >= at {
            right.push(node);
        } else {
            match node {
                Node::Text(mut run) => {
                    let tail = run.split_off(at - pos);
                    left.push(Node::Text(run));
                    right.push(Node::Text(tail));
                }
                Node::Element(el) => {
                    let ElementNode { kind, children } = el;
                    let (l, r) = split_nodes(children, at - pos, bias);
                    left.push(Node::element(kind.clone(), l));
                    right.push(Node::element(kind, r));
                }
            }
        }
        pos += len;
    }

    (left, right)
}

/// Cuts `nodes` into the parts before, inside and after `[start, end)`.
/// Zero-length nodes on either boundary stay outside.
pub(crate) fn isolate(
    nodes: Vec<Node>,
    start: usize,
    end: usize,
) -> (Vec<Node>, Vec<Node>, Vec<Node>) {
    let (before, rest) = split_nodes(nodes, start, Bias::Left);
    let (inside, after) = split_nodes(rest, end.saturating_sub(start), Bias::Right);
    (before, inside, after)
}

/// Calls `f` for every maximal run of inline siblings that overlaps
/// `[start, end)`, with offsets local to that run, and splices in the result.
pub(crate) fn map_inline_groups(
    el: &mut ElementNode,
    start: usize,
    end: usize,
    f: &mut dyn FnMut(Vec<Node>, usize, usize) -> Vec<Node>,
) {
    let mut base = 0usize;
    map_groups_in(el, &mut base, start, end, f);
}

fn map_groups_in(
    el: &mut ElementNode,
    base: &mut usize,
    start: usize,
    end: usize,
    f: &mut dyn FnMut(Vec<Node>, usize, usize) -> Vec<Node>,
) {
    let children = std::mem::take(&mut el.children);
    let mut out = Vec::with_capacity(children.len());
    let mut group: Vec<Node> = Vec::new();

    for child in children {
        if child.is_inline() {
            group.push(child);
            continue;
        }
        flush_group(&mut out, &mut group, base, start, end, f);
        let mut child = child;
        if let Node::Element(block) = &mut child {
            map_groups_in(block, base, start, end, f);
        }
        out.push(child);
    }
    flush_group(&mut out, &mut group, base, start, end, f);
    el.children = out;
}

fn flush_group(
    out: &mut Vec<Node>,
    group: &mut Vec<Node>,
    base: &mut usize,
    start: usize,
    end: usize,
    f: &mut dyn FnMut(Vec<Node>, usize, usize) -> Vec<Node>,
) {
    if group.is_empty() {
        return;
    }
    let nodes = std::mem::take(group);
    let len: usize = nodes.iter().map(Node::text_len).sum();
    let group_start = *base;
    *base += len;

    if group_start < end && start < group_start + len {
        let local_start = start.saturating_sub(group_start);
        let local_end = (end - group_start).min(len);
        out.extend(f(nodes, local_start, local_end));
    } else {
        out.extend(nodes);
    }
}

/// Wraps `[start, end)` of `nodes` in a new `kind` element. When a single
/// wrapper already spans more than the range, the new element goes inside it.
/// `clean` rewrites the isolated content before it is wrapped.
pub(crate) fn wrap_range(
    mut nodes: Vec<Node>,
    start: usize,
    end: usize,
    kind: &ElementKind,
    clean: &dyn Fn(Vec<Node>) -> Vec<Node>,
) -> Vec<Node> {
    let mut pos = 0usize;
    let mut host = None;
    for (ix, node) in nodes.iter().enumerate() {
        let len = node.text_len();
        if let Node::Element(el) = node {
            if !el.kind.is_leaf() && pos <= start && end <= pos + len && len > end - start {
                host = Some((ix, pos));
                break;
            }
        }
        pos += len;
    }

    if let Some((ix, pos)) = host {
        if let Some(Node::Element(el)) = nodes.get_mut(ix) {
            let children = std::mem::take(&mut el.children);
            el.children = wrap_range(children, start - pos, end - pos, kind, clean);
        }
        return nodes;
    }

    let (mut before, inside, after) = isolate(nodes, start, end);
    before.push(Node::element(kind.clone(), clean(inside)));
    before.extend(after);
    before
}

/// Replaces every element matching `pred` with its children.
pub(crate) fn unwrap_matching(nodes: Vec<Node>, pred: &dyn Fn(&ElementKind) -> bool) -> Vec<Node> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            Node::Element(el) if pred(&el.kind) => out.extend(unwrap_matching(el.children, pred)),
            Node::Element(mut el) => {
                el.children = unwrap_matching(std::mem::take(&mut el.children), pred);
                out.push(Node::Element(el));
            }
            text => out.push(text),
        }
    }
    out
}

/// Drops every inline wrapper, keeping text and inline leaves.
pub(crate) fn flatten_inline(nodes: Vec<Node>) -> Vec<Node> {
    unwrap_matching(nodes, &|kind| kind.is_inline() && !kind.is_leaf())
}

/// True when every non-empty run overlapping the range sits under an element
/// matching `pred`. A range with no text is never considered formatted.
pub(crate) fn range_has_ancestor(
    root: &ElementNode,
    range: SelectionOffset,
    pred: &dyn Fn(&ElementKind) -> bool,
) -> bool {
    let mut seen = false;
    for run in text_runs(root) {
        if run.len == 0 || !run.overlaps(range) {
            continue;
        }
        seen = true;
        if root.nearest_ancestor(&run.path, pred).is_none() {
            return false;
        }
    }
    seen
}

/// Splits the caret's text run and places `nodes` between the halves. Returns
/// the path of the run that now follows the inserted nodes.
pub(crate) fn insert_at_point(root: &mut ElementNode, point: &Point, nodes: Vec<Node>) -> Option<Path> {
    let (index, parent) = point.path.split_last()?;
    let children = &mut root.element_mut(parent)?.children;
    let Some(Node::Text(run)) = children.get_mut(*index) else {
        return None;
    };

    let tail = run.split_off(point.offset);
    let mut at = index + 1;
    if run.text.is_empty() {
        children.remove(*index);
        at = *index;
    }

    let count = nodes.len();
    children.splice(at..at, nodes);
    let tail_ix = at + count;
    children.insert(tail_ix, Node::Text(tail));

    let mut path = parent.to_vec();
    path.push(tail_ix);
    Some(path)
}

/// Start offset and length of the inline run of siblings holding `point`.
pub(crate) fn inline_group_span(root: &ElementNode, point: &Point) -> Option<(usize, usize)> {
    let block = root
        .nearest_ancestor(&point.path, ElementKind::is_block)
        .unwrap_or_default();
    let container = root.element(&block)?;
    let child = *point.path.get(block.len())?;
    let (first, last) = group_bounds(&container.children, child);

    let mut first_path = block.clone();
    first_path.push(first);
    let start = root.offset_before(&first_path);
    let len = container.children[first..=last]
        .iter()
        .map(Node::text_len)
        .sum();
    Some((start, len))
}

fn group_bounds(children: &[Node], ix: usize) -> (usize, usize) {
    let mut first = ix;
    while first > 0 && children[first - 1].is_inline() {
        first -= 1;
    }
    let mut last = ix;
    while last + 1 < children.len() && children[last + 1].is_inline() {
        last += 1;
    }
    (first, last)
}

pub(crate) fn toggle_format(root: &mut ElementNode, cursor: &Cursor, kind: &ElementKind) -> Placement {
    if cursor.is_collapsed() {
        return toggle_at_caret(root, cursor, kind);
    }

    let same = |candidate: &ElementKind| candidate == kind;
    let range = cursor.range;
    if range_has_ancestor(root, range, &same) {
        map_inline_groups(root, range.start, range.end, &mut |nodes, start, end| {
            let (mut before, inside, after) = isolate(nodes, start, end);
            before.extend(unwrap_matching(inside, &same));
            before.extend(after);
            before
        });
    } else {
        map_inline_groups(root, range.start, range.end, &mut |nodes, start, end| {
            wrap_range(nodes, start, end, kind, &|inside| unwrap_matching(inside, &same))
        });
    }
    Placement::Offsets(range)
}

/// With a collapsed caret there is nothing to wrap, so a placeholder run is
/// parked at the caret: inside a fresh `kind` element when turning the format
/// on, or between the two halves of the split wrapper when turning it off.
fn toggle_at_caret(root: &mut ElementNode, cursor: &Cursor, kind: &ElementKind) -> Placement {
    let at = cursor.range.start;
    let point = &cursor.start;
    let applied = root
        .nearest_ancestor(&point.path, &|candidate: &ElementKind| candidate == kind)
        .is_some();

    if !applied {
        let placeholder = Node::element(kind.clone(), vec![Node::Text(TextRun::placeholder())]);
        if insert_at_point(root, point, vec![placeholder]).is_none() {
            return Placement::Keep;
        }
        return Placement::Placeholder(at);
    }

    park_placeholder(
        root,
        cursor,
        &|candidate| (candidate != *kind).then_some(candidate),
        None,
    )
}

/// Splits the inline run holding the caret and parks a placeholder between
/// the halves. The placeholder is wrapped in the caret's inline ancestors as
/// rewritten by `rewrap` (`None` drops that wrapper), then in `innermost`.
pub(crate) fn park_placeholder(
    root: &mut ElementNode,
    cursor: &Cursor,
    rewrap: &dyn Fn(ElementKind) -> Option<ElementKind>,
    innermost: Option<ElementKind>,
) -> Placement {
    let at = cursor.range.start;
    let point = &cursor.start;
    let block = root
        .nearest_ancestor(&point.path, ElementKind::is_block)
        .unwrap_or_default();
    let Some(&child) = point.path.get(block.len()) else {
        return Placement::Keep;
    };
    let Some(container) = root.element(&block) else {
        return Placement::Keep;
    };
    let (first, last) = group_bounds(&container.children, child);

    let mut first_path = block.clone();
    first_path.push(first);
    let local = at.saturating_sub(root.offset_before(&first_path));

    let wrappers: Vec<ElementKind> = root
        .ancestor_kinds(&point.path)
        .into_iter()
        .skip(block.len())
        .filter(ElementKind::is_inline)
        .filter_map(rewrap)
        .chain(innermost)
        .collect();
    let placeholder = wrappers
        .into_iter()
        .rev()
        .fold(Node::Text(TextRun::placeholder()), |inner, wrapper| {
            Node::element(wrapper, vec![inner])
        });

    let Some(container) = root.element_mut(&block) else {
        return Placement::Keep;
    };
    let group: Vec<Node> = container.children.drain(first..=last).collect();
    let (mut before, after) = split_nodes(group, local, Bias::Left);
    before.push(placeholder);
    before.extend(after);
    container.children.splice(first..first, before);

    Placement::Placeholder(at)
}

pub(crate) fn remove_format(root: &mut ElementNode, cursor: &Cursor) -> Placement {
    let range = cursor.range;
    if range.is_collapsed() {
        return Placement::Keep;
    }
    map_inline_groups(root, range.start, range.end, &mut |nodes, start, end| {
        let (mut before, inside, after) = isolate(nodes, start, end);
        before.extend(flatten_inline(inside));
        before.extend(after);
        before
    });
    Placement::Offsets(range)
}

pub(crate) fn create_link(
    root: &mut ElementNode,
    range: SelectionOffset,
    href: String,
    target: Option<String>,
) -> Placement {
    strip_links(root, range);
    let link = ElementKind::Link { href, target };
    map_inline_groups(root, range.start, range.end, &mut |nodes, start, end| {
        wrap_range(nodes, start, end, &link, &|inside| {
            unwrap_matching(inside, &ElementKind::is_link)
        })
    });
    Placement::Offsets(range)
}

pub(crate) fn unlink(root: &mut ElementNode, cursor: &Cursor) -> Placement {
    if !cursor.is_collapsed() {
        strip_links(root, cursor.range);
        return Placement::Offsets(cursor.range);
    }

    let Some(path) = root.nearest_ancestor(&cursor.anchor.path, ElementKind::is_link) else {
        return Placement::Keep;
    };
    let Some((index, parent)) = path.split_last() else {
        return Placement::Keep;
    };
    let Some(container) = root.element_mut(parent) else {
        return Placement::Keep;
    };
    if let Node::Element(link) = container.children.remove(*index) {
        container.children.splice(*index..*index, link.children);
    }
    Placement::Offsets(cursor.range)
}

fn strip_links(root: &mut ElementNode, range: SelectionOffset) {
    map_inline_groups(root, range.start, range.end, &mut |nodes, start, end| {
        let (mut before, inside, after) = isolate(nodes, start, end);
        before.extend(unwrap_matching(inside, &ElementKind::is_link));
        before.extend(after);
        before
    });
}

/// Removes the text in `range` along with any leaves strictly inside it.
pub(crate) fn delete_range(root: &mut ElementNode, range: SelectionOffset) {
    if range.is_collapsed() {
        return;
    }
    map_inline_groups(root, range.start, range.end, &mut |nodes, start, end| {
        let (mut before, _, after) = isolate(nodes, start, end);
        before.extend(after);
        before
    });
}

/// Drops top-level blocks strictly between `first` and `last` that were
/// emptied by a deletion.
pub(crate) fn drop_emptied_blocks(root: &mut ElementNode, first: usize, last: usize) {
    for ix in (first + 1..last.min(root.children.len())).rev() {
        if !root.children[ix].has_content() {
            root.children.remove(ix);
        }
    }
}

/// Inserts `text` at `point`. Newlines become line breaks; a placeholder in
/// the target run is consumed.
pub(crate) fn insert_text(root: &mut ElementNode, point: &Point, at: usize, text: &str) -> Placement {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let inserted = text.chars().filter(|ch| *ch != '\n').count();

    if !text.contains('\n') {
        let Some(run) = root.text_run_mut(&point.path) else {
            return Placement::Keep;
        };
        run.strip_placeholders();
        let ix = run.byte_index(point.offset);
        run.text.insert_str(ix, &text);
        return Placement::Offsets(SelectionOffset::collapsed(at + inserted));
    }

    if let Some(run) = root.text_run_mut(&point.path) {
        run.strip_placeholders();
    }
    let nodes = text_with_breaks(&text);
    let after = Placement::after(root, point, at + inserted);
    match insert_at_point(root, point, nodes) {
        Some(_) => after,
        None => Placement::Keep,
    }
}

/// Plain text as runs separated by line breaks.
pub(crate) fn text_with_breaks(text: &str) -> Vec<Node> {
    let mut nodes = Vec::new();
    for (ix, line) in text.split('\n').enumerate() {
        if ix > 0 {
            nodes.push(Node::element(ElementKind::LineBreak, Vec::new()));
        }
        if !line.is_empty() {
            nodes.push(Node::text(line));
        }
    }
    nodes
}
