use crate::block::block_range;
use crate::node::{ElementKind, ElementNode, ListKind, Node, Path};
use crate::selection::{Cursor, Placement};

fn is_list_item(kind: &ElementKind) -> bool {
    *kind == ElementKind::ListItem
}

/// The list holding the selection start, and the index range of its items
/// covered by the selection.
fn selected_items(root: &ElementNode, cursor: &Cursor) -> Option<(Path, usize, usize)> {
    let item = root.nearest_ancestor(&cursor.start.path, is_list_item)?;
    let (&first, list_path) = item.split_last()?;
    if !root.element(list_path).is_some_and(|list| list.kind.is_list()) {
        return None;
    }
    let last = cursor
        .end
        .path
        .get(list_path.len())
        .filter(|_| cursor.end.path.starts_with(list_path))
        .copied()
        .unwrap_or(first);
    Some((list_path.to_vec(), first.min(last), first.max(last)))
}

pub(crate) fn toggle_list(root: &mut ElementNode, cursor: &Cursor, kind: ListKind) -> Placement {
    if let Some(item) = root.nearest_ancestor(&cursor.anchor.path, is_list_item) {
        let empty = root.element(&item).is_some_and(|el| el.text_len() == 0);
        if empty {
            return convert_item(root, &item)
                .map(Placement::StartOf)
                .unwrap_or(Placement::Keep);
        }

        let Some((list_path, first, last)) = selected_items(root, cursor) else {
            return Placement::Keep;
        };
        let current = root
            .element(&list_path)
            .and_then(|list| ListKind::of(&list.kind));
        if current == Some(kind) {
            items_to_paragraphs(root, &list_path, first, last);
        } else if let Some(list) = root.element_mut(&list_path) {
            list.kind = kind.element_kind();
        }
        return Placement::Offsets(cursor.range);
    }

    let Some((parent, first, last)) = block_range(root, &cursor.start.path, &cursor.end.path) else {
        return Placement::Keep;
    };
    let Some(container) = root.element_mut(&parent) else {
        return Placement::Keep;
    };
    let items: Vec<Node> = container
        .children
        .drain(first..=last)
        .map(block_into_item)
        .collect();
    container
        .children
        .insert(first, Node::element(kind.element_kind(), items));
    Placement::Offsets(cursor.range)
}

fn block_into_item(block: Node) -> Node {
    match block {
        Node::Element(el) if el.kind.is_text_block() => {
            Node::element(ElementKind::ListItem, el.children)
        }
        other => Node::element(ElementKind::ListItem, vec![other]),
    }
}

/// Turns one list item into a paragraph in place of the list, splitting the
/// list around it. Returns the paragraph's path.
pub(crate) fn convert_item(root: &mut ElementNode, item: &[usize]) -> Option<Path> {
    let (&ix, list_path) = item.split_last()?;
    items_to_paragraphs(root, list_path, ix, ix)
}

fn items_to_paragraphs(
    root: &mut ElementNode,
    list_path: &[usize],
    first: usize,
    last: usize,
) -> Option<Path> {
    let (&list_ix, parent_path) = list_path.split_last()?;
    let parent = root.element_mut(parent_path)?;
    if !matches!(parent.children.get(list_ix), Some(Node::Element(el)) if el.kind.is_list()) {
        return None;
    }
    let Node::Element(list) = parent.children.remove(list_ix) else {
        return None;
    };

    let ElementNode { kind, children } = list;
    let last = last.min(children.len().saturating_sub(1));
    let first = first.min(last);
    let mut items = children.into_iter();
    let before: Vec<Node> = items.by_ref().take(first).collect();
    let middle: Vec<Node> = items.by_ref().take(last - first + 1).collect();
    let after: Vec<Node> = items.collect();

    let mut replacement = Vec::new();
    if !before.is_empty() {
        replacement.push(Node::element(kind.clone(), before));
    }
    let paragraph_ix = list_ix + replacement.len();
    for item in middle {
        replacement.extend(item_into_blocks(item));
    }
    if !after.is_empty() {
        replacement.push(Node::element(kind, after));
    }
    parent.children.splice(list_ix..list_ix, replacement);

    let mut path = parent_path.to_vec();
    path.push(paragraph_ix);
    Some(path)
}

/// Inline content goes into a paragraph; nested blocks follow it.
fn item_into_blocks(item: Node) -> Vec<Node> {
    let Node::Element(item) = item else {
        return vec![Node::element(ElementKind::paragraph(), vec![item])];
    };

    let (inline, blocks): (Vec<Node>, Vec<Node>) =
        item.children.into_iter().partition(Node::is_inline);
    let leads_with_paragraph = matches!(
        blocks.first(),
        Some(Node::Element(el)) if matches!(el.kind, ElementKind::Paragraph { .. })
    );

    let mut out = Vec::with_capacity(blocks.len() + 1);
    if !inline.is_empty() || !leads_with_paragraph {
        out.push(Node::element(ElementKind::paragraph(), inline));
    }
    out.extend(blocks);
    out
}

/// Nests each selected item into the sublist of its previous sibling. Items are
/// processed last to first; the first item of a list cannot be indented.
pub(crate) fn indent_selection(root: &mut ElementNode, cursor: &Cursor) -> Option<Placement> {
    let (list_path, first, last) = selected_items(root, cursor)?;
    for ix in (first..=last).rev() {
        indent_item(root, &list_path, ix);
    }
    Some(Placement::Offsets(cursor.range))
}

fn indent_item(root: &mut ElementNode, list_path: &[usize], ix: usize) -> bool {
    if ix == 0 {
        return false;
    }
    let Some(list) = root.element_mut(list_path) else {
        return false;
    };
    if ix >= list.children.len() {
        return false;
    }
    let kind = list.kind.clone();
    let item = list.children.remove(ix);
    let Some(Node::Element(prev)) = list.children.get_mut(ix - 1) else {
        list.children.insert(ix, item);
        return false;
    };

    match prev.children.last_mut() {
        Some(Node::Element(sublist)) if sublist.kind.is_list() => sublist.children.push(item),
        _ => prev.children.push(Node::element(kind, vec![item])),
    }
    true
}

/// Moves each selected nested item up one level, right after its parent item.
/// Siblings that followed the item move along as its sublist. Items of a
/// top-level list stay where they are.
pub(crate) fn outdent_selection(root: &mut ElementNode, cursor: &Cursor) -> Option<Placement> {
    let (list_path, first, last) = selected_items(root, cursor)?;
    let mut target = Some((list_path, first));
    for _ in first..=last {
        let Some((list_path, ix)) = target.take() else {
            break;
        };
        target = match outdent_item(root, &list_path, ix) {
            Some(moved) => moved.tail,
            None => Some((list_path, ix + 1)),
        };
    }
    Some(Placement::Offsets(cursor.range))
}

struct Outdented {
    /// Where the siblings that followed the item now live, if any.
    tail: Option<(Path, usize)>,
}

fn outdent_item(root: &mut ElementNode, list_path: &[usize], ix: usize) -> Option<Outdented> {
    let (&list_ix, parent_item) = list_path.split_last()?;
    let (&parent_ix, outer_list) = parent_item.split_last()?;
    if root.element(parent_item)?.kind != ElementKind::ListItem {
        return None;
    }

    let list = root.element_mut(list_path)?;
    if ix >= list.children.len() {
        return None;
    }
    let kind = list.kind.clone();
    let tail: Vec<Node> = list.children.drain(ix + 1..).collect();
    let Node::Element(mut item) = list.children.remove(ix) else {
        return None;
    };
    let list_now_empty = list.children.is_empty();

    let mut tail_at = None;
    if !tail.is_empty() {
        match item.children.last_mut() {
            Some(Node::Element(sublist)) if sublist.kind.is_list() => {
                let offset = sublist.children.len();
                sublist.children.extend(tail);
                tail_at = Some((item.children.len() - 1, offset));
            }
            _ => {
                item.children.push(Node::element(kind, tail));
                tail_at = Some((item.children.len() - 1, 0));
            }
        }
    }

    if list_now_empty {
        root.element_mut(parent_item)?.children.remove(list_ix);
    }

    let outer = root.element_mut(outer_list)?;
    let new_ix = parent_ix + 1;
    outer.children.insert(new_ix, Node::Element(item));

    let tail = tail_at.map(|(sublist_ix, first)| {
        let mut path = outer_list.to_vec();
        path.push(new_ix);
        path.push(sublist_ix);
        (path, first)
    });
    Some(Outdented { tail })
}

/// Backspace or Delete inside a list item: an empty item, or a caret at the
/// very start of an item, turns that item into a paragraph.
pub(crate) fn collapse_item_at_caret(root: &mut ElementNode, cursor: &Cursor) -> Option<Placement> {
    if !cursor.is_collapsed() {
        return None;
    }
    let item = root.nearest_ancestor(&cursor.start.path, is_list_item)?;
    let empty = root.element(&item)?.text_len() == 0;
    let at_start = cursor.range.start == root.offset_before(&item);
    if !empty && !at_start {
        return None;
    }
    convert_item(root, &item).map(Placement::StartOf)
}
