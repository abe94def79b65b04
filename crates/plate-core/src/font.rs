use crate::inline::{insert_at_point, map_inline_groups, park_placeholder, wrap_range};
use crate::node::{ElementKind, ElementNode, Node, TextRun};
use crate::selection::{Cursor, Placement, Point};

pub const MIN_FONT_SIZE: u32 = 8;
pub const MAX_FONT_SIZE: u32 = 72;

pub fn clamp_font_size(size: u32) -> u32 {
    size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE)
}

/// Font size in effect at `point`: the nearest sized span, else `base`.
pub fn current_font_size(root: &ElementNode, point: Option<&Point>, base: u32) -> u32 {
    let Some(point) = point else {
        return base;
    };
    root.nearest_ancestor(&point.path, |kind| kind.font_size().is_some())
        .and_then(|path| root.element(&path))
        .and_then(|el| el.kind.font_size())
        .unwrap_or(base)
}

pub(crate) fn apply_font_size(root: &mut ElementNode, cursor: &Cursor, size: u32) -> Placement {
    let size = clamp_font_size(size);
    let span = ElementKind::font_size_span(size);

    if cursor.is_collapsed() {
        let sized = root
            .nearest_ancestor(&cursor.start.path, |kind| kind.font_size().is_some())
            .is_some();
        if sized {
            return park_placeholder(root, cursor, &without_font_size, Some(span));
        }
        let placeholder = Node::element(span, vec![Node::Text(TextRun::placeholder())]);
        if insert_at_point(root, &cursor.start, vec![placeholder]).is_none() {
            return Placement::Keep;
        }
        return Placement::Placeholder(cursor.range.start);
    }

    let range = cursor.range;
    map_inline_groups(root, range.start, range.end, &mut |nodes, start, end| {
        wrap_range(nodes, start, end, &span, &strip_font_sizes)
    });
    Placement::Offsets(range)
}

fn without_font_size(kind: ElementKind) -> Option<ElementKind> {
    match kind {
        ElementKind::InlineStyleSpan {
            font_size: Some(_),
            text_align: None,
        } => None,
        ElementKind::InlineStyleSpan {
            font_size: Some(_),
            text_align,
        } => Some(ElementKind::InlineStyleSpan {
            font_size: None,
            text_align,
        }),
        other => Some(other),
    }
}

/// Removes font sizes below the new span so it is the only one in effect.
fn strip_font_sizes(nodes: Vec<Node>) -> Vec<Node> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            Node::Element(mut el) => {
                el.children = strip_font_sizes(std::mem::take(&mut el.children));
                match el.kind {
                    ElementKind::InlineStyleSpan {
                        font_size: Some(_),
                        text_align: None,
                    } => out.extend(el.children),
                    ElementKind::InlineStyleSpan {
                        font_size: Some(_),
                        text_align,
                    } => {
                        el.kind = ElementKind::InlineStyleSpan {
                            font_size: None,
                            text_align,
                        };
                        out.push(Node::Element(el));
                    }
                    _ => out.push(Node::Element(el)),
                }
            }
            text => out.push(text),
        }
    }
    out
}
