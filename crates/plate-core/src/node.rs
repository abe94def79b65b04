use serde::{Deserialize, Serialize};

use crate::media::MediaEmbed;

pub type Path = Vec<usize>;

/// Zero-width space that keeps an otherwise empty inline wrapper alive so a
/// caret can sit inside it. It never counts toward text length.
pub const PLACEHOLDER: char = '\u{200B}';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    Left,
    Center,
    Right,
    Justify,
}

impl TextAlign {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
            Self::Justify => "justify",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "left" => Some(Self::Left),
            "center" => Some(Self::Center),
            "right" => Some(Self::Right),
            "justify" => Some(Self::Justify),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    Ordered,
    Unordered,
}

impl ListKind {
    pub fn element_kind(self) -> ElementKind {
        match self {
            Self::Ordered => ElementKind::OrderedList,
            Self::Unordered => ElementKind::UnorderedList,
        }
    }

    pub fn of(kind: &ElementKind) -> Option<Self> {
        match kind {
            ElementKind::OrderedList => Some(Self::Ordered),
            ElementKind::UnorderedList => Some(Self::Unordered),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ElementKind {
    Paragraph {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        align: Option<TextAlign>,
    },
    Div {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        align: Option<TextAlign>,
    },
    Bold,
    Italic,
    Underline,
    Strike,
    UnorderedList,
    OrderedList,
    ListItem,
    Link {
        href: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<String>,
    },
    Image {
        src: String,
        #[serde(default)]
        alt: String,
    },
    Blockquote,
    CodeBlock,
    InlineStyleSpan {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        font_size: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text_align: Option<TextAlign>,
    },
    LineBreak,
    VideoEmbed {
        embed: MediaEmbed,
    },
}

impl ElementKind {
    pub fn paragraph() -> Self {
        Self::Paragraph { align: None }
    }

    pub fn font_size_span(size: u32) -> Self {
        Self::InlineStyleSpan {
            font_size: Some(size),
            text_align: None,
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(
            self,
            Self::Paragraph { .. }
                | Self::Div { .. }
                | Self::UnorderedList
                | Self::OrderedList
                | Self::ListItem
                | Self::Blockquote
                | Self::CodeBlock
                | Self::VideoEmbed { .. }
        )
    }

    pub fn is_inline(&self) -> bool {
        !self.is_block()
    }

    /// Leaves never own children.
    pub fn is_leaf(&self) -> bool {
        matches!(
            self,
            Self::Image { .. } | Self::LineBreak | Self::VideoEmbed { .. }
        )
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Self::UnorderedList | Self::OrderedList)
    }

    pub fn is_link(&self) -> bool {
        matches!(self, Self::Link { .. })
    }

    /// Paragraph and Div are the blocks that carry an alignment.
    pub fn is_text_block(&self) -> bool {
        matches!(self, Self::Paragraph { .. } | Self::Div { .. })
    }

    fn holds_caret(&self) -> bool {
        matches!(
            self,
            Self::Paragraph { .. }
                | Self::Div { .. }
                | Self::ListItem
                | Self::Blockquote
                | Self::CodeBlock
        )
    }

    fn is_inline_leaf(&self) -> bool {
        self.is_inline() && self.is_leaf()
    }

    fn is_inline_wrapper(&self) -> bool {
        self.is_inline() && !self.is_leaf()
    }

    pub fn align(&self) -> Option<TextAlign> {
        match self {
            Self::Paragraph { align } | Self::Div { align } => *align,
            Self::InlineStyleSpan { text_align, .. } => *text_align,
            _ => None,
        }
    }

    pub fn font_size(&self) -> Option<u32> {
        match self {
            Self::InlineStyleSpan { font_size, .. } => *font_size,
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
}

impl TextRun {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn placeholder() -> Self {
        Self::new(PLACEHOLDER.to_string())
    }

    /// Length in characters, not counting placeholders.
    pub fn len(&self) -> usize {
        self.text.chars().filter(|ch| *ch != PLACEHOLDER).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_placeholder(&self) -> bool {
        self.text.contains(PLACEHOLDER)
    }

    pub fn visible_text(&self) -> String {
        self.text.chars().filter(|ch| *ch != PLACEHOLDER).collect()
    }

    pub fn strip_placeholders(&mut self) {
        if self.has_placeholder() {
            self.text = self.visible_text();
        }
    }

    /// Byte index of the character offset `offset`. Placeholders sitting at
    /// that position are skipped so inserted text lands after them.
    pub fn byte_index(&self, offset: usize) -> usize {
        let mut seen = 0usize;
        for (ix, ch) in self.text.char_indices() {
            if ch == PLACEHOLDER {
                continue;
            }
            if seen == offset {
                return ix;
            }
            seen += 1;
        }
        self.text.len()
    }

    pub fn split_off(&mut self, offset: usize) -> TextRun {
        let ix = self.byte_index(offset);
        TextRun {
            text: self.text.split_off(ix),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    Element(ElementNode),
    Text(TextRun),
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(TextRun::new(text))
    }

    pub fn element(kind: ElementKind, children: Vec<Node>) -> Self {
        Node::Element(ElementNode::new(kind, children))
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Node::element(ElementKind::paragraph(), vec![Node::text(text)])
    }

    pub fn text_len(&self) -> usize {
        match self {
            Node::Text(run) => run.len(),
            Node::Element(el) => el.text_len(),
        }
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Node::Text(run) => out.extend(run.text.chars().filter(|ch| *ch != PLACEHOLDER)),
            Node::Element(el) => {
                for child in &el.children {
                    child.collect_text(out);
                }
            }
        }
    }

    pub fn is_inline(&self) -> bool {
        match self {
            Node::Text(_) => true,
            Node::Element(el) => el.kind.is_inline(),
        }
    }

    /// True when the node holds visible text or a leaf such as an image.
    pub fn has_content(&self) -> bool {
        match self {
            Node::Text(run) => !run.is_empty(),
            Node::Element(el) => el.kind.is_leaf() || el.children.iter().any(Node::has_content),
        }
    }

    pub fn has_placeholder(&self) -> bool {
        match self {
            Node::Text(run) => run.has_placeholder(),
            Node::Element(el) => el.children.iter().any(Node::has_placeholder),
        }
    }

    pub fn as_element(&self) -> Option<&ElementNode> {
        match self {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextRun> {
        match self {
            Node::Text(run) => Some(run),
            Node::Element(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementNode {
    #[serde(flatten)]
    pub kind: ElementKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl ElementNode {
    pub fn new(kind: ElementKind, children: Vec<Node>) -> Self {
        Self { kind, children }
    }

    pub fn root(children: Vec<Node>) -> Self {
        Self::new(ElementKind::Div { align: None }, children)
    }

    pub fn text_len(&self) -> usize {
        self.children.iter().map(Node::text_len).sum()
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            child.collect_text(&mut out);
        }
        out
    }

    pub fn node(&self, path: &[usize]) -> Option<&Node> {
        let (last, parent) = path.split_last()?;
        self.element(parent)?.children.get(*last)
    }

    /// The element at `path`; the empty path is `self`.
    pub fn element(&self, path: &[usize]) -> Option<&ElementNode> {
        let Some((first, rest)) = path.split_first() else {
            return Some(self);
        };
        match self.children.get(*first)? {
            Node::Element(el) => el.element(rest),
            Node::Text(_) => None,
        }
    }

    pub fn element_mut(&mut self, path: &[usize]) -> Option<&mut ElementNode> {
        let Some((first, rest)) = path.split_first() else {
            return Some(self);
        };
        match self.children.get_mut(*first)? {
            Node::Element(el) => el.element_mut(rest),
            Node::Text(_) => None,
        }
    }

    pub fn text_run(&self, path: &[usize]) -> Option<&TextRun> {
        self.node(path)?.as_text()
    }

    pub fn text_run_mut(&mut self, path: &[usize]) -> Option<&mut TextRun> {
        let (last, parent) = path.split_last()?;
        match self.element_mut(parent)?.children.get_mut(*last)? {
            Node::Text(run) => Some(run),
            Node::Element(_) => None,
        }
    }

    /// Text length preceding the node at `path` in pre-order.
    pub fn offset_before(&self, path: &[usize]) -> usize {
        let mut offset = 0usize;
        let mut el = self;
        for (depth, &ix) in path.iter().enumerate() {
            offset += el.children.iter().take(ix).map(Node::text_len).sum::<usize>();
            match el.children.get(ix) {
                Some(Node::Element(child)) if depth + 1 < path.len() => el = child,
                _ => break,
            }
        }
        offset
    }

    /// Deepest element on `path` (the root excluded) whose kind matches.
    pub fn nearest_ancestor(
        &self,
        path: &[usize],
        pred: impl Fn(&ElementKind) -> bool,
    ) -> Option<Path> {
        for len in (1..=path.len()).rev() {
            let prefix = &path[..len];
            if let Some(el) = self.element(prefix) {
                if pred(&el.kind) {
                    return Some(prefix.to_vec());
                }
            }
        }
        None
    }

    /// Kinds of the elements on `path` from the outermost down, root excluded.
    pub fn ancestor_kinds(&self, path: &[usize]) -> Vec<ElementKind> {
        (1..=path.len())
            .filter_map(|len| self.element(&path[..len]))
            .map(|el| el.kind.clone())
            .collect()
    }
}

/// Brings the tree into canonical shape without changing its flattened text.
pub fn normalize(root: &mut ElementNode, max_passes: usize) {
    for _ in 0..max_passes.max(1) {
        let before = root.clone();
        normalize_pass(root);
        if *root == before {
            return;
        }
    }
    tracing::warn!(max_passes, "document normalization did not converge");
}

fn normalize_pass(root: &mut ElementNode) {
    normalize_children(root);
    let children = std::mem::take(&mut root.children);
    root.children = wrap_inline_runs(children);
    if root.children.is_empty() {
        root.children.push(Node::paragraph(""));
    }
}

fn normalize_children(el: &mut ElementNode) {
    let children = std::mem::take(&mut el.children);
    let mut out: Vec<Node> = Vec::with_capacity(children.len());
    for child in children {
        match child {
            Node::Element(mut child) => {
                normalize_children(&mut child);
                if is_disposable(&child) {
                    continue;
                }
                push_merged(&mut out, Node::Element(child));
            }
            text => push_merged(&mut out, text),
        }
    }

    if el.kind.is_list() {
        out = gather_list_items(out);
    } else {
        out = wrap_stray_items(out);
    }
    drop_stray_empty_runs(&mut out);

    let ends_with_leaf = matches!(out.last(), Some(Node::Element(last)) if last.kind.is_inline_leaf());
    if el.kind.holds_caret() && (out.is_empty() || ends_with_leaf) {
        out.push(Node::text(""));
    }
    el.children = out;
}

fn is_disposable(el: &ElementNode) -> bool {
    if el.kind.is_list() {
        return el.children.is_empty();
    }
    el.kind.is_inline_wrapper()
        && el
            .children
            .iter()
            .all(|child| matches!(child, Node::Text(run) if run.text.is_empty()))
}

pub(crate) fn push_merged(out: &mut Vec<Node>, node: Node) {
    let node = match (out.last_mut(), node) {
        (Some(Node::Text(prev)), Node::Text(run)) => {
            prev.text.push_str(&run.text);
            return;
        }
        (Some(Node::Element(prev)), Node::Element(next))
            if prev.kind == next.kind && prev.kind.is_inline_wrapper() =>
        {
            let mut merged = std::mem::take(&mut prev.children);
            merged.extend(next.children);
            let mut rebuilt = Vec::with_capacity(merged.len());
            for child in merged {
                push_merged(&mut rebuilt, child);
            }
            prev.children = rebuilt;
            return;
        }
        (_, node) => node,
    };
    out.push(node);
}

fn drop_stray_empty_runs(out: &mut Vec<Node>) {
    let mut ix = 0usize;
    while ix < out.len() {
        let empty = matches!(&out[ix], Node::Text(run) if run.text.is_empty());
        let after_leaf = ix > 0
            && matches!(&out[ix - 1], Node::Element(prev) if prev.kind.is_inline_leaf());
        if empty && out.len() > 1 && !after_leaf {
            out.remove(ix);
        } else {
            ix += 1;
        }
    }
}

fn gather_list_items(children: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(children.len());
    let mut loose: Vec<Node> = Vec::new();

    let flush = |out: &mut Vec<Node>, loose: &mut Vec<Node>| {
        let blank = loose
            .iter()
            .all(|n| matches!(n, Node::Text(run) if run.text.trim().is_empty()));
        if !blank {
            out.push(Node::element(ElementKind::ListItem, std::mem::take(loose)));
        }
        loose.clear();
    };

    for child in children {
        match child {
            Node::Element(item) if item.kind == ElementKind::ListItem => {
                flush(&mut out, &mut loose);
                out.push(Node::Element(item));
            }
            Node::Element(list) if list.kind.is_list() => {
                flush(&mut out, &mut loose);
                match out.last_mut() {
                    Some(Node::Element(prev)) => prev.children.push(Node::Element(list)),
                    _ => out.push(Node::element(
                        ElementKind::ListItem,
                        vec![Node::Element(list)],
                    )),
                }
            }
            Node::Element(block) if block.kind.is_block() => {
                flush(&mut out, &mut loose);
                out.push(Node::element(ElementKind::ListItem, vec![Node::Element(block)]));
            }
            inline => loose.push(inline),
        }
    }
    flush(&mut out, &mut loose);
    out
}

/// List items outside a list go into an unordered list, one list per run of
/// consecutive items. Blank text between two items is dropped.
fn wrap_stray_items(children: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(children.len());
    let mut items: Vec<Node> = Vec::new();
    let mut gap: Vec<Node> = Vec::new();

    let flush = |out: &mut Vec<Node>, items: &mut Vec<Node>| {
        if !items.is_empty() {
            out.push(Node::element(
                ElementKind::UnorderedList,
                std::mem::take(items),
            ));
        }
    };

    for child in children {
        match child {
            Node::Element(item) if item.kind == ElementKind::ListItem => {
                gap.clear();
                items.push(Node::Element(item));
            }
            Node::Text(run) if !items.is_empty() && run.text.trim().is_empty() => {
                gap.push(Node::Text(run));
            }
            other => {
                flush(&mut out, &mut items);
                out.append(&mut gap);
                out.push(other);
            }
        }
    }
    flush(&mut out, &mut items);
    out.append(&mut gap);
    out
}

/// Wraps each run of consecutive inline siblings in a Paragraph. Runs made of
/// blank text are dropped unless they are the only content.
pub(crate) fn wrap_inline_runs(nodes: Vec<Node>) -> Vec<Node> {
    let only_inline = nodes.iter().all(Node::is_inline);
    let mut out: Vec<Node> = Vec::with_capacity(nodes.len());
    let mut group: Vec<Node> = Vec::new();

    let flush = |out: &mut Vec<Node>, group: &mut Vec<Node>| {
        if group.is_empty() {
            return;
        }
        let blank = group
            .iter()
            .all(|n| matches!(n, Node::Text(run) if run.text.trim().is_empty()));
        if !blank || only_inline {
            out.push(Node::element(ElementKind::paragraph(), std::mem::take(group)));
        }
        group.clear();
    };

    for node in nodes {
        if node.is_inline() {
            group.push(node);
        } else {
            flush(&mut out, &mut group);
            out.push(node);
        }
    }
    flush(&mut out, &mut group);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bold(children: Vec<Node>) -> Node {
        Node::element(ElementKind::Bold, children)
    }

    #[test]
    fn placeholder_does_not_count_toward_length() {
        let run = TextRun::new(format!("a{PLACEHOLDER}b"));
        assert_eq!(run.len(), 2);
        assert_eq!(run.byte_index(1), 1 + PLACEHOLDER.len_utf8());
        assert_eq!(run.visible_text(), "ab");
    }

    #[test]
    fn normalize_merges_runs_and_identical_wrappers() {
        let mut root = ElementNode::root(vec![Node::element(
            ElementKind::paragraph(),
            vec![
                Node::text("a"),
                Node::text("b"),
                bold(vec![Node::text("c")]),
                bold(vec![Node::text("d")]),
                bold(vec![]),
            ],
        )]);
        normalize(&mut root, 8);

        let paragraph = root.element(&[0]).unwrap();
        assert_eq!(
            paragraph.children,
            vec![Node::text("ab"), bold(vec![Node::text("cd")])]
        );
    }

    #[test]
    fn normalize_wraps_loose_root_text_and_fills_empty_document() {
        let mut root = ElementNode::root(vec![Node::text("hello")]);
        normalize(&mut root, 8);
        assert_eq!(root.children, vec![Node::paragraph("hello")]);

        let mut empty = ElementNode::root(Vec::new());
        normalize(&mut empty, 8);
        assert_eq!(empty.children, vec![Node::paragraph("")]);
    }

    #[test]
    fn normalize_keeps_caret_slot_after_trailing_image() {
        let image = Node::element(
            ElementKind::Image {
                src: "a.png".into(),
                alt: String::new(),
            },
            Vec::new(),
        );
        let mut root = ElementNode::root(vec![Node::element(
            ElementKind::paragraph(),
            vec![Node::text("x"), image.clone()],
        )]);
        normalize(&mut root, 8);
        let paragraph = root.element(&[0]).unwrap();
        assert_eq!(
            paragraph.children,
            vec![Node::text("x"), image, Node::text("")]
        );
    }

    #[test]
    fn normalize_puts_stray_items_into_a_list() {
        let item = |text: &str| Node::element(ElementKind::ListItem, vec![Node::text(text)]);
        let mut root = ElementNode::root(vec![
            Node::paragraph("z"),
            item("a"),
            Node::text("\n"),
            item("b"),
        ]);
        normalize(&mut root, 8);
        assert_eq!(
            root.children,
            vec![
                Node::paragraph("z"),
                Node::element(ElementKind::UnorderedList, vec![item("a"), item("b")]),
            ]
        );
    }

    #[test]
    fn offset_before_sums_preceding_text() {
        let root = ElementNode::root(vec![
            Node::paragraph("ab"),
            Node::element(
                ElementKind::paragraph(),
                vec![Node::text("c"), bold(vec![Node::text("de")])],
            ),
        ]);
        assert_eq!(root.offset_before(&[1]), 2);
        assert_eq!(root.offset_before(&[1, 1, 0]), 3);
    }
}
