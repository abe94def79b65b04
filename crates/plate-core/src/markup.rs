//! Markup tokenizer plus the codec between markup and the document tree.

use crate::config::DEFAULT_MAX_NORMALIZE_ITERATIONS;
use crate::media::{MediaEmbed, video_mime_for};
use crate::node::{ElementKind, ElementNode, Node, TextAlign, normalize};

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const RAW_TEXT_TAGS: &[&str] = &["script", "style", "textarea", "title"];

/// Elements whose whole subtree is dropped when converting to a document.
const OPAQUE_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "head", "title", "textarea", "object", "embed",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawNode {
    Element(RawElement),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawElement {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<RawNode>,
}

impl RawElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn is_void(&self) -> bool {
        VOID_TAGS.contains(&self.tag.as_str())
    }
}

/// Parses a markup fragment into a raw element tree. Tags are never implied:
/// every element spans from its start tag to the matching end tag, and
/// anything still open at the end of input is closed there.
pub fn parse_fragment(input: &str) -> Vec<RawNode> {
    let bytes = input.as_bytes();
    let mut idx = 0_usize;
    let mut tree = TreeBuilder::default();

    while idx < bytes.len() {
        if bytes[idx] != b'<' {
            let next = find_byte(bytes, idx, b'<').unwrap_or(bytes.len());
            tree.push(RawNode::Text(decode_entities(&input[idx..next])));
            idx = next;
            continue;
        }

        if starts_with(bytes, idx, b"<!--") {
            idx = skip_comment(bytes, idx);
            continue;
        }

        if starts_with(bytes, idx, b"<!") {
            idx = skip_to_gt(bytes, idx.saturating_add(2));
            continue;
        }

        if starts_with(bytes, idx, b"<?") {
            idx = skip_processing_instruction(bytes, idx);
            continue;
        }

        let Some((tag, next_idx)) = parse_tag(input, idx) else {
            tree.push(RawNode::Text("<".to_string()));
            idx = idx.saturating_add(1);
            continue;
        };

        if tag.is_end {
            tree.close(&tag.name);
            idx = next_idx;
            continue;
        }

        let mut element = RawElement {
            tag: tag.name,
            attrs: tag.attrs,
            children: Vec::new(),
        };

        if !tag.self_closing && RAW_TEXT_TAGS.contains(&element.tag.as_str()) {
            let (raw, after_raw) = read_raw_text_until_end_tag(input, next_idx, &element.tag);
            if !raw.is_empty() {
                element.children.push(RawNode::Text(raw.to_string()));
            }
            tree.push(RawNode::Element(element));
            idx = after_raw;
            continue;
        }

        if tag.self_closing || element.is_void() {
            tree.push(RawNode::Element(element));
        } else {
            tree.open.push(element);
        }
        idx = next_idx;
    }

    tree.finish()
}

pub fn serialize_fragment(nodes: &[RawNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_raw(node, &mut out);
    }
    out
}

fn write_raw(node: &RawNode, out: &mut String) {
    match node {
        RawNode::Text(text) => out.push_str(&escape_text(text)),
        RawNode::Element(el) => {
            let attrs: Vec<(&str, &str)> = el
                .attrs
                .iter()
                .map(|(key, value)| (key.as_str(), value.as_str()))
                .collect();
            write_open_tag(out, &el.tag, &attrs);
            if el.is_void() {
                return;
            }
            for child in &el.children {
                write_raw(child, out);
            }
            write_close_tag(out, &el.tag);
        }
    }
}

fn write_open_tag(out: &mut String, tag: &str, attrs: &[(&str, &str)]) {
    out.push('<');
    out.push_str(tag);
    for (key, value) in attrs {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&escape_attr(value));
        out.push('"');
    }
    out.push('>');
}

fn write_close_tag(out: &mut String, tag: &str) {
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

/// Parses markup into a normalized document root.
pub fn parse_document(input: &str) -> ElementNode {
    let mut root = ElementNode::root(convert_fragment(parse_fragment(input)));
    normalize(&mut root, DEFAULT_MAX_NORMALIZE_ITERATIONS);
    root
}

/// Serializes the children of `root`; the root itself is never written.
pub fn serialize(root: &ElementNode) -> String {
    let mut out = String::new();
    for child in &root.children {
        write_node(child, &mut out);
    }
    out
}

pub(crate) fn convert_fragment(raw: Vec<RawNode>) -> Vec<Node> {
    convert_nodes(raw, false)
}

fn convert_nodes(raw: Vec<RawNode>, in_list: bool) -> Vec<Node> {
    let mut out = Vec::with_capacity(raw.len());
    for node in raw {
        match node {
            RawNode::Text(text) => out.push(Node::text(text)),
            RawNode::Element(el) => convert_element(el, &mut out),
        }
    }

    let has_block = out.iter().any(|node| !node.is_inline());
    if in_list || has_block {
        out.retain(|node| match node {
            Node::Text(run) => !is_formatting_whitespace(&run.text, in_list),
            Node::Element(_) => true,
        });
    }
    out
}

fn is_formatting_whitespace(text: &str, in_list: bool) -> bool {
    !text.is_empty() && text.trim().is_empty() && (in_list || text.contains('\n'))
}

fn convert_element(el: RawElement, out: &mut Vec<Node>) {
    if OPAQUE_TAGS.contains(&el.tag.as_str()) {
        return;
    }

    if let Some(embed) = embed_of(&el) {
        out.push(Node::element(ElementKind::VideoEmbed { embed }, Vec::new()));
        return;
    }
    if el.tag == "div" && has_class(&el, "video-embed") {
        if let Some(embed) = find_embed(&el.children) {
            out.push(Node::element(ElementKind::VideoEmbed { embed }, Vec::new()));
            return;
        }
    }

    let style = el.attr("style").unwrap_or_default().to_string();
    let kind = match el.tag.as_str() {
        "b" | "strong" => ElementKind::Bold,
        "i" | "em" => ElementKind::Italic,
        "u" => ElementKind::Underline,
        "s" | "strike" | "del" => ElementKind::Strike,
        "ul" => ElementKind::UnorderedList,
        "ol" => ElementKind::OrderedList,
        "li" => ElementKind::ListItem,
        "blockquote" => ElementKind::Blockquote,
        "pre" => ElementKind::CodeBlock,
        "br" => ElementKind::LineBreak,
        "p" => ElementKind::Paragraph {
            align: style_property(&style, "text-align").and_then(|value| TextAlign::parse(&value)),
        },
        "div" => ElementKind::Div {
            align: style_property(&style, "text-align").and_then(|value| TextAlign::parse(&value)),
        },
        "img" => match el.attr("src") {
            Some(src) if !src.trim().is_empty() => ElementKind::Image {
                src: src.to_string(),
                alt: el.attr("alt").unwrap_or_default().to_string(),
            },
            _ => return,
        },
        "a" => {
            let href = el
                .attr("href")
                .filter(|href| !href.trim().is_empty())
                .map(str::to_string);
            let Some(href) = href else {
                out.extend(convert_nodes(el.children, false));
                return;
            };
            ElementKind::Link {
                href,
                target: el.attr("target").map(str::to_string),
            }
        }
        "span" => {
            let font_size = style_property(&style, "font-size").and_then(|value| parse_px(&value));
            let text_align =
                style_property(&style, "text-align").and_then(|value| TextAlign::parse(&value));
            if font_size.is_none() && text_align.is_none() {
                out.extend(convert_nodes(el.children, false));
                return;
            }
            ElementKind::InlineStyleSpan {
                font_size,
                text_align,
            }
        }
        _ => {
            out.extend(convert_nodes(el.children, false));
            return;
        }
    };

    let children = if kind.is_leaf() {
        Vec::new()
    } else {
        convert_nodes(el.children, kind.is_list())
    };
    out.push(Node::element(kind, children));
}

fn has_class(el: &RawElement, class: &str) -> bool {
    el.attr("class")
        .is_some_and(|value| value.split_ascii_whitespace().any(|name| name == class))
}

fn find_embed(nodes: &[RawNode]) -> Option<MediaEmbed> {
    nodes.iter().find_map(|node| match node {
        RawNode::Element(el) => embed_of(el).or_else(|| find_embed(&el.children)),
        RawNode::Text(_) => None,
    })
}

fn embed_of(el: &RawElement) -> Option<MediaEmbed> {
    match el.tag.as_str() {
        "iframe" => el
            .attr("src")
            .filter(|src| !src.trim().is_empty())
            .map(|src| MediaEmbed::Frame {
                src: src.to_string(),
            }),
        "video" => {
            let (src, mime) = el
                .attr("src")
                .map(|src| (src, el.attr("type")))
                .or_else(|| {
                    el.children.iter().find_map(|child| match child {
                        RawNode::Element(source) if source.tag == "source" => {
                            source.attr("src").map(|src| (src, source.attr("type")))
                        }
                        _ => None,
                    })
                })?;
            if src.trim().is_empty() {
                return None;
            }
            Some(MediaEmbed::Video {
                src: src.to_string(),
                mime: mime
                    .map(str::to_string)
                    .unwrap_or_else(|| video_mime_for(src)),
            })
        }
        _ => None,
    }
}

pub(crate) fn style_property(style: &str, name: &str) -> Option<String> {
    style.split(';').find_map(|decl| {
        let (key, value) = decl.split_once(':')?;
        if key.trim().eq_ignore_ascii_case(name) {
            Some(value.trim().to_string())
        } else {
            None
        }
    })
}

fn parse_px(value: &str) -> Option<u32> {
    let number = value.trim().trim_end_matches("px").trim();
    let parsed: f32 = number.parse().ok()?;
    if parsed.is_finite() && parsed > 0.0 {
        Some(parsed.round() as u32)
    } else {
        None
    }
}

fn write_node(node: &Node, out: &mut String) {
    let el = match node {
        Node::Text(run) => {
            out.push_str(&escape_text(&run.text));
            return;
        }
        Node::Element(el) => el,
    };

    let (tag, attrs): (&str, Vec<(&str, String)>) = match &el.kind {
        ElementKind::Paragraph { align } => ("p", align_attr(*align)),
        ElementKind::Div { align } => ("div", align_attr(*align)),
        ElementKind::Bold => ("b", Vec::new()),
        ElementKind::Italic => ("i", Vec::new()),
        ElementKind::Underline => ("u", Vec::new()),
        ElementKind::Strike => ("s", Vec::new()),
        ElementKind::UnorderedList => ("ul", Vec::new()),
        ElementKind::OrderedList => ("ol", Vec::new()),
        ElementKind::ListItem => ("li", Vec::new()),
        ElementKind::Blockquote => ("blockquote", Vec::new()),
        ElementKind::CodeBlock => ("pre", Vec::new()),
        ElementKind::LineBreak => ("br", Vec::new()),
        ElementKind::Link { href, target } => {
            let mut attrs = vec![("href", href.clone())];
            if let Some(target) = target {
                attrs.push(("target", target.clone()));
            }
            ("a", attrs)
        }
        ElementKind::Image { src, alt } => ("img", vec![("src", src.clone()), ("alt", alt.clone())]),
        ElementKind::InlineStyleSpan {
            font_size,
            text_align,
        } => {
            let mut decls = Vec::new();
            if let Some(size) = font_size {
                decls.push(format!("font-size: {size}px"));
            }
            if let Some(align) = text_align {
                decls.push(format!("text-align: {}", align.as_str()));
            }
            if decls.is_empty() {
                for child in &el.children {
                    write_node(child, out);
                }
                return;
            }
            ("span", vec![("style", decls.join("; "))])
        }
        ElementKind::VideoEmbed { embed } => {
            out.push_str(&embed.to_markup());
            return;
        }
    };

    let attrs: Vec<(&str, &str)> = attrs
        .iter()
        .map(|(key, value)| (*key, value.as_str()))
        .collect();
    write_open_tag(out, tag, &attrs);
    if el.kind.is_leaf() {
        return;
    }
    for child in &el.children {
        write_node(child, out);
    }
    write_close_tag(out, tag);
}

fn align_attr(align: Option<TextAlign>) -> Vec<(&'static str, String)> {
    align
        .map(|align| vec![("style", format!("text-align: {}", align.as_str()))])
        .unwrap_or_default()
}

pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail
            .find(';')
            .filter(|end| *end <= 12)
            .and_then(|end| decode_entity(&tail[1..end]).map(|ch| (ch, end)));
        match decoded {
            Some((ch, end)) => {
                out.push(ch);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let number = name.strip_prefix('#')?;
            let code = match number.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => number.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

#[derive(Debug, Default)]
struct TreeBuilder {
    open: Vec<RawElement>,
    roots: Vec<RawNode>,
}

impl TreeBuilder {
    fn push(&mut self, node: RawNode) {
        if matches!(&node, RawNode::Text(text) if text.is_empty()) {
            return;
        }
        let siblings = match self.open.last_mut() {
            Some(parent) => &mut parent.children,
            None => &mut self.roots,
        };
        if let (Some(RawNode::Text(prev)), RawNode::Text(text)) = (siblings.last_mut(), &node) {
            prev.push_str(text);
            return;
        }
        siblings.push(node);
    }

    fn close(&mut self, name: &str) {
        let Some(pos) = self.open.iter().rposition(|el| el.tag == name) else {
            return;
        };
        while self.open.len() > pos {
            if let Some(el) = self.open.pop() {
                self.push(RawNode::Element(el));
            }
        }
    }

    fn finish(mut self) -> Vec<RawNode> {
        while let Some(el) = self.open.pop() {
            self.push(RawNode::Element(el));
        }
        self.roots
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ParsedTag {
    name: String,
    is_end: bool,
    self_closing: bool,
    attrs: Vec<(String, String)>,
}

fn parse_tag(input: &str, start: usize) -> Option<(ParsedTag, usize)> {
    let bytes = input.as_bytes();
    if bytes.get(start).copied() != Some(b'<') {
        return None;
    }

    let mut idx = start.saturating_add(1);
    let mut is_end = false;
    if bytes.get(idx).copied() == Some(b'/') {
        is_end = true;
        idx = idx.saturating_add(1);
    }

    let name_start = idx;
    while idx < bytes.len() && is_tag_name_char(bytes[idx]) {
        idx = idx.saturating_add(1);
    }
    if idx == name_start {
        return None;
    }
    let name = input[name_start..idx].to_ascii_lowercase();

    let mut attrs: Vec<(String, String)> = Vec::new();
    loop {
        idx = skip_spaces(bytes, idx);
        match bytes.get(idx).copied() {
            None => return None,
            Some(b'>') => {
                let tag = ParsedTag {
                    name,
                    is_end,
                    self_closing: false,
                    attrs,
                };
                return Some((tag, idx.saturating_add(1)));
            }
            Some(b'/') => {
                if bytes.get(idx.saturating_add(1)).copied() == Some(b'>') {
                    let tag = ParsedTag {
                        name,
                        is_end,
                        self_closing: true,
                        attrs,
                    };
                    return Some((tag, idx.saturating_add(2)));
                }
                idx = idx.saturating_add(1);
                continue;
            }
            Some(_) => {}
        }

        let attr_start = idx;
        while idx < bytes.len()
            && !bytes[idx].is_ascii_whitespace()
            && !matches!(bytes[idx], b'=' | b'>' | b'/')
        {
            idx = idx.saturating_add(1);
        }
        let attr_name = input[attr_start..idx].to_ascii_lowercase();

        idx = skip_spaces(bytes, idx);
        let mut value = String::new();
        if bytes.get(idx).copied() == Some(b'=') {
            idx = skip_spaces(bytes, idx.saturating_add(1));
            match bytes.get(idx).copied() {
                Some(quote @ (b'"' | b'\'')) => {
                    let end = find_byte(bytes, idx.saturating_add(1), quote)?;
                    value = decode_entities(&input[idx.saturating_add(1)..end]);
                    idx = end.saturating_add(1);
                }
                Some(_) => {
                    let value_start = idx;
                    while idx < bytes.len() && !bytes[idx].is_ascii_whitespace() && bytes[idx] != b'>'
                    {
                        idx = idx.saturating_add(1);
                    }
                    value = decode_entities(&input[value_start..idx]);
                }
                None => return None,
            }
        }

        if !attr_name.is_empty() && !attrs.iter().any(|(key, _)| *key == attr_name) {
            attrs.push((attr_name, value));
        }
    }
}

fn read_raw_text_until_end_tag<'a>(
    input: &'a str,
    start: usize,
    tag_name: &str,
) -> (&'a str, usize) {
    let bytes = input.as_bytes();
    let tag_bytes = tag_name.as_bytes();
    let mut idx = start;

    while idx < bytes.len() {
        if bytes[idx] == b'<'
            && bytes.get(idx.saturating_add(1)).copied() == Some(b'/')
            && starts_with_ignore_ascii_case(bytes, idx.saturating_add(2), tag_bytes)
            && tag_name_boundary(bytes, idx.saturating_add(2 + tag_bytes.len()))
        {
            if let Some((_, end_idx)) = parse_tag(input, idx) {
                return (&input[start..idx], end_idx);
            }
        }

        idx = idx.saturating_add(1);
    }

    (&input[start.min(bytes.len())..], bytes.len())
}

fn skip_comment(bytes: &[u8], start: usize) -> usize {
    find_subslice(bytes, start.saturating_add(4), b"-->")
        .map(|end| end.saturating_add(3))
        .unwrap_or(bytes.len())
}

fn skip_processing_instruction(bytes: &[u8], start: usize) -> usize {
    if let Some(end) = find_subslice(bytes, start.saturating_add(2), b"?>") {
        return end.saturating_add(2);
    }

    skip_to_gt(bytes, start.saturating_add(2))
}

fn skip_to_gt(bytes: &[u8], mut idx: usize) -> usize {
    while idx < bytes.len() {
        if bytes[idx] == b'>' {
            return idx.saturating_add(1);
        }
        idx = idx.saturating_add(1);
    }

    bytes.len()
}

fn tag_name_boundary(bytes: &[u8], idx: usize) -> bool {
    match bytes.get(idx).copied() {
        None => true,
        Some(byte) => byte.is_ascii_whitespace() || byte == b'>' || byte == b'/',
    }
}

fn skip_spaces(bytes: &[u8], mut idx: usize) -> usize {
    while idx < bytes.len() && bytes[idx].is_ascii_whitespace() {
        idx = idx.saturating_add(1);
    }
    idx
}

fn is_tag_name_char(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b':')
}

fn starts_with(bytes: &[u8], idx: usize, pattern: &[u8]) -> bool {
    let end = idx.saturating_add(pattern.len());
    end <= bytes.len() && bytes[idx..end] == *pattern
}

fn starts_with_ignore_ascii_case(bytes: &[u8], idx: usize, pattern: &[u8]) -> bool {
    let end = idx.saturating_add(pattern.len());
    if end > bytes.len() {
        return false;
    }

    bytes[idx..end]
        .iter()
        .zip(pattern.iter())
        .all(|(left, right)| left.eq_ignore_ascii_case(right))
}

fn find_subslice(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from >= bytes.len() {
        return None;
    }

    bytes[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|offset| from + offset)
}

fn find_byte(bytes: &[u8], from: usize, byte: u8) -> Option<usize> {
    bytes
        .get(from..)?
        .iter()
        .position(|candidate| *candidate == byte)
        .map(|offset| from + offset)
}
