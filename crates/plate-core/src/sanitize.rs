//! Whitelist sanitizer for pasted markup.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::inline::text_with_breaks;
use crate::markup::{
    RawElement, RawNode, convert_fragment, parse_fragment, serialize_fragment, style_property,
};
use crate::node::{Node, TextAlign};

/// Elements dropped together with everything inside them.
const DISCARDED_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "iframe", "object", "embed", "head", "title",
    "textarea",
];

const SIMPLE_TAGS: &[&str] = &["b", "i", "u", "br", "p", "div"];

const RICH_TAGS: &[&str] = &[
    "b", "i", "u", "s", "ul", "ol", "li", "a", "blockquote", "pre", "img", "br", "p", "div",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SanitizeMode {
    Simple,
    #[default]
    Rich,
}

impl SanitizeMode {
    fn allowed_tags(self) -> &'static [&'static str] {
        match self {
            Self::Simple => SIMPLE_TAGS,
            Self::Rich => RICH_TAGS,
        }
    }
}

/// Clipboard contents offered to the editor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PastePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(default)]
    pub text: String,
}

impl PastePayload {
    pub fn html(html: impl Into<String>) -> Self {
        Self {
            html: Some(html.into()),
            text: String::new(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            html: None,
            text: text.into(),
        }
    }

    fn markup(&self) -> Option<&str> {
        self.html.as_deref().filter(|html| !html.trim().is_empty())
    }
}

/// Sanitizes a markup fragment and serializes the result with canonical tags.
/// Running it on its own output changes nothing.
pub fn sanitize(fragment: &str, mode: SanitizeMode) -> String {
    serialize_fragment(&sanitize_fragment(parse_fragment(fragment), mode))
}

/// Post-order walk over a raw tree: children are cleaned before their parent
/// decides whether to keep, rename or unwrap itself.
pub fn sanitize_fragment(nodes: Vec<RawNode>, mode: SanitizeMode) -> Vec<RawNode> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        clean_node(node, mode, &mut out);
    }
    out
}

fn clean_node(node: RawNode, mode: SanitizeMode, out: &mut Vec<RawNode>) {
    let el = match node {
        RawNode::Text(text) => {
            out.push(RawNode::Text(text));
            return;
        }
        RawNode::Element(el) => el,
    };

    if DISCARDED_TAGS.contains(&el.tag.as_str()) {
        tracing::debug!(tag = %el.tag, "discarding element with its content");
        return;
    }

    let children = sanitize_fragment(el.children, mode);
    let Some(tag) = canonical_tag(&el.tag, mode) else {
        out.extend(children);
        return;
    };

    let attrs = clean_attrs(tag, &el.attrs, mode);
    let has = |name: &str| attrs.iter().any(|(key, _)| key == name);
    match tag {
        "a" if !has("href") => {
            out.extend(children);
            return;
        }
        "img" if !has("src") => return,
        _ => {}
    }

    out.push(RawNode::Element(RawElement {
        tag: tag.to_string(),
        attrs,
        children,
    }));
}

fn canonical_tag(tag: &str, mode: SanitizeMode) -> Option<&'static str> {
    let tag = match tag {
        "strong" => "b",
        "em" => "i",
        "strike" | "del" => "s",
        other => other,
    };
    mode.allowed_tags().iter().copied().find(|allowed| *allowed == tag)
}

fn clean_attrs(tag: &str, attrs: &[(String, String)], mode: SanitizeMode) -> Vec<(String, String)> {
    let get = |name: &str| {
        attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    };
    let mut out = Vec::new();
    match tag {
        "a" => {
            if let Some(href) = get("href").filter(|href| is_safe_href(href)) {
                out.push(("href".to_string(), href.trim().to_string()));
                if let Some(target) = get("target").filter(|target| !target.trim().is_empty()) {
                    out.push(("target".to_string(), target.trim().to_string()));
                }
            }
        }
        "img" => {
            if let Some(src) = get("src").filter(|src| is_safe_image_src(src)) {
                out.push(("src".to_string(), src.trim().to_string()));
                out.push(("alt".to_string(), get("alt").unwrap_or_default().to_string()));
            }
        }
        "p" | "div" if mode == SanitizeMode::Rich => {
            let align = get("style")
                .and_then(|style| style_property(style, "text-align"))
                .and_then(|value| TextAlign::parse(&value));
            if let Some(align) = align {
                out.push(("style".to_string(), format!("text-align: {}", align.as_str())));
            }
        }
        _ => {}
    }
    out
}

/// Link targets must be web, mail or phone addresses, or relative references.
pub fn is_safe_href(href: &str) -> bool {
    let href = href.trim();
    if href.is_empty() {
        return false;
    }
    match Url::parse(href) {
        Ok(url) => matches!(url.scheme(), "http" | "https" | "mailto" | "tel"),
        Err(url::ParseError::RelativeUrlWithoutBase) => !href.chars().any(char::is_whitespace),
        Err(_) => false,
    }
}

/// Image sources must be web addresses, relative references, or raster image
/// data URIs.
pub fn is_safe_image_src(src: &str) -> bool {
    let src = src.trim();
    if src.is_empty() {
        return false;
    }
    match Url::parse(src) {
        Ok(url) => match url.scheme() {
            "http" | "https" => true,
            "data" => {
                let lower = src.to_ascii_lowercase();
                lower.starts_with("data:image/") && !lower.starts_with("data:image/svg")
            }
            _ => false,
        },
        Err(url::ParseError::RelativeUrlWithoutBase) => true,
        Err(_) => false,
    }
}

/// Sanitized markup for a paste: the markup flavor when present, else the
/// plain text with line breaks.
pub fn sanitize_paste(payload: &PastePayload, mode: SanitizeMode) -> String {
    match payload.markup() {
        Some(html) => sanitize(html, mode),
        None => {
            let text = normalize_newlines(&payload.text);
            let nodes: Vec<RawNode> = text
                .split('\n')
                .enumerate()
                .flat_map(|(ix, line)| {
                    let br = (ix > 0).then(|| RawNode::Element(RawElement::new("br")));
                    let text = (!line.is_empty()).then(|| RawNode::Text(line.to_string()));
                    br.into_iter().chain(text)
                })
                .collect();
            serialize_fragment(&nodes)
        }
    }
}

/// Document nodes for a paste, ready to insert at the caret.
pub fn paste_nodes(payload: &PastePayload, mode: SanitizeMode) -> Vec<Node> {
    match payload.markup() {
        Some(html) => convert_fragment(sanitize_fragment(parse_fragment(html), mode)),
        None => text_with_breaks(&normalize_newlines(&payload.text)),
    }
}

fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_script_urls() {
        assert!(!is_safe_href("javascript:alert(1)"));
        assert!(!is_safe_href("  JavaScript:alert(1)"));
        assert!(!is_safe_href("vbscript:msgbox"));
        assert!(!is_safe_href("data:text/html,hi"));
        assert!(is_safe_href("https://example.com"));
        assert!(is_safe_href("/relative/path"));
        assert!(is_safe_href("mailto:a@example.com"));
    }

    #[test]
    fn accepts_raster_data_images_only() {
        assert!(is_safe_image_src("data:image/png;base64,AAAA"));
        assert!(!is_safe_image_src("data:image/svg+xml;base64,AAAA"));
        assert!(!is_safe_image_src("javascript:x"));
        assert!(is_safe_image_src("img/a.png"));
    }
}
