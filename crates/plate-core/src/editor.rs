use serde::{Deserialize, Serialize};

use crate::block::{BlockFormat, format_block, insert_blocks_at, set_alignment};
use crate::commit::Commit;
use crate::config::EditorConfig;
use crate::error::{EditorError, SnapshotError, ValidationError};
use crate::font::{apply_font_size, current_font_size};
use crate::inline::{
    create_link, delete_range, drop_emptied_blocks, inline_group_span, insert_at_point,
    insert_text, remove_format, toggle_format, unlink,
};
use crate::list::{collapse_item_at_caret, indent_selection, outdent_selection, toggle_list};
use crate::markup::{parse_document, serialize};
use crate::media::{LocalFile, MediaEmbed, VideoInput, data_uri, resolve_video};
use crate::node::{ElementKind, ElementNode, ListKind, Node, TextAlign, normalize, wrap_inline_runs};
use crate::sanitize::{PastePayload, is_safe_href, is_safe_image_src, paste_nodes};
use crate::selection::{Cursor, Placement, Point, Selection, SelectionOffset, SelectionTracker};
use crate::snapshot::Snapshot;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", content = "args", rename_all = "snake_case")]
pub enum Command {
    Bold,
    Italic,
    Underline,
    Strike,
    Align(TextAlign),
    RemoveFormat,
    CreateLink {
        href: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<String>,
    },
    Unlink,
    InsertImage {
        src: String,
        #[serde(default)]
        alt: String,
    },
    InsertVideo(MediaEmbed),
    FormatBlock(BlockFormat),
    ToggleList(ListKind),
    Indent,
    Outdent,
    FontSize(u32),
    InsertText(String),
    InsertLineBreak,
    DeleteBackward,
    DeleteForward,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bold => "bold",
            Self::Italic => "italic",
            Self::Underline => "underline",
            Self::Strike => "strike",
            Self::Align(_) => "align",
            Self::RemoveFormat => "remove_format",
            Self::CreateLink { .. } => "create_link",
            Self::Unlink => "unlink",
            Self::InsertImage { .. } => "insert_image",
            Self::InsertVideo(_) => "insert_video",
            Self::FormatBlock(_) => "format_block",
            Self::ToggleList(_) => "toggle_list",
            Self::Indent => "indent",
            Self::Outdent => "outdent",
            Self::FontSize(_) => "font_size",
            Self::InsertText(_) => "insert_text",
            Self::InsertLineBreak => "insert_line_break",
            Self::DeleteBackward => "delete_backward",
            Self::DeleteForward => "delete_forward",
        }
    }
}

/// Formats whose state a toolbar reflects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Toggle {
    Bold,
    Italic,
    Underline,
    Strike,
    Link,
    Blockquote,
    CodeBlock,
    OrderedList,
    UnorderedList,
}

impl Toggle {
    fn matches(self, kind: &ElementKind) -> bool {
        match self {
            Self::Bold => *kind == ElementKind::Bold,
            Self::Italic => *kind == ElementKind::Italic,
            Self::Underline => *kind == ElementKind::Underline,
            Self::Strike => *kind == ElementKind::Strike,
            Self::Link => kind.is_link(),
            Self::Blockquote => *kind == ElementKind::Blockquote,
            Self::CodeBlock => *kind == ElementKind::CodeBlock,
            Self::OrderedList => *kind == ElementKind::OrderedList,
            Self::UnorderedList => *kind == ElementKind::UnorderedList,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Tab,
    ShiftTab,
    Backspace,
    Delete,
}

type ChangeListener = Box<dyn FnMut(&Commit)>;

pub struct Editor {
    root: ElementNode,
    selection: Option<Selection>,
    pending: Option<Placement>,
    config: EditorConfig,
    revision: u64,
    last_markup: String,
    listener: Option<ChangeListener>,
}

impl Editor {
    pub fn new(markup: &str, config: EditorConfig) -> Self {
        Self::from_root(parse_document(markup), config)
    }

    pub fn from_markup(markup: &str) -> Self {
        Self::new(markup, EditorConfig::default())
    }

    /// Rebuilds an editor from a saved snapshot. The saved caret is restored
    /// when it still fits the document.
    pub fn from_snapshot(snapshot: Snapshot, config: EditorConfig) -> Result<Self, SnapshotError> {
        snapshot.validate()?;
        let revision = snapshot.revision;
        let selection = snapshot.selection;
        let mut editor = Self::from_root(snapshot.into_document(), config);
        editor.revision = revision;
        if let Some(offset) = selection {
            editor.restore_selection(offset);
        }
        Ok(editor)
    }

    fn from_root(mut root: ElementNode, config: EditorConfig) -> Self {
        let config = config.with_defaults();
        normalize(&mut root, config.max_normalize_iterations);
        let last_markup = serialize(&root);
        Self {
            root,
            selection: None,
            pending: None,
            config,
            revision: 0,
            last_markup,
            listener: None,
        }
    }

    pub fn root(&self) -> &ElementNode {
        &self.root
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn markup(&self) -> String {
        serialize(&self.root)
    }

    /// Hands back the final markup when the host tears the editor down.
    pub fn into_markup(self) -> String {
        serialize(&self.root)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.root, self.revision, self.save_selection())
    }

    pub fn on_change(&mut self, listener: impl FnMut(&Commit) + 'static) {
        self.listener = Some(Box::new(listener));
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    /// Mirrors the host's live selection. `None` means the editor lost focus.
    pub fn set_selection(&mut self, selection: Option<Selection>) {
        self.selection = selection;
        self.pending = None;
    }

    /// The selection as offsets. A restore still waiting for [`Self::tick`]
    /// is reported as if it had already run.
    pub fn save_selection(&self) -> Option<SelectionOffset> {
        let selection = self.live_selection()?;
        SelectionTracker::save(&self.root, &selection)
    }

    /// Re-applies saved offsets. Leaves the selection alone and returns false
    /// when the offsets no longer fit the document.
    pub fn restore_selection(&mut self, offset: SelectionOffset) -> bool {
        match SelectionTracker::restore(&self.root, offset) {
            Some(selection) => {
                self.selection = Some(selection);
                self.pending = None;
                true
            }
            None => false,
        }
    }

    pub fn has_pending_selection(&self) -> bool {
        self.pending.is_some()
    }

    /// Runs a deferred selection restore, if one is waiting.
    pub fn tick(&mut self) {
        if let Some(placement) = self.pending.take() {
            self.place(placement);
        }
    }

    pub fn is_active(&self, toggle: Toggle) -> bool {
        let Some(selection) = &self.selection else {
            return false;
        };
        let path = &selection.anchor.path;
        match toggle {
            Toggle::OrderedList | Toggle::UnorderedList => self
                .root
                .nearest_ancestor(path, ElementKind::is_list)
                .and_then(|list| self.root.element(&list))
                .is_some_and(|list| toggle.matches(&list.kind)),
            _ => self
                .root
                .nearest_ancestor(path, |kind| toggle.matches(kind))
                .is_some(),
        }
    }

    pub fn current_font_size(&self) -> u32 {
        let point = self.selection.as_ref().map(|selection| &selection.anchor);
        current_font_size(&self.root, point, self.config.base_font_size)
    }

    /// The selection commands act on: the pending placement if one is
    /// waiting, else the host's last selection.
    fn live_selection(&self) -> Option<Selection> {
        let pending = self
            .pending
            .as_ref()
            .and_then(|placement| placement.resolve(&self.root));
        pending.or_else(|| self.selection.clone())
    }

    fn cursor(&self) -> Option<Cursor> {
        let selection = self.live_selection()?;
        Cursor::resolve(&self.root, &selection)
    }

    pub fn execute(&mut self, command: Command) -> Result<(), EditorError> {
        let source = format!("command:{}", command.name());
        let cursor = self.cursor();
        tracing::debug!(%source, has_selection = cursor.is_some(), "execute");

        let placement = match command {
            Command::Bold => {
                self.with_cursor(cursor, |root, c| toggle_format(root, c, &ElementKind::Bold))
            }
            Command::Italic => {
                self.with_cursor(cursor, |root, c| toggle_format(root, c, &ElementKind::Italic))
            }
            Command::Underline => {
                self.with_cursor(cursor, |root, c| toggle_format(root, c, &ElementKind::Underline))
            }
            Command::Strike => {
                self.with_cursor(cursor, |root, c| toggle_format(root, c, &ElementKind::Strike))
            }
            Command::Align(align) => self.with_cursor(cursor, |root, c| set_alignment(root, c, align)),
            Command::RemoveFormat => self.with_cursor(cursor, remove_format),
            Command::CreateLink { href, target } => {
                let Some(cursor) = cursor.filter(|c| !c.is_collapsed()) else {
                    return Err(ValidationError::EmptySelection.into());
                };
                let href = href.trim().to_string();
                if !is_safe_href(&href) {
                    return Err(ValidationError::InvalidUrl(href).into());
                }
                let target = target.filter(|target| !target.trim().is_empty());
                create_link(&mut self.root, cursor.range, href, target)
            }
            Command::Unlink => self.with_cursor(cursor, unlink),
            Command::InsertImage { src, alt } => {
                if !is_safe_image_src(&src) {
                    return Err(ValidationError::InvalidUrl(src).into());
                }
                let image = ElementKind::Image {
                    src: src.trim().to_string(),
                    alt,
                };
                self.insert_inline(cursor, vec![Node::element(image, Vec::new())])
            }
            Command::InsertVideo(embed) => self.insert_video(cursor, embed),
            Command::FormatBlock(format) => {
                self.with_cursor(cursor, |root, c| format_block(root, c, format))
            }
            Command::ToggleList(kind) => self.with_cursor(cursor, |root, c| toggle_list(root, c, kind)),
            Command::Indent => match &cursor {
                Some(c) => indent_selection(&mut self.root, c).unwrap_or(Placement::Keep),
                None => Placement::Keep,
            },
            Command::Outdent => match &cursor {
                Some(c) => outdent_selection(&mut self.root, c).unwrap_or(Placement::Keep),
                None => Placement::Keep,
            },
            Command::FontSize(size) => {
                self.with_cursor(cursor, |root, c| apply_font_size(root, c, size))
            }
            Command::InsertText(text) => self.insert_text(cursor, &text),
            Command::InsertLineBreak => {
                self.insert_inline(cursor, vec![Node::element(ElementKind::LineBreak, Vec::new())])
            }
            Command::DeleteBackward => self.delete_char(cursor, true),
            Command::DeleteForward => self.delete_char(cursor, false),
        };

        self.finish(placement, &source);
        Ok(())
    }

    fn with_cursor(
        &mut self,
        cursor: Option<Cursor>,
        op: impl FnOnce(&mut ElementNode, &Cursor) -> Placement,
    ) -> Placement {
        match cursor {
            Some(cursor) => op(&mut self.root, &cursor),
            None => {
                tracing::debug!("command needs a selection; ignoring");
                Placement::Keep
            }
        }
    }

    /// Lets the editor handle a key before the host does. Returns false when
    /// the host should fall back to its own behavior.
    pub fn handle_key(&mut self, key: Key) -> bool {
        let Some(cursor) = self.cursor() else {
            return false;
        };
        let placement = match key {
            Key::Tab => indent_selection(&mut self.root, &cursor),
            Key::ShiftTab => outdent_selection(&mut self.root, &cursor),
            Key::Backspace | Key::Delete => collapse_item_at_caret(&mut self.root, &cursor),
        };
        let Some(placement) = placement else {
            return false;
        };
        let source = match key {
            Key::Tab => "key:tab",
            Key::ShiftTab => "key:shift_tab",
            Key::Backspace => "key:backspace",
            Key::Delete => "key:delete",
        };
        self.finish(placement, source);
        true
    }

    /// Inserts sanitized clipboard contents at the caret, replacing any
    /// selected text.
    pub fn paste(&mut self, payload: &PastePayload) -> Result<(), EditorError> {
        let nodes = paste_nodes(payload, self.config.paste_mode);
        if nodes.is_empty() {
            tracing::debug!("paste had no usable content");
            return Ok(());
        }

        let cursor = self.cursor();
        let Some((point, at)) = self.insertion_point(cursor) else {
            return Ok(());
        };
        let len: usize = nodes.iter().map(Node::text_len).sum();

        let placement = if nodes.iter().all(Node::is_inline) {
            let after = Placement::after(&self.root, &point, at + len);
            insert_at_point(&mut self.root, &point, nodes).map(|_| after)
        } else {
            let blocks = wrap_inline_runs(nodes);
            insert_blocks_at(&mut self.root, &point, at, blocks)
                .map(|_| Placement::Offsets(SelectionOffset::collapsed(at + len)))
        };
        let placement = placement.unwrap_or(Placement::Keep);
        self.finish(placement, "paste");
        Ok(())
    }

    /// Resolves a video URL or file and inserts the player at the caret. On
    /// any validation failure the document is left untouched.
    pub fn embed_video(&mut self, input: &VideoInput) -> Result<(), EditorError> {
        let embed = resolve_video(input, self.config.upload_limit_bytes)?;
        self.execute(Command::InsertVideo(embed))
    }

    pub fn insert_image_file(&mut self, file: &LocalFile, alt: &str) -> Result<(), EditorError> {
        let src = data_uri(file, self.config.upload_limit_bytes)?;
        self.execute(Command::InsertImage {
            src,
            alt: alt.to_string(),
        })
    }

    /// Collapses a non-empty selection by deleting it, then reports where new
    /// content goes. Without a selection content lands at the document end.
    fn insertion_point(&mut self, cursor: Option<Cursor>) -> Option<(Point, usize)> {
        let Some(cursor) = cursor else {
            let point = SelectionTracker::end_of_document(&self.root)?;
            let at = self.root.text_len();
            return Some((point, at));
        };
        if cursor.is_collapsed() {
            return Some((cursor.start, cursor.range.start));
        }

        let first_block = cursor.start.path.first().copied().unwrap_or_default();
        let last_block = cursor.end.path.first().copied().unwrap_or_default();
        delete_range(&mut self.root, cursor.range);
        drop_emptied_blocks(&mut self.root, first_block, last_block);
        normalize(&mut self.root, self.config.max_normalize_iterations);
        let at = cursor.range.start;
        let point = SelectionTracker::point_at(&self.root, at)?;
        Some((point, at))
    }

    fn insert_text(&mut self, cursor: Option<Cursor>, text: &str) -> Placement {
        if text.is_empty() {
            return Placement::Keep;
        }
        match self.insertion_point(cursor) {
            Some((point, at)) => insert_text(&mut self.root, &point, at, text),
            None => Placement::Keep,
        }
    }

    fn insert_inline(&mut self, cursor: Option<Cursor>, nodes: Vec<Node>) -> Placement {
        let Some((point, at)) = self.insertion_point(cursor) else {
            return Placement::Keep;
        };
        let after = Placement::after(&self.root, &point, at);
        match insert_at_point(&mut self.root, &point, nodes) {
            Some(_) => after,
            None => Placement::Keep,
        }
    }

    fn insert_video(&mut self, cursor: Option<Cursor>, embed: MediaEmbed) -> Placement {
        let Some((point, at)) = self.insertion_point(cursor) else {
            return Placement::Keep;
        };
        let video = Node::element(ElementKind::VideoEmbed { embed }, Vec::new());
        let Some((mut parent, ix, trailing)) = insert_blocks_at(&mut self.root, &point, at, vec![video])
        else {
            return Placement::Keep;
        };
        if !trailing {
            if let Some(container) = self.root.element_mut(&parent) {
                container.children.insert(ix + 1, Node::paragraph(""));
            }
        }
        parent.push(ix + 1);
        Placement::StartOf(parent)
    }

    /// Deletes one character next to a collapsed caret without crossing into
    /// a neighboring block; a selection is deleted as a whole.
    fn delete_char(&mut self, cursor: Option<Cursor>, backward: bool) -> Placement {
        let Some(cursor) = cursor else {
            return Placement::Keep;
        };
        if !cursor.is_collapsed() {
            return match self.insertion_point(Some(cursor)) {
                Some((_, at)) => Placement::Offsets(SelectionOffset::collapsed(at)),
                None => Placement::Keep,
            };
        }

        let at = cursor.range.start;
        let Some((group_start, group_len)) = inline_group_span(&self.root, &cursor.start) else {
            return Placement::Keep;
        };
        let range = if backward {
            if at <= group_start {
                return Placement::Keep;
            }
            SelectionOffset::new(at - 1, at)
        } else {
            if at >= group_start + group_len {
                return Placement::Keep;
            }
            SelectionOffset::new(at, at + 1)
        };
        delete_range(&mut self.root, range);
        Placement::Offsets(SelectionOffset::collapsed(range.start))
    }

    fn finish(&mut self, placement: Placement, source: &str) {
        normalize(&mut self.root, self.config.max_normalize_iterations);
        if placement != Placement::Keep {
            if self.config.defer_selection_restore {
                self.pending = Some(placement);
            } else {
                self.place(placement);
            }
        } else if let Some(selection) = &self.selection {
            if SelectionTracker::save(&self.root, selection).is_none() {
                self.selection = None;
            }
        }
        self.commit(source);
    }

    fn place(&mut self, placement: Placement) {
        match placement.resolve(&self.root) {
            Some(selection) => self.selection = Some(selection),
            None => tracing::debug!(?placement, "selection could not be placed"),
        }
    }

    fn commit(&mut self, source: &str) {
        let markup = serialize(&self.root);
        if markup == self.last_markup {
            return;
        }
        self.revision += 1;
        self.last_markup = markup.clone();

        let commit = Commit::new(self.revision, markup)
            .selection(self.save_selection())
            .source(source);
        tracing::trace!(revision = commit.revision, source, "document changed");
        if let Some(listener) = self.listener.as_mut() {
            listener(&commit);
        }
    }
}
