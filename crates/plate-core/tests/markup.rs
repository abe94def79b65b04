use manos_plate_core::{
    Command, Editor, ElementKind, ListKind, MediaEmbed, Node, SelectionOffset, parse_document,
    serialize,
};

fn roundtrip(markup: &str) -> String {
    serialize(&parse_document(markup))
}

#[test]
fn canonical_markup_roundtrips_unchanged() {
    let cases = [
        "<p>a <b>b</b> <i>c</i></p>",
        "<ul><li>a<ul><li>b</li></ul></li></ul>",
        "<ol><li>one</li><li>two</li></ol>",
        r#"<p style="text-align: right">x</p>"#,
        r#"<p><a href="https://example.com" target="_blank">l</a><img src="a.png" alt="A"></p>"#,
        "<blockquote><p>q</p></blockquote>",
        "<pre>code</pre>",
        "<p>a<br>b</p>",
        r#"<p><span style="font-size: 18px">big</span></p>"#,
        "<p>a &amp; b &lt;c&gt;</p>",
        "<p><u>u</u><s>s</s></p>",
    ];
    for case in cases {
        assert_eq!(roundtrip(case), case);
    }
}

#[test]
fn loose_text_is_wrapped_in_a_paragraph() {
    assert_eq!(roundtrip("hello"), "<p>hello</p>");
    assert_eq!(roundtrip("a<p>b</p>c"), "<p>a</p><p>b</p><p>c</p>");
}

#[test]
fn empty_document_gets_an_empty_paragraph() {
    assert_eq!(roundtrip(""), "<p></p>");
}

#[test]
fn formatting_whitespace_between_blocks_is_dropped() {
    assert_eq!(roundtrip("<p>a</p>\n<p>b</p>"), "<p>a</p><p>b</p>");
}

#[test]
fn empty_inline_wrappers_disappear() {
    assert_eq!(roundtrip("<div><b></b>x</div>"), "<div>x</div>");
    assert_eq!(roundtrip("<p><i></i></p>"), "<p></p>");
}

#[test]
fn adjacent_identical_wrappers_merge() {
    assert_eq!(roundtrip("<p><b>a</b><b>b</b></p>"), "<p><b>ab</b></p>");
}

#[test]
fn synonym_tags_parse_to_canonical_kinds() {
    assert_eq!(
        roundtrip("<p><strong>a</strong><em>b</em><del>c</del></p>"),
        "<p><b>a</b><i>b</i><s>c</s></p>"
    );
}

#[test]
fn unstyled_span_and_bare_anchor_unwrap() {
    assert_eq!(roundtrip(r#"<p><span class="x">a</span><a>b</a></p>"#), "<p>ab</p>");
}

#[test]
fn video_embeds_roundtrip() {
    let frame = MediaEmbed::Frame {
        src: "https://www.youtube.com/embed/abc".into(),
    };
    let video = MediaEmbed::Video {
        src: "https://cdn.example.com/clip.mp4".into(),
        mime: "video/mp4".into(),
    };
    for embed in [frame, video] {
        let markup = embed.to_markup();
        let root = parse_document(&markup);

        let Node::Element(block) = &root.children[0] else {
            panic!("expected element block");
        };
        let ElementKind::VideoEmbed { embed: parsed } = &block.kind else {
            panic!("expected video embed");
        };
        assert_eq!(parsed, &embed);
        assert_eq!(serialize(&root), markup);
    }
}

#[test]
fn bare_iframe_becomes_an_embed() {
    let root = parse_document(r#"<iframe src="https://player.vimeo.com/video/1"></iframe>"#);

    let Node::Element(block) = &root.children[0] else {
        panic!("expected element block");
    };
    assert_eq!(
        block.kind,
        ElementKind::VideoEmbed {
            embed: MediaEmbed::Frame {
                src: "https://player.vimeo.com/video/1".into()
            }
        }
    );
}

#[test]
fn edited_documents_reparse_to_the_same_markup() {
    let mut editor = Editor::from_markup("<p>one two three</p><p>four</p>");
    assert!(editor.restore_selection(SelectionOffset::new(4, 7)));
    editor.execute(Command::Bold).unwrap();
    assert!(editor.restore_selection(SelectionOffset::new(0, 13)));
    editor.execute(Command::FontSize(20)).unwrap();
    assert!(editor.restore_selection(SelectionOffset::collapsed(3)));
    editor.execute(Command::Italic).unwrap();
    assert!(editor.restore_selection(SelectionOffset::new(13, 17)));
    editor
        .execute(Command::ToggleList(ListKind::Unordered))
        .unwrap();

    let markup = editor.markup();
    assert_eq!(roundtrip(&markup), markup);
}
