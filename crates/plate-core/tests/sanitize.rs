use manos_plate_core::{PastePayload, SanitizeMode, sanitize, sanitize_paste};

#[test]
fn styled_span_is_unwrapped() {
    assert_eq!(
        sanitize(r#"<span style="color:red"><b>hi</b></span>"#, SanitizeMode::Rich),
        "<b>hi</b>"
    );
}

#[test]
fn scripts_and_styles_are_dropped_with_their_content() {
    assert_eq!(
        sanitize("<p>a<script>alert(1)</script>b</p>", SanitizeMode::Rich),
        "<p>ab</p>"
    );
    assert_eq!(
        sanitize("<style>p { color: red }</style><p>x</p>", SanitizeMode::Rich),
        "<p>x</p>"
    );
}

#[test]
fn synonyms_get_canonical_tags() {
    assert_eq!(
        sanitize("<strong>x</strong><em>y</em><del>z</del><strike>w</strike>", SanitizeMode::Rich),
        "<b>x</b><i>y</i><s>z</s><s>w</s>"
    );
}

#[test]
fn simple_mode_keeps_only_basic_formatting() {
    assert_eq!(
        sanitize(
            r#"<ul><li>a</li></ul><u>b</u><a href="https://example.com">c</a><s>d</s>"#,
            SanitizeMode::Simple
        ),
        "a<u>b</u>cd"
    );
    assert_eq!(
        sanitize(r#"<p style="text-align: center">x</p>"#, SanitizeMode::Simple),
        "<p>x</p>"
    );
}

#[test]
fn links_keep_only_safe_href_and_target() {
    assert_eq!(
        sanitize(
            r#"<a href="https://example.com" onclick="steal()" target="_blank" class="x">x</a>"#,
            SanitizeMode::Rich
        ),
        r#"<a href="https://example.com" target="_blank">x</a>"#
    );
    assert_eq!(
        sanitize(r#"<a href="javascript:alert(1)">x</a>"#, SanitizeMode::Rich),
        "x"
    );
}

#[test]
fn images_keep_only_safe_src_and_alt() {
    assert_eq!(
        sanitize(r#"<img src="a.png" onerror="steal()">"#, SanitizeMode::Rich),
        r#"<img src="a.png" alt="">"#
    );
    assert_eq!(sanitize(r#"<img src="javascript:x">"#, SanitizeMode::Rich), "");
}

#[test]
fn only_text_align_survives_on_blocks() {
    assert_eq!(
        sanitize(
            r#"<p style="color: red; text-align: CENTER" class="lead">x</p>"#,
            SanitizeMode::Rich
        ),
        r#"<p style="text-align: center">x</p>"#
    );
}

#[test]
fn comments_and_unknown_tags_are_removed() {
    assert_eq!(
        sanitize("<!-- note --><font color=red>f</font><center>g</center>", SanitizeMode::Rich),
        "fg"
    );
}

#[test]
fn sanitize_is_idempotent() {
    let inputs = [
        r#"<span style="color:red"><b>hi</b></span>"#,
        "<div><p>a<span><p>b</p></span></p></div>",
        "<b>unclosed <i>nested",
        "a < b & c",
        "<ul><li>x<li>y</ul>",
        "<!-- c --><font color=red>f</font>",
        r#"<a href="/x">rel</a><img src="data:image/png;base64,AA">"#,
        r#"<p style="text-align:right">r</p><pre>  code  </pre><blockquote>q</blockquote>"#,
        "<table><tr><td>cell</td></tr></table>",
        "&lt;script&gt;alert(1)&lt;/script&gt;",
    ];
    for mode in [SanitizeMode::Simple, SanitizeMode::Rich] {
        for input in inputs {
            let once = sanitize(input, mode);
            let twice = sanitize(&once, mode);
            assert_eq!(once, twice, "input: {input}, mode: {mode:?}");
        }
    }
}

#[test]
fn escaped_markup_stays_text() {
    assert_eq!(
        sanitize("&lt;script&gt;alert(1)&lt;/script&gt;", SanitizeMode::Rich),
        "&lt;script&gt;alert(1)&lt;/script&gt;"
    );
}

#[test]
fn plain_text_paste_turns_newlines_into_breaks() {
    assert_eq!(
        sanitize_paste(&PastePayload::text("a\r\nb & c"), SanitizeMode::Rich),
        "a<br>b &amp; c"
    );
}

#[test]
fn markup_flavor_wins_over_plain_text() {
    let payload = PastePayload {
        html: Some("<strong>bold</strong>".into()),
        text: "bold".into(),
    };
    assert_eq!(sanitize_paste(&payload, SanitizeMode::Rich), "<b>bold</b>");

    let blank = PastePayload {
        html: Some("  ".into()),
        text: "plain".into(),
    };
    assert_eq!(sanitize_paste(&blank, SanitizeMode::Rich), "plain");
}
