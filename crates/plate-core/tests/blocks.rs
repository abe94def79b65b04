use manos_plate_core::{BlockFormat, Command, Editor, Point, Selection, SelectionOffset, Toggle};

#[test]
fn blockquote_wraps_the_selected_block() {
    let mut editor = Editor::from_markup("<p>quote me</p><p>after</p>");
    assert!(editor.restore_selection(SelectionOffset::new(0, 5)));

    editor
        .execute(Command::FormatBlock(BlockFormat::Blockquote))
        .unwrap();

    assert_eq!(
        editor.markup(),
        "<blockquote><p>quote me</p></blockquote><p>after</p>"
    );
    assert!(editor.is_active(Toggle::Blockquote));
}

#[test]
fn blockquote_toggles_off_inside_a_quote() {
    let mut editor = Editor::from_markup("<blockquote><p>quote me</p></blockquote>");
    assert!(editor.restore_selection(SelectionOffset::new(0, 5)));

    editor
        .execute(Command::FormatBlock(BlockFormat::Blockquote))
        .unwrap();

    assert_eq!(editor.markup(), "<p>quote me</p>");
    assert!(!editor.is_active(Toggle::Blockquote));
}

#[test]
fn blockquote_spans_several_blocks() {
    let mut editor = Editor::from_markup("<p>one</p><p>two</p><p>three</p>");
    assert!(editor.restore_selection(SelectionOffset::new(1, 5)));

    editor
        .execute(Command::FormatBlock(BlockFormat::Blockquote))
        .unwrap();

    assert_eq!(
        editor.markup(),
        "<blockquote><p>one</p><p>two</p></blockquote><p>three</p>"
    );
}

#[test]
fn code_block_at_caret_splits_the_paragraph() {
    let mut editor = Editor::from_markup("<p>ab</p>");
    assert!(editor.restore_selection(SelectionOffset::collapsed(1)));

    editor
        .execute(Command::FormatBlock(BlockFormat::CodeBlock))
        .unwrap();

    assert_eq!(editor.markup(), "<p>a</p><pre></pre><p>b</p>");
    assert!(editor.is_active(Toggle::CodeBlock));
    assert_eq!(
        editor.selection().map(|s| s.anchor.clone()),
        Some(Point::new(vec![1, 0], 0))
    );

    editor.execute(Command::InsertText("let x = 1;".into())).unwrap();
    assert_eq!(editor.markup(), "<p>a</p><pre>let x = 1;</pre><p>b</p>");
}

#[test]
fn code_block_in_an_empty_paragraph_replaces_it() {
    let mut editor = Editor::from_markup("<p></p>");
    editor.set_selection(Some(Selection::collapsed(Point::new(vec![0, 0], 0))));

    editor
        .execute(Command::FormatBlock(BlockFormat::CodeBlock))
        .unwrap();

    assert_eq!(editor.markup(), "<pre></pre>");
}

#[test]
fn removing_an_empty_quote_leaves_an_empty_paragraph() {
    let mut editor = Editor::from_markup("<blockquote></blockquote>");
    editor.set_selection(Some(Selection::collapsed(Point::new(vec![0, 0], 0))));

    editor
        .execute(Command::FormatBlock(BlockFormat::Blockquote))
        .unwrap();

    assert_eq!(editor.markup(), "<p></p>");
}

#[test]
fn line_break_splits_the_line_inside_the_block() {
    let mut editor = Editor::from_markup("<p>ab</p>");
    assert!(editor.restore_selection(SelectionOffset::collapsed(1)));

    editor.execute(Command::InsertLineBreak).unwrap();
    editor.execute(Command::InsertText("X".into())).unwrap();

    assert_eq!(editor.markup(), "<p>a<br>Xb</p>");
}

#[test]
fn typed_newlines_become_line_breaks() {
    let mut editor = Editor::from_markup("<p>ab</p>");
    assert!(editor.restore_selection(SelectionOffset::collapsed(2)));

    editor.execute(Command::InsertText("\ncd".into())).unwrap();

    assert_eq!(editor.markup(), "<p>ab<br>cd</p>");
    assert_eq!(editor.save_selection(), Some(SelectionOffset::collapsed(4)));
}

#[test]
fn line_break_at_the_end_of_a_block_keeps_the_caret_there() {
    let mut editor = Editor::from_markup("<p>ab</p><p></p>");
    editor.set_selection(Some(Selection::collapsed(Point::new(vec![0, 0], 2))));

    editor.execute(Command::InsertLineBreak).unwrap();
    editor.execute(Command::InsertText("X".into())).unwrap();

    assert_eq!(editor.markup(), "<p>ab<br>X</p><p></p>");
}

#[test]
fn multi_line_text_at_the_end_of_a_block_keeps_the_caret_there() {
    let mut editor = Editor::from_markup("<p>ab</p><p></p>");
    editor.set_selection(Some(Selection::collapsed(Point::new(vec![0, 0], 2))));

    editor.execute(Command::InsertText("X\nY".into())).unwrap();
    editor.execute(Command::InsertText("Z".into())).unwrap();

    assert_eq!(editor.markup(), "<p>abX<br>YZ</p><p></p>");
}

#[test]
fn typing_over_a_selection_across_blocks() {
    let mut editor = Editor::from_markup("<p>ab</p><p>cd</p><p>ef</p>");
    assert!(editor.restore_selection(SelectionOffset::new(1, 5)));

    editor.execute(Command::InsertText("X".into())).unwrap();

    assert_eq!(editor.markup(), "<p>aX</p><p>f</p>");
}

#[test]
fn delete_backward_stays_inside_the_block() {
    let mut editor = Editor::from_markup("<p>ab</p><p>cd</p>");
    editor.set_selection(Some(Selection::collapsed(Point::new(vec![1, 0], 0))));

    editor.execute(Command::DeleteBackward).unwrap();
    assert_eq!(editor.markup(), "<p>ab</p><p>cd</p>");

    editor.set_selection(Some(Selection::collapsed(Point::new(vec![1, 0], 1))));
    editor.execute(Command::DeleteBackward).unwrap();
    assert_eq!(editor.markup(), "<p>ab</p><p>d</p>");
    assert_eq!(editor.save_selection(), Some(SelectionOffset::collapsed(2)));
}

#[test]
fn delete_forward_removes_the_next_character() {
    let mut editor = Editor::from_markup("<p>a<b>bc</b></p>");
    assert!(editor.restore_selection(SelectionOffset::collapsed(1)));

    editor.execute(Command::DeleteForward).unwrap();

    assert_eq!(editor.markup(), "<p>a<b>c</b></p>");
}
