use manos_plate_core::{
    Command, Editor, ElementKind, Key, ListKind, Node, PastePayload, Point, Selection,
    SelectionOffset, Toggle,
};

fn caret(editor: &mut Editor, path: Vec<usize>, offset: usize) {
    editor.set_selection(Some(Selection::collapsed(Point::new(path, offset))));
}

#[test]
fn toggle_list_wraps_paragraphs_into_items() {
    let mut editor = Editor::from_markup("<p>one</p><p>two</p>");
    assert!(editor.restore_selection(SelectionOffset::new(0, 6)));

    editor.execute(Command::ToggleList(ListKind::Ordered)).unwrap();

    assert_eq!(editor.markup(), "<ol><li>one</li><li>two</li></ol>");
    assert!(editor.is_active(Toggle::OrderedList));
    assert!(!editor.is_active(Toggle::UnorderedList));
}

#[test]
fn toggle_same_list_kind_turns_items_back_into_paragraphs() {
    let mut editor = Editor::from_markup("<ol><li>one</li><li>two</li></ol>");
    assert!(editor.restore_selection(SelectionOffset::new(0, 6)));

    editor.execute(Command::ToggleList(ListKind::Ordered)).unwrap();

    assert_eq!(editor.markup(), "<p>one</p><p>two</p>");
}

#[test]
fn toggle_other_list_kind_switches_the_list() {
    let mut editor = Editor::from_markup("<ol><li>one</li><li>two</li></ol>");
    caret(&mut editor, vec![0, 1, 0], 1);

    editor.execute(Command::ToggleList(ListKind::Unordered)).unwrap();

    assert_eq!(editor.markup(), "<ul><li>one</li><li>two</li></ul>");
    assert!(editor.is_active(Toggle::UnorderedList));
}

#[test]
fn toggling_a_lone_empty_item_leaves_one_paragraph() {
    let mut editor = Editor::from_markup("<ul><li></li></ul>");
    caret(&mut editor, vec![0, 0, 0], 0);

    editor.execute(Command::ToggleList(ListKind::Unordered)).unwrap();

    assert_eq!(editor.markup(), "<p></p>");
    assert_eq!(editor.root().children.len(), 1);
    let Node::Element(block) = &editor.root().children[0] else {
        panic!("expected element block");
    };
    assert!(matches!(block.kind, ElementKind::Paragraph { .. }));
    assert_eq!(
        editor.selection().map(|s| s.anchor.clone()),
        Some(Point::new(vec![0, 0], 0))
    );
}

#[test]
fn empty_middle_item_splits_the_list() {
    let mut editor = Editor::from_markup("<ol><li>A</li><li></li><li>C</li></ol>");
    caret(&mut editor, vec![0, 1, 0], 0);

    editor.execute(Command::ToggleList(ListKind::Ordered)).unwrap();

    assert_eq!(
        editor.markup(),
        "<ol><li>A</li></ol><p></p><ol><li>C</li></ol>"
    );
    assert_eq!(
        editor.selection().map(|s| s.anchor.clone()),
        Some(Point::new(vec![1, 0], 0))
    );
}

#[test]
fn backspace_in_empty_item_splits_the_list() {
    let mut editor = Editor::from_markup("<ol><li>A</li><li></li><li>C</li></ol>");
    caret(&mut editor, vec![0, 1, 0], 0);

    assert!(editor.handle_key(Key::Backspace));

    assert_eq!(
        editor.markup(),
        "<ol><li>A</li></ol><p></p><ol><li>C</li></ol>"
    );
}

#[test]
fn backspace_at_item_start_converts_the_item() {
    let mut editor = Editor::from_markup("<ul><li>one</li><li>two</li></ul>");
    caret(&mut editor, vec![0, 1, 0], 0);

    assert!(editor.handle_key(Key::Backspace));

    assert_eq!(editor.markup(), "<ul><li>one</li></ul><p>two</p>");
}

#[test]
fn backspace_mid_item_is_left_to_the_host() {
    let mut editor = Editor::from_markup("<ul><li>one</li><li>two</li></ul>");
    caret(&mut editor, vec![0, 1, 0], 1);

    assert!(!editor.handle_key(Key::Backspace));
    assert!(!editor.handle_key(Key::Delete));

    assert_eq!(editor.markup(), "<ul><li>one</li><li>two</li></ul>");
    assert_eq!(editor.revision(), 0);
}

#[test]
fn indent_then_outdent_is_the_identity() {
    let original = "<ul><li>A</li><li>B</li><li>C</li></ul>";
    let mut editor = Editor::from_markup(original);
    caret(&mut editor, vec![0, 1, 0], 1);

    assert!(editor.handle_key(Key::Tab));
    assert_eq!(
        editor.markup(),
        "<ul><li>A<ul><li>B</li></ul></li><li>C</li></ul>"
    );

    assert!(editor.handle_key(Key::ShiftTab));
    assert_eq!(editor.markup(), original);
}

#[test]
fn indent_joins_an_existing_sublist() {
    let mut editor = Editor::from_markup("<ul><li>A<ul><li>x</li></ul></li><li>B</li></ul>");
    caret(&mut editor, vec![0, 1, 0], 0);

    editor.execute(Command::Indent).unwrap();

    assert_eq!(
        editor.markup(),
        "<ul><li>A<ul><li>x</li><li>B</li></ul></li></ul>"
    );
}

#[test]
fn first_item_cannot_be_indented() {
    let original = "<ul><li>A</li><li>B</li></ul>";
    let mut editor = Editor::from_markup(original);
    caret(&mut editor, vec![0, 0, 0], 1);

    assert!(editor.handle_key(Key::Tab));

    assert_eq!(editor.markup(), original);
    assert_eq!(editor.revision(), 0);
}

#[test]
fn indenting_several_items_nests_them_from_the_last_one_up() {
    let mut editor = Editor::from_markup("<ul><li>A</li><li>B</li><li>C</li></ul>");
    editor.set_selection(Some(Selection::new(
        Point::new(vec![0, 1, 0], 0),
        Point::new(vec![0, 2, 0], 1),
    )));

    assert!(editor.handle_key(Key::Tab));

    assert_eq!(
        editor.markup(),
        "<ul><li>A<ul><li>B<ul><li>C</li></ul></li></ul></li></ul>"
    );
}

#[test]
fn outdent_carries_following_siblings_along() {
    let mut editor = Editor::from_markup("<ul><li>A<ul><li>B</li><li>C</li></ul></li></ul>");
    caret(&mut editor, vec![0, 0, 1, 0, 0], 0);

    editor.execute(Command::Outdent).unwrap();

    assert_eq!(
        editor.markup(),
        "<ul><li>A</li><li>B<ul><li>C</li></ul></li></ul>"
    );
}

#[test]
fn outdenting_several_nested_items_lifts_each_one() {
    let mut editor = Editor::from_markup("<ul><li>A<ul><li>B</li><li>C</li></ul></li></ul>");
    editor.set_selection(Some(Selection::new(
        Point::new(vec![0, 0, 1, 0, 0], 0),
        Point::new(vec![0, 0, 1, 1, 0], 1),
    )));

    assert!(editor.handle_key(Key::ShiftTab));

    assert_eq!(editor.markup(), "<ul><li>A</li><li>B</li><li>C</li></ul>");
    assert_eq!(editor.save_selection(), Some(SelectionOffset::new(1, 3)));
}

#[test]
fn outdenting_several_items_carries_the_rest_under_the_last() {
    let mut editor =
        Editor::from_markup("<ul><li>A<ul><li>B</li><li>C</li><li>D</li></ul></li></ul>");
    editor.set_selection(Some(Selection::new(
        Point::new(vec![0, 0, 1, 0, 0], 0),
        Point::new(vec![0, 0, 1, 1, 0], 1),
    )));

    assert!(editor.handle_key(Key::ShiftTab));

    assert_eq!(
        editor.markup(),
        "<ul><li>A</li><li>B</li><li>C<ul><li>D</li></ul></li></ul>"
    );
}

#[test]
fn outdent_of_a_top_level_item_changes_nothing() {
    let original = "<ol><li>A</li><li>B</li></ol>";
    let mut editor = Editor::from_markup(original);
    caret(&mut editor, vec![0, 1, 0], 0);

    assert!(editor.handle_key(Key::ShiftTab));

    assert_eq!(editor.markup(), original);
}

#[test]
fn tab_outside_a_list_falls_through() {
    let mut editor = Editor::from_markup("<p>text</p>");
    caret(&mut editor, vec![0, 0], 2);

    assert!(!editor.handle_key(Key::Tab));
    assert!(!editor.handle_key(Key::ShiftTab));
    assert!(!editor.handle_key(Key::Backspace));
}

#[test]
fn tab_without_a_selection_falls_through() {
    let mut editor = Editor::from_markup("<ul><li>A</li><li>B</li></ul>");

    assert!(!editor.handle_key(Key::Tab));
}

#[test]
fn loose_text_in_a_list_is_gathered_into_items() {
    let editor = Editor::from_markup("<ul>\n  <li>A</li>B</ul>");

    assert_eq!(editor.markup(), "<ul><li>A</li><li>B</li></ul>");
}

#[test]
fn stray_items_are_put_into_a_list() {
    let mut editor = Editor::from_markup("<li>x</li>");
    assert_eq!(editor.markup(), "<ul><li>x</li></ul>");

    caret(&mut editor, vec![0, 0, 0], 0);
    editor.execute(Command::ToggleList(ListKind::Ordered)).unwrap();

    assert_eq!(editor.markup(), "<ol><li>x</li></ol>");
    assert_eq!(editor.root().kind, ElementKind::Div { align: None });
}

#[test]
fn pasted_stray_items_can_be_indented() {
    let mut editor = Editor::from_markup("<p>z</p>");
    assert!(editor.restore_selection(SelectionOffset::collapsed(1)));

    editor
        .paste(&PastePayload::html("<li>a</li><li>b</li>"))
        .unwrap();
    assert_eq!(editor.markup(), "<p>z</p><ul><li>a</li><li>b</li></ul>");

    assert!(editor.handle_key(Key::Tab));
    assert_eq!(
        editor.markup(),
        "<p>z</p><ul><li>a<ul><li>b</li></ul></li></ul>"
    );
}
