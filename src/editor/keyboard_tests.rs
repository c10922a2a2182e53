use pretty_assertions::assert_eq;

use super::*;

fn edit(input: &str) -> DocumentEditor {
    DocumentEditor::from_markup(input).unwrap()
}

fn press(input: &str, keys: &[KeyEvent]) -> String {
    let mut editor = edit(input);
    for key in keys {
        editor.handle_key(*key);
    }
    editor.to_markup()
}

fn right(extend: bool) -> KeyEvent {
    KeyEvent::Right { extend }
}

fn left(extend: bool) -> KeyEvent {
    KeyEvent::Left { extend }
}

// ----------------------------------------------------------------------
// Typing
// ----------------------------------------------------------------------

#[test]
fn typing_appends_to_text() {
    assert_eq!(press("<p>ab|</p>", &[KeyEvent::Char('c')]), "<p>abc|</p>");
}

#[test]
fn trailing_space_is_kept_as_nbsp_until_followed() {
    assert_eq!(press("<p>ab|</p>", &[KeyEvent::Char(' ')]), "<p>ab&nbsp;|</p>");
    assert_eq!(
        press("<p>ab|</p>", &[KeyEvent::Char(' '), KeyEvent::Char('c')]),
        "<p>ab c|</p>"
    );
}

#[test]
fn typing_replaces_selection() {
    assert_eq!(press("<p>[ab</p><p>cd]</p>", &[KeyEvent::Char('x')]), "<p>x|</p>");
}

#[test]
fn typing_in_bold_placeholder_continues_bold() {
    let mut editor = edit("<p>ab|</p>");
    assert!(editor.toggle_format("b"));
    assert_eq!(editor.to_markup(), "<p>ab<b>&#65279;|</b></p>");
    editor.handle_key(KeyEvent::Char('c'));
    assert_eq!(editor.to_markup(), "<p>ab<b>c|</b></p>");
}

// ----------------------------------------------------------------------
// Enter, Shift+Enter and Ctrl+Enter
// ----------------------------------------------------------------------

#[test]
fn enter_splits_paragraph() {
    assert_eq!(
        press("<p>d|om to edit</p>", &[KeyEvent::Enter]),
        "<p>d</p><p>|om to edit</p>"
    );
}

#[test]
fn enter_then_backspace_restores_paragraph() {
    assert_eq!(
        press("<p>d|om to edit</p>", &[KeyEvent::Enter, KeyEvent::Backspace]),
        "<p>d|om to edit</p>"
    );
}

#[test]
fn enter_at_end_pads_new_paragraph() {
    assert_eq!(press("<p>ab|</p>", &[KeyEvent::Enter]), "<p>ab</p><p>|<br/></p>");
    assert_eq!(
        press("<p>ab|</p>", &[KeyEvent::Enter, KeyEvent::Char('x')]),
        "<p>ab</p><p>x|</p>"
    );
}

#[test]
fn enter_at_start_of_list_item_adds_empty_item_before() {
    assert_eq!(
        press("<ul><li>|dom to edit</li></ul>", &[KeyEvent::Enter]),
        "<ul><li><br/></li><li>|dom to edit</li></ul>"
    );
}

#[test]
fn enter_in_empty_last_item_leaves_list() {
    assert_eq!(
        press("<ul><li>ab</li><li>|<br/></li></ul>", &[KeyEvent::Enter]),
        "<ul><li>ab</li></ul><p>|<br/></p>"
    );
}

#[test]
fn shift_enter_inserts_line_break() {
    assert_eq!(
        press("<p><b>dom</b>| to edit</p>", &[KeyEvent::ShiftEnter]),
        "<p><b>dom</b><br/>|&nbsp;to edit</p>"
    );
}

#[test]
fn shift_enter_at_block_end_keeps_a_placeholder() {
    assert_eq!(
        press("<p>dom |</p><p>to edit</p>", &[KeyEvent::ShiftEnter]),
        "<p>dom <br/>|&#65279;</p><p>to edit</p>"
    );
}

#[test]
fn typing_after_shift_enter_at_block_end_replaces_placeholder() {
    assert_eq!(
        press("<p>dom |</p><p>to edit</p>", &[KeyEvent::ShiftEnter, KeyEvent::Char('x')]),
        "<p>dom <br/>x|</p><p>to edit</p>"
    );
}

#[test]
fn shift_enter_in_empty_paragraph_adds_a_line() {
    assert_eq!(press("<p><br/>|</p>", &[KeyEvent::ShiftEnter]), "<p><br/>|<br/></p>");
    assert_eq!(
        press("<p><br/>|</p>", &[KeyEvent::ShiftEnter, KeyEvent::ShiftEnter]),
        "<p><br/><br/>|<br/></p>"
    );
    assert_eq!(
        press("<p><br/>|</p>", &[KeyEvent::ShiftEnter, KeyEvent::Char('x')]),
        "<p><br/>x|</p>"
    );
}

#[test]
fn ctrl_enter_inserts_rule_between_halves() {
    assert_eq!(
        press("<p>ab|cd</p>", &[KeyEvent::CtrlEnter]),
        "<p>ab</p><hr/><p>|cd</p>"
    );
}

#[test]
fn ctrl_enter_at_paragraph_end_adds_empty_paragraph() {
    assert_eq!(
        press("<p>ab|</p>", &[KeyEvent::CtrlEnter]),
        "<p>ab</p><hr/><p>|<br/></p>"
    );
}

#[test]
fn ctrl_enter_at_paragraph_start_puts_rule_before() {
    assert_eq!(press("<p>|ab</p>", &[KeyEvent::CtrlEnter]), "<hr/><p>|ab</p>");
}

// ----------------------------------------------------------------------
// Backspace and Delete
// ----------------------------------------------------------------------

#[test]
fn backspace_removes_previous_char() {
    assert_eq!(press("<p>abc|</p>", &[KeyEvent::Backspace]), "<p>ab|</p>");
}

#[test]
fn delete_removes_next_char() {
    assert_eq!(press("<p>a|bc</p>", &[KeyEvent::Delete]), "<p>a|c</p>");
}

#[test]
fn backspace_at_paragraph_start_merges_with_previous() {
    assert_eq!(
        press("<p>ab</p><p>|cd</p>", &[KeyEvent::Backspace]),
        "<p>ab|cd</p>"
    );
}

#[test]
fn delete_at_paragraph_end_merges_with_next() {
    assert_eq!(press("<p>ab|</p><p>cd</p>", &[KeyEvent::Delete]), "<p>ab|cd</p>");
}

#[test]
fn backspace_after_line_break_removes_it() {
    assert_eq!(press("<p>ab<br/>|cd</p>", &[KeyEvent::Backspace]), "<p>ab|cd</p>");
}

#[test]
fn backspace_after_non_editable_block_removes_it_whole() {
    assert_eq!(
        press(
            r#"<p>ab</p><div contenteditable="false"><p>x</p></div><p>|cd</p>"#,
            &[KeyEvent::Backspace]
        ),
        "<p>ab</p><p>|cd</p>"
    );
}

#[test]
fn delete_before_non_editable_block_removes_it_whole() {
    assert_eq!(
        press(
            r#"<p>ab|</p><div contenteditable="false"><p>x</p></div><p>cd</p>"#,
            &[KeyEvent::Delete]
        ),
        "<p>ab|</p><p>cd</p>"
    );
}

#[test]
fn backspace_after_rule_removes_only_the_rule() {
    assert_eq!(
        press("<p>aaa</p><hr/><p>|bbb</p>", &[KeyEvent::Backspace]),
        "<p>aaa</p><p>|bbb</p>"
    );
}

#[test]
fn backspace_in_table_cell_deletes_selected_chars() {
    assert_eq!(
        press(
            "<table><tbody><tr><td>a[bc]d</td></tr></tbody></table>",
            &[KeyEvent::Backspace]
        ),
        "<table><tbody><tr><td>a|d</td></tr></tbody></table>"
    );
}

#[test]
fn backspace_deletes_selection() {
    assert_eq!(press("<p>a[bc]d</p>", &[KeyEvent::Backspace]), "<p>a|d</p>");
}

#[test]
fn backspace_over_whole_paragraph_leaves_padding() {
    assert_eq!(press("<p>[dom to edit]</p>", &[KeyEvent::Backspace]), "<p>|<br/></p>");
}

#[test]
fn backspace_joins_list_items() {
    assert_eq!(
        press("<ul><li>ab</li><li>|cd</li></ul>", &[KeyEvent::Backspace]),
        "<ul><li>ab|cd</li></ul>"
    );
}

#[test]
fn backspace_at_start_of_first_item_leaves_list() {
    assert_eq!(
        press("<ul><li>|ab</li></ul>", &[KeyEvent::Backspace]),
        "<p>|ab</p>"
    );
}

#[test]
fn backspace_at_start_of_indented_paragraph_outdents() {
    assert_eq!(
        press(r#"<p style="margin-left: 1.5em;">|ab</p>"#, &[KeyEvent::Backspace]),
        "<p>|ab</p>"
    );
}

#[test]
fn select_all_then_backspace_empties_document() {
    assert_eq!(
        press("<p>ab|</p><p>cd</p>", &[KeyEvent::SelectAll, KeyEvent::Backspace]),
        "<p>|<br/></p>"
    );
}

// ----------------------------------------------------------------------
// Tab
// ----------------------------------------------------------------------

#[test]
fn tab_inside_text_types_spaces() {
    assert_eq!(
        press("<p>ab|</p>", &[KeyEvent::Tab]),
        "<p>ab&nbsp;&nbsp;&nbsp;&nbsp;|</p>"
    );
}

#[test]
fn tab_at_paragraph_start_indents() {
    assert_eq!(
        press("<p>|ab</p>", &[KeyEvent::Tab]),
        r#"<p style="margin-left: 1.5em;">|ab</p>"#
    );
}

#[test]
fn tab_nests_list_item_and_shift_tab_restores_it() {
    let nested = r#"<ul><li>a</li><li class="o_indent"><ul><li>|b</li></ul></li></ul>"#;
    assert_eq!(press("<ul><li>a</li><li>|b</li></ul>", &[KeyEvent::Tab]), nested);
    assert_eq!(
        press(nested, &[KeyEvent::ShiftTab]),
        "<ul><li>a</li><li>|b</li></ul>"
    );
}

#[test]
fn tab_inside_table_cell_is_left_to_host() {
    let input = "<table><tbody><tr><td>a|b</td></tr></tbody></table>";
    let mut editor = edit(input);
    assert!(!editor.handle_key(KeyEvent::Tab));
    assert_eq!(editor.to_markup(), input);
}

// ----------------------------------------------------------------------
// Caret movement
// ----------------------------------------------------------------------

#[test]
fn arrows_step_one_char() {
    assert_eq!(press("<p>a|b</p>", &[right(false)]), "<p>ab|</p>");
    assert_eq!(press("<p>a|b</p>", &[left(false)]), "<p>|ab</p>");
}

#[test]
fn arrows_cross_paragraphs() {
    assert_eq!(press("<p>ab|</p><p>cd</p>", &[right(false)]), "<p>ab</p><p>|cd</p>");
    assert_eq!(press("<p>ab</p><p>|cd</p>", &[left(false)]), "<p>ab|</p><p>cd</p>");
}

#[test]
fn inline_boundary_is_a_single_caret_stop() {
    assert_eq!(press("<p><b>ab</b>|cd</p>", &[left(false)]), "<p><b>a|b</b>cd</p>");
}

#[test]
fn arrow_at_document_end_is_not_handled() {
    let mut editor = edit("<p>ab|</p>");
    assert!(!editor.handle_key(right(false)));
    assert_eq!(editor.to_markup(), "<p>ab|</p>");
}

#[test]
fn shift_arrows_grow_and_collapse_selection() {
    assert_eq!(press("<p>|ab</p>", &[right(true), right(true)]), "<p>[ab]</p>");
    assert_eq!(
        press("<p>|ab</p>", &[right(true), right(true), left(false)]),
        "<p>|ab</p>"
    );
    assert_eq!(
        press("<p>|ab</p>", &[right(true), right(true), left(true)]),
        "<p>[a]b</p>"
    );
}

#[test]
fn home_and_end_stay_in_block() {
    assert_eq!(
        press("<p>ab|cd</p><p>ef</p>", &[KeyEvent::Home { extend: false }]),
        "<p>|abcd</p><p>ef</p>"
    );
    assert_eq!(
        press("<p>ab|cd</p><p>ef</p>", &[KeyEvent::End { extend: false }]),
        "<p>abcd|</p><p>ef</p>"
    );
}

#[test]
fn vertical_movement_keeps_column_when_possible() {
    assert_eq!(
        press("<p>ab|cd</p><p>ef</p>", &[KeyEvent::Down { extend: false }]),
        "<p>abcd</p><p>ef|</p>"
    );
    assert_eq!(
        press("<p>abcd</p><p>ef|</p>", &[KeyEvent::Up { extend: false }]),
        "<p>ab|cd</p><p>ef</p>"
    );
}

#[test]
fn select_all_spans_visible_text() {
    assert_eq!(
        press("<p>ab|</p><p>cd</p>", &[KeyEvent::SelectAll]),
        "<p>[ab</p><p>cd]</p>"
    );
}

#[test]
fn key_with_stale_range_is_refused() {
    let mut editor = edit("<p>ab|</p>");
    let root = editor.tree().root();
    let p = editor.tree().first_child(root).unwrap();
    editor.tree_mut().detach(p);
    assert!(!editor.handle_key(KeyEvent::Char('x')));
    assert_eq!(editor.to_markup(), "<p>|<br/></p>");
}
