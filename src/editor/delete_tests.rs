use pretty_assertions::assert_eq;

use super::*;

fn edit(input: &str) -> DocumentEditor {
    DocumentEditor::from_markup(input).unwrap()
}

fn first_tagged(editor: &DocumentEditor, tag: &str) -> NodeId {
    let tree = editor.tree();
    tree.descendants(tree.root())
        .into_iter()
        .find(|n| tree.has_tag(*n, tag))
        .unwrap()
}

fn delete_range(input: &str) -> String {
    let mut editor = edit(input);
    let point = editor.delete_selection(editor.range()).unwrap();
    assert!(editor.set_range(Range::collapsed(point)));
    editor.to_markup()
}

#[test]
fn deletes_chars_inside_text() {
    assert_eq!(delete_range("<p>a[bc]d</p>"), "<p>a|d</p>");
}

#[test]
fn deletion_across_paragraphs_merges_them() {
    assert_eq!(delete_range("<p>a[b</p><p>c]d</p>"), "<p>a|d</p>");
}

#[test]
fn deleting_everything_pads_the_paragraph() {
    assert_eq!(delete_range("<p>[ab</p><p>cd]</p>"), "<p>|<br/></p>");
}

#[test]
fn collapsed_range_deletes_nothing() {
    let mut editor = edit("<p>a|b</p>");
    assert_eq!(editor.delete_selection(editor.range()), None);
    assert_eq!(editor.to_markup(), "<p>a|b</p>");
}

#[test]
fn delete_between_equal_points_is_a_no_op() {
    let mut editor = edit("<p>a|b</p>");
    let caret = editor.caret();
    assert_eq!(editor.delete_between(caret, caret), caret);
    assert_eq!(editor.to_plain_markup(), "<p>ab</p>");
}

#[test]
fn deletion_inside_one_cell_removes_selected_chars() {
    assert_eq!(
        delete_range("<table><tbody><tr><td>a[bc]d</td></tr></tbody></table>"),
        "<table><tbody><tr><td>a|d</td></tr></tbody></table>"
    );
}

#[test]
fn deletion_stays_inside_table_cell() {
    let mut editor = edit("<table><tbody><tr><td>a[b</td><td>c]d</td></tr></tbody></table>");
    editor.delete_selection(editor.range());
    let tree = editor.tree();
    let cells = tree
        .descendants(tree.root())
        .into_iter()
        .filter(|n| tree.has_tag(*n, "td"))
        .count();
    assert_eq!(cells, 2);
    assert_eq!(tree.text_content(tree.root()), "ad");
}

#[test]
fn delete_edge_merges_similar_paragraphs() {
    let mut editor = edit("<p>ab</p><p>cd</p>");
    let p = first_tagged(&editor, "p");
    let point = editor.delete_edge(p, Direction::Next, false).unwrap();
    assert!(editor.set_range(Range::collapsed(point)));
    assert_eq!(editor.to_markup(), "<p>ab|cd</p>");
}

#[test]
fn fill_empty_inline_node_gets_placeholders() {
    let mut editor = edit("<p><b></b></p>");
    let b = first_tagged(&editor, "b");
    let point = editor.fill_empty_node(BoundaryPoint::start_of(b));
    assert!(editor.set_range(Range::collapsed(point)));
    assert_eq!(editor.to_markup(), "<p><b>&#65279;|&#65279;</b></p>");
}

#[test]
fn fill_empty_block_gets_line_break() {
    let mut editor = edit("<p>ab</p><p>\u{00A0}</p>");
    let root = editor.tree().root();
    let p = editor.tree().child(root, 1).unwrap();
    let point = editor.fill_empty_node(BoundaryPoint::start_of(p));
    assert!(editor.tree().is_br(point.node));
    assert_eq!(editor.to_plain_markup(), "<p>ab</p><p><br/></p>");
}

#[test]
fn empty_inline_wrappers_are_removed() {
    let mut editor = edit("<p>a<b></b>c</p>");
    let b = first_tagged(&editor, "b");
    let point = editor.remove_empty_inline_nodes(BoundaryPoint::start_of(b));
    assert!(editor.set_range(Range::collapsed(point)));
    assert_eq!(editor.to_markup(), "<p>a|c</p>");
}
