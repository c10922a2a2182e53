use pretty_assertions::assert_eq;

use super::*;
use crate::editor::options::default_is_unbreakable_node;

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

#[test]
fn empty_tree_gets_padded_paragraph() {
    let editor = DocumentEditor::new(Tree::new());
    assert_eq!(editor.to_markup(), "<p>|<br/></p>");
    assert!(editor.range().is_collapsed());
}

#[test]
fn caret_starts_on_first_text_without_markers() {
    let editor = edit("<p>ab</p><p>cd</p>");
    assert_eq!(editor.to_markup(), "<p>|ab</p><p>cd</p>");
    assert_eq!(editor.caret(), editor.range().start);
}

#[test]
fn markers_set_the_range() {
    let editor = edit("<p>a[b</p><p>c]d</p>");
    assert!(!editor.range().is_collapsed());
    assert_eq!(editor.to_markup(), "<p>a[b</p><p>c]d</p>");
    assert_eq!(editor.to_plain_markup(), "<p>ab</p><p>cd</p>");
}

#[test]
fn broken_markup_is_an_error() {
    assert_eq!(
        DocumentEditor::from_markup("<p>ab").unwrap_err(),
        MarkupError::UnclosedElement("p".to_string())
    );
}

#[test]
fn leading_invisible_text_is_dropped() {
    let editor = edit("  \n<p>ab</p>");
    assert_eq!(editor.to_plain_markup(), "<p>ab</p>");
}

#[test]
fn out_of_bounds_range_is_refused() {
    let mut editor = edit("<p>a|b</p>");
    let before = editor.range();
    let text = editor.caret().node;
    assert!(!editor.set_range(Range::collapsed(BoundaryPoint::new(text, 7))));
    assert_eq!(editor.range(), before);
    assert!(editor.set_range(Range::collapsed(BoundaryPoint::new(text, 2))));
    assert_eq!(editor.to_markup(), "<p>ab|</p>");
}

#[test]
fn normalizing_text_carries_points_along() {
    let mut tree = Tree::new();
    let root = tree.root();
    let p = tree.create_element("p");
    let ab = tree.create_text("ab");
    let empty = tree.create_text("");
    let cd = tree.create_text("cd");
    tree.append_child(root, p);
    tree.append_child(p, ab);
    tree.append_child(p, empty);
    tree.append_child(p, cd);

    let mut editor = DocumentEditor::new(tree);
    let mut on_cd = BoundaryPoint::new(cd, 1);
    let mut on_empty = BoundaryPoint::new(empty, 0);
    let mut after_all = BoundaryPoint::new(p, 3);
    editor.normalize_text_nodes(root, &mut [&mut on_cd, &mut on_empty, &mut after_all]);

    assert_eq!(editor.tree().children(p), &[ab]);
    assert_eq!(editor.tree().text(ab), "abcd");
    assert_eq!(on_cd, BoundaryPoint::new(ab, 3));
    assert_eq!(on_empty, BoundaryPoint::new(ab, 2));
    assert_eq!(after_all, BoundaryPoint::new(p, 1));
}

#[test]
fn default_classification() {
    let editor = edit("<h1>a<b>b</b><br/>c</h1><table><tbody><tr><td>x</td></tr></tbody></table>");
    let tree = editor.tree();
    let h1 = first_tagged(&editor, "h1");
    let b = first_tagged(&editor, "b");
    let br = first_tagged(&editor, "br");
    let td = first_tagged(&editor, "td");
    let cell_text = tree.first_child(td).unwrap();

    assert!(editor.is_block(h1));
    assert!(editor.is_format_node(h1));
    assert!(!editor.is_unbreakable(h1));
    assert!(editor.is_inline(b));
    assert!(editor.is_format_carrier(b));
    assert!(!editor.is_block(br));
    assert!(!editor.is_void_block(br));
    assert!(editor.is_unbreakable(td));
    assert!(editor.is_unbreakable(cell_text));
    assert!(editor.is_unbreakable(tree.root()));
}

fn nothing_is_unbreakable(_: &Tree, _: NodeId) -> bool {
    false
}

#[test]
fn root_stays_unbreakable_with_host_predicates() {
    let options = EditorOptions {
        is_unbreakable_node: nothing_is_unbreakable,
        style_tags: vec!["p".to_string()],
        ..EditorOptions::default()
    };
    let editor = DocumentEditor::from_markup_with_options("<h2>a|b</h2>", options).unwrap();
    let h2 = first_tagged(&editor, "h2");
    assert!(editor.is_unbreakable(editor.tree().root()));
    assert!(!editor.is_format_node(h2));
    assert!(default_is_unbreakable_node(editor.tree(), editor.tree().root()));
}

#[test]
fn caret_stops_cover_text_rules_and_empty_lines() {
    let editor = edit("<p>ab</p><hr/><p><br/></p>");
    let tree = editor.tree();
    let root = tree.root();
    let p = tree.first_child(root).unwrap();
    let ab = tree.first_child(p).unwrap();
    let br = first_tagged(&editor, "br");
    assert_eq!(
        editor.caret_stops(),
        vec![
            BoundaryPoint::new(ab, 0),
            BoundaryPoint::new(ab, 1),
            BoundaryPoint::new(ab, 2),
            BoundaryPoint::new(root, 1),
            BoundaryPoint::new(root, 2),
            BoundaryPoint::start_of(br),
        ]
    );
}

#[test]
fn clones_edit_independently() {
    let original = edit("<p>ab|</p>");
    let mut copy = original.clone();
    copy.handle_key(KeyEvent::Char('c'));
    assert_eq!(original.to_markup(), "<p>ab|</p>");
    assert_eq!(copy.to_markup(), "<p>abc|</p>");
}
