use pretty_assertions::assert_eq;

use super::*;

fn edit(input: &str) -> DocumentEditor {
    DocumentEditor::from_markup(input).unwrap()
}

fn first_text(editor: &DocumentEditor) -> NodeId {
    let tree = editor.tree();
    tree.descendants(tree.root())
        .into_iter()
        .find(|n| tree.is_text(*n))
        .unwrap()
}

fn first_tagged(editor: &DocumentEditor, tag: &str) -> NodeId {
    let tree = editor.tree();
    tree.descendants(tree.root())
        .into_iter()
        .find(|n| tree.has_tag(*n, tag))
        .unwrap()
}

#[test]
fn splits_paragraph_inside_text() {
    let mut editor = edit("<p>dom to edit</p>");
    let text = first_text(&editor);
    let p = first_tagged(&editor, "p");
    let right = editor.split_tree(p, BoundaryPoint::new(text, 1), SplitOptions::default());
    assert_eq!(editor.to_plain_markup(), "<p>d</p><p>om to edit</p>");
    let right = right.unwrap();
    assert_eq!(editor.tree().text_content(right), "om to edit");
}

#[test]
fn split_before_space_secures_it() {
    let mut editor = edit("<p>dom to edit</p>");
    let text = first_text(&editor);
    let p = first_tagged(&editor, "p");
    editor.split_tree(p, BoundaryPoint::new(text, 3), SplitOptions::default());
    assert_eq!(editor.to_plain_markup(), "<p>dom</p><p>&nbsp;to edit</p>");
}

#[test]
fn split_at_start_pads_empty_left_side() {
    let mut editor = edit("<p>abc</p>");
    let text = first_text(&editor);
    let p = first_tagged(&editor, "p");
    editor.split_tree(p, BoundaryPoint::new(text, 0), SplitOptions::default());
    assert_eq!(editor.to_plain_markup(), "<p><br/></p><p>abc</p>");
}

#[test]
fn split_at_start_without_padding() {
    let mut editor = edit("<p>abc</p>");
    let text = first_text(&editor);
    let p = first_tagged(&editor, "p");
    editor.split_tree(p, BoundaryPoint::new(text, 0), SplitOptions::SKIP_PADDING);
    assert_eq!(editor.to_plain_markup(), "<p></p><p>abc</p>");
}

#[test]
fn split_on_edge_returns_existing_node() {
    let mut editor = edit("<p>abc</p>");
    let text = first_text(&editor);
    let p = first_tagged(&editor, "p");
    let right = editor.split_tree(
        p,
        BoundaryPoint::new(text, 0),
        SplitOptions::SKIP_PADDING_NO_EDGE,
    );
    assert_eq!(right, Some(p));
    assert_eq!(editor.to_plain_markup(), "<p>abc</p>");
}

#[test]
fn split_never_clones_unbreakable_ancestors() {
    let mut editor = edit("<table><tbody><tr><td>abc</td></tr></tbody></table>");
    let text = first_text(&editor);
    let root = editor.tree().root();
    editor.split_tree(root, BoundaryPoint::new(text, 1), SplitOptions::default());
    let tree = editor.tree();
    let cells = tree
        .descendants(root)
        .into_iter()
        .filter(|n| tree.has_tag(*n, "td"))
        .count();
    assert_eq!(cells, 1);
    assert_eq!(tree.text_content(root), "abc");
}

#[test]
fn split_with_stale_point_does_nothing() {
    let mut editor = edit("<p>abc</p>");
    let text = first_text(&editor);
    let p = first_tagged(&editor, "p");
    assert_eq!(
        editor.split_tree(p, BoundaryPoint::new(text, 9), SplitOptions::default()),
        None
    );
    editor.tree_mut().detach(text);
    assert_eq!(
        editor.split_tree(p, BoundaryPoint::new(text, 1), SplitOptions::default()),
        None
    );
}

#[test]
fn split_text_at_selection_isolates_selected_chars() {
    let mut editor = edit("<p>a[bc]d</p>");
    let range = editor.split_text_at_selection(editor.range());
    assert_eq!(range.start.node, range.end.node);
    assert_eq!(range.start.offset, 0);
    assert_eq!(range.end.offset, 2);
    assert_eq!(editor.tree().text(range.start.node), "bc");
    assert_eq!(editor.to_plain_markup(), "<p>abcd</p>");
}

#[test]
fn split_at_node_ends_isolates_node_in_its_parent() {
    let mut editor = edit("<p><b>a<i>x</i>c</b></p>");
    let italic = first_tagged(&editor, "i");
    editor.split_at_node_ends(italic);
    assert_eq!(
        editor.to_plain_markup(),
        "<p><b>a</b><b><i>x</i></b><b>c</b></p>"
    );
}
