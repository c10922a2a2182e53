use pretty_assertions::assert_eq;

use super::*;

fn edit(input: &str) -> DocumentEditor {
    DocumentEditor::from_markup(input).unwrap()
}

fn visible_texts(editor: &DocumentEditor) -> Vec<NodeId> {
    let tree = editor.tree();
    tree.descendants(tree.root())
        .into_iter()
        .filter(|n| is_visible_text(tree, *n))
        .collect()
}

#[test]
fn bold_wraps_selected_chars() {
    let mut editor = edit("<p>a[bc]d</p>");
    assert!(editor.toggle_format("b"));
    assert_eq!(editor.to_markup(), "<p>a<b>[bc]</b>d</p>");
}

#[test]
fn bold_toggles_back_to_plain_text() {
    let mut editor = edit("<p>a[bc]d</p>");
    editor.toggle_format("b");
    editor.toggle_format("b");
    assert_eq!(editor.to_markup(), "<p>a[bc]d</p>");
}

#[test]
fn uppercase_tag_names_are_accepted() {
    let mut editor = edit("<p>a[bc]d</p>");
    editor.toggle_format("B");
    assert_eq!(editor.to_plain_markup(), "<p>a<b>bc</b>d</p>");
}

#[test]
fn partially_bold_selection_becomes_fully_bold() {
    let mut editor = edit("<p>[a<b>b</b>c]</p>");
    editor.toggle_format("b");
    let tree = editor.tree();
    for text in visible_texts(&editor) {
        assert!(
            tree.ancestor(text, |n| tree.has_tag(n, "b")).is_some(),
            "{:?} is not bold",
            tree.text(text)
        );
    }
    assert_eq!(tree.text_content(tree.root()), "abc");
}

#[test]
fn collapsed_toggle_inside_bold_breaks_out() {
    let mut editor = edit("<p><b>ab|</b></p>");
    editor.toggle_format("b");
    editor.handle_key(KeyEvent::Char('c'));
    let tree = editor.tree();
    let caret = editor.caret();
    assert_eq!(tree.ancestor(caret.node, |n| tree.has_tag(n, "b")), None);
    assert_eq!(tree.text_content(tree.root()), "abc");
}

#[test]
fn color_wraps_selection_in_font() {
    let mut editor = edit("<p>a[bc]d</p>");
    assert!(editor.apply_font_style(&FontStyle::color("red")));
    assert_eq!(
        editor.to_markup(),
        r#"<p>a<font style="color: red;">[bc]</font>d</p>"#
    );
}

#[test]
fn color_class_is_kept_as_class() {
    let mut editor = edit("<p>[ab]</p>");
    editor.apply_font_style(&FontStyle::color("text-primary"));
    assert_eq!(
        editor.to_plain_markup(),
        r#"<p><font class="text-primary">ab</font></p>"#
    );
}

#[test]
fn applying_same_color_twice_changes_nothing_more() {
    let mut editor = edit("<p>a[bc]d</p>");
    editor.apply_font_style(&FontStyle::color("red"));
    let once = editor.to_markup();
    editor.apply_font_style(&FontStyle::color("red"));
    assert_eq!(editor.to_markup(), once);
}

#[test]
fn undefined_color_unwraps_font() {
    let mut editor = edit("<p>a[bc]d</p>");
    editor.apply_font_style(&FontStyle::color("red"));
    editor.apply_font_style(&FontStyle::color("text-undefined"));
    assert_eq!(editor.to_plain_markup(), "<p>abcd</p>");
}

#[test]
fn size_is_written_in_pixels() {
    let mut editor = edit("<p>[ab]</p>");
    editor.apply_font_style(&FontStyle::size(18));
    assert_eq!(
        editor.to_plain_markup(),
        r#"<p><font style="font-size: 18px;">ab</font></p>"#
    );
}

#[test]
fn color_at_caret_leaves_styled_placeholder() {
    let mut editor = edit("<p>ab|</p>");
    editor.apply_font_style(&FontStyle::color("red"));
    assert_eq!(
        editor.to_markup(),
        r#"<p>ab<font style="color: red;">&#65279;|</font></p>"#
    );
}

#[test]
fn empty_font_style_is_refused() {
    let mut editor = edit("<p>[ab]</p>");
    assert!(!editor.apply_font_style(&FontStyle::default()));
    assert_eq!(editor.to_markup(), "<p>[ab]</p>");
}

#[test]
fn clear_format_lifts_text_out_of_carriers() {
    let mut editor = edit("<p><b>[ab]</b></p>");
    assert!(editor.clear_format());
    assert_eq!(editor.to_markup(), "<p>[ab]</p>");
}

#[test]
fn clear_format_strips_nested_carriers() {
    let mut editor = edit(r#"<p>[<b><font style="color: red;"><i>ab</i></font></b>]</p>"#);
    editor.clear_format();
    assert_eq!(editor.to_plain_markup(), "<p>ab</p>");
}

#[test]
fn block_format_retags_paragraph() {
    let mut editor = edit(r#"<p class="lead">a|b</p>"#);
    assert!(editor.set_block_format("h1"));
    assert_eq!(editor.to_markup(), r#"<h1 class="lead">[ab]</h1>"#);
}

#[test]
fn block_format_in_list_item_wraps_content() {
    let mut editor = edit("<ul><li>a|b</li></ul>");
    editor.set_block_format("h2");
    assert_eq!(editor.to_markup(), "<ul><li><h2>[ab]</h2></li></ul>");
}

#[test]
fn block_format_covers_every_selected_block() {
    let mut editor = edit("<p>a[b</p><p>c]d</p>");
    editor.set_block_format("pre");
    assert_eq!(editor.to_plain_markup(), "<pre>ab</pre><pre>cd</pre>");
}

#[test]
fn toggle_list_wraps_paragraph_and_unwraps_it_again() {
    let mut editor = edit("<p>a|b</p>");
    assert!(editor.toggle_list(ListKind::Unordered));
    assert_eq!(editor.to_markup(), "<ul><li>a|b</li></ul>");
    assert!(editor.toggle_list(ListKind::Unordered));
    assert_eq!(editor.to_markup(), "<p>a|b</p>");
}

#[test]
fn toggle_list_converts_between_kinds() {
    let mut editor = edit("<ul><li>a|b</li></ul>");
    editor.toggle_list(ListKind::Ordered);
    assert_eq!(editor.to_markup(), "<ol><li>a|b</li></ol>");
    editor.toggle_list(ListKind::Checklist);
    assert_eq!(editor.to_markup(), r#"<ul class="o_checklist"><li>a|b</li></ul>"#);
}

#[test]
fn new_list_joins_list_before_it() {
    let mut editor = edit("<ul><li>a</li></ul><p>b|</p>");
    editor.toggle_list(ListKind::Unordered);
    let tree = editor.tree();
    let lists = tree
        .descendants(tree.root())
        .into_iter()
        .filter(|n| tree.has_tag(*n, "ul"))
        .count();
    assert_eq!(lists, 1);
    assert_eq!(tree.text_content(tree.root()), "ab");
}
