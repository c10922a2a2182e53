//! Conversion between the editing tree and `tdoc` documents (FTML and Markdown).

use tdoc::{ChecklistItem, Document, InlineStyle, Paragraph, ParagraphType, Span};
use tracing::trace;

use crate::dom::{NodeId, Tree};
use crate::editor::placeholder::{NBSP, ZERO_WIDTH};

const INDENT_CLASS: &str = "o_indent";
const CHECKLIST_CLASS: &str = "o_checklist";
const CHECKED_CLASS: &str = "o_checked";

/// Builds an editing tree from a document.
pub fn document_to_tree(document: &Document) -> Tree {
    let mut tree = Tree::new();
    let root = tree.root();
    for paragraph in &document.paragraphs {
        append_paragraph(&mut tree, root, paragraph);
    }
    tree
}

fn append_paragraph(tree: &mut Tree, parent: NodeId, paragraph: &Paragraph) {
    match paragraph {
        Paragraph::Quote { children } => {
            let quote = tree.create_element("blockquote");
            tree.append_child(parent, quote);
            for child in children {
                append_paragraph(tree, quote, child);
            }
            pad_if_empty(tree, quote);
        }
        Paragraph::OrderedList { entries } => append_list(tree, parent, "ol", entries),
        Paragraph::UnorderedList { entries } => append_list(tree, parent, "ul", entries),
        Paragraph::Checklist { items } => append_checklist(tree, parent, items),
        _ => {
            let tag = match paragraph.paragraph_type() {
                ParagraphType::Header1 => "h1",
                ParagraphType::Header2 => "h2",
                ParagraphType::Header3 => "h3",
                ParagraphType::CodeBlock => "pre",
                _ => "p",
            };
            let block = tree.create_element(tag);
            tree.append_child(parent, block);
            append_spans(tree, block, paragraph.content());
            pad_if_empty(tree, block);
        }
    }
}

fn append_list(tree: &mut Tree, parent: NodeId, tag: &str, entries: &[Vec<Paragraph>]) {
    let list = tree.create_element(tag);
    tree.append_child(parent, list);
    for entry in entries {
        let item = tree.create_element("li");
        tree.append_child(list, item);
        let mut nested = Vec::new();
        for (index, paragraph) in entry.iter().enumerate() {
            let is_list = matches!(
                paragraph,
                Paragraph::OrderedList { .. }
                    | Paragraph::UnorderedList { .. }
                    | Paragraph::Checklist { .. }
            );
            if is_list {
                nested.push(paragraph);
            } else if index == 0 && paragraph.paragraph_type() == ParagraphType::Text {
                append_spans(tree, item, paragraph.content());
            } else {
                append_paragraph(tree, item, paragraph);
            }
        }
        pad_if_empty(tree, item);
        for paragraph in nested {
            let holder = tree.create_element("li");
            tree.add_class(holder, INDENT_CLASS);
            tree.append_child(list, holder);
            append_paragraph(tree, holder, paragraph);
        }
    }
}

fn append_checklist(tree: &mut Tree, parent: NodeId, items: &[ChecklistItem]) {
    let list = tree.create_element("ul");
    tree.add_class(list, CHECKLIST_CLASS);
    tree.append_child(parent, list);
    for item in items {
        let li = tree.create_element("li");
        if item.checked {
            tree.add_class(li, CHECKED_CLASS);
        }
        tree.append_child(list, li);
        append_spans(tree, li, &item.content);
        pad_if_empty(tree, li);
        if !item.children.is_empty() {
            let holder = tree.create_element("li");
            tree.add_class(holder, INDENT_CLASS);
            tree.append_child(list, holder);
            append_checklist(tree, holder, &item.children);
        }
    }
}

fn append_spans(tree: &mut Tree, parent: NodeId, spans: &[Span]) {
    for span in spans {
        append_span(tree, parent, span);
    }
}

fn append_span(tree: &mut Tree, parent: NodeId, span: &Span) {
    let tag = match span.style {
        InlineStyle::None => None,
        InlineStyle::Bold => Some("b"),
        InlineStyle::Italic => Some("i"),
        InlineStyle::Underline => Some("u"),
        InlineStyle::Strike => Some("s"),
        InlineStyle::Highlight => Some("mark"),
        InlineStyle::Code => Some("code"),
        InlineStyle::Link => Some("a"),
    };
    let container = match tag {
        Some(tag) => {
            let wrapper = tree.create_element(tag);
            if let Some(target) = span.link_target.as_deref() {
                tree.set_attr(wrapper, "href", target);
            }
            tree.append_child(parent, wrapper);
            wrapper
        }
        None => parent,
    };
    for (index, line) in span.text.split('\n').enumerate() {
        if index > 0 {
            let br = tree.create_void("br");
            tree.append_child(container, br);
        }
        if !line.is_empty() {
            let text = tree.create_text(line);
            tree.append_child(container, text);
        }
    }
    append_spans(tree, container, &span.children);
}

fn pad_if_empty(tree: &mut Tree, block: NodeId) {
    let visible = tree
        .text_content(block)
        .chars()
        .any(|ch| !ch.is_whitespace() && ch != ZERO_WIDTH);
    let has_void = tree.descendants(block).into_iter().any(|n| tree.is_void(n));
    if !visible && !has_void {
        tree.clear_children(block);
        let br = tree.create_void("br");
        tree.append_child(block, br);
    }
}

/// Builds a document from an editing tree. Wrappers without a document counterpart are
/// flattened.
pub fn tree_to_document(tree: &Tree) -> Document {
    let paragraphs = blocks_to_paragraphs(tree, tree.children(tree.root()));
    trace!(paragraphs = paragraphs.len(), "exported tree");
    Document::new().with_paragraphs(paragraphs)
}

fn is_block_tag(tag: &str) -> bool {
    matches!(
        tag,
        "p" | "div"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "pre"
            | "blockquote"
            | "ul"
            | "ol"
            | "li"
            | "hr"
            | "table"
            | "section"
            | "article"
    )
}

fn is_block_node(tree: &Tree, node: NodeId) -> bool {
    tree.tag(node).is_some_and(is_block_tag)
}

/// Converts sibling nodes to paragraphs. Runs of inline nodes become text paragraphs.
fn blocks_to_paragraphs(tree: &Tree, nodes: &[NodeId]) -> Vec<Paragraph> {
    let mut paragraphs = Vec::new();
    let mut inline_run: Vec<NodeId> = Vec::new();
    for node in nodes {
        if is_block_node(tree, *node) {
            flush_inline_run(tree, &mut inline_run, &mut paragraphs);
            paragraphs.extend(block_to_paragraphs(tree, *node));
        } else {
            inline_run.push(*node);
        }
    }
    flush_inline_run(tree, &mut inline_run, &mut paragraphs);
    paragraphs
}

fn flush_inline_run(tree: &Tree, run: &mut Vec<NodeId>, paragraphs: &mut Vec<Paragraph>) {
    if run.is_empty() {
        return;
    }
    let nodes = std::mem::take(run);
    let blank = nodes.iter().all(|node| {
        tree.is_text(*node) && tree.text(*node).chars().all(|ch| ch.is_whitespace() || ch == ZERO_WIDTH)
    });
    if blank {
        return;
    }
    paragraphs.push(Paragraph::new_text().with_content(non_empty(inline_spans(tree, &nodes))));
}

fn block_to_paragraphs(tree: &Tree, node: NodeId) -> Vec<Paragraph> {
    let tag = tree.tag(node).unwrap_or_default();
    let children = tree.children(node);
    match tag {
        "ul" | "ol" if tree.has_class(node, CHECKLIST_CLASS) => {
            vec![Paragraph::Checklist {
                items: checklist_items(tree, node),
            }]
        }
        "ul" => vec![Paragraph::UnorderedList {
            entries: list_entries(tree, node),
        }],
        "ol" => vec![Paragraph::OrderedList {
            entries: list_entries(tree, node),
        }],
        "blockquote" => {
            let mut inner = blocks_to_paragraphs(tree, children);
            if inner.is_empty() {
                inner.push(Paragraph::new_text().with_content(vec![Span::new_text("")]));
            }
            vec![Paragraph::Quote { children: inner }]
        }
        "hr" => Vec::new(),
        "p" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "pre" | "li" => {
            if children.iter().any(|child| is_block_node(tree, *child)) {
                return blocks_to_paragraphs(tree, children);
            }
            let content = non_empty(inline_spans(tree, children));
            let paragraph = match tag {
                "h1" => Paragraph::Header1 { content },
                "h2" => Paragraph::Header2 { content },
                "h3" | "h4" | "h5" | "h6" => Paragraph::Header3 { content },
                "pre" => Paragraph::CodeBlock { content },
                _ => Paragraph::Text { content },
            };
            vec![paragraph]
        }
        _ => blocks_to_paragraphs(tree, children),
    }
}

fn list_entries(tree: &Tree, list: NodeId) -> Vec<Vec<Paragraph>> {
    let mut entries: Vec<Vec<Paragraph>> = Vec::new();
    for item in tree.children(list) {
        if !tree.has_tag(*item, "li") {
            if tree.is_text(*item) {
                continue;
            }
            entries.push(block_to_paragraphs(tree, *item));
            continue;
        }
        let paragraphs = item_paragraphs(tree, *item);
        match entries.last_mut() {
            Some(previous) if tree.has_class(*item, INDENT_CLASS) => previous.extend(paragraphs),
            _ => entries.push(paragraphs),
        }
    }
    entries
}

fn item_paragraphs(tree: &Tree, item: NodeId) -> Vec<Paragraph> {
    let mut paragraphs = blocks_to_paragraphs(tree, tree.children(item));
    if paragraphs.is_empty() {
        paragraphs.push(Paragraph::new_text().with_content(vec![Span::new_text("")]));
    }
    paragraphs
}

fn checklist_items(tree: &Tree, list: NodeId) -> Vec<ChecklistItem> {
    let mut items: Vec<ChecklistItem> = Vec::new();
    for item in tree.children(list) {
        if !tree.has_tag(*item, "li") {
            continue;
        }
        if tree.has_class(*item, INDENT_CLASS) {
            let nested: Vec<ChecklistItem> = tree
                .children(*item)
                .iter()
                .filter(|child| tree.has_tag(**child, "ul") || tree.has_tag(**child, "ol"))
                .flat_map(|child| checklist_items(tree, *child))
                .collect();
            match items.last_mut() {
                Some(previous) => previous.children.extend(nested),
                None => items.extend(nested),
            }
            continue;
        }
        let inline: Vec<NodeId> = tree
            .children(*item)
            .iter()
            .copied()
            .filter(|child| !is_block_node(tree, *child) || tree.has_tag(*child, "p"))
            .collect();
        let content = non_empty(inline_spans(tree, &inline));
        items.push(ChecklistItem::new(tree.has_class(*item, CHECKED_CLASS)).with_content(content));
    }
    items
}

fn non_empty(mut spans: Vec<Span>) -> Vec<Span> {
    if spans.is_empty() {
        spans.push(Span::new_text(""));
    }
    spans
}

fn inline_spans(tree: &Tree, nodes: &[NodeId]) -> Vec<Span> {
    let mut spans = Vec::new();
    for node in nodes {
        collect_spans(tree, *node, &mut spans);
    }
    trim_trailing_break(&mut spans);
    spans
}

fn collect_spans(tree: &Tree, node: NodeId, spans: &mut Vec<Span>) {
    if tree.is_text(node) {
        let text: String = tree
            .text(node)
            .chars()
            .filter(|ch| *ch != ZERO_WIDTH)
            .map(|ch| if ch == NBSP { ' ' } else { ch })
            .collect();
        push_text(spans, &text);
        return;
    }
    if tree.is_br(node) {
        push_text(spans, "\n");
        return;
    }
    if tree.is_void(node) {
        return;
    }
    let style = match tree.tag(node).unwrap_or_default() {
        "b" | "strong" => InlineStyle::Bold,
        "i" | "em" => InlineStyle::Italic,
        "u" => InlineStyle::Underline,
        "s" | "strike" | "del" => InlineStyle::Strike,
        "mark" => InlineStyle::Highlight,
        "code" => InlineStyle::Code,
        "a" => InlineStyle::Link,
        _ => InlineStyle::None,
    };
    if style == InlineStyle::None {
        for child in tree.children(node) {
            collect_spans(tree, *child, spans);
        }
        return;
    }
    let mut children = Vec::new();
    for child in tree.children(node) {
        collect_spans(tree, *child, &mut children);
    }
    let mut span = Span::new_styled(style);
    if style == InlineStyle::Link {
        span.link_target = tree.attr(node, "href").map(str::to_string);
    }
    if let [only] = children.as_slice()
        && only.style == InlineStyle::None
        && only.children.is_empty()
    {
        span.text = only.text.clone();
    } else {
        span.children = children;
    }
    spans.push(span);
}

/// Appends plain text, joining it with a preceding plain span.
fn push_text(spans: &mut Vec<Span>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(last) = spans.last_mut()
        && last.style == InlineStyle::None
        && last.children.is_empty()
    {
        last.text.push_str(text);
        return;
    }
    spans.push(Span::new_text(text));
}

/// A trailing line break only keeps an empty line open in the editor.
fn trim_trailing_break(spans: &mut Vec<Span>) {
    if let Some(last) = spans.last_mut()
        && last.style == InlineStyle::None
        && last.children.is_empty()
        && last.text.ends_with('\n')
    {
        last.text.pop();
        if last.text.is_empty() {
            spans.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tdoc::{ChecklistItem, Document, InlineStyle, Paragraph, ParagraphType, Span};

    use super::*;
    use crate::markup;

    fn to_markup(document: &Document) -> String {
        markup::serialize(&document_to_tree(document), None)
    }

    fn from_markup(input: &str) -> Document {
        let parsed = markup::parse(input, &["br", "img", "hr"]).expect("valid markup");
        tree_to_document(&parsed.tree)
    }

    #[test]
    fn paragraphs_and_headers_become_blocks() {
        let document = Document::new().with_paragraphs(vec![
            Paragraph::new_header2().with_content(vec![Span::new_text("Title")]),
            Paragraph::new_text().with_content(vec![
                Span::new_text("Hello "),
                Span::new_styled(InlineStyle::Bold).with_text("world"),
            ]),
            Paragraph::new_text().with_content(vec![Span::new_text("")]),
        ]);
        assert_eq!(
            to_markup(&document),
            "<h2>Title</h2><p>Hello <b>world</b></p><p><br/></p>"
        );
    }

    #[test]
    fn newlines_become_line_breaks() {
        let document = Document::new().with_paragraphs(vec![
            Paragraph::new_text().with_content(vec![Span::new_text("one\ntwo")]),
        ]);
        assert_eq!(to_markup(&document), "<p>one<br/>two</p>");
        let back = from_markup("<p>one<br/>two</p>");
        assert_eq!(back.paragraphs[0].content()[0].text, "one\ntwo");
    }

    #[test]
    fn checklists_keep_their_state() {
        let mut parent = ChecklistItem::new(true).with_content(vec![Span::new_text("Parent")]);
        parent.children = vec![ChecklistItem::new(false).with_content(vec![Span::new_text("Child")])];
        let document = Document::new()
            .with_paragraphs(vec![Paragraph::new_checklist().with_checklist_items(vec![parent])]);
        let html = to_markup(&document);
        assert_eq!(
            html,
            "<ul class=\"o_checklist\"><li class=\"o_checked\">Parent</li><li class=\"o_indent\"><ul class=\"o_checklist\"><li>Child</li></ul></li></ul>"
        );

        let back = from_markup(&html);
        let Paragraph::Checklist { items } = &back.paragraphs[0] else {
            panic!("expected a checklist");
        };
        assert_eq!(items.len(), 1);
        assert!(items[0].checked);
        assert_eq!(items[0].children.len(), 1);
        assert_eq!(items[0].children[0].content[0].text, "Child");
    }

    #[test]
    fn nested_lists_attach_to_previous_entry() {
        let document = from_markup(
            "<ul><li>a</li><li class=\"o_indent\"><ol><li>b</li></ol></li><li>c</li></ul>",
        );
        let Paragraph::UnorderedList { entries } = &document.paragraphs[0] else {
            panic!("expected a list");
        };
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].len(), 2);
        assert_eq!(entries[0][1].paragraph_type(), ParagraphType::OrderedList);
        assert_eq!(entries[1][0].content()[0].text, "c");
    }

    #[test]
    fn unknown_wrappers_and_placeholders_are_dropped() {
        let document = from_markup(
            "<h5><font style=\"color:red\">x&nbsp;y</font>&#65279;</h5><p><a href=\"https://example.com\">link</a></p>",
        );
        assert_eq!(document.paragraphs[0].paragraph_type(), ParagraphType::Header3);
        assert_eq!(document.paragraphs[0].content()[0].text, "x y");
        let link = &document.paragraphs[1].content()[0];
        assert_eq!(link.style, InlineStyle::Link);
        assert_eq!(link.link_target.as_deref(), Some("https://example.com"));
        assert_eq!(link.text, "link");
    }
}
