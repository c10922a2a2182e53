use crate::dom::{NodeId, Tree};

/// Node predicate supplied by the host.
pub type NodePredicate = fn(&Tree, NodeId) -> bool;

pub const DEFAULT_STYLE_TAGS: &[&str] = &[
    "p",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "blockquote",
    "pre",
];

pub const DEFAULT_FORMAT_TAGS: &[&str] = &[
    "abbr", "acronym", "b", "bdi", "bdo", "big", "blink", "cite", "code", "dfn", "em", "font",
    "i", "ins", "kbd", "mark", "nobr", "q", "s", "samp", "small", "span", "strike", "strong",
    "sub", "sup", "tt", "u", "var",
];

pub const DEFAULT_VOID_TAGS: &[&str] = &["br", "img", "hr", "iframe", "button", "input"];

const BLOCK_TAGS: &[&str] = &[
    "p",
    "div",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "blockquote",
    "pre",
    "ul",
    "ol",
    "li",
    "table",
    "thead",
    "tbody",
    "tfoot",
    "tr",
    "td",
    "th",
    "hr",
    "address",
    "article",
    "aside",
    "dl",
    "dt",
    "dd",
    "figure",
    "footer",
    "header",
    "nav",
    "section",
];

const TABLE_STRUCTURE_TAGS: &[&str] = &["table", "thead", "tbody", "tfoot", "tr"];
const UNBREAKABLE_TAGS: &[&str] = &["td", "tr", "tbody", "tfoot", "thead", "table"];

/// Capabilities and tag lists the editing engine consults. Built once, never mutated by the engine.
#[derive(Clone, Debug)]
pub struct EditorOptions {
    pub is_text: NodePredicate,
    pub is_void_block: NodePredicate,
    pub is_unbreakable_node: NodePredicate,
    pub is_editable_node: NodePredicate,
    pub is_block_type: NodePredicate,
    /// Block tags that carry paragraph formatting.
    pub style_tags: Vec<String>,
    /// Inline tags that may carry character formatting.
    pub format_tags: Vec<String>,
    /// Tags parsed as atomic leaves.
    pub void_tags: Vec<String>,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            is_text: default_is_text,
            is_void_block: default_is_void_block,
            is_unbreakable_node: default_is_unbreakable_node,
            is_editable_node: default_is_editable_node,
            is_block_type: default_is_block_type,
            style_tags: owned(DEFAULT_STYLE_TAGS),
            format_tags: owned(DEFAULT_FORMAT_TAGS),
            void_tags: owned(DEFAULT_VOID_TAGS),
        }
    }
}

impl EditorOptions {
    pub fn is_style_tag(&self, tag: &str) -> bool {
        self.style_tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    pub fn is_format_tag(&self, tag: &str) -> bool {
        self.format_tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    pub fn is_void_tag(&self, tag: &str) -> bool {
        self.void_tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}

fn owned(tags: &[&str]) -> Vec<String> {
    tags.iter().map(|tag| tag.to_string()).collect()
}

fn element_or_parent(tree: &Tree, node: NodeId) -> Option<NodeId> {
    if tree.is_text(node) {
        tree.parent(node)
    } else {
        Some(node)
    }
}

fn has_any_tag(tree: &Tree, node: NodeId, tags: &[&str]) -> bool {
    tree.tag(node)
        .is_some_and(|tag| tags.iter().any(|t| t.eq_ignore_ascii_case(tag)))
}

pub fn default_is_text(tree: &Tree, node: NodeId) -> bool {
    tree.is_text(node)
}

pub fn default_is_void_block(tree: &Tree, node: NodeId) -> bool {
    (tree.is_void(node) && !tree.is_br(node))
        || tree.attr(node, "contenteditable") == Some("false")
        || tree.has_class(node, "o_fake_editable")
}

pub fn default_is_editable_node(tree: &Tree, node: NodeId) -> bool {
    match element_or_parent(tree, node) {
        Some(node) => !has_any_tag(tree, node, TABLE_STRUCTURE_TAGS),
        None => false,
    }
}

pub fn default_is_unbreakable_node(tree: &Tree, node: NodeId) -> bool {
    let Some(node) = element_or_parent(tree, node) else {
        return false;
    };
    if has_any_tag(tree, node, UNBREAKABLE_TAGS) || tree.is_root(node) {
        return true;
    }
    let parent_editable = tree
        .parent(node)
        .is_some_and(|parent| default_is_editable_node(tree, parent));
    !parent_editable || !default_is_editable_node(tree, node)
}

pub fn default_is_block_type(tree: &Tree, node: NodeId) -> bool {
    has_any_tag(tree, node, BLOCK_TAGS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_cells_are_unbreakable_but_paragraphs_are_not() {
        let mut tree = Tree::new();
        let root = tree.root();
        let table = tree.create_element("table");
        let tr = tree.create_element("tr");
        let td = tree.create_element("td");
        let p = tree.create_element("p");
        tree.append_child(root, table);
        tree.append_child(table, tr);
        tree.append_child(tr, td);
        tree.append_child(root, p);

        assert!(default_is_unbreakable_node(&tree, td));
        assert!(default_is_unbreakable_node(&tree, root));
        assert!(!default_is_unbreakable_node(&tree, p));
        assert!(!default_is_editable_node(&tree, tr));
        assert!(default_is_editable_node(&tree, td));
    }

    #[test]
    fn line_breaks_are_not_void_blocks() {
        let mut tree = Tree::new();
        let br = tree.create_void("br");
        let img = tree.create_void("img");
        let span = tree.create_element("span");
        tree.set_attr(span, "contenteditable", "false");
        assert!(!default_is_void_block(&tree, br));
        assert!(default_is_void_block(&tree, img));
        assert!(default_is_void_block(&tree, span));
    }
}
