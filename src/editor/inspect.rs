use crate::dom::{NodeId, Tree};

use super::placeholder::{has_visible_char, is_blank, is_only_spaces};

pub fn is_visible_text(tree: &Tree, node: NodeId) -> bool {
    tree.is_text(node) && has_visible_char(tree.text(node))
}

pub fn is_invisible_text(tree: &Tree, node: NodeId) -> bool {
    tree.is_text(node) && !has_visible_char(tree.text(node))
}

pub fn is_blank_text(tree: &Tree, node: NodeId) -> bool {
    tree.is_text(node) && is_blank(tree.text(node))
}

/// Nothing but whitespace inside, recursively. Voids are never blank.
pub fn is_blank_node(tree: &Tree, node: NodeId) -> bool {
    if tree.is_void(node) {
        return false;
    }
    if tree.is_text(node) {
        return is_only_spaces(tree.text(node));
    }
    tree.children(node)
        .iter()
        .all(|child| is_blank_node(tree, *child))
}

/// No content, a lone line break, or only empty text.
pub fn is_empty_node(tree: &Tree, node: NodeId) -> bool {
    if tree.node_len(node) == 0 {
        return true;
    }
    let children = tree.children(node);
    if children.len() == 1 && tree.is_br(children[0]) {
        return true;
    }
    tree.is_element(node)
        && children
            .iter()
            .all(|child| tree.is_text(*child) && tree.text(*child).is_empty())
}

/// Serializes to an empty string.
pub fn inner_is_empty(tree: &Tree, node: NodeId) -> bool {
    if tree.is_text(node) {
        return tree.text(node).is_empty();
    }
    tree.children(node)
        .iter()
        .all(|child| tree.is_text(*child) && tree.text(*child).is_empty())
}

/// Only text children made of whitespace, NBSP or placeholders.
pub fn inner_is_spaces(tree: &Tree, node: NodeId) -> bool {
    tree.is_element(node)
        && tree
            .children(node)
            .iter()
            .all(|child| tree.is_text(*child) && is_only_spaces(tree.text(*child)))
}

/// A single line break, ignoring surrounding whitespace text.
pub fn inner_only_br(tree: &Tree, node: NodeId) -> bool {
    let significant: Vec<NodeId> = tree
        .children(node)
        .iter()
        .copied()
        .filter(|child| !(tree.is_text(*child) && tree.text(*child).trim().is_empty()))
        .collect();
    significant.len() == 1 && tree.is_br(significant[0])
}

pub fn has_only_br(tree: &Tree, node: NodeId) -> bool {
    tree.element_child_count(node) == 1 && tree.first_child(node).is_some_and(|c| tree.is_br(c))
}

pub fn count_line_breaks(tree: &Tree, node: NodeId) -> usize {
    tree.descendants(node)
        .into_iter()
        .filter(|n| tree.is_br(*n))
        .count()
}

/// No significant sibling before the node.
pub fn is_left_edge_node(tree: &Tree, node: NodeId) -> bool {
    let mut current = tree.prev_sibling(node);
    while let Some(sibling) = current {
        if !is_blank_text(tree, sibling) {
            return false;
        }
        current = tree.prev_sibling(sibling);
    }
    true
}

pub fn is_right_edge_node(tree: &Tree, node: NodeId) -> bool {
    let mut current = tree.next_sibling(node);
    while let Some(sibling) = current {
        if !is_blank_text(tree, sibling) {
            return false;
        }
        current = tree.next_sibling(sibling);
    }
    true
}

/// `contained` is a child of `container` and every other child is invisible text.
pub fn only_contains(tree: &Tree, container: NodeId, contained: NodeId) -> bool {
    tree.parent(contained) == Some(container)
        && tree
            .children(container)
            .iter()
            .all(|child| *child == contained || is_invisible_text(tree, *child))
}

pub fn is_in_pre(tree: &Tree, node: NodeId) -> bool {
    tree.ancestor(node, |n| tree.has_tag(n, "pre")).is_some()
}

pub fn is_list(tree: &Tree, node: NodeId) -> bool {
    tree.has_tag(node, "ul") || tree.has_tag(node, "ol")
}

pub fn is_list_item(tree: &Tree, node: NodeId) -> bool {
    tree.has_tag(node, "li")
}

pub fn is_cell(tree: &Tree, node: NodeId) -> bool {
    tree.has_tag(node, "td") || tree.has_tag(node, "th")
}
