use tracing::debug;

use crate::dom::NodeId;

use super::inspect::{inner_only_br, is_cell, is_list_item, is_visible_text};
use super::placeholder::{
    NBSP, ZERO_WIDTH, char_at, has_visible_char, is_only_spaces, normalize_typed_whitespace,
    remove_char, replace_leading_spaces, replace_trailing_spaces, slice_chars,
};
use super::{BoundaryPoint, DocumentEditor, Range, SplitOptions};

impl DocumentEditor {
    /// Inserts `text` at the range, replacing the selection if there is one, and returns the
    /// collapsed range right after the inserted text. A lone space is inserted as NBSP.
    /// Returns `None` when the range is not in an editable area.
    pub fn insert_text_inline(&mut self, text: &str, range: Range) -> Option<Range> {
        if text.is_empty() || !range.is_valid(&self.tree) {
            return None;
        }
        let text = if text == " " {
            NBSP.to_string()
        } else {
            text.to_string()
        };
        let root = self.tree.root();

        let (mut start, mut end) = (range.start, range.end);
        self.normalize_text_nodes(root, &mut [&mut start, &mut end]);
        let mut point = self
            .delete_selection(Range::new(start, end))
            .unwrap_or(start);
        self.normalize_text_nodes(root, &mut [&mut point]);
        self.secure_spaces_around(&mut point);

        let text_node = self.insert_text_node_in_editable_area(&mut point, &text)?;
        if self.tree.is_attached(point.node) {
            self.secure_extreme_single_space(point.node);
        }
        self.wrap_text_with_p(text_node);

        let mut caret = BoundaryPoint::end_of(&self.tree, text_node);
        self.normalize_text_nodes(root, &mut [&mut caret]);
        if self.tree.is_text(caret.node) {
            let tidy = normalize_typed_whitespace(self.tree.text(caret.node));
            self.tree.set_text(caret.node, tidy);
        }
        let caret = self.remove_invisible_char(caret);
        debug!(chars = text.chars().count(), caret = %caret.node, "inserted text");
        Some(Range::collapsed(caret))
    }

    /// When the caret sits between two spaces (or a space and a text end), both sides become NBSP
    /// so that neither collapses once the new text is in.
    fn secure_spaces_around(&mut self, point: &mut BoundaryPoint) {
        if !self.tree.is_text(point.node) || is_only_spaces(self.tree.text(point.node)) {
            return;
        }
        let text = self.tree.text(point.node);
        let len = text.chars().count();
        let before = slice_chars(text, 0, point.offset);
        let after = slice_chars(text, point.offset, len);
        let before_ok = before.is_empty() || before.ends_with(' ');
        let after_ok = after.is_empty() || after.starts_with(' ');
        if (before.is_empty() && after.is_empty()) || !before_ok || !after_ok {
            return;
        }
        let nbsp = NBSP.to_string();
        let before = replace_trailing_spaces(&before, &nbsp);
        let after = replace_leading_spaces(&after, &nbsp);
        let before_len = before.chars().count();
        self.tree.set_text(point.node, format!("{before}{after}"));
        if point.offset > before_len {
            point.offset = before_len;
        }
    }

    fn in_locked_area(&self, node: NodeId) -> bool {
        self.tree
            .ancestor(node, |n| self.tree.attr(n, "contenteditable") == Some("false"))
            .is_some()
    }

    /// Puts a new text node holding `text` at the point. The point is updated when the node it
    /// referenced gets replaced.
    fn insert_text_node_in_editable_area(
        &mut self,
        point: &mut BoundaryPoint,
        text: &str,
    ) -> Option<NodeId> {
        let sc = point.node;
        let text_node = self.tree.create_text(text);
        if self.is_editable(sc) && !self.in_locked_area(sc) {
            if is_visible_text(&self.tree, sc) {
                let only_placeholders = self.tree.text(sc).chars().all(|ch| ch == ZERO_WIDTH);
                if only_placeholders {
                    self.tree.insert_after(sc, text_node);
                    self.tree.detach(sc);
                    *point = BoundaryPoint::end_of(&self.tree, text_node);
                } else {
                    self.tree.split_text(sc, point.offset);
                    point.offset = self.tree.node_len(sc);
                    self.tree.insert_after(sc, text_node);
                }
            } else if self.tree.is_br(sc) {
                let next_visible = self
                    .tree
                    .next_sibling(sc)
                    .is_some_and(|next| is_visible_text(&self.tree, next));
                if next_visible {
                    self.tree.insert_before(sc, text_node);
                } else {
                    self.tree.replace(sc, text_node);
                    *point = BoundaryPoint::start_of(text_node);
                }
            } else if self.tree.is_void(sc) {
                self.tree.insert_before(sc, text_node);
            } else if let Some(child) = point.child(&self.tree) {
                if self.tree.is_br(child) {
                    self.tree.replace(child, text_node);
                } else {
                    self.tree.insert_before(child, text_node);
                }
            } else if self.tree.is_text(sc) {
                self.tree.insert_after(sc, text_node);
            } else {
                self.tree.append_child(sc, text_node);
            }
        }
        if self.tree.parent(text_node).is_none()
            && let Some(parent) = self.tree.parent(sc)
            && self.is_editable(parent)
        {
            self.tree.insert_before(sc, text_node);
        }
        self.tree.parent(text_node).map(|_| text_node)
    }

    /// Bare text typed into a block container (not a list item or cell) gets its own paragraph.
    fn wrap_text_with_p(&mut self, text_node: NodeId) {
        let Some(parent) = self.tree.parent(text_node) else {
            return;
        };
        if self.tree.ancestor(text_node, |n| self.tree.has_tag(n, "a")).is_some()
            || self.tree.ancestor(text_node, |n| self.is_format_node(n)).is_some()
            || self.tree.ancestor(parent, |n| self.is_inline(n)).is_some()
            || is_list_item(&self.tree, parent)
            || is_cell(&self.tree, parent)
        {
            return;
        }
        let visible_neighbour = [self.tree.prev_sibling(text_node), self.tree.next_sibling(text_node)]
            .into_iter()
            .flatten()
            .any(|n| is_visible_text(&self.tree, n));
        if visible_neighbour {
            return;
        }
        let p = self.tree.create_element("p");
        self.tree.wrap(text_node, p);
    }

    /// Drops the placeholder right before the typed char and the one right after the caret.
    fn remove_invisible_char(&mut self, caret: BoundaryPoint) -> BoundaryPoint {
        let mut caret = caret;
        if !self.tree.is_text(caret.node)
            || self.tree.ancestor(caret.node, |n| self.tree.has_tag(n, "a")).is_some()
        {
            return caret;
        }
        if caret.offset >= 2 && char_at(self.tree.text(caret.node), caret.offset - 2) == Some(ZERO_WIDTH)
        {
            let text = remove_char(self.tree.text(caret.node), caret.offset - 2);
            self.tree.set_text(caret.node, text);
            caret.offset -= 1;
        }
        if char_at(self.tree.text(caret.node), caret.offset) == Some(ZERO_WIDTH) {
            let text = remove_char(self.tree.text(caret.node), caret.offset);
            self.tree.set_text(caret.node, text);
        }
        caret
    }

    /// Inserts a block level node (a rule, an embed) at the range, splitting the tree up to the
    /// closest unbreakable ancestor. The selection is deleted first.
    pub fn insert_block_node(&mut self, node: NodeId, range: Range) -> bool {
        if !range.is_valid(&self.tree) {
            return false;
        }
        let mut point = self.delete_selection(range).unwrap_or(range.start);
        let sc = point.node;
        let split_root = if self.is_unbreakable(sc) {
            sc
        } else {
            self.tree
                .ancestor(sc, |n| {
                    self.tree.is_root(n)
                        || self
                            .tree
                            .parent(n)
                            .is_some_and(|parent| self.is_unbreakable(parent))
                })
                .unwrap_or(sc)
        };

        if split_root == sc && point.offset == 0 && !self.tree.has_tag(sc, "p") {
            if inner_only_br(&self.tree, sc)
                && let Some(br) = self.tree.first_element_child(sc)
            {
                self.tree.detach(br);
            }
            if self.tree.is_br(sc) {
                self.tree.replace(sc, node);
            } else {
                self.tree.append_child(sc, node);
            }
            return self.tree.is_attached(node);
        }

        if !self.is_unbreakable(sc) {
            let right = self
                .split_tree(split_root, point, SplitOptions::SKIP_PADDING_NO_EDGE)
                .filter(|right| *right != sc);
            let after_content = point.offset > 0 || self.tree.is_tagged(sc);
            match right {
                Some(right) if !self.tree.contains(right, sc) || !after_content => {
                    self.tree.insert_before(right, node);
                }
                _ if after_content => {
                    let anchor = right.or_else(|| {
                        self.tree.ancestor(sc, |n| {
                            self.tree
                                .parent(n)
                                .is_some_and(|parent| self.is_unbreakable(parent))
                        })
                    });
                    if let Some(anchor) = anchor {
                        self.tree.insert_after(anchor, node);
                    }
                }
                _ => {}
            }
        } else {
            let mut container = sc;
            if self.tree.is_text(sc) {
                let p = self.tree.create_element("p");
                self.tree.wrap(sc, p);
                self.tree.split_text(sc, point.offset);
                container = p;
                point.offset = 1;
            }
            match self.tree.child(container, point.offset) {
                Some(child) => self.tree.insert_before(child, node),
                None => self.tree.append_child(container, node),
            }
        }

        if self.tree.is_element(sc) && inner_only_br(&self.tree, sc) && !has_visible_char(&self.tree.text_content(sc)) {
            let clone = self.tree.clone_deep(sc);
            if self.tree.prev_sibling(node) == Some(sc) {
                self.tree.insert_after(node, clone);
            } else if self.tree.next_sibling(node) == Some(sc) {
                self.tree.insert_before(node, clone);
            }
        }
        debug!(%node, "inserted block node");
        self.tree.is_attached(node)
    }
}
