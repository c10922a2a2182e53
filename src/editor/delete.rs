use tracing::debug;

use crate::dom::NodeId;

use super::inspect::{inner_is_empty, inner_is_spaces, is_blank_node, is_list};
use super::placeholder::{
    NBSP, ZERO_WIDTH, ends_with_space_after_char, replace_leading_spaces, replace_trailing_spaces,
    starts_with_space_before_char,
};
use super::{BoundaryPoint, Direction, DocumentEditor, Range, SplitOptions};

impl DocumentEditor {
    /// Removes everything strictly between `a` and `b` and returns the surviving caret position.
    /// Splitting is bounded by unbreakable ancestors, so content behind them is never touched.
    /// Text runs are removable even where their container is unbreakable.
    pub fn delete_between(&mut self, a: BoundaryPoint, b: BoundaryPoint) -> BoundaryPoint {
        if a == b || !a.is_valid(&self.tree) || !b.is_valid(&self.tree) {
            return a;
        }
        let mut a = a;
        let mut b = b;

        if let Some(child) = b.child(&self.tree) {
            b = BoundaryPoint::start_of(self.first_enterable_leaf(child));
        }
        if self.tree.is_tagged(b.node)
            && !self.tree.is_br(b.node)
            && b.offset >= self.tree.node_len(b.node)
            && let Some(next) = b.next(&self.tree, false)
        {
            b = next;
        }

        let Some(common) = self.tree.common_ancestor(a.node, b.node) else {
            return a;
        };
        let split_root = |editor: &Self, node: NodeId| {
            editor
                .tree
                .ancestor(node, |n| {
                    n == common
                        || editor
                            .tree
                            .parent(n)
                            .is_some_and(|parent| editor.is_unbreakable(parent))
                })
                .unwrap_or(node)
        };

        let end_root = split_root(self, b.node);
        let Some(next) = self.split_tree(end_root, b, SplitOptions::NEXT_TEXT) else {
            return a;
        };
        let start_root = split_root(self, a.node);
        self.split_tree(start_root, a, SplitOptions::NEXT_TEXT);
        a.offset = self.tree.node_len(a.node);

        let mut doomed: Vec<NodeId> = Vec::new();
        a.next_until(&self.tree, |point| {
            if point.node == next {
                return true;
            }
            if self.tree.is_text(point.node) && point.offset > 0 {
                return false;
            }
            let target = point.child(&self.tree).unwrap_or(point.node);
            if target == a.node
                || self.tree.contains(target, a.node)
                || target == next
                || self.tree.contains(target, next)
                || (!self.tree.is_text(target) && self.is_unbreakable(target))
            {
                return false;
            }
            if !doomed.contains(&target)
                && self
                    .tree
                    .ancestor(target, |n| doomed.contains(&n))
                    .is_none()
            {
                doomed.push(target);
            }
            false
        });

        for node in &doomed {
            self.tree.detach(*node);
        }
        debug!(removed = doomed.len(), "deleted between points");

        let to_merge = !doomed.is_empty() && self.tree.parent(a.node) != self.tree.parent(next);
        let mut point = BoundaryPoint::start_of(self.first_enterable_leaf(next));
        if doomed.len() > 1 || (doomed.len() == 1 && !self.tree.is_text(doomed[0])) {
            point = self.remove_empty_inline_nodes(point);
        }

        let list = self.tree.ancestor(next, |n| is_list(&self.tree, n));
        if let Some(list) = list
            && inner_is_empty(&self.tree, next)
            && self.tree.prev_sibling(next) != Some(a.node)
        {
            let mut doomed_node = next;
            while doomed_node != list {
                let Some(parent) = self.tree.parent(doomed_node) else {
                    break;
                };
                if self.is_unbreakable(parent) || !is_blank_node(&self.tree, parent) {
                    break;
                }
                doomed_node = parent;
            }
            self.tree.detach(doomed_node);
        }

        if !self.tree.is_attached(a.node) {
            a = point;
        }
        if to_merge {
            a = self.delete_edge(a.node, Direction::Next, false).unwrap_or(a);
        }
        if !a.is_valid(&self.tree) && point.is_valid(&self.tree) {
            a = point;
        }
        a
    }

    /// Deletes the selected content and pads what is left. A collapsed range deletes nothing.
    pub fn delete_selection(&mut self, range: Range) -> Option<BoundaryPoint> {
        if range.is_collapsed() || !range.is_valid(&self.tree) {
            return None;
        }
        let point = self.delete_between(range.start, range.end);
        Some(self.fill_empty_node(point))
    }

    /// Makes sure the caret's container still has something to hold a caret: an empty block gets
    /// a `<br/>`, an empty inline node gets two zero-width placeholders with the caret between.
    pub fn fill_empty_node(&mut self, point: BoundaryPoint) -> BoundaryPoint {
        let mut point = point;
        if !point.is_valid(&self.tree) {
            return point;
        }
        if self.tree.is_text(point.node)
            && let Some(parent) = self.tree.parent(point.node)
            && inner_is_spaces(&self.tree, parent)
        {
            point = BoundaryPoint::start_of(parent);
        }
        if self.tree.is_element(point.node) && inner_is_spaces(&self.tree, point.node) {
            self.tree.clear_children(point.node);
            let text = self.tree.create_text("");
            self.tree.append_child(point.node, text);
            point = BoundaryPoint::start_of(text);
        }
        let Some(parent) = self.tree.parent(point.node) else {
            return point;
        };
        if !self.tree.is_root(point.node) && inner_is_empty(&self.tree, parent) {
            if self.is_block(parent) {
                self.tree.clear_children(parent);
                let br = self.tree.create_void("br");
                self.tree.append_child(parent, br);
                point = BoundaryPoint::start_of(br);
            } else if self.tree.is_text(point.node) {
                let placeholder: String = [ZERO_WIDTH, ZERO_WIDTH].iter().collect();
                self.tree.set_text(point.node, placeholder);
                point.offset = 1;
            }
        }
        point
    }

    /// Removes inline wrappers left empty around the point and returns a point next to where they
    /// were.
    pub fn remove_empty_inline_nodes(&mut self, point: BoundaryPoint) -> BoundaryPoint {
        let mut point = point;
        let mut node = point.node;
        if self.tree.is_text(node) && self.tree.text(node).is_empty() {
            let Some(parent) = self.tree.parent(node) else {
                return point;
            };
            node = parent;
        }
        let mut prev = None;
        let mut next = None;
        loop {
            let Some(parent) = self.tree.parent(node) else {
                break;
            };
            let removable = !self.tree.is_br(node)
                && !self.tree.is_void(node)
                && inner_is_empty(&self.tree, node)
                && !self.is_block(node)
                && !self.tree.is_root(node)
                && self.is_editable(parent)
                && self.tree.attr(node, "contenteditable").is_none()
                && !self.is_void_block(node);
            if !removable {
                break;
            }
            prev = self.tree.prev_sibling(node);
            next = self.tree.next_sibling(node);
            point = BoundaryPoint::new(parent, self.tree.index_of(node));
            self.tree.detach(node);
            node = parent;
        }

        if let Some(next) = next
            && self.tree.is_text(next)
            && starts_with_space_before_char(self.tree.text(next))
        {
            let secured = replace_leading_spaces(self.tree.text(next), &NBSP.to_string());
            self.tree.set_text(next, secured);
        }
        if let Some(prev) = prev {
            if self.tree.is_text(prev) && ends_with_space_after_char(self.tree.text(prev)) {
                let tidied = replace_trailing_spaces(self.tree.text(prev), " ");
                self.tree.set_text(prev, tidied);
            }
            point = BoundaryPoint::end_of(&self.tree, prev);
        }
        point
    }
}
