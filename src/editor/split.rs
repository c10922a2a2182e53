use tracing::trace;

use crate::dom::NodeId;

use super::inspect::is_blank_node;
use super::placeholder::{NBSP, ZERO_WIDTH, replace_leading_spaces, starts_with_space_before_char};
use super::{BoundaryPoint, DocumentEditor, Range};

/// Tuning for [`DocumentEditor::split_tree`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SplitOptions {
    /// Split the text node at the point first, whatever else happens.
    pub next_text: bool,
    /// Leave a side that ends up empty without a `<br/>`.
    pub skip_padding_blank_node: bool,
    /// A point on a node edge returns the existing neighbour instead of creating an empty clone.
    pub not_split_edge_point: bool,
}

impl SplitOptions {
    pub const NEXT_TEXT: Self = Self {
        next_text: true,
        skip_padding_blank_node: false,
        not_split_edge_point: false,
    };

    pub const SKIP_PADDING: Self = Self {
        next_text: false,
        skip_padding_blank_node: true,
        not_split_edge_point: false,
    };

    pub const SKIP_PADDING_NO_EDGE: Self = Self {
        next_text: false,
        skip_padding_blank_node: true,
        not_split_edge_point: true,
    };
}

impl DocumentEditor {
    /// Splits every node from `point.node` up to `root` (inclusive) and returns the node right of
    /// the split. Unbreakable ancestors are never cloned: the split stops below them.
    /// Returns `None` when the point is stale or outside `root`.
    pub fn split_tree(
        &mut self,
        root: NodeId,
        point: BoundaryPoint,
        options: SplitOptions,
    ) -> Option<NodeId> {
        if !point.is_valid(&self.tree)
            || (root != point.node && !self.tree.contains(root, point.node))
        {
            return None;
        }
        let mut point = point;
        let next_text = if options.next_text && self.tree.is_text(point.node) {
            Some(self.tree.split_text(point.node, point.offset))
        } else {
            None
        };

        let empty_text = self.tree.is_text(point.node) && self.tree.text(point.node).is_empty();
        if empty_text {
            self.tree.set_text(point.node, ZERO_WIDTH.to_string());
            point.offset = 1;
        }

        let chain: Vec<NodeId> = self
            .tree
            .ancestors_until(point.node, |n| n == root)
            .into_iter()
            .take_while(|n| self.tree.is_text(*n) || !self.is_unbreakable(*n))
            .collect();

        let mut carried: Option<NodeId> = None;
        for (level, node) in chain.iter().enumerate() {
            let at = if level == 0 {
                point
            } else {
                let offset = match carried {
                    Some(right) => self.tree.index_of(right),
                    None => self.tree.node_len(*node),
                };
                BoundaryPoint::new(*node, offset)
            };
            carried = self.split_node(at, options);
        }

        if empty_text {
            self.tree.set_text(point.node, "");
        }

        let result = next_text.or(carried).unwrap_or(point.node);
        let seam_text = if next_text.is_some() {
            Some(result)
        } else if self.tree.is_element(result) {
            self.tree
                .first_child(result)
                .filter(|child| self.tree.is_text(*child))
        } else {
            None
        };
        if let Some(text_node) = seam_text
            && starts_with_space_before_char(self.tree.text(text_node))
        {
            let secured = replace_leading_spaces(self.tree.text(text_node), &NBSP.to_string());
            self.tree.set_text(text_node, secured);
        }

        trace!(levels = chain.len(), %result, "split tree");
        Some(result)
    }

    fn split_node(&mut self, point: BoundaryPoint, options: SplitOptions) -> Option<NodeId> {
        if self.tree.is_text(point.node) {
            self.split_text_node(point)
        } else {
            self.split_element(point, options)
        }
    }

    /// Splits a text node unless the point is on an edge, in which case the existing node on the
    /// right is returned.
    pub(crate) fn split_text_node(&mut self, point: BoundaryPoint) -> Option<NodeId> {
        if !self.tree.is_text(point.node) {
            return None;
        }
        let len = self.tree.node_len(point.node);
        if point.offset == 0 {
            return Some(point.node);
        }
        if point.offset >= len {
            return self.tree.next_sibling(point.node);
        }
        if point.is_left_edge(&self.tree) {
            return Some(point.node);
        }
        if point.is_right_edge(&self.tree) {
            return self.tree.next_sibling(point.node);
        }
        Some(self.tree.split_text(point.node, point.offset))
    }

    fn split_element(&mut self, point: BoundaryPoint, options: SplitOptions) -> Option<NodeId> {
        let node = point.node;
        if self.tree.is_void(node) {
            return if point.offset == 0 {
                Some(node)
            } else {
                self.tree.next_sibling(node)
            };
        }
        if options.not_split_edge_point {
            if point.offset == 0 {
                return Some(node);
            }
            if point.offset >= self.tree.node_len(node) {
                return self.tree.next_sibling(node);
            }
        }
        let clone = self.tree.clone_shallow(node);
        self.tree.insert_after(node, clone);
        self.tree.move_children(node, point.offset, clone);
        if !options.skip_padding_blank_node {
            self.pad_blank_node(node);
            self.pad_blank_node(clone);
        }
        Some(clone)
    }

    fn pad_blank_node(&mut self, node: NodeId) {
        if !self.tree.is_void(node) && self.tree.node_len(node) == 0 {
            let br = self.tree.create_void("br");
            self.tree.append_child(node, br);
        }
    }

    /// Isolates `node` so that its parent wraps nothing else. Empty leftovers are dropped.
    pub fn split_at_node_ends(&mut self, node: NodeId) {
        let Some(parent) = self.tree.parent(node) else {
            return;
        };
        let start = BoundaryPoint::new(parent, self.tree.index_of(node));
        self.split_tree(parent, start, SplitOptions::SKIP_PADDING);

        let Some(parent) = self.tree.parent(node) else {
            return;
        };
        let end = BoundaryPoint::new(parent, self.tree.index_of(node) + 1);
        self.split_tree(parent, end, SplitOptions::SKIP_PADDING);

        if let Some(parent) = self.tree.parent(node) {
            self.remove_blank_siblings(node);
            self.remove_blank_siblings(parent);
        }
    }

    /// Removes blank elements (and empty text) right before and after `node`.
    pub fn remove_blank_siblings(&mut self, node: NodeId) {
        let removable = |editor: &Self, sibling: NodeId| {
            is_blank_node(&editor.tree, sibling)
                && (editor.tree.is_element(sibling) || editor.tree.text(sibling).is_empty())
        };
        if let Some(prev) = self.tree.prev_sibling(node)
            && removable(self, prev)
        {
            self.tree.detach(prev);
        }
        if let Some(next) = self.tree.next_sibling(node)
            && removable(self, next)
        {
            self.tree.detach(next);
        }
    }

    /// Splits the text nodes holding the range ends so the range covers whole nodes.
    pub fn split_text_at_selection(&mut self, range: Range) -> Range {
        let Range { start, end } = range;
        let same = start.node == end.node;
        let (mut sc, mut so) = (start.node, start.offset);
        let (mut ec, mut eo) = (end.node, end.offset);

        if self.tree.is_text(ec)
            && let Some(after) = self.split_text_node(end)
            && let Some(before) = self.tree.prev_sibling(after)
        {
            ec = before;
            eo = self.tree.node_len(ec);
        }

        if self.tree.is_text(sc)
            && let Some(after) = self.split_text_node(BoundaryPoint::new(sc, so))
        {
            if after != sc && same {
                ec = after;
                eo = eo.saturating_sub(so);
            }
            sc = after;
            so = 0;
        }

        Range::new(BoundaryPoint::new(sc, so), BoundaryPoint::new(ec, eo))
    }
}
