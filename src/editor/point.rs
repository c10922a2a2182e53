use std::cmp::Ordering;

use crate::dom::{NodeId, Tree};

use super::inspect::{is_empty_node, is_left_edge_node, is_right_edge_node};
use super::placeholder::{ZERO_WIDTH, count_leading, count_trailing};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Prev,
    Next,
}

impl Direction {
    pub fn is_prev(self) -> bool {
        matches!(self, Direction::Prev)
    }

    pub fn reverse(self) -> Self {
        match self {
            Direction::Prev => Direction::Next,
            Direction::Next => Direction::Prev,
        }
    }
}

/// A caret position: a node plus a char offset (text) or child offset (element).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BoundaryPoint {
    pub node: NodeId,
    pub offset: usize,
}

impl BoundaryPoint {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }

    pub fn start_of(node: NodeId) -> Self {
        Self::new(node, 0)
    }

    pub fn end_of(tree: &Tree, node: NodeId) -> Self {
        Self::new(node, tree.node_len(node))
    }

    /// Attached to the tree and within the node's length.
    pub fn is_valid(&self, tree: &Tree) -> bool {
        tree.is_attached(self.node) && self.offset <= tree.node_len(self.node)
    }

    /// Child right after the point, if the point sits between children.
    pub fn child(&self, tree: &Tree) -> Option<NodeId> {
        if tree.is_text(self.node) {
            None
        } else {
            tree.child(self.node, self.offset)
        }
    }

    /// Moves into the child at the offset.
    pub fn enter(self, tree: &Tree) -> Self {
        match self.child(tree) {
            Some(child) => Self::new(child, 0),
            None => self,
        }
    }

    /// Moves into the child at the offset, then down its first children while `pred` holds.
    pub fn enter_until(self, tree: &Tree, pred: impl Fn(NodeId) -> bool) -> Self {
        match self.child(tree) {
            Some(child) => Self::new(tree.first_leaf_until(child, pred), 0),
            None => self,
        }
    }

    /// At the start of its node, leading zero-width placeholders ignored.
    pub fn is_left_edge(&self, tree: &Tree) -> bool {
        if self.offset == 0 {
            return true;
        }
        tree.is_text(self.node) && self.offset <= count_leading(tree.text(self.node), |c| c == ZERO_WIDTH)
    }

    /// At the end of its node, trailing zero-width placeholders ignored.
    pub fn is_right_edge(&self, tree: &Tree) -> bool {
        let len = tree.node_len(self.node);
        if self.offset >= len {
            return true;
        }
        tree.is_text(self.node)
            && self.offset >= len - count_trailing(tree.text(self.node), |c| c == ZERO_WIDTH)
    }

    pub fn is_edge(&self, tree: &Tree) -> bool {
        self.is_left_edge(tree) || self.is_right_edge(tree)
    }

    /// On the edge of the closest ancestor whose parent satisfies `pred`, with every node in
    /// between sitting on the same edge of its parent.
    pub fn is_edge_of(&self, tree: &Tree, pred: impl Fn(NodeId) -> bool, dir: Direction) -> bool {
        let chain = tree.ancestors_until(self.node, |n| tree.parent(n).is_some_and(&pred));
        let Some(top) = chain.last() else {
            return false;
        };
        if !tree.parent(*top).is_some_and(&pred) {
            return false;
        }
        let on_edge = match dir {
            Direction::Prev => self.is_left_edge(tree),
            Direction::Next => self.is_right_edge(tree),
        };
        on_edge
            && chain.iter().all(|node| match dir {
                Direction::Prev => is_left_edge_node(tree, *node),
                Direction::Next => is_right_edge_node(tree, *node),
            })
    }

    pub fn is_edge_of_tag(&self, tree: &Tree, tag: &str, dir: Direction) -> bool {
        self.is_edge_of(tree, |n| tree.has_tag(n, tag), dir)
    }

    /// Whether a caret placed here would be rendered between real content.
    pub fn is_visible(&self, tree: &Tree) -> bool {
        let node = self.node;
        if tree.is_text(node) || !tree.has_children(node) || is_empty_node(tree, node) {
            return true;
        }
        let left = self
            .offset
            .checked_sub(1)
            .and_then(|index| tree.child(node, index));
        let right = tree.child(node, self.offset);
        left.is_none_or(|n| tree.is_void(n)) && right.is_none_or(|n| tree.is_void(n))
    }

    /// Next position in document order. Returns `None` past the end of the editable root.
    /// With `skip_inner`, a leaf is crossed in a single step.
    pub fn next(self, tree: &Tree, skip_inner: bool) -> Option<Self> {
        let len = tree.node_len(self.node);
        if self.offset >= len {
            if tree.is_root(self.node) {
                return None;
            }
            let parent = tree.parent(self.node)?;
            let offset = tree.index_of(self.node) + 1;
            if tree.is_root(parent) && offset != tree.node_len(parent) {
                return Self::new(parent, offset).next(tree, skip_inner);
            }
            Some(Self::new(parent, offset))
        } else if let Some(child) = self.child(tree) {
            Some(Self::new(child, 0))
        } else {
            Some(Self::new(
                self.node,
                if skip_inner { len } else { self.offset + 1 },
            ))
        }
    }

    /// Previous position in document order. Returns `None` before the start of the editable root.
    pub fn prev(self, tree: &Tree, skip_inner: bool) -> Option<Self> {
        if self.offset == 0 {
            if tree.is_root(self.node) {
                return None;
            }
            let parent = tree.parent(self.node)?;
            let offset = tree.index_of(self.node);
            if tree.is_root(parent) && offset != 0 {
                return Self::new(parent, offset).prev(tree, skip_inner);
            }
            Some(Self::new(parent, offset))
        } else if tree.is_element(self.node) {
            let child = tree.child(self.node, self.offset - 1)?;
            Some(Self::end_of(tree, child))
        } else {
            Some(Self::new(
                self.node,
                if skip_inner { 0 } else { self.offset - 1 },
            ))
        }
    }

    /// First point, starting with this one, that satisfies `pred`. Traversal never yields a
    /// point on the editable root itself.
    pub fn next_until(self, tree: &Tree, pred: impl FnMut(Self) -> bool) -> Option<Self> {
        self.move_until(tree, Direction::Next, pred)
    }

    pub fn prev_until(self, tree: &Tree, pred: impl FnMut(Self) -> bool) -> Option<Self> {
        self.move_until(tree, Direction::Prev, pred)
    }

    fn move_until(
        self,
        tree: &Tree,
        dir: Direction,
        mut pred: impl FnMut(Self) -> bool,
    ) -> Option<Self> {
        let mut point = Some(self);
        while let Some(current) = point {
            if tree.is_root(current.node) || !tree.is_attached(current.node) {
                return None;
            }
            if pred(current) {
                return Some(current);
            }
            point = match dir {
                Direction::Next => current.next(tree, false),
                Direction::Prev => current.prev(tree, false),
            };
        }
        None
    }

    /// Document order. A point on an element sorts before the points inside the child at its
    /// offset.
    pub fn cmp_position(&self, tree: &Tree, other: &Self) -> Ordering {
        position_key(tree, *self).cmp(&position_key(tree, *other))
    }

    /// Visits every point from here to `end` inclusive. Nodes other than the first and last are
    /// crossed in one step.
    pub fn walk_to(self, tree: &Tree, end: Self, mut handler: impl FnMut(Self)) {
        let start = self;
        let mut point = Some(self);
        while let Some(current) = point {
            handler(current);
            if current == end {
                break;
            }
            let skip_inner = current.node != start.node && current.node != end.node;
            point = current.next(tree, skip_inner);
        }
    }
}

fn position_key(tree: &Tree, point: BoundaryPoint) -> Vec<usize> {
    let mut key = vec![point.offset];
    let mut node = point.node;
    while let Some(parent) = tree.parent(node) {
        key.push(tree.index_of(node));
        node = parent;
    }
    key.reverse();
    key
}

/// An ordered pair of boundary points. Collapsed when both are equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Range {
    pub start: BoundaryPoint,
    pub end: BoundaryPoint,
}

impl Range {
    pub fn new(start: BoundaryPoint, end: BoundaryPoint) -> Self {
        Self { start, end }
    }

    pub fn collapsed(point: BoundaryPoint) -> Self {
        Self::new(point, point)
    }

    /// Covers the whole node.
    pub fn select_node(tree: &Tree, node: NodeId) -> Self {
        Self::new(BoundaryPoint::start_of(node), BoundaryPoint::end_of(tree, node))
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    pub fn is_valid(&self, tree: &Tree) -> bool {
        self.start.is_valid(tree) && self.end.is_valid(tree)
    }

    pub fn collapse_to_start(self) -> Self {
        Self::collapsed(self.start)
    }

    pub fn collapse_to_end(self) -> Self {
        Self::collapsed(self.end)
    }

    /// Nodes touched between the two points that satisfy `pred`, in document order without
    /// duplicates. The end node is skipped when the range stops at its very start.
    pub fn selected_nodes(&self, tree: &Tree, pred: impl Fn(NodeId) -> bool) -> Vec<NodeId> {
        let start = self.start.enter(tree);
        let end = self.end.enter(tree);
        let mut nodes: Vec<NodeId> = Vec::new();
        start.walk_to(tree, end, |point| {
            if pred(point.node)
                && (point.node != end.node || end.offset > 0)
                && !nodes.contains(&point.node)
            {
                nodes.push(point.node);
            }
        });
        if self.is_collapsed() && !nodes.contains(&start.node) && pred(start.node) {
            nodes.push(start.node);
        }
        nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Tree, NodeId, NodeId, NodeId) {
        // <p>ab</p><p><b>cd</b></p>
        let mut tree = Tree::new();
        let root = tree.root();
        let p1 = tree.create_element("p");
        let ab = tree.create_text("ab");
        let p2 = tree.create_element("p");
        let b = tree.create_element("b");
        let cd = tree.create_text("cd");
        tree.append_child(root, p1);
        tree.append_child(p1, ab);
        tree.append_child(root, p2);
        tree.append_child(p2, b);
        tree.append_child(b, cd);
        (tree, ab, b, cd)
    }

    #[test]
    fn next_crosses_from_paragraph_to_paragraph() {
        let (tree, ab, b, cd) = sample();
        let p1 = tree.parent(ab).unwrap();
        let p2 = tree.parent(b).unwrap();
        let mut point = BoundaryPoint::new(ab, 1);
        let mut visited = Vec::new();
        while let Some(next) = point.next(&tree, false) {
            visited.push(next);
            point = next;
            if visited.len() > 20 {
                break;
            }
        }
        assert_eq!(
            visited,
            vec![
                BoundaryPoint::new(ab, 2),
                BoundaryPoint::new(p1, 1),
                BoundaryPoint::new(p2, 0),
                BoundaryPoint::new(b, 0),
                BoundaryPoint::new(cd, 0),
                BoundaryPoint::new(cd, 1),
                BoundaryPoint::new(cd, 2),
                BoundaryPoint::new(b, 1),
                BoundaryPoint::new(p2, 1),
                BoundaryPoint::new(tree.root(), 2),
            ]
        );
    }

    #[test]
    fn prev_until_finds_previous_text() {
        let (tree, ab, _, cd) = sample();
        let found = BoundaryPoint::new(cd, 0)
            .prev(&tree, false)
            .and_then(|p| p.prev_until(&tree, |pt| tree.is_text(pt.node)));
        assert_eq!(found, Some(BoundaryPoint::new(ab, 2)));
    }

    #[test]
    fn move_until_returns_none_when_exhausted() {
        let (tree, ab, _, _) = sample();
        let found = BoundaryPoint::new(ab, 0).next_until(&tree, |pt| tree.is_br(pt.node));
        assert_eq!(found, None);
    }

    #[test]
    fn edges_ignore_placeholders() {
        let mut tree = Tree::new();
        let t = tree.create_text("\u{FEFF}ab\u{FEFF}");
        assert!(BoundaryPoint::new(t, 1).is_left_edge(&tree));
        assert!(!BoundaryPoint::new(t, 2).is_left_edge(&tree));
        assert!(BoundaryPoint::new(t, 3).is_right_edge(&tree));
    }

    #[test]
    fn edge_of_block_requires_every_ancestor_on_edge() {
        let (tree, ab, b, cd) = sample();
        let is_p = |n: NodeId| tree.has_tag(n, "p");
        assert!(BoundaryPoint::new(cd, 0).is_edge_of(&tree, is_p, Direction::Prev));
        assert!(!BoundaryPoint::new(cd, 1).is_edge_of(&tree, is_p, Direction::Prev));
        assert!(BoundaryPoint::new(ab, 2).is_edge_of(&tree, is_p, Direction::Next));
        assert!(BoundaryPoint::new(b, 1).is_right_edge(&tree));
    }

    #[test]
    fn edge_of_missing_ancestor_is_not_an_edge() {
        let (tree, ab, _, _) = sample();
        assert!(!BoundaryPoint::new(ab, 0).is_edge_of_tag(&tree, "td", Direction::Prev));
        assert!(BoundaryPoint::new(ab, 0).is_edge_of_tag(&tree, "p", Direction::Prev));
    }

    #[test]
    fn positions_compare_in_document_order() {
        let (tree, ab, b, cd) = sample();
        let p1 = tree.parent(ab).unwrap();
        assert_eq!(
            BoundaryPoint::new(ab, 2).cmp_position(&tree, &BoundaryPoint::new(cd, 0)),
            Ordering::Less
        );
        assert_eq!(
            BoundaryPoint::new(p1, 1).cmp_position(&tree, &BoundaryPoint::new(ab, 2)),
            Ordering::Greater
        );
        assert_eq!(
            BoundaryPoint::new(b, 0).cmp_position(&tree, &BoundaryPoint::new(cd, 0)),
            Ordering::Less
        );
    }

    #[test]
    fn selected_nodes_skip_untouched_end() {
        let (tree, ab, _, cd) = sample();
        let range = Range::new(BoundaryPoint::new(ab, 1), BoundaryPoint::new(cd, 0));
        assert_eq!(range.selected_nodes(&tree, |n| tree.is_text(n)), vec![ab]);
        let range = Range::new(BoundaryPoint::new(ab, 1), BoundaryPoint::new(cd, 1));
        assert_eq!(range.selected_nodes(&tree, |n| tree.is_text(n)), vec![ab, cd]);
    }
}
