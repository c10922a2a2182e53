use std::collections::BTreeSet;

use tracing::{debug, trace};

use crate::dom::{NodeId, Tree, parse_style};

use super::inspect::{
    count_line_breaks, inner_only_br, is_blank_node, is_in_pre, is_invisible_text, is_list, is_list_item,
};
use super::placeholder::{
    NBSP, has_visible_char, is_only_spaces, remove_extreme_breakable_space,
    secure_extreme_single_space,
};
use super::{BoundaryPoint, Direction, DocumentEditor};

/// Classes that never make two nodes different.
const IGNORED_CLASSES: &[&str] = &["o_default_snippet_text", "o_checked"];

/// Same tag and the same normalized attributes: classes and style declarations compare as sets,
/// blank values are ignored. Two text nodes are always similar.
pub fn compare_nodes(tree: &Tree, a: NodeId, b: NodeId) -> bool {
    if tree.is_text(a) && tree.is_text(b) {
        return true;
    }
    if tree.tag(a).is_none() || tree.tag(a) != tree.tag(b) {
        return false;
    }
    normalized_attrs(tree, a) == normalized_attrs(tree, b)
}

fn normalized_attrs(tree: &Tree, node: NodeId) -> BTreeSet<(String, String)> {
    let Some(attrs) = tree.attrs(node) else {
        return BTreeSet::new();
    };
    attrs
        .iter()
        .filter(|(_, value)| !value.trim().is_empty())
        .filter_map(|(name, value)| {
            let value = match name {
                "class" => {
                    let mut classes: Vec<&str> = value
                        .split_whitespace()
                        .filter(|class| !IGNORED_CLASSES.contains(class))
                        .collect();
                    classes.sort_unstable();
                    classes.join(" ")
                }
                "style" => {
                    let mut props: Vec<String> = parse_style(value)
                        .into_iter()
                        .map(|(prop, val)| format!("{prop}:{val}"))
                        .collect();
                    props.sort();
                    props.join(";")
                }
                _ => value.to_string(),
            };
            (!value.is_empty()).then(|| (name.to_string(), value))
        })
        .collect()
}

impl DocumentEditor {
    /// Merges `node` (or its outermost ancestor with a sibling in `dir`) with that sibling and
    /// returns the point at the seam. With `do_not_try_non_similar`, dissimilar blocks are left
    /// alone instead of being merged through [`Self::delete_non_similar_edge`].
    pub fn delete_edge(
        &mut self,
        node: NodeId,
        dir: Direction,
        do_not_try_non_similar: bool,
    ) -> Option<BoundaryPoint> {
        if !self.tree.is_attached(node) {
            return None;
        }
        let start = node;
        let mut node = node;
        let mut result: Option<BoundaryPoint> = None;

        if self.tree.is_br(node)
            && let Some(after) = self.tree.next_sibling(node)
            && !is_invisible_text(&self.tree, after)
        {
            node = self.first_enterable_leaf(after);
        }

        let mut chain = Vec::new();
        let mut neighbour = None;
        while !self.tree.is_root(node) && !self.is_unbreakable(node) {
            chain.push(node);
            neighbour = self.visible_sibling(node, dir);
            if neighbour.is_some() {
                break;
            }
            let Some(parent) = self.tree.parent(node) else {
                break;
            };
            node = parent;
        }

        if let Some(table) = neighbour
            && self.tree.has_tag(table, "table")
        {
            return Some(BoundaryPoint::start_of(node));
        }
        if let Some(void) = neighbour
            && self.is_void_block(void)
        {
            return self.remove_void_neighbour(void, node, dir, do_not_try_non_similar);
        }

        let mut merge_after_br = !chain.iter().any(|n| self.is_block(*n));
        let mut br_removed = false;
        let mut spaces_to_remove: Vec<NodeId> = Vec::new();

        while let Some(node) = chain.pop() {
            let mut next = self.sibling(node, dir);
            while let Some(candidate) = next {
                if self.tree.is_tagged(candidate) || has_visible_char(self.tree.text(candidate)) {
                    break;
                }
                spaces_to_remove.push(candidate);
                next = self.sibling(candidate, dir);
            }
            let Some(mut next_node) = next else {
                continue;
            };
            if !(self.tree.is_tagged(node) || self.tree.is_br(next_node))
                || !self.tree.is_tagged(next_node)
            {
                continue;
            }

            if !br_removed && self.tree.is_br(next_node) {
                let beyond = self.sibling(next_node, dir);
                if beyond.is_none_or(|beyond| compare_nodes(&self.tree, node, beyond)) {
                    self.tree.detach(next_node);
                    result = Some(match beyond {
                        Some(beyond) if dir.is_prev() => BoundaryPoint::end_of(&self.tree, beyond),
                        Some(beyond) => BoundaryPoint::start_of(beyond),
                        None => BoundaryPoint::start_of(node),
                    });
                    trace!(%node, "removed line break at edge");
                    let Some(beyond) = beyond else {
                        continue;
                    };
                    if !merge_after_br {
                        continue;
                    }
                    br_removed = true;
                    merge_after_br = false;
                    next_node = beyond;
                }
            }

            if !compare_nodes(&self.tree, node, next_node) {
                continue;
            }
            for space in spaces_to_remove.drain(..) {
                self.tree.detach(space);
            }
            let Some(next_node) = self.sibling(node, dir) else {
                continue;
            };

            if self.tree.is_tagged(next_node) {
                result = Some(self.merge_similar(node, next_node, dir));
                continue;
            }
            if !has_visible_char(self.tree.text(next_node)) {
                result = Some(match dir {
                    Direction::Prev => BoundaryPoint::start_of(node),
                    Direction::Next => BoundaryPoint::end_of(&self.tree, node),
                });
                self.tree.detach(next_node);
                continue;
            }
            break;
        }

        if result.is_none() && !do_not_try_non_similar {
            result = self.delete_non_similar_edge(start, dir);
        }

        if let Some(point) = result
            && self.tree.is_text(point.node)
        {
            let text = self.tree.text(point.node);
            if text.starts_with(NBSP) || text.ends_with(NBSP) {
                let mut chars: Vec<char> = text.chars().collect();
                if chars.first() == Some(&NBSP) {
                    chars[0] = ' ';
                }
                if let Some(last) = chars.last_mut()
                    && *last == NBSP
                {
                    *last = ' ';
                }
                self.tree.set_text(point.node, chars.into_iter().collect::<String>());
            }
        }
        if result.is_some() {
            debug!(%start, ?dir, "deleted edge");
        }
        result
    }

    pub(crate) fn sibling(&self, node: NodeId, dir: Direction) -> Option<NodeId> {
        match dir {
            Direction::Prev => self.tree.prev_sibling(node),
            Direction::Next => self.tree.next_sibling(node),
        }
    }

    /// Sibling in `dir`, skipping text without a visible char.
    fn visible_sibling(&self, node: NodeId, dir: Direction) -> Option<NodeId> {
        let mut next = self.sibling(node, dir);
        while let Some(candidate) = next {
            if self.tree.is_tagged(candidate) || has_visible_char(self.tree.text(candidate)) {
                return Some(candidate);
            }
            next = self.sibling(candidate, dir);
        }
        None
    }

    /// A void block is never merged into: it goes away as a whole and the caret stays on the
    /// `node` side. When only merging is allowed, it is left alone.
    fn remove_void_neighbour(
        &mut self,
        void: NodeId,
        node: NodeId,
        dir: Direction,
        merge_only: bool,
    ) -> Option<BoundaryPoint> {
        if merge_only {
            return None;
        }
        self.tree.detach(void);
        trace!(%void, "removed void block at edge");
        Some(match dir {
            Direction::Prev => BoundaryPoint::start_of(self.first_enterable_leaf(node)),
            Direction::Next => BoundaryPoint::end_of(&self.tree, self.tree.last_leaf(node)),
        })
    }

    fn merge_similar(&mut self, node: NodeId, next: NodeId, dir: Direction) -> BoundaryPoint {
        match dir {
            Direction::Prev => {
                let first = self.first_enterable_leaf(node);
                if self.tree.is_text(first) && !is_in_pre(&self.tree, first) {
                    self.remove_extreme_breakable_space(first);
                    let last = self.tree.last_leaf(next);
                    if self.tree.is_text(last) && !is_in_pre(&self.tree, last) {
                        self.remove_extreme_breakable_space(last);
                    }
                }
                let deep = self.tree.last_leaf(next);
                let point = BoundaryPoint::end_of(&self.tree, deep);
                let first_element = self.tree.first_element_child(node);
                if has_visible_char(&self.tree.text_content(node))
                    || self.tree.element_child_count(node) > 1
                    || first_element.is_some_and(|child| !self.tree.is_br(child))
                {
                    self.tree.move_children(node, 0, next);
                    trace!(into = %next, "merged similar nodes");
                }
                self.tree.detach(node);
                point
            }
            Direction::Next => {
                let first = self.first_enterable_leaf(next);
                if self.tree.is_text(first) && !is_in_pre(&self.tree, first) {
                    self.remove_extreme_breakable_space(first);
                    let last = self.tree.last_leaf(node);
                    if self.tree.is_text(last) && !is_in_pre(&self.tree, last) {
                        self.remove_extreme_breakable_space(last);
                    }
                }
                if inner_only_br(&self.tree, node) {
                    self.tree.clear_children(node);
                }
                let deep = self.tree.last_leaf(node);
                let point = BoundaryPoint::end_of(&self.tree, deep);
                self.tree.move_children(next, 0, node);
                self.tree.detach(next);
                point
            }
        }
    }

    /// Merges the block holding `node` with the closest dissimilar block in `dir`. Returns `None`
    /// when `node` still has a real sibling in that direction or no mergeable block exists.
    pub fn delete_non_similar_edge(&mut self, node: NodeId, dir: Direction) -> Option<BoundaryPoint> {
        let mut next = self.sibling(node, dir);
        while let Some(candidate) = next {
            if !(self.tree.is_text(candidate) && is_only_spaces(self.tree.text(candidate))) {
                break;
            }
            next = self.sibling(candidate, dir);
        }
        if next.is_some() {
            return None;
        }

        let block = self.first_block_ancestor(node)?;
        if self.is_unbreakable(block) || self.in_void_block(block) {
            return None;
        }
        let other = self.find_next_block_to_merge(block, dir)?;
        let (from, into) = match dir {
            Direction::Next => (other, block),
            Direction::Prev => (block, other),
        };

        if is_only_spaces(&self.tree.text_content(into)) && count_line_breaks(&self.tree, into) <= 1 {
            self.tree.detach(into);
            debug!(%into, "dropped blank block at edge");
            return Some(BoundaryPoint::start_of(self.first_enterable_leaf(from)));
        }
        self.merge_non_similar_blocks(from, into)
    }

    fn is_mergeable_block(&self, node: NodeId) -> bool {
        self.is_format_node(node) || is_list_item(&self.tree, node)
    }

    fn in_void_block(&self, node: NodeId) -> bool {
        self.tree.ancestor(node, |n| self.is_void_block(n)).is_some()
    }

    /// Style blocks and list items, except list items that hold style blocks themselves. Nothing
    /// inside a void block qualifies.
    fn mergeable_blocks(&self, node: NodeId) -> Vec<NodeId> {
        let mut candidates = vec![node];
        candidates.extend(self.tree.descendants(node));
        candidates
            .into_iter()
            .filter(|n| self.tree.is_element(*n) && self.is_mergeable_block(*n))
            .filter(|n| !self.in_void_block(*n))
            .filter(|n| {
                !is_list_item(&self.tree, *n)
                    || !self
                        .tree
                        .descendants(*n)
                        .into_iter()
                        .any(|d| self.tree.is_element(d) && self.is_mergeable_block(d))
            })
            .collect()
    }

    fn enclosing_list_item(&self, node: NodeId) -> Option<NodeId> {
        self.tree
            .ancestor(node, |n| {
                n != node && (self.is_block(n) || is_list_item(&self.tree, n))
            })
            .filter(|n| is_list_item(&self.tree, *n))
    }

    fn find_next_block_to_merge(&self, start: NodeId, dir: Direction) -> Option<NodeId> {
        let mut node = start;
        if dir == Direction::Next
            && let Some(li) = self.enclosing_list_item(node)
        {
            node = if self.tree.next_element_sibling(li).is_some() {
                li
            } else {
                self.tree.ancestor(node, |n| {
                    is_list(&self.tree, n) && self.tree.next_element_sibling(n).is_some()
                })?
            };
        }

        let mut node = match dir {
            Direction::Next => self.tree.next_element_sibling(node)?,
            Direction::Prev => self.tree.prev_element_sibling(node)?,
        };
        if self.is_unbreakable(node) && self.is_unbreakable(start) {
            return None;
        }

        node = self.first_block_ancestor(node).unwrap_or(node);
        node = self.enclosing_list_item(node).unwrap_or(node);
        if is_list(&self.tree, node) {
            node = match dir {
                Direction::Next => self.tree.first_element_child(node)?,
                Direction::Prev => self.tree.last_element_child(node)?,
            };
        }
        if self.is_unbreakable(node)
            || node == start
            || self.tree.contains(node, start)
            || self.tree.contains(start, node)
        {
            return None;
        }

        let mergeable = self.mergeable_blocks(node);
        match dir {
            Direction::Next => mergeable.first().copied(),
            Direction::Prev => mergeable.last().copied(),
        }
    }

    /// Moves the content of the style blocks in `from` to the end of `into`, drops what is left of
    /// `from` and merges the seam.
    pub fn merge_non_similar_blocks(&mut self, from: NodeId, into: NodeId) -> Option<BoundaryPoint> {
        let contents: Vec<NodeId> = self
            .mergeable_blocks(from)
            .into_iter()
            .flat_map(|block| self.tree.children(block).to_vec())
            .collect();
        if contents.is_empty()
            || contents
                .iter()
                .any(|n| self.tree.is_element(*n) && self.is_unbreakable(*n))
        {
            return None;
        }

        if self.tree.is_text(contents[0]) {
            self.remove_extreme_breakable_space(contents[0]);
        }
        let mut last = self.tree.last_child(into);
        let lone_br = contents.len() == 1 && self.tree.is_br(contents[0]);
        if !lone_br {
            if inner_only_br(&self.tree, into) {
                self.tree.clear_children(into);
                last = None;
            }
            for child in &contents {
                self.tree.append_child(into, *child);
            }
        }

        let mut doomed = from;
        while let Some(parent) = self.tree.parent(doomed) {
            if self.tree.is_root(parent) || !is_blank_node(&self.tree, parent) {
                break;
            }
            doomed = parent;
        }
        self.tree.detach(doomed);
        debug!(%from, %into, moved = contents.len(), "merged dissimilar blocks");

        let point = match last {
            Some(last) if self.tree.is_attached(last) => BoundaryPoint::end_of(&self.tree, last),
            _ => BoundaryPoint::start_of(contents[0]),
        };
        if !point.is_valid(&self.tree) {
            return None;
        }
        self.delete_edge(point.node, Direction::Next, true)
            .or(Some(point))
    }

    /// Strips the breakable spaces at both ends of a text node, securing single spaces first.
    /// Returns how many chars went away at the start and at the end.
    pub fn remove_extreme_breakable_space(&mut self, node: NodeId) -> (usize, usize) {
        if !self.tree.is_text(node) {
            return (0, 0);
        }
        let (text, start, end) = remove_extreme_breakable_space(self.tree.text(node));
        self.tree.set_text(node, text);
        (start, end)
    }

    /// Turns a lone space at either end of a text node into NBSP.
    pub fn secure_extreme_single_space(&mut self, node: NodeId) {
        if self.tree.is_text(node) {
            let secured = secure_extreme_single_space(self.tree.text(node));
            self.tree.set_text(node, secured);
        }
    }
}
