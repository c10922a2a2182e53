use std::cmp::Ordering;

use tracing::{debug, trace};

use crate::dom::NodeId;

use super::indent::indent_of;
use super::inspect::{
    count_line_breaks, has_only_br, inner_only_br, is_blank_node, is_cell, is_empty_node,
    is_in_pre, is_list_item, is_visible_text, only_contains,
};
use super::placeholder::{
    NBSP, TAB, ZERO_WIDTH, char_at, char_len, count_leading, count_trailing, has_visible_char,
    is_placeholder_text, is_space, remove_char, replace_leading_spaces, slice_chars,
};
use super::{BoundaryPoint, Direction, DocumentEditor, FontStyle, ListKind, Range, SplitOptions};

/// Discrete input handled by [`DocumentEditor::handle_key`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyEvent {
    Char(char),
    Enter,
    ShiftEnter,
    /// Inserts a horizontal rule.
    CtrlEnter,
    Backspace,
    Delete,
    Tab,
    ShiftTab,
    SelectAll,
    Left { extend: bool },
    Right { extend: bool },
    Up { extend: bool },
    Down { extend: bool },
    Home { extend: bool },
    End { extend: bool },
}

impl KeyEvent {
    pub fn is_movement(self) -> bool {
        matches!(
            self,
            KeyEvent::Left { .. }
                | KeyEvent::Right { .. }
                | KeyEvent::Up { .. }
                | KeyEvent::Down { .. }
                | KeyEvent::Home { .. }
                | KeyEvent::End { .. }
                | KeyEvent::SelectAll
        )
    }
}

/// Where a deletion lands when the caret is not on an edge.
struct DeleteTarget {
    point: BoundaryPoint,
    has_block: bool,
    block_to_remove: Option<NodeId>,
}

impl DocumentEditor {
    /// Applies one key to the current range. Returns whether the key was handled; a key that is
    /// not handled (a Tab inside a table cell) is left to the host.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if !self.range.is_valid(&self.tree) {
            debug!(?key, "ignoring key with a range outside the editable root");
            self.repair_range();
            return false;
        }
        if !key.is_movement() {
            self.selection_anchor = None;
        }
        let handled = match key {
            KeyEvent::Char(ch) => self.insert_char(ch),
            KeyEvent::Enter => self.insert_paragraph_break(),
            KeyEvent::ShiftEnter => self.insert_line_break(),
            KeyEvent::CtrlEnter => self.insert_rule(),
            KeyEvent::Backspace => self.backspace(),
            KeyEvent::Delete => self.delete(),
            KeyEvent::Tab => self.tab(false),
            KeyEvent::ShiftTab => self.tab(true),
            KeyEvent::SelectAll => self.select_all(),
            KeyEvent::Left { extend } => self.move_caret(Direction::Prev, extend),
            KeyEvent::Right { extend } => self.move_caret(Direction::Next, extend),
            KeyEvent::Up { extend } => self.move_caret_vertically(Direction::Prev, extend),
            KeyEvent::Down { extend } => self.move_caret_vertically(Direction::Next, extend),
            KeyEvent::Home { extend } => self.move_caret_to_block_edge(Direction::Prev, extend),
            KeyEvent::End { extend } => self.move_caret_to_block_edge(Direction::Next, extend),
        };
        if handled && !key.is_movement() {
            let root = self.tree.root();
            let (mut start, mut end) = (self.range.start, self.range.end);
            self.normalize_text_nodes(root, &mut [&mut start, &mut end]);
            self.range = Range::new(start, end);
        }
        self.repair_range();
        trace!(?key, handled, range = ?self.range, "handled key");
        handled
    }

    /// Types a visible character over the current range.
    pub fn insert_char(&mut self, ch: char) -> bool {
        let mut buf = [0u8; 4];
        let Some(range) = self.insert_text_inline(ch.encode_utf8(&mut buf), self.range) else {
            return false;
        };
        self.range = range;
        true
    }

    // ------------------------------------------------------------------
    // Backspace and Delete
    // ------------------------------------------------------------------

    pub fn backspace(&mut self) -> bool {
        let range = self.range;
        let mut need_outdent = false;
        if range.is_collapsed() {
            let point = range.start.enter(&self.tree);
            if point.is_edge_of_tag(&self.tree, "td", Direction::Prev) {
                return true;
            }
            let point = range.start;
            if self.is_left_edge_of_block(point) {
                let indented = self
                    .tree
                    .ancestor(point.node, |n| {
                        self.tree.is_element(n) && !self.tree.is_root(n) && indent_of(&self.tree, n) > 0.0
                    })
                    .is_some();
                if indented {
                    if let Some(range) = self.outdent(range) {
                        self.range = range;
                    }
                    return true;
                }
                need_outdent = self
                    .tree
                    .ancestor(point.node, |n| is_list_item(&self.tree, n))
                    .is_some();
            }
        }

        let deleted = self.handle_deletion(Direction::Prev);
        if !deleted && need_outdent {
            let target = if range.is_valid(&self.tree) { range } else { self.range };
            if let Some(range) = self.outdent(target) {
                self.range = range;
            }
        }
        true
    }

    pub fn delete(&mut self) -> bool {
        if self.range.is_collapsed()
            && self
                .range
                .start
                .is_edge_of_tag(&self.tree, "td", Direction::Next)
        {
            return true;
        }
        self.handle_deletion(Direction::Next);
        true
    }

    /// Deletes the selection, or one char, void node or block seam in `dir`. Returns whether
    /// anything was removed.
    fn handle_deletion(&mut self, dir: Direction) -> bool {
        let mut point = self.range.start;
        let mut deleted = false;
        if let Some(rest) = self.delete_selection(self.range) {
            point = rest;
            deleted = true;
        }
        let was_on_start_of_br = dir.is_prev() && point.offset == 0 && self.tree.is_br(point.node);

        self.remove_next_empty_unbreakable(point.node);
        let (mut point, dir, deleted) = self.before_deletion(point, dir, deleted);
        let mut deleted = deleted;
        if !deleted {
            let rest = self.perform_deletion(point, dir, was_on_start_of_br);
            deleted = rest != point;
            point = rest;
        }
        let point = self.after_deletion(point, dir);
        self.range = Range::collapsed(point);
        debug!(?dir, deleted, "handled deletion");
        deleted
    }

    fn before_deletion(
        &mut self,
        point: BoundaryPoint,
        dir: Direction,
        deleted: bool,
    ) -> (BoundaryPoint, Direction, bool) {
        let mut point = self.rerange_to_offset_child(point, dir);
        point = self.slice_placeholders_before_deletion(point);
        if dir.is_prev() && self.is_after_invisible_br(point) {
            point.offset -= 1;
        }
        if self.is_void_block(point.node) {
            let span = self.replace_void_with_empty_span(point.node);
            return (BoundaryPoint::start_of(span), dir, true);
        }
        if deleted {
            return (point, Direction::Next, true);
        }
        if dir.is_prev() {
            point = self.remove_previous_placeholders(point);
        }
        point = self.remove_extreme_breakable_space_at(point);
        (point, dir, false)
    }

    fn perform_deletion(
        &mut self,
        point: BoundaryPoint,
        dir: Direction,
        was_on_start_of_br: bool,
    ) -> BoundaryPoint {
        if self.is_on_edge_to_delete(point, dir)
            && let Some(rest) = self.delete_edge(point.node, dir, false)
        {
            return rest;
        }
        let Some(target) = self.delete_target(point, dir, was_on_start_of_br) else {
            return point;
        };
        let mut rest = target.point;
        let lonely_br = target.block_to_remove.is_some_and(|node| {
            self.tree.is_br(node) && self.tree.parent(node).is_some_and(|p| has_only_br(&self.tree, p))
        });

        if let Some(block) = target.block_to_remove
            && !lonely_br
        {
            let is_rule = self.tree.has_tag(block, "hr");
            self.tree.detach(block);
            if is_rule {
                rest = self.delete_edge(point.node, dir, false).unwrap_or(point);
            }
            if !rest.is_valid(&self.tree) {
                rest = point;
            }
            trace!(%block, "removed node while deleting");
            return rest;
        }
        if target.has_block || !self.tree.is_text(rest.node) {
            return point;
        }

        let len = self.tree.node_len(rest.node);
        let at_end = rest.offset == len;
        if at_end || (dir == Direction::Next && rest.offset > 0) {
            rest.offset = rest.offset.saturating_sub(1);
        }
        let text = remove_char(self.tree.text(rest.node), rest.offset);
        self.tree.set_text(rest.node, text);
        if !is_in_pre(&self.tree, point.node) {
            self.secure_extreme_single_space(rest.node);
        }
        if dir.is_prev() && rest.offset == 0 && !self.is_after_br(rest.node) {
            let text = replace_leading_spaces(self.tree.text(rest.node), &NBSP.to_string());
            self.tree.set_text(rest.node, text);
        }
        rest
    }

    fn after_deletion(&mut self, point: BoundaryPoint, dir: Direction) -> BoundaryPoint {
        let mut point = point;
        if dir.is_prev() {
            point = self.insert_placeholder_after_single_br(point);
        }
        point = self.rerange_out_of_br(point, dir);
        point = self.remove_empty_inline_nodes(point);
        point = self.fill_empty_node(point);
        self.replace_empty_parent_with_empty_p(point)
    }

    fn delete_target(
        &self,
        start: BoundaryPoint,
        dir: Direction,
        was_on_start_of_br: bool,
    ) -> Option<DeleteTarget> {
        let mut has_block = false;
        let mut block_to_remove = None;
        let finder = |point: BoundaryPoint| {
            let at_start_of_void = point.offset == 0 && self.is_void_block(point.node);
            let br_or_rule = self.tree.is_br(point.node) || self.tree.has_tag(point.node, "hr");
            let root_br = was_on_start_of_br && point.node == start.node;
            if point.offset == 0 && self.is_block(point.node) {
                has_block = true;
                if block_to_remove.is_some() {
                    return true;
                }
            }
            if block_to_remove.is_none() && (at_start_of_void || (br_or_rule && !root_br)) {
                block_to_remove = Some(point.node);
                return false;
            }
            if point == start {
                return false;
            }
            self.is_deletable_node(point.node)
        };
        let point = match dir {
            Direction::Prev => start.prev_until(&self.tree, finder),
            Direction::Next => start.next_until(&self.tree, finder),
        }?;
        Some(DeleteTarget {
            point,
            has_block,
            block_to_remove,
        })
    }

    fn is_deletable_node(&self, node: NodeId) -> bool {
        self.is_editable(node)
            && (is_visible_text(&self.tree, node) || self.is_void_block(node) || self.tree.is_br(node))
    }

    fn is_on_edge_to_delete(&self, point: BoundaryPoint, dir: Direction) -> bool {
        let on_br = self.tree.is_br(point.node);
        let parent_only_br = self
            .tree
            .parent(point.node)
            .is_some_and(|parent| inner_only_br(&self.tree, parent));
        let on_edge = match dir {
            Direction::Next => point.offset == self.tree.node_len(point.node),
            Direction::Prev => point.offset == 0,
        };
        (!on_br || parent_only_br) && on_edge
    }

    fn is_after_br(&self, node: NodeId) -> bool {
        self.tree
            .prev_sibling(node)
            .is_some_and(|prev| self.tree.is_br(prev))
    }

    fn is_after_single_br(&self, node: NodeId) -> bool {
        let previous_after_br = self
            .tree
            .prev_sibling(node)
            .is_some_and(|prev| self.is_after_br(prev));
        self.is_after_br(node) && !previous_after_br
    }

    fn is_after_two_brs(&self, node: NodeId) -> bool {
        let previous_after_br = self
            .tree
            .prev_sibling(node)
            .is_some_and(|prev| self.is_after_br(prev));
        self.is_after_br(node) && previous_after_br
    }

    /// Right after a line break that renders nothing: the only child, or a trailing one after
    /// bare text.
    fn is_after_invisible_br(&self, point: BoundaryPoint) -> bool {
        let node = point.node;
        if has_only_br(&self.tree, node) && point.offset == 1 {
            return true;
        }
        let Some(last) = self.tree.last_child(node) else {
            return false;
        };
        self.tree.is_br(last)
            && self
                .tree
                .children(node)
                .iter()
                .all(|child| self.tree.is_text(*child) || *child == last)
            && point.offset == self.tree.node_len(node)
    }

    fn rerange_to_offset_child(&self, point: BoundaryPoint, dir: Direction) -> BoundaryPoint {
        let Some(child) = point.child(&self.tree) else {
            return point;
        };
        if dir.is_prev()
            && point.offset > 0
            && let Some(before) = self.tree.child(point.node, point.offset - 1)
        {
            return BoundaryPoint::end_of(&self.tree, before);
        }
        BoundaryPoint::start_of(child)
    }

    /// Drops a leading placeholder the caret sits right after, and a trailing one it sits right
    /// before.
    fn slice_placeholders_before_deletion(&mut self, point: BoundaryPoint) -> BoundaryPoint {
        let mut point = point;
        if !self.tree.is_text(point.node) {
            return point;
        }
        let text = self.tree.text(point.node);
        if point.offset == 1
            && text.starts_with(ZERO_WIDTH)
            && !self.is_after_two_brs(point.node)
        {
            let rest = slice_chars(text, 1, char_len(text));
            self.tree.set_text(point.node, rest);
            point.offset = 0;
        }
        let text = self.tree.text(point.node);
        let len = char_len(text);
        if len > 0
            && point.offset == len - 1
            && char_at(text, point.offset) == Some(ZERO_WIDTH)
            && !self.is_after_br(point.node)
        {
            let kept = slice_chars(text, 0, point.offset);
            self.tree.set_text(point.node, kept);
        }
        point
    }

    fn remove_previous_placeholders(&mut self, point: BoundaryPoint) -> BoundaryPoint {
        let mut point = point;
        while self.tree.is_text(point.node)
            && point.offset > 0
            && char_at(self.tree.text(point.node), point.offset - 1) == Some(ZERO_WIDTH)
        {
            let text = remove_char(self.tree.text(point.node), point.offset - 1);
            self.tree.set_text(point.node, text);
            point.offset -= 1;
        }
        point
    }

    fn remove_extreme_breakable_space_at(&mut self, point: BoundaryPoint) -> BoundaryPoint {
        let mut point = point;
        if !self.tree.is_text(point.node) || is_in_pre(&self.tree, point.node) {
            return point;
        }
        let (start, _) = self.remove_extreme_breakable_space(point.node);
        point.offset = point.offset.saturating_sub(start);
        point.offset = point.offset.min(self.tree.node_len(point.node));
        point
    }

    /// Swaps a void block (an image, a widget) for an empty span the caret can sit in.
    fn replace_void_with_empty_span(&mut self, node: NodeId) -> NodeId {
        let outer = self
            .tree
            .ancestor(node, |n| {
                self.tree
                    .parent(n)
                    .is_none_or(|parent| !self.is_void_block(parent))
            })
            .unwrap_or(node);
        let span = self.tree.create_element("span");
        self.tree.replace(outer, span);
        debug!(%outer, "removed void block");
        span
    }

    /// Removes an empty unbreakable area right after the one holding `node`. Table cells are
    /// kept.
    fn remove_next_empty_unbreakable(&mut self, node: NodeId) {
        let Some(unbreakable) = self
            .tree
            .ancestor(node, |n| self.tree.is_element(n) && self.is_unbreakable(n))
        else {
            return;
        };
        if self.tree.is_root(unbreakable) {
            return;
        }
        let Some(next) = self.tree.next_element_sibling(unbreakable) else {
            return;
        };
        if self.tree.is_void(next) || is_cell(&self.tree, next) || self.tree.has_tag(next, "tr") {
            return;
        }
        let only_invisible_text = self
            .tree
            .children(next)
            .iter()
            .all(|child| self.tree.is_text(*child) && !has_visible_char(self.tree.text(*child)));
        if is_empty_node(&self.tree, next) || only_invisible_text {
            self.tree.detach(next);
        }
    }

    fn insert_placeholder_after_single_br(&mut self, point: BoundaryPoint) -> BoundaryPoint {
        let at_start_of_invisible_text = point.offset == 0
            && self.tree.is_text(point.node)
            && !has_visible_char(self.tree.text(point.node));
        if !at_start_of_invisible_text || !self.is_after_single_br(point.node) {
            return point;
        }
        let Some(br) = self.tree.prev_sibling(point.node) else {
            return point;
        };
        let placeholder = self.tree.create_text(ZERO_WIDTH.to_string());
        self.tree.insert_after(br, placeholder);
        BoundaryPoint::new(placeholder, 1)
    }

    fn rerange_out_of_br(&self, point: BoundaryPoint, dir: Direction) -> BoundaryPoint {
        let mut leaf = point.node;
        while let Some(child) = self.tree.first_element_child(leaf)
            && !self.tree.is_br(child)
        {
            leaf = child;
        }
        let point = if leaf != point.node {
            BoundaryPoint::start_of(leaf)
        } else {
            point
        };
        let not_br = |pt: BoundaryPoint| !self.tree.is_br(pt.node);
        let moved = match dir {
            Direction::Next => point.prev_until(&self.tree, not_br),
            Direction::Prev => point.next_until(&self.tree, not_br),
        };
        moved.unwrap_or(point)
    }

    /// An empty node that is the only content of its parent becomes `<p><br/></p>`.
    fn replace_empty_parent_with_empty_p(&mut self, point: BoundaryPoint) -> BoundaryPoint {
        let root = self.tree.root();
        if point.node == root || self.tree.parent(point.node) == Some(root) {
            return point;
        }
        let node = match self.tree.parent(point.node) {
            Some(parent) if self.tree.is_void(point.node) => parent,
            _ => point.node,
        };
        let Some(parent) = self.tree.parent(node) else {
            return point;
        };
        if is_empty_node(&self.tree, node)
            && !is_list_item(&self.tree, node)
            && !self.is_unbreakable(node)
            && only_contains(&self.tree, parent, node)
        {
            let p = self.tree.create_element("p");
            let br = self.tree.create_void("br");
            self.tree.append_child(p, br);
            self.tree.replace(node, p);
            return BoundaryPoint::start_of(br);
        }
        point
    }

    // ------------------------------------------------------------------
    // Enter
    // ------------------------------------------------------------------

    fn collapse_selection(&mut self) {
        if let Some(point) = self.delete_selection(self.range) {
            self.range = Range::collapsed(point);
        }
    }

    /// Enter: splits the closest list item or block at the caret.
    pub fn insert_paragraph_break(&mut self) -> bool {
        self.collapse_selection();
        let range = self.range;
        let sc = range.start.node;
        let ancestor = self.tree.ancestor(sc, |n| {
            is_list_item(&self.tree, n)
                || self.tree.parent(n).is_some_and(|parent| {
                    !self.tree.is_root(parent) && self.is_unbreakable(parent)
                })
                || (self.is_block(n)
                    && self
                        .tree
                        .ancestor(n, |a| is_list_item(&self.tree, a))
                        .is_none())
        });
        let Some(ancestor) = ancestor else {
            return false;
        };

        if is_list_item(&self.tree, ancestor) && self.is_empty_list_item(ancestor) {
            if let Some(range) = self.outdent(range) {
                self.range = range;
            }
            return true;
        }

        let mut point = range.start;
        if self.tree.is_text(point.node)
            && self
                .tree
                .parent(point.node)
                .is_some_and(|parent| self.is_unbreakable(parent))
        {
            return self.insert_line_break();
        }
        if let Some(child) = point.child(&self.tree)
            && self.tree.is_br(child)
        {
            point = BoundaryPoint::start_of(child);
        }
        if self.tree.is_br(point.node)
            && let Some(after) = point.next(&self.tree, false)
        {
            point = after;
        }

        let skip_padding = self.tree.parent(point.node).is_some_and(|parent| {
            !self.is_block(parent) && self.tree.next_sibling(parent).is_some()
        });
        let options = SplitOptions {
            skip_padding_blank_node: skip_padding,
            ..SplitOptions::default()
        };
        let Some(right) = self.split_tree(ancestor, point, options) else {
            return false;
        };
        let mut next = right;
        while let Some(first) = self.tree.first_child(next) {
            next = first;
        }

        let mut has_split_block = false;
        let mut last_checked = next;
        let mut node = Some(next);
        while let Some(current) = node {
            if current == ancestor || self.tree.is_root(current) {
                break;
            }
            if self.is_block(current) {
                has_split_block = true;
                break;
            }
            last_checked = current;
            node = self.tree.parent(current);
        }
        if !has_split_block && self.tree.is_tagged(last_checked) {
            let br = self.tree.create_void("br");
            self.tree.insert_before(last_checked, br);
        }

        if self.tree.is_text(next) {
            self.secure_extreme_single_space(next);
        }
        if self.tree.is_element(next) && !self.tree.has_children(next) {
            let placeholder = self.tree.create_text(ZERO_WIDTH.to_string());
            self.tree.append_child(next, placeholder);
            next = placeholder;
        }

        if is_blank_node(&self.tree, ancestor) {
            let first = self.first_enterable_leaf(ancestor);
            let target = if self.tree.is_text(first) {
                self.tree.parent(first).unwrap_or(ancestor)
            } else {
                first
            };
            if !self.tree.is_void(target) {
                self.tree.clear_children(target);
                let br = self.tree.create_void("br");
                self.tree.append_child(target, br);
            }
        }
        let last = self.tree.last_leaf(ancestor);
        if self.tree.is_br(last) && self.tree.prev_sibling(last).is_some() {
            let placeholder = self.tree.create_text(ZERO_WIDTH.to_string());
            self.tree.insert_after(last, placeholder);
        }

        let mut caret = BoundaryPoint::start_of(next);
        if !is_visible_text(&self.tree, next) && !self.tree.is_br(next) {
            let found = caret.next_until(&self.tree, |pt| {
                pt.node != next
                    && (pt.node == right || self.tree.contains(right, pt.node))
                    && (self.tree.is_br(pt.node) || is_visible_text(&self.tree, pt.node))
                    && self.is_editable(pt.node)
            });
            caret = found.unwrap_or(caret);
        }
        if !has_split_block && self.tree.is_text(caret.node) {
            let text = format!("{ZERO_WIDTH}{}", self.tree.text(caret.node));
            self.tree.set_text(caret.node, text);
            caret.offset = 1;
        }

        if self.tree.is_text(sc) && self.tree.is_attached(sc) {
            let text = self.tree.text(sc);
            let trailing = count_trailing(text, is_space);
            if trailing > 0 {
                let mut secured = slice_chars(text, 0, char_len(text) - trailing);
                secured.extend(std::iter::repeat_n(NBSP, trailing));
                self.tree.set_text(sc, secured);
            }
        }

        debug!(%ancestor, has_split_block, "split block at caret");
        self.range = Range::collapsed(caret);
        true
    }

    /// A list item with nothing typed in it: Enter there outdents instead of splitting.
    fn is_empty_list_item(&self, item: NodeId) -> bool {
        let in_group = self
            .tree
            .parent(item)
            .is_some_and(|list| self.tree.has_class(list, "list-group"));
        let has_media = self
            .tree
            .descendants(item)
            .into_iter()
            .any(|n| self.tree.has_tag(n, "img") || self.tree.has_class(n, "fa"));
        !in_group
            && !has_visible_char(&self.tree.text_content(item))
            && count_line_breaks(&self.tree, item) <= 1
            && !has_media
    }

    /// Shift+Enter: a `<br/>` at the caret, without splitting any block.
    pub fn insert_line_break(&mut self) -> bool {
        self.collapse_selection();
        let BoundaryPoint {
            node: sc,
            offset: so,
        } = self.range.start;
        let target = BoundaryPoint::new(sc, so).child(&self.tree).unwrap_or(sc);

        let before = if self.tree.is_br(target) {
            target
        } else if self.tree.is_tagged(target) {
            if target == sc && so > 0 {
                match self.tree.child(sc, so - 1) {
                    Some(before) => before,
                    None => return true,
                }
            } else {
                let empty = self.tree.create_text("");
                if target == sc {
                    self.tree.append_child(sc, empty);
                } else {
                    self.tree.insert_before(target, empty);
                }
                empty
            }
        } else {
            let after = self.tree.split_text(target, if target == sc { so } else { 0 });
            if self.tree.next_sibling(after).is_none()
                && self.tree.text(after).is_empty()
                && self.tree.parent(after).is_some_and(|parent| self.is_block(parent))
            {
                self.tree.set_text(after, ZERO_WIDTH.to_string());
            }
            target
        };

        let br = self.tree.create_void("br");
        self.tree.insert_after(before, br);
        let mut next = BoundaryPoint::start_of(br);
        if !self.tree.is_tagged(before)
            && let Some(after_br) = next.next(&self.tree, false)
        {
            next = after_br;
            let base = next.child(&self.tree).unwrap_or(next.node);
            let leaf = self.first_enterable_leaf(base);
            if self.tree.is_text(leaf) {
                next = BoundaryPoint::start_of(leaf);
            }
        }

        let nbsp = NBSP.to_string();
        if self.tree.is_br(next.node)
            && let Some(sibling) = self.tree.next_sibling(next.node)
            && self.tree.is_text(sibling)
            && !is_placeholder_text(self.tree.text(sibling))
            && !is_in_pre(&self.tree, next.node)
        {
            let text = replace_leading_spaces(self.tree.text(sibling), &nbsp);
            self.tree.set_text(sibling, text);
        }
        if self.tree.is_text(next.node)
            && self.tree.prev_sibling(next.node).is_none_or(|prev| self.tree.is_br(prev))
            && !is_placeholder_text(self.tree.text(next.node))
            && !is_in_pre(&self.tree, next.node)
        {
            let text = replace_leading_spaces(self.tree.text(next.node), &nbsp);
            self.tree.set_text(next.node, text);
        }

        debug!(%br, "inserted line break");
        self.range = Range::collapsed(next);
        true
    }

    /// Ctrl+Enter: a horizontal rule at the caret, with the caret on the content after it.
    pub fn insert_rule(&mut self) -> bool {
        let hr = self.tree.create_void("hr");
        if !self.insert_block_node(hr, self.range) {
            return false;
        }
        let found = BoundaryPoint::start_of(hr).next_until(&self.tree, |pt| {
            pt.node != hr && !self.is_unbreakable(pt.node) && !self.is_void_block(pt.node)
        });
        let caret = match found {
            Some(point) => point.enter_until(&self.tree, |n| self.is_enterable(n)),
            None => {
                let p = self.tree.create_element("p");
                let br = self.tree.create_void("br");
                self.tree.append_child(p, br);
                self.tree.insert_after(hr, p);
                BoundaryPoint::start_of(br)
            }
        };
        self.range = Range::collapsed(caret);
        true
    }

    // ------------------------------------------------------------------
    // Tab and selection
    // ------------------------------------------------------------------

    /// Tab indents at the start of a block and types a tab elsewhere. Shift+Tab outdents. Inside
    /// a table cell nothing is handled.
    pub fn tab(&mut self, outdent: bool) -> bool {
        let range = self.range;
        let mut point = range.start;
        if self.tree.ancestor(point.node, |n| is_cell(&self.tree, n)).is_some() {
            return false;
        }
        if self.tree.is_text(point.node)
            && count_leading(self.tree.text(point.node), is_space) == point.offset
        {
            point.offset = 0;
        }
        if self.is_left_edge_of_block(point) || is_empty_node(&self.tree, point.node) {
            let changed = if outdent {
                self.outdent(range)
            } else {
                self.indent(range)
            };
            if let Some(range) = changed {
                self.range = range;
            }
            return true;
        }
        if !outdent && let Some(range) = self.insert_text_inline(TAB, range) {
            self.range = range;
        }
        true
    }

    /// Selects the content of the closest unbreakable container, first to last visible text.
    pub fn select_all(&mut self) -> bool {
        let Some(container) = self.tree.ancestor(self.range.start.node, |n| {
            self.tree.is_element(n) && self.is_unbreakable(n)
        }) else {
            return false;
        };
        let first = self.tree.first_child(container).unwrap_or(container);
        let last = self.tree.last_child(container).unwrap_or(container);
        let start = BoundaryPoint::start_of(first);
        let end = BoundaryPoint::end_of(&self.tree, last);
        let start = start
            .next_until(&self.tree, |pt| is_visible_text(&self.tree, pt.node))
            .unwrap_or(start);
        let end = end
            .prev_until(&self.tree, |pt| is_visible_text(&self.tree, pt.node))
            .unwrap_or(end);
        self.range = Range::new(start, end);
        self.selection_anchor = Some(start);
        true
    }

    // ------------------------------------------------------------------
    // Caret movement
    // ------------------------------------------------------------------

    /// Every position the caret can rest on, in document order.
    pub fn caret_stops(&self) -> Vec<BoundaryPoint> {
        let mut stops = Vec::new();
        for node in self.tree.descendants(self.tree.root()) {
            if !self.is_editable(node)
                || self
                    .tree
                    .parent(node)
                    .and_then(|parent| self.tree.ancestor(parent, |n| self.is_void_block(n)))
                    .is_some()
            {
                continue;
            }
            if self.tree.is_text(node) {
                let text = self.tree.text(node);
                if text.chars().all(|ch| ch.is_whitespace() && ch != NBSP) {
                    continue;
                }
                let chars: Vec<char> = text.chars().collect();
                for offset in 0..=chars.len() {
                    if offset > 0 && chars[offset - 1] == ZERO_WIDTH {
                        continue;
                    }
                    stops.push(BoundaryPoint::new(node, offset));
                }
            } else if self.tree.is_br(node) {
                stops.push(BoundaryPoint::start_of(node));
            } else if self.is_void_block(node) {
                if let Some(parent) = self.tree.parent(node) {
                    let index = self.tree.index_of(node);
                    stops.push(BoundaryPoint::new(parent, index));
                    stops.push(BoundaryPoint::new(parent, index + 1));
                }
            } else if !self.tree.is_void(node) && !self.tree.has_children(node) && self.is_block(node) {
                stops.push(BoundaryPoint::start_of(node));
            }
        }
        stops
    }

    /// The end of a text run and what directly follows it in the same block render as one
    /// caret position.
    fn same_caret_spot(&self, a: BoundaryPoint, b: BoundaryPoint) -> bool {
        self.tree.is_text(a.node)
            && a.offset == self.tree.node_len(a.node)
            && ((self.tree.is_text(b.node) && b.offset == 0) || self.tree.is_br(b.node))
            && self.first_block_ancestor(a.node) == self.first_block_ancestor(b.node)
    }

    fn step_caret(&self, from: BoundaryPoint, dir: Direction) -> Option<BoundaryPoint> {
        let stops = self.caret_stops();
        match dir {
            Direction::Next => {
                let mut index = stops
                    .iter()
                    .position(|stop| stop.cmp_position(&self.tree, &from) == Ordering::Greater)?;
                if index > 0
                    && index + 1 < stops.len()
                    && stops[index - 1] == from
                    && self.same_caret_spot(from, stops[index])
                {
                    index += 1;
                }
                stops.get(index).copied()
            }
            Direction::Prev => {
                let mut index = stops
                    .iter()
                    .rposition(|stop| stop.cmp_position(&self.tree, &from) == Ordering::Less)?;
                if index > 0
                    && stops.get(index + 1) == Some(&from)
                    && self.same_caret_spot(stops[index], from)
                {
                    index -= 1;
                }
                stops.get(index).copied()
            }
        }
    }

    fn focus(&self) -> (BoundaryPoint, BoundaryPoint) {
        match self.selection_anchor {
            Some(anchor) if anchor == self.range.end => (anchor, self.range.start),
            Some(anchor) if anchor == self.range.start => (anchor, self.range.end),
            _ => (self.range.start, self.range.end),
        }
    }

    fn place_caret(&mut self, anchor: BoundaryPoint, focus: BoundaryPoint, extend: bool) {
        if !extend {
            self.range = Range::collapsed(focus);
            self.selection_anchor = None;
            return;
        }
        self.range = match anchor.cmp_position(&self.tree, &focus) {
            Ordering::Greater => Range::new(focus, anchor),
            _ => Range::new(anchor, focus),
        };
        self.selection_anchor = Some(anchor);
    }

    /// Left and Right. Without `extend` a selection collapses to the side moved to.
    pub fn move_caret(&mut self, dir: Direction, extend: bool) -> bool {
        if !extend && !self.range.is_collapsed() {
            let point = match dir {
                Direction::Prev => self.range.start,
                Direction::Next => self.range.end,
            };
            self.place_caret(point, point, false);
            return true;
        }
        let (anchor, focus) = self.focus();
        let Some(target) = self.step_caret(focus, dir) else {
            return false;
        };
        self.place_caret(anchor, target, extend);
        true
    }

    fn block_of_stop(&self, stop: BoundaryPoint) -> Option<NodeId> {
        self.first_block_ancestor(stop.node)
    }

    /// Home and End: first or last caret position of the current block.
    pub fn move_caret_to_block_edge(&mut self, dir: Direction, extend: bool) -> bool {
        let (anchor, focus) = self.focus();
        let block = self.block_of_stop(focus);
        let stops: Vec<BoundaryPoint> = self
            .caret_stops()
            .into_iter()
            .filter(|stop| self.block_of_stop(*stop) == block)
            .collect();
        let target = match dir {
            Direction::Prev => stops.first(),
            Direction::Next => stops.last(),
        };
        let Some(target) = target.copied() else {
            return false;
        };
        self.place_caret(anchor, target, extend);
        true
    }

    /// Up and Down: the same position counted from the block start in the previous or next
    /// block, clamped to its end.
    pub fn move_caret_vertically(&mut self, dir: Direction, extend: bool) -> bool {
        let (anchor, focus) = self.focus();
        let stops = self.caret_stops();
        let mut groups: Vec<(Option<NodeId>, Vec<BoundaryPoint>)> = Vec::new();
        for stop in stops {
            let block = self.block_of_stop(stop);
            match groups.last_mut() {
                Some((current, members)) if *current == block => members.push(stop),
                _ => groups.push((block, vec![stop])),
            }
        }
        let focus_block = self.block_of_stop(focus);
        let Some(group) = groups.iter().position(|(block, members)| {
            *block == focus_block
                && members
                    .iter()
                    .any(|stop| stop.cmp_position(&self.tree, &focus) != Ordering::Less)
        }) else {
            return false;
        };
        let column = groups[group]
            .1
            .iter()
            .position(|stop| stop.cmp_position(&self.tree, &focus) != Ordering::Less)
            .unwrap_or(0);
        let target_group = match dir {
            Direction::Prev => group.checked_sub(1),
            Direction::Next => Some(group + 1).filter(|index| *index < groups.len()),
        };
        let Some(target_group) = target_group else {
            return false;
        };
        let members = &groups[target_group].1;
        let Some(target) = members.get(column.min(members.len() - 1)).copied() else {
            return false;
        };
        self.place_caret(anchor, target, extend);
        true
    }

    // ------------------------------------------------------------------
    // Commands on the current range
    // ------------------------------------------------------------------

    fn apply_command(&mut self, command: impl FnOnce(&mut Self, Range) -> Option<Range>) -> bool {
        self.selection_anchor = None;
        let Some(range) = command(self, self.range) else {
            return false;
        };
        self.range = range;
        self.repair_range();
        true
    }

    /// Toggles an inline tag such as `b` over the current range.
    pub fn toggle_format(&mut self, tag: &str) -> bool {
        self.apply_command(|editor, range| editor.format_text(tag, range))
    }

    pub fn apply_font_style(&mut self, style: &FontStyle) -> bool {
        self.apply_command(|editor, range| editor.apply_font(style, range))
    }

    pub fn clear_format(&mut self) -> bool {
        self.apply_command(|editor, range| editor.remove_format(range))
    }

    pub fn set_block_format(&mut self, tag: &str) -> bool {
        self.apply_command(|editor, range| editor.format_block(tag, range))
    }

    pub fn toggle_list(&mut self, kind: ListKind) -> bool {
        self.apply_command(|editor, range| editor.insert_list(kind, range))
    }
}
