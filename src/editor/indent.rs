use tracing::debug;

use crate::dom::{NodeId, Tree};

use super::inspect::{is_blank_node, is_cell, is_invisible_text, is_list, is_list_item};
use super::{BoundaryPoint, Direction, DocumentEditor, Range};

const INDENT_STEP_EM: f32 = 1.5;
const INDENT_CLASS: &str = "o_indent";
const CHECKLIST_CLASS: &str = "o_checklist";

/// The three list flavours. A checklist is an `ul` carrying the `o_checklist` class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ListKind {
    Unordered,
    Ordered,
    Checklist,
}

impl ListKind {
    pub fn tag(self) -> &'static str {
        match self {
            ListKind::Ordered => "ol",
            ListKind::Unordered | ListKind::Checklist => "ul",
        }
    }

    pub fn of(tree: &Tree, list: NodeId) -> Self {
        if tree.has_tag(list, "ol") {
            ListKind::Ordered
        } else if tree.has_class(list, CHECKLIST_CLASS) {
            ListKind::Checklist
        } else {
            ListKind::Unordered
        }
    }
}

fn indent_property(tree: &Tree, node: NodeId) -> &'static str {
    if is_cell(tree, node) {
        "padding-left"
    } else {
        "margin-left"
    }
}

/// Current indentation in `em`, read from the margin (padding for cells).
pub(crate) fn indent_of(tree: &Tree, node: NodeId) -> f32 {
    tree.style(node, indent_property(tree, node))
        .map(|value| parse_length(&value))
        .unwrap_or(0.0)
}

fn parse_length(value: &str) -> f32 {
    value
        .trim()
        .trim_end_matches(|c: char| c.is_ascii_alphabetic() || c == '%')
        .trim()
        .parse()
        .unwrap_or(0.0)
}

impl DocumentEditor {
    /// Indents the selection: list items move into a nested list, other blocks get a wider left
    /// margin. Returns the range to use afterwards.
    pub fn indent(&mut self, range: Range) -> Option<Range> {
        self.change_indent(range, false)
    }

    /// Reverts [`Self::indent`]. Items of a top level list become paragraphs.
    pub fn outdent(&mut self, range: Range) -> Option<Range> {
        self.change_indent(range, true)
    }

    fn change_indent(&mut self, range: Range, outdent: bool) -> Option<Range> {
        if !range.is_valid(&self.tree) {
            return None;
        }
        let common = self.tree.common_ancestor(range.start.node, range.end.node)?;
        let indented = if outdent {
            self.tree.ancestor(common, |n| {
                !self.tree.is_root(n) && self.tree.is_element(n) && indent_of(&self.tree, n) > 0.0
            })
        } else {
            None
        };
        let targets = if let Some(node) = indented {
            vec![node]
        } else if let Some(list) = self.tree.ancestor(common, |n| is_list(&self.tree, n)) {
            vec![list]
        } else {
            self.indentable_blocks(range)
        };
        let Some(first) = targets.first() else {
            return None;
        };
        let scope = self.tree.parent(*first);

        let mut moves = Vec::new();
        for target in &targets {
            if is_list(&self.tree, *target) {
                if outdent {
                    let kind = ListKind::of(&self.tree, *target);
                    moves.extend(self.convert_list(*target, range, kind));
                } else {
                    self.indent_list(*target, range);
                }
            } else if outdent {
                self.outdent_block(*target);
            } else {
                self.indent_block(*target);
            }
        }
        self.merge_adjacent_lists(scope, range.start.node);
        debug!(outdent, targets = targets.len(), "changed indentation");
        Some(self.range_or_first_caret(range, &moves))
    }

    /// Closest paragraph-like block or cell of every selected leaf.
    fn indentable_blocks(&self, range: Range) -> Vec<NodeId> {
        let mut leaves = self.selected_leaves(range);
        if leaves.is_empty() {
            leaves.push(range.start.node);
        }
        let mut blocks = Vec::new();
        for leaf in leaves {
            if let Some(block) = self
                .tree
                .ancestor(leaf, |n| self.is_format_node(n) || is_cell(&self.tree, n))
                && !blocks.contains(&block)
            {
                blocks.push(block);
            }
        }
        blocks
    }

    fn indent_block(&mut self, node: NodeId) {
        let property = indent_property(&self.tree, node);
        let value = indent_of(&self.tree, node) + INDENT_STEP_EM;
        self.tree.set_style(node, property, Some(&format!("{value}em")));
    }

    fn outdent_block(&mut self, node: NodeId) {
        let property = indent_property(&self.tree, node);
        let value = indent_of(&self.tree, node) - INDENT_STEP_EM;
        if value > 0.0 {
            self.tree.set_style(node, property, Some(&format!("{value}em")));
        } else {
            self.tree.set_style(node, property, None);
        }
    }

    fn create_list_like(&mut self, list: NodeId) -> NodeId {
        let tag = self.tree.tag(list).unwrap_or("ul").to_string();
        let copy = self.tree.create_element(&tag);
        if let Some(class) = self.tree.attr(list, "class").map(str::to_string) {
            self.tree.set_attr(copy, "class", class);
        }
        copy
    }

    /// Moves the items touched by the range into a nested list of the same kind, held by an
    /// `<li class="o_indent">`. A nested list right before or after is reused.
    fn indent_list(&mut self, list: NodeId, range: Range) {
        let (sc, ec) = (range.start.node, range.end.node);
        let nested = self.create_list_like(list);
        let mut within = false;
        for item in self.tree.children(list).to_vec() {
            if !is_list_item(&self.tree, item) {
                continue;
            }
            if !within && (item == sc || self.tree.contains(item, sc)) {
                within = true;
                self.tree.insert_before(item, nested);
            }
            if within {
                self.tree.append_child(nested, item);
            }
            if item == ec || self.tree.contains(item, ec) {
                break;
            }
        }
        if self.tree.parent(nested).is_none() {
            return;
        }

        let tag = self.tree.tag(list).unwrap_or("ul").to_string();
        let mut container = nested;
        let mut holder = None;
        if let Some(prev) = self.tree.prev_element_sibling(nested)
            && is_list_item(&self.tree, prev)
            && let Some(inner) = self.tree.first_element_child(prev)
            && self.tree.has_tag(inner, &tag)
        {
            self.tree.move_children(nested, 0, inner);
            self.tree.detach(nested);
            container = inner;
            holder = Some(prev);
        }
        let anchor = holder.unwrap_or(nested);
        if let Some(next) = self.tree.next_element_sibling(anchor)
            && is_list_item(&self.tree, next)
            && self.tree.has_class(next, INDENT_CLASS)
            && let Some(inner) = self.tree.first_element_child(next)
            && self.tree.has_tag(inner, &tag)
        {
            self.tree.move_children(inner, 0, container);
            self.tree.detach(next);
        }
        if holder.is_none() {
            let li = self.tree.create_element("li");
            self.tree.add_class(li, INDENT_CLASS);
            self.tree.wrap(nested, li);
        }
    }

    /// Turns the selected items of `list` into `kind`. When the list already is of that kind its
    /// level is removed instead: nested items move up one level, top level items become blocks.
    /// Returns the items that were replaced by a paragraph, paired with it.
    fn convert_list(&mut self, list: NodeId, range: Range, kind: ListKind) -> Vec<(NodeId, NodeId)> {
        let items: Vec<NodeId> = self
            .tree
            .children(list)
            .iter()
            .copied()
            .filter(|n| is_list_item(&self.tree, *n))
            .collect();
        if items.is_empty() {
            return Vec::new();
        }
        let holds = |tree: &Tree, item: NodeId, node: NodeId| item == node || tree.contains(item, node);
        let first = items
            .iter()
            .position(|item| holds(&self.tree, *item, range.start.node))
            .unwrap_or(0);
        let last = items
            .iter()
            .position(|item| holds(&self.tree, *item, range.end.node))
            .unwrap_or(items.len() - 1)
            .max(first);
        let before = &items[..first];
        let selected = &items[first..=last];
        let after = &items[last + 1..];

        if !before.is_empty() {
            self.split_off_items(list, before, Direction::Prev);
        }
        if !after.is_empty() {
            self.split_off_items(list, after, Direction::Next);
        }

        let current = ListKind::of(&self.tree, list);
        if current == kind {
            let moves = self.remove_list_level(list, selected);
            debug!(items = selected.len(), "removed list level");
            return moves;
        }

        let converted = if current.tag() == kind.tag() {
            list
        } else {
            let converted = self.tree.create_element(kind.tag());
            let classes: Vec<String> = self
                .tree
                .classes(list)
                .into_iter()
                .filter(|class| *class != CHECKLIST_CLASS)
                .map(str::to_string)
                .collect();
            self.tree.set_classes(converted, &classes);
            self.tree.move_children(list, 0, converted);
            self.tree.replace(list, converted);
            converted
        };
        if kind == ListKind::Checklist {
            self.tree.add_class(converted, CHECKLIST_CLASS);
        } else {
            self.tree.remove_class(converted, CHECKLIST_CLASS);
            for item in selected {
                self.tree.remove_class(*item, "o_checked");
            }
        }
        self.delete_edge(converted, Direction::Next, true);
        self.delete_edge(converted, Direction::Prev, true);
        debug!(?kind, %converted, "converted list");
        Vec::new()
    }

    /// Moves `items` out of `list` into a copy of it placed on the `dir` side.
    fn split_off_items(&mut self, list: NodeId, items: &[NodeId], dir: Direction) {
        let copy = self.create_list_like(list);
        for item in items {
            self.tree.append_child(copy, *item);
        }
        let Some(parent) = self.tree.parent(list) else {
            return;
        };
        let (placed, anchor) = if is_list_item(&self.tree, parent) {
            let holder = self.tree.create_element("li");
            if let Some(class) = self.tree.attr(parent, "class").map(str::to_string) {
                self.tree.set_attr(holder, "class", class);
            }
            self.tree.append_child(holder, copy);
            (holder, parent)
        } else {
            (copy, list)
        };
        match dir {
            Direction::Prev => self.tree.insert_before(anchor, placed),
            Direction::Next => self.tree.insert_after(anchor, placed),
        }
    }

    fn remove_list_level(&mut self, list: NodeId, items: &[NodeId]) -> Vec<(NodeId, NodeId)> {
        let mut moves = Vec::new();
        let Some(parent) = self.tree.parent(list) else {
            return moves;
        };
        if is_list_item(&self.tree, parent) {
            let mut anchor = parent;
            for item in items {
                self.tree.insert_after(anchor, *item);
                anchor = *item;
            }
            self.tree.detach(list);
            if is_blank_node(&self.tree, parent) {
                self.tree.detach(parent);
            }
            return moves;
        }
        if is_list(&self.tree, parent) {
            for item in items {
                self.tree.insert_before(list, *item);
            }
            self.tree.detach(list);
            return moves;
        }

        for item in items {
            let has_block = self
                .tree
                .children(*item)
                .iter()
                .any(|child| self.is_block(*child));
            if has_block {
                for child in self.tree.children(*item).to_vec() {
                    self.tree.insert_before(list, child);
                }
            } else {
                let p = self.tree.create_element("p");
                self.tree.move_children(*item, 0, p);
                if !self.tree.has_children(p) {
                    let br = self.tree.create_void("br");
                    self.tree.append_child(p, br);
                }
                self.tree.insert_before(list, p);
                moves.push((*item, p));
            }
            self.tree.detach(*item);
        }
        let emptied = self
            .tree
            .children(list)
            .iter()
            .all(|child| !is_list_item(&self.tree, *child));
        if emptied {
            self.tree.detach(list);
        }
        moves
    }

    /// Drops whitespace text around the lists under `scope` and fuses lists that became
    /// neighbours.
    fn merge_adjacent_lists(&mut self, scope: Option<NodeId>, fallback: NodeId) {
        let scope = scope
            .filter(|scope| self.tree.is_attached(*scope))
            .unwrap_or(self.tree.root());
        let mut lists: Vec<NodeId> = self
            .tree
            .descendants(scope)
            .into_iter()
            .filter(|n| is_list(&self.tree, *n))
            .collect();
        if lists.is_empty() {
            lists.extend(self.tree.ancestor(fallback, |n| is_list(&self.tree, n)));
        }
        for list in &lists {
            for dir in [Direction::Prev, Direction::Next] {
                while let Some(sibling) = self.sibling(*list, dir)
                    && is_invisible_text(&self.tree, sibling)
                {
                    self.tree.detach(sibling);
                }
            }
        }
        for list in lists {
            if !self.tree.is_attached(list) {
                continue;
            }
            if let Some(prev) = self.tree.prev_sibling(list)
                && is_list(&self.tree, prev)
            {
                self.delete_edge(prev, Direction::Next, true);
            }
        }
    }

    /// Turns the selected blocks into items of a `kind` list, or converts the list the selection
    /// is in.
    pub fn insert_list(&mut self, kind: ListKind, range: Range) -> Option<Range> {
        if !range.is_valid(&self.tree) {
            return None;
        }
        let common = self.tree.common_ancestor(range.start.node, range.end.node)?;
        if let Some(list) = self.tree.ancestor(common, |n| is_list(&self.tree, n)) {
            let moves = self.convert_list(list, range, kind);
            return Some(self.range_or_first_caret(range, &moves));
        }

        let mut blocks = self.listable_blocks(range);
        if blocks.is_empty() {
            self.format_block("p", range)?;
            blocks = self.listable_blocks(range);
        }
        let Some(first) = blocks.first().copied() else {
            return None;
        };
        let parent = self.tree.parent(first);
        let list = self.tree.create_element(kind.tag());
        if kind == ListKind::Checklist {
            self.tree.add_class(list, CHECKLIST_CLASS);
        }
        self.tree.insert_before(first, list);
        let mut moves = Vec::new();
        for block in blocks {
            if self.tree.parent(block) != parent {
                continue;
            }
            let li = self.tree.create_element("li");
            self.tree.append_child(list, li);
            if self.tree.has_tag(block, "p") {
                self.tree.move_children(block, 0, li);
                self.tree.detach(block);
                moves.push((block, li));
            } else {
                self.tree.append_child(li, block);
            }
        }
        self.delete_edge(list, Direction::Next, true);
        self.delete_edge(list, Direction::Prev, true);
        debug!(?kind, "inserted list");
        Some(self.range_or_first_caret(range, &moves))
    }

    fn listable_blocks(&self, range: Range) -> Vec<NodeId> {
        let mut leaves = self.selected_leaves(range);
        if leaves.is_empty() {
            leaves.push(range.start.node);
        }
        let mut blocks = Vec::new();
        for leaf in leaves {
            if let Some(block) = self.tree.ancestor(leaf, |n| self.is_format_node(n))
                && !blocks.contains(&block)
            {
                blocks.push(block);
            }
        }
        blocks
    }

    /// The range with points on replaced containers moved to their replacement, or the first
    /// caret position when it still does not fit the tree.
    fn range_or_first_caret(&self, range: Range, moves: &[(NodeId, NodeId)]) -> Range {
        let relocate = |point: BoundaryPoint| match moves.iter().find(|(old, _)| *old == point.node) {
            Some((_, new)) => BoundaryPoint::new(*new, point.offset.min(self.tree.node_len(*new))),
            None => point,
        };
        let range = Range::new(relocate(range.start), relocate(range.end));
        if range.is_valid(&self.tree) {
            range
        } else {
            Range::collapsed(self.first_caret_position())
        }
    }

    /// Whether the point starts its closest block, ignoring leading placeholders.
    pub fn is_left_edge_of_block(&self, point: BoundaryPoint) -> bool {
        if self.is_block(point.node) {
            return point.is_left_edge(&self.tree);
        }
        point.is_edge_of(&self.tree, |n| self.is_block(n), Direction::Prev)
    }

    pub fn is_right_edge_of_block(&self, point: BoundaryPoint) -> bool {
        if self.is_block(point.node) {
            return point.is_right_edge(&self.tree);
        }
        point.is_edge_of(&self.tree, |n| self.is_block(n), Direction::Next)
    }
}
