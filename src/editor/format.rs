use tracing::debug;

use crate::dom::NodeId;

use super::inspect::{is_cell, is_invisible_text, is_list, is_list_item, is_visible_text};
use super::merge::compare_nodes;
use super::placeholder::{NBSP, ZERO_WIDTH, is_space};
use super::{BoundaryPoint, Direction, DocumentEditor, Range, SplitOptions};

const FONT_TAG: &str = "font";
const STYLE_PROPERTIES: &[&str] = &["color", "background-color", "font-size"];

/// Character formatting applied by [`DocumentEditor::apply_font`]. Colors are either a CSS color
/// or a `text-*`/`bg-*` class; `text-undefined` and `bg-undefined` reset to the inherited value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FontStyle {
    pub color: Option<String>,
    pub background: Option<String>,
    /// Font size in pixels.
    pub size: Option<u32>,
}

impl FontStyle {
    pub fn color(color: impl Into<String>) -> Self {
        Self {
            color: Some(color.into()),
            ..Self::default()
        }
    }

    pub fn background(background: impl Into<String>) -> Self {
        Self {
            background: Some(background.into()),
            ..Self::default()
        }
    }

    pub fn size(size: u32) -> Self {
        Self {
            size: Some(size),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.color.is_none() && self.background.is_none() && self.size.is_none()
    }
}

impl DocumentEditor {
    fn is_font(&self, node: NodeId) -> bool {
        self.tree.has_tag(node, FONT_TAG)
    }

    fn in_tag(&self, node: NodeId, tag: &str) -> Option<NodeId> {
        self.tree
            .ancestor(node, |n| !self.tree.is_root(n) && self.tree.has_tag(n, tag))
    }

    pub(crate) fn selected_texts(&self, range: Range) -> Vec<NodeId> {
        range.selected_nodes(&self.tree, |n| {
            self.is_editable(n) && is_visible_text(&self.tree, n)
        })
    }

    // ------------------------------------------------------------------
    // Colors and sizes
    // ------------------------------------------------------------------

    /// Applies colors and size to the range through `<font>` carriers. A collapsed range gets a
    /// styled placeholder so that typing continues in that style.
    pub fn apply_font(&mut self, style: &FontStyle, range: Range) -> Option<Range> {
        if style.is_empty() || !range.is_valid(&self.tree) {
            return None;
        }
        if range.is_collapsed() {
            return self.apply_font_at_caret(style, range.start);
        }

        let mut start = range.start;
        let mut end = range.end;
        if let Some(child) = start.child(&self.tree) {
            start = BoundaryPoint::start_of(child);
        }
        if let Some(child) = end.child(&self.tree) {
            end = BoundaryPoint::start_of(child);
        }

        if end.offset > 0 && end.offset != self.tree.node_len(end.node) {
            let root = self
                .tree
                .last_ancestor(end.node, |n| self.is_font(n))
                .unwrap_or(end.node);
            self.split_tree(root, end, SplitOptions::default());
        }
        if start.offset > 0 && start.offset != self.tree.node_len(start.node) {
            let root = self
                .tree
                .last_ancestor(start.node, |n| self.is_font(n))
                .unwrap_or(start.node);
            if let Some(right) = self.split_tree(root, start, SplitOptions::default()) {
                if end.node == start.node {
                    end = BoundaryPoint::end_of(&self.tree, right);
                }
                start = BoundaryPoint::start_of(right);
            }
        }

        let nodes = Range::new(start, end).selected_nodes(&self.tree, |n| {
            self.is_editable(n) && is_visible_text(&self.tree, n)
        });
        let mut fonts = Vec::new();
        for node in nodes {
            let font = match self.tree.last_ancestor(node, |n| self.is_font(n)) {
                Some(font) => font,
                None => {
                    self.secure_outer_spaces(node);
                    let font = self.tree.create_element(FONT_TAG);
                    self.tree.wrap(node, font);
                    font
                }
            };
            self.apply_styles_to_node(font, style);
            if !fonts.contains(&font) {
                fonts.push(font);
            }
        }
        for font in &fonts {
            self.remove_empty_styles(*font);
        }
        debug!(carriers = fonts.len(), ?style, "applied font");

        if self.tree.is_element(start.node) && start.offset == 0 {
            let from = start.child(&self.tree).unwrap_or(start.node);
            start = BoundaryPoint::start_of(self.first_enterable_leaf(from));
        }
        if self.tree.is_element(end.node) && end.offset == 0 {
            let from = end.child(&self.tree).unwrap_or(end.node);
            end = BoundaryPoint::start_of(self.first_enterable_leaf(from));
        }
        let (start, end) = self.clean_range_after_style(start, end);
        Some(Range::new(start, end))
    }

    fn apply_font_at_caret(&mut self, style: &FontStyle, point: BoundaryPoint) -> Option<Range> {
        let placeholder = if self.tree.is_text(point.node) {
            let placeholder = self.tree.create_text(ZERO_WIDTH.to_string());
            match self.tree.ancestor(point.node, |n| self.is_font(n)) {
                Some(font) => {
                    match self.split_tree(font, point, SplitOptions::SKIP_PADDING_NO_EDGE) {
                        Some(right) if right != font || point.offset == 0 => {
                            self.tree.insert_before(right, placeholder)
                        }
                        _ => self.tree.insert_after(font, placeholder),
                    }
                    self.remove_blank_siblings(placeholder);
                }
                None => {
                    let len = self.tree.node_len(point.node);
                    if point.offset >= len {
                        self.tree.insert_after(point.node, placeholder);
                    } else {
                        let right = self.tree.split_text(point.node, point.offset);
                        self.tree.insert_before(right, placeholder);
                    }
                }
            }
            placeholder
        } else {
            self.insert_format_placeholder(point)?
        };
        let font = self.tree.create_element(FONT_TAG);
        self.tree.wrap(placeholder, font);
        self.apply_styles_to_node(font, style);
        self.remove_empty_styles(font);
        Some(Range::collapsed(BoundaryPoint::new(placeholder, 1)))
    }

    /// Leading and trailing whitespace runs become a single NBSP so they survive wrapping.
    fn secure_outer_spaces(&mut self, node: NodeId) {
        let text = self.tree.text(node);
        let chars: Vec<char> = text.chars().collect();
        let lead = chars.iter().take_while(|c| is_space(**c)).count();
        if lead == chars.len() {
            return;
        }
        let trail = chars.iter().rev().take_while(|c| is_space(**c)).count();
        if lead == 0 && trail == 0 {
            return;
        }
        let mut out = String::new();
        if lead > 0 {
            out.push(NBSP);
        }
        out.extend(&chars[lead..chars.len() - trail]);
        if trail > 0 {
            out.push(NBSP);
        }
        self.tree.set_text(node, out);
    }

    fn apply_styles_to_node(&mut self, node: NodeId, style: &FontStyle) {
        let mut classes: Vec<String> = self
            .tree
            .classes(node)
            .into_iter()
            .map(String::from)
            .collect();
        if let Some(color) = &style.color {
            classes.retain(|class| !class.starts_with("text-"));
            if color == "text-undefined" {
                self.tree.set_style(node, "color", Some("inherit"));
            } else if color.contains("text-") {
                classes.push(color.clone());
                self.tree.set_style(node, "color", Some("inherit"));
            } else {
                self.tree.set_style(node, "color", Some(color));
            }
        }
        if let Some(background) = &style.background {
            classes.retain(|class| !class.starts_with("bg-"));
            if background == "bg-undefined" {
                self.tree.set_style(node, "background-color", Some("inherit"));
            } else if background.contains("bg-") {
                classes.push(background.clone());
                self.tree.set_style(node, "background-color", Some("inherit"));
            } else {
                self.tree.set_style(node, "background-color", Some(background));
            }
        }
        if let Some(size) = style.size {
            self.tree
                .set_style(node, "font-size", Some(&format!("{size}px")));
        }
        self.tree.set_classes(node, &classes);
    }

    /// Drops `inherit` declarations and empty `class`/`style` attributes.
    fn remove_empty_styles(&mut self, node: NodeId) {
        for property in STYLE_PROPERTIES {
            if self.tree.style(node, property).as_deref() == Some("inherit") {
                self.tree.set_style(node, property, None);
            }
        }
        if self.tree.attr(node, "style").is_some_and(|s| s.trim().is_empty()) {
            self.tree.remove_attr(node, "style");
        }
        if self.tree.classes(node).is_empty() {
            self.tree.remove_attr(node, "class");
        }
    }

    fn has_styling(&self, node: NodeId) -> bool {
        !self.tree.classes(node).is_empty()
            || self.tree.attr(node, "style").is_some_and(|s| !s.trim().is_empty())
    }

    /// Unwraps carriers left without class or style and merges each carrier into an identical
    /// previous sibling. Running it again changes nothing.
    fn clean_range_after_style(
        &mut self,
        start: BoundaryPoint,
        end: BoundaryPoint,
    ) -> (BoundaryPoint, BoundaryPoint) {
        let mut start = start;
        let mut end = end;
        let mut nodes: Vec<NodeId> = Vec::new();
        if start.is_valid(&self.tree) && end.is_valid(&self.tree) {
            start.walk_to(&self.tree, end, |point| {
                if !nodes.contains(&point.node) {
                    nodes.push(point.node);
                }
            });
        }

        for node in nodes {
            if !self.tree.is_attached(node) || is_invisible_text(&self.tree, node) {
                continue;
            }
            let font = self.tree.last_ancestor(node, |n| self.is_font(n));
            let Some(carrier) =
                font.or_else(|| self.tree.last_ancestor(node, |n| self.tree.has_tag(n, "span")))
            else {
                continue;
            };

            if !self.has_styling(carrier) {
                self.move_point_out_of(&mut start, carrier, Direction::Next);
                self.move_point_out_of(&mut end, carrier, Direction::Prev);
                self.tree.unwrap(carrier);
                continue;
            }

            let Some(font) = font else {
                continue;
            };
            let mut prev = self.tree.prev_sibling(font);
            while let Some(candidate) = prev {
                if !is_invisible_text(&self.tree, candidate) {
                    break;
                }
                prev = self.tree.prev_sibling(candidate);
            }
            if let Some(prev) = prev
                && compare_nodes(&self.tree, font, prev)
            {
                self.move_point_out_of(&mut start, font, Direction::Next);
                self.move_point_out_of(&mut end, font, Direction::Prev);
                self.tree.move_children(font, 0, prev);
                self.tree.detach(font);
            }
        }
        (start, end)
    }

    /// Moves a point that addresses `node` itself onto the nearest point inside its content.
    fn move_point_out_of(&self, point: &mut BoundaryPoint, node: NodeId, dir: Direction) {
        if point.node != node {
            return;
        }
        let moved = match dir {
            Direction::Next => point.next_until(&self.tree, |p| p.node != node),
            Direction::Prev => point.prev_until(&self.tree, |p| p.node != node),
        };
        if let Some(moved) = moved {
            *point = moved;
        }
    }

    // ------------------------------------------------------------------
    // Bold, italic and friends
    // ------------------------------------------------------------------

    /// Toggles an inline tag (`b`, `i`, `u`, ...) over the range. When every selected text is
    /// already inside the tag it is removed, otherwise it is added where missing.
    pub fn format_text(&mut self, tag: &str, range: Range) -> Option<Range> {
        if !range.is_valid(&self.tree) {
            return None;
        }
        let tag = tag.to_ascii_lowercase();
        let range = if range.is_collapsed() {
            let point = range.start;
            let placeholder = self.insert_format_placeholder(point)?;
            if self.in_tag(placeholder, &tag).is_some() {
                self.split_at_node_ends(placeholder);
                self.unformat_text(&[placeholder], &tag);
            } else {
                let wrapper = self.tree.create_element(&tag);
                self.tree.wrap(placeholder, wrapper);
            }
            Range::collapsed(BoundaryPoint::new(placeholder, 1))
        } else {
            let texts = self.selected_texts(range);
            if texts.is_empty() {
                return None;
            }
            let all_in_tag = texts.iter().all(|t| self.in_tag(*t, &tag).is_some());
            let range = self.split_ends_of_selection(range);
            let texts = self.selected_texts(range);
            let (Some(first), Some(last)) = (texts.first().copied(), texts.last().copied()) else {
                return None;
            };
            if all_in_tag {
                self.unformat_text(&texts, &tag);
                self.merge_similar_siblings_at_range(first, last);
            } else {
                let bare: Vec<NodeId> = texts
                    .iter()
                    .copied()
                    .filter(|t| self.in_tag(*t, &tag).is_none())
                    .collect();
                for text in bare {
                    let wrapper = self.tree.create_element(&tag);
                    self.tree.wrap(text, wrapper);
                    self.merge_with_previous_tag(text, &tag);
                }
            }
            Range::new(
                BoundaryPoint::start_of(first),
                BoundaryPoint::end_of(&self.tree, last),
            )
        };
        let mut start = range.start;
        let mut end = range.end;
        let root = self.tree.root();
        self.normalize_text_nodes(root, &mut [&mut start, &mut end]);
        debug!(%tag, "toggled inline format");
        Some(Range::new(start, end))
    }

    /// A zero-width text node at the point, replacing a line break the point is on.
    fn insert_format_placeholder(&mut self, point: BoundaryPoint) -> Option<NodeId> {
        let sc = point.node;
        if !self.tree.is_attached(sc) {
            return None;
        }
        let placeholder = self.tree.create_text(ZERO_WIDTH.to_string());
        let br = if self.tree.is_br(sc) {
            Some(sc)
        } else {
            self.tree.first_child(sc).filter(|c| self.tree.is_br(*c))
        };
        if let Some(br) = br {
            self.tree.replace(br, placeholder);
        } else if self.tree.is_text(sc) {
            let len = self.tree.node_len(sc);
            if point.offset == 0 {
                self.tree.insert_before(sc, placeholder);
            } else if point.offset >= len {
                self.tree.insert_after(sc, placeholder);
            } else {
                let right = self.tree.split_text(sc, point.offset);
                self.tree.insert_before(right, placeholder);
            }
        } else if self.tree.is_void(sc) {
            self.tree.insert_before(sc, placeholder);
        } else {
            match point.child(&self.tree) {
                Some(child) => self.tree.insert_before(child, placeholder),
                None => self.tree.append_child(sc, placeholder),
            }
        }
        self.tree.parent(placeholder).map(|_| placeholder)
    }

    /// Splits the text nodes at both range ends unconditionally, even on their edges.
    fn split_ends_of_selection(&mut self, range: Range) -> Range {
        let Range { start, end } = range;
        let same = start.node == end.node;
        let (mut sc, mut so) = (start.node, start.offset);
        let (mut ec, mut eo) = (end.node, end.offset);
        if self.tree.is_text(ec) {
            self.tree.split_text(ec, eo);
            eo = self.tree.node_len(ec);
        }
        if self.tree.is_text(sc) {
            sc = self.tree.split_text(sc, so);
            if same {
                ec = sc;
                eo = eo.saturating_sub(so);
            }
            so = 0;
        }
        Range::new(BoundaryPoint::new(sc, so), BoundaryPoint::new(ec, eo))
    }

    fn merge_with_previous_tag(&mut self, node: NodeId, tag: &str) {
        let Some(wrapper) = self.in_tag(node, tag) else {
            return;
        };
        if self
            .tree
            .prev_element_sibling(wrapper)
            .is_some_and(|prev| self.tree.has_tag(prev, tag))
        {
            self.delete_edge(wrapper, Direction::Prev, true);
        }
    }

    /// Every child is one of `texts` (empty text aside).
    fn contains_only(&self, node: NodeId, texts: &[NodeId]) -> bool {
        self.tree.children(node).iter().all(|child| {
            texts.contains(child) || (self.tree.is_text(*child) && self.tree.text(*child).is_empty())
        })
    }

    fn unformat_text(&mut self, texts: &[NodeId], tag: &str) {
        for text in texts {
            let Some(wrapper) = self.in_tag(*text, tag) else {
                continue;
            };
            if self.contains_only(wrapper, texts) {
                self.tree.unwrap(wrapper);
            } else {
                self.unformat_text_node(*text, tag);
            }
        }
        if let Some(first) = texts.first() {
            self.remove_blank_siblings(*first);
        }
    }

    /// Splits the tag ancestor around `node` and unwraps the piece holding it.
    fn unformat_text_node(&mut self, node: NodeId, tag: &str) {
        let Some(wrapper) = self.in_tag(node, tag) else {
            return;
        };
        self.split_tree(wrapper, BoundaryPoint::start_of(node), SplitOptions::SKIP_PADDING_NO_EDGE);
        let Some(wrapper) = self.in_tag(node, tag) else {
            return;
        };
        let end = BoundaryPoint::end_of(&self.tree, node);
        self.split_tree(wrapper, end, SplitOptions::SKIP_PADDING_NO_EDGE);
        if let Some(wrapper) = self.in_tag(node, tag) {
            self.tree.unwrap(wrapper);
        }
    }

    /// Joins the inline carriers at both ends of the range with identical neighbours, e.g.
    /// `<b>a</b><b>[b]</b><b>c</b>` becomes `<b>a[b]c</b>`.
    fn merge_similar_siblings_at_range(&mut self, first: NodeId, last: NodeId) {
        let carrier = |editor: &Self, node: NodeId| {
            if editor.tree.is_text(node) {
                editor.tree.parent(node)
            } else {
                Some(node)
            }
        };
        if let Some(start) = carrier(self, first)
            && self.is_inline(start)
            && let Some(prev) = self.tree.prev_sibling(start)
            && compare_nodes(&self.tree, start, prev)
            && self.tree.is_element(prev)
        {
            for child in self.tree.children(prev).to_vec().into_iter().rev() {
                self.tree.prepend_child(start, child);
            }
            self.tree.detach(prev);
        }
        if let Some(end) = carrier(self, last)
            && self.is_inline(end)
            && let Some(next) = self.tree.next_sibling(end)
            && compare_nodes(&self.tree, end, next)
            && self.tree.is_element(next)
        {
            self.tree.move_children(next, 0, end);
            self.tree.detach(next);
        }
    }

    // ------------------------------------------------------------------
    // Clearing formats
    // ------------------------------------------------------------------

    fn is_remove_format_candidate(&self, node: NodeId) -> bool {
        let Some(parent) = self.tree.parent(node) else {
            return false;
        };
        !self.tree.is_root(parent) && !self.is_unbreakable(parent) && self.is_format_carrier(parent)
    }

    /// Lifts the selected texts out of every inline carrier and strips colors and sizes from the
    /// selected voids. A collapsed range selects the node holding the caret.
    pub fn remove_format(&mut self, range: Range) -> Option<Range> {
        if !range.is_valid(&self.tree) {
            return None;
        }
        let range = if range.is_collapsed() {
            Range::select_node(&self.tree, range.start.node)
        } else {
            self.split_text_at_selection(range)
        };
        let texts = self.selected_texts(range);
        let voids: Vec<NodeId> = range
            .selected_nodes(&self.tree, |n| self.is_void_block(n))
            .into_iter()
            .collect();
        if texts.is_empty() && voids.is_empty() {
            return None;
        }
        for void in &voids {
            self.remove_node_styles(*void);
        }
        for text in &texts {
            while self.is_remove_format_candidate(*text) {
                self.split_at_node_ends(*text);
                let Some(parent) = self.tree.parent(*text) else {
                    break;
                };
                self.tree.replace(parent, *text);
            }
        }
        let (Some(first), Some(last)) = (texts.first().copied(), texts.last().copied()) else {
            return Some(range);
        };
        let mut start = BoundaryPoint::start_of(first);
        let mut end = BoundaryPoint::end_of(&self.tree, last);
        let root = self.tree.root();
        self.normalize_text_nodes(root, &mut [&mut start, &mut end]);
        debug!(texts = texts.len(), voids = voids.len(), "removed format");
        Some(Range::new(start, end))
    }

    fn remove_node_styles(&mut self, node: NodeId) {
        for property in STYLE_PROPERTIES {
            self.tree.set_style(node, property, None);
        }
        let classes: Vec<String> = self
            .tree
            .classes(node)
            .into_iter()
            .filter(|class| !class.starts_with("text-") && !class.starts_with("bg-"))
            .map(String::from)
            .collect();
        self.tree.set_classes(node, &classes);
    }

    // ------------------------------------------------------------------
    // Paragraph formats
    // ------------------------------------------------------------------

    /// Turns the blocks touched by the range into `tag` (`p`, `h1`, `pre`, ...) keeping their
    /// attributes. Content sitting directly in a list item or cell gets wrapped instead.
    pub fn format_block(&mut self, tag: &str, range: Range) -> Option<Range> {
        if !range.is_valid(&self.tree) {
            return None;
        }
        let tag = tag.to_ascii_lowercase();
        let range = if range.is_collapsed() {
            range
        } else {
            self.split_text_at_selection(range)
        };
        let mut leaves = range.selected_nodes(&self.tree, |n| {
            self.tree.is_text(n) || self.tree.is_void(n)
        });
        if leaves.is_empty() {
            leaves.push(range.start.enter(&self.tree).node);
        }

        let mut blocks: Vec<NodeId> = Vec::new();
        for leaf in leaves {
            let Some(block) = self.tree.ancestor(leaf, |n| {
                n != leaf && (self.is_block(n) || self.is_unbreakable(n))
            }) else {
                continue;
            };
            let block = if self.tree.is_root(block) { leaf } else { block };
            if !blocks.contains(&block) {
                blocks.push(block);
            }
        }

        let mut changed = Vec::new();
        for block in blocks {
            let retaggable = !self.is_unbreakable(block)
                && !is_list(&self.tree, block)
                && !is_list_item(&self.tree, block)
                && !is_cell(&self.tree, block);
            let new_block = self.tree.create_element(&tag);
            if !self.tree.is_element(block) {
                self.tree.wrap(block, new_block);
            } else if retaggable {
                let attrs: Vec<(String, String)> = self
                    .tree
                    .attrs(block)
                    .map(|attrs| {
                        attrs
                            .iter()
                            .map(|(name, value)| (name.to_string(), value.to_string()))
                            .collect()
                    })
                    .unwrap_or_default();
                for (name, value) in attrs {
                    self.tree.set_attr(new_block, &name, value);
                }
                self.tree.move_children(block, 0, new_block);
                self.tree.replace(block, new_block);
            } else {
                self.tree.move_children(block, 0, new_block);
                self.tree.append_child(block, new_block);
            }
            changed.push(new_block);
        }
        let (Some(first), Some(last)) = (changed.first().copied(), changed.last().copied()) else {
            return None;
        };
        debug!(%tag, blocks = changed.len(), "formatted blocks");
        let start = self.tree.first_child(first).unwrap_or(first);
        let end = self.tree.last_child(last).unwrap_or(last);
        Some(Range::new(
            BoundaryPoint::start_of(start),
            BoundaryPoint::end_of(&self.tree, end),
        ))
    }
}
