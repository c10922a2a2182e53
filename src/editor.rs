//! Editing kernel: boundary points, tree surgery and the keyboard state machine.
//!
//! [`DocumentEditor`] owns the document [`Tree`], the host supplied [`EditorOptions`] and the
//! current [`Range`]. The engine is spread over submodules that all extend the same type:
//! `split` (tree splitting), `delete` (range deletion), `merge` (edge merging), `insert`
//! (inline text and block insertion), `format` (inline styles), `indent` (lists and margins)
//! and `keyboard` (key handling).

use tracing::debug;

use crate::dom::{NodeId, Tree};
use crate::markup::{self, MarkupError};

mod delete;
mod format;
mod indent;
mod insert;
pub mod inspect;
mod keyboard;
mod merge;
pub mod options;
pub mod placeholder;
pub mod point;
mod split;

pub use format::FontStyle;
pub use indent::ListKind;
pub use keyboard::KeyEvent;
pub use options::EditorOptions;
pub use point::{BoundaryPoint, Direction, Range};
pub use split::SplitOptions;

use inspect::{is_blank_node, is_invisible_text, is_visible_text};

#[derive(Clone, Debug)]
pub struct DocumentEditor {
    tree: Tree,
    options: EditorOptions,
    range: Range,
    /// Fixed end of a selection grown with the keyboard.
    selection_anchor: Option<BoundaryPoint>,
}

impl DocumentEditor {
    pub fn new(tree: Tree) -> Self {
        Self::with_options(tree, EditorOptions::default())
    }

    pub fn with_options(tree: Tree, options: EditorOptions) -> Self {
        let root = tree.root();
        let mut editor = Self {
            tree,
            options,
            range: Range::collapsed(BoundaryPoint::start_of(root)),
            selection_anchor: None,
        };
        editor.ensure_root_content();
        let caret = editor.first_caret_position();
        editor.range = Range::collapsed(caret);
        editor
    }

    /// Builds an editor from markup. `|` marks the caret, `[` and `]` a selection.
    pub fn from_markup(input: &str) -> Result<Self, MarkupError> {
        Self::from_markup_with_options(input, EditorOptions::default())
    }

    pub fn from_markup_with_options(
        input: &str,
        options: EditorOptions,
    ) -> Result<Self, MarkupError> {
        let parsed = markup::parse(input, options.void_tags.as_slice())?;
        let mut editor = Self::with_options(parsed.tree, options);
        if let Some(range) = parsed.range {
            editor.set_range(range);
        }
        Ok(editor)
    }

    /// Inner markup of the root with the current range marked.
    pub fn to_markup(&self) -> String {
        markup::serialize(&self.tree, Some(self.range))
    }

    /// Inner markup of the root without range markers.
    pub fn to_plain_markup(&self) -> String {
        markup::serialize(&self.tree, None)
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    pub fn into_tree(self) -> Tree {
        self.tree
    }

    pub fn options(&self) -> &EditorOptions {
        &self.options
    }

    pub fn range(&self) -> Range {
        self.range
    }

    pub fn caret(&self) -> BoundaryPoint {
        self.range.end
    }

    /// Replaces the current range. Ranges with a detached or out of bounds point are refused.
    pub fn set_range(&mut self, range: Range) -> bool {
        if !range.is_valid(&self.tree) {
            debug!(?range, "refusing range outside the editable root");
            return false;
        }
        self.range = range;
        self.selection_anchor = None;
        true
    }

    // ------------------------------------------------------------------
    // Node classification
    // ------------------------------------------------------------------

    pub fn is_text(&self, node: NodeId) -> bool {
        (self.options.is_text)(&self.tree, node)
    }

    pub fn is_void_block(&self, node: NodeId) -> bool {
        (self.options.is_void_block)(&self.tree, node)
    }

    /// The editable root is always unbreakable, whatever the host predicate says.
    pub fn is_unbreakable(&self, node: NodeId) -> bool {
        self.tree.is_root(node) || (self.options.is_unbreakable_node)(&self.tree, node)
    }

    pub fn is_editable(&self, node: NodeId) -> bool {
        (self.options.is_editable_node)(&self.tree, node)
    }

    pub fn is_block(&self, node: NodeId) -> bool {
        !self.tree.is_text(node) && (self.options.is_block_type)(&self.tree, node)
    }

    pub fn is_inline(&self, node: NodeId) -> bool {
        !self.tree.is_root(node) && !self.is_block(node)
    }

    /// Block carrying paragraph formatting (`p`, headings, `blockquote`, `pre`).
    pub fn is_format_node(&self, node: NodeId) -> bool {
        self.tree
            .tag(node)
            .is_some_and(|tag| self.tree.is_element(node) && self.options.is_style_tag(tag))
    }

    /// Inline element that may carry character formatting.
    pub fn is_format_carrier(&self, node: NodeId) -> bool {
        self.tree
            .tag(node)
            .is_some_and(|tag| self.tree.is_element(node) && self.options.is_format_tag(tag))
    }

    /// Editable and enterable: a caret may descend into it.
    pub(crate) fn is_enterable(&self, node: NodeId) -> bool {
        self.is_editable(node) && !self.is_void_block(node)
    }

    pub(crate) fn first_enterable_leaf(&self, node: NodeId) -> NodeId {
        self.tree.first_leaf_until(node, |n| self.is_enterable(n))
    }

    pub(crate) fn first_block_ancestor(&self, node: NodeId) -> Option<NodeId> {
        self.tree.ancestor(node, |n| self.is_block(n))
    }

    /// Visible text or void blocks that the caret may touch.
    pub(crate) fn is_selectable_leaf(&self, node: NodeId) -> bool {
        self.is_editable(node) && (self.is_void_block(node) || is_visible_text(&self.tree, node))
    }

    pub(crate) fn selected_leaves(&self, range: Range) -> Vec<NodeId> {
        range.selected_nodes(&self.tree, |n| self.is_selectable_leaf(n))
    }

    // ------------------------------------------------------------------
    // Housekeeping
    // ------------------------------------------------------------------

    fn first_caret_position(&self) -> BoundaryPoint {
        let root = self.tree.root();
        let leaf = self.first_enterable_leaf(root);
        if leaf == root {
            return BoundaryPoint::start_of(root);
        }
        BoundaryPoint::start_of(leaf)
    }

    /// Drops invisible text at the start of the root and refills an empty root with `<p><br/></p>`.
    pub(crate) fn ensure_root_content(&mut self) -> Option<BoundaryPoint> {
        let root = self.tree.root();
        while let Some(first) = self.tree.first_child(root) {
            if !is_invisible_text(&self.tree, first) {
                break;
            }
            self.tree.detach(first);
        }
        if self.tree.has_children(root) {
            return None;
        }
        let p = self.tree.create_element("p");
        let br = self.tree.create_void("br");
        self.tree.append_child(root, p);
        self.tree.append_child(p, br);
        debug!("refilled empty editable root");
        Some(BoundaryPoint::start_of(br))
    }

    /// Puts the range back on a valid position after an edit left it dangling.
    pub(crate) fn repair_range(&mut self) {
        if let Some(point) = self.ensure_root_content() {
            self.range = Range::collapsed(point);
            return;
        }
        if self.range.is_valid(&self.tree) {
            return;
        }
        if let Some(first) = self.tree.first_child(self.tree.root())
            && is_blank_node(&self.tree, first)
            && self.tree.is_element(first)
        {
            self.tree.clear_children(first);
            let br = self.tree.create_void("br");
            self.tree.append_child(first, br);
        }
        self.range = Range::collapsed(self.first_caret_position());
    }

    /// Merges adjacent text nodes and drops empty ones under `scope`, carrying the given points
    /// along so they keep addressing the same characters.
    pub(crate) fn normalize_text_nodes(&mut self, scope: NodeId, points: &mut [&mut BoundaryPoint]) {
        let mut parents = vec![scope];
        parents.extend(
            self.tree
                .descendants(scope)
                .into_iter()
                .filter(|n| self.tree.is_element(*n)),
        );
        for parent in parents {
            let mut index = 0;
            while let Some(child) = self.tree.child(parent, index) {
                if !self.tree.is_text(child) {
                    index += 1;
                    continue;
                }
                if self.tree.text(child).is_empty() {
                    let prev = self.tree.prev_sibling(child).filter(|n| self.tree.is_text(*n));
                    let next = self.tree.next_sibling(child).filter(|n| self.tree.is_text(*n));
                    for point in points.iter_mut() {
                        if point.node == child {
                            **point = match (prev, next) {
                                (Some(prev), _) => BoundaryPoint::end_of(&self.tree, prev),
                                (None, Some(next)) => BoundaryPoint::start_of(next),
                                (None, None) => BoundaryPoint::new(parent, index),
                            };
                        } else if point.node == parent && point.offset > index {
                            point.offset -= 1;
                        }
                    }
                    self.tree.detach(child);
                    continue;
                }
                let Some(next) = self.tree.child(parent, index + 1) else {
                    break;
                };
                if !self.tree.is_text(next) {
                    index += 1;
                    continue;
                }
                let base = self.tree.node_len(child);
                let merged = format!("{}{}", self.tree.text(child), self.tree.text(next));
                for point in points.iter_mut() {
                    if point.node == next {
                        **point = BoundaryPoint::new(child, base + point.offset);
                    } else if point.node == parent && point.offset == index + 1 {
                        **point = BoundaryPoint::new(child, base);
                    } else if point.node == parent && point.offset > index + 1 {
                        point.offset -= 1;
                    }
                }
                self.tree.set_text(child, merged);
                self.tree.detach(next);
            }
        }
    }
}

#[cfg(test)]
#[path = "editor_tests.rs"]
mod editor_tests;

#[cfg(test)]
#[path = "editor/split_tests.rs"]
mod split_tests;

#[cfg(test)]
#[path = "editor/delete_tests.rs"]
mod delete_tests;

#[cfg(test)]
#[path = "editor/format_tests.rs"]
mod format_tests;

#[cfg(test)]
#[path = "editor/keyboard_tests.rs"]
mod keyboard_tests;
