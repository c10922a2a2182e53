//! Arena-backed document tree.
//!
//! Nodes live in a single `Vec` owned by [`Tree`] and are addressed by [`NodeId`]. Ids are never
//! reused: a detached node keeps its slot but is no longer reachable from the root.

use std::fmt;

/// Tag of the editable root element.
pub const ROOT_TAG: &str = "div";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Ordered attribute set of an element.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Attributes {
    entries: Vec<(String, String)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| key == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name.to_ascii_lowercase(), value)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let index = self.entries.iter().position(|(key, _)| key == name)?;
        Some(self.entries.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Element { tag: String, attrs: Attributes },
    Text(String),
    /// Atomic leaf such as a line break or an embedded object.
    Void { tag: String, attrs: Attributes },
}

#[derive(Clone, Debug)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Tree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    /// Creates a tree holding only the editable root.
    pub fn new() -> Self {
        let root = Node::new(NodeKind::Element {
            tag: ROOT_TAG.to_string(),
            attrs: Attributes::new(),
        });
        Self {
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn is_root(&self, id: NodeId) -> bool {
        id == self.root
    }

    /// Number of slots in the arena, detached nodes included.
    pub fn arena_len(&self) -> usize {
        self.nodes.len()
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(Node::new(kind));
        NodeId(self.nodes.len() - 1)
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeKind::Element {
            tag: tag.to_ascii_lowercase(),
            attrs: Attributes::new(),
        })
    }

    pub fn create_void(&mut self, tag: &str) -> NodeId {
        self.push(NodeKind::Void {
            tag: tag.to_ascii_lowercase(),
            attrs: Attributes::new(),
        })
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeKind::Text(text.into()))
    }

    /// Copies tag and attributes (or text) without children.
    pub fn clone_shallow(&mut self, id: NodeId) -> NodeId {
        let kind = self.nodes[id.0].kind.clone();
        self.push(kind)
    }

    pub fn clone_deep(&mut self, id: NodeId) -> NodeId {
        let copy = self.clone_shallow(id);
        let children = self.nodes[id.0].children.clone();
        for child in children {
            let child_copy = self.clone_deep(child);
            self.append_child(copy, child_copy);
        }
        copy
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Element { tag, .. } | NodeKind::Void { tag, .. } => Some(tag.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    pub fn has_tag(&self, id: NodeId, tag: &str) -> bool {
        self.tag(id).is_some_and(|own| own.eq_ignore_ascii_case(tag))
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].kind, NodeKind::Text(_))
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].kind, NodeKind::Element { .. })
    }

    pub fn is_void(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].kind, NodeKind::Void { .. })
    }

    /// Element or void: anything carrying a tag name.
    pub fn is_tagged(&self, id: NodeId) -> bool {
        !self.is_text(id)
    }

    pub fn is_br(&self, id: NodeId) -> bool {
        self.is_void(id) && self.has_tag(id, "br")
    }

    /// Text of a text node, empty for anything else.
    pub fn text(&self, id: NodeId) -> &str {
        match &self.nodes[id.0].kind {
            NodeKind::Text(text) => text,
            _ => "",
        }
    }

    pub fn set_text(&mut self, id: NodeId, value: impl Into<String>) {
        if let NodeKind::Text(text) = &mut self.nodes[id.0].kind {
            *text = value.into();
        }
    }

    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match &self.nodes[id.0].kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Void { .. } => {}
            NodeKind::Element { .. } => {
                for child in &self.nodes[id.0].children {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    /// Chars for a text node, children for an element, zero for a void.
    pub fn node_len(&self, id: NodeId) -> usize {
        match &self.nodes[id.0].kind {
            NodeKind::Text(text) => text.chars().count(),
            NodeKind::Element { .. } => self.nodes[id.0].children.len(),
            NodeKind::Void { .. } => 0,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn child(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.nodes[id.0].children.get(index).copied()
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].children.first().copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].children.last().copied()
    }

    pub fn has_children(&self, id: NodeId) -> bool {
        !self.nodes[id.0].children.is_empty()
    }

    /// Position among the parent's children, zero when detached.
    pub fn index_of(&self, id: NodeId) -> usize {
        self.parent(id)
            .and_then(|parent| {
                self.nodes[parent.0]
                    .children
                    .iter()
                    .position(|child| *child == id)
            })
            .unwrap_or(0)
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_of(id);
        if index == 0 {
            return None;
        }
        self.child(parent, index - 1)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        self.child(parent, self.index_of(id) + 1)
    }

    pub fn prev_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.prev_sibling(id);
        while let Some(node) = current {
            if self.is_tagged(node) {
                return Some(node);
            }
            current = self.prev_sibling(node);
        }
        None
    }

    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.next_sibling(id);
        while let Some(node) = current {
            if self.is_tagged(node) {
                return Some(node);
            }
            current = self.next_sibling(node);
        }
        None
    }

    pub fn first_element_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|child| self.is_tagged(*child))
    }

    pub fn last_element_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id)
            .iter()
            .rev()
            .copied()
            .find(|child| self.is_tagged(*child))
    }

    pub fn element_child_count(&self, id: NodeId) -> usize {
        self.children(id)
            .iter()
            .filter(|child| self.is_tagged(**child))
            .count()
    }

    /// Whether the node is reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == self.root {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Strict containment: `node` is a descendant of `ancestor`.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.parent(node);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.parent(parent);
        }
        false
    }

    /// First node from `id` upward (inclusive) matching `pred`. The root is the last node checked.
    pub fn ancestor(&self, id: NodeId, mut pred: impl FnMut(NodeId) -> bool) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node) = current {
            if pred(node) {
                return Some(node);
            }
            if node == self.root {
                break;
            }
            current = self.parent(node);
        }
        None
    }

    /// Nodes from `id` upward, stopping after the first match of `pred` and never including the root.
    pub fn ancestors_until(
        &self,
        id: NodeId,
        mut pred: impl FnMut(NodeId) -> bool,
    ) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current {
            if node == self.root {
                break;
            }
            out.push(node);
            if pred(node) {
                break;
            }
            current = self.parent(node);
        }
        out
    }

    /// Outermost node from `id` upward (root excluded) matching `pred`.
    pub fn last_ancestor(&self, id: NodeId, pred: impl Fn(NodeId) -> bool) -> Option<NodeId> {
        self.ancestors_until(id, |_| false)
            .into_iter()
            .filter(|node| pred(*node))
            .last()
    }

    pub fn common_ancestor(&self, a: NodeId, b: NodeId) -> Option<NodeId> {
        let mut chain = Vec::new();
        let mut current = Some(a);
        while let Some(node) = current {
            chain.push(node);
            current = self.parent(node);
        }
        let mut current = Some(b);
        while let Some(node) = current {
            if chain.contains(&node) {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }

    /// Descends through first children while `pred` holds for the current node.
    pub fn first_leaf_until(&self, id: NodeId, pred: impl Fn(NodeId) -> bool) -> NodeId {
        let mut node = id;
        while let Some(first) = self.first_child(node) {
            if !pred(node) {
                break;
            }
            node = first;
        }
        node
    }

    pub fn first_leaf(&self, id: NodeId) -> NodeId {
        self.first_leaf_until(id, |_| true)
    }

    pub fn last_leaf(&self, id: NodeId) -> NodeId {
        let mut node = id;
        while let Some(last) = self.last_child(node) {
            node = last;
        }
        node
    }

    /// All descendants in document order, `id` excluded.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    fn can_adopt(&self, parent: NodeId, child: NodeId) -> bool {
        self.is_element(parent)
            && parent != child
            && child != self.root
            && !self.contains(child, parent)
    }

    /// Removes the node from its parent. The subtree stays intact.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|child| *child != id);
        }
    }

    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        if !self.can_adopt(parent, child) {
            return;
        }
        self.detach(child);
        let index = index.min(self.nodes[parent.0].children.len());
        self.nodes[parent.0].children.insert(index, child);
        self.nodes[child.0].parent = Some(parent);
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        let end = self.nodes[parent.0].children.len();
        self.insert_child(parent, end, child);
    }

    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) {
        self.insert_child(parent, 0, child);
    }

    pub fn insert_before(&mut self, reference: NodeId, node: NodeId) {
        let Some(parent) = self.parent(reference) else {
            return;
        };
        if node == reference {
            return;
        }
        self.detach(node);
        let index = self.index_of(reference);
        self.insert_child(parent, index, node);
    }

    pub fn insert_after(&mut self, reference: NodeId, node: NodeId) {
        let Some(parent) = self.parent(reference) else {
            return;
        };
        if node == reference {
            return;
        }
        self.detach(node);
        let index = self.index_of(reference);
        self.insert_child(parent, index + 1, node);
    }

    pub fn replace(&mut self, old: NodeId, new: NodeId) {
        if old == new || self.parent(old).is_none() {
            return;
        }
        self.insert_before(old, new);
        self.detach(old);
    }

    /// Moves the children of `id` in front of it and detaches `id`. Returns the moved children.
    pub fn unwrap(&mut self, id: NodeId) -> Vec<NodeId> {
        let children = self.nodes[id.0].children.clone();
        if self.parent(id).is_none() {
            return Vec::new();
        }
        for child in &children {
            self.insert_before(id, *child);
        }
        self.detach(id);
        children
    }

    /// Places `wrapper` where `id` is and moves `id` inside it.
    pub fn wrap(&mut self, id: NodeId, wrapper: NodeId) {
        if self.parent(id).is_none() {
            return;
        }
        self.insert_before(id, wrapper);
        self.append_child(wrapper, id);
    }

    /// Appends the children of `from`, starting at `start`, to `to`.
    pub fn move_children(&mut self, from: NodeId, start: usize, to: NodeId) {
        let moving: Vec<NodeId> = self.nodes[from.0]
            .children
            .iter()
            .skip(start)
            .copied()
            .collect();
        for child in moving {
            self.append_child(to, child);
        }
    }

    pub fn clear_children(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.nodes[id.0].children);
        for child in children {
            self.nodes[child.0].parent = None;
        }
    }

    /// Splits a text node at a char offset, keeping the head in place and inserting the tail
    /// right after it. Returns the tail node, which may be empty.
    pub fn split_text(&mut self, id: NodeId, offset: usize) -> NodeId {
        let text = self.text(id).to_string();
        let byte = char_to_byte_idx(&text, offset);
        let (head, tail) = text.split_at(byte);
        let tail_node = self.create_text(tail);
        self.set_text(id, head);
        if self.parent(id).is_some() {
            self.insert_after(id, tail_node);
        }
        tail_node
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    pub fn attrs(&self, id: NodeId) -> Option<&Attributes> {
        match &self.nodes[id.0].kind {
            NodeKind::Element { attrs, .. } | NodeKind::Void { attrs, .. } => Some(attrs),
            NodeKind::Text(_) => None,
        }
    }

    fn attrs_mut(&mut self, id: NodeId) -> Option<&mut Attributes> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Element { attrs, .. } | NodeKind::Void { attrs, .. } => Some(attrs),
            NodeKind::Text(_) => None,
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attrs(id)?.get(name)
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        if let Some(attrs) = self.attrs_mut(id) {
            attrs.set(name, value);
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let Some(attrs) = self.attrs_mut(id) {
            attrs.remove(name);
        }
    }

    pub fn classes(&self, id: NodeId) -> Vec<&str> {
        self.attr(id, "class")
            .map(|value| value.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.classes(id).contains(&class)
    }

    /// Writes the class list, dropping the attribute when it ends up empty.
    pub fn set_classes<S: AsRef<str>>(&mut self, id: NodeId, classes: &[S]) {
        let joined = classes
            .iter()
            .map(|class| class.as_ref())
            .filter(|class| !class.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if joined.is_empty() {
            self.remove_attr(id, "class");
        } else {
            self.set_attr(id, "class", joined);
        }
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        let mut classes: Vec<String> = self.classes(id).into_iter().map(String::from).collect();
        if !classes.iter().any(|existing| existing == class) {
            classes.push(class.to_string());
        }
        self.set_classes(id, &classes);
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        let classes: Vec<String> = self
            .classes(id)
            .into_iter()
            .filter(|existing| *existing != class)
            .map(String::from)
            .collect();
        self.set_classes(id, &classes);
    }

    pub fn style(&self, id: NodeId, property: &str) -> Option<String> {
        let style = self.attr(id, "style")?;
        parse_style(style)
            .into_iter()
            .find(|(name, _)| name == property)
            .map(|(_, value)| value)
    }

    /// Sets or clears one CSS property, dropping the attribute when no property is left.
    pub fn set_style(&mut self, id: NodeId, property: &str, value: Option<&str>) {
        let mut props = self.attr(id, "style").map(parse_style).unwrap_or_default();
        props.retain(|(name, _)| name != property);
        if let Some(value) = value {
            props.push((property.to_string(), value.to_string()));
        }
        if props.is_empty() {
            self.remove_attr(id, "style");
        } else {
            self.set_attr(id, "style", write_style(&props));
        }
    }
}

/// Parses `a: b; c: d` into property/value pairs with lower-case names.
pub fn parse_style(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|decl| {
            let (name, value) = decl.split_once(':')?;
            let name = name.trim().to_ascii_lowercase();
            let value = value.trim();
            if name.is_empty() {
                return None;
            }
            Some((name, value.to_string()))
        })
        .collect()
}

pub fn write_style(props: &[(String, String)]) -> String {
    props
        .iter()
        .map(|(name, value)| format!("{name}: {value};"))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn char_to_byte_idx(text: &str, char_idx: usize) -> usize {
    if char_idx == 0 {
        return 0;
    }
    for (count, (byte_idx, _)) in text.char_indices().enumerate() {
        if count == char_idx {
            return byte_idx;
        }
    }
    text.len()
}
