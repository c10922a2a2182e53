//! HTML subset import and export with caret markers.
//!
//! `|` marks a collapsed caret, `[` and `]` the ends of a selection. Marker characters that are
//! meant as text have to be written as numeric entities.

use std::fmt::Write as _;

use thiserror::Error;

use crate::dom::{NodeId, NodeKind, Tree};
use crate::editor::{BoundaryPoint, Range};

const CARET: char = '|';
const SELECTION_START: char = '[';
const SELECTION_END: char = ']';

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MarkupError {
    #[error("unexpected end of input at byte {0}")]
    UnexpectedEnd(usize),
    #[error("invalid tag at byte {0}")]
    InvalidTag(usize),
    #[error("closing tag </{found}> does not match <{expected}>")]
    MismatchedClosingTag { expected: String, found: String },
    #[error("unexpected closing tag </{0}>")]
    UnexpectedClosingTag(String),
    #[error("element <{0}> is never closed")]
    UnclosedElement(String),
    #[error("unknown entity &{0};")]
    UnknownEntity(String),
    #[error("marker '{0}' appears more than once")]
    DuplicateMarker(char),
    #[error("caret and selection markers are unbalanced")]
    UnbalancedMarkers,
}

/// A parsed document and the range its markers describe.
#[derive(Clone, Debug)]
pub struct Parsed {
    pub tree: Tree,
    pub range: Option<Range>,
}

/// Parses `input` as the inner markup of the editable root. Tags listed in `void_tags` become
/// atomic leaves whether or not they are written self-closing.
pub fn parse<S: AsRef<str>>(input: &str, void_tags: &[S]) -> Result<Parsed, MarkupError> {
    let mut parser = Parser::new(input, void_tags);
    parser.run()?;
    let range = parser.range()?;
    Ok(Parsed {
        tree: parser.tree,
        range,
    })
}

struct Parser<'a, S> {
    input: &'a str,
    pos: usize,
    void_tags: &'a [S],
    tree: Tree,
    stack: Vec<NodeId>,
    run: String,
    run_markers: Vec<(char, usize)>,
    caret: Option<BoundaryPoint>,
    start: Option<BoundaryPoint>,
    end: Option<BoundaryPoint>,
}

impl<'a, S: AsRef<str>> Parser<'a, S> {
    fn new(input: &'a str, void_tags: &'a [S]) -> Self {
        let tree = Tree::new();
        let root = tree.root();
        Self {
            input,
            pos: 0,
            void_tags,
            tree,
            stack: vec![root],
            run: String::new(),
            run_markers: Vec::new(),
            caret: None,
            start: None,
            end: None,
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn current(&self) -> NodeId {
        self.stack.last().copied().unwrap_or(self.tree.root())
    }

    fn is_void_tag(&self, tag: &str) -> bool {
        self.void_tags
            .iter()
            .any(|void| void.as_ref().eq_ignore_ascii_case(tag))
    }

    fn run(&mut self) -> Result<(), MarkupError> {
        while let Some(ch) = self.peek() {
            match ch {
                '<' => {
                    self.flush_run()?;
                    self.tag()?;
                }
                '&' => {
                    let decoded = self.entity()?;
                    self.run.push(decoded);
                }
                CARET | SELECTION_START | SELECTION_END => {
                    self.bump();
                    let offset = self.run.chars().count();
                    self.run_markers.push((ch, offset));
                }
                _ => {
                    self.bump();
                    self.run.push(ch);
                }
            }
        }
        self.flush_run()?;
        if self.stack.len() > 1 {
            let open = self.current();
            return Err(MarkupError::UnclosedElement(
                self.tree.tag(open).unwrap_or_default().to_string(),
            ));
        }
        Ok(())
    }

    /// Turns the pending text run into a text node and places its markers.
    fn flush_run(&mut self) -> Result<(), MarkupError> {
        let parent = self.current();
        let markers = std::mem::take(&mut self.run_markers);
        if self.run.is_empty() {
            let offset = self.tree.children(parent).len();
            for (marker, _) in markers {
                self.place_marker(marker, BoundaryPoint::new(parent, offset))?;
            }
            return Ok(());
        }
        let text = self.tree.create_text(std::mem::take(&mut self.run));
        self.tree.append_child(parent, text);
        for (marker, offset) in markers {
            self.place_marker(marker, BoundaryPoint::new(text, offset))?;
        }
        Ok(())
    }

    fn place_marker(&mut self, marker: char, point: BoundaryPoint) -> Result<(), MarkupError> {
        let slot = match marker {
            CARET => &mut self.caret,
            SELECTION_START => &mut self.start,
            _ => &mut self.end,
        };
        if slot.is_some() {
            return Err(MarkupError::DuplicateMarker(marker));
        }
        *slot = Some(point);
        Ok(())
    }

    fn range(&self) -> Result<Option<Range>, MarkupError> {
        match (self.caret, self.start, self.end) {
            (None, None, None) => Ok(None),
            (Some(caret), None, None) => Ok(Some(Range::collapsed(caret))),
            (None, Some(start), Some(end)) => Ok(Some(Range::new(start, end))),
            _ => Err(MarkupError::UnbalancedMarkers),
        }
    }

    /// Decodes a character reference. An `&` that does not start one is taken literally.
    fn entity(&mut self) -> Result<char, MarkupError> {
        let start = self.pos;
        self.bump();
        let len = self
            .rest()
            .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '#'))
            .unwrap_or(self.rest().len());
        if len == 0 || !self.rest()[len..].starts_with(';') {
            return Ok('&');
        }
        let name = &self.rest()[..len];
        let decoded = match name {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some('\u{00A0}'),
            _ => name.strip_prefix('#').and_then(|number| {
                let code = match number.strip_prefix(['x', 'X']) {
                    Some(hex) => u32::from_str_radix(hex, 16).ok(),
                    None => number.parse().ok(),
                };
                code.and_then(char::from_u32)
            }),
        };
        let Some(decoded) = decoded else {
            return Err(MarkupError::UnknownEntity(
                self.input[start + 1..start + 1 + len].to_string(),
            ));
        };
        self.pos += len + 1;
        Ok(decoded)
    }

    fn tag(&mut self) -> Result<(), MarkupError> {
        let start = self.pos;
        if self.rest().starts_with("<!--") {
            let Some(end) = self.rest().find("-->") else {
                return Err(MarkupError::UnexpectedEnd(self.input.len()));
            };
            self.pos += end + 3;
            return Ok(());
        }
        self.bump();
        let closing = self.peek() == Some('/');
        if closing {
            self.bump();
        }
        let name = self.name();
        if name.is_empty() {
            return Err(MarkupError::InvalidTag(start));
        }
        let tag = name.to_ascii_lowercase();

        if closing {
            self.skip_whitespace();
            if self.bump() != Some('>') {
                return Err(self.tag_error(start));
            }
            return self.close(tag);
        }

        let void = self.is_void_tag(&tag);
        let node = if void {
            self.tree.create_void(&tag)
        } else {
            self.tree.create_element(&tag)
        };
        let self_closing = self.attributes(node, start)?;
        let parent = self.current();
        self.tree.append_child(parent, node);
        if !void && !self_closing {
            self.stack.push(node);
        }
        Ok(())
    }

    fn close(&mut self, tag: String) -> Result<(), MarkupError> {
        if self.is_void_tag(&tag) {
            return Ok(());
        }
        if self.stack.len() <= 1 {
            return Err(MarkupError::UnexpectedClosingTag(tag));
        }
        let open = self.current();
        let expected = self.tree.tag(open).unwrap_or_default();
        if expected != tag {
            return Err(MarkupError::MismatchedClosingTag {
                expected: expected.to_string(),
                found: tag,
            });
        }
        self.stack.pop();
        Ok(())
    }

    /// Reads attributes up to the end of the tag. Returns whether the tag was self-closing.
    fn attributes(&mut self, node: NodeId, start: usize) -> Result<bool, MarkupError> {
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(MarkupError::UnexpectedEnd(self.input.len())),
                Some('>') => {
                    self.bump();
                    return Ok(false);
                }
                Some('/') => {
                    self.bump();
                    if self.bump() != Some('>') {
                        return Err(self.tag_error(start));
                    }
                    return Ok(true);
                }
                Some(_) => {}
            }
            let name = self.name().to_ascii_lowercase();
            if name.is_empty() {
                return Err(MarkupError::InvalidTag(start));
            }
            self.skip_whitespace();
            let value = if self.peek() == Some('=') {
                self.bump();
                self.skip_whitespace();
                self.attribute_value()?
            } else {
                String::new()
            };
            self.tree.set_attr(node, &name, value);
        }
    }

    fn attribute_value(&mut self) -> Result<String, MarkupError> {
        let mut value = String::new();
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.bump();
                loop {
                    match self.peek() {
                        None => return Err(MarkupError::UnexpectedEnd(self.input.len())),
                        Some(ch) if ch == quote => {
                            self.bump();
                            return Ok(value);
                        }
                        Some('&') => value.push(self.entity()?),
                        Some(ch) => {
                            self.bump();
                            value.push(ch);
                        }
                    }
                }
            }
            _ => {
                while let Some(ch) = self.peek() {
                    if ch.is_whitespace() || ch == '>' || ch == '/' {
                        break;
                    }
                    if ch == '&' {
                        value.push(self.entity()?);
                    } else {
                        self.bump();
                        value.push(ch);
                    }
                }
                Ok(value)
            }
        }
    }

    fn name(&mut self) -> &'a str {
        let rest = self.rest();
        let len = rest
            .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == ':'))
            .unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn tag_error(&self, start: usize) -> MarkupError {
        if self.pos >= self.input.len() {
            MarkupError::UnexpectedEnd(self.input.len())
        } else {
            MarkupError::InvalidTag(start)
        }
    }
}

/// Writes the inner markup of the root. With a range, its markers are written at its points.
pub fn serialize(tree: &Tree, range: Option<Range>) -> String {
    let markers: Vec<(BoundaryPoint, char)> = match range {
        None => Vec::new(),
        Some(range) if range.is_collapsed() => vec![(range.start, CARET)],
        Some(range) => vec![(range.start, SELECTION_START), (range.end, SELECTION_END)],
    };
    let mut out = String::new();
    let root = tree.root();
    write_children(tree, root, &markers, &mut out);
    out
}

fn write_markers(markers: &[(BoundaryPoint, char)], node: NodeId, offset: usize, out: &mut String) {
    for (point, marker) in markers {
        if point.node == node && point.offset == offset {
            out.push(*marker);
        }
    }
}

fn write_children(tree: &Tree, node: NodeId, markers: &[(BoundaryPoint, char)], out: &mut String) {
    for (index, child) in tree.children(node).iter().enumerate() {
        write_markers(markers, node, index, out);
        write_node(tree, *child, markers, out);
    }
    write_markers(markers, node, tree.children(node).len(), out);
}

fn write_node(tree: &Tree, node: NodeId, markers: &[(BoundaryPoint, char)], out: &mut String) {
    match tree.kind(node) {
        NodeKind::Text(text) => {
            for (offset, ch) in text.chars().enumerate() {
                write_markers(markers, node, offset, out);
                write_char(ch, out);
            }
            write_markers(markers, node, text.chars().count(), out);
        }
        NodeKind::Void { tag, attrs } => {
            write_markers(markers, node, 0, out);
            out.push('<');
            out.push_str(tag);
            for (name, value) in attrs.iter() {
                write_attribute(name, value, out);
            }
            out.push_str("/>");
        }
        NodeKind::Element { tag, attrs } => {
            out.push('<');
            out.push_str(tag);
            for (name, value) in attrs.iter() {
                write_attribute(name, value, out);
            }
            out.push('>');
            write_children(tree, node, markers, out);
            let _ = write!(out, "</{tag}>");
        }
    }
}

fn write_attribute(name: &str, value: &str, out: &mut String) {
    let _ = write!(out, " {name}=\"");
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out.push('"');
}

fn write_char(ch: char, out: &mut String) {
    match ch {
        '&' => out.push_str("&amp;"),
        '<' => out.push_str("&lt;"),
        '>' => out.push_str("&gt;"),
        '\u{00A0}' => out.push_str("&nbsp;"),
        '\u{FEFF}' => out.push_str("&#65279;"),
        CARET | SELECTION_START | SELECTION_END => {
            let _ = write!(out, "&#{};", ch as u32);
        }
        _ => out.push(ch),
    }
}
