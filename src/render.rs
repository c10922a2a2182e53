//! Draws the editing tree as wrapped terminal lines and locates the caret on them.

use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};
use unicode_width::UnicodeWidthChar;

use crate::dom::{NodeId, Tree};
use crate::editor::placeholder::{NBSP, ZERO_WIDTH};
use crate::editor::{BoundaryPoint, Range};
use crate::theme::Theme;

const INDENT_STEP_EM: f32 = 1.5;
const INDENT_STEP_COLUMNS: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CursorVisualPosition {
    pub line: usize,
    pub column: u16,
}

#[derive(Debug)]
pub struct RenderResult {
    pub lines: Vec<Line<'static>>,
    pub cursor: Option<CursorVisualPosition>,
    pub total_lines: usize,
}

/// Renders the tree wrapped to `width` columns. The caret is reported at the end of `range`;
/// the selected text is drawn with the theme's selection style.
pub fn render_tree(tree: &Tree, range: Option<Range>, width: usize, theme: &Theme) -> RenderResult {
    let mut renderer = Renderer::new(tree, range, width.max(1), theme);
    let root = tree.root();
    renderer.render_blocks(tree.children(root), "", true);
    renderer.finish()
}

struct Renderer<'a> {
    tree: &'a Tree,
    range: Option<Range>,
    theme: &'a Theme,
    wrap_width: usize,
    cursor: Option<CursorVisualPosition>,
    lines: Vec<Line<'static>>,
    current_line_index: usize,
    selecting: bool,
}

impl<'a> Renderer<'a> {
    fn new(tree: &'a Tree, range: Option<Range>, wrap_width: usize, theme: &'a Theme) -> Self {
        Self {
            tree,
            range,
            theme,
            wrap_width,
            cursor: None,
            lines: Vec::new(),
            current_line_index: 0,
            selecting: false,
        }
    }

    fn is_block(&self, node: NodeId) -> bool {
        self.tree.tag(node).is_some_and(|tag| {
            matches!(
                tag,
                "p" | "div"
                    | "h1"
                    | "h2"
                    | "h3"
                    | "h4"
                    | "h5"
                    | "h6"
                    | "pre"
                    | "blockquote"
                    | "ul"
                    | "ol"
                    | "li"
                    | "hr"
                    | "table"
                    | "thead"
                    | "tbody"
                    | "tfoot"
                    | "tr"
                    | "td"
                    | "th"
                    | "section"
                    | "article"
            )
        })
    }

    /// Renders siblings: blocks one after another, runs of inline nodes as text paragraphs.
    fn render_blocks(&mut self, nodes: &[NodeId], prefix: &str, spaced: bool) {
        let mut run: Vec<NodeId> = Vec::new();
        let mut rendered_any = false;
        for node in nodes {
            if !self.is_block(*node) {
                run.push(*node);
                continue;
            }
            if self.flush_run(&mut run, prefix, spaced && rendered_any) {
                rendered_any = true;
            }
            if spaced && rendered_any {
                self.push_blank_line();
            }
            self.render_block(*node, prefix);
            rendered_any = true;
        }
        self.flush_run(&mut run, prefix, spaced && rendered_any);
    }

    fn flush_run(&mut self, run: &mut Vec<NodeId>, prefix: &str, blank_before: bool) -> bool {
        let nodes = std::mem::take(run);
        let blank = nodes.iter().all(|node| {
            self.tree.is_text(*node)
                && self.tree.text(*node).chars().all(|ch| ch.is_whitespace())
                && !self.has_marker_in(*node)
        });
        if nodes.is_empty() || blank {
            return false;
        }
        if blank_before {
            self.push_blank_line();
        }
        self.render_inline(&nodes, prefix, prefix, Style::default(), false);
        true
    }

    fn has_marker_in(&self, node: NodeId) -> bool {
        self.range
            .is_some_and(|range| range.start.node == node || range.end.node == node)
    }

    fn render_block(&mut self, node: NodeId, prefix: &str) {
        let tag = self.tree.tag(node).unwrap_or_default();
        let indented;
        let prefix = match self.indent_steps(node) {
            0 => prefix,
            steps => {
                indented = format!("{prefix}{}", " ".repeat(steps * INDENT_STEP_COLUMNS));
                indented.as_str()
            }
        };
        match tag {
            "ul" | "ol" => self.render_list(node, prefix),
            "blockquote" => {
                let quote_prefix = format!("{prefix}| ");
                self.render_blocks(self.tree.children(node), &quote_prefix, true);
            }
            "pre" => self.render_code_block(node, prefix),
            "hr" => {
                let width = self.wrap_width.saturating_sub(visible_width(prefix)).max(4);
                let line = Line::from(vec![
                    Span::raw(prefix.to_string()),
                    Span::styled("─".repeat(width), self.theme.rule_style()),
                ]);
                self.lines.push(line);
                self.current_line_index += 1;
            }
            "h1" => self.render_header(node, prefix, HeaderLevel::One),
            "h2" => self.render_header(node, prefix, HeaderLevel::Two),
            "h3" | "h4" | "h5" | "h6" => self.render_header(node, prefix, HeaderLevel::Three),
            "table" | "thead" | "tbody" | "tfoot" | "tr" => {
                self.render_blocks(self.tree.children(node), prefix, false)
            }
            "td" | "th" => {
                let cell_prefix = format!("{prefix}▏");
                self.render_container(node, &cell_prefix, &cell_prefix);
            }
            _ => self.render_container(node, prefix, prefix),
        }
    }

    fn indent_steps(&self, node: NodeId) -> usize {
        let margin = self
            .tree
            .style(node, "margin-left")
            .and_then(|value| value.trim().trim_end_matches("em").trim().parse::<f32>().ok())
            .unwrap_or(0.0);
        (margin / INDENT_STEP_EM).round().max(0.0) as usize
    }

    /// A block holding either inline content or nested blocks.
    fn render_container(&mut self, node: NodeId, first_prefix: &str, continuation_prefix: &str) {
        let children = self.tree.children(node);
        if children.iter().any(|child| self.is_block(*child)) {
            if first_prefix != continuation_prefix {
                self.push_prefix_line(first_prefix);
            }
            self.render_blocks(children, continuation_prefix, false);
            return;
        }
        self.render_inline_of(node, first_prefix, continuation_prefix, Style::default(), false);
    }

    fn render_inline_of(
        &mut self,
        node: NodeId,
        first_prefix: &str,
        continuation_prefix: &str,
        base: Style,
        no_wrap: bool,
    ) {
        let children = self.tree.children(node);
        if children.is_empty() {
            let mut collector = FragmentCollector::default();
            self.check_point(BoundaryPoint::start_of(node), &mut collector);
            let lines = wrap_fragments(&collector.finish(), first_prefix, continuation_prefix, self.wrap_width);
            self.consume_lines(lines);
            return;
        }
        self.render_inline(children, first_prefix, continuation_prefix, base, no_wrap);
    }

    fn render_inline(
        &mut self,
        nodes: &[NodeId],
        first_prefix: &str,
        continuation_prefix: &str,
        base: Style,
        no_wrap: bool,
    ) {
        let mut collector = FragmentCollector::default();
        for node in nodes {
            self.collect_inline(*node, base, &mut collector);
        }
        if let Some(last) = nodes.last()
            && let Some(parent) = self.tree.parent(*last)
        {
            let end = BoundaryPoint::new(parent, self.tree.index_of(*last) + 1);
            self.check_point(end, &mut collector);
        }
        let width = if no_wrap { usize::MAX / 4 } else { self.wrap_width };
        let lines = wrap_fragments(&collector.finish(), first_prefix, continuation_prefix, width);
        self.consume_lines(lines);
    }

    fn render_header(&mut self, node: NodeId, prefix: &str, level: HeaderLevel) {
        let base = Style::default().add_modifier(Modifier::BOLD);
        self.render_inline_of(node, prefix, prefix, base, false);
        if matches!(level, HeaderLevel::Two | HeaderLevel::Three) {
            let width = self.lines.last().map(line_width).unwrap_or(0);
            let underline_char = match level {
                HeaderLevel::Two => '=',
                _ => '-',
            };
            let width = width.saturating_sub(visible_width(prefix));
            self.push_plain_line(&format!("{prefix}{}", underline_string(width, underline_char)));
        }
    }

    fn render_code_block(&mut self, node: NodeId, prefix: &str) {
        let fence = self.code_block_fence(prefix);
        self.push_plain_line(&fence);
        let base = Style::default().add_modifier(Modifier::DIM);
        self.render_inline_of(node, prefix, prefix, base, true);
        self.push_plain_line(&fence);
    }

    fn render_list(&mut self, list: NodeId, prefix: &str) {
        let checklist = self.tree.has_class(list, "o_checklist");
        let ordered = self.tree.has_tag(list, "ol");
        let mut number = 0;
        for item in self.tree.children(list) {
            if !self.tree.has_tag(*item, "li") {
                if self.is_block(*item) {
                    self.render_block(*item, prefix);
                }
                continue;
            }
            if self.tree.has_class(*item, "o_indent") {
                let nested_prefix = format!("{prefix}   ");
                self.render_blocks(self.tree.children(*item), &nested_prefix, false);
                continue;
            }
            number += 1;
            let marker = if checklist {
                if self.tree.has_class(*item, "o_checked") {
                    "[✓] ".to_string()
                } else {
                    "[ ] ".to_string()
                }
            } else if ordered {
                format!("{number}. ")
            } else {
                "• ".to_string()
            };
            let first_prefix = format!("{prefix}{marker}");
            let continuation_prefix =
                format!("{prefix}{}", " ".repeat(visible_width(&marker)));
            let start = self.lines.len();
            self.render_container(*item, &first_prefix, &continuation_prefix);
            self.style_marker(start, prefix, &marker);
        }
    }

    /// Colors the list marker on the first line an item produced.
    fn style_marker(&mut self, line_index: usize, prefix: &str, marker: &str) {
        let style = self.theme.marker_style();
        let Some(line) = self.lines.get_mut(line_index) else {
            return;
        };
        let Some(first) = line.spans.first_mut() else {
            return;
        };
        let content = first.content.to_string();
        if let Some(rest) = content.strip_prefix(prefix)
            && rest.starts_with(marker)
        {
            let tail = rest[marker.len()..].to_string();
            let mut spans = vec![Span::raw(prefix.to_string()), Span::styled(marker.to_string(), style)];
            if !tail.is_empty() {
                spans.push(Span::raw(tail));
            }
            line.spans.splice(0..1, spans);
        }
    }

    /// Emits the caret and toggles selection styling when `point` is an end of the range.
    fn check_point(&mut self, point: BoundaryPoint, collector: &mut FragmentCollector) {
        let Some(range) = self.range else {
            return;
        };
        if range.is_collapsed() {
            if range.start == point {
                collector.caret();
            }
            return;
        }
        if range.start == point {
            self.selecting = true;
        }
        if range.end == point {
            self.selecting = false;
            collector.caret();
        }
    }

    fn collect_inline(&mut self, node: NodeId, style: Style, collector: &mut FragmentCollector) {
        let tree = self.tree;
        if let Some(parent) = tree.parent(node) {
            self.check_point(BoundaryPoint::new(parent, tree.index_of(node)), collector);
        }
        if tree.is_text(node) {
            for (offset, ch) in tree.text(node).chars().enumerate() {
                self.check_point(BoundaryPoint::new(node, offset), collector);
                if ch == ZERO_WIDTH {
                    continue;
                }
                let ch = if ch == NBSP { ' ' } else { ch };
                collector.push_char(ch, self.char_style(style));
            }
            self.check_point(BoundaryPoint::end_of(tree, node), collector);
            return;
        }
        if tree.is_br(node) {
            self.check_point(BoundaryPoint::start_of(node), collector);
            collector.line_break();
            return;
        }
        if tree.is_void(node) {
            self.check_point(BoundaryPoint::start_of(node), collector);
            let label = match tree.tag(node) {
                Some("img") => "[image]".to_string(),
                Some(tag) => format!("[{tag}]"),
                None => String::new(),
            };
            let style = self.char_style(style.add_modifier(Modifier::DIM));
            for ch in label.chars() {
                collector.push_char(ch, style);
            }
            return;
        }
        let style = self.element_style(node, style);
        for child in tree.children(node) {
            self.collect_inline(*child, style, collector);
        }
        self.check_point(BoundaryPoint::end_of(tree, node), collector);
    }

    fn char_style(&self, style: Style) -> Style {
        if self.selecting {
            style.patch(self.theme.selection_style())
        } else {
            style
        }
    }

    fn element_style(&self, node: NodeId, base: Style) -> Style {
        let tree = self.tree;
        let mut style = match tree.tag(node).unwrap_or_default() {
            "b" | "strong" => base.add_modifier(Modifier::BOLD),
            "i" | "em" => base.add_modifier(Modifier::ITALIC),
            "u" => base.add_modifier(Modifier::UNDERLINED),
            "s" | "strike" | "del" => base.add_modifier(Modifier::CROSSED_OUT),
            "mark" => base.patch(self.theme.highlight_style()),
            "code" => base.add_modifier(Modifier::DIM),
            "a" => base.patch(self.theme.link_style()),
            _ => base,
        };
        if let Some(color) = element_color(tree, node, "color", "text-") {
            style = style.fg(color);
        }
        if let Some(color) = element_color(tree, node, "background-color", "bg-") {
            style = style.bg(color);
        }
        style
    }

    fn push_blank_line(&mut self) {
        self.lines.push(Line::from(""));
        self.current_line_index += 1;
    }

    fn push_plain_line(&mut self, content: &str) {
        let span = Span::styled(content.to_string(), self.theme.rule_style());
        self.lines.push(Line::from(vec![span]));
        self.current_line_index += 1;
    }

    fn push_prefix_line(&mut self, content: &str) {
        self.lines.push(Line::from(vec![Span::raw(content.to_string())]));
        self.current_line_index += 1;
    }

    fn code_block_fence(&self, prefix: &str) -> String {
        const MIN_FENCE_WIDTH: usize = 4;
        let available_width = self.wrap_width.saturating_sub(visible_width(prefix));
        let dash_count = available_width.max(MIN_FENCE_WIDTH);
        format!("{}{}", prefix, "-".repeat(dash_count))
    }

    fn consume_lines(&mut self, outputs: Vec<LineOutput>) {
        for output in outputs {
            let spans: Vec<Span<'static>> = output
                .spans
                .into_iter()
                .map(|segment| Span::styled(segment.text, segment.style))
                .collect();
            if let Some(column) = output.caret {
                self.cursor = Some(CursorVisualPosition {
                    line: self.current_line_index,
                    column,
                });
            }
            self.lines.push(Line::from(spans));
            self.current_line_index += 1;
        }
    }

    fn finish(mut self) -> RenderResult {
        if self.lines.is_empty() {
            self.lines.push(Line::from(""));
        }
        let total_lines = self.lines.len();
        RenderResult {
            lines: self.lines,
            cursor: self.cursor,
            total_lines,
        }
    }
}

/// Color from an inline style property or a `text-*`/`bg-*` class.
fn element_color(tree: &Tree, node: NodeId, property: &str, class_prefix: &str) -> Option<Color> {
    if let Some(value) = tree.style(node, property)
        && let Ok(color) = value.trim().parse::<Color>()
    {
        return Some(color);
    }
    tree.classes(node)
        .into_iter()
        .filter_map(|class| class.strip_prefix(class_prefix))
        .find_map(|name| name.parse::<Color>().ok())
}

#[derive(Copy, Clone)]
enum HeaderLevel {
    One,
    Two,
    Three,
}

#[derive(Clone)]
struct LineSegment {
    text: String,
    style: Style,
}

#[derive(Clone)]
struct LineOutput {
    spans: Vec<LineSegment>,
    caret: Option<u16>,
}

#[derive(Clone)]
struct Fragment {
    text: String,
    style: Style,
    kind: FragmentKind,
    width: usize,
    /// Column of the caret inside the fragment.
    caret: Option<usize>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum FragmentKind {
    Word,
    Whitespace,
}

#[derive(Clone)]
enum FragmentItem {
    Token(Fragment),
    LineBreak,
}

/// Groups styled chars into words and whitespace runs.
#[derive(Default)]
struct FragmentCollector {
    fragments: Vec<FragmentItem>,
    builder: Option<TokenBuilder>,
    pending_caret: bool,
}

impl FragmentCollector {
    fn caret(&mut self) {
        match self.builder.as_mut() {
            Some(builder) => builder.caret = Some(builder.width),
            None => self.pending_caret = true,
        }
    }

    fn push_char(&mut self, ch: char, style: Style) {
        let expanded: &[char] = if ch == '\t' { &[' '; 4] } else { &[ch] };
        for actual in expanded {
            let is_whitespace = actual.is_whitespace();
            let matches = self
                .builder
                .as_ref()
                .is_some_and(|existing| existing.matches(is_whitespace, style));
            if !matches {
                self.finish_token();
                let mut builder = TokenBuilder::new(style, is_whitespace);
                if std::mem::take(&mut self.pending_caret) {
                    builder.caret = Some(0);
                }
                self.builder = Some(builder);
            }
            if let Some(builder) = self.builder.as_mut() {
                builder.push_char(*actual);
            }
        }
    }

    fn line_break(&mut self) {
        self.finish_token();
        self.flush_pending_caret();
        self.fragments.push(FragmentItem::LineBreak);
    }

    fn finish_token(&mut self) {
        if let Some(builder) = self.builder.take() {
            self.fragments.push(FragmentItem::Token(builder.finish()));
        }
    }

    fn flush_pending_caret(&mut self) {
        if std::mem::take(&mut self.pending_caret) {
            self.fragments.push(FragmentItem::Token(Fragment {
                text: String::new(),
                style: Style::default(),
                kind: FragmentKind::Word,
                width: 0,
                caret: Some(0),
            }));
        }
    }

    /// A trailing line break only keeps an empty line open and is not drawn.
    fn finish(mut self) -> Vec<FragmentItem> {
        self.finish_token();
        self.flush_pending_caret();
        if matches!(self.fragments.last(), Some(FragmentItem::LineBreak)) {
            self.fragments.pop();
        }
        self.fragments
    }
}

struct TokenBuilder {
    text: String,
    style: Style,
    kind: FragmentKind,
    width: usize,
    caret: Option<usize>,
}

impl TokenBuilder {
    fn new(style: Style, is_whitespace: bool) -> Self {
        Self {
            text: String::new(),
            style,
            kind: if is_whitespace {
                FragmentKind::Whitespace
            } else {
                FragmentKind::Word
            },
            width: 0,
            caret: None,
        }
    }

    fn matches(&self, is_whitespace: bool, style: Style) -> bool {
        self.style == style
            && matches!(
                (self.kind, is_whitespace),
                (FragmentKind::Whitespace, true) | (FragmentKind::Word, false)
            )
    }

    fn push_char(&mut self, ch: char) {
        self.text.push(ch);
        self.width += UnicodeWidthChar::width(ch).unwrap_or(0);
    }

    fn finish(self) -> Fragment {
        Fragment {
            text: self.text,
            style: self.style,
            kind: self.kind,
            width: self.width,
            caret: self.caret,
        }
    }
}

fn wrap_fragments(
    fragments: &[FragmentItem],
    first_prefix: &str,
    continuation_prefix: &str,
    width: usize,
) -> Vec<LineOutput> {
    let mut outputs = Vec::new();
    let mut builder = LineBuilder::new(first_prefix.to_string());
    let mut pending_whitespace: Vec<Fragment> = Vec::new();

    for fragment in fragments {
        match fragment {
            FragmentItem::LineBreak => {
                builder.consume_pending(&mut pending_whitespace);
                outputs.push(builder.build_line());
                builder = LineBuilder::new(continuation_prefix.to_string());
            }
            FragmentItem::Token(token) => match token.kind {
                FragmentKind::Whitespace => {
                    pending_whitespace.push(token.clone());
                }
                FragmentKind::Word => {
                    let whitespace_width: usize =
                        pending_whitespace.iter().map(|item| item.width).sum();
                    if builder.width > builder.prefix_width
                        && builder.width + whitespace_width + token.width > width
                    {
                        builder.consume_pending(&mut pending_whitespace);
                        outputs.push(builder.build_line());
                        builder = LineBuilder::new(continuation_prefix.to_string());
                    }
                    builder.consume_pending(&mut pending_whitespace);
                    builder.append_token(token.clone());
                }
            },
        }
    }

    builder.consume_pending(&mut pending_whitespace);
    outputs.push(builder.build_line());
    outputs
}

struct LineBuilder {
    segments: Vec<LineSegment>,
    caret: Option<u16>,
    width: usize,
    prefix_width: usize,
}

impl LineBuilder {
    fn new(prefix: String) -> Self {
        let prefix_width = visible_width(&prefix);
        let mut segments = Vec::new();
        if !prefix.is_empty() {
            segments.push(LineSegment {
                text: prefix,
                style: Style::default(),
            });
        }
        Self {
            segments,
            caret: None,
            width: prefix_width,
            prefix_width,
        }
    }

    fn consume_pending(&mut self, pending_whitespace: &mut Vec<Fragment>) {
        for fragment in pending_whitespace.drain(..) {
            self.append_token(fragment);
        }
    }

    fn append_token(&mut self, fragment: Fragment) {
        if let Some(offset) = fragment.caret {
            self.caret = Some((self.width + offset) as u16);
        }
        if !fragment.text.is_empty() {
            self.width += fragment.width;
            self.segments.push(LineSegment {
                text: fragment.text,
                style: fragment.style,
            });
        }
    }

    fn build_line(mut self) -> LineOutput {
        if self.segments.is_empty() {
            self.segments.push(LineSegment {
                text: String::new(),
                style: Style::default(),
            });
        }
        LineOutput {
            spans: self.segments,
            caret: self.caret,
        }
    }
}

fn visible_width(text: &str) -> usize {
    text.chars()
        .map(|ch| UnicodeWidthChar::width(ch).unwrap_or(0))
        .sum()
}

fn line_width(line: &Line<'_>) -> usize {
    line.spans
        .iter()
        .map(|span| visible_width(span.content.as_ref()))
        .sum()
}

fn underline_string(width: usize, ch: char) -> String {
    std::iter::repeat_n(ch, width.max(1)).collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::markup;

    fn render(input: &str, width: usize) -> (Vec<String>, Option<CursorVisualPosition>) {
        let parsed = markup::parse(input, &["br", "img", "hr"]).expect("valid markup");
        let result = render_tree(&parsed.tree, parsed.range, width, &Theme::default());
        let lines = result
            .lines
            .iter()
            .map(|line| line.spans.iter().map(|span| span.content.as_ref()).collect())
            .collect();
        (lines, result.cursor)
    }

    #[test]
    fn paragraphs_are_separated_by_blank_lines() {
        let (lines, cursor) = render("<p>one</p><p>t|wo</p>", 40);
        assert_eq!(lines, vec!["one", "", "two"]);
        assert_eq!(cursor, Some(CursorVisualPosition { line: 2, column: 1 }));
    }

    #[test]
    fn long_text_wraps_at_word_boundaries() {
        let (lines, _) = render("<p>alpha beta gamma</p>", 11);
        assert_eq!(lines, vec!["alpha beta ", "gamma"]);
    }

    #[test]
    fn lists_get_markers() {
        let (lines, _) = render(
            "<ul><li>a</li><li class=\"o_indent\"><ol><li>b</li></ol></li></ul><ul class=\"o_checklist\"><li class=\"o_checked\">c</li></ul>",
            40,
        );
        assert_eq!(lines, vec!["• a", "   1. b", "", "[✓] c"]);
    }

    #[test]
    fn line_breaks_and_placeholders() {
        let (lines, cursor) = render("<p>a<br/>&#65279;|</p>", 40);
        assert_eq!(lines, vec!["a", ""]);
        assert_eq!(cursor, Some(CursorVisualPosition { line: 1, column: 0 }));
    }

    #[test]
    fn caret_in_empty_paragraph() {
        let (lines, cursor) = render("<p>x</p><p>|<br/></p>", 40);
        assert_eq!(lines, vec!["x", "", ""]);
        assert_eq!(cursor, Some(CursorVisualPosition { line: 2, column: 0 }));
    }

    #[test]
    fn selection_ends_at_the_caret() {
        let (_, cursor) = render("<p>a[bc]d</p>", 40);
        assert_eq!(cursor, Some(CursorVisualPosition { line: 0, column: 3 }));
    }
}
