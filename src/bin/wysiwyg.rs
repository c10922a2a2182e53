use std::{
    env,
    fs::{self, OpenOptions},
    io,
    path::{Path, PathBuf},
    sync::Mutex,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent as TermKeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Position},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use tdoc::{Document, markdown, parse, writer::Writer};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use pure_wysiwyg::editor::{DocumentEditor, FontStyle, KeyEvent, ListKind};
use pure_wysiwyg::interop::{document_to_tree, tree_to_document};
use pure_wysiwyg::render::{RenderResult, render_tree};
use pure_wysiwyg::theme::Theme;

const STATUS_TIMEOUT: Duration = Duration::from_secs(4);
const LOG_FILTER_VAR: &str = "PURE_WYSIWYG_LOG";
const LOG_FILE_VAR: &str = "PURE_WYSIWYG_LOG_FILE";
const DEFAULT_LOG_FILE: &str = "pure-wysiwyg.log";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DocumentFormat {
    Ftml,
    Markdown,
    Html,
}

impl DocumentFormat {
    fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        match ext.as_deref() {
            Some("md") | Some("markdown") | Some("mkd") | Some("mdown") | Some("mdtxt") => {
                DocumentFormat::Markdown
            }
            Some("html") | Some("htm") => DocumentFormat::Html,
            _ => DocumentFormat::Ftml,
        }
    }
}

fn main() -> Result<()> {
    init_logging()?;
    run()
}

/// Logs go to a file: the terminal belongs to the UI. Nothing is logged unless the filter
/// variable is set.
fn init_logging() -> Result<()> {
    let Ok(filter) = env::var(LOG_FILTER_VAR) else {
        return Ok(());
    };
    let path = env::var(LOG_FILE_VAR).unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string());
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {path}"))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|err| anyhow::anyhow!(err))
        .context("failed to install logger")?;
    Ok(())
}

fn editor_wrap_configuration(width: usize) -> (usize, usize) {
    if width == 0 {
        return (1, 0);
    }
    if width < 60 {
        let wrap_width = width.saturating_sub(1).max(1);
        return (wrap_width, 0);
    }
    if width < 100 {
        let padding = 2.min(width / 2);
        let wrap_width = width.saturating_sub(padding.saturating_mul(2)).max(1);
        return (wrap_width, padding);
    }
    let max_padding = width.saturating_sub(1) / 2;
    let left_padding = (width.saturating_sub(100) / 2 + 4).min(max_padding);
    let wrap_width = width.saturating_sub(left_padding.saturating_mul(2)).max(1);
    (wrap_width, left_padding)
}

fn run() -> Result<()> {
    let mut args = env::args().skip(1);
    let Some(path_arg) = args.next() else {
        eprintln!("Usage: wysiwyg <file.ftml|file.md|file.html>");
        return Ok(());
    };
    let path = PathBuf::from(path_arg);

    let (editor, format, initial_status) = load_document(&path)?;
    let mut app = App::new(editor, path, format, initial_status);

    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to initialize terminal")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().ok();

    let res = run_app(&mut terminal, &mut app).context("application error");

    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();

    res
}

fn load_document(path: &Path) -> Result<(DocumentEditor, DocumentFormat, Option<String>)> {
    let format = DocumentFormat::from_path(path);
    if !path.exists() {
        let editor = DocumentEditor::new(Default::default());
        return Ok((editor, format, Some("New document".to_string())));
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let parsed: Result<DocumentEditor, String> = match format {
        DocumentFormat::Ftml => parse(std::io::Cursor::new(content))
            .map(|doc| DocumentEditor::new(document_to_tree(&doc)))
            .map_err(|err| err.to_string()),
        DocumentFormat::Markdown => markdown::parse(std::io::Cursor::new(content))
            .map(|doc| DocumentEditor::new(document_to_tree(&doc)))
            .map_err(|err| err.to_string()),
        DocumentFormat::Html => {
            DocumentEditor::from_markup(&content).map_err(|err| err.to_string())
        }
    };
    match parsed {
        Ok(editor) => {
            info!(path = %path.display(), ?format, "loaded document");
            Ok((editor, format, None))
        }
        Err(err) => {
            let message = format!("Parse error: {err}. Starting with empty document.");
            Ok((DocumentEditor::new(Default::default()), format, Some(message)))
        }
    }
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();
    let mut needs_redraw = true;

    while !app.should_quit {
        if needs_redraw {
            terminal
                .draw(|frame| app.draw(frame))
                .context("failed to draw frame")?;
            needs_redraw = false;
        }

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout).context("event poll failed")? {
            let evt = event::read().context("failed to read event")?;
            app.handle_event(evt)?;
            needs_redraw = true;
        }

        if last_tick.elapsed() >= tick_rate {
            let had_message_before = app.status_message.is_some();
            app.prune_status_message();
            last_tick = Instant::now();
            if had_message_before && app.status_message.is_none() {
                needs_redraw = true;
            }
        }
    }

    Ok(())
}

/// Translates a terminal key into an editor key. Shortcuts handled by the app return `None`.
fn editor_key(code: KeyCode, modifiers: KeyModifiers) -> Option<KeyEvent> {
    let shift = modifiers.contains(KeyModifiers::SHIFT);
    let control = modifiers.contains(KeyModifiers::CONTROL);
    let key = match code {
        KeyCode::Char('a') if control => KeyEvent::SelectAll,
        KeyCode::Char(_) if control || modifiers.contains(KeyModifiers::ALT) => return None,
        KeyCode::Char(ch) => KeyEvent::Char(ch),
        KeyCode::Enter if control => KeyEvent::CtrlEnter,
        KeyCode::Enter if shift => KeyEvent::ShiftEnter,
        KeyCode::Enter => KeyEvent::Enter,
        KeyCode::Backspace => KeyEvent::Backspace,
        KeyCode::Delete => KeyEvent::Delete,
        KeyCode::Tab => KeyEvent::Tab,
        KeyCode::BackTab => KeyEvent::ShiftTab,
        KeyCode::Left => KeyEvent::Left { extend: shift },
        KeyCode::Right => KeyEvent::Right { extend: shift },
        KeyCode::Up => KeyEvent::Up { extend: shift },
        KeyCode::Down => KeyEvent::Down { extend: shift },
        KeyCode::Home => KeyEvent::Home { extend: shift },
        KeyCode::End => KeyEvent::End { extend: shift },
        _ => return None,
    };
    Some(key)
}

struct App {
    editor: DocumentEditor,
    theme: Theme,
    file_path: PathBuf,
    document_format: DocumentFormat,
    scroll_top: usize,
    should_quit: bool,
    dirty: bool,
    status_message: Option<(String, Instant)>,
    last_cursor: Option<(usize, u16)>,
}

impl App {
    fn new(
        editor: DocumentEditor,
        path: PathBuf,
        format: DocumentFormat,
        initial_status: Option<String>,
    ) -> Self {
        Self {
            editor,
            theme: Theme::default(),
            file_path: path,
            document_format: format,
            scroll_top: 0,
            should_quit: false,
            dirty: false,
            status_message: initial_status.map(|msg| (msg, Instant::now())),
            last_cursor: None,
        }
    }

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        if area.height == 0 || area.width == 0 {
            return;
        }

        let vertical = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(area);
        let text_area = vertical[0];
        let status_area = vertical[1];

        let (wrap_width, left_padding) = editor_wrap_configuration(text_area.width as usize);
        let render = render_tree(
            self.editor.tree(),
            Some(self.editor.range()),
            wrap_width,
            &self.theme,
        );
        let viewport_height = text_area.height as usize;
        self.adjust_scroll(&render, viewport_height);

        let padding = " ".repeat(left_padding);
        let lines: Vec<Line<'static>> = render
            .lines
            .iter()
            .map(|line| {
                let mut spans = vec![Span::raw(padding.clone())];
                spans.extend(line.spans.iter().cloned());
                Line::from(spans)
            })
            .collect();
        let paragraph = Paragraph::new(Text::from(lines))
            .wrap(Wrap { trim: false })
            .style(ratatui::style::Style::default().bg(self.theme.background))
            .block(Block::default().borders(Borders::NONE))
            .scroll((self.scroll_top as u16, 0));
        frame.render_widget(paragraph, text_area);

        self.last_cursor = render.cursor.map(|cursor| (cursor.line, cursor.column));
        if let Some(cursor) = render.cursor
            && cursor.line >= self.scroll_top
            && cursor.line < self.scroll_top + viewport_height
        {
            let cursor_y = text_area.y + (cursor.line - self.scroll_top) as u16;
            let column = cursor.column.saturating_add(left_padding as u16);
            let cursor_x = text_area.x + column.min(text_area.width - 1);
            frame.set_cursor_position(Position::new(cursor_x, cursor_y));
        }

        let status_line = self.status_line(status_area.width as usize);
        let status_widget = Paragraph::new(status_line)
            .block(Block::default().borders(Borders::NONE))
            .style(self.theme.status_bar_style());
        frame.render_widget(status_widget, status_area);
    }

    fn adjust_scroll(&mut self, render: &RenderResult, viewport_height: usize) {
        let viewport = viewport_height.max(1);
        let max_scroll = render.total_lines.saturating_sub(viewport);
        if let Some(cursor) = render.cursor {
            if cursor.line < self.scroll_top {
                self.scroll_top = cursor.line;
            } else if cursor.line >= self.scroll_top + viewport {
                self.scroll_top = cursor.line + 1 - viewport;
            }
        }
        self.scroll_top = self.scroll_top.min(max_scroll);
    }

    fn status_line(&mut self, terminal_width: usize) -> Line<'static> {
        self.prune_status_message();
        let position = match self.last_cursor {
            Some((line, column)) => format!("{}:{}", line + 1, column + 1),
            None => "?:?".to_string(),
        };

        if let Some((message, _)) = &self.status_message {
            return Line::from(vec![
                Span::raw(format!("{position} ")),
                Span::raw(message.clone()),
            ]);
        }

        let filename = self.file_path.display().to_string();
        let marker = if self.dirty { "*" } else { "" };
        let mut spans = vec![
            Span::raw(format!("{position} ")),
            Span::styled(format!("{filename}{marker}"), self.theme.filename_style()),
            Span::raw(" "),
            Span::styled(self.block_path(), self.theme.block_path_style()),
            Span::raw(format!(", {} words", self.count_words())),
        ];

        let shortcuts = "^B ^I ^U ^L ^R ^E ^S:Save ^Q:Quit";
        let left_width: usize = spans.iter().map(|span| span.content.chars().count()).sum();
        let shortcuts_width = shortcuts.chars().count();
        if left_width + 1 + shortcuts_width <= terminal_width {
            let padding = terminal_width - left_width - shortcuts_width;
            spans.push(Span::raw(" ".repeat(padding)));
            spans.push(Span::raw(shortcuts));
        }
        Line::from(spans)
    }

    /// Tags from the root down to the caret.
    fn block_path(&self) -> String {
        let tree = self.editor.tree();
        let mut tags = Vec::new();
        let mut node = Some(self.editor.caret().node);
        while let Some(current) = node {
            if let Some(tag) = tree.tag(current) {
                tags.push(tag.to_string());
            }
            node = tree.parent(current);
        }
        tags.reverse();
        tags.join(" > ")
    }

    fn count_words(&self) -> usize {
        let tree = self.editor.tree();
        tree.text_content(tree.root()).split_whitespace().count()
    }

    fn prune_status_message(&mut self) {
        if let Some((_, instant)) = &self.status_message
            && instant.elapsed() > STATUS_TIMEOUT
        {
            self.status_message = None;
        }
    }

    fn handle_event(&mut self, event: Event) -> Result<()> {
        let Event::Key(TermKeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            ..
        }) = event
        else {
            return Ok(());
        };
        let control = modifiers.contains(KeyModifiers::CONTROL);
        let changed = match code {
            KeyCode::Char('q') | KeyCode::Char('c') if control => {
                self.should_quit = true;
                false
            }
            KeyCode::Char('s') if control => {
                self.save()?;
                false
            }
            KeyCode::Char('b') if control => self.editor.toggle_format("b"),
            KeyCode::Char('i') if control => self.editor.toggle_format("i"),
            KeyCode::Char('u') if control => self.editor.toggle_format("u"),
            KeyCode::Char('l') if control => self.editor.toggle_list(ListKind::Unordered),
            KeyCode::Char('r') if control => {
                self.editor.apply_font_style(&FontStyle::color("red"))
            }
            KeyCode::Char('e') if control => self.editor.clear_format(),
            _ => match editor_key(code, modifiers) {
                Some(key) => {
                    let handled = self.editor.handle_key(key);
                    handled && !key.is_movement()
                }
                None => false,
            },
        };
        if changed {
            self.dirty = true;
        }
        debug!(?code, ?modifiers, changed, "handled terminal key");
        Ok(())
    }

    fn save(&mut self) -> Result<()> {
        let contents = match self.document_format {
            DocumentFormat::Ftml => {
                let document: Document = tree_to_document(self.editor.tree());
                Writer::new()
                    .write_to_string(&document)
                    .context("failed to render FTML")?
                    .into_bytes()
            }
            DocumentFormat::Markdown => {
                let document = tree_to_document(self.editor.tree());
                let mut contents = Vec::new();
                markdown::write(&mut contents, &document).context("failed to render Markdown")?;
                contents
            }
            DocumentFormat::Html => self.editor.to_plain_markup().into_bytes(),
        };
        fs::write(&self.file_path, contents)
            .with_context(|| format!("failed to write {}", self.file_path.display()))?;

        self.dirty = false;
        self.status_message = Some(("Saved".to_string(), Instant::now()));
        info!(path = %self.file_path.display(), "saved document");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_follows_extension() {
        assert_eq!(DocumentFormat::from_path(Path::new("a.MD")), DocumentFormat::Markdown);
        assert_eq!(DocumentFormat::from_path(Path::new("a.htm")), DocumentFormat::Html);
        assert_eq!(DocumentFormat::from_path(Path::new("a.ftml")), DocumentFormat::Ftml);
        assert_eq!(DocumentFormat::from_path(Path::new("notes")), DocumentFormat::Ftml);
    }

    #[test]
    fn terminal_keys_map_to_editor_keys() {
        assert_eq!(
            editor_key(KeyCode::Enter, KeyModifiers::CONTROL),
            Some(KeyEvent::CtrlEnter)
        );
        assert_eq!(
            editor_key(KeyCode::Left, KeyModifiers::SHIFT),
            Some(KeyEvent::Left { extend: true })
        );
        assert_eq!(
            editor_key(KeyCode::Char('a'), KeyModifiers::CONTROL),
            Some(KeyEvent::SelectAll)
        );
        assert_eq!(editor_key(KeyCode::Char('b'), KeyModifiers::CONTROL), None);
        assert_eq!(
            editor_key(KeyCode::Char('x'), KeyModifiers::NONE),
            Some(KeyEvent::Char('x'))
        );
    }
}
