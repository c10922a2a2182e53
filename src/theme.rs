use ratatui::style::{Color, Modifier, Style};

/// Colors of the terminal playground
#[derive(Clone, Debug)]
pub struct Theme {
    /// Background color for the document area
    pub background: Color,

    /// Foreground (text) color for the status bar
    pub status_bar_fg: Color,

    /// Background color for the status bar
    pub status_bar_bg: Color,

    /// Color for the current file name in the status bar
    pub filename_color: Color,

    /// Foreground color for selected text
    pub selection_fg: Color,

    /// Background color for selected text
    pub selection_bg: Color,

    /// Foreground color for `<mark>` text
    pub highlight_fg: Color,

    /// Background color for `<mark>` text
    pub highlight_bg: Color,

    /// Color for links
    pub link_color: Color,

    /// Color for horizontal rules and code fences
    pub rule_color: Color,

    /// Color for list bullets, numbers and checkboxes
    pub marker_color: Color,

    /// Color for the block path shown in the status bar
    pub block_path_color: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: Color::Reset,
            status_bar_fg: Color::White,
            status_bar_bg: Color::Blue,
            filename_color: Color::LightYellow,
            selection_fg: Color::White,
            selection_bg: Color::LightBlue,
            highlight_fg: Color::Black,
            highlight_bg: Color::LightYellow,
            link_color: Color::Blue,
            rule_color: Color::DarkGray,
            marker_color: Color::Cyan,
            block_path_color: Color::Gray,
        }
    }
}

impl Theme {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status_bar_style(&self) -> Style {
        Style::default()
            .fg(self.status_bar_fg)
            .bg(self.status_bar_bg)
    }

    pub fn filename_style(&self) -> Style {
        Style::default().fg(self.filename_color)
    }

    pub fn selection_style(&self) -> Style {
        Style::default().fg(self.selection_fg).bg(self.selection_bg)
    }

    pub fn highlight_style(&self) -> Style {
        Style::default().fg(self.highlight_fg).bg(self.highlight_bg)
    }

    pub fn link_style(&self) -> Style {
        Style::default()
            .fg(self.link_color)
            .add_modifier(Modifier::UNDERLINED)
    }

    pub fn rule_style(&self) -> Style {
        Style::default().fg(self.rule_color)
    }

    pub fn marker_style(&self) -> Style {
        Style::default().fg(self.marker_color)
    }

    /// Block path (`div > ul > li`) in the status bar.
    pub fn block_path_style(&self) -> Style {
        Style::default()
            .fg(self.block_path_color)
            .bg(self.status_bar_bg)
    }
}
