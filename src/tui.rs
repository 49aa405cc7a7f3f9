//! Ratatui interface for jsonscope.

use std::fmt;
use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;
use tracing::{debug, error, info};

use crate::catalog::CatalogEntry;
use crate::colors::ColorTheme;
use crate::document::ColorizedDocument;
use crate::error::AppError;
use crate::markup::{self, Highlight, Segment};
use crate::search::{SearchMode, SearchOptions, SearchState, SubmitOutcome};

const PAGE_LINES: u16 = 10;
const WELCOME: &str = "Press F1, ?, or h for help. Press q to quit.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Files,
    Content,
}

/// Which content pane a document is shown in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaneSlot {
    Primary,
    Compare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareLayout {
    SideBySide,
    Stacked,
}

/// Catalog entry currently shown in the primary pane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveSelection {
    pub file_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub text: String,
    pub kind: StatusKind,
}

impl Status {
    fn info(text: impl Into<String>) -> Self {
        Self { text: text.into(), kind: StatusKind::Info }
    }

    fn error(text: impl Into<String>) -> Self {
        Self { text: text.into(), kind: StatusKind::Error }
    }
}

#[derive(Debug, Clone)]
pub struct TuiConfig {
    pub root: PathBuf,
    pub search: SearchOptions,
    pub max_query_len: usize,
    pub theme: ColorTheme,
}

impl Default for TuiConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            search: SearchOptions::default(),
            max_query_len: 265,
            theme: ColorTheme::default(),
        }
    }
}

/// Work the runtime performs off the event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    None,
    Scan { request: u64 },
    Load { slot: PaneSlot, index: usize, path: PathBuf, request: u64 },
    Quit,
}

/// A content pane and the request it is waiting on.
#[derive(Debug, Clone, Default)]
pub struct Pane {
    pub document: Option<ColorizedDocument>,
    lines: Vec<Vec<Segment>>,
    pending: u64,
}

impl Pane {
    fn set_document(&mut self, document: ColorizedDocument) {
        self.lines = markup::parse_lines(&document.marked_up);
        self.document = Some(document);
    }

    fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn title(&self) -> String {
        self.document.as_ref().map(ColorizedDocument::title).unwrap_or_else(|| "Content".to_string())
    }
}

#[derive(Debug, Clone)]
pub struct TuiState {
    pub focus: FocusPane,
    pub entries: Vec<CatalogEntry>,
    pub list_cursor: usize,
    pub active: Option<ActiveSelection>,
    pub primary: Pane,
    pub compare: Pane,
    pub compare_visible: bool,
    pub layout: CompareLayout,
    pub scroll: u16,
    pub viewport_height: u16,
    pub search: SearchState,
    pub status: Status,
    pub show_help: bool,
    pub scanning: bool,
    scan_pending: u64,
}

impl TuiState {
    fn new(config: &TuiConfig) -> Self {
        Self {
            focus: FocusPane::Files,
            entries: Vec::new(),
            list_cursor: 0,
            active: None,
            primary: Pane::default(),
            compare: Pane::default(),
            compare_visible: false,
            layout: CompareLayout::SideBySide,
            scroll: 0,
            viewport_height: 0,
            search: SearchState::new(config.search, config.max_query_len),
            status: Status::info(WELCOME),
            show_help: false,
            scanning: false,
            scan_pending: 0,
        }
    }
}

pub struct Tui {
    pub config: TuiConfig,
    pub state: TuiState,
    next_request: u64,
}

impl Default for Tui {
    fn default() -> Self {
        Self::new(TuiConfig::default())
    }
}

impl Tui {
    pub fn new(config: TuiConfig) -> Self {
        let state = TuiState::new(&config);
        Self { config, state, next_request: 0 }
    }

    fn request_id(&mut self) -> u64 {
        self.next_request += 1;
        self.next_request
    }

    /// Start a directory scan; the result arrives through [`Tui::apply_catalog`].
    pub fn request_scan(&mut self) -> Action {
        let request = self.request_id();
        self.state.scan_pending = request;
        self.state.scanning = true;
        self.state.status = Status::info("Loading JSON files...");
        Action::Scan { request }
    }

    fn request_load(&mut self, slot: PaneSlot, index: usize) -> Action {
        let Some(entry) = self.state.entries.get(index) else {
            return Action::None;
        };
        let path = entry.path.clone();
        let request = self.request_id();
        match slot {
            PaneSlot::Primary => self.state.primary.pending = request,
            PaneSlot::Compare => self.state.compare.pending = request,
        }
        Action::Load { slot, index, path, request }
    }

    /// Log a failure and show its short form. Displayed content is left untouched.
    fn report(&mut self, context: &'static str, error: &AppError) {
        error!(%error, context, "operation failed");
        self.state.status = Status::error(error.status_message());
    }

    pub fn apply_catalog(&mut self, request: u64, result: Result<Vec<CatalogEntry>, AppError>) {
        if request != self.state.scan_pending {
            debug!(request, "discarding stale scan result");
            return;
        }
        self.state.scanning = false;
        match result {
            Ok(entries) => {
                info!(root = %self.config.root.display(), files = entries.len(), "JSON files loaded successfully");
                self.state.entries = entries;
                let len = self.state.entries.len();
                self.state.list_cursor = self.state.list_cursor.min(len.saturating_sub(1));
                if self.state.active.is_some_and(|active| active.file_index >= len) {
                    self.state.active = None;
                }
                self.state.status = Status::info("Select a file to view its content.");
            }
            Err(error) => self.report("scan", &error),
        }
    }

    pub fn apply_document(
        &mut self,
        slot: PaneSlot,
        index: usize,
        request: u64,
        result: Result<ColorizedDocument, AppError>,
    ) {
        let pane = match slot {
            PaneSlot::Primary => &mut self.state.primary,
            PaneSlot::Compare => &mut self.state.compare,
        };
        if request != pane.pending {
            debug!(request, ?slot, "discarding stale document");
            return;
        }
        pane.pending = 0;

        let document = match result {
            Ok(document) => document,
            Err(error) => {
                self.report("load", &error);
                return;
            }
        };
        info!(path = %document.path.display(), ?slot, "document loaded");
        match slot {
            PaneSlot::Primary => {
                self.state.primary.set_document(document);
                self.state.active = Some(ActiveSelection { file_index: index });
                self.state.scroll = 0;
                self.state.search.invalidate();
                self.state.status = Status::info("");
            }
            PaneSlot::Compare => {
                self.state.compare.set_document(document);
                self.state.compare_visible = true;
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Action {
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
        {
            return Action::Quit;
        }

        if self.state.show_help {
            return self.handle_help(key);
        }

        match self.state.search.mode {
            SearchMode::Composing => self.handle_search(key),
            SearchMode::Idle | SearchMode::Browsing => self.handle_normal(key),
        }
    }

    fn handle_help(&mut self, key: KeyEvent) -> Action {
        match key.code {
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('?' | 'q' | 'Q') | KeyCode::F(1) => {
                self.state.show_help = false;
                self.state.focus = FocusPane::Files;
            }
            _ => {}
        }
        Action::None
    }

    fn handle_search(&mut self, key: KeyEvent) -> Action {
        match key {
            KeyEvent { code: KeyCode::Esc, .. } => {
                self.state.search.cancel();
                self.state.status = Status::info("");
                self.state.focus = FocusPane::Content;
            }
            KeyEvent { code: KeyCode::Enter, .. } => {
                self.submit_search();
                self.state.focus = FocusPane::Content;
            }
            KeyEvent { code: KeyCode::Backspace, .. } => {
                self.state.search.backspace();
                self.state.status = Status::info(self.state.search.prompt());
            }
            KeyEvent { code: KeyCode::Char('r'), modifiers, .. }
                if modifiers.contains(KeyModifiers::CONTROL) =>
            {
                self.state.search.toggle_regex();
                self.state.status = Status::info(self.state.search.prompt());
            }
            KeyEvent { code: KeyCode::Char('t'), modifiers, .. }
                if modifiers.contains(KeyModifiers::CONTROL) =>
            {
                self.state.search.toggle_case();
                self.state.status = Status::info(self.state.search.prompt());
            }
            KeyEvent { code: KeyCode::Char(c), modifiers, .. }
                if !modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                self.state.search.push_char(c);
                self.state.status = Status::info(self.state.search.prompt());
            }
            _ => {}
        }
        Action::None
    }

    fn submit_search(&mut self) {
        let content = self.state.primary.document.as_ref().map(ColorizedDocument::visible_text);
        let pattern = self.state.search.query.pattern.clone();
        match self.state.search.submit(content.as_deref().unwrap_or_default()) {
            SubmitOutcome::Empty => self.state.status = Status::info(""),
            SubmitOutcome::Found(total) => {
                self.scroll_to_current_match();
                self.state.status = Status::info(format!(
                    "Found {total} occurrences. Result 1 of {total}. Press 'n' for next, 'N' for previous."
                ));
            }
            SubmitOutcome::NotFound => {
                self.state.status = Status::error(format!("No results found for: {pattern}"));
            }
            SubmitOutcome::Failed(error) => self.report("search", &error),
        }
    }

    fn handle_normal(&mut self, key: KeyEvent) -> Action {
        if key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
            return Action::None;
        }
        match key.code {
            KeyCode::Char('q' | 'Q') => Action::Quit,
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Left | KeyCode::Right => {
                self.toggle_focus();
                Action::None
            }
            KeyCode::Up => {
                self.move_or_scroll(-1);
                Action::None
            }
            KeyCode::Down => {
                self.move_or_scroll(1);
                Action::None
            }
            KeyCode::PageUp => {
                self.move_or_scroll(-i32::from(PAGE_LINES));
                Action::None
            }
            KeyCode::PageDown => {
                self.move_or_scroll(i32::from(PAGE_LINES));
                Action::None
            }
            KeyCode::Enter if self.state.focus == FocusPane::Files => self.open_selected(),
            KeyCode::Char('r' | 'R') => self.request_scan(),
            KeyCode::Char('c' | 'C') => self.toggle_compare(),
            KeyCode::Char('o' | 'O') => {
                self.toggle_layout();
                Action::None
            }
            KeyCode::F(1) | KeyCode::Char('f' | 'F' | '?' | 'h' | 'H') => {
                self.state.show_help = true;
                Action::None
            }
            KeyCode::Char('/') => {
                self.state.search.begin();
                self.state.status = Status::info(self.state.search.prompt());
                Action::None
            }
            KeyCode::Char('n') => {
                self.find_next();
                Action::None
            }
            KeyCode::Char('N') => {
                self.find_previous();
                Action::None
            }
            _ => Action::None,
        }
    }

    fn toggle_focus(&mut self) {
        self.state.focus = match self.state.focus {
            FocusPane::Files => FocusPane::Content,
            FocusPane::Content => {
                if let Some(active) = self.state.active {
                    self.state.list_cursor = active.file_index;
                }
                FocusPane::Files
            }
        };
    }

    fn move_or_scroll(&mut self, delta: i32) {
        match self.state.focus {
            FocusPane::Files => self.move_cursor(delta),
            FocusPane::Content => self.scroll_by(delta),
        }
    }

    fn move_cursor(&mut self, delta: i32) {
        let len = self.state.entries.len();
        if len == 0 {
            return;
        }
        let next = (self.state.list_cursor as i64 + delta as i64).clamp(0, len as i64 - 1);
        self.state.list_cursor = next as usize;
    }

    fn scroll_by(&mut self, delta: i32) {
        let next = (self.state.scroll as i32 + delta).clamp(0, self.max_scroll() as i32);
        self.state.scroll = next as u16;
    }

    /// Both panes scroll together, so the longer document bounds the offset.
    fn max_scroll(&self) -> u16 {
        let mut lines = self.state.primary.line_count();
        if self.state.compare_visible {
            lines = lines.max(self.state.compare.line_count());
        }
        let viewport = usize::from(self.state.viewport_height.max(1));
        lines.saturating_sub(viewport).min(u16::MAX as usize) as u16
    }

    fn open_selected(&mut self) -> Action {
        if self.state.entries.is_empty() {
            return Action::None;
        }
        self.state.focus = FocusPane::Content;
        self.request_load(PaneSlot::Primary, self.state.list_cursor)
    }

    fn toggle_compare(&mut self) -> Action {
        if self.state.compare_visible {
            self.state.compare_visible = false;
            return Action::None;
        }
        self.request_load(PaneSlot::Compare, self.state.list_cursor)
    }

    fn toggle_layout(&mut self) {
        if !self.state.compare_visible {
            return;
        }
        self.state.layout = match self.state.layout {
            CompareLayout::SideBySide => CompareLayout::Stacked,
            CompareLayout::Stacked => CompareLayout::SideBySide,
        };
    }

    fn find_next(&mut self) {
        if self.state.search.results.select_next().is_some() {
            self.after_navigation();
        }
    }

    fn find_previous(&mut self) {
        if self.state.search.results.select_previous().is_some() {
            self.after_navigation();
        }
    }

    fn after_navigation(&mut self) {
        self.scroll_to_current_match();
        let results = &self.state.search.results;
        self.state.status =
            Status::info(format!("Result {} of {}", results.current_index() + 1, results.len()));
    }

    fn scroll_to_current_match(&mut self) {
        let Some(line) = self.state.search.results.current().map(|m| m.line) else {
            return;
        };
        let viewport = usize::from(self.state.viewport_height.max(1));
        let scroll = usize::from(self.state.scroll);
        let next = if line < scroll {
            line
        } else if line >= scroll + viewport {
            line + 1 - viewport
        } else {
            scroll
        };
        self.state.scroll = next.min(u16::MAX as usize) as u16;
    }

    fn current_highlight(&self) -> Option<Highlight> {
        let current = self.state.search.results.current()?;
        Some(Highlight { line: current.line, start: current.column, end: current.column + current.len })
    }

    pub fn render(&mut self, frame: &mut Frame<'_>) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1), Constraint::Length(1)])
            .split(frame.area());

        self.render_main(frame, chunks[0]);
        self.render_status(frame, chunks[1]);
        self.render_footer(frame, chunks[2]);

        if self.state.show_help {
            self.render_help(frame);
        }
    }

    fn main_areas(&self, area: Rect) -> (Rect, Rect, Option<Rect>) {
        if !self.state.compare_visible {
            let chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Ratio(1, 3), Constraint::Ratio(2, 3)])
                .split(area);
            return (chunks[0], chunks[1], None);
        }
        let chunks = match self.state.layout {
            CompareLayout::SideBySide => Layout::default()
                .direction(Direction::Horizontal)
                .constraints([
                    Constraint::Ratio(1, 5),
                    Constraint::Ratio(2, 5),
                    Constraint::Ratio(2, 5),
                ])
                .split(area),
            CompareLayout::Stacked => Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Ratio(1, 3),
                    Constraint::Ratio(1, 3),
                    Constraint::Ratio(1, 3),
                ])
                .split(area),
        };
        (chunks[0], chunks[1], Some(chunks[2]))
    }

    fn render_main(&mut self, frame: &mut Frame<'_>, area: Rect) {
        let (files_area, content_area, compare_area) = self.main_areas(area);
        self.render_files(frame, files_area);

        // Borders take two rows.
        self.state.viewport_height = content_area.height.saturating_sub(2);
        self.state.scroll = self.state.scroll.min(self.max_scroll());

        let focused = self.state.focus == FocusPane::Content && !self.modal_open();
        let highlight = self.current_highlight();
        self.render_pane(frame, content_area, &self.state.primary, focused, highlight);
        if let Some(compare_area) = compare_area {
            self.render_pane(frame, compare_area, &self.state.compare, false, None);
        }
    }

    fn modal_open(&self) -> bool {
        self.state.show_help
    }

    fn panel_block(&self, title: String, focused: bool) -> Block<'static> {
        let (border, title_style) = if focused {
            (Style::default().fg(Color::Green), Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
        } else {
            (Style::default().fg(Color::Gray), Style::default().add_modifier(Modifier::BOLD))
        };
        Block::default()
            .borders(Borders::ALL)
            .title(format!("─ {title} "))
            .border_style(border)
            .title_style(title_style)
    }

    fn render_files(&self, frame: &mut Frame<'_>, area: Rect) {
        let focused = self.state.focus == FocusPane::Files && !self.modal_open();
        let active = self.state.active.map(|active| active.file_index);
        let items: Vec<ListItem<'static>> = self
            .state
            .entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| {
                let style = if Some(idx) == active {
                    Style::default().fg(Color::LightGreen)
                } else {
                    Style::default()
                };
                ListItem::new(Line::styled(entry.display_path(&self.config.root), style))
            })
            .collect();

        let title = if self.state.scanning { "Files (loading)" } else { "Files" };
        let list = List::new(items)
            .block(self.panel_block(title.to_string(), focused))
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED | Modifier::BOLD));
        let mut list_state = ListState::default();
        if !self.state.entries.is_empty() {
            list_state.select(Some(self.state.list_cursor));
        }
        frame.render_stateful_widget(list, area, &mut list_state);
    }

    fn render_pane(
        &self,
        frame: &mut Frame<'_>,
        area: Rect,
        pane: &Pane,
        focused: bool,
        highlight: Option<Highlight>,
    ) {
        let block = self.panel_block(pane.title(), focused);
        let text = markup::to_text(&pane.lines, Style::default(), highlight);
        let paragraph = Paragraph::new(text).block(block).scroll((self.state.scroll, 0));
        frame.render_widget(paragraph, area);
    }

    fn render_status(&self, frame: &mut Frame<'_>, area: Rect) {
        let style = match self.state.status.kind {
            StatusKind::Info => Style::default(),
            StatusKind::Error => Style::default().fg(Color::Red),
        };
        frame.render_widget(Paragraph::new(self.state.status.text.clone()).style(style), area);
    }

    fn render_footer(&self, frame: &mut Frame<'_>, area: Rect) {
        let key_style = Style::default().fg(Color::LightBlue).add_modifier(Modifier::BOLD);
        let sep_style = Style::default().fg(Color::DarkGray);
        let mut spans: Vec<Span<'static>> = Vec::new();
        let mut push_item = |label: &'static str, key: &'static str| {
            if !spans.is_empty() {
                spans.push(Span::styled(" | ", sep_style));
            }
            spans.push(Span::styled(label, sep_style));
            spans.push(Span::raw(":"));
            spans.push(Span::styled(key, key_style));
        };

        if self.state.search.mode == SearchMode::Composing {
            push_item("Run", "Enter");
            push_item("Regex", "Ctrl+r");
            push_item("Case", "Ctrl+t");
            push_item("Cancel", "Esc");
        } else {
            push_item("Help", "F1/?/h");
            push_item("Quit", "q");
            push_item("Search", "/");
            if !self.state.search.results.is_empty() {
                push_item("Next", "n");
                push_item("Prev", "N");
            }
        }
        frame.render_widget(Paragraph::new(Line::from(spans)).alignment(Alignment::Center), area);
    }

    fn render_help(&self, frame: &mut Frame<'_>) {
        let area = centered_rect(60, 70, frame.area());
        frame.render_widget(Clear, area);
        let key_style = Style::default().fg(Color::LightBlue).add_modifier(Modifier::BOLD);
        let header_style = Style::default().fg(Color::Green).add_modifier(Modifier::BOLD);

        let key_col_width = "F1 / ? / h".len();
        let kv = |key: &str, desc: &str| -> Line<'static> {
            Line::from(vec![
                Span::styled(format!("{key:>width$}", width = key_col_width), key_style),
                Span::raw("  "),
                Span::raw(desc.to_string()),
            ])
        };

        let text = vec![
            Line::from(Span::styled("--- Shortcuts ---", header_style)),
            kv("F1 / ? / h", "Show this help"),
            kv("q / Q", "Quit"),
            kv("Arrows", "Navigate between files and content"),
            kv("Enter", "Open selected file"),
            kv("r / R", "Reload files"),
            kv("c / C", "Compare files"),
            kv("o / O", "Toggle layout"),
            kv("Tab", "Switch focus"),
            kv("PgUp/PgDn", "Scroll content by page"),
            kv("/", "Search"),
            kv("n", "Next search result"),
            kv("N", "Previous search result"),
            kv("Esc", "Cancel search"),
            Line::from(""),
            Line::from(Span::styled("--- While searching ---", header_style)),
            kv("Ctrl+r", "Toggle regex"),
            kv("Ctrl+t", "Toggle case sensitivity"),
            kv("Backspace", "Edit query"),
            Line::from(""),
            Line::from(Span::styled("Close: Esc", Style::default().fg(Color::DarkGray))),
        ];
        let paragraph = Paragraph::new(text)
            .block(self.panel_block("Help".to_string(), true))
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, area);
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

impl fmt::Debug for Tui {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tui").field("state", &self.state).finish()
    }
}
