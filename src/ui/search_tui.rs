use crate::api_client::{ApiClient, ApiError, SearchCriteria};
use crate::config::config::Config;
use crate::ui::json_tree::{JsonTree, TreeRow};
use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame, Terminal,
};
use serde_json::Value;
use std::io;
use tui_input::{backend::crossterm::EventHandler, Input};

/// Rows jumped by PageUp/PageDown in the response viewer
const PAGE_SIZE: usize = 10;

/// Longest status line before truncation
const STATUS_MAX: usize = 200;

#[derive(Clone, Copy, PartialEq)]
enum AppMode {
    Edit,
    Results,
}

#[derive(Clone, Copy, PartialEq)]
enum Focus {
    Condition,
    OverallStatus,
    Location,
    SearchButton,
}

impl Focus {
    fn next(self) -> Self {
        match self {
            Focus::Condition => Focus::OverallStatus,
            Focus::OverallStatus => Focus::Location,
            Focus::Location => Focus::SearchButton,
            Focus::SearchButton => Focus::Condition,
        }
    }

    fn prev(self) -> Self {
        match self {
            Focus::Condition => Focus::SearchButton,
            Focus::OverallStatus => Focus::Condition,
            Focus::Location => Focus::OverallStatus,
            Focus::SearchButton => Focus::Location,
        }
    }
}

pub struct SearchTui {
    api_client: ApiClient,
    condition: Input,
    overall_status: Input,
    location: Input,
    focus: Focus,
    mode: AppMode,
    /// Criteria echoed above the response, captured at activation time
    submitted: Option<SearchCriteria>,
    tree: Option<JsonTree>,
    status_message: String,
    show_help: bool,
    show_help_hint: bool,
    expand_depth: usize,
}

impl SearchTui {
    pub fn new(base_url: &str, config: &Config) -> Result<Self> {
        let api_client = ApiClient::with_timeout(base_url, config.api.timeout())?;
        Ok(Self {
            api_client,
            condition: Input::from(config.defaults.condition.clone()),
            overall_status: Input::from(config.defaults.overall_status.clone()),
            location: Input::from(config.defaults.location.clone()),
            focus: Focus::Condition,
            mode: AppMode::Edit,
            submitted: None,
            tree: None,
            status_message: "Ready - Edit the filters and press Enter to search".to_string(),
            show_help: false,
            show_help_hint: config.display.show_help_hint,
            expand_depth: config.display.expand_depth,
        })
    }

    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        loop {
            terminal.draw(|f| self.ui(f))?;

            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Esc => {
                        if self.show_help {
                            self.show_help = false;
                        } else if self.mode == AppMode::Results {
                            self.mode = AppMode::Edit;
                        } else {
                            break; // Exit app
                        }
                    }
                    KeyCode::F(1) => {
                        self.show_help = !self.show_help;
                    }
                    KeyCode::Enter => match self.mode {
                        AppMode::Edit => self.execute_search(),
                        AppMode::Results => {
                            if let Some(tree) = &mut self.tree {
                                tree.toggle_selected();
                            }
                        }
                    },
                    _ => match self.mode {
                        AppMode::Edit => self.handle_edit_key(key),
                        AppMode::Results => self.handle_results_key(key),
                    },
                }
            }
        }
        Ok(())
    }

    fn handle_edit_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Tab | KeyCode::Down => self.focus = self.focus.next(),
            KeyCode::BackTab | KeyCode::Up => self.focus = self.focus.prev(),
            _ => {
                let idle = "Ready - Edit the filters and press Enter to search";
                let input = match self.focus {
                    Focus::Condition => &mut self.condition,
                    Focus::OverallStatus => &mut self.overall_status,
                    Focus::Location => &mut self.location,
                    Focus::SearchButton => return,
                };
                let changed = input
                    .handle_event(&Event::Key(key))
                    .map(|state| state.value)
                    .unwrap_or(false);
                if changed {
                    // Field edits put the shell back into its idle state
                    self.status_message = idle.to_string();
                }
            }
        }
    }

    fn handle_results_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Tab {
            self.mode = AppMode::Edit;
            return;
        }
        if key.code == KeyCode::Char('y') {
            self.yank_selected();
            return;
        }
        let Some(tree) = &mut self.tree else {
            return;
        };
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => tree.select_prev(),
            KeyCode::Down | KeyCode::Char('j') => tree.select_next(),
            KeyCode::PageUp => tree.select_page_up(PAGE_SIZE),
            KeyCode::PageDown => tree.select_page_down(PAGE_SIZE),
            KeyCode::Home => tree.select_first(),
            KeyCode::End => tree.select_last(),
            KeyCode::Char(' ') => tree.toggle_selected(),
            KeyCode::Right => tree.expand_selected(),
            KeyCode::Left => tree.collapse_selected(),
            _ => {}
        }
    }

    /// One activation: read the current field values verbatim, block on the
    /// request, then either show the response or surface the failure.
    fn execute_search(&mut self) {
        let criteria = SearchCriteria::new(
            self.condition.value(),
            self.overall_status.value(),
            self.location.value(),
        );
        self.status_message = "Searching...".to_string();
        tracing::info!(target: "ui", "search activated");

        match self.api_client.fetch_studies(&criteria) {
            Ok(document) => {
                let tree = JsonTree::new(document, self.expand_depth);
                self.status_message = format!("Search complete - {} nodes", tree.len());
                self.tree = Some(tree);
                self.submitted = Some(criteria);
                self.mode = AppMode::Results;
            }
            Err(err @ ApiError::Http { .. }) => {
                self.clear_results();
                self.status_message = truncate_status(&err.to_string());
            }
            Err(err) => {
                self.clear_results();
                self.status_message = truncate_status(&format!("Error: {}", err));
            }
        }
    }

    /// No partial output: a failed activation removes any earlier response.
    fn clear_results(&mut self) {
        self.tree = None;
        self.submitted = None;
        self.mode = AppMode::Edit;
    }

    fn yank_selected(&mut self) {
        let Some(value) = self.tree.as_ref().and_then(|tree| tree.selected_value()) else {
            return;
        };
        let text = match value {
            Value::String(s) => s.clone(),
            other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
        };
        match arboard::Clipboard::new().and_then(|mut clipboard| clipboard.set_text(text)) {
            Ok(()) => self.status_message = "Copied value to clipboard".to_string(),
            Err(e) => self.status_message = format!("Clipboard error: {}", e),
        }
    }

    fn ui(&self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Condition field
                Constraint::Length(3), // Overall status field
                Constraint::Length(3), // Location field
                Constraint::Length(1), // Search control
                Constraint::Min(5),    // Results area
                Constraint::Length(1), // Status bar
            ])
            .split(f.area());

        self.render_field(
            f,
            chunks[0],
            "Condition (query.cond)",
            &self.condition,
            Focus::Condition,
        );
        self.render_field(
            f,
            chunks[1],
            "Overall Status (filter.overallStatus)",
            &self.overall_status,
            Focus::OverallStatus,
        );
        self.render_field(
            f,
            chunks[2],
            "Location (query.locn)",
            &self.location,
            Focus::Location,
        );
        self.render_search_button(f, chunks[3]);
        self.render_results(f, chunks[4]);
        self.render_status_bar(f, chunks[5]);

        if self.show_help {
            self.render_help_popup(f);
        }
    }

    fn render_field(&self, f: &mut Frame, area: Rect, title: &str, input: &Input, slot: Focus) {
        let focused = self.mode == AppMode::Edit && self.focus == slot;
        let style = if focused {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::Gray)
        };

        let paragraph = Paragraph::new(input.value())
            .block(Block::default().borders(Borders::ALL).title(title))
            .style(style);
        f.render_widget(paragraph, area);

        if focused {
            f.set_cursor_position((
                area.x + input.visual_cursor() as u16 + 1,
                area.y + 1,
            ));
        }
    }

    fn render_search_button(&self, f: &mut Frame, area: Rect) {
        let focused = self.mode == AppMode::Edit && self.focus == Focus::SearchButton;
        let style = if focused {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Yellow)
        };

        let button = Paragraph::new(Line::from(Span::styled("[ Search ]", style)))
            .alignment(Alignment::Center);
        f.render_widget(button, area);
    }

    fn render_results(&self, f: &mut Frame, area: Rect) {
        let (Some(criteria), Some(tree)) = (&self.submitted, &self.tree) else {
            self.render_placeholder(f, area);
            return;
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(5), Constraint::Min(3)])
            .split(area);

        // Echo of the submitted parameters, as sent on the wire
        let echo_lines: Vec<Line> = criteria
            .echo_pairs()
            .into_iter()
            .map(|(key, value)| {
                Line::from(vec![
                    Span::styled(format!("{}: ", key), Style::default().fg(Color::Cyan)),
                    Span::raw(value),
                ])
            })
            .collect();
        let echo = Paragraph::new(echo_lines).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Search Parameters"),
        );
        f.render_widget(echo, chunks[0]);

        let items: Vec<ListItem> = tree.rows().iter().map(tree_row_to_item).collect();
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(format!(
                "Response ({} nodes) - Enter/Space=fold, y=yank, Esc=back to filters",
                tree.len()
            )))
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol(">> ");

        let mut state = ListState::default();
        state.select(Some(tree.selected()));
        f.render_stateful_widget(list, chunks[1], &mut state);
    }

    fn render_placeholder(&self, f: &mut Frame, area: Rect) {
        let help_text = vec![
            Line::from("Edit the three filters above and press Enter to search"),
            Line::from(""),
            Line::from("The filters map straight onto the registry query:"),
            Line::from("  Condition      -> query.cond"),
            Line::from("  Overall Status -> filter.overallStatus"),
            Line::from("  Location       -> query.locn"),
            Line::from(""),
            Line::from("Controls:"),
            Line::from("  Tab/Shift+Tab - Move between fields"),
            Line::from("  Enter         - Search"),
            Line::from("  F1            - Toggle help"),
            Line::from("  Esc           - Exit"),
        ];

        let placeholder = Paragraph::new(help_text)
            .block(Block::default().borders(Borders::ALL).title("Results"))
            .wrap(ratatui::widgets::Wrap { trim: true });
        f.render_widget(placeholder, area);
    }

    fn render_status_bar(&self, f: &mut Frame, area: Rect) {
        let mut spans = vec![
            Span::styled(&self.status_message, Style::default().fg(Color::White)),
            Span::raw(" | "),
            Span::styled(
                match self.mode {
                    AppMode::Edit => "EDIT",
                    AppMode::Results => "VIEW",
                },
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
        ];
        if self.show_help_hint {
            spans.push(Span::raw(" | F1=Help | Esc=Back/Exit"));
        }

        let status = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
        f.render_widget(status, area);
    }

    fn render_help_popup(&self, f: &mut Frame) {
        let area = centered_rect(70, 60, f.area());
        f.render_widget(Clear, area);

        let help_text = vec![
            Line::from(vec![Span::styled(
                "trials-cli Help",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )]),
            Line::from(""),
            Line::from("Filter Mode:"),
            Line::from("  Tab/Down     - Next field"),
            Line::from("  Shift+Tab/Up - Previous field"),
            Line::from("  Enter        - Run the search"),
            Line::from("  Esc          - Exit application"),
            Line::from(""),
            Line::from("Response Mode:"),
            Line::from("  Up/Down, j/k - Move selection"),
            Line::from("  Enter/Space  - Fold/unfold the selected node"),
            Line::from("  Right/Left   - Expand / collapse (or jump to parent)"),
            Line::from("  PgUp/PgDn    - Page through rows"),
            Line::from("  Home/End     - First / last row"),
            Line::from("  y            - Copy the selected value"),
            Line::from("  Esc          - Back to the filters"),
            Line::from(""),
            Line::from("Global:"),
            Line::from("  F1           - Toggle this help"),
        ];

        let help_popup = Paragraph::new(help_text)
            .block(Block::default().borders(Borders::ALL).title("Help"))
            .wrap(ratatui::widgets::Wrap { trim: true });

        f.render_widget(help_popup, area);
    }
}

fn tree_row_to_item(row: &TreeRow) -> ListItem<'_> {
    let marker = if !row.has_children {
        "  "
    } else if row.expanded {
        "- "
    } else {
        "+ "
    };

    let mut spans = vec![
        Span::raw("  ".repeat(row.depth)),
        Span::styled(marker, Style::default().fg(Color::Yellow)),
    ];
    let label = row.label.as_deref().unwrap_or("$");
    spans.push(Span::styled(
        format!("{}: ", label),
        Style::default().fg(Color::Cyan),
    ));
    let preview_style = if row.has_children || row.preview == "null" {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default()
    };
    spans.push(Span::styled(row.preview.as_str(), preview_style));

    ListItem::new(Line::from(spans))
}

fn truncate_status(message: &str) -> String {
    let single_line = message.replace(['\r', '\n'], " ");
    if single_line.chars().count() > STATUS_MAX {
        let truncated: String = single_line.chars().take(STATUS_MAX).collect();
        format!("{}...", truncated)
    } else {
        single_line
    }
}

// Helper function to create a centered rect
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

pub fn run_search_tui(base_url: &str, config: &Config) -> Result<()> {
    // Client setup must not fail after raw mode is enabled
    let mut app = SearchTui::new(base_url, config)?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = app.run(&mut terminal);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn focus_cycles_through_all_controls_and_wraps() {
        let mut focus = Focus::Condition;
        for _ in 0..4 {
            focus = focus.next();
        }
        assert!(focus == Focus::Condition);

        assert!(Focus::Condition.prev() == Focus::SearchButton);
        assert!(Focus::SearchButton.next() == Focus::Condition);
    }

    #[test]
    fn status_truncation_flattens_newlines_and_caps_length() {
        let long = format!("HTTP Error: 500: {}", "x\n".repeat(300));
        let status = truncate_status(&long);
        assert!(!status.contains('\n'));
        assert!(status.chars().count() <= STATUS_MAX + 3);
        assert!(status.ends_with("..."));
    }
}
