use crossterm::event::{KeyCode, KeyEvent};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::directory::CreatorSummary;

// Per-user client counts, visible to supervisors only
pub struct SupervisorState {
    summary: Option<CreatorSummary>,
    table_state: TableState,
}

impl SupervisorState {
    pub fn new() -> Self {
        Self {
            summary: None,
            table_state: TableState::default(),
        }
    }

    pub fn set_summary(&mut self, summary: CreatorSummary) {
        if !summary.rows.is_empty() {
            self.table_state.select(Some(0));
        }
        self.summary = Some(summary);
    }

    #[cfg(test)]
    pub fn summary(&self) -> Option<&CreatorSummary> {
        self.summary.as_ref()
    }

    fn row_count(&self) -> usize {
        self.summary.as_ref().map(|s| s.rows.len()).unwrap_or(0)
    }

    pub fn next(&mut self) {
        let len = self.row_count();
        if len == 0 {
            return;
        }
        let i = self.table_state.selected().map(|i| (i + 1) % len).unwrap_or(0);
        self.table_state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.row_count();
        if len == 0 {
            return;
        }
        let i = self.table_state.selected().map(|i| (i + len - 1) % len).unwrap_or(0);
        self.table_state.select(Some(i));
    }
}

pub enum SupervisorAction {
    Back,
    Refresh,
}

pub fn render_supervisor<B: Backend>(frame: &mut Frame<B>, state: &mut SupervisorState, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)].as_ref())
        .split(area);

    let header_cells = ["Name", "Email", "Role", "Clients created"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow)));
    let header = Row::new(header_cells).height(1).bottom_margin(1);

    let rows: Vec<Row> = state
        .summary
        .iter()
        .flat_map(|summary| summary.rows.iter())
        .map(|row| {
            Row::new(vec![
                Cell::from(row.identity.name.as_str()),
                Cell::from(row.identity.email.as_str()),
                Cell::from(row.identity.role.as_str()),
                Cell::from(row.clients.to_string()),
            ])
        })
        .collect();

    let unattributed = state.summary.as_ref().map(|s| s.unattributed).unwrap_or(0);
    let title = format!("Team activity ({} clients without a known creator)", unattributed);

    let table = Table::new(rows)
        .header(header)
        .block(Block::default().title(title).borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .widths(&[
            Constraint::Percentage(30),
            Constraint::Percentage(35),
            Constraint::Percentage(15),
            Constraint::Percentage(20),
        ]);

    frame.render_stateful_widget(table, chunks[0], &mut state.table_state);

    let buttons = Paragraph::new("<Up/Down> Select | <R> Refresh | <Esc> Back")
        .block(Block::default().borders(Borders::TOP))
        .style(Style::default().fg(Color::White));
    frame.render_widget(buttons, chunks[1]);
}

pub fn handle_input(state: &mut SupervisorState, key: KeyEvent) -> Option<SupervisorAction> {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return Some(SupervisorAction::Back),
        KeyCode::Char('r') => return Some(SupervisorAction::Refresh),
        KeyCode::Down => state.next(),
        KeyCode::Up => state.previous(),
        _ => {}
    }
    None
}
