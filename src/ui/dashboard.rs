use crossterm::event::{KeyCode, KeyEvent};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use crate::directory::DashboardSummary;
use crate::models::Identity;

pub struct DashboardState {
    viewer_name: String,
    summary: Option<DashboardSummary>,
}

impl DashboardState {
    pub fn new(viewer: &Identity) -> Self {
        Self {
            viewer_name: viewer.name.clone(),
            summary: None,
        }
    }

    pub fn set_summary(&mut self, summary: DashboardSummary) {
        self.summary = Some(summary);
    }

    #[cfg(test)]
    pub fn summary(&self) -> Option<&DashboardSummary> {
        self.summary.as_ref()
    }
}

pub enum DashboardAction {
    Clients,
    NewClient,
    Supervisor,
    Refresh,
    SignOut,
    Quit,
}

pub fn render_dashboard<B: Backend>(f: &mut Frame<B>, state: &DashboardState, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Length(4),
                Constraint::Min(3),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(area);

    let greeting = Paragraph::new(format!("Welcome, {}", state.viewer_name))
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL).title("Dashboard"));
    f.render_widget(greeting, chunks[0]);

    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(chunks[1]);

    let (total, last_activity) = match &state.summary {
        Some(summary) => (
            summary.total_clients.to_string(),
            summary
                .last_activity
                .map(|at| at.format("%-d %B, %H:%M").to_string())
                .unwrap_or_else(|| "No recent activity".to_string()),
        ),
        None => ("-".to_string(), "-".to_string()),
    };

    let total_card = Paragraph::new(Span::styled(total, Style::default().add_modifier(Modifier::BOLD)))
        .block(Block::default().borders(Borders::ALL).title("Total clients"));
    f.render_widget(total_card, cards[0]);

    let activity_card = Paragraph::new(last_activity)
        .block(Block::default().borders(Borders::ALL).title("Last activity"));
    f.render_widget(activity_card, cards[1]);

    let items: Vec<ListItem> = state
        .summary
        .iter()
        .flat_map(|summary| summary.recent.iter())
        .map(|client| {
            ListItem::new(Spans::from(vec![
                Span::styled(client.full_name(), Style::default().fg(Color::Blue)),
                Span::raw("  "),
                Span::styled(
                    client.identification_number.as_str(),
                    Style::default().fg(Color::Green),
                ),
                Span::raw(format!("  {}  ", client.email)),
                Span::styled(
                    format!("Created {}", client.created_at.format("%-d %B")),
                    Style::default().fg(Color::Gray),
                ),
            ]))
        })
        .collect();

    let recent = List::new(items).block(Block::default().borders(Borders::ALL).title("Recent clients"));
    f.render_widget(recent, chunks[2]);

    let help = Paragraph::new("<C> Clients | <N> New Client | <S> Supervisor | <R> Refresh | <O> Sign out | <Q> Quit")
        .block(Block::default().borders(Borders::TOP))
        .style(Style::default().fg(Color::White));
    f.render_widget(help, chunks[3]);
}

pub fn handle_input(key: KeyEvent) -> Option<DashboardAction> {
    match key.code {
        KeyCode::Char('c') => Some(DashboardAction::Clients),
        KeyCode::Char('n') => Some(DashboardAction::NewClient),
        KeyCode::Char('s') => Some(DashboardAction::Supervisor),
        KeyCode::Char('r') => Some(DashboardAction::Refresh),
        KeyCode::Char('o') => Some(DashboardAction::SignOut),
        KeyCode::Char('q') | KeyCode::Esc => Some(DashboardAction::Quit),
        _ => None,
    }
}
