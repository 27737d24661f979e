use crossterm::event::{KeyCode, KeyEvent};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame,
};
use uuid::Uuid;

use crate::models::Client;
use crate::ui::components::popup::centered_rect;

// Represents the state of the client list screen
pub struct ClientsState {
    clients: Vec<Client>,
    list_state: ListState,
    show_delete_confirmation: bool,
}

impl ClientsState {
    pub fn new(clients: Vec<Client>) -> Self {
        let mut state = Self {
            clients: Vec::new(),
            list_state: ListState::default(),
            show_delete_confirmation: false,
        };
        state.replace(clients);
        state
    }

    /// Swap in a freshly loaded list, keeping the selection index in range.
    pub fn replace(&mut self, clients: Vec<Client>) {
        let selected = self.list_state.selected().unwrap_or(0);
        self.clients = clients;
        if self.clients.is_empty() {
            self.list_state.select(None);
        } else {
            self.list_state.select(Some(selected.min(self.clients.len() - 1)));
        }
    }

    #[cfg(test)]
    pub fn clients(&self) -> &[Client] {
        &self.clients
    }

    pub fn next(&mut self) {
        if self.clients.is_empty() {
            return;
        }

        let i = match self.list_state.selected() {
            Some(i) => {
                if i >= self.clients.len() - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn previous(&mut self) {
        if self.clients.is_empty() {
            return;
        }

        let i = match self.list_state.selected() {
            Some(i) => {
                if i == 0 {
                    self.clients.len() - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn toggle_delete_confirmation(&mut self) {
        self.show_delete_confirmation = !self.show_delete_confirmation;
    }

    pub fn selected_client(&self) -> Option<&Client> {
        self.list_state.selected().and_then(|i| self.clients.get(i))
    }

    pub fn selected_client_id(&self) -> Option<Uuid> {
        self.selected_client().map(|c| c.id)
    }
}

pub enum ClientAction {
    Back,
    NewClient,
    DeleteClient(Uuid),
    Refresh,
}

pub fn render_clients<B: Backend>(frame: &mut Frame<B>, state: &mut ClientsState, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(3)].as_ref())
        .split(area);

    let items: Vec<ListItem> = state
        .clients
        .iter()
        .map(|client| {
            ListItem::new(vec![
                Spans::from(vec![
                    Span::styled(client.full_name(), Style::default().add_modifier(Modifier::BOLD)),
                    Span::raw(format!("  ID: {}", client.identification_number)),
                ]),
                Spans::from(format!(
                    "  {} | {} | Created {}",
                    client.email,
                    client.phone,
                    client.created_at.format("%-d %B %Y")
                )),
                Spans::from(format!("  Address: {}", client.address)),
            ])
        })
        .collect();

    let title = format!("Clients ({})", state.clients.len());
    let clients_list = List::new(items)
        .block(Block::default().title(title).borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        );

    frame.render_stateful_widget(clients_list, chunks[0], &mut state.list_state);

    let buttons_text = if state.selected_client().is_some() {
        "<N> New Client | <D> Delete Client | <R> Refresh | <Esc> Back"
    } else {
        "<N> New Client | <R> Refresh | <Esc> Back"
    };

    let buttons = Paragraph::new(buttons_text)
        .block(Block::default().borders(Borders::TOP))
        .style(Style::default().fg(Color::White));

    frame.render_widget(buttons, chunks[1]);

    if state.show_delete_confirmation {
        render_delete_confirmation(frame, area, state.selected_client());
    }
}

fn render_delete_confirmation<B: Backend>(frame: &mut Frame<B>, area: Rect, client: Option<&Client>) {
    let popup_area = centered_rect(50, 30, area);
    let name = client.map(Client::full_name).unwrap_or_default();

    let popup = Paragraph::new(vec![
        Spans::from(""),
        Spans::from("Are you sure you want to delete this client?"),
        Spans::from(""),
        Spans::from(name),
        Spans::from(""),
        Spans::from("<Y> Yes  <N> No"),
    ])
    .block(Block::default().title("Confirm Delete").borders(Borders::ALL))
    .style(Style::default().fg(Color::White).bg(Color::Black));

    frame.render_widget(Clear, popup_area);
    frame.render_widget(popup, popup_area);
}

pub fn handle_input(state: &mut ClientsState, key: KeyEvent) -> Option<ClientAction> {
    if state.show_delete_confirmation {
        match key.code {
            KeyCode::Char('y') => {
                state.toggle_delete_confirmation();
                return state.selected_client_id().map(ClientAction::DeleteClient);
            }
            KeyCode::Char('n') | KeyCode::Esc => state.toggle_delete_confirmation(),
            _ => {}
        }
        return None;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return Some(ClientAction::Back),
        KeyCode::Char('n') => return Some(ClientAction::NewClient),
        KeyCode::Char('r') => return Some(ClientAction::Refresh),
        KeyCode::Char('d') => {
            if state.selected_client().is_some() {
                state.toggle_delete_confirmation();
            }
        }
        KeyCode::Down => state.next(),
        KeyCode::Up => state.previous(),
        _ => {}
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crossterm::event::KeyModifiers;

    fn client(id: &str) -> Client {
        Client {
            id: Uuid::new_v4(),
            identification_number: id.to_string(),
            first_name: "Ana".to_string(),
            last_name: "Ruiz".to_string(),
            email: "ana@example.com".to_string(),
            phone: "555".to_string(),
            address: "Somewhere".to_string(),
            created_at: Utc::now(),
            created_by: Uuid::new_v4(),
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn delete_requires_confirmation() {
        let mut state = ClientsState::new(vec![client("A"), client("B")]);
        state.next();
        let target = state.selected_client_id().unwrap();

        assert!(handle_input(&mut state, key(KeyCode::Char('d'))).is_none());
        assert!(handle_input(&mut state, key(KeyCode::Char('n'))).is_none());
        assert!(handle_input(&mut state, key(KeyCode::Char('d'))).is_none());

        match handle_input(&mut state, key(KeyCode::Char('y'))) {
            Some(ClientAction::DeleteClient(id)) => assert_eq!(id, target),
            _ => panic!("expected a delete action"),
        }
    }

    #[test]
    fn delete_ignored_on_empty_list() {
        let mut state = ClientsState::new(Vec::new());
        assert!(handle_input(&mut state, key(KeyCode::Char('d'))).is_none());
        assert!(handle_input(&mut state, key(KeyCode::Char('y'))).is_none());
    }

    #[test]
    fn replace_clamps_selection() {
        let mut state = ClientsState::new(vec![client("A"), client("B"), client("C")]);
        state.previous();
        assert_eq!(state.selected_client().unwrap().identification_number, "C");

        state.replace(vec![client("X")]);
        assert_eq!(state.selected_client().unwrap().identification_number, "X");

        state.replace(Vec::new());
        assert!(state.selected_client().is_none());
    }
}
