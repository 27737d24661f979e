use crossterm::event::{KeyCode, KeyEvent};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::models::{ClientDraft, Identity};
use crate::ui::components::form::{render_form, FormField, FormState};

pub enum ClientWizardAction {
    Cancel,
    Missing(&'static str),
    Save(ClientDraft),
}

pub struct ClientWizardState {
    actor_name: String,
    form: FormState,
}

impl ClientWizardState {
    pub fn new(actor: &Identity) -> Self {
        Self {
            actor_name: actor.name.clone(),
            form: FormState::new(
                "Client Details",
                vec![
                    FormField::text("Identification number"),
                    FormField::text("First name"),
                    FormField::text("Last name"),
                    FormField::text("Email"),
                    FormField::text("Phone"),
                    FormField::text("Address"),
                ],
            ),
        }
    }

    pub fn draft(&self) -> ClientDraft {
        ClientDraft {
            identification_number: self.form.value(0).to_string(),
            first_name: self.form.value(1).to_string(),
            last_name: self.form.value(2).to_string(),
            email: self.form.value(3).to_string(),
            phone: self.form.value(4).to_string(),
            address: self.form.value(5).to_string(),
        }
    }

    #[cfg(test)]
    pub fn form_mut(&mut self) -> &mut FormState {
        &mut self.form
    }
}

pub fn render_client_wizard<B: Backend>(f: &mut Frame<B>, state: &ClientWizardState, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Length(8),
                Constraint::Min(3),
            ]
            .as_ref(),
        )
        .split(area);

    let title = Paragraph::new(format!("New client (recorded as created by {})", state.actor_name))
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    render_form(f, &state.form, chunks[1]);

    let help = Paragraph::new("Tab/Up/Down - Switch field | Enter - Create client | Esc - Cancel")
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, chunks[2]);
}

pub fn handle_input(state: &mut ClientWizardState, key: KeyEvent) -> Option<ClientWizardAction> {
    match key.code {
        KeyCode::Esc => Some(ClientWizardAction::Cancel),
        KeyCode::Enter => Some(match state.form.missing_field() {
            Some(label) => ClientWizardAction::Missing(label),
            None => ClientWizardAction::Save(state.draft()),
        }),
        code => {
            state.form.handle_key(code);
            None
        }
    }
}
