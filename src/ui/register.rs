use crossterm::event::{KeyCode, KeyEvent};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::ui::components::form::{render_form, FormField, FormState};

const NAME: usize = 0;
const EMAIL: usize = 1;
const PASSWORD: usize = 2;

pub struct RegisterState {
    form: FormState,
}

impl RegisterState {
    pub fn new() -> Self {
        Self {
            form: FormState::new(
                "Create account",
                vec![
                    FormField::text("Name"),
                    FormField::text("Email"),
                    FormField::secret("Password"),
                ],
            ),
        }
    }
}

pub enum RegisterAction {
    Submit {
        name: String,
        email: String,
        password: String,
    },
    Missing(&'static str),
    Login,
}

pub fn render_register<B: Backend>(f: &mut Frame<B>, state: &RegisterState, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([Constraint::Length(5), Constraint::Min(3)].as_ref())
        .split(area);

    render_form(f, &state.form, chunks[0]);

    let help = Paragraph::new("Tab/Up/Down - Switch field | Enter - Create account | Esc - Back to sign in")
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::TOP));
    f.render_widget(help, chunks[1]);
}

pub fn handle_input(state: &mut RegisterState, key: KeyEvent) -> Option<RegisterAction> {
    match key.code {
        KeyCode::Esc => Some(RegisterAction::Login),
        KeyCode::Enter => Some(match state.form.missing_field() {
            Some(label) => RegisterAction::Missing(label),
            None => RegisterAction::Submit {
                name: state.form.value(NAME).trim().to_string(),
                email: state.form.value(EMAIL).trim().to_string(),
                password: state.form.value(PASSWORD).to_string(),
            },
        }),
        code => {
            state.form.handle_key(code);
            None
        }
    }
}
