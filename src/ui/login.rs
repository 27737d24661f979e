use crossterm::event::{KeyCode, KeyEvent};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::ui::components::form::{render_form, FormField, FormState};

const EMAIL: usize = 0;
const PASSWORD: usize = 1;

pub struct LoginState {
    form: FormState,
}

impl LoginState {
    pub fn new() -> Self {
        Self {
            form: FormState::new(
                "Sign in",
                vec![FormField::text("Email"), FormField::secret("Password")],
            ),
        }
    }
}

pub enum LoginAction {
    Submit { email: String, password: String },
    Missing(&'static str),
    Register,
    Quit,
}

pub fn render_login<B: Backend>(f: &mut Frame<B>, state: &LoginState, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([Constraint::Length(4), Constraint::Min(3)].as_ref())
        .split(area);

    render_form(f, &state.form, chunks[0]);

    let help = Paragraph::new("Tab/Up/Down - Switch field | Enter - Sign in | F2 - Create account | Esc - Quit")
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::TOP));
    f.render_widget(help, chunks[1]);
}

pub fn handle_input(state: &mut LoginState, key: KeyEvent) -> Option<LoginAction> {
    match key.code {
        KeyCode::Esc => Some(LoginAction::Quit),
        KeyCode::F(2) => Some(LoginAction::Register),
        KeyCode::Enter => Some(match state.form.missing_field() {
            Some(label) => LoginAction::Missing(label),
            None => LoginAction::Submit {
                email: state.form.value(EMAIL).to_string(),
                password: state.form.value(PASSWORD).to_string(),
            },
        }),
        code => {
            state.form.handle_key(code);
            None
        }
    }
}
