use crossterm::event::{KeyCode, KeyEvent};
use tui::{
    backend::Backend,
    layout::{Alignment, Rect},
    style::{Color, Style},
    text::Spans,
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::ui::components::popup::centered_rect;

pub enum UnauthorizedAction {
    Back,
    Quit,
}

pub fn render_unauthorized<B: Backend>(f: &mut Frame<B>, area: Rect) {
    let message = Paragraph::new(vec![
        Spans::from(""),
        Spans::from("You do not have permission to view this page."),
        Spans::from(""),
        Spans::from("<Enter> Back to dashboard | <Q> Quit"),
    ])
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true })
    .style(Style::default().fg(Color::Red))
    .block(Block::default().title("Unauthorized").borders(Borders::ALL));

    f.render_widget(message, centered_rect(60, 40, area));
}

pub fn handle_input(key: KeyEvent) -> Option<UnauthorizedAction> {
    match key.code {
        KeyCode::Enter | KeyCode::Esc => Some(UnauthorizedAction::Back),
        KeyCode::Char('q') => Some(UnauthorizedAction::Quit),
        _ => None,
    }
}
