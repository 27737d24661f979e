pub mod components;
pub mod notice;
pub mod login;
pub mod register;
pub mod dashboard;
pub mod clients;
pub mod client_wizard;
pub mod supervisor;
pub mod unauthorized;

use tui::{
    backend::Backend,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::models::Identity;
use crate::routes::Route;
use crate::ui::notice::Notice;

pub fn render_header<B: Backend>(f: &mut Frame<B>, area: Rect, route: Route, identity: Option<&Identity>) {
    let mut spans = vec![
        Span::styled("Client Manager", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw(format!("  {} ({})  ", route.title(), route.path())),
    ];
    if let Some(identity) = identity {
        spans.push(Span::styled(
            format!("{} <{}> [{}]", identity.name, identity.email, identity.role),
            Style::default().fg(Color::Gray),
        ));
    }

    let header = Paragraph::new(Spans::from(spans)).block(Block::default().borders(Borders::BOTTOM));
    f.render_widget(header, area);
}

pub fn render_footer<B: Backend>(f: &mut Frame<B>, area: Rect, notice: Option<&Notice>) {
    let footer = match notice {
        Some(notice) => Paragraph::new(notice.message.as_str()).style(notice.style()),
        None => Paragraph::new("Ctrl-C - Quit").style(Style::default().fg(Color::DarkGray)),
    };
    f.render_widget(footer.block(Block::default().borders(Borders::TOP)), area);
}

/// Shown while the session has not resolved yet.
pub fn render_loading<B: Backend>(f: &mut Frame<B>, area: Rect) {
    let placeholder = Paragraph::new("Loading...")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Blue));
    f.render_widget(placeholder, area);
}
