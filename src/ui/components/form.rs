use crossterm::event::KeyCode;
use tui::{
    backend::Backend,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, List, ListItem},
    Frame,
};

pub struct FormField {
    pub label: &'static str,
    pub value: String,
    pub masked: bool,
}

impl FormField {
    pub fn text(label: &'static str) -> Self {
        Self {
            label,
            value: String::new(),
            masked: false,
        }
    }

    pub fn secret(label: &'static str) -> Self {
        Self {
            masked: true,
            ..Self::text(label)
        }
    }
}

/// A vertical list of text fields with one focused field receiving input.
pub struct FormState {
    title: &'static str,
    fields: Vec<FormField>,
    current: usize,
}

impl FormState {
    pub fn new(title: &'static str, fields: Vec<FormField>) -> Self {
        Self {
            title,
            fields,
            current: 0,
        }
    }

    #[cfg(test)]
    pub fn current(&self) -> usize {
        self.current
    }

    pub fn next_field(&mut self) {
        if !self.fields.is_empty() {
            self.current = (self.current + 1) % self.fields.len();
        }
    }

    pub fn previous_field(&mut self) {
        if !self.fields.is_empty() {
            self.current = (self.current + self.fields.len() - 1) % self.fields.len();
        }
    }

    /// Apply an editing or navigation key. Returns false for keys the form
    /// does not handle.
    pub fn handle_key(&mut self, key: KeyCode) -> bool {
        match key {
            KeyCode::Tab | KeyCode::Down => self.next_field(),
            KeyCode::BackTab | KeyCode::Up => self.previous_field(),
            KeyCode::Char(c) => {
                if let Some(field) = self.fields.get_mut(self.current) {
                    field.value.push(c);
                }
            }
            KeyCode::Backspace => {
                if let Some(field) = self.fields.get_mut(self.current) {
                    field.value.pop();
                }
            }
            _ => return false,
        }
        true
    }

    pub fn value(&self, index: usize) -> &str {
        self.fields.get(index).map(|f| f.value.as_str()).unwrap_or("")
    }

    #[cfg(test)]
    pub fn set_value(&mut self, index: usize, value: &str) {
        if let Some(field) = self.fields.get_mut(index) {
            field.value = value.to_string();
        }
    }

    /// Label of the first blank field.
    pub fn missing_field(&self) -> Option<&'static str> {
        self.fields
            .iter()
            .find(|f| f.value.trim().is_empty())
            .map(|f| f.label)
    }
}

pub fn render_form<B: Backend>(f: &mut Frame<B>, state: &FormState, area: Rect) {
    let items: Vec<ListItem> = state
        .fields
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let shown = if field.masked {
                "*".repeat(field.value.chars().count())
            } else {
                field.value.clone()
            };

            let content = if i == state.current {
                Spans::from(vec![
                    Span::styled(format!("{}: ", field.label), Style::default().fg(Color::Yellow)),
                    Span::styled(format!("{}|", shown), Style::default().add_modifier(Modifier::BOLD)),
                ])
            } else {
                Spans::from(vec![Span::raw(format!("{}: ", field.label)), Span::raw(shown)])
            };

            ListItem::new(content)
        })
        .collect();

    let form_list = List::new(items).block(Block::default().borders(Borders::ALL).title(state.title));
    f.render_widget(form_list, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> FormState {
        FormState::new(
            "Test",
            vec![FormField::text("Email"), FormField::secret("Password")],
        )
    }

    #[test]
    fn typing_goes_to_focused_field() {
        let mut state = form();
        for c in "ana@x".chars() {
            state.handle_key(KeyCode::Char(c));
        }
        state.handle_key(KeyCode::Backspace);
        state.handle_key(KeyCode::Tab);
        state.handle_key(KeyCode::Char('p'));

        assert_eq!(state.value(0), "ana@");
        assert_eq!(state.value(1), "p");
    }

    #[test]
    fn navigation_wraps_both_ways() {
        let mut state = form();
        state.previous_field();
        assert_eq!(state.current(), 1);
        state.next_field();
        assert_eq!(state.current(), 0);
        assert!(!state.handle_key(KeyCode::Enter));
    }

    #[test]
    fn missing_field_reports_first_blank() {
        let mut state = form();
        assert_eq!(state.missing_field(), Some("Email"));
        state.set_value(0, "ana@example.com");
        state.set_value(1, "  ");
        assert_eq!(state.missing_field(), Some("Password"));
        state.set_value(1, "pw");
        assert_eq!(state.missing_field(), None);
    }
}
