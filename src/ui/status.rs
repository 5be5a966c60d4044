use crate::app::App;
use crate::feed::ViewState;
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    widgets::Paragraph,
    Frame,
};
use std::borrow::Cow;

/// Render the status bar
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    if area.width < 1 || area.height < 1 {
        return;
    }

    // Cow avoids allocating for the static hints
    let text: Cow<'_, str> = if let Some((msg, _)) = &app.status_message {
        Cow::Borrowed(msg.as_str())
    } else {
        match app.feed.state() {
            ViewState::Loading => Cow::Borrowed("Loading... [q]uit"),
            ViewState::Error(_) => Cow::Borrowed("[r]etry [q]uit"),
            ViewState::Loaded(_) => match app.selected_entry() {
                Some(entry) if !entry.link.is_empty() => Cow::Owned(format!(
                    "[j/k]move [o]pen [r]efresh [q]uit | {}",
                    entry.link
                )),
                _ => Cow::Borrowed("[j/k]move [o]pen [r]efresh [q]uit"),
            },
        }
    };

    let style = Style::default().bg(Color::DarkGray).fg(Color::White);

    let paragraph = Paragraph::new(text).style(style);
    f.render_widget(paragraph, area);
}
