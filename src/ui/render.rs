//! Render functions for the TUI.
//!
//! Dispatches on the feed view state: a spinner while loading, the failure
//! message with a retry hint, or the entry table.

use crate::app::App;
use crate::feed::ViewState;
use crate::util::truncate_to_width;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use super::loop_runner::SPINNER_FRAMES;
use super::{entries, status};

/// Minimum terminal dimensions required for normal operation.
pub(super) const MIN_WIDTH: u16 = 40;
pub(super) const MIN_HEIGHT: u16 = 6;

const SPINNER: [&str; SPINNER_FRAMES] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Main render dispatch function.
pub(super) fn render(f: &mut Frame, app: &App) {
    let area = f.area();

    // Guard against zero-width/height to prevent panics
    if area.width < 1 || area.height < 1 {
        return;
    }

    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        let msg = if area.height < 3 || area.width < 20 {
            Paragraph::new("Too small")
        } else {
            Paragraph::new(format!(
                "Terminal too small\n\nMinimum: {}x{}\nCurrent: {}x{}",
                MIN_WIDTH, MIN_HEIGHT, area.width, area.height
            ))
            .alignment(Alignment::Center)
        };
        f.render_widget(msg, area);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(area);

    match app.feed.state() {
        ViewState::Loading => render_loading(f, app, chunks[0]),
        ViewState::Error(message) => render_error(f, message, chunks[0]),
        ViewState::Loaded(result) => entries::render(f, app, result, chunks[0]),
    }
    status::render(f, app, chunks[1]);
}

fn render_loading(f: &mut Frame, app: &App, area: Rect) {
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            SPINNER[app.spinner_frame % SPINNER_FRAMES],
            Style::default().fg(Color::Cyan),
        )),
        Line::from("Loading RSS Feed..."),
    ];

    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title(" headlines "));
    f.render_widget(paragraph, area);
}

fn render_error(f: &mut Frame, message: &str, area: Rect) {
    let inner_width = area.width.saturating_sub(4) as usize;
    let lines = vec![
        Line::from(Span::styled(
            "Error Fetching Feed",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(message.to_string()),
        Line::from(""),
        Line::from(Span::styled(
            truncate_to_width("Press [r] to retry", inner_width).into_owned(),
            Style::default().fg(Color::Yellow),
        )),
    ];

    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red))
                .title(" headlines "),
        );
    f.render_widget(paragraph, area);
}
