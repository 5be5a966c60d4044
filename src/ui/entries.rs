use crate::app::App;
use crate::feed::FeedResult;
use crate::util::{single_line, truncate_to_width};
use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

/// Width reserved for the Published column ("Tue, 10 Jun 2025 14:30:00 GMT" + padding).
const PUBLISHED_WIDTH: u16 = 31;

/// Render the feed entry table with the feed title and entry count badge.
pub fn render(f: &mut Frame, app: &App, result: &FeedResult, area: Rect) {
    if area.width < 3 || area.height < 3 {
        return;
    }

    let badge = format!(" {} Entries ", result.total_entries());
    let title_room = (area.width as usize).saturating_sub(badge.len() + 6);
    let feed_title = single_line(&result.feed_title);
    let title = format!(" {} ", truncate_to_width(&feed_title, title_room));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(title)
        .title_top(
            Line::styled(badge, Style::default().fg(Color::Black).bg(Color::Cyan)).right_aligned(),
        );

    if result.entries.is_empty() {
        let paragraph = Paragraph::new("No entries in this feed").block(block);
        f.render_widget(paragraph, area);
        return;
    }

    let header = Row::new(["Title", "Published", "Link"])
        .style(Style::default().add_modifier(Modifier::BOLD))
        .bottom_margin(1);

    let rows = result.entries.iter().map(|entry| {
        Row::new(vec![
            Cell::from(single_line(&entry.title).into_owned()),
            Cell::from(single_line(&entry.pub_date).into_owned()),
            Cell::from(Line::styled(
                single_line(&entry.link).into_owned(),
                Style::default().fg(Color::DarkGray),
            )),
        ])
    });

    let widths = [
        Constraint::Percentage(55),
        Constraint::Length(PUBLISHED_WIDTH),
        Constraint::Fill(1),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .row_highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White))
        .highlight_symbol("> ");

    let mut state = TableState::default().with_selected(Some(app.selected));
    f.render_stateful_widget(table, area, &mut state);
}
