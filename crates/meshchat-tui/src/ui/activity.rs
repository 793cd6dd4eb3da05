//! Activity panel
//!
//! Nodes recently heard advertising and the notification log, newest first.
//! Only shown on wide terminals.

use chrono::{Local, TimeZone};
use meshchat_app::{App, LogLevel};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
};

use super::chat::clock;

/// Narrowest terminal that still gets the panel.
pub const MIN_TERMINAL_WIDTH: u16 = 100;

/// Whether the terminal is wide enough for the panel.
pub fn fits(app: &App) -> bool {
    app.terminal_size().0 >= MIN_TERMINAL_WIDTH
}

/// Build the panel lines: heard adverts, then the log, at most `limit`.
pub fn lines<Tz: TimeZone>(app: &App, limit: usize, tz: &Tz) -> Vec<Line<'static>>
where
    Tz::Offset: std::fmt::Display,
{
    let header = Style::default().fg(Color::DarkGray).add_modifier(Modifier::BOLD);
    let dim = Style::default().fg(Color::DarkGray);
    let mut lines = Vec::new();

    if app.adverts().next().is_some() {
        lines.push(Line::from(Span::styled("Heard", header)));
        for advert in app.adverts().rev() {
            lines.push(Line::from(vec![
                Span::styled(format!("{} ", clock(advert.heard_at, tz)), dim),
                Span::raw(advert.source.clone()),
            ]));
        }
    }

    if app.log().next().is_some() {
        lines.push(Line::from(Span::styled("Log", header)));
        for entry in app.log().rev() {
            let style = match entry.level {
                LogLevel::Info => Style::default(),
                LogLevel::Error => Style::default().fg(Color::LightRed),
            };
            lines.push(Line::from(Span::styled(entry.text.clone(), style)));
        }
    }

    lines.truncate(limit);
    lines
}

/// Render the activity panel.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let limit = usize::from(area.height.saturating_sub(2));
    let items: Vec<ListItem> = lines(app, limit, &Local).into_iter().map(ListItem::new).collect();
    let block = Block::default().borders(Borders::ALL).title(" Activity ");

    frame.render_widget(List::new(items).block(block), area);
}
