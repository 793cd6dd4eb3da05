//! Chat area
//!
//! Displays messages for the current view: every conversation merged, or a
//! single one.

use chrono::{DateTime, Local, TimeZone, Utc};
use meshchat_app::{App, View};
use meshchat_core::{DeliveryState, Message, Timestamp, text::render_mentions};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
};

const BORDER_SIZE: u16 = 2;
const SELF_AUTHOR: &str = "me";

/// Format a message as one line.
///
/// `tag` prefixes the conversation name, used by the unified view.
pub fn message_line<Tz: TimeZone>(message: &Message, tag: bool, tz: &Tz) -> Line<'static>
where
    Tz::Offset: std::fmt::Display,
{
    let mut spans = vec![Span::styled(clock(message.timestamp, tz), Style::default().fg(Color::DarkGray))];

    if tag {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(message.conversation.to_string(), Style::default().fg(Color::Cyan)));
    }

    let (author, author_style) = if message.is_outbound() {
        (SELF_AUTHOR.to_string(), Style::default().fg(Color::Yellow))
    } else {
        (message.author.clone(), Style::default().fg(Color::Green))
    };
    spans.push(Span::raw(" "));
    spans.push(Span::styled(format!("<{author}>"), author_style.add_modifier(Modifier::BOLD)));
    spans.push(Span::raw(" "));
    spans.push(Span::raw(render_mentions(&message.body).into_owned()));

    if message.is_outbound() {
        let (marker, color) = delivery_marker(message.delivery);
        spans.push(Span::styled(format!(" {marker}"), Style::default().fg(color)));
    }
    Line::from(spans)
}

fn delivery_marker(state: DeliveryState) -> (&'static str, Color) {
    match state {
        DeliveryState::Pending => ("…", Color::DarkGray),
        DeliveryState::Sent => ("✓", Color::DarkGray),
        DeliveryState::Acked => ("✓✓", Color::Green),
        DeliveryState::Failed => ("✗", Color::Red),
    }
}

pub(super) fn clock<Tz: TimeZone>(at: Timestamp, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    i64::try_from(at.as_millis())
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map_or_else(|| "--:--".to_string(), |time| time.with_timezone(tz).format("%H:%M").to_string())
}

/// Render the chat area.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let title = match app.view() {
        View::Unified => " All conversations ".to_string(),
        View::Conversation(id) => format!(" {id} "),
    };
    let block = Block::default().borders(Borders::ALL).title(title);

    let visible_height = area.height.saturating_sub(BORDER_SIZE) as usize;
    let messages = app.visible_messages(visible_height);
    let tag = matches!(app.view(), View::Unified);

    let items: Vec<ListItem> = if messages.is_empty() {
        vec![ListItem::new(Line::from(Span::styled(
            "No messages yet. Type `<destination> <text>` or `join <channel>`",
            Style::default().fg(Color::DarkGray),
        )))]
    } else {
        messages.into_iter().map(|m| ListItem::new(message_line(m, tag, &Local))).collect()
    };

    frame.render_widget(List::new(items).block(block), area);
}
