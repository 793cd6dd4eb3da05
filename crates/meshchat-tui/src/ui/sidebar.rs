//! Conversation sidebar
//!
//! Channels and contacts listed separately, with unread counts.

use meshchat_app::{App, View};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
};

const ACTIVE_PREFIX: &str = ">";
const INACTIVE_PREFIX: &str = " ";

/// Build the sidebar lines: an "All" entry, then channels, then contacts.
pub fn lines(app: &App) -> Vec<Line<'static>> {
    let header = Style::default().fg(Color::DarkGray).add_modifier(Modifier::BOLD);
    let mut lines = vec![entry(app.view() == &View::Unified, "All".to_string(), 0)];

    let (channels, contacts): (Vec<_>, Vec<_>) =
        app.session().store().conversations().partition(|c| c.id.is_channel());

    for (title, group) in [("Channels", channels), ("Contacts", contacts)] {
        if group.is_empty() {
            continue;
        }
        lines.push(Line::from(Span::styled(title, header)));
        for conversation in group {
            let active = app.view().shows(&conversation.id) && app.view() != &View::Unified;
            lines.push(entry(active, conversation.id.to_string(), app.unread_count(&conversation.id)));
        }
    }
    lines
}

fn entry(active: bool, name: String, unread: usize) -> Line<'static> {
    let (prefix, style) = if active {
        (ACTIVE_PREFIX, Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    } else if unread > 0 {
        (INACTIVE_PREFIX, Style::default().fg(Color::Cyan))
    } else {
        (INACTIVE_PREFIX, Style::default())
    };

    let mut spans = vec![Span::raw(prefix), Span::styled(name, style)];
    if unread > 0 {
        spans.push(Span::styled(format!(" ({unread})"), Style::default().fg(Color::Red)));
    }
    Line::from(spans)
}

/// Render the sidebar.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = lines(app).into_iter().map(ListItem::new).collect();
    let block = Block::default().borders(Borders::ALL).title(" Conversations ");

    frame.render_widget(List::new(items).block(block), area);
}
