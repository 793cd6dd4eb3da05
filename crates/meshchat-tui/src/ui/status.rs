//! Status bar
//!
//! Connection state, the radio profile, the latest notification and how many
//! nodes were heard advertising.

use meshchat_app::{App, LogLevel};
use meshchat_core::ConnectionState;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

/// Build the status line.
pub fn line(app: &App) -> Line<'static> {
    let connection = match app.connection_state() {
        ConnectionState::Disconnected => {
            Span::styled("Disconnected", Style::default().fg(Color::Red))
        },
        ConnectionState::Connecting => {
            Span::styled("Connecting...", Style::default().fg(Color::Yellow))
        },
        ConnectionState::Connected(_) => Span::styled(
            format!("Connected ({})", app.profile().name),
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ),
        ConnectionState::Disconnecting => {
            Span::styled("Disconnecting...", Style::default().fg(Color::Yellow))
        },
    };

    let mut spans = vec![
        Span::raw(" "),
        connection,
        Span::styled(
            format!(" | {} @ {} baud", app.profile().address, app.profile().baud_rate),
            Style::default().fg(Color::Gray),
        ),
    ];

    let heard = app.adverts().count();
    if heard > 0 {
        spans.push(Span::styled(format!(" | heard {heard}"), Style::default().fg(Color::Gray)));
    }

    if let Some(entry) = app.status() {
        let color = match entry.level {
            LogLevel::Info => Color::White,
            LogLevel::Error => Color::LightRed,
        };
        spans.push(Span::styled(format!(" | {}", entry.text), Style::default().fg(color)));
    }
    Line::from(spans)
}

/// Render the status bar.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let paragraph =
        Paragraph::new(line(app)).style(Style::default().bg(Color::DarkGray).fg(Color::White));

    frame.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use meshchat_core::{ConnectionProfile, Timestamp};

    use super::*;
    use crate::ui::plain;

    #[test]
    fn rejected_command_shows_in_status() {
        let mut app = App::new(ConnectionProfile::new("base", "/dev/ttyUSB0"));
        app.submit("bob hi", Timestamp::from_millis(0));

        insta::assert_snapshot!(
            plain(&line(&app)).trim_start(),
            @"Disconnected | /dev/ttyUSB0 @ 115200 baud | not connected to a radio"
        );
    }
}
