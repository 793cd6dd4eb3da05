//! UI rendering
//!
//! Rendering functions that convert App state into terminal output using
//! ratatui widgets. All functions are pure (no I/O), taking state and
//! returning widget trees.

mod activity;
mod chat;
mod input;
mod sidebar;
mod status;

use meshchat_app::App;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
};

/// Render the entire UI.
pub fn render(frame: &mut Frame, app: &App) {
    const MAIN_AREA_MIN_HEIGHT: u16 = 3;
    const INPUT_HEIGHT: u16 = 3;
    const STATUS_HEIGHT: u16 = 1;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(MAIN_AREA_MIN_HEIGHT),
            Constraint::Length(INPUT_HEIGHT),
            Constraint::Length(STATUS_HEIGHT),
        ])
        .split(frame.area());

    let [main_area, input_area, status_area] = chunks.as_ref() else {
        return;
    };

    render_main_area(frame, app, *main_area);
    input::render(frame, app.input(), *input_area);
    status::render(frame, app, *status_area);
}

/// Render the main area (conversation sidebar + chat, plus the activity
/// panel on wide terminals).
fn render_main_area(frame: &mut Frame, app: &App, area: Rect) {
    const SIDEBAR_WIDTH: u16 = 20;
    const CHAT_AREA_MIN_WIDTH: u16 = 20;
    const ACTIVITY_WIDTH: u16 = 28;

    if !activity::fits(app) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(CHAT_AREA_MIN_WIDTH)])
            .split(area);
        let [sidebar_area, chat_area] = chunks.as_ref() else {
            return;
        };
        sidebar::render(frame, app, *sidebar_area);
        chat::render(frame, app, *chat_area);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(SIDEBAR_WIDTH),
            Constraint::Min(CHAT_AREA_MIN_WIDTH),
            Constraint::Length(ACTIVITY_WIDTH),
        ])
        .split(area);
    let [sidebar_area, chat_area, activity_area] = chunks.as_ref() else {
        return;
    };
    sidebar::render(frame, app, *sidebar_area);
    chat::render(frame, app, *chat_area);
    activity::render(frame, app, *activity_area);
}

#[cfg(test)]
pub(crate) fn plain(line: &ratatui::text::Line<'_>) -> String {
    line.spans.iter().map(|span| span.content.as_ref()).collect()
}
