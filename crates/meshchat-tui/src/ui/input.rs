//! Input line
//!
//! Displays the input buffer with cursor. Columns are counted in terminal
//! cells, so wide characters take two.

use meshchat_app::InputState;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Style},
    text::Span,
    widgets::{Block, Borders, Paragraph},
};

const PROMPT_WIDTH: u16 = 3; // "> "
const INPUT_LINE_OFFSET_Y: u16 = 1; // inside top border
const RIGHT_PADDING: u16 = 1; // inside right border

fn cells(text: &str) -> usize {
    Span::raw(text).width()
}

/// Tail of `buffer` to display so the cursor fits in `width` cells, and the
/// cursor column within it.
///
/// `cursor` is a character index.
pub fn window(buffer: &str, cursor: usize, width: usize) -> (&str, usize) {
    let end = buffer.char_indices().nth(cursor).map_or(buffer.len(), |(index, _)| index);
    let mut column = cells(&buffer[..end]);
    let mut start = 0;

    for (index, c) in buffer[..end].char_indices() {
        if column <= width {
            break;
        }
        let next = index + c.len_utf8();
        column -= cells(&buffer[index..next]);
        start = next;
    }
    (&buffer[start..], column)
}

/// Render the input line.
pub fn render(frame: &mut Frame, input: &InputState, area: Rect) {
    let block = Block::default().borders(Borders::ALL);

    let available_width = area.width.saturating_sub(PROMPT_WIDTH + RIGHT_PADDING);
    let (visible, column) = window(input.buffer(), input.cursor(), usize::from(available_width));

    let paragraph = Paragraph::new(format!("> {visible}"))
        .style(Style::default().fg(Color::White))
        .block(block);
    frame.render_widget(paragraph, area);

    let column = u16::try_from(column).unwrap_or(u16::MAX);
    let cursor_x = area.x.saturating_add(PROMPT_WIDTH).saturating_add(column);
    let cursor_y = area.y.saturating_add(INPUT_LINE_OFFSET_Y);
    let max_x = area.x.saturating_add(area.width).saturating_sub(RIGHT_PADDING);

    frame.set_cursor_position((cursor_x.min(max_x), cursor_y));
}
