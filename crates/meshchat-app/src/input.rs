//! Terminal-agnostic keyboard input and the line editor.

/// Keyboard input abstraction.
///
/// Decouples application logic from terminal libraries so the same key
/// handling runs under crossterm and in simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    /// Printable character.
    Char(char),
    /// Enter/Return key.
    Enter,
    /// Backspace key (delete character before cursor).
    Backspace,
    /// Delete key (delete character at cursor).
    Delete,
    /// Tab key (cycle views).
    Tab,
    /// Escape key (quit).
    Esc,
    /// Left arrow key.
    Left,
    /// Right arrow key.
    Right,
    /// Up arrow key.
    Up,
    /// Down arrow key.
    Down,
    /// Home key (cursor to start).
    Home,
    /// End key (cursor to end).
    End,
}

/// What a key press did to the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputOutcome {
    /// Buffer or cursor changed.
    Edited,
    /// Enter pressed; the line is handed over and the buffer cleared.
    Submitted(String),
    /// Tab pressed.
    CycleView,
    /// Escape pressed.
    Quit,
    /// Key has no effect.
    Ignored,
}

/// Single-line text editor.
///
/// The cursor counts characters, not bytes, so multi-byte input edits
/// correctly.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    buffer: String,
    cursor: usize,
}

impl InputState {
    /// Create an empty editor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current text.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Cursor position in characters.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Apply a key press.
    pub fn handle_key(&mut self, key: KeyInput) -> InputOutcome {
        match key {
            KeyInput::Char(c) => {
                let at = self.byte_offset(self.cursor);
                self.buffer.insert(at, c);
                self.cursor += 1;
                InputOutcome::Edited
            },
            KeyInput::Backspace => {
                if self.cursor == 0 {
                    return InputOutcome::Ignored;
                }
                self.cursor -= 1;
                let at = self.byte_offset(self.cursor);
                self.buffer.remove(at);
                InputOutcome::Edited
            },
            KeyInput::Delete => {
                if self.cursor >= self.len() {
                    return InputOutcome::Ignored;
                }
                let at = self.byte_offset(self.cursor);
                self.buffer.remove(at);
                InputOutcome::Edited
            },
            KeyInput::Left => {
                self.cursor = self.cursor.saturating_sub(1);
                InputOutcome::Edited
            },
            KeyInput::Right => {
                self.cursor = (self.cursor + 1).min(self.len());
                InputOutcome::Edited
            },
            KeyInput::Home => {
                self.cursor = 0;
                InputOutcome::Edited
            },
            KeyInput::End => {
                self.cursor = self.len();
                InputOutcome::Edited
            },
            KeyInput::Enter => {
                self.cursor = 0;
                InputOutcome::Submitted(std::mem::take(&mut self.buffer))
            },
            KeyInput::Tab => InputOutcome::CycleView,
            KeyInput::Esc => InputOutcome::Quit,
            KeyInput::Up | KeyInput::Down => InputOutcome::Ignored,
        }
    }

    fn len(&self) -> usize {
        self.buffer.chars().count()
    }

    fn byte_offset(&self, chars: usize) -> usize {
        self.buffer.char_indices().nth(chars).map_or(self.buffer.len(), |(i, _)| i)
    }
}
