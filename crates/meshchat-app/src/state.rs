//! Observable application state.
//!
//! View-model types the renderer reads. Conversation contents live in the
//! session's store; these types only describe what is on screen.

use meshchat_core::{ConversationId, Timestamp};

/// What the main pane shows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum View {
    /// Every conversation merged chronologically.
    #[default]
    Unified,
    /// One conversation.
    Conversation(ConversationId),
}

impl View {
    /// Whether messages of `id` are visible in this view.
    pub fn shows(&self, id: &ConversationId) -> bool {
        match self {
            Self::Unified => true,
            Self::Conversation(current) => current == id,
        }
    }
}

/// Severity of a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Informational.
    Info,
    /// Something failed.
    Error,
}

/// A line in the notification log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Severity.
    pub level: LogLevel,
    /// Text shown to the user.
    pub text: String,
}

/// A node heard advertising itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advert {
    /// Advertised node.
    pub source: String,
    /// When it was heard.
    pub heard_at: Timestamp,
}
