//! Observable state snapshots for invariant checking.
//!
//! Snapshots capture the observable state of a session at a point in time.
//! Invariants operate on snapshots rather than live state to ensure
//! consistent, atomic checks.

use std::collections::HashMap;

use meshchat_app::{App, View};
use meshchat_core::{
    ConnectionState, Conversation, ConversationId, DeliveryState, Direction, MessageToken, Session,
};
use serde::Serialize;

/// Snapshot of one session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionSnapshot {
    /// Connection state label.
    pub state: String,
    /// Whether the session is `Disconnected` or `Disconnecting`.
    pub torn_down: bool,
    /// Every conversation in store order.
    pub conversations: Vec<ConversationSnapshot>,
    /// `(timestamp, sequence)` of the unified view, in iteration order.
    pub unified: Vec<(u64, u64)>,
    /// Conversation shown by the app. `None` for the unified view or when no
    /// app is attached.
    pub view: Option<ConversationId>,
    /// Observed delivery states per outbound token, oldest first.
    #[serde(skip)]
    pub delivery_history: HashMap<MessageToken, Vec<DeliveryState>>,
}

impl SessionSnapshot {
    /// Create an empty snapshot.
    pub fn empty() -> Self {
        Self { state: ConnectionState::Disconnected.to_string(), torn_down: true, ..Self::default() }
    }

    /// Capture a session.
    pub fn from_session(session: &Session) -> Self {
        let state = session.state();
        Self {
            state: state.to_string(),
            torn_down: matches!(
                state,
                ConnectionState::Disconnected | ConnectionState::Disconnecting
            ),
            conversations: session.store().conversations().map(ConversationSnapshot::from).collect(),
            unified: session
                .store()
                .unified_view(None)
                .map(|m| (m.timestamp.as_millis(), m.sequence))
                .collect(),
            view: None,
            delivery_history: HashMap::new(),
        }
    }

    /// Capture an app, including its current view.
    pub fn from_app(app: &App) -> Self {
        let mut snapshot = Self::from_session(app.session());
        if let View::Conversation(id) = app.view() {
            snapshot.view = Some(id.clone());
        }
        snapshot
    }

    /// Attach observed delivery histories.
    #[must_use]
    pub fn with_delivery_history(
        mut self,
        history: HashMap<MessageToken, Vec<DeliveryState>>,
    ) -> Self {
        self.delivery_history = history;
        self
    }
}

/// Snapshot of one conversation.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSnapshot {
    /// Conversation identity.
    pub id: ConversationId,
    /// Messages in arrival order.
    pub messages: Vec<MessageSnapshot>,
}

impl From<&Conversation> for ConversationSnapshot {
    fn from(conversation: &Conversation) -> Self {
        Self {
            id: conversation.id.clone(),
            messages: conversation
                .messages
                .iter()
                .map(|m| MessageSnapshot {
                    timestamp: m.timestamp.as_millis(),
                    sequence: m.sequence,
                    inbound: m.direction == Direction::Inbound,
                    delivery: m.delivery.to_string(),
                    pending: m.delivery == DeliveryState::Pending,
                    acked: m.delivery == DeliveryState::Acked,
                })
                .collect(),
        }
    }
}

/// Snapshot of one message.
#[derive(Debug, Clone, Serialize)]
pub struct MessageSnapshot {
    /// Local timestamp in milliseconds.
    pub timestamp: u64,
    /// Arrival sequence.
    pub sequence: u64,
    /// Received rather than sent.
    pub inbound: bool,
    /// Delivery state label.
    pub delivery: String,
    /// Delivery state is `Pending`.
    #[serde(skip)]
    pub pending: bool,
    /// Delivery state is `Acked`.
    #[serde(skip)]
    pub acked: bool,
}
