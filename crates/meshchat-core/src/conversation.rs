//! Conversation data model.
//!
//! A conversation is either a broadcast channel or a one-to-one contact. Each
//! conversation owns an append-only list of [`Message`]s. Messages are
//! immutable once stored except for their [`DeliveryState`], which only moves
//! forward.
//!
//! # Delivery State Machine
//!
//! ```text
//! ┌─────────┐   transmitted   ┌──────┐   acknowledged   ┌───────┐
//! │ Pending │────────────────>│ Sent │─────────────────>│ Acked │
//! └─────────┘                 └──────┘                  └───────┘
//!      │                          │
//!      │ error / disconnect       │ error
//!      ↓                          ↓
//!  ┌────────┐                 ┌────────┐
//!  │ Failed │                 │ Failed │
//!  └────────┘                 └────────┘
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a conversation.
///
/// Ordering compares the tag first (channels sort before contacts), then the
/// name. Names are compared exactly: contact identifiers are case-sensitive
/// and channel names include any leading `#` marker.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConversationId {
    /// Broadcast channel, e.g. `#general`.
    Channel(String),
    /// Direct peer, identified by its advertised name.
    Contact(String),
}

impl ConversationId {
    /// Channel identity.
    pub fn channel(name: impl Into<String>) -> Self {
        Self::Channel(name.into())
    }

    /// Contact identity.
    pub fn contact(name: impl Into<String>) -> Self {
        Self::Contact(name.into())
    }

    /// Channel name or contact identifier.
    pub fn name(&self) -> &str {
        match self {
            Self::Channel(name) | Self::Contact(name) => name,
        }
    }

    /// Whether this identity names a channel.
    pub fn is_channel(&self) -> bool {
        matches!(self, Self::Channel(_))
    }

    /// Whether the identity carries a usable name.
    pub fn is_well_formed(&self) -> bool {
        !self.name().trim().is_empty()
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Channel(name) => write!(f, "{name}"),
            Self::Contact(name) => write!(f, "@{name}"),
        }
    }
}

/// Wall-clock instant in milliseconds since the Unix epoch.
///
/// The core never reads the clock itself; callers pass the current time into
/// every operation that records activity.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Timestamp from milliseconds since the Unix epoch.
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Timestamp from whole seconds since the Unix epoch.
    ///
    /// Radios report sender time with second precision.
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(1000))
    }

    /// Milliseconds since the Unix epoch.
    pub const fn as_millis(self) -> u64 {
        self.0
    }
}

/// Correlation token linking an outbound send to its delivery outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageToken(pub u64);

impl fmt::Display for MessageToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tok-{}", self.0)
    }
}

/// Message direction relative to the local radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Received from the mesh.
    Inbound,
    /// Sent by the local user.
    Outbound,
}

/// Delivery progress of an outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeliveryState {
    /// Handed to the transport, not yet transmitted.
    Pending,
    /// Transmitted, awaiting acknowledgement.
    Sent,
    /// Acknowledged by the mesh. Terminal.
    Acked,
    /// Transmission or acknowledgement failed. Terminal.
    Failed,
}

impl DeliveryState {
    /// Whether no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Acked | Self::Failed)
    }

    /// Whether moving from `self` to `next` is a forward transition.
    ///
    /// `Pending` may skip straight to `Acked` since some radios only report
    /// the final outcome.
    pub fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::Pending, Self::Sent | Self::Acked | Self::Failed)
            | (Self::Sent, Self::Acked | Self::Failed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for DeliveryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Acked => "acked",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Message contents before the store assigns its identity in the history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDraft {
    /// Inbound or outbound.
    pub direction: Direction,
    /// Sender display name. Empty for the local user.
    pub author: String,
    /// Message text.
    pub body: String,
    /// Local observation time.
    pub timestamp: Timestamp,
    /// Sender-reported time for inbound messages.
    pub sent_at: Option<Timestamp>,
    /// Correlation token for outbound messages.
    pub token: Option<MessageToken>,
}

impl MessageDraft {
    /// Draft for a message received from the mesh.
    pub fn inbound(
        author: impl Into<String>,
        body: impl Into<String>,
        timestamp: Timestamp,
        sent_at: Option<Timestamp>,
    ) -> Self {
        Self {
            direction: Direction::Inbound,
            author: author.into(),
            body: body.into(),
            timestamp,
            sent_at,
            token: None,
        }
    }

    /// Draft for a message sent by the local user.
    pub fn outbound(body: impl Into<String>, timestamp: Timestamp, token: MessageToken) -> Self {
        Self {
            direction: Direction::Outbound,
            author: String::new(),
            body: body.into(),
            timestamp,
            sent_at: None,
            token: Some(token),
        }
    }
}

/// A message stored in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    /// Conversation the message belongs to.
    pub conversation: ConversationId,
    /// Inbound or outbound.
    pub direction: Direction,
    /// Sender display name. Empty for the local user.
    pub author: String,
    /// Message text.
    pub body: String,
    /// Local observation time, used for ordering.
    pub timestamp: Timestamp,
    /// Sender-reported time for inbound messages.
    pub sent_at: Option<Timestamp>,
    /// Arrival sequence number, unique across the store.
    pub sequence: u64,
    /// Correlation token for outbound messages.
    pub token: Option<MessageToken>,
    /// Delivery progress. Always [`DeliveryState::Acked`] for inbound.
    pub delivery: DeliveryState,
}

impl Message {
    /// Ordering key for the unified view.
    pub fn order_key(&self) -> (Timestamp, u64) {
        (self.timestamp, self.sequence)
    }

    /// Whether the message was written by the local user.
    pub fn is_outbound(&self) -> bool {
        self.direction == Direction::Outbound
    }
}

/// Per-conversation history.
#[derive(Debug, Clone)]
pub struct Conversation {
    /// Conversation identity.
    pub id: ConversationId,
    /// Messages in arrival order.
    pub messages: Vec<Message>,
    /// Time of the most recent message, or of creation.
    pub last_activity: Timestamp,
}

impl Conversation {
    /// Create an empty conversation.
    pub fn new(id: ConversationId, created_at: Timestamp) -> Self {
        Self { id, messages: Vec::new(), last_activity: created_at }
    }

    /// Most recent message. `None` if the conversation is empty.
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}
