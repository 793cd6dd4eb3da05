//! Radio transport contract.
//!
//! The session never talks to a radio directly. It returns
//! [`TransportRequest`]s for a driver to execute, and the driver feeds every
//! completion and every unsolicited radio event back as a [`TransportEvent`].
//!
//! ```text
//!            TransportRequest
//! Session ─────────────────────> Driver ──> radio
//!    ↑                              │
//!    └──────── TransportEvent ──────┘
//! ```
//!
//! Requests that complete asynchronously (`Connect`, `Disconnect`,
//! `CancelConnect`, `Subscribe`, `Advert`) each have a matching `*Completed`
//! event. A `Send` completes through one or more `DeliveryUpdate` events
//! carrying the token from the request.

use serde::{Deserialize, Serialize};

use crate::{
    conversation::{ConversationId, DeliveryState, MessageToken, Timestamp},
    error::TransportError,
};

/// Default serial line rate for companion radios.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Opaque handle to an open radio link, assigned by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransportHandle(pub u64);

/// Identifies one connect attempt so stale completions can be discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectAttempt(pub u64);

/// What a teardown is closing: an open link or an abandoned connect.
///
/// Echoed in [`TransportEvent::DisconnectCompleted`] so a completion that
/// arrives after a newer teardown started can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Teardown {
    /// Closing the link with this handle.
    Link(TransportHandle),
    /// Abandoning this connect attempt.
    Attempt(ConnectAttempt),
}

/// Parameters for opening a radio link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionProfile {
    /// Label for the link, shown in the status bar.
    pub name: String,
    /// Serial port path.
    pub address: String,
    /// Serial line rate.
    pub baud_rate: u32,
}

impl ConnectionProfile {
    /// Profile with the default baud rate.
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self { name: name.into(), address: address.into(), baud_rate: DEFAULT_BAUD_RATE }
    }
}

/// Operation the driver must perform against the radio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportRequest {
    /// Open a link. Completes with [`TransportEvent::ConnectCompleted`].
    Connect {
        /// Attempt id echoed in the completion.
        attempt: ConnectAttempt,
        /// Link parameters.
        profile: ConnectionProfile,
    },

    /// Abandon an in-flight connect. Completes with
    /// [`TransportEvent::DisconnectCompleted`].
    CancelConnect {
        /// Attempt to abandon.
        attempt: ConnectAttempt,
    },

    /// Close an open link. Completes with
    /// [`TransportEvent::DisconnectCompleted`].
    Disconnect {
        /// Link to close.
        handle: TransportHandle,
    },

    /// Transmit a message. Progress arrives as
    /// [`TransportEvent::DeliveryUpdate`] carrying `token`.
    Send {
        /// Link to send on.
        handle: TransportHandle,
        /// Correlation token for delivery updates.
        token: MessageToken,
        /// Channel or contact to send to.
        destination: ConversationId,
        /// Message text.
        body: String,
    },

    /// Subscribe to a channel. Completes with
    /// [`TransportEvent::SubscribeCompleted`].
    Subscribe {
        /// Link to subscribe on.
        handle: TransportHandle,
        /// Channel name, as typed.
        channel: String,
    },

    /// Broadcast a flood advertisement. Completes with
    /// [`TransportEvent::AdvertCompleted`].
    Advert {
        /// Link to advertise on.
        handle: TransportHandle,
    },
}

/// Physical link state reported by the radio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkState {
    /// Link is usable.
    Up,
    /// Link was lost.
    Down {
        /// Radio-provided cause.
        reason: String,
    },
}

/// Everything the driver reports back to the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportEvent {
    /// Outcome of a [`TransportRequest::Connect`].
    ConnectCompleted {
        /// Attempt from the request.
        attempt: ConnectAttempt,
        /// Handle of the open link, or why it could not be opened.
        result: Result<TransportHandle, TransportError>,
    },

    /// Outcome of a [`TransportRequest::Disconnect`] or
    /// [`TransportRequest::CancelConnect`]. The link is gone either way.
    DisconnectCompleted {
        /// Link handle or attempt from the request.
        teardown: Teardown,
        /// Teardown error, if any.
        result: Result<(), TransportError>,
    },

    /// Outcome of a [`TransportRequest::Subscribe`].
    SubscribeCompleted {
        /// Channel from the request.
        channel: String,
        /// Subscription error, if any.
        result: Result<(), TransportError>,
    },

    /// Outcome of a [`TransportRequest::Advert`].
    AdvertCompleted {
        /// Advertisement error, if any.
        result: Result<(), TransportError>,
    },

    /// Message received from the mesh.
    IncomingMessage {
        /// Channel or contact the message arrived on.
        conversation: ConversationId,
        /// Sender name. Empty when the radio does not know it.
        author: String,
        /// Message text.
        body: String,
        /// Sender-reported time, if the radio provides one.
        sent_at: Option<Timestamp>,
    },

    /// Delivery progress for an earlier send.
    DeliveryUpdate {
        /// Token from the [`TransportRequest::Send`].
        token: MessageToken,
        /// New delivery state.
        state: DeliveryState,
    },

    /// Physical link changed.
    LinkStateChanged(LinkState),

    /// Contacts and channels stored on the radio, sent once the link is up.
    Roster {
        /// Known contact names.
        contacts: Vec<String>,
        /// Configured channel names.
        channels: Vec<String>,
    },

    /// A node advertised itself on the mesh.
    Advertisement {
        /// Advertised node name or key prefix.
        source: String,
        /// When the advertisement was heard.
        timestamp: Timestamp,
    },
}

impl TransportEvent {
    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConnectCompleted { .. } => "connect_completed",
            Self::DisconnectCompleted { .. } => "disconnect_completed",
            Self::SubscribeCompleted { .. } => "subscribe_completed",
            Self::AdvertCompleted { .. } => "advert_completed",
            Self::IncomingMessage { .. } => "incoming_message",
            Self::DeliveryUpdate { .. } => "delivery_update",
            Self::LinkStateChanged(_) => "link_state_changed",
            Self::Roster { .. } => "roster",
            Self::Advertisement { .. } => "advertisement",
        }
    }
}
