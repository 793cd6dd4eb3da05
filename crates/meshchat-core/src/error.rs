//! Error types for the MeshChat session core.
//!
//! Each layer has its own error: the conversation store, the command
//! interpreter, the session controller, and failures reported by the radio
//! transport. None of them is fatal to the session; the controller either
//! surfaces them as notifications or logs and absorbs them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    conversation::{ConversationId, DeliveryState, MessageToken},
    session::ConnectionState,
};

/// Errors from [`crate::ConversationStore`] operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Conversation identity has an empty name.
    #[error("invalid conversation identity: {0:?}")]
    InvalidIdentity(ConversationId),

    /// No outbound message carries this correlation token.
    #[error("no outbound message for {0}")]
    MessageNotFound(MessageToken),

    /// Delivery state would move backwards.
    #[error("invalid delivery transition for {token}: {from} -> {to}")]
    InvalidTransition {
        /// Message being updated
        token: MessageToken,
        /// Current state
        from: DeliveryState,
        /// Rejected target state
        to: DeliveryState,
    },

    /// Conversation does not exist.
    #[error("conversation not found: {0}")]
    NotFound(ConversationId),
}

/// Malformed user input. Never reaches the transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Blank line.
    #[error("empty command")]
    Empty,

    /// `join` without a channel name.
    #[error("usage: join <channel>")]
    MissingChannel,

    /// Destination given without any message text.
    #[error("no message text for {destination}")]
    MissingBody {
        /// Destination token as typed
        destination: String,
    },

    /// Keyword command followed by arguments it does not take.
    #[error("{command} takes no arguments, got {extra:?}")]
    UnexpectedArgument {
        /// Keyword that was used
        command: &'static str,
        /// Trailing text
        extra: String,
    },
}

/// Errors returned by [`crate::Session`] entry points.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Operation not valid in the current connection state.
    #[error("cannot {operation} while {state}")]
    InvalidState {
        /// State when the operation was attempted
        state: ConnectionState,
        /// Operation that was attempted
        operation: &'static str,
    },

    /// Outbound action attempted without a live connection.
    #[error("not connected to a radio")]
    NotConnected,

    /// Input could not be parsed.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Store rejected the operation.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failures reported by the radio transport.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportError {
    /// Could not open the link.
    #[error("connect failed: {0}")]
    Connect(String),

    /// Teardown reported an error. The link is released regardless.
    #[error("disconnect failed: {0}")]
    Disconnect(String),

    /// Channel subscription was refused.
    #[error("subscribe failed: {0}")]
    Subscribe(String),

    /// Flood advertisement could not be sent.
    #[error("advert failed: {0}")]
    Advert(String),

    /// Open link dropped without being asked to.
    #[error("link lost: {0}")]
    LinkLost(String),
}
