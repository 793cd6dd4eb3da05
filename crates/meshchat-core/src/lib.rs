//! Session core for MeshChat
//!
//! Pure state machines for a terminal client over a packet-radio mesh. The
//! core never performs I/O: time is passed in, and radio operations are
//! returned as requests for a driver to execute.
//!
//! # Components
//!
//! - [`ConversationStore`]: per-conversation histories plus a merged view
//! - [`command::parse`]: turns a line of input into a [`Command`]
//! - [`Session`]: connection lifecycle and single writer of the store
//! - [`TransportRequest`] / [`TransportEvent`]: the radio contract

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod command;
mod conversation;
mod error;
mod session;
mod store;
pub mod text;
mod transport;

pub use command::Command;
pub use conversation::{
    Conversation, ConversationId, DeliveryState, Direction, Message, MessageDraft, MessageToken,
    Timestamp,
};
pub use error::{CommandError, SessionError, StoreError, TransportError};
pub use session::{ConnectionState, Notification, Session, SessionAction};
pub use store::{Appended, ConversationStore, UnifiedView};
pub use transport::{
    ConnectAttempt, ConnectionProfile, DEFAULT_BAUD_RATE, LinkState, Teardown, TransportEvent,
    TransportHandle, TransportRequest,
};
