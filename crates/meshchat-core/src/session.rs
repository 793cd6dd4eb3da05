//! Session controller.
//!
//! Owns the connection lifecycle and the [`ConversationStore`]. It is the only
//! writer of either. Every entry point takes the current time as a parameter
//! and returns [`SessionAction`]s: transport requests for the driver to
//! execute and notifications for the presentation layer. No I/O happens here.
//!
//! # State Machine
//!
//! ```text
//!                connect             ConnectCompleted(Ok)
//! ┌──────────────┐──────>┌────────────┐─────────────────>┌───────────┐
//! │ Disconnected │       │ Connecting │                  │ Connected │
//! └──────────────┘<──────└────────────┘                  └───────────┘
//!        ↑      connect failure  │                              │
//!        │                       │ disconnect      disconnect / │
//!        │                       ↓                  link down   │
//!        │               ┌───────────────┐                      │
//!        └───────────────│ Disconnecting │<─────────────────────┘
//!   DisconnectCompleted  └───────────────┘
//! ```
//!
//! Pending outbound messages are failed on entry to `Disconnecting`, so no
//! message is ever `Pending` once the session is back in `Disconnected`.
//!
//! A `DisconnectCompleted` only finishes the teardown it names. Completions
//! for an earlier teardown are dropped.

use std::fmt;

use crate::{
    command::{self, Command},
    conversation::{ConversationId, DeliveryState, MessageDraft, MessageToken, Timestamp},
    error::{CommandError, SessionError, TransportError},
    store::ConversationStore,
    text,
    transport::{
        ConnectAttempt, ConnectionProfile, LinkState, Teardown, TransportEvent, TransportHandle,
        TransportRequest,
    },
};

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// No link. Initial state.
    #[default]
    Disconnected,
    /// Connect requested, waiting for the transport.
    Connecting,
    /// Link open.
    Connected(TransportHandle),
    /// Teardown in flight.
    Disconnecting,
}

impl ConnectionState {
    /// Whether outbound actions are allowed.
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected(_))
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => f.write_str("disconnected"),
            Self::Connecting => f.write_str("connecting"),
            Self::Connected(_) => f.write_str("connected"),
            Self::Disconnecting => f.write_str("disconnecting"),
        }
    }
}

/// Render-ready notification for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Conversation gained a message or a delivery state changed.
    ConversationUpdated(ConversationId),
    /// Connection state changed.
    ConnectionStateChanged(ConnectionState),
    /// User input was rejected.
    CommandRejected(String),
    /// Connect attempt failed or an open link was lost.
    ConnectionFailed(TransportError),
    /// A node advertised itself.
    AdvertisementHeard {
        /// Advertised node.
        source: String,
        /// When it was heard.
        timestamp: Timestamp,
    },
    /// Non-fatal transport operation failure.
    TransportFailure(TransportError),
}

/// Action returned by the session for the driver to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Perform this operation against the radio.
    Transport(TransportRequest),
    /// Tell the presentation layer.
    Notify(Notification),
}

/// Session controller state machine.
#[derive(Debug, Clone, Default)]
pub struct Session {
    state: ConnectionState,
    store: ConversationStore,
    /// Attempt awaiting completion while `Connecting`.
    attempt: Option<ConnectAttempt>,
    /// Teardown awaiting completion while `Disconnecting`.
    teardown: Option<Teardown>,
    /// Profile of the current or most recent connect.
    profile: Option<ConnectionProfile>,
    next_attempt: u64,
    next_token: u64,
}

impl Session {
    /// Create a disconnected session with an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Read-only view of all conversations.
    #[must_use]
    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Profile of the current or most recent connect request.
    #[must_use]
    pub fn profile(&self) -> Option<&ConnectionProfile> {
        self.profile.as_ref()
    }

    /// Start connecting to a radio.
    ///
    /// # Errors
    ///
    /// - `SessionError::InvalidState` unless `Disconnected`
    pub fn connect(
        &mut self,
        profile: ConnectionProfile,
    ) -> Result<Vec<SessionAction>, SessionError> {
        if self.state != ConnectionState::Disconnected {
            return Err(SessionError::InvalidState { state: self.state, operation: "connect" });
        }

        let attempt = ConnectAttempt(self.next_attempt);
        self.next_attempt += 1;
        self.attempt = Some(attempt);
        self.profile = Some(profile.clone());

        tracing::debug!(attempt = attempt.0, address = %profile.address, "connecting");

        let mut actions = self.transition(ConnectionState::Connecting);
        actions.push(SessionAction::Transport(TransportRequest::Connect { attempt, profile }));
        Ok(actions)
    }

    /// Tear down the connection or abandon an in-flight connect.
    ///
    /// No-op while `Disconnected` or already `Disconnecting`.
    pub fn disconnect(&mut self) -> Vec<SessionAction> {
        match self.state {
            ConnectionState::Disconnected | ConnectionState::Disconnecting => {
                tracing::debug!(state = %self.state, "disconnect ignored");
                Vec::new()
            },
            ConnectionState::Connecting => {
                let Some(attempt) = self.attempt.take() else {
                    tracing::warn!("connecting without an attempt id");
                    return self.transition(ConnectionState::Disconnected);
                };
                tracing::debug!(attempt = attempt.0, "abandoning connect");
                let mut actions = self.begin_teardown(Teardown::Attempt(attempt));
                actions.push(SessionAction::Transport(TransportRequest::CancelConnect { attempt }));
                actions
            },
            ConnectionState::Connected(handle) => {
                let mut actions = self.begin_teardown(Teardown::Link(handle));
                actions.push(SessionAction::Transport(TransportRequest::Disconnect { handle }));
                actions
            },
        }
    }

    /// Execute a parsed command.
    ///
    /// A successful send appends the message as `Pending` before the transport
    /// sees it, so the user gets an immediate local echo.
    ///
    /// # Errors
    ///
    /// - `SessionError::NotConnected` for `Send`, `Join` and `Advert` unless
    ///   `Connected`; nothing is stored
    /// - `SessionError::Store` if the destination identity is malformed
    pub fn dispatch(
        &mut self,
        command: Command,
        now: Timestamp,
    ) -> Result<Vec<SessionAction>, SessionError> {
        match command {
            Command::Disconnect => Ok(self.disconnect()),
            Command::Send { destination, body } => {
                let handle = self.require_connected()?;
                let token = MessageToken(self.next_token);

                self.store
                    .append(destination.clone(), MessageDraft::outbound(body.clone(), now, token))?;
                self.next_token += 1;

                tracing::debug!(%token, %destination, "send queued");

                Ok(vec![
                    SessionAction::Notify(Notification::ConversationUpdated(destination.clone())),
                    SessionAction::Transport(TransportRequest::Send {
                        handle,
                        token,
                        destination,
                        body,
                    }),
                ])
            },
            Command::Join { channel } => {
                let handle = self.require_connected()?;
                let id = ConversationId::channel(channel.clone());

                let mut actions = Vec::new();
                if self.store.ensure(id.clone(), now)? {
                    actions.push(SessionAction::Notify(Notification::ConversationUpdated(id)));
                }
                actions.push(SessionAction::Transport(TransportRequest::Subscribe {
                    handle,
                    channel,
                }));
                Ok(actions)
            },
            Command::Advert => {
                let handle = self.require_connected()?;
                Ok(vec![SessionAction::Transport(TransportRequest::Advert { handle })])
            },
        }
    }

    /// Parse and execute a line of user input.
    ///
    /// Errors are reported as [`Notification::CommandRejected`]; a blank line
    /// does nothing.
    pub fn submit(&mut self, line: &str, now: Timestamp) -> Vec<SessionAction> {
        let result = command::parse(line, &self.store)
            .map_err(SessionError::from)
            .and_then(|command| self.dispatch(command, now));

        match result {
            Ok(actions) => actions,
            Err(SessionError::Command(CommandError::Empty)) => Vec::new(),
            Err(err) => {
                tracing::debug!(%err, "command rejected");
                vec![SessionAction::Notify(Notification::CommandRejected(err.to_string()))]
            },
        }
    }

    /// Process an event from the transport.
    ///
    /// Never fails: unknown tokens, illegal transitions, stale completions and
    /// malformed identities are logged and dropped.
    pub fn on_transport_event(
        &mut self,
        event: TransportEvent,
        now: Timestamp,
    ) -> Vec<SessionAction> {
        match event {
            TransportEvent::ConnectCompleted { attempt, result } => {
                self.on_connect_completed(attempt, result)
            },
            TransportEvent::DisconnectCompleted { teardown, result } => {
                self.on_disconnect_completed(teardown, result)
            },
            TransportEvent::SubscribeCompleted { channel, result } => match result {
                Ok(()) => {
                    tracing::debug!(%channel, "subscribed");
                    Vec::new()
                },
                Err(err) => {
                    tracing::warn!(%channel, %err, "subscribe failed");
                    vec![SessionAction::Notify(Notification::TransportFailure(err))]
                },
            },
            TransportEvent::AdvertCompleted { result } => match result {
                Ok(()) => Vec::new(),
                Err(err) => {
                    tracing::warn!(%err, "advert failed");
                    vec![SessionAction::Notify(Notification::TransportFailure(err))]
                },
            },
            TransportEvent::IncomingMessage { conversation, author, body, sent_at } => {
                self.on_incoming(conversation, author, body, sent_at, now)
            },
            TransportEvent::DeliveryUpdate { token, state } => self.on_delivery(token, state),
            TransportEvent::LinkStateChanged(link) => self.on_link_state(link),
            TransportEvent::Roster { contacts, channels } => {
                let ids = channels
                    .into_iter()
                    .map(ConversationId::channel)
                    .chain(contacts.into_iter().map(ConversationId::contact));
                self.on_roster(ids, now)
            },
            TransportEvent::Advertisement { source, timestamp } => {
                vec![SessionAction::Notify(Notification::AdvertisementHeard { source, timestamp })]
            },
        }
    }

    fn on_connect_completed(
        &mut self,
        attempt: ConnectAttempt,
        result: Result<TransportHandle, TransportError>,
    ) -> Vec<SessionAction> {
        if self.state != ConnectionState::Connecting || self.attempt != Some(attempt) {
            tracing::debug!(attempt = attempt.0, state = %self.state, "stale connect completion");
            return Vec::new();
        }
        self.attempt = None;

        match result {
            Ok(handle) => {
                tracing::info!(handle = handle.0, "connected");
                self.transition(ConnectionState::Connected(handle))
            },
            Err(err) => {
                tracing::warn!(%err, "connect failed");
                let mut actions = self.transition(ConnectionState::Disconnected);
                actions.push(SessionAction::Notify(Notification::ConnectionFailed(err)));
                actions
            },
        }
    }

    fn on_disconnect_completed(
        &mut self,
        teardown: Teardown,
        result: Result<(), TransportError>,
    ) -> Vec<SessionAction> {
        if self.state != ConnectionState::Disconnecting || self.teardown != Some(teardown) {
            tracing::debug!(?teardown, state = %self.state, "stale disconnect completion");
            return Vec::new();
        }

        let mut actions = self.transition(ConnectionState::Disconnected);
        if let Err(err) = result {
            tracing::warn!(%err, "disconnect reported an error");
            actions.push(SessionAction::Notify(Notification::TransportFailure(err)));
        }
        actions
    }

    fn on_incoming(
        &mut self,
        conversation: ConversationId,
        author: String,
        body: String,
        sent_at: Option<Timestamp>,
        now: Timestamp,
    ) -> Vec<SessionAction> {
        let named = if author.is_empty() && conversation.is_channel() {
            text::split_sender(&body).map(|(name, rest)| (name.to_string(), rest.to_string()))
        } else {
            None
        };
        let (author, body) = named.unwrap_or((author, body));
        let draft = MessageDraft::inbound(author, body, now, sent_at);

        match self.store.append(conversation.clone(), draft) {
            Ok(_) => vec![SessionAction::Notify(Notification::ConversationUpdated(conversation))],
            Err(err) => {
                tracing::warn!(%err, "dropping inbound message");
                Vec::new()
            },
        }
    }

    /// Seed the store with the radio's stored contacts and channels so they
    /// can be addressed before any traffic arrives.
    fn on_roster(
        &mut self,
        ids: impl Iterator<Item = ConversationId>,
        now: Timestamp,
    ) -> Vec<SessionAction> {
        let mut actions = Vec::new();
        for id in ids {
            match self.store.ensure(id.clone(), now) {
                Ok(true) => actions.push(SessionAction::Notify(Notification::ConversationUpdated(id))),
                Ok(false) => {},
                Err(err) => tracing::warn!(%err, "skipping roster entry"),
            }
        }
        tracing::debug!(added = actions.len(), "roster applied");
        actions
    }

    fn on_delivery(&mut self, token: MessageToken, state: DeliveryState) -> Vec<SessionAction> {
        match self.store.update_delivery_state(token, state) {
            Ok(message) => {
                tracing::debug!(%token, %state, "delivery updated");
                vec![SessionAction::Notify(Notification::ConversationUpdated(
                    message.conversation.clone(),
                ))]
            },
            Err(err) => {
                tracing::warn!(%err, "delivery update ignored");
                Vec::new()
            },
        }
    }

    fn on_link_state(&mut self, link: LinkState) -> Vec<SessionAction> {
        let LinkState::Down { reason } = link else {
            tracing::debug!(state = %self.state, "link up");
            return Vec::new();
        };

        match self.state {
            ConnectionState::Connected(handle) => {
                tracing::warn!(%reason, "link lost");
                let mut actions = vec![SessionAction::Notify(Notification::ConnectionFailed(
                    TransportError::LinkLost(reason),
                ))];
                actions.extend(self.begin_teardown(Teardown::Link(handle)));
                actions.push(SessionAction::Transport(TransportRequest::Disconnect { handle }));
                actions
            },
            ConnectionState::Connecting => {
                tracing::warn!(%reason, "link down while connecting");
                self.attempt = None;
                let mut actions = self.transition(ConnectionState::Disconnected);
                actions.push(SessionAction::Notify(Notification::ConnectionFailed(
                    TransportError::Connect(reason),
                )));
                actions
            },
            ConnectionState::Disconnecting => self.transition(ConnectionState::Disconnected),
            ConnectionState::Disconnected => {
                tracing::debug!(%reason, "link down while disconnected");
                Vec::new()
            },
        }
    }

    fn require_connected(&self) -> Result<TransportHandle, SessionError> {
        match self.state {
            ConnectionState::Connected(handle) => Ok(handle),
            _ => Err(SessionError::NotConnected),
        }
    }

    /// Enter `Disconnecting` and fail every pending send.
    fn begin_teardown(&mut self, teardown: Teardown) -> Vec<SessionAction> {
        let mut actions = self.transition(ConnectionState::Disconnecting);
        self.teardown = Some(teardown);
        for id in self.store.fail_pending() {
            actions.push(SessionAction::Notify(Notification::ConversationUpdated(id)));
        }
        actions
    }

    fn transition(&mut self, next: ConnectionState) -> Vec<SessionAction> {
        tracing::debug!(from = %self.state, to = %next, "connection state");
        if next != ConnectionState::Disconnecting {
            self.teardown = None;
        }
        self.state = next;
        vec![SessionAction::Notify(Notification::ConnectionStateChanged(next))]
    }
}
