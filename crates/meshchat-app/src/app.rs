//! Application state machine.
//!
//! [`App`] wraps the [`Session`] with everything the screen needs: the line
//! editor, the current view, unread tracking, a bounded notification log and
//! the list of recently heard adverts. It consumes [`AppEvent`]s and produces
//! [`AppAction`]s; it never performs I/O.
//!
//! # Responsibilities
//!
//! - Routes submitted lines to the session and transport events to the
//!   session's single ingestion point.
//! - Tracks which conversations have inbound messages the user has not seen.
//! - Turns session notifications into log lines and status text.

use std::collections::{HashMap, VecDeque};

use meshchat_core::{
    ConnectionProfile, ConnectionState, ConversationId, Message, Notification, Session,
    SessionAction, Timestamp,
};

use crate::{
    Advert, AppAction, AppEvent, InputOutcome, InputState, KeyInput, LogEntry, LogLevel, View,
};

/// Notification log lines kept for display.
pub const LOG_CAPACITY: usize = 100;

/// Recently heard adverts kept for display.
pub const ADVERT_CAPACITY: usize = 16;

/// Input line that re-opens the link after a disconnect.
const RECONNECT: &str = "connect";

/// Application state machine.
#[derive(Debug, Clone)]
pub struct App {
    session: Session,
    /// Profile used for `start` and reconnects.
    profile: ConnectionProfile,
    input: InputState,
    view: View,
    /// Number of messages the user has seen, per conversation.
    read_marks: HashMap<ConversationId, usize>,
    log: VecDeque<LogEntry>,
    adverts: VecDeque<Advert>,
    /// Terminal dimensions (columns, rows).
    terminal_size: (u16, u16),
}

impl App {
    /// Create an app that will connect with `profile`.
    pub fn new(profile: ConnectionProfile) -> Self {
        Self {
            session: Session::new(),
            profile,
            input: InputState::new(),
            view: View::Unified,
            read_marks: HashMap::new(),
            log: VecDeque::new(),
            adverts: VecDeque::new(),
            terminal_size: (80, 24),
        }
    }

    /// Begin connecting to the radio.
    pub fn start(&mut self) -> Vec<AppAction> {
        match self.session.connect(self.profile.clone()) {
            Ok(actions) => self.apply(actions),
            Err(err) => {
                self.push_log(LogLevel::Error, err.to_string());
                vec![AppAction::Render]
            },
        }
    }

    /// Process an event and return actions.
    pub fn handle(&mut self, event: AppEvent, now: Timestamp) -> Vec<AppAction> {
        let actions = match event {
            AppEvent::Tick => Vec::new(),
            AppEvent::Resize(cols, rows) => {
                self.terminal_size = (cols, rows);
                vec![AppAction::Render]
            },
            AppEvent::Key(key) => self.handle_key(key, now),
            AppEvent::Transport(event) => {
                tracing::trace!(kind = event.kind(), "transport event");
                let actions = self.session.on_transport_event(event, now);
                self.apply(actions)
            },
        };
        self.mark_visible_read();
        actions
    }

    fn handle_key(&mut self, key: KeyInput, now: Timestamp) -> Vec<AppAction> {
        match self.input.handle_key(key) {
            InputOutcome::Edited => vec![AppAction::Render],
            InputOutcome::Ignored => Vec::new(),
            InputOutcome::Quit => vec![AppAction::Quit],
            InputOutcome::CycleView => {
                self.cycle_view();
                vec![AppAction::Render]
            },
            InputOutcome::Submitted(line) => {
                let mut actions = self.submit(&line, now);
                if !actions.contains(&AppAction::Render) {
                    actions.push(AppAction::Render);
                }
                actions
            },
        }
    }

    /// Run a line of input through the command interpreter.
    ///
    /// `connect` re-opens the link when disconnected; everything else goes to
    /// the session.
    pub fn submit(&mut self, line: &str, now: Timestamp) -> Vec<AppAction> {
        if line.trim() == RECONNECT && self.session.state() == ConnectionState::Disconnected {
            return self.start();
        }
        let actions = self.session.submit(line, now);
        self.apply(actions)
    }

    /// Move to the next view: unified, then each conversation in order.
    pub fn cycle_view(&mut self) {
        let mut views: Vec<View> = vec![View::Unified];
        views.extend(self.session.store().conversations().map(|c| View::Conversation(c.id.clone())));

        let current = views.iter().position(|view| *view == self.view).unwrap_or(0);
        self.view = views[(current + 1) % views.len()].clone();
        self.mark_visible_read();
    }

    /// Show a specific view. Unknown conversations are ignored.
    pub fn set_view(&mut self, view: View) {
        if let View::Conversation(id) = &view
            && !self.session.store().contains(id)
        {
            return;
        }
        self.view = view;
        self.mark_visible_read();
    }

    fn apply(&mut self, session_actions: Vec<SessionAction>) -> Vec<AppAction> {
        let mut actions = Vec::new();
        let mut render = false;

        for action in session_actions {
            match action {
                SessionAction::Transport(request) => actions.push(AppAction::Transport(request)),
                SessionAction::Notify(notification) => {
                    render = true;
                    self.notify(notification, &mut actions);
                },
            }
        }

        if render {
            actions.push(AppAction::Render);
        }
        actions
    }

    fn notify(&mut self, notification: Notification, actions: &mut Vec<AppAction>) {
        match notification {
            Notification::ConversationUpdated(_) => {},
            Notification::ConnectionStateChanged(state) => {
                let text = match state {
                    ConnectionState::Connected(_) => {
                        if let Some(profile) = self.session.profile() {
                            actions.push(AppAction::Connected(profile.clone()));
                        }
                        format!("connected to {}", self.profile.address)
                    },
                    ConnectionState::Connecting => format!("connecting to {}", self.profile.address),
                    other => other.to_string(),
                };
                self.push_log(LogLevel::Info, text);
            },
            Notification::CommandRejected(reason) => self.push_log(LogLevel::Error, reason),
            Notification::ConnectionFailed(err) | Notification::TransportFailure(err) => {
                self.push_log(LogLevel::Error, err.to_string());
            },
            Notification::AdvertisementHeard { source, timestamp } => {
                self.push_log(LogLevel::Info, format!("advert from {source}"));
                if self.adverts.len() == ADVERT_CAPACITY {
                    self.adverts.pop_front();
                }
                self.adverts.push_back(Advert { source, heard_at: timestamp });
            },
        }
    }

    fn push_log(&mut self, level: LogLevel, text: String) {
        if self.log.len() == LOG_CAPACITY {
            self.log.pop_front();
        }
        self.log.push_back(LogEntry { level, text });
    }

    fn mark_visible_read(&mut self) {
        for conversation in self.session.store().conversations() {
            if self.view.shows(&conversation.id) {
                self.read_marks.insert(conversation.id.clone(), conversation.messages.len());
            }
        }
    }

    /// Underlying session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Current connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.session.state()
    }

    /// Profile used to connect.
    pub fn profile(&self) -> &ConnectionProfile {
        &self.profile
    }

    /// Line editor state.
    pub fn input(&self) -> &InputState {
        &self.input
    }

    /// Current view.
    pub fn view(&self) -> &View {
        &self.view
    }

    /// Notification log, oldest first.
    pub fn log(&self) -> impl DoubleEndedIterator<Item = &LogEntry> {
        self.log.iter()
    }

    /// Most recent notification. `None` before anything happened.
    pub fn status(&self) -> Option<&LogEntry> {
        self.log.back()
    }

    /// Recently heard adverts, oldest first.
    pub fn adverts(&self) -> impl DoubleEndedIterator<Item = &Advert> {
        self.adverts.iter()
    }

    /// Terminal dimensions (columns, rows).
    pub fn terminal_size(&self) -> (u16, u16) {
        self.terminal_size
    }

    /// Inbound messages in `id` the user has not seen.
    pub fn unread_count(&self, id: &ConversationId) -> usize {
        let Ok(conversation) = self.session.store().conversation(id) else {
            return 0;
        };
        let seen = self.read_marks.get(id).copied().unwrap_or(0);
        conversation.messages.iter().skip(seen).filter(|m| !m.is_outbound()).count()
    }

    /// Messages for the current view, at most `limit`, oldest first.
    pub fn visible_messages(&self, limit: usize) -> Vec<&Message> {
        match &self.view {
            View::Unified => self.session.store().unified_view(Some(limit)).collect(),
            View::Conversation(id) => self
                .session
                .store()
                .conversation(id)
                .map(|c| {
                    let start = c.messages.len().saturating_sub(limit);
                    c.messages[start..].iter().collect()
                })
                .unwrap_or_default(),
        }
    }
}
