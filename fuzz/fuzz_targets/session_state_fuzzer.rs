//! Fuzz target for the session state machine
//!
//! # Strategy
//!
//! - User side: connect, disconnect, arbitrary input lines
//! - Radio side: connect completions for current and stale attempts,
//!   disconnect completions for the current or a made-up teardown, delivery
//!   updates for real and made-up tokens, inbound traffic, link loss
//! - Time: moves forward, sometimes not at all
//!
//! # Invariants
//!
//! - NEVER panic on any sequence
//! - Unified view is non-decreasing in (timestamp, sequence)
//! - Delivery state of a message never moves backwards
//! - Nothing is `Pending` while `Disconnected` or `Disconnecting`
//! - Every transport request carrying a handle uses the open one

#![no_main]

use std::collections::HashMap;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use meshchat_core::{
    ConnectAttempt, ConnectionProfile, ConnectionState, ConversationId, DeliveryState, LinkState,
    MessageToken, Session, SessionAction, Teardown, Timestamp, TransportError, TransportEvent,
    TransportHandle, TransportRequest,
};

#[derive(Debug, Clone, Arbitrary)]
enum Op {
    Connect,
    Disconnect,
    Line(String),
    CompleteConnect { attempt: u8, ok: bool },
    CompleteDisconnect { ok: bool, stale: bool },
    CompleteSubscribe { channel: String, ok: bool },
    Deliver { token: u8, state: Delivery },
    Incoming { channel: bool, author: String, body: String },
    LinkDown,
    Advance(u16),
}

#[derive(Debug, Clone, Copy, Arbitrary)]
enum Delivery {
    Pending,
    Sent,
    Acked,
    Failed,
}

impl From<Delivery> for DeliveryState {
    fn from(delivery: Delivery) -> Self {
        match delivery {
            Delivery::Pending => Self::Pending,
            Delivery::Sent => Self::Sent,
            Delivery::Acked => Self::Acked,
            Delivery::Failed => Self::Failed,
        }
    }
}

fn rank(state: DeliveryState) -> u8 {
    match state {
        DeliveryState::Pending => 0,
        DeliveryState::Sent => 1,
        DeliveryState::Acked | DeliveryState::Failed => 2,
    }
}

fn request_handle(request: &TransportRequest) -> Option<TransportHandle> {
    match request {
        TransportRequest::Disconnect { handle }
        | TransportRequest::Send { handle, .. }
        | TransportRequest::Subscribe { handle, .. }
        | TransportRequest::Advert { handle } => Some(*handle),
        TransportRequest::Connect { .. } | TransportRequest::CancelConnect { .. } => None,
    }
}

fuzz_target!(|ops: Vec<Op>| {
    let mut session = Session::new();
    let mut now = 1_000u64;
    let mut next_handle = 1u64;
    let mut open: Option<TransportHandle> = None;
    let mut teardown: Option<Teardown> = None;
    let mut seen: HashMap<MessageToken, DeliveryState> = HashMap::new();

    for op in ops.into_iter().take(256) {
        let at = Timestamp::from_millis(now);
        let actions = match op {
            Op::Connect => session
                .connect(ConnectionProfile::new("fuzz", "/dev/fuzz"))
                .unwrap_or_default(),
            Op::Disconnect => session.disconnect(),
            Op::Line(line) => session.submit(&line, at),
            Op::CompleteConnect { attempt, ok } => {
                let result = if ok {
                    let handle = TransportHandle(next_handle);
                    next_handle += 1;
                    Ok(handle)
                } else {
                    Err(TransportError::Connect("fuzz".into()))
                };
                let attempt = ConnectAttempt(u64::from(attempt % 4));
                session.on_transport_event(TransportEvent::ConnectCompleted { attempt, result }, at)
            },
            Op::CompleteDisconnect { ok, stale } => {
                let result = if ok { Ok(()) } else { Err(TransportError::Disconnect("fuzz".into())) };
                let teardown = match teardown {
                    Some(current) if !stale => current,
                    _ => Teardown::Link(TransportHandle(u64::MAX)),
                };
                session.on_transport_event(TransportEvent::DisconnectCompleted { teardown, result }, at)
            },
            Op::CompleteSubscribe { channel, ok } => {
                let result = if ok { Ok(()) } else { Err(TransportError::Subscribe("fuzz".into())) };
                session.on_transport_event(TransportEvent::SubscribeCompleted { channel, result }, at)
            },
            Op::Deliver { token, state } => session.on_transport_event(
                TransportEvent::DeliveryUpdate {
                    token: MessageToken(u64::from(token % 16)),
                    state: state.into(),
                },
                at,
            ),
            Op::Incoming { channel, author, body } => {
                let conversation = if channel {
                    ConversationId::channel(format!("#{}", author.len() % 3))
                } else {
                    ConversationId::contact(author.clone())
                };
                session.on_transport_event(
                    TransportEvent::IncomingMessage { conversation, author, body, sent_at: None },
                    at,
                )
            },
            Op::LinkDown => session.on_transport_event(
                TransportEvent::LinkStateChanged(LinkState::Down { reason: "fuzz".into() }),
                at,
            ),
            Op::Advance(millis) => {
                now += u64::from(millis);
                Vec::new()
            },
        };

        if let ConnectionState::Connected(handle) = session.state() {
            open = Some(handle);
        }
        for action in &actions {
            let SessionAction::Transport(request) = action else { continue };
            if let Some(handle) = request_handle(request) {
                assert_eq!(Some(handle), open, "request on stale handle: {request:?}");
            }
            match request {
                TransportRequest::Disconnect { handle } => teardown = Some(Teardown::Link(*handle)),
                TransportRequest::CancelConnect { attempt } => {
                    teardown = Some(Teardown::Attempt(*attempt));
                },
                _ => {},
            }
        }

        let store = session.store();
        let keys: Vec<_> = store.unified_view(None).map(|m| m.order_key()).collect();
        assert!(keys.windows(2).all(|w| w[0] <= w[1]), "unified view out of order");

        for message in store.unified_view(None) {
            if let Some(token) = message.token {
                if let Some(previous) = seen.insert(token, message.delivery) {
                    assert!(rank(previous) <= rank(message.delivery), "{token} regressed");
                    if previous.is_terminal() {
                        assert_eq!(previous, message.delivery, "{token} left terminal state");
                    }
                }
            }
        }

        if matches!(session.state(), ConnectionState::Disconnected | ConnectionState::Disconnecting) {
            assert!(store.unified_view(None).all(|m| m.delivery != DeliveryState::Pending));
        }
    }
});
