//! Property-based tests for the session controller.
//!
//! Arbitrary interleavings of user commands and transport events must keep
//! the store ordered, keep delivery states monotonic, and never leave a
//! message pending once the session is disconnected.

use std::collections::HashMap;

use meshchat_core::{
    ConnectAttempt, ConnectionProfile, ConnectionState, ConversationId, DeliveryState, LinkState,
    MessageToken, Session, SessionAction, SessionError, Teardown, Timestamp, TransportEvent,
    TransportHandle, TransportRequest,
};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Connect,
    CompleteConnect { ok: bool },
    Disconnect,
    CompleteDisconnect,
    LinkDown,
    Send { to: usize, body: String },
    Incoming { from: usize, body: String, skew: u64 },
    Deliver { token: u64, state: DeliveryState },
    Advance(u64),
}

const NAMES: [&str; 4] = ["#general", "#test", "alice", "bob"];

fn conversation(index: usize) -> ConversationId {
    let name = NAMES[index % NAMES.len()];
    if name.starts_with('#') { ConversationId::channel(name) } else { ConversationId::contact(name) }
}

fn delivery_strategy() -> impl Strategy<Value = DeliveryState> {
    prop_oneof![
        Just(DeliveryState::Pending),
        Just(DeliveryState::Sent),
        Just(DeliveryState::Acked),
        Just(DeliveryState::Failed),
    ]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        2 => Just(Op::Connect),
        2 => any::<bool>().prop_map(|ok| Op::CompleteConnect { ok }),
        1 => Just(Op::Disconnect),
        1 => Just(Op::CompleteDisconnect),
        1 => Just(Op::LinkDown),
        4 => (0usize..4, "[a-z]{1,8}").prop_map(|(to, body)| Op::Send { to, body }),
        3 => (0usize..4, "[a-z]{1,8}", 0u64..50)
            .prop_map(|(from, body, skew)| Op::Incoming { from, body, skew }),
        3 => (0u64..12, delivery_strategy()).prop_map(|(token, state)| Op::Deliver { token, state }),
        2 => (0u64..100).prop_map(Op::Advance),
    ]
}

/// Minimal stand-in for a driver: remembers what the session asked for.
#[derive(Default)]
struct Requests {
    connect: Option<ConnectAttempt>,
    teardown: Option<Teardown>,
    next_handle: u64,
}

impl Requests {
    fn record(&mut self, actions: &[SessionAction]) {
        for action in actions {
            let SessionAction::Transport(request) = action else { continue };
            match request {
                TransportRequest::Connect { attempt, .. } => self.connect = Some(*attempt),
                TransportRequest::CancelConnect { attempt } => {
                    self.teardown = Some(Teardown::Attempt(*attempt));
                },
                TransportRequest::Disconnect { handle } => {
                    self.teardown = Some(Teardown::Link(*handle));
                },
                _ => {},
            }
        }
    }
}

fn apply(session: &mut Session, requests: &mut Requests, now: &mut u64, op: Op) {
    let at = Timestamp::from_millis(*now);
    let actions = match op {
        Op::Connect => session.connect(ConnectionProfile::new("node", "/dev/ttyUSB0")).unwrap_or_default(),
        Op::CompleteConnect { ok } => {
            let Some(attempt) = requests.connect.take() else { return };
            requests.next_handle += 1;
            let result = if ok {
                Ok(TransportHandle(requests.next_handle))
            } else {
                Err(meshchat_core::TransportError::Connect("refused".into()))
            };
            session.on_transport_event(TransportEvent::ConnectCompleted { attempt, result }, at)
        },
        Op::Disconnect => session.disconnect(),
        Op::CompleteDisconnect => {
            let Some(teardown) = requests.teardown.take() else { return };
            session.on_transport_event(
                TransportEvent::DisconnectCompleted { teardown, result: Ok(()) },
                at,
            )
        },
        Op::LinkDown => session.on_transport_event(
            TransportEvent::LinkStateChanged(LinkState::Down { reason: "lost".into() }),
            at,
        ),
        Op::Send { to, body } => {
            let destination = conversation(to);
            let before = session.store().message_count();
            let connected = session.state().is_connected();
            let result =
                session.dispatch(meshchat_core::Command::Send { destination, body }, at);
            if !connected {
                assert_eq!(result, Err(SessionError::NotConnected));
                assert_eq!(session.store().message_count(), before);
            }
            result.unwrap_or_default()
        },
        Op::Incoming { from, body, skew } => session.on_transport_event(
            TransportEvent::IncomingMessage {
                conversation: conversation(from),
                author: "peer".into(),
                body,
                sent_at: None,
            },
            Timestamp::from_millis(now.saturating_sub(skew)),
        ),
        Op::Deliver { token, state } => session
            .on_transport_event(TransportEvent::DeliveryUpdate { token: MessageToken(token), state }, at),
        Op::Advance(millis) => {
            *now += millis;
            Vec::new()
        },
    };
    requests.record(&actions);
}

fn rank(state: DeliveryState) -> u8 {
    match state {
        DeliveryState::Pending => 0,
        DeliveryState::Sent => 1,
        DeliveryState::Acked | DeliveryState::Failed => 2,
    }
}

proptest! {
    #[test]
    fn prop_unified_view_is_ordered(ops in prop::collection::vec(op_strategy(), 0..80)) {
        let mut session = Session::new();
        let mut requests = Requests::default();
        let mut now = 1_000;

        for op in ops {
            apply(&mut session, &mut requests, &mut now, op);

            let keys: Vec<_> = session.store().unified_view(None).map(|m| m.order_key()).collect();
            prop_assert!(keys.windows(2).all(|pair| pair[0] <= pair[1]));
            prop_assert_eq!(keys.len(), session.store().message_count());
        }
    }

    #[test]
    fn prop_delivery_never_regresses(ops in prop::collection::vec(op_strategy(), 0..80)) {
        let mut session = Session::new();
        let mut requests = Requests::default();
        let mut now = 1_000;
        let mut seen: HashMap<MessageToken, DeliveryState> = HashMap::new();

        for op in ops {
            apply(&mut session, &mut requests, &mut now, op);

            for message in session.store().unified_view(None).filter(|m| m.is_outbound()) {
                let Some(token) = message.token else { continue };
                if let Some(previous) = seen.insert(token, message.delivery) {
                    prop_assert!(rank(previous) <= rank(message.delivery));
                    if previous.is_terminal() {
                        prop_assert_eq!(previous, message.delivery);
                    }
                }
            }
        }
    }

    #[test]
    fn prop_nothing_pending_when_disconnected(ops in prop::collection::vec(op_strategy(), 0..80)) {
        let mut session = Session::new();
        let mut requests = Requests::default();
        let mut now = 1_000;

        for op in ops {
            apply(&mut session, &mut requests, &mut now, op);

            if matches!(session.state(), ConnectionState::Disconnected | ConnectionState::Disconnecting) {
                let pending = session
                    .store()
                    .unified_view(None)
                    .filter(|m| m.delivery == DeliveryState::Pending)
                    .count();
                prop_assert_eq!(pending, 0);
            }
        }
    }

    #[test]
    fn prop_one_conversation_per_identity(froms in prop::collection::vec(0usize..4, 1..40)) {
        let mut session = Session::new();
        for (i, from) in froms.iter().enumerate() {
            session.on_transport_event(
                TransportEvent::IncomingMessage {
                    conversation: conversation(*from),
                    author: "peer".into(),
                    body: i.to_string(),
                    sent_at: None,
                },
                Timestamp::from_millis(i as u64),
            );
        }

        let mut distinct = froms.clone();
        distinct.sort_unstable();
        distinct.dedup();
        prop_assert_eq!(session.store().len(), distinct.len());
        prop_assert_eq!(session.store().message_count(), froms.len());
    }
}
