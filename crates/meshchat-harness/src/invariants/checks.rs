//! Standard invariant checks.
//!
//! These invariants capture behavioral properties that must always hold.
//! They verify WHAT must be true, not specific test scenarios.

use std::collections::HashSet;

use super::{Invariant, InvariantKind, InvariantResult, SessionSnapshot, Violation};

/// Unified view is sorted by `(timestamp, sequence)` and covers every message.
pub struct UnifiedViewOrdered;

impl Invariant for UnifiedViewOrdered {
    fn kind(&self) -> InvariantKind {
        InvariantKind::UnifiedViewOrdered
    }

    fn check(&self, state: &SessionSnapshot) -> InvariantResult {
        if let Some(pair) = state.unified.windows(2).find(|pair| pair[1] < pair[0]) {
            return Err(Violation {
                invariant: self.kind(),
                message: format!("{:?} follows {:?}", pair[1], pair[0]),
            });
        }

        let total: usize = state.conversations.iter().map(|c| c.messages.len()).sum();
        if total != state.unified.len() {
            return Err(Violation {
                invariant: self.kind(),
                message: format!("unified view has {} of {total} messages", state.unified.len()),
            });
        }
        Ok(())
    }
}

/// Exactly one conversation per identity.
pub struct UniqueConversations;

impl Invariant for UniqueConversations {
    fn kind(&self) -> InvariantKind {
        InvariantKind::UniqueConversations
    }

    fn check(&self, state: &SessionSnapshot) -> InvariantResult {
        let mut seen = HashSet::new();
        for conversation in &state.conversations {
            if !seen.insert(&conversation.id) {
                return Err(Violation {
                    invariant: self.kind(),
                    message: format!("duplicate conversation {}", conversation.id),
                });
            }
        }
        Ok(())
    }
}

/// Messages within a conversation never go back in time.
pub struct ConversationTimestampsMonotonic;

impl Invariant for ConversationTimestampsMonotonic {
    fn kind(&self) -> InvariantKind {
        InvariantKind::ConversationTimestampsMonotonic
    }

    fn check(&self, state: &SessionSnapshot) -> InvariantResult {
        for conversation in &state.conversations {
            for pair in conversation.messages.windows(2) {
                if pair[1].timestamp < pair[0].timestamp || pair[1].sequence <= pair[0].sequence {
                    return Err(Violation {
                        invariant: self.kind(),
                        message: format!(
                            "{}: ({}, {}) after ({}, {})",
                            conversation.id,
                            pair[1].timestamp,
                            pair[1].sequence,
                            pair[0].timestamp,
                            pair[0].sequence
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Teardown fails every pending send.
///
/// Once the session is `Disconnecting` or `Disconnected`, no outbound message
/// may still be `Pending`.
pub struct NoPendingWhenDisconnected;

impl Invariant for NoPendingWhenDisconnected {
    fn kind(&self) -> InvariantKind {
        InvariantKind::NoPendingWhenDisconnected
    }

    fn check(&self, state: &SessionSnapshot) -> InvariantResult {
        if !state.torn_down {
            return Ok(());
        }
        for conversation in &state.conversations {
            if let Some(message) = conversation.messages.iter().find(|m| m.pending) {
                return Err(Violation {
                    invariant: self.kind(),
                    message: format!(
                        "{}: message {} pending while {}",
                        conversation.id, message.sequence, state.state
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Inbound messages are stored as `Acked`.
pub struct InboundAlwaysAcked;

impl Invariant for InboundAlwaysAcked {
    fn kind(&self) -> InvariantKind {
        InvariantKind::InboundAlwaysAcked
    }

    fn check(&self, state: &SessionSnapshot) -> InvariantResult {
        for conversation in &state.conversations {
            if let Some(message) = conversation.messages.iter().find(|m| m.inbound && !m.acked) {
                return Err(Violation {
                    invariant: self.kind(),
                    message: format!(
                        "{}: inbound message {} is {}",
                        conversation.id, message.sequence, message.delivery
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Observed delivery states of a message only move forward.
pub struct DeliveryMonotonicity;

impl Invariant for DeliveryMonotonicity {
    fn kind(&self) -> InvariantKind {
        InvariantKind::DeliveryMonotonicity
    }

    fn check(&self, state: &SessionSnapshot) -> InvariantResult {
        for (token, history) in &state.delivery_history {
            for pair in history.windows(2) {
                let (from, to) = (pair[0], pair[1]);
                if from != to && !from.can_transition_to(to) {
                    return Err(Violation {
                        invariant: self.kind(),
                        message: format!("{token}: delivery went {from} → {to}"),
                    });
                }
            }
        }
        Ok(())
    }
}

/// The app only shows conversations that exist.
pub struct ViewInConversations;

impl Invariant for ViewInConversations {
    fn kind(&self) -> InvariantKind {
        InvariantKind::ViewInConversations
    }

    fn check(&self, state: &SessionSnapshot) -> InvariantResult {
        let Some(view) = &state.view else {
            return Ok(());
        };
        if state.conversations.iter().any(|c| &c.id == view) {
            Ok(())
        } else {
            Err(Violation {
                invariant: self.kind(),
                message: format!("view {view} has no conversation"),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use meshchat_core::{ConversationId, DeliveryState, MessageToken};

    use super::*;
    use crate::invariants::{ConversationSnapshot, MessageSnapshot};

    fn message(timestamp: u64, sequence: u64, delivery: DeliveryState, inbound: bool) -> MessageSnapshot {
        MessageSnapshot {
            timestamp,
            sequence,
            inbound,
            delivery: delivery.to_string(),
            pending: delivery == DeliveryState::Pending,
            acked: delivery == DeliveryState::Acked,
        }
    }

    fn general() -> ConversationId {
        ConversationId::channel("#general")
    }

    fn snapshot(messages: Vec<MessageSnapshot>) -> SessionSnapshot {
        let unified = messages.iter().map(|m| (m.timestamp, m.sequence)).collect();
        SessionSnapshot {
            state: "connected".into(),
            torn_down: false,
            conversations: vec![ConversationSnapshot { id: general(), messages }],
            unified,
            view: None,
            delivery_history: HashMap::new(),
        }
    }

    #[test]
    fn unordered_unified_view_detected() {
        let mut state = snapshot(vec![
            message(10, 0, DeliveryState::Acked, true),
            message(20, 1, DeliveryState::Acked, true),
        ]);
        state.unified.reverse();
        assert!(UnifiedViewOrdered.check(&state).is_err());
    }

    #[test]
    fn duplicate_conversation_detected() {
        let mut state = snapshot(Vec::new());
        state.conversations.push(ConversationSnapshot { id: general(), messages: Vec::new() });
        assert!(UniqueConversations.check(&state).is_err());
    }

    #[test]
    fn same_display_name_is_not_a_duplicate() {
        let mut state = snapshot(Vec::new());
        state.conversations = vec![
            ConversationSnapshot { id: ConversationId::channel("@bob"), messages: Vec::new() },
            ConversationSnapshot { id: ConversationId::contact("bob"), messages: Vec::new() },
        ];
        assert!(UniqueConversations.check(&state).is_ok());
    }

    #[test]
    fn timestamp_regression_detected() {
        let state = snapshot(vec![
            message(20, 0, DeliveryState::Acked, true),
            message(10, 1, DeliveryState::Acked, true),
        ]);
        assert!(ConversationTimestampsMonotonic.check(&state).is_err());
    }

    #[test]
    fn pending_after_teardown_detected() {
        let mut state = snapshot(vec![message(1, 0, DeliveryState::Pending, false)]);
        assert!(NoPendingWhenDisconnected.check(&state).is_ok());

        state.torn_down = true;
        assert!(NoPendingWhenDisconnected.check(&state).is_err());
    }

    #[test]
    fn inbound_pending_detected() {
        let state = snapshot(vec![message(1, 0, DeliveryState::Pending, true)]);
        assert!(InboundAlwaysAcked.check(&state).is_err());
    }

    #[test]
    fn delivery_regression_detected() {
        let mut state = snapshot(Vec::new());
        state.delivery_history.insert(MessageToken(1), vec![
            DeliveryState::Pending,
            DeliveryState::Sent,
            DeliveryState::Sent,
            DeliveryState::Acked,
        ]);
        assert!(DeliveryMonotonicity.check(&state).is_ok());

        state.delivery_history.insert(MessageToken(2), vec![DeliveryState::Failed, DeliveryState::Acked]);
        assert!(DeliveryMonotonicity.check(&state).is_err());
    }

    #[test]
    fn dangling_view_detected() {
        let mut state = snapshot(Vec::new());
        state.view = Some(ConversationId::contact("nobody"));
        assert!(ViewInConversations.check(&state).is_err());

        state.view = Some(general());
        assert!(ViewInConversations.check(&state).is_ok());
    }
}
