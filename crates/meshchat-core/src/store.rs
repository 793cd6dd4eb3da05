//! Conversation store.
//!
//! Holds every conversation seen during a session, keyed by
//! [`ConversationId`]. Conversations are created lazily on first reference and
//! never removed. The store assigns each appended message a global arrival
//! sequence number, which breaks timestamp ties in the unified view.
//!
//! # Ordering
//!
//! Within a conversation, timestamps never decrease: a message observed with
//! an earlier timestamp than its predecessor (clock skew between the caller's
//! clock readings) is clamped to the predecessor's timestamp. Because the
//! sequence number also increases with every append, each conversation is
//! sorted by `(timestamp, sequence)` and the unified view is a k-way merge of
//! already-sorted lanes.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::{
    conversation::{
        Conversation, ConversationId, DeliveryState, Direction, Message, MessageDraft,
        MessageToken, Timestamp,
    },
    error::StoreError,
};

/// Result of a successful [`ConversationStore::append`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Appended {
    /// Arrival sequence number assigned to the message.
    pub sequence: u64,
    /// Whether the conversation was created by this append.
    pub created: bool,
}

/// Ordered message histories for all conversations.
#[derive(Debug, Clone, Default)]
pub struct ConversationStore {
    conversations: BTreeMap<ConversationId, Conversation>,
    /// Outbound message locations by correlation token.
    tokens: HashMap<MessageToken, (ConversationId, usize)>,
    next_sequence: u64,
}

impl ConversationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message, creating the conversation if it does not exist.
    ///
    /// Outbound messages start [`DeliveryState::Pending`]; inbound messages
    /// are terminal on arrival and stored as [`DeliveryState::Acked`].
    ///
    /// # Errors
    ///
    /// - `StoreError::InvalidIdentity` if the identity has an empty name
    pub fn append(
        &mut self,
        id: ConversationId,
        draft: MessageDraft,
    ) -> Result<Appended, StoreError> {
        if !id.is_well_formed() {
            return Err(StoreError::InvalidIdentity(id));
        }

        let created = !self.conversations.contains_key(&id);
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        let conversation = self
            .conversations
            .entry(id.clone())
            .or_insert_with(|| Conversation::new(id.clone(), draft.timestamp));

        let timestamp = conversation
            .last_message()
            .map_or(draft.timestamp, |last| draft.timestamp.max(last.timestamp));

        let delivery = match draft.direction {
            Direction::Inbound => DeliveryState::Acked,
            Direction::Outbound => DeliveryState::Pending,
        };

        if let Some(token) = draft.token {
            self.tokens.insert(token, (id.clone(), conversation.messages.len()));
        }

        conversation.messages.push(Message {
            conversation: id,
            direction: draft.direction,
            author: draft.author,
            body: draft.body,
            timestamp,
            sent_at: draft.sent_at,
            sequence,
            token: draft.token,
            delivery,
        });
        conversation.last_activity = conversation.last_activity.max(timestamp);

        Ok(Appended { sequence, created })
    }

    /// Create an empty conversation if absent.
    ///
    /// Returns `true` if the conversation was created.
    ///
    /// # Errors
    ///
    /// - `StoreError::InvalidIdentity` if the identity has an empty name
    pub fn ensure(&mut self, id: ConversationId, now: Timestamp) -> Result<bool, StoreError> {
        if !id.is_well_formed() {
            return Err(StoreError::InvalidIdentity(id));
        }
        if self.conversations.contains_key(&id) {
            return Ok(false);
        }
        self.conversations.insert(id.clone(), Conversation::new(id, now));
        Ok(true)
    }

    /// Move an outbound message to a new delivery state.
    ///
    /// # Errors
    ///
    /// - `StoreError::MessageNotFound` if no outbound message has this token
    /// - `StoreError::InvalidTransition` if the move is not forward-only; the
    ///   message is left unchanged
    pub fn update_delivery_state(
        &mut self,
        token: MessageToken,
        next: DeliveryState,
    ) -> Result<&Message, StoreError> {
        let message = self.message_mut(token).ok_or(StoreError::MessageNotFound(token))?;

        if !message.delivery.can_transition_to(next) {
            return Err(StoreError::InvalidTransition { token, from: message.delivery, to: next });
        }

        message.delivery = next;
        Ok(&*message)
    }

    /// Mark every `Pending` outbound message as `Failed`.
    ///
    /// Returns the conversations that changed.
    pub fn fail_pending(&mut self) -> BTreeSet<ConversationId> {
        let mut touched = BTreeSet::new();
        for (id, index) in self.tokens.values() {
            let Some(message) =
                self.conversations.get_mut(id).and_then(|c| c.messages.get_mut(*index))
            else {
                continue;
            };
            if message.delivery == DeliveryState::Pending {
                message.delivery = DeliveryState::Failed;
                touched.insert(id.clone());
            }
        }
        touched
    }

    /// Messages across all conversations in `(timestamp, sequence)` order.
    ///
    /// With `Some(limit)`, only the most recent `limit` messages are yielded
    /// (still oldest first). The view borrows the store and can be cloned to
    /// restart iteration from the same position.
    pub fn unified_view(&self, limit: Option<usize>) -> UnifiedView<'_> {
        UnifiedView::new(self.conversations.values(), limit)
    }

    /// Look up a conversation.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the conversation was never created
    pub fn conversation(&self, id: &ConversationId) -> Result<&Conversation, StoreError> {
        self.conversations.get(id).ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    /// Whether a conversation exists.
    pub fn contains(&self, id: &ConversationId) -> bool {
        self.conversations.contains_key(id)
    }

    /// All conversations, channels first, each group sorted by name.
    pub fn conversations(&self) -> impl Iterator<Item = &Conversation> {
        self.conversations.values()
    }

    /// Resolve a bare name against known conversations.
    ///
    /// Channels take precedence over contacts of the same name. `None` if
    /// neither is known.
    pub fn resolve(&self, name: &str) -> Option<ConversationId> {
        let channel = ConversationId::channel(name);
        if self.conversations.contains_key(&channel) {
            return Some(channel);
        }
        let contact = ConversationId::contact(name);
        self.conversations.contains_key(&contact).then_some(contact)
    }

    /// Outbound message by correlation token.
    pub fn message(&self, token: MessageToken) -> Option<&Message> {
        let (id, index) = self.tokens.get(&token)?;
        self.conversations.get(id)?.messages.get(*index)
    }

    /// Number of conversations.
    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    /// Whether no conversation has been created yet.
    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// Total number of messages across all conversations.
    pub fn message_count(&self) -> usize {
        self.conversations.values().map(|c| c.messages.len()).sum()
    }

    fn message_mut(&mut self, token: MessageToken) -> Option<&mut Message> {
        let (id, index) = self.tokens.get(&token)?;
        self.conversations.get_mut(id)?.messages.get_mut(*index)
    }
}

/// One conversation's messages and the merge cursor into them.
#[derive(Debug, Clone)]
struct Lane<'a> {
    messages: &'a [Message],
    next: usize,
}

impl<'a> Lane<'a> {
    fn head(&self) -> Option<&'a Message> {
        self.messages.get(self.next)
    }
}

/// Lazy chronological merge over all conversations.
///
/// Produced by [`ConversationStore::unified_view`].
#[derive(Debug, Clone)]
pub struct UnifiedView<'a> {
    lanes: Vec<Lane<'a>>,
}

impl<'a> UnifiedView<'a> {
    fn new(conversations: impl Iterator<Item = &'a Conversation>, limit: Option<usize>) -> Self {
        let mut lanes: Vec<Lane<'a>> = conversations
            .filter(|c| !c.messages.is_empty())
            .map(|c| Lane { messages: &c.messages, next: 0 })
            .collect();

        if let Some(limit) = limit {
            // Walk the merge backwards from the tail to find where each lane
            // starts contributing to the last `limit` entries.
            let mut starts: Vec<usize> = lanes.iter().map(|lane| lane.messages.len()).collect();
            for _ in 0..limit {
                let newest = lanes
                    .iter()
                    .zip(&starts)
                    .enumerate()
                    .filter_map(|(i, (lane, &start))| {
                        let index = start.checked_sub(1)?;
                        lane.messages.get(index).map(|m| (i, m.order_key()))
                    })
                    .max_by_key(|&(_, key)| key);

                let Some((i, _)) = newest else { break };
                starts[i] -= 1;
            }
            for (lane, start) in lanes.iter_mut().zip(starts) {
                lane.next = start;
            }
        }

        Self { lanes }
    }
}

impl<'a> Iterator for UnifiedView<'a> {
    type Item = &'a Message;

    fn next(&mut self) -> Option<Self::Item> {
        let lane = self
            .lanes
            .iter_mut()
            .filter(|lane| lane.head().is_some())
            .min_by_key(|lane| lane.head().map(Message::order_key))?;

        let message = lane.head()?;
        lane.next += 1;
        Some(message)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining =
            self.lanes.iter().map(|lane| lane.messages.len().saturating_sub(lane.next)).sum();
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for UnifiedView<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn inbound(author: &str, body: &str, at: u64) -> MessageDraft {
        MessageDraft::inbound(author, body, Timestamp::from_millis(at), None)
    }

    fn outbound(body: &str, at: u64, token: u64) -> MessageDraft {
        MessageDraft::outbound(body, Timestamp::from_millis(at), MessageToken(token))
    }

    #[test]
    fn append_creates_conversation_once() {
        let mut store = ConversationStore::new();
        let id = ConversationId::channel("#new");

        let first = store.append(id.clone(), inbound("bob", "hi", 10)).unwrap();
        let second = store.append(id.clone(), inbound("bob", "again", 20)).unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(store.len(), 1);
        assert_eq!(store.conversation(&id).unwrap().messages.len(), 2);
    }

    #[test]
    fn append_rejects_empty_identity() {
        let mut store = ConversationStore::new();
        let result = store.append(ConversationId::contact(""), inbound("x", "y", 1));

        assert!(matches!(result, Err(StoreError::InvalidIdentity(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn sequence_numbers_increase_across_conversations() {
        let mut store = ConversationStore::new();
        let a = store.append(ConversationId::channel("#a"), inbound("x", "1", 5)).unwrap();
        let b = store.append(ConversationId::contact("bob"), inbound("x", "2", 5)).unwrap();
        let c = store.append(ConversationId::channel("#a"), inbound("x", "3", 5)).unwrap();

        assert!(a.sequence < b.sequence && b.sequence < c.sequence);
    }

    #[test]
    fn timestamps_within_conversation_never_decrease() {
        let mut store = ConversationStore::new();
        let id = ConversationId::contact("alice");
        store.append(id.clone(), inbound("alice", "late clock", 100)).unwrap();
        store.append(id.clone(), inbound("alice", "early clock", 40)).unwrap();

        let conversation = store.conversation(&id).unwrap();
        assert_eq!(conversation.messages[1].timestamp, Timestamp::from_millis(100));
        assert_eq!(conversation.last_activity, Timestamp::from_millis(100));
    }

    #[test]
    fn inbound_is_terminal_outbound_is_pending() {
        let mut store = ConversationStore::new();
        let id = ConversationId::channel("#general");
        store.append(id.clone(), inbound("bob", "hey", 1)).unwrap();
        store.append(id.clone(), outbound("yo", 2, 7)).unwrap();

        let messages = &store.conversation(&id).unwrap().messages;
        assert_eq!(messages[0].delivery, DeliveryState::Acked);
        assert_eq!(messages[1].delivery, DeliveryState::Pending);
        assert_eq!(messages[1].author, "");
    }

    #[test]
    fn update_delivery_state_moves_forward() {
        let mut store = ConversationStore::new();
        store.append(ConversationId::contact("bob"), outbound("hi", 1, 1)).unwrap();

        store.update_delivery_state(MessageToken(1), DeliveryState::Sent).unwrap();
        let message = store.update_delivery_state(MessageToken(1), DeliveryState::Acked).unwrap();

        assert_eq!(message.delivery, DeliveryState::Acked);
    }

    #[test]
    fn terminal_delivery_state_never_regresses() {
        let mut store = ConversationStore::new();
        store.append(ConversationId::contact("bob"), outbound("hi", 1, 1)).unwrap();
        store.update_delivery_state(MessageToken(1), DeliveryState::Failed).unwrap();

        for next in [DeliveryState::Pending, DeliveryState::Sent, DeliveryState::Acked] {
            let result = store.update_delivery_state(MessageToken(1), next);
            assert!(matches!(result, Err(StoreError::InvalidTransition { .. })));
        }
        assert_eq!(store.message(MessageToken(1)).unwrap().delivery, DeliveryState::Failed);
    }

    #[test]
    fn update_unknown_token_is_not_found() {
        let mut store = ConversationStore::new();
        let result = store.update_delivery_state(MessageToken(99), DeliveryState::Acked);
        assert_eq!(result.unwrap_err(), StoreError::MessageNotFound(MessageToken(99)));
    }

    #[test]
    fn fail_pending_leaves_sent_and_acked_alone() {
        let mut store = ConversationStore::new();
        let bob = ConversationId::contact("bob");
        let general = ConversationId::channel("#general");
        store.append(bob.clone(), outbound("one", 1, 1)).unwrap();
        store.append(general.clone(), outbound("two", 2, 2)).unwrap();
        store.append(general.clone(), outbound("three", 3, 3)).unwrap();
        store.update_delivery_state(MessageToken(2), DeliveryState::Sent).unwrap();
        store.update_delivery_state(MessageToken(3), DeliveryState::Acked).unwrap();

        let touched = store.fail_pending();

        assert_eq!(touched.into_iter().collect::<Vec<_>>(), vec![bob]);
        assert_eq!(store.message(MessageToken(1)).unwrap().delivery, DeliveryState::Failed);
        assert_eq!(store.message(MessageToken(2)).unwrap().delivery, DeliveryState::Sent);
        assert_eq!(store.message(MessageToken(3)).unwrap().delivery, DeliveryState::Acked);
    }

    #[test]
    fn unified_view_merges_by_timestamp_then_sequence() {
        let mut store = ConversationStore::new();
        store.append(ConversationId::contact("bob"), inbound("bob", "b1", 30)).unwrap();
        store.append(ConversationId::channel("#a"), inbound("x", "a1", 10)).unwrap();
        store.append(ConversationId::channel("#a"), inbound("x", "a2", 30)).unwrap();
        store.append(ConversationId::contact("bob"), inbound("bob", "b2", 50)).unwrap();

        let bodies: Vec<_> = store.unified_view(None).map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["a1", "b1", "a2", "b2"]);
    }

    #[test]
    fn unified_view_limit_keeps_most_recent() {
        let mut store = ConversationStore::new();
        for (i, name) in ["#a", "#b", "#a", "#c", "#b"].iter().enumerate() {
            let at = (i as u64) * 10;
            store.append(ConversationId::channel(*name), inbound("x", &i.to_string(), at)).unwrap();
        }

        let bodies: Vec<_> = store.unified_view(Some(3)).map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["2", "3", "4"]);

        let everything = store.unified_view(Some(50)).count();
        assert_eq!(everything, 5);
        assert_eq!(store.unified_view(Some(0)).count(), 0);
    }

    #[test]
    fn unified_view_is_restartable() {
        let mut store = ConversationStore::new();
        store.append(ConversationId::channel("#a"), inbound("x", "1", 1)).unwrap();
        store.append(ConversationId::channel("#b"), inbound("x", "2", 2)).unwrap();

        let mut view = store.unified_view(None);
        let snapshot = view.clone();
        assert_eq!(view.next().map(|m| m.body.as_str()), Some("1"));

        assert_eq!(snapshot.len(), 2);
        assert_eq!(view.len(), 1);
    }

    #[test]
    fn resolve_prefers_channels() {
        let mut store = ConversationStore::new();
        store.ensure(ConversationId::contact("mesh"), Timestamp::default()).unwrap();
        assert_eq!(store.resolve("mesh"), Some(ConversationId::contact("mesh")));

        store.ensure(ConversationId::channel("mesh"), Timestamp::default()).unwrap();
        assert_eq!(store.resolve("mesh"), Some(ConversationId::channel("mesh")));
        assert_eq!(store.resolve("Mesh"), None);
    }

    #[test]
    fn conversation_lookup_reports_missing() {
        let store = ConversationStore::new();
        let id = ConversationId::channel("#nope");
        assert_eq!(store.conversation(&id).unwrap_err(), StoreError::NotFound(id));
    }
}
