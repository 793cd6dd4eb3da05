//! Scripted radio transport.
//!
//! [`SimRadio`] answers [`TransportRequest`]s the way a companion radio would,
//! with a seeded RNG deciding which sends fail and when background chatter
//! arrives. Two radios built from the same config produce the same event
//! stream for the same requests.
//!
//! Once a link is up the radio reports its roster: the peers as contacts and
//! the channels stored on the device, which count as subscribed.
//!
//! Channel chatter arrives with an empty author and a `Name: text` body, the
//! way channel frames from unknown senders look on the air.

use std::collections::BTreeSet;

use meshchat_core::{
    ConversationId, DeliveryState, LinkState, Teardown, Timestamp, TransportError, TransportEvent,
    TransportHandle, TransportRequest,
};
use rand::{Rng, SeedableRng, seq::SliceRandom};
use rand_chacha::ChaCha8Rng;

const PHRASES: &[&str] = &[
    "anyone copy?",
    "signal is good up here",
    "relay 3 back online",
    "heading out, 73",
    "testing from the ridge",
    "battery at 40%",
];

/// Behavior of a [`SimRadio`].
#[derive(Debug, Clone)]
pub struct SimRadioConfig {
    /// RNG seed.
    pub seed: u64,
    /// Refuse every connect.
    pub refuse_connect: bool,
    /// Channels whose subscription is refused.
    pub refused_channels: BTreeSet<String>,
    /// Probability that a transmitted message is never acknowledged.
    pub failure_rate: f64,
    /// Probability per tick of background traffic.
    pub chatter_rate: f64,
    /// Other nodes on the mesh. Contacts named here answer direct messages.
    pub peers: Vec<String>,
    /// Channels stored on the radio, subscribed as soon as the link is up.
    pub channels: Vec<String>,
}

impl Default for SimRadioConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            refuse_connect: false,
            refused_channels: BTreeSet::new(),
            failure_rate: 0.0,
            chatter_rate: 0.0,
            peers: vec!["alice".into(), "bob".into(), "relay-3".into()],
            channels: Vec::new(),
        }
    }
}

/// Simulated companion radio.
#[derive(Debug, Clone)]
pub struct SimRadio {
    config: SimRadioConfig,
    rng: ChaCha8Rng,
    link: Option<TransportHandle>,
    next_handle: u64,
    subscribed: BTreeSet<String>,
}

impl SimRadio {
    /// Create a radio with the given behavior.
    pub fn new(config: SimRadioConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self { config, rng, link: None, next_handle: 1, subscribed: BTreeSet::new() }
    }

    /// Whether a link is open.
    pub fn is_linked(&self) -> bool {
        self.link.is_some()
    }

    /// Channels subscribed on the current link.
    pub fn subscribed(&self) -> impl Iterator<Item = &str> {
        self.subscribed.iter().map(String::as_str)
    }

    /// Execute a request and return the events it produces, in order.
    pub fn handle(&mut self, request: &TransportRequest, now: Timestamp) -> Vec<TransportEvent> {
        match request {
            TransportRequest::Connect { attempt, profile } => {
                if self.config.refuse_connect {
                    let err = TransportError::Connect(format!("no radio at {}", profile.address));
                    return vec![TransportEvent::ConnectCompleted {
                        attempt: *attempt,
                        result: Err(err),
                    }];
                }

                let handle = TransportHandle(self.next_handle);
                self.next_handle += 1;
                self.link = Some(handle);
                self.subscribed.extend(self.config.channels.iter().cloned());
                vec![
                    TransportEvent::ConnectCompleted { attempt: *attempt, result: Ok(handle) },
                    TransportEvent::Roster {
                        contacts: self.config.peers.clone(),
                        channels: self.config.channels.clone(),
                    },
                ]
            },
            TransportRequest::CancelConnect { attempt } => {
                self.close();
                vec![TransportEvent::DisconnectCompleted {
                    teardown: Teardown::Attempt(*attempt),
                    result: Ok(()),
                }]
            },
            TransportRequest::Disconnect { handle } => {
                let result = match self.link {
                    Some(open) if open != *handle => {
                        Err(TransportError::Disconnect(format!("unknown handle {}", handle.0)))
                    },
                    _ => Ok(()),
                };
                self.close();
                vec![TransportEvent::DisconnectCompleted { teardown: Teardown::Link(*handle), result }]
            },
            TransportRequest::Send { handle, token, destination, body } => {
                if self.link != Some(*handle) {
                    return vec![TransportEvent::DeliveryUpdate {
                        token: *token,
                        state: DeliveryState::Failed,
                    }];
                }

                let outcome = if self.rng.gen_bool(clamp(self.config.failure_rate)) {
                    DeliveryState::Failed
                } else {
                    DeliveryState::Acked
                };
                let mut events = vec![
                    TransportEvent::DeliveryUpdate { token: *token, state: DeliveryState::Sent },
                    TransportEvent::DeliveryUpdate { token: *token, state: outcome },
                ];

                if let ConversationId::Contact(name) = destination
                    && outcome == DeliveryState::Acked
                    && self.config.peers.contains(name)
                {
                    events.push(TransportEvent::IncomingMessage {
                        conversation: destination.clone(),
                        author: name.clone(),
                        body: format!("re: {body}"),
                        sent_at: Some(now),
                    });
                }
                events
            },
            TransportRequest::Subscribe { handle, channel } => {
                let result = if self.link != Some(*handle) {
                    Err(TransportError::Subscribe("link closed".into()))
                } else if self.config.refused_channels.contains(channel) {
                    Err(TransportError::Subscribe(format!("{channel} refused")))
                } else {
                    self.subscribed.insert(channel.clone());
                    Ok(())
                };
                vec![TransportEvent::SubscribeCompleted { channel: channel.clone(), result }]
            },
            TransportRequest::Advert { handle } => {
                let result = if self.link == Some(*handle) {
                    Ok(())
                } else {
                    Err(TransportError::Advert("link closed".into()))
                };
                vec![TransportEvent::AdvertCompleted { result }]
            },
        }
    }

    /// Background traffic for one tick. Empty while unlinked.
    pub fn tick(&mut self, now: Timestamp) -> Vec<TransportEvent> {
        if self.link.is_none() || !self.rng.gen_bool(clamp(self.config.chatter_rate)) {
            return Vec::new();
        }
        let Some(peer) = self.config.peers.choose(&mut self.rng).cloned() else {
            return Vec::new();
        };

        let channels: Vec<&String> = self.subscribed.iter().collect();
        if !channels.is_empty() && self.rng.gen_bool(0.7) {
            let channel = channels[self.rng.gen_range(0..channels.len())].clone();
            let phrase = PHRASES[self.rng.gen_range(0..PHRASES.len())];
            return vec![TransportEvent::IncomingMessage {
                conversation: ConversationId::channel(channel),
                author: String::new(),
                body: format!("{peer}: {phrase}"),
                sent_at: Some(now),
            }];
        }

        vec![TransportEvent::Advertisement { source: peer, timestamp: now }]
    }

    /// Drop the link as if the cable was pulled.
    ///
    /// `None` if no link was open.
    pub fn drop_link(&mut self, reason: &str) -> Option<TransportEvent> {
        self.link.take()?;
        self.subscribed.clear();
        Some(TransportEvent::LinkStateChanged(LinkState::Down { reason: reason.to_string() }))
    }

    fn close(&mut self) {
        self.link = None;
        self.subscribed.clear();
    }
}

fn clamp(probability: f64) -> f64 {
    if probability.is_nan() { 0.0 } else { probability.clamp(0.0, 1.0) }
}

#[cfg(test)]
mod tests {
    use meshchat_core::{ConnectAttempt, ConnectionProfile, MessageToken};

    use super::*;

    fn at(millis: u64) -> Timestamp {
        Timestamp::from_millis(millis)
    }

    fn linked(config: SimRadioConfig) -> (SimRadio, TransportHandle) {
        let mut radio = SimRadio::new(config);
        let events = radio.handle(
            &TransportRequest::Connect {
                attempt: ConnectAttempt(0),
                profile: ConnectionProfile::new("node", "/dev/ttyUSB0"),
            },
            at(0),
        );
        let [TransportEvent::ConnectCompleted { result: Ok(handle), .. }, TransportEvent::Roster { .. }] =
            events.as_slice()
        else {
            panic!("unexpected connect events: {events:?}");
        };
        (radio, *handle)
    }

    #[test]
    fn refused_connect() {
        let mut radio = SimRadio::new(SimRadioConfig { refuse_connect: true, ..Default::default() });
        let events = radio.handle(
            &TransportRequest::Connect {
                attempt: ConnectAttempt(4),
                profile: ConnectionProfile::new("node", "/dev/none"),
            },
            at(0),
        );

        assert_eq!(events, vec![TransportEvent::ConnectCompleted {
            attempt: ConnectAttempt(4),
            result: Err(TransportError::Connect("no radio at /dev/none".into())),
        }]);
        assert!(!radio.is_linked());
    }

    #[test]
    fn send_to_peer_is_acked_and_answered() {
        let (mut radio, handle) = linked(SimRadioConfig::default());
        let events = radio.handle(
            &TransportRequest::Send {
                handle,
                token: MessageToken(3),
                destination: ConversationId::contact("alice"),
                body: "ping".into(),
            },
            at(5),
        );

        assert_eq!(events.len(), 3);
        assert_eq!(events[1], TransportEvent::DeliveryUpdate {
            token: MessageToken(3),
            state: DeliveryState::Acked
        });
        assert!(matches!(&events[2], TransportEvent::IncomingMessage { body, .. } if body == "re: ping"));
    }

    #[test]
    fn certain_failure_rate_fails_every_send() {
        let (mut radio, handle) = linked(SimRadioConfig { failure_rate: 1.0, ..Default::default() });
        let events = radio.handle(
            &TransportRequest::Send {
                handle,
                token: MessageToken(0),
                destination: ConversationId::channel("#general"),
                body: "hello".into(),
            },
            at(1),
        );

        assert_eq!(events.last(), Some(&TransportEvent::DeliveryUpdate {
            token: MessageToken(0),
            state: DeliveryState::Failed
        }));
    }

    #[test]
    fn refused_channel() {
        let config = SimRadioConfig {
            refused_channels: BTreeSet::from(["#locked".to_string()]),
            ..Default::default()
        };
        let (mut radio, handle) = linked(config);

        let events = radio
            .handle(&TransportRequest::Subscribe { handle, channel: "#locked".into() }, at(1));
        assert!(matches!(
            events.as_slice(),
            [TransportEvent::SubscribeCompleted { result: Err(TransportError::Subscribe(_)), .. }]
        ));
        assert_eq!(radio.subscribed().count(), 0);
    }

    #[test]
    fn chatter_is_deterministic() {
        let config = SimRadioConfig { seed: 42, chatter_rate: 0.5, ..Default::default() };
        let run = || {
            let (mut radio, handle) = linked(config.clone());
            radio.handle(&TransportRequest::Subscribe { handle, channel: "#general".into() }, at(0));
            (1..50).flat_map(|i| radio.tick(at(i * 100))).collect::<Vec<_>>()
        };

        let first = run();
        assert!(!first.is_empty());
        assert_eq!(first, run());
    }

    #[test]
    fn disconnect_after_drop_succeeds() {
        let (mut radio, handle) = linked(SimRadioConfig::default());
        radio.drop_link("cable");

        let events = radio.handle(&TransportRequest::Disconnect { handle }, at(2));
        assert_eq!(events, vec![TransportEvent::DisconnectCompleted {
            teardown: Teardown::Link(handle),
            result: Ok(()),
        }]);
    }

    #[test]
    fn roster_follows_connect() {
        let config = SimRadioConfig { channels: vec!["#public".into()], ..Default::default() };
        let mut radio = SimRadio::new(config);
        let events = radio.handle(
            &TransportRequest::Connect {
                attempt: ConnectAttempt(0),
                profile: ConnectionProfile::new("node", "/dev/ttyUSB0"),
            },
            at(0),
        );

        assert_eq!(events[1], TransportEvent::Roster {
            contacts: vec!["alice".into(), "bob".into(), "relay-3".into()],
            channels: vec!["#public".into()],
        });
        assert_eq!(radio.subscribed().collect::<Vec<_>>(), vec!["#public"]);
    }

    #[test]
    fn no_chatter_without_link() {
        let mut radio = SimRadio::new(SimRadioConfig { chatter_rate: 1.0, ..Default::default() });
        assert!(radio.tick(at(1)).is_empty());
    }

    #[test]
    fn drop_link_once() {
        let (mut radio, _) = linked(SimRadioConfig::default());
        assert!(matches!(
            radio.drop_link("cable"),
            Some(TransportEvent::LinkStateChanged(LinkState::Down { .. }))
        ));
        assert_eq!(radio.drop_link("again"), None);
    }
}
