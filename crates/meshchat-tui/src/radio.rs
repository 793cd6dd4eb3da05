//! In-process simulated radio.
//!
//! Runs a [`SimRadio`] as a tokio task. Requests and events flow through mpsc
//! channels, so the terminal driver talks to it the way it would talk to a
//! serial link task. Background chatter is generated on a fixed interval.

use std::time::Duration;

use meshchat_core::{TransportEvent, TransportRequest};
use meshchat_harness::{SimRadio, SimRadioConfig};
use tokio::sync::mpsc;

use crate::terminal::system_now;

/// How often the radio gets a chance to produce background traffic.
pub const CHATTER_INTERVAL: Duration = Duration::from_secs(3);

/// Handle to a running in-process radio.
pub struct RadioHandle {
    /// Send requests to the radio.
    pub to_radio: mpsc::Sender<TransportRequest>,
    /// Receive events from the radio.
    pub from_radio: mpsc::Receiver<TransportEvent>,
    /// Abort handle to stop the radio task.
    abort_handle: tokio::task::AbortHandle,
}

impl RadioHandle {
    /// Stop the radio.
    pub fn stop(&self) {
        self.abort_handle.abort();
    }
}

/// Spawn an in-process radio.
///
/// The task runs until stopped or until the request channel closes.
pub fn spawn_radio(config: SimRadioConfig, chatter_interval: Duration) -> RadioHandle {
    let (request_tx, mut request_rx) = mpsc::channel::<TransportRequest>(32);
    let (event_tx, event_rx) = mpsc::channel::<TransportEvent>(64);

    let handle = tokio::spawn(async move {
        let mut radio = SimRadio::new(config);
        let mut chatter = tokio::time::interval(chatter_interval);
        chatter.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            let events = tokio::select! {
                request = request_rx.recv() => match request {
                    Some(request) => {
                        tracing::debug!(?request, "radio request");
                        radio.handle(&request, system_now())
                    },
                    None => break,
                },
                _ = chatter.tick() => radio.tick(system_now()),
            };

            for event in events {
                if event_tx.send(event).await.is_err() {
                    tracing::debug!("event receiver dropped, radio stopping");
                    return;
                }
            }
        }
    });

    RadioHandle { to_radio: request_tx, from_radio: event_rx, abort_handle: handle.abort_handle() }
}

#[cfg(test)]
mod tests {
    use meshchat_core::{ConnectAttempt, ConnectionProfile};

    use super::*;

    #[tokio::test]
    async fn connect_is_answered() {
        let mut handle = spawn_radio(SimRadioConfig::default(), Duration::from_secs(3600));

        handle
            .to_radio
            .send(TransportRequest::Connect {
                attempt: ConnectAttempt(0),
                profile: ConnectionProfile::new("node", "/dev/sim"),
            })
            .await
            .unwrap();

        let event = handle.from_radio.recv().await.unwrap();
        assert!(matches!(event, TransportEvent::ConnectCompleted {
            attempt: ConnectAttempt(0),
            result: Ok(_)
        }));
        let roster = handle.from_radio.recv().await.unwrap();
        assert!(matches!(roster, TransportEvent::Roster { .. }));

        handle.stop();
    }

    #[tokio::test]
    async fn closing_requests_ends_task() {
        let RadioHandle { to_radio, mut from_radio, .. } =
            spawn_radio(SimRadioConfig::default(), Duration::from_secs(3600));
        drop(to_radio);

        assert!(from_radio.recv().await.is_none());
    }
}
