//! Simulation driver implementing the Driver trait.
//!
//! `SimDriver` provides the same interface as the terminal driver but for
//! deterministic testing. It implements [`Driver`] so the same
//! [`meshchat_app::Runtime`] orchestration code runs in both production and
//! simulation. Requests go to a [`SimRadio`]; time comes from a [`SimClock`].
//!
//! The radio answers immediately: its replies are queued ahead of any input
//! injected earlier, so a scripted line typed after `connect` sees the link
//! already open.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use meshchat_app::{App, AppEvent, Driver, KeyInput};
use meshchat_core::{
    ConnectionProfile, DeliveryState, MessageToken, Timestamp, TransportEvent, TransportRequest,
};
use thiserror::Error;

use crate::{
    SimClock, SimRadio,
    invariants::{InvariantRegistry, SessionSnapshot, Violation},
};

/// Error type for simulation driver.
#[derive(Debug, Error)]
pub enum SimDriverError {
    /// Invariants failed when rendering.
    #[error("{context}: {}", describe(.violations))]
    Invariant {
        /// Render count at the time of the failure.
        context: String,
        /// Every violated invariant.
        violations: Vec<Violation>,
    },
}

fn describe(violations: &[Violation]) -> String {
    violations.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

/// Shared state for event injection.
///
/// This allows injection from outside the runtime while it owns the driver.
struct SharedState {
    pending_events: VecDeque<AppEvent>,
    radio: SimRadio,
    clock: SimClock,
    executed: Vec<TransportRequest>,
    remembered: Vec<ConnectionProfile>,
    delivery_history: HashMap<MessageToken, Vec<DeliveryState>>,
    renders: usize,
    stopped: bool,
}

impl SharedState {
    /// Queue radio events ahead of injected input, keeping their order.
    fn deliver_next(&mut self, events: Vec<TransportEvent>) {
        for event in events.into_iter().rev() {
            self.pending_events.push_front(AppEvent::Transport(event));
        }
    }
}

/// Simulation driver for deterministic testing.
///
/// Cloning yields another handle to the same simulation, so a test can keep
/// one while the runtime owns the other.
#[derive(Clone)]
pub struct SimDriver {
    state: Arc<Mutex<SharedState>>,
    invariants: Option<Arc<InvariantRegistry>>,
}

impl SimDriver {
    /// Create a driver over the given radio with a default clock.
    pub fn new(radio: SimRadio) -> Self {
        Self::with_clock(radio, SimClock::default())
    }

    /// Create a driver over the given radio and clock.
    pub fn with_clock(radio: SimRadio, clock: SimClock) -> Self {
        let state = SharedState {
            pending_events: VecDeque::new(),
            radio,
            clock,
            executed: Vec::new(),
            remembered: Vec::new(),
            delivery_history: HashMap::new(),
            renders: 0,
            stopped: false,
        };
        Self { state: Arc::new(Mutex::new(state)), invariants: None }
    }

    /// Enable invariant checking on every render.
    #[must_use]
    pub fn with_invariants(mut self, registry: InvariantRegistry) -> Self {
        self.invariants = Some(Arc::new(registry));
        self
    }

    fn lock(&self) -> MutexGuard<'_, SharedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inject an `AppEvent` for processing.
    pub fn inject_event(&self, event: AppEvent) {
        self.lock().pending_events.push_back(event);
    }

    /// Inject the key presses for typing `line` followed by Enter.
    pub fn inject_line(&self, line: &str) {
        let mut state = self.lock();
        state.pending_events.extend(line.chars().map(|c| AppEvent::Key(KeyInput::Char(c))));
        state.pending_events.push_back(AppEvent::Key(KeyInput::Enter));
    }

    /// Inject a tick. The radio gets a chance to produce chatter when the
    /// tick is polled.
    pub fn inject_tick(&self) {
        self.lock().pending_events.push_back(AppEvent::Tick);
    }

    /// Pull the radio's link and queue the resulting event.
    ///
    /// Returns `false` if no link was open.
    pub fn drop_link(&self, reason: &str) -> bool {
        let mut state = self.lock();
        match state.radio.drop_link(reason) {
            Some(event) => {
                state.pending_events.push_back(AppEvent::Transport(event));
                true
            },
            None => false,
        }
    }

    /// Take all requests executed so far.
    pub fn take_executed(&self) -> Vec<TransportRequest> {
        std::mem::take(&mut self.lock().executed)
    }

    /// Profiles reported through [`Driver::remember`].
    pub fn remembered(&self) -> Vec<ConnectionProfile> {
        self.lock().remembered.clone()
    }

    /// Check if there are pending events to process.
    pub fn has_pending(&self) -> bool {
        !self.lock().pending_events.is_empty()
    }

    /// Number of renders so far.
    pub fn renders(&self) -> usize {
        self.lock().renders
    }

    /// Whether the runtime stopped the driver.
    pub fn is_stopped(&self) -> bool {
        self.lock().stopped
    }

    /// Whether the simulated radio has a link open.
    pub fn radio_linked(&self) -> bool {
        self.lock().radio.is_linked()
    }

    /// Snapshot the app, recording each outbound message's delivery state in
    /// the driver's history first.
    pub fn snapshot_from_app(&self, app: &App) -> SessionSnapshot {
        let mut state = self.lock();
        for message in app.session().store().unified_view(None) {
            let Some(token) = message.token else { continue };
            let history = state.delivery_history.entry(token).or_default();
            if history.last() != Some(&message.delivery) {
                history.push(message.delivery);
            }
        }
        SessionSnapshot::from_app(app).with_delivery_history(state.delivery_history.clone())
    }

    /// Check invariants against App state.
    ///
    /// # Errors
    ///
    /// - `SimDriverError::Invariant` listing every violation
    pub fn check_invariants(&self, app: &App, context: &str) -> Result<(), SimDriverError> {
        let Some(registry) = &self.invariants else {
            return Ok(());
        };
        let snapshot = self.snapshot_from_app(app);
        registry.check_all(&snapshot).map_err(|violations| SimDriverError::Invariant {
            context: context.to_string(),
            violations,
        })
    }
}

impl Driver for SimDriver {
    type Error = SimDriverError;

    async fn poll_event(&mut self) -> Result<Option<AppEvent>, Self::Error> {
        let mut state = self.lock();
        let now = state.clock.tick();

        let event = state.pending_events.pop_front();
        if matches!(event, Some(AppEvent::Tick)) {
            let chatter = state.radio.tick(now);
            state.deliver_next(chatter);
        }
        Ok(event)
    }

    async fn execute(&mut self, request: TransportRequest) -> Result<(), Self::Error> {
        let mut state = self.lock();
        let now = state.clock.now();
        let events: Vec<TransportEvent> = state.radio.handle(&request, now);
        tracing::trace!(?request, replies = events.len(), "sim radio");

        state.deliver_next(events);
        state.executed.push(request);
        Ok(())
    }

    fn now(&self) -> Timestamp {
        self.lock().clock.now()
    }

    fn render(&mut self, app: &App) -> Result<(), Self::Error> {
        let renders = {
            let mut state = self.lock();
            state.renders += 1;
            state.renders
        };
        self.check_invariants(app, &format!("render {renders}"))
    }

    fn remember(&mut self, profile: &ConnectionProfile) {
        self.lock().remembered.push(profile.clone());
    }

    fn stop(&mut self) {
        self.lock().stopped = true;
    }
}
