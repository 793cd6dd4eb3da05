//! Application input events.
//!
//! Events originate from two sources:
//! - User interactions (keys, resize) and periodic ticks.
//! - The radio transport, forwarded untouched to the session.

use meshchat_core::TransportEvent;

use crate::KeyInput;

/// Events processed by the [`crate::App`] state machine.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Keyboard input.
    Key(KeyInput),

    /// Periodic tick.
    Tick,

    /// Terminal resize (columns, rows).
    Resize(u16, u16),

    /// Completion or unsolicited event from the radio.
    Transport(TransportEvent),
}
