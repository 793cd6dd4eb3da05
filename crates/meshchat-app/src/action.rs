//! Application side-effects.
//!
//! [`AppAction`]s are produced by the [`crate::App`] state machine for the
//! runtime to execute.

use meshchat_core::{ConnectionProfile, TransportRequest};

/// Actions produced by the App state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    /// Render the UI.
    Render,

    /// Quit the application.
    Quit,

    /// Hand this request to the radio transport.
    Transport(TransportRequest),

    /// A link was established with this profile. Drivers may persist it.
    Connected(ConnectionProfile),
}
