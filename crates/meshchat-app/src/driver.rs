//! Driver trait for abstracting I/O operations.
//!
//! The [`Driver`] trait decouples the application runtime from specific I/O
//! implementations. Each frontend implements the trait to provide
//! platform-specific I/O, while the generic [`crate::Runtime`] handles all
//! orchestration.

use std::future::Future;

use meshchat_core::{ConnectionProfile, Timestamp, TransportRequest};

use crate::{App, AppEvent};

/// Abstracts I/O operations for the application runtime.
///
/// # Implementations
///
/// - **TUI**: crossterm terminal events plus the in-process radio task
/// - **Simulation**: scripted events, a simulated radio and a virtual clock
pub trait Driver: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Wait for the next event: a key, a resize, a tick or a transport event.
    ///
    /// Returns `None` once the event source is exhausted, which ends the
    /// runtime loop.
    fn poll_event(&mut self) -> impl Future<Output = Result<Option<AppEvent>, Self::Error>> + Send;

    /// Hand a request to the radio transport.
    ///
    /// Completion is reported later through [`Driver::poll_event`].
    ///
    /// # Errors
    ///
    /// Returns an error if the transport task is gone.
    fn execute(
        &mut self,
        request: TransportRequest,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Current wall-clock time.
    fn now(&self) -> Timestamp;

    /// Render the application state.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn render(&mut self, app: &App) -> Result<(), Self::Error>;

    /// A link came up with this profile.
    fn remember(&mut self, profile: &ConnectionProfile) {
        let _ = profile;
    }

    /// Stop the transport and clean up resources.
    fn stop(&mut self);
}
