//! Application layer for MeshChat
//!
//! Pure state machines and a generic runtime for the terminal client,
//! enabling deterministic simulation testing with the same code that runs in
//! production.
//!
//! # Components
//!
//! - [`App`]: UI state machine (input, views, unread markers, notifications)
//! - [`InputState`]: single-line editor
//! - [`Driver`]: Trait for platform-specific I/O abstraction
//! - [`Runtime`]: Generic orchestration loop using Driver

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod action;
mod app;
mod driver;
mod event;
mod input;
mod runtime;
mod state;

pub use action::AppAction;
pub use app::{ADVERT_CAPACITY, App, LOG_CAPACITY};
pub use driver::Driver;
pub use event::AppEvent;
pub use input::{InputOutcome, InputState, KeyInput};
pub use runtime::Runtime;
pub use state::{Advert, LogEntry, LogLevel, View};
