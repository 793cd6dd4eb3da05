//! Terminal UI for MeshChat
//!
//! A thin shell over [`meshchat_app::Driver`] that provides terminal-specific
//! I/O. All orchestration logic lives in the generic [`meshchat_app::Runtime`].
//!
//! This crate handles terminal rendering, the in-process radio task, profile
//! persistence and the raw traffic log.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod radio;
pub mod terminal;
pub mod traffic_log;
pub mod ui;

pub use meshchat_app::{App, AppAction, AppEvent, Driver, KeyInput, Runtime};
pub use terminal::{TerminalDriver, TerminalError};
