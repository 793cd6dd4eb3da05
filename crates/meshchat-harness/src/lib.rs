//! Deterministic simulation harness for MeshChat.
//!
//! A scripted radio, a virtual clock and a [`Driver`](meshchat_app::Driver)
//! implementation so the production [`meshchat_app::Runtime`] runs
//! unchanged in tests.
//!
//! # Invariant Testing
//!
//! The `invariants` module provides behavioral testing through invariant
//! checks. Invariants verify WHAT must be true across all execution paths, not
//! specific scenarios. Use [`InvariantRegistry::standard()`] for the common
//! session invariants.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod sim_clock;
pub mod sim_driver;
pub mod sim_radio;

pub use invariants::{
    ConversationSnapshot, ConversationTimestampsMonotonic, DeliveryMonotonicity,
    InboundAlwaysAcked, Invariant, InvariantKind, InvariantRegistry, InvariantResult,
    MessageSnapshot, NoPendingWhenDisconnected, SessionSnapshot, UnifiedViewOrdered,
    UniqueConversations, ViewInConversations, Violation,
};
pub use sim_clock::SimClock;
pub use sim_driver::{SimDriver, SimDriverError};
pub use sim_radio::{SimRadio, SimRadioConfig};
