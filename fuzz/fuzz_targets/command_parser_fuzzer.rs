//! Fuzz target for the command interpreter
//!
//! # Strategy
//!
//! - Raw input: arbitrary UTF-8 lines, including control and multi-byte text
//! - Known conversations: a store seeded with channels and contacts so
//!   destinations resolve both ways
//!
//! # Invariants
//!
//! - NEVER panic on any input
//! - Blank input is `Empty`
//! - A parsed `Send` has a non-empty, trimmed body
//! - A parsed `Join` names a non-empty channel without whitespace

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use meshchat_core::{
    Command, CommandError, ConversationId, ConversationStore, Timestamp, command,
};

#[derive(Debug, Arbitrary)]
struct Input {
    known: Vec<(bool, String)>,
    line: String,
}

fuzz_target!(|input: Input| {
    let mut store = ConversationStore::new();
    for (is_channel, name) in input.known.into_iter().take(8) {
        let id =
            if is_channel { ConversationId::channel(name) } else { ConversationId::contact(name) };
        let _ = store.ensure(id, Timestamp::from_millis(0));
    }

    match command::parse(&input.line, &store) {
        Ok(Command::Send { body, .. }) => {
            assert!(!body.is_empty());
            assert_eq!(body, body.trim());
        },
        Ok(Command::Join { channel }) => {
            assert!(!channel.is_empty());
            assert!(!channel.contains(char::is_whitespace));
        },
        Ok(Command::Disconnect | Command::Advert) => {},
        Err(CommandError::Empty) => assert!(input.line.trim().is_empty()),
        Err(_) => assert!(!input.line.trim().is_empty()),
    }
});
