//! Command interpreter.
//!
//! Turns one line of user input into a [`Command`]. Keywords are matched
//! exactly (case-sensitive); anything else is a message whose first token is
//! the destination.
//!
//! ```text
//! disconnect               -> Disconnect
//! advert                   -> Advert
//! join <channel>           -> Join { channel }
//! <destination> <text...>  -> Send { destination, body }
//! ```
//!
//! Parsing is pure. Destination resolution only reads the
//! [`ConversationStore`]; unknown destinations become a new contact identity
//! and the transport decides at send time whether it is reachable.

use crate::{conversation::ConversationId, error::CommandError, store::ConversationStore};

const DISCONNECT: &str = "disconnect";
const ADVERT: &str = "advert";
const JOIN: &str = "join";

/// Structured action produced from a line of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Send text to a channel or contact.
    Send {
        /// Resolved destination.
        destination: ConversationId,
        /// Message text with surrounding whitespace removed.
        body: String,
    },
    /// Subscribe to a channel by its literal name.
    Join {
        /// Channel name, including any leading `#`.
        channel: String,
    },
    /// Tear down the radio connection.
    Disconnect,
    /// Broadcast a flood advertisement.
    Advert,
}

/// Parse a line of input.
///
/// # Errors
///
/// - `CommandError::Empty` for a blank line
/// - `CommandError::MissingChannel` for `join` without an argument
/// - `CommandError::MissingBody` for a destination with no text
/// - `CommandError::UnexpectedArgument` for keywords given extra arguments
pub fn parse(line: &str, store: &ConversationStore) -> Result<Command, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(CommandError::Empty);
    }

    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };

    match head {
        DISCONNECT => no_arguments(DISCONNECT, rest).map(|()| Command::Disconnect),
        ADVERT => no_arguments(ADVERT, rest).map(|()| Command::Advert),
        JOIN => {
            let mut args = rest.split_whitespace();
            let channel = args.next().ok_or(CommandError::MissingChannel)?;
            let extra: Vec<&str> = args.collect();
            if !extra.is_empty() {
                return Err(CommandError::UnexpectedArgument {
                    command: JOIN,
                    extra: extra.join(" "),
                });
            }
            Ok(Command::Join { channel: channel.to_string() })
        },
        destination => {
            if rest.is_empty() {
                return Err(CommandError::MissingBody { destination: destination.to_string() });
            }
            let destination =
                store.resolve(destination).unwrap_or_else(|| ConversationId::contact(destination));
            Ok(Command::Send { destination, body: rest.to_string() })
        },
    }
}

fn no_arguments(command: &'static str, rest: &str) -> Result<(), CommandError> {
    if rest.is_empty() {
        Ok(())
    } else {
        Err(CommandError::UnexpectedArgument { command, extra: rest.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Timestamp;

    fn empty() -> ConversationStore {
        ConversationStore::new()
    }

    #[test]
    fn keywords() {
        assert_eq!(parse("disconnect", &empty()), Ok(Command::Disconnect));
        assert_eq!(parse("  advert  ", &empty()), Ok(Command::Advert));
    }

    #[test]
    fn join_takes_literal_channel_name() {
        assert_eq!(parse("join #test", &empty()), Ok(Command::Join { channel: "#test".into() }));
        assert_eq!(parse("join private", &empty()), Ok(Command::Join {
            channel: "private".into()
        }));
    }

    #[test]
    fn join_without_channel_is_rejected() {
        assert_eq!(parse("join", &empty()), Err(CommandError::MissingChannel));
        assert_eq!(parse("join   ", &empty()), Err(CommandError::MissingChannel));
    }

    #[test]
    fn join_with_extra_tokens_is_rejected() {
        assert_eq!(parse("join #a #b", &empty()), Err(CommandError::UnexpectedArgument {
            command: "join",
            extra: "#b".into()
        }));
    }

    #[test]
    fn keywords_reject_arguments() {
        assert!(matches!(
            parse("advert now", &empty()),
            Err(CommandError::UnexpectedArgument { command: "advert", .. })
        ));
        assert!(matches!(
            parse("disconnect please", &empty()),
            Err(CommandError::UnexpectedArgument { command: "disconnect", .. })
        ));
    }

    #[test]
    fn unknown_destination_becomes_contact() {
        assert_eq!(parse("alice hello there", &empty()), Ok(Command::Send {
            destination: ConversationId::contact("alice"),
            body: "hello there".into(),
        }));
    }

    #[test]
    fn known_channel_is_resolved() {
        let mut store = ConversationStore::new();
        store.ensure(ConversationId::channel("#general"), Timestamp::default()).unwrap();

        assert_eq!(parse("#general  good   morning ", &store), Ok(Command::Send {
            destination: ConversationId::channel("#general"),
            body: "good   morning".into(),
        }));
    }

    #[test]
    fn destination_without_body_is_rejected() {
        assert_eq!(
            parse("alice", &empty()),
            Err(CommandError::MissingBody { destination: "alice".into() })
        );
    }

    #[test]
    fn keywords_are_case_sensitive() {
        assert_eq!(parse("Advert now", &empty()), Ok(Command::Send {
            destination: ConversationId::contact("Advert"),
            body: "now".into(),
        }));
        assert_eq!(
            parse("Join", &empty()),
            Err(CommandError::MissingBody { destination: "Join".into() })
        );
    }

    #[test]
    fn blank_line_is_empty() {
        assert_eq!(parse("", &empty()), Err(CommandError::Empty));
        assert_eq!(parse(" \t ", &empty()), Err(CommandError::Empty));
    }
}
