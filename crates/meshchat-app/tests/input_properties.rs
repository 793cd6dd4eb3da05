//! Property tests for the line editor.

use meshchat_app::{InputOutcome, InputState, KeyInput};
use proptest::prelude::*;

fn key() -> impl Strategy<Value = KeyInput> {
    prop_oneof![
        6 => any::<char>().prop_map(KeyInput::Char),
        1 => Just(KeyInput::Backspace),
        1 => Just(KeyInput::Delete),
        1 => Just(KeyInput::Left),
        1 => Just(KeyInput::Right),
        1 => Just(KeyInput::Home),
        1 => Just(KeyInput::End),
    ]
}

proptest! {
    #[test]
    fn cursor_stays_within_buffer(keys in prop::collection::vec(key(), 0..64)) {
        let mut input = InputState::new();
        for key in keys {
            input.handle_key(key);
            prop_assert!(input.cursor() <= input.buffer().chars().count());
        }
    }

    #[test]
    fn typed_text_is_submitted_verbatim(text in "\\PC{0,32}") {
        let mut input = InputState::new();
        for c in text.chars() {
            input.handle_key(KeyInput::Char(c));
        }

        prop_assert_eq!(input.handle_key(KeyInput::Enter), InputOutcome::Submitted(text));
        prop_assert_eq!(input.buffer(), "");
        prop_assert_eq!(input.cursor(), 0);
    }

    #[test]
    fn home_then_typing_prepends(text in "[a-z]{0,8}", prefix in "[A-Z]{1,4}") {
        let mut input = InputState::new();
        for c in text.chars() {
            input.handle_key(KeyInput::Char(c));
        }
        input.handle_key(KeyInput::Home);
        for c in prefix.chars() {
            input.handle_key(KeyInput::Char(c));
        }

        prop_assert_eq!(input.buffer(), format!("{prefix}{text}"));
        prop_assert_eq!(input.cursor(), prefix.chars().count());
    }
}
