//! Inbound message text helpers.

use std::borrow::Cow;

/// Split channel text of the form `Name: body` into sender and body.
///
/// Channel frames from unknown senders carry the sender name as a text
/// prefix. Returns `None` when there is no colon or the prefix is blank.
pub fn split_sender(text: &str) -> Option<(&str, &str)> {
    let (name, body) = text.split_once(':')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name, body.trim()))
}

/// Render `@[name]` mentions as `@name`.
pub fn render_mentions(text: &str) -> Cow<'_, str> {
    if !text.contains("@[") {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("@[") {
        let after = &rest[start + 2..];
        let Some(end) = after.find(']') else { break };
        out.push_str(&rest[..start]);
        out.push('@');
        out.push_str(&after[..end]);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_name_prefix() {
        assert_eq!(split_sender("Bob: hi there"), Some(("Bob", "hi there")));
        assert_eq!(split_sender(" Node 7 :ping: pong"), Some(("Node 7", "ping: pong")));
    }

    #[test]
    fn no_prefix() {
        assert_eq!(split_sender("hello"), None);
        assert_eq!(split_sender(": orphan"), None);
    }

    #[test]
    fn mentions() {
        assert_eq!(render_mentions("hi @[Alice] and @[Bob Two]!"), "hi @Alice and @Bob Two!");
        assert_eq!(render_mentions("plain"), "plain");
        assert_eq!(render_mentions("broken @[tag"), "broken @[tag");
    }
}
