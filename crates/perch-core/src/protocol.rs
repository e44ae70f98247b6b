//! Line decoder for the chat service's IRC dialect.
//!
//! A raw line has the shape
//!
//! ```text
//! :<nick>[!user@host] <VERB> <channel>[ :<message>]
//! ```
//!
//! Decoding is deliberately loose: the line is cut on every `:` and the
//! message is stitched back together from the trailing pieces, which is why
//! a decoded message always ends in a single space.
//!
//! ```rust
//! use perch_core::protocol::decode;
//! use perch_core::ChatEvent;
//!
//! let event = decode(":nick!user@host PRIVMSG #chan :hello world").unwrap();
//! match event {
//!     ChatEvent::Chat(msg) => assert_eq!(msg.message, "hello world "),
//!     _ => unreachable!(),
//! }
//! ```

use crate::event::{ChatEvent, ChatMessage, Membership};

/// Character that marks a channel name.
pub const CHANNEL_PREFIX: char = '#';

/// Character that marks a command token.
pub const COMMAND_PREFIX: char = '!';

/// Structured view of one raw line before it is routed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    /// Sender nick, with any `!user@host` suffix removed.
    pub nick: String,
    /// Protocol verb such as `PRIVMSG`.
    pub verb: String,
    /// Third token of the line; a channel for the verbs we route.
    pub channel: String,
    /// Reconstructed message text, empty when the line had no payload.
    pub message: String,
}

impl ParsedLine {
    /// Converts the line into a typed event.
    ///
    /// Only `PRIVMSG`, `JOIN` and `PART` addressed to a `#` channel produce
    /// an event; everything else yields `None`.
    pub fn to_event(&self) -> Option<ChatEvent> {
        if !self.channel.starts_with(CHANNEL_PREFIX) {
            return None;
        }
        let membership = || Membership {
            nick: self.nick.clone(),
            channel: self.channel.clone(),
        };
        match self.verb.as_str() {
            "PRIVMSG" => Some(ChatEvent::Chat(ChatMessage {
                channel: self.channel.clone(),
                nick: self.nick.clone(),
                message: self.message.clone(),
            })),
            "JOIN" => Some(ChatEvent::Join(membership())),
            "PART" => Some(ChatEvent::Part(membership())),
            _ => None,
        }
    }

    /// Returns `true` if the message is shaped like a command invocation.
    pub fn is_command_shaped(&self) -> bool {
        self.message.starts_with(COMMAND_PREFIX)
    }
}

/// Parses a raw line into its nick, verb, channel and message.
///
/// Returns `None` for lines without a `:` and for lines whose header has
/// fewer than three space-separated tokens.
pub fn parse_line(raw: &str) -> Option<ParsedLine> {
    let segments: Vec<&str> = raw.split(':').collect();
    if segments.len() < 2 {
        return None;
    }

    let mut header = segments[1].split(' ');
    let prefix = header.next()?;
    let verb = header.next()?;
    let channel = header.next()?;

    let nick = prefix.split('!').next().unwrap_or(prefix);

    let mut message = String::new();
    for segment in &segments[2..] {
        message.push_str(segment);
        message.push(' ');
    }

    Some(ParsedLine {
        nick: nick.to_string(),
        verb: verb.to_string(),
        channel: channel.to_string(),
        message,
    })
}

/// Decodes a raw line into a chat, join or part event.
pub fn decode(raw: &str) -> Option<ChatEvent> {
    parse_line(raw)?.to_event()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat(channel: &str, nick: &str, message: &str) -> ChatEvent {
        ChatEvent::Chat(ChatMessage {
            channel: channel.into(),
            nick: nick.into(),
            message: message.into(),
        })
    }

    #[test]
    fn test_decode_privmsg_keeps_trailing_space() {
        let event = decode(":nick!user@host PRIVMSG #chan :hello world");
        assert_eq!(event, Some(chat("#chan", "nick", "hello world ")));
    }

    #[test]
    fn test_decode_rejoins_colons_in_message() {
        let event = decode(":nick!u@h PRIVMSG #chan :time is 12:30:05");
        assert_eq!(event, Some(chat("#chan", "nick", "time is 12 30 05 ")));
    }

    #[test]
    fn test_nick_stripped_at_bang() {
        let line = parse_line(":a!b@c PRIVMSG #x :hi").unwrap();
        assert_eq!(line.nick, "a");
    }

    #[test]
    fn test_bare_prefix_is_whole_nick() {
        let line = parse_line(":a PRIVMSG #x :hi").unwrap();
        assert_eq!(line.nick, "a");
    }

    #[test]
    fn test_non_channel_target_yields_no_event() {
        assert_eq!(decode(":nick!u@h PRIVMSG perchbot :psst"), None);
        assert!(parse_line(":nick!u@h PRIVMSG perchbot :psst").is_some());
    }

    #[test]
    fn test_line_without_colon_is_dropped() {
        assert_eq!(parse_line("PRIVMSG #chan hello"), None);
        assert_eq!(decode("PRIVMSG #chan hello"), None);
    }

    #[test]
    fn test_short_header_is_dropped() {
        assert_eq!(parse_line("PING :tmi.twitch.tv"), None);
        assert_eq!(parse_line(":server 001"), None);
    }

    #[test]
    fn test_join_and_part() {
        let join = decode(":viewer!viewer@viewer.tmi.twitch.tv JOIN #chan");
        assert_eq!(
            join,
            Some(ChatEvent::Join(Membership {
                nick: "viewer".into(),
                channel: "#chan".into(),
            }))
        );

        let part = decode(":viewer!viewer@viewer.tmi.twitch.tv PART #chan");
        assert_eq!(
            part,
            Some(ChatEvent::Part(Membership {
                nick: "viewer".into(),
                channel: "#chan".into(),
            }))
        );
    }

    #[test]
    fn test_unknown_verb_parses_but_yields_no_event() {
        let line = parse_line(":tmi.twitch.tv NOTICE #chan :!not a command").unwrap();
        assert_eq!(line.verb, "NOTICE");
        assert!(line.is_command_shaped());
        assert_eq!(line.to_event(), None);
    }

    #[test]
    fn test_empty_message_is_not_command_shaped() {
        let line = parse_line(":a!a@a JOIN #chan").unwrap();
        assert_eq!(line.message, "");
        assert!(!line.is_command_shaped());
    }
}
