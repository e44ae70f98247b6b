//! Typed chat events produced from raw protocol lines.
//!
//! Events carry no identity beyond their fields and are not retained after
//! dispatch.

/// A message posted to a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Channel the message was posted to, including the leading `#`.
    pub channel: String,
    /// Nick of the sender.
    pub nick: String,
    /// Reconstructed message text.
    pub message: String,
}

/// A user joining or leaving a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    /// Nick of the user.
    pub nick: String,
    /// Channel, including the leading `#`.
    pub channel: String,
}

/// A chat message that matched a registered command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    /// Prefixed command token, e.g. `!greet`.
    pub command: String,
    /// Non-empty space-separated tokens of the message, command token included.
    pub args: Vec<String>,
    /// The message text the command was parsed from.
    pub raw_message: String,
}

/// Every event kind the dispatcher routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// `PRIVMSG` to a channel.
    Chat(ChatMessage),
    /// `JOIN` of a channel.
    Join(Membership),
    /// `PART` of a channel.
    Part(Membership),
    /// A registered command was matched.
    CommandInvoked(CommandInvocation),
}

impl ChatEvent {
    /// Short name of the variant, used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Chat(_) => "chat",
            Self::Join(_) => "join",
            Self::Part(_) => "part",
            Self::CommandInvoked(_) => "command",
        }
    }
}
