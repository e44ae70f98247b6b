//! Chat command registry.
//!
//! Commands are stored under their *prefixed* name: a command named `greet`
//! lives under `!greet`, which is exactly the token a chatter types. Names are
//! case-sensitive and at most one command exists per prefixed name.
//!
//! # Example
//!
//! ```rust
//! use perch_core::command::{CommandRegistry, UnregisterMode, fn_command};
//!
//! let registry = CommandRegistry::new(UnregisterMode::Remove);
//! registry.register(fn_command("ping", |client, inv| {
//!     client.say(inv.channel, "pong");
//!     Ok(())
//! }));
//!
//! assert!(registry.lookup("!ping").is_some());
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::ChatClient;
use crate::error::BoxError;
use crate::protocol::COMMAND_PREFIX;

/// Arguments handed to a command when it runs.
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    /// Non-empty space-separated tokens of the message, command token first.
    pub args: &'a [String],
    /// The full message text.
    pub raw_message: &'a str,
    /// Channel name with the leading `#` removed.
    pub channel: &'a str,
    /// Nick of the chatter who invoked the command.
    pub nick: &'a str,
}

/// A chat command contributed by the host or a plugin.
pub trait Command: Send + Sync {
    /// Unprefixed command name, e.g. `greet`.
    fn name(&self) -> &str;

    /// Runs the command.
    fn run(&self, client: &ChatClient, invocation: &Invocation<'_>) -> Result<(), BoxError>;
}

/// A [`Command`] backed by a closure. Created with [`fn_command`].
pub struct FnCommand<F> {
    name: String,
    f: F,
}

impl<F> Command for FnCommand<F>
where
    F: Fn(&ChatClient, &Invocation<'_>) -> Result<(), BoxError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, client: &ChatClient, invocation: &Invocation<'_>) -> Result<(), BoxError> {
        (self.f)(client, invocation)
    }
}

/// Wraps a closure into a [`Command`].
pub fn fn_command<F>(name: impl Into<String>, f: F) -> FnCommand<F>
where
    F: Fn(&ChatClient, &Invocation<'_>) -> Result<(), BoxError> + Send + Sync,
{
    FnCommand {
        name: name.into(),
        f,
    }
}

/// Returns the registry key for a command name.
pub fn prefixed(name: &str) -> String {
    format!("{COMMAND_PREFIX}{name}")
}

/// How [`CommandRegistry::unregister`] treats an existing entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnregisterMode {
    /// Removal only applies when no entry exists under the name, so an
    /// existing command is never removed. Kept as the default because
    /// existing plugins depend on commands surviving `unregister`.
    #[default]
    KeepExisting,
    /// Removes the existing entry.
    Remove,
}

/// Mapping from prefixed command token to handler.
pub struct CommandRegistry {
    commands: RwLock<BTreeMap<String, Arc<dyn Command>>>,
    mode: UnregisterMode,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new(UnregisterMode::default())
    }
}

impl CommandRegistry {
    /// Creates an empty registry.
    pub fn new(mode: UnregisterMode) -> Self {
        Self {
            commands: RwLock::new(BTreeMap::new()),
            mode,
        }
    }

    /// Returns the configured unregister behavior.
    pub fn mode(&self) -> UnregisterMode {
        self.mode
    }

    /// Registers a command.
    ///
    /// Returns `false` without replacing anything when a command already
    /// exists under the same prefixed name.
    pub fn register<C>(&self, command: C) -> bool
    where
        C: Command + 'static,
    {
        self.register_shared(Arc::new(command))
    }

    /// Registers an already shared command.
    pub fn register_shared(&self, command: Arc<dyn Command>) -> bool {
        let key = prefixed(command.name());
        let mut commands = self.commands.write();
        if commands.contains_key(&key) {
            debug!(command = %key, "Command already registered, ignoring");
            return false;
        }
        debug!(command = %key, "Command registered");
        commands.insert(key, command);
        true
    }

    /// Unregisters the command with the given unprefixed name.
    ///
    /// With [`UnregisterMode::KeepExisting`] this never removes anything and
    /// returns `None`; with [`UnregisterMode::Remove`] the removed command is
    /// returned.
    pub fn unregister(&self, name: &str) -> Option<Arc<dyn Command>> {
        let key = prefixed(name);
        match self.mode {
            UnregisterMode::KeepExisting => {
                if self.commands.read().contains_key(&key) {
                    debug!(command = %key, "Unregister keeps existing command");
                }
                None
            }
            UnregisterMode::Remove => {
                let removed = self.commands.write().remove(&key);
                if removed.is_some() {
                    debug!(command = %key, "Command unregistered");
                }
                removed
            }
        }
    }

    /// Unregisters a command by its own name.
    pub fn unregister_command(&self, command: &dyn Command) -> Option<Arc<dyn Command>> {
        self.unregister(command.name())
    }

    /// Looks up a command by its prefixed token, e.g. `!greet`.
    pub fn lookup(&self, token: &str) -> Option<Arc<dyn Command>> {
        self.commands.read().get(token).cloned()
    }

    /// Returns `true` if a command is registered under the prefixed token.
    pub fn contains(&self, token: &str) -> bool {
        self.commands.read().contains_key(token)
    }

    /// Returns the number of registered commands.
    pub fn len(&self) -> usize {
        self.commands.read().len()
    }

    /// Returns `true` if no command is registered.
    pub fn is_empty(&self) -> bool {
        self.commands.read().is_empty()
    }

    /// Snapshot of all commands, sorted by prefixed name.
    pub fn all(&self) -> Vec<(String, Arc<dyn Command>)> {
        self.commands
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), Arc::clone(v)))
            .collect()
    }

    /// Matches a chat message against the registry.
    ///
    /// The first space-separated token is looked up verbatim. On a hit the
    /// command is returned with the message's non-empty tokens as arguments,
    /// the command token included.
    pub fn route(&self, message: &str) -> Option<(Arc<dyn Command>, Vec<String>)> {
        if !message.starts_with(COMMAND_PREFIX) {
            return None;
        }
        let token = message.split(' ').next()?;
        let command = self.lookup(token)?;
        let args = message
            .split(' ')
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        Some((command, args))
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.commands.read().keys().collect::<Vec<_>>())
            .field("mode", &self.mode)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct Tagged {
        name: &'static str,
        tag: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Command for Tagged {
        fn name(&self) -> &str {
            self.name
        }

        fn run(&self, _client: &ChatClient, _inv: &Invocation<'_>) -> Result<(), BoxError> {
            self.log.lock().push(self.tag);
            Ok(())
        }
    }

    fn tagged(name: &'static str, tag: &'static str, log: &Arc<Mutex<Vec<&'static str>>>) -> Tagged {
        Tagged {
            name,
            tag,
            log: Arc::clone(log),
        }
    }

    fn noop(name: &'static str) -> impl Command {
        fn_command(name, |_, _| Ok(()))
    }

    #[test]
    fn test_lookup_uses_prefixed_name() {
        let registry = CommandRegistry::default();
        assert!(registry.register(noop("greet")));
        assert!(registry.lookup("!greet").is_some());
        assert!(registry.lookup("greet").is_none());
        assert!(registry.lookup("!Greet").is_none());
    }

    #[test]
    fn test_duplicate_registration_keeps_first() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = CommandRegistry::default();

        assert!(registry.register(tagged("greet", "first", &log)));
        assert!(!registry.register(tagged("greet", "second", &log)));
        assert_eq!(registry.len(), 1);

        let client = ChatClient::builder().build();
        let command = registry.lookup("!greet").unwrap();
        let inv = Invocation {
            args: &[],
            raw_message: "!greet ",
            channel: "chan",
            nick: "a",
        };
        command.run(&client, &inv).unwrap();
        assert_eq!(*log.lock(), vec!["first"]);
    }

    // `KeepExisting` never removes a registered command. This is the
    // compatibility behavior; `Remove` below is the corrected variant.
    #[test]
    fn test_unregister_keep_existing_leaves_command_registered() {
        let registry = CommandRegistry::new(UnregisterMode::KeepExisting);
        registry.register(noop("greet"));

        assert!(registry.unregister("greet").is_none());
        assert!(registry.contains("!greet"));

        let command = registry.lookup("!greet").unwrap();
        assert!(registry.unregister_command(command.as_ref()).is_none());
        assert!(registry.contains("!greet"));
    }

    #[test]
    fn test_unregister_remove_deletes_command() {
        let registry = CommandRegistry::new(UnregisterMode::Remove);
        registry.register(noop("greet"));

        assert!(registry.unregister("greet").is_some());
        assert!(!registry.contains("!greet"));
        assert!(registry.unregister("greet").is_none());
    }

    #[test]
    fn test_route_includes_command_token_in_args() {
        let registry = CommandRegistry::default();
        registry.register(noop("greet"));

        let (command, args) = registry.route("!greet  bob ").unwrap();
        assert_eq!(command.name(), "greet");
        assert_eq!(args, vec!["!greet", "bob"]);
    }

    #[test]
    fn test_route_ignores_unknown_and_plain_messages() {
        let registry = CommandRegistry::default();
        registry.register(noop("greet"));

        assert!(registry.route("!unknown ").is_none());
        assert!(registry.route("greet ").is_none());
        assert!(registry.route("").is_none());
    }

    #[test]
    fn test_all_is_sorted() {
        let registry = CommandRegistry::default();
        registry.register(noop("zeta"));
        registry.register(noop("alpha"));

        let names: Vec<String> = registry.all().into_iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["!alpha", "!zeta"]);
    }
}
