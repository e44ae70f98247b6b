//! The chat client context object.
//!
//! One [`ChatClient`] owns every piece of mutable state of a connection: the
//! event [`Dispatcher`], the [`CommandRegistry`], the [`PluginLoader`] and
//! the [`UnitResolver`]. It is built once, wrapped in an [`Arc`] and handed
//! to plugins explicitly; there is no process-wide instance.
//!
//! The client never touches a socket. The runtime feeds it raw lines through
//! [`ChatClient::handle_line`] and drains what it writes to its
//! [`MessageSink`].

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{error, trace};

use crate::command::{CommandRegistry, Invocation, UnregisterMode};
use crate::dispatcher::Dispatcher;
use crate::error::PluginResult;
use crate::event::{ChatEvent, CommandInvocation};
use crate::plugin::{LoadPolicy, PluginInfo, PluginLoader, PluginUnit, UnitResolver, UnitTable};
use crate::protocol::{CHANNEL_PREFIX, parse_line};
use crate::sink::{MessageSink, NullSink};

/// Shared state of one chat connection.
pub struct ChatClient {
    nick: String,
    channel: String,
    dispatcher: Dispatcher,
    commands: CommandRegistry,
    plugins: PluginLoader,
    units: Arc<dyn UnitResolver>,
    sink: Arc<dyn MessageSink>,
}

impl ChatClient {
    /// Starts building a client.
    pub fn builder() -> ChatClientBuilder {
        ChatClientBuilder::default()
    }

    /// Nick the client is logged in as.
    pub fn nick(&self) -> &str {
        &self.nick
    }

    /// Channel the client joins, without the leading `#`.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// The event dispatcher.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// The command registry.
    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    /// The unit resolver.
    pub fn units(&self) -> &dyn UnitResolver {
        self.units.as_ref()
    }

    /// Snapshot of the live plugins, in load order.
    pub fn plugins(&self) -> Vec<PluginInfo> {
        self.plugins.plugins()
    }

    /// Processes one raw protocol line.
    ///
    /// The line is decoded and its event, if any, dispatched. A message whose
    /// first token names a registered command then fires a
    /// [`ChatEvent::CommandInvoked`] and runs the command. This check does not
    /// depend on the verb. Malformed lines are dropped.
    pub fn handle_line(&self, raw: &str) {
        trace!(line = raw, "<<");

        let Some(line) = parse_line(raw) else {
            trace!(line = raw, "Dropping malformed line");
            return;
        };

        if let Some(event) = line.to_event() {
            self.dispatcher.dispatch(&event);
        }

        if !line.is_command_shaped() {
            return;
        }
        let Some((command, args)) = self.commands.route(&line.message) else {
            return;
        };

        let token = args.first().cloned().unwrap_or_default();
        self.dispatcher
            .dispatch(&ChatEvent::CommandInvoked(CommandInvocation {
                command: token.clone(),
                args: args.clone(),
                raw_message: line.message.clone(),
            }));

        let invocation = Invocation {
            args: &args,
            raw_message: &line.message,
            channel: line.channel.trim_start_matches(CHANNEL_PREFIX),
            nick: &line.nick,
        };
        if let Err(e) = command.run(self, &invocation) {
            error!(command = %token, nick = %line.nick, error = %e, "Command failed");
        }
    }

    /// Sends a chat message to a channel. A leading `#` on `channel` is
    /// optional.
    pub fn say(&self, channel: &str, text: &str) {
        let channel = channel.trim_start_matches(CHANNEL_PREFIX);
        self.send_raw(format!("PRIVMSG {CHANNEL_PREFIX}{channel} :{text}"));
    }

    /// Queues a raw protocol line.
    pub fn send_raw(&self, line: impl Into<String>) {
        let line = line.into();
        trace!(line = %line, ">>");
        self.sink.send_line(line);
    }

    /// Resolves a symbol exported by a registered unit.
    pub fn resolve_symbol<T: Any>(&self, unit: &str, symbol: &str) -> PluginResult<&'static T> {
        self.units.resolve(unit)?.symbol::<T>(symbol)
    }

    /// Registers `unit` with the resolver and loads its plugins.
    ///
    /// A unit built against an incompatible API is rejected before it is
    /// registered, so its exports never become resolvable.
    pub fn load_unit(self: &Arc<Self>, unit: &'static PluginUnit, start: bool) -> PluginResult<usize> {
        unit.ensure_compatible()?;
        self.units.register_unit(unit);
        self.plugins.load(self, unit, start)
    }

    /// Registers and loads every unit linked into the binary.
    pub fn load_linked(self: &Arc<Self>, start: bool) -> PluginResult<usize> {
        self.plugins.load_linked(self, start)
    }

    /// Starts every plugin that is loaded but not started yet.
    pub fn start_plugins(self: &Arc<Self>) -> PluginResult<usize> {
        self.plugins.start_all(self)
    }
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("nick", &self.nick)
            .field("channel", &self.channel)
            .field("dispatcher", &self.dispatcher)
            .field("commands", &self.commands)
            .field("plugins", &self.plugins)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ChatClient`].
///
/// Everything has a default: no nick or channel, [`UnregisterMode`] and
/// [`LoadPolicy`] defaults, a fresh [`UnitTable`] and a [`NullSink`].
#[derive(Default)]
pub struct ChatClientBuilder {
    nick: String,
    channel: String,
    unregister_mode: UnregisterMode,
    load_policy: LoadPolicy,
    plugin_configs: HashMap<String, Value>,
    disabled_units: Vec<String>,
    resolver: Option<Arc<dyn UnitResolver>>,
    sink: Option<Arc<dyn MessageSink>>,
}

impl ChatClientBuilder {
    /// Sets the nick.
    pub fn nick(mut self, nick: impl Into<String>) -> Self {
        self.nick = nick.into();
        self
    }

    /// Sets the channel. Leading `#` characters are removed.
    pub fn channel(mut self, channel: impl AsRef<str>) -> Self {
        self.channel = channel
            .as_ref()
            .trim_start_matches(CHANNEL_PREFIX)
            .to_string();
        self
    }

    /// Sets how [`CommandRegistry::unregister`] treats existing commands.
    pub fn unregister_mode(mut self, mode: UnregisterMode) -> Self {
        self.unregister_mode = mode;
        self
    }

    /// Sets how many plugin types a unit contributes.
    pub fn load_policy(mut self, policy: LoadPolicy) -> Self {
        self.load_policy = policy;
        self
    }

    /// Sets the config section handed to plugins of `unit`.
    pub fn plugin_config(mut self, unit: impl Into<String>, config: Value) -> Self {
        self.plugin_configs.insert(unit.into(), config);
        self
    }

    /// Replaces all plugin config sections.
    pub fn plugin_configs(mut self, configs: HashMap<String, Value>) -> Self {
        self.plugin_configs = configs;
        self
    }

    /// Excludes a unit from [`ChatClient::load_linked`].
    pub fn disable_unit(mut self, unit: impl Into<String>) -> Self {
        self.disabled_units.push(unit.into());
        self
    }

    /// Uses a custom unit resolver.
    pub fn resolver(mut self, resolver: Arc<dyn UnitResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Sets where outbound lines go.
    pub fn sink(mut self, sink: Arc<dyn MessageSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Builds the client. Without a resolver or sink, a fresh
    /// [`UnitTable`] and a [`NullSink`] are used.
    pub fn build(self) -> ChatClient {
        ChatClient {
            nick: self.nick,
            channel: self.channel,
            dispatcher: Dispatcher::new(),
            commands: CommandRegistry::new(self.unregister_mode),
            plugins: PluginLoader::new(self.load_policy)
                .with_configs(self.plugin_configs)
                .with_disabled(self.disabled_units),
            units: self
                .resolver
                .unwrap_or_else(|| Arc::new(UnitTable::new())),
            sink: self.sink.unwrap_or_else(|| Arc::new(NullSink)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::fn_command;
    use crate::error::BoxError;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Sink that records every outbound line.
    #[derive(Default)]
    struct RecordingSink {
        lines: Mutex<Vec<String>>,
    }

    impl MessageSink for RecordingSink {
        fn send_line(&self, line: String) {
            self.lines.lock().push(line);
        }
    }

    type Seen = Arc<Mutex<Vec<(Vec<String>, String, String, String)>>>;

    fn recording_command(client: &ChatClient, name: &str) -> Seen {
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        client.commands().register(fn_command(name, move |_, inv| {
            s.lock().push((
                inv.args.to_vec(),
                inv.raw_message.to_string(),
                inv.channel.to_string(),
                inv.nick.to_string(),
            ));
            Ok(())
        }));
        seen
    }

    #[test]
    fn test_command_invocation_end_to_end() {
        let client = ChatClient::builder().build();
        let seen = recording_command(&client, "greet");

        client.handle_line(":alice!alice@host PRIVMSG #chan :!greet bob");

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        let (args, raw, channel, nick) = &seen[0];
        assert_eq!(args, &vec!["!greet".to_string(), "bob".to_string()]);
        assert_eq!(raw, "!greet bob ");
        assert_eq!(channel, "chan");
        assert_eq!(nick, "alice");
    }

    #[test]
    fn test_chat_subscribers_run_before_command() {
        let client = ChatClient::builder().build();
        let order = Arc::new(Mutex::new(Vec::new()));

        let o = Arc::clone(&order);
        client.dispatcher().on_chat(move |_| o.lock().push("chat"));
        let o = Arc::clone(&order);
        client.dispatcher().on_command(move |inv| {
            assert_eq!(inv.command, "!ping");
            o.lock().push("command-event");
        });
        let o = Arc::clone(&order);
        client.commands().register(fn_command("ping", move |_, _| {
            o.lock().push("run");
            Ok(())
        }));

        client.handle_line(":a!a@a PRIVMSG #chan :!ping");

        assert_eq!(*order.lock(), vec!["chat", "command-event", "run"]);
    }

    #[test]
    fn test_unknown_command_is_ignored() {
        let client = ChatClient::builder().build();
        let commands = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&commands);
        client.dispatcher().on_command(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        client.handle_line(":a!a@a PRIVMSG #chan :!nothing here");
        assert_eq!(commands.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_command_routing_does_not_depend_on_verb() {
        let client = ChatClient::builder().build();
        let seen = recording_command(&client, "greet");

        client.handle_line(":tmi.twitch.tv NOTICE #chan :!greet");

        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn test_failing_command_does_not_stop_processing() {
        let client = ChatClient::builder().build();
        client
            .commands()
            .register(fn_command("boom", |_, _| Err::<(), BoxError>("boom".into())));
        let seen = recording_command(&client, "ok");

        client.handle_line(":a!a@a PRIVMSG #chan :!boom");
        client.handle_line(":a!a@a PRIVMSG #chan :!ok");

        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn test_malformed_lines_are_dropped() {
        let client = ChatClient::builder().build();
        let chats = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&chats);
        client.dispatcher().on_chat(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        client.handle_line("");
        client.handle_line("garbage without colon");
        client.handle_line(":short");

        assert_eq!(chats.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_say_writes_privmsg() {
        let sink = Arc::new(RecordingSink::default());
        let client = ChatClient::builder().sink(sink.clone()).build();

        client.say("chan", "hi there");
        client.say("#chan", "again");

        assert_eq!(
            *sink.lines.lock(),
            vec!["PRIVMSG #chan :hi there", "PRIVMSG #chan :again"]
        );
    }

    #[test]
    fn test_command_can_reply_through_client() {
        let sink = Arc::new(RecordingSink::default());
        let client = ChatClient::builder().sink(sink.clone()).build();
        client.commands().register(fn_command("ping", |client, inv| {
            client.say(inv.channel, "pong");
            Ok(())
        }));

        client.handle_line(":a!a@a PRIVMSG #chan :!ping");

        assert_eq!(*sink.lines.lock(), vec!["PRIVMSG #chan :pong"]);
    }

    #[test]
    fn test_builder_normalizes_channel() {
        let client = ChatClient::builder().nick("perchbot").channel("##chan").build();
        assert_eq!(client.nick(), "perchbot");
        assert_eq!(client.channel(), "chan");
    }
}
