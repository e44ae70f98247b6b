//! Greeting plugin for Perch.
//!
//! Registers two commands and, optionally, welcomes everyone joining the
//! channel:
//!
//! | Command | Reply |
//! |---------|-------|
//! | `!greet [name]` | `<greeting>, <name or caller>!` |
//! | `!commands` | the registered command tokens |
//!
//! Configure it via `perch.toml`:
//!
//! ```toml
//! [plugins.config.greet]
//! greeting = "Hey"
//! welcome_joins = true
//! ```
//!
//! Other units can read the built-in greeting by listing `"greet"` under
//! `requires` and resolving the `default-greeting` symbol as `&'static str`.

use std::sync::{Arc, Weak};

use perch::prelude::*;
use serde::Deserialize;
use tracing::{debug, info};

/// Greeting used when the unit has no configuration.
pub static DEFAULT_GREETING: &str = "Hello";

/// `[plugins.config.greet]`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GreetConfig {
    pub greeting: String,
    /// Greet every chatter that joins the channel.
    pub welcome_joins: bool,
}

impl Default for GreetConfig {
    fn default() -> Self {
        Self {
            greeting: DEFAULT_GREETING.to_string(),
            welcome_joins: false,
        }
    }
}

/// The greet plugin.
pub struct GreetPlugin {
    config: Arc<GreetConfig>,
}

impl GreetPlugin {
    /// The active configuration.
    pub fn config(&self) -> &GreetConfig {
        &self.config
    }
}

impl Plugin for GreetPlugin {
    fn name(&self) -> &str {
        "greet"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn start(&self, ctx: &PluginContext) -> Result<(), BoxError> {
        let client = ctx.client();

        let config = Arc::clone(&self.config);
        client.commands().register(fn_command("greet", move |client, inv| {
            let name = inv.args.get(1).map_or(inv.nick, String::as_str);
            client.say(inv.channel, &format!("{}, {name}!", config.greeting));
            Ok(())
        }));

        client.commands().register(fn_command("commands", |client, inv| {
            let tokens: Vec<String> = client
                .commands()
                .all()
                .into_iter()
                .map(|(token, _)| token)
                .collect();
            client.say(inv.channel, &tokens.join(" "));
            Ok(())
        }));

        if self.config.welcome_joins {
            // The dispatcher lives inside the client; a strong handle here
            // would keep the client alive forever.
            let weak: Weak<ChatClient> = Arc::downgrade(client);
            let config = Arc::clone(&self.config);
            client.dispatcher().on_join(move |join| {
                let Some(client) = weak.upgrade() else {
                    return;
                };
                if join.nick.eq_ignore_ascii_case(client.nick()) {
                    return;
                }
                debug!(nick = %join.nick, "Welcoming chatter");
                client.say(&join.channel, &format!("{}, {}!", config.greeting, join.nick));
            });
        }

        info!(greeting = %self.config.greeting, "Greet plugin started");
        Ok(())
    }
}

impl PluginInit for GreetPlugin {
    fn init(ctx: &PluginContext) -> Result<Self, BoxError> {
        let config: GreetConfig = ctx.config()?;
        Ok(Self {
            config: Arc::new(config),
        })
    }
}

plugin_unit! {
    /// The greet unit.
    pub static GREET_UNIT = {
        id: "greet",
        plugins: [GreetPlugin],
        exports: { "default-greeting" => DEFAULT_GREETING },
    };
}
