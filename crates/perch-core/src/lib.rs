//! # Perch Core
//!
//! The engine of the Perch chat client.
//!
//! This crate turns raw protocol lines into typed events, dispatches them to
//! subscribers and keeps the extensible command table that plugin units
//! contribute to. It performs no I/O; see `perch-runtime` for the transport,
//! configuration and logging.
//!
//! ## Layers
//!
//! - **Protocol**: the line decoder ([`protocol::parse_line`], [`protocol::decode`])
//!   and the typed events it produces ([`ChatEvent`]).
//! - **Dispatch**: per-kind subscriber lists ([`Dispatcher`]) and the
//!   command table ([`CommandRegistry`]).
//! - **Plugins**: link-time discovered units ([`PluginUnit`],
//!   [`plugin_unit!`]), their loader ([`PluginLoader`]) and cross-unit
//!   symbol resolution ([`UnitResolver`]).
//! - **Client**: the [`ChatClient`] context object tying the above together.
//!
//! ## Flow
//!
//! ```text
//! ┌───────────┐  raw line  ┌────────────┐  event  ┌────────────┐
//! │ Transport │──────────▶│ ChatClient │───────▶│ Dispatcher │──▶ subscribers
//! └───────────┘            └────────────┘         └────────────┘
//!       ▲                        │ "!cmd …"
//!       │  PRIVMSG …      ┌─────────────────┐
//!       └─────────────────│ CommandRegistry │──▶ Command::run
//!                         └─────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use perch_core::{ChatClient, fn_command};
//!
//! let client = ChatClient::builder().nick("perchbot").channel("#chan").build();
//! client.commands().register(fn_command("ping", |client, inv| {
//!     client.say(inv.channel, "pong");
//!     Ok(())
//! }));
//!
//! client.handle_line(":viewer!viewer@host PRIVMSG #chan :!ping");
//! ```

pub mod client;
pub mod command;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod plugin;
pub mod protocol;
pub mod sink;

#[doc(hidden)]
pub use linkme;

pub use client::{ChatClient, ChatClientBuilder};
pub use command::{Command, CommandRegistry, FnCommand, Invocation, UnregisterMode, fn_command};
pub use dispatcher::{Dispatcher, Subscriber};
pub use error::{BoxError, PluginError, PluginResult};
pub use event::{ChatEvent, ChatMessage, CommandInvocation, Membership};
pub use plugin::{
    LoadPolicy, PLUGIN_API_VERSION, Plugin, PluginContext, PluginInfo, PluginInit, PluginLoader,
    PluginState, PluginUnit, UnitResolver, UnitTable,
};
pub use sink::{MessageSink, NullSink};

/// Prelude for common imports.
pub mod prelude {
    pub use super::command::{Command, Invocation, fn_command};
    pub use super::error::BoxError;
    pub use super::event::{ChatEvent, ChatMessage, CommandInvocation, Membership};
    pub use super::plugin::{Plugin, PluginContext, PluginInit};
    pub use super::{ChatClient, plugin_unit};
}
