//! # Perch
//!
//! A small, plugin-driven chat client for Twitch-style IRC channels.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐ lines ┌────────────┐ events ┌────────────┐
//! │ PerchRuntime │──────▶│ ChatClient │───────▶│ Dispatcher │──▶ plugin subscribers
//! │ (transport)  │◀──────│            │───────▶│  Commands  │──▶ plugin commands
//! └──────────────┘ reply └────────────┘        └────────────┘
//! ```
//!
//! - **Runtime**: configuration, logging, the connection and the read loop
//! - **Client**: decodes lines and routes them to subscribers and commands
//! - **Plugin units**: linked into the binary with [`plugin_unit!`](crate::core::plugin_unit)
//!   and loaded by the runtime before it joins the channel
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use perch::prelude::*;
//!
//! struct Ping;
//!
//! impl Plugin for Ping {
//!     fn name(&self) -> &str { "ping" }
//!     fn version(&self) -> &str { "0.1.0" }
//!
//!     fn start(&self, ctx: &PluginContext) -> Result<(), BoxError> {
//!         ctx.client().commands().register(fn_command("ping", |client, inv| {
//!             client.say(inv.channel, "pong");
//!             Ok(())
//!         }));
//!         Ok(())
//!     }
//! }
//!
//! impl PluginInit for Ping {
//!     fn init(_ctx: &PluginContext) -> Result<Self, BoxError> {
//!         Ok(Ping)
//!     }
//! }
//!
//! plugin_unit! {
//!     static PING_UNIT = { id: "ping", plugins: [Ping], };
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     PerchRuntime::builder().build()?.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `json-log`: JSON log output (`logging.format = "json"`)

pub use perch_core as core;
pub use perch_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use perch::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use perch_runtime::{PerchConfig, PerchRuntime, RuntimeError};

    // Client, events and commands
    pub use perch_core::prelude::*;
    pub use perch_core::{CommandRegistry, Dispatcher, PluginError};
}
