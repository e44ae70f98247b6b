//! Plugin system for Perch.
//!
//! # Architecture
//!
//! A [`PluginUnit`] is the *static, `Copy` handle* to a loadable code unit.
//! It carries an identity, the API version it was compiled against, the
//! identities of units it links against, the candidate plugin types it
//! declares and the symbols it exports to other units.
//!
//! Units are collected at link time in the [`PLUGIN_UNITS`] distributed
//! slice, so linking a plugin crate into the binary is all it takes to make
//! it discoverable. The [`PluginLoader`] turns units into live [`Plugin`]
//! instances and drives their lifecycle.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use perch::prelude::*;
//!
//! pub struct Hello;
//!
//! impl Plugin for Hello {
//!     fn name(&self) -> &str { "hello" }
//!     fn version(&self) -> &str { "1.0.0" }
//!
//!     fn start(&self, ctx: &PluginContext) -> Result<(), BoxError> {
//!         ctx.client().commands().register(fn_command("hello", |client, inv| {
//!             client.say(inv.channel, &format!("hello {}", inv.nick));
//!             Ok(())
//!         }));
//!         Ok(())
//!     }
//! }
//!
//! impl PluginInit for Hello {
//!     fn init(_ctx: &PluginContext) -> Result<Self, BoxError> {
//!         Ok(Hello)
//!     }
//! }
//!
//! plugin_unit! {
//!     pub static HELLO = {
//!         id: "hello",
//!         plugins: [Hello],
//!     };
//! }
//! ```
//!
//! # Configuration
//!
//! Each unit gets the `[plugins.config.<id>]` table of `perch.toml` as raw
//! JSON. Plugins deserialize it with [`PluginContext::config`]; a unit with no
//! table sees an empty object.
//!
//! # Cross-unit symbols
//!
//! A unit lists the units it needs under `requires` and reads their exports
//! through [`PluginContext::resolve_symbol`]. Loading fails with
//! [`PluginError::UnitNotFound`](crate::PluginError::UnitNotFound) if a
//! required unit is not registered.

// ─── Submodules ──────────────────────────────────────────────────────────────
pub mod loader;
pub mod macros;
pub mod resolver;
pub mod unit;

// ─── Re-exports from submodules ──────────────────────────────────────────────
pub use loader::{LoadPolicy, PluginInfo, PluginLoader, PluginState};
pub use resolver::{UnitResolver, UnitTable};
pub use unit::{
    PLUGIN_API_VERSION, PLUGIN_UNITS, PluginFactory, PluginUnit, Symbol, linked_units,
};

use std::any::Any;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::client::ChatClient;
use crate::error::{BoxError, PluginResult};

// ─── Plugin traits ───────────────────────────────────────────────────────────

/// A live plugin instance.
pub trait Plugin: Send + Sync + 'static {
    /// Human-readable plugin name.
    fn name(&self) -> &str;

    /// Plugin version string.
    fn version(&self) -> &str;

    /// Starts the plugin. Called at most once per instance.
    ///
    /// This is where a plugin registers commands and subscribes to events.
    fn start(&self, _ctx: &PluginContext) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Construction hook for plugin types listed in [`plugin_unit!`](crate::plugin_unit).
pub trait PluginInit: Plugin + Sized {
    /// Creates the plugin instance.
    fn init(ctx: &PluginContext) -> Result<Self, BoxError>;
}

// ─── PluginContext ───────────────────────────────────────────────────────────

/// Everything a plugin sees while it is created and started.
#[derive(Clone)]
pub struct PluginContext {
    client: Arc<ChatClient>,
    unit: &'static PluginUnit,
    config: Arc<Value>,
}

impl PluginContext {
    pub(crate) fn new(client: Arc<ChatClient>, unit: &'static PluginUnit, config: Arc<Value>) -> Self {
        Self {
            client,
            unit,
            config,
        }
    }

    /// The client the plugin is loaded into.
    pub fn client(&self) -> &Arc<ChatClient> {
        &self.client
    }

    /// The unit the plugin came from.
    pub fn unit(&self) -> &'static PluginUnit {
        self.unit
    }

    /// Raw JSON config section of the unit.
    pub fn raw_config(&self) -> &Value {
        &self.config
    }

    /// Deserializes the unit's config section into `T`.
    pub fn config<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        T::deserialize(self.config.as_ref())
    }

    /// Resolves a symbol exported by another registered unit.
    pub fn resolve_symbol<T: Any>(&self, unit: &str, symbol: &str) -> PluginResult<&'static T> {
        self.client.resolve_symbol(unit, symbol)
    }
}

impl std::fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginContext")
            .field("unit", &self.unit.id)
            .field("config", &self.config)
            .finish()
    }
}
