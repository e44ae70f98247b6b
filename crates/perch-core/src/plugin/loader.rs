//! Plugin instantiation and lifecycle.
//!
//! [`PluginLoader`] owns the live plugin list. It:
//!
//! - Instantiates the plugin types a [`PluginUnit`] declares, honoring the
//!   configured [`LoadPolicy`].
//! - Checks that every unit a unit `requires` is known to the client's
//!   [`UnitResolver`](super::UnitResolver) before instantiating anything.
//! - Starts plugins either on load or later through
//!   [`start_all`](PluginLoader::start_all).
//!
//! The list is append-only: plugins are never unloaded. Any failure aborts
//! the current operation and is returned to the caller; plugins processed
//! before the failure stay as they are.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::{Plugin, PluginContext, PluginUnit, linked_units};
use crate::client::ChatClient;
use crate::error::{PluginError, PluginResult};

/// How many of a unit's plugin types [`PluginLoader::load`] instantiates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadPolicy {
    /// Stop after the first plugin type that instantiates. Units that
    /// declare several types only ever contribute one plugin.
    #[default]
    FirstOnly,
    /// Instantiate every declared plugin type.
    All,
}

/// Lifecycle state of a live plugin.
///
/// ```text
/// load(start = false) ──► Loaded ──► start_all() ──► Started
/// load(start = true)  ─────────────────────────────► Started
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginState {
    /// Instantiated, `start` not yet called.
    Loaded,
    /// `start` returned successfully.
    Started,
}

/// Snapshot of one live plugin, for introspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginInfo {
    /// Name reported by the plugin.
    pub name: String,
    /// Version reported by the plugin.
    pub version: String,
    /// Identity of the unit the plugin came from.
    pub unit: &'static str,
    /// Current lifecycle state.
    pub state: PluginState,
}

struct PluginEntry {
    plugin: Arc<dyn Plugin>,
    unit: &'static PluginUnit,
    state: PluginState,
}

/// Owner of the live plugin list.
pub struct PluginLoader {
    plugins: RwLock<Vec<PluginEntry>>,
    policy: LoadPolicy,
    /// Per-unit config sections, keyed by unit identity.
    configs: HashMap<String, Value>,
    /// Unit identities skipped by [`load_linked`](Self::load_linked).
    disabled: HashSet<String>,
}

impl Default for PluginLoader {
    fn default() -> Self {
        Self::new(LoadPolicy::default())
    }
}

impl PluginLoader {
    /// Creates an empty loader.
    pub fn new(policy: LoadPolicy) -> Self {
        Self {
            plugins: RwLock::new(Vec::new()),
            policy,
            configs: HashMap::new(),
            disabled: HashSet::new(),
        }
    }

    /// Sets the per-unit config sections.
    pub fn with_configs(mut self, configs: HashMap<String, Value>) -> Self {
        self.configs = configs;
        self
    }

    /// Sets the unit identities that [`load_linked`](Self::load_linked) skips.
    pub fn with_disabled<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.disabled = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the load policy.
    pub fn policy(&self) -> LoadPolicy {
        self.policy
    }

    fn context(&self, client: &Arc<ChatClient>, unit: &'static PluginUnit) -> PluginContext {
        let config = self
            .configs
            .get(unit.id)
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::default()));
        PluginContext::new(Arc::clone(client), unit, Arc::new(config))
    }

    /// Instantiates the plugin types of `unit` and appends them to the list.
    ///
    /// Returns how many plugins were added. With `start` set each plugin is
    /// started before it is added; a plugin whose `start` fails is not added.
    pub fn load(
        &self,
        client: &Arc<ChatClient>,
        unit: &'static PluginUnit,
        start: bool,
    ) -> PluginResult<usize> {
        unit.ensure_compatible()?;

        for required in unit.requires {
            client.units().resolve(required)?;
        }

        let ctx = self.context(client, unit);
        let mut loaded = 0;

        for factory in unit.factories {
            let plugin: Arc<dyn Plugin> = factory
                .instantiate(&ctx)
                .map_err(|source| PluginError::Create {
                    unit: unit.id.to_string(),
                    type_name: factory.type_name,
                    source,
                })?
                .into();

            info!(
                plugin = %plugin.name(),
                version = %plugin.version(),
                unit = unit.id,
                "Loading plugin"
            );

            let mut state = PluginState::Loaded;
            if start {
                plugin.start(&ctx).map_err(|source| PluginError::Start {
                    plugin: plugin.name().to_string(),
                    source,
                })?;
                state = PluginState::Started;
            }

            self.plugins.write().push(PluginEntry {
                plugin,
                unit,
                state,
            });
            loaded += 1;

            if self.policy == LoadPolicy::FirstOnly {
                break;
            }
        }

        if loaded == 0 {
            debug!(unit = unit.id, "Unit declares no plugin types");
        }
        Ok(loaded)
    }

    /// Registers and loads every unit linked into the binary.
    ///
    /// Units are processed sorted by identity. All enabled, compatible units
    /// are registered with the resolver before the first one is loaded, so
    /// link order between units does not matter.
    pub fn load_linked(&self, client: &Arc<ChatClient>, start: bool) -> PluginResult<usize> {
        let mut units: Vec<&'static PluginUnit> = linked_units()
            .filter(|unit| {
                let enabled = !self.disabled.contains(unit.id);
                if !enabled {
                    info!(unit = unit.id, "Plugin unit disabled by configuration");
                }
                enabled
            })
            .collect();
        units.sort_by_key(|unit| unit.id);

        // Incompatible units stay unresolvable; loading them fails below.
        for unit in units.iter().filter(|unit| unit.is_compatible()) {
            if !client.units().register_unit(unit) {
                warn!(unit = unit.id, "Duplicate plugin unit identity, first one wins");
            }
        }

        let mut total = 0;
        for unit in units {
            total += self.load(client, unit, start)?;
        }
        Ok(total)
    }

    /// Starts every plugin still in [`PluginState::Loaded`], in list order.
    ///
    /// Stops at the first failure. Returns how many plugins were started.
    pub fn start_all(&self, client: &Arc<ChatClient>) -> PluginResult<usize> {
        let pending: Vec<(usize, Arc<dyn Plugin>, &'static PluginUnit)> = self
            .plugins
            .read()
            .iter()
            .enumerate()
            .filter(|(_, e)| e.state == PluginState::Loaded)
            .map(|(i, e)| (i, Arc::clone(&e.plugin), e.unit))
            .collect();

        let mut started = 0;
        for (index, plugin, unit) in pending {
            plugin
                .start(&self.context(client, unit))
                .map_err(|source| PluginError::Start {
                    plugin: plugin.name().to_string(),
                    source,
                })?;
            // The list is append-only, so the index is still valid.
            self.plugins.write()[index].state = PluginState::Started;
            info!(plugin = %plugin.name(), "Plugin started");
            started += 1;
        }
        Ok(started)
    }

    /// Snapshot of the live plugin list, in load order.
    pub fn plugins(&self) -> Vec<PluginInfo> {
        self.plugins
            .read()
            .iter()
            .map(|e| PluginInfo {
                name: e.plugin.name().to_string(),
                version: e.plugin.version().to_string(),
                unit: e.unit.id,
                state: e.state,
            })
            .collect()
    }

    /// Returns the number of live plugins.
    pub fn len(&self) -> usize {
        self.plugins.read().len()
    }

    /// Returns `true` if no plugin is loaded.
    pub fn is_empty(&self) -> bool {
        self.plugins.read().is_empty()
    }
}

impl std::fmt::Debug for PluginLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginLoader")
            .field("plugins", &self.len())
            .field("policy", &self.policy)
            .finish()
    }
}
