//! Cross-unit resolution.
//!
//! Units are linked outside any dependency graph the host knows about, so a
//! unit that needs a symbol from another unit asks a [`UnitResolver`]. The
//! default implementation, [`UnitTable`], is a plain identity → unit map that
//! only ever grows.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::debug;

use super::PluginUnit;
use crate::error::{PluginError, PluginResult};

/// Resolves unit identities to loaded units.
pub trait UnitResolver: Send + Sync {
    /// Records a unit. Returns `false` if its identity was already present,
    /// in which case the first registration is kept.
    fn register_unit(&self, unit: &'static PluginUnit) -> bool;

    /// Looks a unit up by identity. No fuzzy or partial matching.
    fn resolve(&self, id: &str) -> PluginResult<&'static PluginUnit>;

    /// Identities of every registered unit, sorted.
    fn unit_ids(&self) -> Vec<String>;
}

/// Append-only table of registered units.
#[derive(Default)]
pub struct UnitTable {
    units: RwLock<HashMap<String, &'static PluginUnit>>,
}

impl UnitTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }
}

impl UnitResolver for UnitTable {
    fn register_unit(&self, unit: &'static PluginUnit) -> bool {
        let mut units = self.units.write();
        if units.contains_key(unit.id) {
            return false;
        }
        units.insert(unit.id.to_string(), unit);
        debug!(unit = unit.id, "Plugin unit registered");
        true
    }

    fn resolve(&self, id: &str) -> PluginResult<&'static PluginUnit> {
        self.units
            .read()
            .get(id)
            .copied()
            .ok_or_else(|| PluginError::unit_not_found(id))
    }

    fn unit_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.units.read().keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl std::fmt::Debug for UnitTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitTable")
            .field("units", &self.unit_ids())
            .finish()
    }
}
