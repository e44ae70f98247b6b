//! Plugin units: the static, `Copy` handles to loadable code units.

use std::any::Any;

use linkme::distributed_slice;

use super::{Plugin, PluginContext, PluginInit};
use crate::error::{BoxError, PluginError, PluginResult};

// ─── API versioning ──────────────────────────────────────────────────────────

/// Current plugin API version (1.0).
pub const PLUGIN_API_VERSION: u32 = 0x0001_0000;

// ─── Link-time registry ──────────────────────────────────────────────────────

/// Every unit declared with [`plugin_unit!`](crate::plugin_unit) in a crate
/// linked into the final binary.
#[distributed_slice]
pub static PLUGIN_UNITS: [PluginUnit];

/// Iterates the units linked into this binary, in link order.
pub fn linked_units() -> impl Iterator<Item = &'static PluginUnit> {
    PLUGIN_UNITS.iter()
}

// ─── PluginFactory ───────────────────────────────────────────────────────────

/// Constructor for one concrete plugin type declared by a unit.
#[derive(Clone, Copy)]
pub struct PluginFactory {
    /// Declared type name, used in logs and errors.
    pub type_name: &'static str,
    /// Creates the plugin instance.
    pub create: fn(&PluginContext) -> Result<Box<dyn Plugin>, BoxError>,
}

fn create_boxed<T: PluginInit>(ctx: &PluginContext) -> Result<Box<dyn Plugin>, BoxError> {
    Ok(Box::new(T::init(ctx)?))
}

impl PluginFactory {
    /// Builds the factory for a concrete plugin type.
    pub const fn of<T: PluginInit>(type_name: &'static str) -> Self {
        Self {
            type_name,
            create: create_boxed::<T>,
        }
    }

    /// Instantiates the plugin.
    #[inline]
    pub fn instantiate(&self, ctx: &PluginContext) -> Result<Box<dyn Plugin>, BoxError> {
        (self.create)(ctx)
    }
}

impl std::fmt::Debug for PluginFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginFactory")
            .field("type_name", &self.type_name)
            .finish()
    }
}

// ─── Symbol ──────────────────────────────────────────────────────────────────

/// A named value a unit exports for other units to resolve.
#[derive(Clone, Copy)]
pub struct Symbol {
    /// Export name.
    pub name: &'static str,
    /// Exported value.
    pub value: &'static (dyn Any + Send + Sync),
}

impl std::fmt::Debug for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Symbol").field("name", &self.name).finish()
    }
}

// ─── PluginUnit ──────────────────────────────────────────────────────────────

/// A loadable code unit: an identity plus the plugin types and symbols it
/// contributes.
///
/// Units are declared as `static` items, normally through
/// [`plugin_unit!`](crate::plugin_unit), and handled as `&'static PluginUnit`.
#[derive(Debug, Clone, Copy)]
pub struct PluginUnit {
    /// Unique identity of the unit.
    pub id: &'static str,
    /// Plugin API version the unit was compiled against.
    pub api_version: u32,
    /// Identities of units this unit links against.
    pub requires: &'static [&'static str],
    /// Candidate plugin types, in declaration order.
    pub factories: &'static [PluginFactory],
    /// Symbols visible to other units.
    pub exports: &'static [Symbol],
}

impl PluginUnit {
    /// Returns `true` if the unit's API version is compatible with the host.
    ///
    /// The major part must match exactly; the unit's minor part must be
    /// ≤ the host's minor part.
    pub fn is_compatible(&self) -> bool {
        let host_major = PLUGIN_API_VERSION >> 16;
        let host_minor = PLUGIN_API_VERSION & 0xFFFF;
        let unit_major = self.api_version >> 16;
        let unit_minor = self.api_version & 0xFFFF;
        unit_major == host_major && unit_minor <= host_minor
    }

    /// Like [`is_compatible`](Self::is_compatible), as a typed error.
    pub fn ensure_compatible(&self) -> PluginResult<()> {
        if self.is_compatible() {
            Ok(())
        } else {
            Err(PluginError::IncompatibleApi {
                unit: self.id.to_string(),
                found: self.api_version,
                host: PLUGIN_API_VERSION,
            })
        }
    }

    /// Looks up an exported symbol and downcasts it to `T`.
    pub fn symbol<T: Any>(&self, name: &str) -> PluginResult<&'static T> {
        let exports: &'static [Symbol] = self.exports;
        let symbol = exports
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| PluginError::SymbolNotFound {
                unit: self.id.to_string(),
                symbol: name.to_string(),
            })?;
        let value: &'static (dyn Any + Send + Sync) = symbol.value;
        value
            .downcast_ref::<T>()
            .ok_or_else(|| PluginError::SymbolType {
                unit: self.id.to_string(),
                symbol: name.to_string(),
                expected: std::any::type_name::<T>(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static GREETING: &str = "hello";
    static LIMIT: u32 = 3;

    static EXPORTER: PluginUnit = PluginUnit {
        id: "exporter",
        api_version: PLUGIN_API_VERSION,
        requires: &[],
        factories: &[],
        exports: &[
            Symbol {
                name: "greeting",
                value: &GREETING,
            },
            Symbol {
                name: "limit",
                value: &LIMIT,
            },
        ],
    };

    #[test]
    fn test_symbol_lookup() {
        assert_eq!(*EXPORTER.symbol::<&'static str>("greeting").unwrap(), "hello");
        assert_eq!(*EXPORTER.symbol::<u32>("limit").unwrap(), 3);
    }

    #[test]
    fn test_missing_symbol() {
        let err = EXPORTER.symbol::<u32>("nope").unwrap_err();
        assert!(matches!(err, PluginError::SymbolNotFound { .. }));
    }

    #[test]
    fn test_symbol_type_mismatch() {
        let err = EXPORTER.symbol::<u64>("limit").unwrap_err();
        assert!(matches!(err, PluginError::SymbolType { .. }));
    }

    #[test]
    fn test_api_compatibility() {
        assert!(EXPORTER.is_compatible());

        let future_major = PluginUnit {
            api_version: 0x0002_0000,
            ..EXPORTER
        };
        assert!(!future_major.is_compatible());
        assert!(matches!(
            future_major.ensure_compatible(),
            Err(PluginError::IncompatibleApi { found: 0x0002_0000, host: PLUGIN_API_VERSION, .. })
        ));
        assert!(EXPORTER.ensure_compatible().is_ok());

        let newer_minor = PluginUnit {
            api_version: PLUGIN_API_VERSION + 1,
            ..EXPORTER
        };
        assert!(!newer_minor.is_compatible());
    }
}
