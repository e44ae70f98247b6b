//! Error types for the Perch core.
//!
//! Protocol-level anomalies (malformed lines, unknown commands, duplicate
//! registrations) are never surfaced as errors; they are dropped and logged.
//! Only the plugin layer reports typed failures.

use thiserror::Error;

/// Boxed error returned by command handlers and plugin hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// =============================================================================
// Plugin Errors
// =============================================================================

/// Errors raised while loading, starting or linking plugin units.
#[derive(Debug, Error)]
pub enum PluginError {
    /// A unit identity was looked up but never registered.
    #[error("plugin unit '{id}' is not registered")]
    UnitNotFound {
        /// The missing unit identity.
        id: String,
    },

    /// A unit does not export the requested symbol.
    #[error("plugin unit '{unit}' does not export '{symbol}'")]
    SymbolNotFound {
        /// Identity of the unit that was searched.
        unit: String,
        /// Name of the missing symbol.
        symbol: String,
    },

    /// A symbol exists but holds a value of another type.
    #[error("symbol '{symbol}' of unit '{unit}' is not a `{expected}`")]
    SymbolType {
        /// Identity of the exporting unit.
        unit: String,
        /// Name of the symbol.
        symbol: String,
        /// Type the caller asked for.
        expected: &'static str,
    },

    /// The unit was built against an incompatible plugin API.
    #[error("plugin unit '{unit}' targets API {found:#x}, host supports {host:#x}")]
    IncompatibleApi {
        /// Identity of the rejected unit.
        unit: String,
        /// API version declared by the unit.
        found: u32,
        /// API version of the host.
        host: u32,
    },

    /// A plugin constructor failed.
    #[error("failed to create plugin '{type_name}' from unit '{unit}': {source}")]
    Create {
        /// Identity of the unit that declared the plugin type.
        unit: String,
        /// Declared type name of the plugin.
        type_name: &'static str,
        /// Underlying failure.
        #[source]
        source: BoxError,
    },

    /// A plugin's `start` hook failed.
    #[error("failed to start plugin '{plugin}': {source}")]
    Start {
        /// Name reported by the plugin.
        plugin: String,
        /// Underlying failure.
        #[source]
        source: BoxError,
    },
}

impl PluginError {
    /// Creates a [`PluginError::UnitNotFound`].
    pub fn unit_not_found(id: impl Into<String>) -> Self {
        Self::UnitNotFound { id: id.into() }
    }
}

/// Result type for plugin operations.
pub type PluginResult<T> = Result<T, PluginError>;
