//! Declarative plugin unit macro.

/// Declares a [`PluginUnit`](crate::plugin::PluginUnit) and registers it in
/// [`PLUGIN_UNITS`](crate::plugin::PLUGIN_UNITS).
///
/// # Syntax
///
/// ```text
/// plugin_unit! {
///     pub static NAME = {
///         id: "unit-id",
///         requires: ["other-unit", …],          // optional
///         plugins: [TypeA, TypeB, …],           // PluginInit types, in order
///         exports: { "symbol" => STATIC, … },   // optional
///     };
/// }
/// ```
///
/// Every exported value must be a `'static` place whose type is
/// `Any + Send + Sync`. The unit's API version is always the one of the
/// `perch-core` it was compiled against.
#[macro_export]
macro_rules! plugin_unit {
    (
        $(#[$attr:meta])*
        $vis:vis static $name:ident = {
            id: $id:literal,
            $(requires: [$($req:literal),* $(,)?],)?
            plugins: [$($plugin:ty),* $(,)?],
            $(exports: { $($sym:literal => $value:expr),* $(,)? },)?
        };
    ) => {
        $(#[$attr])*
        #[$crate::linkme::distributed_slice($crate::plugin::PLUGIN_UNITS)]
        #[linkme(crate = $crate::linkme)]
        $vis static $name: $crate::plugin::PluginUnit = $crate::plugin::PluginUnit {
            id: $id,
            api_version: $crate::plugin::PLUGIN_API_VERSION,
            requires: &[$($($req),*)?],
            factories: &[
                $($crate::plugin::PluginFactory::of::<$plugin>(::std::stringify!($plugin))),*
            ],
            exports: &[
                $($($crate::plugin::Symbol { name: $sym, value: &$value }),*)?
            ],
        };
    };
}

#[cfg(test)]
mod tests {
    use crate::error::BoxError;
    use crate::plugin::{Plugin, PluginContext, PluginInit, linked_units};

    struct Marker;

    impl Plugin for Marker {
        fn name(&self) -> &str {
            "marker"
        }

        fn version(&self) -> &str {
            "0.0.1"
        }
    }

    impl PluginInit for Marker {
        fn init(_ctx: &PluginContext) -> Result<Self, BoxError> {
            Ok(Marker)
        }
    }

    static MARKER_LIMIT: u32 = 7;

    crate::plugin_unit! {
        /// Unit used by the tests of this crate.
        static MARKER_UNIT = {
            id: "perch-core-test-marker",
            plugins: [Marker],
            exports: { "limit" => MARKER_LIMIT },
        };
    }

    #[test]
    fn test_macro_unit_is_linked() {
        let unit = linked_units()
            .find(|u| u.id == "perch-core-test-marker")
            .expect("macro unit should be in the distributed slice");

        assert!(unit.is_compatible());
        assert!(unit.requires.is_empty());
        assert_eq!(unit.factories.len(), 1);
        assert_eq!(unit.factories[0].type_name, "Marker");
        assert_eq!(*unit.symbol::<u32>("limit").unwrap(), 7);
        assert!(std::ptr::eq(unit, &MARKER_UNIT));
    }
}
