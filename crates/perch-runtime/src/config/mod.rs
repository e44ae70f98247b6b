//! Configuration module for the Perch runtime.
//!
//! This module provides TOML-based configuration loading (layered with
//! environment variables through figment) and validation for the
//! connection, logging, plugin and command settings.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    CONFIG_FILE_NAME, ConfigLoader, Profile, load_config, load_config_from_file,
    write_default_config,
};
pub use schema::{
    CommandsConfig, ConnectionConfig, LogFormat, LogLevel, LogOutput, LoggingConfig, PerchConfig,
    PluginsConfig, SpanEventConfig,
};
pub use validation::validate_config;
