//! Configuration loader using figment.
//!
//! # Configuration Priority (lowest to highest)
//!
//! 1. Built-in defaults
//! 2. Profile-specific config file (`perch.{profile}.toml`)
//! 3. Main config file (`perch.toml`)
//! 4. Environment variables (`PERCH_*`)
//! 5. Programmatic overrides
//!
//! # Environment Variable Mapping
//!
//! Environment variables are mapped using the `PERCH_` prefix with `__` as separator:
//!
//! - `PERCH_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//! - `PERCH_CONNECTION__CHANNEL=somechannel` → `connection.channel = "somechannel"`
//! - `PERCH_PLUGINS__CONFIG__GREET__GREETING=Hi` → `plugins.config.greet.greeting = "Hi"`
//!
//! # Example
//!
//! ```rust,ignore
//! use perch_runtime::config::ConfigLoader;
//!
//! // Simple loading from default locations
//! let config = ConfigLoader::new().load()?;
//!
//! // Load from specific file with a profile
//! let config = ConfigLoader::new()
//!     .file("./config/perch.toml")
//!     .profile("production")
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::PerchConfig;

/// Name of the main configuration file.
pub const CONFIG_FILE_NAME: &str = "perch.toml";

/// Prefix of configuration environment variables.
pub const ENV_PREFIX: &str = "PERCH_";

/// Configuration profile for environment-specific settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    /// Development profile (default).
    #[default]
    Development,
    /// Production profile.
    Production,
    /// Custom profile name.
    Custom(String),
}

impl Profile {
    /// Returns the profile name as a string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Parses a profile name. `dev` and `prod` are accepted as aliases.
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            _ => Self::Custom(name.to_string()),
        }
    }

    /// Reads the profile from `PERCH_PROFILE`, defaulting to Development.
    pub fn from_env() -> Self {
        std::env::var("PERCH_PROFILE")
            .map(|p| Self::parse(&p))
            .unwrap_or_default()
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration loader with figment-based multi-source support.
pub struct ConfigLoader {
    /// Programmatic overrides, merged last.
    overrides: Figment,
    /// Configuration profile.
    profile: Profile,
    /// Search paths for configuration files.
    search_paths: Vec<PathBuf>,
    /// Whether to load environment variables.
    load_env: bool,
    /// Specific config file to load (overrides search).
    config_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a new configuration loader with defaults.
    pub fn new() -> Self {
        Self {
            overrides: Figment::new(),
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    /// Sets the configuration profile.
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Profile::parse(profile.as_ref());
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Adds current directory to search paths.
    pub fn with_current_dir(self) -> Self {
        if let Ok(cwd) = std::env::current_dir() {
            self.search_path(cwd)
        } else {
            self
        }
    }

    /// Adds user config directory to search paths.
    pub fn with_user_config_dir(self) -> Self {
        if let Some(config_dir) = dirs::config_dir() {
            self.search_path(config_dir.join("perch"))
        } else {
            self
        }
    }

    /// Sets a specific configuration file to load.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enables loading environment variables (default: true).
    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Merges a complete configuration over every other source.
    pub fn merge(mut self, config: PerchConfig) -> Self {
        self.overrides = self.overrides.merge(Serialized::defaults(config));
        self
    }

    /// Sets a single value over every other source, e.g.
    /// `.set("logging.level", "debug")`.
    pub fn set<V: serde::Serialize>(mut self, key: &str, value: V) -> Self {
        self.overrides = self.overrides.merge(Serialized::default(key, value));
        self
    }

    /// Loads and returns the configuration.
    pub fn load(self) -> ConfigResult<PerchConfig> {
        let profile = self.profile.clone();
        let figment = self.build_figment()?;

        let config: PerchConfig = figment.extract()?;

        debug!(
            profile = %profile,
            logging_level = %config.logging.level,
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Builds the figment instance with all sources.
    fn build_figment(mut self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(PerchConfig::default()));

        if let Some(path) = self.config_file.take() {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path));
            }
            figment = self.merge_profile_file(figment, &path);
            info!(path = %path.display(), "Loading configuration file");
            figment = figment.merge(Toml::file(&path));
        } else {
            figment = self.load_config_files(figment);
        }

        if self.load_env {
            trace!("Loading environment variables with {ENV_PREFIX} prefix");
            figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        }

        Ok(figment.merge(self.overrides))
    }

    /// Merges `<stem>.<profile>.toml` next to `base` if it exists.
    fn merge_profile_file(&self, figment: Figment, base: &Path) -> Figment {
        let Some(stem) = base.file_stem().and_then(|s| s.to_str()) else {
            return figment;
        };
        let profile_path = base.with_file_name(format!("{stem}.{}.toml", self.profile.as_str()));
        if profile_path.exists() {
            debug!(path = %profile_path.display(), "Loading profile-specific config");
            figment.merge(Toml::file(profile_path))
        } else {
            figment
        }
    }

    /// Resolves the effective list of search paths.
    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if self.search_paths.is_empty() {
            let mut paths = Vec::new();
            if let Ok(cwd) = std::env::current_dir() {
                paths.push(cwd);
            }
            if let Some(config_dir) = dirs::config_dir() {
                paths.push(config_dir.join("perch"));
            }
            paths
        } else {
            self.search_paths.clone()
        }
    }

    /// Searches for and loads the first `perch.toml` on the search paths,
    /// together with its profile-specific sibling.
    fn load_config_files(&self, mut figment: Figment) -> Figment {
        for search_path in self.resolve_search_paths() {
            let base_path = search_path.join(CONFIG_FILE_NAME);
            if base_path.exists() {
                figment = self.merge_profile_file(figment, &base_path);
                info!(path = %base_path.display(), "Loading configuration file");
                return figment.merge(Toml::file(base_path));
            }
        }
        warn!("No configuration file found, using defaults");
        figment
    }
}

/// Loads the configuration from the default locations.
pub fn load_config() -> ConfigResult<PerchConfig> {
    ConfigLoader::new().load()
}

/// Loads the configuration from a specific file.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<PerchConfig> {
    ConfigLoader::new().file(path).load()
}

/// Writes [`PerchConfig::template`] to `path`.
///
/// Refuses to overwrite an existing file. Missing parent directories are
/// created.
pub fn write_default_config<P: AsRef<Path>>(path: P) -> ConfigResult<()> {
    let path = path.as_ref();
    if path.exists() {
        return Err(ConfigError::AlreadyExists(path.to_path_buf()));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let rendered = toml::to_string_pretty(&PerchConfig::template())?;
    std::fs::write(path, rendered)?;
    info!(path = %path.display(), "Default configuration written");
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
