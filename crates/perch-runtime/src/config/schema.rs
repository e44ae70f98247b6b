//! Configuration schema definitions.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use perch_core::{LoadPolicy, UnregisterMode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Root configuration structure, as read from `perch.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerchConfig {
    /// Chat server connection and credentials.
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Plugin loading settings.
    #[serde(default)]
    pub plugins: PluginsConfig,

    /// Command table settings.
    #[serde(default)]
    pub commands: CommandsConfig,
}

impl PerchConfig {
    /// The configuration written on first run. Credentials and channel are
    /// placeholders the user has to replace.
    pub fn template() -> Self {
        let mut config = Self::default();
        config.connection.oauth = "oauth:your_token_here".to_string();
        config.connection.channel = "your_channel".to_string();
        config
            .plugins
            .config
            .insert("greet".to_string(), serde_json::json!({ "greeting": "Hello" }));
        config
    }
}

// =============================================================================
// Connection
// =============================================================================

/// Chat server connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Server host name.
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Nick to log in with.
    #[serde(default = "default_nick")]
    pub nick: String,

    /// OAuth token, sent verbatim as `PASS`.
    #[serde(default)]
    pub oauth: String,

    /// Channel to join, with or without the leading `#`.
    #[serde(default)]
    pub channel: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            nick: default_nick(),
            oauth: String::new(),
            channel: String::new(),
        }
    }
}

impl ConnectionConfig {
    /// `host:port` address to connect to.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_host() -> String {
    "irc.chat.twitch.tv".to_string()
}

fn default_port() -> u16 {
    6667
}

fn default_nick() -> String {
    "perchbot".to_string()
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Every accepted level name.
    pub const NAMES: [&'static str; 5] = ["trace", "debug", "info", "warn", "error"];

    /// Returns the level name as used in filter directives.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Converts to a [`tracing::Level`].
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(format!(
                "unknown log level '{other}', expected one of {:?}",
                Self::NAMES
            )),
        }
    }
}

/// Log line layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Newline-delimited JSON. Requires the `json-log` feature.
    #[cfg(feature = "json-log")]
    Json,
}

/// Where log lines go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub close: bool,
}

/// Logging settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Base level. `RUST_LOG` takes precedence when set.
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    /// Log file used with [`LogOutput::File`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,

    /// Include thread IDs.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include source file and line.
    #[serde(default)]
    pub file_location: bool,

    /// Log every raw protocol line in and out of the client.
    #[serde(default)]
    pub raw_lines: bool,

    #[serde(default)]
    pub span_events: SpanEventConfig,

    /// Per-target level overrides, e.g. `perch_core = "debug"`.
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,
}

// =============================================================================
// Plugins & commands
// =============================================================================

/// Plugin loading settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginsConfig {
    /// How many plugin types of a unit are instantiated.
    #[serde(default)]
    pub load_policy: LoadPolicy,

    /// Start plugins as they load instead of after every unit is loaded.
    #[serde(default)]
    pub start_on_load: bool,

    /// Unit identities that are not loaded.
    #[serde(default)]
    pub disabled: Vec<String>,

    /// Per-unit config sections, keyed by unit identity.
    #[serde(default)]
    pub config: HashMap<String, Value>,
}

/// Command table settings.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CommandsConfig {
    /// What unregistering an existing command does.
    #[serde(default)]
    pub unregister: UnregisterMode,
}
