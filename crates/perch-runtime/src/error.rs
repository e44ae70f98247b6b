//! Runtime error types.

use perch_core::PluginError;
use thiserror::Error;

use crate::config::ConfigError;

// =============================================================================
// Transport Errors
// =============================================================================

/// Errors raised by the line transport.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The TCP connection could not be established.
    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Reading or writing the stream failed.
    #[error("Transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

// =============================================================================
// Runtime Errors
// =============================================================================

/// Errors that can occur during runtime operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Loading or validating the configuration failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The connection failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A plugin unit could not be loaded or started.
    #[error(transparent)]
    Plugin(#[from] PluginError),

    /// Installing the shutdown signal handler failed.
    #[error("Failed to listen for shutdown signals: {0}")]
    Signal(#[source] std::io::Error),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
