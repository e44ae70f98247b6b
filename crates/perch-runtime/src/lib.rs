//! Perch Runtime - configuration, logging and transport for the Perch chat
//! client.
//!
//! This crate provides:
//! - Layered configuration (`perch.toml`, profiles, `PERCH_*` variables)
//! - Logging setup over `tracing-subscriber`
//! - A newline-framed transport ([`LineTransport`]) over [`ChatLineCodec`]
//! - Runtime orchestration ([`PerchRuntime`]): plugin loading, handshake,
//!   keep-alive answers and the read/write loop
//!
//! ```ignore
//! use perch_runtime::PerchRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = PerchRuntime::builder().build()?;
//!
//!     // Loads every linked plugin unit, connects and runs until Ctrl+C
//!     runtime.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod transport;

// Re-exports
pub use codec::{ChatLineCodec, MAX_LINE_LENGTH};
pub use config::{ConfigError, ConfigLoader, ConfigResult, PerchConfig};
pub use error::{RuntimeError, RuntimeResult, TransportError, TransportResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{PerchRuntime, RuntimeBuilder};
pub use transport::LineTransport;

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// This provides all the commonly used logging macros:
/// - `trace!`, `debug!`, `info!`, `warn!`, `error!`
/// - `span`, `event`
/// - `instrument` attribute
/// - `Level` for span creation
pub mod prelude {
    pub use tracing::{Level, debug, error, event, info, instrument, span, trace, warn};
}
