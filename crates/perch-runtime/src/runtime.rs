//! Main runtime orchestration.
//!
//! The runtime owns the [`ChatClient`], loads the plugin units linked into
//! the binary and pumps lines between the transport and the client:
//!
//! ```text
//!            ┌──────────────── PerchRuntime ────────────────┐
//! server ──▶ │ LineTransport ──▶ PING? ──▶ ChatClient::handle_line
//!        ◀── │ LineTransport ◀── PONG / outbound channel ◀── say/send_raw
//!            └──────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use perch_runtime::PerchRuntime;
//!
//! let runtime = PerchRuntime::builder()
//!     .config_file("perch.toml")
//!     .build()?;
//! runtime.run().await?;
//! ```

use std::sync::Arc;

use perch_core::{ChatClient, MessageSink};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::signal;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{ConfigLoader, PerchConfig, validate_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;
use crate::transport::{LineTransport, pong_for};

/// The Perch runtime: one client, one connection.
pub struct PerchRuntime {
    config: PerchConfig,
    client: Arc<ChatClient>,
    outbound: UnboundedReceiver<String>,
    shutdown: CancellationToken,
}

impl PerchRuntime {
    /// Creates a runtime builder.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from an already loaded configuration.
    ///
    /// Initializes logging from the configuration (a no-op if a subscriber is
    /// already installed) and builds the client with its outbound channel.
    pub fn from_config(config: PerchConfig) -> Self {
        logging::init_from_config(&config.logging);

        let (tx, rx) = mpsc::unbounded_channel::<String>();
        let sink: Arc<dyn MessageSink> = Arc::new(tx);

        let client = ChatClient::builder()
            .nick(&config.connection.nick)
            .channel(&config.connection.channel)
            .unregister_mode(config.commands.unregister)
            .load_policy(config.plugins.load_policy)
            .plugin_configs(config.plugins.config.clone())
            .sink(sink);
        let client = config
            .plugins
            .disabled
            .iter()
            .fold(client, |builder, id| builder.disable_unit(id.as_str()))
            .build();

        info!(
            nick = %config.connection.nick,
            channel = %config.connection.channel,
            log_level = %config.logging.level,
            "Runtime initialized from configuration"
        );

        Self {
            config,
            client: Arc::new(client),
            outbound: rx,
            shutdown: CancellationToken::new(),
        }
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &PerchConfig {
        &self.config
    }

    /// The chat client driven by this runtime.
    pub fn client(&self) -> &Arc<ChatClient> {
        &self.client
    }

    /// Token that stops [`run`](Self::run) and [`run_on`](Self::run_on)
    /// when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Loads every linked plugin unit, then starts the plugins.
    ///
    /// With `plugins.start_on_load` each plugin starts as it loads;
    /// otherwise all of them start once every unit is loaded.
    pub fn load_plugins(&self) -> RuntimeResult<usize> {
        let start_on_load = self.config.plugins.start_on_load;

        info!("Loading all plugins");
        let loaded = self.client.load_linked(start_on_load)?;
        if !start_on_load {
            self.client.start_plugins()?;
        }
        info!(count = loaded, "Plugins have been loaded");

        Ok(loaded)
    }

    /// Loads plugins, connects to the configured server and runs until
    /// Ctrl+C, SIGTERM, cancellation of the shutdown token or the server
    /// closing the connection.
    pub async fn run(self) -> RuntimeResult<()> {
        let transport = LineTransport::connect(&self.config.connection.address()).await?;

        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            match wait_for_signal().await {
                Ok(()) => shutdown.cancel(),
                Err(e) => warn!(error = %e, "Shutdown signals unavailable, use the token"),
            }
        });

        info!("Perch is now running. Press Ctrl+C to stop.");
        self.drive(transport).await
    }

    /// Runs over an already connected stream. Signals are not installed;
    /// stop the runtime through [`shutdown_token`](Self::shutdown_token).
    pub async fn run_on<S>(self, stream: S) -> RuntimeResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        self.drive(LineTransport::new(stream)).await
    }

    async fn drive<S>(mut self, mut transport: LineTransport<S>) -> RuntimeResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        self.load_plugins()?;
        transport.handshake(&self.config.connection).await?;

        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => {
                    info!("Shutdown requested");
                    break;
                }
                Some(line) = self.outbound.recv() => {
                    transport.send(&line).await?;
                }
                incoming = transport.next_line() => match incoming {
                    Some(Ok(line)) => {
                        if let Some(pong) = pong_for(&line) {
                            debug!("Answering server PING");
                            transport.send(&pong).await?;
                        } else {
                            self.client.handle_line(&line);
                        }
                    }
                    Some(Err(e)) => return Err(e.into()),
                    None => {
                        info!("Connection closed by server");
                        break;
                    }
                }
            }
        }

        // Flush replies queued by the last handled line.
        while let Ok(line) = self.outbound.try_recv() {
            transport.send(&line).await?;
        }

        info!("Runtime stopped");
        Ok(())
    }
}

/// Waits for Ctrl+C or, on Unix, SIGTERM.
async fn wait_for_signal() -> Result<(), RuntimeError> {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .map_err(RuntimeError::Signal)?;

        tokio::select! {
            res = signal::ctrl_c() => {
                res.map_err(RuntimeError::Signal)?;
                info!("Received Ctrl+C, shutting down");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await.map_err(RuntimeError::Signal)?;
        info!("Received Ctrl+C, shutting down");
    }

    Ok(())
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for creating a [`PerchRuntime`] from configuration sources.
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
}

impl RuntimeBuilder {
    /// Creates a new runtime builder searching the current directory.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g., "development", "production").
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Overrides a single configuration value.
    pub fn set<V: serde::Serialize>(mut self, key: &str, value: V) -> Self {
        self.config_loader = self.config_loader.set(key, value);
        self
    }

    /// Loads, validates and builds the runtime.
    pub fn build(self) -> RuntimeResult<PerchRuntime> {
        let config = self.config_loader.load()?;
        validate_config(&config)?;
        Ok(PerchRuntime::from_config(config))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
