//! Outbound line sink.
//!
//! The core never touches the network. Lines written by commands and plugins
//! go to a [`MessageSink`] supplied when the [`ChatClient`](crate::ChatClient)
//! is built; the runtime plugs in the sending half of its writer channel.

use tokio::sync::mpsc::UnboundedSender;
use tracing::{trace, warn};

/// Destination for raw protocol lines produced by the client.
pub trait MessageSink: Send + Sync {
    /// Queues one raw line, without the trailing newline.
    fn send_line(&self, line: String);
}

impl MessageSink for UnboundedSender<String> {
    fn send_line(&self, line: String) {
        if let Err(e) = self.send(line) {
            warn!(line = %e.0, "Transport writer is gone, dropping outbound line");
        }
    }
}

/// A sink that discards every line. Used when no transport is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl MessageSink for NullSink {
    fn send_line(&self, line: String) {
        trace!(line = %line, "No transport attached, discarding line");
    }
}
