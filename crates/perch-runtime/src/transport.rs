//! Newline-framed transport to the chat server.
//!
//! [`LineTransport`] wraps any `AsyncRead + AsyncWrite` stream in a
//! [`ChatLineCodec`], so the runtime can be driven over TCP in production and
//! over an in-memory duplex stream in tests.

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::{debug, info, trace};

use crate::codec::ChatLineCodec;
use crate::config::ConnectionConfig;
use crate::error::{TransportError, TransportResult};

/// A line-oriented connection.
pub struct LineTransport<S> {
    framed: Framed<S, ChatLineCodec>,
}

impl LineTransport<TcpStream> {
    /// Opens a TCP connection to `addr` (`host:port`).
    pub async fn connect(addr: &str) -> TransportResult<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| TransportError::Connect {
                addr: addr.to_string(),
                source,
            })?;
        info!(addr, "Connected to chat server");
        Ok(Self::new(stream))
    }
}

impl<S> LineTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps an already connected stream.
    pub fn new(stream: S) -> Self {
        Self {
            framed: Framed::new(stream, ChatLineCodec::new()),
        }
    }

    /// Writes one line. The codec appends `\r\n`.
    pub async fn send(&mut self, line: &str) -> TransportResult<()> {
        trace!(line, "send");
        self.framed.send(line).await?;
        Ok(())
    }

    /// Reads the next line, or `None` once the peer closed the stream.
    ///
    /// Undecodable bytes and oversize lines never surface here; only I/O
    /// failures do.
    pub async fn next_line(&mut self) -> Option<TransportResult<String>> {
        self.framed
            .next()
            .await
            .map(|res| res.map_err(TransportError::from))
    }

    /// Logs in and joins the configured channel.
    ///
    /// Sends `PASS` (skipped when no token is configured), `NICK` and
    /// `JOIN #<channel>`.
    pub async fn handshake(&mut self, connection: &ConnectionConfig) -> TransportResult<()> {
        if !connection.oauth.is_empty() {
            self.send(&format!("PASS {}", connection.oauth)).await?;
        }
        self.send(&format!("NICK {}", connection.nick)).await?;

        let channel = connection.channel.trim_start_matches('#');
        self.send(&format!("JOIN #{channel}")).await?;

        debug!(nick = %connection.nick, channel, "Handshake sent");
        Ok(())
    }
}

/// Returns the reply to a server keep-alive, if `line` is one.
///
/// `PING :tmi.twitch.tv` is answered with `PONG :tmi.twitch.tv`.
pub fn pong_for(line: &str) -> Option<String> {
    line.strip_prefix("PING")
        .filter(|rest| rest.is_empty() || rest.starts_with(' '))
        .map(|rest| format!("PONG{rest}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    fn connection() -> ConnectionConfig {
        ConnectionConfig {
            nick: "perchbot".into(),
            oauth: "oauth:secret".into(),
            channel: "#chan".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_pong_for() {
        assert_eq!(pong_for("PING :tmi.twitch.tv").as_deref(), Some("PONG :tmi.twitch.tv"));
        assert_eq!(pong_for("PING").as_deref(), Some("PONG"));
        assert_eq!(pong_for("PINGER :x"), None);
        assert_eq!(pong_for(":a!a@a PRIVMSG #chan :PING"), None);
    }

    #[tokio::test]
    async fn test_handshake_lines() {
        let (client, server) = tokio::io::duplex(1024);
        let mut transport = LineTransport::new(client);

        transport.handshake(&connection()).await.unwrap();
        drop(transport);

        let mut lines = BufReader::new(server).lines();
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "PASS oauth:secret");
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "NICK perchbot");
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "JOIN #chan");
        assert_eq!(lines.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_handshake_without_token_skips_pass() {
        let (client, server) = tokio::io::duplex(1024);
        let mut transport = LineTransport::new(client);

        let anonymous = ConnectionConfig {
            oauth: String::new(),
            channel: "chan".into(),
            ..connection()
        };
        transport.handshake(&anonymous).await.unwrap();
        drop(transport);

        let mut lines = BufReader::new(server).lines();
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "NICK perchbot");
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "JOIN #chan");
    }

    #[tokio::test]
    async fn test_next_line_strips_crlf() {
        let (client, mut server) = tokio::io::duplex(1024);
        let mut transport = LineTransport::new(client);

        server.write_all(b"PING :tmi.twitch.tv\r\n").await.unwrap();
        drop(server);

        assert_eq!(transport.next_line().await.unwrap().unwrap(), "PING :tmi.twitch.tv");
        assert!(transport.next_line().await.is_none());
    }
}
