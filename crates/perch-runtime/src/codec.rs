//! Newline-delimited chat line codec.
//!
//! Unlike `LinesCodec`, malformed input never fails the stream: bytes that
//! are not valid UTF-8 are replaced, and lines over the length limit are
//! dropped. A single bad line from a chatter must not end the connection.

use std::borrow::Cow;
use std::io;

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{trace, warn};

/// Upper bound on one inbound line, terminator excluded. IRC lines are far
/// shorter; longer frames are dropped instead of growing the buffer.
pub const MAX_LINE_LENGTH: usize = 8 * 1024;

/// Codec reading and writing `\r\n`-terminated lines.
#[derive(Debug, Clone)]
pub struct ChatLineCodec {
    /// Index of the next byte to check for a newline.
    next_index: usize,
    max_len: usize,
    /// Set while skipping the rest of an oversize line.
    discarding: bool,
}

impl ChatLineCodec {
    /// Creates a codec limited to [`MAX_LINE_LENGTH`].
    pub fn new() -> Self {
        Self::with_max_len(MAX_LINE_LENGTH)
    }

    /// Creates a codec with a custom line limit.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
            discarding: false,
        }
    }

    /// Maximum accepted line length.
    pub fn max_len(&self) -> usize {
        self.max_len
    }
}

impl Default for ChatLineCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn strip_terminator(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn to_text(line: &[u8]) -> String {
    match String::from_utf8_lossy(line) {
        Cow::Borrowed(text) => text.to_string(),
        Cow::Owned(text) => {
            trace!(line = %text, "Replaced invalid UTF-8 in inbound line");
            text
        }
    }
}

impl Decoder for ChatLineCodec {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> io::Result<Option<String>> {
        loop {
            let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') else {
                // Room for the terminator on top of the limit.
                if src.len() > self.max_len + 2 {
                    if !self.discarding {
                        warn!(limit = self.max_len, "Dropping oversize inbound line");
                    }
                    self.discarding = true;
                    src.clear();
                    self.next_index = 0;
                } else {
                    self.next_index = src.len();
                }
                return Ok(None);
            };

            let frame = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;

            if self.discarding {
                self.discarding = false;
                continue;
            }

            let line = strip_terminator(&frame);
            if line.len() > self.max_len {
                warn!(
                    length = line.len(),
                    limit = self.max_len,
                    "Dropping oversize inbound line"
                );
                continue;
            }

            return Ok(Some(to_text(line)));
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> io::Result<Option<String>> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }

        self.next_index = 0;
        let rest = src.split();
        if rest.is_empty() || std::mem::take(&mut self.discarding) {
            return Ok(None);
        }

        let line = strip_terminator(&rest);
        if line.len() > self.max_len {
            return Ok(None);
        }
        Ok(Some(to_text(line)))
    }
}

impl<T: AsRef<str>> Encoder<T> for ChatLineCodec {
    type Error = io::Error;

    fn encode(&mut self, line: T, dst: &mut BytesMut) -> io::Result<()> {
        let line = line.as_ref();
        dst.reserve(line.len() + 2);
        dst.extend_from_slice(line.as_bytes());
        dst.extend_from_slice(b"\r\n");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_strips_crlf() {
        let mut codec = ChatLineCodec::new();
        let mut buf = BytesMut::from("PING :tmi.twitch.tv\r\nPING :again\n");

        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("PING :tmi.twitch.tv"));
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("PING :again"));
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
    }

    #[test]
    fn test_decode_partial_line() {
        let mut codec = ChatLineCodec::new();
        let mut buf = BytesMut::from("PING :");

        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        buf.extend_from_slice(b"tmi\r\n");
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("PING :tmi"));
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut codec = ChatLineCodec::new();
        let mut buf = BytesMut::from(&b":a!a@a PRIVMSG #chan :caf\xe9\r\n"[..]);

        assert_eq!(
            codec.decode(&mut buf).unwrap().as_deref(),
            Some(":a!a@a PRIVMSG #chan :caf\u{FFFD}")
        );
    }

    #[test]
    fn test_oversize_line_is_dropped() {
        let mut codec = ChatLineCodec::with_max_len(10);
        let mut buf = BytesMut::from("this is way too long\nPING\n");

        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("PING"));
    }

    #[test]
    fn test_oversize_partial_line_is_skipped() {
        let mut codec = ChatLineCodec::with_max_len(10);
        let mut buf = BytesMut::from("this partial line is way too long");

        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        assert!(buf.is_empty());

        buf.extend_from_slice(b" and continues\nPING\n");
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("PING"));
    }

    #[test]
    fn test_decode_eof_yields_unterminated_line() {
        let mut codec = ChatLineCodec::new();
        let mut buf = BytesMut::from("PING :last");

        assert_eq!(codec.decode_eof(&mut buf).unwrap().as_deref(), Some("PING :last"));
        assert_eq!(codec.decode_eof(&mut buf).unwrap(), None);
    }

    #[test]
    fn test_encode_appends_crlf() {
        let mut codec = ChatLineCodec::new();
        let mut buf = BytesMut::new();

        codec.encode("PONG :tmi.twitch.tv", &mut buf).unwrap();
        assert_eq!(&buf[..], b"PONG :tmi.twitch.tv\r\n");
    }
}
