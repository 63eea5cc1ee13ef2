//! Delimiter framing for the pod wire protocol
//!
//! Every message is `<payload><delimiter>`. Inbound bytes are accumulated
//! until the delimiter shows up anywhere in the buffer (or the peer closes
//! the stream), then the whole buffer is handed back with every delimiter
//! occurrence removed and surrounding whitespace trimmed. Nothing checks that
//! exactly one message arrived: a peer that writes two messages back to back
//! in one burst produces one concatenated message.

use crate::{DiscoverError, Result};
use bytes::{BufMut, BytesMut};
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time;
use tokio_util::codec::{Decoder, Encoder, Framed};
use tracing::trace;

/// Framing used by [`Connection`]
///
/// Any codec producing and accepting whole `String` messages fits here, so the
/// pod client does not depend on delimiter scanning specifically.
pub trait FrameCodec:
    Decoder<Item = String, Error = DiscoverError>
    + Encoder<String, Error = DiscoverError>
    + Clone
    + Send
    + Unpin
    + 'static
{
}

impl<T> FrameCodec for T where
    T: Decoder<Item = String, Error = DiscoverError>
        + Encoder<String, Error = DiscoverError>
        + Clone
        + Send
        + Unpin
        + 'static
{
}

#[derive(Debug, Clone)]
pub struct DelimiterCodec {
    delimiter: String,
    // Bytes of the current buffer already searched without a match
    searched: usize,
}

impl DelimiterCodec {
    pub fn new(delimiter: impl Into<String>) -> Result<Self> {
        let delimiter = delimiter.into();
        if delimiter.is_empty() {
            return Err(DiscoverError::Config("delimiter must not be empty".into()));
        }
        Ok(Self {
            delimiter,
            searched: 0,
        })
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    fn contains_delimiter(&self, buf: &[u8]) -> bool {
        let needle = self.delimiter.as_bytes();
        // A match may straddle the previous search boundary
        let start = self.searched.saturating_sub(needle.len() - 1);
        buf.get(start..)
            .map(|tail| tail.windows(needle.len()).any(|w| w == needle))
            .unwrap_or(false)
    }

    fn unframe(&self, frame: &[u8]) -> String {
        String::from_utf8_lossy(frame)
            .replace(self.delimiter.as_str(), "")
            .trim()
            .to_string()
    }
}

impl Decoder for DelimiterCodec {
    type Item = String;
    type Error = DiscoverError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>> {
        if self.contains_delimiter(src) {
            self.searched = 0;
            let frame = src.split();
            return Ok(Some(self.unframe(&frame)));
        }
        self.searched = src.len();
        Ok(None)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>> {
        if let Some(message) = self.decode(src)? {
            return Ok(Some(message));
        }
        self.searched = 0;
        if src.is_empty() {
            return Ok(None);
        }
        let frame = src.split();
        Ok(Some(self.unframe(&frame)))
    }
}

impl Encoder<String> for DelimiterCodec {
    type Error = DiscoverError;

    fn encode(&mut self, payload: String, dst: &mut BytesMut) -> Result<()> {
        dst.reserve(payload.len() + self.delimiter.len());
        dst.put_slice(payload.as_bytes());
        dst.put_slice(self.delimiter.as_bytes());
        Ok(())
    }
}

/// A framed stream with a per-operation deadline
///
/// The deadline is re-armed on every `send` and `receive`, so a full exchange
/// can take several multiples of the timeout.
pub struct Connection<S, C = DelimiterCodec> {
    framed: Framed<S, C>,
    timeout: Duration,
}

impl<S, C> Connection<S, C>
where
    S: AsyncRead + AsyncWrite + Unpin,
    C: FrameCodec,
{
    pub fn new(stream: S, codec: C, timeout: Duration) -> Self {
        Self {
            framed: Framed::new(stream, codec),
            timeout,
        }
    }

    /// Frame and write one message
    pub async fn send(&mut self, payload: &str) -> Result<()> {
        trace!("sending {} byte message", payload.len());
        match time::timeout(self.timeout, self.framed.send(payload.to_string())).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(into_transport(e)),
            Err(_) => Err(self.timed_out("write")),
        }
    }

    /// Read until one message is complete or the peer closes
    ///
    /// A peer that closes without sending anything yields an empty message.
    pub async fn receive(&mut self) -> Result<String> {
        match time::timeout(self.timeout, self.framed.next()).await {
            Ok(Some(Ok(message))) => {
                trace!("received {} byte message", message.len());
                Ok(message)
            }
            Ok(Some(Err(e))) => Err(into_transport(e)),
            Ok(None) => Ok(String::new()),
            Err(_) => Err(self.timed_out("read")),
        }
    }

    fn timed_out(&self, operation: &str) -> DiscoverError {
        DiscoverError::Timeout {
            operation: operation.to_string(),
            seconds: self.timeout.as_secs(),
        }
    }
}

fn into_transport(err: DiscoverError) -> DiscoverError {
    match err {
        DiscoverError::Io(e) => DiscoverError::Transport(e.to_string()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    const DELIM: &str = "<???DONE???---";

    fn codec() -> DelimiterCodec {
        DelimiterCodec::new(DELIM).unwrap()
    }

    #[test]
    fn test_empty_delimiter_rejected() {
        assert!(matches!(
            DelimiterCodec::new(""),
            Err(DiscoverError::Config(_))
        ));
    }

    #[test]
    fn test_decode_waits_for_delimiter() {
        let mut codec = codec();
        let mut buf = BytesMut::from("{\"cubes\":[");

        assert_eq!(codec.decode(&mut buf).unwrap(), None);

        buf.extend_from_slice(b"\"a\"]}<???DO");
        assert_eq!(codec.decode(&mut buf).unwrap(), None);

        buf.extend_from_slice(b"NE???---");
        assert_eq!(
            codec.decode(&mut buf).unwrap().as_deref(),
            Some("{\"cubes\":[\"a\"]}")
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_strips_every_delimiter_and_trims() {
        let mut codec = codec();
        let mut buf = BytesMut::from("  first<???DONE???---second<???DONE???---\n");

        assert_eq!(
            codec.decode(&mut buf).unwrap().as_deref(),
            Some("firstsecond")
        );
    }

    #[test]
    fn test_decode_eof_returns_partial_message() {
        let mut codec = codec();
        let mut buf = BytesMut::from(" auth_success ");

        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        assert_eq!(
            codec.decode_eof(&mut buf).unwrap().as_deref(),
            Some("auth_success")
        );
        assert_eq!(codec.decode_eof(&mut buf).unwrap(), None);
    }

    #[test]
    fn test_encode_appends_delimiter() {
        let mut codec = codec();
        let mut dst = BytesMut::new();

        codec
            .encode("{\"type\":\"get_planets\"}".to_string(), &mut dst)
            .unwrap();

        assert_eq!(&dst[..], b"{\"type\":\"get_planets\"}<???DONE???---");
    }

    #[test]
    fn test_frame_then_unframe_preserves_payload() {
        let payloads = ["hello", "  padded  ", "{\"k\":[1,2,3]}", "multi\nline"];

        for payload in payloads {
            let mut codec = codec();
            let mut buf = BytesMut::new();
            codec.encode(payload.to_string(), &mut buf).unwrap();

            let decoded = codec.decode(&mut buf).unwrap();
            assert_eq!(decoded.as_deref(), Some(payload.trim()));
        }
    }

    #[tokio::test]
    async fn test_connection_exchange() {
        let (client, mut server) = tokio::io::duplex(64);
        let mut conn = Connection::new(client, codec(), Duration::from_secs(1));

        conn.send("secret").await.unwrap();

        let mut received = vec![0u8; "secret".len() + DELIM.len()];
        server.read_exact(&mut received).await.unwrap();
        assert_eq!(received, b"secret<???DONE???---");

        // Deliver the reply in small pieces
        for chunk in ["auth_", "success<???", "DONE???---"] {
            server.write_all(chunk.as_bytes()).await.unwrap();
        }
        assert_eq!(conn.receive().await.unwrap(), "auth_success");
    }

    #[tokio::test]
    async fn test_receive_times_out() {
        let (client, _server) = tokio::io::duplex(64);
        let mut conn = Connection::new(client, codec(), Duration::from_millis(50));

        let err = conn.receive().await.unwrap_err();
        assert!(matches!(err, DiscoverError::Timeout { ref operation, .. } if operation == "read"));
    }

    #[tokio::test]
    async fn test_receive_after_peer_close_is_empty() {
        let (client, server) = tokio::io::duplex(64);
        drop(server);
        let mut conn = Connection::new(client, codec(), Duration::from_secs(1));

        assert_eq!(conn.receive().await.unwrap(), "");
    }
}
