//! Line channel over one byte stream.
//!
//! A [`Channel`] is the only owner of its stream. Reads are buffered inside
//! the channel but handed out one line at a time, so bytes after the current
//! line stay available to the next read and byte-counted bodies never
//! desynchronize the stream.
//!
//! No line longer than the channel's limit is ever buffered; the peer gets
//! [`ProtocolError::LineTooLong`] instead of the server's memory.

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{trace, warn};

use sealmail_core::defaults::{LINE_TERMINATOR, MAX_LINE_BYTES};

use crate::codec::{Request, Response};
use crate::error::{ProtocolError, ProtocolResult};

/// One side of a sealmail connection.
pub struct Channel<S> {
    stream: BufReader<S>,
    max_line_bytes: usize,
    bytes_written: u64,
    bytes_read: u64,
}

impl<S> Channel<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream: BufReader::new(stream),
            max_line_bytes: MAX_LINE_BYTES,
            bytes_written: 0,
            bytes_read: 0,
        }
    }

    /// Cap on one received line, terminator included.
    pub fn with_max_line_bytes(mut self, limit: usize) -> Self {
        self.max_line_bytes = limit.max(1);
        self
    }

    pub fn max_line_bytes(&self) -> usize {
        self.max_line_bytes
    }

    /// Total bytes written to the stream so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Total bytes consumed from the stream so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Send one request line.
    pub async fn send_request(&mut self, request: &Request) -> ProtocolResult<()> {
        self.write_line(&request.to_line()).await
    }

    /// Send one response line.
    pub async fn send_response(&mut self, response: &Response) -> ProtocolResult<()> {
        self.write_line(&response.to_line()).await
    }

    /// Send one line of payload (LIST entries, RETRIEVE body).
    pub async fn send_line(&mut self, line: &str) -> ProtocolResult<()> {
        self.write_line(line).await
    }

    /// Receive and parse one response line.
    pub async fn receive_response(&mut self) -> ProtocolResult<Response> {
        let line = self.receive_line().await?;
        Response::parse(&line)
    }

    /// Receive and parse one request line.
    pub async fn receive_request(&mut self) -> ProtocolResult<Request> {
        let line = self.receive_line().await?;
        Ok(Request::parse(strip_terminator(&line)))
    }

    /// Receive one line including its `\n` terminator.
    ///
    /// The final line of a stream may arrive without a terminator. Returns
    /// [`ProtocolError::ConnectionClosed`] if the stream ends before any byte
    /// of a new line, and [`ProtocolError::LineTooLong`] once more than
    /// `max_line_bytes` arrive without a `\n`.
    pub async fn receive_line(&mut self) -> ProtocolResult<String> {
        let limit = self.max_line_bytes;
        let mut buf = Vec::new();
        let n = (&mut self.stream)
            .take(limit as u64 + 1)
            .read_until(b'\n', &mut buf)
            .await?;
        if n == 0 {
            return Err(ProtocolError::ConnectionClosed);
        }
        self.bytes_read += n as u64;

        if n > limit {
            warn!(
                subsystem = "protocol",
                component = "channel",
                limit,
                "Line exceeds limit, giving up on stream"
            );
            return Err(ProtocolError::LineTooLong { limit });
        }
        let line = String::from_utf8(buf)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        trace!(
            subsystem = "protocol",
            component = "channel",
            direction = "in",
            byte_count = n,
            "Line received"
        );
        Ok(line)
    }

    /// Receive one line with its terminator (`\n` or `\r\n`) removed.
    pub async fn receive_raw_line(&mut self) -> ProtocolResult<String> {
        let mut line = self.receive_line().await?;
        let len = strip_terminator(&line).len();
        line.truncate(len);
        Ok(line)
    }

    /// Shut down the write half.
    pub async fn shutdown(&mut self) -> ProtocolResult<()> {
        self.stream.get_mut().shutdown().await?;
        Ok(())
    }

    /// Recover the underlying stream. Buffered unread bytes are lost.
    pub fn into_inner(self) -> S {
        self.stream.into_inner()
    }

    async fn write_line(&mut self, line: &str) -> ProtocolResult<()> {
        let writer = self.stream.get_mut();
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(LINE_TERMINATOR.as_bytes()).await?;
        writer.flush().await?;

        let n = line.len() + LINE_TERMINATOR.len();
        self.bytes_written += n as u64;
        trace!(
            subsystem = "protocol",
            component = "channel",
            direction = "out",
            byte_count = n,
            "Line sent"
        );
        Ok(())
    }
}

fn strip_terminator(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Command;
    use tokio::io::duplex;

    #[tokio::test]
    async fn test_request_reaches_peer_as_line() {
        let (client, server) = duplex(1024);
        let mut client = Channel::new(client);
        let mut server = Channel::new(server);

        client
            .send_request(&Request::with_argument(Command::Rcpt, "bob"))
            .await
            .unwrap();
        let request = server.receive_request().await.unwrap();

        assert_eq!(request.known_command(), Some(Command::Rcpt));
        assert_eq!(request.argument(), "bob");
        assert_eq!(client.bytes_written(), "RCPT bob\n".len() as u64);
    }

    #[tokio::test]
    async fn test_receive_line_one_at_a_time() {
        let (mut peer, local) = duplex(1024);
        peer.write_all(b"first\nsecond\r\nthird").await.unwrap();
        drop(peer);
        let mut channel = Channel::new(local);

        assert_eq!(channel.receive_line().await.unwrap(), "first\n");
        assert_eq!(channel.receive_raw_line().await.unwrap(), "second");
        assert_eq!(channel.receive_line().await.unwrap(), "third");
        assert!(matches!(
            channel.receive_line().await,
            Err(ProtocolError::ConnectionClosed)
        ));
        assert_eq!(channel.bytes_read(), 19);
    }

    #[tokio::test]
    async fn test_response_roundtrip_over_stream() {
        let (client, server) = duplex(1024);
        let mut client = Channel::new(client);
        let mut server = Channel::new(server);

        server
            .send_response(&Response::success(2, "2 mails"))
            .await
            .unwrap();
        let response = client.receive_response().await.unwrap();

        assert!(response.is_success());
        assert_eq!(response.notice_count().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_malformed_response_surfaces() {
        let (mut peer, local) = duplex(1024);
        peer.write_all(b"HELLO THERE\n").await.unwrap();
        let mut channel = Channel::new(local);

        assert!(matches!(
            channel.receive_response().await,
            Err(ProtocolError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_line_at_limit_accepted() {
        let (mut peer, local) = duplex(1024);
        peer.write_all(b"1234567\n").await.unwrap();
        let mut channel = Channel::new(local).with_max_line_bytes(8);

        assert_eq!(channel.receive_line().await.unwrap(), "1234567\n");
    }

    #[tokio::test]
    async fn test_overlong_line_rejected_without_buffering_it() {
        let (mut peer, local) = duplex(64 * 1024);
        let mut channel = Channel::new(local).with_max_line_bytes(16);

        peer.write_all(b"HELO alice\n").await.unwrap();
        peer.write_all(&[b'x'; 32 * 1024]).await.unwrap();

        assert_eq!(channel.receive_raw_line().await.unwrap(), "HELO alice");
        let err = channel.receive_line().await.unwrap_err();
        assert!(matches!(err, ProtocolError::LineTooLong { limit: 16 }));
        assert!(err.is_disconnect());
        assert_eq!(channel.bytes_read(), 11 + 17);
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_is_io_error() {
        let (mut peer, local) = duplex(1024);
        peer.write_all(b"\xff\xfe\n").await.unwrap();
        let mut channel = Channel::new(local);

        match channel.receive_line().await {
            Err(ProtocolError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::InvalidData),
            other => panic!("expected InvalidData, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_send_line_appends_terminator() {
        let (local, mut peer) = duplex(1024);
        let mut channel = Channel::new(local);
        channel.send_line("1 alice 2024-01-01T00:00:00+00:00").await.unwrap();
        drop(channel);

        let mut received = String::new();
        peer.read_to_string(&mut received).await.unwrap();
        assert_eq!(received, "1 alice 2024-01-01T00:00:00+00:00\n");
    }
}
