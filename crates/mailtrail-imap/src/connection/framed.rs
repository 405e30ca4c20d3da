//! Framed I/O for IMAP protocol.
//!
//! IMAP uses CRLF-terminated lines with embedded literals. A line ending in
//! `{n}` announces n raw bytes that follow immediately; those bytes are read
//! through a [`Substream`] so CR, LF and NUL inside them never end the
//! response early.

#![allow(clippy::missing_errors_doc)]

use std::io;

use bytes::BytesMut;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::trace;

use super::config::DEFAULT_MAX_LITERAL_SIZE;
use super::substream::Substream;
use crate::{Error, Result};

/// Default buffer size for reading.
const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Maximum line length to prevent memory exhaustion.
const MAX_LINE_LENGTH: usize = 1024 * 1024; // 1 MB

/// Framed connection for IMAP protocol.
///
/// Handles line-based reading with literal support and buffered writing.
pub struct FramedStream<S> {
    reader: BufReader<S>,
    write_buffer: BytesMut,
    max_literal_size: usize,
}

impl<S> FramedStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new framed stream.
    pub fn new(stream: S) -> Self {
        Self::with_max_literal_size(stream, DEFAULT_MAX_LITERAL_SIZE)
    }

    /// Creates a framed stream that rejects literals above `max` bytes.
    pub fn with_max_literal_size(stream: S, max: usize) -> Self {
        Self {
            reader: BufReader::with_capacity(DEFAULT_BUFFER_SIZE, stream),
            write_buffer: BytesMut::with_capacity(DEFAULT_BUFFER_SIZE),
            max_literal_size: max,
        }
    }

    /// Reads a complete IMAP response, including any embedded literals.
    pub async fn read_response(&mut self) -> Result<Vec<u8>> {
        let mut response = Vec::new();

        loop {
            let line = self.read_line().await?;
            response.extend_from_slice(&line);

            let Some(len) = literal_announcement(&line)? else {
                break;
            };
            if len > self.max_literal_size as u64 {
                return Err(Error::Protocol(format!(
                    "literal too large: {len} bytes (max {})",
                    self.max_literal_size
                )));
            }
            self.read_literal(len, &mut response).await?;
        }

        Ok(response)
    }

    async fn read_literal(&mut self, len: u64, out: &mut Vec<u8>) -> Result<()> {
        let start = out.len();
        let mut bounded = Substream::new(&mut self.reader, len, || {
            trace!(len, offset = start, "literal complete");
        });
        match bounded.read_to_end(out).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(Error::Protocol(format!(
                "connection closed inside a {len}-byte literal"
            ))),
            Err(e) => Err(e.into()),
        }
    }

    /// Reads a single CRLF-terminated line.
    async fn read_line(&mut self) -> Result<Vec<u8>> {
        let mut line = Vec::new();

        loop {
            let buf = self.reader.fill_buf().await?;
            if buf.is_empty() {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed",
                )));
            }

            if let Some(pos) = find_crlf(buf) {
                line.extend_from_slice(&buf[..pos + 2]);
                self.reader.consume(pos + 2);
                break;
            }

            let len = buf.len();
            line.extend_from_slice(buf);
            self.reader.consume(len);

            // The CRLF may straddle two reads.
            if line.ends_with(b"\r") {
                let next = self.reader.fill_buf().await?;
                if next.first() == Some(&b'\n') {
                    line.push(b'\n');
                    self.reader.consume(1);
                    break;
                }
            }

            if line.len() > MAX_LINE_LENGTH {
                return Err(Error::Protocol("line too long".to_string()));
            }
        }

        Ok(line)
    }

    /// Writes bytes to the stream and flushes.
    pub async fn write_command(&mut self, data: &[u8]) -> Result<()> {
        self.write_buffer.clear();
        self.write_buffer.extend_from_slice(data);

        let stream = self.reader.get_mut();
        stream.write_all(&self.write_buffer).await?;
        stream.flush().await?;

        Ok(())
    }

    /// Consumes the framed stream and returns the inner stream.
    ///
    /// Any buffered read data is discarded.
    pub fn into_inner(self) -> S {
        self.reader.into_inner()
    }
}

/// Finds the position of CRLF in a buffer.
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

/// Returns the literal length announced at the end of a line.
///
/// Matches `{123}\r\n` and `{123+}\r\n`. Braces holding anything but digits
/// are ordinary text; an empty or overflowing length is a decoding error.
fn literal_announcement(line: &[u8]) -> Result<Option<u64>> {
    let Some(line) = line.strip_suffix(b"\r\n") else {
        return Ok(None);
    };
    let Some(line) = line.strip_suffix(b"}") else {
        return Ok(None);
    };
    let Some(open) = line.iter().rposition(|&b| b == b'{') else {
        return Ok(None);
    };
    let inner = &line[open + 1..];
    let digits = inner.strip_suffix(b"+").unwrap_or(inner);

    if !digits.iter().all(u8::is_ascii_digit) {
        return Ok(None);
    }
    if digits.is_empty() {
        return Err(Error::Decoding("empty literal length".to_string()));
    }
    // Only ASCII digits remain, so the conversion cannot fail.
    let text = std::str::from_utf8(digits).unwrap_or_default();
    text.parse()
        .map(Some)
        .map_err(|_| Error::Decoding(format!("literal length out of range: {text}")))
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use tokio_test::io::Builder;

    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_find_crlf() {
        assert_eq!(find_crlf(b"hello\r\n"), Some(5));
        assert_eq!(find_crlf(b"\r\n"), Some(0));
        assert_eq!(find_crlf(b"no newline"), None);
        assert_eq!(find_crlf(b"just\n"), None);
        assert_eq!(find_crlf(b"just\r"), None);
    }

    #[test]
    fn test_literal_announcement() {
        assert_eq!(literal_announcement(b"BODY {123}\r\n").unwrap(), Some(123));
        assert_eq!(literal_announcement(b"BODY {123+}\r\n").unwrap(), Some(123));
        assert_eq!(literal_announcement(b"{0}\r\n").unwrap(), Some(0));
        assert_eq!(literal_announcement(b"no literal\r\n").unwrap(), None);
        assert_eq!(literal_announcement(b"incomplete {123").unwrap(), None);
        assert_eq!(literal_announcement(b"wrong {abc}\r\n").unwrap(), None);
    }

    #[test]
    fn test_malformed_literal_length_is_decoding_error() {
        let err = literal_announcement(b"* 1 FETCH (BODY[] {}\r\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decoding);

        let err = literal_announcement(b"{99999999999999999999999}\r\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decoding);
    }

    #[tokio::test]
    async fn test_framed_read_simple_line() {
        let mock = Builder::new().read(b"* OK ready\r\n").build();
        let mut framed = FramedStream::new(mock);

        let response = framed.read_response().await.unwrap();
        assert_eq!(response, b"* OK ready\r\n");
    }

    #[tokio::test]
    async fn test_framed_read_with_literal() {
        let mock = Builder::new()
            .read(b"* 1 FETCH (BODY {5}\r\n")
            .read(b"hello)\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        let response = framed.read_response().await.unwrap();
        assert_eq!(response, b"* 1 FETCH (BODY {5}\r\nhello)\r\n");
    }

    #[tokio::test]
    async fn test_literal_with_line_breaks_and_nul() {
        let mock = Builder::new()
            .read(b"* 3 FETCH (BODY[] {8}\r\n")
            .read(b"a\r\nb\0\r\n")
            .read(b"c)\r\n")
            .read(b"A1 OK done\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        let response = framed.read_response().await.unwrap();
        assert_eq!(response, b"* 3 FETCH (BODY[] {8}\r\na\r\nb\0\r\nc)\r\n");
        assert_eq!(framed.read_response().await.unwrap(), b"A1 OK done\r\n");
    }

    #[tokio::test]
    async fn test_two_literals_in_one_response() {
        let mock = Builder::new()
            .read(b"* 1 FETCH (BODY[1] {2}\r\nxyBODY[2] {3}\r\nabc)\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        let response = framed.read_response().await.unwrap();
        assert_eq!(response, b"* 1 FETCH (BODY[1] {2}\r\nxyBODY[2] {3}\r\nabc)\r\n");
    }

    #[tokio::test]
    async fn test_crlf_split_across_reads() {
        let mock = Builder::new().read(b"* OK ready\r").read(b"\n").build();
        let mut framed = FramedStream::new(mock);

        assert_eq!(framed.read_response().await.unwrap(), b"* OK ready\r\n");
    }

    #[tokio::test]
    async fn test_literal_trickled_and_empty_literal() {
        let mock = Builder::new()
            .read(b"* 1 FETCH (BODY[] {4}\r\n")
            .read(b"a")
            .read(b"b\r")
            .read(b"\n)\r\n")
            .read(b"* 2 FETCH (BODY[] {0}\r\n)\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        let first = framed.read_response().await.unwrap();
        assert_eq!(first, b"* 1 FETCH (BODY[] {4}\r\nab\r\n)\r\n");
        let second = framed.read_response().await.unwrap();
        assert_eq!(second, b"* 2 FETCH (BODY[] {0}\r\n)\r\n");
    }

    #[tokio::test]
    async fn test_drop_inside_literal_is_protocol_error() {
        let mock = Builder::new()
            .read(b"* 1 FETCH (BODY[] {10}\r\n")
            .read(b"abc")
            .build();
        let mut framed = FramedStream::new(mock);

        let err = framed.read_response().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[tokio::test]
    async fn test_framed_write_command() {
        let mock = Builder::new().write(b"A1 LOGIN user pass\r\n").build();
        let mut framed = FramedStream::new(mock);

        framed.write_command(b"A1 LOGIN user pass\r\n").await.unwrap();
    }

    #[tokio::test]
    async fn test_literal_size_validation() {
        let mock = Builder::new().read(b"* 1 FETCH (BODY {1001}\r\n").build();
        let mut framed = FramedStream::with_max_literal_size(mock, 1000);

        let err = framed.read_response().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert!(err.to_string().contains("literal too large"));
    }

    #[tokio::test]
    async fn test_literal_max_size_allowed() {
        let header = b"* 1 FETCH (BODY {1000}\r\n";
        let literal_data = vec![b'X'; 1000];

        let mock = Builder::new()
            .read(header)
            .read(&literal_data)
            .read(b")\r\n")
            .build();
        let mut framed = FramedStream::with_max_literal_size(mock, 1000);

        assert!(framed.read_response().await.is_ok());
    }

    #[tokio::test]
    async fn test_line_length_limit() {
        let long_line = "A".repeat(MAX_LINE_LENGTH + 100);
        let mock = Builder::new().read(long_line.as_bytes()).build();
        let mut framed = FramedStream::new(mock);

        let result = framed.read_response().await;
        assert!(result.unwrap_err().to_string().contains("line too long"));
    }

    #[tokio::test]
    async fn test_closed_stream_is_connection_error() {
        let mock = Builder::new().build();
        let mut framed = FramedStream::new(mock);

        let err = framed.read_response().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
    }
}
