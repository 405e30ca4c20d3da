//! Chunked reads of one message body section.
//!
//! [`PartialFetch`] turns `BODY.PEEK[section]<offset.count>` round trips
//! into a byte reader. Small reads are rounded up to the configured
//! minimum chunk and the surplus is cached, so a run of tiny reads costs
//! one round trip per chunk. A server that answers with a different byte
//! count than requested has ignored the partial range; everything it sent
//! is kept and no further round trips are made.

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, warn};

use super::client::Connection;
use super::events::EventKind;
use crate::command::{Command, FetchAttribute};
use crate::parser::{FetchItem, UntaggedResponse};
use crate::types::{SeqNum, SequenceSet, Status};
use crate::{Error, Result};

/// Streaming reader over a body section fetched in chunks.
///
/// Borrows the connection mutably; other commands can run again once the
/// reader is dropped.
pub struct PartialFetch<'c, S> {
    conn: &'c mut Connection<S>,
    seq: SeqNum,
    section: Option<String>,
    /// Next octet to request; `None` once no more round trips are allowed.
    offset: Option<u64>,
    cache: BytesMut,
    min_chunk: u64,
    ceiling: usize,
    refused: bool,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Opens a chunked reader over `BODY[section]` of message `seq`.
    ///
    /// `None` or an empty section reads the whole message. Nothing is sent
    /// until the first read.
    pub fn partial_fetch(&mut self, seq: SeqNum, section: Option<&str>) -> PartialFetch<'_, S> {
        let min_chunk = self.config().min_chunk.max(1);
        let ceiling = self.config().cache_ceiling;
        PartialFetch {
            conn: self,
            seq,
            section: section.filter(|s| !s.is_empty()).map(str::to_string),
            offset: Some(0),
            cache: BytesMut::new(),
            min_chunk,
            ceiling,
            refused: false,
        }
    }
}

impl<S> PartialFetch<'_, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Returns true if the server answered NO to a chunk request.
    #[must_use]
    pub const fn refused(&self) -> bool {
        self.refused
    }

    /// Returns true once no further round trips will be made.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.offset.is_none()
    }

    /// Number of bytes cached and not yet read.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Reads up to `buf.len()` bytes. Returns 0 at the end of the section.
    ///
    /// # Errors
    ///
    /// Returns an error if the round trip fails or a single response
    /// exceeds the configured cache ceiling. Both make the reader terminal.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.cache.is_empty() {
            let Some(offset) = self.offset else {
                return Ok(0);
            };
            self.round_trip(offset, buf.len()).await?;
        }

        let n = buf.len().min(self.cache.len());
        buf[..n].copy_from_slice(&self.cache[..n]);
        self.cache.advance(n);
        Ok(n)
    }

    /// Reads until the end of the section.
    ///
    /// # Errors
    ///
    /// Same as [`PartialFetch::read`].
    pub async fn read_to_end(&mut self) -> Result<Vec<u8>> {
        let chunk = usize::try_from(self.min_chunk).unwrap_or(usize::MAX).min(64 * 1024);
        let mut buf = vec![0u8; chunk];
        let mut out = Vec::new();
        loop {
            let n = self.read(&mut buf).await?;
            if n == 0 {
                return Ok(out);
            }
            out.extend_from_slice(&buf[..n]);
        }
    }

    async fn round_trip(&mut self, offset: u64, wanted: usize) -> Result<()> {
        let ceiling = u64::try_from(self.ceiling.max(1)).unwrap_or(u64::MAX);
        let request = u64::try_from(wanted)
            .unwrap_or(u64::MAX)
            .max(self.min_chunk)
            .min(ceiling);

        let command = Command::Fetch {
            sequence: SequenceSet::Single(self.seq.get()),
            items: FetchAttribute::partial_peek(self.section.clone(), offset, request).into(),
            uid: false,
        };
        debug!(seq = self.seq.get(), offset, request, "partial fetch");

        let done = match self.conn.invoke(&command, &[EventKind::Fetch]).await {
            Ok(done) => done,
            Err(e) => {
                self.offset = None;
                return Err(e);
            }
        };

        if done.status != Status::Ok {
            warn!(seq = self.seq.get(), text = %done.text, "partial fetch refused");
            self.refused = true;
            self.offset = None;
            self.requeue_all(done.responses);
            return Ok(());
        }

        let payload = self.take_payload(done.responses);
        if payload.len() > self.ceiling {
            self.offset = None;
            return Err(Error::Protocol(format!(
                "partial fetch returned {} octets, cache ceiling is {}",
                payload.len(),
                self.ceiling
            )));
        }

        let received = u64::try_from(payload.len()).unwrap_or(u64::MAX);
        if received == request {
            self.offset = offset.checked_add(request);
        } else {
            if received > request {
                warn!(
                    seq = self.seq.get(),
                    request, received, "server ignored partial range"
                );
            }
            self.offset = None;
        }
        self.cache.extend_from_slice(&payload);
        Ok(())
    }

    /// Extracts the requested body data, returning every other claimed
    /// FETCH item to the session queue.
    fn take_payload(&mut self, responses: Vec<UntaggedResponse>) -> Vec<u8> {
        let mut payload = None;
        for response in responses {
            match response {
                UntaggedResponse::Fetch { seq, items } if seq == self.seq => {
                    let mut rest = Vec::new();
                    for item in items {
                        match item {
                            FetchItem::Body { section, data, .. }
                                if payload.is_none() && section == self.section =>
                            {
                                payload = Some(data.unwrap_or_default());
                            }
                            other => rest.push(other),
                        }
                    }
                    if !rest.is_empty() {
                        self.conn.requeue(UntaggedResponse::Fetch { seq, items: rest });
                    }
                }
                other => self.conn.requeue(other),
            }
        }
        payload.unwrap_or_default()
    }

    fn requeue_all(&mut self, responses: Vec<UntaggedResponse>) {
        for response in responses {
            self.conn.requeue(response);
        }
    }
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
    use tokio_test::io::{Builder, Mock};

    use super::*;
    use crate::ErrorKind;
    use crate::connection::config::Config;

    async fn connection(mock: Mock, min_chunk: u64, ceiling: usize) -> Connection<Mock> {
        let config = Config::builder("imap.example.com")
            .min_chunk(min_chunk)
            .cache_ceiling(ceiling)
            .build();
        Connection::from_stream(mock, config).await.unwrap()
    }

    fn seq(n: u32) -> SeqNum {
        SeqNum::new(n).unwrap()
    }

    #[tokio::test]
    async fn test_small_reads_served_from_cache() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"A1 FETCH 1 BODY.PEEK[]<0.10>\r\n")
            .read(b"* 1 FETCH (BODY[]<0> {10}\r\nHello, wor)\r\nA1 OK FETCH completed\r\n")
            .write(b"A2 FETCH 1 BODY.PEEK[]<10.10>\r\n")
            .read(b"* 1 FETCH (BODY[]<10> {9}\r\nld!!!!!!!)\r\nA2 OK FETCH completed\r\n")
            .build();
        let mut conn = connection(mock, 10, 1024).await;
        let mut reader = conn.partial_fetch(seq(1), None);
        let mut buf = [0u8; 4];

        assert_eq!(reader.read(&mut buf).await.unwrap(), 4);
        assert_eq!(&buf, b"Hell");
        assert_eq!(reader.cached(), 6);
        assert_eq!(reader.read(&mut buf).await.unwrap(), 4);
        assert_eq!(&buf, b"o, w");
        assert_eq!(reader.read(&mut buf).await.unwrap(), 2);
        assert_eq!(&buf[..2], b"or");
        assert!(!reader.is_terminal());

        // Short answer at the end of the message.
        let rest = reader.read_to_end().await.unwrap();
        assert_eq!(rest, b"ld!!!!!!!");
        assert!(reader.is_terminal());
        assert_eq!(reader.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_server_ignoring_range_is_kept_whole() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"A1 FETCH 2 BODY.PEEK[]<0.8>\r\n")
            .read(b"* 2 FETCH (BODY[] {19}\r\nHello, world!!!!!!!)\r\nA1 OK FETCH completed\r\n")
            .build();
        let mut conn = connection(mock, 8, 1024).await;
        let mut reader = conn.partial_fetch(seq(2), Some(""));

        let mut buf = [0u8; 5];
        assert_eq!(reader.read(&mut buf).await.unwrap(), 5);
        assert!(reader.is_terminal());
        assert_eq!(reader.read_to_end().await.unwrap(), b", world!!!!!!!");
        assert_eq!(reader.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_refused_chunk_ends_stream() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"A1 FETCH 3 BODY.PEEK[TEXT]<0.5000>\r\n")
            .read(b"A1 NO message is gone\r\n")
            .write(b"A2 NOOP\r\n")
            .read(b"A2 OK NOOP completed\r\n")
            .build();
        let mut conn = connection(mock, crate::connection::config::DEFAULT_MIN_CHUNK, 1024 * 1024).await;
        {
            let mut reader = conn.partial_fetch(seq(3), Some("TEXT"));
            let mut buf = [0u8; 16];
            assert_eq!(reader.read(&mut buf).await.unwrap(), 0);
            assert!(reader.refused());
            assert!(reader.is_terminal());
        }
        assert!(!conn.is_poisoned());
        conn.noop().await.unwrap();
    }

    #[tokio::test]
    async fn test_response_over_ceiling() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"A1 FETCH 1 BODY.PEEK[]<0.4>\r\n")
            .read(b"* 1 FETCH (BODY[] {16}\r\n0123456789abcdef)\r\nA1 OK FETCH completed\r\n")
            .build();
        let mut conn = connection(mock, 4, 8).await;
        let mut reader = conn.partial_fetch(seq(1), None);

        let mut buf = [0u8; 4];
        let err = reader.read(&mut buf).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert!(reader.is_terminal());
        assert_eq!(reader.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unrelated_fetch_data_is_queued() {
        let mock = Builder::new()
            .read(b"* PREAUTH ready\r\n")
            .write(b"A1 FETCH 1 BODY.PEEK[]<0.3>\r\n")
            .read(b"* 4 EXISTS\r\n")
            .read(b"* 2 FETCH (FLAGS (\\Seen))\r\n")
            .read(b"* 1 FETCH (FLAGS (\\Seen) BODY[]<0> {3}\r\nabc)\r\n")
            .read(b"A1 OK FETCH completed\r\n")
            .build();
        let mut conn = connection(mock, 3, 1024).await;
        {
            let mut reader = conn.partial_fetch(seq(1), None);
            let mut buf = [0u8; 3];
            assert_eq!(reader.read(&mut buf).await.unwrap(), 3);
            assert_eq!(&buf, b"abc");
        }

        let events = conn.take_events();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], UntaggedResponse::Exists(4)));
        assert!(matches!(&events[1], UntaggedResponse::Fetch { seq, .. } if seq.get() == 2));
        match &events[2] {
            UntaggedResponse::Fetch { seq, items } => {
                assert_eq!(seq.get(), 1);
                assert!(matches!(items.as_slice(), [FetchItem::Flags(_)]));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
