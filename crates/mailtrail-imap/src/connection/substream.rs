//! Byte-bounded view of a reader.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use tokio::io::{AsyncRead, ReadBuf};

/// Reads at most `limit` bytes from `inner`, then reports end of stream.
///
/// `hook` runs exactly once, when the last byte of the limit has been
/// delivered (immediately on first read for a zero limit). A source that
/// ends early yields [`io::ErrorKind::UnexpectedEof`] and the hook never
/// runs.
pub struct Substream<R, F> {
    inner: R,
    limit: u64,
    consumed: u64,
    hook: Option<F>,
}

impl<R, F> Substream<R, F>
where
    F: FnOnce(),
{
    /// Wraps `inner`, capping reads at `limit` bytes.
    pub const fn new(inner: R, limit: u64, hook: F) -> Self {
        Self {
            inner,
            limit,
            consumed: 0,
            hook: Some(hook),
        }
    }

    /// Bytes still available before the limit.
    #[must_use]
    pub const fn remaining(&self) -> u64 {
        self.limit - self.consumed
    }

    /// Bytes delivered so far.
    #[must_use]
    pub const fn consumed(&self) -> u64 {
        self.consumed
    }

    fn fire(&mut self) {
        if let Some(hook) = self.hook.take() {
            hook();
        }
    }
}

impl<R, F> AsyncRead for Substream<R, F>
where
    R: AsyncRead + Unpin,
    F: FnOnce() + Unpin,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let remaining = this.remaining();
        if remaining == 0 {
            this.fire();
            return Poll::Ready(Ok(()));
        }
        if buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }

        let max = usize::try_from(remaining)
            .unwrap_or(usize::MAX)
            .min(buf.remaining());
        let n = {
            let mut window = ReadBuf::new(buf.initialize_unfilled_to(max));
            ready!(Pin::new(&mut this.inner).poll_read(cx, &mut window))?;
            window.filled().len()
        };
        if n == 0 {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("stream ended with {remaining} bounded bytes outstanding"),
            )));
        }

        buf.advance(n);
        this.consumed += n as u64;
        if this.remaining() == 0 {
            this.fire();
        }
        Poll::Ready(Ok(()))
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
    use std::cell::Cell;

    use tokio::io::AsyncReadExt;

    use super::*;

    #[tokio::test]
    async fn stops_at_limit_and_fires_once() {
        let fired = Cell::new(0);
        let mut source: &[u8] = b"hello world";
        let mut sub = Substream::new(&mut source, 5, || fired.set(fired.get() + 1));

        let mut out = Vec::new();
        sub.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"hello");
        assert_eq!(sub.remaining(), 0);
        assert_eq!(sub.consumed(), 5);

        // Further reads stay at EOF without re-firing.
        let mut extra = [0u8; 4];
        assert_eq!(sub.read(&mut extra).await.unwrap(), 0);
        drop(sub);
        assert_eq!(fired.get(), 1);
        assert_eq!(source, b" world");
    }

    #[tokio::test]
    async fn zero_limit_fires_on_first_read() {
        let fired = Cell::new(false);
        let mut source: &[u8] = b"abc";
        let mut sub = Substream::new(&mut source, 0, || fired.set(true));
        let mut buf = [0u8; 2];
        assert_eq!(sub.read(&mut buf).await.unwrap(), 0);
        assert!(fired.get());
    }

    #[tokio::test]
    async fn short_source_is_unexpected_eof() {
        let fired = Cell::new(false);
        let mut source: &[u8] = b"abc";
        let mut sub = Substream::new(&mut source, 10, || fired.set(true));
        let mut out = Vec::new();
        let err = sub.read_to_end(&mut out).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert_eq!(out, b"abc");
        assert!(!fired.get());
    }

    #[tokio::test]
    async fn small_buffers_see_every_byte() {
        let mut source: &[u8] = b"0123456789";
        let mut sub = Substream::new(&mut source, 7, || {});
        let mut seen = Vec::new();
        let mut buf = [0u8; 3];
        loop {
            let n = sub.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            seen.extend_from_slice(&buf[..n]);
        }
        assert_eq!(seen, b"0123456");
    }
}
