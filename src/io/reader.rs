//! Buffered reader over a raw async byte stream.

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::{AsyncReadable, ReadError, ReadFuture, ReadResult};
use crate::buffer::GrowableDeque;

/// Default number of bytes requested from the stream when searching for a
/// delimiter.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Upper bound on a single refill triggered by [`BufferedStreamReader::read_bytes`].
const MAX_REFILL: usize = 64 * 1024;

/// Reads from a raw byte stream through a [`GrowableDeque`].
///
/// The stream is only read when the buffer cannot satisfy a request, and
/// each refill appends to the buffer without touching bytes already in it,
/// so bytes are delivered exactly in the order they were received.
///
/// A refill that returns zero bytes is treated as end-of-stream: any read
/// that still needs data fails with [`ReadError::UnexpectedEndOfStream`].
///
/// # Examples
///
/// ```
/// use ringhttp::io::BufferedStreamReader;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut reader = BufferedStreamReader::new(&b"Host: example\r\nrest"[..]);
/// let line = reader.read_line(8192).await?;
/// assert_eq!(line, "Host: example\r\n");
/// assert_eq!(&reader.read_bytes(16).await?[..], b"rest");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct BufferedStreamReader<R> {
    source: R,
    buffer: GrowableDeque,
    chunk_size: usize,
    scratch: Vec<u8>,
}

impl<R> BufferedStreamReader<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(source: R) -> Self {
        Self::with_chunk_size(source, DEFAULT_CHUNK_SIZE)
    }

    /// Creates a reader that refills `chunk_size` bytes at a time while
    /// searching for delimiters. A `chunk_size` of zero is raised to one.
    pub fn with_chunk_size(source: R, chunk_size: usize) -> Self {
        Self {
            source,
            buffer: GrowableDeque::new(),
            chunk_size: chunk_size.max(1),
            scratch: Vec::new(),
        }
    }

    /// Number of bytes received from the stream but not yet consumed.
    pub fn buffered(&self) -> usize {
        self.buffer.available_read()
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn get_ref(&self) -> &R {
        &self.source
    }

    /// Returns the underlying stream. Any buffered bytes are lost.
    pub fn into_inner(self) -> R {
        self.source
    }

    /// Reads up to `count` bytes.
    ///
    /// If the buffer is empty, the stream is read exactly once; the result is
    /// whatever is buffered afterwards, capped at `count`. Callers that need
    /// exactly `count` bytes must loop.
    ///
    /// # Errors
    ///
    /// - [`ReadError::UnexpectedEndOfStream`] — the buffer was empty and the
    ///   stream returned no data.
    /// - [`ReadError::Io`] — the stream failed.
    pub async fn read_bytes(&mut self, count: usize) -> ReadResult<Bytes> {
        if count == 0 {
            return Ok(Bytes::new());
        }
        if self.buffer.is_empty() {
            self.fill(count.min(MAX_REFILL)).await?;
        }
        let available = count.min(self.buffer.available_read());
        Ok(self.buffer.read(available)?)
    }

    /// Reads up to and including the first `delimiter`.
    ///
    /// Bytes already buffered are searched before the limit is checked, so a
    /// line of at most `max_len` bytes succeeds even when more than `max_len`
    /// bytes are buffered behind it.
    ///
    /// # Errors
    ///
    /// - [`ReadError::LimitExceeded`] — the delimiter was not found within
    ///   `max_len` bytes.
    /// - [`ReadError::UnexpectedEndOfStream`] — the stream ended first.
    /// - [`ReadError::Io`] — the stream failed.
    pub async fn read_bytes_until(&mut self, delimiter: u8, max_len: usize) -> ReadResult<Bytes> {
        self.read_until_with(max_len, 1, |buffer, start| {
            buffer.index_of(delimiter, start)
        })
        .await
    }

    /// Reads up to and including the first occurrence of `delimiter`.
    ///
    /// Same errors as [`read_bytes_until`](Self::read_bytes_until).
    pub async fn read_bytes_until_seq(
        &mut self,
        delimiter: &[u8],
        max_len: usize,
    ) -> ReadResult<Bytes> {
        self.read_until_with(max_len, delimiter.len(), |buffer, start| {
            buffer.index_of_seq(delimiter, start)
        })
        .await
    }

    /// Reads one `\n`-terminated line (terminator included) and decodes it
    /// as UTF-8, replacing invalid sequences.
    pub async fn read_line(&mut self, max_len: usize) -> ReadResult<String> {
        let line = self.read_bytes_until(b'\n', max_len).await?;
        Ok(String::from_utf8_lossy(&line).into_owned())
    }

    async fn read_until_with<F>(
        &mut self,
        max_len: usize,
        delimiter_len: usize,
        find: F,
    ) -> ReadResult<Bytes>
    where
        F: Fn(&GrowableDeque, usize) -> Option<usize>,
    {
        let mut start = 0;
        loop {
            if let Some(index) = find(&self.buffer, start) {
                let end = index + delimiter_len;
                if end > max_len {
                    return Err(ReadError::LimitExceeded { max: max_len });
                }
                return Ok(self.buffer.read(end)?);
            }

            let buffered = self.buffer.available_read();
            if buffered >= max_len {
                return Err(ReadError::LimitExceeded { max: max_len });
            }
            // Refills only append, so everything before `start` has already
            // been scanned. Back off so a delimiter split across refills is
            // still found.
            start = buffered.saturating_sub(delimiter_len.saturating_sub(1));
            self.fill(self.chunk_size).await?;
        }
    }

    /// Reads once from the stream into the buffer.
    async fn fill(&mut self, count: usize) -> ReadResult<usize> {
        self.scratch.resize(count, 0);
        let received = self.source.read(&mut self.scratch[..count]).await?;
        if received == 0 {
            return Err(ReadError::UnexpectedEndOfStream);
        }
        self.buffer.write(&self.scratch[..received])?;
        Ok(received)
    }
}

impl<R> AsyncReadable for BufferedStreamReader<R>
where
    R: AsyncRead + Unpin + Send,
{
    fn read_bytes(&mut self, count: usize) -> ReadFuture<'_> {
        Box::pin(BufferedStreamReader::read_bytes(self, count))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::VecDeque;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use tokio::io::ReadBuf;

    use super::*;

    /// Source that hands out one pre-set chunk per read call and counts reads.
    pub(crate) struct Chunked {
        chunks: VecDeque<Vec<u8>>,
        pub(crate) reads: usize,
    }

    impl Chunked {
        pub(crate) fn new(chunks: &[&[u8]]) -> Self {
            Self {
                chunks: chunks.iter().map(|c| c.to_vec()).collect(),
                reads: 0,
            }
        }

        /// Chunks not yet handed out.
        pub(crate) fn remaining(&self) -> usize {
            self.chunks.len()
        }
    }

    impl AsyncRead for Chunked {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            self.reads += 1;
            if let Some(mut chunk) = self.chunks.pop_front() {
                let n = chunk.len().min(buf.remaining());
                buf.put_slice(&chunk[..n]);
                if n < chunk.len() {
                    let rest = chunk.split_off(n);
                    self.chunks.push_front(rest);
                }
            }
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn read_bytes_refills_only_when_empty() {
        let mut reader = BufferedStreamReader::new(Chunked::new(&[b"hello world"]));
        assert_eq!(&reader.read_bytes(5).await.unwrap()[..], b"hello");
        assert_eq!(reader.get_ref().reads, 1);

        assert_eq!(&reader.read_bytes(100).await.unwrap()[..], b" world");
        assert_eq!(reader.get_ref().reads, 2);
        assert_eq!(reader.buffered(), 0);
    }

    #[tokio::test]
    async fn read_bytes_returns_buffered_without_reading() {
        let mut reader = BufferedStreamReader::new(Chunked::new(&[b"ab\ncdef", b"gh"]));
        reader.read_bytes_until(b'\n', 64).await.unwrap();
        assert_eq!(reader.buffered(), 4);

        // Short read: only what is buffered, no second stream read.
        assert_eq!(&reader.read_bytes(10).await.unwrap()[..], b"cdef");
        assert_eq!(reader.get_ref().reads, 1);
    }

    #[tokio::test]
    async fn zero_length_read_does_not_touch_stream() {
        let mut reader = BufferedStreamReader::new(Chunked::new(&[]));
        assert!(reader.read_bytes(0).await.unwrap().is_empty());
        assert_eq!(reader.get_ref().reads, 0);
    }

    #[tokio::test]
    async fn lines_across_chunk_boundaries() {
        let source = Chunked::new(&[b"GET / HT", b"TP/1.0\r\nHo", b"st: x\r\n\r\n"]);
        let mut reader = BufferedStreamReader::new(source);
        assert_eq!(reader.read_line(8192).await.unwrap(), "GET / HTTP/1.0\r\n");
        assert_eq!(reader.read_line(8192).await.unwrap(), "Host: x\r\n");
        assert_eq!(reader.read_line(8192).await.unwrap(), "\r\n");
    }

    #[tokio::test]
    async fn sequence_split_across_refills() {
        let mut reader = BufferedStreamReader::new(Chunked::new(&[b"a\r\n\r", b"\nb"]));
        let head = reader.read_bytes_until_seq(b"\r\n\r\n", 100).await.unwrap();
        assert_eq!(&head[..], b"a\r\n\r\n");
        assert_eq!(&reader.read_bytes(10).await.unwrap()[..], b"b");
    }

    #[tokio::test]
    async fn limit_exceeded_without_delimiter() {
        let data = vec![b'a'; 3000];
        let mut reader = BufferedStreamReader::new(&data[..]);
        let err = reader.read_bytes_until(b'\n', 2048).await.unwrap_err();
        assert!(matches!(err, ReadError::LimitExceeded { max: 2048 }));
    }

    #[tokio::test]
    async fn limit_exceeded_when_line_too_long() {
        let mut reader = BufferedStreamReader::new(&b"abcdef\nxy"[..]);
        let err = reader.read_bytes_until(b'\n', 4).await.unwrap_err();
        assert!(matches!(err, ReadError::LimitExceeded { max: 4 }));
    }

    #[tokio::test]
    async fn short_line_wins_over_large_buffer() {
        let mut reader = BufferedStreamReader::new(Chunked::new(&[b"ab\ncdefgh"]));
        let line = reader.read_bytes_until(b'\n', 4).await.unwrap();
        assert_eq!(&line[..], b"ab\n");
        assert_eq!(reader.buffered(), 6);
        let err = reader.read_bytes_until(b'\n', 4).await.unwrap_err();
        assert!(matches!(err, ReadError::LimitExceeded { max: 4 }));
    }

    #[tokio::test]
    async fn end_of_stream_is_an_error() {
        let mut reader = BufferedStreamReader::new(&b"no newline"[..]);
        let err = reader.read_bytes_until(b'\n', 8192).await.unwrap_err();
        assert!(matches!(err, ReadError::UnexpectedEndOfStream));

        let mut empty = BufferedStreamReader::new(&b""[..]);
        let err = empty.read_bytes(1).await.unwrap_err();
        assert!(matches!(err, ReadError::UnexpectedEndOfStream));
    }

    #[tokio::test]
    async fn invalid_utf8_is_replaced() {
        let mut reader = BufferedStreamReader::new(&b"caf\xff\n"[..]);
        assert_eq!(reader.read_line(64).await.unwrap(), "caf\u{FFFD}\n");
    }
}
