//! Length-limited view over another readable.

use bytes::{Bytes, BytesMut};
use tracing::trace;

use super::{AsyncReadable, ReadError, ReadFuture, ReadResult};

/// Default chunk size used by [`BoundedReader::skip_remaining`].
pub const DEFAULT_SKIP_CHUNK: usize = 1024;

/// Delivers at most `limit` bytes from a parent readable.
///
/// Used for request bodies: the limit is the declared `Content-Length`, so a
/// handler can never read into the next message on the same stream. Short
/// reads from the parent are passed through and counted as they are.
///
/// The parent is the last field so that `&mut BoundedReader<T>` coerces to
/// `&mut BoundedReader<dyn AsyncReadable>`.
///
/// # Invariants
/// - `bytes_read() <= limit()`.
/// - `available() == limit() - bytes_read()`.
pub struct BoundedReader<P: ?Sized> {
    limit: u64,
    bytes_read: u64,
    parent: P,
}

impl<P> BoundedReader<P> {
    pub fn new(parent: P, limit: u64) -> Self {
        Self {
            limit,
            bytes_read: 0,
            parent,
        }
    }

    pub fn into_inner(self) -> P {
        self.parent
    }
}

impl<P: ?Sized> BoundedReader<P> {
    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Bytes that may still be read.
    pub fn available(&self) -> u64 {
        self.limit - self.bytes_read
    }

    pub fn get_ref(&self) -> &P {
        &self.parent
    }
}

impl<P: AsyncReadable + ?Sized> BoundedReader<P> {
    /// Reads up to `min(count, available())` bytes from the parent.
    ///
    /// Returns an empty buffer once the limit is reached.
    ///
    /// # Errors
    ///
    /// Propagates the parent's errors. A parent that returns no data for a
    /// non-empty request is reported as [`ReadError::UnexpectedEndOfStream`].
    pub async fn read_bytes(&mut self, count: usize) -> ReadResult<Bytes> {
        // `wanted <= count`, so it always fits back into a usize.
        let wanted = (count as u64).min(self.available()) as usize;
        if wanted == 0 {
            return Ok(Bytes::new());
        }
        let chunk = self.parent.read_bytes(wanted).await?;
        if chunk.is_empty() {
            return Err(ReadError::UnexpectedEndOfStream);
        }
        self.bytes_read += chunk.len() as u64;
        Ok(chunk)
    }

    /// Reads and discards everything up to the limit in chunks of
    /// [`DEFAULT_SKIP_CHUNK`] bytes. Returns the number of bytes skipped.
    pub async fn skip_remaining(&mut self) -> ReadResult<u64> {
        self.skip_remaining_in_chunks(DEFAULT_SKIP_CHUNK).await
    }

    /// Like [`skip_remaining`](Self::skip_remaining) with a custom chunk size.
    pub async fn skip_remaining_in_chunks(&mut self, chunk_size: usize) -> ReadResult<u64> {
        let chunk_size = chunk_size.max(1);
        let mut skipped = 0u64;
        while self.available() > 0 {
            skipped += self.read_bytes(chunk_size).await?.len() as u64;
        }
        if skipped > 0 {
            trace!(skipped, "skipped unread body bytes");
        }
        Ok(skipped)
    }

    /// Reads everything up to the limit into one buffer.
    pub async fn read_to_end(&mut self) -> ReadResult<Bytes> {
        let mut out = BytesMut::new();
        while self.available() > 0 {
            let chunk = self.read_bytes(DEFAULT_SKIP_CHUNK).await?;
            out.extend_from_slice(&chunk);
        }
        Ok(out.freeze())
    }
}

impl<P: AsyncReadable + ?Sized> AsyncReadable for BoundedReader<P> {
    fn read_bytes(&mut self, count: usize) -> ReadFuture<'_> {
        Box::pin(BoundedReader::read_bytes(self, count))
    }
}
