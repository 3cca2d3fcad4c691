//! Pull-based readers layered over raw async byte streams.
//!
//! - [`BufferedStreamReader`] — buffers a raw [`tokio::io::AsyncRead`] in a
//!   [`GrowableDeque`](crate::buffer::GrowableDeque) and serves length- and
//!   delimiter-bounded reads from it.
//! - [`BoundedReader`] — caps any [`AsyncReadable`] at a fixed number of
//!   bytes, used for `Content-Length` bodies.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use thiserror::Error;

use crate::buffer::BufferError;

pub mod bounded;
pub mod reader;

pub use bounded::BoundedReader;
pub use reader::BufferedStreamReader;

/// Errors produced while reading from a buffered source.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("buffer error: {0}")]
    Buffer(#[from] BufferError),

    #[error("delimiter not found within {max} bytes")]
    LimitExceeded { max: usize },

    #[error("stream ended before the read could be satisfied")]
    UnexpectedEndOfStream,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ReadResult<T> = Result<T, ReadError>;

/// Boxed future returned by [`AsyncReadable::read_bytes`].
pub type ReadFuture<'a> = Pin<Box<dyn Future<Output = ReadResult<Bytes>> + Send + 'a>>;

/// A source that yields bytes in chunks of at most the requested size.
///
/// A call may return fewer bytes than requested (but never more). An empty
/// result is only returned for a zero-length request or an exhausted bound;
/// a source that runs dry fails with [`ReadError::UnexpectedEndOfStream`].
///
/// The trait is object-safe so that request bodies can be handed to handlers
/// as `dyn AsyncReadable` without exposing the connection's stream type.
pub trait AsyncReadable: Send {
    fn read_bytes(&mut self, count: usize) -> ReadFuture<'_>;
}

impl<T: AsyncReadable + ?Sized> AsyncReadable for &mut T {
    fn read_bytes(&mut self, count: usize) -> ReadFuture<'_> {
        (**self).read_bytes(count)
    }
}

impl<T: AsyncReadable + ?Sized> AsyncReadable for Box<T> {
    fn read_bytes(&mut self, count: usize) -> ReadFuture<'_> {
        (**self).read_bytes(count)
    }
}
