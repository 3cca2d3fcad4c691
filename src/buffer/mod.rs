//! Byte buffers used by the stream reader.
//!
//! - [`RingBuffer`] — fixed-capacity, power-of-two circular buffer with
//!   wraparound-aware search.
//! - [`GrowableDeque`] — a ring that reallocates itself when a write would
//!   overflow.

use thiserror::Error;

pub mod deque;
pub mod ring;

pub use deque::GrowableDeque;
pub use ring::RingBuffer;

/// Errors produced by buffer operations.
///
/// These indicate a capacity violation and should be unreachable when the
/// buffers are driven by [`crate::io::BufferedStreamReader`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    #[error("buffer range out of bounds: requested {requested}, available {available}")]
    OutOfRange { requested: usize, available: usize },
}

pub type BufferResult<T> = Result<T, BufferError>;
