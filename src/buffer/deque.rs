//! A [`RingBuffer`] that grows on demand.

use bytes::Bytes;
use tracing::trace;

use super::{BufferResult, RingBuffer};

/// Initial ring size: 16 bytes.
const INITIAL_BITS: u32 = 4;

/// A byte queue backed by a single [`RingBuffer`] that is replaced by a
/// larger one whenever a write would not fit.
///
/// On growth the new ring is at least twice as large as the old one (or
/// exactly large enough for the pending bytes plus the new data, if that is
/// more), and all unread bytes are moved into it in order. Offsets returned
/// by [`index_of`](Self::index_of) are always relative to the current read
/// position, so growth is invisible to callers.
///
/// # Examples
///
/// ```
/// use ringhttp::buffer::GrowableDeque;
///
/// let mut deque = GrowableDeque::new();
/// deque.write(&[0; 40]).unwrap();
/// assert!(deque.capacity() >= 40);
/// assert_eq!(deque.available_read(), 40);
/// ```
#[derive(Debug, Clone)]
pub struct GrowableDeque {
    ring: RingBuffer,
}

impl GrowableDeque {
    pub fn new() -> Self {
        Self {
            ring: RingBuffer::with_bits(INITIAL_BITS),
        }
    }

    pub fn available_read(&self) -> usize {
        self.ring.available_read()
    }

    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Appends `data`, growing the backing ring first if needed.
    ///
    /// # Errors
    ///
    /// [`BufferError::OutOfRange`](super::BufferError::OutOfRange) only if the
    /// required capacity cannot be represented.
    pub fn write(&mut self, data: &[u8]) -> BufferResult<()> {
        if data.len() > self.ring.available_write() {
            self.grow(data.len())?;
        }
        self.ring.write(data)
    }

    /// Removes exactly `count` bytes from the front.
    pub fn read(&mut self, count: usize) -> BufferResult<Bytes> {
        self.ring.read(count)
    }

    pub fn read_into(&mut self, out: &mut [u8]) -> BufferResult<()> {
        self.ring.read_into(out)
    }

    pub fn peek(&self, index: usize) -> Option<u8> {
        self.ring.peek(index)
    }

    pub fn index_of(&self, byte: u8, start: usize) -> Option<usize> {
        self.ring.index_of(byte, start)
    }

    pub fn index_of_seq(&self, seq: &[u8], start: usize) -> Option<usize> {
        self.ring.index_of_seq(seq, start)
    }

    fn grow(&mut self, incoming: usize) -> BufferResult<()> {
        let pending = self.ring.available_read();
        let wanted = self
            .ring
            .capacity()
            .saturating_mul(2)
            .max(pending.saturating_add(incoming));
        let mut next = RingBuffer::with_capacity_at_least(wanted)?;
        self.ring.copy_to(&mut next, pending)?;
        trace!(
            from = self.ring.capacity(),
            to = next.capacity(),
            pending,
            "growing deque"
        );
        self.ring = next;
        Ok(())
    }
}

impl Default for GrowableDeque {
    fn default() -> Self {
        Self::new()
    }
}
