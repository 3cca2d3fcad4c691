//! Fixed-capacity circular byte buffer.
//!
//! The capacity is always a power of two so that physical positions can be
//! derived from logical offsets with a mask instead of a modulo. Unread bytes
//! are contiguous in logical order but may wrap around the end of the
//! underlying slice; [`RingBuffer::segments`] exposes them as at most two
//! slices.
//!
//! # Invariants
//! - `capacity() == 1 << bits()`.
//! - `available_read() + available_write() == capacity()`.
//! - `read_pos` and `write_pos` are always `< capacity()`.

use bytes::Bytes;

use super::{BufferError, BufferResult};

/// A power-of-two circular buffer of bytes.
///
/// # Examples
///
/// ```
/// use ringhttp::buffer::RingBuffer;
///
/// let mut ring = RingBuffer::with_capacity_at_least(5).unwrap();
/// assert_eq!(ring.capacity(), 8);
///
/// ring.write(b"hello").unwrap();
/// assert_eq!(ring.index_of(b'l', 0), Some(2));
/// assert_eq!(&ring.read(3).unwrap()[..], b"hel");
/// assert_eq!(ring.available_read(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct RingBuffer {
    slots: Box<[u8]>,
    bits: u32,
    mask: usize,
    read_pos: usize,
    write_pos: usize,
    // Number of unread bytes; `available_write` is derived from it.
    len: usize,
}

impl RingBuffer {
    /// Creates an empty ring holding `1 << bits` bytes.
    ///
    /// # Panics
    /// Panics if `bits >= usize::BITS`.
    pub fn with_bits(bits: u32) -> Self {
        assert!(bits < usize::BITS, "RingBuffer bits must be < {}", usize::BITS);
        let capacity = 1usize << bits;
        Self {
            slots: vec![0u8; capacity].into_boxed_slice(),
            bits,
            mask: capacity - 1,
            read_pos: 0,
            write_pos: 0,
            len: 0,
        }
    }

    /// Creates an empty ring whose capacity is the smallest power of two
    /// that is `>= count`.
    ///
    /// # Errors
    ///
    /// [`BufferError::OutOfRange`] if no power of two `>= count` fits in a `usize`.
    pub fn with_capacity_at_least(count: usize) -> BufferResult<Self> {
        let capacity = count
            .max(1)
            .checked_next_power_of_two()
            .ok_or(BufferError::OutOfRange {
                requested: count,
                available: 1usize << (usize::BITS - 1),
            })?;
        Ok(Self::with_bits(capacity.trailing_zeros()))
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of unread bytes.
    pub fn available_read(&self) -> usize {
        self.len
    }

    /// Number of bytes that can be written before the ring is full.
    pub fn available_write(&self) -> usize {
        self.capacity() - self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the unread bytes as up to two slices in logical order.
    ///
    /// The second slice is non-empty only when the unread region wraps
    /// around the end of the underlying storage.
    pub fn segments(&self) -> (&[u8], &[u8]) {
        if self.len == 0 {
            return (&[], &[]);
        }
        let tail = self.capacity() - self.read_pos;
        if self.len <= tail {
            (&self.slots[self.read_pos..self.read_pos + self.len], &[])
        } else {
            (&self.slots[self.read_pos..], &self.slots[..self.len - tail])
        }
    }

    /// Returns the byte at logical offset `index` without consuming it.
    pub fn peek(&self, index: usize) -> Option<u8> {
        (index < self.len).then(|| self.slots[(self.read_pos + index) & self.mask])
    }

    /// Removes exactly `count` bytes from the front of the ring.
    ///
    /// # Errors
    ///
    /// [`BufferError::OutOfRange`] if fewer than `count` bytes are unread.
    pub fn read(&mut self, count: usize) -> BufferResult<Bytes> {
        self.check_read(count)?;
        let mut out = vec![0u8; count];
        self.read_into(&mut out)?;
        Ok(Bytes::from(out))
    }

    /// Fills `out` with the next `out.len()` unread bytes.
    ///
    /// # Errors
    ///
    /// [`BufferError::OutOfRange`] if fewer than `out.len()` bytes are unread.
    pub fn read_into(&mut self, out: &mut [u8]) -> BufferResult<()> {
        let count = out.len();
        self.check_read(count)?;

        let (head, tail) = self.segments();
        let from_head = count.min(head.len());
        out[..from_head].copy_from_slice(&head[..from_head]);
        out[from_head..].copy_from_slice(&tail[..count - from_head]);

        self.consume(count);
        Ok(())
    }

    /// Appends `data` to the ring.
    ///
    /// # Errors
    ///
    /// [`BufferError::OutOfRange`] if `data` does not fit in the free space.
    /// The ring is left untouched in that case.
    pub fn write(&mut self, data: &[u8]) -> BufferResult<()> {
        let count = data.len();
        if count > self.available_write() {
            return Err(BufferError::OutOfRange {
                requested: count,
                available: self.available_write(),
            });
        }
        if count == 0 {
            return Ok(());
        }

        let first = count.min(self.capacity() - self.write_pos);
        self.slots[self.write_pos..self.write_pos + first].copy_from_slice(&data[..first]);
        self.slots[..count - first].copy_from_slice(&data[first..]);

        self.write_pos = (self.write_pos + count) & self.mask;
        self.len += count;
        Ok(())
    }

    /// Moves `length` unread bytes from this ring into `dst`, preserving order.
    ///
    /// # Errors
    ///
    /// [`BufferError::OutOfRange`] if this ring holds fewer than `length`
    /// unread bytes or `dst` has less than `length` bytes of free space.
    /// Neither ring is modified on failure.
    pub fn copy_to(&mut self, dst: &mut RingBuffer, length: usize) -> BufferResult<()> {
        self.check_read(length)?;
        if length > dst.available_write() {
            return Err(BufferError::OutOfRange {
                requested: length,
                available: dst.available_write(),
            });
        }

        let (head, tail) = self.segments();
        let from_head = length.min(head.len());
        dst.write(&head[..from_head])?;
        dst.write(&tail[..length - from_head])?;

        self.consume(length);
        Ok(())
    }

    /// Returns `true` if `seq` occurs at logical offset `index`.
    pub fn matches(&self, seq: &[u8], index: usize) -> bool {
        let fits = index
            .checked_add(seq.len())
            .is_some_and(|end| end <= self.len);
        fits && seq
            .iter()
            .enumerate()
            .all(|(n, &b)| self.slots[(self.read_pos + index + n) & self.mask] == b)
    }

    /// Logical offset of the first `byte` in `[start, available_read)`.
    pub fn index_of(&self, byte: u8, start: usize) -> Option<usize> {
        if start >= self.len {
            return None;
        }
        let (head, tail) = self.segments();
        if start < head.len() {
            head[start..]
                .iter()
                .position(|&b| b == byte)
                .map(|p| start + p)
                .or_else(|| tail.iter().position(|&b| b == byte).map(|p| head.len() + p))
        } else {
            tail[start - head.len()..]
                .iter()
                .position(|&b| b == byte)
                .map(|p| start + p)
        }
    }

    /// Logical offset of the first occurrence of `seq` at or after `start`.
    ///
    /// An empty `seq` matches at `start` as long as `start <= available_read`.
    pub fn index_of_seq(&self, seq: &[u8], start: usize) -> Option<usize> {
        if seq.is_empty() {
            return (start <= self.len).then_some(start);
        }
        let last = self.len.checked_sub(seq.len())?;
        (start..=last).find(|&n| self.matches(seq, n))
    }

    fn check_read(&self, count: usize) -> BufferResult<()> {
        if count > self.len {
            return Err(BufferError::OutOfRange {
                requested: count,
                available: self.len,
            });
        }
        Ok(())
    }

    fn consume(&mut self, count: usize) {
        self.read_pos = (self.read_pos + count) & self.mask;
        self.len -= count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Ring of capacity 8 whose read position sits at physical slot 6, so
    /// that any write of more than 2 bytes wraps.
    fn wrapped_ring() -> RingBuffer {
        let mut ring = RingBuffer::with_bits(3);
        ring.write(b"xxxxxx").unwrap();
        ring.read(6).unwrap();
        ring
    }

    #[test]
    fn capacity_rounds_up_to_power_of_two() {
        assert_eq!(RingBuffer::with_capacity_at_least(0).unwrap().capacity(), 1);
        assert_eq!(RingBuffer::with_capacity_at_least(1).unwrap().capacity(), 1);
        assert_eq!(RingBuffer::with_capacity_at_least(16).unwrap().capacity(), 16);
        let ring = RingBuffer::with_capacity_at_least(17).unwrap();
        assert_eq!(ring.capacity(), 32);
        assert_eq!(ring.bits(), 5);
        assert!(RingBuffer::with_capacity_at_least(usize::MAX).is_err());
    }

    #[test]
    fn fifo_for_every_small_capacity() {
        for bits in 0..6 {
            let mut ring = RingBuffer::with_bits(bits);
            let cap = ring.capacity();
            // Shift the read position so later writes start at every offset.
            for shift in 0..cap {
                ring.write(&vec![0xAA; shift]).unwrap();
                ring.read(shift).unwrap();

                let data: Vec<u8> = (0..cap as u8).collect();
                let (a, b) = data.split_at(cap / 2);
                ring.write(a).unwrap();
                ring.write(b).unwrap();
                assert_eq!(ring.available_read() + ring.available_write(), cap);
                assert_eq!(&ring.read(cap).unwrap()[..], &data[..]);
                assert!(ring.is_empty());
            }
        }
    }

    #[test]
    fn read_past_available_fails() {
        let mut ring = RingBuffer::with_bits(2);
        ring.write(b"ab").unwrap();
        assert_eq!(
            ring.read(3),
            Err(BufferError::OutOfRange {
                requested: 3,
                available: 2
            })
        );
        // Nothing was consumed.
        assert_eq!(ring.available_read(), 2);
    }

    #[test]
    fn write_past_capacity_fails_without_side_effects() {
        let mut ring = RingBuffer::with_bits(2);
        ring.write(b"abc").unwrap();
        assert!(ring.write(b"de").is_err());
        assert_eq!(ring.available_read(), 3);
        assert_eq!(&ring.read(3).unwrap()[..], b"abc");
    }

    #[test]
    fn wraparound_write_and_segments() {
        let mut ring = wrapped_ring();
        ring.write(b"abcde").unwrap();
        let (head, tail) = ring.segments();
        assert_eq!(head, b"ab");
        assert_eq!(tail, b"cde");
        assert_eq!(ring.peek(2), Some(b'c'));
        assert_eq!(ring.peek(5), None);
        assert_eq!(&ring.read(5).unwrap()[..], b"abcde");
    }

    #[test]
    fn index_of_handles_wrap() {
        let mut ring = wrapped_ring();
        ring.write(b"ab\ncd").unwrap();
        assert_eq!(ring.index_of(b'\n', 0), Some(2));
        assert_eq!(ring.index_of(b'a', 0), Some(0));
        assert_eq!(ring.index_of(b'd', 3), Some(4));
        assert_eq!(ring.index_of(b'a', 1), None);
        assert_eq!(ring.index_of(b'z', 0), None);
        assert_eq!(ring.index_of(b'a', 10), None);
    }

    #[test]
    fn index_of_seq_straddles_boundary() {
        let mut ring = wrapped_ring();
        ring.write(b"x\r\n\r\ny").unwrap();
        assert_eq!(ring.index_of_seq(b"\r\n\r\n", 0), Some(1));
        assert_eq!(ring.index_of_seq(b"\r\n\r\n", 2), None);
        assert_eq!(ring.index_of_seq(b"y", 0), Some(5));
        assert_eq!(ring.index_of_seq(b"yz", 0), None);
        assert_eq!(ring.index_of_seq(b"", 3), Some(3));
        assert!(ring.matches(b"\n\r", 2));
        assert!(!ring.matches(b"yy", 5));
    }

    #[test]
    fn copy_to_moves_unread_bytes_in_order() {
        let mut src = wrapped_ring();
        src.write(b"12345").unwrap();
        let mut dst = RingBuffer::with_bits(4);
        dst.write(b"0").unwrap();

        src.copy_to(&mut dst, 4).unwrap();
        assert_eq!(src.available_read(), 1);
        assert_eq!(&dst.read(5).unwrap()[..], b"01234");
        assert_eq!(&src.read(1).unwrap()[..], b"5");
    }

    #[test]
    fn copy_to_checks_both_sides() {
        let mut src = RingBuffer::with_bits(3);
        src.write(b"abcd").unwrap();
        let mut small = RingBuffer::with_bits(1);
        assert!(src.copy_to(&mut small, 3).is_err());
        assert!(src.copy_to(&mut small, 5).is_err());
        assert_eq!(src.available_read(), 4);
        assert!(small.is_empty());
    }
}
