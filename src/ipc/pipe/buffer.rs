/*!
 * Circular Buffer
 * Fixed-capacity byte ring backing one pipe session
 *
 * `size` is the authoritative occupancy counter: the two cursors coincide
 * both when the ring is empty and when it is full. The buffer does no
 * locking of its own; the session coordinator serializes every access.
 *
 * Not built on `ringbuf`: a copy fault must commit exactly the copied prefix
 * through explicit `in`/`out`/`size` cursors.
 */

use super::copy::{CopyIn, CopyOut};
use super::types::{PipeError, PipeResult};
use crate::core::limits::COPY_CHUNK_SIZE;
use crate::core::types::Size;

pub struct CircularBuffer {
    data: Box<[u8]>,
    /// Next slot to write
    in_pos: usize,
    /// Next slot to read
    out_pos: usize,
    size: Size,
}

impl std::fmt::Debug for CircularBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircularBuffer")
            .field("capacity", &self.capacity())
            .field("in", &self.in_pos)
            .field("out", &self.out_pos)
            .field("size", &self.size)
            .finish()
    }
}

impl CircularBuffer {
    /// Wrap previously allocated storage; the storage is zeroed and the ring starts empty
    ///
    /// # Panics
    ///
    /// Panics if `storage` is empty.
    pub fn new(mut storage: Box<[u8]>) -> Self {
        assert!(!storage.is_empty(), "circular buffer needs a non-zero capacity");
        storage.fill(0);
        Self {
            data: storage,
            in_pos: 0,
            out_pos: 0,
            size: 0,
        }
    }

    pub fn with_capacity(capacity: Size) -> Self {
        Self::new(vec![0u8; capacity].into_boxed_slice())
    }

    #[inline]
    pub fn capacity(&self) -> Size {
        self.data.len()
    }

    #[inline]
    pub fn len(&self) -> Size {
        self.size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.size == self.capacity()
    }

    /// Free space in bytes
    #[inline]
    pub fn available(&self) -> Size {
        self.capacity() - self.size
    }

    #[inline]
    pub fn in_pos(&self) -> usize {
        self.in_pos
    }

    #[inline]
    pub fn out_pos(&self) -> usize {
        self.out_pos
    }

    /// Drop all buffered bytes and rewind both cursors
    pub fn clear(&mut self) {
        self.in_pos = 0;
        self.out_pos = 0;
        self.size = 0;
    }

    /// Append as much of `src` as fits
    ///
    /// Returns the number of bytes appended, which is zero when the ring is
    /// full. On a copy fault, the bytes copied before it stay committed and
    /// the error carries their count.
    pub fn append<S: CopyIn + ?Sized>(&mut self, src: &S) -> PipeResult<Size> {
        let count = src.len().min(self.available());
        let capacity = self.capacity();
        let mut done = 0;

        while done < count {
            let start = self.in_pos;
            let run = (count - done).min(capacity - start).min(COPY_CHUNK_SIZE);
            let result = src.copy_in(done, &mut self.data[start..start + run]);
            let copied = match result {
                Ok(()) => run,
                Err(fault) => fault.copied.min(run),
            };

            self.in_pos = (start + copied) % capacity;
            self.size += copied;
            done += copied;

            if result.is_err() {
                return Err(PipeError::Fault { transferred: done });
            }
        }

        Ok(done)
    }

    /// Remove and return up to `max_count` bytes from the front of the ring
    pub fn consume(&mut self, max_count: Size) -> Vec<u8> {
        let count = max_count.min(self.size);
        let capacity = self.capacity();
        let first = count.min(capacity - self.out_pos);

        let mut out = Vec::with_capacity(count);
        out.extend_from_slice(&self.data[self.out_pos..self.out_pos + first]);
        out.extend_from_slice(&self.data[..count - first]);

        self.out_pos = (self.out_pos + count) % capacity;
        self.size -= count;
        out
    }

    /// Move up to `dst.capacity()` bytes into `dst`
    ///
    /// On a copy fault, only the bytes that reached `dst` are removed from the
    /// ring and the error carries their count.
    pub fn consume_into<D: CopyOut + ?Sized>(&mut self, dst: &mut D) -> PipeResult<Size> {
        let count = dst.capacity().min(self.size);
        let capacity = self.capacity();
        let mut done = 0;

        while done < count {
            let start = self.out_pos;
            let run = (count - done).min(capacity - start).min(COPY_CHUNK_SIZE);
            let result = dst.copy_out(done, &self.data[start..start + run]);
            let copied = match result {
                Ok(()) => run,
                Err(fault) => fault.copied.min(run),
            };

            self.out_pos = (start + copied) % capacity;
            self.size -= copied;
            done += copied;

            if result.is_err() {
                return Err(PipeError::Fault { transferred: done });
            }
        }

        Ok(done)
    }
}
