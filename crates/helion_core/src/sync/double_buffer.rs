//! Two-slot buffer with an atomic publication flip.
//!
//! The simulation writes into `current()` while a reader consumes
//! `published()`; `swap()` exchanges the roles. The contained type is
//! responsible for its own interior synchronization — both slots are
//! reachable by shared reference at all times, the flip only changes which
//! one each side is pointed at.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Double buffer over any interior-synchronized `T`.
pub struct DoubleBuffer<T> {
    buffers: [T; 2],
    current: AtomicUsize,
}

impl<T> DoubleBuffer<T> {
    #[must_use]
    pub fn new(front: T, back: T) -> Self {
        Self {
            buffers: [front, back],
            current: AtomicUsize::new(0),
        }
    }

    /// The write-side slot.
    #[inline]
    #[must_use]
    pub fn current(&self) -> &T {
        &self.buffers[self.current.load(Ordering::Acquire)]
    }

    /// The slot most recently handed to readers.
    #[inline]
    #[must_use]
    pub fn published(&self) -> &T {
        &self.buffers[1 - self.current.load(Ordering::Acquire)]
    }

    /// Publishes the write-side slot and reclaims the other for writing.
    pub fn swap(&self) {
        // 0 <-> 1
        self.current.fetch_xor(1, Ordering::AcqRel);
    }
}

impl<T: Default> Default for DoubleBuffer<T> {
    fn default() -> Self {
        Self::new(T::default(), T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_swap_alternates_slots() {
        let buffers = DoubleBuffer::new(Mutex::new(1u32), Mutex::new(2u32));
        assert_eq!(*buffers.current().lock(), 1);
        assert_eq!(*buffers.published().lock(), 2);

        buffers.swap();
        assert_eq!(*buffers.current().lock(), 2);
        assert_eq!(*buffers.published().lock(), 1);

        buffers.swap();
        assert_eq!(*buffers.current().lock(), 1);
    }

    #[test]
    fn test_writes_visible_after_publish() {
        let buffers = DoubleBuffer::<Mutex<u32>>::default();
        *buffers.current().lock() = 42;
        buffers.swap();
        assert_eq!(*buffers.published().lock(), 42);
    }
}
