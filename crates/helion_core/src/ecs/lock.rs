//! # Store Lock Strategies
//!
//! The component store is generic over a [`lock_api::RawMutex`] so the same
//! code serves both roles it plays in the engine:
//!
//! - [`RawNullLock`]: no-op lock for staging stores with a guaranteed
//!   single owner thread, such as assembling components before spawn.
//! - [`RawSpinLock`]: spin lock for stores touched by worker tasks — the
//!   world aggregate and entity-local stores. Critical sections are tiny
//!   (map insert/erase or a snapshot copy), so spinning beats parking.
//!
//! ## Safety Note
//!
//! Implementing `RawMutex` requires `unsafe impl`; both impls below are
//! trivially correct (the null lock guards stores with external exclusion
//! guarantees, the spin lock is a standard test-and-test-and-set).

#![allow(unsafe_code)]

use std::cell::Cell;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::lock_api::{GuardSend, RawMutex};

/// No-op lock for single-threaded staging stores.
///
/// Deliberately `!Sync` (the `Cell` marker): a store built on this lock can
/// move between threads but never be shared, which is exactly the exclusion
/// the no-op impl relies on.
pub struct RawNullLock {
    _single_thread: PhantomData<Cell<()>>,
}

unsafe impl RawMutex for RawNullLock {
    const INIT: Self = Self {
        _single_thread: PhantomData,
    };
    type GuardMarker = GuardSend;

    #[inline]
    fn lock(&self) {}

    #[inline]
    fn try_lock(&self) -> bool {
        true
    }

    #[inline]
    unsafe fn unlock(&self) {}
}

/// Test-and-test-and-set spin lock for the world aggregate store.
pub struct RawSpinLock {
    locked: AtomicBool,
}

unsafe impl RawMutex for RawSpinLock {
    const INIT: Self = Self {
        locked: AtomicBool::new(false),
    };
    type GuardMarker = GuardSend;

    fn lock(&self) {
        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            // Spin on a plain load to keep the cache line shared while
            // another thread holds the lock.
            while self.locked.load(Ordering::Relaxed) {
                std::hint::spin_loop();
            }
        }
    }

    #[inline]
    fn try_lock(&self) -> bool {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    #[inline]
    unsafe fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
    }
}
