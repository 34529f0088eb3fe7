//! Counting semaphore with an atomic fast path.

// Layer 1: Standard library
use std::sync::atomic::{AtomicIsize, Ordering};
use std::time::{Duration, Instant};

// Layer 2: Third-party
use parking_lot::{Condvar, Mutex};

// Layer 3: Internal
// (none)

/// Counting semaphore used for worker wakeup and thread parking.
///
/// The permit count lives in an atomic so that the uncontended
/// acquire/release pair never touches the slow path; only threads that
/// actually have to park (or wake a parked peer) take the inner mutex.
pub(crate) struct Semaphore {
    /// Available permits; negative values count parked (or arriving) waiters.
    permits: AtomicIsize,
    /// Wakeups granted by `release` but not yet consumed by a waiter.
    wakeups: Mutex<usize>,
    condvar: Condvar,
}

impl Semaphore {
    pub(crate) fn new(permits: isize) -> Self {
        Self {
            permits: AtomicIsize::new(permits),
            wakeups: Mutex::new(0),
            condvar: Condvar::new(),
        }
    }

    /// Take one permit, parking the calling thread until one is available.
    pub(crate) fn acquire(&self) {
        if self.permits.fetch_sub(1, Ordering::AcqRel) > 0 {
            return;
        }
        let mut wakeups = self.wakeups.lock();
        while *wakeups == 0 {
            self.condvar.wait(&mut wakeups);
        }
        *wakeups -= 1;
    }

    /// Take one permit, giving up after `timeout`.
    ///
    /// Returns `true` when a permit was taken. On timeout the reservation is
    /// handed back; a release racing with the hand-back can leave one stray
    /// wakeup behind, so callers must tolerate a spurious return.
    pub(crate) fn acquire_timeout(&self, timeout: Duration) -> bool {
        if self.permits.fetch_sub(1, Ordering::AcqRel) > 0 {
            return true;
        }
        let deadline = Instant::now() + timeout;
        let mut wakeups = self.wakeups.lock();
        while *wakeups == 0 {
            if self.condvar.wait_until(&mut wakeups, deadline).timed_out() {
                if *wakeups > 0 {
                    break;
                }
                self.permits.fetch_add(1, Ordering::Release);
                return false;
            }
        }
        *wakeups -= 1;
        true
    }

    /// Hand back one permit, waking a parked thread if any is waiting.
    pub(crate) fn release(&self) {
        if self.permits.fetch_add(1, Ordering::AcqRel) < 0 {
            let mut wakeups = self.wakeups.lock();
            *wakeups += 1;
            self.condvar.notify_one();
        }
    }
}
