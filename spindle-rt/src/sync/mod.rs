//! Internal synchronization primitives.
//!
//! The runtime leans on `parking_lot` for its short-critical-section locks
//! (ready queues, the worker table, the timer queue); the one primitive the
//! ecosystem does not hand us is a counting semaphore with a timed wait,
//! which [`Semaphore`] provides with a benaphore-style atomic fast path.

mod semaphore;

pub(crate) use semaphore::Semaphore;
