//! Shared timer: delayed messages for any actor.
//!
//! One long-lived thread serves every timer in the system. Entries carry a
//! remaining time in milliseconds and are kept sorted ascending; the thread
//! sleeps until the earliest deadline (with a long default park when the
//! queue is empty) and each tick subtracts the elapsed time from every
//! entry, dispatching the ones that reach zero as ordinary sends on their
//! target actors.
//!
//! There is no per-entry cancellation handle: behaviors are opaque closures
//! and cannot be compared, so the only cancellation is the wholesale
//! per-target [`Timer::cancel_for`].

// Layer 1: Standard library
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

// Layer 2: Third-party
use parking_lot::Mutex;
use tracing::{debug, trace};

// Layer 3: Internal
use crate::actor::cell::{self, WeakCellRef};
use crate::message::Message;
use crate::sync::Semaphore;
use crate::system::SystemCore;

/// How long the timer thread parks when it has nothing scheduled.
const IDLE_PARK: Duration = Duration::from_secs(60);

pub(crate) struct TimerEntry {
    /// Time left until dispatch; ticks subtract the elapsed wall time.
    remaining_ms: i64,
    /// Dispatch drops the entry silently once the target is deregistered.
    target: WeakCellRef,
    behavior: Message,
}

pub(crate) struct TimerQueue {
    /// Sorted ascending by `remaining_ms` after every tick.
    pub(crate) entries: Vec<TimerEntry>,
    /// Wall time of the last tick; the delta to "now" is what a tick
    /// subtracts from every entry.
    last_tick: Instant,
}

/// The shared timer subsystem.
pub(crate) struct Timer {
    pub(crate) queue: Mutex<TimerQueue>,
    pub(crate) wakeup: Semaphore,
    /// Entry count mirror for the cheap idle test.
    pending: AtomicUsize,
}

impl Timer {
    pub(crate) fn new() -> Self {
        Self {
            queue: Mutex::new(TimerQueue {
                entries: Vec::new(),
                last_tick: Instant::now(),
            }),
            wakeup: Semaphore::new(0),
            pending: AtomicUsize::new(0),
        }
    }

    /// Schedule `behavior` as a message on `target` after `delay`.
    ///
    /// A zero delay degenerates to an immediate send. The entry is charged
    /// with the time elapsed since the last tick, because the next tick
    /// subtracts that same amount from every entry.
    pub(crate) fn add(
        &self,
        system: &SystemCore,
        delay: Duration,
        target: &WeakCellRef,
        behavior: Message,
    ) {
        let delay_ms = i64::try_from(delay.as_millis()).unwrap_or(i64::MAX);
        if delay_ms <= 0 {
            if let Some(target) = target.upgrade() {
                cell::enqueue(&target, system, behavior);
            }
            return;
        }
        {
            let mut queue = self.queue.lock();
            let elapsed = elapsed_ms(queue.last_tick);
            queue.entries.push(TimerEntry {
                remaining_ms: delay_ms.saturating_add(elapsed),
                target: WeakCellRef::clone(target),
                behavior,
            });
            self.tick(system, &mut queue);
        }
        // Shorten the timer thread's sleep to the new earliest deadline.
        self.wakeup.release();
    }

    /// Subtract the elapsed time from every entry, dispatch everything due,
    /// re-sort, and restamp.
    pub(crate) fn tick(&self, system: &SystemCore, queue: &mut TimerQueue) {
        let now = Instant::now();
        let elapsed = i64::try_from(now.duration_since(queue.last_tick).as_millis())
            .unwrap_or(i64::MAX);
        for entry in &mut queue.entries {
            entry.remaining_ms -= elapsed;
        }
        let mut index = 0;
        while index < queue.entries.len() {
            if queue.entries[index].remaining_ms <= 0 {
                let entry = queue.entries.swap_remove(index);
                if let Some(target) = entry.target.upgrade() {
                    trace!(overdue_ms = -entry.remaining_ms, "dispatching timer");
                    cell::enqueue(&target, system, entry.behavior);
                }
            } else {
                index += 1;
            }
        }
        queue.entries.sort_by_key(|entry| entry.remaining_ms);
        queue.last_tick = now;
        self.pending.store(queue.entries.len(), Ordering::Relaxed);
    }

    /// Remove every entry targeting `target`. The caller must hold the
    /// target's manual lock (or be tearing the actor down) so no concurrent
    /// behavior can re-add entries mid-removal.
    pub(crate) fn cancel_for(&self, target: &WeakCellRef) {
        let mut queue = self.queue.lock();
        queue.entries.retain(|entry| !entry.target.ptr_eq(target));
        self.pending.store(queue.entries.len(), Ordering::Relaxed);
    }

    /// Cheap busy test used by the idle-notification path; the definitive
    /// check in the idle verification reads the queue under its lock.
    pub(crate) fn is_busy(&self) -> bool {
        self.pending.load(Ordering::Relaxed) > 0
    }
}

/// The timer thread: sleep until the earliest deadline (or a signal from
/// [`Timer::add`]), then tick.
pub(crate) fn run_timer(system: &SystemCore) {
    debug!("timer thread started");
    loop {
        let park = {
            let queue = system.timer.queue.lock();
            queue.entries.first().map_or(IDLE_PARK, |entry| {
                Duration::from_millis(entry.remaining_ms.max(1) as u64)
            })
        };
        system.timer.wakeup.acquire_timeout(park);
        if system.is_shutting_down() {
            break;
        }
        let mut queue = system.timer.queue.lock();
        system.timer.tick(system, &mut queue);
    }
    debug!("timer thread stopped");
}

fn elapsed_ms(since: Instant) -> i64 {
    i64::try_from(since.elapsed().as_millis()).unwrap_or(i64::MAX)
}
