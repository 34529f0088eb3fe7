//! Actor cell and the owner-lock protocol.
//!
//! The cell is the part of an actor the runtime owns: the flag word, the
//! mailbox, and the slot of the worker currently responsible for it. Every
//! mutation of the flag word or mailbox happens while the owning worker's
//! ready-queue lock is held; because the owner can change under a caller
//! that has only just read it (work stealing), each entry point re-reads the
//! owner after taking the lock and retries until the two agree.

// Layer 1: Standard library
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::thread;

// Layer 2: Third-party
use crossbeam_utils::CachePadded;
use parking_lot::Mutex;

// Layer 3: Internal
use crate::message::Message;
use crate::system::SystemCore;
use crate::worker::{ReadyQueue, WorkerRef};

/// Actor flag bits.
///
/// Mutated only under the owning worker's ready-queue lock; loaded without
/// the lock only by the advisory checks (`is_locked`, validity assertions).
pub(crate) mod flags {
    /// Actor must execute on its original worker; stealing skips it.
    pub(crate) const PINNED: u32 = 1 << 0;
    /// A worker is currently running one of this actor's messages.
    pub(crate) const EXECUTING: u32 = 1 << 1;
    /// The application holds a manual lock on this actor.
    pub(crate) const USER_LOCKED: u32 = 1 << 2;
    /// A worker tried to schedule the actor while it was manually locked;
    /// the unlock path must re-enqueue it at the front of the ready deque.
    pub(crate) const WAKE_ON_UNLOCK: u32 = 1 << 3;
}

pub(crate) type CellRef = Arc<CachePadded<ActorCell>>;
pub(crate) type WeakCellRef = Weak<CachePadded<ActorCell>>;

/// Runtime-owned state of one actor.
///
/// Cache-line padded so that the flag word of one actor never shares a line
/// with a neighbouring allocation's hot fields.
pub(crate) struct ActorCell {
    /// Flag word, see [`flags`].
    pub(crate) state: AtomicU32,
    /// Slot of the owning worker in the system's worker table. Written only
    /// while both the source and destination worker locks are held.
    pub(crate) owner: AtomicUsize,
    /// Pending messages, FIFO. The mutex is uncontended by protocol (the
    /// worker lock already serializes access); it exists to make the
    /// protocol memory-safe.
    pub(crate) mailbox: Mutex<VecDeque<Message>>,
}

impl ActorCell {
    pub(crate) fn new(owner: usize, pinned: bool) -> CellRef {
        Arc::new(CachePadded::new(ActorCell {
            state: AtomicU32::new(if pinned { flags::PINNED } else { 0 }),
            owner: AtomicUsize::new(owner),
            mailbox: Mutex::new(VecDeque::new()),
        }))
    }
}

/// Run `f` with the owning worker's ready-queue lock held and the owner
/// reference verified stable.
pub(crate) fn with_owner<R>(
    cell: &CellRef,
    system: &SystemCore,
    f: impl FnOnce(&WorkerRef, &mut ReadyQueue) -> R,
) -> R {
    loop {
        let slot = cell.owner.load(Ordering::Acquire);
        let worker = system.worker(slot);
        let mut queue = worker.queue.lock();
        if cell.owner.load(Ordering::Acquire) == slot {
            return f(&worker, &mut queue);
        }
        // The actor migrated between the owner read and the lock; back off
        // the cache line and retry against the new owner.
        drop(queue);
        thread::yield_now();
    }
}

/// Append `message` to the actor's mailbox and schedule it.
///
/// Signals the owning worker only when this message is the first pending one
/// and the actor is not already executing; an actor already on the ready
/// deque will be drained without further signals. When the owner is busy
/// with a different unpinned actor, a queued actor is offered to an idle
/// peer instead of waking the busy owner.
pub(crate) fn enqueue(cell: &CellRef, system: &SystemCore, message: Message) {
    let (worker, signal, offload) = with_owner(cell, system, |worker, queue| {
        worker.requested.fetch_add(1, Ordering::Relaxed);
        let pending = {
            let mut mailbox = cell.mailbox.lock();
            mailbox.push_back(message);
            mailbox.len()
        };
        let state = cell.state.load(Ordering::Acquire);
        let mut signal = false;
        if pending == 1 && state & flags::EXECUTING == 0 {
            queue.ready.push_back(Arc::clone(cell));
            worker.sync_ready_len(queue);
            signal = !worker.external;
        }
        let offload = !worker.external
            && state & flags::PINNED == 0
            && queue.last_actor.as_ref().is_some_and(|last| {
                !Arc::ptr_eq(last, cell)
                    && last.state.load(Ordering::Acquire)
                        & (flags::EXECUTING | flags::USER_LOCKED)
                        != 0
            });
        (Arc::clone(worker), signal, offload)
    });

    if offload && system.steal_work(None, Some(&worker)) {
        // The migration already signalled the destination.
        return;
    }
    if signal {
        worker.wakeup.release();
    }
}

/// Acquire the manual lock: spin-yield until the owner is stable and the
/// actor is neither executing nor already locked, then mark it locked.
pub(crate) fn manual_lock(cell: &CellRef, system: &SystemCore) {
    loop {
        let slot = cell.owner.load(Ordering::Acquire);
        let worker = system.worker(slot);
        let queue = worker.queue.lock();
        let state = cell.state.load(Ordering::Acquire);
        if cell.owner.load(Ordering::Acquire) == slot
            && state & (flags::EXECUTING | flags::USER_LOCKED) == 0
        {
            if state & flags::PINNED != 0 {
                debug_assert!(
                    worker.is_owner_thread(),
                    "pinned actor locked from a foreign thread"
                );
            }
            cell.state.fetch_or(flags::USER_LOCKED, Ordering::AcqRel);
            drop(queue);
            return;
        }
        drop(queue);
        thread::yield_now();
    }
}

/// Release the manual lock; if a worker deferred the actor while it was
/// locked, put it at the front of the ready deque so the delayed message
/// runs next.
pub(crate) fn manual_unlock(cell: &CellRef, system: &SystemCore) {
    // Stealing skips user-locked actors, so the owner cannot change here.
    let worker = system.worker(cell.owner.load(Ordering::Acquire));
    let mut queue = worker.queue.lock();
    debug_assert!(
        cell.state.load(Ordering::Acquire) & flags::USER_LOCKED != 0,
        "unlock of an actor that is not locked"
    );
    let wake = cell.state.load(Ordering::Acquire) & flags::WAKE_ON_UNLOCK != 0;
    cell.state.fetch_and(
        !(flags::USER_LOCKED | flags::WAKE_ON_UNLOCK),
        Ordering::AcqRel,
    );
    if wake {
        queue.ready.push_front(Arc::clone(cell));
        worker.sync_ready_len(&queue);
    }
    drop(queue);
    if wake && !worker.external {
        worker.wakeup.release();
    }
}

/// Drop all pending messages. The message currently executing (if any) is
/// unaffected, and a new message may arrive as this returns.
pub(crate) fn clear_messages(cell: &CellRef, system: &SystemCore) {
    with_owner(cell, system, |worker, _queue| {
        let mut mailbox = cell.mailbox.lock();
        worker
            .requested
            .fetch_sub(mailbox.len() as u64, Ordering::Relaxed);
        mailbox.clear();
    });
}

/// Advisory idleness snapshot; immediately stale.
pub(crate) fn is_idle(cell: &CellRef, system: &SystemCore) -> bool {
    with_owner(cell, system, |_worker, _queue| {
        cell.state.load(Ordering::Acquire) & flags::EXECUTING == 0
            && cell.mailbox.lock().is_empty()
    })
}

/// Detach the actor from the runtime: drain its timers, wait out a message
/// in flight, then remove every trace of it from the owning worker.
pub(crate) fn deregister(cell: &CellRef, system: &SystemCore) {
    system.timer.cancel_for(&Arc::downgrade(cell));
    loop {
        let slot = cell.owner.load(Ordering::Acquire);
        let worker = system.worker(slot);
        let mut queue = worker.queue.lock();
        if cell.owner.load(Ordering::Acquire) != slot
            || cell.state.load(Ordering::Acquire) & flags::EXECUTING != 0
        {
            drop(queue);
            thread::yield_now();
            continue;
        }
        queue.ready.retain(|queued| !Arc::ptr_eq(queued, cell));
        worker.sync_ready_len(&queue);
        let mut mailbox = cell.mailbox.lock();
        worker
            .requested
            .fetch_sub(mailbox.len() as u64, Ordering::Relaxed);
        mailbox.clear();
        return;
    }
}
