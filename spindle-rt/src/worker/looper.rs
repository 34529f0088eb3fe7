//! External looper: a worker driven by a host thread.
//!
//! Most platform event loops are single threaded and own resources (a GL
//! context, a window) that must only be touched from that thread. The looper
//! lets such a thread participate as an actor worker: messages queue up from
//! anywhere, and the owning thread drains them at a point of its choosing,
//! typically once per event-loop cycle. The looper never joins the pool and
//! never takes part in work stealing.

// Layer 1: Standard library
use std::sync::atomic::Ordering;
use std::sync::Arc;

// Layer 2: Third-party
// (none)

// Layer 3: Internal
use super::pool::WorkerRef;
use crate::actor::cell::{flags, ActorCell};
use crate::actor::Actor;
use crate::system::SystemCore;

/// A worker slot scheduled by its owning thread instead of the pool.
///
/// Create it on the thread that will drain it; [`ExternalLooper::drain`]
/// must only be called from that thread (debug-asserted). Posting — to the
/// looper itself or to actors spawned on it — is safe from any thread.
pub struct ExternalLooper {
    system: Arc<SystemCore>,
    worker: WorkerRef,
}

impl ExternalLooper {
    pub(crate) fn new(system: Arc<SystemCore>, worker: WorkerRef) -> Self {
        Self { system, worker }
    }

    /// Queue a message addressed to the looper itself rather than to any
    /// actor. Direct messages run before actor work on the next drain.
    pub fn send(&self, message: impl FnOnce() + Send + 'static) {
        self.worker.queue.lock().direct.push_back(Box::new(message));
    }

    /// Spawn an actor owned by this looper. The actor is pinned: it never
    /// migrates, and its messages only execute inside [`ExternalLooper::drain`].
    pub fn spawn_actor(&self) -> Actor {
        let cell = ActorCell::new(self.worker.slot, true);
        Actor::new(Arc::clone(&self.system), cell)
    }

    /// Execute everything currently queued: direct looper messages first,
    /// then one actor message per iteration with the same deferral and
    /// head/tail alternation rules as a pool worker. Returns when both
    /// queues are empty.
    pub fn drain(&self) {
        debug_assert!(
            self.worker.is_owner_thread(),
            "drain() called off the looper's owning thread"
        );
        let mut reinsert_tick: u32 = 0;
        loop {
            let mut queue = self.worker.queue.lock();
            if let Some(message) = queue.direct.pop_front() {
                drop(queue);
                message();
                continue;
            }
            let Some(actor) = queue.ready.pop_front() else {
                return;
            };
            self.worker.sync_ready_len(&queue);
            if actor.state.load(Ordering::Acquire) & flags::USER_LOCKED != 0 {
                actor.state.fetch_or(flags::WAKE_ON_UNLOCK, Ordering::AcqRel);
                continue;
            }
            let Some(message) = actor.mailbox.lock().pop_front() else {
                continue;
            };
            actor.state.fetch_or(flags::EXECUTING, Ordering::AcqRel);
            queue.last_actor = Some(Arc::clone(&actor));
            drop(queue);

            message();

            let mut queue = self.worker.queue.lock();
            self.worker.processed.fetch_add(1, Ordering::Relaxed);
            actor.state.fetch_and(!flags::EXECUTING, Ordering::AcqRel);
            if !actor.mailbox.lock().is_empty() {
                reinsert_tick = reinsert_tick.wrapping_add(1);
                if reinsert_tick & 1 == 1 {
                    queue.ready.push_front(Arc::clone(&actor));
                } else {
                    queue.ready.push_back(Arc::clone(&actor));
                }
                self.worker.sync_ready_len(&queue);
            }
            queue.last_actor = None;
        }
    }
}
