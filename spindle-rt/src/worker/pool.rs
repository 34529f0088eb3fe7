//! Pool worker: the physical execution resource.
//!
//! Each worker owns a ready deque of actors with pending messages and runs a
//! loop that pops one actor, executes exactly one of its messages, then
//! reschedules or releases it. All state an actor shares with its worker is
//! guarded by the worker's single ready-queue lock.

// Layer 1: Standard library
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;

// Layer 2: Third-party
use crossbeam_utils::CachePadded;
use parking_lot::Mutex;
use tracing::debug;

// Layer 3: Internal
use crate::actor::cell::{flags, CellRef};
use crate::message::Message;
use crate::sync::Semaphore;
use crate::system::SystemCore;

/// Worker flag bits, mutated under the worker's own ready-queue lock.
pub(crate) mod status {
    /// The worker is currently executing a message.
    pub(crate) const BUSY: u32 = 1 << 0;
    /// The worker just received a migrated actor; stealing leaves it alone
    /// until it has processed something.
    pub(crate) const STOLE_WORK: u32 = 1 << 1;
}

pub(crate) type WorkerRef = Arc<CachePadded<Worker>>;

/// State behind the worker's ready-queue lock.
pub(crate) struct ReadyQueue {
    /// Actors with pending messages, each referenced at most once.
    pub(crate) ready: VecDeque<CellRef>,
    /// Messages posted directly to an external looper (unused on pool
    /// workers); drained before any actor work.
    pub(crate) direct: VecDeque<Message>,
    /// The actor whose message is executing right now. Keeps its hot-cache
    /// claim: stealing passes over it, and an enqueue to a worker busy with
    /// a different actor may offload elsewhere.
    pub(crate) last_actor: Option<CellRef>,
}

/// One execution resource: a slot in the system's worker table, driven
/// either by a pool thread or (for external loopers) by the host thread.
///
/// Cache-line padded: the counters of adjacent workers must not share a
/// line.
pub(crate) struct Worker {
    pub(crate) slot: usize,
    /// External loopers are never scheduled by the pool: round-robin
    /// assignment, stealing, idle checks and the balancer all skip them.
    pub(crate) external: bool,
    pub(crate) queue: Mutex<ReadyQueue>,
    /// Mirror of `queue.ready.len()`, so steal scans can test emptiness
    /// without contending the lock.
    pub(crate) ready_len: AtomicUsize,
    pub(crate) wakeup: Semaphore,
    /// Flag word, see [`status`].
    pub(crate) state: AtomicU32,
    /// Messages enqueued on actors owned by this worker (migration moves a
    /// mailbox's worth between workers).
    pub(crate) requested: AtomicU64,
    /// Messages this worker has executed.
    pub(crate) processed: AtomicU64,
    /// `processed` as of the load balancer's previous tick; zero until the
    /// balancer first runs.
    pub(crate) balancer_snapshot: AtomicU64,
    thread_id: OnceLock<thread::ThreadId>,
}

impl Worker {
    pub(crate) fn new(slot: usize, external: bool) -> WorkerRef {
        Arc::new(CachePadded::new(Worker {
            slot,
            external,
            queue: Mutex::new(ReadyQueue {
                ready: VecDeque::new(),
                direct: VecDeque::new(),
                last_actor: None,
            }),
            ready_len: AtomicUsize::new(0),
            wakeup: Semaphore::new(0),
            state: AtomicU32::new(0),
            requested: AtomicU64::new(0),
            processed: AtomicU64::new(0),
            balancer_snapshot: AtomicU64::new(0),
            thread_id: OnceLock::new(),
        }))
    }

    /// Record the calling thread as the one that drives this worker, so
    /// pinned actors can assert they run on the right thread.
    pub(crate) fn bind_current_thread(&self) {
        let _ = self.thread_id.set(thread::current().id());
    }

    pub(crate) fn is_owner_thread(&self) -> bool {
        self.thread_id
            .get()
            .is_some_and(|id| *id == thread::current().id())
    }

    pub(crate) fn sync_ready_len(&self, queue: &ReadyQueue) {
        self.ready_len.store(queue.ready.len(), Ordering::Release);
    }

    pub(crate) fn has_ready_work(&self) -> bool {
        self.ready_len.load(Ordering::Acquire) > 0
    }
}

/// The worker thread loop.
///
/// Outer loop: with nothing ready, try to steal on our own behalf, report
/// possible system idleness, then park on the wakeup semaphore. Inner loop:
/// drain the ready deque one message per iteration. A manually locked actor
/// is deferred (flagged, not re-enqueued); an actor with messages left is
/// reinserted alternating head/tail so one hot actor neither loses its cache
/// nor starves the rest.
pub(crate) fn run_worker(system: &SystemCore, worker: &WorkerRef) {
    worker.bind_current_thread();
    debug!(worker = worker.slot, "worker thread started");
    let mut reinsert_tick: u32 = 0;
    'parked: loop {
        if !worker.has_ready_work() {
            if !system.steal_work(Some(worker), None) {
                system.notify_worker_idle();
            }
        }
        worker.wakeup.acquire();
        loop {
            if system.is_shutting_down() {
                break 'parked;
            }
            let mut queue = worker.queue.lock();
            let Some(actor) = queue.ready.pop_front() else {
                // Stray signal, or a steal emptied the deque first.
                continue 'parked;
            };
            worker.sync_ready_len(&queue);
            if actor.state.load(Ordering::Acquire) & flags::USER_LOCKED != 0 {
                // Deferred: the unlock path re-enqueues at the front.
                actor.state.fetch_or(flags::WAKE_ON_UNLOCK, Ordering::AcqRel);
                continue;
            }
            let Some(message) = actor.mailbox.lock().pop_front() else {
                continue;
            };
            actor.state.fetch_or(flags::EXECUTING, Ordering::AcqRel);
            worker.state.fetch_or(status::BUSY, Ordering::AcqRel);
            worker.state.fetch_and(!status::STOLE_WORK, Ordering::AcqRel);
            queue.last_actor = Some(Arc::clone(&actor));
            drop(queue);

            message();

            let mut queue = worker.queue.lock();
            worker.state.fetch_and(!status::BUSY, Ordering::AcqRel);
            worker.processed.fetch_add(1, Ordering::Relaxed);
            actor.state.fetch_and(!flags::EXECUTING, Ordering::AcqRel);
            if !actor.mailbox.lock().is_empty() {
                reinsert_tick = reinsert_tick.wrapping_add(1);
                if reinsert_tick & 1 == 1 {
                    queue.ready.push_front(Arc::clone(&actor));
                } else {
                    queue.ready.push_back(Arc::clone(&actor));
                }
                worker.sync_ready_len(&queue);
            }
            queue.last_actor = None;
        }
    }
    debug!(worker = worker.slot, "worker thread stopped");
}
