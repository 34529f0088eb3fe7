//! The actor system: worker pool ownership, registration, work stealing,
//! idle detection, and shutdown.

// Layer 1: Standard library
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

// Layer 2: Third-party
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, trace, warn};

// Layer 3: Internal
use super::balancer::{self, BalancerHandle};
use super::config::SystemConfig;
use super::errors::SystemError;
use crate::actor::cell::{flags, ActorCell};
use crate::actor::{Actor, ActorLock, ActorOptions, ActorRef};
use crate::sync::Semaphore;
use crate::timer::{self, Timer};
use crate::worker::{run_worker, status, ExternalLooper, Worker, WorkerRef};

/// Per-worker counter snapshot, see [`ActorSystem::worker_stats`].
#[derive(Debug, Clone)]
pub struct WorkerStats {
    /// Slot in the worker table.
    pub worker: usize,
    /// Whether the slot is an external looper.
    pub external: bool,
    /// Messages enqueued on actors owned by this worker.
    pub requested: u64,
    /// Messages this worker has executed.
    pub processed: u64,
    /// Actors currently on the ready deque.
    pub queued_actors: usize,
}

/// Shared state behind every handle the runtime gives out.
pub(crate) struct SystemCore {
    /// Worker table: pool workers and external loopers. Slots are
    /// append-only so the indices actors store stay valid forever.
    pub(crate) workers: RwLock<Vec<WorkerRef>>,
    pub(crate) timer: Timer,
    pool_cap: usize,
    next_assign: AtomicUsize,
    idle_exit: AtomicBool,
    shutting_down: AtomicBool,
    idle_wakeup: Semaphore,
    threads: Mutex<Vec<JoinHandle<()>>>,
    balancer: Mutex<Option<BalancerHandle>>,
}

impl SystemCore {
    fn new(config: &SystemConfig) -> Self {
        let pool_size = config.resolved_worker_count();
        Self {
            workers: RwLock::new((0..pool_size).map(|slot| Worker::new(slot, false)).collect()),
            timer: Timer::new(),
            pool_cap: SystemConfig::pool_cap(),
            next_assign: AtomicUsize::new(0),
            idle_exit: AtomicBool::new(false),
            shutting_down: AtomicBool::new(false),
            idle_wakeup: Semaphore::new(0),
            threads: Mutex::new(Vec::new()),
            balancer: Mutex::new(None),
        }
    }

    pub(crate) fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Acquire)
    }

    pub(crate) fn worker(&self, slot: usize) -> WorkerRef {
        Arc::clone(&self.workers.read()[slot])
    }

    /// Pick a pool worker for a new actor, round-robin.
    fn assign_slot(&self) -> usize {
        let workers = self.workers.read();
        loop {
            let slot = self.next_assign.fetch_add(1, Ordering::Relaxed) % workers.len();
            if !workers[slot].external {
                return slot;
            }
        }
    }

    fn register_external_worker(&self) -> WorkerRef {
        let mut workers = self.workers.write();
        let worker = Worker::new(workers.len(), true);
        // The creating thread is the one that will drain the looper.
        worker.bind_current_thread();
        workers.push(Arc::clone(&worker));
        worker
    }

    fn spawn_worker_thread(self: &Arc<Self>, worker: &WorkerRef) -> io::Result<JoinHandle<()>> {
        let system = Arc::clone(self);
        let worker = Arc::clone(worker);
        thread::Builder::new()
            .name(format!("spindle-worker-{:02}", worker.slot))
            .spawn(move || run_worker(&system, &worker))
    }

    fn start(self: &Arc<Self>) -> Result<(), SystemError> {
        let spawned = (|| -> io::Result<()> {
            let workers: Vec<WorkerRef> = self.workers.read().iter().map(Arc::clone).collect();
            for worker in &workers {
                let handle = self.spawn_worker_thread(worker)?;
                self.threads.lock().push(handle);
            }
            let system = Arc::clone(self);
            let handle = thread::Builder::new()
                .name("spindle-timer".into())
                .spawn(move || timer::run_timer(&system))?;
            self.threads.lock().push(handle);
            Ok(())
        })();
        if let Err(error) = spawned {
            // A partially started pool is useless; tear down what came up.
            self.begin_shutdown();
            return Err(SystemError::ThreadSpawn(error));
        }
        Ok(())
    }

    fn begin_shutdown(&self) {
        self.shutting_down.store(true, Ordering::Release);
        for worker in self.workers.read().iter() {
            worker.wakeup.release();
        }
        self.timer.wakeup.release();
        let handles: Vec<JoinHandle<()>> = self.threads.lock().drain(..).collect();
        for handle in handles {
            let _ = handle.join();
        }
    }

    /// Transfer one actor between workers.
    ///
    /// Either end may be chosen automatically: an idle worker passes itself
    /// as `destination` and lets the scan find a busy donor; the balancer
    /// (or an enqueue whose owner is busy) passes the `source` and lets the
    /// scan find somewhere less loaded. Both locks are taken with
    /// `try_lock` and any contention fails the whole attempt — waiting here
    /// could deadlock against another steal running in the opposite
    /// direction.
    pub(crate) fn steal_work(
        &self,
        destination: Option<&WorkerRef>,
        source: Option<&WorkerRef>,
    ) -> bool {
        let workers = self.workers.read();
        self.steal_work_with(&workers, destination, source)
    }

    pub(crate) fn steal_work_with(
        &self,
        workers: &[WorkerRef],
        destination: Option<&WorkerRef>,
        source: Option<&WorkerRef>,
    ) -> bool {
        let source = match source {
            Some(source) => Arc::clone(source),
            None => {
                // Idle-driven: find a donor that is busy, has queued actors,
                // and did not itself just receive stolen work.
                let Some(destination) = destination else {
                    return false;
                };
                let found = scan_after(workers, destination.slot, |candidate| {
                    candidate.has_ready_work()
                        && !candidate.queue.is_locked()
                        && candidate.state.load(Ordering::Acquire) & status::BUSY != 0
                        && candidate.state.load(Ordering::Acquire) & status::STOLE_WORK == 0
                });
                match found {
                    Some(found) => found,
                    None => return false,
                }
            }
        };
        let destination = match destination {
            Some(destination) => Arc::clone(destination),
            None => {
                // Prefer an idle peer; fall back to any peer that has made
                // progress since the balancer's last snapshot.
                let found = scan_after(workers, source.slot, |candidate| {
                    candidate.ready_len.load(Ordering::Acquire) == 0
                        && !candidate.queue.is_locked()
                })
                .or_else(|| {
                    scan_after(workers, source.slot, |candidate| {
                        candidate.processed.load(Ordering::Relaxed)
                            != candidate.balancer_snapshot.load(Ordering::Relaxed)
                            && !candidate.queue.is_locked()
                    })
                });
                match found {
                    Some(found) => found,
                    None => return false,
                }
            }
        };

        if source.queue.is_locked() {
            return false;
        }
        let Some(mut source_queue) = source.queue.try_lock() else {
            return false;
        };
        if destination.queue.is_locked() {
            return false;
        }
        let Some(mut destination_queue) = destination.queue.try_lock() else {
            return false;
        };

        // Skip the donor's executing actor (it keeps its hot-cache claim)
        // and anything pinned, executing, or manually locked.
        let picked = source_queue.ready.iter().position(|candidate| {
            let hot = source_queue
                .last_actor
                .as_ref()
                .is_some_and(|last| Arc::ptr_eq(last, candidate));
            !hot && candidate.state.load(Ordering::Acquire)
                & (flags::PINNED | flags::EXECUTING | flags::USER_LOCKED)
                == 0
        });
        let Some(index) = picked else {
            return false;
        };
        let Some(actor) = source_queue.ready.remove(index) else {
            return false;
        };

        actor.owner.store(destination.slot, Ordering::Release);
        let backlog = actor.mailbox.lock().len() as u64;
        source.requested.fetch_sub(backlog, Ordering::Relaxed);
        source.sync_ready_len(&source_queue);
        destination_queue.ready.push_back(actor);
        destination.requested.fetch_add(backlog, Ordering::Relaxed);
        destination.state.fetch_or(status::STOLE_WORK, Ordering::AcqRel);
        destination.sync_ready_len(&destination_queue);
        drop(source_queue);
        drop(destination_queue);

        trace!(
            from = source.slot,
            to = destination.slot,
            backlog,
            "migrated an actor between workers"
        );
        destination.wakeup.release();
        true
    }

    /// Append one worker to the pool, up to the cap. Called by the load
    /// balancer when every worker is stuck-busy.
    pub(crate) fn grow_pool(self: &Arc<Self>) -> bool {
        let mut workers = self.workers.write();
        let pool: usize = workers.iter().filter(|worker| !worker.external).count();
        if pool >= self.pool_cap {
            return false;
        }
        let worker = Worker::new(workers.len(), false);
        let slot = worker.slot;
        match self.spawn_worker_thread(&worker) {
            Ok(handle) => {
                workers.push(worker);
                self.threads.lock().push(handle);
                info!(worker = slot, pool = pool + 1, "grew the worker pool");
                true
            }
            Err(error) => {
                warn!(%error, "could not spawn an additional worker; pool unchanged");
                false
            }
        }
    }

    /// Cheap idle test, called by a worker that found nothing to run or
    /// steal. False positives are fine: `run` performs the definitive
    /// blocking check.
    pub(crate) fn notify_worker_idle(&self) {
        if !self.idle_exit.load(Ordering::Acquire) {
            return;
        }
        let workers = self.workers.read();
        for worker in workers.iter().filter(|worker| !worker.external) {
            if worker.requested.load(Ordering::Relaxed) != worker.processed.load(Ordering::Relaxed)
            {
                return;
            }
        }
        if self.timer.is_busy() {
            return;
        }
        self.idle_wakeup.release();
    }

    /// Definitive idleness check: take every pool worker's lock plus the
    /// timer lock via `try_lock` (restarting from scratch on any
    /// contention), then require `requested == processed` everywhere and an
    /// empty timer queue. Holding the timer lock closes the window where a
    /// due entry has been popped but its message not yet enqueued.
    fn verify_idle(&self) -> bool {
        loop {
            let workers = self.workers.read();
            let mut queue_guards = Vec::with_capacity(workers.len());
            let mut contended = false;
            let mut busy = false;
            for worker in workers.iter().filter(|worker| !worker.external) {
                match worker.queue.try_lock() {
                    Some(guard) => queue_guards.push(guard),
                    None => {
                        contended = true;
                        break;
                    }
                }
                if worker.requested.load(Ordering::Relaxed)
                    != worker.processed.load(Ordering::Relaxed)
                {
                    busy = true;
                    break;
                }
            }
            if busy {
                return false;
            }
            if !contended {
                match self.timer.queue.try_lock() {
                    Some(timer_queue) => return timer_queue.entries.is_empty(),
                    None => contended = true,
                }
            }
            drop(queue_guards);
            drop(workers);
            debug_assert!(contended);
            thread::yield_now();
        }
    }

    fn run(&self, idle_exit: bool) {
        self.idle_exit.store(idle_exit, Ordering::Release);
        if idle_exit {
            // Kick one verification immediately: the pool may already be
            // idle, in which case no worker will ever report in.
            self.idle_wakeup.release();
        }
        loop {
            self.idle_wakeup.acquire();
            if !self.idle_exit.load(Ordering::Acquire) {
                debug!("run() released by quit(wait_for_unfinished = false)");
                return;
            }
            if self.verify_idle() {
                debug!("workers and timer idle; run() returning");
                return;
            }
        }
    }

    fn quit(&self, wait_for_unfinished: bool) {
        self.idle_exit.store(wait_for_unfinished, Ordering::Release);
        self.idle_wakeup.release();
    }
}

fn scan_after(
    workers: &[WorkerRef],
    start: usize,
    eligible: impl Fn(&WorkerRef) -> bool,
) -> Option<WorkerRef> {
    let total = workers.len();
    (1..total)
        .map(|offset| &workers[(start + offset) % total])
        .find(|&candidate| !candidate.external && eligible(candidate))
        .map(Arc::clone)
}

/// The actor runtime: owns the worker pool, the shared timer, and the
/// optional load balancer.
///
/// Construct one explicitly and pass it wherever actors are created; there
/// is no process-wide instance. Dropping the system shuts it down
/// cooperatively: any executing message finishes, then every runtime thread
/// is joined.
///
/// # Examples
///
/// ```rust
/// use spindle_rt::{ActorOptions, ActorSystem, SystemConfig};
///
/// let system = ActorSystem::new(SystemConfig::default()).unwrap();
/// let actor = system.spawn_actor(ActorOptions::default());
/// actor.send(|| println!("hello from a worker thread"));
///
/// // Block until every queued message (and timer) has drained.
/// system.run(true);
/// ```
pub struct ActorSystem {
    core: Arc<SystemCore>,
}

impl ActorSystem {
    /// Start the runtime: spawn the worker pool (hardware concurrency when
    /// `worker_count` is 0), the timer thread, and the load balancer if
    /// enabled.
    pub fn new(config: SystemConfig) -> Result<Self, SystemError> {
        config.validate()?;
        let core = Arc::new(SystemCore::new(&config));
        core.start()?;
        let system = Self { core };
        if config.enable_load_balancer {
            system.set_load_balancer(true, config.load_balancer_period)?;
        }
        Ok(system)
    }

    /// Create an actor, assigned to a pool worker round-robin.
    pub fn spawn_actor(&self, options: ActorOptions) -> Actor {
        let slot = self.core.assign_slot();
        let cell = ActorCell::new(slot, options.lock_to_thread);
        Actor::new(Arc::clone(&self.core), cell)
    }

    /// Create an external looper owned by the calling thread. The looper
    /// never joins the pool and never takes part in stealing.
    pub fn create_looper(&self) -> ExternalLooper {
        let worker = self.core.register_external_worker();
        ExternalLooper::new(Arc::clone(&self.core), worker)
    }

    /// Block the calling thread. With `idle_exit` set, return once every
    /// pool worker has processed everything requested of it and the timer
    /// queue is empty; otherwise return only when [`ActorSystem::quit`] is
    /// called.
    pub fn run(&self, idle_exit: bool) {
        self.core.run(idle_exit);
    }

    /// Release [`ActorSystem::run`]: with `wait_for_unfinished` it returns
    /// once the system is idle, without it it returns immediately (any
    /// message already executing still completes; queued remainders are
    /// abandoned at shutdown).
    pub fn quit(&self, wait_for_unfinished: bool) {
        self.core.quit(wait_for_unfinished);
    }

    /// Schedule `behavior` as a message on `target` after `delay`. A zero
    /// delay posts immediately. Entries for a deregistered target are
    /// dropped silently.
    pub fn add_timer(
        &self,
        delay: Duration,
        target: &ActorRef,
        behavior: impl FnOnce() + Send + 'static,
    ) {
        self.core
            .timer
            .add(&self.core, delay, target.cell(), Box::new(behavior));
    }

    /// Cancel every pending timer targeting the locked actor. Taking the
    /// guard proves the caller holds the target's manual lock, so no
    /// behavior of the target can be re-adding timers concurrently. There
    /// is no per-entry cancellation.
    pub fn cancel_timers(&self, target: &ActorLock<'_>) {
        self.core.timer.cancel_for(&Arc::downgrade(target.cell()));
    }

    /// Start or stop the load balancer at runtime. Stopping joins the
    /// balancer thread; the pool keeps any workers it grew.
    pub fn set_load_balancer(
        &self,
        enabled: bool,
        period: Duration,
    ) -> Result<(), SystemError> {
        if enabled {
            if period.is_zero() {
                return Err(SystemError::InvalidConfig {
                    reason: "load_balancer_period must be non-zero".into(),
                });
            }
            let mut slot = self.core.balancer.lock();
            if slot.is_some() {
                return Err(SystemError::BalancerAlreadyRunning);
            }
            *slot = Some(balancer::start(&self.core, period)?);
            Ok(())
        } else {
            let handle = self.core.balancer.lock().take();
            if let Some(handle) = handle {
                handle.stop();
            }
            Ok(())
        }
    }

    /// Number of pool workers (external loopers excluded).
    pub fn worker_count(&self) -> usize {
        self.core
            .workers
            .read()
            .iter()
            .filter(|worker| !worker.external)
            .count()
    }

    /// Snapshot of every worker's counters. Advisory, like everything read
    /// without the queue locks.
    pub fn worker_stats(&self) -> Vec<WorkerStats> {
        self.core
            .workers
            .read()
            .iter()
            .map(|worker| WorkerStats {
                worker: worker.slot,
                external: worker.external,
                requested: worker.requested.load(Ordering::Relaxed),
                processed: worker.processed.load(Ordering::Relaxed),
                queued_actors: worker.ready_len.load(Ordering::Acquire),
            })
            .collect()
    }
}

impl Drop for ActorSystem {
    fn drop(&mut self) {
        // The balancer goes first so nothing grows the pool mid-teardown.
        let balancer = self.core.balancer.lock().take();
        if let Some(balancer) = balancer {
            balancer.stop();
        }
        self.core.begin_shutdown();
    }
}
