//! Load balancer: starvation detection, rebalancing, and pool growth.

// Layer 1: Standard library
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

// Layer 2: Third-party
use tracing::{debug, trace};

// Layer 3: Internal
use super::actor_system::SystemCore;
use crate::sync::Semaphore;
use crate::worker::status;

/// Shared stop signal; `release` interrupts the balancer's period sleep.
pub(crate) struct BalancerSignal {
    stop: AtomicBool,
    wakeup: Semaphore,
}

/// Handle to a running balancer thread.
pub(crate) struct BalancerHandle {
    signal: Arc<BalancerSignal>,
    handle: JoinHandle<()>,
}

impl BalancerHandle {
    /// Stop the balancer and join its thread.
    pub(crate) fn stop(self) {
        self.signal.stop.store(true, Ordering::Release);
        self.signal.wakeup.release();
        let _ = self.handle.join();
    }
}

/// Spawn the balancer thread.
pub(crate) fn start(system: &Arc<SystemCore>, period: Duration) -> io::Result<BalancerHandle> {
    let signal = Arc::new(BalancerSignal {
        stop: AtomicBool::new(false),
        wakeup: Semaphore::new(0),
    });
    let thread_signal = Arc::clone(&signal);
    let thread_system = Arc::clone(system);
    let handle = thread::Builder::new()
        .name("spindle-balancer".into())
        .spawn(move || run_balancer(&thread_system, &thread_signal, period))?;
    Ok(BalancerHandle { signal, handle })
}

/// The balancer loop.
///
/// Every period: a worker is stuck-busy when it is executing, its processed
/// count has not moved since the previous tick, and actors are still queued
/// behind it. Each stuck worker donates a queued actor to a peer; when every
/// pool worker is stuck at once and the pool is under its cap, a new worker
/// is added instead. Workers are never removed.
fn run_balancer(system: &Arc<SystemCore>, signal: &BalancerSignal, period: Duration) {
    debug!(?period, "load balancer started");
    {
        let workers = system.workers.read();
        for worker in workers.iter().filter(|worker| !worker.external) {
            worker
                .balancer_snapshot
                .store(worker.processed.load(Ordering::Relaxed), Ordering::Relaxed);
        }
    }
    loop {
        signal.wakeup.acquire_timeout(period);
        if signal.stop.load(Ordering::Acquire) || system.is_shutting_down() {
            break;
        }
        let mut stuck = 0usize;
        let mut pool = 0usize;
        {
            let workers = system.workers.read();
            for worker in workers.iter().filter(|worker| !worker.external) {
                pool += 1;
                let processed = worker.processed.load(Ordering::Relaxed);
                if worker.state.load(Ordering::Acquire) & status::BUSY != 0
                    && worker.balancer_snapshot.load(Ordering::Relaxed) == processed
                    && worker.has_ready_work()
                {
                    stuck += 1;
                    trace!(worker = worker.slot, "stuck-busy worker; rebalancing");
                    system.steal_work_with(&workers, None, Some(worker));
                }
                worker.balancer_snapshot.store(processed, Ordering::Relaxed);
            }
        }
        if stuck > 0 && stuck == pool {
            system.grow_pool();
        }
    }
    debug!("load balancer stopped");
}
