//! Public actor handles.
//!
//! [`Actor`] is the owning handle the application keeps: dropping it
//! deregisters the actor (timers drained, any message in flight waited out,
//! ready-deque references removed). [`ActorRef`] is a cheap weak handle for
//! posting messages from other actors or threads; it outlives the actor
//! harmlessly. [`ActorLock`] is the RAII guard of the manual-synchronization
//! model.

// Layer 1: Standard library
use std::sync::atomic::Ordering;
use std::sync::{Arc, Weak};

// Layer 2: Third-party
// (none)

// Layer 3: Internal
use super::cell::{self, flags, CellRef, WeakCellRef};
use crate::system::SystemCore;

/// Owning handle to an actor: a unit of state whose behaviors are serialized
/// by the runtime.
///
/// At most one worker thread runs a message of this actor at any instant,
/// and messages run in the order they were sent. The handle itself is cheap
/// to share by reference; for posting from other actors use [`Actor::handle`].
///
/// # Examples
///
/// ```rust
/// use spindle_rt::{ActorOptions, ActorSystem, SystemConfig};
///
/// let system = ActorSystem::new(SystemConfig::default()).unwrap();
/// let counter = system.spawn_actor(ActorOptions::default());
///
/// let state = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));
/// let inner = std::sync::Arc::clone(&state);
/// counter.send(move || {
///     inner.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
/// });
///
/// system.run(true);
/// assert_eq!(state.load(std::sync::atomic::Ordering::Relaxed), 1);
/// ```
pub struct Actor {
    system: Arc<SystemCore>,
    cell: CellRef,
}

impl Actor {
    pub(crate) fn new(system: Arc<SystemCore>, cell: CellRef) -> Self {
        Self { system, cell }
    }

    /// Queue a message for execution on the actor's owning worker.
    ///
    /// Fire-and-forget: messages cannot be cancelled individually once
    /// queued (see [`Actor::clear_messages`]). FIFO order per actor is
    /// guaranteed; order across different actors is not.
    pub fn send(&self, message: impl FnOnce() + Send + 'static) {
        cell::enqueue(&self.cell, &self.system, Box::new(message));
    }

    /// Manually pin the actor so the caller may touch actor-owned state
    /// directly, under the same serialization guarantee a message gets.
    ///
    /// Spins until no message is executing and no other manual lock is
    /// held. Messages arriving while the lock is held are deferred and run
    /// immediately after the guard drops. Locking an actor from inside one
    /// of its own messages deadlocks; the caller is responsible for lock
    /// ordering across actors.
    #[must_use = "dropping the guard immediately releases the lock"]
    pub fn lock(&self) -> ActorLock<'_> {
        cell::manual_lock(&self.cell, &self.system);
        ActorLock { actor: self }
    }

    /// Whether a manual lock is currently held. Advisory.
    pub fn is_locked(&self) -> bool {
        self.cell.state.load(Ordering::Acquire) & flags::USER_LOCKED != 0
    }

    /// Whether the actor has no message executing and an empty mailbox.
    /// Advisory: a new message may arrive as this returns.
    pub fn is_idle(&self) -> bool {
        cell::is_idle(&self.cell, &self.system)
    }

    /// Drop all pending messages. A message already executing cannot be
    /// cancelled.
    pub fn clear_messages(&self) {
        cell::clear_messages(&self.cell, &self.system)
    }

    /// Index of the worker currently responsible for this actor.
    pub fn worker_index(&self) -> usize {
        self.cell.owner.load(Ordering::Acquire)
    }

    /// Verify the caller is allowed to touch actor-owned state right now:
    /// either it is the owning worker's thread running (or pinned to) this
    /// actor, or it holds the manual lock.
    ///
    /// Call from inside behaviors to catch code that bypasses the actor and
    /// invokes methods directly. Debug-asserts on violation and returns the
    /// verdict.
    pub fn async_validity_check(&self) -> bool {
        let state = self.cell.state.load(Ordering::Acquire);
        if state & (flags::PINNED | flags::EXECUTING) != 0 {
            let worker = self.system.worker(self.cell.owner.load(Ordering::Acquire));
            if worker.is_owner_thread() {
                return true;
            }
        }
        if state & flags::USER_LOCKED != 0 {
            return true;
        }
        debug_assert!(
            false,
            "actor state accessed outside a message or manual lock"
        );
        false
    }

    /// A weak, cloneable handle for posting messages to this actor.
    pub fn handle(&self) -> ActorRef {
        ActorRef {
            cell: Arc::downgrade(&self.cell),
            system: Arc::downgrade(&self.system),
        }
    }
}

impl Drop for Actor {
    fn drop(&mut self) {
        cell::deregister(&self.cell, &self.system);
    }
}

/// Weak handle for posting messages to an [`Actor`].
///
/// Clones freely and crosses threads; once the actor has been dropped,
/// sends become no-ops.
#[derive(Clone)]
pub struct ActorRef {
    cell: WeakCellRef,
    system: Weak<SystemCore>,
}

impl ActorRef {
    /// Queue a message on the target actor.
    ///
    /// Returns `false` (and drops the message) when the actor or the system
    /// has already been torn down.
    pub fn send(&self, message: impl FnOnce() + Send + 'static) -> bool {
        let (Some(cell), Some(system)) = (self.cell.upgrade(), self.system.upgrade()) else {
            return false;
        };
        cell::enqueue(&cell, &system, Box::new(message));
        true
    }

    pub(crate) fn cell(&self) -> &WeakCellRef {
        &self.cell
    }
}

/// RAII guard of an actor's manual lock; dropping it unlocks the actor and
/// releases any message that was deferred while the lock was held.
#[must_use = "dropping the guard immediately releases the lock"]
pub struct ActorLock<'a> {
    actor: &'a Actor,
}

impl ActorLock<'_> {
    pub(crate) fn cell(&self) -> &CellRef {
        &self.actor.cell
    }
}

impl Drop for ActorLock<'_> {
    fn drop(&mut self) {
        cell::manual_unlock(&self.actor.cell, &self.actor.system);
    }
}
