//! # spindle-rt - Work-Stealing Actor Runtime
//!
//! Ordered, single-threaded message execution per actor; parallelism
//! harvested across a pool of worker threads via work stealing.
//!
//! # Quick Start
//!
//! ```rust
//! use spindle_rt::prelude::*;
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use std::sync::Arc;
//!
//! // 1. Start the runtime (one worker per hardware thread by default).
//! let system = ActorSystem::new(SystemConfig::default()).unwrap();
//!
//! // 2. Create actors; each is assigned to a worker round-robin.
//! let accumulator = system.spawn_actor(ActorOptions::default());
//!
//! // 3. Send messages: nullary closures that curry their arguments.
//! //    Messages of one actor never run concurrently and keep FIFO order.
//! let total = Arc::new(AtomicU64::new(0));
//! for amount in 1..=100u64 {
//!     let total = Arc::clone(&total);
//!     accumulator.send(move || {
//!         total.fetch_add(amount, Ordering::Relaxed);
//!     });
//! }
//!
//! // 4. Block until every queued message has been processed.
//! system.run(true);
//! assert_eq!(total.load(Ordering::Relaxed), 5050);
//! ```
//!
//! # Programming Models
//!
//! ## Asynchronous messaging
//! [`Actor::send`] queues a deferred call that later runs on the actor's
//! owning worker. Cross-actor posting goes through the cheap weak
//! [`ActorRef`] handle ([`Actor::handle`]).
//!
//! ## Manual locking
//! [`Actor::lock`] pins the actor as if a message were executing, so the
//! caller may touch actor-owned state directly under the same serialization
//! guarantee. Messages arriving meanwhile are deferred and run right after
//! the guard drops.
//!
//! # Scheduling Model
//!
//! - Each worker owns a ready deque of actors with pending messages and
//!   executes one message per scheduling step.
//! - An idle worker steals a queued actor (mailbox and all) from a busy
//!   peer; a worker enqueuing onto itself while busy offloads to an idle
//!   peer. Pinned actors ([`ActorOptions::lock_to_thread`]) never migrate.
//! - FIFO order holds within one actor's mailbox. No order is promised
//!   between different actors, even for messages posted from one thread —
//!   that reordering freedom is what makes stealing legal.
//! - The optional load balancer watches for stuck-busy workers, rebalances
//!   their queues, and grows the pool up to twice the hardware concurrency.
//!
//! # Module Organization
//!
//! - [`actor`] - actor handles, manual-lock guard, per-actor options
//! - [`message`] - the deferred message type
//! - [`system`] - the [`ActorSystem`], configuration, errors, stealing and
//!   idle detection
//! - [`worker`] - pool workers and the [`ExternalLooper`]
//!
//! The timer has no public module: delayed messages are scheduled through
//! [`ActorSystem::add_timer`] and cancelled per-target through
//! [`ActorSystem::cancel_timers`].

pub mod actor;
pub mod message;
pub mod prelude;
pub mod system;
pub mod worker;

pub(crate) mod sync;
pub(crate) mod timer;

pub use actor::{Actor, ActorLock, ActorOptions, ActorRef};
pub use message::Message;
pub use system::{
    ActorSystem, SystemConfig, SystemConfigBuilder, SystemError, WorkerStats,
    DEFAULT_LOAD_BALANCER_PERIOD, POOL_CAP_FACTOR,
};
pub use worker::ExternalLooper;
