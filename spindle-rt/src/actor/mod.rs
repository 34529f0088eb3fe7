//! Actors: serialized units of state with asynchronous messaging and manual
//! locking.
//!
//! The runtime guarantees that at most one thread executes a given actor's
//! messages at any instant, and that a single actor's messages run in FIFO
//! order. Parallelism comes from spreading actors across workers, not from
//! running one actor concurrently.

pub(crate) mod cell;
mod handle;
mod options;

pub use handle::{Actor, ActorLock, ActorRef};
pub use options::ActorOptions;
