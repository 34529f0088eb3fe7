//! Per-actor configuration.

/// Options recognized at actor construction.
///
/// # Examples
///
/// ```rust
/// use spindle_rt::ActorOptions;
///
/// let default = ActorOptions::default();
/// assert!(!default.lock_to_thread);
///
/// let pinned = ActorOptions::pinned();
/// assert!(pinned.lock_to_thread);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ActorOptions {
    /// Pin the actor to the worker it is first assigned to. A pinned actor
    /// never migrates, stealing skips it, and its manual lock may only be
    /// taken from the owning worker's thread.
    pub lock_to_thread: bool,
}

impl ActorOptions {
    /// Options for an actor locked to its original worker thread.
    pub fn pinned() -> Self {
        Self {
            lock_to_thread: true,
        }
    }
}
