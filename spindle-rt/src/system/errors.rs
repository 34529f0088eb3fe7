//! System-level error types.

// Layer 1: Standard library
use std::io;

// Layer 2: Third-party
use thiserror::Error;

// Layer 3: Internal
// (none)

/// Errors surfaced by [`ActorSystem`](crate::ActorSystem) construction and
/// control operations.
///
/// Messaging itself is fire-and-forget and never returns an error; lock
/// contention inside the runtime is retried internally, and contract
/// violations (wrong-thread access, unbalanced locking) are debug
/// assertions rather than error values.
#[derive(Error, Debug)]
pub enum SystemError {
    /// A runtime thread (worker, timer, or balancer) could not be spawned.
    /// Fatal at construction; during pool growth the failure is logged and
    /// the pool is left at its current size instead.
    #[error("failed to spawn runtime thread: {0}")]
    ThreadSpawn(#[from] io::Error),

    /// Configuration validation failed.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// The load balancer was enabled while already running.
    #[error("load balancer already running")]
    BalancerAlreadyRunning,
}

impl SystemError {
    /// Whether the system cannot be constructed or driven past this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SystemError::ThreadSpawn(_))
    }

    /// Whether the error is a rejected configuration (fix the config and
    /// retry).
    pub fn is_config(&self) -> bool {
        matches!(self, SystemError::InvalidConfig { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_spawn_display() {
        let err = SystemError::ThreadSpawn(io::Error::other("out of threads"));
        assert!(err.to_string().contains("failed to spawn runtime thread"));
        assert!(err.is_fatal());
        assert!(!err.is_config());
    }

    #[test]
    fn test_invalid_config_display() {
        let err = SystemError::InvalidConfig {
            reason: "load_balancer_period must be non-zero".into(),
        };
        assert!(err.to_string().contains("invalid configuration"));
        assert!(err.is_config());
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_balancer_already_running_is_not_fatal() {
        assert!(!SystemError::BalancerAlreadyRunning.is_fatal());
    }
}
