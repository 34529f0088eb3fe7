//! Prelude module for convenient imports.
//!
//! Re-exports the types most programs need:
//!
//! ```rust
//! use spindle_rt::prelude::*;
//! ```

pub use crate::actor::{Actor, ActorLock, ActorOptions, ActorRef};
pub use crate::message::Message;
pub use crate::system::{
    ActorSystem, SystemConfig, SystemConfigBuilder, SystemError, WorkerStats,
};
pub use crate::worker::ExternalLooper;
