//! System management: the worker pool, configuration, and control surface.

mod actor_system;
mod balancer;
mod config;
mod errors;

pub use actor_system::{ActorSystem, WorkerStats};
pub use config::{
    SystemConfig, SystemConfigBuilder, DEFAULT_LOAD_BALANCER_PERIOD, POOL_CAP_FACTOR,
};
pub use errors::SystemError;

pub(crate) use actor_system::SystemCore;
