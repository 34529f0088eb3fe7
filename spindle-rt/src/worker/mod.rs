//! Workers: the execution resources actors run on.
//!
//! Pool workers are threads owned by the system; the [`ExternalLooper`] is
//! the same machinery driven by a host thread through explicit
//! [`ExternalLooper::drain`] calls.

pub(crate) mod looper;
pub(crate) mod pool;

pub use looper::ExternalLooper;
pub(crate) use pool::{run_worker, status, ReadyQueue, Worker, WorkerRef};
