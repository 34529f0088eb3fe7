//! Deferred message type.
//!
//! A message is an opaque one-shot callable with no arguments; callers curry
//! whatever state the behavior needs into the closure at enqueue time. The
//! runtime never inspects a message, it only runs it exactly once on the
//! thread that owns the target actor at that moment.

/// A queued unit of actor work.
pub type Message = Box<dyn FnOnce() + Send + 'static>;
