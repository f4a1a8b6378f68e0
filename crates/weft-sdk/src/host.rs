//! The embedding boundary a script's suspensions are driven through
//! (spec.md §5 "host bridge").
//!
//! Grounded on `raya-sdk/src/handler.rs`'s `NativeHandler`/`IoRequest`
//! split, generalized from IO-specific request variants to the spec's
//! generic blocking/non-blocking scheduling contract.

use crate::task::{Primitive, ResumeSender};

/// Identifies which script-owning thread a task's result must be delivered
/// back to. Opaque to the core; the host assigns and interprets these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThreadToken(pub u64);

/// The host-provided scheduling surface a running script is driven through.
///
/// Every method here is synchronous from the core's point of view —
/// `schedule_blocking`/`schedule_event`/`schedule_event_after` all return
/// immediately, handing off to whatever the host's own event loop or thread
/// pool looks like, and eventually invoke the supplied callback exactly
/// once.
pub trait Host {
    /// The token identifying the thread the calling script currently runs
    /// on, used to route a suspended task's completion back to it.
    fn current_thread_token(&self) -> ThreadToken;

    /// Schedule `callback` to run on `token`'s thread as soon as possible,
    /// without blocking a worker thread in the meantime.
    fn schedule_event(&self, token: ThreadToken, callback: Box<dyn FnOnce() + Send>);

    /// Like `schedule_event`, but not before `delay` has elapsed.
    fn schedule_event_after(
        &self,
        token: ThreadToken,
        delay: std::time::Duration,
        callback: Box<dyn FnOnce() + Send>,
    );

    /// Run `work` on the host's blocking thread pool, then deliver its
    /// result back via `callback` on `token`'s thread.
    fn schedule_blocking(
        &self,
        token: ThreadToken,
        work: Box<dyn FnOnce() -> Primitive + Send>,
        callback: ResumeSender,
    );

    /// Persist a checkpoint image for crash recovery. A no-op by default;
    /// hosts that don't need checkpointing need not implement it.
    fn save_checkpoint(&self, _token: ThreadToken, _image: &[u8]) {}

    /// Discard a previously saved checkpoint (the script ran to completion
    /// without needing it).
    fn delete_checkpoint(&self, _token: ThreadToken) {}
}
