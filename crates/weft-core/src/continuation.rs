//! The suspend/resume protocol driver (spec.md §4.1).
//!
//! `weft-sdk::continuation` defines the `Frame`/`Continuation` data shapes;
//! this module supplies the two suspension primitives a native function (or
//! a compiled script's own `await`-like call) uses to build one, and the
//! `resume` driver a host invokes when a task completes.
//!
//! Grounded on `raya-core/src/scheduler/task.rs`'s `SuspendReason`, replaced
//! here with an explicit frame chain instead of a parked native-stack green
//! thread (SPEC_FULL.md's "Exception-driven continuations" redesign).

use weft_sdk::continuation::{Continuation, Frame, Outcome, ResumeFn, RuntimeStateSnapshot};
use weft_sdk::error::RuntimeError;
use weft_sdk::host::ThreadToken;
use weft_sdk::task::{AsyncTask, BlockingAsyncTask, NonBlockingAsyncTask, Primitive};
use weft_sdk::value::Value;

use crate::state::RuntimeState;

/// Suspend the current call, handing `work` to the host's blocking thread
/// pool (spec.md §4.1 `suspend-blocking`). `resume` is invoked with the
/// `Primitive` result, converted back to a `Value`, once `work` completes.
pub fn suspend_blocking(
    owner: ThreadToken,
    work: impl FnOnce() -> Primitive + Send + 'static,
    resume: impl FnOnce(Value) -> Outcome<Value> + 'static,
) -> Continuation {
    let snapshot = RuntimeState::snapshot();
    let task = AsyncTask::Blocking(BlockingAsyncTask::new(owner, work));
    let resume_fn: ResumeFn = Box::new(resume);
    let frame = Frame::new(resume_fn, 0, snapshot).with_async_task(task);
    Continuation::new(frame)
}

/// Suspend the current call via a non-blocking initiator that will invoke
/// its `ResumeSender` argument once, from any thread, when it has a result
/// (spec.md §4.1 `suspend-non-blocking`).
pub fn suspend_non_blocking(
    owner: ThreadToken,
    register: impl FnOnce(weft_sdk::task::ResumeSender) + Send + 'static,
    resume: impl FnOnce(Value) -> Outcome<Value> + 'static,
) -> Continuation {
    let snapshot = RuntimeState::snapshot();
    let task = AsyncTask::NonBlocking(NonBlockingAsyncTask::new(owner, register));
    let resume_fn: ResumeFn = Box::new(resume);
    let frame = Frame::new(resume_fn, 0, snapshot).with_async_task(task);
    Continuation::new(frame)
}

/// Drive a completed async task's result back through its continuation
/// chain (spec.md §4.1's `continue(result)`).
///
/// Processes frames innermost-first (index 0, where the suspension
/// physically occurred) so that each frame receives the value its own
/// resume point is actually waiting on, threading each frame's return value
/// in as the next frame's input. If a frame re-suspends mid-chain, the
/// still-unprocessed outer frames are spliced onto the new continuation so
/// later resumes continue past it (spec.md §4.1 step: "splice the existing
/// remaining chain onto the new Continuation... and re-raise").
pub fn resume(mut continuation: Continuation, mut result: Value) -> Outcome<Value> {
    RuntimeState::restore(&continuation.frames[0].state_snapshot);
    let frames: Vec<_> = continuation.frames.drain(..).collect();
    let mut iter = frames.into_iter();
    let mut index = 0;
    while let Some(frame) = iter.next() {
        match (frame.resume)(result) {
            Outcome::Ready(value) => {
                result = value;
                index += 1;
            }
            Outcome::Suspended(mut new_continuation) => {
                let remaining: Vec<_> = iter.collect();
                new_continuation.frames.extend(remaining);
                return Outcome::Suspended(new_continuation);
            }
            Outcome::Err(err) => return Outcome::Err(err),
        }
    }
    let _ = index;
    Outcome::Ready(result)
}

/// Pulls the populated async task out of a continuation so it can be handed
/// to the host, returning the task alongside the now-task-free continuation
/// (which the caller is responsible for parking until the task completes).
///
/// `Value`/`Continuation` are `Rc`-based and therefore not `Send`, so they
/// cannot ride along inside the `Send` callback the host eventually invokes
/// on another thread; only the extracted `AsyncTask` (whose `work`/
/// `register` closures are themselves `Send`) crosses that boundary. The
/// caller (`weft-runtime::engine`) is what reunites a completed task's
/// result with its parked continuation, since only it has a `'static`
/// handle to the host and an owning-thread re-entry point.
pub fn take_task(continuation: &mut Continuation) -> Result<AsyncTask, RuntimeError> {
    let idx = continuation
        .task_frame_index()
        .ok_or_else(|| RuntimeError::stack_internal("continuation carries no async task"))?;
    Ok(continuation.frames[idx]
        .async_task
        .take()
        .expect("task_frame_index points at a populated frame"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> ThreadToken {
        ThreadToken(1)
    }

    #[test]
    fn resume_threads_innermost_result_outward() {
        // Two-frame chain: inner frame adds 1, outer frame doubles.
        let outer_resume: ResumeFn = Box::new(|v: Value| {
            let n = match v {
                Value::Int64(n) => n,
                _ => unreachable!(),
            };
            Outcome::Ready(Value::Int64(n * 2))
        });
        let inner_resume: ResumeFn = Box::new(|v: Value| {
            let n = match v {
                Value::Int64(n) => n,
                _ => unreachable!(),
            };
            Outcome::Ready(Value::Int64(n + 1))
        });
        let inner = Frame::new(inner_resume, 0, RuntimeStateSnapshot::default());
        let outer = Frame::new(outer_resume, 0, RuntimeStateSnapshot::default());
        let chain = Continuation::new(inner).chain(outer);

        let out = resume(chain, Value::Int64(10));
        match out {
            Outcome::Ready(Value::Int64(n)) => assert_eq!(n, 22), // (10+1)*2
            _ => panic!("expected Ready"),
        }
    }

    #[test]
    fn resume_propagates_resuspension_with_remaining_frames_spliced() {
        let outer_resume: ResumeFn = Box::new(|v: Value| Outcome::Ready(v));
        let inner_resume: ResumeFn = Box::new(|_v: Value| {
            let innermost = Frame::new(
                Box::new(|v: Value| Outcome::Ready(v)),
                0,
                RuntimeStateSnapshot::default(),
            )
            .with_async_task(AsyncTask::Blocking(BlockingAsyncTask::new(token(), || {
                Primitive::Int64(99)
            })));
            Outcome::Suspended(Continuation::new(innermost))
        });
        let inner = Frame::new(inner_resume, 0, RuntimeStateSnapshot::default());
        let outer = Frame::new(outer_resume, 0, RuntimeStateSnapshot::default());
        let chain = Continuation::new(inner).chain(outer);

        match resume(chain, Value::Int64(1)) {
            Outcome::Suspended(c) => {
                assert_eq!(c.frames.len(), 2);
                assert!(c.task_frame_index() == Some(0));
            }
            _ => panic!("expected Suspended"),
        }
    }
}
