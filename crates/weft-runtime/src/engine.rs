//! `Engine`: owns the function registry and the host bridge, and drives a
//! `CompiledScript` to completion across however many suspensions it takes
//! (spec.md §5).
//!
//! Grounded on `raya-runtime/src/session.rs`'s persistent-registration
//! shape, trimmed of its REPL-only declaration accumulation (out of scope
//! here — a `CompiledScript` is already a fully resolved entry point).

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use weft_core::continuation::{resume, take_task};
use weft_core::registry::{CallArgs, FunctionRegistry, WrapperFn};
use weft_sdk::continuation::Continuation;
use weft_sdk::descriptor::FunctionDescriptor;
use weft_sdk::error::RuntimeError;
use weft_sdk::host::{Host, ThreadToken};
use weft_sdk::task::{AsyncTask, Primitive, ResumeSender};
use weft_sdk::value::Value;

use crate::compiler::CompiledScript;
use crate::error::EmbedError;

/// What's needed to resume a parked continuation once its async task
/// completes: the continuation itself and what to do with the final
/// result. Lives only in thread-local storage — never crosses a thread
/// boundary itself, so holding `Rc`/boxed-non-Send closures here is safe
/// even though the `ResumeSender` that triggers the lookup must be `Send`.
struct PendingEntry {
    continuation: Continuation,
    engine: Rc<Engine>,
    on_complete: Box<dyn FnOnce(Result<Value, RuntimeError>)>,
}

thread_local! {
    static PENDING: RefCell<HashMap<u64, PendingEntry>> = RefCell::new(HashMap::new());
}

/// Owns the function/method registry and the host bridge for one running
/// script. Not `Send` — a script's continuations are `Rc`-based and only
/// ever touched from the thread that owns them (spec.md §5).
pub struct Engine {
    registry: FunctionRegistry,
    host: Arc<dyn Host + Send + Sync>,
    next_task_id: Cell<u64>,
}

impl Engine {
    pub fn new(host: Arc<dyn Host + Send + Sync>) -> Rc<Engine> {
        Rc::new(Engine {
            registry: FunctionRegistry::new(),
            host,
            next_task_id: Cell::new(0),
        })
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    pub fn register_global_function(&self, descriptor: Rc<FunctionDescriptor>, wrapper: WrapperFn) {
        self.registry.register_global(descriptor, wrapper);
    }

    pub fn register_method(&self, type_name: impl Into<Rc<str>>, descriptor: Rc<FunctionDescriptor>, wrapper: WrapperFn) {
        self.registry.register_method(type_name, descriptor, wrapper);
    }

    pub fn deregister_global(&self, name: &str) -> bool {
        self.registry.deregister_global(name)
    }

    /// Calls a registered global function directly with already-shaped
    /// arguments, for embedders that don't route every call through a
    /// `CompiledScript` entry point.
    pub fn call_global(&self, name: &str, args: Vec<Value>) -> weft_sdk::continuation::Outcome<Value> {
        self.registry
            .call_global(name, None, &weft_sdk::error::SourceLoc::unknown(), CallArgs::Positional(args))
    }

    fn next_id(&self) -> u64 {
        let id = self.next_task_id.get();
        self.next_task_id.set(id + 1);
        id
    }

    /// Runs `script` asynchronously: `on_complete` fires exactly once, from
    /// whichever thread the final resume happens to land on, once the
    /// script reaches a `Ready` or `Err` outcome (possibly after any number
    /// of suspensions dispatched through the host).
    pub fn run(self: &Rc<Self>, script: &CompiledScript, on_complete: impl FnOnce(Result<Value, RuntimeError>) + 'static) {
        let outcome = script.run(self);
        self.drive(outcome, Box::new(on_complete));
    }

    /// Runs `script` to completion without involving the host at all:
    /// blocking tasks are executed inline, on the calling thread. Returns
    /// `EmbedError::RequiresAsyncDriver` if the script ever produces a
    /// non-blocking suspension, since those can only be completed by
    /// something outside this call driving the host's event loop.
    pub fn run_sync(self: &Rc<Self>, script: &CompiledScript) -> Result<Value, EmbedError> {
        let mut outcome = script.run(self);
        loop {
            match outcome {
                weft_sdk::continuation::Outcome::Ready(v) => return Ok(v),
                weft_sdk::continuation::Outcome::Err(e) => return Err(EmbedError::from_runtime(e, "")),
                weft_sdk::continuation::Outcome::Suspended(mut continuation) => match take_task(&mut continuation) {
                    Ok(AsyncTask::Blocking(blocking)) => {
                        let primitive = (blocking.work)();
                        outcome = resume(continuation, primitive.into_value());
                    }
                    Ok(AsyncTask::NonBlocking(_)) => return Err(EmbedError::RequiresAsyncDriver),
                    Err(e) => return Err(EmbedError::from_runtime(e, "")),
                },
            }
        }
    }

    fn drive(self: &Rc<Self>, outcome: weft_sdk::continuation::Outcome<Value>, on_complete: Box<dyn FnOnce(Result<Value, RuntimeError>)>) {
        match outcome {
            weft_sdk::continuation::Outcome::Ready(v) => on_complete(Ok(v)),
            weft_sdk::continuation::Outcome::Err(e) => on_complete(Err(e)),
            weft_sdk::continuation::Outcome::Suspended(mut continuation) => match take_task(&mut continuation) {
                Ok(task) => self.dispatch(task, continuation, on_complete),
                Err(e) => on_complete(Err(e)),
            },
        }
    }

    fn dispatch(self: &Rc<Self>, task: AsyncTask, continuation: Continuation, on_complete: Box<dyn FnOnce(Result<Value, RuntimeError>)>) {
        let id = self.next_id();
        PENDING.with(|pending| {
            pending.borrow_mut().insert(
                id,
                PendingEntry {
                    continuation,
                    engine: self.clone(),
                    on_complete,
                },
            );
        });
        match task {
            AsyncTask::Blocking(blocking) => {
                let callback: ResumeSender = Box::new(move |primitive: Primitive| resume_pending(id, primitive));
                self.host.schedule_blocking(blocking.owner, blocking.work, callback);
            }
            AsyncTask::NonBlocking(non_blocking) => {
                let owner = non_blocking.owner;
                let host = self.host.clone();
                let callback: ResumeSender = Box::new(move |primitive: Primitive| {
                    // A non-blocking registration's callback may fire from
                    // any thread; hop back onto the owning thread before
                    // touching the thread-local pending table.
                    host.schedule_event(owner, Box::new(move || resume_pending(id, primitive)));
                });
                (non_blocking.register)(callback);
            }
        }
    }
}

fn resume_pending(id: u64, primitive: Primitive) {
    let entry = PENDING.with(|pending| pending.borrow_mut().remove(&id));
    let Some(entry) = entry else {
        return;
    };
    let outcome = resume(entry.continuation, primitive.into_value());
    let engine = entry.engine;
    engine.drive(outcome, entry.on_complete);
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_sdk::task::BlockingAsyncTask;
    use weft_sdk::host::ThreadToken as Token;

    struct NoopHost;
    impl Host for NoopHost {
        fn current_thread_token(&self) -> ThreadToken {
            Token(0)
        }
        fn schedule_event(&self, _token: ThreadToken, callback: Box<dyn FnOnce() + Send>) {
            callback();
        }
        fn schedule_event_after(&self, _token: ThreadToken, _delay: std::time::Duration, callback: Box<dyn FnOnce() + Send>) {
            callback();
        }
        fn schedule_blocking(&self, _token: ThreadToken, work: Box<dyn FnOnce() -> Primitive + Send>, callback: ResumeSender) {
            callback(work());
        }
    }

    #[test]
    fn run_sync_drives_a_blocking_suspension_inline() {
        let engine = Engine::new(Arc::new(NoopHost));
        let script = CompiledScript::new(|_engine| {
            weft_sdk::continuation::Outcome::Suspended(weft_core::continuation::suspend_blocking(
                Token(0),
                || Primitive::Int64(41),
                |v| weft_sdk::continuation::Outcome::Ready(match v {
                    Value::Int64(n) => Value::Int64(n + 1),
                    other => other,
                }),
            ))
        });
        match engine.run_sync(&script) {
            Ok(Value::Int64(42)) => {}
            _ => panic!("expected 42"),
        }
    }

    #[allow(dead_code)]
    fn _assert_blocking_task_type(_: BlockingAsyncTask) {}
}
