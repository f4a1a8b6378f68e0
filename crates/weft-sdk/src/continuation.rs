//! The `Frame`/`Continuation` data structures (spec.md §3, §4.1).
//!
//! This models a compiled-code convention, not the compiler itself
//! (compilation is out of scope, spec.md §1): a possibly-async function is
//! assumed to be compiled so that, on suspension, it constructs a `Frame`
//! carrying a one-shot closure that re-enters the function at its saved
//! code-location tag. `weft-core::continuation` supplies the driver
//! (`resume`) and the two suspension primitives
//! (`suspend_blocking`/`suspend_non_blocking`) that build these frames.

use crate::error::RuntimeError;
use crate::task::AsyncTask;
use crate::value::Value;

/// A snapshot of whatever thread-local runtime state (spec.md §6) was live
/// when a frame suspended, restored before that frame resumes.
#[derive(Debug, Clone, Default)]
pub struct RuntimeStateSnapshot {
    pub next_line: u32,
}

/// The result of driving a suspend-capable call one step (spec.md §4.1's
/// "ordinary sum-typed return channel" redesign, §9).
pub enum Outcome<T> {
    Ready(T),
    Suspended(Continuation),
    Err(RuntimeError),
}

impl<T> Outcome<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Ready(v) => Outcome::Ready(f(v)),
            Outcome::Suspended(c) => Outcome::Suspended(c),
            Outcome::Err(e) => Outcome::Err(e),
        }
    }
}

/// The one-shot entry point that re-enters a suspended activation. Takes
/// the value being delivered to it (the async result on the innermost
/// frame, or the prior frame's return value on every other frame) and
/// produces the next step.
pub type ResumeFn = Box<dyn FnOnce(Value) -> Outcome<Value>>;

/// One suspended activation (spec.md §3 `Frame`).
pub struct Frame {
    pub resume: ResumeFn,
    /// The even/odd code-location tag this frame will resume at (spec.md
    /// §4.1's state-machine encoding).
    pub location: u32,
    pub primitive_locals: Vec<i64>,
    pub object_locals: Vec<Value>,
    pub state_snapshot: RuntimeStateSnapshot,
    /// Populated only on the single frame currently responsible for handing
    /// work to the host (spec.md §3's "only populated at head frame").
    pub async_task: Option<AsyncTask>,
}

impl Frame {
    pub fn new(resume: ResumeFn, location: u32, snapshot: RuntimeStateSnapshot) -> Self {
        Self {
            resume,
            location,
            primitive_locals: Vec::new(),
            object_locals: Vec::new(),
            state_snapshot: snapshot,
            async_task: None,
        }
    }

    pub fn with_locals(mut self, primitive: Vec<i64>, object: Vec<Value>) -> Self {
        self.primitive_locals = primitive;
        self.object_locals = object;
        self
    }

    pub fn with_async_task(mut self, task: AsyncTask) -> Self {
        self.async_task = Some(task);
        self
    }
}

/// A chain of suspended activations: `frames[0]` is where the suspension
/// physically occurred; each later element wraps the one before it, ending
/// with the outermost still-live caller (spec.md §4.1 steps 2-4).
pub struct Continuation {
    pub frames: Vec<Frame>,
}

impl Continuation {
    pub fn new(frame: Frame) -> Self {
        Self { frames: vec![frame] }
    }

    /// A caller catches the continuation its callee raised and wraps it
    /// with its own suspended activation (spec.md §4.1 step 2: "Chains the
    /// new frame... re-raises").
    pub fn chain(mut self, outer: Frame) -> Self {
        self.frames.push(outer);
        self
    }

    /// The single frame currently holding the async task, if any (spec.md's
    /// "exactly one non-null async-task in a Continuation chain" invariant).
    pub fn task_frame_index(&self) -> Option<usize> {
        self.frames.iter().position(|f| f.async_task.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
