//! Thread-local runtime state (spec.md §6): the per-script-thread counters
//! and caches that survive a suspend/resume round trip.
//!
//! Grounded on `raya-core/src/sync.rs`'s per-thread execution context.

use std::cell::Cell;

use weft_sdk::continuation::RuntimeStateSnapshot;

thread_local! {
    static NEXT_LINE: Cell<u32> = const { Cell::new(0) };
}

/// The thread-local state a running script can observe and mutate (spec.md
/// §6's `RuntimeState`).
pub struct RuntimeState;

impl RuntimeState {
    /// `nextLine()` (spec.md §6): a monotonically increasing per-thread
    /// counter scripts can use to assign unique ordinals to emitted values.
    pub fn next_line() -> u32 {
        NEXT_LINE.with(|c| {
            let v = c.get();
            c.set(v + 1);
            v
        })
    }

    pub fn reset() {
        NEXT_LINE.with(|c| c.set(0));
    }

    /// Captures the pieces of thread-local state a suspending frame needs
    /// to restore on resume.
    pub fn snapshot() -> RuntimeStateSnapshot {
        RuntimeStateSnapshot {
            next_line: NEXT_LINE.with(Cell::get),
        }
    }

    pub fn restore(snapshot: &RuntimeStateSnapshot) {
        NEXT_LINE.with(|c| c.set(snapshot.next_line));
    }
}
