//! Shared plumbing for the lazy iterator adapter chain (spec.md §4.3).
//!
//! Every adapter below is a small resumable state machine: each one lives
//! behind its own `Rc<RefCell<_>>` (constructed with `Rc::new_cyclic` so it
//! can hold a typed `Weak` reference to itself) and stores its in-progress
//! step as ordinary struct fields rather than captured locals. When a step
//! suspends, `chain_self` wraps the resulting `Continuation` with a frame
//! whose resume handle upgrades the weak self-reference and re-enters the
//! adapter's own resume method with the value the suspended call produced.
//! This sidesteps needing a real compiler-generated state machine (spec.md
//! §1: codegen is out of scope) while preserving the observable contract:
//! `has_next`/`next` may suspend, and resuming picks up exactly where the
//! adapter left off.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use weft_sdk::continuation::{Continuation, Frame, Outcome, ResumeFn, RuntimeStateSnapshot};
use weft_sdk::error::RuntimeError;
use weft_sdk::value::{ScriptIterator, Value};

/// A native callback an adapter invokes for user-supplied predicates,
/// mappers, and comparators. Suspend-capable: returning
/// `Outcome::Suspended` is how a closure that itself calls a suspending
/// function propagates that upward (spec.md §4.3).
pub type ScriptFn = Rc<dyn Fn(&[Value]) -> Outcome<Value>>;

/// Chains a new frame onto `continuation` whose resume handle re-enters
/// `step` on `self_ref` with the value delivered at resume time.
pub fn chain_self<T, F>(continuation: Continuation, self_ref: Weak<RefCell<T>>, step: F) -> Continuation
where
    T: 'static,
    F: Fn(&mut T, Value) -> Outcome<Value> + 'static,
{
    let resume: ResumeFn = Box::new(move |v: Value| match self_ref.upgrade() {
        Some(rc) => step(&mut rc.borrow_mut(), v),
        None => Outcome::Err(RuntimeError::stack_internal("iterator adapter dropped while suspended")),
    });
    continuation.chain(Frame::new(resume, 0, RuntimeStateSnapshot::default()))
}

/// A leaf source over an already-materialized list (spec.md §4.3
/// `make_iterator` applied to a `List`/`Map`). Never suspends.
pub struct ListIterator {
    items: Vec<Value>,
    index: usize,
}

impl ListIterator {
    pub fn new(items: Vec<Value>) -> Rc<RefCell<dyn ScriptIterator>> {
        Rc::new(RefCell::new(ListIterator { items, index: 0 }))
    }
}

impl ScriptIterator for ListIterator {
    fn has_next(&mut self) -> Outcome<bool> {
        Outcome::Ready(self.index < self.items.len())
    }

    fn next(&mut self) -> Outcome<Value> {
        if self.index >= self.items.len() {
            return Outcome::Err(RuntimeError::bounds_error(
                "next() called on an exhausted iterator",
                weft_sdk::error::SourceLoc::unknown(),
            ));
        }
        let v = self.items[self.index].clone();
        self.index += 1;
        Outcome::Ready(v)
    }
}

/// A leaf source that calls a zero-arg generator repeatedly, treating
/// `Value::Null` as end-of-stream (spec.md's `stream(...)` source,
/// supplementing the adapter chain with a way to build one from a
/// user-supplied producer instead of an existing collection).
pub struct GeneratorIterator {
    produce: ScriptFn,
    lookahead: Option<Value>,
    exhausted: bool,
    self_ref: Weak<RefCell<GeneratorIterator>>,
}

impl GeneratorIterator {
    pub fn new(produce: ScriptFn) -> Rc<RefCell<dyn ScriptIterator>> {
        let rc = Rc::new_cyclic(|weak| {
            RefCell::new(GeneratorIterator {
                produce,
                lookahead: None,
                exhausted: false,
                self_ref: weak.clone(),
            })
        });
        rc
    }

    fn pull(&mut self) -> Outcome<Value> {
        match (self.produce)(&[]) {
            Outcome::Ready(v) => {
                self.settle(v);
                Outcome::Ready(Value::Null)
            }
            Outcome::Suspended(c) => Outcome::Suspended(chain_self(c, self.self_ref.clone(), |me, v| {
                me.settle(v);
                Outcome::Ready(Value::Null)
            })),
            Outcome::Err(e) => Outcome::Err(e),
        }
    }

    fn settle(&mut self, produced: Value) {
        if produced.is_null() {
            self.exhausted = true;
        } else {
            self.lookahead = Some(produced);
        }
    }
}

impl ScriptIterator for GeneratorIterator {
    fn has_next(&mut self) -> Outcome<bool> {
        if self.lookahead.is_some() {
            return Outcome::Ready(true);
        }
        if self.exhausted {
            return Outcome::Ready(false);
        }
        match self.pull() {
            Outcome::Ready(_) => Outcome::Ready(self.lookahead.is_some()),
            Outcome::Suspended(c) => Outcome::Suspended(c),
            Outcome::Err(e) => Outcome::Err(e),
        }
    }

    fn next(&mut self) -> Outcome<Value> {
        if self.lookahead.is_none() {
            match self.has_next() {
                Outcome::Ready(true) => {}
                Outcome::Ready(false) => {
                    return Outcome::Err(RuntimeError::bounds_error(
                        "next() called on an exhausted stream",
                        weft_sdk::error::SourceLoc::unknown(),
                    ))
                }
                Outcome::Suspended(c) => return Outcome::Suspended(c),
                Outcome::Err(e) => return Outcome::Err(e),
            }
        }
        Outcome::Ready(self.lookahead.take().unwrap())
    }
}

/// Coerces a `Value` into an iterator (spec.md §4.3 `make_iterator`): lists
/// iterate their elements, maps iterate `[key, value]` pairs, a string
/// iterates its one-character substrings, an integer `n` iterates `0..n`
/// (empty for `n <= 0`), and an existing iterator passes through unchanged.
pub fn make_iterator(value: &Value) -> Result<Rc<RefCell<dyn ScriptIterator>>, RuntimeError> {
    match value {
        Value::List(l) => Ok(ListIterator::new(l.borrow().clone())),
        Value::Map(m) => Ok(ListIterator::new(
            m.borrow()
                .iter()
                .map(|(k, v)| Value::list(vec![Value::str(k.clone()), v.clone()]))
                .collect(),
        )),
        Value::Str(s) => Ok(ListIterator::new(s.chars().map(|c| Value::str(c.to_string())).collect())),
        Value::Int32(n) => Ok(ListIterator::new((0..*n).map(Value::Int32).collect())),
        Value::Int64(n) => Ok(ListIterator::new((0..*n).map(Value::Int64).collect())),
        Value::Iterator(it) => Ok(it.clone()),
        other => Err(RuntimeError::type_error(
            format!("cannot iterate over {}", other.type_name()),
            weft_sdk::error::SourceLoc::unknown(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_iterator_yields_in_order() {
        let it = ListIterator::new(vec![Value::Int32(1), Value::Int32(2)]);
        let mut b = it.borrow_mut();
        assert!(matches!(b.has_next(), Outcome::Ready(true)));
        assert!(matches!(b.next(), Outcome::Ready(Value::Int32(1))));
        assert!(matches!(b.next(), Outcome::Ready(Value::Int32(2))));
        assert!(matches!(b.has_next(), Outcome::Ready(false)));
    }

    #[test]
    fn make_iterator_splits_a_string_into_one_char_strings() {
        let it = make_iterator(&Value::str("ab")).unwrap();
        let mut b = it.borrow_mut();
        assert!(matches!(b.next(), Outcome::Ready(Value::Str(s)) if s.as_ref() == "a"));
        assert!(matches!(b.next(), Outcome::Ready(Value::Str(s)) if s.as_ref() == "b"));
        assert!(matches!(b.has_next(), Outcome::Ready(false)));
    }

    #[test]
    fn make_iterator_over_an_integer_counts_up_from_zero() {
        let it = make_iterator(&Value::Int32(3)).unwrap();
        let mut b = it.borrow_mut();
        assert!(matches!(b.next(), Outcome::Ready(Value::Int32(0))));
        assert!(matches!(b.next(), Outcome::Ready(Value::Int32(1))));
        assert!(matches!(b.next(), Outcome::Ready(Value::Int32(2))));
        assert!(matches!(b.has_next(), Outcome::Ready(false)));
    }

    #[test]
    fn make_iterator_over_a_non_positive_integer_is_empty() {
        let it = make_iterator(&Value::Int32(0)).unwrap();
        assert!(matches!(it.borrow_mut().has_next(), Outcome::Ready(false)));
    }

    #[test]
    fn generator_iterator_stops_at_null() {
        let counter = Rc::new(RefCell::new(0i32));
        let c = counter.clone();
        let produce: ScriptFn = Rc::new(move |_args| {
            let mut n = c.borrow_mut();
            *n += 1;
            if *n > 2 {
                Outcome::Ready(Value::Null)
            } else {
                Outcome::Ready(Value::Int32(*n))
            }
        });
        let it = GeneratorIterator::new(produce);
        let mut b = it.borrow_mut();
        assert!(matches!(b.next(), Outcome::Ready(Value::Int32(1))));
        assert!(matches!(b.next(), Outcome::Ready(Value::Int32(2))));
        assert!(matches!(b.has_next(), Outcome::Ready(false)));
    }
}
