//! `unique` (spec.md §4.3): yields each upstream element at most once,
//! comparing against every element already seen this stream using the
//! runtime's structural-equality rule.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use weft_sdk::continuation::Outcome;
use weft_sdk::error::{RuntimeError, SourceLoc};
use weft_sdk::value::{ScriptIterator, Value};

use super::support::chain_self;

pub struct UniqueAdapter {
    upstream: Rc<RefCell<dyn ScriptIterator>>,
    seen: Vec<Value>,
    found: Option<Value>,
    exhausted: bool,
    self_ref: Weak<RefCell<UniqueAdapter>>,
}

impl UniqueAdapter {
    pub fn new(upstream: Rc<RefCell<dyn ScriptIterator>>) -> Rc<RefCell<dyn ScriptIterator>> {
        Rc::new_cyclic(|weak| {
            RefCell::new(UniqueAdapter {
                upstream,
                seen: Vec::new(),
                found: None,
                exhausted: false,
                self_ref: weak.clone(),
            })
        })
    }

    fn pull_and_test(&mut self) -> Outcome<Value> {
        match self.upstream.borrow_mut().has_next() {
            Outcome::Ready(true) => self.pull_value(),
            Outcome::Ready(false) => {
                self.exhausted = true;
                Outcome::Ready(Value::Null)
            }
            Outcome::Suspended(c) => Outcome::Suspended(chain_self(c, self.self_ref.clone(), Self::after_has_next)),
            Outcome::Err(e) => Outcome::Err(e),
        }
    }

    fn after_has_next(&mut self, v: Value) -> Outcome<Value> {
        if v.is_truthy() {
            self.pull_value()
        } else {
            self.exhausted = true;
            Outcome::Ready(Value::Null)
        }
    }

    fn pull_value(&mut self) -> Outcome<Value> {
        match self.upstream.borrow_mut().next() {
            Outcome::Ready(v) => self.test(v),
            Outcome::Suspended(c) => Outcome::Suspended(chain_self(c, self.self_ref.clone(), Self::after_next)),
            Outcome::Err(e) => Outcome::Err(e),
        }
    }

    fn after_next(&mut self, v: Value) -> Outcome<Value> {
        self.test(v)
    }

    fn test(&mut self, candidate: Value) -> Outcome<Value> {
        if self.seen.iter().any(|seen| seen.structural_eq(&candidate)) {
            self.pull_and_test()
        } else {
            self.seen.push(candidate.clone());
            self.found = Some(candidate);
            Outcome::Ready(Value::Null)
        }
    }
}

impl ScriptIterator for UniqueAdapter {
    fn has_next(&mut self) -> Outcome<bool> {
        if self.found.is_some() {
            return Outcome::Ready(true);
        }
        if self.exhausted {
            return Outcome::Ready(false);
        }
        match self.pull_and_test() {
            Outcome::Ready(_) => Outcome::Ready(self.found.is_some()),
            Outcome::Suspended(c) => Outcome::Suspended(c),
            Outcome::Err(e) => Outcome::Err(e),
        }
    }

    fn next(&mut self) -> Outcome<Value> {
        if self.found.is_none() {
            match self.has_next() {
                Outcome::Ready(true) => {}
                Outcome::Ready(false) => {
                    return Outcome::Err(RuntimeError::bounds_error("next() called on an exhausted iterator", SourceLoc::unknown()))
                }
                Outcome::Suspended(c) => return Outcome::Suspended(c),
                Outcome::Err(e) => return Outcome::Err(e),
            }
        }
        Outcome::Ready(self.found.take().unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iter::support::ListIterator;

    #[test]
    fn drops_repeats() {
        let upstream = ListIterator::new(vec![
            Value::Int32(1),
            Value::Int32(2),
            Value::Int32(1),
            Value::Int32(3),
            Value::Int32(2),
        ]);
        let adapter = UniqueAdapter::new(upstream);
        let mut out = Vec::new();
        while let Outcome::Ready(true) = adapter.borrow_mut().has_next() {
            if let Outcome::Ready(v) = adapter.borrow_mut().next() {
                out.push(v);
            }
        }
        let nums: Vec<i32> = out
            .into_iter()
            .map(|v| match v {
                Value::Int32(n) => n,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(nums, vec![1, 2, 3]);
    }
}
