//! `filter` (spec.md §4.3): yields only upstream elements the predicate
//! accepts, pulling and discarding rejected elements eagerly.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use weft_sdk::continuation::Outcome;
use weft_sdk::error::{RuntimeError, SourceLoc};
use weft_sdk::value::{ScriptIterator, Value};

use super::support::{chain_self, ScriptFn};

pub struct FilterAdapter {
    upstream: Rc<RefCell<dyn ScriptIterator>>,
    predicate: ScriptFn,
    found: Option<Value>,
    exhausted: bool,
    pending_candidate: Option<Value>,
    self_ref: Weak<RefCell<FilterAdapter>>,
}

impl FilterAdapter {
    pub fn new(upstream: Rc<RefCell<dyn ScriptIterator>>, predicate: ScriptFn) -> Rc<RefCell<dyn ScriptIterator>> {
        Rc::new_cyclic(|weak| {
            RefCell::new(FilterAdapter {
                upstream,
                predicate,
                found: None,
                exhausted: false,
                pending_candidate: None,
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
            Outcome::Ready(v) => self.test_predicate(v),
            Outcome::Suspended(c) => Outcome::Suspended(chain_self(c, self.self_ref.clone(), Self::after_next)),
            Outcome::Err(e) => Outcome::Err(e),
        }
    }

    fn after_next(&mut self, v: Value) -> Outcome<Value> {
        self.test_predicate(v)
    }

    fn test_predicate(&mut self, candidate: Value) -> Outcome<Value> {
        match (self.predicate)(&[candidate.clone()]) {
            Outcome::Ready(v) => {
                if v.is_truthy() {
                    self.found = Some(candidate);
                    Outcome::Ready(Value::Null)
                } else {
                    self.pull_and_test()
                }
            }
            Outcome::Suspended(c) => {
                self.pending_candidate = Some(candidate);
                Outcome::Suspended(chain_self(c, self.self_ref.clone(), Self::after_predicate))
            }
            Outcome::Err(e) => Outcome::Err(e),
        }
    }

    fn after_predicate(&mut self, v: Value) -> Outcome<Value> {
        let candidate = self.pending_candidate.take().expect("predicate suspension always sets pending_candidate");
        if v.is_truthy() {
            self.found = Some(candidate);
            Outcome::Ready(Value::Null)
        } else {
            self.pull_and_test()
        }
    }
}

impl ScriptIterator for FilterAdapter {
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
    fn keeps_only_matching_elements() {
        let upstream = ListIterator::new(vec![Value::Int32(1), Value::Int32(2), Value::Int32(3), Value::Int32(4)]);
        let predicate: ScriptFn = Rc::new(|args| {
            let n = match &args[0] {
                Value::Int32(n) => *n,
                _ => unreachable!(),
            };
            Outcome::Ready(Value::Bool(n % 2 == 0))
        });
        let adapter = FilterAdapter::new(upstream, predicate);
        let mut out = Vec::new();
        loop {
            match adapter.borrow_mut().has_next() {
                Outcome::Ready(true) => {}
                Outcome::Ready(false) => break,
                _ => panic!("unexpected suspension in synchronous test"),
            }
            match adapter.borrow_mut().next() {
                Outcome::Ready(v) => out.push(v),
                _ => panic!("unexpected outcome"),
            }
        }
        let nums: Vec<i32> = out
            .into_iter()
            .map(|v| match v {
                Value::Int32(n) => n,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(nums, vec![2, 4]);
    }
}
