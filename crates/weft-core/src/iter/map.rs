//! `map` / `mapWithIndex` (spec.md §4.3): transforms every upstream element
//! through a user-supplied function, in lockstep with upstream (no
//! filtering, no lookahead).

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use weft_sdk::continuation::Outcome;
use weft_sdk::error::{RuntimeError, SourceLoc};
use weft_sdk::value::{ScriptIterator, Value};

use super::support::{chain_self, ScriptFn};

pub struct MapAdapter {
    upstream: Rc<RefCell<dyn ScriptIterator>>,
    mapper: ScriptFn,
    with_index: bool,
    index: i64,
    produced: Option<Value>,
    self_ref: Weak<RefCell<MapAdapter>>,
}

impl MapAdapter {
    pub fn new(upstream: Rc<RefCell<dyn ScriptIterator>>, mapper: ScriptFn, with_index: bool) -> Rc<RefCell<dyn ScriptIterator>> {
        Rc::new_cyclic(|weak| {
            RefCell::new(MapAdapter {
                upstream,
                mapper,
                with_index,
                index: 0,
                produced: None,
                self_ref: weak.clone(),
            })
        })
    }

    fn advance(&mut self) -> Outcome<Value> {
        match self.upstream.borrow_mut().has_next() {
            Outcome::Ready(true) => self.pull(),
            Outcome::Ready(false) => Outcome::Ready(Value::Null),
            Outcome::Suspended(c) => Outcome::Suspended(chain_self(c, self.self_ref.clone(), Self::after_has_next)),
            Outcome::Err(e) => Outcome::Err(e),
        }
    }

    fn after_has_next(&mut self, v: Value) -> Outcome<Value> {
        if v.is_truthy() {
            self.pull()
        } else {
            Outcome::Ready(Value::Null)
        }
    }

    fn pull(&mut self) -> Outcome<Value> {
        match self.upstream.borrow_mut().next() {
            Outcome::Ready(v) => self.apply(v),
            Outcome::Suspended(c) => Outcome::Suspended(chain_self(c, self.self_ref.clone(), Self::after_next)),
            Outcome::Err(e) => Outcome::Err(e),
        }
    }

    fn after_next(&mut self, v: Value) -> Outcome<Value> {
        self.apply(v)
    }

    fn apply(&mut self, item: Value) -> Outcome<Value> {
        let args: Vec<Value> = if self.with_index {
            vec![item, Value::Int64(self.index)]
        } else {
            vec![item]
        };
        self.index += 1;
        match (self.mapper)(&args) {
            Outcome::Ready(mapped) => {
                self.produced = Some(mapped);
                Outcome::Ready(Value::Null)
            }
            Outcome::Suspended(c) => Outcome::Suspended(chain_self(c, self.self_ref.clone(), Self::after_mapper)),
            Outcome::Err(e) => Outcome::Err(e),
        }
    }

    fn after_mapper(&mut self, mapped: Value) -> Outcome<Value> {
        self.produced = Some(mapped);
        Outcome::Ready(Value::Null)
    }
}

impl ScriptIterator for MapAdapter {
    fn has_next(&mut self) -> Outcome<bool> {
        if self.produced.is_some() {
            return Outcome::Ready(true);
        }
        match self.upstream.borrow_mut().has_next() {
            Outcome::Ready(b) => Outcome::Ready(b),
            Outcome::Suspended(c) => Outcome::Suspended(c),
            Outcome::Err(e) => Outcome::Err(e),
        }
    }

    fn next(&mut self) -> Outcome<Value> {
        if self.produced.is_none() {
            match self.advance() {
                Outcome::Ready(_) => {}
                Outcome::Suspended(c) => return Outcome::Suspended(c),
                Outcome::Err(e) => return Outcome::Err(e),
            }
        }
        match self.produced.take() {
            Some(v) => Outcome::Ready(v),
            None => Outcome::Err(RuntimeError::bounds_error("next() called on an exhausted iterator", SourceLoc::unknown())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iter::support::ListIterator;

    #[test]
    fn maps_each_element() {
        let upstream = ListIterator::new(vec![Value::Int32(1), Value::Int32(2)]);
        let mapper: ScriptFn = Rc::new(|args| {
            let n = match &args[0] {
                Value::Int32(n) => *n,
                _ => unreachable!(),
            };
            Outcome::Ready(Value::Int32(n * 10))
        });
        let adapter = MapAdapter::new(upstream, mapper, false);
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
        assert_eq!(nums, vec![10, 20]);
    }

    #[test]
    fn map_with_index_passes_ordinal() {
        let upstream = ListIterator::new(vec![Value::str("a"), Value::str("b")]);
        let mapper: ScriptFn = Rc::new(|args| {
            let idx = match &args[1] {
                Value::Int64(n) => *n,
                _ => unreachable!(),
            };
            Outcome::Ready(Value::Int64(idx))
        });
        let adapter = MapAdapter::new(upstream, mapper, true);
        let mut out = Vec::new();
        while let Outcome::Ready(true) = adapter.borrow_mut().has_next() {
            if let Outcome::Ready(v) = adapter.borrow_mut().next() {
                out.push(v);
            }
        }
        assert!(matches!(out[0], Value::Int64(0)));
        assert!(matches!(out[1], Value::Int64(1)));
    }
}
