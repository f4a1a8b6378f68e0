//! `flatMap` (spec.md §4.3): maps each upstream element to a sub-iterator
//! and flattens its elements into the outer stream before pulling the next
//! upstream element.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use weft_sdk::continuation::Outcome;
use weft_sdk::error::{RuntimeError, SourceLoc};
use weft_sdk::value::{ScriptIterator, Value};

use super::support::{chain_self, make_iterator, ScriptFn};

pub struct FlatMapAdapter {
    upstream: Rc<RefCell<dyn ScriptIterator>>,
    mapper: ScriptFn,
    inner: Option<Rc<RefCell<dyn ScriptIterator>>>,
    produced: Option<Value>,
    upstream_exhausted: bool,
    self_ref: Weak<RefCell<FlatMapAdapter>>,
}

impl FlatMapAdapter {
    pub fn new(upstream: Rc<RefCell<dyn ScriptIterator>>, mapper: ScriptFn) -> Rc<RefCell<dyn ScriptIterator>> {
        Rc::new_cyclic(|weak| {
            RefCell::new(FlatMapAdapter {
                upstream,
                mapper,
                inner: None,
                produced: None,
                upstream_exhausted: false,
                self_ref: weak.clone(),
            })
        })
    }

    /// Top of the loop: drain the current inner iterator if any, else pull
    /// the next upstream element and map it to a fresh inner iterator.
    fn advance(&mut self) -> Outcome<Value> {
        if let Some(inner) = self.inner.clone() {
            return self.pull_inner(inner);
        }
        if self.upstream_exhausted {
            return Outcome::Ready(Value::Null);
        }
        self.pull_upstream()
    }

    fn pull_inner(&mut self, inner: Rc<RefCell<dyn ScriptIterator>>) -> Outcome<Value> {
        match inner.borrow_mut().has_next() {
            Outcome::Ready(true) => self.pull_inner_value(inner),
            Outcome::Ready(false) => {
                self.inner = None;
                self.advance()
            }
            Outcome::Suspended(c) => Outcome::Suspended(chain_self(c, self.self_ref.clone(), Self::after_inner_has_next)),
            Outcome::Err(e) => Outcome::Err(e),
        }
    }

    fn after_inner_has_next(&mut self, v: Value) -> Outcome<Value> {
        let inner = self.inner.clone().expect("inner set before suspending on has_next");
        if v.is_truthy() {
            self.pull_inner_value(inner)
        } else {
            self.inner = None;
            self.advance()
        }
    }

    fn pull_inner_value(&mut self, inner: Rc<RefCell<dyn ScriptIterator>>) -> Outcome<Value> {
        match inner.borrow_mut().next() {
            Outcome::Ready(v) => {
                self.produced = Some(v);
                Outcome::Ready(Value::Null)
            }
            Outcome::Suspended(c) => Outcome::Suspended(chain_self(c, self.self_ref.clone(), Self::after_inner_next)),
            Outcome::Err(e) => Outcome::Err(e),
        }
    }

    fn after_inner_next(&mut self, v: Value) -> Outcome<Value> {
        self.produced = Some(v);
        Outcome::Ready(Value::Null)
    }

    fn pull_upstream(&mut self) -> Outcome<Value> {
        match self.upstream.borrow_mut().has_next() {
            Outcome::Ready(true) => self.pull_upstream_value(),
            Outcome::Ready(false) => {
                self.upstream_exhausted = true;
                Outcome::Ready(Value::Null)
            }
            Outcome::Suspended(c) => Outcome::Suspended(chain_self(c, self.self_ref.clone(), Self::after_upstream_has_next)),
            Outcome::Err(e) => Outcome::Err(e),
        }
    }

    fn after_upstream_has_next(&mut self, v: Value) -> Outcome<Value> {
        if v.is_truthy() {
            self.pull_upstream_value()
        } else {
            self.upstream_exhausted = true;
            Outcome::Ready(Value::Null)
        }
    }

    fn pull_upstream_value(&mut self) -> Outcome<Value> {
        match self.upstream.borrow_mut().next() {
            Outcome::Ready(v) => self.apply_mapper(v),
            Outcome::Suspended(c) => Outcome::Suspended(chain_self(c, self.self_ref.clone(), Self::after_upstream_next)),
            Outcome::Err(e) => Outcome::Err(e),
        }
    }

    fn after_upstream_next(&mut self, v: Value) -> Outcome<Value> {
        self.apply_mapper(v)
    }

    fn apply_mapper(&mut self, item: Value) -> Outcome<Value> {
        match (self.mapper)(&[item]) {
            Outcome::Ready(mapped) => self.settle_inner(mapped),
            Outcome::Suspended(c) => Outcome::Suspended(chain_self(c, self.self_ref.clone(), Self::after_mapper)),
            Outcome::Err(e) => Outcome::Err(e),
        }
    }

    fn after_mapper(&mut self, mapped: Value) -> Outcome<Value> {
        self.settle_inner(mapped)
    }

    fn settle_inner(&mut self, mapped: Value) -> Outcome<Value> {
        if mapped.is_null() {
            return self.advance();
        }
        match make_iterator(&mapped) {
            Ok(it) => {
                self.inner = Some(it);
                self.advance()
            }
            Err(e) => Outcome::Err(e),
        }
    }
}

impl ScriptIterator for FlatMapAdapter {
    fn has_next(&mut self) -> Outcome<bool> {
        if self.produced.is_some() {
            return Outcome::Ready(true);
        }
        match self.advance() {
            Outcome::Ready(_) => Outcome::Ready(self.produced.is_some()),
            Outcome::Suspended(c) => Outcome::Suspended(c),
            Outcome::Err(e) => Outcome::Err(e),
        }
    }

    fn next(&mut self) -> Outcome<Value> {
        if self.produced.is_none() {
            match self.has_next() {
                Outcome::Ready(true) => {}
                Outcome::Ready(false) => {
                    return Outcome::Err(RuntimeError::bounds_error("next() called on an exhausted iterator", SourceLoc::unknown()))
                }
                Outcome::Suspended(c) => return Outcome::Suspended(c),
                Outcome::Err(e) => return Outcome::Err(e),
            }
        }
        Outcome::Ready(self.produced.take().unwrap())
    }
}
