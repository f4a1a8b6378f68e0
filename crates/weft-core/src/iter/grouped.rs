//! `grouped` (spec.md §4.3): batches upstream elements into fixed-size
//! `List` chunks, yielding a final short chunk if the stream doesn't divide
//! evenly.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use weft_sdk::continuation::Outcome;
use weft_sdk::error::{RuntimeError, SourceLoc};
use weft_sdk::value::{ScriptIterator, Value};

use super::support::chain_self;

pub struct GroupedAdapter {
    upstream: Rc<RefCell<dyn ScriptIterator>>,
    size: usize,
    chunk: Vec<Value>,
    produced: Option<Value>,
    exhausted: bool,
    self_ref: Weak<RefCell<GroupedAdapter>>,
}

impl GroupedAdapter {
    pub fn new(upstream: Rc<RefCell<dyn ScriptIterator>>, size: usize) -> Rc<RefCell<dyn ScriptIterator>> {
        Rc::new_cyclic(|weak| {
            RefCell::new(GroupedAdapter {
                upstream,
                size: size.max(1),
                chunk: Vec::new(),
                produced: None,
                exhausted: false,
                self_ref: weak.clone(),
            })
        })
    }

    fn fill(&mut self) -> Outcome<Value> {
        if self.chunk.len() >= self.size {
            self.settle_chunk();
            return Outcome::Ready(Value::Null);
        }
        match self.upstream.borrow_mut().has_next() {
            Outcome::Ready(true) => self.pull(),
            Outcome::Ready(false) => {
                self.exhausted = true;
                if !self.chunk.is_empty() {
                    self.settle_chunk();
                }
                Outcome::Ready(Value::Null)
            }
            Outcome::Suspended(c) => Outcome::Suspended(chain_self(c, self.self_ref.clone(), Self::after_has_next)),
            Outcome::Err(e) => Outcome::Err(e),
        }
    }

    fn after_has_next(&mut self, v: Value) -> Outcome<Value> {
        if v.is_truthy() {
            self.pull()
        } else {
            self.exhausted = true;
            if !self.chunk.is_empty() {
                self.settle_chunk();
            }
            Outcome::Ready(Value::Null)
        }
    }

    fn pull(&mut self) -> Outcome<Value> {
        match self.upstream.borrow_mut().next() {
            Outcome::Ready(v) => {
                self.chunk.push(v);
                self.fill()
            }
            Outcome::Suspended(c) => Outcome::Suspended(chain_self(c, self.self_ref.clone(), Self::after_next)),
            Outcome::Err(e) => Outcome::Err(e),
        }
    }

    fn after_next(&mut self, v: Value) -> Outcome<Value> {
        self.chunk.push(v);
        self.fill()
    }

    fn settle_chunk(&mut self) {
        let chunk = std::mem::take(&mut self.chunk);
        self.produced = Some(Value::list(chunk));
    }
}

impl ScriptIterator for GroupedAdapter {
    fn has_next(&mut self) -> Outcome<bool> {
        if self.produced.is_some() {
            return Outcome::Ready(true);
        }
        if self.exhausted {
            return Outcome::Ready(false);
        }
        match self.fill() {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iter::support::ListIterator;

    #[test]
    fn chunks_evenly() {
        let upstream = ListIterator::new((1..=6).map(Value::Int32).collect());
        let adapter = GroupedAdapter::new(upstream, 2);
        let mut chunks = Vec::new();
        while let Outcome::Ready(true) = adapter.borrow_mut().has_next() {
            if let Outcome::Ready(v) = adapter.borrow_mut().next() {
                chunks.push(v);
            }
        }
        assert_eq!(chunks.len(), 3);
    }

    #[test]
    fn yields_short_final_chunk() {
        let upstream = ListIterator::new((1..=5).map(Value::Int32).collect());
        let adapter = GroupedAdapter::new(upstream, 2);
        let mut chunks = Vec::new();
        while let Outcome::Ready(true) = adapter.borrow_mut().has_next() {
            if let Outcome::Ready(v) = adapter.borrow_mut().next() {
                chunks.push(v);
            }
        }
        assert_eq!(chunks.len(), 3);
        match &chunks[2] {
            Value::List(l) => assert_eq!(l.borrow().len(), 1),
            _ => panic!("expected list chunk"),
        }
    }
}
