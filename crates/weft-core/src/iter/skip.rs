//! `skip` (spec.md §4.3). A non-negative `n` discards the first `n`
//! upstream elements and passes the rest through lazily. A negative `n`
//! drops the trailing `|n|` elements instead and passes through everything
//! before them, via a circular buffer that briefly holds `|n|+1` entries
//! before evicting (and yielding) its oldest one — since "the last k" isn't
//! knowable until an element that far ahead has actually arrived (resolved
//! Open Question: this adapter doesn't special-case what comes after it,
//! e.g. `limit(0)` just sees an empty replay).

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use weft_sdk::continuation::Outcome;
use weft_sdk::error::{RuntimeError, SourceLoc};
use weft_sdk::value::{ScriptIterator, Value};

use super::support::chain_self;

enum Mode {
    DropFirst { remaining: u64 },
    DropTrailing { window: usize, buffer: VecDeque<Value> },
}

pub struct SkipAdapter {
    upstream: Rc<RefCell<dyn ScriptIterator>>,
    mode: Mode,
    produced: Option<Value>,
    self_ref: Weak<RefCell<SkipAdapter>>,
}

impl SkipAdapter {
    pub fn new(upstream: Rc<RefCell<dyn ScriptIterator>>, n: i64) -> Rc<RefCell<dyn ScriptIterator>> {
        let mode = if n >= 0 {
            Mode::DropFirst { remaining: n as u64 }
        } else {
            Mode::DropTrailing {
                window: (-n) as usize,
                buffer: VecDeque::new(),
            }
        };
        Rc::new_cyclic(|weak| {
            RefCell::new(SkipAdapter {
                upstream,
                mode,
                produced: None,
                self_ref: weak.clone(),
            })
        })
    }

    fn drop_first(&mut self, remaining: u64) -> Outcome<bool> {
        if remaining == 0 {
            return self.upstream.borrow_mut().has_next();
        }
        match self.upstream.borrow_mut().has_next() {
            Outcome::Ready(true) => match self.upstream.borrow_mut().next() {
                Outcome::Ready(_) => {
                    self.mode = Mode::DropFirst { remaining: remaining - 1 };
                    self.drop_first(remaining - 1)
                }
                Outcome::Suspended(c) => Outcome::Suspended(chain_self(c, self.self_ref.clone(), move |me, _v| match &mut me.mode {
                    Mode::DropFirst { remaining } => {
                        *remaining -= 1;
                        me.has_next()
                    }
                    _ => unreachable!(),
                })),
                Outcome::Err(e) => Outcome::Err(e),
            },
            Outcome::Ready(false) => Outcome::Ready(false),
            Outcome::Suspended(c) => Outcome::Suspended(chain_self(c, self.self_ref.clone(), move |me, v| {
                if v.is_truthy() {
                    me.has_next()
                } else {
                    Outcome::Ready(false)
                }
            })),
            Outcome::Err(e) => Outcome::Err(e),
        }
    }

    fn window(&self) -> usize {
        match &self.mode {
            Mode::DropTrailing { window, .. } => *window,
            Mode::DropFirst { .. } => unreachable!("advance only drives DropTrailing mode"),
        }
    }

    fn advance(&mut self) -> Outcome<Value> {
        let window = self.window();
        match self.upstream.borrow_mut().has_next() {
            Outcome::Ready(true) => self.pull_value(window),
            Outcome::Ready(false) => Outcome::Ready(Value::Null),
            Outcome::Suspended(c) => Outcome::Suspended(chain_self(c, self.self_ref.clone(), move |me, v| {
                if v.is_truthy() {
                    me.pull_value(window)
                } else {
                    Outcome::Ready(Value::Null)
                }
            })),
            Outcome::Err(e) => Outcome::Err(e),
        }
    }

    fn pull_value(&mut self, window: usize) -> Outcome<Value> {
        match self.upstream.borrow_mut().next() {
            Outcome::Ready(v) => self.push(window, v),
            Outcome::Suspended(c) => Outcome::Suspended(chain_self(c, self.self_ref.clone(), move |me, v| me.push(window, v))),
            Outcome::Err(e) => Outcome::Err(e),
        }
    }

    fn push(&mut self, window: usize, v: Value) -> Outcome<Value> {
        if let Mode::DropTrailing { buffer, .. } = &mut self.mode {
            buffer.push_back(v);
            if buffer.len() > window {
                let out = buffer.pop_front().expect("just pushed, buffer is non-empty");
                self.produced = Some(out);
                return Outcome::Ready(Value::Null);
            }
        }
        self.advance()
    }
}

impl ScriptIterator for SkipAdapter {
    fn has_next(&mut self) -> Outcome<bool> {
        match &self.mode {
            Mode::DropFirst { remaining } => {
                let remaining = *remaining;
                self.drop_first(remaining)
            }
            Mode::DropTrailing { .. } => {
                if self.produced.is_some() {
                    return Outcome::Ready(true);
                }
                match self.advance() {
                    Outcome::Ready(_) => Outcome::Ready(self.produced.is_some()),
                    Outcome::Suspended(c) => Outcome::Suspended(c),
                    Outcome::Err(e) => Outcome::Err(e),
                }
            }
        }
    }

    fn next(&mut self) -> Outcome<Value> {
        match self.has_next() {
            Outcome::Ready(true) => {}
            Outcome::Ready(false) => {
                return Outcome::Err(RuntimeError::bounds_error("next() called on an exhausted iterator", SourceLoc::unknown()))
            }
            Outcome::Suspended(c) => return Outcome::Suspended(c),
            Outcome::Err(e) => return Outcome::Err(e),
        }
        if matches!(self.mode, Mode::DropTrailing { .. }) {
            return Outcome::Ready(self.produced.take().expect("has_next already confirmed produced"));
        }
        self.upstream.borrow_mut().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iter::support::ListIterator;

    fn drain(adapter: Rc<RefCell<dyn ScriptIterator>>) -> Vec<i32> {
        let mut out = Vec::new();
        while let Outcome::Ready(true) = adapter.borrow_mut().has_next() {
            if let Outcome::Ready(v) = adapter.borrow_mut().next() {
                match v {
                    Value::Int32(n) => out.push(n),
                    _ => unreachable!(),
                }
            }
        }
        out
    }

    #[test]
    fn drops_leading_elements() {
        let upstream = ListIterator::new(vec![Value::Int32(1), Value::Int32(2), Value::Int32(3)]);
        let adapter = SkipAdapter::new(upstream, 2);
        assert_eq!(drain(adapter), vec![3]);
    }

    #[test]
    fn negative_skip_drops_the_trailing_elements() {
        let upstream = ListIterator::new(vec![Value::Int32(1), Value::Int32(2), Value::Int32(3), Value::Int32(4)]);
        let adapter = SkipAdapter::new(upstream, -2);
        assert_eq!(drain(adapter), vec![1, 2]);
    }

    #[test]
    fn negative_skip_wider_than_the_stream_yields_nothing() {
        let upstream = ListIterator::new(vec![Value::Int32(1), Value::Int32(2), Value::Int32(3)]);
        let adapter = SkipAdapter::new(upstream, -5);
        assert_eq!(drain(adapter), Vec::<i32>::new());
    }
}
