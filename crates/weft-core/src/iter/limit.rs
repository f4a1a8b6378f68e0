//! `limit` (spec.md §4.3): caps the stream at `n` elements. `limit(0)`
//! yields nothing regardless of what upstream would have produced (resolved
//! Open Question: adapters compose independently, no special-casing a
//! negative `skip` ahead of it). A negative `n` instead withholds the
//! trailing `|n|` elements: everything else passes through as soon as it's
//! known not to be part of that trailing run, via a circular buffer that
//! briefly holds `|n|+1` entries before evicting its oldest one.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use weft_sdk::continuation::Outcome;
use weft_sdk::error::{RuntimeError, SourceLoc};
use weft_sdk::value::{ScriptIterator, Value};

use super::support::chain_self;

enum Mode {
    Counted { remaining: u64 },
    TrailingDrop { window: usize, buffer: VecDeque<Value> },
}

pub struct LimitAdapter {
    upstream: Rc<RefCell<dyn ScriptIterator>>,
    mode: Mode,
    produced: Option<Value>,
    self_ref: Weak<RefCell<LimitAdapter>>,
}

impl LimitAdapter {
    pub fn new(upstream: Rc<RefCell<dyn ScriptIterator>>, n: i64) -> Rc<RefCell<dyn ScriptIterator>> {
        let mode = if n >= 0 {
            Mode::Counted { remaining: n as u64 }
        } else {
            Mode::TrailingDrop {
                window: (-n) as usize,
                buffer: VecDeque::new(),
            }
        };
        Rc::new_cyclic(|weak| {
            RefCell::new(LimitAdapter {
                upstream,
                mode,
                produced: None,
                self_ref: weak.clone(),
            })
        })
    }

    fn window(&self) -> usize {
        match &self.mode {
            Mode::TrailingDrop { window, .. } => *window,
            Mode::Counted { .. } => unreachable!("advance only drives TrailingDrop mode"),
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
        if let Mode::TrailingDrop { buffer, .. } = &mut self.mode {
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

impl ScriptIterator for LimitAdapter {
    fn has_next(&mut self) -> Outcome<bool> {
        match &self.mode {
            Mode::Counted { remaining } => {
                if *remaining == 0 {
                    return Outcome::Ready(false);
                }
                self.upstream.borrow_mut().has_next()
            }
            Mode::TrailingDrop { .. } => {
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
        if matches!(self.mode, Mode::TrailingDrop { .. }) {
            return Outcome::Ready(self.produced.take().expect("has_next already confirmed produced"));
        }
        match self.upstream.borrow_mut().next() {
            Outcome::Ready(v) => {
                if let Mode::Counted { remaining } = &mut self.mode {
                    *remaining -= 1;
                }
                Outcome::Ready(v)
            }
            other => other,
        }
    }
}
