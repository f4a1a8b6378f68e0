//! `sort` with a user-supplied comparator (spec.md §4.3). Sorting needs the
//! whole stream in hand, so this adapter first drains upstream into a
//! buffer, then runs a bottom-up iterative merge sort over it — no
//! recursion, so the in-progress pass lives entirely in struct fields and
//! survives a comparator call suspending mid-merge.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use weft_sdk::continuation::Outcome;
use weft_sdk::error::{RuntimeError, SourceLoc};
use weft_sdk::value::{ScriptIterator, Value};

use super::support::chain_self;
use super::support::ScriptFn;

pub struct SortAdapter {
    upstream: Rc<RefCell<dyn ScriptIterator>>,
    comparator: ScriptFn,

    buffer: Vec<Value>,
    buffered: bool,

    width: usize,
    len: usize,
    src: Vec<Value>,
    dst: Vec<Value>,
    run_start: usize,
    run_left_end: usize,
    run_right_end: usize,
    window_active: bool,
    left_i: usize,
    right_i: usize,
    out_i: usize,

    sorted: Option<Vec<Value>>,
    replay_index: usize,

    self_ref: Weak<RefCell<SortAdapter>>,
}

impl SortAdapter {
    pub fn new(upstream: Rc<RefCell<dyn ScriptIterator>>, comparator: ScriptFn) -> Rc<RefCell<dyn ScriptIterator>> {
        Rc::new_cyclic(|weak| {
            RefCell::new(SortAdapter {
                upstream,
                comparator,
                buffer: Vec::new(),
                buffered: false,
                width: 1,
                len: 0,
                src: Vec::new(),
                dst: Vec::new(),
                run_start: 0,
                run_left_end: 0,
                run_right_end: 0,
                window_active: false,
                left_i: 0,
                right_i: 0,
                out_i: 0,
                sorted: None,
                replay_index: 0,
                self_ref: weak.clone(),
            })
        })
    }

    // --- phase 1: buffer the whole upstream ---

    fn fill_buffer(&mut self) -> Outcome<Value> {
        match self.upstream.borrow_mut().has_next() {
            Outcome::Ready(true) => self.pull_buffer_value(),
            Outcome::Ready(false) => {
                self.start_sort();
                Outcome::Ready(Value::Null)
            }
            Outcome::Suspended(c) => Outcome::Suspended(chain_self(c, self.self_ref.clone(), Self::after_buffer_has_next)),
            Outcome::Err(e) => Outcome::Err(e),
        }
    }

    fn after_buffer_has_next(&mut self, v: Value) -> Outcome<Value> {
        if v.is_truthy() {
            self.pull_buffer_value()
        } else {
            self.start_sort();
            Outcome::Ready(Value::Null)
        }
    }

    fn pull_buffer_value(&mut self) -> Outcome<Value> {
        match self.upstream.borrow_mut().next() {
            Outcome::Ready(v) => {
                self.buffer.push(v);
                self.fill_buffer()
            }
            Outcome::Suspended(c) => Outcome::Suspended(chain_self(c, self.self_ref.clone(), Self::after_buffer_next)),
            Outcome::Err(e) => Outcome::Err(e),
        }
    }

    fn after_buffer_next(&mut self, v: Value) -> Outcome<Value> {
        self.buffer.push(v);
        self.fill_buffer()
    }

    fn start_sort(&mut self) {
        self.buffered = true;
        self.len = self.buffer.len();
        self.src = std::mem::take(&mut self.buffer);
        self.dst = vec![Value::Null; self.len];
        self.width = 1;
        self.run_start = 0;
        self.window_active = false;
        if self.len <= 1 {
            self.sorted = Some(self.src.clone());
        }
    }

    // --- phase 2: bottom-up merge sort ---

    fn drive_sort(&mut self) -> Outcome<Value> {
        loop {
            if self.sorted.is_some() {
                return Outcome::Ready(Value::Null);
            }
            if self.width >= self.len {
                self.sorted = Some(std::mem::take(&mut self.src));
                return Outcome::Ready(Value::Null);
            }
            if self.run_start >= self.len {
                std::mem::swap(&mut self.src, &mut self.dst);
                self.width *= 2;
                self.run_start = 0;
                continue;
            }
            if !self.window_active {
                self.run_left_end = (self.run_start + self.width).min(self.len);
                self.run_right_end = (self.run_start + 2 * self.width).min(self.len);
                self.left_i = 0;
                self.right_i = 0;
                self.out_i = 0;
                self.window_active = true;
            }
            if self.run_start + self.out_i >= self.run_right_end {
                self.run_start += 2 * self.width;
                self.window_active = false;
                continue;
            }
            let left_pos = self.run_start + self.left_i;
            let right_pos = self.run_left_end + self.right_i;
            if left_pos >= self.run_left_end {
                self.take_right(right_pos);
                continue;
            }
            if right_pos >= self.run_right_end {
                self.take_left(left_pos);
                continue;
            }
            match (self.comparator)(&[self.src[left_pos].clone(), self.src[right_pos].clone()]) {
                Outcome::Ready(v) => match take_le(&v) {
                    Ok(left_first) => {
                        if left_first {
                            self.take_left(left_pos);
                        } else {
                            self.take_right(right_pos);
                        }
                        continue;
                    }
                    Err(e) => return Outcome::Err(e),
                },
                Outcome::Suspended(c) => {
                    return Outcome::Suspended(chain_self(c, self.self_ref.clone(), Self::after_comparator));
                }
                Outcome::Err(e) => return Outcome::Err(e),
            }
        }
    }

    fn after_comparator(&mut self, v: Value) -> Outcome<Value> {
        match take_le(&v) {
            Ok(left_first) => {
                let left_pos = self.run_start + self.left_i;
                let right_pos = self.run_left_end + self.right_i;
                if left_first {
                    self.take_left(left_pos);
                } else {
                    self.take_right(right_pos);
                }
                self.drive_sort()
            }
            Err(e) => Outcome::Err(e),
        }
    }

    fn take_left(&mut self, pos: usize) {
        self.dst[self.run_start + self.out_i] = self.src[pos].clone();
        self.left_i += 1;
        self.out_i += 1;
    }

    fn take_right(&mut self, pos: usize) {
        self.dst[self.run_start + self.out_i] = self.src[pos].clone();
        self.right_i += 1;
        self.out_i += 1;
    }
}

/// Interprets a comparator's numeric result: `<= 0` means the left operand
/// sorts first (or ties with it, preserving stability).
fn take_le(v: &Value) -> Result<bool, RuntimeError> {
    let n = match v {
        Value::Int32(n) => *n as f64,
        Value::Int64(n) => *n as f64,
        Value::Float64(n) => *n,
        Value::Decimal(d) => d.to_string().parse::<f64>().unwrap_or(0.0),
        other => {
            return Err(RuntimeError::type_error(
                format!("comparator must return a number, got {}", other.type_name()),
                SourceLoc::unknown(),
            ))
        }
    };
    Ok(n <= 0.0)
}

impl ScriptIterator for SortAdapter {
    fn has_next(&mut self) -> Outcome<bool> {
        if self.sorted.is_none() {
            let outcome = if !self.buffered { self.fill_buffer() } else { self.drive_sort() };
            match outcome {
                Outcome::Ready(_) => {}
                Outcome::Suspended(c) => return Outcome::Suspended(c),
                Outcome::Err(e) => return Outcome::Err(e),
            }
        }
        match &self.sorted {
            Some(v) => Outcome::Ready(self.replay_index < v.len()),
            None => {
                // fill_buffer completed but sort hasn't started driving yet
                // (len<=1 short-circuit happens inside start_sort already).
                Outcome::Ready(false)
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
        let v = self.sorted.as_ref().unwrap()[self.replay_index].clone();
        self.replay_index += 1;
        Outcome::Ready(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iter::support::ListIterator;

    fn numeric_asc() -> ScriptFn {
        Rc::new(|args| {
            let a = match &args[0] {
                Value::Int32(n) => *n,
                _ => unreachable!(),
            };
            let b = match &args[1] {
                Value::Int32(n) => *n,
                _ => unreachable!(),
            };
            Outcome::Ready(Value::Int32(a - b))
        })
    }

    #[test]
    fn sorts_ascending() {
        let upstream = ListIterator::new(vec![Value::Int32(5), Value::Int32(1), Value::Int32(4), Value::Int32(2), Value::Int32(3)]);
        let adapter = SortAdapter::new(upstream, numeric_asc());
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
        assert_eq!(nums, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn single_element_sorts_trivially() {
        let upstream = ListIterator::new(vec![Value::Int32(7)]);
        let adapter = SortAdapter::new(upstream, numeric_asc());
        assert!(matches!(adapter.borrow_mut().has_next(), Outcome::Ready(true)));
        assert!(matches!(adapter.borrow_mut().next(), Outcome::Ready(Value::Int32(7))));
        assert!(matches!(adapter.borrow_mut().has_next(), Outcome::Ready(false)));
    }
}
