//! Terminal consumers that drain a lazy iterator chain to completion
//! (spec.md §4.3 "terminal operations"). Each is its own small resumable
//! driver for the same reason the adapters are: the upstream `next()` call,
//! or a user callback, may suspend partway through the drain.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use weft_sdk::continuation::Outcome;
use weft_sdk::error::{RuntimeError, SourceLoc};
use weft_sdk::value::{OrderedMap, ScriptIterator, Value};

use super::support::{chain_self, ScriptFn};
use crate::value_ops::{self, ArithmeticOptions};

/// Drives `upstream` to exhaustion, calling `callback` once per element for
/// its side effects. Returns `Value::Null`.
pub fn each(upstream: Rc<RefCell<dyn ScriptIterator>>, callback: ScriptFn) -> Outcome<Value> {
    EachDriver::start(upstream, callback)
}

struct EachDriver {
    upstream: Rc<RefCell<dyn ScriptIterator>>,
    callback: ScriptFn,
    self_ref: Weak<RefCell<EachDriver>>,
}

impl EachDriver {
    fn start(upstream: Rc<RefCell<dyn ScriptIterator>>, callback: ScriptFn) -> Outcome<Value> {
        let holder = Rc::new_cyclic(|weak| {
            RefCell::new(EachDriver {
                upstream,
                callback,
                self_ref: weak.clone(),
            })
        });
        let outcome = holder.borrow_mut().drive();
        outcome
    }

    fn drive(&mut self) -> Outcome<Value> {
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
            Outcome::Ready(v) => self.invoke(v),
            Outcome::Suspended(c) => Outcome::Suspended(chain_self(c, self.self_ref.clone(), Self::after_next)),
            Outcome::Err(e) => Outcome::Err(e),
        }
    }

    fn after_next(&mut self, v: Value) -> Outcome<Value> {
        self.invoke(v)
    }

    fn invoke(&mut self, item: Value) -> Outcome<Value> {
        match (self.callback)(&[item]) {
            Outcome::Ready(_) => self.drive(),
            Outcome::Suspended(c) => Outcome::Suspended(chain_self(c, self.self_ref.clone(), Self::after_callback)),
            Outcome::Err(e) => Outcome::Err(e),
        }
    }

    fn after_callback(&mut self, _v: Value) -> Outcome<Value> {
        self.drive()
    }
}

/// Drains `upstream` into a `Value::List`.
pub fn collect(upstream: Rc<RefCell<dyn ScriptIterator>>) -> Outcome<Value> {
    CollectDriver::start(upstream)
}

struct CollectDriver {
    upstream: Rc<RefCell<dyn ScriptIterator>>,
    items: Vec<Value>,
    self_ref: Weak<RefCell<CollectDriver>>,
}

impl CollectDriver {
    fn start(upstream: Rc<RefCell<dyn ScriptIterator>>) -> Outcome<Value> {
        let holder = Rc::new_cyclic(|weak| {
            RefCell::new(CollectDriver {
                upstream,
                items: Vec::new(),
                self_ref: weak.clone(),
            })
        });
        let outcome = holder.borrow_mut().drive();
        outcome
    }

    fn drive(&mut self) -> Outcome<Value> {
        match self.upstream.borrow_mut().has_next() {
            Outcome::Ready(true) => self.pull(),
            Outcome::Ready(false) => Outcome::Ready(Value::list(std::mem::take(&mut self.items))),
            Outcome::Suspended(c) => Outcome::Suspended(chain_self(c, self.self_ref.clone(), Self::after_has_next)),
            Outcome::Err(e) => Outcome::Err(e),
        }
    }

    fn after_has_next(&mut self, v: Value) -> Outcome<Value> {
        if v.is_truthy() {
            self.pull()
        } else {
            Outcome::Ready(Value::list(std::mem::take(&mut self.items)))
        }
    }

    fn pull(&mut self) -> Outcome<Value> {
        match self.upstream.borrow_mut().next() {
            Outcome::Ready(v) => {
                self.items.push(v);
                self.drive()
            }
            Outcome::Suspended(c) => Outcome::Suspended(chain_self(c, self.self_ref.clone(), Self::after_next)),
            Outcome::Err(e) => Outcome::Err(e),
        }
    }

    fn after_next(&mut self, v: Value) -> Outcome<Value> {
        self.items.push(v);
        self.drive()
    }
}

/// Drains `upstream`, requiring each element to be a two-element `[key,
/// value]` list, into a `Value::Map` (spec.md §4.3 `collectEntries`).
pub fn collect_entries(upstream: Rc<RefCell<dyn ScriptIterator>>) -> Outcome<Value> {
    CollectEntriesDriver::start(upstream)
}

struct CollectEntriesDriver {
    upstream: Rc<RefCell<dyn ScriptIterator>>,
    map: OrderedMap,
    self_ref: Weak<RefCell<CollectEntriesDriver>>,
}

impl CollectEntriesDriver {
    fn start(upstream: Rc<RefCell<dyn ScriptIterator>>) -> Outcome<Value> {
        let holder = Rc::new_cyclic(|weak| {
            RefCell::new(CollectEntriesDriver {
                upstream,
                map: OrderedMap::new(),
                self_ref: weak.clone(),
            })
        });
        let outcome = holder.borrow_mut().drive();
        outcome
    }

    fn drive(&mut self) -> Outcome<Value> {
        match self.upstream.borrow_mut().has_next() {
            Outcome::Ready(true) => self.pull(),
            Outcome::Ready(false) => Outcome::Ready(Value::map(std::mem::take(&mut self.map))),
            Outcome::Suspended(c) => Outcome::Suspended(chain_self(c, self.self_ref.clone(), Self::after_has_next)),
            Outcome::Err(e) => Outcome::Err(e),
        }
    }

    fn after_has_next(&mut self, v: Value) -> Outcome<Value> {
        if v.is_truthy() {
            self.pull()
        } else {
            Outcome::Ready(Value::map(std::mem::take(&mut self.map)))
        }
    }

    fn pull(&mut self) -> Outcome<Value> {
        match self.upstream.borrow_mut().next() {
            Outcome::Ready(v) => self.insert_entry(v),
            Outcome::Suspended(c) => Outcome::Suspended(chain_self(c, self.self_ref.clone(), Self::after_next)),
            Outcome::Err(e) => Outcome::Err(e),
        }
    }

    fn after_next(&mut self, v: Value) -> Outcome<Value> {
        self.insert_entry(v)
    }

    fn insert_entry(&mut self, entry: Value) -> Outcome<Value> {
        match entry_as_pair(&entry) {
            Ok((k, v)) => {
                self.map.insert(k, v);
                self.drive()
            }
            Err(e) => Outcome::Err(e),
        }
    }
}

fn entry_as_pair(entry: &Value) -> Result<(Rc<str>, Value), RuntimeError> {
    match entry {
        Value::List(l) => {
            let items = l.borrow();
            if items.len() != 2 {
                return Err(RuntimeError::type_error(
                    "collectEntries requires [key, value] pairs",
                    SourceLoc::unknown(),
                ));
            }
            let key = match &items[0] {
                Value::Str(s) => s.clone(),
                other => {
                    return Err(RuntimeError::type_error(
                        format!("collectEntries key must be a string, got {}", other.type_name()),
                        SourceLoc::unknown(),
                    ))
                }
            };
            Ok((key, items[1].clone()))
        }
        other => Err(RuntimeError::type_error(
            format!("collectEntries requires [key, value] pairs, got {}", other.type_name()),
            SourceLoc::unknown(),
        )),
    }
}

/// Joins `upstream`'s elements' display forms with `separator` (spec.md
/// §4.3 `join`).
pub fn join(upstream: Rc<RefCell<dyn ScriptIterator>>, separator: &str) -> Outcome<Value> {
    JoinDriver::start(upstream, separator.to_string())
}

struct JoinDriver {
    upstream: Rc<RefCell<dyn ScriptIterator>>,
    separator: String,
    parts: Vec<String>,
    self_ref: Weak<RefCell<JoinDriver>>,
}

impl JoinDriver {
    fn start(upstream: Rc<RefCell<dyn ScriptIterator>>, separator: String) -> Outcome<Value> {
        let holder = Rc::new_cyclic(|weak| {
            RefCell::new(JoinDriver {
                upstream,
                separator,
                parts: Vec::new(),
                self_ref: weak.clone(),
            })
        });
        let outcome = holder.borrow_mut().drive();
        outcome
    }

    fn drive(&mut self) -> Outcome<Value> {
        match self.upstream.borrow_mut().has_next() {
            Outcome::Ready(true) => self.pull(),
            Outcome::Ready(false) => Outcome::Ready(Value::str(self.parts.join(&self.separator))),
            Outcome::Suspended(c) => Outcome::Suspended(chain_self(c, self.self_ref.clone(), Self::after_has_next)),
            Outcome::Err(e) => Outcome::Err(e),
        }
    }

    fn after_has_next(&mut self, v: Value) -> Outcome<Value> {
        if v.is_truthy() {
            self.pull()
        } else {
            Outcome::Ready(Value::str(self.parts.join(&self.separator)))
        }
    }

    fn pull(&mut self) -> Outcome<Value> {
        match self.upstream.borrow_mut().next() {
            Outcome::Ready(v) => {
                self.parts.push(v.display_string());
                self.drive()
            }
            Outcome::Suspended(c) => Outcome::Suspended(chain_self(c, self.self_ref.clone(), Self::after_next)),
            Outcome::Err(e) => Outcome::Err(e),
        }
    }

    fn after_next(&mut self, v: Value) -> Outcome<Value> {
        self.parts.push(v.display_string());
        self.drive()
    }
}

/// Folds `upstream` with a user-supplied binary function starting from
/// `seed` (spec.md §4.3 `reduce`).
pub fn reduce(upstream: Rc<RefCell<dyn ScriptIterator>>, seed: Value, op: ScriptFn) -> Outcome<Value> {
    ReduceDriver::start(upstream, seed, op)
}

struct ReduceDriver {
    upstream: Rc<RefCell<dyn ScriptIterator>>,
    op: ScriptFn,
    acc: Value,
    self_ref: Weak<RefCell<ReduceDriver>>,
}

impl ReduceDriver {
    fn start(upstream: Rc<RefCell<dyn ScriptIterator>>, seed: Value, op: ScriptFn) -> Outcome<Value> {
        let holder = Rc::new_cyclic(|weak| {
            RefCell::new(ReduceDriver {
                upstream,
                op,
                acc: seed,
                self_ref: weak.clone(),
            })
        });
        let outcome = holder.borrow_mut().drive();
        outcome
    }

    fn drive(&mut self) -> Outcome<Value> {
        match self.upstream.borrow_mut().has_next() {
            Outcome::Ready(true) => self.pull(),
            Outcome::Ready(false) => Outcome::Ready(self.acc.clone()),
            Outcome::Suspended(c) => Outcome::Suspended(chain_self(c, self.self_ref.clone(), Self::after_has_next)),
            Outcome::Err(e) => Outcome::Err(e),
        }
    }

    fn after_has_next(&mut self, v: Value) -> Outcome<Value> {
        if v.is_truthy() {
            self.pull()
        } else {
            Outcome::Ready(self.acc.clone())
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
        match (self.op)(&[self.acc.clone(), item]) {
            Outcome::Ready(v) => {
                self.acc = v;
                self.drive()
            }
            Outcome::Suspended(c) => Outcome::Suspended(chain_self(c, self.self_ref.clone(), Self::after_op)),
            Outcome::Err(e) => Outcome::Err(e),
        }
    }

    fn after_op(&mut self, v: Value) -> Outcome<Value> {
        self.acc = v;
        self.drive()
    }
}

/// Sums `upstream`'s elements using the runtime's numeric widening rules
/// (spec.md §4.3 `sum`): no user callback, so the only suspension source is
/// upstream itself.
pub fn sum(upstream: Rc<RefCell<dyn ScriptIterator>>) -> Outcome<Value> {
    SumDriver::start(upstream)
}

struct SumDriver {
    upstream: Rc<RefCell<dyn ScriptIterator>>,
    acc: Value,
    self_ref: Weak<RefCell<SumDriver>>,
}

impl SumDriver {
    fn start(upstream: Rc<RefCell<dyn ScriptIterator>>) -> Outcome<Value> {
        let holder = Rc::new_cyclic(|weak| {
            RefCell::new(SumDriver {
                upstream,
                acc: Value::Int32(0),
                self_ref: weak.clone(),
            })
        });
        let outcome = holder.borrow_mut().drive();
        outcome
    }

    fn drive(&mut self) -> Outcome<Value> {
        match self.upstream.borrow_mut().has_next() {
            Outcome::Ready(true) => self.pull(),
            Outcome::Ready(false) => Outcome::Ready(self.acc.clone()),
            Outcome::Suspended(c) => Outcome::Suspended(chain_self(c, self.self_ref.clone(), Self::after_has_next)),
            Outcome::Err(e) => Outcome::Err(e),
        }
    }

    fn after_has_next(&mut self, v: Value) -> Outcome<Value> {
        if v.is_truthy() {
            self.pull()
        } else {
            Outcome::Ready(self.acc.clone())
        }
    }

    fn pull(&mut self) -> Outcome<Value> {
        match self.upstream.borrow_mut().next() {
            Outcome::Ready(v) => self.accumulate(v),
            Outcome::Suspended(c) => Outcome::Suspended(chain_self(c, self.self_ref.clone(), Self::after_next)),
            Outcome::Err(e) => Outcome::Err(e),
        }
    }

    fn after_next(&mut self, v: Value) -> Outcome<Value> {
        self.accumulate(v)
    }

    fn accumulate(&mut self, item: Value) -> Outcome<Value> {
        match value_ops::add(&self.acc, &item, SourceLoc::unknown(), &ArithmeticOptions::default()) {
            Ok(v) => {
                self.acc = v;
                self.drive()
            }
            Err(e) => Outcome::Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iter::support::ListIterator;

    #[test]
    fn collect_drains_into_a_list() {
        let upstream = ListIterator::new(vec![Value::Int32(1), Value::Int32(2)]);
        match collect(upstream) {
            Outcome::Ready(Value::List(l)) => assert_eq!(l.borrow().len(), 2),
            _ => panic!("expected a list"),
        }
    }

    #[test]
    fn sum_widens_across_numeric_families() {
        let upstream = ListIterator::new(vec![Value::Int32(1), Value::Int64(2), Value::Float64(0.5)]);
        match sum(upstream) {
            Outcome::Ready(Value::Float64(n)) => assert!((n - 3.5).abs() < 1e-9),
            _ => panic!("unexpected outcome"),
        }
    }

    #[test]
    fn reduce_folds_with_seed() {
        let upstream = ListIterator::new(vec![Value::Int32(1), Value::Int32(2), Value::Int32(3)]);
        let op: ScriptFn = Rc::new(|args| {
            let a = match &args[0] {
                Value::Int32(n) => *n,
                _ => unreachable!(),
            };
            let b = match &args[1] {
                Value::Int32(n) => *n,
                _ => unreachable!(),
            };
            Outcome::Ready(Value::Int32(a + b))
        });
        match reduce(upstream, Value::Int32(10), op) {
            Outcome::Ready(Value::Int32(n)) => assert_eq!(n, 16),
            _ => panic!("unexpected outcome"),
        }
    }

    #[test]
    fn join_uses_display_form() {
        let upstream = ListIterator::new(vec![Value::Int32(1), Value::Int32(2), Value::Int32(3)]);
        match join(upstream, ", ") {
            Outcome::Ready(Value::Str(s)) => assert_eq!(&*s, "1, 2, 3"),
            _ => panic!("unexpected outcome"),
        }
    }
}
