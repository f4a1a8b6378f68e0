//! The dynamic `Value` type (spec.md §3) and its heap-allocated variants.
//!
//! Composite variants (`List`, `Map`, `Instance`) use `Rc<RefCell<_>>` rather
//! than the teacher's NaN-boxed, GC-traced `Value(u64)` — see SPEC_FULL.md
//! §4 and DESIGN.md for why: single-threaded-per-script execution (spec.md
//! §5) makes reference counting sufficient, and nothing in spec.md asks for
//! a tracing collector.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rust_decimal::Decimal;
use rustc_hash::FxHashMap;

use crate::class::Instance;
use crate::descriptor::FunctionDescriptor;

/// A dynamically-typed runtime value.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    Decimal(Decimal),
    Str(Rc<str>),
    List(Rc<RefCell<Vec<Value>>>),
    Map(Rc<RefCell<OrderedMap>>),
    Handle(Rc<Handle>),
    Instance(Rc<RefCell<Instance>>),
    Iterator(Rc<RefCell<dyn ScriptIterator>>),
}

/// Tagged variants a method-handle `Value` can take (spec.md §9: "Dynamic
/// dispatch through method handles. Model as tagged variants: builtin
/// function, user-defined function, bound-instance method,
/// closure-over-environment.").
pub enum Handle {
    Builtin(Rc<FunctionDescriptor>),
    UserFunction {
        descriptor: Rc<FunctionDescriptor>,
        compiled_id: u64,
    },
    BoundMethod {
        receiver: Value,
        descriptor: Rc<FunctionDescriptor>,
    },
    Closure {
        descriptor: Rc<FunctionDescriptor>,
        captured: Rc<RefCell<Vec<Value>>>,
    },
}

/// A pull-based, possibly-suspending element source (spec.md §3 `Iterator`,
/// §4.3). Implemented by every adapter in `weft-core::iter`.
///
/// Both operations may suspend; the generic outcome type lives in
/// `crate::continuation::Outcome` so the full `Continuation` machinery
/// doesn't need to be imported here.
pub trait ScriptIterator {
    fn has_next(&mut self) -> crate::continuation::Outcome<bool>;
    fn next(&mut self) -> crate::continuation::Outcome<Value>;
}

/// An order-preserving string-keyed map (spec.md §3: "ordered-key map of
/// string→Value"). Backed by an append-only `Vec` plus an index for O(1)
/// lookup, mirroring insertion-order semantics (JS-object-like), not a
/// sorted map.
#[derive(Default, Clone)]
pub struct OrderedMap {
    entries: Vec<(Rc<str>, Value)>,
    index: FxHashMap<Rc<str>, usize>,
}

impl OrderedMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        if let Some(&i) = self.index.get(key) {
            Some(&mut self.entries[i].1)
        } else {
            None
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Insert or update `key`. Updating an existing key keeps its original
    /// position (insertion order is preserved, not refreshed).
    pub fn insert(&mut self, key: impl Into<Rc<str>>, value: Value) {
        let key = key.into();
        if let Some(&i) = self.index.get(&key) {
            self.entries[i].1 = value;
        } else {
            self.index.insert(key.clone(), self.entries.len());
            self.entries.push((key, value));
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let i = self.index.remove(key)?;
        let (_, value) = self.entries.remove(i);
        for (_, idx) in self.index.iter_mut() {
            if *idx > i {
                *idx -= 1;
            }
        }
        Some(value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Rc<str>, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &Rc<str>> {
        self.entries.iter().map(|(k, _)| k)
    }

    /// Right-biased merge used by `map + map` (spec.md §4.5): keys from
    /// `other` overwrite keys already present in `self`.
    pub fn merged_with(&self, other: &OrderedMap) -> OrderedMap {
        let mut merged = self.clone();
        for (k, v) in other.iter() {
            merged.insert(k.clone(), v.clone());
        }
        merged
    }
}

impl Value {
    pub fn str(s: impl Into<Rc<str>>) -> Self {
        Value::Str(s.into())
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn map(map: OrderedMap) -> Self {
        Value::Map(Rc::new(RefCell::new(map)))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Value::Int32(_) | Value::Int64(_) | Value::Float64(_) | Value::Decimal(_)
        )
    }

    /// Truthiness (spec.md §4.5): null⇒false; bool⇒self; number⇒non-zero;
    /// string/list/map/array⇒non-empty; object/handle/iterator⇒true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int32(i) => *i != 0,
            Value::Int64(i) => *i != 0,
            Value::Float64(f) => *f != 0.0,
            Value::Decimal(d) => !d.is_zero(),
            Value::Str(s) => !s.is_empty(),
            Value::List(l) => !l.borrow().is_empty(),
            Value::Map(m) => !m.borrow().is_empty(),
            Value::Handle(_) | Value::Instance(_) | Value::Iterator(_) => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int32(_) => "int",
            Value::Int64(_) => "long",
            Value::Float64(_) => "double",
            Value::Decimal(_) => "decimal",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Handle(_) => "function",
            Value::Instance(_) => "instance",
            Value::Iterator(_) => "iterator",
        }
    }

    /// Structural, recursive equality (spec.md §4.5). Class instances are
    /// equal only when classes match and every field value compares equal.
    /// Cyclic structures are detected by identity so this never infinitely
    /// recurses (spec.md §9's cyclic-graph note, applied to equality as
    /// well as printing).
    pub fn structural_eq(&self, other: &Value) -> bool {
        let mut seen = Vec::new();
        eq_inner(self, other, &mut seen)
    }

    /// Render for display, detecting self-reference by identity and
    /// substituting a placeholder instead of recursing forever (spec.md §9).
    pub fn display_string(&self) -> String {
        let mut seen: Vec<usize> = Vec::new();
        let mut out = String::new();
        write_value(self, &mut seen, &mut out);
        out
    }
}

fn ptr_id(v: &Value) -> Option<usize> {
    match v {
        Value::List(l) => Some(Rc::as_ptr(l) as usize),
        Value::Map(m) => Some(Rc::as_ptr(m) as usize),
        Value::Instance(i) => Some(Rc::as_ptr(i) as usize),
        _ => None,
    }
}

fn eq_inner(a: &Value, b: &Value, seen: &mut Vec<(usize, usize)>) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::List(x), Value::List(y)) => {
            if Rc::ptr_eq(x, y) {
                return true;
            }
            let key = (Rc::as_ptr(x) as usize, Rc::as_ptr(y) as usize);
            if seen.contains(&key) {
                return true;
            }
            seen.push(key);
            let (xb, yb) = (x.borrow(), y.borrow());
            xb.len() == yb.len() && xb.iter().zip(yb.iter()).all(|(p, q)| eq_inner(p, q, seen))
        }
        (Value::Map(x), Value::Map(y)) => {
            if Rc::ptr_eq(x, y) {
                return true;
            }
            let key = (Rc::as_ptr(x) as usize, Rc::as_ptr(y) as usize);
            if seen.contains(&key) {
                return true;
            }
            seen.push(key);
            let (xb, yb) = (x.borrow(), y.borrow());
            xb.len() == yb.len()
                && xb
                    .iter()
                    .all(|(k, v)| yb.get(k).is_some_and(|ov| eq_inner(v, ov, seen)))
        }
        (Value::Instance(x), Value::Instance(y)) => {
            if Rc::ptr_eq(x, y) {
                return true;
            }
            let key = (Rc::as_ptr(x) as usize, Rc::as_ptr(y) as usize);
            if seen.contains(&key) {
                return true;
            }
            seen.push(key);
            let (xb, yb) = (x.borrow(), y.borrow());
            xb.class_name() == yb.class_name()
                && xb.field_names().eq(yb.field_names())
                && xb
                    .field_names()
                    .all(|n| eq_inner(xb.get_field(n).unwrap(), yb.get_field(n).unwrap(), seen))
        }
        _ if a.is_numeric() && b.is_numeric() => crate::numeric::eq(a, b),
        _ => false,
    }
}

fn write_value(v: &Value, seen: &mut Vec<usize>, out: &mut String) {
    use std::fmt::Write;
    match v {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => {
            let _ = write!(out, "{b}");
        }
        Value::Int32(i) => {
            let _ = write!(out, "{i}");
        }
        Value::Int64(i) => {
            let _ = write!(out, "{i}");
        }
        Value::Float64(f) => {
            let _ = write!(out, "{f}");
        }
        Value::Decimal(d) => {
            let _ = write!(out, "{d}");
        }
        Value::Str(s) => {
            let _ = write!(out, "{s}");
        }
        Value::List(l) => {
            if let Some(id) = ptr_id(v) {
                if seen.contains(&id) {
                    out.push_str("[...]");
                    return;
                }
                seen.push(id);
            }
            out.push('[');
            for (i, item) in l.borrow().iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(item, seen, out);
            }
            out.push(']');
            seen.pop();
        }
        Value::Map(m) => {
            if let Some(id) = ptr_id(v) {
                if seen.contains(&id) {
                    out.push_str("{...}");
                    return;
                }
                seen.push(id);
            }
            out.push('{');
            for (i, (k, val)) in m.borrow().iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "{k}: ");
                write_value(val, seen, out);
            }
            out.push('}');
            seen.pop();
        }
        Value::Handle(_) => out.push_str("<function>"),
        Value::Iterator(_) => out.push_str("<iterator>"),
        Value::Instance(inst) => {
            if let Some(id) = ptr_id(v) {
                if seen.contains(&id) {
                    let _ = write!(out, "{}{{...}}", inst.borrow().class_name());
                    return;
                }
                seen.push(id);
            }
            let b = inst.borrow();
            let _ = write!(out, "{}{{", b.class_name());
            for (i, name) in b.field_names().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "{name}: ");
                write_value(b.get_field(name).unwrap(), seen, out);
            }
            out.push('}');
            seen.pop();
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.type_name(), self.display_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_string())
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::Int32(0).is_truthy());
        assert!(Value::Int32(1).is_truthy());
        assert!(!Value::str("").is_truthy());
        assert!(Value::str("x").is_truthy());
        assert!(!Value::list(vec![]).is_truthy());
        assert!(Value::list(vec![Value::Null]).is_truthy());
    }

    #[test]
    fn ordered_map_preserves_insertion_order() {
        let mut m = OrderedMap::new();
        m.insert("b", Value::Int32(2));
        m.insert("a", Value::Int32(1));
        m.insert("b", Value::Int32(20));
        let keys: Vec<_> = m.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(m.get("b").unwrap().structural_eq(&Value::Int32(20)), true);
    }

    #[test]
    fn structural_equality_for_lists() {
        let a = Value::list(vec![Value::Int32(1), Value::str("x")]);
        let b = Value::list(vec![Value::Int32(1), Value::str("x")]);
        assert!(a.structural_eq(&b));
        let c = Value::list(vec![Value::Int32(2)]);
        assert!(!a.structural_eq(&c));
    }

    #[test]
    fn self_referential_list_prints_placeholder() {
        let inner = Rc::new(RefCell::new(vec![Value::Int32(1)]));
        let v = Value::List(inner.clone());
        inner.borrow_mut().push(v.clone());
        let s = v.display_string();
        assert!(s.contains("[...]"));
    }
}
