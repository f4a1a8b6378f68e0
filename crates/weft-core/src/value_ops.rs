//! Arithmetic, comparison, field access, and membership operations over
//! `Value` (spec.md §4.5).
//!
//! Grounded on `raya-core/src/value.rs`'s truthiness/widening shape,
//! generalized from Raya's `i64`/`f64`-only tower to the full
//! int32/int64/float64/decimal lattice spec.md §3 describes.

use std::cmp::Ordering;
use std::rc::Rc;

use rust_decimal::{Decimal, RoundingStrategy};
use weft_sdk::error::{RuntimeError, SourceLoc};
use weft_sdk::numeric;
use weft_sdk::value::{OrderedMap, Value};

/// Tunables for arithmetic that has no single universal answer (spec.md
/// §4.5, §9 open question on decimal scale).
#[derive(Debug, Clone, Copy)]
pub struct ArithmeticOptions {
    /// The minimum number of fractional digits a `decimal / decimal`
    /// division result is rounded to, even when the exact quotient
    /// terminates earlier.
    pub decimal_min_scale: u32,
}

impl Default for ArithmeticOptions {
    fn default() -> Self {
        Self { decimal_min_scale: 10 }
    }
}

fn to_decimal(v: &Value) -> Option<Decimal> {
    match v {
        Value::Int32(i) => Some(Decimal::from(*i)),
        Value::Int64(i) => Some(Decimal::from(*i)),
        Value::Decimal(d) => Some(*d),
        Value::Float64(f) => Decimal::try_from(*f).ok(),
        _ => None,
    }
}

/// The widened numeric "family" two operands settle into for an arithmetic
/// op (spec.md §3: "int32 ⊂ int64 ⊂ float64; decimal stays decimal;
/// decimal+double→decimal").
enum Family {
    Int32,
    Int64,
    Float64,
    Decimal,
}

fn family_of(a: &Value, b: &Value) -> Option<Family> {
    use Value::*;
    Some(match (a, b) {
        (Decimal(_), _) | (_, Decimal(_)) => Family::Decimal,
        (Float64(_), _) | (_, Float64(_)) => Family::Float64,
        (Int64(_), _) | (_, Int64(_)) => Family::Int64,
        (Int32(_), Int32(_)) => Family::Int32,
        _ => return None,
    })
}

macro_rules! numeric_binop {
    ($name:ident, $i_op:tt, $sym:literal) => {
        pub fn $name(a: &Value, b: &Value, loc: SourceLoc, opts: &ArithmeticOptions) -> Result<Value, RuntimeError> {
            match family_of(a, b) {
                Some(Family::Int32) => {
                    let (x, y) = (as_i32(a), as_i32(b));
                    Ok(Value::Int32(x $i_op y))
                }
                Some(Family::Int64) => {
                    let (x, y) = (as_i64(a), as_i64(b));
                    Ok(Value::Int64(x $i_op y))
                }
                Some(Family::Float64) => {
                    let (x, y) = (as_f64(a), as_f64(b));
                    Ok(Value::Float64(x $i_op y))
                }
                Some(Family::Decimal) => {
                    let (x, y) = (to_decimal(a).unwrap(), to_decimal(b).unwrap());
                    let _ = opts;
                    Ok(Value::Decimal(x $i_op y))
                }
                None => non_numeric_binop($sym, a, b, loc, opts),
            }
        }
    };
}

fn as_i32(v: &Value) -> i32 {
    match v {
        Value::Int32(i) => *i,
        _ => unreachable!("family_of guarantees matching variant"),
    }
}
fn as_i64(v: &Value) -> i64 {
    match v {
        Value::Int32(i) => *i as i64,
        Value::Int64(i) => *i,
        _ => unreachable!("family_of guarantees matching variant"),
    }
}
fn as_f64(v: &Value) -> f64 {
    match v {
        Value::Int32(i) => *i as f64,
        Value::Int64(i) => *i as f64,
        Value::Float64(f) => *f,
        _ => unreachable!("family_of guarantees matching variant"),
    }
}

numeric_binop!(sub, -, "-");

/// `*` (spec.md §4.5): numeric multiply when both sides are numeric; string
/// repetition when the left side is a string and the right is a
/// non-negative integer count.
pub fn mul(a: &Value, b: &Value, loc: SourceLoc, opts: &ArithmeticOptions) -> Result<Value, RuntimeError> {
    if let Value::Str(s) = a {
        return repeat_string(s, b, loc);
    }
    match family_of(a, b) {
        Some(Family::Int32) => Ok(Value::Int32(as_i32(a) * as_i32(b))),
        Some(Family::Int64) => Ok(Value::Int64(as_i64(a) * as_i64(b))),
        Some(Family::Float64) => Ok(Value::Float64(as_f64(a) * as_f64(b))),
        Some(Family::Decimal) => Ok(Value::Decimal(to_decimal(a).unwrap() * to_decimal(b).unwrap())),
        None => non_numeric_binop("*", a, b, loc, opts),
    }
}

fn repeat_string(s: &Rc<str>, count: &Value, loc: SourceLoc) -> Result<Value, RuntimeError> {
    let n = match count {
        Value::Int32(n) => *n as i64,
        Value::Int64(n) => *n,
        other => {
            return Err(RuntimeError::type_error(
                format!("cannot apply '*' to string and {}", other.type_name()),
                loc,
            ))
        }
    };
    if n < 0 {
        return Err(RuntimeError::type_error("string repeat count must be non-negative", loc));
    }
    Ok(Value::str(s.repeat(n as usize)))
}

/// `+` (spec.md §4.5): numeric add when both sides are numeric; string
/// concatenation when either side is a string; list append when the left
/// side is a list; right-biased key merge when both sides are maps.
pub fn add(a: &Value, b: &Value, loc: SourceLoc, opts: &ArithmeticOptions) -> Result<Value, RuntimeError> {
    match (a, b) {
        (Value::Str(_), _) | (_, Value::Str(_)) => Ok(Value::str(format!("{a}{b}"))),
        (Value::List(l), other) => {
            let mut items = l.borrow().clone();
            append_rhs(&mut items, other);
            Ok(Value::list(items))
        }
        (Value::Map(l), Value::Map(r)) => Ok(Value::map(l.borrow().merged_with(&r.borrow()))),
        _ => match family_of(a, b) {
            Some(Family::Int32) => Ok(Value::Int32(as_i32(a) + as_i32(b))),
            Some(Family::Int64) => Ok(Value::Int64(as_i64(a) + as_i64(b))),
            Some(Family::Float64) => Ok(Value::Float64(as_f64(a) + as_f64(b))),
            Some(Family::Decimal) => Ok(Value::Decimal(to_decimal(a).unwrap() + to_decimal(b).unwrap())),
            None => non_numeric_binop("+", a, b, loc, opts),
        },
    }
}

/// Appends `rhs` to `items` the way `list += x` does (spec.md's resolved
/// open question: a non-list RHS is appended as a single element; a list
/// RHS is splatted in, consistent with the general `+` rule for lists).
fn append_rhs(items: &mut Vec<Value>, rhs: &Value) {
    match rhs {
        Value::List(r) => items.extend(r.borrow().iter().cloned()),
        other => items.push(other.clone()),
    }
}

/// In-place `+=` on a list field (spec.md §9 resolved open question).
pub fn append_in_place(target: &Rc<std::cell::RefCell<Vec<Value>>>, rhs: &Value) {
    append_rhs(&mut target.borrow_mut(), rhs);
}

fn non_numeric_binop(
    sym: &str,
    a: &Value,
    b: &Value,
    loc: SourceLoc,
    _opts: &ArithmeticOptions,
) -> Result<Value, RuntimeError> {
    Err(RuntimeError::type_error(
        format!("cannot apply '{sym}' to {} and {}", a.type_name(), b.type_name()),
        loc,
    ))
}

/// `/` (spec.md §4.5): integer division truncates; float division follows
/// IEEE 754; decimal division is rounded half-even to at most
/// `opts.decimal_min_scale` fractional digits, with trailing zeros
/// stripped.
pub fn div(a: &Value, b: &Value, loc: SourceLoc, opts: &ArithmeticOptions) -> Result<Value, RuntimeError> {
    match family_of(a, b) {
        Some(Family::Int32) => {
            let y = as_i32(b);
            if y == 0 {
                return Err(RuntimeError::divide_by_zero(loc));
            }
            Ok(Value::Int32(as_i32(a) / y))
        }
        Some(Family::Int64) => {
            let y = as_i64(b);
            if y == 0 {
                return Err(RuntimeError::divide_by_zero(loc));
            }
            Ok(Value::Int64(as_i64(a) / y))
        }
        Some(Family::Float64) => Ok(Value::Float64(as_f64(a) / as_f64(b))),
        Some(Family::Decimal) => {
            let (x, y) = (to_decimal(a).unwrap(), to_decimal(b).unwrap());
            if y.is_zero() {
                return Err(RuntimeError::divide_by_zero(loc));
            }
            // A non-terminating quotient (e.g. 1/3) is rounded half-even to
            // `decimal_min_scale` rather than kept at its natural ~28-digit
            // precision; a terminating one (e.g. 1/4) is rounded the same
            // way and then has its trailing zeros stripped, so it comes
            // back as 0.25, not 0.2500000000.
            let quotient = (x / y)
                .round_dp_with_strategy(opts.decimal_min_scale, RoundingStrategy::MidpointNearestEven)
                .normalize();
            Ok(Value::Decimal(quotient))
        }
        None => non_numeric_binop("/", a, b, loc, opts),
    }
}

/// `%` (spec.md §4.5): same widening rules as `/`, errors identically on a
/// zero divisor.
pub fn rem(a: &Value, b: &Value, loc: SourceLoc, opts: &ArithmeticOptions) -> Result<Value, RuntimeError> {
    match family_of(a, b) {
        Some(Family::Int32) => {
            let y = as_i32(b);
            if y == 0 {
                return Err(RuntimeError::divide_by_zero(loc));
            }
            Ok(Value::Int32(as_i32(a) % y))
        }
        Some(Family::Int64) => {
            let y = as_i64(b);
            if y == 0 {
                return Err(RuntimeError::divide_by_zero(loc));
            }
            Ok(Value::Int64(as_i64(a) % y))
        }
        Some(Family::Float64) => Ok(Value::Float64(as_f64(a) % as_f64(b))),
        Some(Family::Decimal) => {
            let (x, y) = (to_decimal(a).unwrap(), to_decimal(b).unwrap());
            if y.is_zero() {
                return Err(RuntimeError::divide_by_zero(loc));
            }
            Ok(Value::Decimal(x % y))
        }
        None => non_numeric_binop("%", a, b, loc, opts),
    }
}

/// Default ordering with no explicit comparator (spec.md §4.3 `sort`, §9
/// resolved open question 1): `null` sorts before everything; numerics
/// compare across the widening tower; same-dynamic-type values compare
/// structurally; anything else is a type error.
pub fn compare(a: &Value, b: &Value, loc: SourceLoc) -> Result<Ordering, RuntimeError> {
    match (a, b) {
        (Value::Null, Value::Null) => Ok(Ordering::Equal),
        (Value::Null, _) => Ok(Ordering::Less),
        (_, Value::Null) => Ok(Ordering::Greater),
        _ if a.is_numeric() && b.is_numeric() => numeric::cmp(a, b).ok_or_else(|| {
            RuntimeError::type_error(
                format!("cannot compare {} and {}", a.type_name(), b.type_name()),
                loc.clone(),
            )
        }),
        (Value::Str(x), Value::Str(y)) => Ok(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Ok(x.cmp(y)),
        (Value::List(x), Value::List(y)) => {
            let (xb, yb) = (x.borrow(), y.borrow());
            for (p, q) in xb.iter().zip(yb.iter()) {
                match compare(p, q, loc.clone())? {
                    Ordering::Equal => continue,
                    other => return Ok(other),
                }
            }
            Ok(xb.len().cmp(&yb.len()))
        }
        _ => Err(RuntimeError::type_error(
            format!("cannot compare {} and {}", a.type_name(), b.type_name()),
            loc,
        )),
    }
}

/// `in` / `!in` membership (spec.md §4.5): list containment by structural
/// equality, map key containment, substring containment for strings.
pub fn contains(haystack: &Value, needle: &Value) -> bool {
    match haystack {
        Value::List(l) => l.borrow().iter().any(|v| v.structural_eq(needle)),
        Value::Map(m) => match needle {
            Value::Str(k) => m.borrow().contains_key(k),
            _ => false,
        },
        Value::Str(s) => match needle {
            Value::Str(n) => s.contains(n.as_ref()),
            _ => false,
        },
        _ => false,
    }
}

/// Indexed read (spec.md §4.5): bare list/string indexing takes only
/// non-negative indices; a negative index or one at or past the length is a
/// bounds-error.
pub fn index_get(receiver: &Value, index: i64, loc: SourceLoc) -> Result<Value, RuntimeError> {
    match receiver {
        Value::List(l) => {
            let items = l.borrow();
            let idx = normalize_index(index, items.len(), &loc)?;
            Ok(items[idx].clone())
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let idx = normalize_index(index, chars.len(), &loc)?;
            Ok(Value::str(chars[idx].to_string()))
        }
        other => Err(RuntimeError::type_error(
            format!("cannot index into {}", other.type_name()),
            loc,
        )),
    }
}

fn normalize_index(index: i64, len: usize, loc: &SourceLoc) -> Result<usize, RuntimeError> {
    if index < 0 || index as usize >= len {
        return Err(RuntimeError::bounds_error(
            format!("index {index} out of bounds for length {len}"),
            loc.clone(),
        ));
    }
    Ok(index as usize)
}

/// Field read with `.`-access auto-creation ("load-or-create", spec.md
/// §4.5): reading a missing map key returns `null` rather than erroring;
/// only list/string indexing and instance field access are bounds-checked.
pub fn field_get(receiver: &Value, name: &str, loc: SourceLoc) -> Result<Value, RuntimeError> {
    match receiver {
        Value::Map(m) => Ok(m.borrow().get(name).cloned().unwrap_or(Value::Null)),
        Value::Instance(inst) => inst.borrow().get_field(name).cloned().ok_or_else(|| {
            RuntimeError::type_error(format!("no such field '{name}'"), loc)
        }),
        Value::Null => Err(RuntimeError::null_deref(format!("cannot read field '{name}' of null"), loc)),
        other => Err(RuntimeError::type_error(
            format!("cannot read field '{name}' of {}", other.type_name()),
            loc,
        )),
    }
}

/// Writes `value` at `receiver.name`. For maps, a missing intermediate is
/// never created implicitly by this call alone — nested auto-vivification
/// (`a.b.c = 1` creating `a.b` as an empty map) is the caller's
/// responsibility via `get_or_create_map`, matching spec.md §4.5's
/// load-or-create contract for chained assignment targets.
pub fn field_set(receiver: &Value, name: &str, value: Value, loc: SourceLoc) -> Result<(), RuntimeError> {
    match receiver {
        Value::Map(m) => {
            m.borrow_mut().insert(Rc::from(name), value);
            Ok(())
        }
        Value::Instance(inst) => inst.borrow_mut().set_field(name, value, loc),
        Value::Null => Err(RuntimeError::null_deref(format!("cannot set field '{name}' of null"), loc)),
        other => Err(RuntimeError::type_error(
            format!("cannot set field '{name}' of {}", other.type_name()),
            loc,
        )),
    }
}

/// The "load-or-create" half of chained assignment (`a.b.c = 1`): if
/// `receiver.name` is `null` or absent, replaces it with a fresh empty map
/// and returns that map; otherwise returns the existing value if it is
/// already a map, or a type error.
pub fn get_or_create_map(receiver: &Value, name: &str, loc: SourceLoc) -> Result<Value, RuntimeError> {
    match receiver {
        Value::Map(m) => {
            let existing = m.borrow().get(name).cloned();
            match existing {
                None | Some(Value::Null) => {
                    let fresh = Value::map(OrderedMap::new());
                    m.borrow_mut().insert(Rc::from(name), fresh.clone());
                    Ok(fresh)
                }
                Some(v @ Value::Map(_)) => Ok(v),
                Some(other) => Err(RuntimeError::type_error(
                    format!("cannot descend into non-map field '{name}' ({})", other.type_name()),
                    loc,
                )),
            }
        }
        other => Err(RuntimeError::type_error(
            format!("cannot descend into {}", other.type_name()),
            loc,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> SourceLoc {
        SourceLoc::unknown()
    }

    #[test]
    fn add_widens_int32_and_int64() {
        let opts = ArithmeticOptions::default();
        let v = add(&Value::Int32(1), &Value::Int64(2), loc(), &opts).unwrap();
        match v {
            Value::Int64(n) => assert_eq!(n, 3),
            _ => panic!("expected Int64"),
        }
    }

    #[test]
    fn add_concatenates_strings() {
        let opts = ArithmeticOptions::default();
        let v = add(&Value::str("a"), &Value::Int32(1), loc(), &opts).unwrap();
        assert_eq!(v.display_string(), "a1");
    }

    #[test]
    fn divide_by_zero_is_typed_error() {
        let opts = ArithmeticOptions::default();
        let err = div(&Value::Int32(1), &Value::Int32(0), loc(), &opts).unwrap_err();
        assert_eq!(err.kind, weft_sdk::error::ErrorKind::DivideByZero);
    }

    #[test]
    fn compare_sorts_null_first() {
        assert_eq!(compare(&Value::Null, &Value::Int32(1), loc()).unwrap(), Ordering::Less);
        assert_eq!(compare(&Value::Int32(1), &Value::Null, loc()).unwrap(), Ordering::Greater);
    }

    #[test]
    fn compare_mixed_non_numeric_types_is_error() {
        assert!(compare(&Value::str("x"), &Value::Int32(1), loc()).is_err());
    }

    #[test]
    fn negative_index_is_bounds_error() {
        let list = Value::list(vec![Value::Int32(1), Value::Int32(2), Value::Int32(3)]);
        let err = index_get(&list, -1, loc()).unwrap_err();
        assert_eq!(err.kind, weft_sdk::error::ErrorKind::BoundsError);
    }

    #[test]
    fn string_repeat_via_mul() {
        let opts = ArithmeticOptions::default();
        let v = mul(&Value::str("ab"), &Value::Int32(3), loc(), &opts).unwrap();
        assert_eq!(v.display_string(), "ababab");
    }

    #[test]
    fn string_repeat_rejects_negative_count() {
        let opts = ArithmeticOptions::default();
        assert!(mul(&Value::str("ab"), &Value::Int32(-1), loc(), &opts).is_err());
    }

    #[test]
    fn decimal_division_caps_scale_and_strips_trailing_zeros() {
        use std::str::FromStr;

        let opts = ArithmeticOptions { decimal_min_scale: 10 };
        let one_third = div(&Value::Decimal(Decimal::from(1)), &Value::Decimal(Decimal::from(3)), loc(), &opts).unwrap();
        let Value::Decimal(q) = one_third else { panic!("expected decimal") };
        assert!(q.scale() <= 10);
        assert_eq!(q, Decimal::from_str("0.3333333333").unwrap());

        let one_quarter = div(&Value::Decimal(Decimal::from(1)), &Value::Decimal(Decimal::from(4)), loc(), &opts).unwrap();
        let Value::Decimal(q2) = one_quarter else { panic!("expected decimal") };
        assert_eq!(q2.scale(), 2);
        assert_eq!(q2, Decimal::from_str("0.25").unwrap());
    }

    #[test]
    fn map_field_get_missing_key_is_null() {
        let m = Value::map(OrderedMap::new());
        let v = field_get(&m, "missing", loc()).unwrap();
        assert!(v.is_null());
    }
}
