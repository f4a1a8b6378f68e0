//! Numeric widening rules shared by equality and ordering (spec.md §3:
//! "int32 ⊂ int64 ⊂ float64; decimal stays decimal; decimal+double→decimal").

use std::cmp::Ordering;

use rust_decimal::Decimal;

use crate::value::Value;

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Int32(i) => Some(*i as f64),
        Value::Int64(i) => Some(*i as f64),
        Value::Float64(f) => Some(*f),
        Value::Decimal(d) => d.to_string().parse().ok(),
        _ => None,
    }
}

fn as_decimal(v: &Value) -> Option<Decimal> {
    match v {
        Value::Int32(i) => Some(Decimal::from(*i)),
        Value::Int64(i) => Some(Decimal::from(*i)),
        Value::Decimal(d) => Some(*d),
        Value::Float64(f) => Decimal::try_from(*f).ok(),
        _ => None,
    }
}

/// Numeric equality across the widening tower. Any pair where either side
/// is a `Decimal` compares as decimals (matching the "decimal+double→decimal"
/// widening rule); otherwise both sides compare as `f64`.
pub fn eq(a: &Value, b: &Value) -> bool {
    if matches!(a, Value::Decimal(_)) || matches!(b, Value::Decimal(_)) {
        match (as_decimal(a), as_decimal(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    } else {
        match (as_f64(a), as_f64(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }
}

/// Numeric ordering across the widening tower, or `None` if either value is
/// not numeric.
pub fn cmp(a: &Value, b: &Value) -> Option<Ordering> {
    if matches!(a, Value::Decimal(_)) || matches!(b, Value::Decimal(_)) {
        let (x, y) = (as_decimal(a)?, as_decimal(b)?);
        x.partial_cmp(&y)
    } else {
        let (x, y) = (as_f64(a)?, as_f64(b)?);
        x.partial_cmp(&y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widens_across_int_families() {
        assert!(eq(&Value::Int32(3), &Value::Int64(3)));
        assert!(eq(&Value::Int32(3), &Value::Float64(3.0)));
        assert_eq!(cmp(&Value::Int32(2), &Value::Int64(3)), Some(Ordering::Less));
    }

    #[test]
    fn decimal_wins_widening_over_double() {
        let d = Value::Decimal(Decimal::new(25, 1)); // 2.5
        assert!(eq(&d, &Value::Float64(2.5)));
    }
}
