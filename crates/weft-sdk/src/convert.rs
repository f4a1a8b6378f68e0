//! Conversions between `Value` and native Rust types (spec.md §4.2, the
//! uniform wrapper signature's argument/return shaping).
//!
//! Grounded on `raya-sdk/src/convert.rs`'s `FromNativeObject`/
//! `ToNativeObject` pair.

use crate::error::{RuntimeError, SourceLoc};
use crate::value::Value;

pub trait FromValue: Sized {
    fn from_value(value: &Value, loc: &SourceLoc) -> Result<Self, RuntimeError>;
}

pub trait IntoValue {
    fn into_value(self) -> Value;
}

macro_rules! impl_int_from_value {
    ($t:ty) => {
        impl FromValue for $t {
            fn from_value(value: &Value, loc: &SourceLoc) -> Result<Self, RuntimeError> {
                match value {
                    Value::Int32(i) => Ok(*i as $t),
                    Value::Int64(i) => Ok(*i as $t),
                    other => Err(RuntimeError::type_error(
                        format!("expected integer, got {}", other.type_name()),
                        loc.clone(),
                    )),
                }
            }
        }

        impl IntoValue for $t {
            fn into_value(self) -> Value {
                Value::Int64(self as i64)
            }
        }
    };
}

impl_int_from_value!(i32);
impl_int_from_value!(i64);
impl_int_from_value!(usize);

impl FromValue for f64 {
    fn from_value(value: &Value, loc: &SourceLoc) -> Result<Self, RuntimeError> {
        match value {
            Value::Int32(i) => Ok(*i as f64),
            Value::Int64(i) => Ok(*i as f64),
            Value::Float64(f) => Ok(*f),
            other => Err(RuntimeError::type_error(
                format!("expected number, got {}", other.type_name()),
                loc.clone(),
            )),
        }
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::Float64(self)
    }
}

impl FromValue for bool {
    fn from_value(value: &Value, loc: &SourceLoc) -> Result<Self, RuntimeError> {
        match value {
            Value::Bool(b) => Ok(*b),
            other => Err(RuntimeError::type_error(
                format!("expected boolean, got {}", other.type_name()),
                loc.clone(),
            )),
        }
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl FromValue for String {
    fn from_value(value: &Value, loc: &SourceLoc) -> Result<Self, RuntimeError> {
        match value {
            Value::Str(s) => Ok(s.to_string()),
            other => Err(RuntimeError::type_error(
                format!("expected string, got {}", other.type_name()),
                loc.clone(),
            )),
        }
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::str(self)
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::str(self.to_string())
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        match self {
            Some(v) => v.into_value(),
            None => Value::Null,
        }
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Value {
        Value::list(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl FromValue for Value {
    fn from_value(value: &Value, _loc: &SourceLoc) -> Result<Self, RuntimeError> {
        Ok(value.clone())
    }
}
