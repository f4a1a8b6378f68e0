//! Checkpoint byte format (spec.md §6, feature `checkpoint`).
//!
//! Grounded on `raya-core/src/snapshot/format.rs`'s magic/version/segment
//! shape, but serialized through `serde_json` rather than the teacher's
//! raw-binary + SHA-256-checksum layout: a suspended `Continuation` carries
//! boxed Rust closures (`ResumeFn`) as its resume handles, and closures
//! can't be serialized by any format. A checkpoint can only be taken
//! between top-level statements, when no continuation is pending — it
//! captures global bindings, not an in-flight suspension. `Host::
//! save_checkpoint`/`delete_checkpoint` (spec.md §5) are the hook points an
//! embedder calls at those quiescent boundaries.

use std::rc::Rc;

use serde::{Deserialize, Serialize};
use weft_sdk::error::{RuntimeError, SourceLoc};
use weft_sdk::value::{OrderedMap, Value};

const MAGIC: &str = "WEFT_CHECKPOINT";
const FORMAT_VERSION: u32 = 1;

/// A checkpoint of a script's global bindings at a quiescent point (spec.md
/// §6). Does not capture a pending `Continuation` — see module docs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointImage {
    magic: String,
    version: u32,
    pub created_at_millis: u64,
    globals: Vec<(String, CheckpointValue)>,
}

impl CheckpointImage {
    pub fn capture(globals: &OrderedMap, created_at_millis: u64) -> Result<Self, RuntimeError> {
        let mut out = Vec::with_capacity(globals.len());
        for (k, v) in globals.iter() {
            out.push((k.to_string(), CheckpointValue::from_value(v)?));
        }
        Ok(CheckpointImage {
            magic: MAGIC.to_string(),
            version: FORMAT_VERSION,
            created_at_millis,
            globals: out,
        })
    }

    pub fn restore(self) -> Result<OrderedMap, RuntimeError> {
        if self.magic != MAGIC {
            return Err(RuntimeError::type_error(
                "not a checkpoint image",
                SourceLoc::unknown(),
            ));
        }
        if self.version != FORMAT_VERSION {
            return Err(RuntimeError::type_error(
                format!(
                    "unsupported checkpoint version {} (expected {})",
                    self.version, FORMAT_VERSION
                ),
                SourceLoc::unknown(),
            ));
        }
        let mut globals = OrderedMap::new();
        for (k, v) in self.globals {
            globals.insert(k, v.into_value());
        }
        Ok(globals)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, RuntimeError> {
        serde_json::to_vec(self).map_err(|e| RuntimeError::type_error(e.to_string(), SourceLoc::unknown()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RuntimeError> {
        serde_json::from_slice(bytes).map_err(|e| RuntimeError::type_error(e.to_string(), SourceLoc::unknown()))
    }
}

/// A serializable mirror of `Value`. `Handle`, `Instance`, and `Iterator`
/// aren't representable — checkpointing a global bound to one of those is a
/// type-error, not a silent drop.
#[derive(Debug, Clone, Serialize, Deserialize)]
enum CheckpointValue {
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    Decimal(String),
    Str(String),
    List(Vec<CheckpointValue>),
    Map(Vec<(String, CheckpointValue)>),
}

impl CheckpointValue {
    fn from_value(v: &Value) -> Result<Self, RuntimeError> {
        Ok(match v {
            Value::Null => CheckpointValue::Null,
            Value::Bool(b) => CheckpointValue::Bool(*b),
            Value::Int32(n) => CheckpointValue::Int32(*n),
            Value::Int64(n) => CheckpointValue::Int64(*n),
            Value::Float64(n) => CheckpointValue::Float64(*n),
            Value::Decimal(d) => CheckpointValue::Decimal(d.to_string()),
            Value::Str(s) => CheckpointValue::Str(s.to_string()),
            Value::List(l) => {
                let items = l.borrow();
                let mut out = Vec::with_capacity(items.len());
                for item in items.iter() {
                    out.push(CheckpointValue::from_value(item)?);
                }
                CheckpointValue::List(out)
            }
            Value::Map(m) => {
                let map = m.borrow();
                let mut out = Vec::with_capacity(map.len());
                for (k, v) in map.iter() {
                    out.push((k.to_string(), CheckpointValue::from_value(v)?));
                }
                CheckpointValue::Map(out)
            }
            other => {
                return Err(RuntimeError::type_error(
                    format!("{} values can't be checkpointed", other.type_name()),
                    SourceLoc::unknown(),
                ))
            }
        })
    }

    fn into_value(self) -> Value {
        match self {
            CheckpointValue::Null => Value::Null,
            CheckpointValue::Bool(b) => Value::Bool(b),
            CheckpointValue::Int32(n) => Value::Int32(n),
            CheckpointValue::Int64(n) => Value::Int64(n),
            CheckpointValue::Float64(n) => Value::Float64(n),
            CheckpointValue::Decimal(s) => Value::Decimal(s.parse().unwrap_or_default()),
            CheckpointValue::Str(s) => Value::str(Rc::<str>::from(s)),
            CheckpointValue::List(items) => Value::list(items.into_iter().map(CheckpointValue::into_value).collect()),
            CheckpointValue::Map(entries) => {
                let mut map = OrderedMap::new();
                for (k, v) in entries {
                    map.insert(k, v.into_value());
                }
                Value::map(map)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_globals_through_bytes() {
        let mut globals = OrderedMap::new();
        globals.insert("count", Value::Int32(3));
        globals.insert("name", Value::str("weft"));
        globals.insert("items", Value::list(vec![Value::Int32(1), Value::Int32(2)]));

        let image = CheckpointImage::capture(&globals, 1_700_000_000_000).unwrap();
        let bytes = image.to_bytes().unwrap();
        let restored = CheckpointImage::from_bytes(&bytes).unwrap().restore().unwrap();

        assert!(matches!(restored.get("count"), Some(Value::Int32(3))));
        match restored.get("items") {
            Some(Value::List(l)) => assert_eq!(l.borrow().len(), 2),
            _ => panic!("expected a list"),
        }
    }

    #[test]
    fn rejects_wrong_magic() {
        let tampered = CheckpointImage {
            magic: "NOT_A_CHECKPOINT".to_string(),
            version: FORMAT_VERSION,
            created_at_millis: 0,
            globals: vec![],
        };
        let err = tampered.restore().unwrap_err();
        assert_eq!(err.kind, weft_sdk::error::ErrorKind::TypeError);
    }
}
