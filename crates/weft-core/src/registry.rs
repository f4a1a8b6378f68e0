//! The function/method registry and call-site argument dispatch (spec.md
//! §4.2).
//!
//! Grounded on `raya-sdk/src/handler.rs::NativeFunctionRegistry` (name→
//! handler table) generalized with the full named/positional/defaults
//! shaping spec.md §4.2 describes, and `raya-core/src/types/registry.rs`'s
//! per-descriptor lookup shape.

use std::rc::Rc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use weft_sdk::continuation::Outcome;
use weft_sdk::descriptor::FunctionDescriptor;
use weft_sdk::error::{RuntimeError, SourceLoc};
use weft_sdk::value::Value;

/// The uniform wrapper signature every registered callable implements
/// (spec.md §4.2): receiver (if any), an explicit continuation slot for
/// resuming a suspended call, the call-site source location, and the
/// already-shaped positional argument list.
pub type WrapperFn = Rc<dyn Fn(Option<&Value>, Option<Value>, &SourceLoc, &[Value]) -> Outcome<Value>>;

struct Entry {
    descriptor: Rc<FunctionDescriptor>,
    wrapper: WrapperFn,
}

/// Holds every global function and builtin/class method a running script
/// can dispatch to, keyed by name (and receiver type, for methods sharing a
/// name across unrelated types).
#[derive(Default)]
pub struct FunctionRegistry {
    globals: RwLock<FxHashMap<Rc<str>, Entry>>,
    methods: RwLock<FxHashMap<(Rc<str>, Rc<str>), Entry>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_global(&self, descriptor: Rc<FunctionDescriptor>, wrapper: WrapperFn) {
        let name = descriptor.name.clone();
        let mut globals = self.globals.write();
        for alias in &descriptor.aliases {
            globals.insert(
                alias.clone(),
                Entry {
                    descriptor: descriptor.clone(),
                    wrapper: wrapper.clone(),
                },
            );
        }
        globals.insert(name, Entry { descriptor, wrapper });
    }

    pub fn register_method(&self, type_name: impl Into<Rc<str>>, descriptor: Rc<FunctionDescriptor>, wrapper: WrapperFn) {
        let type_name = type_name.into();
        let name = descriptor.name.clone();
        self.methods
            .write()
            .insert((type_name, name), Entry { descriptor, wrapper });
    }

    pub fn deregister_global(&self, name: &str) -> bool {
        self.globals.write().remove(name).is_some()
    }

    pub fn lookup_global(&self, name: &str) -> Option<Rc<FunctionDescriptor>> {
        self.globals.read().get(name).map(|e| e.descriptor.clone())
    }

    pub fn lookup_method(&self, type_name: &str, name: &str) -> Option<Rc<FunctionDescriptor>> {
        self.methods
            .read()
            .get(&(Rc::from(type_name), Rc::from(name)))
            .map(|e| e.descriptor.clone())
    }

    /// Dispatch a global function call. `args` may be a flat positional
    /// list or, for a named-args call, a single trailing map whose keys are
    /// parameter names (spec.md §4.2).
    pub fn call_global(
        &self,
        name: &str,
        continuation: Option<Value>,
        loc: &SourceLoc,
        args: CallArgs,
    ) -> Outcome<Value> {
        let entry = {
            let globals = self.globals.read();
            match globals.get(name) {
                Some(e) => (e.descriptor.clone(), e.wrapper.clone()),
                None => {
                    return Outcome::Err(RuntimeError::type_error(
                        format!("no such function '{name}'"),
                        loc.clone(),
                    ))
                }
            }
        };
        self.dispatch(None, entry.0, entry.1, continuation, loc, args)
    }

    pub fn call_method(
        &self,
        receiver: &Value,
        type_name: &str,
        name: &str,
        continuation: Option<Value>,
        loc: &SourceLoc,
        args: CallArgs,
    ) -> Outcome<Value> {
        let entry = {
            let methods = self.methods.read();
            match methods.get(&(Rc::from(type_name), Rc::from(name))) {
                Some(e) => (e.descriptor.clone(), e.wrapper.clone()),
                None => {
                    return Outcome::Err(RuntimeError::type_error(
                        format!("no such method '{name}' on {type_name}"),
                        loc.clone(),
                    ))
                }
            }
        };
        self.dispatch(Some(receiver), entry.0, entry.1, continuation, loc, args)
    }

    fn dispatch(
        &self,
        receiver: Option<&Value>,
        descriptor: Rc<FunctionDescriptor>,
        wrapper: WrapperFn,
        continuation: Option<Value>,
        loc: &SourceLoc,
        args: CallArgs,
    ) -> Outcome<Value> {
        match shape_args(&descriptor, args, loc) {
            Ok(shaped) => wrapper(receiver, continuation, loc, &shaped),
            Err(e) => Outcome::Err(e),
        }
    }
}

/// Arguments as the call site actually supplied them, before being shaped
/// into the wrapper's flat positional form.
pub enum CallArgs {
    Positional(Vec<Value>),
    /// Named-args call: each key must match a parameter name (spec.md
    /// §4.2's "unknown-arg" error for keys with no matching parameter).
    Named(Vec<(Rc<str>, Value)>),
}

/// Expands named args, fills in defaults, and validates mandatory/maximum
/// arg-count bounds, producing the flat positional list `WrapperFn` expects
/// (spec.md §4.2).
fn shape_args(descriptor: &FunctionDescriptor, args: CallArgs, loc: &SourceLoc) -> Result<Vec<Value>, RuntimeError> {
    match args {
        CallArgs::Positional(values) => {
            if !descriptor.variadic && values.len() > descriptor.params.len() {
                return Err(RuntimeError::type_error(
                    format!(
                        "too many arguments: expected at most {}, got {}",
                        descriptor.params.len(),
                        values.len()
                    ),
                    loc.clone(),
                ));
            }
            if values.len() < descriptor.mandatory_count {
                let missing = &descriptor.params[values.len()];
                return Err(RuntimeError::missing_arg(&missing.name, loc.clone()));
            }
            let mut shaped = values;
            for param in descriptor.params.iter().skip(shaped.len()) {
                match &param.default {
                    Some(d) => shaped.push(d.clone()),
                    None => return Err(RuntimeError::missing_arg(&param.name, loc.clone())),
                }
            }
            Ok(shaped)
        }
        CallArgs::Named(pairs) => {
            let mut shaped: Vec<Option<Value>> = vec![None; descriptor.params.len()];
            for (key, value) in pairs {
                match descriptor.param_index(&key) {
                    Some(idx) => shaped[idx] = Some(value),
                    None => return Err(RuntimeError::unknown_arg(&key, loc.clone())),
                }
            }
            let mut out = Vec::with_capacity(shaped.len());
            for (i, slot) in shaped.into_iter().enumerate() {
                let param = &descriptor.params[i];
                match slot.or_else(|| param.default.clone()) {
                    Some(v) => out.push(v),
                    None => return Err(RuntimeError::missing_arg(&param.name, loc.clone())),
                }
            }
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_sdk::descriptor::{ParamSpec, ReceiverType};

    fn descriptor(params: Vec<ParamSpec>, mandatory: usize) -> Rc<FunctionDescriptor> {
        Rc::new(FunctionDescriptor {
            name: Rc::from("f"),
            aliases: vec![],
            receiver_type: ReceiverType::None,
            first_arg_type: None,
            return_type: None,
            params,
            mandatory_count: mandatory,
            variadic: false,
            needs_location: false,
            is_async: false,
            async_params: vec![],
        })
    }

    #[test]
    fn positional_fills_defaults() {
        let d = descriptor(
            vec![
                ParamSpec::required("a"),
                ParamSpec::with_default("b", Value::Int32(5)),
            ],
            1,
        );
        let loc = SourceLoc::unknown();
        let shaped = shape_args(&d, CallArgs::Positional(vec![Value::Int32(1)]), &loc).unwrap();
        assert_eq!(shaped.len(), 2);
        match shaped[1] {
            Value::Int32(5) => {}
            _ => panic!("default not applied"),
        }
    }

    #[test]
    fn missing_mandatory_positional_errors() {
        let d = descriptor(vec![ParamSpec::required("a")], 1);
        let loc = SourceLoc::unknown();
        assert!(shape_args(&d, CallArgs::Positional(vec![]), &loc).is_err());
    }

    #[test]
    fn named_args_reject_unknown_key() {
        let d = descriptor(vec![ParamSpec::required("a")], 1);
        let loc = SourceLoc::unknown();
        let args = CallArgs::Named(vec![(Rc::from("nope"), Value::Int32(1))]);
        assert!(shape_args(&d, args, &loc).is_err());
    }

    #[test]
    fn named_args_fill_from_keys_regardless_of_order() {
        let d = descriptor(
            vec![ParamSpec::required("a"), ParamSpec::required("b")],
            2,
        );
        let loc = SourceLoc::unknown();
        let args = CallArgs::Named(vec![
            (Rc::from("b"), Value::Int32(2)),
            (Rc::from("a"), Value::Int32(1)),
        ]);
        let shaped = shape_args(&d, args, &loc).unwrap();
        match (&shaped[0], &shaped[1]) {
            (Value::Int32(1), Value::Int32(2)) => {}
            _ => panic!("named args not matched by key"),
        }
    }
}
