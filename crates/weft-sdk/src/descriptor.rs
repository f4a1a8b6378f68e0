//! `FunctionDescriptor` and friends (spec.md §3, §4.2): the metadata every
//! wrapper carries so the dispatcher can shape named/positional arguments,
//! apply defaults, and decide whether a call can itself suspend.

use std::rc::Rc;

use crate::value::Value;

/// What a method's receiver looks like, if any (spec.md §3
/// `receiver-type`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiverType {
    /// A global function; no receiver.
    None,
    /// A method callable on any value of the given dynamic type name
    /// (`"list"`, `"string"`, `"map"`, ...).
    BuiltinType(Rc<str>),
    /// A method defined on (or inherited by) the named class.
    Class(Rc<str>),
}

/// One formal parameter.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: Rc<str>,
    pub declared_type: Option<Rc<str>>,
    pub default: Option<Value>,
    /// True if this parameter is itself suspend-capable when passed a
    /// closure (spec.md §4.2's async-arg list).
    pub may_suspend: bool,
}

impl ParamSpec {
    pub fn required(name: impl Into<Rc<str>>) -> Self {
        Self {
            name: name.into(),
            declared_type: None,
            default: None,
            may_suspend: false,
        }
    }

    pub fn with_default(name: impl Into<Rc<str>>, default: Value) -> Self {
        Self {
            name: name.into(),
            declared_type: None,
            default: Some(default),
            may_suspend: false,
        }
    }
}

/// Everything the dispatcher needs to know about a callable without
/// inspecting its implementation (spec.md §3, §4.2).
pub struct FunctionDescriptor {
    pub name: Rc<str>,
    pub aliases: Vec<Rc<str>>,
    pub receiver_type: ReceiverType,
    /// The concrete dynamic type expected in the first positional slot when
    /// `receiver_type` is `BuiltinType`/`Class` but the call arrives through
    /// a free-function-style invocation (spec.md §4.2 "actual first-arg
    /// type").
    pub first_arg_type: Option<Rc<str>>,
    pub return_type: Option<Rc<str>>,
    pub params: Vec<ParamSpec>,
    pub mandatory_count: usize,
    pub variadic: bool,
    /// True if the wrapper needs the call-site `(source, offset)` forwarded
    /// (e.g. to build a `RuntimeError`), per the uniform wrapper signature.
    pub needs_location: bool,
    /// True if this function may itself raise a `Continuation` (spec.md
    /// §4.2's async-propagation metadata).
    pub is_async: bool,
    /// Indices into `params` that, when given a closure argument, may
    /// themselves suspend (e.g. the predicate passed to `filter`).
    pub async_params: Vec<usize>,
}

impl FunctionDescriptor {
    pub fn max_positional(&self) -> Option<usize> {
        if self.variadic {
            None
        } else {
            Some(self.params.len())
        }
    }

    pub fn param_index(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.name.as_ref() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_positional_none_when_variadic() {
        let fd = FunctionDescriptor {
            name: Rc::from("join"),
            aliases: vec![],
            receiver_type: ReceiverType::BuiltinType(Rc::from("list")),
            first_arg_type: None,
            return_type: Some(Rc::from("string")),
            params: vec![ParamSpec::with_default("sep", Value::str(""))],
            mandatory_count: 0,
            variadic: false,
            needs_location: false,
            is_async: false,
            async_params: vec![],
        };
        assert_eq!(fd.max_positional(), Some(1));
        assert_eq!(fd.param_index("sep"), Some(0));
    }
}
