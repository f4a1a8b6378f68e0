//! Class descriptors and instances (spec.md §3 `ClassDescriptor`/`Instance`).
//!
//! Generalizes `raya-core/src/object.rs`'s `Object`/`Class`/`VTable` from
//! slot-index field access to name-keyed access — this runtime has no
//! compile-time layout pass to assign slot indices, since codegen is out of
//! scope (spec.md §1).

use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::descriptor::FunctionDescriptor;
use crate::error::{RuntimeError, SourceLoc};
use crate::value::Value;

#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub declared_type: Option<Rc<str>>,
    pub mandatory: bool,
    pub default: Option<Value>,
}

/// A class or interface declaration (spec.md §3, §4.4).
pub struct ClassDescriptor {
    pub name: Rc<str>,
    pub package: Option<Rc<str>>,
    pub is_interface: bool,
    pub base: Option<Rc<ClassDescriptor>>,
    pub interfaces: Vec<Rc<ClassDescriptor>>,
    pub fields: FxHashMap<Rc<str>, FieldSpec>,
    pub field_order: Vec<Rc<str>>,
    pub methods: FxHashMap<Rc<str>, Rc<FunctionDescriptor>>,
    pub inner_classes: FxHashMap<Rc<str>, Rc<ClassDescriptor>>,
    pub init: Option<Rc<FunctionDescriptor>>,
}

impl ClassDescriptor {
    pub fn mandatory_fields(&self) -> impl Iterator<Item = &Rc<str>> {
        self.field_order
            .iter()
            .filter(move |n| self.fields.get(n.as_ref()).is_some_and(|f| f.mandatory))
    }

    /// Walks `base` and `interfaces` looking for `name`, matching spec.md
    /// §4.4's `instanceof`/`as` semantics.
    pub fn is_or_extends(&self, name: &str) -> bool {
        if self.name.as_ref() == name {
            return true;
        }
        if let Some(base) = &self.base {
            if base.is_or_extends(name) {
                return true;
            }
        }
        self.interfaces.iter().any(|i| i.is_or_extends(name))
    }

    pub fn resolve_method(&self, name: &str) -> Option<Rc<FunctionDescriptor>> {
        if let Some(m) = self.methods.get(name) {
            return Some(m.clone());
        }
        self.base.as_ref().and_then(|b| b.resolve_method(name))
    }
}

/// A class instance: field storage keyed by name, plus the descriptor it was
/// constructed from for method dispatch and `instanceof` checks.
pub struct Instance {
    pub class: Rc<ClassDescriptor>,
    fields: FxHashMap<Rc<str>, Value>,
}

impl Instance {
    /// Builds an instance with every field defaulted to its declared default
    /// (or `Value::Null` if none), per spec.md §4.4 construction order.
    pub fn new(class: Rc<ClassDescriptor>) -> Self {
        let mut fields = FxHashMap::default();
        for name in &class.field_order {
            let spec = &class.fields[name];
            fields.insert(name.clone(), spec.default.clone().unwrap_or(Value::Null));
        }
        Self { class, fields }
    }

    pub fn class_name(&self) -> &str {
        &self.class.name
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.class.field_order.iter().map(|n| n.as_ref())
    }

    pub fn get_field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn set_field(&mut self, name: &str, value: Value, loc: SourceLoc) -> Result<(), RuntimeError> {
        if !self.class.fields.contains_key(name) {
            return Err(RuntimeError::type_error(
                format!("no such field '{name}' on {}", self.class.name),
                loc,
            ));
        }
        self.fields.insert(Rc::from(name), value);
        Ok(())
    }

    pub fn is_missing_any_mandatory_field(&self) -> Option<&str> {
        self.class
            .mandatory_fields()
            .map(|n| n.as_ref())
            .find(|n| matches!(self.fields.get(*n), None | Some(Value::Null)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf_class(name: &str, mandatory: &[&str]) -> Rc<ClassDescriptor> {
        let mut fields = FxHashMap::default();
        let mut order = Vec::new();
        for m in mandatory {
            fields.insert(
                Rc::from(*m),
                FieldSpec {
                    declared_type: None,
                    mandatory: true,
                    default: None,
                },
            );
            order.push(Rc::from(*m));
        }
        Rc::new(ClassDescriptor {
            name: Rc::from(name),
            package: None,
            is_interface: false,
            base: None,
            interfaces: vec![],
            fields,
            field_order: order,
            methods: FxHashMap::default(),
            inner_classes: FxHashMap::default(),
            init: None,
        })
    }

    #[test]
    fn new_instance_defaults_mandatory_fields_to_null() {
        let class = leaf_class("Point", &["x", "y"]);
        let inst = Instance::new(class);
        assert_eq!(inst.is_missing_any_mandatory_field(), Some("x"));
    }

    #[test]
    fn instanceof_walks_base_chain() {
        let base = leaf_class("Shape", &[]);
        let mut derived = (*leaf_class("Circle", &["r"])).clone_layout();
        derived.base = Some(base);
        let derived = Rc::new(derived);
        assert!(derived.is_or_extends("Shape"));
        assert!(derived.is_or_extends("Circle"));
        assert!(!derived.is_or_extends("Square"));
    }

    // Minimal helper so the instanceof test can attach a base class without
    // hand-duplicating the whole descriptor in every test.
    impl ClassDescriptor {
        fn clone_layout(&self) -> ClassDescriptor {
            ClassDescriptor {
                name: self.name.clone(),
                package: self.package.clone(),
                is_interface: self.is_interface,
                base: self.base.clone(),
                interfaces: self.interfaces.clone(),
                fields: self.fields.clone(),
                field_order: self.field_order.clone(),
                methods: self.methods.clone(),
                inner_classes: self.inner_classes.clone(),
                init: self.init.clone(),
            }
        }
    }
}
