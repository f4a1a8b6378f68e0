//! Fluent class/interface construction for embedders (spec.md §6's
//! `create_class`).
//!
//! `weft-sdk::class::ClassDescriptor` is a plain struct with no compile-time
//! layout pass to fill in `field_order`/`methods` for it (codegen is out of
//! scope, spec.md §1) — something still has to assemble one by hand.
//! Grounded on `raya-core/src/object.rs`'s `VTable::add_method` builder
//! style, generalized from slot-index methods to name-keyed fields since
//! this runtime resolves members by name, not by a precomputed layout.

use std::rc::Rc;

use rustc_hash::FxHashMap;
use weft_sdk::class::{ClassDescriptor, FieldSpec};
use weft_sdk::descriptor::FunctionDescriptor;
use weft_sdk::value::Value;

/// Builds one `ClassDescriptor` field-by-field and method-by-method, then
/// hands the finished, immutable descriptor to the caller to register
/// wherever instances of it get constructed (spec.md §4.4).
pub struct ClassBuilder {
    name: Rc<str>,
    package: Option<Rc<str>>,
    is_interface: bool,
    base: Option<Rc<ClassDescriptor>>,
    interfaces: Vec<Rc<ClassDescriptor>>,
    fields: FxHashMap<Rc<str>, FieldSpec>,
    field_order: Vec<Rc<str>>,
    methods: FxHashMap<Rc<str>, Rc<FunctionDescriptor>>,
    inner_classes: FxHashMap<Rc<str>, Rc<ClassDescriptor>>,
    init: Option<Rc<FunctionDescriptor>>,
}

impl ClassBuilder {
    pub fn new(name: impl Into<Rc<str>>) -> Self {
        ClassBuilder {
            name: name.into(),
            package: None,
            is_interface: false,
            base: None,
            interfaces: Vec::new(),
            fields: FxHashMap::default(),
            field_order: Vec::new(),
            methods: FxHashMap::default(),
            inner_classes: FxHashMap::default(),
            init: None,
        }
    }

    pub fn interface(mut self) -> Self {
        self.is_interface = true;
        self
    }

    pub fn package(mut self, package: impl Into<Rc<str>>) -> Self {
        self.package = Some(package.into());
        self
    }

    pub fn extends(mut self, base: Rc<ClassDescriptor>) -> Self {
        self.base = Some(base);
        self
    }

    pub fn implements(mut self, interface: Rc<ClassDescriptor>) -> Self {
        self.interfaces.push(interface);
        self
    }

    /// Declares a field in construction order. Re-declaring an existing name
    /// overwrites its spec but keeps its original position.
    pub fn field(mut self, name: impl Into<Rc<str>>, spec: FieldSpec) -> Self {
        let name = name.into();
        if !self.fields.contains_key(&name) {
            self.field_order.push(name.clone());
        }
        self.fields.insert(name, spec);
        self
    }

    pub fn method(mut self, name: impl Into<Rc<str>>, descriptor: Rc<FunctionDescriptor>) -> Self {
        self.methods.insert(name.into(), descriptor);
        self
    }

    pub fn inner_class(mut self, name: impl Into<Rc<str>>, class: Rc<ClassDescriptor>) -> Self {
        self.inner_classes.insert(name.into(), class);
        self
    }

    pub fn init(mut self, descriptor: Rc<FunctionDescriptor>) -> Self {
        self.init = Some(descriptor);
        self
    }

    pub fn build(self) -> Rc<ClassDescriptor> {
        Rc::new(ClassDescriptor {
            name: self.name,
            package: self.package,
            is_interface: self.is_interface,
            base: self.base,
            interfaces: self.interfaces,
            fields: self.fields,
            field_order: self.field_order,
            methods: self.methods,
            inner_classes: self.inner_classes,
            init: self.init,
        })
    }
}

pub fn mandatory_field(declared_type: Option<Rc<str>>) -> FieldSpec {
    FieldSpec {
        declared_type,
        mandatory: true,
        default: None,
    }
}

pub fn optional_field(declared_type: Option<Rc<str>>, default: Value) -> FieldSpec {
    FieldSpec {
        declared_type,
        mandatory: false,
        default: Some(default),
    }
}
