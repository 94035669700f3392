//! Runtime values.

use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Runtime value in the trial interpreter.
#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Str(Rc<str>),
    /// A loaded module instance, shared by every `use` of it within one file.
    Module(ModuleRef),
}

impl Value {
    pub fn str(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Str(_) => "string",
            Value::Module(_) => "module",
        }
    }

    /// `nil` and `false` are falsy; everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Module(a), Value::Module(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Str(s) => f.write_str(s),
            Value::Module(m) => write!(f, "<module {}>", m.name()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{s:?}"),
            other => write!(f, "{other}"),
        }
    }
}

/// Exported bindings of one module instance.
#[derive(Default)]
pub struct ModuleExports {
    name: String,
    fields: FxHashMap<String, Value>,
}

/// Handle to a module instance.
///
/// Handles are only minted by the module host, so every live instance is
/// owned by the host's registry arena; dropping the arena invalidates them
/// for the next file.
#[derive(Clone)]
pub struct ModuleRef(Rc<RefCell<ModuleExports>>);

impl ModuleRef {
    pub fn new(name: impl Into<String>, fields: FxHashMap<String, Value>) -> Self {
        ModuleRef(Rc::new(RefCell::new(ModuleExports {
            name: name.into(),
            fields,
        })))
    }

    pub fn name(&self) -> String {
        self.0.borrow().name.clone()
    }

    pub fn get(&self, field: &str) -> Option<Value> {
        self.0.borrow().fields.get(field).cloned()
    }

    /// Returns false if the module does not export `field`.
    pub fn set(&self, field: &str, value: Value) -> bool {
        let mut exports = self.0.borrow_mut();
        match exports.fields.get_mut(field) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn ptr_eq(&self, other: &ModuleRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Drop every export. A module stored in its own exports (or in a
    /// module it exports) forms an `Rc` cycle that only this breaks.
    pub fn release(&self) {
        let fields = std::mem::take(&mut self.0.borrow_mut().fields);
        drop(fields);
    }
}
