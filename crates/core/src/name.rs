//! Object and value names.
//!
//! An [`ObjectName`] is a weak, named handle to an object; [`ValueName`]
//! designates one field of it. Value names can be passed to computations as
//! arguments, so a cell can read fields of a specific object rather than the
//! one currently being evaluated.

use crate::error::{Error, Result};
use crate::guard::EvalContext;
use crate::key::{FieldRef, Label};
use crate::object::{Object, ObjectInner};
use crate::value::Value;
use alloc::format;
use alloc::rc::{Rc, Weak};
use core::fmt;

/// Named weak handle to an object.
#[derive(Clone)]
pub struct ObjectName {
    name: Rc<str>,
    target: Weak<ObjectInner>,
}

impl ObjectName {
    /// Creates a handle named after the object's display name.
    pub fn new(object: &Object) -> Self {
        Self::with_name(object, &object.display_name())
    }

    pub fn with_name(object: &Object, name: &str) -> Self {
        Self {
            name: Rc::from(name),
            target: object.downgrade(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the object if it is still alive.
    pub fn object(&self) -> Result<Object> {
        Object::upgrade(&self.target)
            .ok_or_else(|| Error::not_found(format!("object {}", self.name)))
    }

    /// Names one field of this object.
    pub fn field(&self, label: impl Into<Label>) -> ValueName {
        ValueName {
            object: self.clone(),
            label: label.into(),
        }
    }
}

impl PartialEq for ObjectName {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.target.ptr_eq(&other.target)
    }
}

impl Eq for ObjectName {}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl fmt::Debug for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectName({})", self.name)
    }
}

/// A field of a named object.
#[derive(Clone, PartialEq, Eq)]
pub struct ValueName {
    object: ObjectName,
    label: Label,
}

impl ValueName {
    pub fn object_name(&self) -> &ObjectName {
        &self.object
    }

    pub fn label(&self) -> &Label {
        &self.label
    }

    /// Reads the field, evaluating it if needed.
    pub fn get(&self) -> Result<Value> {
        self.object.object()?.get(self.label.clone())
    }

    /// Assigns the field.
    pub fn set(&self, value: impl Into<Value>) -> Result<()> {
        self.object.object()?.set(self.label.clone(), value).map(|_| ())
    }

    pub(crate) fn resolve(&self, ctx: &mut EvalContext) -> Result<Value> {
        self.object
            .object()?
            .get_in(&FieldRef::Label(self.label.clone()), ctx)
    }
}

impl fmt::Display for ValueName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.object, self.label)
    }
}

impl fmt::Debug for ValueName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValueName({})", self)
    }
}
