//! Reactive cells.
//!
//! A cell is a value an [`Object`] evaluates instead of returning verbatim.
//! [`Derived`] computes its value with a getter and reacts to writes by
//! recomputing other fields; [`Reference`] aliases a field of another (or the
//! same) object.

use crate::computation::Computation;
use crate::error::{Error, Result};
use crate::guard::EvalContext;
use crate::key::{FieldRef, Key, Label};
use crate::object::{Object, ObjectInner};
use crate::value::Value;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cmp::Ordering;
use core::fmt;

/// A computed field.
///
/// Setting a field that holds a `Derived` cell first stores the written value
/// in the slot, then runs each reaction against the object and assigns the
/// result to the reaction's output label. The cell stays installed, so the
/// next read recomputes through the getter.
#[derive(Clone)]
pub struct Derived {
    getter: Computation,
    reactions: Vec<(Label, Computation)>,
}

impl Derived {
    pub fn new(getter: Computation) -> Self {
        Self {
            getter,
            reactions: Vec::new(),
        }
    }

    /// Adds a reaction run on assignment, replacing any earlier one for the
    /// same output label.
    pub fn with_reaction(mut self, output: impl Into<Label>, reaction: Computation) -> Self {
        let output = output.into();
        match self.reactions.iter_mut().find(|(label, _)| *label == output) {
            Some(slot) => slot.1 = reaction,
            None => self.reactions.push((output, reaction)),
        }
        self
    }

    pub fn getter(&self) -> &Computation {
        &self.getter
    }

    pub fn reactions(&self) -> &[(Label, Computation)] {
        &self.reactions
    }
}

/// Alias to a field on a target object.
///
/// The target is held weakly: a reference never keeps its target alive, and
/// reading through a reference whose target is gone fails with `NotFound`.
#[derive(Clone)]
pub struct Reference {
    target: Weak<ObjectInner>,
    label: Label,
}

impl Reference {
    pub fn new(target: &Object, label: impl Into<Label>) -> Self {
        Self {
            target: target.downgrade(),
            label: label.into(),
        }
    }

    pub fn label(&self) -> &Label {
        &self.label
    }

    /// Returns the target object if it is still alive.
    pub fn target(&self) -> Result<Object> {
        Object::upgrade(&self.target)
            .ok_or_else(|| Error::not_found(alloc::format!("referenced object for {:?}", self.label)))
    }
}

/// Value held by a reactive field slot.
#[derive(Clone)]
pub enum ReactiveCell {
    Derived(Rc<Derived>),
    Reference(Reference),
}

impl ReactiveCell {
    /// Returns true if both cells are the same instance.
    pub fn ptr_eq(&self, other: &ReactiveCell) -> bool {
        match (self, other) {
            (ReactiveCell::Derived(a), ReactiveCell::Derived(b)) => Rc::ptr_eq(a, b),
            (ReactiveCell::Reference(a), ReactiveCell::Reference(b)) => {
                a.target.ptr_eq(&b.target) && a.label == b.label
            }
            _ => false,
        }
    }

    /// Total order that agrees with [`ReactiveCell::ptr_eq`].
    pub(crate) fn cmp_identity(&self, other: &ReactiveCell) -> Ordering {
        match (self, other) {
            (ReactiveCell::Derived(_), ReactiveCell::Derived(_)) => self.addr().cmp(&other.addr()),
            (ReactiveCell::Reference(a), ReactiveCell::Reference(b)) => self
                .addr()
                .cmp(&other.addr())
                .then_with(|| a.label.cmp(&b.label)),
            (ReactiveCell::Derived(_), ReactiveCell::Reference(_)) => Ordering::Less,
            (ReactiveCell::Reference(_), ReactiveCell::Derived(_)) => Ordering::Greater,
        }
    }

    pub(crate) fn addr(&self) -> usize {
        match self {
            ReactiveCell::Derived(derived) => Rc::as_ptr(derived) as *const () as usize,
            ReactiveCell::Reference(reference) => reference.target.as_ptr() as *const () as usize,
        }
    }

    /// Reads the cell installed at `key` on `owner`.
    pub(crate) fn get(
        &self,
        owner: &Object,
        key: Key,
        label: &Label,
        ctx: &mut EvalContext,
    ) -> Result<Value> {
        ctx.enter(owner, key, label)?;
        let result = match self {
            ReactiveCell::Derived(derived) => derived.getter.call(owner, ctx),
            ReactiveCell::Reference(reference) => reference
                .target()
                .and_then(|target| target.get_in(&FieldRef::Label(reference.label.clone()), ctx)),
        };
        Self::leave(owner, key, ctx, &result);
        result
    }

    /// Assigns `value` through the cell installed at `key` on `owner`.
    pub(crate) fn set(
        &self,
        owner: &Object,
        key: Key,
        label: &Label,
        value: Value,
        ctx: &mut EvalContext,
    ) -> Result<()> {
        ctx.enter(owner, key, label)?;
        let result = match self {
            ReactiveCell::Derived(derived) => {
                owner.write_raw(key, value).and_then(|_| {
                    let reacted = Self::react(derived, owner, ctx);
                    let restored = owner.write_raw(key, Value::Cell(self.clone()));
                    reacted.and(restored).map(|_| ())
                })
            }
            ReactiveCell::Reference(reference) => reference.target().and_then(|target| {
                target
                    .set_in(&FieldRef::Label(reference.label.clone()), value, ctx)
                    .map(|_| ())
            }),
        };
        Self::leave(owner, key, ctx, &result);
        result
    }

    fn react(derived: &Derived, owner: &Object, ctx: &mut EvalContext) -> Result<()> {
        for (output, reaction) in &derived.reactions {
            let value = reaction.call(owner, ctx)?;
            owner.set_in(&FieldRef::Label(output.clone()), value, ctx)?;
        }
        Ok(())
    }

    /// A cycle leaves its fingerprint in place: the context is abandoned by
    /// the outermost call anyway.
    fn leave<T>(owner: &Object, key: Key, ctx: &mut EvalContext, result: &Result<T>) {
        if !matches!(result, Err(err) if err.is_cycle()) {
            ctx.exit(owner, key);
        }
    }
}

impl From<Derived> for ReactiveCell {
    fn from(derived: Derived) -> Self {
        ReactiveCell::Derived(Rc::new(derived))
    }
}

impl From<Reference> for ReactiveCell {
    fn from(reference: Reference) -> Self {
        ReactiveCell::Reference(reference)
    }
}

impl fmt::Debug for Derived {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Derived({:?}", self.getter)?;
        for (output, reaction) in &self.reactions {
            write!(f, ", {} <- {:?}", output, reaction)?;
        }
        write!(f, ")")
    }
}

impl fmt::Debug for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match Object::upgrade(&self.target) {
            Some(target) => write!(f, "Reference({}, {:?})", target.display_name(), self.label),
            None => write!(f, "Reference(<dropped>, {:?})", self.label),
        }
    }
}

impl fmt::Debug for ReactiveCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReactiveCell::Derived(derived) => fmt::Debug::fmt(derived, f),
            ReactiveCell::Reference(reference) => fmt::Debug::fmt(reference, f),
        }
    }
}
