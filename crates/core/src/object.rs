//! Reactive objects.
//!
//! An [`Object`] wraps a [`FieldTree`] and evaluates the reactive cells it
//! holds on access. It also buffers every write for the owning packet's next
//! commit, and defers computation failures raised by nested reads until the
//! outermost read of the object completes.
//!
//! ```
//! use fieldtree_core::computation::{difference, local, sum};
//! use fieldtree_core::{Derived, Object, Value};
//!
//! let task = Object::named("task1");
//! task.set("start", 1i64).unwrap();
//! task.set("length", 2i64).unwrap();
//! task.set(
//!     "end",
//!     Derived::new(sum([local("start"), local("length")]))
//!         .with_reaction("start", difference([local("end"), local("length")])),
//! )
//! .unwrap();
//! assert_eq!(task.get("end").unwrap(), Value::Int(3));
//!
//! task.set("end", 5i64).unwrap();
//! assert_eq!(task.get("start").unwrap(), Value::Int(3));
//! ```

use crate::cell::ReactiveCell;
use crate::change::{ChangeTracker, FieldChanges};
use crate::error::{ComputationError, Error, Result};
use crate::guard::{EvalContext, EvalOptions};
use crate::key::{FieldRef, Key, Label};
use crate::name::ObjectName;
use crate::tree::{FieldTree, Tree};
use crate::value::Value;
use alloc::format;
use alloc::rc::{Rc, Weak};
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

/// Global object id counter.
static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of an object, used in evaluation fingerprints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(u64);

impl ObjectId {
    fn next() -> Self {
        ObjectId(NEXT_OBJECT_ID.fetch_add(1, Ordering::SeqCst))
    }

    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

pub(crate) struct ObjectInner {
    id: ObjectId,
    name: Option<String>,
    fields: RefCell<FieldTree>,
    changes: RefCell<ChangeTracker>,
    /// Cell evaluations of this object currently in progress.
    depth: Cell<usize>,
    /// First computation failure seen below the outermost evaluation.
    pending: RefCell<Option<ComputationError>>,
    options: EvalOptions,
}

/// Shared handle to a reactive object.
#[derive(Clone)]
pub struct Object(Rc<ObjectInner>);

impl Default for Object {
    fn default() -> Self {
        Self::new()
    }
}

impl Object {
    /// Creates an empty, unnamed object.
    pub fn new() -> Self {
        Self::with_options(None, EvalOptions::default())
    }

    /// Creates an empty object with a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self::with_options(Some(name.into()), EvalOptions::default())
    }

    pub fn with_options(name: Option<String>, options: EvalOptions) -> Self {
        Object(Rc::new(ObjectInner {
            id: ObjectId::next(),
            name,
            fields: RefCell::new(FieldTree::new()),
            changes: RefCell::new(ChangeTracker::new()),
            depth: Cell::new(0),
            pending: RefCell::new(None),
            options,
        }))
    }

    /// Creates an unnamed object from ordered (label, value) pairs.
    pub fn from_fields<L, V>(fields: impl IntoIterator<Item = (L, V)>) -> Result<Self>
    where
        L: Into<Label>,
        V: Into<Value>,
    {
        let object = Self::new();
        object.update(fields)?;
        Ok(object)
    }

    #[inline]
    pub fn id(&self) -> ObjectId {
        self.0.id
    }

    pub fn name(&self) -> Option<&str> {
        self.0.name.as_deref()
    }

    /// Name used in diagnostics: the object's own name, else its `name`
    /// field when that holds a string, else `#<id>`.
    pub fn display_name(&self) -> String {
        if let Some(name) = &self.0.name {
            return name.clone();
        }
        let field = self
            .0
            .fields
            .try_borrow()
            .ok()
            .and_then(|fields| fields.get("name").ok());
        match field {
            Some(Value::Str(name)) => name,
            _ => format!("#{}", self.0.id.get()),
        }
    }

    #[inline]
    pub fn options(&self) -> EvalOptions {
        self.0.options
    }

    /// Returns true if both handles refer to the same object.
    #[inline]
    pub fn ptr_eq(&self, other: &Object) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Returns a name handle for this object.
    pub fn handle(&self) -> ObjectName {
        ObjectName::new(self)
    }

    pub(crate) fn downgrade(&self) -> Weak<ObjectInner> {
        Rc::downgrade(&self.0)
    }

    pub(crate) fn upgrade(weak: &Weak<ObjectInner>) -> Option<Object> {
        weak.upgrade().map(Object)
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    /// Reads a field, evaluating it if it holds a reactive cell.
    ///
    /// Labels are looked up shallowly. Keys are looked up deeply; a key held
    /// by a nested container returns its raw value.
    pub fn get(&self, at: impl Into<FieldRef>) -> Result<Value> {
        let mut ctx = EvalContext::new(self.0.options);
        self.get_in(&at.into(), &mut ctx)
    }

    /// Reads a field without evaluating it.
    pub fn raw(&self, at: impl Into<FieldRef>) -> Result<Value> {
        self.0.fields.borrow().get(at)
    }

    pub(crate) fn get_in(&self, at: &FieldRef, ctx: &mut EvalContext) -> Result<Value> {
        let (key, label, value) = {
            let fields = self.0.fields.borrow();
            match fields.resolve(at) {
                Some(key) => {
                    let (label, value) = fields.get_field(key)?;
                    (key, label, value)
                }
                None => return fields.get(at.clone()),
            }
        };
        match value {
            Value::Cell(cell) => self.evaluate(&cell, key, &label, ctx),
            value => Ok(value),
        }
    }

    fn evaluate(
        &self,
        cell: &ReactiveCell,
        key: Key,
        label: &Label,
        ctx: &mut EvalContext,
    ) -> Result<Value> {
        self.0.depth.set(self.0.depth.get() + 1);
        let result = cell.get(self, key, label, ctx);
        let depth = self.0.depth.get() - 1;
        self.0.depth.set(depth);

        let mut pending = self.0.pending.borrow_mut();
        match result {
            Ok(value) => match (depth, pending.take()) {
                (0, Some(err)) => Err(Error::Computation(err)),
                (_, deferred) => {
                    *pending = deferred;
                    Ok(value)
                }
            },
            Err(Error::Computation(err)) if depth > 0 => {
                pending.get_or_insert(err);
                Ok(Value::Empty)
            }
            Err(Error::Computation(err)) => Err(Error::Computation(pending.take().unwrap_or(err))),
            Err(err) => {
                if depth == 0 {
                    pending.take();
                }
                Err(err)
            }
        }
    }

    /// Evaluates every field in order.
    pub fn fields(&self) -> Result<Vec<(Label, Value)>> {
        let keys: Vec<(Key, Label)> = {
            let fields = self.0.fields.borrow();
            fields.keys().zip(fields.labels().cloned()).collect()
        };
        keys.into_iter()
            .map(|(key, label)| self.get(key).map(|value| (label, value)))
            .collect()
    }

    /// Runs `f` against the raw container.
    pub fn with_fields<R>(&self, f: impl FnOnce(&FieldTree) -> R) -> R {
        f(&self.0.fields.borrow())
    }

    pub fn contains(&self, at: impl Into<FieldRef>) -> bool {
        self.0.fields.borrow().contains(at)
    }

    pub fn labels(&self) -> Vec<Label> {
        self.0.fields.borrow().labels().cloned().collect()
    }

    pub fn keys(&self) -> Vec<Key> {
        self.0.fields.borrow().keys().collect()
    }

    pub fn len(&self) -> usize {
        self.0.fields.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.fields.borrow().is_empty()
    }

    /// Renders every field evaluated, as `Object{label: value, ...}`.
    pub fn render(&self) -> Result<String> {
        let fields = self.fields()?;
        let body: Vec<String> = fields
            .iter()
            .map(|(label, value)| format!("{}: {:?}", label, value))
            .collect();
        Ok(format!("Object{{{}}}", body.join(", ")))
    }

    // ---------------------------------------------------------------------
    // Writes
    // ---------------------------------------------------------------------

    /// Assigns a field.
    ///
    /// Assigning a cell installs it. Assigning a plain value to a field that
    /// holds a cell writes through the cell; the value recorded for the
    /// commit is whatever the field evaluates to afterwards.
    pub fn set(&self, at: impl Into<FieldRef>, value: impl Into<Value>) -> Result<Key> {
        let mut ctx = EvalContext::new(self.0.options);
        self.set_in(&at.into(), value.into(), &mut ctx)
    }

    pub(crate) fn set_in(&self, at: &FieldRef, value: Value, ctx: &mut EvalContext) -> Result<Key> {
        let installed = {
            let fields = self.0.fields.borrow();
            fields.resolve(at).and_then(|key| match fields.get_field(key) {
                Ok((label, Value::Cell(cell))) => Some((key, label, cell)),
                _ => None,
            })
        };
        match installed {
            Some((key, label, cell)) if !value.is_cell() => {
                cell.set(self, key, &label, value, ctx)?;
                let effective = self.get_in(&FieldRef::Key(key), ctx)?;
                self.record(key, label, effective);
                Ok(key)
            }
            _ => {
                let key = self.0.fields.borrow_mut().set(at.clone(), value.clone())?;
                let label = self.0.fields.borrow().get_label(key)?;
                self.record(key, label, value);
                Ok(key)
            }
        }
    }

    /// Appends a new field; fails if the label is already used.
    pub fn add(&self, label: impl Into<Label>, value: impl Into<Value>) -> Result<Key> {
        let (label, value) = (label.into(), value.into());
        let key = self.0.fields.borrow_mut().add(label.clone(), value.clone())?;
        self.record(key, label, value);
        Ok(key)
    }

    /// Inserts a new field before `next`.
    pub fn insert_before(
        &self,
        next: Key,
        label: impl Into<Label>,
        value: impl Into<Value>,
    ) -> Result<Key> {
        let (label, value) = (label.into(), value.into());
        let key = self
            .0
            .fields
            .borrow_mut()
            .insert_before(next, label.clone(), value.clone())?;
        self.record(key, label, value);
        Ok(key)
    }

    /// Assigns many fields in order.
    pub fn update<L, V>(&self, fields: impl IntoIterator<Item = (L, V)>) -> Result<()>
    where
        L: Into<Label>,
        V: Into<Value>,
    {
        for (label, value) in fields {
            self.set(label.into(), value)?;
        }
        Ok(())
    }

    /// Replaces a field's value (or installed cell) with `Empty`.
    pub fn delete(&self, at: impl Into<FieldRef>) -> Result<Key> {
        let key = self.0.fields.borrow_mut().delete(at)?;
        let label = self.0.fields.borrow().get_label(key)?;
        self.record(key, label, Value::Empty);
        Ok(key)
    }

    /// Forgets a top-level field; recorded as its label becoming `Empty`.
    pub fn remove(&self, key: Key) -> Result<(Label, Value)> {
        let (label, value) = self.0.fields.borrow_mut().remove(key)?;
        self.record(key, label.clone(), Value::Empty);
        Ok((label, value))
    }

    pub fn relabel(&self, key: Key, label: impl Into<Label>) -> Result<()> {
        let label = label.into();
        let value = {
            let mut fields = self.0.fields.borrow_mut();
            fields.relabel(key, label.clone())?;
            fields.get(key)?
        };
        self.record(key, label, value);
        Ok(())
    }

    /// Replaces an installed cell with its current value.
    ///
    /// Plain fields are left untouched. A reference whose target is gone
    /// detaches to `Empty`. Returns the field's new value.
    pub fn detach(&self, at: impl Into<FieldRef>) -> Result<Value> {
        let at = at.into();
        let value = match self.raw(at.clone())? {
            Value::Cell(ReactiveCell::Reference(reference)) if reference.target().is_err() => {
                Value::Empty
            }
            _ => self.get(at.clone())?,
        };
        let key = {
            let mut fields = self.0.fields.borrow_mut();
            let key = fields.resolve(&at).ok_or_else(|| Error::not_found(format!("{:?}", at)))?;
            if !fields.get(key)?.is_cell() {
                return Ok(value);
            }
            fields.replace(key, value.clone())?;
            key
        };
        let label = self.0.fields.borrow().get_label(key)?;
        self.record(key, label, value.clone());
        Ok(value)
    }

    /// Stores `value` in a top-level slot without evaluation or recording.
    pub(crate) fn write_raw(&self, key: Key, value: Value) -> Result<()> {
        self.0.fields.borrow_mut().replace(key, value).map(|_| ())
    }

    // ---------------------------------------------------------------------
    // Derivation
    // ---------------------------------------------------------------------

    /// Creates an unnamed snapshot of this object.
    ///
    /// Plain values are copied and nested containers deep-copied, so later
    /// writes to either object are not seen by the other. Each cell is
    /// re-installed as its own copy: a derived cell evaluates against whichever
    /// object holds it, a reference keeps pointing at its original target.
    pub fn derive(&self) -> Result<Object> {
        self.derive_with(None)
    }

    pub fn derive_named(&self, name: impl Into<String>) -> Result<Object> {
        self.derive_with(Some(name.into()))
    }

    fn derive_with(&self, name: Option<String>) -> Result<Object> {
        let copy = Object::with_options(name, self.0.options);
        let fields: Vec<(Label, Value)> = self
            .0
            .fields
            .borrow()
            .fields()
            .map(|(label, value)| (label.clone(), value.clone()))
            .collect();
        for (label, value) in fields {
            let value = match value {
                Value::Tree(tree) => Value::Tree(Tree::new(tree.borrow().deep_copy()?)),
                Value::Cell(ReactiveCell::Derived(derived)) => {
                    Value::Cell(ReactiveCell::Derived(Rc::new((*derived).clone())))
                }
                other => other,
            };
            copy.add(label, value)?;
        }
        Ok(copy)
    }

    // ---------------------------------------------------------------------
    // Change tracking
    // ---------------------------------------------------------------------

    fn record(&self, key: Key, label: Label, value: Value) {
        self.0.changes.borrow_mut().record(key, label, value);
    }

    /// Returns true if any field was written since the last drain.
    pub fn has_changes(&self) -> bool {
        !self.0.changes.borrow().is_empty()
    }

    /// Drains the change buffer.
    pub fn take_changes(&self) -> FieldChanges {
        self.0.changes.borrow_mut().take()
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Object");
        s.field("id", &self.0.id.get());
        if let Some(name) = &self.0.name {
            s.field("name", name);
        }
        match self.0.fields.try_borrow() {
            Ok(fields) => s.field("fields", &*fields),
            Err(_) => s.field("fields", &"<borrowed>"),
        };
        s.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{Derived, Reference};
    use crate::computation::{define_computation, difference, interest, lit, local, sum, Arg};
    use crate::name::ObjectName;
    use alloc::string::ToString;
    use alloc::vec;

    fn end() -> Derived {
        Derived::new(sum([local("start"), local("length")]))
            .with_reaction("start", difference([local("end"), local("length")]))
    }

    fn task1() -> Object {
        let task1 = Object::new();
        task1.set("name", "task1").unwrap();
        task1.set("start", 1i64).unwrap();
        task1.set("length", 2i64).unwrap();
        task1.set("end", end()).unwrap();
        task1
    }

    #[test]
    fn test_render_evaluates_fields() {
        let task1 = task1();
        assert_eq!(
            task1.render().unwrap(),
            "Object{name: 'task1', start: 1, length: 2, end: 3}"
        );
        task1.set("start", 2i64).unwrap();
        assert_eq!(
            task1.render().unwrap(),
            "Object{name: 'task1', start: 2, length: 2, end: 4}"
        );
    }

    #[test]
    fn test_interdependent_tasks() {
        let task1 = task1();
        task1.set("start", 2i64).unwrap();

        let task2 = task1.derive().unwrap();
        task2.set("name", "task2").unwrap();
        task2.set("start", Reference::new(&task1, "end")).unwrap();
        assert_eq!(
            task2.render().unwrap(),
            "Object{name: 'task2', start: 4, length: 2, end: 6}"
        );

        task2.set("end", 5i64).unwrap();
        assert_eq!(
            task2.render().unwrap(),
            "Object{name: 'task2', start: 3, length: 2, end: 5}"
        );
        assert_eq!(
            task1.render().unwrap(),
            "Object{name: 'task1', start: 1, length: 2, end: 3}"
        );

        task2.set("length", 3i64).unwrap();
        assert_eq!(task2.get("end").unwrap(), Value::Int(6));

        let task3 = Object::new();
        task3.set("name", "task3").unwrap();
        task3.set("task1", Reference::new(&task1, "end")).unwrap();
        task3.set("task2", Reference::new(&task2, "end")).unwrap();
        task3
            .set(
                "total",
                Derived::new(sum([local("task1"), local("task2")]))
                    .with_reaction("task1", difference([local("total"), local("task2")])),
            )
            .unwrap();
        assert_eq!(
            task3.render().unwrap(),
            "Object{name: 'task3', task1: 3, task2: 6, total: 9}"
        );

        task3.set("total", 10i64).unwrap();
        assert_eq!(
            task3.render().unwrap(),
            "Object{name: 'task3', task1: 4, task2: 7, total: 11}"
        );
    }

    #[test]
    fn test_derived_copy_does_not_alias() {
        let task1 = task1();
        let task2 = task1.derive_named("task2").unwrap();
        task1.set("start", 10i64).unwrap();
        assert_eq!(task2.get("start").unwrap(), Value::Int(1));
        assert_eq!(task2.get("end").unwrap(), Value::Int(3));
        assert_eq!(task2.name(), Some("task2"));
        assert_ne!(task1.keys(), task2.keys());
    }

    #[test]
    fn test_derive_gives_each_field_its_own_cell() {
        let task1 = task1();
        let task2 = task1.derive().unwrap();
        let original = task1.raw("end").unwrap();
        let copied = task2.raw("end").unwrap();
        assert!(!original.as_cell().unwrap().ptr_eq(copied.as_cell().unwrap()));
        assert_ne!(original, copied);

        task2.set("end", 10i64).unwrap();
        assert_eq!(task2.get("start").unwrap(), Value::Int(8));
        assert_eq!(task1.get("end").unwrap(), Value::Int(3));
    }

    #[test]
    fn test_detach_dangling_reference() {
        let holder = Object::new();
        {
            let gone = Object::new();
            gone.set("x", 1i64).unwrap();
            holder.set("alias", Reference::new(&gone, "x")).unwrap();
            assert_eq!(holder.get("alias").unwrap(), Value::Int(1));
        }
        assert!(holder.get("alias").unwrap_err().is_not_found());
        assert!(holder.set("alias", 2i64).unwrap_err().is_not_found());

        assert_eq!(holder.detach("alias").unwrap(), Value::Empty);
        assert_eq!(holder.raw("alias").unwrap(), Value::Empty);
        holder.set("alias", 2i64).unwrap();
        assert_eq!(holder.get("alias").unwrap(), Value::Int(2));
    }

    #[test]
    fn test_derive_deep_copies_nested_containers() {
        let source = Object::new();
        source
            .set("inner", FieldTree::from_fields([("x", 1i64)]).unwrap())
            .unwrap();
        let copy = source.derive().unwrap();

        let inner = source.raw("inner").unwrap();
        inner.as_tree().unwrap().borrow_mut().set("x", 2i64).unwrap();
        let copied = copy.raw("inner").unwrap();
        assert_eq!(copied.as_tree().unwrap().borrow().get("x").unwrap(), Value::Int(1));
    }

    #[test]
    fn test_cycle_between_derived_fields() {
        let cycle = Object::new();
        cycle.set("name", "cycle").unwrap();
        cycle
            .set("first", Derived::new(sum([local("zero"), local("second")])))
            .unwrap();
        cycle
            .set("second", Derived::new(sum([local("zero"), local("first")])))
            .unwrap();
        cycle.set("zero", 0i64).unwrap();

        let err = cycle.get("first").unwrap_err();
        assert_eq!(err.to_string(), "Cycle detected: cycle.first");

        let err = cycle.set("first", 1i64).unwrap_err();
        assert_eq!(err, Error::cycle("cycle", Label::from("first")));

        // the guard is per call: unrelated reads still work afterwards
        assert_eq!(cycle.get("zero").unwrap(), Value::Int(0));
    }

    #[test]
    fn test_self_reference_cycle() {
        let cycle2 = Object::named("cycle2");
        cycle2.set("loop", Reference::new(&cycle2, "loop")).unwrap();

        let err = cycle2.get("loop").unwrap_err();
        assert_eq!(err.to_string(), "Cycle detected: cycle2.loop");
        let err = cycle2.set("loop", 1i64).unwrap_err();
        assert!(err.is_cycle());
    }

    #[test]
    fn test_cycle_across_objects() {
        let a = Object::named("a");
        let b = Object::named("b");
        a.set("x", Reference::new(&b, "y")).unwrap();
        b.set("y", Reference::new(&a, "x")).unwrap();

        let err = a.get("x").unwrap_err();
        assert_eq!(err, Error::cycle("a", Label::from("x")));
        let err = b.get("y").unwrap_err();
        assert_eq!(err, Error::cycle("b", Label::from("y")));
    }

    #[test]
    fn test_recursion_limit() {
        let options = EvalOptions::default().with_max_depth(3);
        let objects: Vec<Object> = (0..5)
            .map(|i| Object::with_options(Some(format!("o{}", i)), options))
            .collect();
        for pair in objects.windows(2) {
            pair[0].set("v", Reference::new(&pair[1], "v")).unwrap();
        }
        objects[4].set("v", 1i64).unwrap();

        assert_eq!(objects[2].get("v").unwrap(), Value::Int(1));
        assert_eq!(
            objects[0].get("v").unwrap_err(),
            Error::RecursionLimit { limit: 3 }
        );
    }

    #[test]
    fn test_nested_failure_is_deferred_to_outermost_read() {
        let fail = define_computation("fail", |_| Err(ComputationError::new("boom")));
        let first = define_computation("first", |args| Ok(args[0].clone()));

        let object = Object::new();
        object.set("a", 1i64).unwrap();
        object.set("bad", Derived::new(fail.bind(Vec::<Value>::new()))).unwrap();
        object
            .set("pick", Derived::new(first.bind([local("a"), local("bad")])))
            .unwrap();
        object
            .set("ok", Derived::new(sum([local("a"), local("a")])))
            .unwrap();

        let err = object.get("pick").unwrap_err();
        assert_eq!(
            err,
            Error::Computation(ComputationError::in_function("fail", "boom"))
        );
        assert_eq!(object.get("ok").unwrap(), Value::Int(2));
        assert_eq!(object.get("a").unwrap(), Value::Int(1));
        assert!(matches!(object.get("bad"), Err(Error::Computation(_))));
    }

    #[test]
    fn test_first_deferred_failure_wins() {
        let fail = |message: &'static str| {
            define_computation(message, move |_| Err(ComputationError::new(message)))
        };
        let object = Object::new();
        object
            .set("x", Derived::new(fail("x").bind(Vec::<Value>::new())))
            .unwrap();
        object
            .set("y", Derived::new(fail("y").bind(Vec::<Value>::new())))
            .unwrap();
        object
            .set("both", Derived::new(sum([local("x"), local("y")])))
            .unwrap();

        let err = object.get("both").unwrap_err();
        assert_eq!(err, Error::Computation(ComputationError::in_function("x", "x")));
    }

    #[test]
    fn test_value_names_as_arguments() {
        let account = Object::named("account");
        let this = account.handle();
        account.set("savings", 1000i64).unwrap();
        account.set("creditcard", 1000i64).unwrap();
        account
            .set(
                "total",
                Derived::new(sum([this.field("savings"), this.field("creditcard")])),
            )
            .unwrap();
        account
            .set(
                "adjusted",
                Derived::new(interest([Arg::from(local("total")), lit(0.01)])),
            )
            .unwrap();

        assert_eq!(account.get("total").unwrap(), Value::Int(2000));
        assert_eq!(account.get("adjusted").unwrap(), Value::Float(2020.0));

        account.set("savings", 2000i64).unwrap();
        assert_eq!(account.get("total").unwrap(), Value::Int(3000));
        assert_eq!(account.get("adjusted").unwrap(), Value::Float(3030.0));
        assert_eq!(ObjectName::new(&account).name(), "account");
    }

    #[test]
    fn test_changes_record_effective_values() {
        let task1 = task1();
        let changes = task1.take_changes();
        assert_eq!(changes.len(), 4);
        assert!(!task1.has_changes());

        task1.set("end", 5i64).unwrap();
        let changes: Vec<(Label, Value)> = task1.take_changes().into_values().collect();
        assert_eq!(
            changes,
            vec![
                (Label::from("start"), Value::Int(3)),
                (Label::from("end"), Value::Int(5)),
            ]
        );
    }

    #[test]
    fn test_delete_remove_relabel_are_recorded() {
        let object = Object::from_fields([("a", 1i64), ("b", 2i64), ("c", 3i64)]).unwrap();
        object.take_changes();

        let a = object.delete("a").unwrap();
        let b = object.with_fields(|fields| fields.get_key(&"b".into())).unwrap();
        object.remove(b).unwrap();
        let c = object.with_fields(|fields| fields.get_key(&"c".into())).unwrap();
        object.relabel(c, "d").unwrap();

        let changes = object.take_changes();
        assert_eq!(changes[&a], (Label::from("a"), Value::Empty));
        assert_eq!(changes[&b], (Label::from("b"), Value::Empty));
        assert_eq!(changes[&c], (Label::from("d"), Value::Int(3)));
        assert_eq!(object.labels(), vec![Label::from("a"), Label::from("d")]);
    }

    #[test]
    fn test_add_insert_before_and_update_are_recorded() {
        let object = Object::new();
        let b = object.add("b", 2i64).unwrap();
        let a = object.insert_before(b, "a", 1i64).unwrap();
        assert!(object.add("a", 5i64).is_err());
        object.update([("b", 20i64), ("c", 30i64)]).unwrap();

        assert_eq!(
            object.labels(),
            vec![Label::from("a"), Label::from("b"), Label::from("c")]
        );
        let changes = object.take_changes();
        assert_eq!(changes.len(), 3);
        assert_eq!(changes[&a], (Label::from("a"), Value::Int(1)));
        assert_eq!(changes[&b], (Label::from("b"), Value::Int(20)));
    }

    #[test]
    fn test_detach_turns_cell_into_plain_value() {
        let task1 = task1();
        assert_eq!(task1.detach("end").unwrap(), Value::Int(3));
        assert!(!task1.raw("end").unwrap().is_cell());

        task1.set("start", 5i64).unwrap();
        assert_eq!(task1.get("end").unwrap(), Value::Int(3));
        assert_eq!(task1.detach("start").unwrap(), Value::Int(5));
    }

    #[test]
    fn test_installing_plain_value_over_cell_needs_detach() {
        let task1 = task1();
        task1.set("end", 10i64).unwrap();
        assert!(task1.raw("end").unwrap().is_cell());
        assert_eq!(task1.get("start").unwrap(), Value::Int(8));
    }

    #[test]
    fn test_display_name_fallbacks() {
        assert_eq!(Object::named("x").display_name(), "x");
        let object = Object::new();
        assert_eq!(object.display_name(), format!("#{}", object.id().get()));
        object.set("name", "from-field").unwrap();
        assert_eq!(object.display_name(), "from-field");
    }

    #[test]
    fn test_nested_key_reads_raw_value() {
        let object = Object::new();
        let inner = FieldTree::from_fields([("forename", "John")]).unwrap();
        let forename = inner.get_key(&"forename".into()).unwrap();
        object.set("name", inner).unwrap();

        assert_eq!(object.get(forename).unwrap(), Value::from("John"));
        assert!(object.get("forename").unwrap_err().is_not_found());
        object.set(forename, "Jane").unwrap();
        assert_eq!(object.get(forename).unwrap(), Value::from("Jane"));
    }

}
