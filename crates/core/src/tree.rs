//! Ordered field container.
//!
//! A [`FieldTree`] is an insertion-ordered map of fields, where a field is a
//! label and value pair addressed by a permanent [`Key`]. Values that are
//! themselves containers ([`Tree`] handles) are tracked so keys can be looked
//! up through any depth of nesting, while label lookup stays shallow:
//!
//! ```
//! use fieldtree_core::{FieldTree, Tree, Value};
//!
//! let mut person = FieldTree::new();
//! let gender = person.add("gender", "male").unwrap();
//! person.set("website", "example.com").unwrap();
//!
//! let name = Tree::new(FieldTree::from_fields([("forename", "John"), ("surname", "Smith")]).unwrap());
//! let forename = name.borrow().get_key(&"forename".into()).unwrap();
//! person.set("name", name).unwrap();
//!
//! person.relabel(gender, "sex").unwrap();
//! assert_eq!(person.get(gender).unwrap(), Value::from("male"));
//! assert_eq!(person.get(forename).unwrap(), Value::from("John"));
//! assert!(person.get("forename").is_err());
//! ```

use crate::error::{Error, Result};
use crate::key::{FieldRef, Key, Label};
use crate::value::Value;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::{Ref, RefCell, RefMut};
use core::fmt;
use hashbrown::HashMap;

/// Shared handle to a nested container.
///
/// Equality and hashing of a `Value::Tree` use the identity of this handle.
#[derive(Clone)]
pub struct Tree(Rc<RefCell<FieldTree>>);

impl Tree {
    /// Wraps a container in a shareable handle.
    pub fn new(tree: FieldTree) -> Self {
        Tree(Rc::new(RefCell::new(tree)))
    }

    /// Immutably borrows the container.
    #[inline]
    pub fn borrow(&self) -> Ref<'_, FieldTree> {
        self.0.borrow()
    }

    /// Mutably borrows the container.
    #[inline]
    pub fn borrow_mut(&self) -> RefMut<'_, FieldTree> {
        self.0.borrow_mut()
    }

    /// Returns true if both handles point at the same container.
    #[inline]
    pub fn ptr_eq(&self, other: &Tree) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    /// Fails if this container is currently being mutated, which means it is
    /// (transitively) the container it is about to be inserted into.
    fn ensure_nestable(&self) -> Result<()> {
        let inner = self
            .0
            .try_borrow()
            .map_err(|_| Error::invalid_argument("a container cannot contain itself"))?;
        for child in &inner.trees {
            child.ensure_nestable()?;
        }
        Ok(())
    }
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(tree) => fmt::Debug::fmt(&*tree, f),
            Err(_) => write!(f, "FieldTree(<borrowed>)"),
        }
    }
}

/// Ordered key -> (label, value) store with shallow label lookup and deep key
/// lookup.
#[derive(Default)]
pub struct FieldTree {
    /// key -> (label, value)
    fields: HashMap<Key, (Label, Value)>,
    /// label -> key, for non-empty labels only
    labels: HashMap<Label, Key>,
    /// insertion order
    order: Vec<Key>,
    /// every container currently held as a field value, once per field
    trees: Vec<Tree>,
}

impl FieldTree {
    /// Creates an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a container from ordered (label, value) pairs.
    ///
    /// Pairs are assigned in order, so a repeated label overwrites the value
    /// of its first occurrence.
    pub fn from_fields<L, V>(fields: impl IntoIterator<Item = (L, V)>) -> Result<Self>
    where
        L: Into<Label>,
        V: Into<Value>,
    {
        let mut tree = Self::new();
        for (label, value) in fields {
            tree.set(label.into(), value)?;
        }
        Ok(tree)
    }

    /// Returns the number of top-level fields.
    #[inline]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Key membership is deep, label membership is shallow.
    pub fn contains(&self, at: impl Into<FieldRef>) -> bool {
        match at.into() {
            FieldRef::Key(key) => self.has_tree_key(key),
            FieldRef::Label(label) => self.has_label(&label),
        }
    }

    /// Returns true if `key` belongs to this container itself.
    #[inline]
    pub fn has_key(&self, key: Key) -> bool {
        self.fields.contains_key(&key)
    }

    /// Returns true if `key` belongs to this container or any nested one.
    pub fn has_tree_key(&self, key: Key) -> bool {
        self.has_key(key) || self.trees.iter().any(|tree| tree.borrow().has_tree_key(key))
    }

    #[inline]
    pub fn has_label(&self, label: &Label) -> bool {
        self.labels.contains_key(label)
    }

    // ---------------------------------------------------------------------
    // Lookup
    // ---------------------------------------------------------------------

    /// Returns a value by key (deep) or by label (shallow).
    pub fn get(&self, at: impl Into<FieldRef>) -> Result<Value> {
        match at.into() {
            FieldRef::Key(key) => self.get_field(key).map(|(_, value)| value),
            FieldRef::Label(label) => self.get_label_value(&label),
        }
    }

    /// Returns the (label, value) pair for a key, searching nested containers.
    pub fn get_field(&self, key: Key) -> Result<(Label, Value)> {
        if let Some(field) = self.fields.get(&key) {
            return Ok(field.clone());
        }
        for tree in &self.trees {
            if let Ok(field) = tree.borrow().get_field(key) {
                return Ok(field);
            }
        }
        Err(Error::no_key(key))
    }

    /// Returns the key of a top-level label.
    pub fn get_key(&self, label: &Label) -> Result<Key> {
        self.labels
            .get(label)
            .copied()
            .ok_or_else(|| Error::no_label(label))
    }

    /// Returns the label of a key, searching nested containers.
    pub fn get_label(&self, key: Key) -> Result<Label> {
        self.get_field(key).map(|(label, _)| label)
    }

    fn get_label_value(&self, label: &Label) -> Result<Value> {
        let key = self.get_key(label)?;
        self.fields
            .get(&key)
            .map(|(_, value)| value.clone())
            .ok_or_else(|| Error::no_key(key))
    }

    /// Resolves a field reference to the key it designates, if the field is
    /// held by this container itself.
    pub fn resolve(&self, at: &FieldRef) -> Option<Key> {
        match at {
            FieldRef::Key(key) if self.has_key(*key) => Some(*key),
            FieldRef::Key(_) => None,
            FieldRef::Label(label) => self.labels.get(label).copied(),
        }
    }

    // ---------------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------------

    /// Appends a new field and returns its freshly minted key.
    ///
    /// Fails with `InvalidArgument` if `label` is already in use; use
    /// [`set`](Self::set) to overwrite.
    pub fn add(&mut self, label: impl Into<Label>, value: impl Into<Value>) -> Result<Key> {
        let key = self.insert_new(label.into(), value.into())?;
        self.order.push(key);
        Ok(key)
    }

    /// Appends a new field without a label.
    pub fn add_unlabelled(&mut self, value: impl Into<Value>) -> Result<Key> {
        self.add(Label::Empty, value)
    }

    /// Inserts a new field immediately before `next` in iteration order.
    pub fn insert_before(
        &mut self,
        next: Key,
        label: impl Into<Label>,
        value: impl Into<Value>,
    ) -> Result<Key> {
        let index = self
            .order
            .iter()
            .position(|k| *k == next)
            .ok_or_else(|| Error::no_key(next))?;
        let key = self.insert_new(label.into(), value.into())?;
        self.order.insert(index, key);
        Ok(key)
    }

    fn insert_new(&mut self, label: Label, value: Value) -> Result<Key> {
        if !label.is_empty() && self.has_label(&label) {
            return Err(Error::invalid_argument(alloc::format!(
                "label {:?} is already in use",
                label
            )));
        }
        if let Value::Tree(tree) = &value {
            tree.ensure_nestable()?;
            self.trees.push(tree.clone());
        }
        let key = Key::next();
        if !label.is_empty() {
            self.labels.insert(label.clone(), key);
        }
        self.fields.insert(key, (label, value));
        Ok(key)
    }

    /// Assigns a value by label or key.
    ///
    /// A new label is appended like [`add`](Self::add). An existing label or
    /// key keeps its slot and position; keys of nested containers are
    /// followed. Returns the key of the written slot.
    pub fn set(&mut self, at: impl Into<FieldRef>, value: impl Into<Value>) -> Result<Key> {
        let value = value.into();
        match at.into() {
            FieldRef::Label(label) => match self.labels.get(&label).copied() {
                Some(key) => self.replace(key, value).map(|_| key),
                None => self.add(label, value),
            },
            FieldRef::Key(key) => {
                if self.has_key(key) {
                    return self.replace(key, value).map(|_| key);
                }
                for tree in &self.trees {
                    if tree.borrow().has_tree_key(key) {
                        return tree.borrow_mut().set(key, value);
                    }
                }
                Err(Error::no_key(key))
            }
        }
    }

    /// Replaces the value held by a top-level key, returning the old value.
    pub fn replace(&mut self, key: Key, value: Value) -> Result<Value> {
        if !self.has_key(key) {
            return Err(Error::no_key(key));
        }
        if let Value::Tree(tree) = &value {
            tree.ensure_nestable()?;
        }
        let slot = self.fields.get_mut(&key).ok_or_else(|| Error::no_key(key))?;
        let old = core::mem::replace(&mut slot.1, value);
        if let Value::Tree(tree) = &old {
            self.forget_tree(tree);
        }
        if let Some(Value::Tree(tree)) = self.fields.get(&key).map(|(_, v)| v) {
            self.trees.push(tree.clone());
        }
        Ok(old)
    }

    /// Replaces a field's value with `Empty`, keeping its key and label.
    pub fn delete(&mut self, at: impl Into<FieldRef>) -> Result<Key> {
        match at.into() {
            FieldRef::Label(label) => {
                let key = self.get_key(&label)?;
                self.replace(key, Value::Empty).map(|_| key)
            }
            FieldRef::Key(key) => self.set(key, Value::Empty),
        }
    }

    /// Forgets a top-level field entirely.
    ///
    /// Prefer [`delete`](Self::delete): keys held elsewhere become dangling.
    pub fn remove(&mut self, key: Key) -> Result<(Label, Value)> {
        let (label, value) = self.fields.remove(&key).ok_or_else(|| Error::no_key(key))?;
        if !label.is_empty() {
            self.labels.remove(&label);
        }
        self.order.retain(|k| *k != key);
        if let Value::Tree(tree) = &value {
            self.forget_tree(tree);
        }
        Ok((label, value))
    }

    /// Renames a top-level field without touching its value or position.
    pub fn relabel(&mut self, key: Key, label: impl Into<Label>) -> Result<()> {
        let label = label.into();
        let current = self
            .fields
            .get(&key)
            .map(|(l, _)| l.clone())
            .ok_or_else(|| Error::no_key(key))?;
        if current == label {
            return Ok(());
        }
        if !label.is_empty() && self.has_label(&label) {
            return Err(Error::invalid_argument(alloc::format!(
                "label {:?} is already in use",
                label
            )));
        }
        if !current.is_empty() {
            self.labels.remove(&current);
        }
        if !label.is_empty() {
            self.labels.insert(label.clone(), key);
        }
        if let Some(slot) = self.fields.get_mut(&key) {
            slot.0 = label;
        }
        Ok(())
    }

    /// Relabels and replaces a top-level field in one step.
    pub fn change_field(
        &mut self,
        key: Key,
        label: impl Into<Label>,
        value: impl Into<Value>,
    ) -> Result<()> {
        self.relabel(key, label)?;
        self.replace(key, value.into()).map(|_| ())
    }

    /// Assigns many fields, skipping labels listed in `ignore`.
    pub fn update<L, V>(
        &mut self,
        fields: impl IntoIterator<Item = (L, V)>,
        ignore: &[Label],
    ) -> Result<()>
    where
        L: Into<Label>,
        V: Into<Value>,
    {
        for (label, value) in fields {
            let label = label.into();
            if !ignore.contains(&label) {
                self.set(label, value)?;
            }
        }
        Ok(())
    }

    /// Returns a value snapshot with fresh keys; nested containers are copied
    /// rather than shared.
    pub fn deep_copy(&self) -> Result<FieldTree> {
        let mut copy = FieldTree::new();
        for (label, value) in self.fields() {
            let value = match value {
                Value::Tree(tree) => Value::Tree(Tree::new(tree.borrow().deep_copy()?)),
                other => other.clone(),
            };
            copy.add(label.clone(), value)?;
        }
        Ok(copy)
    }

    fn forget_tree(&mut self, tree: &Tree) {
        if let Some(index) = self.trees.iter().position(|t| t.ptr_eq(tree)) {
            self.trees.swap_remove(index);
        }
    }

    // ---------------------------------------------------------------------
    // Iteration
    // ---------------------------------------------------------------------

    /// Top-level (label, value) pairs in order.
    pub fn fields(&self) -> impl Iterator<Item = (&Label, &Value)> + '_ {
        self.order
            .iter()
            .filter_map(move |key| self.fields.get(key).map(|(l, v)| (l, v)))
    }

    /// Top-level keys in order.
    pub fn keys(&self) -> impl Iterator<Item = Key> + '_ {
        self.order.iter().copied()
    }

    pub fn labels(&self) -> impl Iterator<Item = &Label> + '_ {
        self.fields().map(|(label, _)| label)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> + '_ {
        self.fields().map(|(_, value)| value)
    }

    /// Depth-first walk inlining nested containers' fields in place of the
    /// field that holds them.
    pub fn walk(&self) -> TreeWalk<'_> {
        TreeWalk {
            root: self,
            root_pos: 0,
            stack: Vec::new(),
        }
    }

    /// Flattened (label, value) pairs; container values themselves are skipped.
    pub fn tree_fields(&self) -> impl Iterator<Item = (Label, Value)> + '_ {
        self.walk().map(|(_, label, value)| (label, value))
    }

    pub fn tree_keys(&self) -> impl Iterator<Item = Key> + '_ {
        self.walk().map(|(key, _, _)| key)
    }

    pub fn tree_labels(&self) -> impl Iterator<Item = Label> + '_ {
        self.walk().map(|(_, label, _)| label)
    }

    pub fn tree_values(&self) -> impl Iterator<Item = Value> + '_ {
        self.walk().map(|(_, _, value)| value)
    }

    fn entry_at(&self, pos: usize) -> Option<(Key, Label, Value)> {
        let key = *self.order.get(pos)?;
        self.fields
            .get(&key)
            .map(|(label, value)| (key, label.clone(), value.clone()))
    }
}

impl fmt::Debug for FieldTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tuple = f.debug_tuple("FieldTree");
        for field in self.fields() {
            tuple.field(&field);
        }
        tuple.finish()
    }
}

/// Lazy depth-first iterator over a container and everything nested in it.
///
/// Nested containers are borrowed only for the duration of each step, so
/// they may be mutated between calls to `next`; the walk then observes the
/// live contents.
pub struct TreeWalk<'a> {
    root: &'a FieldTree,
    root_pos: usize,
    stack: Vec<(Tree, usize)>,
}

impl Iterator for TreeWalk<'_> {
    type Item = (Key, Label, Value);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.stack.last_mut() {
                Some((tree, pos)) => {
                    let entry = tree.borrow().entry_at(*pos);
                    *pos += 1;
                    match entry {
                        Some(entry) => entry,
                        None => {
                            self.stack.pop();
                            continue;
                        }
                    }
                }
                None => {
                    let entry = self.root.entry_at(self.root_pos)?;
                    self.root_pos += 1;
                    entry
                }
            };
            match entry {
                (_, _, Value::Tree(tree)) => self.stack.push((tree, 0)),
                field => return Some(field),
            }
        }
    }
}
