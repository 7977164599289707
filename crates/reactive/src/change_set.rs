//! Commit changesets.
//!
//! A [`Changeset`] is what one packet commit produces: for every object that
//! was written since the previous commit, the latest (label, value) of each
//! field it touched.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use fieldtree_core::{FieldChanges, Key, Label, Value};

/// The changed fields of one object.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjectChanges {
    fields: FieldChanges,
}

impl ObjectChanges {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the changed value recorded under `label`, if any.
    pub fn get(&self, label: &Label) -> Option<&Value> {
        self.fields
            .values()
            .find(|(l, _)| l == label)
            .map(|(_, value)| value)
    }

    /// Returns the changed value recorded for `key`.
    pub fn get_key(&self, key: Key) -> Option<&(Label, Value)> {
        self.fields.get(&key)
    }

    /// Returns true if `label` was changed to exactly `value`.
    pub fn has(&self, label: &Label, value: &Value) -> bool {
        self.get(label) == Some(value)
    }

    pub fn labels(&self) -> impl Iterator<Item = &Label> + '_ {
        self.fields.values().map(|(label, _)| label)
    }

    /// Iterates (key, label, value) in key order.
    pub fn iter(&self) -> impl Iterator<Item = (Key, &Label, &Value)> + '_ {
        self.fields
            .iter()
            .map(|(key, (label, value))| (*key, label, value))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Adds a field change, replacing an earlier change to the same key.
    #[inline]
    pub fn record(&mut self, key: Key, label: Label, value: Value) {
        self.fields.insert(key, (label, value));
    }

    /// Merges later changes into this one.
    pub fn merge(&mut self, other: ObjectChanges) {
        self.fields.extend(other.fields);
    }
}

impl From<FieldChanges> for ObjectChanges {
    fn from(fields: FieldChanges) -> Self {
        Self { fields }
    }
}

/// Changes committed across all objects of a packet, by object name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Changeset {
    objects: BTreeMap<String, ObjectChanges>,
}

impl Changeset {
    /// Creates a new empty changeset.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the changes of one object, merging with any already present.
    /// Empty change lists are ignored.
    pub fn insert(&mut self, name: impl Into<String>, changes: ObjectChanges) {
        if changes.is_empty() {
            return;
        }
        self.objects.entry(name.into()).or_default().merge(changes);
    }

    pub fn get(&self, name: &str) -> Option<&ObjectChanges> {
        self.objects.get(name)
    }

    /// Iterates objects in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ObjectChanges)> + '_ {
        self.objects
            .iter()
            .map(|(name, changes)| (name.as_str(), changes))
    }

    pub fn object_names(&self) -> Vec<&str> {
        self.objects.keys().map(String::as_str).collect()
    }

    /// Returns true if no object changed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Returns the number of changed objects.
    #[inline]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns the number of changed fields across all objects.
    pub fn field_count(&self) -> usize {
        self.objects.values().map(ObjectChanges::len).sum()
    }

    /// Merges a later changeset into this one.
    pub fn merge(&mut self, other: Changeset) {
        for (name, changes) in other.objects {
            self.insert(name, changes);
        }
    }

    /// Clears all changes.
    pub fn clear(&mut self) {
        self.objects.clear();
    }
}
