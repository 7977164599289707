//! Inverted label/value index.
//!
//! Maps `label -> value -> {object names}` for the committed state of every
//! field in a packet. The index is maintained incrementally from commit
//! changesets: when a field's committed value changes, the entry for its old
//! value is dropped before the new one is added.

use crate::change_set::Changeset;
use alloc::collections::BTreeSet;
use alloc::string::{String, ToString};
use fieldtree_core::{Key, Label, Value};
use hashbrown::HashMap;

/// Posting list: the fields holding one (label, value) pair.
type Postings = BTreeSet<(String, Key)>;

#[derive(Debug, Default)]
pub struct ValueIndex {
    entries: HashMap<Label, HashMap<Value, Postings>>,
    /// Indexed (label, value) of each field, for stale entry removal.
    current: HashMap<(String, Key), (Label, Value)>,
}

impl ValueIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies every field change in a changeset.
    pub fn apply(&mut self, changeset: &Changeset) {
        for (name, changes) in changeset.iter() {
            for (key, label, value) in changes.iter() {
                self.update(name, key, label, value);
            }
        }
    }

    /// Indexes one field's committed value.
    ///
    /// Unlabelled fields and values without an index form (empty values,
    /// containers, cells) only clear the field's previous entry.
    pub fn update(&mut self, name: &str, key: Key, label: &Label, value: &Value) {
        let field = (name.to_string(), key);
        if let Some((old_label, old_value)) = self.current.remove(&field) {
            self.unlink(&field, &old_label, &old_value);
        }

        let indexed = match value.index_key() {
            Some(indexed) if !label.is_empty() => indexed,
            _ => return,
        };
        self.entries
            .entry(label.clone())
            .or_default()
            .entry(indexed.clone())
            .or_default()
            .insert(field.clone());
        self.current.insert(field, (label.clone(), indexed));
    }

    fn unlink(&mut self, field: &(String, Key), label: &Label, value: &Value) {
        let values = match self.entries.get_mut(label) {
            Some(values) => values,
            None => {
                tracing::warn!(object = %field.0, label = %label, "index entry missing");
                return;
            }
        };
        let removed = match values.get_mut(value) {
            Some(postings) => {
                let removed = postings.remove(field);
                if postings.is_empty() {
                    values.remove(value);
                }
                removed
            }
            None => false,
        };
        if values.is_empty() {
            self.entries.remove(label);
        }
        if !removed {
            tracing::warn!(object = %field.0, label = %label, "index entry missing");
        }
    }

    /// Returns the names of objects with a field `label` committed as `value`.
    pub fn lookup(&self, label: &Label, value: &Value) -> BTreeSet<String> {
        let Some(indexed) = value.index_key() else {
            return BTreeSet::new();
        };
        self.entries
            .get(label)
            .and_then(|values| values.get(&indexed))
            .map(|postings| postings.iter().map(|(name, _)| name.clone()).collect())
            .unwrap_or_default()
    }

    /// Returns the labels that currently have entries.
    pub fn labels(&self) -> impl Iterator<Item = &Label> + '_ {
        self.entries.keys()
    }

    /// Returns the number of indexed fields.
    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    /// Drops every entry of a removed object.
    pub fn forget(&mut self, name: &str) {
        let fields: alloc::vec::Vec<(String, Key)> = self
            .current
            .keys()
            .filter(|(n, _)| n == name)
            .cloned()
            .collect();
        for field in fields {
            if let Some((label, value)) = self.current.remove(&field) {
                self.unlink(&field, &label, &value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;

    fn names(set: BTreeSet<String>) -> Vec<String> {
        set.into_iter().collect()
    }

    #[test]
    fn test_lookup_after_update() {
        let mut index = ValueIndex::new();
        let (a, b) = (Key::next(), Key::next());
        index.update("alice", a, &Label::from("city"), &Value::from("Paris"));
        index.update("bob", b, &Label::from("city"), &Value::from("Paris"));

        assert_eq!(
            names(index.lookup(&Label::from("city"), &Value::from("Paris"))),
            vec!["alice".to_string(), "bob".to_string()]
        );
        assert!(index.lookup(&Label::from("city"), &Value::from("Rome")).is_empty());
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_stale_entry_is_replaced() {
        let mut index = ValueIndex::new();
        let key = Key::next();
        index.update("alice", key, &Label::from("city"), &Value::from("Paris"));
        index.update("alice", key, &Label::from("city"), &Value::from("Rome"));

        assert!(index.lookup(&Label::from("city"), &Value::from("Paris")).is_empty());
        assert_eq!(
            names(index.lookup(&Label::from("city"), &Value::from("Rome"))),
            vec!["alice".to_string()]
        );
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_relabel_moves_entry() {
        let mut index = ValueIndex::new();
        let key = Key::next();
        index.update("alice", key, &Label::from("town"), &Value::Int(1));
        index.update("alice", key, &Label::from("city"), &Value::Int(1));

        assert!(index.lookup(&Label::from("town"), &Value::Int(1)).is_empty());
        assert_eq!(index.labels().collect::<Vec<_>>(), vec![&Label::from("city")]);
    }

    #[test]
    fn test_unindexable_values_clear_entry() {
        let mut index = ValueIndex::new();
        let key = Key::next();
        index.update("alice", key, &Label::from("city"), &Value::from("Paris"));
        index.update("alice", key, &Label::from("city"), &Value::Empty);
        assert!(index.is_empty());

        index.update("alice", Key::next(), &Label::Empty, &Value::Int(3));
        assert!(index.is_empty());
    }

    #[test]
    fn test_sets_are_normalized() {
        let mut index = ValueIndex::new();
        let raw = Value::Set(vec![Value::from("b"), Value::from("a")]);
        index.update("alice", Key::next(), &Label::from("tags"), &raw);

        let query = Value::set(vec![Value::from("a"), Value::from("b")]);
        assert_eq!(
            names(index.lookup(&Label::from("tags"), &query)),
            vec!["alice".to_string()]
        );
    }

    #[test]
    fn test_same_value_in_two_fields_of_one_object() {
        let mut index = ValueIndex::new();
        let (a, b) = (Key::next(), Key::next());
        index.update("alice", a, &Label::from("x"), &Value::Int(1));
        index.update("alice", b, &Label::from("x"), &Value::Int(1));
        index.update("alice", a, &Label::from("x"), &Value::Int(2));

        assert_eq!(
            names(index.lookup(&Label::from("x"), &Value::Int(1))),
            vec!["alice".to_string()]
        );
    }

    #[test]
    fn test_forget_object() {
        let mut index = ValueIndex::new();
        index.update("alice", Key::next(), &Label::from("x"), &Value::Int(1));
        index.update("bob", Key::next(), &Label::from("x"), &Value::Int(1));
        index.forget("alice");
        assert_eq!(
            names(index.lookup(&Label::from("x"), &Value::Int(1))),
            vec!["bob".to_string()]
        );
    }
}
