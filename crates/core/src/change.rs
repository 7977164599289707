//! Per-object change buffer.

use crate::key::{Key, Label};
use crate::value::Value;
use alloc::collections::BTreeMap;

/// Fields touched since the last drain, keyed by field key.
pub type FieldChanges = BTreeMap<Key, (Label, Value)>;

/// Records the latest (label, value) of every field written since the buffer
/// was last drained. Writing the same field twice keeps only the later write.
#[derive(Clone, Debug, Default)]
pub struct ChangeTracker {
    changes: FieldChanges,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a write.
    pub fn record(&mut self, key: Key, label: Label, value: Value) {
        self.changes.insert(key, (label, value));
    }

    /// Returns true if nothing has been recorded.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Returns the buffered changes without draining them.
    pub fn peek(&self) -> &FieldChanges {
        &self.changes
    }

    /// Drains the buffer.
    pub fn take(&mut self) -> FieldChanges {
        core::mem::take(&mut self.changes)
    }
}
