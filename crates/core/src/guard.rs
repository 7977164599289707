//! Evaluation guard.
//!
//! One [`EvalContext`] lives for exactly one outermost `get`/`set` call and is
//! threaded through every nested cell evaluation, across objects, so that a
//! chain revisiting the same (object, field) pair is reported as a cycle
//! instead of recursing forever.

use crate::error::{Error, Result};
use crate::key::{Key, Label};
use crate::object::{Object, ObjectId};
use alloc::vec::Vec;
use hashbrown::HashSet;

/// Default cap on nested cell evaluations within one outer call.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Evaluation options.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EvalOptions {
    /// Maximum number of cell evaluations in flight at once.
    pub max_depth: usize,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl EvalOptions {
    /// Sets the nesting cap.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// Per-call evaluation state: in-flight fingerprints and the stack of
/// objects that `local` arguments resolve against.
pub(crate) struct EvalContext {
    in_flight: HashSet<(ObjectId, Key)>,
    targets: Vec<Object>,
    options: EvalOptions,
}

impl EvalContext {
    pub(crate) fn new(options: EvalOptions) -> Self {
        Self {
            in_flight: HashSet::new(),
            targets: Vec::new(),
            options,
        }
    }

    /// Marks (owner, key) as being evaluated.
    pub(crate) fn enter(&mut self, owner: &Object, key: Key, label: &Label) -> Result<()> {
        if self.in_flight.len() >= self.options.max_depth {
            return Err(Error::RecursionLimit {
                limit: self.options.max_depth,
            });
        }
        if !self.in_flight.insert((owner.id(), key)) {
            let object = owner.display_name();
            tracing::trace!(object = %object, label = %label, "cycle detected");
            return Err(Error::cycle(object, label.clone()));
        }
        tracing::trace!(object = owner.id().get(), key = key.get(), "evaluating cell");
        Ok(())
    }

    /// Clears the fingerprint set by a matching `enter`.
    pub(crate) fn exit(&mut self, owner: &Object, key: Key) {
        self.in_flight.remove(&(owner.id(), key));
    }

    /// Returns true if no cell is currently being evaluated.
    #[cfg(test)]
    pub(crate) fn is_idle(&self) -> bool {
        self.in_flight.is_empty() && self.targets.is_empty()
    }

    pub(crate) fn push_target(&mut self, target: Object) {
        self.targets.push(target);
    }

    pub(crate) fn pop_target(&mut self) {
        self.targets.pop();
    }

    pub(crate) fn current_target(&self) -> Result<Object> {
        self.targets
            .last()
            .cloned()
            .ok_or_else(|| Error::invalid_argument("local argument used outside an object"))
    }
}
