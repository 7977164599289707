//! Value type definitions for field trees.
//!
//! This module defines the `Value` enum stored in every field slot. Besides
//! plain data it can hold a nested container ([`Tree`]) or a reactive cell
//! ([`ReactiveCell`]) that an [`Object`](crate::Object) evaluates on access.

use crate::cell::{Derived, ReactiveCell, Reference};
use crate::error::ComputationError;
use crate::tree::{FieldTree, Tree};
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};

/// A value stored in a field slot.
#[derive(Clone, Default)]
pub enum Value {
    /// Placeholder left behind by `delete`.
    #[default]
    Empty,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point
    Float(f64),
    /// UTF-8 string
    Str(String),
    /// Ordered sequence
    List(Vec<Value>),
    /// Unordered collection. Member order and duplicates are ignored by
    /// comparison and hashing; [`Value::set`] stores the canonical form.
    Set(Vec<Value>),
    /// Nested container, shared by handle.
    Tree(Tree),
    /// Derived or reference cell.
    Cell(ReactiveCell),
}

impl Value {
    /// Builds a set value in canonical (sorted, deduplicated) form.
    pub fn set(items: impl IntoIterator<Item = Value>) -> Self {
        let mut items: Vec<Value> = items.into_iter().collect();
        items.sort();
        items.dedup();
        Value::Set(items)
    }

    /// Returns true if this value is `Empty`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    /// Returns true if this value is a reactive cell.
    #[inline]
    pub fn is_cell(&self) -> bool {
        matches!(self, Value::Cell(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as a float, promoting integers.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(v) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) | Value::Set(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn as_tree(&self) -> Option<&Tree> {
        match self {
            Value::Tree(tree) => Some(tree),
            _ => None,
        }
    }

    pub fn as_cell(&self) -> Option<&ReactiveCell> {
        match self {
            Value::Cell(cell) => Some(cell),
            _ => None,
        }
    }

    /// Returns a short name for the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Empty => "empty",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Tree(_) => "tree",
            Value::Cell(_) => "cell",
        }
    }

    /// Returns the hashable, order-independent form used for indexing.
    ///
    /// Sets are sorted and deduplicated, lists are normalized element-wise.
    /// Empty values, containers and cells are not indexable and yield `None`.
    pub fn index_key(&self) -> Option<Value> {
        match self {
            Value::Empty | Value::Tree(_) | Value::Cell(_) => None,
            Value::List(items) => items
                .iter()
                .map(Value::index_key)
                .collect::<Option<Vec<_>>>()
                .map(Value::List),
            Value::Set(items) => items
                .iter()
                .map(Value::index_key)
                .collect::<Option<Vec<_>>>()
                .map(Value::set),
            other => Some(other.clone()),
        }
    }

    /// Adds two values: numeric addition with int-to-float promotion,
    /// string and list concatenation.
    pub fn try_add(&self, other: &Value) -> Result<Value, ComputationError> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a
                .checked_add(*b)
                .map(Value::Int)
                .ok_or_else(|| ComputationError::new("integer overflow")),
            (Value::Str(a), Value::Str(b)) => {
                let mut joined = a.clone();
                joined.push_str(b);
                Ok(Value::Str(joined))
            }
            (Value::List(a), Value::List(b)) => {
                let mut joined = a.clone();
                joined.extend(b.iter().cloned());
                Ok(Value::List(joined))
            }
            _ => self.float_op(other, "+", |a, b| a + b),
        }
    }

    /// Subtracts `other` from this value.
    pub fn try_sub(&self, other: &Value) -> Result<Value, ComputationError> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a
                .checked_sub(*b)
                .map(Value::Int)
                .ok_or_else(|| ComputationError::new("integer overflow")),
            _ => self.float_op(other, "-", |a, b| a - b),
        }
    }

    /// Multiplies two numeric values.
    pub fn try_mul(&self, other: &Value) -> Result<Value, ComputationError> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a
                .checked_mul(*b)
                .map(Value::Int)
                .ok_or_else(|| ComputationError::new("integer overflow")),
            _ => self.float_op(other, "*", |a, b| a * b),
        }
    }

    fn float_op(
        &self,
        other: &Value,
        symbol: &str,
        op: impl Fn(f64, f64) -> f64,
    ) -> Result<Value, ComputationError> {
        let numeric = |v: &Value| matches!(v, Value::Int(_) | Value::Float(_));
        match (self.as_float(), other.as_float()) {
            (Some(a), Some(b)) if numeric(self) && numeric(other) => Ok(Value::Float(op(a, b))),
            _ => Err(ComputationError::new(format!(
                "unsupported operand types for {}: {} and {}",
                symbol,
                self.type_name(),
                other.type_name()
            ))),
        }
    }

    /// Returns a type ordering value for comparing different types.
    fn type_order(&self) -> u8 {
        match self {
            Value::Empty => 0,
            Value::Bool(_) => 1,
            Value::Int(_) => 2,
            Value::Float(_) => 3,
            Value::Str(_) => 4,
            Value::List(_) => 5,
            Value::Set(_) => 6,
            Value::Tree(_) => 7,
            Value::Cell(_) => 8,
        }
    }
}

/// Sorted, deduplicated view of set members.
fn canonical(items: &[Value]) -> Vec<&Value> {
    let mut items: Vec<&Value> = items.iter().collect();
    items.sort();
    items.dedup();
    items
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Empty, Value::Empty) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            // total_cmp keeps Eq consistent with Hash (bit patterns)
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b).is_eq(),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Set(a), Value::Set(b)) => canonical(a) == canonical(b),
            (Value::Tree(a), Value::Tree(b)) => a.ptr_eq(b),
            (Value::Cell(a), Value::Cell(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
        match self {
            Value::Empty => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Str(s) => s.hash(state),
            Value::List(items) => items.hash(state),
            Value::Set(items) => canonical(items).hash(state),
            Value::Tree(tree) => tree.addr().hash(state),
            Value::Cell(cell) => cell.addr().hash(state),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Empty, Value::Empty) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            (Value::List(a), Value::List(b)) => a.cmp(b),
            (Value::Set(a), Value::Set(b)) => canonical(a).cmp(&canonical(b)),
            (Value::Tree(a), Value::Tree(b)) => a.addr().cmp(&b.addr()),
            (Value::Cell(a), Value::Cell(b)) => a.cmp_identity(b),
            // Different types: order by type discriminant
            _ => self.type_order().cmp(&other.type_order()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => write!(f, "Empty()"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{:?}", v),
            Value::Str(v) => write!(f, "'{}'", v),
            Value::List(items) => f.debug_list().entries(items).finish(),
            Value::Set(items) => f.debug_set().entries(items).finish(),
            Value::Tree(tree) => fmt::Debug::fmt(tree, f),
            Value::Cell(cell) => fmt::Debug::fmt(cell, f),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(v) => write!(f, "{}", v),
            other => fmt::Debug::fmt(other, f),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl From<Tree> for Value {
    fn from(tree: Tree) -> Self {
        Value::Tree(tree)
    }
}

impl From<FieldTree> for Value {
    fn from(tree: FieldTree) -> Self {
        Value::Tree(Tree::new(tree))
    }
}

impl From<ReactiveCell> for Value {
    fn from(cell: ReactiveCell) -> Self {
        Value::Cell(cell)
    }
}

impl From<Derived> for Value {
    fn from(derived: Derived) -> Self {
        Value::Cell(ReactiveCell::from(derived))
    }
}

impl From<Reference> for Value {
    fn from(reference: Reference) -> Self {
        Value::Cell(ReactiveCell::from(reference))
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Empty,
        }
    }
}
