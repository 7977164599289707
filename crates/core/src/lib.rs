//! Fieldtree Core - reactive field-tree data model.
//!
//! This crate provides the evaluation kernel of the fieldtree workspace:
//!
//! - `Key` / `Label`: permanent field handles and renameable field names
//! - `Value`: values stored in a field, including nested containers and cells
//! - `FieldTree`: the ordered key -> (label, value) container
//! - `Computation`: a function bound to literal, `local` and named arguments
//! - `Derived` / `Reference`: reactive cells evaluated on access
//! - `Object`: a container that evaluates its cells, detects cycles, defers
//!   computation failures and buffers changes
//! - `Error`: error types for all of the above
//!
//! # Example
//!
//! ```rust
//! use fieldtree_core::computation::{local, sum};
//! use fieldtree_core::{Derived, Object, Reference, Value};
//!
//! let task1 = Object::named("task1");
//! task1.set("start", 1i64).unwrap();
//! task1.set("length", 2i64).unwrap();
//! task1.set("end", Derived::new(sum([local("start"), local("length")]))).unwrap();
//!
//! let task2 = task1.derive_named("task2").unwrap();
//! task2.set("start", Reference::new(&task1, "end")).unwrap();
//! assert_eq!(task2.get("end").unwrap(), Value::Int(5));
//!
//! task1.set("start", 2i64).unwrap();
//! assert_eq!(task2.get("end").unwrap(), Value::Int(6));
//! ```

#![no_std]

extern crate alloc;

mod cell;
mod change;
pub mod computation;
mod error;
mod guard;
mod key;
mod name;
mod object;
mod tree;
mod value;

pub use cell::{Derived, ReactiveCell, Reference};
pub use change::{ChangeTracker, FieldChanges};
pub use computation::{define_computation, local, Arg, Computation, Definer};
pub use error::{ComputationError, Error, Result};
pub use guard::{EvalOptions, DEFAULT_MAX_DEPTH};
pub use key::{FieldRef, Key, Label};
pub use name::{ObjectName, ValueName};
pub use object::{Object, ObjectId};
pub use tree::{FieldTree, Tree, TreeWalk};
pub use value::Value;
