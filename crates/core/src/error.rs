//! Error types for field trees and reactive objects.

use crate::key::{Key, Label};
use alloc::format;
use alloc::string::String;
use core::fmt;

/// Result type alias for fieldtree operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Failure raised by a user-supplied computation function.
///
/// This is the only error kind an [`Object`](crate::Object) defers: a failing
/// derived field nested inside another evaluation is recorded and surfaces
/// when the outermost read completes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComputationError {
    /// Name of the computation that failed (filled in when empty).
    pub function: String,
    /// Human-readable failure description.
    pub message: String,
}

impl ComputationError {
    /// Creates an error with no function name attached yet.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            function: String::new(),
            message: message.into(),
        }
    }

    /// Creates an error attributed to the named function.
    pub fn in_function(function: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            message: message.into(),
        }
    }

    /// Attributes the error to `function` unless it already names one.
    pub fn or_function(mut self, function: &str) -> Self {
        if self.function.is_empty() {
            self.function = function.into();
        }
        self
    }
}

impl fmt::Display for ComputationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.function.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.function, self.message)
        }
    }
}

/// Error types for fieldtree operations.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// A key, label or named object could not be resolved.
    NotFound {
        target: String,
    },
    /// The same (object, field) pair was re-entered within one evaluation.
    CycleDetected {
        object: String,
        label: Label,
    },
    /// Malformed input, such as an ambiguous `add` or a self-nesting container.
    InvalidArgument {
        message: String,
    },
    /// A computation function failed.
    Computation(ComputationError),
    /// Cell evaluations nested deeper than the configured limit.
    RecursionLimit {
        limit: usize,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotFound { target } => write!(f, "Not found: {}", target),
            Error::CycleDetected { object, label } => {
                write!(f, "Cycle detected: {}.{}", object, label)
            }
            Error::InvalidArgument { message } => write!(f, "Invalid argument: {}", message),
            Error::Computation(err) => write!(f, "Computation failed: {}", err),
            Error::RecursionLimit { limit } => {
                write!(f, "Evaluation nested deeper than {} cells", limit)
            }
        }
    }
}

impl From<ComputationError> for Error {
    fn from(err: ComputationError) -> Self {
        Error::Computation(err)
    }
}

impl Error {
    /// Creates a not found error for an arbitrary target description.
    pub fn not_found(target: impl Into<String>) -> Self {
        Error::NotFound {
            target: target.into(),
        }
    }

    /// Creates a not found error for a missing label.
    pub fn no_label(label: &Label) -> Self {
        Error::not_found(format!("no {:?} label", label))
    }

    /// Creates a not found error for a missing key.
    pub fn no_key(key: Key) -> Self {
        Error::not_found(format!("no {} key", key))
    }

    /// Creates a cycle error naming the re-entered field.
    pub fn cycle(object: impl Into<String>, label: Label) -> Self {
        Error::CycleDetected {
            object: object.into(),
            label,
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument {
            message: message.into(),
        }
    }

    /// Returns true for `NotFound`.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Returns true for `CycleDetected`.
    pub fn is_cycle(&self) -> bool {
        matches!(self, Error::CycleDetected { .. })
    }
}
