//! Deferred, parametrized expressions.
//!
//! A [`Computation`] binds a function to an argument list. Arguments are
//! literals, `local` placeholders resolved against whichever object is being
//! evaluated, nested computations, or [`ValueName`]s pointing at a field of a
//! specific object. The same computation can therefore be installed on many
//! objects:
//!
//! ```
//! use fieldtree_core::{computation::{local, sum}, Object, Value};
//!
//! let a = Object::new();
//! a.set("x", 1i64).unwrap();
//! a.set("y", 2i64).unwrap();
//! let b = Object::new();
//! b.set("x", 10i64).unwrap();
//! b.set("y", 20i64).unwrap();
//!
//! let total = sum([local("x"), local("y")]);
//! assert_eq!(total.evaluate(&a).unwrap(), Value::Int(3));
//! assert_eq!(total.evaluate(&b).unwrap(), Value::Int(30));
//! ```

use crate::error::{ComputationError, Error, Result};
use crate::guard::EvalContext;
use crate::key::{FieldRef, Label};
use crate::name::ValueName;
use crate::object::Object;
use crate::value::Value;
use alloc::format;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::fmt;

/// Signature of a computation function.
pub type ComputeFn = dyn Fn(&[Value]) -> core::result::Result<Value, ComputationError>;

/// A computation argument.
#[derive(Clone)]
pub enum Arg {
    /// Passed through unchanged.
    Literal(Value),
    /// Read from the object currently being evaluated.
    Local(Label),
    /// Evaluated against the same object as the enclosing computation.
    Nested(Computation),
    /// Read from a named field of a specific object.
    Name(ValueName),
}

/// Placeholder resolved against the object being evaluated.
pub fn local(label: impl Into<Label>) -> Arg {
    Arg::Local(label.into())
}

/// Literal argument.
pub fn lit(value: impl Into<Value>) -> Arg {
    Arg::Literal(value.into())
}

impl From<Value> for Arg {
    fn from(value: Value) -> Self {
        Arg::Literal(value)
    }
}

impl From<i64> for Arg {
    fn from(value: i64) -> Self {
        Arg::Literal(Value::Int(value))
    }
}

impl From<f64> for Arg {
    fn from(value: f64) -> Self {
        Arg::Literal(Value::Float(value))
    }
}

impl From<Computation> for Arg {
    fn from(computation: Computation) -> Self {
        Arg::Nested(computation)
    }
}

impl From<ValueName> for Arg {
    fn from(name: ValueName) -> Self {
        Arg::Name(name)
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Literal(value) => write!(f, "{:?}", value),
            Arg::Local(label) => write!(f, "local.{}", label),
            Arg::Nested(computation) => write!(f, "{:?}", computation),
            Arg::Name(name) => write!(f, "{}", name),
        }
    }
}

/// First stage of the two-stage builder: a named function waiting for its
/// arguments.
#[derive(Clone)]
pub struct Definer {
    name: Rc<str>,
    func: Rc<ComputeFn>,
}

impl Definer {
    /// Binds arguments, producing a computation.
    pub fn bind<A: Into<Arg>>(&self, args: impl IntoIterator<Item = A>) -> Computation {
        Computation {
            name: self.name.clone(),
            func: self.func.clone(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Wraps a function as a computation definer.
pub fn define_computation<F>(name: &str, func: F) -> Definer
where
    F: Fn(&[Value]) -> core::result::Result<Value, ComputationError> + 'static,
{
    Definer {
        name: Rc::from(name),
        func: Rc::new(func),
    }
}

/// A function bound to its arguments.
#[derive(Clone)]
pub struct Computation {
    name: Rc<str>,
    func: Rc<ComputeFn>,
    args: Rc<[Arg]>,
}

impl Computation {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    /// Evaluates against `target` in a fresh evaluation context.
    pub fn evaluate(&self, target: &Object) -> Result<Value> {
        let mut ctx = EvalContext::new(target.options());
        self.call(target, &mut ctx)
    }

    /// Evaluates with `target` on top of the context's target stack.
    pub(crate) fn call(&self, target: &Object, ctx: &mut EvalContext) -> Result<Value> {
        ctx.push_target(target.clone());
        let result = self.apply(ctx);
        ctx.pop_target();
        result
    }

    fn apply(&self, ctx: &mut EvalContext) -> Result<Value> {
        let mut values = Vec::with_capacity(self.args.len());
        for arg in self.args.iter() {
            values.push(self.resolve(arg, ctx)?);
        }
        (self.func)(&values).map_err(|err| Error::Computation(err.or_function(&self.name)))
    }

    fn resolve(&self, arg: &Arg, ctx: &mut EvalContext) -> Result<Value> {
        match arg {
            Arg::Literal(value) => Ok(value.clone()),
            Arg::Local(label) => {
                let target = ctx.current_target()?;
                target.get_in(&FieldRef::Label(label.clone()), ctx)
            }
            Arg::Nested(computation) => {
                let target = ctx.current_target()?;
                computation.call(&target, ctx)
            }
            Arg::Name(name) => name.resolve(ctx),
        }
    }
}

impl fmt::Debug for Computation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:?}", arg)?;
        }
        write!(f, ")")
    }
}

fn arity(name: &str, args: &[Value], expected: usize) -> core::result::Result<(), ComputationError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(ComputationError::in_function(
            name,
            format!("expected {} arguments, got {}", expected, args.len()),
        ))
    }
}

/// `a + b`
pub fn sum<A: Into<Arg>>(args: impl IntoIterator<Item = A>) -> Computation {
    define_computation("sum", |args| {
        arity("sum", args, 2)?;
        args[0].try_add(&args[1])
    })
    .bind(args)
}

/// `a - b`
pub fn difference<A: Into<Arg>>(args: impl IntoIterator<Item = A>) -> Computation {
    define_computation("difference", |args| {
        arity("difference", args, 2)?;
        args[0].try_sub(&args[1])
    })
    .bind(args)
}

/// `a * b`
pub fn product<A: Into<Arg>>(args: impl IntoIterator<Item = A>) -> Computation {
    define_computation("product", |args| {
        arity("product", args, 2)?;
        args[0].try_mul(&args[1])
    })
    .bind(args)
}

/// `a + a * rate`
pub fn interest<A: Into<Arg>>(args: impl IntoIterator<Item = A>) -> Computation {
    define_computation("interest", |args| {
        arity("interest", args, 2)?;
        args[0].try_add(&args[0].try_mul(&args[1])?)
    })
    .bind(args)
}
