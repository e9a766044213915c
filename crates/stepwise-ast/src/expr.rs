use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

use crate::{Scope, Value};

/// An error raised by a host-supplied expression or built-in function.
///
/// Opaque to the interpreter: it is never inspected, only propagated out of
/// the step and out of the enclosing `exec` call.
pub type HostError = Box<dyn std::error::Error + Send + Sync>;

/// A side-effect-free or side-effecting callable over a scope, supplied by
/// the embedding host. The interpreter never constructs one of these; it
/// only invokes `eval` at the points named by the flow-analysis rules.
pub trait Expr: fmt::Debug {
    fn eval(&self, scope: &Scope) -> Result<Value, HostError>;
}

/// The awaited counterpart of [`Expr`], used where a statement's `async`
/// flag marks an expression as a suspension point.
pub trait AsyncExpr: fmt::Debug {
    fn eval<'a>(
        &'a self,
        scope: &'a Scope,
    ) -> Pin<Box<dyn Future<Output = Result<Value, HostError>> + 'a>>;
}

/// A host-registered built-in function, invoked with the call's resolved
/// parameter map and the ambient `env`.
pub trait BuiltInFn: fmt::Debug {
    fn call(
        &self,
        parameters: &HashMap<String, Value>,
        env: &HashMap<String, Value>,
    ) -> Result<Value, HostError>;
}

/// The awaited counterpart of [`BuiltInFn`].
pub trait AsyncBuiltInFn: fmt::Debug {
    fn call<'a>(
        &'a self,
        parameters: &'a HashMap<String, Value>,
        env: &'a HashMap<String, Value>,
    ) -> Pin<Box<dyn Future<Output = Result<Value, HostError>> + 'a>>;
}
