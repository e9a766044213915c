//! Compile-time resolution of built-in functions.

use std::sync::Arc;

use stepwise_ast::{AsyncBuiltInFn, BuiltInFn};

/// A built-in resolved at compile time, carrying its own sync/async-ness
/// (the Normal-node step dispatch awaits it only when it is the `Async`
/// variant).
#[derive(Clone)]
pub enum BuiltIn {
    Sync(Arc<dyn BuiltInFn>),
    Async(Arc<dyn AsyncBuiltInFn>),
}

impl std::fmt::Debug for BuiltIn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuiltIn::Sync(_) => f.write_str("BuiltIn::Sync(..)"),
            BuiltIn::Async(_) => f.write_str("BuiltIn::Async(..)"),
        }
    }
}

/// Looks up a built-in function by name. Implemented by the interpreter
/// façade (`stepwise-runtime`); kept as a trait here so this crate never
/// depends on that one.
pub trait BuiltInResolver {
    fn resolve_builtin(&self, name: &str) -> Option<BuiltIn>;
}

impl<F> BuiltInResolver for F
where
    F: Fn(&str) -> Option<BuiltIn>,
{
    fn resolve_builtin(&self, name: &str) -> Option<BuiltIn> {
        self(name)
    }
}
