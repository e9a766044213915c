//! Run-time resolution of named global functions.

use std::sync::Arc;

use crate::Executable;

/// Resolves a named global function to its compiled executable. This is
/// the "back-reference to the interpreter" an [`Executable`] carries: the
/// interpreter façade (`stepwise-runtime`) implements it over its own
/// compiled-global table, and an `Executable` only ever sees it through
/// this trait, never the concrete interpreter type.
pub trait GlobalResolver {
    fn resolve_global(&self, name: &str) -> Option<Arc<Executable>>;
}
