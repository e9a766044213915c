//! Compile-time (Pass 1 + Pass 2) error types.

use thiserror::Error;
use stepwise_analyzer::FlowError;

/// A failure compiling a statement tree into an [`crate::Executable`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// Pass 1 (flow analysis) rejected the program.
    #[error(transparent)]
    FlowAnalysis(#[from] FlowError),

    /// A `Call` statement named a built-in with no registered resolver
    /// entry. The resolver is invoked eagerly for every built-in `Normal`
    /// node (including those inside a fused run), so this is always
    /// caught at compile time, never deferred to a run-time lookup.
    #[error("unknown built-in function '{0}'")]
    UnknownBuiltIn(String),
}
