//! Error handling for the stepwise runtime.
//!
//! Hand-written `Display`/`Error` impls rather than a `thiserror` derive —
//! kept deliberately inconsistent with the compile-time error types
//! (`FlowError`, `CompileError`), which are `thiserror`-derived.

use std::fmt;

use stepwise_ast::{HostError, NodeId};
use stepwise_compiler::CompileError;

/// A failure during compilation (re-raised through the interpreter),
/// dispatch, or stepping.
#[derive(Debug)]
pub enum RuntimeError {
    /// A `Call` statement named a built-in with no registered entry.
    UnknownBuiltin { name: String },
    /// A `Call` statement named a global function with no registered entry.
    UnknownGlobal { name: String },
    /// A step was requested at an id outside the executable's range, or at
    /// an id belonging to the interior of some other run's fused step.
    StepOutOfRange { id: NodeId },
    /// The call stack grew past `InterpreterConfig::max_call_depth`.
    MaxCallDepthExceeded { depth: usize },
    /// A host-supplied expression or built-in threw.
    ExpressionFailed(HostError),
    /// Compilation of a program (the main script, or a registered global)
    /// failed.
    CompileFailed(CompileError),
    /// A snapshot was requested while a frame's PC was not sitting at a
    /// valid step boundary.
    SnapshotNotAtBoundary,
    /// A snapshot was requested with a frame's PC pointing into the
    /// interior of a fused run.
    SnapshotInsideFusedRun { id: NodeId },
}

impl RuntimeError {
    #[must_use]
    pub fn unknown_builtin(name: impl Into<String>) -> Self {
        RuntimeError::UnknownBuiltin { name: name.into() }
    }

    #[must_use]
    pub fn unknown_global(name: impl Into<String>) -> Self {
        RuntimeError::UnknownGlobal { name: name.into() }
    }

    #[must_use]
    pub fn step_out_of_range(id: NodeId) -> Self {
        RuntimeError::StepOutOfRange { id }
    }

    #[must_use]
    pub fn max_call_depth_exceeded(depth: usize) -> Self {
        RuntimeError::MaxCallDepthExceeded { depth }
    }

    #[must_use]
    pub fn snapshot_not_at_boundary() -> Self {
        RuntimeError::SnapshotNotAtBoundary
    }

    #[must_use]
    pub fn snapshot_inside_fused_run(id: NodeId) -> Self {
        RuntimeError::SnapshotInsideFusedRun { id }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::UnknownBuiltin { name } => {
                write!(f, "unknown built-in function '{name}'")
            }
            RuntimeError::UnknownGlobal { name } => {
                write!(f, "unknown global function '{name}'")
            }
            RuntimeError::StepOutOfRange { id } => write!(f, "step id {id} is out of range"),
            RuntimeError::MaxCallDepthExceeded { depth } => {
                write!(f, "call stack exceeded max_call_depth ({depth})")
            }
            RuntimeError::ExpressionFailed(err) => write!(f, "expression callable failed: {err}"),
            RuntimeError::CompileFailed(err) => write!(f, "compilation failed: {err}"),
            RuntimeError::SnapshotNotAtBoundary => {
                write!(f, "cannot capture a snapshot: a frame is not at a step boundary")
            }
            RuntimeError::SnapshotInsideFusedRun { id } => {
                write!(f, "cannot capture a snapshot: pc {id} is inside a fused run")
            }
        }
    }
}

impl std::error::Error for RuntimeError {}

impl From<CompileError> for RuntimeError {
    fn from(err: CompileError) -> Self {
        RuntimeError::CompileFailed(err)
    }
}
