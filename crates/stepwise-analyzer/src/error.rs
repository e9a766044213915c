//! Flow-analysis error types.
//!
//! Unlike a parser-facing analyzer, there is no source span to report: the
//! input is already a statement tree, so these errors carry only the
//! structural detail (a label, say) needed to explain the failure.

use thiserror::Error;

/// A failure during Pass 1 (flow analysis). Any of these fails the whole
/// compile.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FlowError {
    /// A label was declared twice in overlapping scopes.
    #[error("duplicate label '{0}'")]
    DuplicateLabel(String),

    /// `break` with no enclosing loop.
    #[error("'break' statement outside loop")]
    BreakOutsideLoop,

    /// `continue` with no enclosing loop.
    #[error("'continue' statement outside loop")]
    ContinueOutsideLoop,

    /// A labelled `break` whose label is not in scope.
    ///
    /// Reports the label itself, not a variable name — a labelled break to
    /// an unresolved label is only ever going to name a label.
    #[error("break label '{0}' is not in scope")]
    UnresolvedBreakLabel(String),
}
