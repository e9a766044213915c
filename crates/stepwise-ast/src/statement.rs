use std::collections::HashMap;
use std::sync::Arc;

use crate::{AsyncExpr, Block, Expr, Value};

/// A literal or a host-supplied callable — the union used for call
/// parameters, return values, and branch/loop conditions.
#[derive(Debug, Clone)]
pub enum ParamValue {
    Literal(Value),
    Expr(Arc<dyn Expr>),
}

/// An expression statement's callable, carrying its own sync/async-ness.
/// Kept distinct from `ParamValue` because only a top-level `Expression`
/// statement may be awaited; call parameters, conditions, and return values
/// are always evaluated synchronously (see the node-generation rules).
#[derive(Debug, Clone)]
pub enum CallableExpr {
    Sync(Arc<dyn Expr>),
    Async(Arc<dyn AsyncExpr>),
}

impl CallableExpr {
    #[must_use]
    pub fn is_async(&self) -> bool {
        matches!(self, CallableExpr::Async(_))
    }
}

/// A call to a built-in or named global function.
#[derive(Debug, Clone)]
pub struct CallStmt {
    pub name: String,
    pub params: HashMap<String, ParamValue>,
    pub built_in: bool,
    pub is_async: bool,
}

#[derive(Debug, Clone)]
pub struct IfStmt {
    pub branches: Vec<(ParamValue, Block)>,
    pub otherwise: Option<Block>,
}

/// No fallthrough: exactly one branch body runs, selected by strict
/// equality of `pattern` against the first matching branch condition.
#[derive(Debug, Clone)]
pub struct SwitchStmt {
    pub pattern: ParamValue,
    pub branches: Vec<(ParamValue, Block)>,
    pub otherwise: Option<Block>,
}

#[derive(Debug, Clone)]
pub struct LoopStmt {
    pub initializer: Option<ParamValue>,
    pub condition: Option<ParamValue>,
    pub iterator: Option<ParamValue>,
    pub label: Option<String>,
    pub body: Block,
    /// Do-while entry: the body runs once before the condition is first
    /// checked.
    pub skip_initial_check: bool,
}

/// One statement in the input program. The flow-analysis pass is the
/// authority on how each variant lowers to a flow node; see its module
/// documentation for the per-variant rules.
#[derive(Debug, Clone)]
pub enum Statement {
    Expression(CallableExpr),
    Call(CallStmt),
    Return(Option<ParamValue>),
    If(IfStmt),
    Switch(SwitchStmt),
    Loop(LoopStmt),
    /// `None` targets the innermost open loop; `Some(label)` targets the
    /// loop registered under that label.
    Break(Option<String>),
    /// Always targets the innermost open loop; this language has no
    /// labelled continue.
    Continue,
    Exit,
}
