//! Pass 2: one compiled [`Step`] per flow-graph node (or, for a fused run,
//! one `Step` standing in for several).

use std::collections::HashMap;

use stepwise_ast::{CallableExpr, HostError, NodeId, Opcode, ParamValue, Scope, Value};

use crate::builtin::BuiltIn;
use crate::fused::FusedOp;

/// The non-fused shape of a step: a direct translation of one flow-graph
/// node, per the node-generation rules.
#[derive(Debug, Clone)]
pub enum SingleStep {
    Expression(CallableExpr, NodeId),
    BuiltInCall {
        builtin: BuiltIn,
        params: HashMap<String, ParamValue>,
        next: NodeId,
    },
    ExternCall {
        name: String,
        params: HashMap<String, ParamValue>,
        next: NodeId,
    },
    If {
        branches: Vec<(ParamValue, NodeId)>,
        otherwise: Option<NodeId>,
        next: NodeId,
    },
    Switch {
        pattern: ParamValue,
        branches: Vec<(ParamValue, NodeId)>,
        otherwise: Option<NodeId>,
        next: NodeId,
    },
    LoopInitializer {
        initializer: ParamValue,
        main: NodeId,
    },
    Loop {
        iterator: Option<ParamValue>,
        condition: Option<ParamValue>,
        body: NodeId,
        next: NodeId,
    },
    Jump {
        next: NodeId,
    },
    Return {
        value: Option<ParamValue>,
    },
    Exit,
    /// Dead: belongs to the middle of a fused run and is never stepped to
    /// directly from outside it.
    Dead,
}

/// A compiled execution node: either the direct translation of one
/// flow-graph node, or a fused run of several mergeable ones collapsed
/// into a single dispatch.
#[derive(Debug, Clone)]
pub enum Step {
    Single(SingleStep),
    Fused(FusedOp),
}

fn eval_param(value: &ParamValue, scope: &Scope) -> Result<Value, HostError> {
    match value {
        ParamValue::Literal(v) => Ok(v.clone()),
        ParamValue::Expr(expr) => expr.eval(scope),
    }
}

fn eval_params(
    params: &HashMap<String, ParamValue>,
    scope: &Scope,
) -> Result<HashMap<String, Value>, HostError> {
    params
        .iter()
        .map(|(name, value)| eval_param(value, scope).map(|v| (name.clone(), v)))
        .collect()
}

fn first_truthy_branch(
    branches: &[(ParamValue, NodeId)],
    scope: &Scope,
) -> Result<Option<NodeId>, HostError> {
    for (condition, target) in branches {
        if eval_param(condition, scope)?.is_truthy() {
            return Ok(Some(*target));
        }
    }
    Ok(None)
}

fn first_matching_branch(
    pattern: &Value,
    branches: &[(ParamValue, NodeId)],
    scope: &Scope,
) -> Result<Option<NodeId>, HostError> {
    for (condition, target) in branches {
        if eval_param(condition, scope)? == *pattern {
            return Ok(Some(*target));
        }
    }
    Ok(None)
}

impl SingleStep {
    /// Synchronous step dispatch. `Expression`/`BuiltInCall` with an async
    /// callable are rejected here; the runtime's stepper awaits those
    /// through [`SingleStep::step_async`] instead.
    pub fn step(&self, scope: &Scope) -> Result<Opcode, HostError> {
        match self {
            SingleStep::Expression(CallableExpr::Sync(expr), next) => {
                let _ = expr.eval(scope)?;
                Ok(Opcode::Move(*next))
            }
            SingleStep::BuiltInCall { builtin: BuiltIn::Sync(builtin), params, next } => {
                let parameters = eval_params(params, scope)?;
                let _ = builtin.call(&parameters, &scope.env_snapshot())?;
                Ok(Opcode::Move(*next))
            }
            SingleStep::ExternCall { name, params, next } => {
                let parameters = eval_params(params, scope)?;
                Ok(Opcode::Call(name.clone(), parameters, *next))
            }
            SingleStep::If { branches, otherwise, next } => {
                let target = first_truthy_branch(branches, scope)?.or(*otherwise).unwrap_or(*next);
                Ok(Opcode::Move(target))
            }
            SingleStep::Switch { pattern, branches, otherwise, next } => {
                let pattern_value = eval_param(pattern, scope)?;
                let target = first_matching_branch(&pattern_value, branches, scope)?
                    .or(*otherwise)
                    .unwrap_or(*next);
                Ok(Opcode::Move(target))
            }
            SingleStep::LoopInitializer { initializer, main } => {
                let _ = eval_param(initializer, scope)?;
                Ok(Opcode::Move(*main))
            }
            SingleStep::Loop { iterator, condition, body, next } => {
                if let Some(iterator) = iterator {
                    let _ = eval_param(iterator, scope)?;
                }
                let runs_again = match condition {
                    Some(condition) => eval_param(condition, scope)?.is_truthy(),
                    None => true,
                };
                Ok(Opcode::Move(if runs_again { *body } else { *next }))
            }
            SingleStep::Jump { next } => Ok(Opcode::Move(*next)),
            SingleStep::Return { value } => {
                let value = value.as_ref().map(|v| eval_param(v, scope)).transpose()?;
                Ok(Opcode::Return(value))
            }
            SingleStep::Exit => Ok(Opcode::Exit),
            SingleStep::Expression(CallableExpr::Async(_), _)
            | SingleStep::BuiltInCall { builtin: BuiltIn::Async(_), .. } => {
                unreachable!("async step dispatched through the synchronous path")
            }
            SingleStep::Dead => {
                unreachable!("a dead node is never stepped to from outside its fused run")
            }
        }
    }

    /// True when this step must be awaited (an async expression or
    /// built-in call). The stepper checks this before choosing
    /// [`Self::step`] or [`Self::step_async`].
    #[must_use]
    pub fn is_async(&self) -> bool {
        matches!(
            self,
            SingleStep::Expression(CallableExpr::Async(_), _)
                | SingleStep::BuiltInCall { builtin: BuiltIn::Async(_), .. }
        )
    }

    pub async fn step_async(&self, scope: &Scope) -> Result<Opcode, HostError> {
        match self {
            SingleStep::Expression(CallableExpr::Async(expr), next) => {
                let _ = expr.eval(scope).await?;
                Ok(Opcode::Move(*next))
            }
            SingleStep::BuiltInCall { builtin: BuiltIn::Async(builtin), params, next } => {
                let parameters = eval_params(params, scope)?;
                let env = scope.env_snapshot();
                let _ = builtin.call(&parameters, &env).await?;
                Ok(Opcode::Move(*next))
            }
            _ => self.step(scope),
        }
    }
}

pub(crate) use eval_param as eval_param_value;
