//! Fused-step compilation and execution: the "JIT" of the node-generation
//! pass. A run of mergeable flow-graph nodes is rebuilt as a small tree
//! mirroring the original control structure and walked by an inner
//! interpreter that handles only the mergeable node kinds plus in-run
//! break/continue, rather than emitting one `Step` dispatch per node.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;

use stepwise_analyzer::{FlowGraph, FlowNodeKind, NormalKind};
use stepwise_ast::{CallableExpr, HostError, NodeId, ParamValue, Scope, Value};

use crate::builtin::{BuiltIn, BuiltInResolver};
use crate::error::CompileError;
use crate::step::eval_param_value as eval_param;

/// How a `break`/`continue` inside a fused run is realised once it has
/// been classified against the loops opened within that same run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpSignal {
    /// Targets the head of the loop `depth` levels up from the innermost
    /// loop opened in this run (0 = innermost) — a labelled break.
    Break(usize),
    /// Targets the innermost loop's head — `continue`, or an unlabelled
    /// `break` one level up is instead `Break(0)`; this variant is used
    /// only for true `continue`.
    Continue,
    /// The jump's target lies outside this fused run: ends the fused step
    /// with `Opcode::Move`, exactly like any other escaping successor.
    Escape(NodeId),
}

/// A fused run, rebuilt from the flow graph as a tree instead of a flat
/// node array. Only the mergeable node kinds appear here — `ExternCall`
/// can never be part of one.
#[derive(Debug, Clone)]
pub enum FusedOp {
    Normal {
        kind: NormalKind,
        next: Box<FusedOp>,
    },
    BuiltInCall {
        builtin: BuiltIn,
        params: HashMap<String, ParamValue>,
        is_async: bool,
        next: Box<FusedOp>,
    },
    If {
        branches: Vec<(ParamValue, FusedOp)>,
        otherwise: Option<Box<FusedOp>>,
        next: Box<FusedOp>,
    },
    Switch {
        pattern: ParamValue,
        branches: Vec<(ParamValue, FusedOp)>,
        otherwise: Option<Box<FusedOp>>,
        next: Box<FusedOp>,
    },
    Loop {
        iterator: Option<ParamValue>,
        condition: Option<ParamValue>,
        body: Box<FusedOp>,
        next: Box<FusedOp>,
    },
    LoopInitializer {
        initializer: ParamValue,
        main: Box<FusedOp>,
    },
    Jump(JumpSignal),
    Return(Option<ParamValue>),
    Exit,
    /// A reference to a node outside this run: ends the fused step with
    /// `Opcode::Move` to it.
    Escape(NodeId),
}

/// The result of evaluating one [`FusedOp`]. `Break`/`Continue` are
/// consumed by an enclosing `Loop` within the same tree and must never
/// reach the top of a fused step — if they do, the run was built
/// incorrectly.
#[derive(Debug, Clone)]
pub enum Signal {
    Move(NodeId),
    Return(Option<Value>),
    Exit,
    Break(usize),
    Continue,
}

/// Builds the [`FusedOp`] tree for the run whose nodes are `run` (a
/// membership set computed by the run-splitting pass), rooted at `entry`.
pub fn build(
    graph: &FlowGraph,
    run: &HashSet<NodeId>,
    entry: NodeId,
    resolver: &dyn BuiltInResolver,
) -> Result<FusedOp, CompileError> {
    let mut reentered_entry = false;
    build_node(graph, run, entry, entry, &mut reentered_entry, &mut Vec::new(), resolver)
}

/// `entry` is the run's own root; a node's structural successor can point
/// back to it directly (e.g. a loop body that falls off the end has no
/// explicit `Jump` node, just a `next` pointing at the loop head) without
/// that edge ever being classified by the `FlowNodeKind::Jump` arm below.
/// Rebuilding `entry` from scratch a second time would recurse forever, so
/// the second and later encounters of it end the fused step instead,
/// trampolining back through the runtime's step loop.
fn build_node(
    graph: &FlowGraph,
    run: &HashSet<NodeId>,
    entry: NodeId,
    id: NodeId,
    reentered_entry: &mut bool,
    loop_stack: &mut Vec<(NodeId, NodeId)>,
    resolver: &dyn BuiltInResolver,
) -> Result<FusedOp, CompileError> {
    if !run.contains(&id) {
        return Ok(FusedOp::Escape(id));
    }
    if id == entry {
        if *reentered_entry {
            return Ok(FusedOp::Escape(id));
        }
        *reentered_entry = true;
    }

    let node = graph
        .get(id)
        .unwrap_or_else(|| unreachable!("run membership implies the node exists"));

    Ok(match &node.kind {
        FlowNodeKind::Normal { kind: NormalKind::Expression(expr), next } => FusedOp::Normal {
            kind: NormalKind::Expression(expr.clone()),
            next: Box::new(build_node(graph, run, entry, *next, reentered_entry, loop_stack, resolver)?),
        },
        FlowNodeKind::Normal {
            kind: NormalKind::BuiltInCall { name, params, is_async },
            next,
        } => {
            let builtin = resolver
                .resolve_builtin(name)
                .ok_or_else(|| CompileError::UnknownBuiltIn(name.clone()))?;
            FusedOp::BuiltInCall {
                builtin,
                params: params.clone(),
                is_async: *is_async,
                next: Box::new(build_node(graph, run, entry, *next, reentered_entry, loop_stack, resolver)?),
            }
        }
        FlowNodeKind::ExternCall { .. } => {
            unreachable!("ExternCall is never mergeable and cannot appear inside a fused run")
        }
        FlowNodeKind::If { branches, otherwise, next } => FusedOp::If {
            branches: branches
                .iter()
                .map(|(cond, target)| {
                    Ok((cond.clone(), build_node(graph, run, entry, *target, reentered_entry, loop_stack, resolver)?))
                })
                .collect::<Result<_, CompileError>>()?,
            otherwise: otherwise
                .map(|target| build_node(graph, run, entry, target, reentered_entry, loop_stack, resolver))
                .transpose()?
                .map(Box::new),
            next: Box::new(build_node(graph, run, entry, *next, reentered_entry, loop_stack, resolver)?),
        },
        FlowNodeKind::Switch { pattern, branches, otherwise, next } => FusedOp::Switch {
            pattern: pattern.clone(),
            branches: branches
                .iter()
                .map(|(cond, target)| {
                    Ok((cond.clone(), build_node(graph, run, entry, *target, reentered_entry, loop_stack, resolver)?))
                })
                .collect::<Result<_, CompileError>>()?,
            otherwise: otherwise
                .map(|target| build_node(graph, run, entry, target, reentered_entry, loop_stack, resolver))
                .transpose()?
                .map(Box::new),
            next: Box::new(build_node(graph, run, entry, *next, reentered_entry, loop_stack, resolver)?),
        },
        FlowNodeKind::Loop { iterator, condition, body, next } => {
            loop_stack.push((id, *next));
            let body_op = build_node(graph, run, entry, *body, reentered_entry, loop_stack, resolver)?;
            let _ = loop_stack.pop();
            FusedOp::Loop {
                iterator: iterator.clone(),
                condition: condition.clone(),
                body: Box::new(body_op),
                next: Box::new(build_node(graph, run, entry, *next, reentered_entry, loop_stack, resolver)?),
            }
        }
        FlowNodeKind::LoopInitializer { initializer, main } => FusedOp::LoopInitializer {
            initializer: initializer.clone(),
            main: Box::new(build_node(graph, run, entry, *main, reentered_entry, loop_stack, resolver)?),
        },
        FlowNodeKind::Jump { next } => {
            let signal = if loop_stack.last().is_some_and(|(head, _)| head == next) {
                JumpSignal::Continue
            } else if let Some(depth) =
                loop_stack.iter().rev().position(|(_, exit)| exit == next)
            {
                JumpSignal::Break(depth)
            } else {
                JumpSignal::Escape(*next)
            };
            FusedOp::Jump(signal)
        }
        FlowNodeKind::Return { value } => FusedOp::Return(value.clone()),
        FlowNodeKind::Exit => FusedOp::Exit,
    })
}

/// Evaluates a fused run, boxing the recursion by hand since `async fn`
/// cannot recurse directly.
pub fn eval<'a>(
    op: &'a FusedOp,
    scope: &'a Scope,
) -> Pin<Box<dyn Future<Output = Result<Signal, HostError>> + 'a>> {
    Box::pin(async move {
        match op {
            FusedOp::Normal { kind: NormalKind::Expression(CallableExpr::Sync(expr)), next } => {
                let _ = expr.eval(scope)?;
                eval(next, scope).await
            }
            FusedOp::Normal { kind: NormalKind::Expression(CallableExpr::Async(expr)), next } => {
                let _ = expr.eval(scope).await?;
                eval(next, scope).await
            }
            FusedOp::Normal { kind: NormalKind::BuiltInCall { .. }, .. } => {
                unreachable!("built-in calls are compiled to FusedOp::BuiltInCall, not Normal")
            }
            FusedOp::BuiltInCall { builtin: BuiltIn::Sync(builtin), params, next, .. } => {
                let parameters = eval_params(params, scope)?;
                let _ = builtin.call(&parameters, &scope.env_snapshot())?;
                eval(next, scope).await
            }
            FusedOp::BuiltInCall { builtin: BuiltIn::Async(builtin), params, next, .. } => {
                let parameters = eval_params(params, scope)?;
                let env = scope.env_snapshot();
                let _ = builtin.call(&parameters, &env).await?;
                eval(next, scope).await
            }
            FusedOp::If { branches, otherwise, next } => {
                let mut chosen = None;
                for (condition, body) in branches {
                    if eval_param(condition, scope)?.is_truthy() {
                        chosen = Some(body);
                        break;
                    }
                }
                match chosen.or(otherwise.as_deref()) {
                    Some(body) => eval(body, scope).await,
                    None => eval(next, scope).await,
                }
            }
            FusedOp::Switch { pattern, branches, otherwise, next } => {
                let pattern_value = eval_param(pattern, scope)?;
                let mut chosen = None;
                for (condition, body) in branches {
                    if eval_param(condition, scope)? == pattern_value {
                        chosen = Some(body);
                        break;
                    }
                }
                match chosen.or(otherwise.as_deref()) {
                    Some(body) => eval(body, scope).await,
                    None => eval(next, scope).await,
                }
            }
            FusedOp::LoopInitializer { initializer, main } => {
                let _ = eval_param(initializer, scope)?;
                eval(main, scope).await
            }
            FusedOp::Loop { iterator, condition, body, next } => loop {
                if let Some(iterator) = iterator {
                    let _ = eval_param(iterator, scope)?;
                }
                let runs_again = match condition {
                    Some(condition) => eval_param(condition, scope)?.is_truthy(),
                    None => true,
                };
                if !runs_again {
                    break eval(next, scope).await;
                }
                match Box::pin(eval(body, scope)).await? {
                    Signal::Continue => continue,
                    Signal::Break(0) => break eval(next, scope).await,
                    Signal::Break(depth) => break Ok(Signal::Break(depth - 1)),
                    signal @ (Signal::Move(_) | Signal::Return(_) | Signal::Exit) => break Ok(signal),
                }
            },
            FusedOp::Jump(JumpSignal::Continue) => Ok(Signal::Continue),
            FusedOp::Jump(JumpSignal::Break(depth)) => Ok(Signal::Break(*depth)),
            FusedOp::Jump(JumpSignal::Escape(id)) => Ok(Signal::Move(*id)),
            FusedOp::Return(value) => {
                let value = value.as_ref().map(|v| eval_param(v, scope)).transpose()?;
                Ok(Signal::Return(value))
            }
            FusedOp::Exit => Ok(Signal::Exit),
            FusedOp::Escape(id) => Ok(Signal::Move(*id)),
        }
    })
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
