//! The run-splitting pass: partitions a [`FlowGraph`] into the runs that
//! become fused steps, plus the singleton nodes that don't.
//!
//! A node starts its own run when it is the graph's entry, is referenced
//! from more than one place (a join point that must stay individually
//! addressable), or is not mergeable (`ExternCall`). Every other node is
//! pulled into its sole predecessor's run, transitively, as long as the
//! chain stays mergeable.

use rustc_hash::{FxHashMap, FxHashSet};

use stepwise_analyzer::{FlowGraph, FlowNodeKind};
use stepwise_ast::NodeId;

use crate::builtin::BuiltInResolver;
use crate::error::CompileError;
use crate::fused;
use crate::step::{SingleStep, Step};

fn successors(kind: &FlowNodeKind) -> Vec<NodeId> {
    match kind {
        FlowNodeKind::Normal { next, .. } | FlowNodeKind::ExternCall { next, .. } => vec![*next],
        FlowNodeKind::If { branches, otherwise, next } => branches
            .iter()
            .map(|(_, target)| *target)
            .chain(*otherwise)
            .chain(std::iter::once(*next))
            .collect(),
        FlowNodeKind::Switch { branches, otherwise, next, .. } => branches
            .iter()
            .map(|(_, target)| *target)
            .chain(*otherwise)
            .chain(std::iter::once(*next))
            .collect(),
        FlowNodeKind::Loop { body, next, .. } => vec![*body, *next],
        FlowNodeKind::LoopInitializer { main, .. } => vec![*main],
        FlowNodeKind::Jump { next } => vec![*next],
        FlowNodeKind::Return { .. } | FlowNodeKind::Exit => vec![],
    }
}

fn is_composite(kind: &FlowNodeKind) -> bool {
    matches!(kind, FlowNodeKind::If { .. } | FlowNodeKind::Switch { .. } | FlowNodeKind::Loop { .. })
}

fn compute_run_roots(graph: &FlowGraph) -> FxHashSet<NodeId> {
    let mut indegree: FxHashMap<NodeId, usize> = FxHashMap::default();
    *indegree.entry(graph.entry()).or_insert(0) += 1;
    for node in graph.nodes() {
        for succ in successors(&node.kind) {
            *indegree.entry(succ).or_insert(0) += 1;
        }
    }

    graph
        .nodes()
        .iter()
        .filter(|node| !node.mergeable || indegree.get(&node.id).copied().unwrap_or(0) != 1)
        .map(|node| node.id)
        .collect()
}

/// Collects every node pulled into the run rooted at `root`, stopping at
/// any other run root and at any already-visiting id (guards the
/// degenerate case of a composite node whose own body loops back to
/// itself with no intervening `Jump`, e.g. an empty infinite loop).
fn collect_run(graph: &FlowGraph, root: NodeId, roots: &FxHashSet<NodeId>) -> FxHashSet<NodeId> {
    let mut membership = FxHashSet::default();
    let mut stack = vec![root];
    membership.insert(root);
    while let Some(id) = stack.pop() {
        let node = graph
            .get(id)
            .unwrap_or_else(|| unreachable!("successor ids always reference live nodes"));
        for succ in successors(&node.kind) {
            if succ == root || membership.contains(&succ) || roots.contains(&succ) {
                continue;
            }
            membership.insert(succ);
            stack.push(succ);
        }
    }
    membership
}

fn translate_single(
    graph: &FlowGraph,
    id: NodeId,
    resolver: &dyn BuiltInResolver,
) -> Result<SingleStep, CompileError> {
    use stepwise_analyzer::NormalKind;

    let node = graph.get(id).unwrap_or_else(|| unreachable!("run root always exists"));
    Ok(match &node.kind {
        FlowNodeKind::Normal { kind: NormalKind::Expression(expr), next } => {
            SingleStep::Expression(expr.clone(), *next)
        }
        FlowNodeKind::Normal { kind: NormalKind::BuiltInCall { name, params, .. }, next } => {
            let builtin = resolver
                .resolve_builtin(name)
                .ok_or_else(|| CompileError::UnknownBuiltIn(name.clone()))?;
            SingleStep::BuiltInCall { builtin, params: params.clone(), next: *next }
        }
        FlowNodeKind::ExternCall { name, params, next, .. } => {
            SingleStep::ExternCall { name: name.clone(), params: params.clone(), next: *next }
        }
        FlowNodeKind::If { branches, otherwise, next } => {
            SingleStep::If { branches: branches.clone(), otherwise: *otherwise, next: *next }
        }
        FlowNodeKind::Switch { pattern, branches, otherwise, next } => SingleStep::Switch {
            pattern: pattern.clone(),
            branches: branches.clone(),
            otherwise: *otherwise,
            next: *next,
        },
        FlowNodeKind::Loop { iterator, condition, body, next } => SingleStep::Loop {
            iterator: iterator.clone(),
            condition: condition.clone(),
            body: *body,
            next: *next,
        },
        FlowNodeKind::LoopInitializer { initializer, main } => {
            SingleStep::LoopInitializer { initializer: initializer.clone(), main: *main }
        }
        FlowNodeKind::Jump { next } => SingleStep::Jump { next: *next },
        FlowNodeKind::Return { value } => SingleStep::Return { value: value.clone() },
        FlowNodeKind::Exit => SingleStep::Exit,
    })
}

/// Runs the full node-generation pass: decides run membership for every
/// node in `graph`, then emits one [`Step`] per id — `Fused` for a run's
/// root, `Dead` for the rest of that run, `Single` for everything else.
pub fn compile_steps(
    graph: &FlowGraph,
    resolver: &dyn BuiltInResolver,
) -> Result<Vec<Step>, CompileError> {
    let roots = compute_run_roots(graph);
    let mut steps: Vec<Option<Step>> = vec![None; graph.len()];

    for &root in &roots {
        let node = graph.get(root).unwrap_or_else(|| unreachable!("a root is always a live node"));
        if !node.mergeable {
            steps[root.as_usize()] = Some(Step::Single(translate_single(graph, root, resolver)?));
            continue;
        }

        let membership = collect_run(graph, root, &roots);
        let fuses = membership.len() >= 2 || is_composite(&node.kind);
        if fuses {
            let op = fused::build(graph, &membership, root, resolver)?;
            log::debug!("fused {} node(s) into a single step at {root}", membership.len());
            steps[root.as_usize()] = Some(Step::Fused(op));
            for &id in &membership {
                if id != root {
                    steps[id.as_usize()] = Some(Step::Single(SingleStep::Dead));
                }
            }
        } else {
            steps[root.as_usize()] = Some(Step::Single(translate_single(graph, root, resolver)?));
        }
    }

    steps
        .into_iter()
        .enumerate()
        .map(|(idx, step)| {
            Ok(step.unwrap_or_else(|| {
                unreachable!("every node id ({idx}) belongs to exactly one run")
            }))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepwise_ast::{Block, Statement, Value};

    struct NoBuiltIns;
    impl BuiltInResolver for NoBuiltIns {
        fn resolve_builtin(&self, _name: &str) -> Option<crate::builtin::BuiltIn> {
            None
        }
    }

    #[test]
    fn a_straight_line_of_returns_has_no_dead_steps_beyond_the_first() {
        let program = Block::new(vec![Statement::Return(Some(stepwise_ast::ParamValue::Literal(
            Value::Number(1.0),
        )))]);
        let graph = stepwise_analyzer::lower(&program).unwrap();
        let steps = compile_steps(&graph, &NoBuiltIns).unwrap();
        assert_eq!(steps.len(), graph.len());
    }

    #[test]
    fn externcall_is_always_its_own_single_step() {
        let call = stepwise_ast::CallStmt {
            name: "doThing".to_owned(),
            params: std::collections::HashMap::new(),
            built_in: false,
            is_async: false,
        };
        let program = Block::new(vec![Statement::Call(call)]);
        let graph = stepwise_analyzer::lower(&program).unwrap();
        let steps = compile_steps(&graph, &NoBuiltIns).unwrap();
        assert!(matches!(steps[graph.entry().as_usize()], Step::Single(SingleStep::ExternCall { .. })));
    }
}
