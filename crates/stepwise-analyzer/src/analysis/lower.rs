//! Pass 1: lowers a statement tree into a labelled [`FlowGraph`].
//!
//! Lowering happens in two phases, mirroring the "dense ID arena instead of
//! pointer graphs" approach: a right-to-left construction pass builds a
//! draft graph keyed by construction-time slot indices (so a loop body can
//! back-edge to its own not-yet-finished head), then a labelling walk
//! assigns the final dense [`NodeId`]s in first-visit order and bakes the
//! draft into the immutable [`FlowGraph`].

use std::collections::HashMap;

use rustc_hash::FxHashMap;

use stepwise_ast::{Block, CallStmt, IfStmt, LoopStmt, NodeId, ParamValue, Statement, SwitchStmt};

use crate::analysis::flow_graph::{FlowGraph, FlowNode, FlowNodeKind, NormalKind};
use crate::error::FlowError;

/// Lowers a root statement block into a flow graph whose final node is an
/// implicit return (so any block that falls off the end returns the
/// unspecified value).
pub fn lower(program: &Block) -> Result<FlowGraph, FlowError> {
    let mut builder = Builder::default();
    let implicit_return = builder.push(DraftKind::Return { value: None });
    let entry = builder.lower_block(program, implicit_return)?;
    let draft_count = builder.drafts.len();
    let graph = Labeller::new(builder.drafts).run(entry);
    log::debug!(
        "lowered {draft_count} draft node(s) into a {}-node flow graph (entry {})",
        graph.len(),
        graph.entry()
    );
    Ok(graph)
}

/// A draft node, identical in shape to [`FlowNodeKind`] but referencing
/// other nodes by construction-time slot index rather than final `NodeId`.
#[derive(Debug, Clone)]
enum DraftKind {
    Normal { kind: NormalKind, next: usize },
    ExternCall { name: String, params: HashMap<String, ParamValue>, is_async: bool, next: usize },
    If { branches: Vec<(ParamValue, usize)>, otherwise: Option<usize>, next: usize },
    Switch { pattern: ParamValue, branches: Vec<(ParamValue, usize)>, otherwise: Option<usize>, next: usize },
    Loop { iterator: Option<ParamValue>, condition: Option<ParamValue>, body: usize, next: usize },
    LoopInitializer { initializer: ParamValue, main: usize },
    Jump { next: usize },
    Return { value: Option<ParamValue> },
    Exit,
    /// Reserved by [`Builder::reserve`] and filled in once its content (a
    /// loop head whose body hasn't been lowered yet) is known.
    Placeholder,
}

/// A loop's `(head, outer successor)` pair, pushed while its body is being
/// lowered so `break`/`continue` inside it can resolve their target.
type LoopTarget = (usize, usize);

#[derive(Default)]
struct Builder {
    drafts: Vec<DraftKind>,
    loop_stack: Vec<LoopTarget>,
    labels: FxHashMap<String, LoopTarget>,
}

impl Builder {
    fn push(&mut self, kind: DraftKind) -> usize {
        self.drafts.push(kind);
        self.drafts.len() - 1
    }

    fn reserve(&mut self) -> usize {
        self.push(DraftKind::Placeholder)
    }

    fn fill(&mut self, idx: usize, kind: DraftKind) {
        self.drafts[idx] = kind;
    }

    /// Lowers a block right-to-left: each statement's successor is the node
    /// already built for the statement after it, so every node gets its
    /// true structural successor without a later fix-up. Returns the
    /// construction index of the block's entry (or `successor` unchanged
    /// when the block is empty).
    fn lower_block(&mut self, block: &Block, successor: usize) -> Result<usize, FlowError> {
        let mut next = successor;
        for stmt in block.statements().iter().rev() {
            next = self.lower_statement(stmt, next)?;
        }
        Ok(next)
    }

    fn lower_statement(&mut self, stmt: &Statement, successor: usize) -> Result<usize, FlowError> {
        match stmt {
            Statement::Expression(expr) => Ok(self.push(DraftKind::Normal {
                kind: NormalKind::Expression(expr.clone()),
                next: successor,
            })),
            Statement::Call(call) => self.lower_call(call, successor),
            Statement::Return(value) => Ok(self.push(DraftKind::Return { value: value.clone() })),
            Statement::If(if_stmt) => self.lower_if(if_stmt, successor),
            Statement::Switch(switch_stmt) => self.lower_switch(switch_stmt, successor),
            Statement::Loop(loop_stmt) => self.lower_loop(loop_stmt, successor),
            Statement::Break(label) => self.lower_break(label.as_deref()),
            Statement::Continue => self.lower_continue(),
            Statement::Exit => Ok(self.push(DraftKind::Exit)),
        }
    }

    fn lower_call(&mut self, call: &CallStmt, successor: usize) -> Result<usize, FlowError> {
        if call.built_in {
            Ok(self.push(DraftKind::Normal {
                kind: NormalKind::BuiltInCall {
                    name: call.name.clone(),
                    params: call.params.clone(),
                    is_async: call.is_async,
                },
                next: successor,
            }))
        } else {
            Ok(self.push(DraftKind::ExternCall {
                name: call.name.clone(),
                params: call.params.clone(),
                is_async: call.is_async,
                next: successor,
            }))
        }
    }

    fn lower_if(&mut self, if_stmt: &IfStmt, successor: usize) -> Result<usize, FlowError> {
        let mut branches = Vec::with_capacity(if_stmt.branches.len());
        for (condition, body) in &if_stmt.branches {
            let entry = self.lower_block(body, successor)?;
            branches.push((condition.clone(), entry));
        }
        let otherwise = if_stmt
            .otherwise
            .as_ref()
            .map(|body| self.lower_block(body, successor))
            .transpose()?;
        Ok(self.push(DraftKind::If { branches, otherwise, next: successor }))
    }

    fn lower_switch(&mut self, switch_stmt: &SwitchStmt, successor: usize) -> Result<usize, FlowError> {
        // The branch-body -> outer-successor wiring is identical to `If`;
        // no-fallthrough falls out of every branch and the otherwise block
        // sharing the same `successor`, not a chained continuation.
        let mut branches = Vec::with_capacity(switch_stmt.branches.len());
        for (condition, body) in &switch_stmt.branches {
            let entry = self.lower_block(body, successor)?;
            branches.push((condition.clone(), entry));
        }
        let otherwise = switch_stmt
            .otherwise
            .as_ref()
            .map(|body| self.lower_block(body, successor))
            .transpose()?;
        Ok(self.push(DraftKind::Switch {
            pattern: switch_stmt.pattern.clone(),
            branches,
            otherwise,
            next: successor,
        }))
    }

    fn lower_loop(&mut self, loop_stmt: &LoopStmt, successor: usize) -> Result<usize, FlowError> {
        let loop_idx = self.reserve();

        if let Some(label) = &loop_stmt.label {
            if self.labels.contains_key(label) {
                return Err(FlowError::DuplicateLabel(label.clone()));
            }
            log::trace!("registering label '{label}' for loop at draft slot {loop_idx}");
            let _ = self.labels.insert(label.clone(), (loop_idx, successor));
        }
        self.loop_stack.push((loop_idx, successor));

        let body_entry = self.lower_block(&loop_stmt.body, loop_idx)?;

        let _ = self.loop_stack.pop();
        if let Some(label) = &loop_stmt.label {
            log::trace!("unregistering label '{label}'");
            let _ = self.labels.remove(label);
        }

        self.fill(
            loop_idx,
            DraftKind::Loop {
                iterator: loop_stmt.iterator.clone(),
                condition: loop_stmt.condition.clone(),
                body: body_entry,
                next: successor,
            },
        );

        Ok(if let Some(initializer) = &loop_stmt.initializer {
            self.push(DraftKind::LoopInitializer {
                initializer: initializer.clone(),
                main: loop_idx,
            })
        } else if loop_stmt.skip_initial_check {
            body_entry
        } else {
            loop_idx
        })
    }

    fn lower_break(&mut self, label: Option<&str>) -> Result<usize, FlowError> {
        let (_, outer_successor) = match label {
            Some(label) => *self
                .labels
                .get(label)
                .ok_or_else(|| FlowError::UnresolvedBreakLabel(label.to_owned()))?,
            None => *self.loop_stack.last().ok_or(FlowError::BreakOutsideLoop)?,
        };
        Ok(self.push(DraftKind::Jump { next: outer_successor }))
    }

    fn lower_continue(&mut self) -> Result<usize, FlowError> {
        let (loop_head, _) = *self.loop_stack.last().ok_or(FlowError::ContinueOutsideLoop)?;
        Ok(self.push(DraftKind::Jump { next: loop_head }))
    }
}

/// Walks the draft graph from its entry, assigning final dense `NodeId`s in
/// first-visit order and translating every construction-index reference
/// into the matching final id.
struct Labeller {
    drafts: Vec<DraftKind>,
    assigned: Vec<Option<NodeId>>,
    finalized: Vec<FlowNode>,
}

impl Labeller {
    fn new(drafts: Vec<DraftKind>) -> Self {
        let assigned = vec![None; drafts.len()];
        Self { drafts, assigned, finalized: Vec::new() }
    }

    fn run(mut self, entry: usize) -> FlowGraph {
        let entry_id = self.visit(entry);
        FlowGraph::new(self.finalized, entry_id)
    }

    fn visit(&mut self, idx: usize) -> NodeId {
        if let Some(id) = self.assigned[idx] {
            return id;
        }

        let id = NodeId::from(self.finalized.len());
        self.assigned[idx] = Some(id);
        // Reserve the slot immediately so a cyclic reference (a loop body's
        // continue jump, back to the loop head currently being visited)
        // finds `assigned` already populated instead of recursing forever.
        self.finalized.push(FlowNode { id, mergeable: true, kind: FlowNodeKind::Exit });

        let (kind, mergeable) = match self.drafts[idx].clone() {
            DraftKind::Normal { kind, next } => {
                let next = self.visit(next);
                (FlowNodeKind::Normal { kind, next }, true)
            }
            DraftKind::ExternCall { name, params, is_async, next } => {
                let next = self.visit(next);
                (FlowNodeKind::ExternCall { name, params, is_async, next }, false)
            }
            DraftKind::If { branches, otherwise, next } => {
                let mut merge = true;
                let branches: Vec<_> = branches
                    .into_iter()
                    .map(|(cond, target)| {
                        let id = self.visit(target);
                        merge &= self.finalized[id.as_usize()].mergeable;
                        (cond, id)
                    })
                    .collect();
                let otherwise = otherwise.map(|target| {
                    let id = self.visit(target);
                    merge &= self.finalized[id.as_usize()].mergeable;
                    id
                });
                let next = self.visit(next);
                (FlowNodeKind::If { branches, otherwise, next }, merge)
            }
            DraftKind::Switch { pattern, branches, otherwise, next } => {
                let mut merge = true;
                let branches: Vec<_> = branches
                    .into_iter()
                    .map(|(cond, target)| {
                        let id = self.visit(target);
                        merge &= self.finalized[id.as_usize()].mergeable;
                        (cond, id)
                    })
                    .collect();
                let otherwise = otherwise.map(|target| {
                    let id = self.visit(target);
                    merge &= self.finalized[id.as_usize()].mergeable;
                    id
                });
                let next = self.visit(next);
                (FlowNodeKind::Switch { pattern, branches, otherwise, next }, merge)
            }
            DraftKind::Loop { iterator, condition, body, next } => {
                let body = self.visit(body);
                let merge = self.finalized[body.as_usize()].mergeable;
                let next = self.visit(next);
                (FlowNodeKind::Loop { iterator, condition, body, next }, merge)
            }
            DraftKind::LoopInitializer { initializer, main } => {
                let main = self.visit(main);
                (FlowNodeKind::LoopInitializer { initializer, main }, true)
            }
            DraftKind::Jump { next } => {
                let next = self.visit(next);
                (FlowNodeKind::Jump { next }, true)
            }
            DraftKind::Return { value } => (FlowNodeKind::Return { value }, true),
            DraftKind::Exit => (FlowNodeKind::Exit, true),
            DraftKind::Placeholder => {
                unreachable!("a placeholder is always filled before it can be visited")
            }
        };

        self.finalized[id.as_usize()] = FlowNode { id, mergeable, kind };
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepwise_ast::Value;

    fn literal(v: f64) -> ParamValue {
        ParamValue::Literal(Value::Number(v))
    }

    #[test]
    fn empty_program_is_just_the_implicit_return() {
        let graph = lower(&Block::new(vec![])).unwrap();
        assert_eq!(graph.len(), 1);
        assert!(matches!(graph.get(graph.entry()).unwrap().kind, FlowNodeKind::Return { value: None }));
    }

    #[test]
    fn return_statement_lowers_to_terminal_node() {
        let program = Block::new(vec![Statement::Return(Some(literal(1.0)))]);
        let graph = lower(&program).unwrap();
        let entry = graph.get(graph.entry()).unwrap();
        assert!(matches!(entry.kind, FlowNodeKind::Return { .. }));
        assert!(entry.mergeable);
    }

    #[test]
    fn break_outside_loop_is_an_error() {
        let program = Block::new(vec![Statement::Break(None)]);
        assert_eq!(lower(&program), Err(FlowError::BreakOutsideLoop));
    }

    #[test]
    fn continue_outside_loop_is_an_error() {
        let program = Block::new(vec![Statement::Continue]);
        assert_eq!(lower(&program), Err(FlowError::ContinueOutsideLoop));
    }

    #[test]
    fn unresolved_break_label_reports_the_label_not_a_variable() {
        let program = Block::new(vec![Statement::Break(Some("outer".to_owned()))]);
        assert_eq!(
            lower(&program),
            Err(FlowError::UnresolvedBreakLabel("outer".to_owned()))
        );
    }

    #[test]
    fn duplicate_label_is_an_error() {
        use stepwise_ast::LoopStmt;

        let inner = LoopStmt {
            initializer: None,
            condition: None,
            iterator: None,
            label: Some("l".to_owned()),
            body: Block::new(vec![]),
            skip_initial_check: false,
        };
        let outer = LoopStmt {
            initializer: None,
            condition: None,
            iterator: None,
            label: Some("l".to_owned()),
            body: Block::new(vec![Statement::Loop(inner)]),
            skip_initial_check: false,
        };
        let program = Block::new(vec![Statement::Loop(outer)]);
        assert_eq!(lower(&program), Err(FlowError::DuplicateLabel("l".to_owned())));
    }

    #[test]
    fn externcall_is_never_mergeable() {
        let call = CallStmt {
            name: "doThing".to_owned(),
            params: HashMap::new(),
            built_in: false,
            is_async: false,
        };
        let program = Block::new(vec![Statement::Call(call)]);
        let graph = lower(&program).unwrap();
        assert!(!graph.get(graph.entry()).unwrap().mergeable);
    }

    #[test]
    fn loop_with_initializer_is_wrapped() {
        let loop_stmt = LoopStmt {
            initializer: Some(literal(0.0)),
            condition: Some(literal(1.0)),
            iterator: Some(literal(1.0)),
            label: None,
            body: Block::new(vec![]),
            skip_initial_check: false,
        };
        let program = Block::new(vec![Statement::Loop(loop_stmt)]);
        let graph = lower(&program).unwrap();
        assert!(matches!(
            graph.get(graph.entry()).unwrap().kind,
            FlowNodeKind::LoopInitializer { .. }
        ));
    }

    #[test]
    fn do_while_loop_enters_directly_at_body() {
        let loop_stmt = LoopStmt {
            initializer: None,
            condition: Some(literal(0.0)),
            iterator: None,
            label: None,
            body: Block::new(vec![Statement::Continue]),
            skip_initial_check: true,
        };
        let program = Block::new(vec![Statement::Loop(loop_stmt)]);
        let graph = lower(&program).unwrap();
        // entry is the body's own node (a Jump, since the body is just
        // `continue`), not the loop head.
        assert!(matches!(graph.get(graph.entry()).unwrap().kind, FlowNodeKind::Jump { .. }));
    }
}
