//! The compiled artifact: a dense, run-fused array of [`Step`]s plus the
//! top-level `compile` entry point tying both passes together.

use std::sync::{Arc, Weak};

use stepwise_analyzer::FlowGraph;
use stepwise_ast::{Block, HostError, NodeId, Opcode, Scope};

use crate::builtin::BuiltInResolver;
use crate::error::CompileError;
use crate::fused;
use crate::global::GlobalResolver;
use crate::split::compile_steps;
use crate::step::{SingleStep, Step};

/// A compiled program: one [`Step`] per flow-graph node, addressable by
/// [`NodeId`], plus the entry node and a handle back to whatever resolves
/// named global-function calls.
///
/// The back-reference is a [`Weak`] pointer deliberately: the interpreter
/// façade owns `Arc<Executable>`s for every compiled global, so a strong
/// reference here would hold the façade (and transitively every other
/// global) alive forever.
pub struct Executable {
    steps: Vec<Step>,
    entry: NodeId,
    globals: Weak<dyn GlobalResolver>,
}

impl Executable {
    #[must_use]
    pub fn entry(&self) -> NodeId {
        self.entry
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    #[must_use]
    pub fn step_at(&self, id: NodeId) -> Option<&Step> {
        self.steps.get(id.as_usize())
    }

    /// Resolves a named global function through the back-reference. Used
    /// by the runtime's stepper when it sees `Opcode::Call` against a
    /// name that is not a compile-time built-in.
    #[must_use]
    pub fn resolve_global(&self, name: &str) -> Option<Arc<Executable>> {
        self.globals.upgrade().and_then(|globals| globals.resolve_global(name))
    }

    /// True when `id` is both in range and addressable from outside its
    /// own run: false for an out-of-range id and for the interior ids of
    /// a fused run (`Step::Single(SingleStep::Dead)`). The runtime uses
    /// this to validate a PC before stepping to it or including it in a
    /// snapshot.
    #[must_use]
    pub fn is_live(&self, id: NodeId) -> bool {
        !matches!(self.step_at(id), None | Some(Step::Single(SingleStep::Dead)))
    }

    /// Steps a single node. `Step::Fused` is rejected here: a fused run
    /// is evaluated all at once by [`Executable::step_fused`], since it
    /// produces more than one synchronous-vs-async decision down its own
    /// tree rather than a single up-front one.
    pub fn step_node(&self, id: NodeId, scope: &Scope) -> Result<Opcode, HostError> {
        match self.step_at(id) {
            Some(Step::Single(single)) => single.step(scope),
            Some(Step::Fused(_)) => {
                unreachable!("a fused step must be driven through step_fused, not step_node")
            }
            None => unreachable!("the runtime never steps to an id outside the executable"),
        }
    }

    pub async fn step_node_async(&self, id: NodeId, scope: &Scope) -> Result<Opcode, HostError> {
        match self.step_at(id) {
            Some(Step::Single(single)) => single.step_async(scope).await,
            Some(Step::Fused(_)) => {
                unreachable!("a fused step must be driven through step_fused, not step_node_async")
            }
            None => unreachable!("the runtime never steps to an id outside the executable"),
        }
    }

    /// True when the step at `id` is a fused run and must be driven
    /// through [`Executable::step_fused`] instead of [`Executable::step_node`].
    #[must_use]
    pub fn is_fused(&self, id: NodeId) -> bool {
        matches!(self.step_at(id), Some(Step::Fused(_)))
    }

    /// Drives an entire fused run to completion, translating its
    /// terminal [`fused::Signal`] into an [`Opcode`]. A `Break`/`Continue`
    /// signal reaching here means the run was built incorrectly — every
    /// jump inside a fused run is classified against that run's own loop
    /// stack at compile time and never escapes as a bare signal.
    pub async fn step_fused(&self, id: NodeId, scope: &Scope) -> Result<Opcode, HostError> {
        let Some(Step::Fused(op)) = self.step_at(id) else {
            unreachable!("step_fused called on a non-fused id");
        };
        match fused::eval(op, scope).await? {
            fused::Signal::Move(target) => Ok(Opcode::Move(target)),
            fused::Signal::Return(value) => Ok(Opcode::Return(value)),
            fused::Signal::Exit => Ok(Opcode::Exit),
            fused::Signal::Break(_) | fused::Signal::Continue => {
                unreachable!("break/continue never escapes a well-formed fused run")
            }
        }
    }
}

/// Compiles a statement tree into an [`Executable`].
///
/// Runs flow analysis (Pass 1) followed by node generation and run
/// fusion (Pass 2). `globals` is a weak handle so the resulting
/// `Executable` never keeps the owning interpreter façade alive by
/// itself; see [`Executable`]'s field documentation.
pub fn compile(
    program: &Block,
    builtins: &dyn BuiltInResolver,
    globals: Weak<dyn GlobalResolver>,
) -> Result<Executable, CompileError> {
    let graph: FlowGraph = stepwise_analyzer::lower(program)?;
    let entry = graph.entry();
    let steps = compile_steps(&graph, builtins)?;
    log::debug!("compiled {} flow node(s) into {} step(s)", graph.len(), steps.len());
    Ok(Executable { steps, entry, globals })
}
